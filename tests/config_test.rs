// Test configuration loading
use ct_ingest::config::Config;
use ct_ingest::ct_log::LogServerDirectory;
use std::path::Path;

#[test]
fn test_load_test_config() {
    let config_path = Path::new("tests/test_config.toml");
    let config = Config::from_file(config_path).expect("Failed to load test config");

    // Verify ct_logs config
    assert_eq!(config.ct_logs.poll_interval_secs, 5);
    assert_eq!(config.ct_logs.refresh_retry_secs, 30);
    assert_eq!(config.ct_logs.shutdown_grace_secs, 10);
    assert_eq!(config.ct_logs.extra_bad_servers, vec!["ct.retired.example.com/"]);

    let poll = config.ct_logs.poll_config();
    assert_eq!(poll.chunk_size, 128);
    assert_eq!(poll.max_concurrent_servers, 8);
    assert_eq!(poll.max_range_retries, 5);
    assert_eq!(poll.max_pending_ranges, 32);

    // Verify http config
    assert_eq!(config.http.connect_timeout_secs, 5);
    assert_eq!(config.http.timeout_secs, 20);

    // Verify decoder and logging config
    assert_eq!(config.decoder.reference_domain, "graylog.org");
    assert_eq!(config.logging.level, "info");
}

#[test]
fn test_directory_from_config() {
    let config = Config::from_file(Path::new("tests/test_config.toml")).unwrap();

    let directory = LogServerDirectory::with_default_exclusions(
        config.http.build_client().unwrap(),
        config.log_list_url().unwrap(),
        &config.ct_logs.extra_bad_servers,
    );

    assert_eq!(
        directory.list_url().as_str(),
        "https://www.gstatic.com/ct/log_list/all_logs_list.json"
    );
    assert!(directory.is_excluded("ct.retired.example.com/"));
    assert!(directory.is_excluded("ct.wosign.com/"));
    assert!(!directory.is_excluded("ct.googleapis.com/logs/us1/argon2025h1/"));
}
