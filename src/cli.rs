// src/cli.rs
use clap::Parser;
use std::path::PathBuf;

/// ct-ingest: Certificate Transparency log poller
///
/// Polls every known Certificate Transparency log for new entries and prints
/// a record for each newly logged certificate.
#[derive(Parser, Debug, Clone)]
#[command(name = "ct-ingest")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    // ===== Input & Configuration =====
    /// Path to TOML config file [default: config.toml, built-in defaults if absent]
    #[arg(short = 'c', long = "config")]
    pub config: Option<String>,

    // ===== Output Format =====
    /// Output records in JSONL format
    #[arg(short = 'j', long = "json")]
    pub json: bool,

    // ===== Output Destination =====
    /// Write output to file instead of stdout
    #[arg(short = 'o', long = "output")]
    pub output: Option<String>,

    // ===== Logging =====
    /// Verbose logging (set log level to debug)
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,

    /// Quiet logging (set log level to warn)
    #[arg(short = 'q', long = "quiet")]
    pub quiet: bool,

    // ===== Utility Commands =====
    /// Fetch the log server list, print the servers that would be polled and exit
    #[arg(long = "list-logs")]
    pub list_logs: bool,
}

pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

impl Cli {
    /// Validate flag combinations and return errors for invalid usage
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.verbose && self.quiet {
            anyhow::bail!("Cannot specify both --verbose and --quiet");
        }

        if let Some(path) = &self.output {
            if path.is_empty() {
                anyhow::bail!("--output requires a file path");
            }
        }

        Ok(())
    }

    /// Config file to load, `None` when none was named and the default is absent
    ///
    /// An explicitly named file is always returned so a missing one fails loudly.
    pub fn config_path(&self) -> Option<PathBuf> {
        match &self.config {
            Some(path) => Some(PathBuf::from(path)),
            None => {
                let default = PathBuf::from(DEFAULT_CONFIG_PATH);
                default.exists().then_some(default)
            }
        }
    }

    pub fn output_format(&self) -> OutputFormat {
        if self.json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }

    /// Log level forced by flags, if any
    pub fn log_level(&self) -> Option<&'static str> {
        if self.verbose {
            Some("debug")
        } else if self.quiet {
            Some("warn")
        } else {
            None
        }
    }
}

/// Output format selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable colored text output (default)
    Human,
    /// JSON Lines format (one JSON object per line)
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_not_given() {
        let cli = Cli::parse_from(["ct-ingest"]);
        assert_eq!(cli.config, None);
    }

    #[test]
    fn test_custom_config_path() {
        let cli = Cli::parse_from(["ct-ingest", "--config", "custom.toml"]);
        assert_eq!(cli.config_path(), Some(PathBuf::from("custom.toml")));
    }

    #[test]
    fn test_explicit_default_path_is_kept_even_if_missing() {
        let cli = Cli::parse_from(["ct-ingest", "-c", "config.toml"]);
        assert_eq!(cli.config.as_deref(), Some("config.toml"));
        assert_eq!(cli.config_path(), Some(PathBuf::from("config.toml")));
    }

    #[test]
    fn test_json_output_format() {
        let cli = Cli::parse_from(["ct-ingest", "--json"]);
        assert_eq!(cli.output_format(), OutputFormat::Json);
    }

    #[test]
    fn test_default_is_human() {
        let cli = Cli::parse_from(["ct-ingest"]);
        assert_eq!(cli.output_format(), OutputFormat::Human);
    }

    #[test]
    fn test_verbose_and_quiet_invalid() {
        let cli = Cli::parse_from(["ct-ingest", "--verbose", "--quiet"]);
        assert!(cli.validate().is_err());
    }

    #[test]
    fn test_empty_output_path_invalid() {
        let cli = Cli::parse_from(["ct-ingest", "--output", ""]);
        assert!(cli.validate().is_err());
    }

    #[test]
    fn test_valid_combination() {
        let cli = Cli::parse_from(["ct-ingest", "--json", "--output", "records.jsonl", "-v"]);
        assert!(cli.validate().is_ok());
    }

    #[test]
    fn test_log_level_flags() {
        assert_eq!(Cli::parse_from(["ct-ingest", "-v"]).log_level(), Some("debug"));
        assert_eq!(Cli::parse_from(["ct-ingest", "-q"]).log_level(), Some("warn"));
        assert_eq!(Cli::parse_from(["ct-ingest"]).log_level(), None);
    }

    #[test]
    fn test_short_flags() {
        let cli = Cli::parse_from(["ct-ingest", "-c", "test.toml", "-j", "-o", "out.jsonl"]);
        assert_eq!(cli.config.as_deref(), Some("test.toml"));
        assert!(cli.json);
        assert_eq!(cli.output, Some("out.jsonl".to_string()));
        assert!(!cli.list_logs);
    }

    #[test]
    fn test_list_logs_flag() {
        let cli = Cli::parse_from(["ct-ingest", "--list-logs"]);
        assert!(cli.list_logs);
    }
}
