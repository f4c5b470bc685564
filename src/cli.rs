//! Command-line argument parsing for askdb.

use clap::Parser;
use std::path::PathBuf;

/// Ask a relational database questions in natural language.
#[derive(Parser, Debug)]
#[command(name = "askdb")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Query service base URL (overrides config)
    #[arg(long, value_name = "URL", env = "ASKDB_QUERY_SERVICE")]
    pub query_service: Option<String>,

    /// Rows per result page (overrides config)
    #[arg(long, value_name = "N")]
    pub page_size: Option<usize>,

    /// Use mock collaborators instead of live services (for trying out
    /// the pipeline without credentials)
    #[arg(long)]
    pub mock: bool,

    /// Session identifier for this interactive run
    #[arg(long, value_name = "ID", default_value = "cli")]
    pub session: String,

    /// Path to the audit database (defaults to the platform config dir)
    #[arg(long, value_name = "PATH")]
    pub audit_db: Option<PathBuf>,

    /// Write the operational log to a file in the platform state dir
    /// instead of stderr
    #[arg(long)]
    pub log_file: bool,
}

impl Cli {
    /// Parses command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Returns the config file path, defaulting to the platform config dir.
    pub fn config_path(&self) -> PathBuf {
        if let Some(ref path) = self.config {
            return path.clone();
        }

        dirs::config_dir()
            .map(|d| d.join("askdb").join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("askdb.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["askdb"]);
        assert!(!cli.mock);
        assert_eq!(cli.session, "cli");
        assert!(cli.query_service.is_none());
    }

    #[test]
    fn test_cli_flags() {
        let cli = Cli::parse_from([
            "askdb",
            "--mock",
            "--page-size",
            "10",
            "--session",
            "demo",
        ]);
        assert!(cli.mock);
        assert_eq!(cli.page_size, Some(10));
        assert_eq!(cli.session, "demo");
    }

    #[test]
    fn test_log_file_flag() {
        let cli = Cli::parse_from(["askdb"]);
        assert!(!cli.log_file);

        let cli = Cli::parse_from(["askdb", "--log-file"]);
        assert!(cli.log_file);
    }

    #[test]
    fn test_explicit_config_path() {
        let cli = Cli::parse_from(["askdb", "--config", "/tmp/custom.toml"]);
        assert_eq!(cli.config_path(), PathBuf::from("/tmp/custom.toml"));
    }
}
