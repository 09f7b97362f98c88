//! Command-line arguments.

use std::path::PathBuf;

use clap::Parser;

/// A distributed health-observation server.
#[derive(Clone, Debug, Parser)]
#[command(author, version, about)]
pub(crate) struct Cli {
    /// Config files to read, in order; later files override earlier ones.
    #[arg(long = "config", short = 'c', value_name = "FILE")]
    pub(crate) config_files: Vec<PathBuf>,

    /// Override a single config key, using TOML-like `key=value` syntax.
    /// Applied after every config file and environment variable.
    #[arg(long = "option", short = 'o', value_name = "KEY=VALUE")]
    pub(crate) options: Vec<String>,

    /// Override the configured log level (one of debug, info, warn, error).
    #[arg(long = "log-level", short = 'l', value_name = "LEVEL")]
    pub(crate) log_level: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_repeated_config_and_option_flags() {
        let cli = Cli::parse_from([
            "panorama",
            "-c",
            "a.toml",
            "-c",
            "b.toml",
            "-o",
            "addr=0.0.0.0:9000",
            "-l",
            "debug",
        ]);
        assert_eq!(cli.config_files, vec![PathBuf::from("a.toml"), PathBuf::from("b.toml")]);
        assert_eq!(cli.options, vec!["addr=0.0.0.0:9000"]);
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn bare_invocation_has_no_overrides() {
        let cli = Cli::parse_from(["panorama"]);
        assert!(cli.config_files.is_empty());
        assert!(cli.options.is_empty());
        assert!(cli.log_level.is_none());
    }
}
