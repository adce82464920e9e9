//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// PulseCheck - integration probe runner
///
/// Fires every registered probe (LLM providers, transactional email,
/// workflow webhooks) concurrently and reports pass/fail per probe.
///
/// Examples:
///   pulsecheck run
///   pulsecheck run --format json --output report.json
///   pulsecheck serve --port 8080
///   pulsecheck list
///   pulsecheck --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .pulsecheck.toml in the current directory
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Generate a default .pulsecheck.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run every registered probe once and print the report
    Run {
        /// Output format (markdown, json)
        #[arg(long, default_value = "markdown", value_name = "FORMAT")]
        format: OutputFormat,

        /// Write the report to a file instead of stdout
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Hard deadline per probe in seconds
        #[arg(long, value_name = "SECS")]
        probe_timeout: Option<u64>,
    },

    /// Serve the HTTP trigger endpoint
    Serve {
        /// Address to bind
        #[arg(long, value_name = "HOST")]
        host: Option<String>,

        /// Port to listen on
        #[arg(short, long, value_name = "PORT")]
        port: Option<u16>,

        /// Shared trigger secret (defaults to the env var named in config)
        #[arg(long, value_name = "SECRET")]
        secret: Option<String>,

        /// Hard deadline per probe in seconds
        #[arg(long, value_name = "SECS")]
        probe_timeout: Option<u64>,
    },

    /// List registered probes
    List,
}

/// Output format for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.init_config {
            return Ok(());
        }

        if self.command.is_none() {
            return Err("A command is required: run, serve or list".to_string());
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        let probe_timeout = match &self.command {
            Some(Command::Run { probe_timeout, .. }) => *probe_timeout,
            Some(Command::Serve { probe_timeout, .. }) => *probe_timeout,
            _ => None,
        };
        if probe_timeout == Some(0) {
            return Err("Probe timeout must be at least 1 second".to_string());
        }

        if let Some(Command::Serve {
            secret: Some(secret),
            ..
        }) = &self.command
        {
            if secret.is_empty() {
                return Err("Trigger secret must not be empty".to_string());
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    ///
    /// `config_verbose` is the `[general] verbose` setting; `--quiet`
    /// still wins over it.
    pub fn log_level(&self, config_verbose: bool) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose || config_verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_args(command: Command) -> Args {
        Args {
            command: Some(command),
            config: None,
            verbose: false,
            quiet: false,
            init_config: false,
        }
    }

    fn run_command() -> Command {
        Command::Run {
            format: OutputFormat::Markdown,
            output: None,
            probe_timeout: None,
        }
    }

    #[test]
    fn test_parse_run_subcommand() {
        let args = Args::try_parse_from(["pulsecheck", "run", "--format", "json", "-v"]).unwrap();
        assert!(args.verbose);
        match args.command {
            Some(Command::Run { format, .. }) => assert_eq!(format, OutputFormat::Json),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_validation_requires_command() {
        let mut args = make_args(run_command());
        args.command = None;
        assert!(args.validate().is_err());

        args.init_config = true;
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_validation_conflicting_options() {
        let mut args = make_args(run_command());
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_zero_timeout() {
        let args = make_args(Command::Serve {
            host: None,
            port: None,
            secret: None,
            probe_timeout: Some(0),
        });
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_log_level() {
        let mut args = make_args(Command::List);
        assert_eq!(args.log_level(false), tracing::Level::INFO);
        assert_eq!(args.log_level(true), tracing::Level::DEBUG);

        args.verbose = true;
        assert_eq!(args.log_level(false), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(false), tracing::Level::ERROR);
        assert_eq!(args.log_level(true), tracing::Level::ERROR);
    }
}
