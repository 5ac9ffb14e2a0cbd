//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::models::InvalidMetricPolicy;
use clap::Parser;
use std::path::PathBuf;

/// SchemeLens - budget-utilisation dashboard for government schemes
///
/// Load a scheme performance workbook, filter it by district, classify
/// every scheme by utilisation risk and write a Markdown/JSON dashboard.
/// Optionally drafts a formal review note with an AI model.
///
/// Examples:
///   scheme-lens --input schemes.xlsx
///   scheme-lens --input schemes.xlsx --district Pune --review
///   scheme-lens --input schemes.xlsx --list-districts --offline
///   scheme-lens --input schemes.xlsx --format json --output dashboard.json
///   scheme-lens --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Scheme performance workbook (.xlsx)
    #[arg(short, long, value_name = "FILE", required_unless_present = "init_config")]
    pub input: Option<PathBuf>,

    /// Worksheet to read (defaults to the first sheet)
    #[arg(long, value_name = "NAME")]
    pub sheet: Option<String>,

    /// District to filter on ("All" for every district)
    #[arg(short, long, value_name = "NAME")]
    pub district: Option<String>,

    /// Print the selectable districts and exit
    #[arg(long)]
    pub list_districts: bool,

    /// Output file path for the dashboard
    ///
    /// Defaults to scheme_dashboard.md or the value in .schemelens.toml
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format (markdown, json)
    #[arg(long, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// How to treat rows with missing or non-numeric metrics
    #[arg(long, value_name = "POLICY")]
    pub on_invalid: Option<InvalidMetricPolicy>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .schemelens.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Draft an AI-assisted review note for the filtered view
    #[arg(long)]
    pub review: bool,

    /// Instruction for the review note (a default is used when blank)
    #[arg(long, value_name = "TEXT", requires = "review")]
    pub instruction: Option<String>,

    /// Model used for the review note
    #[arg(short, long, env = "SCHEMELENS_MODEL")]
    pub model: Option<String>,

    /// Base URL of the chat-completions API
    #[arg(long, value_name = "URL", env = "SCHEMELENS_API_URL")]
    pub api_url: Option<String>,

    /// Review request timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Skip the API key check (dashboard only, no review note)
    #[arg(long, conflicts_with = "review")]
    pub offline: bool,

    /// Exit with code 2 when the view contains high-risk schemes
    #[arg(long)]
    pub fail_on_high_risk: bool,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .schemelens.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the dashboard.
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
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        match self.input {
            Some(ref input) if !input.exists() => {
                return Err(format!("Input file does not exist: {}", input.display()));
            }
            Some(ref input) if !input.is_file() => {
                return Err(format!("Input path is not a file: {}", input.display()));
            }
            Some(_) => {}
            None => return Err("An input workbook is required (--input)".to_string()),
        }

        if let Some(ref url) = self.api_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err("API URL must start with 'http://' or 'https://'".to_string());
            }
        }

        if let Some(ref district) = self.district {
            if district.trim().is_empty() {
                return Err("District must not be blank".to_string());
            }
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if self.offline && self.review {
            return Err("Cannot request a review note with --offline".to_string());
        }

        // Validate timeout if provided
        if let Some(timeout) = self.timeout {
            if timeout == 0 {
                return Err("Timeout must be at least 1 second".to_string());
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    ///
    /// `config_verbose` is the `[general] verbose` setting; `--quiet` wins
    /// over both.
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
    use tempfile::NamedTempFile;

    fn make_args(input: PathBuf) -> Args {
        Args {
            input: Some(input),
            sheet: None,
            district: None,
            list_districts: false,
            output: None,
            format: OutputFormat::Markdown,
            on_invalid: None,
            config: None,
            review: false,
            instruction: None,
            model: None,
            api_url: None,
            timeout: None,
            offline: false,
            fail_on_high_risk: false,
            verbose: false,
            quiet: false,
            init_config: false,
        }
    }

    #[test]
    fn test_validation_ok() {
        let file = NamedTempFile::new().unwrap();
        assert!(make_args(file.path().to_path_buf()).validate().is_ok());
    }

    #[test]
    fn test_validation_missing_input() {
        let args = make_args(PathBuf::from("/nonexistent/schemes.xlsx"));
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_invalid_api_url() {
        let file = NamedTempFile::new().unwrap();
        let mut args = make_args(file.path().to_path_buf());
        args.api_url = Some("api.openai.com".to_string());
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_conflicting_options() {
        let file = NamedTempFile::new().unwrap();
        let mut args = make_args(file.path().to_path_buf());
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());

        let mut args = make_args(file.path().to_path_buf());
        args.offline = true;
        args.review = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_parse_from_command_line() {
        let args = Args::try_parse_from([
            "scheme-lens",
            "--input",
            "schemes.xlsx",
            "--district",
            "Pune",
            "--review",
            "--instruction",
            "Focus on delays",
            "--on-invalid",
            "exclude",
            "--format",
            "json",
        ])
        .unwrap();

        assert_eq!(args.district.as_deref(), Some("Pune"));
        assert!(args.review);
        assert_eq!(args.on_invalid, Some(InvalidMetricPolicy::Exclude));
        assert_eq!(args.format, OutputFormat::Json);
    }

    #[test]
    fn test_instruction_requires_review() {
        let result = Args::try_parse_from([
            "scheme-lens",
            "--input",
            "schemes.xlsx",
            "--instruction",
            "Focus on delays",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_log_level() {
        let file = NamedTempFile::new().unwrap();
        let mut args = make_args(file.path().to_path_buf());
        assert_eq!(args.log_level(false), tracing::Level::INFO);
        assert_eq!(args.log_level(true), tracing::Level::DEBUG);

        args.verbose = true;
        assert_eq!(args.log_level(false), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(true), tracing::Level::ERROR);
    }
}
