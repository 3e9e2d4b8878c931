//! CLI command definitions using clap

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Verificador: verify a live web page's landmarks, theme toggle, focus order
/// and search-and-favorites workflow
#[derive(Parser, Debug)]
#[command(name = "verificador")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output (auto, always, never)
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorArg,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run scenarios against the page under test
    Run(RunArgs),

    /// List the configured scenarios
    List(ListArgs),

    /// Write a default verifica.yaml
    Init(InitArgs),

    /// Show the effective configuration
    Config(ConfigArgs),
}

/// Arguments for the run command
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Configuration file (default: ./verifica.yaml if present)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Page under test, overriding the configured base URL
    #[arg(long, env = "VERIFICA_URL")]
    pub url: Option<String>,

    /// Only run the named scenario (repeatable)
    #[arg(long = "only", value_name = "NAME")]
    pub only: Vec<String>,

    /// Report format
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,

    /// Show the browser window
    #[arg(long)]
    pub headed: bool,

    /// Stop after the first failing scenario
    #[arg(long)]
    pub fail_fast: bool,

    /// Also write the report to this file
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Arguments for the list command
#[derive(Parser, Debug)]
pub struct ListArgs {
    /// Configuration file (default: ./verifica.yaml if present)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

/// Arguments for the init command
#[derive(Parser, Debug)]
pub struct InitArgs {
    /// Directory to write verifica.yaml into
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Overwrite an existing verifica.yaml
    #[arg(short, long)]
    pub force: bool,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Configuration file (default: ./verifica.yaml if present)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Page under test, overriding the configured base URL
    #[arg(long, env = "VERIFICA_URL")]
    pub url: Option<String>,

    /// Validate the configuration and exit
    #[arg(long)]
    pub check: bool,
}

/// Report output format
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text
    #[default]
    Text,
    /// JSON for CI integration
    Json,
}

/// Color argument for CLI
#[derive(ValueEnum, Clone, Debug, Default)]
pub enum ColorArg {
    /// Automatic color detection
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

impl From<ColorArg> for crate::config::ColorChoice {
    fn from(arg: ColorArg) -> Self {
        match arg {
            ColorArg::Auto => Self::Auto,
            ColorArg::Always => Self::Always,
            ColorArg::Never => Self::Never,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    mod cli_tests {
        use super::*;

        #[test]
        fn test_parse_run_defaults() {
            let cli = Cli::parse_from(["verificador", "run"]);
            let Commands::Run(args) = cli.command else {
                panic!("expected run");
            };
            assert!(args.only.is_empty());
            assert_eq!(args.format, OutputFormat::Text);
            assert!(!args.headed);
        }

        #[test]
        fn test_parse_run_filters() {
            let cli = Cli::parse_from([
                "verificador",
                "run",
                "--only",
                "focus-order",
                "--only",
                "theme-toggle",
                "--format",
                "json",
                "--url",
                "http://localhost:3000",
            ]);
            let Commands::Run(args) = cli.command else {
                panic!("expected run");
            };
            assert_eq!(args.only, vec!["focus-order", "theme-toggle"]);
            assert_eq!(args.format, OutputFormat::Json);
            assert_eq!(args.url.as_deref(), Some("http://localhost:3000"));
        }

        #[test]
        fn test_global_flags() {
            let cli = Cli::parse_from(["verificador", "-vv", "--color", "never", "list"]);
            assert_eq!(cli.verbose, 2);
            assert!(matches!(cli.color, ColorArg::Never));
            assert!(matches!(cli.command, Commands::List(_)));
        }

        #[test]
        fn test_init_force() {
            let cli = Cli::parse_from(["verificador", "init", "site", "--force"]);
            let Commands::Init(args) = cli.command else {
                panic!("expected init");
            };
            assert_eq!(args.path, PathBuf::from("site"));
            assert!(args.force);
        }

        #[test]
        fn test_subcommand_required() {
            assert!(Cli::try_parse_from(["verificador"]).is_err());
        }
    }
}
