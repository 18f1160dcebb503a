mod commands;
mod scenarios;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use commands::{cmd_build, cmd_check_config, cmd_run};

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// Rendering of a dry-run document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum DocumentFormat {
    Json,
    Xml,
}

/// Document variant selectable on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum VariantArg {
    Full,
    Abbreviated,
}

/// Electronic invoice scenario batch runner.
#[derive(Parser)]
#[command(name = "ecf", version, about = "Electronic invoice scenario batch runner")]
struct Cli {
    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build, sign and submit every scenario of a file
    Run {
        /// JSON array of flat scenario objects
        #[arg(long)]
        scenarios: PathBuf,
        /// Pipeline configuration (TOML)
        #[arg(long, default_value = "ecf.toml")]
        config: PathBuf,
        /// Scenarios in flight at once (overrides [batch] concurrency)
        #[arg(long)]
        concurrency: Option<usize>,
    },

    /// Build one scenario's document without signing or submitting it
    Build {
        /// JSON array of flat scenario objects
        #[arg(long)]
        scenarios: PathBuf,
        /// Position of the scenario in the file, starting at 0
        #[arg(long, default_value_t = 0)]
        index: usize,
        /// Document to build
        #[arg(long, default_value = "full", value_enum)]
        variant: VariantArg,
        /// Signature value (or code) the abbreviated document is linked to
        #[arg(long)]
        security_code: Option<String>,
        /// Rendering of the document
        #[arg(long, default_value = "json", value_enum)]
        format: DocumentFormat,
    },

    /// Parse and validate a pipeline configuration file
    CheckConfig {
        /// Path to the TOML configuration
        config: PathBuf,
    },
}

fn init_tracing(quiet: bool) {
    let default = if quiet { "error" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.quiet);

    match cli.command {
        Commands::Run {
            scenarios,
            config,
            concurrency,
        } => {
            cmd_run(&scenarios, &config, concurrency, cli.output, cli.quiet);
        }
        Commands::Build {
            scenarios,
            index,
            variant,
            security_code,
            format,
        } => {
            cmd_build(
                &scenarios,
                index,
                variant,
                security_code.as_deref(),
                format,
                cli.output,
                cli.quiet,
            );
        }
        Commands::CheckConfig { config } => {
            cmd_check_config(&config, cli.output, cli.quiet);
        }
    }
}

/// Report an error to stderr, as plain text or as a JSON object.
pub(crate) fn report_error(msg: &str, output: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    match output {
        OutputFormat::Text => eprintln!("{}", msg),
        OutputFormat::Json => {
            eprintln!("{}", serde_json::json!({ "error": msg }));
        }
    }
}
