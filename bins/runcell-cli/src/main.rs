mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "runcell-cli")]
#[command(about = "runcell CLI - Run code submissions locally", long_about = None)]
struct Cli {
    /// Show engine logs (RUST_LOG overrides the level)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile and run a source file through the execution engine
    Run {
        /// Language name (python, javascript, java, cpp)
        #[arg(short, long)]
        language: String,

        /// Source file to execute
        #[arg(short, long)]
        file: PathBuf,

        /// Text passed to the program on stdin
        #[arg(short, long, conflicts_with = "input_file")]
        input: Option<String>,

        /// File whose contents are passed on stdin
        #[arg(long)]
        input_file: Option<PathBuf>,

        /// Run stage time limit (defaults to RUN_TIMEOUT_MS or 5000)
        #[arg(short, long)]
        timeout_ms: Option<u64>,

        /// Print the HTTP response envelope as JSON
        #[arg(long)]
        json: bool,
    },

    /// List configured toolchains
    ListLangs,

    /// Check that every toolchain program is installed
    Check,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    if cli.verbose {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug"));
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }

    match cli.command {
        Commands::Run {
            language,
            file,
            input,
            input_file,
            timeout_ms,
            json,
        } => {
            let succeeded = commands::run_file(
                &language,
                &file,
                input.as_deref(),
                input_file.as_deref(),
                timeout_ms,
                json,
            )
            .await?;
            if !succeeded {
                return Ok(ExitCode::FAILURE);
            }
        }
        Commands::ListLangs => {
            commands::list_languages()?;
        }
        Commands::Check => {
            if !commands::check_toolchains().await? {
                return Ok(ExitCode::FAILURE);
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}
