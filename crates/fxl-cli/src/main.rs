use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "fxl")]
#[command(about = "FIX conformance harness CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a scenario file against a paper session and print the result.
    Run {
        /// Path to a scenario JSON file.
        file: String,

        /// Keep the paper session silent (exercise timeout paths).
        #[arg(long, default_value_t = false)]
        silent: bool,

        /// Disable trading-hours / size / price compliance bands.
        #[arg(long, default_value_t = false)]
        no_limits: bool,
    },

    /// List scenarios stored in a directory.
    List {
        /// Scenario directory.
        #[arg(long, default_value = "scenarios")]
        dir: String,
    },

    /// Print one stored scenario as JSON.
    Show {
        /// Scenario id.
        id: String,

        /// Scenario directory.
        #[arg(long, default_value = "scenarios")]
        dir: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()),
        )
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Commands::Run {
            file,
            silent,
            no_limits,
        } => commands::run_scenario(&file, silent, no_limits).await,
        Commands::List { dir } => commands::list_scenarios(&dir),
        Commands::Show { id, dir } => commands::show_scenario(&id, &dir),
    }
}
