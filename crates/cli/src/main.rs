use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
use commands::{detectors::DetectorsArgs, scan::ScanArgs};

#[derive(Parser)]
#[command(name = "droidlint")]
#[command(about = "Permission, version and intent-safety analysis for Android app models")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze one or more serialized project models
    Scan(ScanArgs),

    /// List the available detectors
    Detectors(DetectorsArgs),
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Scan(args) => commands::scan::execute(&args),
        Commands::Detectors(args) => commands::detectors::execute(&args),
    }
}
