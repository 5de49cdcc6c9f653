use anyhow::Result;
use clap::{Args, ValueEnum};
use colored::Colorize;
use droidlint_engine::DetectorKind;

#[derive(Args)]
pub struct DetectorsArgs {
    #[arg(long, value_enum, default_value_t = ListFormat::Console)]
    pub format: ListFormat,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
pub enum ListFormat {
    Console,
    Json,
}

pub fn execute(args: &DetectorsArgs) -> Result<()> {
    match args.format {
        ListFormat::Json => {
            let ids: Vec<&str> = DetectorKind::all().iter().map(|k| k.id()).collect();
            println!("{}", serde_json::to_string_pretty(&ids)?);
        }
        ListFormat::Console => {
            for kind in DetectorKind::all() {
                println!("{:<28} {}", kind.id().cyan().bold(), kind.description());
            }
        }
    }
    Ok(())
}
