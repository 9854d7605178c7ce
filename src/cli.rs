use anyhow::Result;
use clap::Parser;

use crate::commands::CommandReport;
use crate::commands::sync::{self, SyncOptions};
use crate::logging;

#[derive(Debug, Parser)]
#[command(
    name = "monthsync",
    version,
    about = "Mirror liked songs into one playlist per calendar month"
)]
pub struct Cli {
    /// First month to sync, `YYYY-MM`. Defaults to last month.
    #[arg(value_name = "YYYY-MM")]
    pub start: Option<String>,

    /// Print the run report as JSON; logs switch to JSON lines too.
    #[arg(long)]
    pub json: bool,
}

fn render(report: &CommandReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }
    for line in &report.details {
        println!("{line}");
    }
    Ok(())
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.json);
    let report = sync::run(&SyncOptions { start: cli.start })?;
    render(&report, cli.json)
}
