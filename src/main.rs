use std::io;

use anyhow::{Context, Result};
use clap::Parser;
use log::debug;

mod aggregator;
mod config;
mod console;
mod datetime;
mod logger;
mod parser;
mod sync_command;
mod target_process;
mod time_entry;
mod toggl;

use config::Config;
use sync_command::{parse_day_offset, SyncCommand, SyncOutcome};
use target_process::TargetProcessClient;
use toggl::TogglClient;

/// Togglのtime entryを集計し、TargetProcessに作業時間として登録するCLIアプリケーション。
///
/// # Examples
/// ```
/// $ cargo run
/// $ cargo run -- -1
/// ```
#[derive(Debug, Parser)]
#[clap(version, about)]
struct Args {
    #[clap(
        allow_hyphen_values = true,
        help = "Day offset from today (0 = today, -1 = yesterday)"
    )]
    offset: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    logger::init()?;

    let config = Config::from_env().context("Failed to load configuration")?;
    debug!(
        "TargetProcess user: {:?}, project: {:?}",
        config.user_id, config.project_id
    );

    let toggl_client = TogglClient::new(&config.toggl_api_url, &config.toggl_api_token);
    let target_process_client =
        TargetProcessClient::new(&config.target_process_url, &config.target_process_token);
    let command = SyncCommand::new(
        &toggl_client,
        &target_process_client,
        config.default_work_item,
    );

    let offset = parse_day_offset(args.offset.as_deref());
    let stdin = io::stdin();
    let stdout = io::stdout();
    let outcome = command
        .run(offset, &mut stdin.lock(), &mut stdout.lock())
        .await?;
    if let SyncOutcome::Submitted(results) = outcome {
        debug!("Received {} submission results", results.len());
    }

    Ok(())
}
