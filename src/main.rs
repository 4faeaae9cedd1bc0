use anyhow::Result;
use chronoflow::{cli, commands, logging, storage};
use clap::Parser;

fn main() -> Result<()> {
    let args = cli::Cli::parse();
    let location = storage::locate(args.data_dir.as_deref())?;
    let _log_guard = logging::init(&args.log_level, &location.log)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "chronoflow starting");

    let command = args.command.unwrap_or(cli::Command::Tui);
    let result = match command {
        cli::Command::Add {
            title,
            date,
            desc,
            priority,
        } => commands::add(&location, title, date, desc, priority),
        cli::Command::List { date } => commands::list(&location, date),
        cli::Command::Schedule { index, time, date } => {
            commands::schedule(&location, index, time, date)
        }
        cli::Command::Unschedule { index, date } => commands::unschedule(&location, index, date),
        cli::Command::Done { index, date } => commands::done(&location, index, date),
        cli::Command::Search { query } => commands::search(&location, query),
        cli::Command::Config => commands::config(&location),
        cli::Command::Tui => commands::tui(&location),
    };
    if let Err(err) = &result {
        tracing::error!("{:#}", err);
    }
    result
}
