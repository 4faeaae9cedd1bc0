use crate::model::Priority;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "chronoflow", version, about = "Terminal calendar with a day timeline")]
pub struct Cli {
    /// Keep tasks, config and log in this directory
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,
    /// Log level when RUST_LOG is not set
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Add a task to a day
    Add {
        /// Title of the task
        title: String,
        /// Day in YYYY-MM-DD format (defaults to today)
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Optional description
        #[arg(long)]
        desc: Option<String>,
        /// none, low, medium or high
        #[arg(long, default_value = "none")]
        priority: Priority,
    },
    /// List the tasks of a day
    List {
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Schedule a task at HH:MM (one hour) or HH:MM-HH:MM
    Schedule {
        /// Task index as shown by `list`
        index: usize,
        /// HH:MM or HH:MM-HH:MM
        time: String,
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Remove the times from a task
    Unschedule {
        index: usize,
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Toggle a task between done and open
    Done {
        index: usize,
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Search titles and descriptions across all days
    Search { query: String },
    /// Show the timeline configuration and file locations
    Config,
    /// Launch the interactive TUI
    Tui,
}
