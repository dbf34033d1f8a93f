//! LifeSync CLI
//!
//! Command-line tools for a LifeSync local store. The CLI always runs in
//! pure local mode: the cloud flag is off and no remote is contacted.
//!
//! # Commands
//!
//! - `inspect` - Display per-entity counts, tombstones, pending pushes and markers
//! - `day-init` - Generate today's daily tasks
//! - `task` - Add, list and complete tasks
//! - `preset` - Add and list daily-task presets
//! - `daily` - List and complete daily tasks

mod commands;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// LifeSync command-line tools.
#[derive(Parser)]
#[command(name = "lifesync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the store directory
    #[arg(global = true, short, long)]
    path: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Display per-entity statistics and sync markers
    Inspect {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Generate today's daily tasks from the enabled presets
    DayInit,

    /// Manage tasks
    #[command(subcommand)]
    Task(TaskCommand),

    /// Manage daily-task presets
    #[command(subcommand)]
    Preset(PresetCommand),

    /// Manage daily tasks
    #[command(subcommand)]
    Daily(DailyCommand),

    /// Show version information
    Version,
}

#[derive(Subcommand)]
enum TaskCommand {
    /// Add a task
    Add {
        /// Title
        title: String,
        /// Due date (YYYY-MM-DD)
        #[arg(short, long)]
        due: Option<NaiveDate>,
    },
    /// List tasks
    List {
        /// Include completed tasks
        #[arg(short, long)]
        all: bool,
    },
    /// Mark a task done
    Done {
        /// Task id
        id: String,
    },
}

#[derive(Subcommand)]
enum PresetCommand {
    /// Add a preset
    Add {
        /// Title
        title: String,
    },
    /// List presets
    List,
}

#[derive(Subcommand)]
enum DailyCommand {
    /// List the daily tasks of a date (default today)
    List {
        /// Date (YYYY-MM-DD)
        #[arg(short, long)]
        date: Option<NaiveDate>,
    },
    /// Complete a daily task and export it to the task list
    Complete {
        /// Daily task id
        id: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if let Commands::Version = cli.command {
        println!("LifeSync CLI v{}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }
    let path = cli.path.ok_or("Store path required")?;

    match cli.command {
        Commands::Inspect { format } => commands::inspect::run(&path, &format).await?,
        Commands::DayInit => commands::daily::day_init(&path).await?,
        Commands::Task(TaskCommand::Add { title, due }) => {
            commands::task::add(&path, &title, due).await?
        }
        Commands::Task(TaskCommand::List { all }) => commands::task::list(&path, all).await?,
        Commands::Task(TaskCommand::Done { id }) => commands::task::done(&path, &id).await?,
        Commands::Preset(PresetCommand::Add { title }) => {
            commands::preset::add(&path, &title).await?
        }
        Commands::Preset(PresetCommand::List) => commands::preset::list(&path).await?,
        Commands::Daily(DailyCommand::List { date }) => commands::daily::list(&path, date).await?,
        Commands::Daily(DailyCommand::Complete { id }) => {
            commands::daily::complete(&path, &id).await?
        }
        Commands::Version => {}
    }

    Ok(())
}
