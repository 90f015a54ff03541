//! Command-line interface: argument types and dispatch.

mod ac_tasks;
mod cache;
mod common;
mod select;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "reviewdesk")]
#[command(version = reviewdesk::VERSION)]
#[command(about = "OpenReview scraping, LLM relevance triage and spreadsheet export")]
pub(crate) struct Cli {
    /// Config file (default: ~/.reviewdesk/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory for memoized records (overrides cache.root)
    #[arg(long, global = true)]
    cache_root: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Export the area-chair discussion report to the configured sheet
    AcTasks {
        /// Conference id, e.g. NeurIPS.cc/2024/Conference
        #[arg(long)]
        conference: Option<String>,

        /// Worksheet (tab) name
        #[arg(long)]
        sheet: Option<String>,

        /// Print the rows instead of writing them
        #[arg(long)]
        dry_run: bool,
    },
    /// Classify a venue's papers against research keywords
    SelectPapers {
        /// Venue id matched against content.venueid
        #[arg(long)]
        venue: Option<String>,

        /// Chat model (gpt-4o, gpt-3.5-turbo)
        #[arg(long)]
        model: Option<String>,

        /// Comma-separated research keywords
        #[arg(long, value_delimiter = ',')]
        keywords: Vec<String>,
    },
    /// Inspect or edit memoized records
    Cache {
        #[command(subcommand)]
        action: CacheSubcommand,
    },
}

#[derive(Subcommand)]
pub(crate) enum CacheSubcommand {
    /// Show the cache root and record count
    Stats,
    /// Print the stored value for a key
    Show { key: String },
    /// Delete the record for a key so it is recomputed next run
    Remove { key: String },
}

/// Parse arguments, set up logging and run the selected command.
pub(crate) async fn run() -> Result<()> {
    let cli = Cli::parse();
    common::init_logging(cli.verbose, cli.log_format);
    let config = common::load_config(cli.config.as_deref(), cli.cache_root)?;

    match cli.command {
        Commands::AcTasks {
            conference,
            sheet,
            dry_run,
        } => ac_tasks::cmd_ac_tasks(config, conference, sheet, dry_run).await,
        Commands::SelectPapers {
            venue,
            model,
            keywords,
        } => select::cmd_select_papers(config, venue, model, keywords).await,
        Commands::Cache { action } => cache::cmd_cache(&config, action),
    }
}
