//! printshop CLI - filament inventory, quotes, print queue, and live printer status
//!
//! Thin operator surface over the ledger, pricing, jobs, and bambu crates.

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

mod config;
mod prompt;
mod shop;
mod watch;

use config::AppConfig;
use prompt::Prompt;
use shop::Shop;

#[derive(Parser)]
#[command(name = "printshop")]
#[command(about = "3D print shop inventory, quoting, and job tracking", long_about = None)]
struct Cli {
    /// Config file (default: platform config dir/printshop/printshop.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding the record files (overrides the config)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Answer yes to every confirmation
    #[arg(short, long, global = true)]
    yes: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage filament spools
    #[command(subcommand)]
    Spool(SpoolCommand),
    /// Price a job, and optionally queue, sell, or fail it
    Quote(QuoteArgs),
    /// Manage queued jobs
    #[command(subcommand)]
    Queue(QueueCommand),
    /// Browse or undo finalized jobs
    #[command(subcommand)]
    History(HistoryCommand),
    /// Report spools promised to more queued grams than they hold
    Audit,
    /// Connect to the printer and print live status until Ctrl-C
    Watch,
}

#[derive(Subcommand)]
enum SpoolCommand {
    /// Add a spool
    Add {
        name: String,
        material: String,
        color: String,
        /// Remaining grams
        weight: f64,
        /// Cost per 1000 g
        cost: f64,
        #[arg(long)]
        abrasive: bool,
        #[arg(long)]
        benchy: bool,
        #[arg(long)]
        ams_slot: Option<String>,
        #[arg(long)]
        location: Option<String>,
    },
    /// List spools and stock totals
    List,
    /// Change fields of a spool
    Edit {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        material: Option<String>,
        #[arg(long)]
        color: Option<String>,
        #[arg(long)]
        weight: Option<f64>,
        #[arg(long)]
        cost: Option<f64>,
        #[arg(long)]
        abrasive: Option<bool>,
        #[arg(long)]
        benchy: Option<bool>,
        #[arg(long)]
        ams_slot: Option<String>,
        #[arg(long)]
        location: Option<String>,
    },
    /// Delete a spool
    Rm { id: String },
}

#[derive(Args)]
struct QuoteArgs {
    /// Job name
    name: String,

    /// Material line as SPOOL_ID:GRAMS (repeatable)
    #[arg(long = "use", value_name = "ID:GRAMS", required = true)]
    uses: Vec<String>,

    #[arg(long, default_value = "")]
    hours: String,
    #[arg(long, default_value = "")]
    rate: String,
    #[arg(long, default_value = "")]
    fee: String,
    #[arg(long, default_value = "")]
    swaps: String,
    #[arg(long, default_value = "")]
    swap_fee: String,
    /// Waste allowance as a fraction (0.2 = 20%)
    #[arg(long, default_value = "")]
    waste: String,
    #[arg(long, default_value = "")]
    markup: String,
    /// Discount as a fraction (0.1 = 10%)
    #[arg(long, default_value = "")]
    discount: String,
    #[arg(long, default_value = "")]
    batch: String,
    #[arg(long)]
    donation: bool,
    /// Round the unit price to a whole currency unit
    #[arg(long)]
    round: bool,

    /// Save the job to the queue
    #[arg(long, group = "action")]
    queue: bool,
    /// Deduct filament and record the sale now
    #[arg(long, group = "action")]
    sell: bool,
    /// Deduct filament and record a failed print
    #[arg(long, group = "action")]
    fail: bool,
    /// Write a receipt file
    #[arg(long)]
    receipt: bool,
}

#[derive(Subcommand)]
enum QueueCommand {
    /// List queued jobs
    List,
    /// Deduct filament, record the sale, and unqueue
    Complete { id: String },
    /// Cancel a queued job
    Cancel { id: String },
    /// Queue a copy of a job
    Dup { id: String },
}

#[derive(Subcommand)]
enum HistoryCommand {
    /// List finalized jobs and totals
    List,
    /// Delete a record
    Undo {
        id: String,
        /// Give the consumed filament back to matching spools
        #[arg(long)]
        restore: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber_init();

    let cli = Cli::parse();
    let mut config = AppConfig::load(cli.config.as_deref())?;
    if let Some(dir) = cli.data_dir {
        config.storage.data_dir = Some(dir);
    }
    let prompt = Prompt::new(cli.yes);

    let mut shop = Shop::open(config)?;
    match cli.command {
        Commands::Spool(cmd) => match cmd {
            SpoolCommand::Add {
                name,
                material,
                color,
                weight,
                cost,
                abrasive,
                benchy,
                ams_slot,
                location,
            } => {
                let mut spool = printshop_ledger::Spool::new(name, material, color, weight, cost);
                spool.abrasive = abrasive;
                spool.has_benchy = benchy;
                spool.ams_slot = ams_slot;
                spool.location = location;
                shop.add_spool(spool)?;
            }
            SpoolCommand::List => shop.list_spools(),
            SpoolCommand::Edit {
                id,
                name,
                material,
                color,
                weight,
                cost,
                abrasive,
                benchy,
                ams_slot,
                location,
            } => {
                shop.edit_spool(&id, |s| {
                    if let Some(v) = name {
                        s.name = v;
                    }
                    if let Some(v) = material {
                        s.material = v;
                    }
                    if let Some(v) = color {
                        s.color = v;
                    }
                    if let Some(v) = weight {
                        s.weight = v;
                    }
                    if let Some(v) = cost {
                        s.cost = v;
                    }
                    if let Some(v) = abrasive {
                        s.abrasive = v;
                    }
                    if let Some(v) = benchy {
                        s.has_benchy = v;
                    }
                    if ams_slot.is_some() {
                        s.ams_slot = ams_slot;
                    }
                    if location.is_some() {
                        s.location = location;
                    }
                })?;
            }
            SpoolCommand::Rm { id } => shop.remove_spool(&id, &prompt)?,
        },
        Commands::Quote(args) => shop.quote(args, &prompt)?,
        Commands::Queue(cmd) => match cmd {
            QueueCommand::List => shop.list_queue(),
            QueueCommand::Complete { id } => shop.complete_queued(&id, &prompt)?,
            QueueCommand::Cancel { id } => shop.cancel_queued(&id, &prompt)?,
            QueueCommand::Dup { id } => shop.duplicate_queued(&id)?,
        },
        Commands::History(cmd) => match cmd {
            HistoryCommand::List => shop.list_history(),
            HistoryCommand::Undo { id, restore } => shop.undo_history(&id, restore, &prompt)?,
        },
        Commands::Audit => shop.audit(),
        Commands::Watch => watch::run(shop.config())?,
    }

    Ok(())
}

fn tracing_subscriber_init() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "printshop=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
