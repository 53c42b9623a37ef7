use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use ingest::ParamIngestor;
use page::StaticPage;
use readiness::TokioClock;
use roster::RosterOwner;
use types::IngestReport;
use widget::{SharedOwnerSlot, WidgetOwner};

mod config;
mod debug_log;
mod ingest;
mod merge;
mod normalize;
mod page;
mod readiness;
mod roster;
mod sanitize;
mod sources;
mod types;
mod utils;
mod widget;

#[cfg(feature = "mimalloc")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser)]
#[command(name = "botdock")]
#[command(version)]
#[command(disable_help_subcommand = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output reports as JSON instead of text
    #[arg(long)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest bot parameters from a page URL and cookie into the roster
    Ingest(IngestArgs),
    /// Show the current roster
    Show(ShowArgs),
    /// Create an empty roster file
    Init {
        #[arg(long, default_value_t = false)]
        overwrite: bool,
    },
    /// Manage configuration
    Config(ConfigArgs),
}

#[derive(Args)]
struct IngestArgs {
    /// Page URL carrying the bot parameters
    #[arg(long)]
    url: String,

    /// Raw Cookie header presented by the page
    #[arg(long)]
    cookie: Option<String>,

    /// Roster file to merge into (defaults to config, then ~/.botdock-roster.json)
    #[arg(long)]
    roster: Option<PathBuf>,

    /// Attempts to wait for the roster owner before giving up
    #[arg(long)]
    max_attempts: Option<u32>,

    /// Milliseconds between owner checks
    #[arg(long)]
    interval_ms: Option<u64>,
}

#[derive(Args)]
struct ShowArgs {
    /// Roster file to read (defaults to config, then ~/.botdock-roster.json)
    #[arg(long)]
    roster: Option<PathBuf>,
}

#[derive(Args)]
struct ConfigArgs {
    #[command(subcommand)]
    subcommand: ConfigSubcommands,
}

#[derive(Subcommand)]
enum ConfigSubcommands {
    /// Create default configuration file
    Init {
        #[arg(long, default_value_t = false)]
        overwrite: bool,
    },
    /// Show current configuration
    Show,
    /// Set configuration value
    Set {
        /// Configuration key (max-attempts, interval-ms, roster-path, json)
        key: String,
        /// Configuration value
        value: String,
    },
}

#[tokio::main]
async fn main() {
    debug_log::init();

    let cli = Cli::parse();

    // Load config file to get defaults
    let config = config::Config::load().unwrap_or(None).unwrap_or_default();
    let json = cli.json || config.output.json;

    match cli.command {
        Commands::Ingest(args) => {
            if let Err(e) = run_ingest(args, json).await {
                eprintln!("Error running ingestion: {e:#}");
                std::process::exit(1);
            }
        }
        Commands::Show(args) => {
            if let Err(e) = run_show(args, json) {
                eprintln!("Error showing roster: {e:#}");
                std::process::exit(1);
            }
        }
        Commands::Init { overwrite } => {
            if let Err(e) = run_init(overwrite) {
                eprintln!("Error creating roster: {e:#}");
                std::process::exit(1);
            }
        }
        Commands::Config(config_args) => {
            handle_config_subcommand(config_args);
        }
    }
}

async fn run_ingest(args: IngestArgs, json: bool) -> Result<()> {
    let config = config::Config::load().unwrap_or(None).unwrap_or_default();

    // Config defaults with CLI overrides, like the formatting options.
    let mut settings = config.waiter_settings();
    if let Some(attempts) = args.max_attempts {
        settings.max_attempts = attempts;
    }
    if let Some(interval) = args.interval_ms {
        settings.interval = Duration::from_millis(interval);
    }

    let url = url::Url::parse(&args.url).context("Invalid page URL")?;
    let roster_path = resolve_roster_path(args.roster, &config)?;
    let owner = Arc::new(RosterOwner::load(roster_path, json)?);

    let page = Arc::new(StaticPage::new(url, args.cookie));
    let slot = Arc::new(SharedOwnerSlot::new());
    slot.install(owner);

    let ingestor = ParamIngestor::new(page, slot, Arc::new(TokioClock), settings);
    let report = ingestor.load_bots_from_url_params().await;

    if json {
        let out = simd_json::to_string_pretty(&report)?;
        println!("{out}");
    } else {
        print_report(&report);
    }

    Ok(())
}

fn run_show(args: ShowArgs, json: bool) -> Result<()> {
    let config = config::Config::load().unwrap_or(None).unwrap_or_default();
    let roster_path = resolve_roster_path(args.roster, &config)?;
    let owner = RosterOwner::load(roster_path, json)?;

    if json {
        let out = simd_json::to_string_pretty(&owner.bots())?;
        println!("{out}");
    } else {
        println!("📂 Roster: {}", owner.path().display());
        owner.render_experts();
    }

    Ok(())
}

fn run_init(overwrite: bool) -> Result<()> {
    let config = config::Config::load().unwrap_or(None).unwrap_or_default();
    let path = resolve_roster_path(None, &config)?;

    if !std::fs::exists(&path)? || overwrite {
        RosterOwner::create(path.clone(), true)?;
        println!("📝 Created empty roster at: {}", path.display());
    } else {
        println!("Roster already exists.  Pass `--overwrite` to overwrite.");
    }

    Ok(())
}

fn resolve_roster_path(flag: Option<PathBuf>, config: &config::Config) -> Result<PathBuf> {
    if let Some(path) = flag {
        return Ok(path);
    }
    if let Some(path) = &config.roster.path {
        return Ok(path.clone());
    }
    RosterOwner::default_path()
}

fn print_report(report: &IngestReport) {
    println!();
    println!("📊 Ingestion report:");
    println!(
        "   Merged: {} ({} added, {} replaced)",
        report.merged.len(),
        report.added,
        report.replaced
    );
    if report.skipped > 0 {
        println!("   Skipped: {}", report.skipped);
    }
    if !report.consumed_slots.is_empty() {
        println!("   Consumed slots: {}", report.consumed_slots.join(", "));
    }
    if let Some(url) = &report.cleaned_url {
        println!("   Cleaned URL: {url}");
    }
}

fn handle_config_subcommand(config_args: ConfigArgs) {
    match config_args.subcommand {
        ConfigSubcommands::Init { overwrite } => {
            if let Err(e) = config::create_default_config(overwrite) {
                eprintln!("Error creating config: {e}");
                std::process::exit(1);
            }
        }
        ConfigSubcommands::Show => {
            if let Err(e) = config::show_config() {
                eprintln!("Error showing config: {e}");
                std::process::exit(1);
            }
        }
        ConfigSubcommands::Set { key, value } => {
            if let Err(e) = config::set_config_value(&key, &value) {
                eprintln!("Error setting config: {e}");
                std::process::exit(1);
            }
        }
    }
}
