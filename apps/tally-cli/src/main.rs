//! # Tally CLI
//!
//! Runs document records through the totals engine from the command line.
//!
//! ## Commands
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  tally totals   <file.json> [--kind invoice] [--json]                   │
//! │      └─ normalize ──► SyncController (flush) ──► totals table / JSON   │
//! │                                                                         │
//! │  tally snapshot <file.json> [--kind bill]                               │
//! │      └─ normalize ──► SyncController::snapshot ──► pretty JSON          │
//! │                                                                         │
//! │  tally line --quantity 2 --rate 100 --discount 10 --tax "GST 18%"       │
//! │      └─ coerce ──► LineBreakdown                                        │
//! │                                                                         │
//! │  tally config [--init]                                                  │
//! │      └─ effective sync.toml (defaults + file + TALLY_* env)             │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use serde_json::Value;
use tally_core::coerce::{parse_percentage_str, to_number_str};
use tally_core::normalize::normalize_document;
use tally_core::{DocumentKind, DocumentTotals, LineBreakdown, DEFAULT_QUANTITY};
use tally_sync::{ControllerConfig, SyncConfig, SyncController, SyncMode};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "tally", version, about = "Derived totals for accounting documents")]
struct Cli {
    /// Path to sync.toml (defaults to the platform config directory).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the derived totals of a document record.
    Totals {
        file: PathBuf,

        #[arg(long, default_value = "invoice")]
        kind: DocumentKind,

        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Print the submission snapshot of a document record.
    Snapshot {
        file: PathBuf,

        #[arg(long, default_value = "invoice")]
        kind: DocumentKind,
    },

    /// Break down a single line amount.
    Line {
        #[arg(long, default_value = "1")]
        quantity: String,

        #[arg(long, default_value = "0")]
        rate: String,

        #[arg(long, default_value = "0")]
        discount: String,

        /// Percent or label, e.g. "18" or "GST 18%".
        #[arg(long, default_value = "0")]
        tax: String,
    },

    /// Show the effective sync configuration.
    Config {
        /// Write the effective configuration to the config path.
        #[arg(long)]
        init: bool,
    },
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Command::Totals { file, kind, json } => {
            let controller = load_controller(&file, kind, cli.config)?;
            controller.flush();
            let totals = controller.totals();
            if json {
                println!("{}", serde_json::to_string_pretty(&totals)?);
            } else {
                print!("{}", render_totals(&totals));
            }
            let stats = controller.stats();
            debug!(writes = stats.writes, skipped = stats.skipped_writes, "Line amounts synced");
        }
        Command::Snapshot { file, kind } => {
            let controller = load_controller(&file, kind, cli.config)?;
            println!("{}", controller.snapshot().to_json()?);
        }
        Command::Line {
            quantity,
            rate,
            discount,
            tax,
        } => {
            let breakdown = LineBreakdown::compute(
                to_number_str(&quantity, DEFAULT_QUANTITY),
                to_number_str(&rate, Decimal::ZERO),
                to_number_str(&discount, Decimal::ZERO),
                parse_percentage_str(&tax),
            );
            print!("{}", render_breakdown(&breakdown));
        }
        Command::Config { init } => {
            let config = SyncConfig::load(cli.config.clone())?;
            if init {
                config.save(cli.config)?;
            }
            print!("{}", config.to_toml()?);
        }
    }

    Ok(())
}

/// Initializes the tracing subscriber on stderr.
fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn,tally=info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn read_record(path: &Path) -> anyhow::Result<Value> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("parsing {}", path.display()))
}

/// Loads a record into an immediate-mode controller using the configured
/// tolerance. There is no one typing, so nothing is debounced.
fn load_controller(
    path: &Path,
    kind: DocumentKind,
    config_path: Option<PathBuf>,
) -> anyhow::Result<SyncController> {
    let record = read_record(path)?;
    let document = normalize_document(&record, kind);
    info!(path = %path.display(), %kind, lines = document.lines().len(), "Document loaded");

    let config = SyncConfig::load_or_default(config_path);
    let controller_config = ControllerConfig {
        mode: SyncMode::Immediate,
        ..ControllerConfig::from(&config)
    };
    Ok(SyncController::new(document, controller_config))
}

fn render_totals(totals: &DocumentTotals) -> String {
    let rows = [
        ("Subtotal", totals.subtotal),
        ("Discount", totals.discount_amount),
        ("Taxable", totals.taxable_amount),
        ("Tax", totals.tax_amount),
        ("Adjustment", totals.adjustment),
        ("Round off", totals.round_off),
        ("Grand total", totals.grand_total),
    ];
    rows.iter()
        .map(|(label, value)| format!("{:<12}{:>14}\n", label, value))
        .collect()
}

fn render_breakdown(b: &LineBreakdown) -> String {
    let rows = [
        ("Base", b.base),
        ("Discount", b.discount),
        ("After disc.", b.after_discount),
        ("Line tax", b.line_tax),
        ("Amount", b.amount),
    ];
    rows.iter()
        .map(|(label, value)| format!("{:<12}{:>14}\n", label, value))
        .collect()
}
