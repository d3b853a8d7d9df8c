//! Swatch CLI Binary
//!
//! Operator interface to a swatch snapshot store: list saved designs,
//! inspect a composed theme, and delete snapshots.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;
use owo_colors::OwoColorize;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use swatch::compose::CompositionEngine;
use swatch::config::SwatchConfig;
use swatch::design::Design;
use swatch::dsl::JsonDslCompiler;
use swatch::logging::init_logging;
use swatch::persist::{LoadOptions, PersistenceEngine};
use swatch::store::SledSnapshotStore;
use swatch::template::InMemoryTemplateRegistry;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "swatch", about = "Inspect and manage saved theme designs", version)]
struct Cli {
    /// Path to the snapshot store (overrides config)
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    /// Path to a TOML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List saved designs
    List,
    /// Show a design's composed theme for a scheme
    Show {
        id: String,
        /// Color scheme to compose (defaults to the design's saved scheme)
        #[arg(long)]
        scheme: Option<String>,
    },
    /// List the schemes a design carries edits for
    Schemes { id: String },
    /// Delete a saved design
    Delete { id: String },
}

fn main() {
    let cli = Cli::parse();

    let config = match SwatchConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = init_logging(Some(&config.logging)) {
        eprintln!("Failed to initialize logging: {}", e);
        process::exit(1);
    }

    let store_path = cli.store.unwrap_or(config.storage.store_path);
    info!(store = %store_path.display(), "swatch CLI starting");

    match run(&cli.command, &store_path) {
        Ok(output) => {
            println!("{}", output);
        }
        Err(e) => {
            error!("Command failed: {:#}", e);
            eprintln!("Error: {:#}", e);
            process::exit(1);
        }
    }
}

fn run(command: &Command, store_path: &PathBuf) -> Result<String> {
    let store =
        SledSnapshotStore::open(store_path).context("Failed to open snapshot store")?;
    let mut engine = PersistenceEngine::builder()
        .store(Arc::new(store))
        .templates(Arc::new(InMemoryTemplateRegistry::new()))
        .build()
        .context("Failed to initialize persistence engine")?;

    match command {
        Command::List => {
            engine.refresh_collection()?;
            Ok(format_collection(&engine))
        }
        Command::Show { id, scheme } => {
            let mut design = Design::load_new(&JsonDslCompiler, None, None)?;
            let warnings = engine
                .load(&mut design, id, LoadOptions::default())
                .with_context(|| format!("Failed to load snapshot {}", id))?;

            let scheme = scheme
                .clone()
                .unwrap_or_else(|| design.active_scheme().to_string());
            let composer = CompositionEngine::new(Arc::new(JsonDslCompiler));
            let composed = composer.compose(&design, &scheme);

            let mut out = String::new();
            out.push_str(&format!(
                "{}\n\n",
                format!("{} ({})", design.title(), scheme).bold().underline()
            ));
            for warning in &warnings {
                out.push_str(&format!("{} {:?}\n", "warning:".yellow(), warning));
            }
            out.push_str(&serde_json::to_string_pretty(composed.as_ref())?);
            Ok(out)
        }
        Command::Schemes { id } => {
            let mut design = Design::load_new(&JsonDslCompiler, None, None)?;
            engine
                .load(&mut design, id, LoadOptions::default())
                .with_context(|| format!("Failed to load snapshot {}", id))?;

            let mut out = format!("{}\n\n", "Schemes".bold().underline());
            out.push_str(&format!("  Active: {}\n", design.active_scheme()));
            if design.scheme_edits().is_empty() {
                out.push_str("  No scheme-scoped edits.\n");
            } else {
                for (scheme, edits) in design.scheme_edits() {
                    out.push_str(&format!("  {}: {} edits\n", scheme, edits.len()));
                }
            }
            Ok(out)
        }
        Command::Delete { id } => {
            if engine.delete(id)? {
                Ok(format!("Deleted snapshot {}", id))
            } else {
                Ok(format!("No snapshot with id {}", id))
            }
        }
    }
}

fn format_collection(engine: &PersistenceEngine) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\n\n", "Saved designs".bold().underline()));
    if engine.collection().is_empty() {
        out.push_str("No saved designs.\n");
        return out;
    }
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Id", "Title", "Updated", "Edits", "Code"]);
    for summary in engine.collection() {
        table.add_row(vec![
            summary.id.clone(),
            summary.title.clone(),
            summary.updated_at.format("%Y-%m-%d %H:%M").to_string(),
            summary.edit_count.to_string(),
            if summary.has_code_overrides { "yes" } else { "no" }.to_string(),
        ]);
    }
    out.push_str(&format!("{}\n", table));
    out.push_str(&format!("Total: {} designs.\n", engine.collection().len()));
    out
}
