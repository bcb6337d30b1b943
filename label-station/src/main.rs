//! Label station - preview and print inventory labels from the command line

mod config;
mod logger;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use label_printer::{
    InventoryItem, LabelService, LayoutEngine, PrintDispatchQueue, Variant, connect_printer,
};
use serde::Deserialize;

use config::Config;

#[derive(Debug, Parser)]
#[command(name = "label-station", version, about = "Inventory label printing")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Render one label to a PNG file
    Preview {
        #[arg(long)]
        id: String,
        #[arg(long)]
        name: String,
        /// qr, barcode, text or text_2_lines
        #[arg(long, env = "LABEL_VARIANT", default_value = "qr")]
        variant: String,
        #[arg(short, long, default_value = "label.png")]
        output: PathBuf,
    },
    /// Print one label
    Print {
        #[arg(long)]
        id: String,
        #[arg(long)]
        name: String,
        #[arg(long, env = "LABEL_VARIANT", default_value = "qr")]
        variant: String,
        #[arg(short, long, default_value_t = 1)]
        copies: u32,
    },
    /// Print every record of a JSON array of `{"id", "name"}` objects
    Batch {
        path: PathBuf,
        #[arg(long, env = "LABEL_VARIANT", default_value = "qr")]
        variant: String,
        #[arg(short, long, default_value_t = 1)]
        copies: u32,
    },
}

#[derive(Debug, Deserialize)]
struct BatchRecord {
    #[serde(default)]
    id: String,
    #[serde(default)]
    name: String,
}

fn parse_batch(json: &str) -> Result<Vec<InventoryItem>> {
    let records: Vec<BatchRecord> = serde_json::from_str(json).context("Invalid batch file")?;
    Ok(records
        .iter()
        .map(|r| InventoryItem::from_input(&r.id, &r.name))
        .collect())
}

async fn load_batch(path: &Path) -> Result<Vec<InventoryItem>> {
    let json = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    parse_batch(&json)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let config = Config::from_env();
    logger::init_logger(Some(&config.log_level), config.log_dir.as_deref());

    let cli = Cli::parse();

    let geometry = config.geometry();
    let engine = Arc::new(
        LayoutEngine::new(geometry, config.layout_options()).context("Failed to load fonts")?,
    );

    let (items, variant, copies) = match cli.command {
        Command::Preview {
            id,
            name,
            variant,
            output,
        } => {
            let variant: Variant = variant.parse()?;
            let item = InventoryItem::from_input(&id, &name);
            let label = engine.mount(&engine.render(&item, variant));
            let png = label.to_png()?;
            tokio::fs::write(&output, png)
                .await
                .with_context(|| format!("Failed to write {}", output.display()))?;
            tracing::info!(path = %output.display(), "Preview written");
            return Ok(());
        }
        Command::Print {
            id,
            name,
            variant,
            copies,
        } => (vec![InventoryItem::from_input(&id, &name)], variant, copies),
        Command::Batch {
            path,
            variant,
            copies,
        } => (load_batch(&path).await?, variant, copies),
    };
    let variant: Variant = variant.parse()?;

    let printer = connect_printer(&config.printer_config(), geometry.dpi)?;
    let queue = PrintDispatchQueue::new(printer, config.queue_config())?;
    let service = LabelService::new(engine, queue, config.submit_limits());

    let mut accepted = 0;
    for item in &items {
        match service.submit(item, variant, copies) {
            Ok(submission) => accepted += submission.copies(),
            Err(e) if e.is_rejection() => {
                service.shutdown().await;
                bail!("Request rejected: {}", e);
            }
            Err(e) => return Err(e.into()),
        }
    }
    tracing::info!(labels = accepted, "Waiting for printer");

    tokio::select! {
        _ = service.wait_idle() => {}
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!("Interrupted, finishing current label");
        }
    }
    service.shutdown().await;

    let stats = service.queue_stats();
    tracing::info!(
        printed = stats.printed,
        dropped_fatal = stats.dropped_fatal,
        dropped_exhausted = stats.dropped_exhausted,
        pending = stats.pending,
        "Done"
    );
    if stats.printed < accepted as u64 {
        bail!(
            "{} of {} labels were not printed",
            accepted as u64 - stats.printed,
            accepted
        );
    }
    Ok(())
}
