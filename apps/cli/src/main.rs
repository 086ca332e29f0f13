// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `citydb-import` - store a CityGML model (JSON document model) as
//! relational rows.
//!
//! ```text
//! citydb-import city.json --output out/ --workers 8 --report report.json
//! ```
//!
//! Without `--output` the import is a dry run into memory that prints the
//! per-table row counts.

mod sink;

use anyhow::{Context, Result};
use citydb_lite_core::CityModel;
use citydb_lite_importer::{ImportSummary, Importer, ImporterConfig, ImporterKind, MemorySink};
use clap::Parser;
use sink::JsonLinesSink;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "citydb-import", version, about = "Import a CityGML model into relational tables")]
struct Args {
    /// City model as JSON.
    input: PathBuf,

    /// Directory for the `<table>.jsonl` files. Dry run if omitted.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Importer configuration as JSON. `CITYDB_*` variables apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Rows buffered per table before a flush.
    #[arg(long)]
    batch_size: Option<usize>,

    /// Reference resolver threads.
    #[arg(short, long)]
    workers: Option<usize>,

    /// Skip appearances and texture parameters.
    #[arg(long)]
    no_appearance: bool,

    /// Log as JSON instead of human-readable text.
    #[arg(long, env = "CITYDB_JSON_LOGS")]
    json_logs: bool,

    /// Write the import summary and diagnostics to this file.
    #[arg(long)]
    report: Option<PathBuf>,
}

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,citydb_lite_importer=debug"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.pretty().init();
    }
}

fn load_config(args: &Args) -> Result<ImporterConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
            serde_json::from_reader(BufReader::new(file))
                .with_context(|| format!("parsing {}", path.display()))?
        }
        None => ImporterConfig::from_env(),
    };
    if let Some(batch_size) = args.batch_size {
        config.batch_size = batch_size;
    }
    if let Some(workers) = args.workers {
        config.xlink_workers = workers;
    }
    if args.no_appearance {
        config.import_appearance = false;
    }
    config.validate()?;
    Ok(config)
}

fn load_model(path: &Path) -> Result<CityModel> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let model = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("parsing {}", path.display()))?;
    Ok(model)
}

fn write_report(path: &Path, summary: &ImportSummary) -> Result<()> {
    let json = serde_json::to_string_pretty(summary)?;
    fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.json_logs);

    let config = load_config(&args)?;
    let model = load_model(&args.input)?;
    tracing::info!(
        input = %args.input.display(),
        features = model.features.len(),
        appearances = model.appearances.len(),
        "model loaded"
    );

    let summary = match &args.output {
        Some(dir) => {
            let sink = Arc::new(
                JsonLinesSink::create(dir).with_context(|| format!("creating {}", dir.display()))?,
            );
            let summary = Importer::new(config, sink.clone())?.import_model(&model)?;
            sink.close().context("flushing output files")?;
            summary
        }
        None => {
            let sink = Arc::new(MemorySink::new());
            let summary = Importer::new(config, sink.clone())?.import_model(&model)?;
            for kind in ImporterKind::ALL {
                let rows = sink.count(kind);
                if rows > 0 {
                    println!("{:<28} {rows:>8}", kind.table());
                }
            }
            summary
        }
    };

    for diagnostic in &summary.diagnostics {
        tracing::warn!(
            kind = diagnostic.kind.as_str(),
            feature = diagnostic.feature.as_deref().unwrap_or("-"),
            path = diagnostic.path.as_deref().unwrap_or("-"),
            "{}",
            diagnostic.message
        );
    }
    if let Some(path) = &args.report {
        write_report(path, &summary)?;
    }

    tracing::info!(
        features = summary.features,
        rows = summary.rows_written,
        unresolved = summary.resolver.unresolved,
        diagnostics = summary.diagnostics.len(),
        "done"
    );
    Ok(())
}
