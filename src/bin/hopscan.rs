//! Binary entry point for the `hopscan` traversal CLI.
#![forbid(unsafe_code)]

use std::error::Error;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use hopscan::cli::import_export::{
    load_edges, load_rows, parse_start_ids, row_to_json, EdgeImportConfig, RowImportConfig,
};
use hopscan::{Condition, MemoryStore, RowBatch, TagId, TraverseExec, TraverseOptions, VecSource};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "hopscan",
    version,
    about = "Multi-hop traversal over a graph loaded from CSV"
)]
struct Cli {
    #[arg(long, value_name = "FILE", help = "CSV file with src,type,dst columns")]
    edges: PathBuf,

    #[arg(
        long,
        value_name = "FILE",
        help = "CSV file with an id column plus row values"
    )]
    rows: PathBuf,

    #[arg(long, value_name = "ID,ID", help = "Comma-separated starting vertex ids")]
    start: String,

    #[arg(
        long = "hop",
        value_name = "TYPE:DIR",
        help = "Hop condition, repeatable (e.g. 7:out)"
    )]
    hops: Vec<Condition>,

    #[arg(long, env = "HOPSCAN_WORKERS", help = "Worker pool size")]
    workers: Option<usize>,

    #[arg(long, help = "Starting vertices pulled per upstream batch")]
    batch_size: Option<usize>,

    #[arg(long, help = "Row tag to store and materialize")]
    tag: Option<i64>,

    #[arg(long, value_name = "FILE", help = "TOML file with traversal options")]
    config: Option<PathBuf>,
}

fn main() {
    init_tracing();
    if let Err(err) = run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("hopscan=info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_ansi(false)
        .try_init();
}

/// Config file first, then command-line overrides.
fn build_options(cli: &Cli) -> Result<TraverseOptions, Box<dyn Error>> {
    let mut options = match &cli.config {
        Some(path) => TraverseOptions::load(path)?,
        None => TraverseOptions::default(),
    };
    if !cli.hops.is_empty() {
        options.chain = cli.hops.clone();
    }
    if let Some(workers) = cli.workers {
        options = options.workers(workers);
    }
    if let Some(rows) = cli.batch_size {
        options = options.batch_size(rows);
    }
    if let Some(tag) = cli.tag {
        options = options.result_tag(TagId(tag));
    }
    Ok(options)
}

fn run() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let options = build_options(&cli)?;
    let start = parse_start_ids(&cli.start)?;

    let store = MemoryStore::new();
    load_edges(&store, &EdgeImportConfig::new(&cli.edges))?;
    let layout = load_rows(&store, &RowImportConfig::new(&cli.rows, options.result_tag))?;
    let names = layout.names;

    let batch_capacity = options.batch_size;
    let mut exec = TraverseExec::new(
        Box::new(VecSource::from_ints(start)),
        Arc::new(store),
        Arc::new(layout.codec),
        options,
    )?;
    exec.open()?;

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let mut batch = RowBatch::new(batch_capacity);
    let mut emitted = 0usize;
    let result = loop {
        if let Err(err) = exec.next(&mut batch) {
            break Err(err.into());
        }
        if batch.is_empty() {
            break Ok(());
        }
        if let Err(err) = write_batch(&mut out, &names, &batch) {
            break Err(err);
        }
        emitted += batch.len();
    };
    exec.close()?;
    out.flush()?;
    result?;
    info!(rows = emitted, "hopscan.done");
    Ok(())
}

fn write_batch(
    out: &mut impl Write,
    names: &[String],
    batch: &RowBatch,
) -> Result<(), Box<dyn Error>> {
    for row in batch.rows() {
        serde_json::to_writer(&mut *out, &row_to_json(names, row)?)?;
        out.write_all(b"\n")?;
    }
    Ok(())
}
