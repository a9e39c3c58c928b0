use std::error::Error;
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

use clap::Parser;
use common::batches::{discover_batches, month_range};
use common::io::{read_manifest, write_batch_results, write_catalog, CatalogRecord, OutputFormat};
use fragment_catalog::{BatchDriver, DriverOptions, FileSystem, DEFAULT_SEARCH_BUDGET};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, Level};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::FmtSubscriber;

/// Count novel and recurring fragment shapes over time-ordered batches of decomposition logs.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// JSON list of batches `[{"label": ..., "files": [...]}]`.
    #[arg(long, conflicts_with = "input_dir", required_unless_present = "input_dir")]
    manifest: Option<PathBuf>,
    /// Directory of logs named `YYYY-MM_<id>.txt`.
    #[arg(long)]
    input_dir: Option<PathBuf>,
    #[arg(long, default_value_t = 2020)]
    from_year: u16,
    #[arg(long, default_value_t = 2020)]
    to_year: u16,
    #[arg(long)]
    max_files_per_batch: Option<usize>,
    #[arg(long)]
    catalog_out: Option<PathBuf>,
    #[arg(long)]
    batches_out: Option<PathBuf>,
    #[arg(long, value_enum, default_value_t = OutputFormat::JsonLines)]
    batches_format: OutputFormat,
    #[arg(long, default_value_t = DEFAULT_SEARCH_BUDGET)]
    search_budget: u64,
    /// Read and parse logs on the current thread only.
    #[arg(long)]
    sequential: bool,
    #[arg(long)]
    log_level: Option<Level>,
    #[arg(long)]
    log_json: bool,
    #[arg(long)]
    progress: bool,
}

fn init_logging(level: Option<Level>, json: bool) {
    let Some(level) = level else { return };
    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_span_events(FmtSpan::CLOSE)
        .with_writer(std::io::stderr);
    if json {
        builder.json().finish().init();
    } else {
        builder.finish().init();
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_logging(cli.log_level, cli.log_json);

    let batches = match (&cli.manifest, &cli.input_dir) {
        (Some(manifest), _) => read_manifest(manifest)?,
        (None, Some(dir)) => {
            if cli.to_year < cli.from_year {
                return Err(format!("--to-year {} is before --from-year {}", cli.to_year, cli.from_year).into());
            }
            discover_batches(dir, &month_range(cli.from_year, cli.to_year), cli.max_files_per_batch)?
        }
        (None, None) => return Err("either --manifest or --input-dir is required".into()),
    };
    info!(batches = batches.len(), files = batches.iter().map(|b| b.files.len()).sum::<usize>());

    let options =
        DriverOptions { parallel_parse: !cli.sequential, search_budget: cli.search_budget, ..Default::default() };
    let mut driver = BatchDriver::new(FileSystem, options);

    let pb = if cli.progress { ProgressBar::new(batches.len() as u64) } else { ProgressBar::hidden() };
    pb.set_style(ProgressStyle::with_template(
        "[batches] [{elapsed_precise}] {wide_bar:.green/white} {pos}/{len} {msg}",
    )?);

    let mut results = Vec::with_capacity(batches.len());
    for batch in &batches {
        pb.set_message(batch.label.clone());
        let result = driver.process_batch(batch);
        pb.suspend(|| {
            println!(
                "{:<10} files {:6}  candidates {:8}  novel {:7}  recurrences {:8}  catalog {:7}",
                result.batch_label,
                result.files_read,
                result.candidates_processed,
                result.novel_count,
                result.recurrence_count,
                driver.catalog().len(),
            )
        });
        results.push(result);
        pb.inc(1);
    }
    pb.finish_and_clear();

    let stats = driver.catalog().stats();
    info!(
        catalog_size = driver.catalog().len(),
        buckets = driver.catalog().bucket_count(),
        comparisons = stats.comparisons,
        full_searches = stats.full_searches,
        budget_exceeded = stats.budget_exceeded,
    );

    if let Some(path) = &cli.batches_out {
        write_batch_results(BufWriter::new(File::create(path)?), &results, cli.batches_format)?;
    }
    if let Some(path) = &cli.catalog_out {
        let record = CatalogRecord::new(driver.catalog(), driver.colors())?;
        write_catalog(BufWriter::new(File::create(path)?), &record)?;
    }
    Ok(())
}
