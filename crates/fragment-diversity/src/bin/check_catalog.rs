use std::error::Error;
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use clap::Parser;
use common::io::read_catalog;
use fragment_catalog::{find_duplicates, DEFAULT_SEARCH_BUDGET};
use tracing::{info, Level};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::FmtSubscriber;

/// Verify that no two fragments of a written catalog are isomorphic.
#[derive(Debug, Parser)]
struct Cli {
    #[arg(long)]
    input: PathBuf,
    #[arg(long, default_value_t = DEFAULT_SEARCH_BUDGET)]
    search_budget: u64,
    #[arg(long)]
    log_level: Option<Level>,
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    if let Some(level) = cli.log_level {
        FmtSubscriber::builder().with_max_level(level).with_writer(std::io::stderr).finish().init();
    }

    let record = read_catalog(BufReader::new(File::open(&cli.input)?))?;
    let (_, graphs) = record.to_graphs()?;
    let total: u64 = record.fragments.iter().map(|f| f.count).sum();
    info!(fragments = graphs.len(), occurrences = total);

    let duplicates = find_duplicates(&graphs, cli.search_budget);
    for &(i, j) in &duplicates {
        let (a, b) = (&record.fragments[i], &record.fragments[j]);
        println!("fragments {i} ({}) and {j} ({}) are isomorphic", a.first_seen_batch, b.first_seen_batch);
    }

    if !duplicates.is_empty() {
        return Err(format!("{} duplicate pairs in {}", duplicates.len(), cli.input.display()).into());
    }
    println!("{} fragments, {} occurrences, no duplicates", graphs.len(), total);
    Ok(())
}
