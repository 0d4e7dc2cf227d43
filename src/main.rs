use clap::Parser;
use log::{error, info, warn};
use simple_logger::init_with_level;

use mhcii_affinity::{ranking, Dataset};

use std::error::Error;
use std::io::{self, Write};

mod cli;
mod report;

use cli::Args;

fn run(args: &Args) -> Result<(), Box<dyn Error>> {
    let proteins = args.proteins()?;

    let mut data = Dataset::new();
    for protein in &proteins {
        data.load(&args.dir, protein.clone())?;
    }
    if !data.failures.is_empty() {
        warn!("{} result files were only partially read", data.failures.len());
    }

    let entries = proteins
        .iter()
        .filter_map(|p| data.get(&p.name))
        .collect::<Vec<_>>();
    let mut out = io::stdout().lock();

    if args.top {
        writeln!(out, "{}", report::EPITOPE_HEADER)?;
        for entry in &entries {
            match ranking::strongest_epitope(&entry.table) {
                Some(hit) => writeln!(out, "{}", report::epitope_row(&entry.protein, &hit)?)?,
                None => warn!("No predictions for {}", entry.protein.name),
            }
        }
    }

    if args.weakest {
        writeln!(out, "{}", report::EPITOPE_HEADER)?;
        for entry in &entries {
            match ranking::weakest_epitope(&entry.table) {
                Some(hit) => writeln!(out, "{}", report::epitope_row(&entry.protein, &hit)?)?,
                None => warn!("No predictions for {}", entry.protein.name),
            }
        }
    }

    if args.strongly_binding {
        writeln!(out, "{}", report::STRONG_TITLE)?;
        writeln!(out, "{}", report::BINDER_HEADER)?;
        for entry in &entries {
            let ranks =
                ranking::top_by_strong_binders(&entry.table, entry.protein.length, args.best);
            write!(out, "{}", report::binder_block(&entry.protein, &ranks, false)?)?;
        }
    }

    if args.both_weak_and_strong {
        writeln!(out, "{}", report::TOTAL_TITLE)?;
        writeln!(out, "{}", report::BINDER_HEADER)?;
        for entry in &entries {
            let ranks =
                ranking::top_by_total_binders(&entry.table, entry.protein.length, args.best);
            write!(out, "{}", report::binder_block(&entry.protein, &ranks, true)?)?;
        }
    }

    #[cfg(feature = "serialization")]
    if args.json {
        writeln!(out, "{}", serde_json::to_string_pretty(&data)?)?;
    }

    Ok(())
}

fn main() {
    let start = std::time::Instant::now();

    let args = Args::parse();

    if let Err(err) = init_with_level(args.level) {
        eprintln!("Could not initialise logging: {}", err);
    }

    if let Err(err) = run(&args) {
        error!("{}", err);
        std::process::exit(1);
    }

    let elapsed = start.elapsed();
    info!("Elapsed time: {:.3?}", elapsed);
}
