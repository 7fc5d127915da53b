//! CLI front end (external collaborator, spec.md §1/§6): `evtx_dump file1
//! [file2 …]`. Parses each file in sequence and prints `Record <num>`
//! followed by its `key:value` pairs; on the first parser error for a file
//! it prints a diagnostic and exits with status 2.
//!
//! Grounded in the teacher's `src/bin/evtx_dump.rs` (`clap` derive args,
//! `anyhow::Context` error reporting, `simplelog` initialization), trimmed
//! of its JSON/XML output-format switch, thread-count, and record-range
//! filtering surface — this crate emits only the flat key→value mapping
//! spec.md §1 calls for, and the parser itself is single-threaded (§5).

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use log::LevelFilter;

use evtx_binxml::EvtxParser;

#[derive(Parser)]
#[command(name = "evtx_dump", about = "Utility to parse EVTX files")]
struct Cli {
    /// EVTX files to parse, in order.
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn level_filter_for(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

fn init_logging(verbosity: u8) -> Result<()> {
    simplelog::SimpleLogger::init(level_filter_for(verbosity), simplelog::Config::default())
        .with_context(|| "failed to initialize logging")
}

fn dump_file(path: &PathBuf) -> Result<()> {
    let mut parser =
        EvtxParser::from_path(path).with_context(|| format!("failed to open {}", path.display()))?;

    parser
        .parse_file(|record| {
            println!("Record {}", record.record_number);
            let mut pairs: Vec<String> = record
                .values
                .iter()
                .map(|(k, v)| format!("{}:{}", k, v))
                .collect();
            pairs.sort();
            println!("{}", pairs.join(", "));
        })
        .with_context(|| format!("failed while parsing {}", path.display()))?;

    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.verbose) {
        eprintln!("{:?}", e);
    }

    for path in &cli.files {
        if let Err(e) = dump_file(path) {
            eprintln!("{:?}", e);
            return ExitCode::from(2);
        }
    }

    ExitCode::SUCCESS
}
