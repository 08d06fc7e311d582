//! Rewind CLI

use std::path::{Path, PathBuf};
use std::process;

use anyhow::{bail, Context};
use tracing_subscriber::EnvFilter;

use rewind::{DiskCacheRecall, DiskQueueReplay, Message, Predicate, Recall, Replay, Request};

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        usage();
        process::exit(1);
    }

    if let Err(e) = run(&args[1], &args[2..]) {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn usage() {
    eprintln!("Rewind v{}", env!("CARGO_PKG_VERSION"));
    eprintln!();
    eprintln!("Usage: rewind <command> [options]");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  requests <dir>                 List recorded requests of a queue");
    eprintln!("  responses <dir>                List recorded responses of a queue");
    eprintln!("  lookup <dir> <request-file>    Recall a cached response");
    eprintln!("  stats <dir>                    Count records in a queue");
    eprintln!();
    eprintln!("Set RUST_LOG=debug for per-record logging.");
}

fn run(command: &str, args: &[String]) -> anyhow::Result<()> {
    match (command, args) {
        ("requests", [dir]) => {
            let replay = DiskQueueReplay::new(existing_dir(dir)?, Predicate::always());
            for request in replay.requests()? {
                println!("{}", request?.start_line());
            }
        }
        ("responses", [dir]) => {
            let replay = DiskQueueReplay::new(existing_dir(dir)?, Predicate::always());
            for response in replay.responses()? {
                println!("{}", response?.start_line());
            }
        }
        ("lookup", [dir, request_file]) => lookup(&existing_dir(dir)?, Path::new(request_file))?,
        ("stats", [dir]) => {
            let dir = existing_dir(dir)?;
            let replay = DiskQueueReplay::new(&dir, Predicate::always());
            let mut records = 0usize;
            let mut unreadable = 0usize;
            for record in replay.records()? {
                match record {
                    Ok(_) => records += 1,
                    Err(_) => unreadable += 1,
                }
            }

            println!("Recording directory: {}", dir.display());
            println!("Records:             {records}");
            println!("Unreadable:          {unreadable}");
        }
        ("requests" | "responses" | "lookup" | "stats", _) => {
            usage();
            bail!("wrong number of arguments for '{command}'");
        }
        _ => {
            usage();
            bail!("unknown command: {command}");
        }
    }

    Ok(())
}

fn existing_dir(dir: &str) -> anyhow::Result<PathBuf> {
    let dir = PathBuf::from(dir);
    if !dir.is_dir() {
        bail!("directory not found: {}", dir.display());
    }
    Ok(dir)
}

fn lookup(dir: &Path, request_file: &Path) -> anyhow::Result<()> {
    let data = std::fs::read(request_file)
        .with_context(|| format!("reading {}", request_file.display()))?;
    let request = Request::parse(&data)
        .with_context(|| format!("parsing {}", request_file.display()))?;

    match DiskCacheRecall::new(dir).get(&request)? {
        Some(response) => println!("{response}"),
        None => {
            eprintln!("No cached response for {}", request.start_line());
            process::exit(2);
        }
    }

    Ok(())
}
