//! `ccsdspy-split` — split a raw CCSDS Space Packet stream into one file
//! per APID found in it.
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use ccsds_telemetry::diagnostics::Diagnostics;
use ccsds_telemetry::iter::split_by_apid;

#[derive(Parser, Debug)]
#[command(name = "ccsdspy-split", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Verbosity of log output (repeat for more).
    #[arg(short, long, global = true, default_value_t = 0)]
    verbose: u8,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Split a packet stream into one `apid{N:05}.tlm` file per APID.
    Split {
        /// Path to the raw packet stream file.
        file: PathBuf,

        /// Restrict the expected APIDs to these comma-separated values;
        /// packets with any other APID are still written to their own
        /// `apid{N:05}.tlm` file, only logged as a warning.
        #[arg(long, value_delimiter = ',')]
        valid_apids: Option<Vec<u16>>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(match cli.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            _ => log::LevelFilter::Debug,
        })
        .init();

    match cli.command {
        Command::Split { file, valid_apids } => run_split(&file, valid_apids.as_deref()),
    }
}

fn run_split(file: &PathBuf, valid_apids: Option<&[u16]>) -> ExitCode {
    let data = match fs::read(file) {
        Ok(data) => data,
        Err(err) => {
            eprintln!("error: could not read '{}': {err}", file.display());
            return ExitCode::FAILURE;
        }
    };

    let mut diagnostics = Diagnostics::new();
    let by_apid = match split_by_apid(&data, valid_apids, &mut diagnostics) {
        Ok(by_apid) => by_apid,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::FAILURE;
        }
    };

    for warning in diagnostics.warnings() {
        log::warn!("{warning}");
    }

    for (apid, bytes) in &by_apid {
        let out_name = format!("apid{apid:05}.tlm");
        if let Err(err) = fs::write(&out_name, bytes) {
            eprintln!("error: could not write '{out_name}': {err}");
            return ExitCode::FAILURE;
        }
        log::info!("wrote {} byte(s) to {out_name}", bytes.len());
    }

    println!("split {} packet stream(s) across {} APID(s)", file.display(), by_apid.len());
    ExitCode::SUCCESS
}
