//! Depscope CLI - Command-line interface for depscope
//!
//! Commands:
//! - analyze: Run the full analysis over an event log (batch mode)
//! - validate: Validate raw event schema
//! - schema: Print schema information

use clap::{Parser, Subcommand};
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::ExitCode;

use depscope::pipeline::DepscopeAnalyzer;
use depscope::schema::{RawEvent, SCHEMA_VERSION};
use depscope::{DEPSCOPE_VERSION, PRODUCER_NAME};

/// Depscope - Decision-provenance engine for AI agent dependency adoption
#[derive(Parser)]
#[command(name = "depscope")]
#[command(version = DEPSCOPE_VERSION)]
#[command(about = "Analyze how AI coding agents choose dependencies", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full analysis over an event log (batch mode)
    Analyze {
        /// Input file path with a JSON array of events (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Pretty-print the report
        #[arg(long)]
        pretty: bool,
    },

    /// Validate raw event schema
    Validate {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Print schema information
    Schema,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("{PRODUCER_NAME}: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), String> {
    match cli.command {
        Commands::Analyze { input, pretty } => {
            let events = read_events(&input)?;
            let analyzer = DepscopeAnalyzer::new().map_err(|e| e.to_string())?;
            let report = analyzer.analyze(&events);
            let json = if pretty {
                serde_json::to_string_pretty(&report).map_err(|e| e.to_string())?
            } else {
                analyzer.encode_to_json(&report).map_err(|e| e.to_string())?
            };
            println!("{json}");
            Ok(())
        }
        Commands::Validate { input } => {
            let events = read_events(&input)?;
            println!("{} events valid against {}", events.len(), SCHEMA_VERSION);
            Ok(())
        }
        Commands::Schema => {
            println!("schema version: {SCHEMA_VERSION}");
            println!("producer: {PRODUCER_NAME} {DEPSCOPE_VERSION}");
            Ok(())
        }
    }
}

fn read_events(path: &PathBuf) -> Result<Vec<RawEvent>, String> {
    let contents = if path.as_os_str() == "-" {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .map_err(|e| format!("failed to read stdin: {e}"))?;
        buffer
    } else {
        fs::read_to_string(path)
            .map_err(|e| format!("failed to read {}: {e}", path.display()))?
    };
    serde_json::from_str(&contents).map_err(|e| format!("invalid event JSON: {e}"))
}
