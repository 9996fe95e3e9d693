//! CLI tool for xltemplate - reads and fills tables of XLSX templates
//!
//! Usage:
//!   xltemplate_cli read <input.xlsx> --sheet Sheet1 --spec table.json
//!   xltemplate_cli write <input.xlsx> --sheet Sheet1 --spec table.json \
//!       --data rows.json -o out.xlsx
//!
//! Set `RUST_LOG=xltemplate=debug` to trace marker resolution and space
//! adjustment.

use clap::{Parser, Subcommand};
use serde_json::Value;
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use xltemplate::{TableSpec, Template};

#[derive(Parser)]
#[command(name = "xltemplate_cli")]
#[command(version)]
#[command(about = "Read and fill marked tables in XLSX templates", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the records of a table as a JSON array
    Read {
        /// Input workbook
        input: PathBuf,

        /// Worksheet holding the table
        #[arg(short, long)]
        sheet: String,

        /// JSON table description (marker, fields, options)
        #[arg(long)]
        spec: PathBuf,

        /// Pretty print the output
        #[arg(short, long)]
        pretty: bool,
    },

    /// Replace the records of a table and save the workbook
    Write {
        /// Input workbook
        input: PathBuf,

        /// Worksheet holding the table
        #[arg(short, long)]
        sheet: String,

        /// JSON table description (marker, fields, options)
        #[arg(long)]
        spec: PathBuf,

        /// JSON array of objects keyed by field name
        #[arg(short, long)]
        data: PathBuf,

        /// Output workbook
        #[arg(short, long)]
        output: PathBuf,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Read {
            input,
            sheet,
            spec,
            pretty,
        } => {
            let spec = TableSpec::from_json(&fs::read_to_string(spec)?)?;
            let mut template = Template::from_file(&input)?;
            let mut grid = template.worksheet_untracked(&sheet)?;
            let mut table = spec.open(&mut grid)?;
            table.read();
            let records: Vec<Value> = table.records_as()?;

            let json = if pretty {
                serde_json::to_string_pretty(&records)?
            } else {
                serde_json::to_string(&records)?
            };
            let mut stdout = io::stdout().lock();
            stdout.write_all(json.as_bytes())?;
            writeln!(stdout)?;
        }
        Commands::Write {
            input,
            sheet,
            spec,
            data,
            output,
        } => {
            let spec = TableSpec::from_json(&fs::read_to_string(spec)?)?;
            let rows: Vec<Value> = serde_json::from_str(&fs::read_to_string(data)?)?;
            let mut template = Template::from_file(&input)?;
            {
                let mut grid = template.worksheet_mut(&sheet)?;
                let mut table = spec.open(&mut grid)?;
                table.read();
                table.set_records_from(&rows)?;
                table.write()?;
            }
            template.save_to(&output)?;
            eprintln!("Written {} records to {}", rows.len(), output.display());
        }
    }
    Ok(())
}
