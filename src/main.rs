//! xlsx-table CLI — create, read and update a demonstration XLSX table.

use std::fs::File;
use std::io::Write as _;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use log::{Level, LevelFilter, Log, Metadata, Record};

use xlsx_table_rs::{RunConfig, TableError, ops};

#[derive(Parser)]
#[command(name = "xlsx-table")]
#[command(version, about = "Create, read and update a demonstration XLSX table")]
struct Cli {
    /// Write debug logging to xlsx-table.log
    #[arg(short, long, global = true)]
    debug: bool,

    /// Go through the motions without touching the file
    #[arg(long, global = true)]
    dry_run: bool,

    /// Path of the workbook to operate on
    #[arg(short, long, global = true, default_value = "example.xlsx")]
    file: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the workbook with the demonstration table
    Write,
    /// Print every row of an existing workbook
    Read,
    /// Append one row and change the second data row's city
    Update,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    if cli.debug {
        init_debug_log()?;
    }

    let cfg = RunConfig {
        path: cli.file,
        dry_run: cli.dry_run,
    };

    match cli.command {
        Commands::Write => write_table(&cfg),
        Commands::Read => read_table(&cfg),
        Commands::Update => update_table(&cfg),
    }
}

fn write_table(cfg: &RunConfig) -> Result<()> {
    ops::create(cfg).with_context(|| format!("failed to write '{}'", cfg.path.display()))?;
    if cfg.dry_run {
        println!("dry run: no file written");
    } else {
        println!("created '{}'", cfg.path.display());
    }
    Ok(())
}

fn read_table(cfg: &RunConfig) -> Result<()> {
    let rows = match ops::load(cfg) {
        Ok(rows) => rows,
        Err(TableError::NotFound(path)) => {
            eprintln!(
                "'{}' not found - run the write command first",
                path.display()
            );
            return Ok(());
        }
        Err(e) => return Err(e).context("failed to open workbook"),
    };

    let mut data_rows = 0usize;
    for (i, row) in rows.enumerate() {
        let row = row.with_context(|| format!("failed to read row {}", i + 1))?;
        if i > 0 {
            data_rows += 1;
        }
        let cells: Vec<String> = row.iter().map(|c| c.to_string()).collect();
        println!("{}", cells.join(" | "));
    }
    println!("{data_rows} data rows");
    Ok(())
}

fn update_table(cfg: &RunConfig) -> Result<()> {
    match ops::append_and_mutate(cfg) {
        Ok(()) => {
            if cfg.dry_run {
                println!("dry run: file left untouched");
            } else {
                println!("updated '{}'", cfg.path.display());
            }
            Ok(())
        }
        Err(TableError::NotFound(path)) => {
            eprintln!(
                "'{}' not found - run the write command first",
                path.display()
            );
            Ok(())
        }
        Err(e) => Err(e).context("failed to update workbook"),
    }
}

const LOG_FILE: &str = "xlsx-table.log";

/// Timestamped file sink behind the `log` facade, installed by `--debug`.
struct FileLogger {
    sink: Mutex<File>,
}

impl Log for FileLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= Level::Debug
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        if let Ok(mut sink) = self.sink.lock() {
            let _ = writeln!(
                sink,
                "{} {:5} {} - {}",
                Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.target(),
                record.args()
            );
        }
    }

    fn flush(&self) {
        if let Ok(mut sink) = self.sink.lock() {
            let _ = sink.flush();
        }
    }
}

fn init_debug_log() -> Result<()> {
    let sink = File::create(LOG_FILE).with_context(|| format!("failed to create '{LOG_FILE}'"))?;
    log::set_boxed_logger(Box::new(FileLogger {
        sink: Mutex::new(sink),
    }))
    .context("logger already installed")?;
    log::set_max_level(LevelFilter::Debug);
    Ok(())
}
