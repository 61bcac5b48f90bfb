use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::File;
use std::io::{self, BufReader, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use trenddb::{build_report, CsvSource, Ingestor, ReportOptions, StorageEngine};

const DEFAULT_TABLE: &str = "ghibli_image_analysis";

#[derive(Parser, Debug)]
#[command(name = "trenddb")]
#[command(about = "TrendDB - a wide-column analytics store for AI image trend datasets", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load a trend dataset CSV into a freshly created table
    Ingest {
        /// Input CSV file
        #[arg(short, long)]
        input: PathBuf,

        /// Data directory path
        #[arg(long, default_value = "./data")]
        data_dir: PathBuf,

        /// Table name
        #[arg(long, default_value = DEFAULT_TABLE)]
        table: String,
    },
    /// Run the analytic report over an ingested table
    Report {
        /// Data directory path
        #[arg(long, default_value = "./data")]
        data_dir: PathBuf,

        /// Table name
        #[arg(long, default_value = DEFAULT_TABLE)]
        table: String,

        /// Entries per top list
        #[arg(long, default_value_t = 10)]
        top: usize,

        /// Output format
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },
    /// Ingest a CSV and report on it in a single run
    Run {
        /// Input CSV file
        #[arg(short, long)]
        input: PathBuf,

        /// Data directory path
        #[arg(long, default_value = "./data")]
        data_dir: PathBuf,

        /// Table name
        #[arg(long, default_value = DEFAULT_TABLE)]
        table: String,

        /// Entries per top list
        #[arg(long, default_value_t = 10)]
        top: usize,

        /// Output format
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Format {
    Text,
    Json,
}

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "trenddb=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Ingest {
            input,
            data_dir,
            table,
        } => {
            ingest(&input, &data_dir, &table).context("ingest failed")?;
        }
        Command::Report {
            data_dir,
            table,
            top,
            format,
        } => {
            report(&data_dir, &table, top, format).context("report failed")?;
        }
        Command::Run {
            input,
            data_dir,
            table,
            top,
            format,
        } => {
            ingest(&input, &data_dir, &table).context("ingest failed")?;
            report(&data_dir, &table, top, format).context("report failed")?;
        }
    }
    Ok(())
}

fn ingest(input: &Path, data_dir: &Path, table: &str) -> anyhow::Result<()> {
    let engine = StorageEngine::new(data_dir)?;
    if engine.table_exists(table) {
        tracing::info!("Dropping existing table '{}'", table);
        engine.drop_table(table)?;
    }
    engine.create_table(table)?;
    let store = engine.table(table)?;

    let file =
        File::open(input).with_context(|| format!("cannot open {}", input.display()))?;
    let total_size = file.metadata()?.len();

    let pb = ProgressBar::new(total_size);
    pb.set_style(ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")
        .unwrap()
        .progress_chars("#>-"));

    let source = CsvSource::from_reader(BufReader::new(pb.wrap_read(file)))?;
    let count = Ingestor::new(&store).load(source)?;
    pb.finish_and_clear();

    engine.flush()?;
    eprintln!("✓ Ingest completed");
    eprintln!("  → {} rows loaded", count.to_string().green());
    Ok(())
}

fn report(data_dir: &Path, table: &str, top: usize, format: Format) -> anyhow::Result<()> {
    let engine = StorageEngine::new(data_dir)?;
    let store = engine.table(table)?;

    let report = build_report(&store, &ReportOptions { top })?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match format {
        Format::Text => report.render_text(&mut out)?,
        Format::Json => writeln!(out, "{}", report.to_json()?)?,
    }
    Ok(())
}
