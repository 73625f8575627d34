//! oxide-sheetql CLI
//!
//! Runs one SQL SELECT statement over tables loaded from JSON files.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::{debug, info, Level};
use tracing_subscriber::FmtSubscriber;

use oxide_sheetql_cli::{parse_table_arg, read_settings, render, Format, JsonFileLoader};
use oxide_sheetql_core::{executor, load_tables, parse, BindData, TableSettings, Value};

/// SQL SELECT over spreadsheet-style JSON tables.
#[derive(Parser)]
#[command(name = "oxide-sheetql")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// SQL statement to run.
    #[arg(required_unless_present = "file", conflicts_with = "file")]
    sql: Option<String>,

    /// Read the SQL statement from a file.
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Table as NAME=PATH to a JSON array of rows. Append `:no-titles`
    /// when the first row is data.
    #[arg(short, long = "table", value_parser = parse_table_arg)]
    tables: Vec<TableSettings>,

    /// JSON file of [name, location, cache_seconds, has_column_titles] tuples.
    #[arg(short, long, env = "SHEETQL_SETTINGS")]
    settings: Option<PathBuf>,

    /// Value for the next ?N placeholder. Numbers, booleans and dates are
    /// detected.
    #[arg(short, long = "bind")]
    binds: Vec<String>,

    /// Omit the column-title row.
    #[arg(long)]
    no_titles: bool,

    /// Output format.
    #[arg(long, value_enum, default_value_t = Format::Table)]
    format: Format,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging; stdout carries the results.
    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let statement = match (cli.sql, &cli.file) {
        (Some(sql), _) => sql,
        (None, Some(path)) => std::fs::read_to_string(path)
            .with_context(|| format!("cannot read {}", path.display()))?,
        (None, None) => anyhow::bail!("no SQL statement given"),
    };

    let mut settings = cli.tables;
    if let Some(path) = &cli.settings {
        settings.extend(read_settings(path)?);
    }
    if settings.is_empty() {
        info!("No tables configured. Use --table or --settings.");
    }
    let tables = load_tables(&JsonFileLoader, &settings)?;
    let binds: BindData = cli.binds.iter().map(String::as_str).map(Value::infer).collect();

    let parsed = parse(&statement)?;
    let result = executor::execute(&parsed, &tables, &binds)?;
    debug!(rows = result.len(), "query finished");

    print!("{}", render(&result, cli.format, !cli.no_titles)?);
    if cli.format == Format::Json {
        println!();
    }

    Ok(())
}
