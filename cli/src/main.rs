use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use flatrecord::{Codec, Schema, load_schema, render_error};
use miette::{IntoDiagnostic, Result, WrapErr, miette};
use tracing::debug;

/// flatrecord - Inspect FlatBuffers schemas and buffers
#[derive(Parser, Debug)]
#[command(name = "flatrecord")]
#[command(about = "Inspect FlatBuffers schemas and decode buffers", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the slot layout of a table, or of every table in the schema
    Layout {
        /// Path to the .fbs schema
        schema: PathBuf,
        /// Table to show (defaults to all tables)
        table: Option<String>,
    },
    /// Analyze every table in the schema and report the ones that fail
    Check {
        /// Path to the .fbs schema
        schema: PathBuf,
    },
    /// Decode a binary buffer and print the record
    Decode {
        /// Path to the .fbs schema
        schema: PathBuf,
        /// Root table of the buffer
        table: String,
        /// Path to the binary buffer
        file: PathBuf,
    },
}

fn load(path: &Path) -> Result<Codec> {
    match load_schema(path) {
        Ok(schema) => {
            debug!(path = %path.display(), tables = schema.tables().count(), "Loaded schema");
            Ok(Codec::new(schema))
        }
        Err(e) => {
            render_error(&e);
            Err(miette!("failed to load schema `{}`", path.display()))
        }
    }
}

fn layout(codec: &Codec, table: Option<&str>) -> Result<()> {
    let names: Vec<String> = match table {
        Some(name) => vec![name.to_string()],
        None => table_names(codec.schema()),
    };
    for (i, name) in names.iter().enumerate() {
        let layout = codec.layout(name).into_diagnostic()?;
        if i > 0 {
            println!();
        }
        print!("{layout}");
    }
    Ok(())
}

fn check(codec: &Codec) -> Result<()> {
    let results = codec.check();
    let total = results.len();
    let mut failed = 0;
    for (name, result) in results {
        match result {
            Ok(layout) => println!("ok     {name} ({} slots)", layout.num_slots()),
            Err(e) => {
                failed += 1;
                println!("error  {name}: {e}");
            }
        }
    }
    if failed > 0 {
        return Err(miette!("{failed} of {total} tables failed to analyze"));
    }
    Ok(())
}

fn decode(codec: &Codec, table: &str, file: &Path) -> Result<()> {
    let bytes = std::fs::read(file)
        .into_diagnostic()
        .wrap_err_with(|| format!("cannot read `{}`", file.display()))?;
    let record = codec.decode(table, &bytes).into_diagnostic()?;
    println!("{record}");
    Ok(())
}

fn table_names(schema: &Schema) -> Vec<String> {
    schema.tables().map(|def| def.name.clone()).collect()
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging subscriber
    use tracing_subscriber::{EnvFilter, fmt};

    // Use RUST_LOG to control the log level. Default to WARN if not set.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    match args.command {
        Command::Layout { schema, table } => layout(&load(&schema)?, table.as_deref()),
        Command::Check { schema } => check(&load(&schema)?),
        Command::Decode {
            schema,
            table,
            file,
        } => decode(&load(&schema)?, &table, &file),
    }
}
