//! pgcompose CLI - Compile JSON query descriptors to PostgreSQL
//!
//! Usage:
//!   pgcompose find <params.json> [--params <values.json>]
//!   pgcompose insert <params.json> [--many] [--params <values.json>]
//!   pgcompose update <params.json> [--params <values.json>]
//!   pgcompose delete <params.json> [--params <values.json>]
//!   pgcompose bind <query.sql> --params <values.json>
//!
//! Examples:
//!   pgcompose find artist.json
//!   pgcompose --config ./pgcompose.toml find artist.json --params values.json
//!   pgcompose insert users.json --many

use clap::{Parser, Subcommand};
use pgcompose::compile::{
    delete_many, find_many, insert_many, insert_one, update_many, DeleteManyParams,
    FindManyParams, InsertManyParams, InsertOneParams, UpdateManyParams,
};
use pgcompose::config::{OutputSettings, Settings};
use pgcompose::params::bind_params;
use pgcompose::QueryResult;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pgcompose")]
#[command(about = "pgcompose - Compile JSON query descriptors to PostgreSQL")]
#[command(version)]
struct Cli {
    /// Path to a pgcompose.toml settings file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a SELECT from find parameters
    Find {
        /// Path to the parameters JSON file
        file: PathBuf,

        /// Bind named placeholders with values from this JSON file
        #[arg(short, long)]
        params: Option<PathBuf>,
    },

    /// Compile an INSERT
    Insert {
        /// Path to the parameters JSON file
        file: PathBuf,

        /// Insert an array of rows
        #[arg(long)]
        many: bool,

        /// Bind named placeholders with values from this JSON file
        #[arg(short, long)]
        params: Option<PathBuf>,
    },

    /// Compile an UPDATE
    Update {
        /// Path to the parameters JSON file
        file: PathBuf,

        /// Bind named placeholders with values from this JSON file
        #[arg(short, long)]
        params: Option<PathBuf>,
    },

    /// Compile a DELETE
    Delete {
        /// Path to the parameters JSON file
        file: PathBuf,

        /// Bind named placeholders with values from this JSON file
        #[arg(short, long)]
        params: Option<PathBuf>,
    },

    /// Bind named placeholders in an existing SQL file
    Bind {
        /// Path to the SQL file
        file: PathBuf,

        /// Values JSON file
        #[arg(short, long)]
        params: PathBuf,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let settings = match Settings::load_from(cli.config.as_deref()) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match cli.command {
        Commands::Find { file, params } => cmd_compile(&settings, &file, params, |value| {
            let mut params = FindManyParams::from_json(value)?;
            params.relations = settings.relations_with(&params.relations);
            find_many(&params)
        }),
        Commands::Insert { file, many, params } => {
            cmd_compile(&settings, &file, params, |value| {
                if many {
                    let mut params = InsertManyParams::from_json(value)?;
                    params.relations = settings.relations_with(&params.relations);
                    insert_many(&params)
                } else {
                    let mut params = InsertOneParams::from_json(value)?;
                    params.relations = settings.relations_with(&params.relations);
                    insert_one(&params)
                }
            })
        }
        Commands::Update { file, params } => cmd_compile(&settings, &file, params, |value| {
            let mut params = UpdateManyParams::from_json(value)?;
            params.relations = settings.relations_with(&params.relations);
            update_many(&params)
        }),
        Commands::Delete { file, params } => cmd_compile(&settings, &file, params, |value| {
            let mut params = DeleteManyParams::from_json(value)?;
            params.relations = settings.relations_with(&params.relations);
            delete_many(&params)
        }),
        Commands::Bind { file, params } => cmd_bind(&settings.output, &file, &params),
    }
}

fn cmd_compile<F>(settings: &Settings, file: &Path, values: Option<PathBuf>, compile: F) -> ExitCode
where
    F: FnOnce(Value) -> QueryResult<String>,
{
    let descriptor = match read_json(file) {
        Ok(value) => value,
        Err(code) => return code,
    };

    let sql = match compile(descriptor) {
        Ok(sql) => settings.output.finish(&sql),
        Err(e) => {
            eprintln!("Compilation error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    debug!(file = %file.display(), "compiled");

    match values {
        Some(values) => print_bound(&sql, &values),
        None => {
            println!("{}", sql);
            ExitCode::SUCCESS
        }
    }
}

fn cmd_bind(output: &OutputSettings, file: &Path, values: &Path) -> ExitCode {
    let sql = match fs::read_to_string(file) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error reading file '{}': {}", file.display(), e);
            return ExitCode::FAILURE;
        }
    };

    print_bound(&output.finish(sql.trim_end()), values)
}

fn print_bound(sql: &str, values: &Path) -> ExitCode {
    let values: Map<String, Value> = match read_json(values) {
        Ok(Value::Object(map)) => map,
        Ok(_) => {
            eprintln!("Error: '{}' must contain a JSON object", values.display());
            return ExitCode::FAILURE;
        }
        Err(code) => return code,
    };

    let bound = match bind_params(sql, &values) {
        Ok(bound) => bound,
        Err(e) => {
            eprintln!("Binding error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match serde_json::to_string_pretty(&bound) {
        Ok(json) => {
            println!("{}", json);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error serializing output: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn read_json(file: &Path) -> Result<Value, ExitCode> {
    let source = fs::read_to_string(file).map_err(|e| {
        eprintln!("Error reading file '{}': {}", file.display(), e);
        ExitCode::FAILURE
    })?;
    serde_json::from_str(&source).map_err(|e| {
        eprintln!("Error parsing JSON in '{}': {}", file.display(), e);
        ExitCode::FAILURE
    })
}
