//! Tabula CLI - compile, run and export ad-hoc reports
//!
//! Usage:
//!   tabula tables
//!   tabula columns <table>
//!   tabula sql <config.json> [--offline --dialect tsql|sqlite]
//!   tabula run <config.json> [--export xlsx|pdf|docx --out <path> --title <title>]
//!   tabula query <sql>
//!   tabula serve [--port <port>]
//!
//! Examples:
//!   tabula sql residents.json --offline
//!   tabula run residents.json --export xlsx --out residents.xlsx --title Residents
//!   TABULA_CONFIG=./tabula.toml tabula serve --port 9000

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use tabula::config::Settings;
use tabula::export::ExportFormat;
use tabula::report::{compile_with, CompileOptions, ReportConfiguration};
use tabula::result::TabularResult;
use tabula::service::ReportService;
use tabula::sql::Dialect;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tabula")]
#[command(about = "Tabula - ad-hoc report compiler with guarded execution and document export")]
#[command(version)]
struct Cli {
    /// Path to a tabula.toml (defaults to the usual lookup)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Named connection from the config file
    #[arg(long, global = true)]
    connection: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List tables in the connected database
    Tables,

    /// List the columns of one table
    Columns {
        table: String,
    },

    /// Compile a report configuration to SQL
    Sql {
        /// Path to the report configuration JSON
        file: PathBuf,

        /// Compile without connecting (no catalog validation)
        #[arg(long)]
        offline: bool,

        /// Dialect for offline compilation
        #[arg(short, long, default_value = "tsql")]
        dialect: DialectArg,
    },

    /// Compile and execute a report, optionally exporting the result
    Run {
        /// Path to the report configuration JSON
        file: PathBuf,

        /// Export format instead of printing JSON
        #[arg(short, long)]
        export: Option<String>,

        /// Output path for the exported document
        #[arg(short, long, requires = "export")]
        out: Option<PathBuf>,

        /// Document title
        #[arg(short, long)]
        title: Option<String>,
    },

    /// Execute a raw SELECT statement through the read-only guard
    Query {
        sql: String,
    },

    /// Start the HTTP server
    #[cfg(feature = "server")]
    Serve {
        /// Port to listen on (overrides the config file)
        #[arg(short, long)]
        port: Option<u16>,
    },
}

#[derive(Clone, ValueEnum)]
enum DialectArg {
    Tsql,
    Sqlite,
}

impl From<DialectArg> for Dialect {
    fn from(arg: DialectArg) -> Self {
        match arg {
            DialectArg::Tsql => Dialect::TSql,
            DialectArg::Sqlite => Dialect::Sqlite,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tabula=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let settings = match load_settings(cli.config.as_deref()) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error loading configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Commands::Sql {
        file,
        offline: true,
        dialect,
    } = &cli.command
    {
        return cmd_sql_offline(file, dialect.clone().into(), &settings);
    }

    let service = match ReportService::connect(settings, cli.connection.as_deref()).await {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error connecting: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match cli.command {
        Commands::Tables => cmd_tables(&service).await,
        Commands::Columns { table } => cmd_columns(&service, &table).await,
        Commands::Sql { file, .. } => cmd_sql(&service, &file).await,
        Commands::Run {
            file,
            export,
            out,
            title,
        } => cmd_run(&service, &file, export, out, title).await,
        Commands::Query { sql } => cmd_query(&service, &sql).await,
        #[cfg(feature = "server")]
        Commands::Serve { port } => cmd_serve(service, port).await,
    }
}

fn load_settings(path: Option<&Path>) -> Result<Settings, tabula::config::SettingsError> {
    match path {
        Some(path) => Settings::from_file(path),
        None => Settings::load(),
    }
}

fn read_config(file: &Path) -> Result<ReportConfiguration, String> {
    let source = fs::read_to_string(file)
        .map_err(|e| format!("Error reading file '{}': {}", file.display(), e))?;
    serde_json::from_str(&source)
        .map_err(|e| format!("Error parsing report configuration: {}", e))
}

fn print_json<T: serde::Serialize>(value: &T) -> ExitCode {
    match serde_json::to_string_pretty(value) {
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

fn fail(err: impl std::fmt::Display) -> ExitCode {
    eprintln!("Error: {}", err);
    ExitCode::FAILURE
}

async fn cmd_tables(service: &ReportService) -> ExitCode {
    match service.list_tables().await {
        Ok(tables) => {
            for table in tables {
                println!("{}", table);
            }
            ExitCode::SUCCESS
        }
        Err(e) => fail(e),
    }
}

async fn cmd_columns(service: &ReportService, table: &str) -> ExitCode {
    match service.list_columns(table).await {
        Ok(columns) => {
            for column in columns {
                let null = if column.nullable { "NULL" } else { "NOT NULL" };
                println!("{:<32} {:<20} {}", column.name, column.data_type, null);
            }
            ExitCode::SUCCESS
        }
        Err(e) => fail(e),
    }
}

fn cmd_sql_offline(file: &Path, dialect: Dialect, settings: &Settings) -> ExitCode {
    let config = match read_config(file) {
        Ok(c) => c,
        Err(e) => return fail(e),
    };
    let options = CompileOptions::new(dialect).strict(settings.execution.strict_numeric_literals);
    match compile_with(&config, options) {
        Ok(sql) => {
            println!("{}", sql);
            ExitCode::SUCCESS
        }
        Err(e) => fail(e),
    }
}

async fn cmd_sql(service: &ReportService, file: &Path) -> ExitCode {
    let config = match read_config(file) {
        Ok(c) => c,
        Err(e) => return fail(e),
    };
    match service.generate_sql(&config).await {
        Ok(sql) => {
            println!("{}", sql);
            ExitCode::SUCCESS
        }
        Err(e) => fail(e),
    }
}

async fn cmd_run(
    service: &ReportService,
    file: &Path,
    export: Option<String>,
    out: Option<PathBuf>,
    title: Option<String>,
) -> ExitCode {
    let config = match read_config(file) {
        Ok(c) => c,
        Err(e) => return fail(e),
    };
    let run = match service.run_report(&config).await {
        Ok(run) => run,
        Err(e) => return fail(e),
    };

    match export {
        Some(format) => write_export(service, &format, title, out, &run.result),
        None => print_json(&run),
    }
}

fn write_export(
    service: &ReportService,
    format: &str,
    title: Option<String>,
    out: Option<PathBuf>,
    result: &TabularResult,
) -> ExitCode {
    let format = match ExportFormat::parse(format) {
        Ok(f) => f,
        Err(e) => return fail(e),
    };
    let file_name = out
        .as_ref()
        .and_then(|p| p.file_name())
        .map(|n| n.to_string_lossy().into_owned());
    let document = match service.export(format, title.as_deref(), file_name.as_deref(), result) {
        Ok(d) => d,
        Err(e) => return fail(e),
    };

    let path = match out.as_ref().and_then(|p| p.parent()) {
        Some(dir) => dir.join(&document.file_name),
        None => PathBuf::from(&document.file_name),
    };
    match fs::write(&path, &document.bytes) {
        Ok(()) => {
            eprintln!(
                "Wrote {} ({} rows, {} bytes)",
                path.display(),
                result.row_count(),
                document.bytes.len()
            );
            ExitCode::SUCCESS
        }
        Err(e) => fail(format!("writing '{}': {}", path.display(), e)),
    }
}

async fn cmd_query(service: &ReportService, sql: &str) -> ExitCode {
    match service.execute_report(sql).await {
        Ok(result) => print_json(&result),
        Err(e) => fail(e),
    }
}

#[cfg(feature = "server")]
async fn cmd_serve(service: ReportService, port: Option<u16>) -> ExitCode {
    let server = service.settings().server.clone();
    let port = port.unwrap_or(server.port);
    match tabula::web::serve(service, &server.host, port).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => fail(e),
    }
}
