use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use mimalloc::MiMalloc;
use std::path::PathBuf;
use std::process::ExitCode;

mod commands;
mod ui;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[derive(Parser, Debug)]
#[command(name = "arscan")]
#[command(version, about = "Inspect and verify Arweave drives")]
struct Cli {
    /// Config file (default: <config dir>/arscan/arscan.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Gateway URL, overrides config and ARSCAN_GATEWAY
    #[arg(long, global = true)]
    gateway: Option<String>,

    /// Log output format
    #[arg(long, value_enum, global = true, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Verify that every file of a drive is retrievable
    Verify(commands::verify::VerifyArgs),
    /// Show a drive, folder or file
    Entity(commands::entity::EntityArgs),
    /// List transactions matching filters
    Query(commands::query::QueryArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

/// Logs go to stderr so stdout carries only report output.
fn init_logging(format: LogFormat) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Text => registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init(),
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let session = commands::Session::open(cli.config.as_deref(), cli.gateway.as_deref())?;

    match cli.command {
        Commands::Verify(args) => commands::verify::execute(&session, args).await,
        Commands::Entity(args) => commands::entity::execute(&session, args)
            .await
            .map(|()| ExitCode::SUCCESS),
        Commands::Query(args) => commands::query::execute(&session, args)
            .await
            .map(|()| ExitCode::SUCCESS),
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.log_format);

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            let details = format!("{e:#}");
            let hints: &[&str] = if e
                .downcast_ref::<arscan::Error>()
                .is_some_and(arscan::Error::is_transient)
            {
                &["The gateway may be overloaded. Retry later or pass --gateway with another gateway."]
            } else {
                &[]
            };
            ui::print_error_box_with_hints("arscan failed", Some(&details), hints);
            ExitCode::FAILURE
        },
    }
}
