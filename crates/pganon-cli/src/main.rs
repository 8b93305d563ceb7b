//! The pganon command-line interface.
//!
//! `run` executes an anonymization run; `validate` performs preflight only.
//! Flags override values from the YAML configuration file.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use thiserror::Error;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use pganon_core::{config::find_default_patterns_file, pattern, Config, Error as CoreError};
use pganon_engine::{Anonymizer, CancelFlag, RunOptions};

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Core(#[from] CoreError),
}

#[derive(Parser, Debug)]
#[command(name = "pganon", version, about = "Anonymize PII in PostgreSQL databases in place")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Anonymize the configured columns in one atomic transaction.
    Run(RunArgs),
    /// Check configuration, columns, and patterns without writing anything.
    Validate(CommonArgs),
}

#[derive(Args, Debug)]
struct CommonArgs {
    /// Path to the YAML configuration file.
    #[arg(short, long, value_name = "FILE")]
    config: PathBuf,

    /// Database host override.
    #[arg(long)]
    host: Option<String>,
    /// Database port override.
    #[arg(long)]
    port: Option<u16>,
    /// Database name override.
    #[arg(long)]
    dbname: Option<String>,
    /// Database user override.
    #[arg(long)]
    user: Option<String>,
    /// Database password override.
    #[arg(long)]
    password: Option<String>,

    /// Default patterns file override.
    #[arg(long, value_name = "FILE")]
    default_patterns: Option<String>,
    /// User patterns file override.
    #[arg(long, value_name = "FILE")]
    user_patterns: Option<String>,
    /// Skip loading the default pattern set.
    #[arg(long, default_value_t = false)]
    disable_default_patterns: bool,
}

#[derive(Args, Debug)]
struct RunArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Rows per cursor fetch and per batched update.
    #[arg(long, default_value_t = 10_000)]
    batch_size: usize,
    /// In-memory dictionary capacity (entries); 0 uses the default.
    #[arg(long, default_value_t = 0)]
    cache_size: usize,
    /// Only log warnings and errors.
    #[arg(short, long, default_value_t = false)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let quiet = matches!(&cli.command, Command::Run(args) if args.quiet);
    init_logging(quiet);

    let result = match cli.command {
        Command::Run(args) => run(args).await,
        Command::Validate(args) => validate(args).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            let mut source = std::error::Error::source(&err);
            while let Some(cause) = source {
                error!("  caused by: {cause}");
                source = cause.source();
            }
            ExitCode::FAILURE
        }
    }
}

fn init_logging(quiet: bool) {
    let default_level = if quiet { "warn" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn load(common: &CommonArgs) -> Result<(Config, pattern::Registry), CliError> {
    let mut config = Config::load(&common.config)?;

    if let Some(host) = &common.host {
        config.database.host = Some(host.clone());
    }
    if let Some(port) = common.port {
        config.database.port = Some(port);
    }
    if let Some(dbname) = &common.dbname {
        config.database.database = Some(dbname.clone());
    }
    if let Some(user) = &common.user {
        config.database.user = Some(user.clone());
    }
    if let Some(password) = &common.password {
        config.database.password = Some(password.clone());
    }
    if let Some(path) = &common.default_patterns {
        config.patterns.default_path = Some(path.clone());
    }
    if let Some(path) = &common.user_patterns {
        config.patterns.user_path = Some(path.clone());
    }
    if common.disable_default_patterns {
        config.patterns.disable_defaults = true;
    }

    config.validate()?;

    let default_path = config
        .patterns
        .default_path
        .clone()
        .or_else(|| find_default_patterns_file(None));
    let registry = pattern::load_registry(
        default_path.as_deref(),
        config.patterns.user_path.as_deref(),
        config.patterns.disable_defaults,
    )?;

    Ok((config, registry))
}

async fn run(args: RunArgs) -> Result<(), CliError> {
    let (config, registry) = load(&args.common)?;

    let options = RunOptions {
        batch_size: args.batch_size,
        cache_size: args.cache_size,
    };
    let anonymizer = Anonymizer::new(config, &registry, options)?;

    let cancel = CancelFlag::new();
    let signal_flag = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("cancellation requested, rolling back");
            signal_flag.cancel();
        }
    });

    let stats = anonymizer.run(&cancel).await?;
    println!("{}", stats.render());
    Ok(())
}

async fn validate(args: CommonArgs) -> Result<(), CliError> {
    let (config, registry) = load(&args)?;

    let anonymizer = Anonymizer::new(config, &registry, RunOptions::default())?;
    let report = anonymizer.preflight().await?;

    println!("Configuration is valid.");
    println!("Processing order:");
    for col in &report.order {
        println!("  {col}");
    }
    if !report.cascade_targets.is_empty() {
        println!("Skipped as CASCADE targets:");
        for col in &report.cascade_targets {
            println!("  {col}");
        }
    }
    Ok(())
}
