//! Tessera CLI
//!
//! Usage:
//!   tess audit examples --docs <dir> --output <dir>   Write fixtures from the reference docs
//!   tess audit examples --operator firstN --force     Regenerate one operator
//!   tess audit coverage --format json                 Documented vs implemented operators
//!   tess db ping --config datastore.toml              Check a deployment is reachable
//!
//! `--config audit.toml` supplies defaults for the audit commands.

mod audit;
mod db;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tessera_audit::{AuditConfig, DocKind, ReportFormat};

#[derive(Parser)]
#[command(name = "tess")]
#[command(about = "Tessera object-document mapper tools", long_about = None)]
#[command(version)]
struct Cli {
    /// Audit defaults (docs root, output root, ignored operators)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape the reference documentation
    Audit {
        #[command(subcommand)]
        action: AuditAction,
    },
    /// Datastore utilities
    Db {
        #[command(subcommand)]
        action: DbAction,
    },
}

#[derive(Subcommand)]
enum AuditAction {
    /// Extract examples into fixture directories
    Examples {
        /// Reference manual checkout
        #[arg(long)]
        docs: Option<PathBuf>,

        /// Fixture output root
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Only this operator (with or without `$`)
        #[arg(long)]
        operator: Option<String>,

        /// Only this kind of operator
        #[arg(long)]
        kind: Option<DocKind>,

        /// Rewrite fixtures that differ from the docs (locked ones are kept)
        #[arg(long)]
        force: bool,
    },

    /// Compare documented operators with the builders
    Coverage {
        /// Reference manual checkout
        #[arg(long)]
        docs: Option<PathBuf>,

        /// Output format
        #[arg(long, default_value = "text")]
        format: ReportFormat,

        /// Exit with an error when documented operators have no builder
        #[arg(long)]
        fail_on_missing: bool,
    },
}

#[derive(Subcommand)]
enum DbAction {
    /// Connect and list collections
    Ping {
        /// Datastore configuration (TOML)
        #[arg(long, value_name = "FILE")]
        config: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level)?;

    match cli.command {
        Commands::Audit { action } => {
            let config = load_audit_config(cli.config.as_deref())?;
            match action {
                AuditAction::Examples {
                    docs,
                    output,
                    operator,
                    kind,
                    force,
                } => {
                    let options = audit::ExamplesOptions {
                        docs: docs.unwrap_or_else(|| config.docs_root.clone()),
                        output: output.unwrap_or_else(|| config.output_root.clone()),
                        operator,
                        kinds: kind.map(|k| vec![k]).unwrap_or_else(|| config.kinds.clone()),
                        force,
                    };
                    let summary = audit::run_examples(&options, &config)?;
                    println!("{}", summary);
                }
                AuditAction::Coverage {
                    docs,
                    format,
                    fail_on_missing,
                } => {
                    let docs = docs.unwrap_or_else(|| config.docs_root.clone());
                    let report = audit::run_coverage(&docs, &config)?;
                    print!("{}", report.render(format)?);
                    if fail_on_missing && report.has_missing() {
                        anyhow::bail!("{} documented operators have no builder", report.missing_count());
                    }
                }
            }
        }
        Commands::Db { action } => match action {
            DbAction::Ping { config } => {
                let rt = tokio::runtime::Runtime::new().context("Failed to create tokio runtime")?;
                rt.block_on(db::ping(&config))?;
            }
        },
    }

    Ok(())
}

/// Audit defaults: the given file, else `audit.toml` when present, else built-ins
fn load_audit_config(path: Option<&Path>) -> Result<AuditConfig> {
    match path {
        Some(path) => AuditConfig::from_file(path),
        None if Path::new("audit.toml").exists() => AuditConfig::from_file("audit.toml"),
        None => Ok(AuditConfig::default()),
    }
}

fn init_logging(level: &str) -> Result<()> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init()
        .ok(); // already initialized in tests

    Ok(())
}
