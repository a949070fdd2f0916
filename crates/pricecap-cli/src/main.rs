mod capture;
mod history;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use pricecap_core::{AppConfig, CaptureCatalog, ParseOutcome};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "pricecap-cli")]
#[command(about = "Field price capture command line interface")]
struct Cli {
    /// Catalog of capture sites, units and brands (defaults to `PRICECAP_CATALOG_PATH`)
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Parse sentences and print the structured items
    Parse {
        /// Sentences such as "喜旺手掰肉老火腿340g — 19.90"
        #[arg(required = true)]
        text: Vec<String>,
    },
    /// Parse one sentence per line and submit them as a single session
    Capture {
        /// Capture site; must be one of the catalog sites
        #[arg(long)]
        location: String,

        /// File to read sentences from (stdin when omitted)
        #[arg(long)]
        input: Option<PathBuf>,

        /// JSON-lines archive to append to (defaults to `PRICECAP_ARCHIVE_PATH`)
        #[arg(long)]
        archive: Option<PathBuf>,
    },
    /// Show archived sessions, most recent first
    History {
        /// JSON-lines archive to read (defaults to `PRICECAP_ARCHIVE_PATH`)
        #[arg(long)]
        archive: Option<PathBuf>,

        /// Maximum number of sessions to show
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// List the configured capture sites
    Sites,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = pricecap_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let catalog_path = cli.catalog.unwrap_or_else(|| config.catalog_path.clone());
    let load = || pricecap_core::load_catalog(&catalog_path);

    match cli.command {
        Some(Commands::Parse { text }) => run_parse(&load()?, &text)?,
        Some(Commands::Capture {
            location,
            input,
            archive,
        }) => {
            let archive = resolve_archive(archive, &config)?;
            capture::run_capture(&load()?, &location, input.as_deref(), &archive).await?;
        }
        Some(Commands::History { archive, limit }) => {
            let archive = resolve_archive(archive, &config)?;
            history::run_history(&archive, limit).await?;
        }
        Some(Commands::Sites) => run_sites(&load()?),
        None => println!("pricecap-cli ready; see --help for commands"),
    }

    Ok(())
}

fn resolve_archive(flag: Option<PathBuf>, config: &AppConfig) -> anyhow::Result<PathBuf> {
    flag.or_else(|| config.archive_path.clone())
        .ok_or_else(|| anyhow::anyhow!("no archive given; pass --archive or set PRICECAP_ARCHIVE_PATH"))
}

fn run_parse(catalog: &CaptureCatalog, sentences: &[String]) -> anyhow::Result<()> {
    let parser = catalog.parser();
    for sentence in sentences {
        match parser.parse(sentence) {
            ParseOutcome::Matched(item) => println!("{}", serde_json::to_string(&item)?),
            ParseOutcome::Unmatched => println!("no match: {sentence}"),
        }
    }
    Ok(())
}

fn run_sites(catalog: &CaptureCatalog) {
    for site in &catalog.sites {
        println!("{site}");
    }
}
