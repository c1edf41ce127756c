mod cli;
mod error;

use crate::cli::Cli;
use crate::error::{ErrorKind, Result};
use clap::Parser;
use exn::ResultExt;
use futures::StreamExt;
use std::process::ExitCode;
use std::sync::Arc;
use tidyshelf_catalog::CatalogHandle;
use tidyshelf_catalog::backend::{CalibredbCatalog, SqliteCatalog};
use tidyshelf_config::{BackendKind, Config};
use tidyshelf_reconcile::{ItemOutcome, ReconcileEvent, reconcile};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_level())))
        .with_writer(std::io::stderr)
        .init();

    match run(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::FAILURE
        },
    }
}

async fn run(cli: &Cli) -> Result<()> {
    let config = Config::load(cli.config.as_deref(), &cli.overrides()).or_raise(|| ErrorKind::Config)?;
    let catalog = open(&config).await.or_raise(|| ErrorKind::Catalog)?;
    tracing::info!(backend = catalog.name(), "Opened catalog");

    println!("Updating Calibre library \"{}\"\n", config.library.display());
    let events = reconcile(&catalog, cli.options());
    futures::pin_mut!(events);
    while let Some(event) = events.next().await {
        match event.or_raise(|| ErrorKind::Reconcile)? {
            ReconcileEvent::Started => {},
            ReconcileEvent::Loaded(count) => tracing::info!(count, "Loaded catalog items"),
            ReconcileEvent::Reconciled(outcome) => {
                for line in progress_lines(&outcome) {
                    println!("{line}");
                }
            },
            ReconcileEvent::Complete(summary) => println!("\n{summary}"),
        }
    }
    Ok(())
}

async fn open(config: &Config) -> tidyshelf_catalog::error::Result<CatalogHandle> {
    let catalog: CatalogHandle = match config.backend {
        BackendKind::Calibredb => Arc::new(
            CalibredbCatalog::connect(config.calibredb.clone(), &config.library, &config.read_order_column).await?,
        ),
        BackendKind::Sqlite => Arc::new(SqliteCatalog::open(&config.library, &config.read_order_column).await?),
    };
    Ok(catalog)
}

/// One line per rule that fired: the padded action label, the item title as
/// read, and old/new values where there are any.
fn progress_lines(outcome: &ItemOutcome) -> Vec<String> {
    let mut lines = Vec::new();
    let mut push = |label: String, detail: Option<String>| {
        let line = format!("{label:<30} for \"{}\"", outcome.title);
        lines.push(match detail {
            Some(detail) => format!("{line} {detail}"),
            None => line,
        });
    };
    if let Some(change) = &outcome.title_change {
        push(change.to_string(), Some(change.detail()));
    }
    for action in outcome.read_order.iter().flat_map(|decision| &decision.actions) {
        push(action.to_string(), action.detail());
    }
    lines
}
