// Patent search command line
//
// Runs the full pipeline for one molecule with the HTTP layer only and
// prints the JSON report. Ctrl-C cancels the run and still releases layers.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use kodegen_tools_patentscout::{
    CancelToken, CrawlerManager, HttpLayer, LayerKind, LayerStrategyTable, ManagerConfig,
    OrchestratorSettings, PatentSearchRequest, SearchOrchestrator,
};

#[derive(Debug, Parser)]
#[command(name = "patentscout", version, about = "Find patent filings for a molecule")]
struct Cli {
    /// Molecule (INN) name
    molecule: String,

    /// Commercial brand name, also searched at national offices
    #[arg(long)]
    brand: Option<String>,

    /// Target country code; repeat for several
    #[arg(long = "country", default_value = "BR")]
    countries: Vec<String>,

    /// Manager configuration (JSON)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Skip per-source politeness delays
    #[arg(long)]
    no_politeness: bool,

    /// Write the report here instead of stdout
    #[arg(long, short)]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => ManagerConfig::from_json_file(path)?,
        None => ManagerConfig::default(),
    };
    if cli.no_politeness {
        config = config
            .into_builder()
            .without_politeness()
            .build()
            .context("Failed to disable politeness")?;
    }

    let strategy = LayerStrategyTable::default()
        .restrict_to(&[LayerKind::Http])
        .context("Failed to build layer strategy")?;
    let manager = CrawlerManager::new(config, strategy, vec![Box::new(HttpLayer::default())])
        .context("Failed to create crawler manager")?;
    let orchestrator = SearchOrchestrator::new(Arc::new(manager), OrchestratorSettings::default());

    let cancel = CancelToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling search");
            ctrl_c.cancel();
        }
    });

    let mut request = PatentSearchRequest::new(&cli.molecule).with_countries(cli.countries);
    if let Some(brand) = cli.brand {
        request = request.with_brand(brand);
    }

    let report = orchestrator
        .run_with_cancel(request, &cancel)
        .await
        .context("Patent search failed")?;
    let json = serde_json::to_string_pretty(&report).context("Failed to serialize report")?;

    match cli.output {
        Some(path) => {
            std::fs::write(&path, json)
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
            tracing::info!("Report written to {}", path.display());
        }
        None => println!("{json}"),
    }

    Ok(())
}
