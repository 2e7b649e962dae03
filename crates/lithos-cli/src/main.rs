use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use lithos_extract::{extraction_confidence, MetricsExtractor};
use lithos_similarity::SimilarityEngine;
use lithos_store::{PgProjectStore, ProjectStore};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "lithos-cli")]
#[command(about = "Lithos command-line interface")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run the HTTP API server.
    Serve,
    /// Rank the projects most similar to the given project id.
    Similar {
        id: String,
        #[arg(long, default_value_t = lithos_web::DEFAULT_SIMILAR_TOP_K)]
        top_k: usize,
    },
    /// Validate a report file and extract its economic metrics.
    Extract { path: PathBuf },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => {
            lithos_web::serve_from_env().await?;
        }
        Commands::Similar { id, top_k } => {
            let database_url = std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| lithos_web::DEFAULT_DATABASE_URL.to_string());
            let store = PgProjectStore::connect(&database_url).await?;
            let Some(reference) = store.fetch_project(&id).await? else {
                anyhow::bail!("project {id} not found");
            };
            let candidates = store.fetch_candidates(&id).await?;
            let engine = SimilarityEngine::default();
            for ranked in engine.rank(&reference, candidates, top_k) {
                println!(
                    "{:.3}  {}  {}",
                    ranked.score, ranked.project.id, ranked.project.name
                );
            }
        }
        Commands::Extract { path } => {
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("reading {}", path.display()))?;
            let extractor = MetricsExtractor::new()?;
            let validation = extractor.validate_document(&text);
            let metrics = extractor.extract(&text);
            println!(
                "validation: {}/{} metrics found ({}%), valid={}",
                validation.metrics_found,
                validation.total_metrics,
                validation.percentage,
                validation.is_valid
            );
            println!("{}", serde_json::to_string_pretty(&metrics)?);
            println!("confidence: {}", extraction_confidence(&metrics));
        }
    }

    Ok(())
}
