use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use gambit_client::ReqwestFetcher;
use gambit_core::{
    ChessExtractor, Destination, ExtractorConfig, LoadInfo, NullDestination, Pipeline,
    PipelineConfig, Resource,
};
use gambit_db::{Database, DatabaseConfig};

/// Load chess.com leaderboard players, profiles and recent games into the warehouse.
#[derive(Parser)]
#[command(name = "gambit", version, about)]
struct Cli {
    /// Name recorded with every load
    #[arg(long, env = "GAMBIT_PIPELINE_NAME", default_value = "chess_data")]
    pipeline_name: String,

    /// Warehouse schema the tables are written into
    #[arg(long, env = "GAMBIT_DATASET", default_value = "chess_data")]
    dataset: String,

    /// Extract everything but skip the warehouse (no DATABASE_URL needed)
    #[arg(long, default_value_t = false)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Setup tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("gambit=info".parse()?))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let extractor_config = ExtractorConfig::from_env()?;
    let fetcher = ReqwestFetcher::new().context("Failed to create HTTP client")?;
    let extractor = ChessExtractor::new(fetcher, extractor_config);

    let pipeline_config = PipelineConfig {
        pipeline_name: cli.pipeline_name,
        dataset_name: cli.dataset,
    };

    let info = if cli.dry_run {
        run(NullDestination, pipeline_config, extractor.resources()).await?
    } else {
        let db = connect_db().await?;
        run(db.destination(), pipeline_config, extractor.resources()).await?
    };

    println!("{info}");

    Ok(())
}

/// Connect to the warehouse using DATABASE_URL and apply migrations.
async fn connect_db() -> Result<Database> {
    let config = DatabaseConfig::from_env()?;
    let db = Database::connect(&config)
        .await
        .context("Failed to connect to database")?;
    db.migrate().await?;
    Ok(db)
}

async fn run<D: Destination>(
    destination: D,
    config: PipelineConfig,
    resources: Vec<Resource<'_>>,
) -> Result<LoadInfo> {
    tracing::info!(
        pipeline = %config.pipeline_name,
        dataset = %config.dataset_name,
        resources = resources.len(),
        "Starting load"
    );

    let pipeline = Pipeline::new(destination, config);
    let info = pipeline.run(resources).await.context("Load failed")?;

    Ok(info)
}
