use roadnoise_ingest::config::IngestConfig;
use roadnoise_ingest::error::IngestError;
use roadnoise_ingest::pipeline;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "roadnoise_ingest=info,roadnoise_db=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = run().await {
        tracing::error!(error = %e, "Ingest aborted");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), IngestError> {
    let config = IngestConfig::from_env()?.with_mode_override(std::env::args().nth(1))?;

    tracing::info!(
        mode = %config.mode,
        input_dir = %config.input_dir().display(),
        chunk_size = config.chunk_size,
        "Starting roadnoise-ingest",
    );

    let pool = roadnoise_db::create_pool(&config.database_url, config.max_connections).await?;
    roadnoise_db::health_check(&pool).await?;
    roadnoise_db::run_migrations(&pool).await?;
    tracing::info!("Database ready");

    let report = pipeline::run(&pool, &config).await?;
    report.log();

    pool.close().await;
    Ok(())
}
