use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use shelf_api::{
    config::Config,
    db::{create_pool, create_redis_client, Cache, CatalogStore, KeyValueCache, PgCatalog},
    routes::{create_router, AppState},
    services::{
        llm::{OllamaClient, TextGenerator},
        BookAnalysisOrchestrator, EnrichmentCache, RecommendationEngine,
    },
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("shelf_api=info,tower_http=info")),
        )
        .init();

    let config = Config::from_env()?;

    let pool = create_pool(&config.database_url).await?;
    sqlx::migrate!().run(&pool).await?;
    tracing::info!("Database ready");

    let cache: Arc<dyn KeyValueCache> = Arc::new(Cache::new(create_redis_client(&config.redis_url)?));
    let catalog: Arc<dyn CatalogStore> = Arc::new(PgCatalog::new(pool));
    let generator: Arc<dyn TextGenerator> = Arc::new(OllamaClient::new(
        config.llm_api_url.clone(),
        config.llm_model.clone(),
        config.llm_timeout(),
    )?);
    tracing::info!(
        backend = generator.name(),
        model = %config.llm_model,
        url = %config.llm_api_url,
        "Text generator configured"
    );

    let enrichment = EnrichmentCache::new(cache, generator, config.cache_retention());
    let orchestrator =
        BookAnalysisOrchestrator::new(enrichment, catalog.clone(), config.enrichment_concurrency);
    let engine = RecommendationEngine::new(catalog, config.candidate_limit);

    let state = AppState::new(orchestrator, engine, config.default_top_n)
        .with_job_ttl(config.analysis_job_ttl());
    let app = create_router(state);

    let address = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&address).await?;
    tracing::info!(address = %address, "Server running");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutting down");
}
