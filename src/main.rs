use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use visual_recs::api::{create_router, AppState};
use visual_recs::application::{RecommendationService, UploadValidator};
use visual_recs::infrastructure::{
    load_catalog, BruteForceIndex, Config, LocalUploadStore, ResNetEmbedder, TfServingExtractor,
};

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "visual_recs=debug,api=debug,tower_http=debug".into());
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::load()?;
    init_tracing(config.logging.json);

    // Nothing is served unless the catalog loads completely.
    let catalog = load_catalog(&config.catalog.matrix_path, &config.catalog.mapping_path)?;

    let extractor = Arc::new(TfServingExtractor::from_config(&config.model)?);
    info!(endpoint = extractor.endpoint(), "model client initialized");
    let embedder = Arc::new(ResNetEmbedder::from_config(extractor, &config.model));

    let uploads = Arc::new(LocalUploadStore::new(&config.uploads.dir));
    uploads.ensure_dir().await?;

    let index = Arc::new(BruteForceIndex::new(catalog.matrix.clone()));
    let validator = UploadValidator::new(
        &config.uploads.allowed_extensions,
        config.server.max_upload_bytes,
    )
    .with_content_types(&config.uploads.allowed_content_types);
    let service = RecommendationService::new(embedder, index, Arc::new(catalog.mapping))?
        .with_k_limits(config.recommend.default_k, config.recommend.max_k)
        .with_strict_mapping(config.recommend.strict_mapping)
        .with_validator(validator)
        .with_upload_store(uploads);

    let addr = SocketAddr::new(config.server.host.parse()?, config.server.port);
    let state = AppState::new(Arc::new(service), config);
    let app = create_router(state);

    info!("API server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
