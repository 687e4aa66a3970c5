use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use agriwise_api::api::{create_router, AppState};
use agriwise_api::config::Config;
use agriwise_api::db;
use agriwise_api::services::crops::{CropRecommender, ForestParams};
use agriwise_api::services::seed;
use agriwise_api::store::{PgStore, Store};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "agriwise_api=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    tracing::info!(
        host = %config.host,
        port = config.port,
        model_dir = %config.crop_model_dir.display(),
        "Configuration loaded"
    );

    let pool = db::create_pool(&config.database_url, config.database_max_connections).await?;
    db::run_migrations(&pool).await?;

    let store: Arc<dyn Store> = Arc::new(PgStore::new(pool));

    if config.seed_on_startup {
        seed::seed_if_empty(store.as_ref())
            .await
            .context("Failed to seed sample data")?;
    }

    let crops = Arc::new(CropRecommender::with_params(
        config.crop_model_dir.clone(),
        config.crop_dataset_path.clone(),
        ForestParams {
            n_trees: config.crop_model_trees,
            ..ForestParams::default()
        },
    ));

    if config.preload_crop_model {
        let crops = crops.clone();
        tokio::spawn(async move {
            match crops.model().await {
                Ok(model) => tracing::info!(classes = model.encoder.len(), "Crop model ready"),
                // requests retry the load on demand
                Err(e) => tracing::warn!(error = %e, "Crop model warm-up failed"),
            }
        });
    }

    let app = create_router(AppState::new(store, crops));

    let listener = tokio::net::TcpListener::bind(config.bind_address())
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_address()))?;
    tracing::info!(address = %config.bind_address(), "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}
