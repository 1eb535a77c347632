/// Wine label cropping service.
///
/// Accepts an uploaded photo, asks a vision model where the wine labels are,
/// crops each label (with a small safety margin) out of the original pixels
/// and stores the crops as PNG in object storage.

mod config;
mod detector;
mod error;
mod handlers;
mod pipeline;
mod postprocess;
mod preprocess;
mod storage;

#[cfg(test)]
mod testing;

use config::{Config, StorageBackend};
use detector::VisionModelClient;
use error::AppError;
use handlers::AppState;
use pipeline::Pipeline;
use std::net::SocketAddr;
use std::sync::Arc;
use storage::{HttpBlobStore, LocalStore, ObjectStore};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), AppError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("label_crop=info,tower_http=debug")),
        )
        .init();

    eprintln!("[STARTUP] Label crop service starting...");

    // Decode/crop/encode run on the blocking pool; one async worker per core is plenty.
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(num_cpus::get())
        .enable_all()
        .build()
        .map_err(|e| AppError::Internal(format!("Failed to build runtime: {e}")))?;

    runtime.block_on(async_main())
}

async fn async_main() -> Result<(), AppError> {
    let config = Config::from_env();
    info!("Model API: {} ({})", config.model_api_url, config.model_name);
    info!("Storage backend: {:?}", config.storage_backend);
    info!("Port: {}", config.port);

    if config.model_api_key.is_none() {
        warn!("MODEL_API_KEY is not set; model requests will be sent without credentials");
    }

    let detector = VisionModelClient::new(
        config.model_api_url.clone(),
        config.model_api_key.clone(),
        config.model_name.clone(),
        config.model_timeout,
    )?;
    info!("Vision model client ready for {}", detector.model());

    let (store, local_store): (Arc<dyn ObjectStore>, Option<LocalStore>) =
        match config.storage_backend {
            StorageBackend::Local => {
                let local = LocalStore::new(&config.storage_dir, &config.storage_public_url);
                info!("Storing objects under {}", local.root().display());
                (Arc::new(local.clone()), Some(local))
            }
            StorageBackend::Http => {
                let base_url = config.storage_url.clone().ok_or_else(|| {
                    AppError::Internal("STORAGE_URL must be set for the http backend".to_string())
                })?;
                info!("Storing objects at {base_url}");
                let store = HttpBlobStore::new(
                    base_url,
                    config.storage_public_url.clone(),
                    config.storage_token.clone(),
                    config.storage_timeout,
                )?;
                (Arc::new(store), None)
            }
        };

    let pipeline = Pipeline::new(
        Arc::new(detector),
        store,
        config.crop_prefix.clone(),
        config.original_prefix.clone(),
    );

    let state = Arc::new(AppState {
        pipeline,
        local_store,
    });
    let app = handlers::router(state, config.max_upload_bytes);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    eprintln!("[STARTUP] Server ready! Listening on http://{addr}");
    info!("Listening on http://{}", addr);

    axum::serve(listener, app).await?;

    eprintln!("[SHUTDOWN] Server stopped");
    Ok(())
}
