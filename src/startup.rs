use crate::components::preread_job::{JobHandle, PrereadPipeline};
use crate::components::CredentialStore;
use crate::config::{Config, SharedConfig};
use crate::error::Error;
use crate::shutdown;
use crate::web::{self, AppState};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Filter used when `RUST_LOG` is not set
pub const DEFAULT_LOG_FILTER: &str = "info,tower_http=info,hyper=warn,reqwest=warn";

/// Initialize logging with environment-based configuration
pub fn init_logging() -> miette::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| Error::Other(format!("Failed to set up logging: {}", e)))?;

    Ok(())
}

/// Load and initialize the application config
pub async fn load_config() -> miette::Result<SharedConfig> {
    match Config::load() {
        Ok(config) => Ok(config.shared()),
        Err(e) => {
            error!("Failed to load configuration: {:?}", e);
            Err(e.into())
        }
    }
}

/// Credential store and pipeline for this process
pub async fn build_pipeline(config: SharedConfig) -> PrereadPipeline {
    let token_path = config.read().await.token_path.clone();
    let store = Arc::new(CredentialStore::new(token_path));
    PrereadPipeline::from_config(config, store)
}

/// Run the dashboard until SIGINT/SIGTERM, then stop the job actor
pub async fn serve_dashboard(config: SharedConfig) -> miette::Result<()> {
    let bind_address = config.read().await.bind_address.clone();

    let pipeline = build_pipeline(Arc::clone(&config)).await;
    let job = JobHandle::spawn(pipeline.clone());
    let app = web::router(AppState::new(Arc::clone(&config), pipeline, job.clone()));

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .map_err(Error::from)?;
    info!("Dashboard listening on http://{}", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown::wait_for_signal())
        .await
        .map_err(Error::from)?;

    info!("Dashboard stopped, shutting down job actor");
    if let Err(e) = job.shutdown().await {
        error!("Error shutting down job actor: {:?}", e);
    } else {
        info!("Job actor shut down successfully");
    }

    Ok(())
}
