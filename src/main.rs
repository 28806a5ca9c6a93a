use preread::startup;
use tracing::info;

#[tokio::main]
async fn main() -> miette::Result<()> {
    // Initialize logging
    startup::init_logging()?;

    info!("Starting preread dashboard");

    // Load configuration
    let config = startup::load_config().await?;

    // Serve until a termination signal arrives
    startup::serve_dashboard(config).await
}
