//! Demo entry point.

use app::{AppError, Config, LogFormat};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    let json = config.log_format == LogFormat::Json;

    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(tracing_subscriber::fmt::layer))
        .init();
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // 1. Load configuration and initialize tracing
    let config = Config::from_env();
    init_tracing(&config);
    tracing::info!(user_id = %config.demo_user_id, "starting learning journey demo");

    // 2. Run the scripted session
    let summary = app::run(&config).await.inspect_err(|e| {
        tracing::error!(error = %e, "demo failed");
    })?;

    // 3. Report
    let rendered = serde_json::to_string(&summary)?;
    tracing::info!(summary = %rendered, "demo finished");
    Ok(())
}
