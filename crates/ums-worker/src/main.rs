//! Worker entry point
//!
//! Run with:
//! ```bash
//! cargo run -p ums-worker
//! ```
//!
//! Configuration is loaded from environment variables (and `.env`).

use tracing::{error, info};
use ums_common::{try_init_tracing_with_config, AppConfig, TracingConfig};

#[tokio::main]
async fn main() {
    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = try_init_tracing_with_config(TracingConfig::for_environment(config.app.env)) {
        eprintln!("Warning: Failed to initialize tracing: {e}");
    }

    info!(
        name = %config.app.name,
        env = ?config.app.env,
        media_server = config.media_server.is_some(),
        email_provider = ?config.email.provider,
        "Configuration loaded"
    );

    if let Err(e) = ums_worker::run(config).await {
        error!(error = %e, "Worker failed");
        std::process::exit(1);
    }
}
