/**
 * CoreDevs Server Entry Point
 *
 * Loads `.env`, assembles the settings, and serves the sample services.
 */

use coredevs::backend::server::App;
use coredevs::backend::services::{DemoService, UserService};
use coredevs::shared::Settings;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env file if present
    dotenv::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(&env_filter))
        .init();

    let settings = match Settings::load() {
        Ok(settings) => settings,
        Err(e) => {
            tracing::error!("{}", e);
            return Err(e.into());
        }
    };

    App::new(settings)
        .await?
        .service(UserService)
        .service(DemoService)
        .start()
        .await?;

    Ok(())
}
