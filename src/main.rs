#![allow(clippy::result_large_err)]

use dotenvy::dotenv;
use leadtrack::{
    config::{self, database},
    errors::Result,
    notify::LogNotifier,
    scheduler::{ReminderScheduler, SchedulerConfig},
};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; variables may also come from the environment itself
    dotenv().ok();

    // 3. Load the application configuration
    let app_config = config::load_default_config()
        .inspect_err(|e| error!("Failed to load configuration: {}", e))?;

    // 4. Connect and make sure the schema exists
    let database_url = database::resolve_database_url(&app_config.database.url);
    let db = database::create_connection(&database_url)
        .await
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    database::create_tables(&db)
        .await
        .inspect(|()| info!("Database schema ready."))
        .inspect_err(|e| error!("Failed to create tables: {}", e))?;

    // 5. Run the reminder sweep until interrupted
    let scheduler = ReminderScheduler::new(
        Arc::new(db),
        Arc::new(LogNotifier),
        SchedulerConfig::from_app_config(&app_config),
    );
    let handle = scheduler.start();

    tokio::signal::ctrl_c().await?;
    info!("Shutdown requested.");
    handle.shutdown().await
}
