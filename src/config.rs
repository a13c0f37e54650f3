use std::time::Duration;

use anyhow::Result;
use moka::future::Cache;
use sea_orm::Database;

use crate::auth::SessionStore;
use crate::schemas::AppState;

/// Sessions expire after a day unless the user logs out first.
const SESSION_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Initialize application configuration and state
pub async fn initialize_app_state_with_url(database_url: &str) -> Result<AppState> {
    dotenvy::dotenv().ok();

    // Connect to database
    tracing::info!("Connecting to database: {}", database_url);
    let db = Database::connect(database_url).await?;

    // Server-side session store keyed by opaque token
    let sessions: SessionStore = Cache::builder()
        .max_capacity(10_000)
        .time_to_live(SESSION_TTL)
        .build();

    Ok(AppState { db, sessions })
}
