#[cfg(test)]
pub mod test_utils {
    use axum::Router;
    use migration::{Migrator, MigratorTrait};
    use moka::future::Cache;
    use rust_decimal::Decimal;
    use sea_orm::{ActiveModelTrait, ConnectionTrait, Database, DatabaseConnection, Set};
    use tracing::Level;
    use tracing_subscriber::FmtSubscriber;

    use crate::router::create_router;
    use crate::schemas::AppState;

    /// Create an in-memory SQLite database for testing
    pub async fn setup_test_db() -> DatabaseConnection {
        let db = Database::connect("sqlite::memory:")
            .await
            .expect("Failed to connect to in-memory database");

        db.execute_unprepared("PRAGMA foreign_keys = ON;")
            .await
            .expect("Failed to enable foreign keys");

        // Run migrations
        Migrator::up(&db, None)
            .await
            .expect("Failed to run migrations");

        db
    }

    /// Insert a user directly, bypassing the registration handler. The stored
    /// hash is a placeholder; engine-level tests never verify passwords.
    pub async fn create_test_user(
        db: &DatabaseConnection,
        username: &str,
    ) -> model::entities::user::Model {
        model::entities::user::ActiveModel {
            username: Set(username.to_string()),
            password_hash: Set("$2b$12$testplaceholderhash".to_string()),
            avatar_url: Set(None),
            debt: Set(Decimal::ZERO),
            ..Default::default()
        }
        .insert(db)
        .await
        .expect("Failed to create test user")
    }

    /// Create AppState for testing
    pub async fn setup_test_app_state() -> AppState {
        let db = setup_test_db().await;
        let sessions = Cache::new(100);

        AppState { db, sessions }
    }

    /// Initialize tracing for tests with output to STDERR.
    ///
    /// The log level is taken from the RUST_LOG environment variable,
    /// defaulting to WARN if not set.
    fn init_test_tracing() -> tracing::subscriber::DefaultGuard {
        let log_level = std::env::var("RUST_LOG")
            .ok()
            .and_then(|level| match level.to_uppercase().as_str() {
                "ERROR" => Some(Level::ERROR),
                "WARN" => Some(Level::WARN),
                "INFO" => Some(Level::INFO),
                "DEBUG" => Some(Level::DEBUG),
                "TRACE" => Some(Level::TRACE),
                _ => None,
            })
            .unwrap_or(Level::WARN);

        let subscriber = FmtSubscriber::builder()
            .with_max_level(log_level)
            .with_writer(std::io::stderr)
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    /// Create axum app for testing
    pub async fn setup_test_app() -> Router {
        let _ = init_test_tracing();

        let state = setup_test_app_state().await;
        create_router(state)
    }
}
