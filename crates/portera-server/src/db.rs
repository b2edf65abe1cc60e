use std::time::Duration;

use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};

/// Open the role store connection pool.
///
/// Network timeouts stay in the few-second range; the 24h token expiry is
/// business state, never an I/O budget.
pub async fn connect(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(database_url.to_string());

    options.max_connections(5);
    options.min_connections(1);
    options.connect_timeout(Duration::from_secs(5));
    options.acquire_timeout(Duration::from_secs(5));
    options.idle_timeout(Duration::from_secs(30));
    options.sqlx_logging(false);

    Database::connect(options).await
}
