use crate::config::Config;
use sqlx::mysql::{MySqlConnectOptions, MySqlPoolOptions};
use sqlx::MySqlPool;

pub struct Database {
    pub pool: MySqlPool,
}

impl Database {
    /// Builds the connection pool and verifies connectivity with a ping.
    /// Startup fails fast if the database is unreachable.
    pub async fn new(config: &Config) -> anyhow::Result<Self> {
        let options = MySqlConnectOptions::new()
            .host(&config.db_host)
            .username(&config.db_user)
            .password(&config.db_pass)
            .port(config.db_port)
            .database(&config.db_name);

        let pool = MySqlPoolOptions::new()
            .max_connections(config.db_pool_size)
            .connect_with(options)
            .await?;

        // Connectivity check; waiting callers queue on the pool rather than
        // being rejected once the service is up.
        sqlx::query("SELECT 1").execute(&pool).await?;

        Ok(Self { pool })
    }
}
