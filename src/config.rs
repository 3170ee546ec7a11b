use serde::Deserialize;

/// Runtime configuration, loaded once at process start.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub db_host: String,
    pub db_user: String,
    pub db_pass: String,
    pub db_port: u16,
    pub db_name: String,
    pub db_pool_size: u32,
    pub port: u16,
    /// Maximum number of retries after a failed query attempt.
    pub db_max_retries: u32,
    /// Base delay for the linear retry backoff, in milliseconds.
    pub db_retry_delay_ms: u64,
    /// Queries slower than this threshold are logged at warning level.
    pub db_slow_query_ms: u64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            db_host: std::env::var("DB_HOST")
                .map_err(|_| anyhow::anyhow!("DB_HOST environment variable required"))
                .and_then(|host| {
                    if host.trim().is_empty() {
                        anyhow::bail!("DB_HOST cannot be empty");
                    }
                    Ok(host)
                })?,
            db_user: std::env::var("DB_USER")
                .map_err(|_| anyhow::anyhow!("DB_USER environment variable required"))
                .and_then(|user| {
                    if user.trim().is_empty() {
                        anyhow::bail!("DB_USER cannot be empty");
                    }
                    Ok(user)
                })?,
            db_pass: std::env::var("DB_PASS")
                .map_err(|_| anyhow::anyhow!("DB_PASS environment variable required"))?,
            db_port: std::env::var("RDS_PORT")
                .unwrap_or_else(|_| "3306".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("RDS_PORT must be a valid port number"))?,
            db_name: std::env::var("DB_NAME")
                .map_err(|_| anyhow::anyhow!("DB_NAME environment variable required"))
                .and_then(|name| {
                    if name.trim().is_empty() {
                        anyhow::bail!("DB_NAME cannot be empty");
                    }
                    Ok(name)
                })?,
            db_pool_size: std::env::var("DB_POOL_SIZE")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("DB_POOL_SIZE must be a positive number"))
                .and_then(|size: u32| {
                    if size == 0 {
                        anyhow::bail!("DB_POOL_SIZE must be at least 1");
                    }
                    Ok(size)
                })?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            db_max_retries: std::env::var("DB_MAX_RETRIES")
                .unwrap_or_else(|_| "3".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("DB_MAX_RETRIES must be a number"))?,
            db_retry_delay_ms: std::env::var("DB_RETRY_DELAY_MS")
                .unwrap_or_else(|_| "1000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("DB_RETRY_DELAY_MS must be a number"))?,
            db_slow_query_ms: std::env::var("DB_SLOW_QUERY_MS")
                .unwrap_or_else(|_| "1000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("DB_SLOW_QUERY_MS must be a number"))?,
        };

        // Log successful configuration load (without sensitive values)
        tracing::info!("Configuration loaded successfully");
        tracing::debug!("Database host: {}:{}", config.db_host, config.db_port);
        tracing::debug!("Database name: {}", config.db_name);
        tracing::debug!("Pool size: {}", config.db_pool_size);
        tracing::debug!("Server port: {}", config.port);

        Ok(config)
    }
}
