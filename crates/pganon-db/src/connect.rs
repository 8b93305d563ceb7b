use std::time::Duration;

use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions, PgSslMode};
use sqlx::{Postgres, Transaction};
use tracing::debug;

use pganon_core::{DatabaseConfig, Error, Result};

/// Builds connections from the configured properties with libpq-style
/// environment fallbacks.
pub struct Connector {
    config: DatabaseConfig,
}

impl Connector {
    pub fn new(config: &DatabaseConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    fn connect_options(&self) -> Result<PgConnectOptions> {
        let database = self
            .config
            .effective_database()
            .ok_or_else(|| Error::config("database name is required"))?;
        let user = self
            .config
            .effective_user()
            .ok_or_else(|| Error::config("database user is required"))?;

        let mut options = PgConnectOptions::new()
            .host(&self.config.effective_host())
            .port(self.config.effective_port())
            .database(&database)
            .username(&user)
            .ssl_mode(parse_ssl_mode(&self.config.effective_sslmode()));

        if let Some(password) = self.config.effective_password() {
            options = options.password(&password);
        }
        if let Some(cert) = &self.config.sslcert {
            options = options.ssl_client_cert(cert);
        }
        if let Some(key) = &self.config.sslkey {
            options = options.ssl_client_key(key);
        }
        if let Some(root) = &self.config.sslrootcert {
            options = options.ssl_root_cert(root);
        }

        Ok(options)
    }

    /// Open a small pool and verify connectivity.
    pub async fn connect(&self) -> Result<PgPool> {
        let options = self.connect_options()?;
        debug!(database = %self.config.redacted(), "connecting");

        let pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(10))
            .connect_with(options)
            .await
            .map_err(|err| Error::database("connect", err))?;

        sqlx::query("SELECT 1")
            .execute(&pool)
            .await
            .map_err(|err| Error::database("connect", err))?;

        Ok(pool)
    }
}

fn parse_ssl_mode(mode: &str) -> PgSslMode {
    match mode {
        "disable" => PgSslMode::Disable,
        "require" => PgSslMode::Require,
        "verify-ca" => PgSslMode::VerifyCa,
        "verify-full" => PgSslMode::VerifyFull,
        _ => PgSslMode::Prefer,
    }
}

/// Begin the run's transaction at SERIALIZABLE isolation.
pub async fn begin_serializable(pool: &PgPool) -> Result<Transaction<'static, Postgres>> {
    let mut tx = pool
        .begin()
        .await
        .map_err(|err| Error::database("begin", err))?;

    sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
        .execute(&mut *tx)
        .await
        .map_err(|err| Error::database("begin", err))?;

    Ok(tx)
}
