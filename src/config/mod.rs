//! Application configuration
//!
//! Loaded from environment variables with the `config` and `dotenvy` crates.
//! Keys carry the `COMMERCE` prefix and nest with `__`:
//!
//! - `COMMERCE__SERVER__PORT=8080` -> `server.port`
//! - `COMMERCE__DATABASE__URL=postgres://...` -> `database.url`
//! - `COMMERCE__PAYMENT__CREDENTIAL_KEY=...` -> `payment.credential_key`
//!
//! ```no_run
//! use certify_commerce::config::AppConfig;
//!
//! let config = AppConfig::load().expect("configuration");
//! println!("listening on {}:{}", config.server.host, config.server.port);
//! ```

mod database;
mod error;
mod payment;
mod server;
mod subscription;

pub use database::DatabaseConfig;
pub use error::{ConfigError, ValidationError};
pub use payment::PaymentConfig;
pub use server::{Environment, ServerConfig};
pub use subscription::SubscriptionConfig;

use serde::Deserialize;

const ENV_PREFIX: &str = "COMMERCE";

/// Root configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,

    /// Absent: the service runs on the in-memory store
    #[serde(default)]
    pub database: Option<DatabaseConfig>,

    pub payment: PaymentConfig,

    #[serde(default)]
    pub subscription: SubscriptionConfig,
}

impl AppConfig {
    /// Reads `.env` if present, then the process environment, and validates
    /// the result.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config: AppConfig = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix(ENV_PREFIX)
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        if let Some(database) = &self.database {
            database.validate()?;
        }
        self.payment.validate()?;
        self.subscription.validate()?;
        Ok(())
    }

    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}
