//! Subscription lifecycle configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionConfig {
    /// Days a past-due subscription keeps access before it is canceled
    #[serde(default = "default_grace_period_days")]
    pub grace_period_days: u32,

    /// Seconds between lifecycle sweeps
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

impl SubscriptionConfig {
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.sweep_interval_secs == 0 {
            return Err(ValidationError::InvalidSweepInterval);
        }
        Ok(())
    }
}

impl Default for SubscriptionConfig {
    fn default() -> Self {
        Self {
            grace_period_days: default_grace_period_days(),
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

fn default_grace_period_days() -> u32 {
    7
}

fn default_sweep_interval() -> u64 {
    300
}
