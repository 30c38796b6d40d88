use anyhow::{ensure, Context, Result};

use crate::energy::PowerModelConfig;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_host: String,
    pub server_port: u16,
    /// Postgres connection string. Devices are kept in memory when unset.
    pub database_url: Option<String>,
    /// Statistics collection interval in seconds.
    pub stats_interval_secs: u64,
    /// Degrees Celsius at which a thermostat draws its rated power.
    pub thermostat_setpoint: f64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let optional = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_owned());

        let stats_interval_secs: u64 = optional("STATS_INTERVAL_SECS", "300")
            .parse()
            .context("STATS_INTERVAL_SECS must be a positive integer")?;
        ensure!(stats_interval_secs > 0, "STATS_INTERVAL_SECS must be a positive integer");

        let thermostat_setpoint: f64 = optional("THERMOSTAT_SETPOINT_C", "22")
            .parse()
            .context("THERMOSTAT_SETPOINT_C must be a number")?;
        ensure!(thermostat_setpoint.is_finite(), "THERMOSTAT_SETPOINT_C must be a finite number");

        Ok(Self {
            server_host: optional("SERVER_HOST", "0.0.0.0"),
            server_port: optional("SERVER_PORT", "8080")
                .parse()
                .context("SERVER_PORT must be a valid port number")?,
            database_url: lookup("DATABASE_URL").filter(|s| !s.trim().is_empty()),
            stats_interval_secs,
            thermostat_setpoint,
        })
    }

    pub fn power_model(&self) -> PowerModelConfig {
        PowerModelConfig {
            thermostat_setpoint: self.thermostat_setpoint,
            ..PowerModelConfig::default()
        }
    }
}
