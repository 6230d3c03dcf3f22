//! Service configuration
//!
//! `config/default.toml` overlaid with `STOREFRONT__`-prefixed environment
//! variables (`STOREFRONT__SERVER__PORT=9000`).

use anyhow::{Context, Result};
use figment::{providers::{Env, Format, Serialized, Toml}, Figment};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;

use crate::domain::pricing::PricingTable;
use crate::domain::solar::{EstimatorSettings, SolarSizingEstimator};

pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";
const ENV_PREFIX: &str = "STOREFRONT__";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub estimator: EstimatorSettings,
    #[serde(default)]
    pub pricing: PricingTable,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig { pub host: String, pub port: u16 }

impl Default for ServerConfig {
    fn default() -> Self { Self { host: "0.0.0.0".to_string(), port: 8083 } }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        Ok(format!("{}:{}", self.host, self.port).parse()?)
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let figment = Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"));
        figment.extract().context("invalid storefront configuration")
    }

    pub fn estimator(&self) -> Result<SolarSizingEstimator> {
        SolarSizingEstimator::new(self.estimator.clone(), self.pricing.clone()).context("estimator configuration rejected")
    }
}
