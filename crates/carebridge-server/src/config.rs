use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use carebridge_auth::AuthConfig;
use carebridge_billing::BillingConfig;
use carebridge_events::EventsConfig;
use serde::{Deserialize, Serialize};

/// Environment variable naming the config file.
pub const CONFIG_PATH_ENV: &str = "CAREBRIDGE_CONFIG";

/// Config file used when `CAREBRIDGE_CONFIG` is unset.
pub const DEFAULT_CONFIG_PATH: &str = "carebridge.toml";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Token signing parameters and seed users
    #[serde(default)]
    pub auth: AuthConfig,
    /// Billing service address and time budgets
    #[serde(default)]
    pub billing: BillingConfig,
    /// Event stream backend and dispatch
    #[serde(default)]
    pub events: EventsConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), String> {
        // Server validations
        if self.server.auth_port == 0 || self.server.patient_port == 0 {
            return Err("server ports must be > 0".into());
        }
        if self.server.auth_port == self.server.patient_port {
            return Err("server.auth_port and server.patient_port must differ".into());
        }
        // Logging validation
        let lvl = self.logging.level.to_ascii_lowercase();
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&lvl.as_str()) {
            return Err(format!("logging.level must be one of {valid_levels:?}"));
        }
        self.auth
            .validate()
            .map_err(|e| format!("auth config error: {e}"))?;
        self.billing
            .validate()
            .map_err(|e| format!("billing config error: {e}"))?;
        self.events
            .validate()
            .map_err(|e| format!("events config error: {e}"))?;
        Ok(())
    }

    pub fn auth_addr(&self) -> SocketAddr {
        SocketAddr::from((self.server.ip(), self.server.auth_port))
    }

    pub fn patient_addr(&self) -> SocketAddr {
        SocketAddr::from((self.server.ip(), self.server.patient_port))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub auth_port: u16,
    pub patient_port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            auth_port: 4005,
            patient_port: 4000,
        }
    }
}

impl ServerConfig {
    fn ip(&self) -> IpAddr {
        self.host
            .parse()
            .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

pub mod loader {
    use super::{AppConfig, CONFIG_PATH_ENV, DEFAULT_CONFIG_PATH};
    use config::{Config, Environment, File};
    use std::path::PathBuf;

    /// Path from `CAREBRIDGE_CONFIG`, or the default file name.
    pub fn config_path() -> String {
        std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string())
    }

    /// Loads the optional TOML file, then applies environment overrides.
    pub fn load_config(path: Option<&str>) -> Result<AppConfig, String> {
        let mut builder = Config::builder();
        let pathbuf = PathBuf::from(path.unwrap_or(DEFAULT_CONFIG_PATH));
        if pathbuf.exists() {
            builder = builder.add_source(File::from(pathbuf));
        }
        // Environment variable overrides, e.g., CAREBRIDGE__BILLING__PORT=9002
        builder = builder.add_source(
            Environment::with_prefix("CAREBRIDGE")
                .prefix_separator("__")
                .try_parsing(true)
                .separator("__"),
        );
        let cfg = builder
            .build()
            .map_err(|e| format!("config build error: {e}"))?;
        let merged: AppConfig = cfg
            .try_deserialize()
            .map_err(|e| format!("config deserialize error: {e}"))?;
        merged.validate()?;
        Ok(merged)
    }
}
