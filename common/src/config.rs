use serde::Deserialize;
use std::{error::Error, path::Path};

use crate::yaml_include::load_yaml_string_with_includes;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct CommonConfig {
    pub project_name: String,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct BackendConfig {
    pub server_address: String,
    pub log_level: String,
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ScoringConfig {
    /// Optional YAML rule set replacing the built-in one.
    #[serde(default)]
    pub rules_file: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    pub common: CommonConfig,
    pub backend: BackendConfig,
    #[serde(default)]
    pub scoring: ScoringConfig,
}

impl Config {
    pub fn load(config_path: &str) -> Result<Self, Box<dyn Error + Send + Sync>> {
        let contents = load_yaml_string_with_includes(Path::new(config_path))?;
        let config = serde_yml::from_str(&contents)?;

        Ok(config)
    }

    /// Replaces the port of `backend.server_address`, keeping the host.
    pub fn override_port(&mut self, port: u16) {
        let host = match self.backend.server_address.rsplit_once(':') {
            Some((host, _)) => host,
            None => self.backend.server_address.as_str(),
        };
        self.backend.server_address = format!("{}:{}", host, port);
    }
}
