use serde::Deserialize;
use std::collections::HashMap;
use std::fs;

#[derive(Deserialize, Clone)]
pub struct ProviderConfig {
    pub url: String,
    pub reverse_url: Option<String>,
    pub kind: Option<String>,
}

#[derive(Deserialize, Clone)]
pub struct Config {
    pub bind_addr: Option<String>,
    pub thread_count: Option<usize>,
    pub cache_max_entries: Option<u64>,
    pub request_timeout_secs: Option<u64>,
    pub cluster_epsilon_km: Option<f64>,
    pub geocoders: HashMap<String, ProviderConfig>,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let path = if std::path::Path::new("errorgeo.toml").exists() {
            "errorgeo.toml"
        } else if std::path::Path::new("errorgeo.example.toml").exists() {
            "errorgeo.example.toml"
        } else {
            return Err(anyhow::anyhow!("Configuration file not found. Please create errorgeo.toml or provide errorgeo.example.toml."));
        };

        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn cluster_epsilon_km(&self) -> f64 {
        self.cluster_epsilon_km.unwrap_or(1.0)
    }
}
