use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    // Core settings (can override CLI)
    pub host: Option<String>,
    pub port: Option<u16>,
    pub cors_origins: Option<Vec<String>>,
    pub logging_level: Option<String>,

    // Feature configs
    pub rate_limit: Option<RateLimitConfig>,
    pub kubernetes: Option<KubernetesConfig>,
    pub auth: Option<AuthConfig>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct RateLimitConfig {
    pub window_ms: Option<u64>,
    pub max: Option<u32>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct KubernetesConfig {
    pub in_cluster: Option<bool>,
    pub kubeconfig: Option<String>,
    pub namespace: Option<String>,
    pub timeout_sec: Option<u64>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct AuthConfig {
    pub enabled: Option<bool>,
    pub jwt_secret: Option<String>,
    pub token_lifetime_secs: Option<u64>,
    pub hash_time_cost: Option<u32>,
    pub admin_username: Option<String>,
    pub admin_password: Option<String>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}
