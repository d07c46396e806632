mod file_config;

pub use file_config::{AuthConfig, FileConfig, KubernetesConfig, RateLimitConfig};

use crate::kubernetes::ClusterConnection;
use crate::server::RequestsLoggingLevel;
use anyhow::{bail, Result};
use clap::ValueEnum;
use std::path::PathBuf;
use tracing::warn;

/// Signing key used when none is configured. Fine for local experiments,
/// not for anything reachable from a network you do not own.
pub const DEFAULT_JWT_SECRET: &str = "your-secret-key";

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
    pub logging_level: RequestsLoggingLevel,
    pub rate_limit_window_ms: u64,
    pub rate_limit_max: u32,
    pub in_cluster: bool,
    pub kubeconfig: Option<PathBuf>,
    pub namespace: Option<String>,
    pub cluster_timeout_sec: u64,
    pub auth_disabled: bool,
    pub jwt_secret: Option<String>,
    pub token_lifetime_secs: u64,
    pub hash_time_cost: u32,
    pub admin_username: String,
    pub admin_password: String,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            cors_origins: vec!["*".to_string()],
            logging_level: RequestsLoggingLevel::Path,
            rate_limit_window_ms: 900_000,
            rate_limit_max: 100,
            in_cluster: false,
            kubeconfig: None,
            namespace: None,
            cluster_timeout_sec: 30,
            auth_disabled: false,
            jwt_secret: None,
            token_lifetime_secs: 86_400,
            hash_time_cost: 2,
            admin_username: "admin".to_string(),
            admin_password: "admin123".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    // HTTP surface
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
    pub logging_level: RequestsLoggingLevel,
    pub rate_limit_window_ms: u64,
    pub rate_limit_max: u32,

    // Cluster access
    pub cluster_connection: ClusterConnection,
    pub namespace: Option<String>,
    pub cluster_timeout_sec: u64,

    // Auth
    pub auth_enabled: bool,
    pub jwt_secret: String,
    pub token_lifetime_secs: u64,
    pub hash_time_cost: u32,
    pub admin_username: String,
    pub admin_password: String,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let host = file.host.unwrap_or_else(|| cli.host.clone());
        let port = file.port.unwrap_or(cli.port);
        let cors_origins = file
            .cors_origins
            .unwrap_or_else(|| cli.cors_origins.clone());
        if cors_origins.is_empty() {
            bail!("At least one CORS origin must be configured (use \"*\" for any)");
        }

        let logging_level = file
            .logging_level
            .and_then(|s| parse_logging_level(&s))
            .unwrap_or_else(|| cli.logging_level.clone());

        let rate_limit = file.rate_limit.unwrap_or_default();
        let rate_limit_window_ms = rate_limit.window_ms.unwrap_or(cli.rate_limit_window_ms);
        let rate_limit_max = rate_limit.max.unwrap_or(cli.rate_limit_max);
        if rate_limit_window_ms == 0 || rate_limit_max == 0 {
            bail!("Rate limit window and max must both be positive");
        }

        let kubernetes = file.kubernetes.unwrap_or_default();
        let in_cluster = kubernetes.in_cluster.unwrap_or(cli.in_cluster);
        let kubeconfig = kubernetes
            .kubeconfig
            .map(PathBuf::from)
            .or_else(|| cli.kubeconfig.clone());
        let cluster_connection = if in_cluster {
            ClusterConnection::InCluster
        } else if let Some(path) = kubeconfig {
            if !path.exists() {
                bail!("Kubeconfig file not found: {:?}", path);
            }
            ClusterConnection::Kubeconfig(path)
        } else {
            ClusterConnection::Default
        };
        let namespace = kubernetes.namespace.or_else(|| cli.namespace.clone());
        let cluster_timeout_sec = kubernetes.timeout_sec.unwrap_or(cli.cluster_timeout_sec);

        let auth = file.auth.unwrap_or_default();
        let auth_enabled = auth.enabled.unwrap_or(!cli.auth_disabled);
        let jwt_secret = match auth.jwt_secret.or_else(|| cli.jwt_secret.clone()) {
            Some(secret) => secret,
            None => {
                if auth_enabled {
                    warn!("No JWT secret configured, using the built-in default");
                }
                DEFAULT_JWT_SECRET.to_string()
            }
        };
        let token_lifetime_secs = auth.token_lifetime_secs.unwrap_or(cli.token_lifetime_secs);
        let hash_time_cost = auth.hash_time_cost.unwrap_or(cli.hash_time_cost);
        if hash_time_cost == 0 {
            bail!("hash_time_cost must be at least 1");
        }
        let admin_username = auth
            .admin_username
            .unwrap_or_else(|| cli.admin_username.clone());
        let admin_password = auth
            .admin_password
            .unwrap_or_else(|| cli.admin_password.clone());

        Ok(Self {
            host,
            port,
            cors_origins,
            logging_level,
            rate_limit_window_ms,
            rate_limit_max,
            cluster_connection,
            namespace,
            cluster_timeout_sec,
            auth_enabled,
            jwt_secret,
            token_lifetime_secs,
            hash_time_cost,
            admin_username,
            admin_password,
        })
    }
}

/// Parses a logging level string into RequestsLoggingLevel.
/// Uses clap's ValueEnum trait for parsing.
fn parse_logging_level(s: &str) -> Option<RequestsLoggingLevel> {
    RequestsLoggingLevel::from_str(s, true).ok()
}
