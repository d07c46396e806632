use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use mcp_kube_server::auth::{PasswordHasher, Principal, StaticCredentialStore, TokenAuthority};
use mcp_kube_server::config::{AppConfig, CliConfig, FileConfig};
use mcp_kube_server::kubernetes::{HttpClusterClient, ResourceGateway};
use mcp_kube_server::mcp::Dispatcher;
use mcp_kube_server::server::{run_server, RequestsLoggingLevel, ServerConfig};

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(msg).with_context(|| format!("Error resolving path: {}", s));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to a TOML config file; its values override CLI arguments.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// The address to listen on.
    #[clap(long, default_value = "0.0.0.0")]
    pub host: String,

    /// The port to listen on.
    #[clap(short, long, default_value_t = 3000)]
    pub port: u16,

    /// Allowed CORS origins ("*" for any). Repeatable.
    #[clap(long = "cors-origin", default_values_t = vec!["*".to_string()])]
    pub cors_origins: Vec<String>,

    /// The level of logging to perform on each request.
    #[clap(long, default_value = "path")]
    pub logging_level: RequestsLoggingLevel,

    /// Rate limit window in milliseconds.
    #[clap(long, default_value_t = 900_000)]
    pub rate_limit_window_ms: u64,

    /// Maximum requests per identity per window.
    #[clap(long, default_value_t = 100)]
    pub rate_limit_max: u32,

    /// Use in-cluster service account credentials.
    #[clap(long)]
    pub in_cluster: bool,

    /// Path to a kubeconfig file (falls back to $KUBECONFIG / ~/.kube/config).
    #[clap(long, value_parser = parse_path)]
    pub kubeconfig: Option<PathBuf>,

    /// Default namespace for operations that do not specify one.
    #[clap(long)]
    pub namespace: Option<String>,

    /// Timeout in seconds for cluster API requests.
    #[clap(long, default_value_t = 30)]
    pub cluster_timeout_sec: u64,

    /// Disable authentication entirely; every caller becomes an admin.
    #[clap(long)]
    pub auth_disabled: bool,

    /// Secret used to sign bearer tokens.
    #[clap(long)]
    pub jwt_secret: Option<String>,

    /// Lifetime of issued tokens in seconds.
    #[clap(long, default_value_t = 86_400)]
    pub token_lifetime_secs: u64,

    /// Argon2 time cost for password hashing.
    #[clap(long, default_value_t = 2)]
    pub hash_time_cost: u32,

    /// Username of the single configured principal.
    #[clap(long, default_value = "admin")]
    pub admin_username: String,

    /// Password of the single configured principal.
    #[clap(long, default_value = "admin123")]
    pub admin_password: String,
}

impl CliArgs {
    fn to_cli_config(&self) -> CliConfig {
        CliConfig {
            host: self.host.clone(),
            port: self.port,
            cors_origins: self.cors_origins.clone(),
            logging_level: self.logging_level.clone(),
            rate_limit_window_ms: self.rate_limit_window_ms,
            rate_limit_max: self.rate_limit_max,
            in_cluster: self.in_cluster,
            kubeconfig: self.kubeconfig.clone(),
            namespace: self.namespace.clone(),
            cluster_timeout_sec: self.cluster_timeout_sec,
            auth_disabled: self.auth_disabled,
            jwt_secret: self.jwt_secret.clone(),
            token_lifetime_secs: self.token_lifetime_secs,
            hash_time_cost: self.hash_time_cost,
            admin_username: self.admin_username.clone(),
            admin_password: self.admin_password.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .unwrap();

    let file_config = match &cli_args.config {
        Some(path) => Some(FileConfig::load(path)?),
        None => None,
    };
    let config = AppConfig::resolve(&cli_args.to_cli_config(), file_config)?;

    info!("Connecting to the Kubernetes control plane...");
    let cluster_client = Arc::new(HttpClusterClient::connect(
        &config.cluster_connection,
        Duration::from_secs(config.cluster_timeout_sec),
    )?);
    let gateway = Arc::new(ResourceGateway::new(
        cluster_client,
        config.namespace.clone(),
    ));

    let dispatcher = Arc::new(Dispatcher::new(gateway));
    info!(
        "Tool registry initialized with {} tools",
        dispatcher.registry().tool_count()
    );

    let token_authority = Arc::new(TokenAuthority::new(
        &config.jwt_secret,
        Duration::from_secs(config.token_lifetime_secs),
    ));
    let admin = Principal {
        id: "1".to_string(),
        username: config.admin_username.clone(),
        roles: vec![
            "admin".to_string(),
            "kubernetes:read".to_string(),
            "kubernetes:write".to_string(),
        ],
    };
    let credential_store = Arc::new(StaticCredentialStore::new(
        admin,
        &config.admin_password,
        PasswordHasher::new(config.hash_time_cost),
    )?);

    if !config.auth_enabled {
        info!("Authentication is DISABLED; all requests run as admin");
    }

    let server_config = ServerConfig {
        requests_logging_level: config.logging_level.clone(),
        host: config.host.clone(),
        port: config.port,
        cors_origins: config.cors_origins.clone(),
        auth_enabled: config.auth_enabled,
        rate_limit_max: config.rate_limit_max,
        rate_limit_window_ms: config.rate_limit_window_ms,
    };

    info!("Ready to serve at port {}!", config.port);
    run_server(server_config, dispatcher, token_authority, credential_store).await
}
