use super::RequestsLoggingLevel;

#[derive(Clone)]
pub struct ServerConfig {
    pub requests_logging_level: RequestsLoggingLevel,
    pub host: String,
    pub port: u16,
    /// Allowed CORS origins; `*` means any.
    pub cors_origins: Vec<String>,
    /// If false, every request runs as the anonymous super-principal.
    pub auth_enabled: bool,
    pub rate_limit_max: u32,
    pub rate_limit_window_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            requests_logging_level: RequestsLoggingLevel::Path,
            host: "0.0.0.0".to_string(),
            port: 3000,
            cors_origins: vec!["*".to_string()],
            auth_enabled: true,
            rate_limit_max: 100,
            rate_limit_window_ms: 900_000,
        }
    }
}
