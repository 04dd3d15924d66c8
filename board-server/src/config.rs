//! Board server configuration

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Board server configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// SQLite database file
    pub database_path: String,
    pub http_port: u16,
    /// Environment: development | staging | production
    pub environment: String,
    pub log_level: String,
    /// Daily rolling log files go here when the directory exists
    pub log_dir: Option<String>,
    /// Allowed CORS origins
    pub client_origins: Vec<String>,
    /// Extra attempts for a move that lost a race
    pub move_max_retries: u32,
    /// Per-observer relay queue length
    pub relay_buffer: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: "data/board.db".into(),
            http_port: 5000,
            environment: "development".into(),
            log_level: "info".into(),
            log_dir: None,
            client_origins: vec![
                "http://localhost:3000".into(),
                "http://localhost:5173".into(),
            ],
            move_max_retries: 3,
            relay_buffer: 64,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, BoxError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, BoxError> {
        let defaults = Self::default();
        let get = |name: &str| get(name).filter(|v| !v.trim().is_empty());

        let client_origins = match get("CLIENT_URL") {
            Some(v) => v
                .split(',')
                .map(|s| s.trim().trim_end_matches('/').to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            None => defaults.client_origins,
        };

        Ok(Self {
            database_path: get("DATABASE_PATH").unwrap_or(defaults.database_path),
            http_port: parse_or(get("HTTP_PORT"), "HTTP_PORT", defaults.http_port)?,
            environment: get("ENVIRONMENT").unwrap_or(defaults.environment),
            log_level: get("LOG_LEVEL").unwrap_or(defaults.log_level),
            log_dir: get("LOG_DIR"),
            client_origins,
            move_max_retries: parse_or(
                get("MOVE_MAX_RETRIES"),
                "MOVE_MAX_RETRIES",
                defaults.move_max_retries,
            )?,
            relay_buffer: parse_or(get("RELAY_BUFFER"), "RELAY_BUFFER", defaults.relay_buffer)?,
        })
    }

    /// Production switches logging to JSON
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

fn parse_or<T: std::str::FromStr>(raw: Option<String>, name: &str, default: T) -> Result<T, BoxError> {
    match raw {
        Some(v) => v
            .trim()
            .parse()
            .map_err(|_| format!("{name} has an invalid value: {v}").into()),
        None => Ok(default),
    }
}
