use std::num::{NonZeroU64, NonZeroUsize};
use std::path::PathBuf;
use std::str::FromStr;

/// Output format of the tracing subscriber.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "pretty" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format '{other}'")),
        }
    }
}

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `8090`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// How long shutdown waits for running jobs to stop (default: `30`).
    pub shutdown_timeout_secs: u64,
    /// Postgres URL. When unset the in-memory store is used.
    pub database_url: Option<String>,
    /// Directory uploaded files are written to (default: `uploads`).
    pub upload_dir: PathBuf,
    /// Largest accepted upload in bytes (default: 100 MiB).
    pub max_file_size: usize,
    /// Upper bound for `chunk_size` in a chunking request (default: `1000`).
    pub max_chunk_size: u32,
    /// Outbound queue capacity per WebSocket connection (default: `256`).
    /// Must be non-zero.
    pub ws_outbound_buffer: usize,
    /// Seconds between heartbeat pings (default: `30`). Must be non-zero.
    pub ws_heartbeat_secs: u64,
    /// Pause between simulated chunk units in milliseconds (default: `100`).
    pub chunk_unit_delay_ms: u64,
    pub log_format: LogFormat,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                    |
    /// |------------------------|----------------------------|
    /// | `HOST`                 | `0.0.0.0`                  |
    /// | `PORT`                 | `8090`                     |
    /// | `CORS_ORIGINS`         | `http://localhost:3001`    |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                       |
    /// | `SHUTDOWN_TIMEOUT_SECS`| `30`                       |
    /// | `DATABASE_URL`         | unset (in-memory store)    |
    /// | `UPLOAD_DIR`           | `uploads`                  |
    /// | `MAX_FILE_SIZE`        | `104857600`                |
    /// | `MAX_CHUNK_SIZE`       | `1000`                     |
    /// | `WS_OUTBOUND_BUFFER`   | `256`                      |
    /// | `WS_HEARTBEAT_SECS`    | `30`                       |
    /// | `CHUNK_UNIT_DELAY_MS`  | `100`                      |
    /// | `LOG_FORMAT`           | `text`                     |
    ///
    /// Panics on a value that does not parse, including a zero heartbeat
    /// interval or outbound buffer; misconfiguration should stop
    /// the process at startup.
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:3001".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let database_url = std::env::var("DATABASE_URL")
            .ok()
            .filter(|url| !url.trim().is_empty());

        let upload_dir = PathBuf::from(
            std::env::var("UPLOAD_DIR").unwrap_or_else(|_| "uploads".into()),
        );

        Self {
            host,
            port: env_or("PORT", "8090"),
            cors_origins,
            request_timeout_secs: env_or("REQUEST_TIMEOUT_SECS", "30"),
            shutdown_timeout_secs: env_or("SHUTDOWN_TIMEOUT_SECS", "30"),
            database_url,
            upload_dir,
            max_file_size: env_or("MAX_FILE_SIZE", "104857600"),
            max_chunk_size: env_or("MAX_CHUNK_SIZE", "1000"),
            ws_outbound_buffer: env_or::<NonZeroUsize>("WS_OUTBOUND_BUFFER", "256").get(),
            ws_heartbeat_secs: env_or::<NonZeroU64>("WS_HEARTBEAT_SECS", "30").get(),
            chunk_unit_delay_ms: env_or("CHUNK_UNIT_DELAY_MS", "100"),
            log_format: env_or("LOG_FORMAT", "text"),
        }
    }
}

/// Read `key`, falling back to `default`, and parse it.
fn env_or<T>(key: &str, default: &str) -> T
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = std::env::var(key).unwrap_or_else(|_| default.to_string());
    raw.parse()
        .unwrap_or_else(|e| panic!("{key} has an invalid value '{raw}': {e}"))
}
