use std::path::PathBuf;

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// The monitor configuration itself lives in `config.json` inside
/// `data_dir`, not in the environment.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `5005`).
    pub port: u16,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Directory holding `config.json` and snapshot records (default: `data`).
    pub data_dir: PathBuf,
    /// Singleton lock path; `None` uses the system temp directory.
    pub lock_path: Option<PathBuf>,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default            |
    /// |------------------------|--------------------|
    /// | `HOST`                 | `0.0.0.0`          |
    /// | `PORT`                 | `5005`             |
    /// | `REQUEST_TIMEOUT_SECS` | `30`               |
    /// | `LICMON_DATA_DIR`      | `data`             |
    /// | `LICMON_LOCK_PATH`     | temp dir           |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "5005".into())
            .parse()
            .expect("PORT must be a valid u16");

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let data_dir = std::env::var("LICMON_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("data"));

        let lock_path = std::env::var("LICMON_LOCK_PATH")
            .ok()
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from);

        Self {
            host,
            port,
            request_timeout_secs,
            data_dir,
            lock_path,
        }
    }
}
