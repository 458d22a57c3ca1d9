// Configuration module entry point
// Loads settings and resolves the serving root

mod state;
mod types;

use std::net::SocketAddr;

use crate::error::ServerError;

// Re-export public types
pub use state::{is_within_root, resolve_root, AppState};
pub use types::{
    Config, HttpConfig, LoggingConfig, PerformanceConfig, ServerConfig, DEFAULT_PORT,
};

/// Config file looked up in the working directory, extension optional
pub const DEFAULT_CONFIG_FILE: &str = "dirhost";

/// Environment variable prefix, e.g. `DIRHOST_SERVER__PORT=9000`
pub const ENV_PREFIX: &str = "DIRHOST";

impl Config {
    /// Load configuration from the default file name and the environment
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from(DEFAULT_CONFIG_FILE)
    }

    /// Load configuration from specified file path (without extension)
    ///
    /// A missing file is not an error; every key has a default that reproduces
    /// the fixed behavior (all interfaces, port 8000, executable's directory).
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .set_default("server.host", types::default_host())?
            .set_default("server.port", DEFAULT_PORT)?
            .set_default("logging.access_log", true)?
            .set_default("logging.access_log_format", types::default_access_log_format())?
            .set_default("performance.keep_alive", true)?
            .set_default("performance.connection_timeout", 30)?
            .set_default("http.index_files", types::default_index_files())?
            .set_default("http.directory_listing", true)?
            .set_default("http.server_name", types::default_server_name())?
            .build()?;

        settings.try_deserialize()
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, ServerError> {
        let addr = format!("{}:{}", self.server.host, self.server.port);
        addr.parse()
            .map_err(|source| ServerError::Address { addr, source })
    }
}
