// Configuration module entry point
// Loads layered configuration and holds the shared application state

mod state;
mod types;

use std::net::SocketAddr;

// Re-export public types
pub use state::AppState;
pub use types::{Config, StorageBackend, StorageConfig};

/// Default config file (without extension)
pub const DEFAULT_CONFIG_PATH: &str = "config";

impl Config {
    /// Load configuration from specified file path (without extension)
    /// Default config file is "config.toml" when no path specified
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(
                config::Environment::with_prefix("INVENTORY")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("logging.level", "info")?
            .set_default("logging.access_log", true)?
            .set_default("performance.keep_alive_timeout", 75)?
            .set_default("performance.read_timeout", 30)?
            .set_default("performance.write_timeout", 30)?
            .set_default("http.max_body_size", 10_485_760)? // 10MB
            .set_default("storage.backend", "redb")?
            .set_default("storage.path", "product-inventory.redb")?
            .set_default("storage.table", "product-inventory")?
            .set_default("storage.page_size", 100)?
            .build()?;

        settings.try_deserialize()
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| format!("Invalid address: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_without_file() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("absent");
        let config = Config::load_from(missing.to_str().unwrap()).unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.logging.access_log_format, "combined");
        assert_eq!(config.storage.backend, StorageBackend::Redb);
        assert_eq!(config.storage.table, "product-inventory");
        assert_eq!(config.storage.page_size, 100);
        assert_eq!(config.http.max_body_size, 10_485_760);
        assert!(config.performance.max_connections.is_none());
    }

    #[test]
    fn test_file_overrides_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("inventory.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            "[server]\nport = 9090\n\n[storage]\nbackend = \"memory\"\npage_size = 25"
        )
        .unwrap();

        let config = Config::load_from(path.to_str().unwrap()).unwrap();
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.storage.backend, StorageBackend::Memory);
        assert_eq!(config.storage.page_size, 25);
        assert_eq!(
            config.get_socket_addr().unwrap(),
            "127.0.0.1:9090".parse().unwrap()
        );
    }
}
