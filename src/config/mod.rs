// Configuration module entry point
// Loads the startup configuration and builds the shared application state

mod state;
mod types;

use std::net::SocketAddr;

const DEFAULT_CONFIG: &str = "config";

// Re-export public types
pub use state::AppState;
pub use types::{AppConfig, Config, HttpConfig, PerformanceConfig};

impl Config {
    /// Load the default "config.toml", which may be absent
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_sources(DEFAULT_CONFIG, false)
    }

    /// Load configuration from specified file path (extension optional).
    /// The file must exist.
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        Self::load_sources(config_path, true)
    }

    fn load_sources(config_path: &str, required: bool) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(config_path).required(required))
            .add_source(
                config::Environment::with_prefix("DASHBOARD")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }

    /// Apply command line overrides on top of the loaded configuration
    #[must_use]
    pub fn with_overrides(mut self, host: Option<String>, port: Option<u16>, debug: bool) -> Self {
        if let Some(host) = host {
            self.server.host = host;
        }
        if let Some(port) = port {
            self.server.port = port;
        }
        if debug {
            self.app.debug = true;
        }
        self
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
    use std::path::PathBuf;

    #[test]
    fn test_defaults_without_file() {
        let cfg = Config::load_sources("does-not-exist/config", false).unwrap();
        assert_eq!(cfg.server.port, 5000);
        assert_eq!(cfg.app.data_dir, PathBuf::from("data"));
        assert_eq!(cfg.app.template, PathBuf::from("templates/index.html"));
        assert!(cfg.logging.access_log);
        assert_eq!(cfg.performance.keep_alive_timeout, 75);
    }

    #[test]
    fn test_explicit_path_must_exist() {
        let err = Config::load_from("does-not-exist/config").unwrap_err();
        assert!(err.to_string().contains("does-not-exist/config"), "{err}");
    }

    #[test]
    fn test_load_partial_file() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        writeln!(
            file,
            "[server]\nport = 8088\n\n[app]\ndebug = true\ndata_dir = \"/srv/dashboard/data\"\n"
        )
        .unwrap();

        let cfg = Config::load_from(file.path().to_str().unwrap()).unwrap();
        assert_eq!(cfg.server.port, 8088);
        assert_eq!(cfg.server.host, "127.0.0.1");
        assert!(cfg.app.debug);
        assert_eq!(cfg.app.data_dir, PathBuf::from("/srv/dashboard/data"));
        assert_eq!(cfg.logging.access_log_format, "combined");
    }

    #[test]
    fn test_overrides() {
        let cfg = Config::default().with_overrides(Some("0.0.0.0".to_string()), Some(9000), true);
        assert_eq!(cfg.get_socket_addr().unwrap().to_string(), "0.0.0.0:9000");
        assert!(cfg.app.debug);

        let cfg = Config::default().with_overrides(None, None, false);
        assert!(!cfg.app.debug);
        assert_eq!(cfg.server.port, 5000);
    }

    #[test]
    fn test_invalid_socket_addr() {
        let mut cfg = Config::default();
        cfg.server.host = "not an address".to_string();
        assert!(cfg.get_socket_addr().is_err());
    }
}
