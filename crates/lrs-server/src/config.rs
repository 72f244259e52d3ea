//! Server configuration from environment variables.

use std::env;

use lrs_core::Version;

/// One configured extension: a registry name plus an enabled flag.
///
/// Read once at boot; disabled entries are never instantiated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionDescriptor {
    /// Name the extension factory is registered under.
    pub name: String,
    /// Whether to load it.
    pub enabled: bool,
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server port to listen on.
    pub port: u16,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
    /// CORS allowed origins (comma-separated or "*" for all).
    pub cors_allowed_origins: String,
    /// Protocol versions this deployment accepts.
    pub supported_versions: Vec<Version>,
    /// Version assumed on exempt paths and advertised by `/about`.
    pub latest_version: Version,
    /// Extensions to load at boot.
    pub extensions: Vec<ExtensionDescriptor>,
    /// Run storage index installation on boot.
    pub install_on_boot: bool,
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Optional:
    /// - `PORT`: Server port (default: 8080)
    /// - `LOG_LEVEL`: Logging level (default: "info")
    /// - `CORS_ALLOWED_ORIGINS`: Allowed CORS origins (default: "*")
    /// - `LRS_SUPPORTED_VERSIONS`: Comma-separated version list
    ///   (default: "1.0.0,1.0.1,1.0.2,1.0.3")
    /// - `LRS_LATEST_VERSION`: Default/latest version (default: "1.0.3",
    ///   must be in the supported set)
    /// - `LRS_EXTENSIONS`: Comma-separated extension names to enable
    ///   (default: none)
    /// - `LRS_INSTALL_ON_BOOT`: Apply storage indexes at startup
    ///   (default: true)
    pub fn from_env() -> Result<Self, ConfigError> {
        let port = env::var("PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(8080);

        let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let cors_allowed_origins =
            env::var("CORS_ALLOWED_ORIGINS").unwrap_or_else(|_| "*".to_string());

        let supported_versions = parse_versions(
            "LRS_SUPPORTED_VERSIONS",
            &env::var("LRS_SUPPORTED_VERSIONS")
                .unwrap_or_else(|_| "1.0.0,1.0.1,1.0.2,1.0.3".to_string()),
        )?;

        let latest_raw = env::var("LRS_LATEST_VERSION").unwrap_or_else(|_| "1.0.3".to_string());
        let latest_version: Version =
            latest_raw
                .parse()
                .map_err(|_| ConfigError::InvalidValue {
                    name: "LRS_LATEST_VERSION".to_string(),
                    reason: format!("not a valid version string: {:?}", latest_raw),
                })?;

        if !supported_versions.contains(&latest_version) {
            return Err(ConfigError::InvalidValue {
                name: "LRS_LATEST_VERSION".to_string(),
                reason: format!("{} is not in the supported set", latest_version),
            });
        }

        let extensions = env::var("LRS_EXTENSIONS")
            .map(|s| {
                s.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(|name| ExtensionDescriptor {
                        name: name.to_string(),
                        enabled: true,
                    })
                    .collect()
            })
            .unwrap_or_default();

        let install_on_boot = env::var("LRS_INSTALL_ON_BOOT")
            .ok()
            .map(|s| s.to_lowercase() != "false" && s != "0")
            .unwrap_or(true);

        Ok(Self {
            port,
            log_level,
            cors_allowed_origins,
            supported_versions,
            latest_version,
            extensions,
            install_on_boot,
        })
    }

    /// Configuration with the built-in version set, for tests.
    pub fn for_tests() -> Self {
        Self {
            port: 0,
            log_level: "debug".to_string(),
            cors_allowed_origins: "*".to_string(),
            supported_versions: ["1.0.0", "1.0.1", "1.0.2", "1.0.3"]
                .iter()
                .map(|s| s.parse().unwrap())
                .collect(),
            latest_version: "1.0.3".parse().unwrap(),
            extensions: Vec::new(),
            install_on_boot: true,
        }
    }

    /// Get the socket address for the server.
    pub fn socket_addr(&self) -> std::net::SocketAddr {
        std::net::SocketAddr::from(([0, 0, 0, 0], self.port))
    }

    /// Whether `version` is in the supported set.
    pub fn supports(&self, version: &Version) -> bool {
        self.supported_versions.contains(version)
    }
}

/// Parse a comma-separated version list.
fn parse_versions(name: &str, raw: &str) -> Result<Vec<Version>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse().map_err(|_| ConfigError::InvalidValue {
                name: name.to_string(),
                reason: format!("not a valid version string: {:?}", s),
            })
        })
        .collect()
}

/// Configuration errors. All fatal at boot: the process must not start
/// half-configured.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Required environment variable is missing.
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    /// Invalid environment variable value.
    #[error("invalid value for environment variable {name}: {reason}")]
    InvalidValue { name: String, reason: String },

    /// No extension factory is registered under the configured name.
    #[error("unknown extension: {0:?}")]
    UnknownExtension(String),

    /// An enabled extension failed to instantiate.
    #[error("extension {name:?} failed to initialize: {reason}")]
    ExtensionInit { name: String, reason: String },

    /// Two route entries claim the same method and path.
    #[error("route collision: {method} {path} registered twice")]
    RouteCollision { method: String, path: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_versions_valid() {
        let versions = parse_versions("X", "1.0.0, 1.0.1,1.0.2").unwrap();
        assert_eq!(versions.len(), 3);
        assert_eq!(versions[2].to_string(), "1.0.2");
    }

    #[test]
    fn test_parse_versions_invalid() {
        assert!(parse_versions("X", "1.0.0,banana").is_err());
    }

    #[test]
    fn test_default_version_set() {
        let config = ServerConfig::for_tests();
        assert!(config.supports(&"1.0.1".parse().unwrap()));
        assert!(!config.supports(&"2.0.0".parse().unwrap()));
        assert_eq!(config.latest_version.to_string(), "1.0.3");
    }
}
