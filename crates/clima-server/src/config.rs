use std::net::Ipv4Addr;
use std::path::Path;

use clima::alert::Thresholds;
use clima::secret::Secrets;

use serde::Deserialize;

use tracing::{info, warn};

use crate::error::{Error, ErrorKind, Result};

// The entire local network is considered, so the Ipv4 unspecified address is
// used.
pub(crate) const DEFAULT_HTTP_ADDRESS: Ipv4Addr = Ipv4Addr::UNSPECIFIED;

// Default port.
pub(crate) const DEFAULT_SERVER_PORT: u16 = 3000;

// Default ingestion route.
pub(crate) const DEFAULT_READINGS_ROUTE: &str = "/readings";

/// Checks that `route` is a static absolute path the router can serve.
///
/// Every segment must be non-empty and must not be a path parameter or a
/// wildcard, so `:`, `*`, `{` and `}` are refused.
pub(crate) fn validate_route(route: &str) -> Result<()> {
    let invalid = |reason: &str| {
        Err(Error::new(
            ErrorKind::Config,
            format!("The route `{route}` {reason}"),
        ))
    };

    let Some(path) = route.strip_prefix('/') else {
        return invalid("must be an absolute path");
    };

    if path.is_empty() {
        return invalid("must not be the root path");
    }

    for segment in path.split('/') {
        if segment.is_empty() {
            return invalid("contains an empty segment");
        }
        if segment.starts_with([':', '*']) {
            return invalid("must not contain path parameters or wildcards");
        }
        if segment.contains(['{', '}']) {
            return invalid("must not contain braces");
        }
    }

    Ok(())
}

fn default_address() -> Ipv4Addr {
    DEFAULT_HTTP_ADDRESS
}

fn default_port() -> u16 {
    DEFAULT_SERVER_PORT
}

fn default_readings_route() -> String {
    DEFAULT_READINGS_ROUTE.into()
}

/// The server configuration.
///
/// Usually loaded from a `JSON` file. Every field is optional:
///
/// ```json
/// {
///     "address": "0.0.0.0",
///     "port": 3000,
///     "readings_route": "/readings",
///     "secrets": ["first-device-secret", "second-device-secret"],
///     "thresholds": {
///         "temperature": { "min": 10.0, "max": 30.0 },
///         "humidity": { "min": 20.0, "max": 80.0 }
///     }
/// }
/// ```
#[derive(Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Server `IPv4` address.
    #[serde(default = "default_address")]
    pub address: Ipv4Addr,
    /// Server port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Route accepting device readings.
    #[serde(default = "default_readings_route")]
    pub readings_route: String,
    /// Authorized device secrets.
    #[serde(default)]
    pub secrets: Vec<String>,
    /// Alert thresholds.
    #[serde(default)]
    pub thresholds: Thresholds,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_HTTP_ADDRESS,
            port: DEFAULT_SERVER_PORT,
            readings_route: DEFAULT_READINGS_ROUTE.into(),
            secrets: Vec::new(),
            thresholds: Thresholds::new(),
        }
    }
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("address", &self.address)
            .field("port", &self.port)
            .field("readings_route", &self.readings_route)
            .field("secrets", &self.secrets.len())
            .field("thresholds", &self.thresholds)
            .finish()
    }
}

impl ServerConfig {
    /// Loads a [`ServerConfig`] from a `JSON` file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not a valid
    /// configuration, or contains inconsistent thresholds.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::new(
                ErrorKind::Config,
                format!("Unable to read `{}`: {e}", path.display()),
            )
        })?;

        info!("Loading configuration from `{}`", path.display());
        Self::from_json(&content)
    }

    /// Parses a [`ServerConfig`] from a `JSON` string.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not a valid configuration, or
    /// contains inconsistent thresholds.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Adds authorized secrets.
    #[must_use]
    pub fn secrets<I, S>(mut self, secrets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.secrets.extend(secrets.into_iter().map(Into::into));
        self
    }

    /// Checks the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the thresholds are inconsistent or the readings
    /// route is not a static absolute path.
    pub fn validate(&self) -> Result<()> {
        self.thresholds.validate()?;
        validate_route(&self.readings_route)
    }

    /// Builds the authorized [`Secrets`] set.
    #[must_use]
    pub fn secret_store(&self) -> Secrets {
        let secrets: Secrets = self.secrets.iter().collect();
        if secrets.is_empty() {
            warn!("No device secret configured: every reading will be rejected.");
        }
        secrets
    }
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;

    use clima::alert::{Limits, Thresholds};
    use clima::secret::SecretStore;

    use crate::error::ErrorKind;

    use super::{ServerConfig, validate_route};

    #[test]
    fn empty_configuration() {
        let config = ServerConfig::from_json("{}").unwrap();

        assert_eq!(config.address, Ipv4Addr::UNSPECIFIED);
        assert_eq!(config.port, 3000);
        assert_eq!(config.readings_route, "/readings");
        assert!(config.secrets.is_empty());
        assert_eq!(config.thresholds, Thresholds::new());
        assert!(config.secret_store().is_empty());
    }

    #[test]
    fn complete_configuration() {
        let config = ServerConfig::from_json(
            r#"{
                "address": "127.0.0.1",
                "port": 8080,
                "readings_route": "/api/readings",
                "secrets": ["valid-secret", "other-secret"],
                "thresholds": {
                    "temperature": { "min": 10.0, "max": 30.0 },
                    "humidity": { "max": 80.0 }
                }
            }"#,
        )
        .unwrap();

        assert_eq!(config.address, Ipv4Addr::LOCALHOST);
        assert_eq!(config.port, 8080);
        assert_eq!(config.readings_route, "/api/readings");
        assert_eq!(
            config.thresholds,
            Thresholds::new()
                .temperature(Limits::new(10., 30.))
                .humidity(Limits::at_most(80.))
        );

        let secrets = config.secret_store();
        assert_eq!(secrets.len(), 2);
        assert!(secrets.is_authorized("other-secret"));
    }

    #[test]
    fn merged_secrets() {
        let config = ServerConfig::from_json(r#"{ "secrets": ["a"] }"#)
            .unwrap()
            .secrets(["b", "c"]);

        assert_eq!(config.secrets, ["a", "b", "c"]);
    }

    #[test]
    fn invalid_configurations() {
        let error = ServerConfig::from_json(r#"{ "port": "x" }"#).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Serialization);

        let error = ServerConfig::from_json(r#"{ "unknown": 1 }"#).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Serialization);

        let error = ServerConfig::from_json(
            r#"{ "thresholds": { "humidity": { "min": 90.0, "max": 10.0 } } }"#,
        )
        .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Config);

        let error = ServerConfig::from_json(r#"{ "readings_route": "readings" }"#).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Config);
    }

    #[test]
    fn readings_routes() {
        for route in ["/readings", "/api/v1/readings", "/readings-2"] {
            assert!(validate_route(route).is_ok(), "`{route}` should be valid");
        }

        for route in [
            "",
            "readings",
            "/",
            "//readings",
            "/api//readings",
            "/readings/",
            "/readings/:device",
            "/readings/*rest",
            "/readings/{device}",
            "/readings/{device",
            "/readings/device}",
        ] {
            let error = validate_route(route).unwrap_err();
            assert_eq!(error.kind(), ErrorKind::Config, "`{route}` should be invalid");
        }

        let error = ServerConfig::from_json(
            r#"{ "readings_route": "/readings/:device", "secrets": ["s"] }"#,
        )
        .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Config);
    }

    #[test]
    fn missing_file() {
        let error = ServerConfig::from_file("/nonexistent/clima.json").unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Config);
    }

    #[test]
    fn secrets_are_not_printed() {
        let config = ServerConfig::default().secrets(["valid-secret"]);
        assert!(!format!("{config:?}").contains("valid-secret"));
    }
}
