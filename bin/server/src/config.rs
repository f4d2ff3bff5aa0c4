//! Centralized server configuration.
//!
//! Strongly typed, loaded via the `config` crate from environment
//! variables. Nested sections use `__` as the separator, so the service
//! API key arrives as `SERVICES__API_KEY`.

use callflow_services::ServiceConfig;
use serde::Deserialize;

/// Server configuration composed from library configs.
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// Address the HTTP listener binds to.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Outbound collaborator-service configuration.
    pub services: ServiceConfig,
}

fn default_listen_addr() -> String {
    "0.0.0.0:8000".to_string()
}

impl ServerConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required configuration is missing or invalid.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(
                config::Environment::default()
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listen_addr_has_a_default() {
        let config: ServerConfig = serde_json::from_str(
            r#"{"services": {"api_key": "secret"}}"#,
        )
        .expect("deserialize");
        assert_eq!(config.listen_addr, "0.0.0.0:8000");
        assert_eq!(config.services.api_key, "secret");
    }
}
