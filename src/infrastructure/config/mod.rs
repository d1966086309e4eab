//! Layered service configuration.
//!
//! Sources, lowest to highest precedence:
//! 1. built-in defaults (Groq, the four stock endpoints, `0.0.0.0:8000`)
//! 2. the TOML file named by `PROMPT_RELAY_CONFIG` (default `prompt-relay.toml`)
//! 3. `GROQ_API_KEY`, mapped to `llm.api_key`
//! 4. `PROMPT_RELAY_*` variables, nested with `__` (e.g. `PROMPT_RELAY_LLM__MODEL`)
//!
//! A `.env` file in the working directory is loaded into the process
//! environment before any of the above are read.

use crate::application::use_cases::prompt_template::placeholders;
use crate::domain::endpoint::EndpointProfile;
use crate::domain::error::{AppError, Result};
use crate::domain::llm_config::LLMConfig;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, info};

pub const DEFAULT_CONFIG_FILE: &str = "prompt-relay.toml";
pub const CONFIG_PATH_ENV: &str = "PROMPT_RELAY_CONFIG";
pub const ENV_PREFIX: &str = "PROMPT_RELAY_";
pub const API_KEY_ENV: &str = "GROQ_API_KEY";

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// `"*"` allows any origin.
    pub allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            allowed_origins: vec!["*".to_string()],
        }
    }
}

impl ServerConfig {
    pub fn allows_any_origin(&self) -> bool {
        self.allowed_origins.iter().any(|origin| origin == "*")
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub llm: LLMConfig,
    pub endpoints: Vec<EndpointProfile>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            llm: LLMConfig::default(),
            endpoints: EndpointProfile::builtin(),
        }
    }
}

impl AppConfig {
    /// Reads `.env`, then every configuration layer, then validates the result.
    pub fn load() -> Result<Self> {
        match dotenvy::dotenv() {
            Ok(path) => info!("Loaded environment from {}", path.display()),
            Err(err) if err.not_found() => debug!("No .env file found"),
            Err(err) => return Err(AppError::ConfigError(format!("Invalid .env file: {}", err))),
        }

        let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        Self::from_figment(Self::figment(&path))
    }

    pub fn figment(path: &str) -> Figment {
        Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file(path))
            .merge(
                Env::raw()
                    .only(&[API_KEY_ENV])
                    .map(|_| "llm.api_key".into()),
            )
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config: AppConfig = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let base_url = url::Url::parse(&self.llm.base_url).map_err(|e| {
            AppError::ConfigError(format!("llm.base_url {:?} is invalid: {}", self.llm.base_url, e))
        })?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(AppError::ConfigError(format!(
                "llm.base_url must be http or https, got {}",
                base_url.scheme()
            )));
        }

        let has_key = self
            .llm
            .api_key
            .as_deref()
            .is_some_and(|key| !key.trim().is_empty());
        if self.llm.provider.requires_api_key() && !has_key {
            return Err(AppError::ConfigError(format!(
                "Missing {}. Set it in the environment or .env",
                API_KEY_ENV
            )));
        }

        for origin in &self.server.allowed_origins {
            if origin == "*" {
                continue;
            }
            let parsed = url::Url::parse(origin).map_err(|e| {
                AppError::ConfigError(format!("Allowed origin {:?} is invalid: {}", origin, e))
            })?;
            if parsed.host_str().is_none() {
                return Err(AppError::ConfigError(format!(
                    "Allowed origin {:?} has no host",
                    origin
                )));
            }
        }

        if self.llm.timeout_secs == 0 {
            return Err(AppError::ConfigError(
                "llm.timeout_secs must be greater than zero".to_string(),
            ));
        }

        if self.endpoints.is_empty() {
            return Err(AppError::ConfigError(
                "At least one endpoint must be configured".to_string(),
            ));
        }

        let mut names = HashSet::new();
        let mut paths = HashSet::new();
        for endpoint in &self.endpoints {
            validate_endpoint(endpoint)?;
            if !names.insert(endpoint.name.as_str()) {
                return Err(AppError::ConfigError(format!(
                    "Duplicate endpoint name {:?}",
                    endpoint.name
                )));
            }
            if !paths.insert(endpoint.path.as_str()) || endpoint.path == "/health" {
                return Err(AppError::ConfigError(format!(
                    "Endpoint path {:?} is already in use",
                    endpoint.path
                )));
            }
        }

        Ok(())
    }
}

fn validate_endpoint(endpoint: &EndpointProfile) -> Result<()> {
    if endpoint.name.trim().is_empty() {
        return Err(AppError::ConfigError("Endpoint name is empty".to_string()));
    }
    if !endpoint.path.starts_with('/') || endpoint.path.len() < 2 {
        return Err(AppError::ConfigError(format!(
            "Endpoint {:?}: path must start with '/' and name a route",
            endpoint.name
        )));
    }
    if endpoint.fields.is_empty() {
        return Err(AppError::ConfigError(format!(
            "Endpoint {:?}: at least one request field is required",
            endpoint.name
        )));
    }

    let templates = std::iter::once(endpoint.prompt_template.as_str())
        .chain(endpoint.system_prompt.as_deref());
    for template in templates {
        for name in placeholders(template) {
            if !endpoint.fields.contains(&name) {
                return Err(AppError::ConfigError(format!(
                    "Endpoint {:?}: template uses {{{}}} which is not a request field",
                    endpoint.name, name
                )));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::endpoint::ResponseShape;
    use crate::domain::llm_config::LLMProvider;
    use figment::Jail;

    #[test]
    fn test_defaults_with_api_key_from_env() {
        Jail::expect_with(|jail| {
            jail.set_env(API_KEY_ENV, "gsk_test");
            let config = AppConfig::from_figment(AppConfig::figment(DEFAULT_CONFIG_FILE)).unwrap();

            assert_eq!(config.server.port, 8000);
            assert!(config.server.allows_any_origin());
            assert_eq!(config.llm.provider, LLMProvider::Groq);
            assert_eq!(config.llm.model, "llama3-70b-8192");
            assert_eq!(config.llm.timeout_secs, 15);
            assert_eq!(config.llm.api_key.as_deref(), Some("gsk_test"));
            assert_eq!(config.endpoints.len(), 4);
            Ok(())
        });
    }

    #[test]
    fn test_missing_api_key_is_rejected() {
        Jail::expect_with(|jail| {
            jail.set_env(API_KEY_ENV, "");
            let err = AppConfig::from_figment(AppConfig::figment(DEFAULT_CONFIG_FILE)).unwrap_err();
            assert!(err.to_string().contains(API_KEY_ENV), "got {}", err);
            Ok(())
        });
    }

    #[test]
    fn test_local_provider_needs_no_key() {
        Jail::expect_with(|jail| {
            jail.set_env(API_KEY_ENV, "");
            jail.create_file(
                "prompt-relay.toml",
                r#"
                [llm]
                provider = "Local"
                base_url = "http://localhost:1234/v1"
                model = "local-model"
                "#,
            )?;
            let config = AppConfig::from_figment(AppConfig::figment("prompt-relay.toml")).unwrap();
            assert_eq!(config.llm.provider, LLMProvider::Local);
            assert_eq!(config.llm.timeout_secs, 15);
            Ok(())
        });
    }

    #[test]
    fn test_toml_and_env_layers() {
        Jail::expect_with(|jail| {
            jail.set_env(API_KEY_ENV, "gsk_test");
            jail.create_file(
                "relay.toml",
                r#"
                [server]
                port = 9000
                allowed_origins = ["https://meeting-summarizer-frontend.netlify.app"]

                [llm]
                timeout_secs = 20

                [[endpoints]]
                name = "testcases"
                path = "/generate-testcases"
                fields = ["requirement"]
                prompt_template = "Write tests for {requirement}"
                shape = "test_cases"
                "#,
            )?;
            jail.set_env("PROMPT_RELAY_LLM__MODEL", "llama-3.3-70b-versatile");
            jail.set_env("PROMPT_RELAY_SERVER__PORT", "9100");

            let config = AppConfig::from_figment(AppConfig::figment("relay.toml")).unwrap();
            assert_eq!(config.server.port, 9100);
            assert!(!config.server.allows_any_origin());
            assert_eq!(config.llm.timeout_secs, 20);
            assert_eq!(config.llm.model, "llama-3.3-70b-versatile");
            assert_eq!(config.endpoints.len(), 1);
            assert_eq!(config.endpoints[0].shape, ResponseShape::TestCases);
            Ok(())
        });
    }

    #[test]
    fn test_unknown_template_placeholder_is_rejected() {
        Jail::expect_with(|jail| {
            jail.set_env(API_KEY_ENV, "gsk_test");
            jail.create_file(
                "relay.toml",
                r#"
                [[endpoints]]
                name = "broken"
                path = "/broken"
                fields = ["text"]
                prompt_template = "Summarize {body}"
                shape = "text"
                "#,
            )?;
            let err = AppConfig::from_figment(AppConfig::figment("relay.toml")).unwrap_err();
            assert!(err.to_string().contains("{body}"), "got {}", err);
            Ok(())
        });
    }

    #[test]
    fn test_duplicate_paths_are_rejected() {
        let mut config = AppConfig::default();
        config.llm.api_key = Some("k".to_string());
        let mut copy = config.endpoints[0].clone();
        copy.name = "copy".to_string();
        config.endpoints.push(copy);
        assert!(matches!(config.validate(), Err(AppError::ConfigError(_))));
    }

    #[test]
    fn test_invalid_base_url_is_rejected() {
        let mut config = AppConfig::default();
        config.llm.api_key = Some("k".to_string());
        config.llm.base_url = "api.groq.com".to_string();
        assert!(matches!(config.validate(), Err(AppError::ConfigError(_))));

        config.llm.base_url = "ftp://api.groq.com".to_string();
        assert!(matches!(config.validate(), Err(AppError::ConfigError(_))));
    }

    #[test]
    fn test_builtin_profiles_are_valid() {
        for endpoint in EndpointProfile::builtin() {
            validate_endpoint(&endpoint).unwrap();
        }
    }
}
