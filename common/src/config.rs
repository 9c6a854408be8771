use crate::error::{DatagenError, Result};
use crate::llm::DEFAULT_MODEL;
use std::env;
use std::time::Duration;

const DEFAULT_DB_HOST: &str = "localhost";
const DEFAULT_DB_PORT: u16 = 5432;
const DEFAULT_LLM_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Clone, PartialEq)]
pub struct LlmConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub timeout: Duration,
}

impl LlmConfig {
    pub fn require_api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .ok_or_else(|| DatagenError::Config("GOOGLE_API_KEY is not set".to_string()))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DatabaseConfig {
    pub name: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LangfuseConfig {
    pub public_key: String,
    pub secret_key: String,
    pub host: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub llm: LlmConfig,
    pub database: DatabaseConfig,
    /// present only when all three langfuse variables are set
    pub langfuse: Option<LangfuseConfig>,
}

impl Config {
    /// read settings from the process environment (load `.env` first)
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|s| !s.trim().is_empty());

        let port = match get("DB_PORT") {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| DatagenError::Config(format!("DB_PORT is not a valid port: {}", raw)))?,
            None => DEFAULT_DB_PORT,
        };

        let timeout_secs = match get("DATAGEN_LLM_TIMEOUT_SECS") {
            Some(raw) => raw.trim().parse().map_err(|_| {
                DatagenError::Config(format!("DATAGEN_LLM_TIMEOUT_SECS is not a number: {}", raw))
            })?,
            None => DEFAULT_LLM_TIMEOUT_SECS,
        };

        let langfuse = match (
            get("LANGFUSE_PUBLIC_KEY"),
            get("LANGFUSE_SECRET_KEY"),
            get("LANGFUSE_HOST"),
        ) {
            (Some(public_key), Some(secret_key), Some(host)) => Some(LangfuseConfig {
                public_key,
                secret_key,
                host: host.trim_end_matches('/').to_string(),
            }),
            _ => None,
        };

        Ok(Self {
            llm: LlmConfig {
                api_key: get("GOOGLE_API_KEY"),
                model: get("DATAGEN_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
                timeout: Duration::from_secs(timeout_secs),
            },
            database: DatabaseConfig {
                name: get("DB_NAME"),
                user: get("DB_USER"),
                password: get("DB_PASS"),
                host: get("DB_HOST").unwrap_or_else(|| DEFAULT_DB_HOST.to_string()),
                port,
            },
            langfuse,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(move |key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();

        assert_eq!(config.llm.model, "gemini-2.5-flash");
        assert_eq!(config.llm.timeout, Duration::from_secs(120));
        assert!(config.llm.require_api_key().is_err());
        assert_eq!(config.database.host, "localhost");
        assert_eq!(config.database.port, 5432);
        assert!(config.database.name.is_none());
        assert!(config.langfuse.is_none());
    }

    #[test]
    fn test_values_from_environment() {
        let config = config_from(&[
            ("GOOGLE_API_KEY", "key-123"),
            ("DB_NAME", "shop"),
            ("DB_USER", "postgres"),
            ("DB_PASS", "secret"),
            ("DB_HOST", "db.internal"),
            ("DB_PORT", "6543"),
            ("DATAGEN_MODEL", "gemini-2.5-pro"),
        ])
        .unwrap();

        assert_eq!(config.llm.require_api_key().unwrap(), "key-123");
        assert_eq!(config.llm.model, "gemini-2.5-pro");
        assert_eq!(config.database.name.as_deref(), Some("shop"));
        assert_eq!(config.database.password.as_deref(), Some("secret"));
        assert_eq!(config.database.host, "db.internal");
        assert_eq!(config.database.port, 6543);
    }

    #[test]
    fn test_langfuse_requires_all_keys() {
        let partial = config_from(&[("LANGFUSE_PUBLIC_KEY", "pk"), ("LANGFUSE_HOST", "https://lf")]).unwrap();
        assert!(partial.langfuse.is_none());

        let full = config_from(&[
            ("LANGFUSE_PUBLIC_KEY", "pk"),
            ("LANGFUSE_SECRET_KEY", "sk"),
            ("LANGFUSE_HOST", "https://cloud.langfuse.com/"),
        ])
        .unwrap();
        let langfuse = full.langfuse.unwrap();
        assert_eq!(langfuse.host, "https://cloud.langfuse.com");
        assert_eq!(langfuse.secret_key, "sk");
    }

    #[test]
    fn test_invalid_numbers_are_rejected() {
        assert!(matches!(
            config_from(&[("DB_PORT", "postgres")]),
            Err(DatagenError::Config(_))
        ));
        assert!(config_from(&[("DATAGEN_LLM_TIMEOUT_SECS", "soon")]).is_err());
    }

    #[test]
    fn test_blank_values_are_ignored() {
        let config = config_from(&[("DB_HOST", "  "), ("GOOGLE_API_KEY", "")]).unwrap();
        assert_eq!(config.database.host, "localhost");
        assert!(config.llm.api_key.is_none());
    }
}
