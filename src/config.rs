//! Configuration for the relay, loaded from environment variables.

use std::net::IpAddr;
use std::path::PathBuf;

use thiserror::Error;
use url::Url;

/// Environment variable holding the completion endpoint base address.
pub const API_BASE_URL_ENV: &str = "API_BASE_URL";
/// Environment variable holding the access credential.
pub const API_KEY_ENV: &str = "API_KEY";
/// Environment variable holding the model identifier.
pub const MODEL_NAME_ENV: &str = "MODEL_NAME";

const HISTORY_PATH_ENV: &str = "CHAT_RELAY_HISTORY_PATH";
const HOST_ENV: &str = "CHAT_RELAY_HOST";
const PORT_ENV: &str = "CHAT_RELAY_PORT";
const HTTP_REFERER_ENV: &str = "CHAT_RELAY_HTTP_REFERER";
const APP_TITLE_ENV: &str = "CHAT_RELAY_APP_TITLE";

/// Default transcript file, relative to the working directory.
pub const DEFAULT_HISTORY_PATH: &str = "conversation_history.json";
/// Default server port.
pub const DEFAULT_PORT: u16 = 5000;
const DEFAULT_HOST: [u8; 4] = [127, 0, 0, 1];
const DEFAULT_HTTP_REFERER: &str = "http://localhost:5000";
const DEFAULT_APP_TITLE: &str = "AI Chat App";

/// Default sampling temperature.
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
/// Default cap on generated tokens.
pub const DEFAULT_MAX_TOKENS: u32 = 150;

/// Instruction sent ahead of every conversation.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful AI assistant. You should:
1. Be friendly and professional
2. Provide clear and concise responses
3. Maintain context from the conversation
4. Ask clarifying questions when needed
5. Admit when you don't know something";

/// Configuration errors. All of them are fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// One or more required variables are unset or empty.
    #[error("missing required environment variables: {}", .0.join(", "))]
    MissingVars(Vec<&'static str>),
    /// The completion base address is not a valid URL.
    #[error("invalid API_BASE_URL: {0}")]
    InvalidBaseUrl(#[from] url::ParseError),
    /// An optional variable holds a value that cannot be parsed.
    #[error("invalid value for {name}: {value}")]
    InvalidValue {
        /// Variable name.
        name: &'static str,
        /// Raw value found.
        value: String,
    },
}

/// Settings for the chat completion endpoint.
#[derive(Clone, Debug)]
pub struct CompletionConfig {
    /// Base address, e.g. `https://openrouter.ai/api/v1`.
    pub base_url: Url,
    /// Bearer credential.
    pub api_key: String,
    /// Model identifier sent with every request.
    pub model: String,
    /// System instruction prepended to every request.
    pub system_prompt: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Maximum output length in tokens.
    pub max_tokens: u32,
    /// Value of the `HTTP-Referer` attribution header.
    pub http_referer: String,
    /// Value of the `X-Title` attribution header.
    pub app_title: String,
}

impl CompletionConfig {
    /// Create a config with default sampling settings.
    ///
    /// # Errors
    /// Returns an error if `base_url` is not a valid URL.
    pub fn new(
        base_url: &str,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: Url::parse(base_url)?,
            api_key: api_key.into(),
            model: model.into(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            http_referer: DEFAULT_HTTP_REFERER.to_string(),
            app_title: DEFAULT_APP_TITLE.to_string(),
        })
    }

    /// Set the sampling temperature.
    #[must_use]
    pub const fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the output token cap.
    #[must_use]
    pub const fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Replace the system instruction.
    #[must_use]
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    /// Full URL of the chat completions endpoint.
    #[must_use]
    pub fn completions_url(&self) -> String {
        format!(
            "{}/chat/completions",
            self.base_url.as_str().trim_end_matches('/')
        )
    }
}

/// Top-level relay configuration.
#[derive(Clone, Debug)]
pub struct RelayConfig {
    /// Completion endpoint settings.
    pub completion: CompletionConfig,
    /// Transcript file location.
    pub history_path: PathBuf,
    /// Address to bind.
    pub host: IpAddr,
    /// Port to bind.
    pub port: u16,
}

impl RelayConfig {
    /// Load configuration from the process environment.
    ///
    /// # Errors
    /// Returns an error if a required variable is missing or a value is invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// Empty values are treated as unset.
    ///
    /// # Errors
    /// Returns an error if a required variable is missing or a value is invalid.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let base_url = get(API_BASE_URL_ENV);
        let api_key = get(API_KEY_ENV);
        let model = get(MODEL_NAME_ENV);

        let (Some(base_url), Some(api_key), Some(model)) = (base_url.as_ref(), api_key, model)
        else {
            let missing = [API_BASE_URL_ENV, API_KEY_ENV, MODEL_NAME_ENV]
                .into_iter()
                .filter(|name| get(*name).is_none())
                .collect();
            return Err(ConfigError::MissingVars(missing));
        };

        let mut completion = CompletionConfig::new(base_url, api_key, model)?;
        if let Some(referer) = get(HTTP_REFERER_ENV) {
            completion.http_referer = referer;
        }
        if let Some(title) = get(APP_TITLE_ENV) {
            completion.app_title = title;
        }

        let history_path = get(HISTORY_PATH_ENV)
            .map_or_else(|| PathBuf::from(DEFAULT_HISTORY_PATH), PathBuf::from);

        let host: IpAddr = match get(HOST_ENV) {
            Some(value) => value.parse().map_err(|_| ConfigError::InvalidValue {
                name: HOST_ENV,
                value,
            })?,
            None => IpAddr::from(DEFAULT_HOST),
        };

        let port: u16 = match get(PORT_ENV) {
            Some(value) => value.parse().map_err(|_| ConfigError::InvalidValue {
                name: PORT_ENV,
                value,
            })?,
            None => DEFAULT_PORT,
        };

        Ok(Self {
            completion,
            history_path,
            host,
            port,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    fn required() -> Vec<(&'static str, &'static str)> {
        vec![
            (API_BASE_URL_ENV, "https://openrouter.ai/api/v1"),
            (API_KEY_ENV, "sk-test"),
            (MODEL_NAME_ENV, "test/model"),
        ]
    }

    #[test]
    fn test_defaults_applied() {
        let config = RelayConfig::from_lookup(lookup_from(&required())).unwrap();
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.history_path, PathBuf::from(DEFAULT_HISTORY_PATH));
        assert_eq!(config.host, IpAddr::from([127, 0, 0, 1]));
        assert_eq!(config.completion.model, "test/model");
        assert_eq!(config.completion.max_tokens, 150);
        assert!((config.completion.temperature - 0.7).abs() < f32::EPSILON);
        assert_eq!(config.completion.app_title, "AI Chat App");
    }

    #[test]
    fn test_each_required_var_is_fatal() {
        for skipped in [API_BASE_URL_ENV, API_KEY_ENV, MODEL_NAME_ENV] {
            let pairs: Vec<_> = required()
                .into_iter()
                .filter(|(name, _)| *name != skipped)
                .collect();
            match RelayConfig::from_lookup(lookup_from(&pairs)) {
                Err(ConfigError::MissingVars(missing)) => assert_eq!(missing, vec![skipped]),
                other => panic!("expected MissingVars for {skipped}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_empty_value_counts_as_missing() {
        let mut pairs = required();
        pairs[1] = (API_KEY_ENV, "  ");
        let err = RelayConfig::from_lookup(lookup_from(&pairs)).unwrap_err();
        assert!(matches!(err, ConfigError::MissingVars(ref v) if v == &vec![API_KEY_ENV]));
    }

    #[test]
    fn test_all_missing_lists_every_var() {
        let err = RelayConfig::from_lookup(lookup_from(&[])).unwrap_err();
        assert_eq!(
            err.to_string(),
            "missing required environment variables: API_BASE_URL, API_KEY, MODEL_NAME"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        let mut pairs = required();
        pairs[0] = (API_BASE_URL_ENV, "not a url");
        let err = RelayConfig::from_lookup(lookup_from(&pairs)).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidBaseUrl(_)));
    }

    #[test]
    fn test_optional_overrides() {
        let mut pairs = required();
        pairs.push((PORT_ENV, "8080"));
        pairs.push((HOST_ENV, "0.0.0.0"));
        pairs.push((HISTORY_PATH_ENV, "/tmp/history.json"));
        pairs.push((APP_TITLE_ENV, "Relay"));
        let config = RelayConfig::from_lookup(lookup_from(&pairs)).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.host, IpAddr::from([0, 0, 0, 0]));
        assert_eq!(config.history_path, PathBuf::from("/tmp/history.json"));
        assert_eq!(config.completion.app_title, "Relay");
    }

    #[test]
    fn test_bad_port_rejected() {
        let mut pairs = required();
        pairs.push((PORT_ENV, "eighty"));
        let err = RelayConfig::from_lookup(lookup_from(&pairs)).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { name, .. } if name == PORT_ENV));
    }

    #[test]
    fn test_bad_host_rejected() {
        let mut pairs = required();
        pairs.push((HOST_ENV, "not-an-ip"));
        let err = RelayConfig::from_lookup(lookup_from(&pairs)).unwrap_err();
        assert!(err.to_string().contains("not-an-ip"));
        assert!(matches!(err, ConfigError::InvalidValue { name, .. } if name == HOST_ENV));
    }

    #[test]
    fn test_completions_url_handles_trailing_slash() {
        let config = CompletionConfig::new("https://api.example.com/v1/", "k", "m").unwrap();
        assert_eq!(
            config.completions_url(),
            "https://api.example.com/v1/chat/completions"
        );
        let bare = CompletionConfig::new("https://api.example.com/v1", "k", "m").unwrap();
        assert_eq!(
            bare.completions_url(),
            "https://api.example.com/v1/chat/completions"
        );
    }
}
