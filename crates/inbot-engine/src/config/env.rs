use super::ConfigError;
use crate::generator::CompletionConfig;
use crate::retry::RetryPolicy;
use crate::session::Credentials;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_OPENAI_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_REPOSITORY_URL: &str = env!("CARGO_PKG_REPOSITORY");

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub headless: bool,
    /// Schedule expression; no scheduled runs when unset.
    pub cron: Option<String>,
    pub completion: CompletionConfig,
    pub credentials: Credentials,
    /// Appended to every reply.
    pub repository_url: String,
    pub selectors_path: Option<PathBuf>,
    pub retry: RetryPolicy,
}

impl AppConfig {
    /// Load `./envs/.env` (or `./envs/.env.<INBOT_ENV>`), then read the process
    /// environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let env_file = match std::env::var("INBOT_ENV") {
            Ok(name) if !name.trim().is_empty() => format!("./envs/.env.{}", name.trim()),
            _ => "./envs/.env".to_string(),
        };
        if dotenvy::from_path(&env_file).is_ok() {
            tracing::info!("Loaded environment from {}", env_file);
        }
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let require = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));

        let port = match get("PORT") {
            Some(value) => value
                .parse::<u16>()
                .map_err(|_| ConfigError::Invalid { var: "PORT", value })?,
            None => DEFAULT_PORT,
        };

        let retry_defaults = RetryPolicy::default();
        let max_attempts = match get("RETRY_MAX_ATTEMPTS") {
            Some(value) => value.parse::<u32>().map_err(|_| ConfigError::Invalid {
                var: "RETRY_MAX_ATTEMPTS",
                value,
            })?,
            None => retry_defaults.max_attempts,
        };
        let base_delay = match get("RETRY_BASE_DELAY_MS") {
            Some(value) => Duration::from_millis(value.parse::<u64>().map_err(|_| {
                ConfigError::Invalid {
                    var: "RETRY_BASE_DELAY_MS",
                    value,
                }
            })?),
            None => retry_defaults.base_delay,
        };

        Ok(Self {
            port,
            headless: get("HEADLESS").as_deref() == Some("true"),
            cron: get("CRON"),
            completion: CompletionConfig {
                api_key: require("OPENAI_API_KEY")?,
                model: get("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
                base_url: get("OPENAI_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_OPENAI_URL.to_string()),
                system_content: get("CHAT_COMPLETION_SYSTEM_CONTENT").unwrap_or_default(),
                user_content: lookup("CHAT_COMPLETION_USER_CONTENT").unwrap_or_default(),
                timeout: Duration::from_secs(60),
            },
            credentials: Credentials {
                email: require("LINKEDIN_EMAIL")?,
                password: require("LINKEDIN_PASSWORD")?,
            },
            repository_url: get("REPOSITORY_URL")
                .unwrap_or_else(|| DEFAULT_REPOSITORY_URL.to_string()),
            selectors_path: get("INBOT_SELECTORS").map(PathBuf::from),
            retry: RetryPolicy {
                max_attempts,
                base_delay,
                ..retry_defaults
            },
        })
    }
}
