use std::env;

pub const DEFAULT_DATABASE: &str = "family-money.db";
pub const DEFAULT_OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_OPENROUTER_MODEL: &str = "openai/gpt-3.5-turbo";

/// Key value shipped in sample `.env` files; treated as "no key".
const PLACEHOLDER_KEY: &str = "placeholder_key";

/// Process-wide settings, built once by the entry point and passed down.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database: String,
    pub advisor: AdvisorConfig,
    pub telegram_token: Option<String>,
}

/// Settings for the language-model provider.
#[derive(Debug, Clone)]
pub struct AdvisorConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
}

impl AdvisorConfig {
    /// The API key, unless it is missing, blank or the placeholder value.
    pub fn usable_api_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty() && *key != PLACEHOLDER_KEY)
    }
}

impl Default for AdvisorConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_OPENROUTER_BASE_URL.to_string(),
            model: DEFAULT_OPENROUTER_MODEL.to_string(),
            max_tokens: 500,
        }
    }
}

impl AppConfig {
    /// Load `.env` (if present) and read settings from the environment.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let defaults = AdvisorConfig::default();
        Self {
            database: env_var("FAMILY_MONEY_DB").unwrap_or_else(|| DEFAULT_DATABASE.to_string()),
            advisor: AdvisorConfig {
                api_key: env_var("OPENROUTER_API_KEY"),
                base_url: env_var("OPENROUTER_BASE_URL").unwrap_or(defaults.base_url),
                model: env_var("OPENROUTER_MODEL").unwrap_or(defaults.model),
                max_tokens: env_var("OPENROUTER_MAX_TOKENS")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(defaults.max_tokens),
            },
            telegram_token: env_var("TELEGRAM_BOT_TOKEN"),
        }
    }

    pub fn with_database(mut self, database: Option<String>) -> Self {
        if let Some(database) = database {
            self.database = database;
        }
        self
    }
}

fn env_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}
