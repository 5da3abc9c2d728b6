//! Environment configuration for the demo binary

use crate::credentials::SessionCredentials;
use crate::dialogue::RetryPolicy;
use crate::store::StoreOptions;
use crate::transport::BackendConfig;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://chat.openai.com";
const DEFAULT_MODEL: &str = "text-davinci-002-render";
const DEFAULT_TIMEOUT_SECS: u64 = 300;

#[derive(Debug, Clone)]
pub struct Config {
    /// Long-lived session cookie; required to talk to the real backend
    pub session_token: Option<String>,
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
    /// Where conversation ids are persisted between runs
    pub state_path: Option<PathBuf>,
    pub max_retries: Option<u32>,
    pub bootstrap_attempts: Option<u32>,
    pub log_json: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            session_token: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            state_path: None,
            max_retries: None,
            bootstrap_attempts: None,
            log_json: false,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let defaults = Self::default();
        Self {
            session_token: var("CHAT_KV_SESSION_TOKEN"),
            base_url: var("CHAT_KV_BASE_URL").unwrap_or(defaults.base_url),
            model: var("CHAT_KV_MODEL").unwrap_or(defaults.model),
            timeout: number::<u64>("CHAT_KV_TIMEOUT_SECS", var("CHAT_KV_TIMEOUT_SECS"))
                .map_or(defaults.timeout, Duration::from_secs),
            state_path: var("CHAT_KV_STATE_PATH").map(PathBuf::from),
            max_retries: number("CHAT_KV_MAX_RETRIES", var("CHAT_KV_MAX_RETRIES")),
            bootstrap_attempts: number("CHAT_KV_BOOTSTRAP_ATTEMPTS", var("CHAT_KV_BOOTSTRAP_ATTEMPTS")),
            log_json: var("CHAT_KV_LOG_JSON").is_some_and(|v| matches!(v.trim(), "1" | "true")),
        }
    }

    pub fn backend_config(&self) -> BackendConfig {
        BackendConfig {
            base_url: self.base_url.clone(),
            model: self.model.clone(),
            timeout: self.timeout,
        }
    }

    pub fn store_options(&self) -> StoreOptions {
        let mut options = StoreOptions::default();
        if let Some(attempts) = self.max_retries {
            options.retry = RetryPolicy::default().with_max_attempts(attempts);
        }
        if let Some(attempts) = self.bootstrap_attempts {
            options.max_bootstrap_attempts = attempts.max(1);
        }
        options
    }

    pub fn credentials(&self) -> Option<SessionCredentials> {
        self.session_token.as_deref().map(SessionCredentials::new)
    }
}

fn number<T: FromStr>(name: &str, raw: Option<String>) -> Option<T> {
    let raw = raw?;
    if let Ok(n) = raw.trim().parse() {
        Some(n)
    } else {
        tracing::warn!(var = name, value = %raw, "Ignoring non-numeric setting");
        None
    }
}
