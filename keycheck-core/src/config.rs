//! Runtime configuration for the diagnostics

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{KeycheckError, KeycheckResult};

/// Default properties file, relative to the working directory
pub const DEFAULT_PROPERTIES_PATH: &str = "gradle.properties";

/// Base URL for Gemini REST calls
pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com";

/// Base URL for the Gemini live (bidirectional) endpoint
pub const GEMINI_LIVE_BASE: &str = "wss://generativelanguage.googleapis.com";

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_SESSION_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration shared by all three diagnostics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeycheckConfig {
    /// Properties file holding `GEMINI_API_KEY`
    pub properties_path: PathBuf,
    /// Scheme and host for `generateContent` calls
    pub rest_base_url: String,
    /// Scheme and host for the live session
    pub live_base_url: String,
    /// Per-request timeout for REST calls
    pub request_timeout: Duration,
    /// Connect and idle-read timeout for the live session
    pub session_timeout: Duration,
}

impl Default for KeycheckConfig {
    fn default() -> Self {
        Self {
            properties_path: PathBuf::from(DEFAULT_PROPERTIES_PATH),
            rest_base_url: GEMINI_API_BASE.to_string(),
            live_base_url: GEMINI_LIVE_BASE.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            session_timeout: DEFAULT_SESSION_TIMEOUT,
        }
    }
}

impl KeycheckConfig {
    /// Load configuration from environment variables
    ///
    /// Recognized:
    /// - KEYCHECK_PROPERTIES_PATH: properties file with the API key
    /// - GEMINI_API_BASE: REST base URL
    /// - GEMINI_LIVE_BASE: live session base URL
    /// - KEYCHECK_REQUEST_TIMEOUT_SECS: REST timeout in seconds
    /// - KEYCHECK_SESSION_TIMEOUT_SECS: live session timeout in seconds
    pub fn from_env() -> KeycheckResult<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Same as [`KeycheckConfig::from_env`] with an injectable variable source
    pub fn from_lookup<F>(lookup: F) -> KeycheckResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(path) = lookup("KEYCHECK_PROPERTIES_PATH") {
            config.properties_path = PathBuf::from(path);
        }
        if let Some(url) = lookup("GEMINI_API_BASE") {
            config.rest_base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(url) = lookup("GEMINI_LIVE_BASE") {
            config.live_base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(secs) = lookup("KEYCHECK_REQUEST_TIMEOUT_SECS") {
            config.request_timeout = parse_timeout("KEYCHECK_REQUEST_TIMEOUT_SECS", &secs)?;
        }
        if let Some(secs) = lookup("KEYCHECK_SESSION_TIMEOUT_SECS") {
            config.session_timeout = parse_timeout("KEYCHECK_SESSION_TIMEOUT_SECS", &secs)?;
        }

        Ok(config)
    }
}

fn parse_timeout(name: &str, value: &str) -> KeycheckResult<Duration> {
    let secs: u64 = value
        .trim()
        .parse()
        .map_err(|e| KeycheckError::config(format!("{} must be a number of seconds: {}", name, e)))?;

    if secs == 0 {
        return Err(KeycheckError::config(format!("{} must be greater than zero", name)));
    }

    Ok(Duration::from_secs(secs))
}
