//! Backend credentials from environment variables.
//!
//! Native builds read `SUPABASE_URL` and `SUPABASE_ANON_KEY` at runtime (after
//! loading `.env`); WASM builds bake them in at compile time. A missing value
//! is not fatal: [`BackendConfig::diagnostics`] reports it so the debug view
//! can show what is wrong.

use thiserror::Error;

pub const URL_VAR: &str = "SUPABASE_URL";
pub const ANON_KEY_VAR: &str = "SUPABASE_ANON_KEY";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{0} not set")]
    Missing(&'static str),
    #[error("invalid backend URL: {0}")]
    InvalidUrl(String),
}

/// Endpoint and public API key of the hosted backend.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackendConfig {
    pub url: Option<String>,
    pub anon_key: Option<String>,
}

/// Which credentials are present, for the diagnostics view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigDiagnostics {
    pub url_set: bool,
    pub key_set: bool,
}

impl ConfigDiagnostics {
    pub fn is_complete(&self) -> bool {
        self.url_set && self.key_set
    }
}

impl BackendConfig {
    /// Build from explicit values; blank strings count as missing.
    pub fn from_values(url: Option<String>, anon_key: Option<String>) -> Self {
        let clean = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        Self {
            url: clean(url),
            anon_key: clean(anon_key),
        }
    }

    /// Read configuration from environment variables.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_values(std::env::var(URL_VAR).ok(), std::env::var(ANON_KEY_VAR).ok())
    }

    /// Read configuration baked in at compile time.
    #[cfg(target_arch = "wasm32")]
    pub fn from_env() -> Self {
        Self::from_values(
            option_env!("SUPABASE_URL").map(String::from),
            option_env!("SUPABASE_ANON_KEY").map(String::from),
        )
    }

    pub fn diagnostics(&self) -> ConfigDiagnostics {
        ConfigDiagnostics {
            url_set: self.url.is_some(),
            key_set: self.anon_key.is_some(),
        }
    }

    /// Both values, or the first one that is missing. The URL is returned
    /// without a trailing slash.
    pub fn require(&self) -> Result<(String, String), ConfigError> {
        let url = self.url.as_deref().ok_or(ConfigError::Missing(URL_VAR))?;
        let key = self
            .anon_key
            .as_deref()
            .ok_or(ConfigError::Missing(ANON_KEY_VAR))?;
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::InvalidUrl(url.to_string()));
        }
        Ok((url.trim_end_matches('/').to_string(), key.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_values_are_reported_missing() {
        let config = BackendConfig::from_values(Some("  ".into()), Some("anon".into()));
        let diag = config.diagnostics();
        assert!(!diag.url_set);
        assert!(diag.key_set);
        assert!(!diag.is_complete());
        assert_eq!(config.require(), Err(ConfigError::Missing(URL_VAR)));
    }

    #[test]
    fn require_trims_trailing_slash() {
        let config = BackendConfig::from_values(
            Some("https://campus.supabase.co/".into()),
            Some("anon".into()),
        );
        assert_eq!(
            config.require(),
            Ok(("https://campus.supabase.co".to_string(), "anon".to_string()))
        );
    }

    #[test]
    fn require_rejects_non_http_url() {
        let config = BackendConfig::from_values(Some("campus.supabase.co".into()), Some("k".into()));
        assert!(matches!(config.require(), Err(ConfigError::InvalidUrl(_))));
    }
}
