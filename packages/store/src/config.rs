//! # Application configuration (`campus.toml`)
//!
//! Optional TOML file read by the web server and the clients at startup. A
//! missing or empty file is equivalent to the defaults below.
//!
//! ```toml
//! [session]
//! init_timeout_ms = 5000      # upper bound for session bootstrap
//! settle_delay_ms = 1000      # wait before the reconciler re-checks for a profile
//! request_timeout_ms = 10000  # profile fetches inside session transitions
//!
//! [routes]
//! login_path = "/auth/login"
//! home_path = "/"
//! protected = ["/profile", "/materials/upload", "/tutoring/create", "/marketplace/create"]
//! auth_routes = ["/auth/login", "/auth/register"]
//! redirect_authenticated = false
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level configuration stored in `campus.toml`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CampusConfig {
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub routes: RoutesConfig,
}

/// Timing of the client-side session protocol.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_init_timeout_ms")]
    pub init_timeout_ms: u64,
    /// Zero disables the wait; profile uniqueness still prevents duplicates.
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

fn default_init_timeout_ms() -> u64 {
    5_000
}

fn default_settle_delay_ms() -> u64 {
    1_000
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            init_timeout_ms: default_init_timeout_ms(),
            settle_delay_ms: default_settle_delay_ms(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl SessionConfig {
    pub fn init_timeout(&self) -> Duration {
        Duration::from_millis(self.init_timeout_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// Route policy enforced by the server-side guard.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RoutesConfig {
    #[serde(default = "default_login_path")]
    pub login_path: String,
    #[serde(default = "default_home_path")]
    pub home_path: String,
    /// Path prefixes that require a signed-in user.
    #[serde(default = "default_protected")]
    pub protected: Vec<String>,
    /// Exact paths of the login and registration pages.
    #[serde(default = "default_auth_routes")]
    pub auth_routes: Vec<String>,
    /// Send signed-in users away from the auth pages. Off until the login
    /// flow is confirmed stable.
    #[serde(default)]
    pub redirect_authenticated: bool,
}

fn default_login_path() -> String {
    "/auth/login".to_string()
}

fn default_home_path() -> String {
    "/".to_string()
}

fn default_protected() -> Vec<String> {
    ["/profile", "/materials/upload", "/tutoring/create", "/marketplace/create"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_auth_routes() -> Vec<String> {
    ["/auth/login", "/auth/register"]
        .into_iter()
        .map(String::from)
        .collect()
}

impl Default for RoutesConfig {
    fn default() -> Self {
        Self {
            login_path: default_login_path(),
            home_path: default_home_path(),
            protected: default_protected(),
            auth_routes: default_auth_routes(),
            redirect_authenticated: false,
        }
    }
}

impl CampusConfig {
    /// Builder method to set the reconciler settle delay.
    pub fn with_settle_delay(mut self, millis: u64) -> Self {
        self.session.settle_delay_ms = millis;
        self
    }

    /// The well-known filename for the config file.
    pub fn filename() -> &'static str {
        "campus.toml"
    }

    /// Parse from TOML string.
    pub fn from_toml(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }

    /// Serialize to TOML string.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let config = CampusConfig::from_toml("").unwrap();
        assert_eq!(config, CampusConfig::default());
        assert_eq!(config.session.init_timeout(), Duration::from_secs(5));
        assert_eq!(config.session.settle_delay(), Duration::from_secs(1));
        assert!(!config.routes.redirect_authenticated);
        assert!(config.routes.protected.iter().any(|p| p == "/profile"));
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = CampusConfig::from_toml(
            r#"
            [session]
            settle_delay_ms = 0

            [routes]
            redirect_authenticated = true
            "#,
        )
        .unwrap();
        assert_eq!(config.session.settle_delay_ms, 0);
        assert_eq!(config.session.init_timeout_ms, 5_000);
        assert!(config.routes.redirect_authenticated);
        assert_eq!(config.routes.login_path, "/auth/login");
    }

    #[test]
    fn toml_output_parses_back() {
        let config = CampusConfig::default().with_settle_delay(250);
        let text = config.to_toml().unwrap();
        assert_eq!(CampusConfig::from_toml(&text).unwrap(), config);
    }
}
