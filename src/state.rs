//! Shared state for the demonstration site's handlers.
//!
//! Built once from [`Config`] and shared behind an `Arc`; handlers only read
//! from it.

use std::sync::Arc;

use crate::config::Config;
use crate::cookies::CookieConfiguration;
use crate::environment::Environment;

/// Name of the cookie recording the visitor's consent choice.
pub const CONSENT_COOKIE: &str = "cookie_consent";

/// Read-only state handed to every handler.
#[derive(Debug, Clone)]
pub struct AppState {
    pub environment: Environment,
    /// Policy for cookies issued by the site
    pub cookies: CookieConfiguration,
}

impl AppState {
    /// Secure cookies everywhere except development over plain HTTP.
    pub fn new(config: &Config) -> Arc<Self> {
        let cookies = if config.environment.is_development() && !config.https_redirect {
            CookieConfiguration::local_development()
        } else {
            CookieConfiguration::new(std::time::Duration::from_secs(60 * 60 * 24 * 365))
        };

        Arc::new(Self {
            environment: config.environment,
            cookies: CookieConfiguration {
                path: Some("/".to_string()),
                ..cookies
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_development_cookies_are_insecure() {
        let state = AppState::new(&Config::default());
        assert!(!state.cookies.is_secure);
        assert_eq!(state.cookies.path.as_deref(), Some("/"));
    }

    #[test]
    fn test_production_cookies_are_secure() {
        let config = Config {
            environment: Environment::Production,
            ..Config::default()
        };
        let state = AppState::new(&config);
        assert!(state.cookies.is_secure);
        assert!(state.cookies.is_http_only);
    }
}
