//! Cookie policy and `Set-Cookie` rendering.
//!
//! # Example
//!
//! ```rust,ignore
//! let config = CookieConfiguration::new(Duration::from_secs(60 * 60));
//! let cookie = config.cookie("session", token, Utc::now());
//! cookie.append_to(response.headers_mut())?;
//! ```

use std::fmt;
use std::time::Duration;

use axum::http::header::SET_COOKIE;
use axum::http::{HeaderMap, HeaderValue};
use chrono::{DateTime, Utc};

use crate::error::{AppError, AppResult};

/// `SameSite` cookie attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SameSitePolicy {
    #[default]
    Lax,
    Strict,
    None,
}

impl fmt::Display for SameSitePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SameSitePolicy::Lax => write!(f, "Lax"),
            SameSitePolicy::Strict => write!(f, "Strict"),
            SameSitePolicy::None => write!(f, "None"),
        }
    }
}

/// How cookies are issued. Concrete values are derived at issuance time.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CookieConfiguration {
    pub expires: Duration,
    pub max_age: Option<i64>,
    pub domain: Option<String>,
    pub path: Option<String>,
    pub is_secure: bool,
    pub is_http_only: bool,
    pub same_site_policy: SameSitePolicy,
}

impl CookieConfiguration {
    /// Secure, HTTP-only, `SameSite=Lax` cookies living for `expires`.
    pub fn new(expires: Duration) -> Self {
        Self {
            expires,
            max_age: None,
            domain: None,
            path: None,
            is_secure: true,
            is_http_only: true,
            same_site_policy: SameSitePolicy::Lax,
        }
    }

    /// One day, sent over plain HTTP.
    pub fn local_development() -> Self {
        Self {
            is_secure: false,
            ..Self::new(Duration::from_secs(60 * 60 * 24))
        }
    }

    /// Derive a cookie issued at `now`.
    pub fn cookie(&self, name: impl Into<String>, value: impl Into<String>, now: DateTime<Utc>) -> SetCookie {
        let expires = chrono::Duration::from_std(self.expires)
            .ok()
            .and_then(|d| now.checked_add_signed(d));

        SetCookie {
            name: name.into(),
            value: value.into(),
            expires,
            max_age: self.max_age,
            domain: self.domain.clone(),
            path: self.path.clone(),
            secure: self.is_secure,
            http_only: self.is_http_only,
            same_site: Some(self.same_site_policy),
        }
    }
}

/// A rendered `Set-Cookie` value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetCookie {
    name: String,
    value: String,
    expires: Option<DateTime<Utc>>,
    max_age: Option<i64>,
    domain: Option<String>,
    path: Option<String>,
    secure: bool,
    http_only: bool,
    same_site: Option<SameSitePolicy>,
}

impl SetCookie {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn expires(&self) -> Option<DateTime<Utc>> {
        self.expires
    }

    pub fn to_header_value(&self) -> String {
        let mut parts = vec![format!("{}={}", self.name, self.value)];

        if let Some(expires) = self.expires {
            parts.push(format!(
                "Expires={}",
                expires.format("%a, %d %b %Y %H:%M:%S GMT")
            ));
        }
        if let Some(max_age) = self.max_age {
            parts.push(format!("Max-Age={max_age}"));
        }
        if let Some(ref domain) = self.domain {
            parts.push(format!("Domain={domain}"));
        }
        if let Some(ref path) = self.path {
            parts.push(format!("Path={path}"));
        }
        if self.secure {
            parts.push("Secure".to_string());
        }
        if self.http_only {
            parts.push("HttpOnly".to_string());
        }
        if let Some(same_site) = self.same_site {
            parts.push(format!("SameSite={same_site}"));
        }

        parts.join("; ")
    }

    /// Append as a `Set-Cookie` header.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Internal` if the name or value holds bytes that are
    /// not valid in a header.
    pub fn append_to(&self, headers: &mut HeaderMap) -> AppResult<()> {
        let value = HeaderValue::from_str(&self.to_header_value())
            .map_err(|e| AppError::Internal(format!("Invalid cookie {}: {e}", self.name)))?;
        headers.append(SET_COOKIE, value);
        Ok(())
    }
}

/// A cookie that tells the client to drop `name` immediately.
pub fn expire_cookie(name: impl Into<String>) -> SetCookie {
    SetCookie {
        name: name.into(),
        value: String::new(),
        expires: Some(DateTime::<Utc>::UNIX_EPOCH),
        max_age: Some(0),
        domain: None,
        path: Some("/".to_string()),
        secure: false,
        http_only: true,
        same_site: None,
    }
}
