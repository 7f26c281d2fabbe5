//! Route grammar and router assembly for the demonstration site.
//!
//! # Routes
//!
//! | Method | Path                 | Route                  |
//! |--------|----------------------|------------------------|
//! | GET    | `/`                  | [`SiteRoute::Home`]    |
//! | GET    | `/health`            | [`SiteRoute::Health`]  |
//! | GET    | `/robots.txt`        | [`SiteRoute::Robots`]  |
//! | GET    | `/api/echo?message=` | [`SiteRoute::Echo`]    |
//! | POST   | `/api/echo`          | [`SiteRoute::Echo`]    |
//! | POST   | `/api/consent`       | [`SiteRoute::Consent`] |
//! | GET    | `/api/whoami`        | [`SiteRoute::WhoAmI`]  |
//!
//! Anything else fails to parse and falls through to the 404 terminal.

use axum::Router;
use axum::http::Method;
use axum::http::header::CONTENT_TYPE;

use crate::app::Application;
use crate::config::Config;
use crate::error::AppResult;
use crate::handlers;
use crate::middleware::{ParseError, RequestData, RouteParser};
use crate::models::{ConsentRequest, EchoRequest};
use crate::state::AppState;

/// A parsed request for the demonstration site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SiteRoute {
    Home,
    Health,
    Robots,
    /// Message from the query string or a JSON body
    Echo(String),
    Consent(ConsentRequest),
    WhoAmI,
}

/// Parses [`SiteRoute`]s from request data.
#[derive(Debug, Clone, Copy, Default)]
pub struct SiteRouter;

impl RouteParser for SiteRouter {
    type Route = SiteRoute;

    fn parse(&self, data: &RequestData) -> Result<SiteRoute, ParseError> {
        match (&data.method, data.segments().as_slice()) {
            (&Method::GET, []) => Ok(SiteRoute::Home),
            (&Method::GET, ["health"]) => Ok(SiteRoute::Health),
            (&Method::GET, ["robots.txt"]) => Ok(SiteRoute::Robots),
            (&Method::GET, ["api", "echo"]) => data
                .query_value("message")
                .map(|message| SiteRoute::Echo(message.to_string()))
                .ok_or(ParseError::MissingQuery("message")),
            (&Method::POST, ["api", "echo"]) => {
                let body: EchoRequest = serde_json::from_slice(&data.body)
                    .map_err(|e| ParseError::InvalidBody(e.to_string()))?;
                Ok(SiteRoute::Echo(body.message))
            }
            (&Method::POST, ["api", "consent"]) => parse_consent(data).map(SiteRoute::Consent),
            (&Method::GET, ["api", "whoami"]) => Ok(SiteRoute::WhoAmI),
            _ => Err(ParseError::no_match(data)),
        }
    }
}

/// Consent arrives as a url-encoded form or as JSON.
fn parse_consent(data: &RequestData) -> Result<ConsentRequest, ParseError> {
    let is_form = data
        .headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<mime::Mime>().ok())
        .is_some_and(|ct| ct.essence_str() == mime::APPLICATION_WWW_FORM_URLENCODED.essence_str());

    if is_form {
        return url::form_urlencoded::parse(&data.body)
            .find(|(key, _)| key == "choice")
            .map(|(_, choice)| ConsentRequest {
                choice: choice.into_owned(),
            })
            .ok_or_else(|| ParseError::InvalidBody("missing form field `choice`".to_string()));
    }

    serde_json::from_slice(&data.body).map_err(|e| ParseError::InvalidBody(e.to_string()))
}

/// Build the site's router from configuration.
///
/// # Errors
///
/// Returns `AppError::Config` if the rate limiting settings are invalid.
pub fn build_router(config: Config) -> AppResult<Router> {
    let state = AppState::new(&config);

    let router = Application::new(config)
        .with_configured_rate_limit()?
        .mount(SiteRouter, move |route| {
            handlers::dispatch(route, state.clone())
        })
        .into_router();

    Ok(router)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::body::Bytes;
    use axum::extract::Request;

    fn data(method: Method, uri: &str, content_type: Option<&str>, body: &str) -> RequestData {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(ct) = content_type {
            builder = builder.header(CONTENT_TYPE, ct);
        }
        let (parts, _) = builder.body(()).unwrap().into_parts();
        RequestData::from_parts(&parts, Bytes::from(body.to_string()))
    }

    fn parse(method: Method, uri: &str) -> Result<SiteRoute, ParseError> {
        SiteRouter.parse(&data(method, uri, None, ""))
    }

    #[test]
    fn test_static_routes() {
        assert_eq!(parse(Method::GET, "/").unwrap(), SiteRoute::Home);
        assert_eq!(parse(Method::GET, "/health").unwrap(), SiteRoute::Health);
        assert_eq!(parse(Method::GET, "/robots.txt").unwrap(), SiteRoute::Robots);
        assert_eq!(parse(Method::GET, "/api/whoami").unwrap(), SiteRoute::WhoAmI);
    }

    #[test]
    fn test_echo_query() {
        assert_eq!(
            parse(Method::GET, "/api/echo?message=hi%20there").unwrap(),
            SiteRoute::Echo("hi there".to_string())
        );
        assert_eq!(
            parse(Method::GET, "/api/echo"),
            Err(ParseError::MissingQuery("message"))
        );
    }

    #[test]
    fn test_echo_body() {
        let route = SiteRouter
            .parse(&data(
                Method::POST,
                "/api/echo",
                Some("application/json"),
                r#"{"message":"ping"}"#,
            ))
            .unwrap();
        assert_eq!(route, SiteRoute::Echo("ping".to_string()));

        let err = SiteRouter
            .parse(&data(Method::POST, "/api/echo", None, "not json"))
            .unwrap_err();
        assert!(matches!(err, ParseError::InvalidBody(_)));
    }

    #[test]
    fn test_consent_form_and_json() {
        let form = SiteRouter
            .parse(&data(
                Method::POST,
                "/api/consent",
                Some("application/x-www-form-urlencoded"),
                "choice=accepted",
            ))
            .unwrap();
        let json = SiteRouter
            .parse(&data(
                Method::POST,
                "/api/consent",
                Some("application/json"),
                r#"{"choice":"accepted"}"#,
            ))
            .unwrap();
        assert_eq!(form, json);
    }

    #[test]
    fn test_unknown_routes_do_not_match() {
        assert!(matches!(
            parse(Method::DELETE, "/health"),
            Err(ParseError::NoMatch { .. })
        ));
        assert!(matches!(
            parse(Method::GET, "/api/echo/extra"),
            Err(ParseError::NoMatch { .. })
        ));
    }

    #[test]
    fn test_build_router_rejects_invalid_rate_limit() {
        let config = Config {
            rate_limit_max_attempts: 5,
            rate_limit_window: std::time::Duration::ZERO,
            ..Config::default()
        };
        assert!(build_router(config).is_err());
    }
}
