//! Typed routing stage.
//!
//! The request body is buffered (up to a limit) so that a [`RouteParser`] can
//! see the whole request at once. A successful parse dispatches to the bound
//! handler and ends the chain; a failed parse falls through to the rest of
//! the chain.
//!
//! # Fallback Diagnostics
//!
//! When the fallback itself fails, development builds answer `404` with the
//! parse error text. Every other environment re-raises the fallback's error
//! untouched so parser internals never reach clients.

use std::sync::Arc;

use axum::body::{Body, Bytes, to_bytes};
use axum::extract::Request;
use axum::http::header::HOST;
use axum::http::request::Parts;
use axum::http::{HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use http_body_util::LengthLimitError;
use thiserror::Error;
use tracing::{debug, info};

use super::host::strip_port;
use crate::config::DEFAULT_MAX_BODY_SIZE;
use crate::environment::Environment;
use crate::error::{AppError, AppResult};
use crate::pipeline::{BoxFuture, Middleware, Next};

/// Raw request data handed to a [`RouteParser`].
#[derive(Debug, Clone)]
pub struct RequestData {
    pub method: Method,
    pub scheme: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    /// Non-empty path segments, undecoded.
    pub path: Vec<String>,
    /// Decoded query pairs in request order.
    pub query: Vec<(String, String)>,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl RequestData {
    pub fn from_parts(parts: &Parts, body: Bytes) -> Self {
        let authority = parts
            .headers
            .get(HOST)
            .and_then(|v| v.to_str().ok())
            .or_else(|| parts.uri.authority().map(|a| a.as_str()));

        let (host, port) = match authority {
            Some(authority) => {
                let host = strip_port(authority);
                let port = authority
                    .get(host.len() + 1..)
                    .and_then(|p| p.parse::<u16>().ok());
                (Some(host.to_string()), port)
            }
            None => (None, None),
        };

        Self {
            method: parts.method.clone(),
            scheme: parts.uri.scheme_str().map(str::to_string),
            host,
            port,
            path: parts
                .uri
                .path()
                .split('/')
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            query: parts
                .uri
                .query()
                .map(|q| {
                    url::form_urlencoded::parse(q.as_bytes())
                        .into_owned()
                        .collect()
                })
                .unwrap_or_default(),
            headers: parts.headers.clone(),
            body,
        }
    }

    /// Path segments as string slices.
    pub fn segments(&self) -> Vec<&str> {
        self.path.iter().map(String::as_str).collect()
    }

    /// First value of the query parameter `name`.
    pub fn query_value(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// Why request data did not match a route.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("no route for {method} /{path}")]
    NoMatch { method: Method, path: String },

    #[error("missing query parameter `{0}`")]
    MissingQuery(&'static str),

    #[error("invalid body: {0}")]
    InvalidBody(String),
}

impl ParseError {
    pub fn no_match(data: &RequestData) -> Self {
        ParseError::NoMatch {
            method: data.method.clone(),
            path: data.path.join("/"),
        }
    }
}

/// Grammar mapping raw request data to a typed route.
pub trait RouteParser: Send + Sync + 'static {
    type Route: Send + 'static;

    fn parse(&self, data: &RequestData) -> Result<Self::Route, ParseError>;
}

type Handler<R> = Arc<dyn Fn(R) -> BoxFuture<'static, AppResult<Response>> + Send + Sync>;

/// Dispatches parsed routes to a handler.
pub struct Routing<P: RouteParser> {
    parser: P,
    handler: Handler<P::Route>,
    environment: Environment,
    max_body_size: usize,
}

impl<P: RouteParser> Routing<P> {
    pub fn new<H, Fut, T>(parser: P, handler: H) -> Self
    where
        H: Fn(P::Route) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = AppResult<T>> + Send + 'static,
        T: IntoResponse,
    {
        let handler: Handler<P::Route> =
            Arc::new(move |route: P::Route| -> BoxFuture<'static, AppResult<Response>> {
                let fut = handler(route);
                Box::pin(async move { fut.await.map(IntoResponse::into_response) })
            });

        Self {
            parser,
            handler,
            environment: Environment::default(),
            max_body_size: DEFAULT_MAX_BODY_SIZE,
        }
    }

    /// Environment deciding whether routing diagnostics are shown.
    pub fn environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    /// Largest body buffered before parsing.
    pub fn max_body_size(mut self, max_body_size: usize) -> Self {
        self.max_body_size = max_body_size;
        self
    }
}

/// Buffer `body`, mapping an exceeded limit to 413.
async fn collect_body(body: Body, limit: usize) -> AppResult<Bytes> {
    to_bytes(body, limit).await.map_err(|e| {
        let inner = e.into_inner();
        if inner.is::<LengthLimitError>() {
            AppError::PayloadTooLarge(format!("Request body exceeds {limit} bytes"))
        } else {
            AppError::BadRequest(format!("Failed to read request body: {inner}"))
        }
    })
}

impl<P: RouteParser> Middleware for Routing<P> {
    fn name(&self) -> &'static str {
        "router"
    }

    fn respond<'a>(&'a self, request: Request, next: Next<'a>) -> BoxFuture<'a, AppResult<Response>> {
        Box::pin(async move {
            let (parts, body) = request.into_parts();
            let body = collect_body(body, self.max_body_size).await?;
            let data = RequestData::from_parts(&parts, body.clone());

            let routing_error = match self.parser.parse(&data) {
                Ok(route) => {
                    debug!(method = %data.method, path = %parts.uri.path(), "Route matched");
                    return (self.handler)(route).await;
                }
                Err(e) => e,
            };
            drop(data);

            let request = Request::from_parts(parts, Body::from(body));
            match next.run(request).await {
                Ok(response) => Ok(response),
                Err(error) => {
                    info!(error = %routing_error, "Routing failed");
                    if self.environment.is_development() {
                        Ok((StatusCode::NOT_FOUND, format!("Routing {routing_error}")).into_response())
                    } else {
                        Err(error)
                    }
                }
            }
        })
    }
}
