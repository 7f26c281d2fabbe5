//! Per-request context and the ambient accessor bound around inner stages.
//!
//! [`RequestContext`] is a read-only snapshot of the request head taken by the
//! context-scope stage. Inner stages can receive it explicitly from the request
//! extensions, or look it up ambiently with [`RequestContext::current`] while
//! running inside the scope. The binding is a tokio task-local, so concurrent
//! requests never observe each other's context.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, Request};
use axum::http::header::{ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE};
use axum::http::{HeaderMap, Method, Uri};
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::headers::{CF_CITY, CF_IPCOUNTRY, CF_REGION, X_REQUEST_ID, X_REQUESTED_WITH};
use crate::middleware::ip::client_ip;

/// Locale used when `Accept-Language` is missing or empty.
pub const DEFAULT_LOCALE: &str = "en_US";

tokio::task_local! {
    static CURRENT_REQUEST: Arc<RequestContext>;
}

/// Visitor location reported by the edge proxy.
///
/// `None` fields are unknown, never empty strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct GeoLocation {
    pub country: Option<String>,
    pub region: Option<String>,
    pub city: Option<String>,
}

/// Snapshot of the request head for the lifetime of one request.
#[derive(Debug, Clone)]
pub struct RequestContext {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    peer: Option<SocketAddr>,
}

impl RequestContext {
    pub fn new(method: Method, uri: Uri, headers: HeaderMap, peer: Option<SocketAddr>) -> Self {
        Self {
            method,
            uri,
            headers,
            peer,
        }
    }

    /// Capture the head of `request`, including the peer address when the
    /// server was started with connect info.
    pub fn from_request(request: &Request) -> Self {
        let peer = request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);
        Self::new(
            request.method().clone(),
            request.uri().clone(),
            request.headers().clone(),
            peer,
        )
    }

    /// The context bound to the current task.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Internal` when called outside the context scope.
    pub fn current() -> AppResult<Arc<RequestContext>> {
        Self::try_current()
            .ok_or_else(|| AppError::Internal("No request bound to the current task".to_string()))
    }

    /// The context bound to the current task, if any.
    pub fn try_current() -> Option<Arc<RequestContext>> {
        CURRENT_REQUEST.try_with(Arc::clone).ok()
    }

    /// Run `future` with `context` bound as the ambient request.
    pub async fn scope<F: Future>(context: Arc<RequestContext>, future: F) -> F::Output {
        CURRENT_REQUEST.scope(context, future).await
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn peer(&self) -> Option<SocketAddr> {
        self.peer
    }

    fn header(&self, name: impl axum::http::header::AsHeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Client address from proxy headers, then the peer, else `"unknown"`.
    pub fn real_ip(&self) -> String {
        client_ip(&self.headers, self.peer).0.into_owned()
    }

    pub fn geo_location(&self) -> Option<GeoLocation> {
        let country = self.header(CF_IPCOUNTRY).map(str::to_string);
        let region = self.header(CF_REGION).map(str::to_string);
        let city = self.header(CF_CITY).map(str::to_string);

        if country.is_none() && region.is_none() && city.is_none() {
            return None;
        }
        Some(GeoLocation {
            country,
            region,
            city,
        })
    }

    /// Primary language tag from `Accept-Language`.
    pub fn locale(&self) -> String {
        self.header(ACCEPT_LANGUAGE)
            .and_then(|raw| raw.split(',').next())
            .and_then(|entry| entry.split(';').next())
            .map(str::trim)
            .filter(|tag| !tag.is_empty())
            .unwrap_or(DEFAULT_LOCALE)
            .to_string()
    }

    /// Request id assigned by the request-id layer, if present.
    pub fn request_id(&self) -> Option<&str> {
        self.header(X_REQUEST_ID)
    }

    /// `true` for url-encoded and multipart form bodies.
    pub fn is_form_submission(&self) -> bool {
        self.header(CONTENT_TYPE)
            .and_then(|raw| raw.parse::<mime::Mime>().ok())
            .is_some_and(|ct| {
                ct.essence_str() == mime::APPLICATION_WWW_FORM_URLENCODED.essence_str()
                    || ct.essence_str() == mime::MULTIPART_FORM_DATA.essence_str()
            })
    }

    /// `true` when the client expects a JSON response.
    ///
    /// Only the first `Accept` entry counts; browsers append `*/*` to
    /// ordinary navigations.
    pub fn is_ajax_request(&self) -> bool {
        if self
            .header(X_REQUESTED_WITH)
            .is_some_and(|v| v.eq_ignore_ascii_case("xmlhttprequest"))
        {
            return true;
        }

        self.header(ACCEPT)
            .and_then(|raw| raw.split(',').next())
            .and_then(|entry| entry.split(';').next())
            .is_some_and(|media| media.trim() == mime::APPLICATION_JSON.essence_str())
    }

    pub fn is_traditional_form_submission(&self) -> bool {
        self.is_form_submission() && !self.is_ajax_request()
    }
}
