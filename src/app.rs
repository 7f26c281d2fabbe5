//! Pipeline composition.
//!
//! # Stage Order (outermost first)
//!
//! ```text
//! Request
//!    │
//!    ▼
//! ┌──────────────────┐
//! │  HTTPS Redirect  │ ← 301 to https, HSTS on secure responses
//! └────────┬─────────┘
//!          ▼
//! ┌──────────────────┐
//! │      CORS        │ ← only when origins are configured
//! └────────┬─────────┘
//!          ▼
//! ┌──────────────────┐
//! │  Request Timing  │ ← one log line per request, sees rendered errors
//! └────────┬─────────┘
//!          ▼
//! ┌──────────────────┐
//! │  Error Boundary  │ ← renders every inner error
//! └────────┬─────────┘
//!          ▼
//! ┌──────────────────┐
//! │  Context Scope   │ ← binds RequestContext::current()
//! └────────┬─────────┘
//!          ▼
//! ┌──────────────────┐
//! │  Static Assets   │ ← file hits end here
//! └────────┬─────────┘
//!          ▼
//! ┌──────────────────┐
//! │ Host Validation  │ ← only with an allow-list
//! └────────┬─────────┘
//!          ▼
//! ┌──────────────────┐
//! │    Canonical     │ ← only with a canonical host
//! └────────┬─────────┘
//!          ▼
//!   application stages (rate limiting, routers, closures)
//!          ▼
//!      404 terminal
//! ```
//!
//! The inner stages are appended in order; the four outer stages are then
//! inserted at the beginning, last inserted first, so that HTTPS ends up
//! outermost.

use std::sync::Arc;

use axum::Router;
use axum::extract::Request;
use axum::response::{IntoResponse, Response};
use tower::ServiceBuilder;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::middleware::{
    CanonicalRedirect, ContextScope, Cors, ErrorBoundary, HostValidation, HttpsRedirect,
    PublicDirectory, RateLimiting, RequestTiming, RouteParser, Routing, StaticAssets, StaticFiles,
    WindowLimiter,
};
use crate::pipeline::{BoxFuture, Middleware, Middlewares, NotFound, PipelineService, Position};

/// Assembles the pipeline from configuration and application stages.
///
/// # Example
///
/// ```rust,ignore
/// let router = Application::new(config)
///     .with_configured_rate_limit()?
///     .mount(SiteRouter, handlers::dispatch)
///     .into_router();
/// ```
pub struct Application {
    config: Config,
    static_files: Option<Arc<dyn StaticFiles>>,
    stages: Middlewares,
}

impl Application {
    /// Serves static files from `config.public_directory` by default.
    pub fn new(config: Config) -> Self {
        let static_files: Arc<dyn StaticFiles> =
            Arc::new(PublicDirectory::new(config.public_directory.clone()));
        Self {
            config,
            static_files: Some(static_files),
            stages: Middlewares::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Replace the static-file capability.
    pub fn static_files<F: StaticFiles>(mut self, files: F) -> Self {
        self.static_files = Some(Arc::new(files));
        self
    }

    /// Serve no static files.
    pub fn without_static_files(mut self) -> Self {
        self.static_files = None;
        self
    }

    /// Append an application stage.
    pub fn middleware<M: Middleware>(self, middleware: M) -> Self {
        self.middleware_at(middleware, Position::End)
    }

    /// Insert an application stage. Positions are relative to other
    /// application stages; the built-in stages always wrap them.
    pub fn middleware_at<M: Middleware>(mut self, middleware: M, at: Position) -> Self {
        self.stages.use_middleware(middleware, at);
        self
    }

    /// Insert a closure stage among the application stages.
    pub fn use_fn<F>(mut self, name: &'static str, at: Position, respond: F) -> Self
    where
        F: for<'a> Fn(Request, crate::pipeline::Next<'a>) -> BoxFuture<'a, AppResult<Response>>
            + Send
            + Sync
            + 'static,
    {
        self.stages.use_fn(name, at, respond);
        self
    }

    /// Append client-IP rate limiting from `RATE_LIMIT_*` settings, if enabled.
    ///
    /// Inside a Tokio runtime this also starts the limiter's pruning task.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the window cannot be divided into
    /// `RATE_LIMIT_MAX_ATTEMPTS` slots.
    pub fn with_configured_rate_limit(self) -> AppResult<Self> {
        if !self.config.rate_limiting_enabled() {
            info!("Rate limiting disabled (RATE_LIMIT_MAX_ATTEMPTS=0)");
            return Ok(self);
        }

        let limiter = WindowLimiter::new(
            self.config.rate_limit_max_attempts,
            self.config.rate_limit_window,
        )
        .map_err(|e| AppError::Config(format!("Invalid rate limit: {e}")))?;
        let limiter = Arc::new(limiter);

        // Replenished clients are dropped once per window
        if limiter.spawn_pruning(self.config.rate_limit_window).is_none() {
            warn!("No Tokio runtime; rate limiter state will not be pruned");
        }

        info!(
            max_attempts = self.config.rate_limit_max_attempts,
            window_secs = self.config.rate_limit_window.as_secs(),
            "Rate limiting enabled"
        );
        Ok(self.middleware(RateLimiting::shared(limiter)))
    }

    /// Append a routing stage dispatching parsed routes to `handler`.
    pub fn mount<P, H, Fut, T>(self, parser: P, handler: H) -> Self
    where
        P: RouteParser,
        H: Fn(P::Route) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = AppResult<T>> + Send + 'static,
        T: IntoResponse,
    {
        let routing = Routing::new(parser, handler)
            .environment(self.config.environment)
            .max_body_size(self.config.max_body_size);
        self.middleware(routing)
    }

    /// Build the ordered stage list.
    pub fn build(self) -> Middlewares {
        let config = self.config;
        let mut chain = Middlewares::new();

        chain.use_middleware(ContextScope, Position::End);

        if let Some(files) = self.static_files {
            chain.use_shared(Arc::new(StaticAssets::shared(files)), Position::End);
        }

        if config.host_validation_enabled() {
            info!(hosts = ?config.allowed_insecure_hosts, "Host validation enabled");
            chain.use_middleware(
                HostValidation::new(config.allowed_insecure_hosts.iter().cloned()),
                Position::End,
            );
        }

        if let Some(canonical_host) = &config.canonical_host {
            info!(canonical_host = %canonical_host, "Canonical host redirects enabled");
            chain.use_middleware(
                CanonicalRedirect::new(canonical_host.clone(), config.base_url.clone()),
                Position::End,
            );
        }

        chain.extend(self.stages);

        chain.use_middleware(ErrorBoundary::new(config.environment), Position::Beginning);
        chain.use_middleware(
            RequestTiming::new(config.static_classification),
            Position::Beginning,
        );
        if config.cors_enabled() {
            chain.use_middleware(
                Cors::new(config.cors_allowed_origins.iter().cloned()),
                Position::Beginning,
            );
        }
        chain.use_middleware(HttpsRedirect::new(config.https_redirect), Position::Beginning);

        info!(stages = ?chain.names(), "Pipeline assembled");
        chain
    }

    /// Build the pipeline ending in a 404 responder.
    pub fn into_service(self) -> PipelineService {
        self.build().into_service(NotFound)
    }

    /// Mount the pipeline on an Axum router.
    ///
    /// Every request gets an `X-Request-Id` (generated when absent) before the
    /// pipeline runs, and the id is echoed on the response.
    pub fn into_router(self) -> Router {
        Router::new().fallback_service(self.into_service()).layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id()),
        )
    }
}
