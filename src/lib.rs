//! # Request Pipeline
//!
//! An ordered HTTP middleware pipeline on top of Axum, featuring:
//!
//! - **Composition**: Named stages inserted at the beginning or end of a chain
//! - **Host Policy**: Host allow-listing, canonical-host and HTTPS redirects, HSTS
//! - **Protection**: Per-client rate limiting with `X-RateLimit-*` headers
//! - **Observability**: One timed log line per request, request ids, Prometheus metrics
//! - **Ambient Context**: The current request is reachable from anywhere in its task
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Axum HTTP Server                       │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Request ID → Trace (tower-http)                            │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Pipeline (HTTPS → CORS → Errors → Timing → Context →       │
//! │            Static → Host → Canonical → application stages)  │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Routing stage (RouteParser → handler)                      │
//! ├─────────────────────────────────────────────────────────────┤
//! │  404 terminal                                               │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use request_pipeline::{Config, build_router};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let addr = config.server_addr();
//!     let app = build_router(config)?;
//!
//!     let listener = tokio::net::TcpListener::bind(addr).await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Host Policy Configuration
//!
//! ```bash
//! CANONICAL_HOST=example.com BASE_URL=https://example.com HTTPS_REDIRECT=true cargo run
//! ```
//!
//! Enable rate limiting:
//! ```bash
//! RATE_LIMIT_MAX_ATTEMPTS=100 RATE_LIMIT_WINDOW_SECS=60 cargo run
//! ```

pub mod app;
pub mod config;
pub mod context;
pub mod cookies;
pub mod envelope;
pub mod environment;
pub mod error;
pub mod handlers;
pub mod headers;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod pipeline;
pub mod responses;
pub mod routes;
pub mod state;
pub mod utils;
pub mod validation;

// Re-exports for convenience
pub use app::Application;
pub use config::Config;
pub use context::RequestContext;
pub use envelope::Envelope;
pub use environment::Environment;
pub use error::{AppError, AppResult};
pub use pipeline::{Middleware, Middlewares, Next, PipelineService, Position};
pub use routes::{SiteRoute, SiteRouter, build_router};
pub use state::AppState;
