//! Converts unhandled errors into responses.
//!
//! This is the only stage allowed to render a generic 500. In development the
//! full reason is shown; elsewhere server-side reasons are replaced with
//! [`GENERIC_FAILURE_REASON`](crate::error::GENERIC_FAILURE_REASON).

use axum::extract::Request;
use axum::response::Response;
use tracing::{debug, error};

use crate::environment::Environment;
use crate::error::AppResult;
use crate::pipeline::{BoxFuture, Middleware, Next};

#[derive(Debug, Clone, Copy)]
pub struct ErrorBoundary {
    environment: Environment,
}

impl ErrorBoundary {
    pub const fn new(environment: Environment) -> Self {
        Self { environment }
    }
}

impl Middleware for ErrorBoundary {
    fn name(&self) -> &'static str {
        "error_boundary"
    }

    fn respond<'a>(&'a self, request: Request, next: Next<'a>) -> BoxFuture<'a, AppResult<Response>> {
        Box::pin(async move {
            match next.run(request).await {
                Ok(response) => Ok(response),
                Err(e) => {
                    if e.status().is_server_error() {
                        error!(error = %e, "Unhandled error");
                    } else {
                        debug!(error = %e, "Request rejected");
                    }
                    Ok(e.render(self.environment.is_development()))
                }
            }
        })
    }
}
