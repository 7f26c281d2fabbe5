//! Ad-hoc middleware built from a closure.

use axum::extract::Request;
use axum::response::Response;

use crate::error::AppResult;
use crate::pipeline::{BoxFuture, Middleware, Next};

/// A middleware stage backed by a closure.
///
/// # Example
///
/// ```rust,ignore
/// middlewares.use_fn("audit", Position::End, |request, next| {
///     Box::pin(async move {
///         tracing::info!(uri = %request.uri(), "Request received");
///         let response = next.run(request).await?;
///         tracing::info!(status = %response.status(), "Response sent");
///         Ok(response)
///     })
/// });
/// ```
pub struct FnMiddleware<F> {
    name: &'static str,
    respond: F,
}

impl<F> FnMiddleware<F> {
    pub const fn new(name: &'static str, respond: F) -> Self {
        Self { name, respond }
    }
}

impl<F> Middleware for FnMiddleware<F>
where
    F: for<'a> Fn(Request, Next<'a>) -> BoxFuture<'a, AppResult<Response>> + Send + Sync + 'static,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn respond<'a>(&'a self, request: Request, next: Next<'a>) -> BoxFuture<'a, AppResult<Response>> {
        (self.respond)(request, next)
    }
}
