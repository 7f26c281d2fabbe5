//! Binds the current request for inner stages.
//!
//! The [`RequestContext`] is inserted into the request extensions for explicit
//! access and bound as the task-local ambient request for
//! [`RequestContext::current`]. The binding ends when the inner chain returns.

use std::sync::Arc;

use axum::extract::Request;
use axum::response::Response;

use crate::context::RequestContext;
use crate::error::AppResult;
use crate::pipeline::{BoxFuture, Middleware, Next};

#[derive(Debug, Clone, Copy, Default)]
pub struct ContextScope;

impl Middleware for ContextScope {
    fn name(&self) -> &'static str {
        "context_scope"
    }

    fn respond<'a>(&'a self, mut request: Request, next: Next<'a>) -> BoxFuture<'a, AppResult<Response>> {
        let context = Arc::new(RequestContext::from_request(&request));
        request.extensions_mut().insert(context.clone());
        Box::pin(RequestContext::scope(context, next.run(request)))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;

    use crate::pipeline::{Middlewares, Position, Responder};

    /// Echoes the ambient request id and checks it matches the extension.
    struct EchoId;

    impl Responder for EchoId {
        fn respond(&self, request: Request) -> BoxFuture<'_, AppResult<Response>> {
            Box::pin(async move {
                let ambient = RequestContext::current()?;
                let explicit = request.extensions().get::<Arc<RequestContext>>().unwrap();
                assert!(Arc::ptr_eq(&ambient, explicit));
                Ok(ambient.request_id().unwrap_or("-").to_string().into_response())
            })
        }
    }

    #[tokio::test]
    async fn test_inner_stages_see_current_request() {
        let mut chain = Middlewares::new();
        chain.use_middleware(ContextScope, Position::End);
        let service = chain.into_service(EchoId);

        let response = service
            .handle(
                Request::builder()
                    .uri("/")
                    .header("x-request-id", "req-1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"req-1");

        // Nothing leaks once the request completes
        assert!(RequestContext::try_current().is_none());
    }

    #[tokio::test]
    async fn test_missing_scope_is_an_error() {
        let response = Middlewares::new()
            .into_service(EchoId)
            .handle(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
