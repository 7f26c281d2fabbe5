//! Ordered middleware chain.
//!
//! A [`Middlewares`] list owns every stage of the pipeline. Each request walks
//! the list front to back through [`Next`]; responses unwind back to front, so
//! post-processing (header stamping, timing) happens innermost first.
//!
//! # Insertion
//!
//! ```text
//! use(A, End); use(B, End); use(C, Beginning); use(D, Beginning)
//!
//! request ──▶ D ──▶ C ──▶ A ──▶ B ──▶ terminal responder
//! ```
//!
//! The last stage inserted at [`Position::Beginning`] runs first.
//!
//! # Tower Integration
//!
//! [`Middlewares::into_service`] freezes the list into a [`PipelineService`],
//! a cloneable `tower::Service` that can be mounted on an Axum router or
//! driven directly with `ServiceExt::oneshot`.

use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::extract::Request;
use axum::response::{IntoResponse, Response};
use tower::Service;

use crate::error::{AppError, AppResult};

/// A boxed future that is `Send`.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A single pipeline stage.
///
/// A stage either short-circuits with its own response or error, or calls
/// `next.run(request)` exactly once and returns (possibly decorated) what the
/// inner chain produced. Stages hold no references to their siblings.
pub trait Middleware: Send + Sync + 'static {
    /// Stable stage name used for logging and ordering assertions.
    fn name(&self) -> &'static str;

    /// Handle `request`, delegating to the rest of the chain through `next`.
    fn respond<'a>(&'a self, request: Request, next: Next<'a>) -> BoxFuture<'a, AppResult<Response>>;
}

/// The innermost handler invoked when every stage has passed the request on.
pub trait Responder: Send + Sync + 'static {
    fn respond(&self, request: Request) -> BoxFuture<'_, AppResult<Response>>;
}

/// Terminal responder that fails every request with 404.
#[derive(Debug, Clone, Copy, Default)]
pub struct NotFound;

impl Responder for NotFound {
    fn respond(&self, request: Request) -> BoxFuture<'_, AppResult<Response>> {
        let path = request.uri().path().to_string();
        Box::pin(async move { Err(AppError::NotFound(path)) })
    }
}

/// The remainder of the chain as seen from one stage.
///
/// Consumed by [`Next::run`], so a stage cannot invoke the inner chain twice.
pub struct Next<'a> {
    stack: &'a [Arc<dyn Middleware>],
    terminal: &'a dyn Responder,
}

impl<'a> Next<'a> {
    /// Chain over `stack`, ending in `terminal`.
    pub fn new(stack: &'a [Arc<dyn Middleware>], terminal: &'a dyn Responder) -> Self {
        Self { stack, terminal }
    }

    /// Run the next stage, or the terminal responder when none remain.
    pub fn run(self, request: Request) -> BoxFuture<'a, AppResult<Response>> {
        match self.stack.split_first() {
            Some((stage, rest)) => stage.respond(request, Next::new(rest, self.terminal)),
            None => self.terminal.respond(request),
        }
    }
}

/// Insertion marker used when composing the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Position {
    Beginning,
    #[default]
    End,
}

/// The ordered middleware list, owned by the composer.
#[derive(Clone, Default)]
pub struct Middlewares {
    stack: Vec<Arc<dyn Middleware>>,
}

impl Middlewares {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a stage at `at`.
    pub fn use_middleware<M: Middleware>(&mut self, middleware: M, at: Position) -> &mut Self {
        self.use_shared(Arc::new(middleware), at)
    }

    /// Insert an already shared stage at `at`.
    pub fn use_shared(&mut self, middleware: Arc<dyn Middleware>, at: Position) -> &mut Self {
        match at {
            Position::Beginning => self.stack.insert(0, middleware),
            Position::End => self.stack.push(middleware),
        }
        self
    }

    /// Insert a closure stage at `at`.
    ///
    /// See [`FnMiddleware`](crate::middleware::FnMiddleware).
    pub fn use_fn<F>(&mut self, name: &'static str, at: Position, respond: F) -> &mut Self
    where
        F: for<'a> Fn(Request, Next<'a>) -> BoxFuture<'a, AppResult<Response>>
            + Send
            + Sync
            + 'static,
    {
        self.use_middleware(crate::middleware::FnMiddleware::new(name, respond), at)
    }

    /// Append every stage of `other`, keeping its order.
    pub fn extend(&mut self, other: Middlewares) -> &mut Self {
        self.stack.extend(other.stack);
        self
    }

    /// Stage names from outermost to innermost.
    pub fn names(&self) -> Vec<&'static str> {
        self.stack.iter().map(|m| m.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    /// Freeze the chain into a tower service ending in `terminal`.
    pub fn into_service<R: Responder>(self, terminal: R) -> PipelineService {
        PipelineService {
            stack: self.stack.into(),
            terminal: Arc::new(terminal),
        }
    }
}

/// Frozen pipeline exposed as a `tower::Service`.
///
/// Errors that escape every stage (for example a Host-less plaintext request
/// rejected by the outermost HTTPS stage) are rendered with client-safe
/// reasons; the service itself never fails.
#[derive(Clone)]
pub struct PipelineService {
    stack: Arc<[Arc<dyn Middleware>]>,
    terminal: Arc<dyn Responder>,
}

impl PipelineService {
    /// Stage names from outermost to innermost.
    pub fn names(&self) -> Vec<&'static str> {
        self.stack.iter().map(|m| m.name()).collect()
    }

    /// Run one request through the chain.
    pub async fn handle(&self, request: Request) -> Response {
        let next = Next::new(&self.stack, self.terminal.as_ref());
        match next.run(request).await {
            Ok(response) => response,
            Err(error) => error.into_response(),
        }
    }
}

impl Service<Request> for PipelineService {
    type Response = Response;
    type Error = Infallible;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: Request) -> Self::Future {
        let pipeline = self.clone();
        Box::pin(async move { Ok(pipeline.handle(request).await) })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use axum::body::Body;
    use axum::http::{HeaderValue, StatusCode};
    use tower::ServiceExt;

    /// Records the order it observes the request in and out.
    struct Recorder {
        name: &'static str,
        trail: Arc<Mutex<Vec<String>>>,
    }

    impl Middleware for Recorder {
        fn name(&self) -> &'static str {
            self.name
        }

        fn respond<'a>(
            &'a self,
            request: Request,
            next: Next<'a>,
        ) -> BoxFuture<'a, AppResult<Response>> {
            Box::pin(async move {
                self.trail.lock().unwrap().push(format!("in:{}", self.name));
                let mut response = next.run(request).await?;
                self.trail.lock().unwrap().push(format!("out:{}", self.name));
                response
                    .headers_mut()
                    .append("x-stage", HeaderValue::from_static(self.name));
                Ok(response)
            })
        }
    }

    struct Ok200;

    impl Responder for Ok200 {
        fn respond(&self, _request: Request) -> BoxFuture<'_, AppResult<Response>> {
            Box::pin(async { Ok(StatusCode::OK.into_response()) })
        }
    }

    fn recorder(name: &'static str, trail: &Arc<Mutex<Vec<String>>>) -> Recorder {
        Recorder {
            name,
            trail: trail.clone(),
        }
    }

    #[test]
    fn test_last_inserted_at_beginning_runs_first() {
        let trail = Arc::new(Mutex::new(Vec::new()));
        let mut chain = Middlewares::new();
        chain
            .use_middleware(recorder("a", &trail), Position::End)
            .use_middleware(recorder("b", &trail), Position::End)
            .use_middleware(recorder("c", &trail), Position::Beginning)
            .use_middleware(recorder("d", &trail), Position::Beginning);

        assert_eq!(chain.names(), vec!["d", "c", "a", "b"]);
        assert_eq!(chain.len(), 4);
    }

    #[tokio::test]
    async fn test_inward_order_and_reverse_unwinding() {
        let trail = Arc::new(Mutex::new(Vec::new()));
        let mut chain = Middlewares::new();
        chain
            .use_middleware(recorder("outer", &trail), Position::End)
            .use_middleware(recorder("inner", &trail), Position::End);

        let service = chain.into_service(Ok200);
        let response = service
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(
            *trail.lock().unwrap(),
            vec!["in:outer", "in:inner", "out:inner", "out:outer"]
        );
        let stamped: Vec<_> = response.headers().get_all("x-stage").iter().collect();
        assert_eq!(stamped, vec!["inner", "outer"]);
    }

    #[tokio::test]
    async fn test_empty_chain_hits_not_found_terminal() {
        let service = Middlewares::new().into_service(NotFound);
        let response = service
            .oneshot(Request::builder().uri("/missing").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_short_circuit_skips_inner_stages() {
        let trail = Arc::new(Mutex::new(Vec::new()));
        let mut chain = Middlewares::new();
        chain.use_fn("gate", Position::End, |_request, _next| {
            Box::pin(async { Ok(StatusCode::IM_A_TEAPOT.into_response()) })
        });
        chain.use_middleware(recorder("never", &trail), Position::End);

        let response = chain
            .into_service(Ok200)
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::IM_A_TEAPOT);
        assert!(trail.lock().unwrap().is_empty());
    }
}
