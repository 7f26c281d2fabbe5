//! Cross-origin resource sharing.
//!
//! Origins come from `CORS_ALLOWED_ORIGINS`; `*` allows any origin. Preflight
//! requests from allowed origins are answered directly, every other request
//! from an allowed origin gets `Access-Control-Allow-Origin` on its response.
//! Requests without an `Origin` header, or from unlisted origins, pass through
//! untouched.

use axum::extract::Request;
use axum::http::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
    ACCESS_CONTROL_REQUEST_METHOD, ORIGIN, VARY,
};
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::error::AppResult;
use crate::pipeline::{BoxFuture, Middleware, Next};

const ALLOWED_METHODS: &str = "GET, POST, PUT, OPTIONS, DELETE, PATCH";
const ALLOWED_HEADERS: &str = "Accept, Authorization, Content-Type, Origin, X-Requested-With";

#[derive(Debug, Clone)]
pub struct Cors {
    origins: Vec<String>,
    any_origin: bool,
}

impl Cors {
    pub fn new<I, S>(origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let origins: Vec<String> = origins.into_iter().map(Into::into).collect();
        let any_origin = origins.iter().any(|o| o == "*");
        Self {
            origins,
            any_origin,
        }
    }

    /// The `Access-Control-Allow-Origin` value for `origin`, if it is allowed.
    fn allow_origin(&self, origin: &HeaderValue) -> Option<HeaderValue> {
        if self.any_origin {
            return Some(HeaderValue::from_static("*"));
        }
        let origin_str = origin.to_str().ok()?;
        self.origins
            .iter()
            .any(|o| o == origin_str)
            .then(|| origin.clone())
    }

    fn stamp(&self, headers: &mut HeaderMap, allow: HeaderValue) {
        headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, allow);
        if !self.any_origin {
            headers.append(VARY, HeaderValue::from_static("Origin"));
        }
    }
}

impl Middleware for Cors {
    fn name(&self) -> &'static str {
        "cors"
    }

    fn respond<'a>(&'a self, request: Request, next: Next<'a>) -> BoxFuture<'a, AppResult<Response>> {
        Box::pin(async move {
            let Some(allow) = request
                .headers()
                .get(ORIGIN)
                .and_then(|origin| self.allow_origin(origin))
            else {
                return next.run(request).await;
            };

            let is_preflight = request.method() == Method::OPTIONS
                && request.headers().contains_key(ACCESS_CONTROL_REQUEST_METHOD);
            if is_preflight {
                let mut response = StatusCode::OK.into_response();
                let headers = response.headers_mut();
                self.stamp(headers, allow);
                headers.insert(
                    ACCESS_CONTROL_ALLOW_METHODS,
                    HeaderValue::from_static(ALLOWED_METHODS),
                );
                headers.insert(
                    ACCESS_CONTROL_ALLOW_HEADERS,
                    HeaderValue::from_static(ALLOWED_HEADERS),
                );
                return Ok(response);
            }

            let mut response = next.run(request).await?;
            self.stamp(response.headers_mut(), allow);
            Ok(response)
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::body::Body;

    use crate::pipeline::{Middlewares, Position, Responder};

    struct Created;

    impl Responder for Created {
        fn respond(&self, _request: Request) -> BoxFuture<'_, AppResult<Response>> {
            Box::pin(async { Ok(StatusCode::CREATED.into_response()) })
        }
    }

    async fn run(cors: Cors, request: Request) -> Response {
        let mut chain = Middlewares::new();
        chain.use_middleware(cors, Position::End);
        chain.into_service(Created).handle(request).await
    }

    #[tokio::test]
    async fn test_preflight_answered_for_listed_origin() {
        let request = Request::builder()
            .method(Method::OPTIONS)
            .uri("/api")
            .header(ORIGIN, "https://app.example.com")
            .header(ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .body(Body::empty())
            .unwrap();
        let response = run(Cors::new(["https://app.example.com"]), request).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[ACCESS_CONTROL_ALLOW_ORIGIN],
            "https://app.example.com"
        );
        assert_eq!(response.headers()[ACCESS_CONTROL_ALLOW_METHODS], ALLOWED_METHODS);
        assert_eq!(response.headers()[VARY], "Origin");
    }

    #[tokio::test]
    async fn test_simple_request_stamped() {
        let request = Request::builder()
            .uri("/api")
            .header(ORIGIN, "https://any.example")
            .body(Body::empty())
            .unwrap();
        let response = run(Cors::new(["*"]), request).await;

        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers()[ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert!(response.headers().get(VARY).is_none());
    }

    #[tokio::test]
    async fn test_unlisted_origin_untouched() {
        let request = Request::builder()
            .method(Method::OPTIONS)
            .uri("/api")
            .header(ORIGIN, "https://evil.example")
            .header(ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .body(Body::empty())
            .unwrap();
        let response = run(Cors::new(["https://app.example.com"]), request).await;

        assert_eq!(response.status(), StatusCode::CREATED);
        assert!(response.headers().get(ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
    }
}
