//! Static asset serving.
//!
//! [`StaticAssets`] consults a [`StaticFiles`] capability for `GET` and `HEAD`
//! requests and serves hits directly; misses and other methods fall through.
//! [`PublicDirectory`] is the filesystem implementation.
//!
//! # Path Safety
//!
//! Request paths containing `..`, backslashes or NUL bytes never resolve, so
//! nothing outside the public directory can be served.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::body::Body;
use axum::extract::Request;
use axum::http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use axum::http::{HeaderValue, Method};
use axum::response::Response;
use mime::Mime;
use tokio::fs::{self, File};
use tokio_util::io::ReaderStream;
use tracing::debug;

use crate::error::{AppError, AppResult};
use crate::pipeline::{BoxFuture, Middleware, Next};

/// File lookup and streaming capability.
pub trait StaticFiles: Send + Sync + 'static {
    fn exists<'a>(&'a self, path: &'a str) -> BoxFuture<'a, bool>;

    fn stream<'a>(&'a self, path: &'a str) -> BoxFuture<'a, AppResult<Response>>;
}

/// Content type for a file name, by extension.
pub fn content_type_for(path: &Path) -> Mime {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    match ext.as_str() {
        "html" | "htm" => mime::TEXT_HTML_UTF_8,
        "css" => mime::TEXT_CSS_UTF_8,
        "js" | "mjs" => mime::APPLICATION_JAVASCRIPT_UTF_8,
        "json" => mime::APPLICATION_JSON,
        "txt" => mime::TEXT_PLAIN_UTF_8,
        "xml" => mime::TEXT_XML,
        "png" => mime::IMAGE_PNG,
        "jpg" | "jpeg" => mime::IMAGE_JPEG,
        "gif" => mime::IMAGE_GIF,
        "svg" => mime::IMAGE_SVG,
        "ico" => "image/x-icon"
            .parse()
            .unwrap_or(mime::APPLICATION_OCTET_STREAM),
        "woff" => mime::FONT_WOFF,
        "woff2" => mime::FONT_WOFF2,
        "pdf" => mime::APPLICATION_PDF,
        _ => mime::APPLICATION_OCTET_STREAM,
    }
}

/// Serves files under a root directory.
#[derive(Debug, Clone)]
pub struct PublicDirectory {
    root: PathBuf,
}

impl PublicDirectory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a request path onto the root, refusing traversal.
    pub fn resolve(&self, request_path: &str) -> Option<PathBuf> {
        let mut resolved = self.root.clone();
        let mut any = false;

        for segment in request_path.split('/').filter(|s| !s.is_empty()) {
            if segment == "."
                || segment == ".."
                || segment.contains('\\')
                || segment.contains('\0')
            {
                return None;
            }
            resolved.push(segment);
            any = true;
        }

        any.then_some(resolved)
    }
}

impl StaticFiles for PublicDirectory {
    fn exists<'a>(&'a self, path: &'a str) -> BoxFuture<'a, bool> {
        Box::pin(async move {
            let Some(file) = self.resolve(path) else {
                return false;
            };
            fs::metadata(&file).await.is_ok_and(|m| m.is_file())
        })
    }

    fn stream<'a>(&'a self, path: &'a str) -> BoxFuture<'a, AppResult<Response>> {
        Box::pin(async move {
            let file_path = self
                .resolve(path)
                .ok_or_else(|| AppError::NotFound(path.to_string()))?;

            let file = File::open(&file_path)
                .await
                .map_err(|_| AppError::NotFound(path.to_string()))?;
            let len = file
                .metadata()
                .await
                .map_err(|e| AppError::Internal(format!("Failed to stat {path}: {e}")))?
                .len();

            let content_type = HeaderValue::from_str(content_type_for(&file_path).as_ref())
                .map_err(|e| AppError::Internal(format!("Invalid content type: {e}")))?;

            let mut response = Response::new(Body::from_stream(ReaderStream::new(file)));
            let headers = response.headers_mut();
            headers.insert(CONTENT_TYPE, content_type);
            headers.insert(CONTENT_LENGTH, HeaderValue::from(len));
            Ok(response)
        })
    }
}

/// Serves static files ahead of routing.
#[derive(Clone)]
pub struct StaticAssets {
    files: Arc<dyn StaticFiles>,
}

impl StaticAssets {
    pub fn new<F: StaticFiles>(files: F) -> Self {
        Self::shared(Arc::new(files))
    }

    pub fn shared(files: Arc<dyn StaticFiles>) -> Self {
        Self { files }
    }
}

impl Middleware for StaticAssets {
    fn name(&self) -> &'static str {
        "static_assets"
    }

    fn respond<'a>(&'a self, request: Request, next: Next<'a>) -> BoxFuture<'a, AppResult<Response>> {
        Box::pin(async move {
            if request.method() != Method::GET && request.method() != Method::HEAD {
                return next.run(request).await;
            }

            let path = request.uri().path().to_string();
            if self.files.exists(&path).await {
                debug!(path = %path, "Serving static file");
                return self.files.stream(&path).await;
            }

            next.run(request).await
        })
    }
}
