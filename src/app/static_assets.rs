use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::{
    http::{
        request::{HttpError, Request},
        response::{Response, StatusCode, text_response},
    },
    runtime::handler::Handler,
};

/// File served for the root path.
pub const INDEX_FILE: &str = "index.html";

/// Read-through file server rooted at one directory.
#[derive(Debug, Clone)]
pub struct StaticAssets {
    root: PathBuf,
}

impl StaticAssets {
    /// Serves files below `root`.
    ///
    /// The root is canonicalized once here. A missing root is kept as an absolute
    /// path and every lookup below it answers `404`.
    #[must_use]
    pub fn new(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        let root = match std::fs::canonicalize(root) {
            Ok(canonical) => canonical,
            Err(error) => {
                warn!(root = %root.display(), %error, "static root is not accessible");
                std::path::absolute(root).unwrap_or_else(|_| root.to_path_buf())
            }
        };
        Self { root }
    }

    /// Maps a decoded request path to a regular file inside the root.
    ///
    /// Returns `None` when the file is missing, is not a regular file, or resolves outside the root.
    pub async fn resolve(&self, request_path: &str) -> Option<PathBuf> {
        let relative = match request_path {
            "/" => INDEX_FILE,
            other => other.trim_start_matches('/'),
        };
        if relative.contains('\0') {
            return None;
        }

        let canonical = tokio::fs::canonicalize(self.root.join(relative)).await.ok()?;
        if !canonical.starts_with(&self.root) {
            warn!(path = request_path, "rejected path outside the static root");
            return None;
        }

        let metadata = tokio::fs::metadata(&canonical).await.ok()?;
        metadata.is_file().then_some(canonical)
    }
}

/// Content type guessed from the file extension.
#[must_use]
pub fn content_type(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("html") => "text/html; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("js") => "application/javascript; charset=utf-8",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("svg") => "image/svg+xml",
        _ => "application/octet-stream",
    }
}

impl Handler for StaticAssets {
    async fn call(&self, req: &Request) -> Result<Response, HttpError> {
        let path = req.path();
        let Some(file) = self.resolve(&path).await else {
            debug!(path = %path, "no static file");
            return Ok(text_response(StatusCode::NotFound, "Not Found"));
        };

        let bytes = tokio::fs::read(&file).await?;
        let response = Response::with_body(StatusCode::Ok, content_type(&file), bytes);
        if req.method() == "HEAD" {
            Ok(response.without_body())
        } else {
            Ok(response)
        }
    }
}
