//! The lost and found application: routing, CORS and failure recovery in front of the
//! items API and the static client.

/// Module containing the CORS headers
pub mod cors;
/// Module containing the `/api/items` handler
pub mod items_api;
/// Module containing the static file handler
pub mod static_assets;

use std::{any::Any, panic::AssertUnwindSafe, path::Path, sync::Arc};

use futures::FutureExt;
use tracing::{debug, error};

use crate::{
    app::{cors::apply_cors, items_api::ItemsApi, static_assets::StaticAssets},
    http::{
        request::{HttpError, Request},
        response::{Response, StatusCode, text_response},
    },
    items::store::ItemStore,
    runtime::handler::Handler,
};

/// Path of the items resource.
pub const ITEMS_PATH: &str = "/api/items";

/// Front door of the service, the handler passed to [`crate::runtime::server::serve`].
#[derive(Debug, Clone)]
pub struct Finder {
    items: ItemsApi,
    assets: StaticAssets,
}

impl Finder {
    /// Serves `store` at [`ITEMS_PATH`] and files below `static_root` everywhere else.
    #[must_use]
    pub fn new(store: Arc<ItemStore>, static_root: impl AsRef<Path>) -> Self {
        Self {
            items: ItemsApi::new(store),
            assets: StaticAssets::new(static_root),
        }
    }

    /// Whether `path` belongs to the items resource rather than the static client.
    #[must_use]
    pub fn is_items_path(path: &str) -> bool {
        path.strip_prefix(ITEMS_PATH)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
    }

    async fn route(&self, req: &Request, path: &str) -> Result<Response, HttpError> {
        if Self::is_items_path(path) {
            self.items.call(req).await
        } else {
            self.assets.call(req).await
        }
    }
}

impl Handler for Finder {
    async fn call(&self, req: &Request) -> Result<Response, HttpError> {
        let path = req.path();
        let mut response = recover(req.method(), &path, self.route(req, &path)).await;
        apply_cors(&mut response.headers);
        debug!(
            method = req.method(),
            path = %path,
            query = req.query(),
            status = response.status.as_u16(),
            "handled request"
        );
        Ok(response)
    }

    fn reject(&self, status: StatusCode, message: &str) -> Response {
        let mut response = text_response(status, message);
        apply_cors(&mut response.headers);
        response
    }
}

/// Awaits a handler, turning an error or a panic into a logged `500` response.
pub async fn recover<F>(method: &str, path: &str, handling: F) -> Response
where
    F: Future<Output = Result<Response, HttpError>>,
{
    match AssertUnwindSafe(handling).catch_unwind().await {
        Ok(Ok(response)) => response,
        Ok(Err(failure)) => {
            error!(error = ?failure, method, path, "request failed");
            text_response(StatusCode::InternalServerError, &format!("Server error: {failure}"))
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            error!(panic = %message, method, path, "handler panicked");
            text_response(StatusCode::InternalServerError, &format!("Server error: {message}"))
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(ToString::to_string)
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "handler panicked".to_string())
}
