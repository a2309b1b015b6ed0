use std::sync::Arc;

use tracing::{debug, info};

use crate::{
    http::{
        form::FormData,
        request::{HttpError, Request},
        response::{Response, StatusCode, json_response, text_response},
    },
    items::{item::NewItem, store::ItemStore},
    runtime::handler::Handler,
};

/// Exposes the [`ItemStore`] at `/api/items`: `GET` lists, `POST` submits, `OPTIONS` answers preflights.
#[derive(Debug, Clone)]
pub struct ItemsApi {
    store: Arc<ItemStore>,
}

impl ItemsApi {
    /// Serves the given store.
    #[must_use]
    pub const fn new(store: Arc<ItemStore>) -> Self {
        Self { store }
    }

    fn list(&self) -> Result<Response, HttpError> {
        let items = self.store.list();
        debug!(count = items.len(), "listing items");
        json_response(StatusCode::Ok, &items)
    }

    fn create(&self, body: &[u8]) -> Result<Response, HttpError> {
        let form = FormData::from_bytes(body);
        let new_item = match NewItem::from_form(&form) {
            Ok(new_item) => new_item,
            Err(rejection) => {
                debug!(%rejection, "rejected submission");
                return Ok(text_response(StatusCode::BadRequest, &rejection.to_string()));
            }
        };
        let item = self.store.add(new_item);
        info!(id = item.id, title = %item.title, "item submitted");
        json_response(StatusCode::Created, &item)
    }
}

impl Handler for ItemsApi {
    async fn call(&self, req: &Request) -> Result<Response, HttpError> {
        match req.method() {
            "OPTIONS" => Ok(Response::empty(StatusCode::NoContent)),
            "GET" => self.list(),
            "POST" => self.create(&req.body),
            _ => Ok(text_response(StatusCode::MethodNotAllowed, "Method Not Allowed")),
        }
    }
}
