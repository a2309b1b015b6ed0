use crate::http::{
    request::{HttpError, Request},
    response::{Response, StatusCode, text_response},
};

/// A trait that determines the handling of requests for a server.
pub trait Handler: Send + Sync {
    /// Produces the response for a given request.
    ///
    /// # Errors
    /// Returns an `HttpError` if processing the request fails.
    fn call(&self, req: &Request) -> impl Future<Output = Result<Response, HttpError>> + Send;

    /// Builds the response the server sends when a request cannot be read at all.
    ///
    /// Handlers override this to decorate protocol-level failures the same way as their own responses.
    fn reject(&self, status: StatusCode, message: &str) -> Response {
        text_response(status, message)
    }
}
