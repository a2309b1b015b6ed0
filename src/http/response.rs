use std::fmt;

use serde::Serialize;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::http::{headers::Headers, request::HttpError};

/// Content type of plain text responses.
pub const TEXT_PLAIN: &str = "text/plain; charset=utf-8";
/// Content type of JSON responses.
pub const APPLICATION_JSON: &str = "application/json; charset=utf-8";

/// Representation of a HTTP response with status code, headers and body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// The status sent on the status line.
    pub status: StatusCode,
    /// Response headers, including `content-length` where a body is allowed.
    pub headers: Headers,
    /// The response body.
    pub body: Vec<u8>,
}

/// The status codes this server produces.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusCode {
    /// 200
    Ok = 200,
    /// 201
    Created = 201,
    /// 204
    NoContent = 204,
    /// 400
    BadRequest = 400,
    /// 404
    NotFound = 404,
    /// 405
    MethodNotAllowed = 405,
    /// 413
    PayloadTooLarge = 413,
    /// 500
    InternalServerError = 500,
    /// 501
    NotImplemented = 501,
    /// 504
    GatewayTimeout = 504,
}

/// Formats the status as its numeric code.
impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u16())
    }
}

impl StatusCode {
    /// The numeric status code.
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self as u16
    }

    /// The reason phrase written after the code on the status line.
    #[must_use]
    pub const fn reason_phrase(self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::Created => "Created",
            Self::NoContent => "No Content",
            Self::BadRequest => "Bad Request",
            Self::NotFound => "Not Found",
            Self::MethodNotAllowed => "Method Not Allowed",
            Self::PayloadTooLarge => "Payload Too Large",
            Self::InternalServerError => "Internal Server Error",
            Self::NotImplemented => "Not Implemented",
            Self::GatewayTimeout => "Gateway Timeout",
        }
    }

    /// Whether responses with this status must not carry a body.
    #[must_use]
    pub const fn forbids_body(self) -> bool {
        matches!(self, Self::NoContent)
    }
}

impl Response {
    /// Builds a response carrying `body` with the given content type.
    #[must_use]
    pub fn with_body(status: StatusCode, content_type: &str, body: Vec<u8>) -> Self {
        let mut headers = Headers::new();
        headers.insert("content-type", content_type);
        headers.insert("content-length", body.len().to_string());
        Self { status, headers, body }
    }

    /// Builds a response without body and without `content-length`.
    #[must_use]
    pub fn empty(status: StatusCode) -> Self {
        Self {
            status,
            headers: Headers::new(),
            body: Vec::new(),
        }
    }

    /// Drops the body while keeping the headers describing it, as a `HEAD` reply.
    #[must_use]
    pub fn without_body(mut self) -> Self {
        self.body.clear();
        self
    }
}

/// Plain text response in UTF-8.
#[must_use]
pub fn text_response(status: StatusCode, text: &str) -> Response {
    Response::with_body(status, TEXT_PLAIN, text.as_bytes().to_vec())
}

/// JSON response serializing `value`.
///
/// # Errors
///
/// Returns `HttpError::Serialization` if `value` cannot be represented as JSON.
pub fn json_response<T: Serialize + ?Sized>(status: StatusCode, value: &T) -> Result<Response, HttpError> {
    let body = serde_json::to_vec(value)?;
    Ok(Response::with_body(status, APPLICATION_JSON, body))
}

/// Write the status line to the passed writer.
///
/// Hardcodes HTTP/1.1 due to the limit of the Server to that version.
///
/// # Errors
///
/// Propagates write failures of the underlying writer.
pub async fn write_status_line<W: AsyncWrite + Unpin>(writer: &mut W, status_code: StatusCode) -> std::io::Result<()> {
    let line = format!("HTTP/1.1 {} {}\r\n", status_code, status_code.reason_phrase());
    writer.write_all(line.as_bytes()).await
}

/// Writes the headers to the passed writer, followed by the empty line separating them from the body.
///
/// # Errors
///
/// Propagates write failures of the underlying writer.
pub async fn write_headers<W: AsyncWrite + Unpin>(writer: &mut W, headers: &Headers) -> std::io::Result<()> {
    let mut block = String::new();
    for (key, value) in headers.iter() {
        block.push_str(key);
        block.push_str(": ");
        block.push_str(value);
        block.push_str("\r\n");
    }
    block.push_str("\r\n");
    writer.write_all(block.as_bytes()).await
}

/// Writes a complete response and flushes the writer.
///
/// # Errors
///
/// Propagates write failures of the underlying writer.
pub async fn write_response<W: AsyncWrite + Unpin>(writer: &mut W, response: &Response) -> std::io::Result<()> {
    write_status_line(writer, response.status).await?;
    write_headers(writer, &response.headers).await?;
    if !response.status.forbids_body() {
        writer.write_all(&response.body).await?;
    }
    writer.flush().await
}
