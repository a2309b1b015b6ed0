use crate::http::{CRLF, next_line, request::HttpError};

/// Methods the parser accepts on the request line.
pub const VALID_METHODS: &[&str] = &["GET", "POST", "PATCH", "PUT", "DELETE", "HEAD", "OPTIONS", "CONNECT", "TRACE"];

/// A Http Request Line representation with method, target and http version
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RequestLine {
    /// The method of the parsed request
    pub method: String,
    /// The raw request target, path plus optional query
    pub request_target: String,
    /// The HTTP version used in the request, without the `HTTP/` prefix
    pub http_version: String,
}

/// Parses a passed string into a Request Line Struct
///
/// Returns `None` while the passed bytes do not yet contain the entire line,
/// together with the number of bytes consumed.
///
/// # Errors
///
/// Throws an `HttpError` if the parsed request line is invalid or not UTF-8.
pub fn parse_request_line<B>(request: B) -> Result<(Option<RequestLine>, usize), HttpError>
where
    B: AsRef<[u8]>,
{
    let Some(line) = next_line(request.as_ref()) else {
        return Ok((None, 0));
    };
    let first = std::str::from_utf8(line).map_err(|_| HttpError::MalformedRequestLine)?;

    let mut parts = first.split(' ');
    let (Some(method), Some(request_target), Some(version), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(HttpError::MalformedRequestLine);
    };

    if request_target.is_empty() {
        return Err(HttpError::MalformedRequestLine);
    }

    let http_version = version.strip_prefix("HTTP/").ok_or(HttpError::MalformedRequestLine)?;

    if !VALID_METHODS.contains(&method) {
        return Err(HttpError::InvalidMethod(method.to_string()));
    }

    let request_line = RequestLine {
        method: method.to_string(),
        request_target: request_target.to_string(),
        http_version: http_version.to_string(),
    };

    Ok((Some(request_line), line.len() + CRLF.len()))
}
