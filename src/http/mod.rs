/// Module containing logic to decode url-encoded form bodies
pub mod form;
/// Module containing logic to parse HTTP headers
pub mod headers;
/// Module containing logic to parse HTTP request lines
pub mod request_line;
/// Module containing logic to parse requests
pub mod request;
/// Module formatting the response.
pub mod response;

/// Line terminator of the request line, header lines and chunk framing.
pub(crate) const CRLF: &[u8] = b"\r\n";

/// Returns the first CRLF-terminated line of `data` without its terminator.
///
/// Lengths are in raw bytes, so callers consume `line.len() + CRLF.len()`.
pub(crate) fn next_line(data: &[u8]) -> Option<&[u8]> {
    data.windows(CRLF.len())
        .position(|window| window == CRLF)
        .map(|end| &data[..end])
}
