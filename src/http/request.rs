use percent_encoding::percent_decode_str;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::http::{
    CRLF,
    headers::Headers,
    next_line,
    request_line::{RequestLine, parse_request_line},
};

/// Largest request body the parser accepts, in bytes.
pub const MAX_BODY_SIZE: usize = 1024 * 1024;

/// Longest chunk-size or trailer line accepted in a chunked body.
const MAX_CHUNK_LINE: usize = 4096;

/// Representation of a HTTP request with request line, headers and body
///
/// Includes a parse state to keep track of the progress of the parsing
#[derive(Debug)]
pub struct Request {
    /// The state of the parser.
    parse_state: ParseState,
    /// The parsed request line.
    pub request_line: RequestLine,
    /// The request headers, keyed by lowercased name.
    pub headers: Headers,
    /// The request body (can be empty). Chunked bodies are stored decoded.
    pub body: Vec<u8>,
}

/// Represents the different stages of the parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParseState {
    /// The parser was initialized.
    Initialized,
    /// The parser is parsing headers.
    RequestStateParsingHeaders,
    /// The parser is parsing the body.
    ParseBody,
    /// The parser expects a chunk-size line.
    ParseChunkSize,
    /// The parser is reading chunk data, with this many bytes left before the chunk's CRLF.
    ParseChunkData(usize),
    /// The parser is skipping trailer lines after the last chunk.
    ParseTrailers,
    /// The parser finished parsing.
    Done,
}

/// Represents the kind of error that can occur while reading a request or producing a response
#[derive(Error, Debug)]
pub enum HttpError {
    /// The request contains an unsupported / invalid HTTP version
    #[error("unsupported HTTP version: {0}")]
    UnsupportedVersion(String),

    /// The request contains an unsupported / invalid HTTP method.
    #[error("unsupported HTTP method: {0}")]
    InvalidMethod(String),

    /// The request line does not follow the RFC standard.
    #[error("request line is malformed")]
    MalformedRequestLine,

    /// The header does not follow the RFC standard.
    #[error("header is malformed")]
    MalformedHeader,

    /// A header that must appear at most once was repeated, a required value is empty,
    /// or `Content-Length` and `Transfer-Encoding` were both sent.
    #[error("headers are invalid")]
    InvalidHeaders,

    /// The body uses a transfer coding other than `chunked`.
    #[error("unsupported transfer encoding: {0}")]
    UnsupportedTransferEncoding(String),

    /// The chunked body framing is broken.
    #[error("chunked body is malformed")]
    MalformedChunk,

    /// The parser unexpectedly reached an end of file.
    #[error("unexpected end of file")]
    UnexpectedEOF,

    /// The declared body is larger than [`MAX_BODY_SIZE`].
    #[error("body of {0} bytes exceeds the limit of {MAX_BODY_SIZE} bytes")]
    PayloadTooLarge(usize),

    /// There was a generic IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// There was an error parsing an integer to a string.
    #[error("Parsing error: {0}")]
    ParseError(#[from] std::num::ParseIntError),

    /// A response body could not be serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An internal invariant was violated.
    /// This is most likely used as a safety net to catch errors that logically should not be able to happen.
    #[error("Internal invariant violated")]
    InternalInvariantViolated,
}

/// Reads consecutive requests from one connection.
///
/// Bytes received beyond the end of a request stay buffered and start the next one,
/// so pipelined requests are answered in order.
#[derive(Debug)]
pub struct RequestReader<R> {
    reader: R,
    buffer: Vec<u8>,
}

impl<R: AsyncRead + Unpin> RequestReader<R> {
    /// Wraps a reader, usually the read half of a connection.
    pub const fn new(reader: R) -> Self {
        Self {
            reader,
            buffer: Vec::new(),
        }
    }

    /// Parses the next request.
    ///
    /// # Errors
    ///
    /// Returns `HttpError::UnexpectedEOF` if the peer closes before a request is complete,
    /// or another `HttpError` if the request is not valid.
    pub async fn next_request(&mut self) -> Result<Request, HttpError> {
        let mut temp = [0u8; 1024];
        let mut request = Request {
            parse_state: ParseState::Initialized,
            request_line: RequestLine::default(),
            headers: Headers::new(),
            body: Vec::new(),
        };

        loop {
            let state = request.parse_state;
            let parsed = request.parse(&self.buffer)?;
            self.buffer.drain(..parsed);

            if request.parse_state == ParseState::Done {
                return Ok(request);
            }
            if parsed > 0 || request.parse_state != state {
                continue;
            }

            let read = self.reader.read(&mut temp).await?;
            if read == 0 {
                return Err(HttpError::UnexpectedEOF);
            }
            self.buffer.extend_from_slice(&temp[..read]);
        }
    }
}

/// Parses the contents of a reader to a Request
///
/// The reader may be of any type that implements `AsyncRead`. Bytes following the
/// request are discarded, use [`RequestReader`] to read several requests.
///
/// # Errors
///
/// Throws a `HttpError` if the request was not valid.
///
/// This is related to the parsed data from the buffer containing RFC-incompatible formatting.
pub async fn request_from_reader<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Request, HttpError> {
    RequestReader::new(reader).next_request().await
}

impl Request {
    /// The request method, e.g. `GET`.
    #[must_use]
    pub fn method(&self) -> &str {
        &self.request_line.method
    }

    /// The percent-decoded path of the request target, without the query string.
    #[must_use]
    pub fn path(&self) -> String {
        let target = self.request_line.request_target.as_str();
        let raw = target.split_once('?').map_or(target, |(path, _)| path);
        percent_decode_str(raw).decode_utf8_lossy().into_owned()
    }

    /// The raw query string, if the target carried one.
    #[must_use]
    pub fn query(&self) -> Option<&str> {
        self.request_line
            .request_target
            .split_once('?')
            .map(|(_, query)| query)
    }

    /// Whether the client asked to close the connection after this request.
    #[must_use]
    pub fn wants_close(&self) -> bool {
        self.headers
            .get("connection")
            .is_some_and(|value| value.eq_ignore_ascii_case("close"))
    }

    /// Parses passed byte data.
    ///
    /// Returns the size of the parsed data. Returning 0 without a state change means
    /// more input is needed.
    ///
    /// # Errors
    ///
    /// Throws an `HttpError` if the parsing fails.
    fn parse(&mut self, data: &[u8]) -> Result<usize, HttpError> {
        match self.parse_state {
            ParseState::Initialized => {
                let (request_line_result, request_line_size) = parse_request_line(data)?;
                if let Some(request_line) = request_line_result {
                    if request_line.http_version != "1.1" {
                        return Err(HttpError::UnsupportedVersion(request_line.http_version));
                    }
                    self.parse_state = ParseState::RequestStateParsingHeaders;
                    self.request_line = request_line;
                }
                Ok(request_line_size)
            }
            ParseState::RequestStateParsingHeaders => {
                let (header_size, done) = self.headers.parse_header(data)?;
                if done {
                    if self.headers.duplicate_headers() {
                        return Err(HttpError::InvalidHeaders);
                    }
                    self.parse_state = ParseState::ParseBody;
                }
                Ok(header_size)
            }
            ParseState::ParseBody => {
                if let Some(encoding) = self.headers.get("transfer-encoding") {
                    if self.headers.get("content-length").is_some() {
                        return Err(HttpError::InvalidHeaders);
                    }
                    if !encoding.trim().eq_ignore_ascii_case("chunked") {
                        return Err(HttpError::UnsupportedTransferEncoding(encoding.to_string()));
                    }
                    self.parse_state = ParseState::ParseChunkSize;
                    return Ok(0);
                }

                let Some(content) = self.headers.get("content-length") else {
                    self.parse_state = ParseState::Done;
                    return Ok(0);
                };

                let content_length: usize = content.trim().parse()?;
                if content_length > MAX_BODY_SIZE {
                    return Err(HttpError::PayloadTooLarge(content_length));
                }

                let remaining = content_length.saturating_sub(self.body.len());
                let take = remaining.min(data.len());
                self.body.extend_from_slice(&data[..take]);

                if self.body.len() == content_length {
                    self.parse_state = ParseState::Done;
                }
                Ok(take)
            }
            ParseState::ParseChunkSize => {
                let Some(line) = chunk_line(data)? else {
                    return Ok(0);
                };
                let size = parse_chunk_size(line)?;
                let total = self.body.len().saturating_add(size);
                if total > MAX_BODY_SIZE {
                    return Err(HttpError::PayloadTooLarge(total));
                }

                self.parse_state = if size == 0 {
                    ParseState::ParseTrailers
                } else {
                    ParseState::ParseChunkData(size)
                };
                Ok(line.len() + CRLF.len())
            }
            ParseState::ParseChunkData(0) => {
                if data.len() < CRLF.len() {
                    return Ok(0);
                }
                if !data.starts_with(CRLF) {
                    return Err(HttpError::MalformedChunk);
                }
                self.parse_state = ParseState::ParseChunkSize;
                Ok(CRLF.len())
            }
            ParseState::ParseChunkData(remaining) => {
                let take = remaining.min(data.len());
                self.body.extend_from_slice(&data[..take]);
                self.parse_state = ParseState::ParseChunkData(remaining - take);
                Ok(take)
            }
            ParseState::ParseTrailers => {
                let Some(line) = chunk_line(data)? else {
                    return Ok(0);
                };
                if line.is_empty() {
                    self.parse_state = ParseState::Done;
                }
                Ok(line.len() + CRLF.len())
            }
            ParseState::Done => Ok(0),
        }
    }
}

/// The next complete line of a chunked body, `None` while it is still arriving.
fn chunk_line(data: &[u8]) -> Result<Option<&[u8]>, HttpError> {
    match next_line(data) {
        Some(line) if line.len() > MAX_CHUNK_LINE => Err(HttpError::MalformedChunk),
        Some(line) => Ok(Some(line)),
        None if data.len() > MAX_CHUNK_LINE => Err(HttpError::MalformedChunk),
        None => Ok(None),
    }
}

/// Hex chunk size, ignoring chunk extensions after `;`.
fn parse_chunk_size(line: &[u8]) -> Result<usize, HttpError> {
    let line = std::str::from_utf8(line).map_err(|_| HttpError::MalformedChunk)?;
    let size = line.split_once(';').map_or(line, |(size, _)| size).trim();
    if size.is_empty() || !size.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(HttpError::MalformedChunk);
    }
    usize::from_str_radix(size, 16).map_err(|_| HttpError::PayloadTooLarge(usize::MAX))
}
