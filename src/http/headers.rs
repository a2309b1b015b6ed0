use std::collections::HashMap;

use crate::http::{CRLF, next_line, request::HttpError};

/// Header names that must not be repeated within one request.
const SINGLE_VALUE_HEADERS: [&str; 4] = ["host", "content-length", "transfer-encoding", "connection"];

/// Key / value pairs of a HTTP header block, keys stored lowercased.
///
/// Ordering is not preserved, HTTP does not require it for distinct names.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Headers(HashMap<String, String>);

impl Headers {
    /// Returns an empty header block
    #[must_use]
    pub fn new() -> Self {
        Self(HashMap::new())
    }

    /// Inserts an entry, replacing any previous value under the same name.
    ///
    /// # Examples
    /// ```
    /// let mut headers = finder::http::headers::Headers::new();
    /// headers.insert("Content-Type", "text/plain");
    /// assert_eq!(headers.get("content-type"), Some("text/plain"));
    /// ```
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into().to_ascii_lowercase(), value.into());
    }

    /// Retrieves the value of a header, matching the name case-insensitively.
    ///
    /// Returns None if the header is absent.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(&key.to_ascii_lowercase()).map(String::as_str)
    }

    /// Appends a value, joining it to an existing one with `, `.
    ///
    /// # Examples
    /// ```
    /// let mut headers = finder::http::headers::Headers::new();
    /// headers.insert("accept", "text/html");
    /// headers.append("accept", "application/json");
    /// assert_eq!(headers.get("accept"), Some("text/html, application/json"));
    /// ```
    pub fn append(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into().to_ascii_lowercase();
        let value = value.into();

        match self.0.get_mut(&key) {
            Some(existing) if !existing.is_empty() => {
                existing.push_str(", ");
                existing.push_str(&value);
            }
            Some(existing) => *existing = value,
            None => {
                self.0.insert(key, value);
            }
        }
    }

    /// Iterates over all name / value pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.0
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    /// Whether a header that must be unique was received more than once.
    #[must_use]
    pub fn duplicate_headers(&self) -> bool {
        SINGLE_VALUE_HEADERS
            .iter()
            .filter_map(|name| self.get(name))
            .any(|value| value.contains(", "))
    }

    /// Parses header lines from the start of `data`.
    ///
    /// Returns the number of bytes consumed and whether the empty line ending the
    /// header block was reached. Incomplete trailing lines are left unconsumed.
    ///
    /// # Errors
    ///
    /// Returns an `HttpError` if a complete header line is malformed.
    pub fn parse_header<B>(&mut self, data: B) -> Result<(usize, bool), HttpError>
    where
        B: AsRef<[u8]>,
    {
        let mut rest = data.as_ref();
        let mut consumed = 0;

        while let Some(line) = next_line(rest) {
            let line_size = line.len() + CRLF.len();
            consumed += line_size;
            if line.is_empty() {
                return Ok((consumed, true));
            }
            self.create_header_from_string(&String::from_utf8_lossy(line))?;
            rest = &rest[line_size..];
        }
        Ok((consumed, false))
    }

    fn create_header_from_string(&mut self, line: &str) -> Result<(), HttpError> {
        let (key, value) = line.trim().split_once(':').ok_or(HttpError::MalformedHeader)?;
        let value = value.trim();

        if key.is_empty() || !key.chars().all(is_valid_char) {
            return Err(HttpError::MalformedHeader);
        }

        if key.eq_ignore_ascii_case("host") && value.is_empty() {
            return Err(HttpError::InvalidHeaders);
        }

        self.append(key, value);
        Ok(())
    }
}

/// Whether `c` is a token character per <https://www.rfc-editor.org/rfc/rfc9110#section-5.6.2>
const fn is_valid_char(c: char) -> bool {
    c.is_ascii_alphanumeric()
        || matches!(
            c,
            '!' | '#' | '$' | '%' | '&' | '\'' | '*' | '+' | '-' | '.' | '^' | '_' | '`' | '|' | '~'
        )
}
