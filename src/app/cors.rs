use crate::http::headers::Headers;

/// Headers permitting cross-origin browser access, sent on every response.
pub const CORS_HEADERS: [(&str, &str); 3] = [
    ("access-control-allow-origin", "*"),
    ("access-control-allow-methods", "GET,POST,OPTIONS"),
    ("access-control-allow-headers", "Content-Type"),
];

/// Adds the CORS headers, replacing values a handler may have set.
pub fn apply_cors(headers: &mut Headers) {
    for (name, value) in CORS_HEADERS {
        headers.insert(name, value);
    }
}

#[cfg(test)]
mod tests {
    use crate::{app::cors::apply_cors, http::headers::Headers};

    #[test]
    fn all_three_headers_are_added() {
        let mut headers = Headers::new();
        headers.insert("content-type", "text/plain");

        apply_cors(&mut headers);

        assert_eq!(headers.get("Access-Control-Allow-Origin"), Some("*"));
        assert_eq!(headers.get("Access-Control-Allow-Methods"), Some("GET,POST,OPTIONS"));
        assert_eq!(headers.get("Access-Control-Allow-Headers"), Some("Content-Type"));
        assert_eq!(headers.iter().count(), 4);
    }
}
