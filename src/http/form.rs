use std::collections::HashMap;

use percent_encoding::percent_decode_str;

/// Decoded fields of an `application/x-www-form-urlencoded` body.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FormData(HashMap<String, String>);

impl FormData {
    /// Decodes a form body.
    ///
    /// Pairs are separated by `&`, key and value by the first `=`. A pair without `=`
    /// has an empty value and a repeated key keeps its last value. Malformed escapes are
    /// kept literally and invalid UTF-8 is replaced, decoding never fails.
    ///
    /// # Examples
    /// ```
    /// let form = finder::http::form::FormData::parse("title=Black+wallet&place=Caf%C3%A9");
    /// assert_eq!(form.get("title"), Some("Black wallet"));
    /// assert_eq!(form.get("place"), Some("Café"));
    /// ```
    #[must_use]
    pub fn parse(body: &str) -> Self {
        let fields = body
            .split('&')
            .filter(|pair| !pair.is_empty())
            .map(|pair| {
                let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
                (decode_component(key), decode_component(value))
            })
            .collect();
        Self(fields)
    }

    /// Decodes a raw body, replacing invalid UTF-8.
    #[must_use]
    pub fn from_bytes(body: &[u8]) -> Self {
        Self::parse(&String::from_utf8_lossy(body))
    }

    /// Value of a field, if present.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }
}

fn decode_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    percent_decode_str(&spaced).decode_utf8_lossy().into_owned()
}
