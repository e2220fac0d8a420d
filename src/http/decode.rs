use encoding_rs::{Encoding, UTF_8, WINDOWS_1254};

/// Legacy charset the results site uses when it declares none.
pub const LEGACY_ENCODING_LABEL: &str = "iso-8859-9";

/// Decode a response body. A declared non-UTF-8 charset is honoured;
/// otherwise UTF-8 is tried first and the legacy Turkish encoding is used
/// when the bytes are not valid UTF-8.
pub fn decode_body(bytes: &[u8], declared_charset: Option<&str>) -> (String, &'static str) {
    if let Some(encoding) = declared_charset.and_then(|label| Encoding::for_label(label.trim().as_bytes())) {
        if encoding != UTF_8 {
            let (text, _, _) = encoding.decode(bytes);
            return (text.into_owned(), encoding.name());
        }
    }

    match std::str::from_utf8(strip_bom(bytes)) {
        Ok(text) => (text.to_string(), UTF_8.name()),
        Err(_) => {
            let legacy = Encoding::for_label(LEGACY_ENCODING_LABEL.as_bytes()).unwrap_or(WINDOWS_1254);
            let (text, _, _) = legacy.decode(bytes);
            (text.into_owned(), legacy.name())
        }
    }
}

/// Charset parameter of a `Content-Type` header value, if any.
pub fn charset_of(content_type: &str) -> Option<&str> {
    content_type.split(';').skip(1).find_map(|param| {
        let (key, value) = param.split_once('=')?;
        key.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim().trim_matches('"'))
    })
}

fn strip_bom(bytes: &[u8]) -> &[u8] {
    bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes)
}
