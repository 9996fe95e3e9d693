//! Attribute helpers shared by the XLSX part parsers.
//!
//! Keys are matched on the full (possibly prefixed) name; values are
//! entity-unescaped.

use quick_xml::events::BytesStart;

/// String attribute by key, `None` when missing or not valid UTF-8.
pub fn attr_string(e: &BytesStart, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|attr| attr.key.as_ref() == key)
        .and_then(|attr| attr.unescape_value().ok().map(|v| v.into_owned()))
}

pub fn attr_u32(e: &BytesStart, key: &[u8]) -> Option<u32> {
    attr_string(e, key).and_then(|s| s.parse().ok())
}

pub fn attr_f64(e: &BytesStart, key: &[u8]) -> Option<f64> {
    attr_string(e, key).and_then(|s| s.parse().ok())
}

/// `"1"` and `"true"` are true; any other present value is false.
pub fn attr_bool(e: &BytesStart, key: &[u8]) -> Option<bool> {
    attr_string(e, key).map(|s| matches!(s.as_str(), "1" | "true"))
}

/// Local element name as an owned string (empty if not UTF-8).
#[inline]
pub fn local_name_string(e: &BytesStart) -> String {
    let bytes = e.local_name();
    std::str::from_utf8(bytes.as_ref())
        .unwrap_or("")
        .to_string()
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic
)]
mod tests {
    use super::*;

    fn make_start(xml: &str) -> BytesStart<'_> {
        let content = xml
            .trim_start_matches('<')
            .trim_end_matches('>')
            .trim_end_matches('/')
            .trim_end();
        BytesStart::from_content(content, content.find(' ').unwrap_or(content.len()))
    }

    #[test]
    fn test_attr_string() {
        let e = make_start(r#"<sheet name="Q&amp;A" r:id="rId2" />"#);
        assert_eq!(attr_string(&e, b"name"), Some("Q&A".to_string()));
        assert_eq!(attr_string(&e, b"r:id"), Some("rId2".to_string()));
        assert_eq!(attr_string(&e, b"missing"), None);
    }

    #[test]
    fn test_numeric_attrs() {
        let e = make_start(r#"<row r="42" ht="20.5" />"#);
        assert_eq!(attr_u32(&e, b"r"), Some(42));
        let ht = attr_f64(&e, b"ht").unwrap();
        assert!((ht - 20.5).abs() < f64::EPSILON);
        assert_eq!(attr_u32(&e, b"ht"), None);
    }

    #[test]
    fn test_attr_bool() {
        let e = make_start(r#"<row a="1" b="0" c="true" d="false" />"#);
        assert_eq!(attr_bool(&e, b"a"), Some(true));
        assert_eq!(attr_bool(&e, b"b"), Some(false));
        assert_eq!(attr_bool(&e, b"c"), Some(true));
        assert_eq!(attr_bool(&e, b"d"), Some(false));
        assert_eq!(attr_bool(&e, b"missing"), None);
    }

    #[test]
    fn test_local_name() {
        let e = make_start(r#"<x:c r="A1" />"#);
        assert_eq!(local_name_string(&e), "c");
    }
}
