use chardetng::EncodingDetector;
use encoding_rs::Encoding;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedHtml {
    pub html: String,
    pub encoding_label: String,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("body is not valid {encoding}")]
    Malformed { encoding: String },
}

/// Decode the page body to UTF-8. Replacement characters are never
/// inserted: a body that does not fit its encoding is an error.
pub fn decode_html(bytes: &[u8], content_type: Option<&str>) -> Result<DecodedHtml, DecodeError> {
    let (encoding, body) = sniff_encoding(bytes, content_type);
    let html = encoding
        .decode_without_bom_handling_and_without_replacement(body)
        .ok_or_else(|| DecodeError::Malformed {
            encoding: encoding.name().to_string(),
        })?;
    Ok(DecodedHtml {
        html: html.into_owned(),
        encoding_label: encoding.name().to_string(),
    })
}

/// A byte order mark wins (and is stripped), then the declared charset,
/// then chardetng's guess over the whole body.
fn sniff_encoding<'b>(bytes: &'b [u8], content_type: Option<&str>) -> (&'static Encoding, &'b [u8]) {
    if let Some((encoding, bom_len)) = Encoding::for_bom(bytes) {
        return (encoding, &bytes[bom_len..]);
    }
    let declared = content_type
        .and_then(charset_label)
        .and_then(|label| Encoding::for_label(label.as_bytes()));
    let encoding = declared.unwrap_or_else(|| {
        let mut detector = EncodingDetector::new();
        detector.feed(bytes, true);
        detector.guess(None, true)
    });
    (encoding, bytes)
}

fn charset_label(content_type: &str) -> Option<&str> {
    content_type.split(';').skip(1).find_map(|param| {
        let (key, value) = param.split_once('=')?;
        key.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim().trim_matches(['"', '\'']))
    })
}

#[cfg(test)]
mod tests {
    use super::{charset_label, decode_html, DecodeError};

    #[test]
    fn charset_parameter_is_case_insensitive_and_unquoted() {
        assert_eq!(
            charset_label("text/html; Charset=\"windows-1251\""),
            Some("windows-1251")
        );
        assert_eq!(charset_label("text/html"), None);
    }

    #[test]
    fn cyrillic_page_decodes_from_header_charset() {
        // "Город" in windows-1251.
        let bytes = [0xC3, 0xEE, 0xF0, 0xEE, 0xE4];
        let decoded = decode_html(&bytes, Some("text/html; charset=windows-1251")).unwrap();
        assert_eq!(decoded.html, "Город");
        assert_eq!(decoded.encoding_label, "windows-1251");
    }

    #[test]
    fn bom_overrides_header_and_is_stripped() {
        let bytes = b"\xEF\xBB\xBF<td>ok</td>";
        let decoded = decode_html(bytes, Some("text/html; charset=windows-1251")).unwrap();
        assert_eq!(decoded.html, "<td>ok</td>");
        assert_eq!(decoded.encoding_label, "UTF-8");
    }

    #[test]
    fn invalid_utf8_is_rejected() {
        let err = decode_html(b"ok\xff", Some("text/html; charset=utf-8")).unwrap_err();
        assert_eq!(
            err,
            DecodeError::Malformed {
                encoding: "UTF-8".to_string()
            }
        );
    }
}
