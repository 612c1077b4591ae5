//! Charsets, input decoding and output transcoding.
//!
//! Input side: BOM sniffing and XML declaration encoding detection per
//! XML 1.0 Section 4.3.3 and Appendix F, bridging to `encoding_rs`.
//!
//! Output side: the [`Transcoder`] converts between two charsets and never
//! fails, degrading unrepresentable characters to numeric character
//! references and undecodable bytes to `?`. The [`Encoder`] builds on it to
//! serialize text and markup while tracking the narrowest charset that
//! would have produced the same bytes.
//!
//! # Encoding Detection Strategy
//!
//! 1. Check for a Byte Order Mark (BOM) at the start of the input.
//! 2. If a BOM is found, use the indicated encoding and skip the BOM bytes.
//! 3. If no BOM is found, default to UTF-8.
//! 4. After initial decoding, inspect the XML declaration's `encoding=` attribute
//!    to confirm or override the detected encoding.

mod encoder;
pub mod reference;
mod transcode;

pub use encoder::Encoder;
pub use transcode::Transcoder;

use std::fmt;

use crate::error::{Error, Result};

/// A charset the engine can decode from and encode to.
///
/// `encoding_rs` covers the WHATWG encodings but has no plain US-ASCII and
/// only decodes UTF-16, so those are handled natively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Charset {
    /// 7-bit US-ASCII.
    Ascii,
    /// UTF-16, big endian, no BOM.
    Utf16Be,
    /// UTF-16, little endian, no BOM.
    Utf16Le,
    /// Any other `encoding_rs` encoding.
    Encoding(&'static encoding_rs::Encoding),
}

impl Charset {
    /// UTF-8.
    #[must_use]
    pub fn utf8() -> Self {
        Self::Encoding(encoding_rs::UTF_8)
    }

    /// Resolves a charset label (case-insensitive).
    ///
    /// `us-ascii` and its aliases map to [`Charset::Ascii`]; bare `utf-16`
    /// maps to little endian.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedCharset`] for unknown labels and for the
    /// WHATWG `replacement` pseudo-encoding.
    ///
    /// # Examples
    ///
    /// ```
    /// use tagmend::encoding::Charset;
    ///
    /// assert_eq!(Charset::for_label("ASCII").unwrap(), Charset::Ascii);
    /// assert_eq!(Charset::for_label("utf8").unwrap().name(), "UTF-8");
    /// assert!(Charset::for_label("no-such-charset").is_err());
    /// ```
    pub fn for_label(label: &str) -> Result<Self> {
        let trimmed = label.trim();
        let lower = trimmed.to_ascii_lowercase();
        match lower.as_str() {
            "us-ascii" | "ascii" | "ansi_x3.4-1968" | "iso646-us" | "us" | "cp367" => {
                return Ok(Self::Ascii)
            }
            "utf-16be" => return Ok(Self::Utf16Be),
            "utf-16" | "utf-16le" => return Ok(Self::Utf16Le),
            _ => {}
        }
        match encoding_rs::Encoding::for_label(trimmed.as_bytes()) {
            Some(enc) if enc == encoding_rs::REPLACEMENT => Err(unsupported(label)),
            Some(enc) if enc == encoding_rs::UTF_16BE => Ok(Self::Utf16Be),
            Some(enc) if enc == encoding_rs::UTF_16LE => Ok(Self::Utf16Le),
            Some(enc) => Ok(Self::Encoding(enc)),
            None => Err(unsupported(label)),
        }
    }

    /// The canonical name, suitable for an XML declaration.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Ascii => "US-ASCII",
            Self::Utf16Be => "UTF-16BE",
            Self::Utf16Le => "UTF-16LE",
            Self::Encoding(enc) => enc.name(),
        }
    }

    /// Returns `true` for UTF-8.
    #[must_use]
    pub fn is_utf8(self) -> bool {
        self == Self::utf8()
    }

    /// Returns `true` if the charset can represent `c`.
    #[must_use]
    pub fn can_encode(self, c: char) -> bool {
        match self {
            Self::Ascii => c.is_ascii(),
            Self::Utf16Be | Self::Utf16Le => true,
            Self::Encoding(enc) if enc == encoding_rs::UTF_8 => true,
            Self::Encoding(enc) => {
                let mut buf = [0u8; 4];
                let (_, _, unmappable) = enc.encode(c.encode_utf8(&mut buf));
                !unmappable
            }
        }
    }

    /// The `encoding_rs` decoder backing this charset, if any.
    fn decoding(self) -> Option<&'static encoding_rs::Encoding> {
        match self {
            Self::Ascii => None,
            Self::Utf16Be => Some(encoding_rs::UTF_16BE),
            Self::Utf16Le => Some(encoding_rs::UTF_16LE),
            Self::Encoding(enc) => Some(enc),
        }
    }
}

impl fmt::Display for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn unsupported(label: &str) -> Error {
    Error::UnsupportedCharset {
        label: label.to_string(),
    }
}

/// Detects the encoding of a byte stream by inspecting the Byte Order Mark.
///
/// Returns a tuple of (encoding name, number of BOM bytes to skip).
///
/// Per XML 1.0 Appendix F, the BOM detection order is:
/// - `EF BB BF` -> UTF-8
/// - `FE FF`    -> UTF-16 BE
/// - `FF FE`    -> UTF-16 LE
/// - No BOM     -> UTF-8
///
/// # Examples
///
/// ```
/// use tagmend::encoding::detect_encoding;
///
/// let (enc, skip) = detect_encoding(b"\xEF\xBB\xBFhello");
/// assert_eq!(enc, "UTF-8");
/// assert_eq!(skip, 3);
///
/// let (enc, skip) = detect_encoding(b"<p>");
/// assert_eq!(enc, "UTF-8");
/// assert_eq!(skip, 0);
/// ```
#[must_use]
pub fn detect_encoding(bytes: &[u8]) -> (&'static str, usize) {
    if bytes.starts_with(&[0xEF, 0xBB, 0xBF]) {
        ("UTF-8", 3)
    } else if bytes.starts_with(&[0xFE, 0xFF]) {
        ("UTF-16BE", 2)
    } else if bytes.starts_with(&[0xFF, 0xFE]) {
        ("UTF-16LE", 2)
    } else {
        ("UTF-8", 0)
    }
}

/// Strictly decodes `bytes` in the charset named by `label`.
///
/// # Errors
///
/// Returns [`Error::UnsupportedCharset`] for unknown labels and
/// [`Error::UndecodableInput`] if the bytes are malformed.
pub fn decode_strict(bytes: &[u8], label: &str) -> Result<String> {
    let charset = Charset::for_label(label)?;
    let undecodable = || Error::UndecodableInput {
        charset: charset.name().to_string(),
    };
    match charset.decoding() {
        None => {
            if bytes.is_ascii() {
                Ok(bytes.iter().map(|&b| char::from(b)).collect())
            } else {
                Err(undecodable())
            }
        }
        Some(enc) => enc
            .decode_without_bom_handling_and_without_replacement(bytes)
            .map(std::borrow::Cow::into_owned)
            .ok_or_else(undecodable),
    }
}

/// Decodes `bytes` in `charset`, degrading malformed sequences to `?`.
///
/// This never fails; it runs the same isolating fallback as the output
/// [`Transcoder`].
///
/// # Examples
///
/// ```
/// use tagmend::encoding::{decode_lossy, Charset};
///
/// assert_eq!(decode_lossy(b"caf\xC3\xA9", Charset::utf8()), "caf\u{e9}");
/// assert_eq!(decode_lossy(b"a\xFFb", Charset::utf8()), "a?b");
/// ```
#[must_use]
pub fn decode_lossy(bytes: &[u8], charset: Charset) -> String {
    let mut transcoder = Transcoder::new(charset, Charset::utf8());
    let mut text = transcoder.decode(bytes, false);
    text.push_str(&transcoder.decode(&[], true));
    text
}

/// Extracts the `encoding` attribute value from an XML declaration.
///
/// Performs a lightweight scan of the declaration without running the
/// tokenizer. Returns `None` if there is no declaration or no encoding.
fn extract_xml_decl_encoding(text: &str) -> Option<String> {
    let decl_end = text.find("?>")?;
    let decl = &text[..decl_end];
    if !decl.starts_with("<?xml") {
        return None;
    }
    quoted_after(decl.as_bytes(), b"encoding")
}

/// Extracts the `encoding` attribute from raw bytes treated as ASCII.
///
/// Used when the input is not valid UTF-8 and has no BOM. The declaration
/// must be ASCII-compatible, so the bytes are scanned directly.
fn extract_encoding_from_ascii_bytes(bytes: &[u8]) -> Option<String> {
    let scan = &bytes[..bytes.len().min(200)];
    if !scan.starts_with(b"<?xml") {
        return None;
    }
    let decl_end = scan.windows(2).position(|w| w == b"?>")?;
    quoted_after(&scan[..decl_end], b"encoding")
}

/// Scans HTML bytes for a `<meta ... charset=...>` declaration.
fn extract_meta_charset(bytes: &[u8]) -> Option<String> {
    let scan = &bytes[..bytes.len().min(1024)];
    let lower: Vec<u8> = scan.iter().map(u8::to_ascii_lowercase).collect();
    let mut from = 0;
    while let Some(pos) = find(&lower[from..], b"<meta") {
        let start = from + pos;
        let end = start + find(&lower[start..], b">").unwrap_or(lower.len() - start);
        let tag = &lower[start..end];
        if let Some(cs) = find(tag, b"charset=") {
            let value = skip_ascii_whitespace(&tag[cs + b"charset=".len()..]);
            let value = value.strip_prefix(b"\"").or_else(|| value.strip_prefix(b"'")).unwrap_or(value);
            let len = value
                .iter()
                .take_while(|&&b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.' | b':'))
                .count();
            if len > 0 {
                return Some(String::from_utf8_lossy(&value[..len]).into_owned());
            }
        }
        from = end;
    }
    None
}

fn quoted_after(decl: &[u8], needle: &[u8]) -> Option<String> {
    let pos = find(decl, needle)?;
    let after = skip_ascii_whitespace(&decl[pos + needle.len()..]);
    let after = skip_ascii_whitespace(after.strip_prefix(b"=")?);
    let quote = *after.first()?;
    if quote != b'"' && quote != b'\'' {
        return None;
    }
    let value = &after[1..];
    let end = value.iter().position(|&b| b == quote)?;
    let value = &value[..end];
    value
        .is_ascii()
        .then(|| String::from_utf8_lossy(value).into_owned())
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Skips leading ASCII whitespace bytes (space, tab, CR, LF).
fn skip_ascii_whitespace(bytes: &[u8]) -> &[u8] {
    let skip = bytes
        .iter()
        .take_while(|&&b| matches!(b, b' ' | b'\t' | b'\r' | b'\n'))
        .count();
    &bytes[skip..]
}

/// Returns `true` if the label is a recognized alias for UTF-8.
fn is_utf8_label(label: &str) -> bool {
    label.eq_ignore_ascii_case("UTF-8") || label.eq_ignore_ascii_case("UTF8")
}

/// Sniffs the charset of a raw document.
///
/// Order: BOM, XML declaration, HTML `<meta charset>`, then UTF-8.
#[must_use]
pub fn sniff_charset(bytes: &[u8]) -> (Charset, usize) {
    let (bom, skip) = detect_encoding(bytes);
    let content = &bytes[skip..];
    let declared = if bom == "UTF-8" {
        extract_encoding_from_ascii_bytes(content).or_else(|| extract_meta_charset(content))
    } else {
        None
    };
    let label = declared.as_deref().unwrap_or(bom);
    let charset = Charset::for_label(label)
        .or_else(|_| Charset::for_label(bom))
        .unwrap_or_else(|_| Charset::utf8());
    (charset, skip)
}

/// Decodes raw bytes into a UTF-8 string, automatically detecting the encoding.
///
/// 1. Detect the BOM and determine the initial encoding.
/// 2. If the encoding is UTF-8, validate and return the bytes as a string.
/// 3. If non-UTF-8, transcode using `encoding_rs`.
/// 4. After the initial decode, check the XML declaration's `encoding=` attribute.
///    If it names a different encoding than the BOM, re-decode the original
///    bytes using the declared encoding.
///
/// # Errors
///
/// Returns [`Error::UndecodableInput`] if the bytes contain invalid sequences
/// for the detected encoding, or [`Error::UnsupportedCharset`] if the declared
/// encoding is unknown.
///
/// # Examples
///
/// ```
/// use tagmend::encoding::decode_to_utf8;
///
/// let xml = b"<?xml version=\"1.0\"?><root/>";
/// let result = decode_to_utf8(xml).unwrap();
/// assert!(result.contains("<root/>"));
/// ```
pub fn decode_to_utf8(bytes: &[u8]) -> Result<String> {
    let (bom_encoding, bom_skip) = detect_encoding(bytes);
    let content = &bytes[bom_skip..];

    if bom_encoding == "UTF-8" {
        if let Ok(s) = std::str::from_utf8(content) {
            if let Some(declared) = extract_xml_decl_encoding(s) {
                if !is_utf8_label(&declared) {
                    return decode_strict(content, &declared);
                }
            }
            return Ok(s.to_string());
        }
        if let Some(declared) = extract_encoding_from_ascii_bytes(content) {
            return decode_strict(content, &declared);
        }
        return Err(Error::UndecodableInput {
            charset: "UTF-8".to_string(),
        });
    }

    let initial = decode_strict(content, bom_encoding)?;
    if let Some(declared) = extract_xml_decl_encoding(&initial) {
        let declared_upper = declared.to_ascii_uppercase();
        let effectively_same = declared_upper == bom_encoding
            || (declared_upper == "UTF-16" && bom_encoding.starts_with("UTF-16"));
        if !effectively_same {
            return decode_strict(content, &declared);
        }
    }
    Ok(initial)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_utf8_bom() {
        let (encoding, skip) = detect_encoding(b"\xEF\xBB\xBF<p>");
        assert_eq!(encoding, "UTF-8");
        assert_eq!(skip, 3);
    }

    #[test]
    fn test_detect_utf16le_bom() {
        let (encoding, skip) = detect_encoding(b"\xFF\xFE<\x00p\x00");
        assert_eq!(encoding, "UTF-16LE");
        assert_eq!(skip, 2);
    }

    #[test]
    fn test_detect_utf16be_bom() {
        let (encoding, skip) = detect_encoding(b"\xFE\xFF\x00<\x00p");
        assert_eq!(encoding, "UTF-16BE");
        assert_eq!(skip, 2);
    }

    #[test]
    fn test_detect_empty_input() {
        assert_eq!(detect_encoding(b""), ("UTF-8", 0));
        assert_eq!(detect_encoding(b"\xEF"), ("UTF-8", 0));
    }

    #[test]
    fn test_charset_labels() {
        assert_eq!(Charset::for_label("us-ascii").unwrap(), Charset::Ascii);
        assert_eq!(Charset::for_label("UTF-16").unwrap(), Charset::Utf16Le);
        assert_eq!(Charset::for_label(" Shift_JIS ").unwrap().name(), "Shift_JIS");
        assert!(matches!(
            Charset::for_label("iso-2022-kr"),
            Err(Error::UnsupportedCharset { .. })
        ));
    }

    #[test]
    fn test_can_encode() {
        assert!(Charset::Ascii.can_encode('a'));
        assert!(!Charset::Ascii.can_encode('\u{e9}'));
        let latin1 = Charset::for_label("iso-8859-1").unwrap();
        assert!(latin1.can_encode('\u{e9}'));
        assert!(!latin1.can_encode('\u{3042}'));
        assert!(Charset::utf8().can_encode('\u{1F600}'));
    }

    #[test]
    fn test_decode_utf8_with_bom() {
        let result = decode_to_utf8(b"\xEF\xBB\xBF<?xml version=\"1.0\"?><root/>").unwrap();
        assert_eq!(result, "<?xml version=\"1.0\"?><root/>");
    }

    #[test]
    fn test_decode_latin1_declared() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"<?xml version=\"1.0\" encoding=\"ISO-8859-1\"?>");
        bytes.extend_from_slice(b"<root>caf\xE9</root>");
        let result = decode_to_utf8(&bytes).unwrap();
        assert!(result.contains("caf\u{e9}"));
    }

    #[test]
    fn test_decode_invalid_utf8() {
        assert!(matches!(
            decode_to_utf8(&[0x80, 0x81, 0x82]),
            Err(Error::UndecodableInput { .. })
        ));
    }

    #[test]
    fn test_decode_strict_ascii() {
        assert_eq!(decode_strict(b"abc", "ascii").unwrap(), "abc");
        assert!(decode_strict(b"ab\xE9", "ascii").is_err());
    }

    #[test]
    fn test_extract_xml_decl_encoding() {
        let text = "<?xml version='1.0' encoding='UTF-8'?><root/>";
        assert_eq!(extract_xml_decl_encoding(text), Some("UTF-8".to_string()));
        assert_eq!(extract_xml_decl_encoding("<?xml version=\"1.0\"?>"), None);
        assert_eq!(extract_xml_decl_encoding("<root/>"), None);
    }

    #[test]
    fn test_sniff_meta_charset() {
        let html = b"<html><head><META http-equiv=\"Content-Type\" content=\"text/html; charset=Shift_JIS\"></head>";
        let (charset, skip) = sniff_charset(html);
        assert_eq!(charset.name(), "Shift_JIS");
        assert_eq!(skip, 0);
        let (charset, _) = sniff_charset(b"<meta charset='euc-jp'>");
        assert_eq!(charset.name(), "EUC-JP");
    }

    #[test]
    fn test_sniff_defaults_to_utf8() {
        let (charset, _) = sniff_charset(b"<p>plain</p>");
        assert!(charset.is_utf8());
    }

    #[test]
    fn test_decode_lossy_replaces_bad_bytes() {
        assert_eq!(decode_lossy(b"ok", Charset::Ascii), "ok");
        assert_eq!(decode_lossy(b"a\x80b", Charset::Ascii), "a?b");
    }
}
