//! Character-reference normalization.
//!
//! Text is stored *normalized*: every reference that can be resolved is
//! replaced by its character, except that a literal `&` is always kept as
//! `&#38;` and characters the internal charset cannot hold stay as decimal
//! references. Every `&` in normalized text therefore starts a well-formed
//! reference, which lets the serializer emit text without re-escaping `&`.
//!
//! Normalization is idempotent.

use super::Charset;
use crate::html::entities::lookup_entity;

/// The highest code point a reference may carry before it is discarded.
const MAX_REFERENCE: u32 = 0x7FFF_FFFF;

/// A scanned `&...;` reference.
enum Reference<'a> {
    Decimal(&'a str),
    Hex(&'a str),
    Named(&'a str),
}

/// Matches `&#[0-9]+;`, `&#x[0-9a-fA-F]+;` or `&[A-Za-z][A-Za-z0-9]*;` at
/// the start of `s`, returning the reference and its byte length.
fn scan_reference(s: &str) -> Option<(Reference<'_>, usize)> {
    let bytes = s.as_bytes();
    if bytes.first() != Some(&b'&') {
        return None;
    }
    let (body_start, kind): (usize, fn(u8) -> bool) = match bytes.get(1) {
        Some(b'#') if matches!(bytes.get(2), Some(b'x')) => (3, |b: u8| b.is_ascii_hexdigit()),
        Some(b'#') => (2, |b: u8| b.is_ascii_digit()),
        Some(b) if b.is_ascii_alphabetic() => (1, |b: u8| b.is_ascii_alphanumeric()),
        _ => return None,
    };
    let len = bytes[body_start..].iter().take_while(|&&b| kind(b)).count();
    if len == 0 || bytes.get(body_start + len) != Some(&b';') {
        return None;
    }
    let body = &s[body_start..body_start + len];
    let reference = match body_start {
        3 => Reference::Hex(body),
        2 => Reference::Decimal(body),
        _ => Reference::Named(body),
    };
    Some((reference, body_start + len + 1))
}

/// Resolves a reference to a code point. `None` means unresolvable.
fn code_point(reference: &Reference<'_>) -> Option<u32> {
    match reference {
        Reference::Decimal(digits) => parse_bounded(digits, 10),
        Reference::Hex(digits) => parse_bounded(digits, 16),
        Reference::Named(name) => lookup_entity(name),
    }
}

fn parse_bounded(digits: &str, radix: u32) -> Option<u32> {
    let mut value: u32 = 0;
    for c in digits.chars() {
        value = value
            .checked_mul(radix)?
            .checked_add(c.to_digit(radix)?)?;
    }
    (value <= MAX_REFERENCE).then_some(value)
}

/// Normalizes character references in `text`.
///
/// - `&` that does not start a reference becomes `&#38;`.
/// - A reference to `&` becomes `&#38;`.
/// - References to ASCII become the literal character.
/// - References to other characters become the character when `internal`
///   can hold it, otherwise a decimal reference.
/// - Unknown names, surrogates and values above `0x7FFFFFFF` become `?`.
///
/// # Examples
///
/// ```
/// use tagmend::encoding::{reference::normalize, Charset};
///
/// assert_eq!(normalize("A &amp; B", Charset::utf8()), "A &#38; B");
/// assert_eq!(normalize("&lt;&#x41;&eacute;", Charset::utf8()), "<A\u{e9}");
/// assert_eq!(normalize("&eacute;", Charset::Ascii), "&#233;");
/// assert_eq!(normalize("&bogus;", Charset::utf8()), "?");
/// ```
#[must_use]
pub fn normalize(text: &str, internal: Charset) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        rest = &rest[pos..];
        match scan_reference(rest) {
            Some((reference, len)) => {
                push_code_point(&mut out, code_point(&reference), internal);
                rest = &rest[len..];
            }
            None => {
                out.push_str("&#38;");
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn push_code_point(out: &mut String, code: Option<u32>, internal: Charset) {
    match code {
        Some(38) => out.push_str("&#38;"),
        Some(u) if (0xD800..=0xDFFF).contains(&u) => out.push('?'),
        Some(u) => match char::from_u32(u) {
            Some(c) if c.is_ascii() || internal.can_encode(c) => out.push(c),
            _ => out.push_str(&format!("&#{u};")),
        },
        None => out.push('?'),
    }
}

/// Repairs sloppy references in raw parsed character data.
///
/// - A bare `&` becomes `&amp;`.
/// - A numeric reference missing its `;` gets one.
/// - A known named reference missing its `;` gets one.
/// - An unknown name without `;` is taken literally (`&foo` → `&amp;foo`).
///
/// The result still needs [`normalize`].
///
/// # Examples
///
/// ```
/// use tagmend::encoding::reference::fix_pcdata;
///
/// assert_eq!(fix_pcdata("a & b"), "a &amp; b");
/// assert_eq!(fix_pcdata("&#65 &copy x"), "&#65; &copy; x");
/// assert_eq!(fix_pcdata("&foo bar"), "&amp;foo bar");
/// ```
#[must_use]
pub fn fix_pcdata(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        rest = &rest[pos + 1..];
        let bytes = rest.as_bytes();
        let (len, numeric) = match bytes.first() {
            Some(b'#') if matches!(bytes.get(1), Some(b'x')) => {
                let n = bytes[2..].iter().take_while(|b| b.is_ascii_hexdigit()).count();
                if n == 0 {
                    (0, false)
                } else {
                    (2 + n, true)
                }
            }
            Some(b'#') => {
                let n = bytes[1..].iter().take_while(|b| b.is_ascii_digit()).count();
                if n == 0 {
                    (0, false)
                } else {
                    (1 + n, true)
                }
            }
            Some(b) if b.is_ascii_alphabetic() => {
                (bytes.iter().take_while(|b| b.is_ascii_alphanumeric()).count(), false)
            }
            _ => (0, false),
        };
        let body = &rest[..len];
        let terminated = bytes.get(len) == Some(&b';');
        if len == 0 {
            out.push_str("&amp;");
        } else if terminated {
            out.push('&');
            out.push_str(body);
            out.push(';');
            rest = &rest[len + 1..];
            continue;
        } else if numeric || lookup_entity(body).is_some() {
            out.push('&');
            out.push_str(body);
            out.push(';');
        } else {
            out.push_str("&amp;");
            out.push_str(body);
        }
        rest = &rest[len..];
    }
    out.push_str(rest);
    out
}

/// Escapes `&` as `&#38;`, turning plain text into normalized text.
#[must_use]
pub fn escape_ampersands(plain: &str) -> String {
    plain.replace('&', "&#38;")
}

/// Decodes every resolvable reference in normalized text.
///
/// Unresolvable references are left as written.
///
/// # Examples
///
/// ```
/// use tagmend::encoding::reference::decode;
///
/// assert_eq!(decode("A &#38; B &#233;"), "A & B \u{e9}");
/// ```
#[must_use]
pub fn decode(normalized: &str) -> String {
    let mut out = String::with_capacity(normalized.len());
    let mut rest = normalized;
    while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        rest = &rest[pos..];
        let resolved = scan_reference(rest).and_then(|(reference, len)| {
            code_point(&reference)
                .and_then(char::from_u32)
                .map(|c| (c, len))
        });
        match resolved {
            Some((c, len)) => {
                out.push(c);
                rest = &rest[len..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}
