//! Qualified-name handling and the name-token character classes.
//!
//! Tag and attribute names recognized in markup are restricted to the ASCII
//! name grammar used by tag-soup HTML:
//!
//! - `NameChar ::= [-A-Za-z0-9._:]`
//! - `Name     ::= [A-Za-z_:] NameChar*`
//! - `Nmtoken  ::= NameChar+`

/// Returns `true` if `b` may start a `Name`.
#[must_use]
pub fn is_name_start_byte(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b == b':'
}

/// Returns `true` if `b` may continue a `Name` or form an `Nmtoken`.
#[must_use]
pub fn is_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'-' | b'.' | b'_' | b':')
}

/// Returns `true` if `s` matches the `Name` production.
#[must_use]
pub fn is_name(s: &str) -> bool {
    let bytes = s.as_bytes();
    match bytes.split_first() {
        Some((&first, rest)) => is_name_start_byte(first) && rest.iter().all(|&b| is_name_byte(b)),
        None => false,
    }
}

/// Returns `true` if `s` matches the `Nmtoken` production.
#[must_use]
pub fn is_nmtoken(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(is_name_byte)
}

/// Returns the byte length of the `Name` starting at the front of `bytes`,
/// or 0 if none starts there.
#[must_use]
pub fn name_len(bytes: &[u8]) -> usize {
    match bytes.first() {
        Some(&b) if is_name_start_byte(b) => {
            1 + bytes[1..].iter().take_while(|&&b| is_name_byte(b)).count()
        }
        _ => 0,
    }
}

/// Returns the byte length of the `Nmtoken` at the front of `bytes`.
#[must_use]
pub fn nmtoken_len(bytes: &[u8]) -> usize {
    bytes.iter().take_while(|&&b| is_name_byte(b)).count()
}

/// Splits a `QName` into its prefix and local name parts.
///
/// Returns `(Some(prefix), localname)` if the name contains a colon,
/// or `(None, localname)` if it does not. Only the first colon splits.
///
/// # Examples
///
/// ```
/// use tagmend::util::qname::split_qname;
///
/// assert_eq!(split_qname("svg:rect"), (Some("svg"), "rect"));
/// assert_eq!(split_qname("div"), (None, "div"));
/// ```
#[must_use]
pub fn split_qname(qname: &str) -> (Option<&str>, &str) {
    match qname.find(':') {
        Some(pos) => (Some(&qname[..pos]), &qname[pos + 1..]),
        None => (None, qname),
    }
}

/// Splits the `{uri}rest` explicit-URI spelling into `(uri, rest)`.
#[must_use]
pub fn split_braced_uri(text: &str) -> Option<(&str, &str)> {
    let open = text.find('{')?;
    let close = open + text[open..].find('}')?;
    if open != 0 {
        return None;
    }
    Some((&text[1..close], &text[close + 1..]))
}
