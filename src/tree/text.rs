//! Character data.

use std::fmt;
use std::sync::Arc;

use super::RawSpan;
use crate::encoding::reference::{decode, escape_ampersands, fix_pcdata, normalize};
use crate::encoding::Charset;

/// A run of character data, stored normalized.
///
/// Every `&` in the stored text begins a well-formed character reference
/// and a literal ampersand is always `&#38;` (see
/// [`normalize`](crate::encoding::reference::normalize)). Equality compares
/// the normalized text and ignores the raw source span.
///
/// # Examples
///
/// ```
/// use tagmend::tree::Text;
///
/// let t = Text::new("R&D <1>");
/// assert_eq!(t.as_normalized(), "R&#38;D <1>");
/// assert_eq!(t.to_plain_string(), "R&D <1>");
/// ```
#[derive(Clone)]
pub struct Text {
    normalized: Arc<str>,
    raw: Option<RawSpan>,
}

impl Text {
    /// Creates text from plain characters.
    #[must_use]
    pub fn new(plain: &str) -> Self {
        Self {
            normalized: escape_ampersands(plain).into(),
            raw: None,
        }
    }

    /// Creates text from markup character data, resolving references.
    ///
    /// Sloppy references are repaired first (`&nbsp` gains its `;`, a bare
    /// `&` stands for itself). Characters `internal` cannot hold stay as
    /// numeric references.
    ///
    /// ```
    /// use tagmend::encoding::Charset;
    /// use tagmend::tree::Text;
    ///
    /// let t = Text::parse("A &amp; B &copy 2024", Charset::utf8());
    /// assert_eq!(t.to_plain_string(), "A & B \u{a9} 2024");
    /// ```
    #[must_use]
    pub fn parse(markup: &str, internal: Charset) -> Self {
        Self {
            normalized: normalize(&fix_pcdata(markup), internal).into(),
            raw: None,
        }
    }

    /// Wraps text that is already normalized.
    pub(crate) fn from_normalized(normalized: impl Into<Arc<str>>) -> Self {
        Self {
            normalized: normalized.into(),
            raw: None,
        }
    }

    pub(crate) fn with_raw(mut self, raw: RawSpan) -> Self {
        self.raw = Some(raw);
        self
    }

    /// Concatenates several texts.
    #[must_use]
    pub fn concat<'a>(texts: impl IntoIterator<Item = &'a Text>) -> Self {
        let joined: String = texts.into_iter().map(|t| &*t.normalized).collect();
        Self::from_normalized(joined)
    }

    /// The stored normalized text.
    #[must_use]
    pub fn as_normalized(&self) -> &str {
        &self.normalized
    }

    /// Decodes the stored text back to plain characters.
    #[must_use]
    pub fn to_plain_string(&self) -> String {
        decode(&self.normalized)
    }

    /// Returns `true` if the text holds no characters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.normalized.is_empty()
    }

    /// The source this text was parsed from, if it came from parsed input.
    #[must_use]
    pub fn raw(&self) -> Option<&RawSpan> {
        self.raw.as_ref()
    }
}

impl PartialEq for Text {
    fn eq(&self, other: &Self) -> bool {
        self.normalized == other.normalized
    }
}

impl Eq for Text {}

impl fmt::Debug for Text {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Text({:?})", &*self.normalized)
    }
}

impl fmt::Display for Text {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_plain_string())
    }
}

impl From<&str> for Text {
    fn from(plain: &str) -> Self {
        Self::new(plain)
    }
}

impl From<String> for Text {
    fn from(plain: String) -> Self {
        Self::new(&plain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_round_trip() {
        let t = Text::new("a & b &amp; c");
        assert_eq!(t.to_plain_string(), "a & b &amp; c");
    }

    #[test]
    fn test_parse_entities() {
        let t = Text::parse("A &amp; B", Charset::utf8());
        assert_eq!(t.as_normalized(), "A &#38; B");
        assert_eq!(t.to_plain_string(), "A & B");
    }

    #[test]
    fn test_equality_ignores_origin() {
        assert_eq!(Text::new("<"), Text::parse("&lt;", Charset::utf8()));
    }

    #[test]
    fn test_concat() {
        let joined = Text::concat([&Text::new("a&"), &Text::new("b")]);
        assert_eq!(joined.to_plain_string(), "a&b");
        assert!(Text::concat([]).is_empty());
    }
}
