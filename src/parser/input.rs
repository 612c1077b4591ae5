//! Shared low-level input handling.
//!
//! [`Scanner`] is a byte cursor over the input text with the primitives the
//! tokenizer, the tag grammars and the leaf-construct parsers share:
//! peeking, lookahead (case-sensitive and ASCII case-insensitive),
//! whitespace skipping, name scanning and quoted literals. Every slice it
//! returns borrows from the input.
//!
//! [`LineIndex`] maps byte offsets to line/column positions for diagnostics
//! without rescanning the input for each one.

use crate::error::SourceLocation;
use crate::util::qname::{name_len, nmtoken_len};

/// Default maximum structural nesting depth.
pub(crate) const DEFAULT_MAX_DEPTH: usize = 1024;

/// Returns `true` for the ASCII whitespace bytes markup recognizes.
pub(crate) fn is_space(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\r' | b'\n' | b'\x0C')
}

/// Returns `true` for `[A-Za-z0-9_]`, the characters on either side of a
/// word boundary.
pub(crate) fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Returns `true` if `c` is a valid `PubidChar` per XML 1.0 §2.3 `[13]`.
///
/// `PubidChar ::= #x20 | #xD | #xA | [a-zA-Z0-9] | [-'()+,./:=?;!*#@$_%]`
pub(crate) fn is_pubid_char(c: char) -> bool {
    matches!(c,
        ' ' | '\r' | '\n' |
        'a'..='z' | 'A'..='Z' | '0'..='9' |
        '-' | '\'' | '(' | ')' | '+' | ',' | '.' | '/' | ':' |
        '=' | '?' | ';' | '!' | '*' | '#' | '@' | '$' | '_' | '%'
    )
}

/// `VersionNum ::= [a-zA-Z0-9_.:-]+`
pub(crate) fn is_valid_version(s: &str) -> bool {
    !s.is_empty()
        && s
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'.' | b':' | b'-'))
}

/// `EncName ::= [A-Za-z] ([A-Za-z0-9._] | '-')*` per XML 1.0 §4.3.3.
pub(crate) fn is_valid_encoding_name(s: &str) -> bool {
    let bytes = s.as_bytes();
    match bytes.split_first() {
        Some((first, rest)) => {
            first.is_ascii_alphabetic()
                && rest
                    .iter()
                    .all(|&b| b.is_ascii_alphanumeric() || matches!(b, b'.' | b'_' | b'-'))
        }
        None => false,
    }
}

/// A saved cursor position for backtracking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SavedPosition(usize);

/// A byte cursor over UTF-8 input.
///
/// All scanning is ASCII-driven; the cursor only stops on ASCII bytes, so
/// every slice it hands out falls on character boundaries.
pub(crate) struct Scanner<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Scanner<'a> {
    /// Creates a scanner positioned at the start of `input`.
    pub fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    /// Creates a scanner positioned at `pos`.
    pub fn at(input: &'a str, pos: usize) -> Self {
        Self { input, pos }
    }

    /// Returns `true` if all input has been consumed.
    pub fn at_end(&self) -> bool {
        self.pos >= self.input.len()
    }

    /// Returns the current byte offset.
    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn save_position(&self) -> SavedPosition {
        SavedPosition(self.pos)
    }

    pub fn restore_position(&mut self, saved: SavedPosition) {
        self.pos = saved.0;
    }

    /// Returns the byte at the current position without consuming it.
    pub fn peek(&self) -> Option<u8> {
        self.input.as_bytes().get(self.pos).copied()
    }

    /// Returns the byte before the current position.
    pub fn peek_back(&self) -> Option<u8> {
        self.pos
            .checked_sub(1)
            .and_then(|p| self.input.as_bytes().get(p).copied())
    }

    /// Advances by `count` bytes. Callers always land on a char boundary.
    pub fn advance(&mut self, count: usize) {
        self.pos = (self.pos + count).min(self.input.len());
    }

    /// Returns `true` if the remaining input starts with `s`.
    pub fn looking_at(&self, s: &[u8]) -> bool {
        self.input.as_bytes()[self.pos..].starts_with(s)
    }

    /// ASCII case-insensitive [`looking_at`](Self::looking_at).
    pub fn looking_at_ci(&self, expected: &[u8]) -> bool {
        self.input.as_bytes()[self.pos..]
            .get(..expected.len())
            .is_some_and(|s| s.eq_ignore_ascii_case(expected))
    }

    /// Consumes `s` if the input starts with it.
    pub fn eat(&mut self, s: &[u8]) -> bool {
        if self.looking_at(s) {
            self.pos += s.len();
            true
        } else {
            false
        }
    }

    /// Consumes `s` (ASCII case-insensitive) if the input starts with it.
    pub fn eat_ci(&mut self, s: &[u8]) -> bool {
        if self.looking_at_ci(s) {
            self.pos += s.len();
            true
        } else {
            false
        }
    }

    /// Skips whitespace. Returns `true` if any was consumed.
    pub fn skip_whitespace(&mut self) -> bool {
        let start = self.pos;
        while self.peek().is_some_and(is_space) {
            self.pos += 1;
        }
        self.pos > start
    }

    /// Consumes ASCII bytes while `pred` holds and returns them.
    pub fn take_while(&mut self, pred: impl Fn(u8) -> bool) -> &'a str {
        let start = self.pos;
        while self.peek().is_some_and(|b| b.is_ascii() && pred(b)) {
            self.pos += 1;
        }
        &self.input[start..self.pos]
    }

    /// Consumes a `Name`, if one starts here.
    pub fn name(&mut self) -> Option<&'a str> {
        let len = name_len(&self.input.as_bytes()[self.pos..]);
        (len > 0).then(|| {
            self.pos += len;
            &self.input[self.pos - len..self.pos]
        })
    }

    /// Consumes an `Nmtoken`, if one starts here.
    pub fn nmtoken(&mut self) -> Option<&'a str> {
        let len = nmtoken_len(&self.input.as_bytes()[self.pos..]);
        (len > 0).then(|| {
            self.pos += len;
            &self.input[self.pos - len..self.pos]
        })
    }

    /// Consumes a `"..."` or `'...'` literal whose body satisfies `allowed`,
    /// returning the body. Restores the position on failure.
    pub fn quoted(&mut self, allowed: impl Fn(u8) -> bool) -> Option<&'a str> {
        let saved = self.save_position();
        let quote = self.peek().filter(|&q| q == b'"' || q == b'\'')?;
        self.pos += 1;
        let body = self.take_until_byte(quote, &allowed);
        if self.eat(&[quote]) {
            Some(body)
        } else {
            self.restore_position(saved);
            None
        }
    }

    /// Consumes bytes up to (not including) `stop`, or up to the first byte
    /// rejected by `allowed`.
    pub fn take_until_byte(&mut self, stop: u8, allowed: impl Fn(u8) -> bool) -> &'a str {
        let start = self.pos;
        while let Some(b) = self.peek() {
            if b == stop || !allowed(b) {
                break;
            }
            self.pos += 1;
        }
        &self.input[start..self.pos]
    }

    /// Advances past the first occurrence of `needle`, returning the text
    /// before it. Leaves the position unchanged if `needle` is absent.
    pub fn take_through(&mut self, needle: &str) -> Option<&'a str> {
        let rest = &self.input[self.pos..];
        let found = rest.find(needle)?;
        self.pos += found + needle.len();
        Some(&rest[..found])
    }

    /// Returns `true` if the cursor sits on a `\b` word boundary.
    pub fn at_word_boundary(&self) -> bool {
        let before = self.peek_back().is_some_and(is_word_byte);
        let after = self.peek().is_some_and(is_word_byte);
        before != after
    }
}

/// Maps byte offsets to 1-based line and column numbers.
pub(crate) struct LineIndex<'a> {
    input: &'a str,
    line_starts: Vec<usize>,
}

impl<'a> LineIndex<'a> {
    pub fn new(input: &'a str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(
            input
                .bytes()
                .enumerate()
                .filter(|&(_, b)| b == b'\n')
                .map(|(i, _)| i + 1),
        );
        Self { input, line_starts }
    }

    #[allow(clippy::cast_possible_truncation)]
    pub fn locate(&self, byte_offset: usize) -> SourceLocation {
        let offset = byte_offset.min(self.input.len());
        let line = self.line_starts.partition_point(|&start| start <= offset);
        let line_start = self.line_starts[line.saturating_sub(1)];
        let column = self
            .input
            .get(line_start..offset)
            .map_or(offset - line_start, |s| s.chars().count());
        SourceLocation {
            line: line as u32,
            column: column as u32 + 1,
            byte_offset,
        }
    }
}
