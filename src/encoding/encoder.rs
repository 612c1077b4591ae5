//! Serializing encoder with minimal-charset tracking.

use super::transcode::{Fallback, Sink};
use super::Charset;
use crate::error::Result;

struct Candidate {
    sink: Sink,
    alive: bool,
}

/// Encodes serializer output into a target charset.
///
/// Alongside the primary charset the encoder runs a few narrower candidate
/// charsets over the same output and drops each candidate the first time its
/// bytes differ from the primary's. The first survivor is the
/// [minimal sufficient charset](Self::minimal_charset): a document written
/// entirely in ASCII can be labelled `US-ASCII` even when encoded as UTF-8.
///
/// # Examples
///
/// ```
/// use tagmend::encoding::{Charset, Encoder};
///
/// let mut enc = Encoder::new(Charset::utf8());
/// enc.output_text("plain");
/// assert_eq!(enc.minimal_charset(), Charset::Ascii);
/// enc.output_text("caf\u{e9}");
/// assert_eq!(enc.minimal_charset(), Charset::utf8());
/// ```
pub struct Encoder {
    primary: Sink,
    out: Vec<u8>,
    candidates: Vec<Candidate>,
    scratch: Vec<u8>,
}

impl Encoder {
    /// Creates an encoder for `charset`.
    #[must_use]
    pub fn new(charset: Charset) -> Self {
        let candidates = candidate_charsets(charset)
            .into_iter()
            .filter(|&c| c != charset)
            .map(|c| Candidate {
                sink: Sink::new(c),
                alive: true,
            })
            .collect();
        Self {
            primary: Sink::new(charset),
            out: Vec::new(),
            candidates,
            scratch: Vec::new(),
        }
    }

    /// Creates an encoder for the charset named by `label`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedCharset`](crate::error::Error::UnsupportedCharset)
    /// for unknown labels.
    pub fn for_label(label: &str) -> Result<Self> {
        Ok(Self::new(Charset::for_label(label)?))
    }

    /// The primary output charset.
    #[must_use]
    pub fn charset(&self) -> Charset {
        self.primary.charset()
    }

    /// Emits markup. Unencodable characters become `?`.
    pub fn output_string(&mut self, s: &str) {
        self.emit(s, Fallback::Question);
    }

    /// Emits character data. Unencodable characters become `&#N;`.
    pub fn output_text(&mut self, s: &str) {
        self.emit(s, Fallback::CharRef);
    }

    /// The narrowest surviving candidate, or the primary charset.
    #[must_use]
    pub fn minimal_charset(&self) -> Charset {
        self.candidates
            .iter()
            .find(|c| c.alive)
            .map_or(self.primary.charset(), |c| c.sink.charset())
    }

    /// Bytes produced so far.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.out
    }

    /// Flushes pending state and returns the output.
    #[must_use]
    pub fn finish(mut self) -> Vec<u8> {
        self.flush();
        self.out
    }

    /// Flushes and returns the output prefixed with an XML declaration whose
    /// `encoding` names the minimal sufficient charset.
    #[must_use]
    pub fn finish_with_xmldecl(mut self) -> Vec<u8> {
        self.flush();
        let decl = format!(
            "<?xml version=\"1.0\" encoding=\"{}\"?>",
            self.minimal_charset().name()
        );
        let mut sink = Sink::new(self.primary.charset());
        let mut bytes = Vec::with_capacity(decl.len() + self.out.len());
        sink.write(&decl, Fallback::Question, &mut bytes);
        sink.flush(&mut bytes);
        bytes.extend_from_slice(&self.out);
        bytes
    }

    fn emit(&mut self, s: &str, fallback: Fallback) {
        let Self {
            primary,
            out,
            candidates,
            scratch,
        } = self;
        let start = out.len();
        primary.write(s, fallback, out);
        let produced = &out[start..];
        for candidate in candidates.iter_mut().filter(|c| c.alive) {
            scratch.clear();
            candidate.sink.write(s, fallback, scratch);
            if scratch.as_slice() != produced {
                log::trace!(
                    "{} is no longer sufficient for {} output",
                    candidate.sink.charset(),
                    primary.charset()
                );
                candidate.alive = false;
            }
        }
    }

    fn flush(&mut self) {
        let Self {
            primary,
            out,
            candidates,
            scratch,
        } = self;
        let start = out.len();
        primary.flush(out);
        let produced = &out[start..];
        for candidate in candidates.iter_mut().filter(|c| c.alive) {
            scratch.clear();
            candidate.sink.flush(scratch);
            if scratch.as_slice() != produced {
                candidate.alive = false;
            }
        }
    }
}

/// Narrower charsets worth reporting instead of `primary`, narrowest first.
fn candidate_charsets(primary: Charset) -> Vec<Charset> {
    match primary {
        Charset::Utf16Be | Charset::Utf16Le => Vec::new(),
        Charset::Encoding(enc) if enc == encoding_rs::GB18030 => {
            vec![Charset::Ascii, Charset::Encoding(encoding_rs::GBK)]
        }
        _ => vec![Charset::Ascii],
    }
}
