//! Fallback-aware transcoding between two charsets.
//!
//! Transcoding is total. When the input contains bytes the source charset
//! cannot decode, the offending span is split into characters with a
//! per-charset byte-pattern table; each isolated character becomes a numeric
//! character reference if its code point can still be recovered, otherwise
//! `?`. Bytes no pattern matches are dropped one at a time, each leaving a
//! `?`. Characters the target charset cannot encode become `&#N;` in text
//! and `?` in markup.

use encoding_rs::{DecoderResult, EncoderResult};

use super::Charset;

/// What to emit for a character the target charset cannot encode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Fallback {
    /// `?`, for markup where a reference would change the meaning.
    Question,
    /// `&#N;`, for character data.
    CharRef,
}

impl Fallback {
    fn render(self, c: char) -> String {
        match self {
            Self::Question => "?".to_string(),
            Self::CharRef => format!("&#{};", u32::from(c)),
        }
    }
}

/// The encoding half of a transcoder: UTF-8 text in, target bytes out.
pub(crate) struct Sink {
    charset: Charset,
    encoder: Option<encoding_rs::Encoder>,
}

impl Sink {
    pub(crate) fn new(charset: Charset) -> Self {
        let encoder = match charset {
            Charset::Encoding(enc) => Some(enc.new_encoder()),
            _ => None,
        };
        Self { charset, encoder }
    }

    pub(crate) fn charset(&self) -> Charset {
        self.charset
    }

    /// Encodes `text`, appending to `out`.
    pub(crate) fn write(&mut self, text: &str, fallback: Fallback, out: &mut Vec<u8>) {
        match self.charset {
            Charset::Ascii => {
                for c in text.chars() {
                    if c.is_ascii() {
                        out.push(c as u8);
                    } else {
                        log::trace!("US-ASCII cannot encode U+{:04X}", u32::from(c));
                        out.extend_from_slice(fallback.render(c).as_bytes());
                    }
                }
            }
            Charset::Utf16Be => {
                for unit in text.encode_utf16() {
                    out.extend_from_slice(&unit.to_be_bytes());
                }
            }
            Charset::Utf16Le => {
                for unit in text.encode_utf16() {
                    out.extend_from_slice(&unit.to_le_bytes());
                }
            }
            Charset::Encoding(_) => self.encode(text, fallback, false, out),
        }
    }

    /// Emits any pending shift state (ISO-2022-JP returns to ASCII).
    pub(crate) fn flush(&mut self, out: &mut Vec<u8>) {
        if self.encoder.is_some() {
            self.encode("", Fallback::Question, true, out);
        }
    }

    fn encode(&mut self, text: &str, fallback: Fallback, last: bool, out: &mut Vec<u8>) {
        let name = self.charset.name();
        let Some(encoder) = self.encoder.as_mut() else {
            return;
        };
        let mut buf = [0u8; 1024];
        let mut rest = text;
        loop {
            let (result, read, written) =
                encoder.encode_from_utf8_without_replacement(rest, &mut buf, last);
            out.extend_from_slice(&buf[..written]);
            rest = &rest[read..];
            match result {
                EncoderResult::InputEmpty => break,
                EncoderResult::OutputFull => {}
                EncoderResult::Unmappable(c) => {
                    log::trace!("{name} cannot encode U+{:04X}", u32::from(c));
                    let replacement = fallback.render(c);
                    let (_, _, written) =
                        encoder.encode_from_utf8_without_replacement(&replacement, &mut buf, false);
                    out.extend_from_slice(&buf[..written]);
                }
            }
        }
    }
}

/// Converts a byte stream from one charset to another without ever failing.
///
/// # Examples
///
/// ```
/// use tagmend::encoding::{Charset, Transcoder};
///
/// let mut t = Transcoder::new(Charset::utf8(), Charset::Ascii);
/// let mut out = t.transcode("caf\u{e9}".as_bytes());
/// out.extend(t.finish());
/// assert_eq!(out, b"caf&#233;");
/// ```
pub struct Transcoder {
    from: Charset,
    decoder: Option<encoding_rs::Decoder>,
    sink: Sink,
}

impl Transcoder {
    /// Creates a transcoder from `from` to `to`.
    #[must_use]
    pub fn new(from: Charset, to: Charset) -> Self {
        let decoder = from
            .decoding()
            .map(encoding_rs::Encoding::new_decoder_without_bom_handling);
        Self {
            from,
            decoder,
            sink: Sink::new(to),
        }
    }

    /// The source charset.
    #[must_use]
    pub fn from_charset(&self) -> Charset {
        self.from
    }

    /// The target charset.
    #[must_use]
    pub fn to_charset(&self) -> Charset {
        self.sink.charset()
    }

    /// Converts the next chunk. Incomplete trailing sequences are held back
    /// until the next call or [`finish`](Self::finish).
    pub fn transcode(&mut self, bytes: &[u8]) -> Vec<u8> {
        let text = self.decode(bytes, false);
        let mut out = Vec::with_capacity(text.len());
        self.sink.write(&text, Fallback::CharRef, &mut out);
        out
    }

    /// Flushes held-back input and any pending shift state.
    pub fn finish(&mut self) -> Vec<u8> {
        let text = self.decode(&[], true);
        let mut out = Vec::new();
        self.sink.write(&text, Fallback::CharRef, &mut out);
        self.sink.flush(&mut out);
        out
    }

    /// The decoding half: source bytes to text, with the isolating fallback.
    pub(crate) fn decode(&mut self, bytes: &[u8], last: bool) -> String {
        let from = self.from;
        let mut text = String::with_capacity(bytes.len());
        let Some(decoder) = self.decoder.as_mut() else {
            for &b in bytes {
                if b.is_ascii() {
                    text.push(char::from(b));
                } else {
                    substitute(from, &[b], &mut text);
                }
            }
            return text;
        };
        let mut pos = 0;
        loop {
            let remaining = bytes.len() - pos;
            let needed = decoder
                .max_utf8_buffer_length_without_replacement(remaining)
                .unwrap_or(remaining.saturating_mul(3).saturating_add(16));
            text.reserve(needed);
            let (result, read) =
                decoder.decode_to_string_without_replacement(&bytes[pos..], &mut text, last);
            let end = pos + read;
            match result {
                DecoderResult::InputEmpty => break,
                DecoderResult::OutputFull => {}
                DecoderResult::Malformed(bad, extra) => {
                    let bad_end = end.saturating_sub(usize::from(extra));
                    let bad_start = bad_end.saturating_sub(usize::from(bad));
                    let malformed = &bytes[bad_start..bad_end];
                    log::trace!("malformed {} sequence {malformed:02X?}", from.name());
                    substitute(from, malformed, &mut text);
                    // Bytes held over from an earlier chunk are no longer addressable.
                    for _ in malformed.len()..usize::from(bad) {
                        text.push('?');
                    }
                }
            }
            pos = end;
        }
        text
    }
}

/// Replaces an undecodable span character by character.
fn substitute(from: Charset, malformed: &[u8], text: &mut String) {
    let mut rest = malformed;
    while !rest.is_empty() {
        match first_char_len(from, rest) {
            Some(n) => {
                match decode_one(from, &rest[..n]) {
                    Some(c) => text.push_str(&format!("&#{};", u32::from(c))),
                    None => text.push('?'),
                }
                rest = &rest[n..];
            }
            None => {
                text.push('?');
                rest = &rest[1..];
            }
        }
    }
}

/// Decodes exactly one character, or nothing.
fn decode_one(from: Charset, bytes: &[u8]) -> Option<char> {
    let enc = from.decoding()?;
    let decoded = enc.decode_without_bom_handling_and_without_replacement(bytes)?;
    let mut chars = decoded.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Some(c),
        _ => None,
    }
}

fn within(b: Option<&u8>, lo: u8, hi: u8) -> bool {
    b.is_some_and(|&b| (lo..=hi).contains(&b))
}

/// Byte length of the first character of `bytes` by shape alone, if the
/// bytes have the shape of a character in `charset`.
pub(crate) fn first_char_len(charset: Charset, bytes: &[u8]) -> Option<usize> {
    let b0 = *bytes.first()?;
    let b1 = bytes.get(1);
    let fits = |n: usize, ok: bool| (ok && bytes.len() >= n).then_some(n);
    match charset {
        Charset::Ascii => fits(1, b0 < 0x80),
        Charset::Utf16Be | Charset::Utf16Le => {
            let unit = |i: usize| -> Option<u16> {
                let pair = [*bytes.get(i)?, *bytes.get(i + 1)?];
                Some(if charset == Charset::Utf16Be {
                    u16::from_be_bytes(pair)
                } else {
                    u16::from_le_bytes(pair)
                })
            };
            let first = unit(0)?;
            match first {
                0xD800..=0xDBFF => unit(2).filter(|u| (0xDC00..=0xDFFF).contains(u)).map(|_| 4),
                0xDC00..=0xDFFF => None,
                _ => Some(2),
            }
        }
        Charset::Encoding(enc) => match enc.name() {
            "UTF-8" => {
                let cont = |i: usize| within(bytes.get(i), 0x80, 0xBF);
                match b0 {
                    0x00..=0x7F => Some(1),
                    0xC2..=0xDF => fits(2, cont(1)),
                    0xE0..=0xEF => fits(3, cont(1) && cont(2)),
                    0xF0..=0xF4 => fits(4, cont(1) && cont(2) && cont(3)),
                    _ => None,
                }
            }
            "Shift_JIS" => match b0 {
                0x00..=0x7F | 0xA1..=0xDF => Some(1),
                0x81..=0x9F | 0xE0..=0xFC => {
                    fits(2, within(b1, 0x40, 0x7E) || within(b1, 0x80, 0xFC))
                }
                _ => None,
            },
            "EUC-JP" => match b0 {
                0x00..=0x7F => Some(1),
                0x8E => fits(2, within(b1, 0xA1, 0xDF)),
                0x8F => fits(3, within(b1, 0xA1, 0xFE) && within(bytes.get(2), 0xA1, 0xFE)),
                0xA1..=0xFE => fits(2, within(b1, 0xA1, 0xFE)),
                _ => None,
            },
            "gb18030" => match b0 {
                0x00..=0x7F => Some(1),
                0x81..=0xFE if within(b1, 0x30, 0x39) => fits(
                    4,
                    within(bytes.get(2), 0x81, 0xFE) && within(bytes.get(3), 0x30, 0x39),
                ),
                0x81..=0xFE => fits(2, within(b1, 0x40, 0xFE)),
                _ => None,
            },
            "GBK" | "EUC-KR" | "Big5" => match b0 {
                0x00..=0x7F => Some(1),
                0x81..=0xFE => fits(2, within(b1, 0x40, 0xFE)),
                _ => None,
            },
            "ISO-2022-JP" => fits(1, b0 < 0x80 && b0 != 0x1B),
            _ if enc.is_single_byte() => Some(1),
            _ => None,
        },
    }
}
