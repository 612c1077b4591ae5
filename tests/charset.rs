//! Output charsets, fallback and input decoding.

#![allow(clippy::unwrap_used)]

use tagmend::encoding::{decode_lossy, decode_to_utf8, Charset, Encoder, Transcoder};
use tagmend::serial::{serialize, SerializeOptions};
use tagmend::tree::Node;
use tagmend::{parse, parse_xml};

fn encode(s: &str, charset: &str) -> Vec<u8> {
    let doc = Node::from(parse_xml(s).unwrap());
    serialize(&doc, &SerializeOptions::default().charset(charset)).unwrap()
}

#[test]
fn test_text_falls_back_to_references() {
    assert_eq!(encode("<p>\u{4e2d}</p>", "US-ASCII"), b"<p>&#20013;</p>");
    assert_eq!(encode("<p>caf\u{e9}</p>", "ISO-8859-1"), b"<p>caf\xe9</p>");
}

#[test]
fn test_markup_falls_back_to_question_mark() {
    assert_eq!(encode("<p><!--\u{4e2d}--></p>", "US-ASCII"), b"<p><!--?--></p>");
}

#[test]
fn test_shift_jis_output() {
    assert_eq!(encode("<p>\u{3042}</p>", "Shift_JIS"), b"<p>\x82\xa0</p>");
}

#[test]
fn test_minimal_charset_in_declaration() {
    let doc = Node::from(parse("<p>plain</p>").unwrap());
    let options = SerializeOptions::default().xml_declaration(true);
    assert_eq!(
        serialize(&doc, &options).unwrap(),
        b"<?xml version=\"1.0\" encoding=\"US-ASCII\"?><p>plain</p>"
    );
    let doc = Node::from(parse("<p>caf\u{e9}</p>").unwrap());
    let bytes = serialize(&doc, &options).unwrap();
    assert!(bytes.starts_with(b"<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
}

#[test]
fn test_encoder_tracks_narrowest_charset() {
    let mut enc = Encoder::new(Charset::utf8());
    enc.output_string("<a>");
    assert_eq!(enc.minimal_charset(), Charset::Ascii);
    enc.output_text("\u{e9}");
    assert_eq!(enc.minimal_charset(), Charset::utf8());
}

#[test]
fn test_transcoder_isolates_bad_bytes() {
    let utf8 = Charset::utf8();
    let ascii = Charset::Ascii;
    let mut t = Transcoder::new(utf8, ascii);
    let mut out = t.transcode(b"a\xff\xe9b");
    out.extend(t.finish());
    assert!(out.starts_with(b"a?"));
    assert!(out.ends_with(b"b"));
}

#[test]
fn test_decode_input_with_declaration() {
    let bytes = b"<?xml version=\"1.0\" encoding=\"ISO-8859-1\"?><p>caf\xe9</p>";
    let text = decode_to_utf8(bytes).unwrap();
    assert!(text.ends_with("<p>caf\u{e9}</p>"));
}

#[test]
fn test_lossy_decoding_never_fails() {
    let text = decode_lossy(b"ok \xff\xfe end", Charset::utf8());
    assert!(text.starts_with("ok "));
    assert!(text.ends_with(" end"));
}
