//! Pathological inputs: deep nesting, huge flat documents, hostile
//! references.

#![allow(clippy::unwrap_used)]

use std::time::{Duration, Instant};

use tagmend::serial::{serialize_to_string, SerializeOptions};
use tagmend::tree::Node;
use tagmend::{parse, parse_with_options, Error, Interner, ParseOptions};

// ---------------------------------------------------------------------------
// Depth limit tests
// ---------------------------------------------------------------------------

#[test]
fn test_deeply_nested_elements_rejected() {
    let xml = format!("{}{}", "<a>".repeat(5000), "</a>".repeat(5000));
    let result = parse_with_options(
        &xml,
        &ParseOptions::default().force_xml(true),
        &mut Interner::new(),
    );
    assert!(matches!(result, Err(Error::DepthExceeded { limit: 1024 })));
}

#[test]
fn test_depth_limit_exact_boundary() {
    let xml = format!("{}{}", "<a>".repeat(3), "</a>".repeat(3));
    let at_limit = ParseOptions::default().max_depth(3);
    assert!(parse_with_options(&xml, &at_limit, &mut Interner::new()).is_ok());
    let below = ParseOptions::default().max_depth(2);
    assert!(matches!(
        parse_with_options(&xml, &below, &mut Interner::new()),
        Err(Error::DepthExceeded { limit: 2 })
    ));
}

#[test]
fn test_flattened_soup_is_not_deep() {
    // Unclosed paragraphs cannot nest, so depth stays flat.
    let html = "<p>x".repeat(20_000);
    let doc = parse(&html).unwrap();
    assert_eq!(doc.children().len(), 20_000);
}

#[test]
fn test_many_stray_end_tags() {
    let html = "</div>".repeat(10_000);
    let doc = parse(&html).unwrap();
    assert_eq!(doc.children().len(), 10_000);
    let out = serialize_to_string(&Node::from(doc), &SerializeOptions::default());
    assert!(out.is_empty());
}

#[test]
fn test_out_of_range_references_become_question_marks() {
    let doc = Node::from(parse("<p>&#xD800;&#99999999999;&nosuch;</p>").unwrap());
    assert_eq!(doc.extract_text().to_plain_string(), "???");
}

#[test]
fn test_long_attribute_value() {
    let value = "v".repeat(1 << 20);
    let doc = parse(&format!("<a x=\"{value}\"/>")).unwrap();
    assert_eq!(doc.root().unwrap().attribute_value("x").map(|v| v.len()), Some(1 << 20));
}

// ---------------------------------------------------------------------------
// Unterminated construct tests
// ---------------------------------------------------------------------------

#[test]
fn test_unterminated_constructs_scan_linearly() {
    for unit in ["<!--a", "<?p a", "<![CDATA[a", "<!DOCTYPE d [a"] {
        let input = unit.repeat(40_000);
        let start = Instant::now();
        let doc = parse(&input).unwrap();
        let elapsed = start.elapsed();
        assert!(elapsed < Duration::from_secs(2), "{unit:?} took {elapsed:?}");
        let text = Node::from(doc).extract_text().to_plain_string();
        assert_eq!(text, input, "{unit:?}");
    }
}

#[test]
fn test_late_terminator_still_closes_first_construct() {
    let input = format!("{}?>", "<?p a".repeat(1000));
    let doc = parse(&input).unwrap();
    assert_eq!(doc.children().len(), 1);
    assert!(matches!(doc.children()[0], Node::ProcIns(_)));
}
