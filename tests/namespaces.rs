//! Namespace resolution and declaration output.

#![allow(clippy::unwrap_used)]

use tagmend::namespace::{XHTML_NAMESPACE, XML_NAMESPACE};
use tagmend::serial::{serialize_to_string, SerializeOptions};
use tagmend::tree::{Element, NameArg, Node, StartTag, Text};
use tagmend::{parse, parse_xml, Context, Error, Interner, Name};

fn xml_out(node: &Node) -> String {
    serialize_to_string(node, &SerializeOptions::default())
}

#[test]
fn test_prefixed_names_resolve() {
    let doc = Node::from(parse_xml("<r xmlns:x=\"urn:x\"><x:a x:b=\"1\"/></r>").unwrap());
    let a = doc.find_element(&["{urn:x}a"]).unwrap();
    assert_eq!(a.name().namespace_prefix(), Some("x"));
    assert_eq!(a.attribute_value("{urn:x}b").as_deref(), Some("1"));
    assert_eq!(a.attribute_value("x:b").as_deref(), Some("1"));
}

#[test]
fn test_default_namespace_skips_attributes() {
    let doc = Node::from(parse_xml("<r xmlns=\"urn:d\" a=\"1\"/>").unwrap());
    let r = doc.find_element(&["{urn:d}r"]).unwrap();
    let (name, _) = r
        .stag()
        .attributes()
        .iter()
        .find(|(n, _)| !n.is_xmlns())
        .unwrap();
    assert_eq!(name.universal_name(), "a");
}

#[test]
fn test_xml_prefix_is_predeclared() {
    let doc = Node::from(parse_xml("<a xml:lang=\"en\"/>").unwrap());
    let a = doc.children()[0].as_element().unwrap();
    let lang = format!("{{{XML_NAMESPACE}}}lang");
    assert_eq!(a.attribute_value(&lang).as_deref(), Some("en"));
    assert_eq!(xml_out(&doc), "<a xml:lang=\"en\"/>");
}

#[test]
fn test_html_elements_are_xhtml() {
    let doc = Node::from(parse("<html><p/></html>").unwrap());
    let p = format!("{{{XHTML_NAMESPACE}}}p");
    assert!(doc.find_element(&[p.as_str()]).is_some());
}

#[test]
fn test_redundant_declarations_are_not_repeated() {
    let doc = Node::from(
        parse_xml("<r xmlns:x=\"urn:x\"><x:a/><b xmlns:x=\"urn:x\"/></r>").unwrap(),
    );
    assert_eq!(xml_out(&doc), "<r xmlns:x=\"urn:x\"><x:a/><b/></r>");
}

#[test]
fn test_resolved_names_declare_their_prefix() {
    let name = Name::new(Some("s"), Some("urn:s"), Some("e")).unwrap();
    let e = Element::new::<_, &str>(name, vec![], vec![]).unwrap();
    assert_eq!(xml_out(&Node::from(e)), "<s:e xmlns:s=\"urn:s\"/>");
}

#[test]
fn test_inconsistent_prefix_is_rejected() {
    let name = Name::new(Some("x"), Some("urn:1"), Some("a")).unwrap();
    let err = StartTag::build(
        NameArg::Name(name),
        vec![(NameArg::from("xmlns:x"), Text::new("urn:2"))],
        &Context::new(),
        &mut Interner::new(),
    )
    .unwrap_err();
    assert!(matches!(err, Error::InconsistentNamespaceUse { .. }));
}

#[test]
fn test_empty_prefix_declaration_is_rejected() {
    assert!(matches!(
        Context::new().with_declarations([(Some(""), "urn:u")]),
        Err(Error::InvalidNamespaceDeclaration { .. })
    ));
}

#[test]
fn test_unprefixed_namespaced_attribute_is_rejected() {
    let attr = Name::new(None, Some("urn:x"), Some("a")).unwrap();
    let err = Element::new("e", vec![(attr, Text::new("v"))], vec![]).unwrap_err();
    assert!(matches!(err, Error::UnprefixedGlobalAttribute { .. }));
}

#[test]
fn test_unbound_prefix_stays_in_local_name() {
    let doc = parse_xml("<q:a/>").unwrap();
    let a = doc.root().unwrap();
    assert_eq!(a.name().namespace_prefix(), None);
    assert_eq!(a.name().local_name(), Some("q:a"));
    assert_eq!(xml_out(&Node::from(doc.clone())), "<q:a/>");
}
