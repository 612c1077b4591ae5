//! Substitutions and locations.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use tagmend::serial::{serialize_to_string, SerializeOptions};
use tagmend::tree::{Element, Location, NameArg, Node, Replacement, Step};
use tagmend::{parse, parse_xml, Error, Name, Text};

fn doc(s: &str) -> Node {
    Node::from(parse_xml(s).unwrap())
}

fn xml_out(node: &Node) -> String {
    serialize_to_string(node, &SerializeOptions::default())
}

fn attr(local: &str) -> Name {
    Name::new(None, Some(""), Some(local)).unwrap()
}

#[test]
fn test_insert_before_and_append() {
    let d = doc("<a><b/></a>");
    let e = d
        .subst(vec![
            (vec![Step::Child(0), Step::Child(-1)], Replacement::Node(Node::from("first"))),
            (vec![Step::Child(0), Step::Child(99)], Replacement::Node(Node::from("last"))),
        ])
        .unwrap();
    assert_eq!(xml_out(&e), "<a>first<b/>last</a>");
}

#[test]
fn test_delete_child() {
    let d = doc("<a><b/><c/></a>");
    let e = d
        .subst(vec![(vec![Step::Child(0), Step::Child(0)], Replacement::Delete)])
        .unwrap();
    assert_eq!(xml_out(&e), "<a><c/></a>");
}

#[test]
fn test_deleting_every_child_empties_element() {
    let d = doc("<a><b/></a>");
    let e = d
        .subst(vec![(vec![Step::Child(0), Step::Child(0)], Replacement::Delete)])
        .unwrap();
    assert_eq!(xml_out(&e), "<a></a>");
}

#[test]
fn test_attribute_values_concatenate() {
    let d = doc("<a title=\"old\"/>");
    let e = d
        .subst(vec![
            (vec![Step::Child(0), Step::Attribute(attr("title"))], Replacement::Node(Node::from("x"))),
            (vec![Step::Child(0), Step::Attribute(attr("title"))], Replacement::Node(Node::from("y"))),
        ])
        .unwrap();
    assert_eq!(xml_out(&e), "<a title=\"xy\"/>");
}

#[test]
fn test_new_and_deleted_attributes() {
    let d = doc("<a x=\"1\"/>");
    let e = d
        .subst(vec![
            (vec![Step::Child(0), Step::Attribute(attr("x"))], Replacement::Delete),
            (vec![Step::Child(0), Step::Attribute(attr("y"))], Replacement::Node(Node::from("2"))),
        ])
        .unwrap();
    assert_eq!(xml_out(&e), "<a y=\"2\"/>");
}

#[test]
fn test_attribute_takes_only_text() {
    let d = doc("<a/>");
    let err = d
        .subst(vec![(
            vec![Step::Child(0), Step::Attribute(attr("x"))],
            Replacement::Node(d.children()[0].clone()),
        )])
        .unwrap_err();
    assert!(matches!(err, Error::InvalidSubstitution { .. }));
}

#[test]
fn test_ancestor_and_descendant_conflict() {
    let d = doc("<a><b>x</b></a>");
    let err = d
        .subst(vec![
            (vec![Step::Child(0)], Replacement::Delete),
            (vec![Step::Child(0), Step::Child(0), Step::Child(0)], Replacement::Delete),
        ])
        .unwrap_err();
    assert!(matches!(err, Error::ConflictingSubstitution { .. }));
}

#[test]
fn test_untouched_subtrees_are_shared() {
    let d = doc("<r><a>1</a><b>2</b></r>");
    let e = d
        .subst(vec![(
            vec![Step::Child(0), Step::Child(0), Step::Child(0)],
            Replacement::Node(Node::from("one")),
        )])
        .unwrap();
    let before = &d.children()[0].children()[1];
    let after = &e.children()[0].children()[1];
    match (before, after) {
        (Node::Element(x), Node::Element(y)) => assert!(Arc::ptr_eq(x, y)),
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(xml_out(&d), "<r><a>1</a><b>2</b></r>");
}

#[test]
fn test_location_edits_attribute() {
    let top = Location::new(doc("<a href=\"x\">t</a>"));
    let href = top
        .get_subnode(Step::Child(0))
        .get_subnode(Step::Attribute(attr("href")));
    assert_eq!(href.node(), Some(&Node::from(Text::new("x"))));
    let edited = href.subst_itself(Node::from("y")).unwrap();
    assert_eq!(edited.path(), "doc()/a/@href");
    assert_eq!(xml_out(edited.top().node().unwrap()), "<a href=\"y\">t</a>");
}

#[test]
fn test_location_paths_number_same_kind_siblings() {
    let top = Location::new(doc("<r>a<x/>b<y/><x/></r>"));
    let r = top.get_subnode(Step::Child(0));
    let paths: Vec<String> = (0..5).map(|i| r.get_subnode(Step::Child(i)).path()).collect();
    assert_eq!(
        paths,
        ["doc()/r/text()[1]", "doc()/r/x[1]", "doc()/r/text()[2]", "doc()/r/y", "doc()/r/x[2]"]
    );
}

#[test]
fn test_equality_ignores_source_spelling() {
    let a = doc("<a  x='1'>t</a >");
    let b = doc("<a x=\"1\">t</a>");
    assert_eq!(a, b);
}

fn raw_out(node: &Node) -> String {
    serialize_to_string(node, &SerializeOptions::default().preserve_raw(true))
}

#[test]
fn test_empty_element_gaining_children_drops_raw_tag() {
    let d = doc("<r><a/></r>");
    let e = d
        .subst(vec![(
            vec![Step::Child(0), Step::Child(0), Step::Child(-1)],
            Replacement::Node(Node::from("x")),
        )])
        .unwrap();
    assert_eq!(raw_out(&e), "<r><a>x</a></r>");
    assert_eq!(raw_out(&d), "<r><a/></r>");
}

#[test]
fn test_emptied_element_drops_raw_tag() {
    let d = Node::from(parse("<html><P CLASS=x>one</html>").unwrap());
    let e = d
        .subst(vec![(
            vec![Step::Child(0), Step::Child(0), Step::Child(0)],
            Replacement::Delete,
        )])
        .unwrap();
    let options = SerializeOptions::default().html_output(true).preserve_raw(true);
    assert_eq!(serialize_to_string(&e, &options), "<html><p class=\"x\"></p></html>");
}

#[test]
fn test_attribute_edit_drops_raw_tags() {
    let d = doc("<r><a  x='1'>t</a ></r>");
    let e = d
        .subst(vec![(
            vec![Step::Child(0), Step::Child(0), Step::Attribute(attr("x"))],
            Replacement::Node(Node::from("2")),
        )])
        .unwrap();
    assert_eq!(raw_out(&e), "<r><a x=\"2\">t</a></r>");
}

#[test]
fn test_child_edit_keeps_raw_tags_of_unchanged_shape() {
    let d = doc("<r><a  x='1'>t</a ></r>");
    let e = d
        .subst(vec![(
            vec![Step::Child(0), Step::Child(0), Step::Child(0)],
            Replacement::Node(Node::from("u")),
        )])
        .unwrap();
    assert_eq!(raw_out(&e), "<r><a  x='1'>u</a ></r>");
}

#[test]
fn test_attribute_edit_cannot_rebind_prefix() {
    let d = doc("<x:p xmlns:x=\"u1\"/>");
    let y = Name::new(Some("x"), Some("u2"), Some("y")).unwrap();
    let err = d
        .subst(vec![(
            vec![Step::Child(0), Step::Attribute(y)],
            Replacement::Node(Node::from("v")),
        )])
        .unwrap_err();
    assert!(matches!(err, Error::InconsistentNamespaceUse { .. }));
}

#[test]
fn test_conflicting_declaration_through_subst_and_construction() {
    let y = Name::new(Some("x"), Some("u2"), Some("y")).unwrap();
    let built = Element::new(
        "p",
        vec![
            (NameArg::from("xmlns:x"), Text::new("u1")),
            (NameArg::from(y.clone()), Text::new("v")),
        ],
        vec![],
    );
    assert!(matches!(built, Err(Error::InconsistentNamespaceUse { .. })));

    let d = doc("<p xmlns:x=\"u1\"/>");
    let err = d
        .subst(vec![(
            vec![Step::Child(0), Step::Attribute(y)],
            Replacement::Node(Node::from("v")),
        )])
        .unwrap_err();
    assert!(matches!(err, Error::InconsistentNamespaceUse { .. }));
}

#[test]
fn test_attribute_edit_in_a_new_namespace_declares_it() {
    let d = doc("<p/>");
    let y = Name::new(Some("x"), Some("u2"), Some("y")).unwrap();
    let e = d
        .subst(vec![(
            vec![Step::Child(0), Step::Attribute(y)],
            Replacement::Node(Node::from("v")),
        )])
        .unwrap();
    assert_eq!(xml_out(&e), "<p x:y=\"v\" xmlns:x=\"u2\"/>");
}

#[test]
fn test_delete_and_value_for_one_attribute_conflict() {
    let d = doc("<a x=\"1\"/>");
    for pairs in [
        vec![
            (vec![Step::Child(0), Step::Attribute(attr("x"))], Replacement::Node(Node::from("2"))),
            (vec![Step::Child(0), Step::Attribute(attr("x"))], Replacement::Delete),
        ],
        vec![
            (vec![Step::Child(0), Step::Attribute(attr("x"))], Replacement::Delete),
            (vec![Step::Child(0), Step::Attribute(attr("x"))], Replacement::Node(Node::from("2"))),
        ],
    ] {
        assert!(matches!(
            d.subst(pairs),
            Err(Error::ConflictingSubstitution { .. })
        ));
    }
}
