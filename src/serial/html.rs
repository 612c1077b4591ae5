//! HTML output rules.
//!
//! In HTML output, elements declared `EMPTY` are written as bare start tags
//! (`<br>`), other empty elements as a start/end pair (`<p></p>`), and the
//! bodies of `script` and `style` are written as plain text.

use crate::html::{is_cdata_element, is_empty_element};
use crate::tree::Element;

/// How an element with no content and no end tag is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum EmptyForm {
    /// `<name/>`
    SelfClosing,
    /// `<name>`
    Void,
    /// `<name></name>`
    Pair,
}

fn lower_local(element: &Element) -> String {
    element
        .name()
        .local_name()
        .unwrap_or_default()
        .to_ascii_lowercase()
}

pub(super) fn empty_form(element: &Element, html_output: bool) -> EmptyForm {
    if !html_output {
        EmptyForm::SelfClosing
    } else if is_empty_element(&lower_local(element)) {
        EmptyForm::Void
    } else {
        EmptyForm::Pair
    }
}

/// Returns `true` if a raw start tag can stand for an empty element in the
/// current output mode.
pub(super) fn raw_empty_tag_fits(element: &Element, raw: &str, html_output: bool) -> bool {
    raw.ends_with("/>") || (html_output && is_empty_element(&lower_local(element)))
}

/// The unescaped body of a `script` or `style` element.
///
/// `None` when the element is not one of those, holds anything but text,
/// or its text contains `</` and so has to be escaped.
pub(super) fn raw_text_body(element: &Element) -> Option<String> {
    if !is_cdata_element(&lower_local(element)) {
        return None;
    }
    let mut body = String::new();
    for child in element.children() {
        body.push_str(&child.as_text()?.to_plain_string());
    }
    (!body.contains("</")).then_some(body)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::tree::{Node, Text};

    fn element(name: &str, children: Vec<Node>) -> Element {
        Element::new::<_, &str>(name, vec![], children).unwrap()
    }

    #[test]
    fn test_empty_forms() {
        assert_eq!(empty_form(&element("br", vec![]), true), EmptyForm::Void);
        assert_eq!(empty_form(&element("p", vec![]), true), EmptyForm::Pair);
        assert_eq!(empty_form(&element("br", vec![]), false), EmptyForm::SelfClosing);
    }

    #[test]
    fn test_script_body() {
        let script = element("script", vec![Node::from(Text::new("a < b && c"))]);
        assert_eq!(raw_text_body(&script).as_deref(), Some("a < b && c"));
        let closing = element("script", vec![Node::from("x = '</b>'")]);
        assert_eq!(raw_text_body(&closing), None);
        assert_eq!(raw_text_body(&element("p", vec![Node::from("x")])), None);
    }

    #[test]
    fn test_raw_empty_tag() {
        let br = element("br", vec![]);
        assert!(raw_empty_tag_fits(&br, "<br>", true));
        assert!(!raw_empty_tag_fits(&br, "<br>", false));
        assert!(raw_empty_tag_fits(&element("a", vec![]), "<a/>", false));
    }
}
