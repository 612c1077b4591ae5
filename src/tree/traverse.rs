//! Pre-order traversal.

use super::{Element, Node, Text};

/// Pre-order iterator over a node and everything below it.
///
/// Uses an explicit stack, so arbitrarily deep trees are safe to walk.
pub struct Descendants<'a> {
    stack: Vec<&'a Node>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a Node;

    fn next(&mut self) -> Option<&'a Node> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children().iter().rev());
        Some(node)
    }
}

fn name_matches(element: &Element, names: &[&str]) -> bool {
    names.is_empty() || names.iter().any(|n| element.name().matches(n))
}

impl Node {
    /// This node and all nodes below it, in document order.
    #[must_use]
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants { stack: vec![self] }
    }

    /// Elements at or below this node whose universal or qualified name is
    /// one of `names`; every element when `names` is empty.
    ///
    /// ```
    /// let doc = tagmend::tree::Node::from(tagmend::parse("<ul><li>a<li>b</ul>").unwrap());
    /// assert_eq!(doc.traverse_element(&["li"]).count(), 2);
    /// ```
    pub fn traverse_element<'a>(&'a self, names: &'a [&'a str]) -> impl Iterator<Item = &'a Element> + 'a {
        self.descendants()
            .filter_map(Node::as_element)
            .filter(move |e| name_matches(e, names))
    }

    /// The first element [`traverse_element`](Self::traverse_element) yields.
    #[must_use]
    pub fn find_element(&self, names: &[&str]) -> Option<&Element> {
        self.descendants()
            .filter_map(Node::as_element)
            .find(|e| name_matches(e, names))
    }

    /// Text nodes at or below this node, in document order.
    pub fn traverse_text(&self) -> impl Iterator<Item = &Text> {
        self.descendants().filter_map(Node::as_text)
    }
}
