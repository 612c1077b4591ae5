//! Locations: addressable handles into a tree.

use std::sync::Arc;

use super::{Node, Replacement, Step};
use crate::error::{Error, Result};

#[derive(Debug)]
struct Inner {
    parent: Option<Location>,
    step: Option<Step>,
    node: Option<Node>,
}

/// A node together with the path that reached it.
///
/// A location holds its parent location, the step from the parent, and the
/// node found there (`None` when the step pointed past the children). It is
/// a read-side view: building one never touches the tree, and locations are
/// rebuilt on demand rather than cached.
///
/// # Examples
///
/// ```
/// use tagmend::tree::{Location, Node, Step};
///
/// let doc = Node::from(tagmend::parse("<ul><li>a</li><li>b</li></ul>").unwrap());
/// let top = Location::new(doc);
/// let second = top.get_subnode(Step::Child(0)).get_subnode(Step::Child(1));
/// assert_eq!(second.path(), "doc()/ul/li[2]");
///
/// let edited = second.subst_itself(Node::from("gone")).unwrap();
/// assert_eq!(edited.top().node().unwrap().extract_text().to_plain_string(), "agone");
/// ```
#[derive(Debug, Clone)]
pub struct Location(Arc<Inner>);

/// The node test `path()` renders for a node.
fn node_test(node: &Node) -> String {
    match node {
        Node::Document(_) => "doc()".to_string(),
        Node::Element(e) => e.name().qualified_name(),
        Node::Text(_) => "text()".to_string(),
        Node::Comment(_) => "comment()".to_string(),
        Node::ProcIns(_) => "processing-instruction()".to_string(),
        Node::DocType(_) => "doctype()".to_string(),
        Node::XmlDecl(_) => "xml-declaration()".to_string(),
        Node::BogusEndTag(_) => "bogus-etag()".to_string(),
    }
}

impl Location {
    /// A location for `node` with no parent.
    #[must_use]
    pub fn new(node: Node) -> Self {
        Self(Arc::new(Inner {
            parent: None,
            step: None,
            node: Some(node),
        }))
    }

    /// The parent location.
    #[must_use]
    pub fn parent(&self) -> Option<&Location> {
        self.0.parent.as_ref()
    }

    /// The step from the parent.
    #[must_use]
    pub fn index(&self) -> Option<&Step> {
        self.0.step.as_ref()
    }

    /// The node at this location.
    #[must_use]
    pub fn node(&self) -> Option<&Node> {
        self.0.node.as_ref()
    }

    /// The location one step down.
    #[must_use]
    pub fn get_subnode(&self, step: Step) -> Location {
        let node = self.node().and_then(|n| n.subnode(&step));
        Self(Arc::new(Inner {
            parent: Some(self.clone()),
            step: Some(step),
            node,
        }))
    }

    /// The location without a parent at the start of this one's chain.
    #[must_use]
    pub fn top(&self) -> &Location {
        let mut loc = self;
        while let Some(parent) = loc.parent() {
            loc = parent;
        }
        loc
    }

    /// Steps from the top location to this one.
    #[must_use]
    pub fn index_list(&self) -> Vec<Step> {
        let mut steps = Vec::new();
        let mut loc = self;
        while let (Some(parent), Some(step)) = (loc.parent(), loc.index()) {
            steps.push(step.clone());
            loc = parent;
        }
        steps.reverse();
        steps
    }

    /// An XPath-like address such as `doc()/html/body/p[2]/text()`.
    ///
    /// A step gets a 1-based ordinal when several siblings share its node
    /// test. Attributes render as `@name`; a step past the children renders
    /// as `*[i]`.
    #[must_use]
    pub fn path(&self) -> String {
        let mut chain = vec![self];
        while let Some(parent) = chain.last().copied().and_then(Location::parent) {
            chain.push(parent);
        }
        chain.reverse();
        let mut segments = Vec::with_capacity(chain.len());
        for loc in chain {
            let segment = match (loc.parent(), loc.index(), loc.node()) {
                (None, _, Some(node)) => node_test(node),
                (Some(_), Some(Step::Attribute(name)), _) => format!("@{}", name.qualified_name()),
                (Some(parent), Some(Step::Child(i)), Some(node)) => {
                    let test = node_test(node);
                    let siblings = parent.node().map_or(&[][..], Node::children);
                    let same: Vec<usize> = siblings
                        .iter()
                        .enumerate()
                        .filter(|(_, s)| node_test(s) == test)
                        .map(|(k, _)| k)
                        .collect();
                    let here = usize::try_from(*i).unwrap_or_default();
                    match same.iter().position(|&k| k == here) {
                        Some(ordinal) if same.len() > 1 => format!("{test}[{}]", ordinal + 1),
                        _ => test,
                    }
                }
                (_, Some(Step::Child(i)), None) => format!("*[{i}]"),
                _ => "*".to_string(),
            };
            segments.push(segment);
        }
        segments.join("/")
    }

    /// Replaces the node at this location and rebuilds every ancestor.
    ///
    /// Returns the location of the new node in the rebuilt tree; the old
    /// tree is left untouched.
    ///
    /// # Errors
    ///
    /// Propagates errors of [`Node::subst_subnode`] along the chain.
    pub fn subst_itself(&self, node: Node) -> Result<Location> {
        let mut replacement = node;
        let mut loc = self;
        while let (Some(parent), Some(step)) = (loc.parent(), loc.index()) {
            let parent_node = parent.node().ok_or_else(|| Error::InvalidSubstitution {
                reason: format!("no node at {}", parent.path()),
            })?;
            replacement =
                parent_node.subst_subnode(vec![(step.clone(), Replacement::Node(replacement))])?;
            loc = parent;
        }
        let mut rebuilt = Location::new(replacement);
        for step in self.index_list() {
            rebuilt = rebuilt.get_subnode(step);
        }
        Ok(rebuilt)
    }

    /// Applies [`Node::subst`] to the node here and splices the result back
    /// into the tree.
    ///
    /// # Errors
    ///
    /// As for [`Node::subst`] and [`subst_itself`](Self::subst_itself).
    pub fn subst(&self, pairs: Vec<(Vec<Step>, Replacement)>) -> Result<Location> {
        let node = self.node().ok_or_else(|| Error::InvalidSubstitution {
            reason: format!("no node at {}", self.path()),
        })?;
        self.subst_itself(node.subst(pairs)?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::namespace::Name;
    use crate::parser::parse;

    fn top(s: &str) -> Location {
        Location::new(Node::from(parse(s).unwrap()))
    }

    #[test]
    fn test_paths() {
        let t = top("<html><body><p>a</p><!--c--><p>b</p></body></html>");
        let body = t.get_subnode(Step::Child(0)).get_subnode(Step::Child(0));
        assert_eq!(body.path(), "doc()/html/body");
        assert_eq!(body.get_subnode(Step::Child(2)).path(), "doc()/html/body/p[2]");
        assert_eq!(body.get_subnode(Step::Child(1)).path(), "doc()/html/body/comment()");
        assert_eq!(
            body.get_subnode(Step::Child(0)).get_subnode(Step::Child(0)).path(),
            "doc()/html/body/p[1]/text()"
        );
        assert_eq!(body.get_subnode(Step::Child(9)).path(), "doc()/html/body/*[9]");
    }

    #[test]
    fn test_attribute_path() {
        let t = top("<a href=x>y</a>");
        let href = Name::new(None, Some(""), Some("href")).unwrap();
        let loc = t.get_subnode(Step::Child(0)).get_subnode(Step::Attribute(href));
        assert_eq!(loc.path(), "doc()/a/@href");
        assert_eq!(loc.node(), Some(&Node::from("x")));
    }

    #[test]
    fn test_index_list() {
        let t = top("<a><b/></a>");
        let b = t.get_subnode(Step::Child(0)).get_subnode(Step::Child(0));
        assert_eq!(b.index_list(), vec![Step::Child(0), Step::Child(0)]);
        assert!(t.index_list().is_empty());
    }

    #[test]
    fn test_subst_itself_rebuilds_ancestors() {
        let t = top("<a><b>old</b></a>");
        let b = t.get_subnode(Step::Child(0)).get_subnode(Step::Child(0));
        let replaced = b.subst_itself(Node::from("new")).unwrap();
        assert_eq!(replaced.node(), Some(&Node::from("new")));
        let new_top = replaced.top().node().unwrap();
        assert_eq!(new_top.extract_text().to_plain_string(), "new");
        assert_eq!(t.node().unwrap().extract_text().to_plain_string(), "old");
    }

    #[test]
    fn test_subst_itself_without_parent() {
        let loc = Location::new(Node::from("x"));
        let replaced = loc.subst_itself(Node::from("y")).unwrap();
        assert!(replaced.parent().is_none());
        assert_eq!(replaced.node(), Some(&Node::from("y")));
    }

    #[test]
    fn test_location_subst() {
        let t = top("<a>x</a>");
        let a = t.get_subnode(Step::Child(0));
        let edited = a
            .subst(vec![(vec![Step::Child(-1)], Replacement::Node(Node::from("w")))])
            .unwrap();
        assert_eq!(edited.path(), "doc()/a");
        assert_eq!(edited.node().unwrap().extract_text().to_plain_string(), "wx");
    }
}
