//! Multi-point substitution.
//!
//! [`Node::subst`] takes `(path, replacement)` pairs. The paths are merged
//! into a trie first, which is where conflicting pairs are caught; the trie
//! is then applied bottom-up with an explicit stack, rebuilding only the
//! nodes on edited paths.

use std::fmt;

use super::Node;
use crate::error::{Error, Result};
use crate::namespace::Name;

/// One step of a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// A child by index. Negative indices insert before the first child and
    /// indices past the end append.
    Child(isize),
    /// An attribute, matched by universal name.
    Attribute(Name),
}

impl Step {
    fn same(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Child(a), Self::Child(b)) => a == b,
            (Self::Attribute(a), Self::Attribute(b)) => a.universal_eq(b),
            _ => false,
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Child(i) => write!(f, "{i}"),
            Self::Attribute(name) => write!(f, "@{name}"),
        }
    }
}

impl From<isize> for Step {
    fn from(i: isize) -> Self {
        Self::Child(i)
    }
}

impl From<Name> for Step {
    fn from(name: Name) -> Self {
        Self::Attribute(name)
    }
}

/// What to put at an addressed position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Replacement {
    /// A single node.
    Node(Node),
    /// Several nodes, spliced in order.
    Nodes(Vec<Node>),
    /// Nothing: the addressed node is removed.
    Delete,
}

impl Replacement {
    pub(crate) fn into_nodes(self) -> Vec<Node> {
        match self {
            Self::Node(n) => vec![n],
            Self::Nodes(nodes) => nodes,
            Self::Delete => Vec::new(),
        }
    }
}

impl From<Node> for Replacement {
    fn from(node: Node) -> Self {
        Self::Node(node)
    }
}

#[derive(Default)]
struct Trie {
    edges: Vec<(Step, usize)>,
    values: Vec<Replacement>,
}

fn render_path(path: &[Step]) -> String {
    let steps: Vec<String> = path.iter().map(ToString::to_string).collect();
    format!("[{}]", steps.join(", "))
}

fn build_trie(pairs: Vec<(Vec<Step>, Replacement)>) -> Result<Vec<Trie>> {
    let mut trie = vec![Trie::default()];
    for (path, replacement) in pairs {
        let mut at = 0;
        for (depth, step) in path.iter().enumerate() {
            if !trie[at].values.is_empty() {
                return Err(Error::ConflictingSubstitution {
                    path: render_path(&path[..depth]),
                });
            }
            at = match trie[at].edges.iter().find(|(s, _)| s.same(step)) {
                Some(&(_, next)) => next,
                None => {
                    let next = trie.len();
                    trie.push(Trie::default());
                    trie[at].edges.push((step.clone(), next));
                    next
                }
            };
        }
        if !trie[at].edges.is_empty() {
            return Err(Error::ConflictingSubstitution {
                path: render_path(&path),
            });
        }
        trie[at].values.push(replacement);
    }
    Ok(trie)
}

struct Frame {
    trie: usize,
    node: Node,
    cursor: usize,
    pairs: Vec<(Step, Replacement)>,
}

impl Node {
    /// Rewrites the tree below this node.
    ///
    /// Each pair addresses a position by a path of [`Step`]s from this node.
    /// An empty path replaces this node itself. Several values for one
    /// attribute are concatenated in argument order; several replacements
    /// at one child index are spliced in argument order.
    ///
    /// # Errors
    ///
    /// - [`Error::ConflictingSubstitution`] if one path addresses a node and
    ///   another addresses something beneath it.
    /// - [`Error::InvalidSubstitution`] for replacing this node with anything
    ///   but exactly one node, for non-text attribute values, and for paths
    ///   that run beneath a leaf or through a missing child.
    pub fn subst(&self, pairs: Vec<(Vec<Step>, Replacement)>) -> Result<Node> {
        let mut trie = build_trie(pairs)?;
        if !trie[0].values.is_empty() {
            let mut nodes: Vec<Node> = std::mem::take(&mut trie[0].values)
                .into_iter()
                .flat_map(Replacement::into_nodes)
                .collect();
            return match (nodes.pop(), nodes.is_empty()) {
                (Some(node), true) => Ok(node),
                _ => Err(Error::InvalidSubstitution {
                    reason: "the top node must be replaced by exactly one node".to_string(),
                }),
            };
        }
        if trie[0].edges.is_empty() {
            return Ok(self.clone());
        }

        let mut stack = vec![Frame {
            trie: 0,
            node: self.clone(),
            cursor: 0,
            pairs: Vec::new(),
        }];
        while let Some(top) = stack.last_mut() {
            if top.cursor == trie[top.trie].edges.len() {
                let Some(frame) = stack.pop() else { break };
                let rebuilt = frame.node.subst_subnode(frame.pairs)?;
                match stack.last_mut() {
                    Some(parent) => {
                        let step = trie[parent.trie].edges[parent.cursor - 1].0.clone();
                        parent.pairs.push((step, Replacement::Node(rebuilt)));
                    }
                    None => return Ok(rebuilt),
                }
                continue;
            }
            let (step, child) = trie[top.trie].edges[top.cursor].clone();
            top.cursor += 1;
            if trie[child].values.is_empty() {
                let Some(node) = top.node.subnode(&step) else {
                    return Err(Error::InvalidSubstitution {
                        reason: format!("no node at step {step}"),
                    });
                };
                stack.push(Frame {
                    trie: child,
                    node,
                    cursor: 0,
                    pairs: Vec::new(),
                });
            } else {
                for value in std::mem::take(&mut trie[child].values) {
                    top.pairs.push((step.clone(), value));
                }
            }
        }
        Ok(self.clone())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn doc(s: &str) -> Node {
        Node::from(parse(s).unwrap())
    }

    fn text(node: &Node) -> String {
        node.extract_text().to_plain_string()
    }

    #[test]
    fn test_conflicting_paths() {
        let d = doc("<a><b>x</b></a>");
        for pairs in [
            vec![
                (vec![Step::Child(0)], Replacement::Delete),
                (vec![Step::Child(0), Step::Child(1)], Replacement::Delete),
            ],
            vec![
                (vec![Step::Child(0), Step::Child(1)], Replacement::Delete),
                (vec![Step::Child(0)], Replacement::Delete),
            ],
        ] {
            assert!(matches!(
                d.subst(pairs),
                Err(Error::ConflictingSubstitution { .. })
            ));
        }
    }

    #[test]
    fn test_original_is_unchanged() {
        let d = doc("<a>x</a>");
        let e = d
            .subst(vec![(
                vec![Step::Child(0), Step::Child(0)],
                Replacement::Node(Node::from("y")),
            )])
            .unwrap();
        assert_eq!(text(&d), "x");
        assert_eq!(text(&e), "y");
    }

    #[test]
    fn test_replace_with_sequence() {
        let d = doc("<a>x</a>");
        let e = d
            .subst(vec![(
                vec![Step::Child(0), Step::Child(0)],
                Replacement::Nodes(vec![Node::from("1"), Node::from("2")]),
            )])
            .unwrap();
        assert_eq!(e.children()[0].children().len(), 2);
    }

    #[test]
    fn test_sibling_edits_in_one_pass() {
        let d = doc("<a><b>1</b><c>2</c></a>");
        let e = d
            .subst(vec![
                (
                    vec![Step::Child(0), Step::Child(0), Step::Child(0)],
                    Replacement::Node(Node::from("x")),
                ),
                (
                    vec![Step::Child(0), Step::Child(1), Step::Child(0)],
                    Replacement::Node(Node::from("y")),
                ),
            ])
            .unwrap();
        assert_eq!(text(&e), "xy");
    }

    #[test]
    fn test_replace_top() {
        let d = doc("<a/>");
        let e = d
            .subst(vec![(vec![], Replacement::Node(Node::from("t")))])
            .unwrap();
        assert_eq!(e, Node::from("t"));
        assert!(matches!(
            d.subst(vec![(vec![], Replacement::Delete)]),
            Err(Error::InvalidSubstitution { .. })
        ));
    }

    #[test]
    fn test_path_through_missing_child() {
        let d = doc("<a/>");
        assert!(matches!(
            d.subst(vec![(
                vec![Step::Child(5), Step::Child(0)],
                Replacement::Delete
            )]),
            Err(Error::InvalidSubstitution { .. })
        ));
    }

    #[test]
    fn test_identical_substitution_is_idempotent() {
        let d = doc("<a>x</a>");
        let pairs = || {
            vec![(
                vec![Step::Child(0), Step::Child(0)],
                Replacement::Node(Node::from("y")),
            )]
        };
        let once = d.subst(pairs()).unwrap();
        assert_eq!(once.subst(pairs()).unwrap(), once);
    }

    #[test]
    fn test_empty_pairs_return_same_tree() {
        let d = doc("<a>x</a>");
        assert_eq!(d.subst(Vec::new()).unwrap(), d);
    }
}
