//! Elements and start tags.

use std::collections::BTreeMap;

use super::{Node, RawSpan, Replacement, Step, Text};
use crate::error::{Error, Result};
use crate::namespace::{Context, Name};
use crate::util::intern::Interner;
use crate::util::qname::{is_nmtoken, split_braced_uri};

/// An element or attribute name as a caller supplies it: either text to be
/// resolved against the namespace context, or an already resolved [`Name`].
#[derive(Debug, Clone)]
pub enum NameArg {
    /// `prefix:local`, `local`, or `{uri}local` text.
    Text(String),
    /// A resolved name.
    Name(Name),
}

impl From<&str> for NameArg {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for NameArg {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<Name> for NameArg {
    fn from(name: Name) -> Self {
        Self::Name(name)
    }
}

impl From<&Name> for NameArg {
    fn from(name: &Name) -> Self {
        Self::Name(name.clone())
    }
}

/// A resolved start tag: the element name, its attributes, and the
/// namespace context in force inside the element.
#[derive(Debug, Clone)]
pub struct StartTag {
    name: Name,
    attributes: Vec<(Name, Text)>,
    context: Context,
    inherited_context: Context,
    pub(crate) raw: Option<RawSpan>,
}

/// `(Name?\{.*\})?Nmtoken`
fn is_lexical_name(text: &str) -> bool {
    match split_braced_uri(text) {
        Some((_, rest)) => is_nmtoken(rest),
        None => is_nmtoken(text),
    }
}

fn declared_prefix(arg: &NameArg) -> Option<Option<String>> {
    match arg {
        NameArg::Text(t) if t == "xmlns" => Some(None),
        NameArg::Text(t) => t.strip_prefix("xmlns:").map(|p| Some(p.to_string())),
        NameArg::Name(n) if n.is_xmlns() => Some(n.local_name().map(str::to_string)),
        NameArg::Name(_) => None,
    }
}

fn bind(bindings: &mut BTreeMap<Option<String>, String>, prefix: Option<&str>, uri: &str) -> Result<()> {
    match bindings.get(&prefix.map(str::to_string)) {
        Some(first) if first != uri => Err(Error::InconsistentNamespaceUse {
            prefix: prefix.unwrap_or_default().to_string(),
            first: first.clone(),
            second: uri.to_string(),
        }),
        Some(_) => Ok(()),
        None => {
            bindings.insert(prefix.map(str::to_string), uri.to_string());
            Ok(())
        }
    }
}

impl StartTag {
    /// Assembles a start tag.
    ///
    /// `xmlns` attributes declare namespaces; resolved names carrying a
    /// prefix bind that prefix too. The element's context is `inherited`
    /// with all of those overlaid, and text names are resolved against it.
    /// Of duplicate attributes the first wins.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidName`] for a text name that is not a name token.
    /// - [`Error::InconsistentNamespaceUse`] when one prefix is bound to two
    ///   URIs, by declarations or by resolved names.
    /// - [`Error::UnprefixedGlobalAttribute`] for a resolved attribute name in
    ///   a namespace but without a prefix.
    pub fn build(
        name: NameArg,
        attributes: Vec<(NameArg, Text)>,
        inherited: &Context,
        interner: &mut Interner,
    ) -> Result<Self> {
        for (arg, _) in &attributes {
            if let NameArg::Text(text) = arg {
                if !is_lexical_name(text) {
                    return Err(Error::InvalidName {
                        name: text.clone(),
                        reason: "attribute name is not a name token",
                    });
                }
            }
        }

        let mut declarations: BTreeMap<Option<String>, String> = BTreeMap::new();
        for (arg, value) in &attributes {
            if let Some(prefix) = declared_prefix(arg) {
                declarations
                    .entry(prefix)
                    .or_insert_with(|| value.to_plain_string());
            }
        }

        let mut bindings = BTreeMap::new();
        if let NameArg::Name(n) = &name {
            match (n.namespace_prefix(), n.namespace_uri()) {
                (Some(prefix), Some(uri)) if !uri.is_empty() => {
                    bind(&mut bindings, Some(prefix), uri)?;
                }
                (None, Some(uri)) => bind(&mut bindings, None, uri)?,
                _ => {}
            }
        }
        for (arg, _) in &attributes {
            if let NameArg::Name(n) = arg {
                if let (Some(prefix), Some(uri)) = (n.namespace_prefix(), n.namespace_uri()) {
                    if !n.is_xmlns() && !uri.is_empty() {
                        bind(&mut bindings, Some(prefix), uri)?;
                    }
                }
            }
        }
        for (prefix, uri) in &bindings {
            if let Some(declared) = declarations.get(prefix) {
                if declared != uri {
                    return Err(Error::InconsistentNamespaceUse {
                        prefix: prefix.clone().unwrap_or_default(),
                        first: declared.clone(),
                        second: uri.clone(),
                    });
                }
            }
        }
        for (prefix, uri) in bindings {
            declarations.entry(prefix).or_insert(uri);
        }

        let context = inherited.with_declarations(
            declarations
                .iter()
                .map(|(p, u)| (p.as_deref(), u.as_str())),
        )?;
        let context = interner.context(context);

        let name = match name {
            NameArg::Text(text) => interner.element_name(&text, &context)?,
            NameArg::Name(n) => n,
        };
        let mut resolved: Vec<(Name, Text)> = Vec::with_capacity(attributes.len());
        for (arg, value) in attributes {
            let attr = match arg {
                NameArg::Text(text) => interner.attribute_name(&text, &context)?,
                NameArg::Name(n) => {
                    n.check_global_attribute()?;
                    n
                }
            };
            if resolved.iter().any(|(seen, _)| seen.universal_eq(&attr)) {
                log::trace!("duplicate attribute {attr} dropped");
                continue;
            }
            resolved.push((attr, value));
        }

        Ok(Self {
            name,
            attributes: resolved,
            context,
            inherited_context: inherited.clone(),
            raw: None,
        })
    }

    /// The element name.
    #[must_use]
    pub fn name(&self) -> &Name {
        &self.name
    }

    /// Attributes in document order, namespace declarations included.
    #[must_use]
    pub fn attributes(&self) -> &[(Name, Text)] {
        &self.attributes
    }

    /// The namespace context in force inside the element.
    #[must_use]
    pub fn context(&self) -> &Context {
        &self.context
    }

    /// The namespace context the element was built in.
    #[must_use]
    pub fn inherited_context(&self) -> &Context {
        &self.inherited_context
    }

    /// Rebuilds the tag with a new attribute list, re-resolving the context.
    fn with_attributes(&self, attributes: Vec<(Name, Text)>) -> Result<Self> {
        Self::build(
            NameArg::Name(self.name.clone()),
            attributes
                .into_iter()
                .map(|(n, v)| (NameArg::Name(n), v))
                .collect(),
            &self.inherited_context,
            &mut Interner::new(),
        )
    }
}

impl PartialEq for StartTag {
    fn eq(&self, other: &Self) -> bool {
        self.name.universal_eq(&other.name)
            && self.attributes.len() == other.attributes.len()
            && self
                .attributes
                .iter()
                .zip(&other.attributes)
                .all(|((a, x), (b, y))| a.universal_eq(b) && x == y)
    }
}

impl Eq for StartTag {}

/// An element: a start tag, children, and whether it has an end tag.
///
/// An element is *empty* when it has no children and no end tag. Parsed
/// `<p></p>` is not empty; parsed `<br>` and `<br/>` are.
#[derive(Debug, Clone)]
pub struct Element {
    stag: StartTag,
    children: Vec<Node>,
    closed: bool,
    pub(crate) etag: Option<RawSpan>,
}

pub(crate) fn check_children(children: &[Node]) -> Result<()> {
    if children.iter().any(|c| matches!(c, Node::Document(_))) {
        return Err(Error::InvalidSubstitution {
            reason: "a document cannot be a child node".to_string(),
        });
    }
    Ok(())
}

impl Element {
    /// Creates an element in the default context.
    ///
    /// # Examples
    ///
    /// ```
    /// use tagmend::tree::{Element, Node, Text};
    ///
    /// let a = Element::new("a", vec![("href", Text::new("/x"))], vec![Node::from("link")]).unwrap();
    /// assert_eq!(a.attribute_value("href").as_deref(), Some("/x"));
    /// ```
    ///
    /// # Errors
    ///
    /// See [`StartTag::build`]. A [`Node::Document`] child is rejected with
    /// [`Error::InvalidSubstitution`].
    pub fn new<N, A>(name: N, attributes: Vec<(A, Text)>, children: Vec<Node>) -> Result<Self>
    where
        N: Into<NameArg>,
        A: Into<NameArg>,
    {
        Self::new_in(name, attributes, children, &Context::new())
    }

    /// Creates an element inheriting `context`.
    ///
    /// # Errors
    ///
    /// As for [`new`](Self::new).
    pub fn new_in<N, A>(
        name: N,
        attributes: Vec<(A, Text)>,
        children: Vec<Node>,
        context: &Context,
    ) -> Result<Self>
    where
        N: Into<NameArg>,
        A: Into<NameArg>,
    {
        let attributes = attributes.into_iter().map(|(n, v)| (n.into(), v)).collect();
        let stag = StartTag::build(name.into(), attributes, context, &mut Interner::new())?;
        Self::from_parts(stag, children, None)
    }

    /// Creates an element from a built start tag. Without an end tag and
    /// without children the element is empty.
    ///
    /// # Errors
    ///
    /// Rejects a [`Node::Document`] child.
    pub fn from_parts(stag: StartTag, children: Vec<Node>, etag: Option<RawSpan>) -> Result<Self> {
        check_children(&children)?;
        Ok(Self {
            closed: etag.is_some(),
            stag,
            children,
            etag,
        })
    }

    /// The start tag.
    #[must_use]
    pub fn stag(&self) -> &StartTag {
        &self.stag
    }

    /// The element name.
    #[must_use]
    pub fn name(&self) -> &Name {
        &self.stag.name
    }

    /// The child nodes.
    #[must_use]
    pub fn children(&self) -> &[Node] {
        &self.children
    }

    /// Returns `true` for an element without children or end tag.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.children.is_empty() && !self.closed
    }

    /// The namespace context in force inside the element.
    #[must_use]
    pub fn context(&self) -> &Context {
        &self.stag.context
    }

    /// Looks up an attribute by universal or qualified name.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&Text> {
        self.stag
            .attributes
            .iter()
            .find(|(n, _)| n.matches(name))
            .map(|(_, v)| v)
    }

    /// An attribute's value as plain text.
    #[must_use]
    pub fn attribute_value(&self, name: &str) -> Option<String> {
        self.attribute(name).map(Text::to_plain_string)
    }

    /// Applies one level of substitutions.
    ///
    /// Child steps replace the child at that index; a negative index inserts
    /// before the first child and an index past the end appends. Attribute
    /// steps set or delete attributes; several values for one attribute are
    /// concatenated in order. A delete and a value for the same attribute in
    /// one call conflict.
    ///
    /// Edited attributes rebuild the start tag against the inherited context,
    /// dropping its recorded source. So does a child edit that makes the
    /// element gain or lose emptiness.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidSubstitution`] if an attribute receives anything but
    ///   text, or a child replacement contains a document.
    /// - [`Error::ConflictingSubstitution`] if one attribute is both deleted
    ///   and given a value.
    /// - Errors of [`StartTag::build`] for the edited attribute list, notably
    ///   [`Error::InconsistentNamespaceUse`].
    pub fn subst_subnode(&self, pairs: Vec<(Step, Replacement)>) -> Result<Self> {
        let mut attribute_edits: Vec<(Name, Option<Vec<Text>>)> = Vec::new();
        let mut child_edits = Vec::new();
        for (step, replacement) in pairs {
            match step {
                Step::Child(i) => child_edits.push((i, replacement)),
                Step::Attribute(name) => {
                    let texts = attribute_texts(replacement)?;
                    match attribute_edits.iter_mut().find(|(n, _)| n.universal_eq(&name)) {
                        Some((_, slot)) => match (slot, texts) {
                            (Some(existing), Some(more)) => existing.extend(more),
                            (None, None) => {}
                            _ => {
                                return Err(Error::ConflictingSubstitution {
                                    path: format!("[{}]", Step::Attribute(name)),
                                });
                            }
                        },
                        None => attribute_edits.push((name, texts)),
                    }
                }
            }
        }

        let stag = if attribute_edits.is_empty() {
            self.stag.clone()
        } else {
            let mut attributes = self.stag.attributes.clone();
            for (name, texts) in attribute_edits {
                let position = attributes.iter().position(|(n, _)| n.universal_eq(&name));
                match (texts, position) {
                    (Some(texts), Some(i)) => attributes[i].1 = Text::concat(&texts),
                    (Some(texts), None) => attributes.push((name, Text::concat(&texts))),
                    (None, Some(i)) => {
                        attributes.remove(i);
                    }
                    (None, None) => {}
                }
            }
            self.stag.with_attributes(attributes)?
        };

        let children = if child_edits.is_empty() {
            self.children.clone()
        } else {
            splice_children(&self.children, child_edits)
        };
        check_children(&children)?;
        let mut rebuilt = Self {
            stag,
            children,
            closed: self.closed,
            etag: self.etag.clone(),
        };
        if rebuilt.is_empty() != self.is_empty() {
            rebuilt.stag.raw = None;
        }
        if rebuilt.stag.raw.is_none() {
            rebuilt.etag = None;
        }
        Ok(rebuilt)
    }
}

impl PartialEq for Element {
    fn eq(&self, other: &Self) -> bool {
        self.stag == other.stag
            && self.is_empty() == other.is_empty()
            && self.children == other.children
    }
}

impl Eq for Element {}

/// Text values for an attribute step; `None` deletes.
fn attribute_texts(replacement: Replacement) -> Result<Option<Vec<Text>>> {
    let not_text = || Error::InvalidSubstitution {
        reason: "only text can be placed in an attribute".to_string(),
    };
    match replacement {
        Replacement::Delete => Ok(None),
        Replacement::Node(Node::Text(t)) => Ok(Some(vec![t])),
        Replacement::Node(_) => Err(not_text()),
        Replacement::Nodes(nodes) => nodes
            .into_iter()
            .map(|n| match n {
                Node::Text(t) => Ok(t),
                _ => Err(not_text()),
            })
            .collect::<Result<Vec<_>>>()
            .map(Some),
    }
}

/// Applies child-index edits in index order.
pub(crate) fn splice_children(children: &[Node], edits: Vec<(isize, Replacement)>) -> Vec<Node> {
    let mut by_index: BTreeMap<isize, Vec<Replacement>> = BTreeMap::new();
    for (index, replacement) in edits {
        by_index.entry(index).or_default().push(replacement);
    }
    let mut slots: Vec<Vec<Node>> = children.iter().map(|c| vec![c.clone()]).collect();
    let mut before = Vec::new();
    let mut after = Vec::new();
    for (index, replacements) in by_index {
        let nodes: Vec<Node> = replacements.into_iter().flat_map(Replacement::into_nodes).collect();
        match usize::try_from(index) {
            Err(_) => before.extend(nodes),
            Ok(i) if i >= slots.len() => after.extend(nodes),
            Ok(i) => slots[i] = nodes,
        }
    }
    before
        .into_iter()
        .chain(slots.into_iter().flatten())
        .chain(after)
        .collect()
}
