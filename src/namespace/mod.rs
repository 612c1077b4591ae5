//! Namespace contexts.
//!
//! A [`Context`] is an immutable mapping from namespace prefix to URI. The
//! `None` prefix stands for the default namespace and an empty URI means the
//! prefix is explicitly unbound. Contexts are never mutated: declaring
//! namespaces on an element derives a new context by overlaying the
//! declarations onto the inherited one.
//!
//! See <https://www.w3.org/TR/xml-names/#scoping-defaulting>

mod name;

pub use name::Name;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::util::qname::is_nmtoken;

/// The URI permanently bound to the `xml` prefix.
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// The XHTML namespace, the default namespace of documents parsed as HTML.
pub const XHTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";

type Mapping = BTreeMap<Option<String>, String>;

/// An immutable prefix → URI mapping with default-namespace semantics.
///
/// Two contexts are equal iff their mappings are equal. Cloning is cheap;
/// the mapping is shared.
///
/// # Examples
///
/// ```
/// use tagmend::namespace::{Context, XHTML_NAMESPACE};
///
/// let ctx = Context::html();
/// assert_eq!(ctx.namespace_uri(None), Some(XHTML_NAMESPACE));
///
/// let derived = ctx.with_declarations([(Some("x"), "urn:x")]).unwrap();
/// assert_eq!(derived.namespace_uri(Some("x")), Some("urn:x"));
/// assert_eq!(ctx.namespace_uri(Some("x")), None);
/// ```
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Context(Arc<Mapping>);

impl Context {
    /// The default context: only the `xml` prefix is bound.
    #[must_use]
    pub fn new() -> Self {
        let mut map = Mapping::new();
        map.insert(Some("xml".to_string()), XML_NAMESPACE.to_string());
        Self(Arc::new(map))
    }

    /// The context HTML documents start from: the default namespace is XHTML.
    #[must_use]
    pub fn html() -> Self {
        let mut map = Mapping::new();
        map.insert(Some("xml".to_string()), XML_NAMESPACE.to_string());
        map.insert(None, XHTML_NAMESPACE.to_string());
        Self(Arc::new(map))
    }

    /// Resolves a prefix (`None` for the default namespace) to its URI.
    ///
    /// Returns `None` when the prefix was never declared, and `Some("")`
    /// when it was explicitly unbound.
    #[must_use]
    pub fn namespace_uri(&self, prefix: Option<&str>) -> Option<&str> {
        // BTreeMap<Option<String>, _> cannot be queried with Option<&str>.
        self.0
            .iter()
            .find(|(k, _)| k.as_deref() == prefix)
            .map(|(_, v)| v.as_str())
    }

    /// Alias of [`namespace_uri`](Self::namespace_uri).
    #[must_use]
    pub fn resolve(&self, prefix: Option<&str>) -> Option<&str> {
        self.namespace_uri(prefix)
    }

    /// Derives a context with `declarations` overlaid.
    ///
    /// Returns a clone of `self` (sharing its mapping) when the overlay does
    /// not change anything.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidNamespaceDeclaration`] if a prefix is not a
    /// non-empty name token.
    pub fn with_declarations<'a, I>(&self, declarations: I) -> Result<Self>
    where
        I: IntoIterator<Item = (Option<&'a str>, &'a str)>,
    {
        let mut map = (*self.0).clone();
        for (prefix, uri) in declarations {
            validate_declaration(prefix, uri)?;
            map.insert(prefix.map(str::to_string), uri.to_string());
        }
        if map == *self.0 {
            Ok(self.clone())
        } else {
            Ok(Self(Arc::new(map)))
        }
    }

    /// Iterates over `(prefix, uri)` pairs in prefix order, default first.
    pub fn namespaces(&self) -> impl Iterator<Item = (Option<&str>, &str)> {
        self.0.iter().map(|(k, v)| (k.as_deref(), v.as_str()))
    }

    /// Returns `true` if both contexts share the same mapping allocation.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.0.iter().map(|(k, v)| (k.as_deref().unwrap_or("#default"), v)))
            .finish()
    }
}

fn validate_declaration(prefix: Option<&str>, uri: &str) -> Result<()> {
    match prefix {
        Some(p) if !is_nmtoken(p) || p == "xmlns" => Err(Error::InvalidNamespaceDeclaration {
            prefix: Some(p.to_string()),
            uri: uri.to_string(),
        }),
        _ => Ok(()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_context_binds_xml_only() {
        let ctx = Context::new();
        assert_eq!(ctx.namespace_uri(Some("xml")), Some(XML_NAMESPACE));
        assert_eq!(ctx.namespace_uri(None), None);
    }

    #[test]
    fn test_html_context_has_xhtml_default() {
        assert_eq!(Context::html().namespace_uri(None), Some(XHTML_NAMESPACE));
    }

    #[test]
    fn test_identical_overlay_returns_same_mapping() {
        let ctx = Context::html();
        let same = ctx.with_declarations([(None, XHTML_NAMESPACE)]).unwrap();
        assert!(same.ptr_eq(&ctx));
    }

    #[test]
    fn test_overlay_derives_new_context() {
        let ctx = Context::new();
        let derived = ctx.with_declarations([(Some("a"), "urn:a")]).unwrap();
        assert_ne!(derived, ctx);
        assert_eq!(derived.namespace_uri(Some("a")), Some("urn:a"));
    }

    #[test]
    fn test_equal_mappings_are_equal_contexts() {
        let a = Context::new().with_declarations([(None, XHTML_NAMESPACE)]).unwrap();
        assert_eq!(a, Context::html());
    }

    #[test]
    fn test_empty_uri_unbinds() {
        let ctx = Context::html().with_declarations([(None, "")]).unwrap();
        assert_eq!(ctx.namespace_uri(None), Some(""));
    }

    #[test]
    fn test_later_declaration_wins() {
        let ctx = Context::new()
            .with_declarations([(Some("p"), "urn:1"), (Some("p"), "urn:2")])
            .unwrap();
        assert_eq!(ctx.namespace_uri(Some("p")), Some("urn:2"));
    }

    #[test]
    fn test_invalid_prefix_rejected() {
        let err = Context::new().with_declarations([(Some("a b"), "urn:x")]);
        assert!(matches!(err, Err(Error::InvalidNamespaceDeclaration { .. })));
        let err = Context::new().with_declarations([(Some(""), "urn:x")]);
        assert!(matches!(err, Err(Error::InvalidNamespaceDeclaration { .. })));
    }
}
