//! Canonical element and attribute names.
//!
//! A [`Name`] is the triple `(prefix, uri, local)`. The prefix is kept only
//! to reproduce the lexical spelling; node equality compares the universal
//! name `(uri, local)`.

use std::fmt;
use std::sync::Arc;

use super::Context;
use crate::error::{Error, Result};
use crate::util::qname::{is_nmtoken, split_braced_uri, split_qname};

#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
struct NameData {
    prefix: Option<String>,
    uri: Option<String>,
    local: Option<String>,
}

/// An immutable `(namespace-prefix, namespace-uri, local-name)` triple.
///
/// Namespace declarations (`xmlns`, `xmlns:p`) are represented by the
/// reserved pseudo-name with prefix `xmlns` and no URI; the declared prefix,
/// if any, is the local name.
///
/// # Examples
///
/// ```
/// use tagmend::namespace::{Context, Name};
///
/// let ctx = Context::new().with_declarations([(Some("svg"), "urn:svg")]).unwrap();
/// let name = Name::parse_element_name("svg:rect", &ctx).unwrap();
/// assert_eq!(name.universal_name(), "{urn:svg}rect");
/// assert_eq!(name.qualified_name(), "svg:rect");
/// ```
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Name(Arc<NameData>);

impl Name {
    /// Creates a name after validating the triple.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidName`] if the prefix or local name is not a
    /// name token, if an `xmlns` name carries a URI, or if any other name
    /// lacks a URI or a local name.
    pub fn new(prefix: Option<&str>, uri: Option<&str>, local: Option<&str>) -> Result<Self> {
        if let Some(p) = prefix {
            if !is_nmtoken(p) {
                return Err(invalid(p, "namespace prefix is not a name token"));
            }
        }
        if let Some(l) = local {
            if !is_nmtoken(l) {
                return Err(invalid(l, "local name is not a name token"));
            }
        }
        if prefix == Some("xmlns") {
            if uri.is_some() {
                return Err(invalid(
                    &qualified(prefix, local),
                    "namespace declaration name must not have a namespace URI",
                ));
            }
        } else {
            if uri.is_none() {
                return Err(invalid(&qualified(prefix, local), "missing namespace URI"));
            }
            if local.is_none() {
                return Err(invalid(prefix.unwrap_or(""), "missing local name"));
            }
        }
        Ok(Self(Arc::new(NameData {
            prefix: prefix.map(str::to_string),
            uri: uri.map(str::to_string),
            local: local.map(str::to_string),
        })))
    }

    /// The namespace-declaration pseudo-name: `xmlns` when `prefix` is
    /// `None`, `xmlns:prefix` otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidName`] if `prefix` is not a name token.
    pub fn xmlns(prefix: Option<&str>) -> Result<Self> {
        Self::new(Some("xmlns"), None, prefix)
    }

    /// Resolves an element name against `context`.
    ///
    /// - `{uri}local` and `{uri}p:local` use `uri` directly.
    /// - `p:local` uses the URI bound to `p` when it is non-empty.
    /// - Anything else (including `p:local` with `p` unbound) becomes a local
    ///   name in the default namespace, or in no namespace (`""`).
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidName`] if the parts are not name tokens.
    pub fn parse_element_name(text: &str, context: &Context) -> Result<Self> {
        if let Some((uri, rest)) = split_braced_uri(text) {
            let (prefix, local) = split_qname(rest);
            return Self::new(prefix, Some(uri), Some(local));
        }
        if let (Some(prefix), local) = split_qname(text) {
            if let Some(uri) = context.namespace_uri(Some(prefix)).filter(|u| !u.is_empty()) {
                return Self::new(Some(prefix), Some(uri), Some(local));
            }
        }
        let uri = context.namespace_uri(None).unwrap_or("");
        Self::new(None, Some(uri), Some(text))
    }

    /// Resolves an attribute name against `context`.
    ///
    /// `xmlns` and `xmlns:p` map to the namespace-declaration pseudo-name.
    /// Unprefixed attributes are in no namespace; the default namespace does
    /// not apply to them.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnprefixedGlobalAttribute`] for `{uri}local` with a
    /// non-empty URI and no prefix, and [`Error::InvalidName`] if the parts
    /// are not name tokens.
    pub fn parse_attribute_name(text: &str, context: &Context) -> Result<Self> {
        if text == "xmlns" {
            return Self::xmlns(None);
        }
        if let Some(prefix) = text.strip_prefix("xmlns:") {
            return Self::xmlns(Some(prefix));
        }
        if let Some((uri, rest)) = split_braced_uri(text) {
            let (prefix, local) = split_qname(rest);
            let name = Self::new(prefix, Some(uri), Some(local))?;
            name.check_global_attribute()?;
            return Ok(name);
        }
        if let (Some(prefix), local) = split_qname(text) {
            if let Some(uri) = context.namespace_uri(Some(prefix)).filter(|u| !u.is_empty()) {
                return Self::new(Some(prefix), Some(uri), Some(local));
            }
        }
        Self::new(None, Some(""), Some(text))
    }

    /// Rejects attribute names in a non-empty namespace without a prefix.
    pub(crate) fn check_global_attribute(&self) -> Result<()> {
        if self.0.prefix.is_none() && self.0.uri.as_deref().is_some_and(|u| !u.is_empty()) {
            return Err(Error::UnprefixedGlobalAttribute {
                name: self.universal_name(),
            });
        }
        Ok(())
    }

    /// The lexical prefix, if any.
    #[must_use]
    pub fn namespace_prefix(&self) -> Option<&str> {
        self.0.prefix.as_deref()
    }

    /// The namespace URI (`None` only for namespace declarations).
    #[must_use]
    pub fn namespace_uri(&self) -> Option<&str> {
        self.0.uri.as_deref()
    }

    /// The local part (`None` only for the bare `xmlns` declaration).
    #[must_use]
    pub fn local_name(&self) -> Option<&str> {
        self.0.local.as_deref()
    }

    /// Returns `true` for the namespace-declaration pseudo-name.
    #[must_use]
    pub fn is_xmlns(&self) -> bool {
        self.0.prefix.as_deref() == Some("xmlns") && self.0.uri.is_none()
    }

    /// `{uri}local`, or `local` when the URI is empty.
    #[must_use]
    pub fn universal_name(&self) -> String {
        if self.is_xmlns() {
            return self.qualified_name();
        }
        let local = self.0.local.as_deref().unwrap_or("");
        match self.0.uri.as_deref() {
            Some(uri) if !uri.is_empty() => format!("{{{uri}}}{local}"),
            _ => local.to_string(),
        }
    }

    /// The lexical `prefix:local` (or bare `local`) spelling.
    #[must_use]
    pub fn qualified_name(&self) -> String {
        qualified(self.0.prefix.as_deref(), self.0.local.as_deref())
    }

    /// Compares universal names.
    ///
    /// Namespace declarations compare by declared prefix only; other names
    /// compare by `(uri, local)`.
    #[must_use]
    pub fn universal_eq(&self, other: &Self) -> bool {
        match (self.is_xmlns(), other.is_xmlns()) {
            (true, true) => self.0.local == other.0.local,
            (false, false) => self.0.uri == other.0.uri && self.0.local == other.0.local,
            _ => false,
        }
    }

    /// Returns `true` if `text` spells this name universally or lexically.
    #[must_use]
    pub fn matches(&self, text: &str) -> bool {
        text == self.universal_name() || text == self.qualified_name()
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_xmlns() {
            write!(f, "Name({})", self.qualified_name())
        } else {
            match self.namespace_prefix() {
                Some(p) => write!(f, "Name({p}{{{}}}", self.namespace_uri().unwrap_or(""))?,
                None => write!(f, "Name({{{}}}", self.namespace_uri().unwrap_or(""))?,
            }
            write!(f, "{})", self.local_name().unwrap_or(""))
        }
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.qualified_name())
    }
}

fn qualified(prefix: Option<&str>, local: Option<&str>) -> String {
    match (prefix, local) {
        (Some(p), Some(l)) => format!("{p}:{l}"),
        (Some(p), None) => p.to_string(),
        (None, Some(l)) => l.to_string(),
        (None, None) => String::new(),
    }
}

fn invalid(name: &str, reason: &'static str) -> Error {
    Error::InvalidName {
        name: name.to_string(),
        reason,
    }
}
