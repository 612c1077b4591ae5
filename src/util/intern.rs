//! Caller-owned interning of names and namespace contexts.
//!
//! Tag-soup documents repeat the same handful of tag names thousands of
//! times. The [`Interner`] makes every repetition of a resolved name share one
//! allocation, and every element that declares the same namespaces share one
//! [`Context`]. Interning affects memory use only; the values it returns are
//! equal to freshly built ones.
//!
//! An interner is owned by the caller and passed to
//! [`parse_with_options`](crate::parser::parse_with_options). It is not
//! shared between threads; build one per thread, or one per parse.

use std::collections::HashMap;

use crate::error::Result;
use crate::namespace::{Context, Name};

type NameKey = (Option<String>, Option<String>, Option<String>);

/// Interning caches for [`Name`] and [`Context`] values.
///
/// # Examples
///
/// ```
/// use tagmend::namespace::Context;
/// use tagmend::util::intern::Interner;
///
/// let mut interner = Interner::new();
/// let ctx = Context::html();
/// let a = interner.element_name("p", &ctx).unwrap();
/// let b = interner.element_name("p", &ctx).unwrap();
/// assert_eq!(a, b);
/// assert_eq!(interner.len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct Interner {
    names: HashMap<NameKey, Name>,
    contexts: HashMap<Context, Context>,
    element_names: HashMap<(String, Context), Name>,
    attribute_names: HashMap<(String, Context), Name>,
}

impl Interner {
    /// Creates an empty interner.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the shared [`Name`] for a triple, constructing it on first use.
    ///
    /// # Errors
    ///
    /// Propagates the validation errors of [`Name::new`].
    pub fn name(
        &mut self,
        prefix: Option<&str>,
        uri: Option<&str>,
        local: Option<&str>,
    ) -> Result<Name> {
        let key = (
            prefix.map(str::to_string),
            uri.map(str::to_string),
            local.map(str::to_string),
        );
        if let Some(name) = self.names.get(&key) {
            return Ok(name.clone());
        }
        let name = Name::new(prefix, uri, local)?;
        self.names.insert(key, name.clone());
        Ok(name)
    }

    /// Returns the shared context equal to `context`.
    pub fn context(&mut self, context: Context) -> Context {
        self.contexts
            .entry(context.clone())
            .or_insert(context)
            .clone()
    }

    /// Cached [`Name::parse_element_name`].
    ///
    /// # Errors
    ///
    /// Propagates the errors of [`Name::parse_element_name`].
    pub fn element_name(&mut self, text: &str, context: &Context) -> Result<Name> {
        let key = (text.to_string(), context.clone());
        if let Some(name) = self.element_names.get(&key) {
            return Ok(name.clone());
        }
        let parsed = Name::parse_element_name(text, context)?;
        let name = self.share(parsed)?;
        self.element_names.insert(key, name.clone());
        Ok(name)
    }

    /// Cached [`Name::parse_attribute_name`].
    ///
    /// # Errors
    ///
    /// Propagates the errors of [`Name::parse_attribute_name`].
    pub fn attribute_name(&mut self, text: &str, context: &Context) -> Result<Name> {
        let key = (text.to_string(), context.clone());
        if let Some(name) = self.attribute_names.get(&key) {
            return Ok(name.clone());
        }
        let parsed = Name::parse_attribute_name(text, context)?;
        let name = self.share(parsed)?;
        self.attribute_names.insert(key, name.clone());
        Ok(name)
    }

    /// Number of distinct names interned.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Returns `true` if nothing has been interned yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty() && self.contexts.is_empty()
    }

    fn share(&mut self, name: Name) -> Result<Name> {
        self.name(
            name.namespace_prefix(),
            name.namespace_uri(),
            name.local_name(),
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_same_triple_shares_allocation() {
        let mut interner = Interner::new();
        let a = interner.name(None, Some(""), Some("div")).unwrap();
        let b = interner.name(None, Some(""), Some("div")).unwrap();
        assert_eq!(a, b);
        assert_eq!(interner.len(), 1);
    }

    #[test]
    fn test_element_and_attribute_caches_are_separate() {
        let mut interner = Interner::new();
        let ctx = Context::html();
        let elem = interner.element_name("title", &ctx).unwrap();
        let attr = interner.attribute_name("title", &ctx).unwrap();
        assert_ne!(elem.namespace_uri(), attr.namespace_uri());
        assert_eq!(interner.len(), 2);
    }

    #[test]
    fn test_context_sharing() {
        let mut interner = Interner::new();
        let a = interner.context(Context::html());
        let b = interner.context(Context::html());
        assert!(a.ptr_eq(&b));
    }

    #[test]
    fn test_errors_are_not_cached() {
        let mut interner = Interner::new();
        assert!(interner.attribute_name("{urn:x}a", &Context::new()).is_err());
        assert!(interner.is_empty());
    }
}
