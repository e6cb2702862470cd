//! Namespace handling for elements and attributes.

use std::collections::HashMap;
use std::sync::Arc;

/// An expanded XML name: optional namespace URI plus local name.
///
/// Namespace URIs are interned as `Arc<str>` so a document full of
/// same-namespace elements shares one allocation and stays `Send + Sync`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QName {
    /// The namespace URI, or `None` when the name is unqualified.
    pub(crate) namespace: Option<Arc<str>>,
    /// The local part of the name (without prefix).
    pub(crate) local: String,
}

impl QName {
    /// Creates a qualified name.
    pub(crate) fn new(namespace: Option<Arc<str>>, local: impl Into<String>) -> Self {
        QName {
            namespace,
            local: local.into(),
        }
    }

    /// Creates a name with no namespace.
    pub(crate) fn unqualified(local: impl Into<String>) -> Self {
        QName {
            namespace: None,
            local: local.into(),
        }
    }

    /// The local part of the name.
    pub fn local(&self) -> &str {
        &self.local
    }

    /// The namespace URI, if any.
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Exact match on (namespace, local name).
    pub(crate) fn matches(&self, local: &str, namespace: Option<&str>) -> bool {
        self.local == local && self.namespace.as_deref() == namespace
    }
}

impl std::fmt::Display for QName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.namespace {
            Some(uri) => write!(f, "{{{}}}{}", uri, self.local),
            None => f.write_str(&self.local),
        }
    }
}

/// Tracks prefix -> URI bindings while the tree is being built.
pub(crate) struct NamespaceScope {
    /// URI interning cache.
    uri_cache: HashMap<String, Arc<str>>,
    /// Stack of scopes, one per open element, each prefix -> URI.
    scopes: Vec<HashMap<String, Arc<str>>>,
}

impl NamespaceScope {
    /// Creates a scope stack with the `xml` prefix pre-bound.
    pub(crate) fn new() -> Self {
        let mut scope = NamespaceScope {
            uri_cache: HashMap::new(),
            scopes: vec![HashMap::new()],
        };
        scope.bind("xml", "http://www.w3.org/XML/1998/namespace");
        scope
    }

    /// Pushes a scope when entering an element.
    pub(crate) fn push(&mut self) {
        self.scopes.push(HashMap::new());
    }

    /// Pops the current scope when leaving an element.
    pub(crate) fn pop(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    /// Binds a prefix (or `""` for the default namespace) in the current scope.
    pub(crate) fn bind(&mut self, prefix: &str, uri: &str) -> Arc<str> {
        let interned = self.intern(uri);
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(prefix.to_string(), interned.clone());
        }
        interned
    }

    /// Resolves a prefix, innermost scope first.
    pub(crate) fn resolve(&self, prefix: &str) -> Option<Arc<str>> {
        for scope in self.scopes.iter().rev() {
            if let Some(uri) = scope.get(prefix) {
                return Some(uri.clone());
            }
        }
        None
    }

    /// Returns the in-scope default namespace, if one is bound.
    pub(crate) fn default_namespace(&self) -> Option<Arc<str>> {
        self.resolve("")
    }

    fn intern(&mut self, uri: &str) -> Arc<str> {
        if let Some(cached) = self.uri_cache.get(uri) {
            cached.clone()
        } else {
            let interned: Arc<str> = uri.into();
            self.uri_cache.insert(uri.to_string(), interned.clone());
            interned
        }
    }
}

/// Splits a qualified name into optional prefix and local name.
pub(crate) fn split_qname(qname: &str) -> (Option<&str>, &str) {
    match qname.find(':') {
        Some(pos) => (Some(&qname[..pos]), &qname[pos + 1..]),
        None => (None, qname),
    }
}

/// Returns the declared prefix when the attribute is a namespace
/// declaration: `Some("")` for `xmlns`, `Some("p")` for `xmlns:p`.
pub(crate) fn xmlns_prefix(attr_name: &str) -> Option<&str> {
    if attr_name == "xmlns" {
        Some("")
    } else {
        attr_name.strip_prefix("xmlns:")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_qname() {
        assert_eq!(split_qname("svg:rect"), (Some("svg"), "rect"));
        assert_eq!(split_qname("rect"), (None, "rect"));
        assert_eq!(split_qname("a:b:c"), (Some("a"), "b:c"));
    }

    #[test]
    fn test_xmlns_prefix() {
        assert_eq!(xmlns_prefix("xmlns"), Some(""));
        assert_eq!(xmlns_prefix("xmlns:svg"), Some("svg"));
        assert_eq!(xmlns_prefix("xml:space"), None);
        assert_eq!(xmlns_prefix("href"), None);
    }

    #[test]
    fn test_scope_push_pop() {
        let mut scope = NamespaceScope::new();
        scope.push();
        scope.bind("svg", "http://www.w3.org/2000/svg");
        assert_eq!(
            scope.resolve("svg").as_deref(),
            Some("http://www.w3.org/2000/svg")
        );

        scope.pop();
        assert!(scope.resolve("svg").is_none());
    }

    #[test]
    fn test_xml_prefix_always_bound() {
        let scope = NamespaceScope::new();
        assert_eq!(
            scope.resolve("xml").as_deref(),
            Some("http://www.w3.org/XML/1998/namespace")
        );
    }

    #[test]
    fn test_default_namespace() {
        let mut scope = NamespaceScope::new();
        assert!(scope.default_namespace().is_none());

        scope.push();
        scope.bind("", "http://www.w3.org/1999/xhtml");
        assert_eq!(
            scope.default_namespace().as_deref(),
            Some("http://www.w3.org/1999/xhtml")
        );

        scope.pop();
        assert!(scope.default_namespace().is_none());
    }

    #[test]
    fn test_inner_scope_shadows_outer() {
        let mut scope = NamespaceScope::new();
        scope.push();
        scope.bind("a", "http://example.com/outer");
        scope.push();
        scope.bind("a", "http://example.com/inner");

        assert_eq!(
            scope.resolve("a").as_deref(),
            Some("http://example.com/inner")
        );
        scope.pop();
        assert_eq!(
            scope.resolve("a").as_deref(),
            Some("http://example.com/outer")
        );
    }

    #[test]
    fn test_uri_interning_shares_allocation() {
        let mut scope = NamespaceScope::new();
        let a = scope.bind("a", "http://example.com/ns");
        scope.push();
        let b = scope.bind("b", "http://example.com/ns");
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_qname_matches() {
        let plain = QName::unqualified("item");
        assert!(plain.matches("item", None));
        assert!(!plain.matches("item", Some("http://example.com/ns")));

        let qualified = QName::new(Some("http://example.com/ns".into()), "item");
        assert!(qualified.matches("item", Some("http://example.com/ns")));
        assert!(!qualified.matches("item", None));
    }
}
