//! Tree construction from the external parser's event stream.
//!
//! Both dialects consume `quick-xml` events; the XML loop lives in
//! [`xml`], the lenient HTML loop in [`html`]. The shared [`TreeBuilder`]
//! maps events onto the arena: it keeps the stack of open elements, the
//! namespace scope, and the parse metadata, and produces the finished
//! [`Document`] in one pass. No partially built tree is ever observable:
//! the builder is consumed by `finish` or dropped on error.

pub(crate) mod html;
pub(crate) mod xml;

use std::collections::HashMap;
use std::sync::Arc;

use quick_xml::events::{BytesDecl, BytesStart};
use quick_xml::Reader;

use crate::document::{Document, ParseOptions};
use crate::error::{Error, Result};
use crate::namespace::{split_qname, xmlns_prefix, NamespaceScope, QName};
use crate::tree::{Arena, Attribute, ElementData, NodeId, NodeKind};

/// Which parsing rules apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Dialect {
    Xml,
    Html,
}

/// Incremental tree builder driven by reader events.
pub(crate) struct TreeBuilder<'i> {
    input: &'i [u8],
    dialect: Dialect,
    arena: Arena,
    scope: NamespaceScope,
    /// Stack of open element ids; the document node is the implicit bottom.
    open: Vec<NodeId>,
    /// First-wins prefix -> URI map for XPath prefix resolution.
    prefixes: HashMap<String, Arc<str>>,
    /// First default namespace seen, if any.
    default_namespace: Option<Arc<str>>,
    version: Option<String>,
    encoding: Option<String>,
}

impl<'i> TreeBuilder<'i> {
    pub(crate) fn new(input: &'i [u8], dialect: Dialect) -> Self {
        TreeBuilder {
            input,
            dialect,
            arena: Arena::new(),
            scope: NamespaceScope::new(),
            open: Vec::new(),
            prefixes: HashMap::new(),
            default_namespace: None,
            version: None,
            encoding: None,
        }
    }

    /// Builds a parse error carrying the line/column for `offset`.
    pub(crate) fn error_at(&self, offset: u64, message: impl Into<String>) -> Error {
        let (line, column) = position_at(self.input, offset as usize);
        Error::Parse {
            message: message.into(),
            line: Some(line),
            column: Some(column),
        }
    }

    fn current(&self) -> NodeId {
        self.open.last().copied().unwrap_or(NodeId::DOCUMENT)
    }

    /// True once the document node has an element child.
    fn has_root(&self) -> bool {
        self.arena
            .children(NodeId::DOCUMENT)
            .iter()
            .any(|&id| self.arena.node(id).kind.is_element())
    }

    /// The tag of the innermost open element, or "" at document level.
    pub(crate) fn current_tag(&self) -> &str {
        self.open
            .last()
            .map(|&id| self.tag_of(id))
            .unwrap_or_default()
    }

    /// The local tag name of an element node.
    pub(crate) fn tag_of(&self, id: NodeId) -> &str {
        self.arena
            .node(id)
            .kind
            .as_element()
            .map(|data| data.name.local())
            .unwrap_or_default()
    }

    /// Handles a start (or empty) tag: resolves names, records namespace
    /// declarations, and pushes the new element onto the open stack.
    pub(crate) fn open_element<R>(
        &mut self,
        e: &BytesStart,
        reader: &Reader<R>,
        pos: u64,
    ) -> Result<NodeId> {
        let decoder = reader.decoder();
        let raw_name = decoder
            .decode(e.name().as_ref())
            .map_err(|err| self.error_at(pos, err.to_string()))?
            .into_owned();

        if self.dialect == Dialect::Xml && self.open.is_empty() && self.has_root() {
            return Err(self.error_at(pos, "extra content after document element"));
        }

        // Decode every attribute before resolving names: an xmlns
        // declaration anywhere on the tag affects the whole tag. HTML
        // uses the relaxed iterator (unquoted values, bare attributes).
        let attrs = match self.dialect {
            Dialect::Xml => e.attributes(),
            Dialect::Html => e.html_attributes(),
        };
        let mut raw_attrs: Vec<(String, String)> = Vec::new();
        for attr in attrs {
            let attr = match attr {
                Ok(attr) => attr,
                Err(err) if self.dialect == Dialect::Html => {
                    log::debug!("skipping malformed HTML attribute: {err}");
                    continue;
                }
                Err(err) => return Err(self.error_at(pos, format!("attribute error: {err}"))),
            };
            let key = decoder
                .decode(attr.key.as_ref())
                .map_err(|err| self.error_at(pos, err.to_string()))?
                .into_owned();
            let raw_value = decoder
                .decode(attr.value.as_ref())
                .map_err(|err| self.error_at(pos, err.to_string()))?;
            let value = self.unescape_text(&raw_value, pos)?;
            raw_attrs.push((key, value));
        }

        self.scope.push();

        let element = match self.dialect {
            Dialect::Xml => self.resolve_element(&raw_name, raw_attrs, pos)?,
            Dialect::Html => Self::html_element(&raw_name, raw_attrs),
        };

        let id = self.arena.push(self.current(), NodeKind::Element(element));
        self.open.push(id);
        Ok(id)
    }

    /// XML name resolution: bind xmlns declarations, then expand the
    /// element and attribute names against the scope.
    fn resolve_element(
        &mut self,
        raw_name: &str,
        raw_attrs: Vec<(String, String)>,
        pos: u64,
    ) -> Result<ElementData> {
        for (key, value) in &raw_attrs {
            if let Some(prefix) = xmlns_prefix(key) {
                let uri = self.scope.bind(prefix, value);
                if prefix.is_empty() {
                    self.default_namespace.get_or_insert(uri);
                } else if !self.prefixes.contains_key(prefix) {
                    self.prefixes.insert(prefix.to_string(), uri);
                }
            }
        }

        let name = self.expand_name(raw_name, true, pos)?;
        let mut attributes = Vec::with_capacity(raw_attrs.len());
        for (key, value) in raw_attrs {
            if xmlns_prefix(&key).is_some() {
                continue;
            }
            // Default namespaces do not apply to attributes.
            let attr_name = self.expand_name(&key, false, pos)?;
            attributes.push(Attribute {
                name: attr_name,
                value,
            });
        }
        Ok(ElementData { name, attributes })
    }

    fn expand_name(&self, raw: &str, use_default: bool, pos: u64) -> Result<QName> {
        match split_qname(raw) {
            (Some(prefix), local) => {
                let uri = self
                    .scope
                    .resolve(prefix)
                    .ok_or_else(|| self.error_at(pos, format!("unbound namespace prefix '{prefix}'")))?;
                Ok(QName::new(Some(uri), local))
            }
            (None, local) => {
                let namespace = if use_default {
                    self.scope.default_namespace()
                } else {
                    None
                };
                Ok(QName::new(namespace, local))
            }
        }
    }

    /// HTML name handling: lowercase, namespace-free, first duplicate
    /// attribute wins.
    fn html_element(raw_name: &str, raw_attrs: Vec<(String, String)>) -> ElementData {
        let mut attributes: Vec<Attribute> = Vec::with_capacity(raw_attrs.len());
        for (key, value) in raw_attrs {
            let key = key.to_ascii_lowercase();
            if attributes.iter().any(|a| a.name.local() == key) {
                log::debug!("dropping duplicate HTML attribute '{key}'");
                continue;
            }
            attributes.push(Attribute {
                name: QName::unqualified(key),
                value,
            });
        }
        ElementData {
            name: QName::unqualified(raw_name.to_ascii_lowercase()),
            attributes,
        }
    }

    /// Closes the innermost open element.
    pub(crate) fn close_element(&mut self) {
        if self.open.pop().is_some() {
            self.scope.pop();
        }
    }

    /// HTML end-tag recovery: closes up to and including the nearest open
    /// element with a matching tag; an end tag matching nothing is dropped.
    pub(crate) fn recover_end_tag(&mut self, tag: &str) {
        let matching = self
            .open
            .iter()
            .rposition(|&id| self.tag_of(id).eq_ignore_ascii_case(tag));
        match matching {
            Some(depth) => {
                while self.open.len() > depth {
                    if self.open.len() > depth + 1 {
                        log::debug!(
                            "implicitly closing unclosed <{}>",
                            self.tag_of(self.current())
                        );
                    }
                    self.close_element();
                }
            }
            None => log::debug!("ignoring unmatched end tag </{tag}>"),
        }
    }

    /// Appends a text run, merging with an immediately preceding one so
    /// adjacent text/CDATA events form a single node.
    pub(crate) fn append_text(&mut self, text: &str) {
        if self.open.is_empty() {
            // Text outside the root element. Whitespace is insignificant
            // there; XML callers reject non-whitespace before calling.
            return;
        }
        let parent = self.current();
        if let Some(&last) = self.arena.children(parent).last() {
            if let NodeKind::Text(existing) = &mut self.arena.node_mut(last).kind {
                existing.push_str(text);
                return;
            }
        }
        self.arena.push(parent, NodeKind::Text(text.to_string()));
    }

    pub(crate) fn append_comment(&mut self, text: &str) {
        let parent = self.current();
        self.arena.push(parent, NodeKind::Comment(text.to_string()));
    }

    pub(crate) fn append_pi(&mut self, target: &str, data: &str) {
        let parent = self.current();
        self.arena.push(
            parent,
            NodeKind::ProcessingInstruction {
                target: target.to_string(),
                data: data.to_string(),
            },
        );
    }

    /// True when an element is currently open (text is inside the tree).
    pub(crate) fn in_element(&self) -> bool {
        !self.open.is_empty()
    }

    /// Records version/encoding from the XML declaration.
    pub(crate) fn set_decl<R>(
        &mut self,
        decl: &BytesDecl,
        reader: &Reader<R>,
        pos: u64,
    ) -> Result<()> {
        let decoder = reader.decoder();
        let version = decl
            .version()
            .map_err(|err| self.error_at(pos, err.to_string()))?;
        self.version = Some(
            decoder
                .decode(version.as_ref())
                .map_err(|err| self.error_at(pos, err.to_string()))?
                .into_owned(),
        );
        if let Some(encoding) = decl.encoding() {
            let encoding = encoding.map_err(|err| self.error_at(pos, err.to_string()))?;
            self.encoding = Some(
                decoder
                    .decode(encoding.as_ref())
                    .map_err(|err| self.error_at(pos, err.to_string()))?
                    .into_owned(),
            );
        }
        Ok(())
    }

    /// Resolves character and entity references in `text`. XML mode fails
    /// on an unknown entity; HTML mode keeps the raw reference text.
    pub(crate) fn unescape_text(&self, text: &str, pos: u64) -> Result<String> {
        match quick_xml::escape::unescape(text) {
            Ok(unescaped) => Ok(unescaped.into_owned()),
            Err(err) if self.dialect == Dialect::Html => {
                log::debug!("keeping unescapable HTML text verbatim: {err}");
                Ok(text.to_string())
            }
            Err(err) => Err(self.error_at(pos, err.to_string())),
        }
    }

    /// Resolves a general entity reference event (`&name;`) to replacement
    /// text. XML mode rejects anything beyond character references and the
    /// five predefined entities.
    pub(crate) fn resolve_reference(&mut self, name: &str, pos: u64) -> Result<()> {
        if let Some(text) = resolve_entity(name, self.dialect) {
            self.append_text(&text);
            Ok(())
        } else if self.dialect == Dialect::Html {
            log::debug!("keeping unknown HTML entity '&{name};' verbatim");
            self.append_text(&format!("&{name};"));
            Ok(())
        } else {
            Err(self.error_at(pos, format!("undefined entity '&{name};'")))
        }
    }

    /// Validates the finished tree and hands it to a new `Document`.
    pub(crate) fn finish(mut self, options: &ParseOptions) -> Result<Document> {
        if self.dialect == Dialect::Xml && !self.open.is_empty() {
            let tag = self.tag_of(self.current()).to_string();
            return Err(self.error_at(
                self.input.len() as u64,
                format!("unclosed element <{tag}> at end of input"),
            ));
        }
        while !self.open.is_empty() {
            log::debug!("closing <{}> left open at end of input", self.tag_of(self.current()));
            self.close_element();
        }

        let root = self
            .arena
            .children(NodeId::DOCUMENT)
            .iter()
            .copied()
            .find(|&id| self.arena.node(id).kind.is_element())
            .ok_or_else(|| Error::Parse {
                message: "document has no root element".to_string(),
                line: None,
                column: None,
            })?;

        Ok(Document::from_parts(
            self.arena,
            root,
            self.version,
            self.encoding.unwrap_or_else(|| "UTF-8".to_string()),
            self.prefixes,
            self.default_namespace,
            options.clone(),
        ))
    }
}

/// Replacement text for a character or entity reference, or `None` when
/// unknown.
fn resolve_entity(name: &str, dialect: Dialect) -> Option<String> {
    if let Some(num) = name.strip_prefix('#') {
        let code = if let Some(hex) = num.strip_prefix('x').or_else(|| num.strip_prefix('X')) {
            u32::from_str_radix(hex, 16).ok()?
        } else {
            num.parse().ok()?
        };
        return char::from_u32(code).map(String::from);
    }
    let predefined = match name {
        "amp" => "&",
        "lt" => "<",
        "gt" => ">",
        "apos" => "'",
        "quot" => "\"",
        _ => "",
    };
    if !predefined.is_empty() {
        return Some(predefined.to_string());
    }
    if dialect == Dialect::Html {
        // The handful of named entities that dominate real pages.
        let html = match name {
            "nbsp" => "\u{a0}",
            "copy" => "\u{a9}",
            "reg" => "\u{ae}",
            "trade" => "\u{2122}",
            "hellip" => "\u{2026}",
            "mdash" => "\u{2014}",
            "ndash" => "\u{2013}",
            "lsquo" => "\u{2018}",
            "rsquo" => "\u{2019}",
            "ldquo" => "\u{201c}",
            "rdquo" => "\u{201d}",
            _ => "",
        };
        if !html.is_empty() {
            return Some(html.to_string());
        }
    }
    None
}

/// Computes a 1-based (line, column) pair for a byte offset.
pub(crate) fn position_at(input: &[u8], offset: usize) -> (u64, u64) {
    let offset = offset.min(input.len());
    let mut line = 1u64;
    let mut column = 1u64;
    for &byte in &input[..offset] {
        if byte == b'\n' {
            line += 1;
            column = 1;
        } else {
            column += 1;
        }
    }
    (line, column)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_at() {
        let input = b"<a>\n  <b/>\n</a>";
        assert_eq!(position_at(input, 0), (1, 1));
        assert_eq!(position_at(input, 2), (1, 3));
        assert_eq!(position_at(input, 4), (2, 1));
        assert_eq!(position_at(input, 6), (2, 3));
        assert_eq!(position_at(input, 999), (3, 5));
    }

    #[test]
    fn test_resolve_entity_character_refs() {
        assert_eq!(resolve_entity("#65", Dialect::Xml).as_deref(), Some("A"));
        assert_eq!(resolve_entity("#x41", Dialect::Xml).as_deref(), Some("A"));
        assert_eq!(resolve_entity("amp", Dialect::Xml).as_deref(), Some("&"));
        assert_eq!(resolve_entity("nbsp", Dialect::Xml), None);
        assert_eq!(
            resolve_entity("nbsp", Dialect::Html).as_deref(),
            Some("\u{a0}")
        );
        assert_eq!(resolve_entity("bogus", Dialect::Html), None);
    }
}
