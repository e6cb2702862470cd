//! The document: owner of the parsed tree and the query root.

use std::collections::HashMap;
use std::sync::Arc;

use crate::element::Element;
use crate::error::Result;
use crate::format::{DateFormat, NumberFormat};
use crate::parse;
use crate::tree::{Arena, NodeId};

/// Configuration applied at document construction.
///
/// The formatters configured here are shared by every element of the
/// resulting document and cannot change afterwards.
#[derive(Debug, Clone, Default)]
pub struct ParseOptions {
    /// Formatter behind [`Element::number_value`].
    pub number_format: NumberFormat,
    /// Formatter behind [`Element::date_value`].
    pub date_format: DateFormat,
}

/// An immutable, queryable XML or HTML document.
///
/// A `Document` is created only through the parsing factories; a failed
/// parse yields an error and no document. Once built, the tree is never
/// mutated, so a `Document` can be queried from multiple threads without
/// locking. Dropping the document drops the whole tree; [`Element`]
/// handles borrow from it and cannot outlive it.
///
/// # Examples
///
/// ```
/// use ono::{Document, Searching};
///
/// # fn main() -> ono::Result<()> {
/// let doc = Document::parse_xml("<food><name>Waffles</name></food>")?;
/// let names = doc.xpath("//name")?;
/// assert_eq!(names.len(), 1);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Document {
    pub(crate) arena: Arena,
    pub(crate) root: NodeId,
    version: Option<String>,
    encoding: String,
    /// Declared prefix -> namespace URI, first binding wins. Used to
    /// resolve prefixes in XPath name tests.
    prefixes: HashMap<String, Arc<str>>,
    /// The first default namespace declared in the document, if any.
    pub(crate) default_namespace: Option<Arc<str>>,
    number_format: NumberFormat,
    date_format: DateFormat,
}

impl Document {
    /// Parses a well-formed XML string.
    pub fn parse_xml(content: &str) -> Result<Document> {
        parse::xml::parse(content.as_bytes(), &ParseOptions::default())
    }

    /// Parses well-formed XML from raw bytes. The bytes must be UTF-8
    /// (or plain ASCII); a declared encoding is recorded as metadata.
    pub fn parse_xml_bytes(content: &[u8]) -> Result<Document> {
        parse::xml::parse(content, &ParseOptions::default())
    }

    /// Parses XML with explicit [`ParseOptions`].
    pub fn parse_xml_with(content: &[u8], options: &ParseOptions) -> Result<Document> {
        parse::xml::parse(content, options)
    }

    /// Parses well-formed XML read from a file.
    pub fn parse_xml_file(path: impl AsRef<std::path::Path>) -> Result<Document> {
        let content = std::fs::read(path)?;
        parse::xml::parse(&content, &ParseOptions::default())
    }

    /// Parses an HTML string using lenient recovery rules.
    pub fn parse_html(content: &str) -> Result<Document> {
        parse::html::parse(content.as_bytes(), &ParseOptions::default())
    }

    /// Parses HTML from raw bytes.
    pub fn parse_html_bytes(content: &[u8]) -> Result<Document> {
        parse::html::parse(content, &ParseOptions::default())
    }

    /// Parses HTML with explicit [`ParseOptions`].
    pub fn parse_html_with(content: &[u8], options: &ParseOptions) -> Result<Document> {
        parse::html::parse(content, options)
    }

    /// Parses HTML read from a file.
    pub fn parse_html_file(path: impl AsRef<std::path::Path>) -> Result<Document> {
        let content = std::fs::read(path)?;
        parse::html::parse(&content, &ParseOptions::default())
    }

    /// The root element of the document.
    pub fn root_element(&self) -> Element<'_> {
        Element::new(self, self.root)
    }

    /// The XML version from the declaration, if one was present.
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// The declared text encoding, defaulting to `UTF-8`.
    pub fn encoding(&self) -> &str {
        &self.encoding
    }

    /// The number formatter shared by this document's elements.
    pub fn number_format(&self) -> &NumberFormat {
        &self.number_format
    }

    /// The date formatter shared by this document's elements.
    pub fn date_format(&self) -> &DateFormat {
        &self.date_format
    }

    pub(crate) fn from_parts(
        arena: Arena,
        root: NodeId,
        version: Option<String>,
        encoding: String,
        prefixes: HashMap<String, Arc<str>>,
        default_namespace: Option<Arc<str>>,
        options: ParseOptions,
    ) -> Document {
        Document {
            arena,
            root,
            version,
            encoding,
            prefixes,
            default_namespace,
            number_format: options.number_format,
            date_format: options.date_format,
        }
    }

    /// Resolves an XPath name-test prefix against the document's declared
    /// namespaces.
    pub(crate) fn resolve_prefix(&self, prefix: &str) -> Option<&str> {
        if prefix == "xml" {
            return Some("http://www.w3.org/XML/1998/namespace");
        }
        self.prefixes.get(prefix).map(|uri| uri.as_ref())
    }

    pub(crate) fn element(&self, id: NodeId) -> Element<'_> {
        Element::new(self, id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_metadata() {
        let doc = Document::parse_xml(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?><root/>",
        )
        .expect("should parse");
        assert_eq!(doc.version(), Some("1.0"));
        assert_eq!(doc.encoding(), "UTF-8");
        assert_eq!(doc.root_element().tag(), "root");
    }

    #[test]
    fn test_missing_declaration_defaults() {
        let doc = Document::parse_xml("<root/>").expect("should parse");
        assert_eq!(doc.version(), None);
        assert_eq!(doc.encoding(), "UTF-8");
    }

    #[test]
    fn test_malformed_xml_yields_no_document() {
        assert!(Document::parse_xml("<a><b></a>").is_err());
        assert!(Document::parse_xml("").is_err());
        assert!(Document::parse_xml("<a/><b/>").is_err());
        assert!(Document::parse_xml("<a/>trailing").is_err());
    }

    #[test]
    fn test_unclosed_xml_is_an_error() {
        assert!(Document::parse_xml("<a><b>text").is_err());
    }

    #[test]
    fn test_html_recovers_where_xml_rejects() {
        let doc = Document::parse_html("<ul><li>one<li>two</ul>").expect("should parse");
        assert_eq!(doc.root_element().tag(), "ul");
    }

    #[test]
    fn test_document_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Document>();
    }
}
