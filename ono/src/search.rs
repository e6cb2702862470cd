//! The [`Searching`] trait: XPath and CSS queries against a document or
//! any element within it.
//!
//! Queries from a [`Document`] start at the document root; queries from
//! an [`Element`] are scoped to that element's subtree (relative paths
//! start at the element, absolute paths still address the whole
//! document).

use crate::css;
use crate::document::Document;
use crate::element::Element;
use crate::error::Result;
use crate::tree::NodeId;
use crate::xpath::{Value, XPathExpr};

/// Where a query starts. Implementation detail of [`Searching`].
#[doc(hidden)]
pub struct SearchContext<'d> {
    pub(crate) doc: &'d Document,
    pub(crate) start: NodeId,
}

/// Query operations shared by [`Document`] and [`Element`].
pub trait Searching {
    /// The document and start node queries run against.
    #[doc(hidden)]
    fn context(&self) -> SearchContext<'_>;

    /// Compiles and runs an XPath expression, returning the matching
    /// elements in document order.
    fn xpath(&self, expression: &str) -> Result<Matches<'_>> {
        self.select(&XPathExpr::compile(expression)?)
    }

    /// Runs a precompiled expression.
    fn select(&self, expression: &XPathExpr) -> Result<Matches<'_>> {
        let ctx = self.context();
        let ids = expression.select_ids(ctx.doc, ctx.start)?;
        Ok(Matches::new(ctx.doc, ids))
    }

    /// Runs a CSS selector by translating it to XPath.
    ///
    /// Scoped to an element, the selector matches strict descendants;
    /// the context element itself is never a match.
    fn css(&self, selector: &str) -> Result<Matches<'_>> {
        let xpath = css::to_xpath(selector)?;
        self.select(&XPathExpr::compile(&xpath)?)
    }

    /// Evaluates an XPath expression to whatever it produces: elements,
    /// attribute values, a number, a string, or a boolean.
    fn evaluate(&self, expression: &str) -> Result<Value<'_>> {
        let ctx = self.context();
        let expr = XPathExpr::compile(expression)?;
        expr.evaluate_value(ctx.doc, ctx.start)
    }

    /// Calls `action` once per XPath match, in document order. A query
    /// with no matches succeeds without invoking `action`.
    fn for_each_xpath<F>(&self, expression: &str, mut action: F) -> Result<()>
    where
        F: FnMut(Element<'_>),
    {
        for element in self.xpath(expression)? {
            action(element);
        }
        Ok(())
    }

    /// Calls `action` once per CSS match, in document order.
    fn for_each_css<F>(&self, selector: &str, mut action: F) -> Result<()>
    where
        F: FnMut(Element<'_>),
    {
        for element in self.css(selector)? {
            action(element);
        }
        Ok(())
    }
}

impl Searching for Document {
    fn context(&self) -> SearchContext<'_> {
        SearchContext {
            doc: self,
            start: NodeId::DOCUMENT,
        }
    }
}

impl<'d> Searching for Element<'d> {
    fn context(&self) -> SearchContext<'_> {
        SearchContext {
            doc: self.document(),
            start: self.id,
        }
    }
}

/// The elements matched by a query, iterable in document order.
#[derive(Debug, Clone)]
pub struct Matches<'d> {
    doc: &'d Document,
    ids: std::vec::IntoIter<NodeId>,
}

impl<'d> Matches<'d> {
    pub(crate) fn new(doc: &'d Document, ids: Vec<NodeId>) -> Matches<'d> {
        Matches {
            doc,
            ids: ids.into_iter(),
        }
    }

    /// Number of matches not yet consumed.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.len() == 0
    }

    /// The first remaining match, without consuming it.
    pub fn first(&self) -> Option<Element<'d>> {
        self.ids.as_slice().first().map(|&id| self.doc.element(id))
    }

    /// The match at `index` among the remaining matches.
    pub fn get(&self, index: usize) -> Option<Element<'d>> {
        self.ids.as_slice().get(index).map(|&id| self.doc.element(id))
    }
}

impl<'d> Iterator for Matches<'d> {
    type Item = Element<'d>;

    fn next(&mut self) -> Option<Element<'d>> {
        let id = self.ids.next()?;
        Some(self.doc.element(id))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.ids.size_hint()
    }
}

impl ExactSizeIterator for Matches<'_> {}

impl<'d> DoubleEndedIterator for Matches<'d> {
    fn next_back(&mut self) -> Option<Element<'d>> {
        let id = self.ids.next_back()?;
        Some(self.doc.element(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOG: &str = r#"<catalog>
        <book id="b1"><title>First</title></book>
        <book id="b2"><title>Second</title></book>
        <book id="b3"><title>Third</title></book>
    </catalog>"#;

    #[test]
    fn test_document_query_is_document_order() {
        let doc = Document::parse_xml(CATALOG).unwrap();
        let ids: Vec<String> = doc
            .xpath("//book")
            .unwrap()
            .map(|book| book.attribute("id").unwrap().to_string())
            .collect();
        assert_eq!(ids, vec!["b1", "b2", "b3"]);
    }

    #[test]
    fn test_element_query_is_scoped() {
        let doc = Document::parse_xml(CATALOG).unwrap();
        let second = doc.xpath("//book[2]").unwrap().first().unwrap();
        let titles = second.xpath(".//title").unwrap();
        assert_eq!(titles.len(), 1);
        assert_eq!(titles.first().unwrap().string_value(), "Second");

        // Relative paths start at the element itself.
        let titles = second.xpath("title").unwrap();
        assert_eq!(titles.len(), 1);
    }

    #[test]
    fn test_element_css_excludes_context_element() {
        let doc = Document::parse_xml(CATALOG).unwrap();
        let book = doc.xpath("//book[1]").unwrap().first().unwrap();
        assert!(book.css("book").unwrap().is_empty());
        assert_eq!(book.css("title").unwrap().len(), 1);
    }

    #[test]
    fn test_css_and_xpath_agree() {
        let doc = Document::parse_xml(CATALOG).unwrap();
        let via_css: Vec<_> = doc.css("catalog > book").unwrap().collect();
        let via_xpath: Vec<_> = doc.xpath("//catalog/book").unwrap().collect();
        assert_eq!(via_css, via_xpath);
    }

    #[test]
    fn test_precompiled_expression_reuse() {
        let doc = Document::parse_xml(CATALOG).unwrap();
        let expr = XPathExpr::compile("//book[@id='b2']").unwrap();
        assert_eq!(doc.select(&expr).unwrap().len(), 1);
        let root = doc.root_element();
        assert_eq!(root.select(&expr).unwrap().len(), 1);
    }

    #[test]
    fn test_for_each_skips_callback_on_no_match() {
        let doc = Document::parse_xml(CATALOG).unwrap();
        let mut calls = 0;
        doc.for_each_xpath("//missing", |_| calls += 1).unwrap();
        assert_eq!(calls, 0);

        doc.for_each_css("book", |_| calls += 1).unwrap();
        assert_eq!(calls, 3);
    }

    #[test]
    fn test_matches_is_double_ended() {
        let doc = Document::parse_xml(CATALOG).unwrap();
        let mut matches = doc.xpath("//book").unwrap();
        assert_eq!(matches.len(), 3);
        let last = matches.next_back().unwrap();
        assert_eq!(last.attribute("id"), Some("b3"));
        assert_eq!(matches.len(), 2);
        assert_eq!(matches.first().unwrap().attribute("id"), Some("b1"));
    }

    #[test]
    fn test_evaluate_scalars() {
        let doc = Document::parse_xml(CATALOG).unwrap();
        match doc.evaluate("count(//book)").unwrap() {
            Value::Number(n) => assert_eq!(n, 3.0),
            other => panic!("expected a number, got {other:?}"),
        }
        match doc.evaluate("//book/@id").unwrap() {
            Value::Strings(ids) => assert_eq!(ids, vec!["b1", "b2", "b3"]),
            other => panic!("expected strings, got {other:?}"),
        }
    }
}
