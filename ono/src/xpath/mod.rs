//! XPath expression compilation and evaluation.
//!
//! The supported grammar is the practical subset used for document
//! queries: absolute and relative location paths, the `child`,
//! `descendant`, `descendant-or-self`, `parent`, `self`,
//! `following-sibling`, and `attribute` axes (plus their `//`, `.`, `..`,
//! and `@` abbreviations), name, `*`, `text()`, and `node()` tests,
//! predicates with positions, `=`/`!=`, `and`/`or`, unions, and a small
//! set of core functions (`position`, `last`, `count`, `not`, `contains`,
//! `starts-with`, `concat`, `string`, `normalize-space`).

mod ast;
mod eval;
mod parser;

use crate::document::Document;
use crate::element::Element;
use crate::error::{Error, Result};
use crate::tree::{NodeId, NodeKind};

use ast::Expr;
use eval::EvalValue;

/// A compiled XPath expression.
///
/// Compiling once and reusing the expression with
/// [`Searching::select`](crate::Searching::select) skips reparsing when
/// the same query runs against many documents or context elements.
#[derive(Debug, Clone)]
pub struct XPathExpr {
    ast: Expr,
}

impl XPathExpr {
    /// Compiles an expression, failing on any syntax error.
    pub fn compile(expression: &str) -> Result<XPathExpr> {
        Ok(XPathExpr {
            ast: parser::parse(expression)?,
        })
    }

    /// Runs the expression and returns the selected element ids in
    /// document order.
    pub(crate) fn select_ids(&self, doc: &Document, start: NodeId) -> Result<Vec<NodeId>> {
        match eval::evaluate(doc, start, &self.ast)? {
            EvalValue::Nodes(nodes) => {
                // A non-empty set with no elements means a text() (or
                // similar) selection, which this entry point cannot
                // represent.
                let elements: Vec<NodeId> = nodes
                    .iter()
                    .copied()
                    .filter(|&id| doc.arena.node(id).kind.is_element())
                    .collect();
                if elements.is_empty() && !nodes.is_empty() {
                    return Err(Error::SelectorUnsupported(
                        "expression selects non-element nodes; use evaluate()".to_string(),
                    ));
                }
                Ok(elements)
            }
            EvalValue::Strings(_) => Err(Error::SelectorUnsupported(
                "expression selects attribute values, not elements; use evaluate()".to_string(),
            )),
            _ => Err(Error::SelectorUnsupported(
                "expression evaluates to a scalar, not elements; use evaluate()".to_string(),
            )),
        }
    }

    /// Runs the expression and returns whatever it evaluates to.
    pub(crate) fn evaluate_value<'d>(&self, doc: &'d Document, start: NodeId) -> Result<Value<'d>> {
        let value = match eval::evaluate(doc, start, &self.ast)? {
            EvalValue::Nodes(nodes) => {
                let elements: Vec<Element<'d>> = nodes
                    .iter()
                    .filter(|&&id| doc.arena.node(id).kind.is_element())
                    .map(|&id| doc.element(id))
                    .collect();
                if elements.is_empty() && !nodes.is_empty() {
                    // A pure text-node selection (e.g. `//p/text()`)
                    // surfaces as the text runs themselves.
                    let texts = nodes
                        .iter()
                        .filter_map(|&id| match &doc.arena.node(id).kind {
                            NodeKind::Text(text) => Some(text.clone()),
                            _ => None,
                        })
                        .collect();
                    Value::Strings(texts)
                } else {
                    Value::Nodes(elements)
                }
            }
            EvalValue::Strings(values) => Value::Strings(values),
            EvalValue::Number(n) => Value::Number(n),
            EvalValue::Text(text) => Value::Text(text),
            EvalValue::Boolean(b) => Value::Boolean(b),
        };
        Ok(value)
    }
}

/// The result of evaluating an XPath expression.
#[derive(Debug, Clone)]
pub enum Value<'d> {
    /// Elements selected by a location path, in document order.
    Nodes(Vec<Element<'d>>),
    /// Attribute values or text runs selected by a path.
    Strings(Vec<String>),
    /// A numeric result, e.g. from `count(...)`.
    Number(f64),
    /// A string result, e.g. from `concat(...)`.
    Text(String),
    /// A boolean result, e.g. from `not(...)`.
    Boolean(bool),
}

impl<'d> Value<'d> {
    /// True for an empty node-set, empty string list, empty string,
    /// zero, NaN, or `false`.
    pub fn is_empty(&self) -> bool {
        match self {
            Value::Nodes(nodes) => nodes.is_empty(),
            Value::Strings(values) => values.is_empty(),
            Value::Number(n) => *n == 0.0 || n.is_nan(),
            Value::Text(text) => text.is_empty(),
            Value::Boolean(b) => !b,
        }
    }

    /// The selected elements, or an empty slice for non-node results.
    pub fn nodes(&self) -> &[Element<'d>] {
        match self {
            Value::Nodes(nodes) => nodes,
            _ => &[],
        }
    }
}
