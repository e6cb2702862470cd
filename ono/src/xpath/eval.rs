//! XPath evaluation over the document arena.
//!
//! Evaluation is purely functional over the immutable tree: an expression
//! plus a context node yields a value, and the same inputs always produce
//! the same output. Node-set results are kept sorted by `NodeId`, which is
//! document order by construction.

use crate::document::Document;
use crate::error::{Error, Result};
use crate::tree::{NodeId, NodeKind};

use super::ast::{Axis, BinaryOp, Expr, NodeTest, Path, Step};

/// Intermediate value produced while evaluating an expression.
#[derive(Debug, Clone)]
pub(crate) enum EvalValue {
    /// Nodes selected by a path, in document order, deduplicated.
    Nodes(Vec<NodeId>),
    /// Attribute values selected by an attribute step.
    Strings(Vec<String>),
    Number(f64),
    Text(String),
    Boolean(bool),
}

/// Evaluation context: the node an expression is evaluated against, plus
/// its 1-based position within the current candidate list.
#[derive(Clone, Copy)]
struct Context<'d> {
    doc: &'d Document,
    node: NodeId,
    position: usize,
    size: usize,
}

/// Evaluates `expr` with `start` as the context node.
pub(crate) fn evaluate(doc: &Document, start: NodeId, expr: &Expr) -> Result<EvalValue> {
    let ctx = Context {
        doc,
        node: start,
        position: 1,
        size: 1,
    };
    eval_expr(ctx, expr)
}

fn syntax_error(message: impl Into<String>) -> Error {
    Error::SelectorSyntax(message.into())
}

fn eval_expr(ctx: Context<'_>, expr: &Expr) -> Result<EvalValue> {
    match expr {
        Expr::Number(n) => Ok(EvalValue::Number(*n)),
        Expr::Literal(text) => Ok(EvalValue::Text(text.clone())),
        Expr::Path(path) => eval_path(ctx, path),
        Expr::Binary { op, left, right } => match op {
            BinaryOp::And => {
                let value = truthy(&eval_expr(ctx, left)?) && truthy(&eval_expr(ctx, right)?);
                Ok(EvalValue::Boolean(value))
            }
            BinaryOp::Or => {
                let value = truthy(&eval_expr(ctx, left)?) || truthy(&eval_expr(ctx, right)?);
                Ok(EvalValue::Boolean(value))
            }
            BinaryOp::Eq | BinaryOp::Neq => {
                let left = eval_expr(ctx, left)?;
                let right = eval_expr(ctx, right)?;
                Ok(EvalValue::Boolean(compare(ctx.doc, *op, &left, &right)))
            }
        },
        Expr::Function { name, args } => eval_function(ctx, name, args),
        Expr::Union(left, right) => {
            let left = eval_expr(ctx, left)?;
            let right = eval_expr(ctx, right)?;
            match (left, right) {
                (EvalValue::Nodes(mut a), EvalValue::Nodes(b)) => {
                    a.extend(b);
                    a.sort_unstable();
                    a.dedup();
                    Ok(EvalValue::Nodes(a))
                }
                (EvalValue::Strings(mut a), EvalValue::Strings(b)) => {
                    a.extend(b);
                    Ok(EvalValue::Strings(a))
                }
                _ => Err(syntax_error(
                    "union operands must both be node-sets or both be attribute sets",
                )),
            }
        }
    }
}

fn eval_path(ctx: Context<'_>, path: &Path) -> Result<EvalValue> {
    let mut nodes = if path.absolute {
        vec![NodeId::DOCUMENT]
    } else {
        vec![ctx.node]
    };

    for (i, step) in path.steps.iter().enumerate() {
        let is_last = i + 1 == path.steps.len();
        if step.axis == Axis::Attribute {
            if !is_last {
                return Err(Error::SelectorUnsupported(
                    "attribute steps are only supported as the final step".to_string(),
                ));
            }
            if !step.predicates.is_empty() {
                return Err(Error::SelectorUnsupported(
                    "predicates on attribute steps".to_string(),
                ));
            }
            return Ok(EvalValue::Strings(attribute_values(
                ctx.doc, &nodes, &step.test,
            )?));
        }
        nodes = eval_element_step(ctx.doc, &nodes, step)?;
    }
    Ok(EvalValue::Nodes(nodes))
}

/// Applies one non-attribute step to every context node and merges the
/// results back into document order.
fn eval_element_step(doc: &Document, nodes: &[NodeId], step: &Step) -> Result<Vec<NodeId>> {
    let mut merged = Vec::new();
    for &node in nodes {
        let mut survivors: Vec<NodeId> = axis_nodes(doc, node, step.axis)
            .into_iter()
            .filter_map(|candidate| {
                match matches_test(doc, candidate, &step.test) {
                    Ok(true) => Some(Ok(candidate)),
                    Ok(false) => None,
                    Err(err) => Some(Err(err)),
                }
            })
            .collect::<Result<_>>()?;

        // Predicates apply in sequence; positions are counted over the
        // list surviving the previous predicate, per context node.
        for predicate in &step.predicates {
            let size = survivors.len();
            let mut kept = Vec::new();
            for (i, &candidate) in survivors.iter().enumerate() {
                let ctx = Context {
                    doc,
                    node: candidate,
                    position: i + 1,
                    size,
                };
                let keep = match eval_expr(ctx, predicate)? {
                    EvalValue::Number(n) => (i + 1) as f64 == n,
                    value => truthy(&value),
                };
                if keep {
                    kept.push(candidate);
                }
            }
            survivors = kept;
        }
        merged.extend(survivors);
    }
    merged.sort_unstable();
    merged.dedup();
    Ok(merged)
}

fn axis_nodes(doc: &Document, node: NodeId, axis: Axis) -> Vec<NodeId> {
    let arena = &doc.arena;
    match axis {
        Axis::Child => arena.children(node).to_vec(),
        Axis::Descendant => arena.descendants(node),
        Axis::DescendantOrSelf => {
            let mut nodes = vec![node];
            nodes.extend(arena.descendants(node));
            nodes
        }
        Axis::Parent => arena.parent(node).into_iter().collect(),
        Axis::SelfNode => vec![node],
        Axis::FollowingSibling => {
            let mut nodes = Vec::new();
            let mut current = node;
            while let Some(next) = arena.next_sibling(current) {
                nodes.push(next);
                current = next;
            }
            nodes
        }
        // Attribute steps never reach here.
        Axis::Attribute => Vec::new(),
    }
}

fn matches_test(doc: &Document, node: NodeId, test: &NodeTest) -> Result<bool> {
    let kind = &doc.arena.node(node).kind;
    match test {
        NodeTest::Node => Ok(true),
        NodeTest::Text => Ok(matches!(kind, NodeKind::Text(_))),
        NodeTest::Wildcard => Ok(kind.is_element()),
        NodeTest::Name { prefix, local } => {
            let Some(element) = kind.as_element() else {
                return Ok(false);
            };
            match prefix {
                Some(prefix) => {
                    let uri = doc.resolve_prefix(prefix).ok_or_else(|| {
                        syntax_error(format!("unknown namespace prefix '{prefix}'"))
                    })?;
                    Ok(element.name.matches(local, Some(uri)))
                }
                // An unprefixed test matches elements with no namespace,
                // and also elements in the document's default namespace so
                // that plain queries work against defaulted documents.
                None => Ok(element.name.local() == local
                    && (element.name.namespace().is_none()
                        || element.name.namespace() == doc.default_namespace.as_deref())),
            }
        }
    }
}

/// Collects matching attribute values across the context nodes, in
/// document then declaration order.
fn attribute_values(doc: &Document, nodes: &[NodeId], test: &NodeTest) -> Result<Vec<String>> {
    let mut values = Vec::new();
    for &node in nodes {
        let Some(element) = doc.arena.node(node).kind.as_element() else {
            continue;
        };
        for attribute in &element.attributes {
            let matched = match test {
                NodeTest::Wildcard => true,
                NodeTest::Name { prefix, local } => match prefix {
                    Some(prefix) => {
                        let uri = doc.resolve_prefix(prefix).ok_or_else(|| {
                            syntax_error(format!("unknown namespace prefix '{prefix}'"))
                        })?;
                        attribute.name.matches(local, Some(uri))
                    }
                    // Attributes never take the default namespace.
                    None => {
                        attribute.name.local() == local && attribute.name.namespace().is_none()
                    }
                },
                NodeTest::Text | NodeTest::Node => {
                    return Err(syntax_error("expected a name test on the attribute axis"))
                }
            };
            if matched {
                values.push(attribute.value.clone());
            }
        }
    }
    Ok(values)
}

fn eval_function(ctx: Context<'_>, name: &str, args: &[Expr]) -> Result<EvalValue> {
    let arity = |expected: usize| -> Result<()> {
        if args.len() == expected {
            Ok(())
        } else {
            Err(syntax_error(format!(
                "{name}() takes {expected} argument(s), got {}",
                args.len()
            )))
        }
    };
    match name {
        "position" => {
            arity(0)?;
            Ok(EvalValue::Number(ctx.position as f64))
        }
        "last" => {
            arity(0)?;
            Ok(EvalValue::Number(ctx.size as f64))
        }
        "true" => {
            arity(0)?;
            Ok(EvalValue::Boolean(true))
        }
        "false" => {
            arity(0)?;
            Ok(EvalValue::Boolean(false))
        }
        "count" => {
            arity(1)?;
            match eval_expr(ctx, &args[0])? {
                EvalValue::Nodes(nodes) => Ok(EvalValue::Number(nodes.len() as f64)),
                EvalValue::Strings(values) => Ok(EvalValue::Number(values.len() as f64)),
                _ => Err(syntax_error("count() expects a node-set")),
            }
        }
        "not" => {
            arity(1)?;
            let value = eval_expr(ctx, &args[0])?;
            Ok(EvalValue::Boolean(!truthy(&value)))
        }
        "contains" => {
            arity(2)?;
            let haystack = eval_to_string(ctx, &args[0])?;
            let needle = eval_to_string(ctx, &args[1])?;
            Ok(EvalValue::Boolean(haystack.contains(&needle)))
        }
        "starts-with" => {
            arity(2)?;
            let text = eval_to_string(ctx, &args[0])?;
            let prefix = eval_to_string(ctx, &args[1])?;
            Ok(EvalValue::Boolean(text.starts_with(&prefix)))
        }
        "concat" => {
            if args.len() < 2 {
                return Err(syntax_error("concat() takes at least two arguments"));
            }
            let mut out = String::new();
            for arg in args {
                out.push_str(&eval_to_string(ctx, arg)?);
            }
            Ok(EvalValue::Text(out))
        }
        "string" => {
            if args.len() > 1 {
                return Err(syntax_error("string() takes at most one argument"));
            }
            match args.first() {
                Some(arg) => Ok(EvalValue::Text(eval_to_string(ctx, arg)?)),
                None => Ok(EvalValue::Text(string_value(ctx.doc, ctx.node))),
            }
        }
        "normalize-space" => {
            if args.len() > 1 {
                return Err(syntax_error("normalize-space() takes at most one argument"));
            }
            let text = match args.first() {
                Some(arg) => eval_to_string(ctx, arg)?,
                None => string_value(ctx.doc, ctx.node),
            };
            let normalized = text.split_whitespace().collect::<Vec<_>>().join(" ");
            Ok(EvalValue::Text(normalized))
        }
        other => Err(syntax_error(format!("unknown function '{other}()'"))),
    }
}

/// XPath truth conversion.
pub(crate) fn truthy(value: &EvalValue) -> bool {
    match value {
        EvalValue::Nodes(nodes) => !nodes.is_empty(),
        EvalValue::Strings(values) => !values.is_empty(),
        EvalValue::Number(n) => *n != 0.0 && !n.is_nan(),
        EvalValue::Text(text) => !text.is_empty(),
        EvalValue::Boolean(b) => *b,
    }
}

/// The string-value of a node: all contained text runs concatenated in
/// document order.
pub(crate) fn string_value(doc: &Document, node: NodeId) -> String {
    let mut out = String::new();
    doc.arena.append_text(node, &mut out);
    out
}

/// XPath string conversion of a value (first node for node-sets).
pub(crate) fn to_string(doc: &Document, value: &EvalValue) -> String {
    match value {
        EvalValue::Nodes(nodes) => nodes
            .first()
            .map(|&node| string_value(doc, node))
            .unwrap_or_default(),
        EvalValue::Strings(values) => values.first().cloned().unwrap_or_default(),
        EvalValue::Number(n) => format_number(*n),
        EvalValue::Text(text) => text.clone(),
        EvalValue::Boolean(b) => if *b { "true" } else { "false" }.to_string(),
    }
}

fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

fn eval_to_string(ctx: Context<'_>, expr: &Expr) -> Result<String> {
    let value = eval_expr(ctx, expr)?;
    Ok(to_string(ctx.doc, &value))
}

fn to_number(text: &str) -> f64 {
    text.trim().parse().unwrap_or(f64::NAN)
}

/// Equality comparison with node-set existential semantics: a node-set
/// operand compares true when any of its members does.
fn compare(doc: &Document, op: BinaryOp, left: &EvalValue, right: &EvalValue) -> bool {
    use EvalValue::{Boolean, Number, Text};

    let negate = op == BinaryOp::Neq;
    let string_eq = |a: &str, b: &str| (a == b) != negate;
    let number_eq = |a: f64, b: f64| if negate { a != b } else { a == b };

    // Booleans compare against the truth value of the other operand.
    if let (Boolean(b), other) | (other, Boolean(b)) = (left, right) {
        return (*b == truthy(other)) != negate;
    }

    let set_vs_scalar = |set: &[String], scalar: &EvalValue| match scalar {
        Number(n) => set.iter().any(|x| number_eq(to_number(x), *n)),
        Text(text) => set.iter().any(|x| string_eq(x, text)),
        _ => false,
    };

    match (set_strings(doc, left), set_strings(doc, right)) {
        (Some(a), Some(b)) => a.iter().any(|x| b.iter().any(|y| string_eq(x, y))),
        (Some(set), None) => set_vs_scalar(&set, right),
        (None, Some(set)) => set_vs_scalar(&set, left),
        (None, None) => match (left, right) {
            (Number(a), Number(b)) => number_eq(*a, *b),
            (Number(n), Text(text)) | (Text(text), Number(n)) => number_eq(to_number(text), *n),
            (Text(a), Text(b)) => string_eq(a, b),
            _ => false,
        },
    }
}

/// The string-values of a node-set operand, or `None` for scalars.
fn set_strings(doc: &Document, value: &EvalValue) -> Option<Vec<String>> {
    match value {
        EvalValue::Nodes(nodes) => Some(
            nodes
                .iter()
                .map(|&node| string_value(doc, node))
                .collect(),
        ),
        EvalValue::Strings(values) => Some(values.clone()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xpath::parser;

    fn doc(xml: &str) -> Document {
        Document::parse_xml(xml).expect("fixture should parse")
    }

    fn select(doc: &Document, expr: &str) -> Vec<String> {
        let ast = parser::parse(expr).expect("expression should parse");
        match evaluate(doc, NodeId::DOCUMENT, &ast).expect("evaluation should succeed") {
            EvalValue::Nodes(nodes) => nodes
                .iter()
                .filter_map(|&id| doc.arena.node(id).kind.as_element())
                .map(|e| e.name.local().to_string())
                .collect(),
            other => panic!("expected nodes, got {other:?}"),
        }
    }

    #[test]
    fn test_positional_predicate_counts_per_parent() {
        let doc = doc("<a><b>first</b><c/><b>second</b></a>");
        let ast = parser::parse("a/b[2]").expect("should parse");
        let value = evaluate(&doc, NodeId::DOCUMENT, &ast).expect("should evaluate");
        let EvalValue::Nodes(nodes) = value else {
            panic!("expected nodes");
        };
        assert_eq!(nodes.len(), 1);
        assert_eq!(string_value(&doc, nodes[0]), "second");
    }

    #[test]
    fn test_descendant_collects_in_document_order() {
        let doc = doc("<r><x><y/></x><y/></r>");
        assert_eq!(select(&doc, "//y"), vec!["y", "y"]);
        assert_eq!(select(&doc, "/r/y"), vec!["y"]);
    }

    #[test]
    fn test_attribute_comparison() {
        let doc = doc(r#"<r><p id="a"/><p id="b"/></r>"#);
        let ast = parser::parse("//p[@id='b']/@id").expect("should parse");
        let value = evaluate(&doc, NodeId::DOCUMENT, &ast).expect("should evaluate");
        let EvalValue::Strings(values) = value else {
            panic!("expected strings");
        };
        assert_eq!(values, vec!["b"]);
    }

    #[test]
    fn test_functions() {
        let doc = doc("<r><a>alpha</a><a>beta</a><a/></r>");
        let count = parser::parse("count(//a)").expect("should parse");
        let value = evaluate(&doc, NodeId::DOCUMENT, &count).expect("should evaluate");
        assert!(matches!(value, EvalValue::Number(n) if n == 3.0));

        assert_eq!(select(&doc, "//a[starts-with(., 'al')]").len(), 1);
        assert_eq!(select(&doc, "//a[not(text())]").len(), 1);
        assert_eq!(select(&doc, "//a[position() = last()]").len(), 1);
    }

    #[test]
    fn test_union_merges_and_dedups() {
        let doc = doc("<r><a/><b/></r>");
        let ast = parser::parse("//a | //b | //a").expect("should parse");
        let value = evaluate(&doc, NodeId::DOCUMENT, &ast).expect("should evaluate");
        let EvalValue::Nodes(nodes) = value else {
            panic!("expected nodes");
        };
        assert_eq!(nodes.len(), 2);
    }

    #[test]
    fn test_attribute_step_must_be_last() {
        let doc = doc("<r/>");
        let ast = parser::parse("//@id/x").expect("should parse");
        let result = evaluate(&doc, NodeId::DOCUMENT, &ast);
        assert!(matches!(result, Err(Error::SelectorUnsupported(_))));
    }

    #[test]
    fn test_unknown_prefix_is_an_error() {
        let doc = doc("<r/>");
        let ast = parser::parse("//nope:r").expect("should parse");
        assert!(matches!(
            evaluate(&doc, NodeId::DOCUMENT, &ast),
            Err(Error::SelectorSyntax(_))
        ));
    }

    #[test]
    fn test_following_sibling() {
        let doc = doc("<r><a/><b/><c/></r>");
        assert_eq!(select(&doc, "//a/following-sibling::*"), vec!["b", "c"]);
        assert_eq!(
            select(&doc, "//a/following-sibling::*[1]"),
            vec!["b"]
        );
    }
}
