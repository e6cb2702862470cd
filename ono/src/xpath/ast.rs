//! Abstract syntax tree for the supported XPath subset.

/// A parsed XPath expression.
#[derive(Debug, Clone)]
pub(crate) enum Expr {
    /// Numeric literal.
    Number(f64),
    /// String literal.
    Literal(String),
    /// A location path.
    Path(Path),
    /// Comparison or logical composition.
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// Function call.
    Function { name: String, args: Vec<Expr> },
    /// Union of two node-sets (`a | b`).
    Union(Box<Expr>, Box<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BinaryOp {
    Eq,
    Neq,
    And,
    Or,
}

/// A location path: optional root anchor plus a sequence of steps.
#[derive(Debug, Clone)]
pub(crate) struct Path {
    /// True when the path starts with `/` and anchors at the document
    /// root regardless of the starting node.
    pub(crate) absolute: bool,
    pub(crate) steps: Vec<Step>,
}

/// One step: axis, node test, and predicates applied in order.
#[derive(Debug, Clone)]
pub(crate) struct Step {
    pub(crate) axis: Axis,
    pub(crate) test: NodeTest,
    pub(crate) predicates: Vec<Expr>,
}

impl Step {
    /// The `descendant-or-self::node()` step that `//` abbreviates.
    pub(crate) fn descendant_or_self() -> Step {
        Step {
            axis: Axis::DescendantOrSelf,
            test: NodeTest::Node,
            predicates: Vec::new(),
        }
    }
}

/// Traversal direction of a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Axis {
    Child,
    Descendant,
    DescendantOrSelf,
    Parent,
    SelfNode,
    Attribute,
    FollowingSibling,
}

impl Axis {
    /// Parses an explicit `axis::` name.
    pub(crate) fn parse(name: &str) -> Option<Axis> {
        match name {
            "child" => Some(Axis::Child),
            "descendant" => Some(Axis::Descendant),
            "descendant-or-self" => Some(Axis::DescendantOrSelf),
            "parent" => Some(Axis::Parent),
            "self" => Some(Axis::SelfNode),
            "attribute" => Some(Axis::Attribute),
            "following-sibling" => Some(Axis::FollowingSibling),
            _ => None,
        }
    }
}

/// Node tests filter the candidates an axis produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum NodeTest {
    /// Name test, optionally prefix-qualified. The prefix is resolved
    /// against the document's declared namespaces at evaluation time.
    Name {
        prefix: Option<String>,
        local: String,
    },
    /// `*`: any element (or any attribute on the attribute axis).
    Wildcard,
    /// `text()`: text nodes.
    Text,
    /// `node()`: any node.
    Node,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axis_parse() {
        assert_eq!(Axis::parse("child"), Some(Axis::Child));
        assert_eq!(Axis::parse("descendant-or-self"), Some(Axis::DescendantOrSelf));
        assert_eq!(Axis::parse("following-sibling"), Some(Axis::FollowingSibling));
        assert_eq!(Axis::parse("ancestor"), None);
        assert_eq!(Axis::parse(""), None);
    }
}
