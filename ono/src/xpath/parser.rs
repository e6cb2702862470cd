//! Lexer and recursive-descent parser for XPath expressions.
//!
//! A malformed expression fails with `Error::SelectorSyntax` before any
//! evaluation happens; the evaluator never sees a partial parse.

use crate::error::{Error, Result};

use super::ast::{Axis, BinaryOp, Expr, NodeTest, Path, Step};

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Slash,
    DoubleSlash,
    LBracket,
    RBracket,
    LParen,
    RParen,
    At,
    Comma,
    Pipe,
    Eq,
    Neq,
    Star,
    Dot,
    DotDot,
    ColonColon,
    Colon,
    Ident(String),
    Literal(String),
    Number(f64),
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Slash => f.write_str("/"),
            Token::DoubleSlash => f.write_str("//"),
            Token::LBracket => f.write_str("["),
            Token::RBracket => f.write_str("]"),
            Token::LParen => f.write_str("("),
            Token::RParen => f.write_str(")"),
            Token::At => f.write_str("@"),
            Token::Comma => f.write_str(","),
            Token::Pipe => f.write_str("|"),
            Token::Eq => f.write_str("="),
            Token::Neq => f.write_str("!="),
            Token::Star => f.write_str("*"),
            Token::Dot => f.write_str("."),
            Token::DotDot => f.write_str(".."),
            Token::ColonColon => f.write_str("::"),
            Token::Colon => f.write_str(":"),
            Token::Ident(name) => f.write_str(name),
            Token::Literal(text) => write!(f, "'{text}'"),
            Token::Number(n) => write!(f, "{n}"),
        }
    }
}

fn syntax_error(message: impl Into<String>) -> Error {
    Error::SelectorSyntax(message.into())
}

fn is_name_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | '.')
}

fn tokenize(input: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();
    while let Some(&(start, c)) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '/' => {
                chars.next();
                if chars.peek().is_some_and(|&(_, c)| c == '/') {
                    chars.next();
                    tokens.push(Token::DoubleSlash);
                } else {
                    tokens.push(Token::Slash);
                }
            }
            '[' => {
                chars.next();
                tokens.push(Token::LBracket);
            }
            ']' => {
                chars.next();
                tokens.push(Token::RBracket);
            }
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            '@' => {
                chars.next();
                tokens.push(Token::At);
            }
            ',' => {
                chars.next();
                tokens.push(Token::Comma);
            }
            '|' => {
                chars.next();
                tokens.push(Token::Pipe);
            }
            '=' => {
                chars.next();
                tokens.push(Token::Eq);
            }
            '!' => {
                chars.next();
                if chars.peek().is_some_and(|&(_, c)| c == '=') {
                    chars.next();
                    tokens.push(Token::Neq);
                } else {
                    return Err(syntax_error("expected '=' after '!'"));
                }
            }
            '*' => {
                chars.next();
                tokens.push(Token::Star);
            }
            ':' => {
                chars.next();
                if chars.peek().is_some_and(|&(_, c)| c == ':') {
                    chars.next();
                    tokens.push(Token::ColonColon);
                } else {
                    tokens.push(Token::Colon);
                }
            }
            '.' => {
                chars.next();
                match chars.peek() {
                    Some(&(_, '.')) => {
                        chars.next();
                        tokens.push(Token::DotDot);
                    }
                    Some(&(_, c)) if c.is_ascii_digit() => {
                        let number = lex_number(input, start, &mut chars)?;
                        tokens.push(Token::Number(number));
                    }
                    _ => tokens.push(Token::Dot),
                }
            }
            '\'' | '"' => {
                let quote = c;
                chars.next();
                let mut text = String::new();
                let mut closed = false;
                for (_, c) in chars.by_ref() {
                    if c == quote {
                        closed = true;
                        break;
                    }
                    text.push(c);
                }
                if !closed {
                    return Err(syntax_error("unterminated string literal"));
                }
                tokens.push(Token::Literal(text));
            }
            c if c.is_ascii_digit() => {
                let number = lex_number(input, start, &mut chars)?;
                tokens.push(Token::Number(number));
            }
            c if is_name_start(c) => {
                let mut end = start;
                while let Some(&(pos, c)) = chars.peek() {
                    if is_name_char(c) {
                        end = pos + c.len_utf8();
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Ident(input[start..end].to_string()));
            }
            other => return Err(syntax_error(format!("unexpected character '{other}'"))),
        }
    }
    Ok(tokens)
}

/// Consumes `digits ['.' digits]` (or `.digits`, the leading dot already
/// consumed by the caller puts `start` before it).
fn lex_number(
    input: &str,
    start: usize,
    chars: &mut std::iter::Peekable<std::str::CharIndices>,
) -> Result<f64> {
    let mut end = start;
    while let Some(&(pos, c)) = chars.peek() {
        if c.is_ascii_digit() || c == '.' {
            end = pos + c.len_utf8();
            chars.next();
        } else {
            break;
        }
    }
    let slice = &input[start..end];
    slice
        .parse()
        .map_err(|_| syntax_error(format!("malformed number '{slice}'")))
}

/// Parses an XPath expression string into an AST.
pub(crate) fn parse(input: &str) -> Result<Expr> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(syntax_error("empty expression"));
    }
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.parse_or()?;
    if let Some(token) = parser.peek() {
        return Err(syntax_error(format!("unexpected trailing '{token}'")));
    }
    Ok(expr)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek2(&self) -> Option<&Token> {
        self.tokens.get(self.pos + 1)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: &Token) -> Result<()> {
        if self.eat(expected) {
            Ok(())
        } else {
            match self.peek() {
                Some(token) => Err(syntax_error(format!(
                    "expected '{expected}', found '{token}'"
                ))),
                None => Err(syntax_error(format!(
                    "expected '{expected}' before end of expression"
                ))),
            }
        }
    }

    /// True when the upcoming token is the given keyword used as an
    /// operator (`and` / `or`).
    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if matches!(self.peek(), Some(Token::Ident(name)) if name == keyword) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn parse_or(&mut self) -> Result<Expr> {
        let mut left = self.parse_and()?;
        while self.eat_keyword("or") {
            let right = self.parse_and()?;
            left = Expr::Binary {
                op: BinaryOp::Or,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr> {
        let mut left = self.parse_equality()?;
        while self.eat_keyword("and") {
            let right = self.parse_equality()?;
            left = Expr::Binary {
                op: BinaryOp::And,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> Result<Expr> {
        let mut left = self.parse_union()?;
        loop {
            let op = if self.eat(&Token::Eq) {
                BinaryOp::Eq
            } else if self.eat(&Token::Neq) {
                BinaryOp::Neq
            } else {
                break;
            };
            let right = self.parse_union()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_union(&mut self) -> Result<Expr> {
        let mut left = self.parse_primary()?;
        while self.eat(&Token::Pipe) {
            let right = self.parse_primary()?;
            left = Expr::Union(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        match self.peek() {
            Some(Token::Literal(_)) => {
                if let Some(Token::Literal(text)) = self.next() {
                    Ok(Expr::Literal(text))
                } else {
                    unreachable!()
                }
            }
            Some(Token::Number(_)) => {
                if let Some(Token::Number(n)) = self.next() {
                    Ok(Expr::Number(n))
                } else {
                    unreachable!()
                }
            }
            Some(Token::LParen) => {
                self.pos += 1;
                let inner = self.parse_or()?;
                self.expect(&Token::RParen)?;
                Ok(inner)
            }
            Some(Token::Ident(name))
                if self.peek2() == Some(&Token::LParen) && !is_node_type(name) =>
            {
                self.parse_function_call()
            }
            Some(_) => Ok(Expr::Path(self.parse_location_path()?)),
            None => Err(syntax_error("unexpected end of expression")),
        }
    }

    fn parse_function_call(&mut self) -> Result<Expr> {
        let name = match self.next() {
            Some(Token::Ident(name)) => name,
            _ => unreachable!("caller checked for an identifier"),
        };
        self.expect(&Token::LParen)?;
        let mut args = Vec::new();
        if self.peek() != Some(&Token::RParen) {
            loop {
                args.push(self.parse_or()?);
                if !self.eat(&Token::Comma) {
                    break;
                }
            }
        }
        self.expect(&Token::RParen)?;
        Ok(Expr::Function { name, args })
    }

    fn parse_location_path(&mut self) -> Result<Path> {
        let mut steps = Vec::new();
        let absolute = match self.peek() {
            Some(Token::Slash) => {
                self.pos += 1;
                // Bare `/` selects just the root.
                if !self.step_follows() {
                    return Ok(Path {
                        absolute: true,
                        steps,
                    });
                }
                true
            }
            Some(Token::DoubleSlash) => {
                self.pos += 1;
                steps.push(Step::descendant_or_self());
                true
            }
            _ => false,
        };

        steps.push(self.parse_step()?);
        loop {
            if self.eat(&Token::Slash) {
                steps.push(self.parse_step()?);
            } else if self.eat(&Token::DoubleSlash) {
                steps.push(Step::descendant_or_self());
                steps.push(self.parse_step()?);
            } else {
                break;
            }
        }
        Ok(Path { absolute, steps })
    }

    /// True when the next token can begin a step.
    fn step_follows(&self) -> bool {
        matches!(
            self.peek(),
            Some(
                Token::Ident(_)
                    | Token::Star
                    | Token::At
                    | Token::Dot
                    | Token::DotDot
            )
        )
    }

    fn parse_step(&mut self) -> Result<Step> {
        let mut step = match self.peek() {
            Some(Token::Dot) => {
                self.pos += 1;
                Step {
                    axis: Axis::SelfNode,
                    test: NodeTest::Node,
                    predicates: Vec::new(),
                }
            }
            Some(Token::DotDot) => {
                self.pos += 1;
                Step {
                    axis: Axis::Parent,
                    test: NodeTest::Node,
                    predicates: Vec::new(),
                }
            }
            Some(Token::At) => {
                self.pos += 1;
                let test = self.parse_node_test()?;
                Step {
                    axis: Axis::Attribute,
                    test,
                    predicates: Vec::new(),
                }
            }
            Some(Token::Ident(name)) if self.peek2() == Some(&Token::ColonColon) => {
                let axis = Axis::parse(name)
                    .ok_or_else(|| syntax_error(format!("unknown axis '{name}'")))?;
                self.pos += 2;
                let test = self.parse_node_test()?;
                Step {
                    axis,
                    test,
                    predicates: Vec::new(),
                }
            }
            Some(Token::Ident(_) | Token::Star) => {
                let test = self.parse_node_test()?;
                Step {
                    axis: Axis::Child,
                    test,
                    predicates: Vec::new(),
                }
            }
            Some(token) => {
                return Err(syntax_error(format!("expected step, found '{token}'")));
            }
            None => return Err(syntax_error("expected step before end of expression")),
        };

        while self.eat(&Token::LBracket) {
            let predicate = self.parse_or()?;
            self.expect(&Token::RBracket)?;
            step.predicates.push(predicate);
        }
        Ok(step)
    }

    fn parse_node_test(&mut self) -> Result<NodeTest> {
        match self.next() {
            Some(Token::Star) => Ok(NodeTest::Wildcard),
            Some(Token::Ident(name)) => {
                if self.peek() == Some(&Token::LParen) {
                    self.pos += 1;
                    self.expect(&Token::RParen)?;
                    return match name.as_str() {
                        "text" => Ok(NodeTest::Text),
                        "node" => Ok(NodeTest::Node),
                        other => Err(syntax_error(format!("unsupported node type '{other}()'"))),
                    };
                }
                if self.eat(&Token::Colon) {
                    let local = match self.next() {
                        Some(Token::Ident(local)) => local,
                        Some(token) => {
                            return Err(syntax_error(format!(
                                "expected local name after '{name}:', found '{token}'"
                            )))
                        }
                        None => {
                            return Err(syntax_error(format!(
                                "expected local name after '{name}:'"
                            )))
                        }
                    };
                    return Ok(NodeTest::Name {
                        prefix: Some(name),
                        local,
                    });
                }
                Ok(NodeTest::Name {
                    prefix: None,
                    local: name,
                })
            }
            Some(token) => Err(syntax_error(format!(
                "expected node test, found '{token}'"
            ))),
            None => Err(syntax_error("expected node test before end of expression")),
        }
    }
}

fn is_node_type(name: &str) -> bool {
    matches!(name, "text" | "node")
}
