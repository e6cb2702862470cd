//! CSS selector to XPath translation.
//!
//! CSS queries are answered by compiling the selector to an equivalent
//! XPath expression and running that; the translation is deterministic,
//! so a process-wide LRU cache keyed by selector text makes repeated
//! queries cheap. Each group anchors at the `descendant` axis, so a
//! selector scoped to an element matches strict descendants and never
//! the context element itself.
//!
//! Supported: type and universal selectors, `#id`, `.class`, `[attr]`,
//! `[attr=value]`, `[attr~=value]`, selector groups (`,`), and the
//! descendant, child (`>`), adjacent (`+`), and general (`~`) sibling
//! combinators. Pseudo-classes and the remaining attribute operators
//! fail with `Error::SelectorUnsupported`.

use std::num::NonZeroUsize;
use std::sync::{Mutex, OnceLock};

use lru::LruCache;

use crate::error::{Error, Result};

const CACHE_CAPACITY: usize = 256;

fn cache() -> &'static Mutex<LruCache<String, String>> {
    static CACHE: OnceLock<Mutex<LruCache<String, String>>> = OnceLock::new();
    CACHE.get_or_init(|| {
        let capacity = NonZeroUsize::new(CACHE_CAPACITY).expect("capacity is non-zero");
        Mutex::new(LruCache::new(capacity))
    })
}

fn syntax_error(message: impl Into<String>) -> Error {
    Error::SelectorSyntax(message.into())
}

fn unsupported(message: impl Into<String>) -> Error {
    Error::SelectorUnsupported(message.into())
}

/// Translates a CSS selector into XPath, consulting the cache first.
pub(crate) fn to_xpath(selector: &str) -> Result<String> {
    {
        let mut cache = cache().lock().unwrap_or_else(|e| e.into_inner());
        if let Some(xpath) = cache.get(selector) {
            return Ok(xpath.clone());
        }
    }
    let xpath = translate(selector)?;
    let mut cache = cache().lock().unwrap_or_else(|e| e.into_inner());
    cache.put(selector.to_string(), xpath.clone());
    Ok(xpath)
}

fn translate(selector: &str) -> Result<String> {
    let groups = split_groups(selector)?;
    let mut paths = Vec::with_capacity(groups.len());
    for group in groups {
        paths.push(translate_group(group)?);
    }
    Ok(paths.join(" | "))
}

/// Splits a selector list on commas that sit outside brackets and quotes.
fn split_groups(selector: &str) -> Result<Vec<&str>> {
    let mut groups = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;
    for (i, c) in selector.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(c),
            (None, '[') => depth += 1,
            (None, ']') => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| syntax_error("unbalanced ']'"))?;
            }
            (None, ',') if depth == 0 => {
                groups.push(&selector[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    if quote.is_some() {
        return Err(syntax_error("unterminated string in selector"));
    }
    if depth != 0 {
        return Err(syntax_error("unbalanced '[' in selector"));
    }
    groups.push(&selector[start..]);
    for group in &groups {
        if group.trim().is_empty() {
            return Err(syntax_error("empty selector group"));
        }
    }
    Ok(groups)
}

fn translate_group(group: &str) -> Result<String> {
    let mut out = String::new();
    let mut rest = group.trim();
    let mut first = true;
    while !rest.is_empty() {
        let combinator = if first {
            None
        } else {
            let (c, after) = take_combinator(rest)?;
            rest = after;
            Some(c)
        };
        let (compound, after) = take_compound(rest)?;
        rest = after.trim_start();

        let step = compound_to_step(compound)?;
        match combinator {
            None => {
                out.push_str("descendant::");
                out.push_str(&step);
            }
            Some(' ') => {
                out.push_str("//");
                out.push_str(&step);
            }
            Some('>') => {
                out.push('/');
                out.push_str(&step);
            }
            Some('+') => {
                out.push_str("/following-sibling::*[1]/self::");
                out.push_str(&step);
            }
            Some('~') => {
                out.push_str("/following-sibling::");
                out.push_str(&step);
            }
            Some(other) => return Err(syntax_error(format!("unknown combinator '{other}'"))),
        }
        first = false;
    }
    Ok(out)
}

/// Reads the combinator between two compounds. Plain whitespace is the
/// descendant combinator.
fn take_combinator(rest: &str) -> Result<(char, &str)> {
    let trimmed = rest.trim_start();
    match trimmed.chars().next() {
        Some(c @ ('>' | '+' | '~')) => {
            let after = trimmed[c.len_utf8()..].trim_start();
            if after.is_empty() {
                return Err(syntax_error(format!("dangling combinator '{c}'")));
            }
            Ok((c, after))
        }
        Some(_) => Ok((' ', trimmed)),
        None => Err(syntax_error("expected a selector after combinator")),
    }
}

/// Takes one compound selector off the front: everything up to the next
/// top-level whitespace or combinator.
fn take_compound(rest: &str) -> Result<(&str, &str)> {
    let mut quote: Option<char> = None;
    let mut in_brackets = false;
    for (i, c) in rest.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(c),
            (None, '[') => in_brackets = true,
            (None, ']') => in_brackets = false,
            (None, c) if !in_brackets && (c.is_whitespace() || matches!(c, '>' | '+' | '~')) => {
                if i == 0 {
                    return Err(syntax_error(format!("unexpected '{c}' in selector")));
                }
                return Ok(rest.split_at(i));
            }
            _ => {}
        }
    }
    Ok((rest, ""))
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '-' | '_')
}

/// Converts a compound selector (`tag#id.class[attr=v]`) into one XPath
/// step with predicates.
fn compound_to_step(compound: &str) -> Result<String> {
    let mut chars = compound.char_indices().peekable();
    let mut step = String::new();

    // Leading type selector, or `*`, or implied `*`.
    match chars.peek() {
        Some(&(_, '*')) => {
            chars.next();
            step.push('*');
        }
        Some(&(_, c)) if is_ident_char(c) => {
            let name = take_ident(&mut chars);
            step.push_str(&name);
        }
        _ => step.push('*'),
    }

    while let Some(&(_, c)) = chars.peek() {
        match c {
            '#' => {
                chars.next();
                let id = take_ident(&mut chars);
                if id.is_empty() {
                    return Err(syntax_error("expected an identifier after '#'"));
                }
                step.push_str(&format!("[@id={}]", xpath_literal(&id)));
            }
            '.' => {
                chars.next();
                let class = take_ident(&mut chars);
                if class.is_empty() {
                    return Err(syntax_error("expected a class name after '.'"));
                }
                step.push_str(&token_predicate("@class", &class));
            }
            '[' => {
                chars.next();
                let end = attribute_end(&mut chars)?;
                step.push_str(&end);
            }
            ':' => {
                chars.next();
                let name = take_ident(&mut chars);
                return Err(unsupported(format!("pseudo-class ':{name}'")));
            }
            '|' => {
                return Err(unsupported("namespaced selectors"));
            }
            other => {
                return Err(syntax_error(format!(
                    "unexpected '{other}' in selector '{compound}'"
                )))
            }
        }
    }
    Ok(step)
}

fn take_ident(chars: &mut std::iter::Peekable<std::str::CharIndices>) -> String {
    let mut out = String::new();
    while let Some(&(_, c)) = chars.peek() {
        if is_ident_char(c) {
            out.push(c);
            chars.next();
        } else {
            break;
        }
    }
    out
}

/// Parses the inside of `[...]` (the `[` already consumed) and returns
/// the XPath predicate.
fn attribute_end(
    chars: &mut std::iter::Peekable<std::str::CharIndices>,
) -> Result<String> {
    skip_spaces(chars);
    let name = take_ident(chars);
    if name.is_empty() {
        return Err(syntax_error("expected an attribute name in '[...]'"));
    }
    skip_spaces(chars);

    let op = match chars.peek() {
        Some(&(_, ']')) => {
            chars.next();
            return Ok(format!("[@{name}]"));
        }
        Some(&(_, '=')) => {
            chars.next();
            "="
        }
        Some(&(_, '~')) => {
            chars.next();
            if !matches!(chars.peek(), Some(&(_, '='))) {
                return Err(syntax_error("expected '=' after '~' in '[...]'"));
            }
            chars.next();
            "~="
        }
        Some(&(_, c @ ('^' | '$' | '*' | '|'))) => {
            return Err(unsupported(format!("attribute operator '{c}='")));
        }
        Some(&(_, other)) => {
            return Err(syntax_error(format!("unexpected '{other}' in '[...]'")));
        }
        None => return Err(syntax_error("unclosed '[' in selector")),
    };

    skip_spaces(chars);
    let value = take_attribute_value(chars)?;
    skip_spaces(chars);
    if !matches!(chars.next(), Some((_, ']'))) {
        return Err(syntax_error("unclosed '[' in selector"));
    }

    match op {
        "=" => Ok(format!("[@{name}={}]", xpath_literal(&value))),
        "~=" => Ok(token_predicate(&format!("@{name}"), &value)),
        _ => unreachable!(),
    }
}

fn take_attribute_value(
    chars: &mut std::iter::Peekable<std::str::CharIndices>,
) -> Result<String> {
    match chars.peek() {
        Some(&(_, quote @ ('\'' | '"'))) => {
            chars.next();
            let mut out = String::new();
            for (_, c) in chars.by_ref() {
                if c == quote {
                    return Ok(out);
                }
                out.push(c);
            }
            Err(syntax_error("unterminated string in '[...]'"))
        }
        Some(_) => {
            let value = take_ident(chars);
            if value.is_empty() {
                return Err(syntax_error("expected a value in '[...]'"));
            }
            Ok(value)
        }
        None => Err(syntax_error("unclosed '[' in selector")),
    }
}

fn skip_spaces(chars: &mut std::iter::Peekable<std::str::CharIndices>) {
    while matches!(chars.peek(), Some(&(_, c)) if c.is_whitespace()) {
        chars.next();
    }
}

/// Whitespace-token membership test, the `~=` / `.class` semantics.
fn token_predicate(attr: &str, token: &str) -> String {
    format!(
        "[contains(concat(' ', normalize-space({attr}), ' '), {})]",
        xpath_literal(&format!(" {token} "))
    )
}

/// Quotes a string as an XPath literal. Values containing both quote
/// kinds fall back to a concat() of single-quoted pieces.
fn xpath_literal(value: &str) -> String {
    if !value.contains('\'') {
        format!("'{value}'")
    } else if !value.contains('"') {
        format!("\"{value}\"")
    } else {
        let pieces: Vec<String> = value
            .split('\'')
            .map(|piece| format!("'{piece}'"))
            .collect();
        format!("concat({})", pieces.join(", \"'\", "))
    }
}
