//! Error types for document parsing and selector evaluation.

use thiserror::Error;

/// Result type alias for this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced while parsing documents or evaluating selectors.
///
/// All failures share this one domain. New kinds may be added without a
/// breaking change, hence `#[non_exhaustive]`.
///
/// Content-conversion failures (`number_value`, `date_value`) are *not*
/// errors: heterogeneous element content is the normal case, so those
/// accessors return `None` instead.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Malformed XML, or HTML the lenient builder could not recover.
    ///
    /// `line` and `column` are 1-based and populated when the reader
    /// position is known.
    #[error("parse error: {message}")]
    Parse {
        /// Diagnostic text.
        message: String,
        /// Source line of the failure, when available.
        line: Option<u64>,
        /// Source column of the failure, when available.
        column: Option<u64>,
    },

    /// Error from the underlying XML reader.
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// Malformed XPath or CSS selector text.
    #[error("selector syntax error: {0}")]
    SelectorSyntax(String),

    /// Syntactically valid CSS that uses a construct the compiler does not
    /// translate (pseudo-classes, substring attribute matchers, ...).
    #[error("unsupported selector: {0}")]
    SelectorUnsupported(String),

    /// Indexed child access beyond the child count.
    #[error("child index {index} out of range (element has {len} children)")]
    IndexOutOfRange {
        /// The requested index.
        index: usize,
        /// The number of children.
        len: usize,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_display() {
        let err = Error::Parse {
            message: "unexpected end tag".to_string(),
            line: Some(3),
            column: Some(14),
        };
        assert_eq!(err.to_string(), "parse error: unexpected end tag");
    }

    #[test]
    fn test_index_out_of_range_display() {
        let err = Error::IndexOutOfRange { index: 5, len: 2 };
        assert_eq!(
            err.to_string(),
            "child index 5 out of range (element has 2 children)"
        );
    }
}
