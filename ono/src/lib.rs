//! Ono - Read-only XML and HTML document querying
//!
//! This library parses XML and HTML into an immutable tree and answers
//! queries against it with XPath expressions or CSS selectors.
//!
//! # Overview
//!
//! A [`Document`] is built once from markup and never mutated afterwards,
//! so it can be shared freely across threads. Elements are lightweight
//! `Copy` handles into the document; navigation and querying never
//! allocate new nodes.
//!
//! # Key Features
//!
//! - XML parsing with namespace support, HTML parsing with tag-soup
//!   recovery (void elements, unclosed tags, bare entities)
//! - A practical XPath subset: paths, predicates, unions, and the core
//!   functions
//! - CSS selectors, answered by translating them to XPath
//! - Typed value extraction: string, number, and date reads with
//!   configurable formats
//!
//! # Example
//!
//! ```
//! use ono::{Document, Searching};
//!
//! # fn main() -> ono::Result<()> {
//! let doc = Document::parse_xml("<menu><dish>eggs</dish><dish>toast</dish></menu>")?;
//! for dish in doc.xpath("//dish")? {
//!     println!("{}", dish.string_value());
//! }
//! assert_eq!(doc.css("menu > dish")?.len(), 2);
//! # Ok(())
//! # }
//! ```

mod css;
mod document;
mod element;
mod error;
mod format;
mod namespace;
mod parse;
mod search;
mod tree;
mod xpath;

pub use document::{Document, ParseOptions};
pub use element::Element;
pub use error::{Error, Result};
pub use format::{DateFormat, NumberFormat};
pub use namespace::QName;
pub use search::{Matches, SearchContext, Searching};
pub use tree::Attribute;
pub use xpath::{Value, XPathExpr};
