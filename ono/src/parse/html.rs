//! Lenient HTML tree construction.
//!
//! HTML input gets the same event stream as XML, but with recovery instead
//! of rejection: tag names are lowercased, void elements never take
//! children, sibling-closing elements like `<li>` and `<p>` get implied
//! end tags, mismatched end tags close intervening open elements (or are
//! dropped), entities that fail to unescape are kept verbatim, and
//! anything still open at end of input is closed. The recovery decisions
//! are logged at `debug!` level and never fail the parse; only reader-level
//! errors (e.g. invalid encoding) do.

use quick_xml::events::Event;
use quick_xml::Reader;

use super::{Dialect, TreeBuilder};
use crate::document::{Document, ParseOptions};
use crate::error::Result;

/// Elements that never have content and need no end tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

fn is_void(tag: &str) -> bool {
    VOID_ELEMENTS.contains(&tag)
}

/// True when an open `<{open}>` has an implied end tag before `<{next}>`
/// starts. Covers the sibling-closing elements that appear without end
/// tags in real pages.
fn auto_closes(open: &str, next: &str) -> bool {
    match open {
        "p" => next == "p",
        "li" => next == "li",
        "dt" | "dd" => matches!(next, "dt" | "dd"),
        "tr" => next == "tr",
        "td" | "th" => matches!(next, "td" | "th" | "tr"),
        "option" => matches!(next, "option" | "optgroup"),
        _ => false,
    }
}

/// Closes open elements whose end tags are implied by the next start tag,
/// innermost first (`<tr><td>x<tr>` closes both the cell and the row).
fn close_implied(builder: &mut TreeBuilder<'_>, next: &str) {
    while auto_closes(builder.current_tag(), next) {
        log::debug!("implying </{}> before <{next}>", builder.current_tag());
        builder.close_element();
    }
}

/// Parses HTML into a document tree, tolerating real-world markup.
pub(crate) fn parse(input: &[u8], options: &ParseOptions) -> Result<Document> {
    let mut reader = Reader::from_reader(input);
    let config = reader.config_mut();
    config.trim_text_start = false;
    config.trim_text_end = false;
    config.check_end_names = false;
    config.allow_unmatched_ends = true;

    let mut builder = TreeBuilder::new(input, Dialect::Html);
    let mut buf = Vec::new();
    loop {
        let pos = reader.buffer_position();
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                let tag = reader
                    .decoder()
                    .decode(e.name().as_ref())
                    .map_err(|err| builder.error_at(pos, err.to_string()))?
                    .to_ascii_lowercase();
                close_implied(&mut builder, &tag);
                let id = builder.open_element(e, &reader, pos)?;
                if is_void(builder.tag_of(id)) {
                    builder.close_element();
                }
            }
            Ok(Event::Empty(ref e)) => {
                let tag = reader
                    .decoder()
                    .decode(e.name().as_ref())
                    .map_err(|err| builder.error_at(pos, err.to_string()))?
                    .to_ascii_lowercase();
                close_implied(&mut builder, &tag);
                builder.open_element(e, &reader, pos)?;
                builder.close_element();
            }
            Ok(Event::End(ref e)) => {
                let tag = reader
                    .decoder()
                    .decode(e.name().as_ref())
                    .map_err(|err| builder.error_at(pos, err.to_string()))?
                    .to_ascii_lowercase();
                if !is_void(&tag) {
                    builder.recover_end_tag(&tag);
                }
            }
            Ok(Event::Text(ref e)) => {
                let raw = reader
                    .decoder()
                    .decode(e.as_ref())
                    .map_err(|err| builder.error_at(pos, err.to_string()))?;
                let text = builder.unescape_text(&raw, pos)?;
                builder.append_text(&text);
            }
            Ok(Event::CData(ref e)) => {
                let text = reader
                    .decoder()
                    .decode(e.as_ref())
                    .map_err(|err| builder.error_at(pos, err.to_string()))?;
                builder.append_text(&text);
            }
            Ok(Event::GeneralRef(ref e)) => {
                let name = reader
                    .decoder()
                    .decode(e.as_ref())
                    .map_err(|err| builder.error_at(pos, err.to_string()))?;
                builder.resolve_reference(&name, pos)?;
            }
            Ok(Event::Comment(ref e)) => {
                let text = reader
                    .decoder()
                    .decode(e.as_ref())
                    .map_err(|err| builder.error_at(pos, err.to_string()))?;
                builder.append_comment(&text);
            }
            Ok(Event::PI(ref e)) => {
                let target = reader
                    .decoder()
                    .decode(e.target().as_ref())
                    .map_err(|err| builder.error_at(pos, err.to_string()))?
                    .into_owned();
                let data = reader
                    .decoder()
                    .decode(e.content().as_ref())
                    .map_err(|err| builder.error_at(pos, err.to_string()))?;
                builder.append_pi(&target, &data);
            }
            Ok(Event::Decl(ref d)) => builder.set_decl(d, &reader, pos)?,
            Ok(Event::DocType(_)) => {}
            Ok(Event::Eof) => break,
            Err(err) => {
                let offset = reader.error_position();
                return Err(builder.error_at(offset, err.to_string()));
            }
        }
        buf.clear();
    }

    builder.finish(options)
}
