//! Strict XML tree construction.

use quick_xml::events::Event;
use quick_xml::Reader;

use super::{Dialect, TreeBuilder};
use crate::document::{Document, ParseOptions};
use crate::error::Result;

/// Parses well-formed XML into a document tree.
pub(crate) fn parse(input: &[u8], options: &ParseOptions) -> Result<Document> {
    let mut reader = Reader::from_reader(input);
    let config = reader.config_mut();
    config.trim_text_start = false;
    config.trim_text_end = false;

    let mut builder = TreeBuilder::new(input, Dialect::Xml);
    let mut buf = Vec::new();
    loop {
        let pos = reader.buffer_position();
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                builder.open_element(e, &reader, pos)?;
            }
            Ok(Event::Empty(ref e)) => {
                builder.open_element(e, &reader, pos)?;
                builder.close_element();
            }
            Ok(Event::End(_)) => builder.close_element(),
            Ok(Event::Text(ref e)) => {
                let raw = reader
                    .decoder()
                    .decode(e.as_ref())
                    .map_err(|err| builder.error_at(pos, err.to_string()))?;
                let text = builder.unescape_text(&raw, pos)?;
                if builder.in_element() {
                    builder.append_text(&text);
                } else if !text.trim().is_empty() {
                    return Err(builder.error_at(pos, "content outside the document element"));
                }
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
            Ok(Event::DocType(_)) => {
                // DTDs are not validated (non-goal); the declaration is
                // consumed and dropped.
            }
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
