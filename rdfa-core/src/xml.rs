//! Drives an [`RdfaParser`] from an XML document using `quick-xml`.

use std::borrow::Cow;

use quick_xml::events::{BytesStart, Event};
use quick_xml::name::ResolveResult;
use quick_xml::{Decoder, NsReader};

use crate::attributes::{Attribute, Location};
use crate::engine::RdfaParser;
use crate::error::ErrorHandler;
use crate::sink::TripleSink;

/// Maps byte offsets to line and column.
struct LineIndex {
    line_starts: Vec<usize>,
}

impl LineIndex {
    fn new(input: &str) -> Self {
        let line_starts = std::iter::once(0)
            .chain(input.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Self { line_starts }
    }

    fn location(&self, offset: u64) -> Location {
        let offset = usize::try_from(offset).unwrap_or(usize::MAX);
        let line = self.line_starts.partition_point(|start| *start <= offset);
        let column = offset - self.line_starts[line.saturating_sub(1)];
        Location::new(line as u64, column as u64 + 1)
    }
}

/// Feeds every element and text node of `input` to `parser`.
///
/// Well-formedness errors end the walk; whatever was emitted up to that
/// point stays emitted.
pub fn walk_str<S: TripleSink, E: ErrorHandler>(
    input: &str,
    parser: &mut RdfaParser<'_, S, E>,
) -> Result<(), crate::Error> {
    walk(input, parser).map_err(crate::Error::from)
}

fn walk<S: TripleSink, E: ErrorHandler>(
    input: &str,
    parser: &mut RdfaParser<'_, S, E>,
) -> Result<(), quick_xml::Error> {
    let lines = LineIndex::new(input);
    let mut reader = NsReader::from_str(input);
    reader.config_mut().expand_empty_elements = true;
    let decoder = reader.decoder();

    loop {
        let position = reader.buffer_position();
        match reader.read_event()? {
            Event::Start(start) => {
                // attribute values cannot hold a raw `<`, so the last one
                // before the end of the event opens this tag
                let end = usize::try_from(reader.buffer_position()).unwrap_or(input.len());
                let offset = input.get(..end).and_then(|s| s.rfind('<')).unwrap_or(0);
                let location = lines.location(offset as u64);
                let (namespace, local_name) = reader.resolve_element(start.name());
                let namespace = match namespace {
                    ResolveResult::Bound(namespace) => decoder.decode(namespace.0)?,
                    ResolveResult::Unbound | ResolveResult::Unknown(_) => Cow::Borrowed(""),
                };
                let local_name = decoder.decode(local_name.as_ref())?;
                let qualified_name = decoder.decode(start.name().0)?;
                let attributes = attributes(&start, decoder, location)?;

                parser.begin_element(&namespace, &local_name, &qualified_name, &attributes, location);
            }
            Event::End(end) => {
                let (namespace, local_name) = reader.resolve_element(end.name());
                let namespace = match namespace {
                    ResolveResult::Bound(namespace) => decoder.decode(namespace.0)?,
                    ResolveResult::Unbound | ResolveResult::Unknown(_) => Cow::Borrowed(""),
                };
                let local_name = decoder.decode(local_name.as_ref())?;
                let qualified_name = decoder.decode(end.name().0)?;

                parser.end_element(&namespace, &local_name, &qualified_name);
            }
            Event::Text(text) => {
                parser.text(&text.unescape()?, lines.location(position));
            }
            Event::CData(cdata) => {
                parser.text(&decoder.decode(&cdata)?, lines.location(position));
            }
            Event::Eof => return Ok(()),
            Event::Empty(_)
            | Event::Comment(_)
            | Event::Decl(_)
            | Event::PI(_)
            | Event::DocType(_) => {}
        }
    }
}

fn attributes(
    start: &BytesStart<'_>,
    decoder: Decoder,
    location: Location,
) -> Result<Vec<Attribute<'static>>, quick_xml::Error> {
    let mut attributes = Vec::new();
    for attribute in start.attributes() {
        let attribute = attribute.map_err(quick_xml::Error::InvalidAttr)?;
        let name = decoder.decode(attribute.key.as_ref())?.into_owned();
        let value = attribute.decode_and_unescape_value(decoder)?.into_owned();
        attributes.push(Attribute::new(name, value).at(location));
    }
    Ok(attributes)
}
