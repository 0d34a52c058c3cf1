//! Drives an [`RdfaParser`] from an HTML document parsed by `scraper`.

use scraper::{ElementRef, Html, Node};

use crate::attributes::{Attribute, Location};
use crate::engine::RdfaParser;
use crate::error::ErrorHandler;
use crate::sink::TripleSink;

/// Feeds the element tree under the document element to `parser`.
///
/// The HTML parser does not keep source positions, so every event is
/// reported at the default location.
pub fn walk<S: TripleSink, E: ErrorHandler>(document: &Html, parser: &mut RdfaParser<'_, S, E>) {
    enum Step<'a> {
        Enter(ElementRef<'a>),
        Text(&'a str),
        Exit(ElementRef<'a>),
    }

    if !document.errors.is_empty() {
        for error in document.errors.iter() {
            tracing::debug!("HTML parse error: {error}");
        }
    }

    let mut stack = vec![Step::Enter(document.root_element())];
    while let Some(step) = stack.pop() {
        match step {
            Step::Enter(element) => {
                let value = element.value();
                let attributes: Vec<Attribute<'_>> = value
                    .attrs()
                    .map(|(name, value)| Attribute::new(name, value))
                    .collect();

                parser.begin_element(
                    &value.name.ns,
                    value.name(),
                    value.name(),
                    &attributes,
                    Location::default(),
                );

                stack.push(Step::Exit(element));
                for child in element.children().rev() {
                    if let Some(child) = ElementRef::wrap(child) {
                        stack.push(Step::Enter(child));
                    } else if let Node::Text(text) = child.value() {
                        stack.push(Step::Text(text));
                    }
                }
            }
            Step::Text(text) => parser.text(text, Location::default()),
            Step::Exit(element) => {
                let value = element.value();
                parser.end_element(&value.name.ns, value.name(), value.name());
            }
        }
    }
}
