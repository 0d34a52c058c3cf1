use oxiri::Iri;
use oxrdf::Graph;

pub mod attributes;
pub mod blank;
pub mod context;
pub mod engine;
pub mod error;
pub mod html;
pub mod literal;
pub mod profile;
pub mod registry;
pub mod sink;
pub mod uri;
pub mod vocab;
pub mod xml;

pub use attributes::{AttrKind, Attribute, Location};
pub use context::TermMatching;
pub use engine::{DocumentFormat, RdfaParser};
pub use error::{
    ErrorCollector, ErrorHandler, IgnoreErrors, LoggingErrorHandler, ProcessorGraph, RdfaError,
    RdfaErrorKind, ResolveError,
};
pub use profile::{CachingProfileHandler, Profile, ProfileError, ProfileHandler, StaticProfiles};
pub use sink::{GraphSink, TripleCollector, TripleSink};
pub use uri::UriRef;

#[derive(derive_more::Error, derive_more::Display, derive_more::From, Debug)]
pub enum Error {
    #[display("IRI parse error: `{iri}`")]
    IriParseError {
        source: oxiri::IriParseError,
        iri: String,
    },

    #[display("XML error: {_0}")]
    Xml(quick_xml::Error),
}

/// Extracts the triples of an HTML document into `output_graph`, reporting
/// problems into `processor_graph`.
///
/// The document is read as XHTML+RDFa: the XHTML vocabulary profile is in
/// effect and a `<base>` in `<head>` applies to the whole document.
pub fn parse_html(
    input: &str,
    base: Iri<String>,
    output_graph: &mut Graph,
    processor_graph: &mut Graph,
) {
    let document = scraper::Html::parse_document(input);
    let mut parser = RdfaParser::new(
        base,
        GraphSink::new(output_graph),
        ProcessorGraph::new(processor_graph),
    )
    .with_format(DocumentFormat::Xhtml)
    .with_profile_handler(StaticProfiles::xhtml());

    html::walk(&document, &mut parser);
    parser.finish();
}

/// Extracts the triples of an XML or XHTML document.
///
/// With [`DocumentFormat::Unknown`] the format is taken from the default
/// namespace of the document element.
pub fn parse_xml(
    input: &str,
    base: Iri<String>,
    format: DocumentFormat,
    output_graph: &mut Graph,
    processor_graph: &mut Graph,
) -> Result<(), Error> {
    let mut parser = RdfaParser::new(
        base,
        GraphSink::new(output_graph),
        ProcessorGraph::new(processor_graph),
    )
    .with_format(format)
    .with_profile_handler(StaticProfiles::xhtml());

    let result = xml::walk_str(input, &mut parser);
    parser.finish();
    result
}
