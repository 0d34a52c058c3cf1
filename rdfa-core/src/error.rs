use oxrdf::vocab::rdf;
use oxrdf::{BlankNode, Graph, LiteralRef, NamedNodeRef, TripleRef};

use crate::attributes::{AttrKind, Location};
use crate::profile::ProfileError;
use crate::vocab::{dc, rdfa};

/// Why a single attribute value could not be turned into a resource.
#[derive(derive_more::Error, derive_more::Display, Debug)]
pub enum ResolveError {
    #[display("safe CURIE `[]` is empty")]
    EmptySafeCurie,

    #[display("`{value}` is not a valid IRI reference")]
    InvalidIri {
        value: String,
        source: oxiri::IriParseError,
    },

    #[display("`{value}` is neither a known CURIE nor an absolute IRI")]
    NotAbsolute {
        value: String,
    },

    #[display("`{value}` is not a valid term")]
    InvalidTerm {
        value: String,
    },

    #[display("`{term}` is not a known term and no default vocabulary is in scope")]
    NoVocabulary {
        term: String,
    },

    #[display("`{value}` has an empty prefix but its reference is not a name")]
    InvalidDefaultPrefixReference {
        value: String,
    },

    #[display("`{value}` resolves to a blank node, which cannot be a predicate")]
    BlankNodePredicate {
        value: String,
    },
}

/// What went wrong on an element.
#[derive(derive_more::Error, derive_more::Display, Debug)]
pub enum RdfaErrorKind {
    #[display("{attribute} is not a valid URI: {source}")]
    NotUri {
        attribute: AttrKind,
        source: ResolveError,
    },

    #[display("{attribute} is not a valid CURIE or URI: {source}")]
    NotCurieOrUri {
        attribute: AttrKind,
        source: ResolveError,
    },

    #[display("{attribute} is not a valid term, CURIE or absolute URI: {source}")]
    NotTermCurieOrAbsUri {
        attribute: AttrKind,
        source: ResolveError,
    },

    #[display("profile <{profile}> could not be loaded: {source}")]
    ProfileLoadFailure {
        profile: String,
        source: ProfileError,
    },

    #[display("profile <{profile}> is required but no profile handler is available")]
    ProfileHandlerMissing {
        profile: String,
    },

    #[display("the prefix '_' is reserved")]
    ReservedPrefix,

    #[display("@prefix syntax error: `{token}` must end with ':'")]
    MalformedPrefix {
        token: String,
    },

    #[display("{attribute} value `{tag}` is not a valid language tag")]
    InvalidLanguage {
        attribute: AttrKind,
        tag: String,
    },
}

impl RdfaErrorKind {
    /// Fatal errors stop triple emission for the rest of the subtree.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::ProfileLoadFailure { .. } | Self::ProfileHandlerMissing { .. }
        )
    }
}

/// An error reported against a particular element.
#[derive(derive_more::Error, derive_more::Display, Debug)]
#[display("<{element}> at {location}: {kind}")]
pub struct RdfaError {
    #[error(source)]
    pub kind: RdfaErrorKind,
    pub element: String,
    pub location: Location,
}

/// Receives everything the processor finds wrong with a document.
///
/// Both calls are advisory: processing continues whatever the handler does.
pub trait ErrorHandler {
    fn warning(&mut self, error: RdfaError);

    fn fatal_error(&mut self, error: RdfaError);
}

impl<T: ErrorHandler + ?Sized> ErrorHandler for &mut T {
    fn warning(&mut self, error: RdfaError) {
        (**self).warning(error)
    }

    fn fatal_error(&mut self, error: RdfaError) {
        (**self).fatal_error(error)
    }
}

/// Drops every report.
#[derive(Clone, Copy, Debug, Default)]
pub struct IgnoreErrors;

impl ErrorHandler for IgnoreErrors {
    fn warning(&mut self, _: RdfaError) {}

    fn fatal_error(&mut self, _: RdfaError) {}
}

/// Forwards reports to `tracing`.
#[derive(Clone, Copy, Debug, Default)]
pub struct LoggingErrorHandler;

impl ErrorHandler for LoggingErrorHandler {
    fn warning(&mut self, error: RdfaError) {
        tracing::warn!(element = %error.element, location = %error.location, "{}", error.kind);
    }

    fn fatal_error(&mut self, error: RdfaError) {
        tracing::error!(element = %error.element, location = %error.location, "{}", error.kind);
    }
}

/// Keeps every report for later inspection.
#[derive(Debug, Default)]
pub struct ErrorCollector {
    pub warnings: Vec<RdfaError>,
    pub fatal_errors: Vec<RdfaError>,
}

impl ErrorHandler for ErrorCollector {
    fn warning(&mut self, error: RdfaError) {
        self.warnings.push(error);
    }

    fn fatal_error(&mut self, error: RdfaError) {
        self.fatal_errors.push(error);
    }
}

/// Writes reports into a processor graph: each one becomes a blank node
/// typed `rdfa:Warning` or `rdfa:Error` (or a more specific class) with a
/// `dc:description`.
pub struct ProcessorGraph<'g> {
    graph: &'g mut Graph,
    count: u64,
}

impl<'g> ProcessorGraph<'g> {
    pub fn new(graph: &'g mut Graph) -> Self {
        Self { graph, count: 0 }
    }

    fn emit(&mut self, class: NamedNodeRef<'_>, error: &RdfaError) {
        self.count += 1;
        // labels only need to be unique within the processor graph
        let Ok(node) = BlankNode::new(format!("pg{}", self.count)) else {
            return;
        };

        let description = error.to_string();
        let type_triple = TripleRef::new(node.as_ref(), rdf::TYPE, class);
        let description_triple = TripleRef::new(
            node.as_ref(),
            dc::DESCRIPTION,
            LiteralRef::new_simple_literal(&description),
        );
        tracing::trace!("emitting processor triple: {type_triple}");
        self.graph.insert(type_triple);
        tracing::trace!("emitting processor triple: {description_triple}");
        self.graph.insert(description_triple);
    }
}

fn processor_class(kind: &RdfaErrorKind) -> Option<NamedNodeRef<'static>> {
    match kind {
        RdfaErrorKind::NotCurieOrUri { .. } => Some(rdfa::UNRESOLVED_CURIE),
        RdfaErrorKind::NotTermCurieOrAbsUri { .. } => Some(rdfa::UNRESOLVED_TERM),
        RdfaErrorKind::ProfileLoadFailure { .. } | RdfaErrorKind::ProfileHandlerMissing { .. } => {
            Some(rdfa::PROFILE_REFERENCE_ERROR)
        }
        _ => None,
    }
}

impl ErrorHandler for ProcessorGraph<'_> {
    fn warning(&mut self, error: RdfaError) {
        self.emit(processor_class(&error.kind).unwrap_or(rdfa::WARNING), &error);
    }

    fn fatal_error(&mut self, error: RdfaError) {
        self.emit(processor_class(&error.kind).unwrap_or(rdfa::ERROR), &error);
    }
}
