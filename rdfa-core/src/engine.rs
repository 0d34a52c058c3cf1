use std::collections::HashSet;
use std::str::FromStr;

use icu::locale::LanguageIdentifier;
use itertools::Itertools;
use oxiri::Iri;
use oxrdf::vocab::rdf;

use crate::attributes::{Attr, AttrKind, AttrValue, Attribute, AttributeView, Location};
use crate::context::{Context, IncompleteTriple, Session, TermMatching};
use crate::error::{ErrorHandler, RdfaError, RdfaErrorKind, ResolveError};
use crate::literal::LiteralCollector;
use crate::profile::ProfileHandler;
use crate::sink::TripleSink;
use crate::uri::UriRef;
use crate::vocab;

/// The host language of a document.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DocumentFormat {
    /// Decided on the first element: XHTML if its default namespace is the
    /// XHTML namespace, XML otherwise.
    #[default]
    Unknown,
    Xhtml,
    Xml,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum LiteralMode {
    Plain,
    Xml,
}

/// An open element.
struct Frame {
    context: Context,
    name: String,
    location: Location,
    collecting: Option<LiteralMode>,
    is_head: bool,
}

/// Where errors get attributed.
#[derive(Clone, Copy)]
struct Element<'a> {
    name: &'a str,
    location: Location,
}

impl Element<'_> {
    fn error(&self, kind: RdfaErrorKind) -> RdfaError {
        RdfaError {
            kind,
            element: self.name.to_string(),
            location: self.location,
        }
    }
}

/// Processes one document, fed as a stream of element and text events.
///
/// A parser holds per-document state (base, blank nodes, open elements)
/// and must not be reused for another document.
pub struct RdfaParser<'h, S, E> {
    sink: S,
    errors: E,
    profiles: Option<Box<dyn ProfileHandler + 'h>>,
    base: Iri<String>,
    format: DocumentFormat,
    literals: LiteralCollector,
    stack: Vec<Frame>,
    in_head: bool,
}

impl<'h, S: TripleSink, E: ErrorHandler> RdfaParser<'h, S, E> {
    pub fn new(base: Iri<String>, sink: S, errors: E) -> Self {
        let session = Session::new(base.clone(), TermMatching::default());
        Self {
            sink,
            errors,
            profiles: None,
            base,
            format: DocumentFormat::Unknown,
            literals: LiteralCollector::new(),
            stack: vec![Frame {
                context: Context::initial(session),
                name: String::new(),
                location: Location::default(),
                collecting: None,
                is_head: false,
            }],
            in_head: false,
        }
    }

    pub fn with_format(mut self, format: DocumentFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_profile_handler(mut self, handler: impl ProfileHandler + 'h) -> Self {
        self.profiles = Some(Box::new(handler));
        self
    }

    /// Only takes effect before the first element.
    pub fn with_term_matching(mut self, term_matching: TermMatching) -> Self {
        if let [frame] = self.stack.as_mut_slice() {
            frame.context = Context::initial(Session::new(self.base.clone(), term_matching));
        }
        self
    }

    pub fn format(&self) -> DocumentFormat {
        self.format
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn error_handler(&self) -> &E {
        &self.errors
    }

    /// Number of currently open elements.
    pub fn depth(&self) -> usize {
        self.stack.len() - 1
    }

    /// Flushes anything the sink is still holding back and hands back the
    /// collaborators.
    pub fn finish(mut self) -> (S, E) {
        if self.in_head {
            self.in_head = false;
            self.sink.stop_relative_triple_caching();
        }
        (self.sink, self.errors)
    }

    fn warning(&mut self, element: Element<'_>, kind: RdfaErrorKind) {
        self.errors.warning(element.error(kind));
    }

    fn emit(&mut self, context: &Context, subject: &UriRef, predicate: &UriRef, object: &UriRef) {
        if context.profile_failed {
            return;
        }
        tracing::trace!("emitting {subject} {predicate} {object}");
        self.sink.generate_triple(subject, predicate, object);
    }

    fn emit_literal(
        &mut self,
        context: &Context,
        subject: &UriRef,
        predicate: &UriRef,
        lexical: &str,
        language: Option<&str>,
        datatype: Option<&UriRef>,
    ) {
        if context.profile_failed {
            return;
        }
        tracing::trace!("emitting {subject} {predicate} {lexical:?}");
        self.sink
            .generate_triple_literal(subject, predicate, lexical, language, datatype);
    }

    pub fn begin_element(
        &mut self,
        namespace_uri: &str,
        local_name: &str,
        qualified_name: &str,
        attributes: &[Attribute<'_>],
        location: Location,
    ) {
        if self
            .literals
            .collect_start_element(namespace_uri, qualified_name, attributes)
        {
            return;
        }

        let element = Element {
            name: qualified_name,
            location,
        };
        let view = AttributeView::classify(attributes);
        let depth = self.stack.len();
        let is_root = depth == 1;

        let mut context = match self.stack.as_slice() {
            [.., grandparent, parent] => Context::child(&parent.context, Some(&grandparent.context)),
            [parent] => Context::child(&parent.context, None),
            [] => return,
        };

        tracing::trace!(depth, element = qualified_name, "begin element");

        if is_root {
            if self.format == DocumentFormat::Unknown {
                let xhtml = view.default_xmlns.is_some_and(|ns| ns.value == vocab::XHTML_NS);
                self.format = if xhtml {
                    DocumentFormat::Xhtml
                } else {
                    DocumentFormat::Xml
                };
                tracing::trace!(format = ?self.format, "detected document format");
            }

            // the implicit profile does not shadow an explicit @profile
            if self.format == DocumentFormat::Xhtml {
                self.load_profiles(
                    &mut context,
                    &[vocab::XHTML_VOCAB_PROFILE.to_string()],
                    view.vocab.is_some(),
                    &mut HashSet::new(),
                    element,
                );
            }
        }

        let mut is_head = false;
        if self.format == DocumentFormat::Xhtml && namespace_uri == vocab::XHTML_NS {
            if depth == 2 && local_name == "head" {
                is_head = true;
                self.in_head = true;
                self.sink.start_relative_triple_caching();
            } else if depth == 3 && self.in_head && local_name == "base" {
                if let Some(href) = view.href {
                    if let Err(source) = context.base().set(href.value) {
                        self.warning(
                            element,
                            RdfaErrorKind::NotUri {
                                attribute: AttrKind::Href,
                                source: ResolveError::InvalidIri {
                                    value: href.value.to_string(),
                                    source,
                                },
                            },
                        );
                    }
                }
            }
        }

        if let Some((attribute, lang)) = view.language() {
            if lang.value.is_empty() {
                context.language = None;
            } else {
                if LanguageIdentifier::from_str(lang.value).is_err() {
                    self.warning(
                        element,
                        RdfaErrorKind::InvalidLanguage {
                            attribute,
                            tag: lang.value.to_string(),
                        },
                    );
                }
                context.language = Some(lang.value.to_string());
            }
        }

        if let Some(profile) = view.profile {
            let mut uris = Vec::new();
            for token in profile.value.split_ascii_whitespace() {
                match context.expand_uri(token) {
                    Ok(uri) => uris.push(uri.value().to_string()),
                    Err(source) => self.warning(
                        element,
                        RdfaErrorKind::NotUri {
                            attribute: AttrKind::Profile,
                            source,
                        },
                    ),
                }
            }

            self.load_profiles(
                &mut context,
                &uris,
                view.vocab.is_some(),
                &mut HashSet::new(),
                element,
            );
        }

        if let Some(vocab) = view.vocab {
            if vocab.value.is_empty() {
                tracing::trace!("@vocab is empty, clearing default vocabulary");
                context.vocabulary = None;
            } else {
                match context.expand_uri(vocab.value) {
                    Ok(uri) => context.vocabulary = Some(uri.value().to_string()),
                    Err(source) => self.warning(
                        element,
                        RdfaErrorKind::NotUri {
                            attribute: AttrKind::Vocab,
                            source,
                        },
                    ),
                }
            }
        }

        for (prefix, uri) in &view.xmlns {
            self.register_prefix(&mut context, prefix, uri.value, element);
        }

        if let Some(prefixes) = view.prefix {
            let mut pairs = prefixes.value.split_ascii_whitespace().tuples();
            for (prefix, uri) in pairs.by_ref() {
                match prefix.strip_suffix(':') {
                    Some(prefix) => self.register_prefix(&mut context, prefix, uri, element),
                    None => self.warning(
                        element,
                        RdfaErrorKind::MalformedPrefix {
                            token: prefix.to_string(),
                        },
                    ),
                }
            }
            // a trailing prefix with no URI
            for dangling in pairs.into_buffer() {
                self.warning(
                    element,
                    RdfaErrorKind::MalformedPrefix {
                        token: dangling.to_string(),
                    },
                );
            }
        }

        context.datatype = match view.datatype {
            Some(datatype) if datatype.value.is_empty() => None,
            Some(datatype) => self
                .resolve_terms(&context, AttrKind::Datatype, Some(datatype), true, element)
                .into_iter()
                .next(),
            None => None,
        };
        context.property = view.property.map(|property| {
            property
                .value
                .split_ascii_whitespace()
                .map(str::to_string)
                .collect()
        });
        context.content = view.content.map(|content| content.value.to_string());

        let empty_curie = || {
            is_root
                .then(|| UriRef::relative(context.base(), "").ok())
                .flatten()
        };

        if !view.has_rel_or_rev() {
            let subject = self
                .first_resource(
                    &context,
                    &[
                        (AttrKind::About, view.about),
                        (AttrKind::Src, view.src),
                        (AttrKind::Resource, view.resource),
                        (AttrKind::Href, view.href),
                    ],
                    element,
                )
                .or_else(empty_curie);

            context.new_subject = match subject {
                Some(subject) => Some(subject),
                None if view.type_of.is_some() => Some(context.session().new_blank_node()),
                None => {
                    if view.property.is_none() {
                        context.skip_element = true;
                    }
                    context.parent_object.clone()
                }
            };
        } else {
            let subject = self
                .first_resource(
                    &context,
                    &[(AttrKind::About, view.about), (AttrKind::Src, view.src)],
                    element,
                )
                .or_else(empty_curie);

            context.new_subject = match subject {
                Some(subject) => Some(subject),
                None if view.type_of.is_some() => Some(context.session().new_blank_node()),
                None => context.parent_object.clone(),
            };

            context.current_object_resource = self.first_resource(
                &context,
                &[
                    (AttrKind::Resource, view.resource),
                    (AttrKind::Href, view.href),
                ],
                element,
            );
        }

        tracing::trace!(
            new_subject = ?context.new_subject,
            current_object_resource = ?context.current_object_resource,
            skip = context.skip_element,
            "established subject"
        );

        if let Some(subject) = context.new_subject.clone() {
            let types = self.resolve_terms(&context, AttrKind::Typeof, view.type_of, true, element);
            let rdf_type = UriRef::absolute(rdf::TYPE.as_str());
            for r#type in &types {
                self.emit(&context, &subject, &rdf_type, r#type);
            }
        }

        let rel = self.resolve_terms(&context, AttrKind::Rel, view.rel, false, element);
        let rev = self.resolve_terms(&context, AttrKind::Rev, view.rev, false, element);

        if let Some(object) = context.current_object_resource.clone() {
            if let Some(subject) = context.new_subject.clone() {
                for predicate in &rel {
                    self.emit(&context, &subject, predicate, &object);
                }
                for predicate in &rev {
                    self.emit(&context, &object, predicate, &subject);
                }
            }
        } else if view.has_rel_or_rev() {
            let incomplete = rel
                .into_iter()
                .map(|predicate| IncompleteTriple {
                    predicate,
                    reverse: false,
                })
                .chain(rev.into_iter().map(|predicate| IncompleteTriple {
                    predicate,
                    reverse: true,
                }))
                .collect();
            context.incomplete_triples = Some(incomplete);
            context.current_object_resource = Some(context.session().new_blank_node());
        }

        let collecting = if view.property.is_some() && view.content.is_none() {
            let xml_literal = context
                .datatype
                .as_ref()
                .is_some_and(|dt| &*dt.value() == rdf::XML_LITERAL.as_str());
            if xml_literal {
                self.literals.start_collecting_xml();
                Some(LiteralMode::Xml)
            } else {
                self.literals.start_collecting();
                Some(LiteralMode::Plain)
            }
        } else {
            None
        };

        self.stack.push(Frame {
            context,
            name: qualified_name.to_string(),
            location,
            collecting,
            is_head,
        });
    }

    pub fn end_element(&mut self, namespace_uri: &str, local_name: &str, qualified_name: &str) {
        if self.literals.collect_close_element(qualified_name) {
            return;
        }

        if self.stack.len() <= 1 {
            tracing::trace!(element = qualified_name, "ignoring unbalanced end element");
            return;
        }
        let Some(frame) = self.stack.pop() else {
            return;
        };
        let context = &frame.context;
        let element = Element {
            name: &frame.name,
            location: frame.location,
        };

        tracing::trace!(
            depth = self.stack.len(),
            element = qualified_name,
            namespace_uri,
            local_name,
            "end element"
        );

        let collected = frame.collecting.map(|_| self.literals.stop_collecting());

        if let (Some(properties), Some(subject)) = (&context.property, &context.new_subject) {
            let lexical = context.content.clone().or(collected).unwrap_or_default();
            let (language, datatype) = match &context.datatype {
                Some(datatype) => (None, Some(datatype)),
                None => (context.language.as_deref(), None),
            };

            for property in properties {
                match expand_predicate(context, property) {
                    Ok(predicate) => {
                        self.emit_literal(context, subject, &predicate, &lexical, language, datatype)
                    }
                    Err(source) => self.warning(
                        element,
                        RdfaErrorKind::NotTermCurieOrAbsUri {
                            attribute: AttrKind::Property,
                            source,
                        },
                    ),
                }
            }
        }

        if !context.skip_element {
            if let (Some(subject), Some(parent_subject)) =
                (&context.new_subject, &context.parent_subject)
            {
                for triple in self.evaluation_incomplete_triples() {
                    if triple.reverse {
                        self.emit(context, subject, &triple.predicate, parent_subject);
                    } else {
                        self.emit(context, parent_subject, &triple.predicate, subject);
                    }
                }
            }
        }

        if frame.is_head {
            self.in_head = false;
            self.sink.stop_relative_triple_caching();
        }
    }

    pub fn text(&mut self, text: &str, location: Location) {
        if self.literals.is_collecting() {
            tracing::trace!(%location, len = text.len(), "collecting text");
            self.literals.text(text);
        }
    }

    /// Incomplete triples of the nearest open element that was not skipped.
    fn evaluation_incomplete_triples(&self) -> Vec<IncompleteTriple> {
        self.stack
            .iter()
            .rev()
            .find(|frame| !frame.context.skip_element)
            .map(|frame| frame.context.incomplete_triples().to_vec())
            .unwrap_or_default()
    }

    fn register_prefix(&mut self, context: &mut Context, prefix: &str, uri: &str, element: Element<'_>) {
        if prefix == "_" {
            self.warning(element, RdfaErrorKind::ReservedPrefix);
        } else if !context.register_prefix(prefix, uri) {
            self.warning(
                element,
                RdfaErrorKind::MalformedPrefix {
                    token: format!("{prefix}:"),
                },
            );
        } else {
            tracing::trace!(prefix, uri, "registered prefix");
        }
    }

    fn load_profiles(
        &mut self,
        context: &mut Context,
        uris: &[String],
        local_vocab: bool,
        registered: &mut HashSet<String>,
        element: Element<'_>,
    ) {
        if uris.is_empty() {
            return;
        }

        let Some(handler) = self.profiles.as_mut() else {
            context.profile_failed = true;
            self.errors
                .fatal_error(element.error(RdfaErrorKind::ProfileHandlerMissing {
                    profile: uris[0].clone(),
                }));
            return;
        };

        let mut failure = None;
        for uri in uris {
            let profile = match handler.load_profile(uri) {
                Ok(profile) => profile,
                Err(source) => {
                    failure = Some(RdfaErrorKind::ProfileLoadFailure {
                        profile: uri.clone(),
                        source,
                    });
                    break;
                }
            };
            tracing::trace!(uri, "merging profile");
            merge_profile(context, &profile, local_vocab, registered);
        }

        if let Some(kind) = failure {
            context.profile_failed = true;
            self.errors.fatal_error(element.error(kind));
        }
    }

    /// The first candidate attribute that resolves. Candidates that fail
    /// are reported.
    fn first_resource(
        &mut self,
        context: &Context,
        candidates: &[(AttrKind, Option<AttrValue<'_>>)],
        element: Element<'_>,
    ) -> Option<UriRef> {
        for (attribute, value) in candidates {
            let Some(value) = value else {
                continue;
            };

            let uri_only = matches!(attribute, AttrKind::Href | AttrKind::Src);
            let resolved = if uri_only {
                context.expand_uri(value.value)
            } else {
                context.expand_curie_or_uri(value.value)
            };

            match resolved {
                Ok(uri) => return Some(uri),
                Err(source) => {
                    let attribute = *attribute;
                    let kind = if uri_only {
                        RdfaErrorKind::NotUri { attribute, source }
                    } else {
                        RdfaErrorKind::NotCurieOrUri { attribute, source }
                    };
                    self.warning(element, kind);
                }
            }
        }

        None
    }

    /// Resolves each token of a term-valued attribute, reporting and
    /// skipping the ones that fail.
    fn resolve_terms(
        &mut self,
        context: &Context,
        attribute: AttrKind,
        value: Option<AttrValue<'_>>,
        allow_blank: bool,
        element: Element<'_>,
    ) -> Vec<UriRef> {
        let Some(Attr::Value(tokens)) = value.map(|v| v.tokens()) else {
            return Vec::new();
        };

        let mut resolved = Vec::with_capacity(tokens.len());
        for token in tokens {
            let result = if allow_blank {
                context.expand_term_or_curie_or_abs_uri(token)
            } else {
                expand_predicate(context, token)
            };

            match result {
                Ok(uri) => resolved.push(uri),
                Err(source) => self.warning(
                    element,
                    RdfaErrorKind::NotTermCurieOrAbsUri { attribute, source },
                ),
            }
        }
        resolved
    }
}

fn expand_predicate(context: &Context, token: &str) -> Result<UriRef, ResolveError> {
    let predicate = context.expand_term_or_curie_or_abs_uri(token)?;
    if predicate.is_blank_node() {
        return Err(ResolveError::BlankNodePredicate {
            value: token.to_string(),
        });
    }
    Ok(predicate)
}

/// Prefixes never replace one already taken from an earlier profile on the
/// same element; terms never replace one that already resolves.
fn merge_profile(
    context: &mut Context,
    profile: &crate::profile::Profile,
    local_vocab: bool,
    registered: &mut HashSet<String>,
) {
    for (prefix, uri) in &profile.prefix_mappings {
        let key = prefix.to_ascii_lowercase();
        if registered.contains(&key) {
            continue;
        }
        if context.register_prefix(prefix, uri) {
            registered.insert(key);
        }
    }

    for (term, uri) in &profile.term_mappings {
        if context.resolve_term(term).is_none() {
            context.register_term(term, uri);
        }
    }

    if !local_vocab {
        if let Some(vocabulary) = &profile.default_vocabulary {
            context.set_vocabulary(Some(vocabulary.clone()));
        }
    }
}

impl<S, E> std::fmt::Debug for RdfaParser<'_, S, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RdfaParser")
            .field("base", &self.base.as_str())
            .field("format", &self.format)
            .field("depth", &(self.stack.len() - 1))
            .field("in_head", &self.in_head)
            .finish_non_exhaustive()
    }
}
