use std::fmt;

use oxrdf::{BlankNode, Graph, Literal, NamedNode, Subject, Term, Triple};

use crate::uri::UriRef;

/// Receives the triples found in a document.
///
/// Between `start_relative_triple_caching` and
/// `stop_relative_triple_caching` the document base may still change.
/// Sinks that read a relative [`UriRef`] during that window see the old
/// base, so they should hold on to such triples until caching stops.
pub trait TripleSink {
    fn generate_triple(&mut self, subject: &UriRef, predicate: &UriRef, object: &UriRef);

    fn generate_triple_literal(
        &mut self,
        subject: &UriRef,
        predicate: &UriRef,
        lexical: &str,
        language: Option<&str>,
        datatype: Option<&UriRef>,
    );

    fn start_relative_triple_caching(&mut self) {}

    fn stop_relative_triple_caching(&mut self) {}
}

impl<T: TripleSink + ?Sized> TripleSink for &mut T {
    fn generate_triple(&mut self, subject: &UriRef, predicate: &UriRef, object: &UriRef) {
        (**self).generate_triple(subject, predicate, object)
    }

    fn generate_triple_literal(
        &mut self,
        subject: &UriRef,
        predicate: &UriRef,
        lexical: &str,
        language: Option<&str>,
        datatype: Option<&UriRef>,
    ) {
        (**self).generate_triple_literal(subject, predicate, lexical, language, datatype)
    }

    fn start_relative_triple_caching(&mut self) {
        (**self).start_relative_triple_caching()
    }

    fn stop_relative_triple_caching(&mut self) {
        (**self).stop_relative_triple_caching()
    }
}

/// A triple as emitted by the engine, before its references are read.
#[derive(Clone, Debug)]
pub enum PendingTriple {
    Resource {
        subject: UriRef,
        predicate: UriRef,
        object: UriRef,
    },
    Literal {
        subject: UriRef,
        predicate: UriRef,
        lexical: String,
        language: Option<String>,
        datatype: Option<UriRef>,
    },
}

impl PendingTriple {
    fn has_relative_component(&self) -> bool {
        match self {
            Self::Resource {
                subject,
                predicate,
                object,
            } => subject.is_relative() || predicate.is_relative() || object.is_relative(),
            Self::Literal {
                subject,
                predicate,
                datatype,
                ..
            } => {
                subject.is_relative()
                    || predicate.is_relative()
                    || datatype.as_ref().is_some_and(UriRef::is_relative)
            }
        }
    }
}

/// Holds back triples with relative components while caching is active.
#[derive(Debug, Default)]
pub struct RelativeTripleCache {
    pending: Option<Vec<PendingTriple>>,
}

impl RelativeTripleCache {
    pub fn start(&mut self) {
        self.pending.get_or_insert_with(Vec::new);
    }

    pub fn is_caching(&self) -> bool {
        self.pending.is_some()
    }

    /// Keeps `triple` if caching is active and it depends on the base;
    /// otherwise hands it back for immediate use.
    pub fn defer(&mut self, triple: PendingTriple) -> Option<PendingTriple> {
        match &mut self.pending {
            Some(pending) if triple.has_relative_component() => {
                pending.push(triple);
                None
            }
            _ => Some(triple),
        }
    }

    /// Ends caching, returning the held triples in emission order.
    pub fn stop(&mut self) -> Vec<PendingTriple> {
        self.pending.take().unwrap_or_default()
    }
}

/// Inserts triples into an [`oxrdf::Graph`].
///
/// Generated blank node ids keep their label (`_:BNsk1` becomes `BNsk1`).
/// Triples that cannot be represented, such as ones with a blank node
/// predicate, are dropped.
pub struct GraphSink<'g> {
    graph: &'g mut Graph,
    cache: RelativeTripleCache,
}

impl<'g> GraphSink<'g> {
    pub fn new(graph: &'g mut Graph) -> Self {
        Self {
            graph,
            cache: RelativeTripleCache::default(),
        }
    }

    fn insert(&mut self, triple: PendingTriple) {
        match to_oxrdf(&triple) {
            Some(triple) => {
                tracing::trace!("emitting output triple: {triple}");
                self.graph.insert(&triple);
            }
            None => tracing::trace!(?triple, "dropping triple not representable in RDF"),
        }
    }

    fn push(&mut self, triple: PendingTriple) {
        if let Some(triple) = self.cache.defer(triple) {
            self.insert(triple);
        }
    }
}

fn to_subject(value: &UriRef) -> Option<Subject> {
    match value {
        UriRef::BlankNode(id) => BlankNode::new(id.trim_start_matches("_:")).ok().map(Into::into),
        _ => NamedNode::new(value.value().to_string()).ok().map(Into::into),
    }
}

fn to_term(value: &UriRef) -> Option<Term> {
    match value {
        UriRef::BlankNode(id) => BlankNode::new(id.trim_start_matches("_:")).ok().map(Into::into),
        _ => to_named_node(value).map(Into::into),
    }
}

fn to_named_node(value: &UriRef) -> Option<NamedNode> {
    match value {
        UriRef::BlankNode(_) => None,
        _ => NamedNode::new(value.value().to_string()).ok(),
    }
}

fn to_literal(lexical: &str, language: Option<&str>, datatype: Option<&UriRef>) -> Option<Literal> {
    if let Some(datatype) = datatype {
        return to_named_node(datatype).map(|dt| Literal::new_typed_literal(lexical, dt));
    }

    Some(match language {
        Some(language) => Literal::new_language_tagged_literal(lexical, language.to_ascii_lowercase())
            .unwrap_or_else(|_| Literal::new_simple_literal(lexical)),
        None => Literal::new_simple_literal(lexical),
    })
}

fn to_oxrdf(triple: &PendingTriple) -> Option<Triple> {
    match triple {
        PendingTriple::Resource {
            subject,
            predicate,
            object,
        } => {
            Some(Triple::new(
                to_subject(subject)?,
                to_named_node(predicate)?,
                to_term(object)?,
            ))
        }
        PendingTriple::Literal {
            subject,
            predicate,
            lexical,
            language,
            datatype,
        } => Some(Triple::new(
            to_subject(subject)?,
            to_named_node(predicate)?,
            to_literal(lexical, language.as_deref(), datatype.as_ref())?,
        )),
    }
}

impl TripleSink for GraphSink<'_> {
    fn generate_triple(&mut self, subject: &UriRef, predicate: &UriRef, object: &UriRef) {
        self.push(PendingTriple::Resource {
            subject: subject.clone(),
            predicate: predicate.clone(),
            object: object.clone(),
        });
    }

    fn generate_triple_literal(
        &mut self,
        subject: &UriRef,
        predicate: &UriRef,
        lexical: &str,
        language: Option<&str>,
        datatype: Option<&UriRef>,
    ) {
        self.push(PendingTriple::Literal {
            subject: subject.clone(),
            predicate: predicate.clone(),
            lexical: lexical.to_string(),
            language: language.map(str::to_string),
            datatype: datatype.cloned(),
        });
    }

    fn start_relative_triple_caching(&mut self) {
        self.cache.start();
    }

    fn stop_relative_triple_caching(&mut self) {
        for triple in self.cache.stop() {
            self.insert(triple);
        }
    }
}

/// An object as recorded by [`TripleCollector`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CollectedObject {
    Resource(String),
    BlankNode(String),
    Literal {
        lexical: String,
        language: Option<String>,
        datatype: Option<String>,
    },
}

/// A fully resolved triple.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CollectedTriple {
    /// An IRI or a `_:` blank node id.
    pub subject: String,
    pub predicate: String,
    pub object: CollectedObject,
}

fn write_resource(f: &mut fmt::Formatter<'_>, value: &str) -> fmt::Result {
    if value.starts_with("_:") {
        f.write_str(value)
    } else {
        write!(f, "<{value}>")
    }
}

impl fmt::Display for CollectedTriple {
    /// N-Triples style, one line per triple.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_resource(f, &self.subject)?;
        f.write_str(" ")?;
        write_resource(f, &self.predicate)?;
        f.write_str(" ")?;
        match &self.object {
            CollectedObject::Resource(iri) => write!(f, "<{iri}>")?,
            CollectedObject::BlankNode(id) => f.write_str(id)?,
            CollectedObject::Literal {
                lexical,
                language,
                datatype,
            } => {
                f.write_str("\"")?;
                for c in lexical.chars() {
                    match c {
                        '"' => f.write_str("\\\"")?,
                        '\\' => f.write_str("\\\\")?,
                        '\n' => f.write_str("\\n")?,
                        '\r' => f.write_str("\\r")?,
                        c => write!(f, "{c}")?,
                    }
                }
                f.write_str("\"")?;
                if let Some(datatype) = datatype {
                    write!(f, "^^<{datatype}>")?;
                } else if let Some(language) = language {
                    write!(f, "@{language}")?;
                }
            }
        }
        f.write_str(" .")
    }
}

/// Records triples in the order they become final.
#[derive(Debug, Default)]
pub struct TripleCollector {
    pub triples: Vec<CollectedTriple>,
    cache: RelativeTripleCache,
}

impl TripleCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// The collected triples as N-Triples lines.
    pub fn to_ntriples(&self) -> String {
        self.triples.iter().map(|t| format!("{t}\n")).collect()
    }

    fn insert(&mut self, triple: PendingTriple) {
        let collected = match triple {
            PendingTriple::Resource {
                subject,
                predicate,
                object,
            } => CollectedTriple {
                subject: subject.value().to_string(),
                predicate: predicate.value().to_string(),
                object: if object.is_blank_node() {
                    CollectedObject::BlankNode(object.value().to_string())
                } else {
                    CollectedObject::Resource(object.value().to_string())
                },
            },
            PendingTriple::Literal {
                subject,
                predicate,
                lexical,
                language,
                datatype,
            } => CollectedTriple {
                subject: subject.value().to_string(),
                predicate: predicate.value().to_string(),
                object: CollectedObject::Literal {
                    lexical,
                    language,
                    datatype: datatype.map(|dt| dt.value().to_string()),
                },
            },
        };
        self.triples.push(collected);
    }

    fn push(&mut self, triple: PendingTriple) {
        if let Some(triple) = self.cache.defer(triple) {
            self.insert(triple);
        }
    }
}

impl TripleSink for TripleCollector {
    fn generate_triple(&mut self, subject: &UriRef, predicate: &UriRef, object: &UriRef) {
        self.push(PendingTriple::Resource {
            subject: subject.clone(),
            predicate: predicate.clone(),
            object: object.clone(),
        });
    }

    fn generate_triple_literal(
        &mut self,
        subject: &UriRef,
        predicate: &UriRef,
        lexical: &str,
        language: Option<&str>,
        datatype: Option<&UriRef>,
    ) {
        self.push(PendingTriple::Literal {
            subject: subject.clone(),
            predicate: predicate.clone(),
            lexical: lexical.to_string(),
            language: language.map(str::to_string),
            datatype: datatype.cloned(),
        });
    }

    fn start_relative_triple_caching(&mut self) {
        self.cache.start();
    }

    fn stop_relative_triple_caching(&mut self) {
        for triple in self.cache.stop() {
            self.insert(triple);
        }
    }
}

#[cfg(test)]
mod tests {
    use oxiri::Iri;

    use super::*;
    use crate::uri::SharedBase;

    #[test]
    fn caching_defers_only_relative_triples() {
        let base = SharedBase::new(Iri::parse("http://old/".to_string()).unwrap());
        let p = UriRef::absolute("http://ex/p");
        let relative = UriRef::relative(&base, "doc").unwrap();
        let absolute = UriRef::absolute("http://ex/s");

        let mut sink = TripleCollector::new();
        sink.start_relative_triple_caching();
        sink.generate_triple_literal(&relative, &p, "a", None, None);
        sink.generate_triple(&absolute, &p, &absolute);
        sink.generate_triple_literal(&relative, &p, "b", Some("en"), None);
        base.set("http://new/").unwrap();
        sink.stop_relative_triple_caching();

        assert_eq!(
            sink.to_ntriples(),
            concat!(
                "<http://ex/s> <http://ex/p> <http://ex/s> .\n",
                "<http://new/doc> <http://ex/p> \"a\" .\n",
                "<http://new/doc> <http://ex/p> \"b\"@en .\n",
            )
        );
    }

    #[test]
    fn graph_sink_maps_blank_nodes_and_drops_blank_predicates() {
        let mut graph = Graph::new();
        let mut sink = GraphSink::new(&mut graph);
        let blank = UriRef::blank_node("_:BNsk1");
        let p = UriRef::absolute("http://ex/p");
        let xml = UriRef::absolute("http://www.w3.org/1999/02/22-rdf-syntax-ns#XMLLiteral");

        sink.generate_triple(&blank, &p, &blank);
        sink.generate_triple(&p, &blank, &p);
        sink.generate_triple_literal(&blank, &p, "<b>x</b>", None, Some(&xml));

        assert_eq!(graph.len(), 2);
        let id = BlankNode::new("BNsk1").unwrap();
        assert_eq!(graph.triples_for_subject(id.as_ref()).count(), 2);
    }
}
