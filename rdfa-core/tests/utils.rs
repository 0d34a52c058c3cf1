use std::collections::HashSet;

use itertools::Itertools;
use oxrdf::Graph;
use rdfa_core::{ErrorCollector, RdfaParser, StaticProfiles, TripleCollector};

pub fn base() -> oxiri::Iri<String> {
    oxiri::Iri::parse("http://example.org/doc".to_string()).unwrap()
}

/// Runs an XML or XHTML document through a parser that knows the XHTML
/// profile.
#[allow(unused)]
pub fn run_xml(document: &str) -> (TripleCollector, ErrorCollector) {
    let mut parser = RdfaParser::new(base(), TripleCollector::new(), ErrorCollector::default())
        .with_profile_handler(StaticProfiles::xhtml());
    rdfa_core::xml::walk_str(document, &mut parser).unwrap();
    parser.finish()
}

pub fn serialize_graph(graph: Graph, base: &str) -> String {
    // NB: canonical labels keep blank nodes stable between runs
    let idents = rdf_canon::issue_graph_with::<sha2::Sha256>(&graph, &Default::default()).unwrap();
    let graph = rdf_canon::relabel_graph(&graph, &idents).unwrap();

    let mut output = Vec::new();
    let mut ttl = oxttl::TurtleSerializer::new().with_base_iri(base).unwrap();

    let known = rdfa_core::profile::xhtml_vocab_profile().prefix_mappings;
    let mut prefixes_to_use = HashSet::new();
    let mut add_prefix = |full_iri: &str| {
        if let Some((prefix, iri)) = known.iter().find(|(_, iri)| full_iri.starts_with(iri.as_str())) {
            prefixes_to_use.insert((prefix.clone(), iri.clone()));
        }
    };

    for triple in graph.iter() {
        if let oxrdf::SubjectRef::NamedNode(n) = triple.subject {
            add_prefix(n.as_str());
        }

        add_prefix(triple.predicate.as_str());

        if let oxrdf::TermRef::NamedNode(n) = triple.object {
            add_prefix(n.as_str());
        } else if let oxrdf::TermRef::Literal(l) = triple.object {
            if !l.is_plain() {
                add_prefix(l.datatype().as_str());
            }
        }
    }

    for (prefix, iri) in prefixes_to_use.into_iter().sorted() {
        ttl = ttl.with_prefix(prefix, iri).unwrap();
    }

    let mut ttl = ttl.for_writer(&mut output);
    for triple in graph.iter().sorted_by_cached_key(|t| {
        (
            t.subject.to_string(),
            if t.predicate.as_str() == "http://www.w3.org/1999/02/22-rdf-syntax-ns#type" {
                // make "a" come first
                None
            } else {
                Some(t.predicate.to_string())
            },
            t.object.to_string(),
        )
    }) {
        ttl.serialize_triple(triple).unwrap();
    }

    ttl.finish().unwrap();

    String::from_utf8_lossy(&output).into_owned()
}

/// Parses `html` and compares the output graph with `ttl`. Returns the
/// processor graph.
#[allow(unused)]
pub fn assert_graph(html: &str, ttl: &str) -> Graph {
    let mut output_graph = Graph::new();
    let mut processor_graph = Graph::new();
    let base = base();
    rdfa_core::parse_html(html, base.clone(), &mut output_graph, &mut processor_graph);

    let mut ttl_graph = Graph::new();
    {
        let ttl_rdf = oxttl::TurtleParser::new()
            .with_base_iri(base.as_str())
            .unwrap()
            .for_slice(ttl.as_bytes());
        for triple in ttl_rdf {
            ttl_graph.insert(&triple.unwrap());
        }
    }

    let output = serialize_graph(output_graph, base.as_str());
    let ttl_output = serialize_graph(ttl_graph, base.as_str());

    pretty_assertions::assert_eq!(output, ttl_output);
    processor_graph
}
