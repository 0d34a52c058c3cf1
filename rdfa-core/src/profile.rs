use std::collections::HashMap;
use std::rc::Rc;

use indexmap::IndexMap;
use oxiri::Iri;

use crate::engine::{DocumentFormat, RdfaParser};
use crate::error::IgnoreErrors;
use crate::sink::TripleSink;
use crate::uri::UriRef;
use crate::vocab::{self, rdfa};

/// A bundle of mappings that an element pulls in through `@profile`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Profile {
    pub prefix_mappings: IndexMap<String, String>,
    pub term_mappings: IndexMap<String, String>,
    pub default_vocabulary: Option<String>,
}

#[derive(derive_more::Error, derive_more::Display, Debug)]
pub enum ProfileError {
    #[display("no profile is known for <{uri}>")]
    NotFound { uri: String },

    #[display("<{uri}> is not a valid profile IRI")]
    InvalidUri {
        uri: String,
        source: oxiri::IriParseError,
    },

    #[display("reading <{uri}> failed")]
    Io { uri: String, source: std::io::Error },

    #[display("<{uri}> is not a valid profile document")]
    Document { uri: String, source: crate::Error },
}

/// Supplies profiles by URI.
pub trait ProfileHandler {
    fn load_profile(&mut self, uri: &str) -> Result<Rc<Profile>, ProfileError>;
}

impl<T: ProfileHandler + ?Sized> ProfileHandler for &mut T {
    fn load_profile(&mut self, uri: &str) -> Result<Rc<Profile>, ProfileError> {
        (**self).load_profile(uri)
    }
}

impl<T: ProfileHandler + ?Sized> ProfileHandler for Box<T> {
    fn load_profile(&mut self, uri: &str) -> Result<Rc<Profile>, ProfileError> {
        (**self).load_profile(uri)
    }
}

/// Profiles known ahead of time.
#[derive(Clone, Debug, Default)]
pub struct StaticProfiles {
    profiles: HashMap<String, Rc<Profile>>,
}

impl StaticProfiles {
    pub fn new() -> Self {
        Self::default()
    }

    /// Knows the implicit XHTML profile.
    pub fn xhtml() -> Self {
        let mut profiles = Self::new();
        profiles.insert(vocab::XHTML_VOCAB_PROFILE, xhtml_vocab_profile());
        profiles
    }

    pub fn insert(&mut self, uri: impl Into<String>, profile: Profile) -> &mut Self {
        self.profiles.insert(uri.into(), Rc::new(profile));
        self
    }
}

impl ProfileHandler for StaticProfiles {
    fn load_profile(&mut self, uri: &str) -> Result<Rc<Profile>, ProfileError> {
        self.profiles
            .get(uri)
            .cloned()
            .ok_or_else(|| ProfileError::NotFound { uri: uri.to_string() })
    }
}

/// Memoizes successful loads of another handler.
///
/// The cache lives as long as this value does. Passing the same
/// `CachingProfileHandler` (by `&mut`) to several parsers shares loaded
/// profiles between those parses; a fresh one per parse shares nothing.
/// Failures are not cached.
#[derive(Debug, Default)]
pub struct CachingProfileHandler<H> {
    inner: H,
    cache: HashMap<String, Rc<Profile>>,
}

impl<H: ProfileHandler> CachingProfileHandler<H> {
    pub fn new(inner: H) -> Self {
        Self {
            inner,
            cache: HashMap::new(),
        }
    }

    pub fn cached(&self) -> usize {
        self.cache.len()
    }
}

impl<H: ProfileHandler> ProfileHandler for CachingProfileHandler<H> {
    fn load_profile(&mut self, uri: &str) -> Result<Rc<Profile>, ProfileError> {
        if let Some(profile) = self.cache.get(uri) {
            return Ok(profile.clone());
        }

        let profile = self.inner.load_profile(uri)?;
        tracing::trace!(uri, "caching profile");
        self.cache.insert(uri.to_string(), profile.clone());
        Ok(profile)
    }
}

#[derive(Debug, Default)]
struct ProfileEntry {
    uri: Option<String>,
    prefix: Option<String>,
    term: Option<String>,
}

/// Builds a [`Profile`] from the triples of a profile document.
///
/// Each subject carrying `rdfa:uri` together with `rdfa:prefix` or
/// `rdfa:term` contributes a mapping; `rdfa:vocabulary` sets the default
/// vocabulary.
#[derive(Debug, Default)]
pub struct ProfileCollector {
    entries: IndexMap<String, ProfileEntry>,
    default_vocabulary: Option<String>,
}

impl ProfileCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_profile(self) -> Profile {
        let mut profile = Profile {
            default_vocabulary: self.default_vocabulary,
            ..Profile::default()
        };

        for entry in self.entries.into_values() {
            let Some(uri) = entry.uri.filter(|uri| !uri.is_empty()) else {
                continue;
            };

            if let Some(prefix) = entry.prefix.filter(|p| !p.is_empty()) {
                profile.prefix_mappings.insert(prefix, uri.clone());
            }
            if let Some(term) = entry.term.filter(|t| !t.is_empty()) {
                profile.term_mappings.insert(term, uri);
            }
        }

        profile
    }
}

impl TripleSink for ProfileCollector {
    fn generate_triple(&mut self, _: &UriRef, _: &UriRef, _: &UriRef) {}

    fn generate_triple_literal(
        &mut self,
        subject: &UriRef,
        predicate: &UriRef,
        lexical: &str,
        _: Option<&str>,
        _: Option<&UriRef>,
    ) {
        let predicate = predicate.value();
        if &*predicate == rdfa::VOCABULARY.as_str() {
            self.default_vocabulary = Some(lexical.to_string());
            return;
        }

        let field: fn(&mut ProfileEntry) -> &mut Option<String> =
            if &*predicate == rdfa::URI.as_str() {
                |entry| &mut entry.uri
            } else if &*predicate == rdfa::PREFIX.as_str() {
                |entry| &mut entry.prefix
            } else if &*predicate == rdfa::TERM.as_str() {
                |entry| &mut entry.term
            } else {
                return;
            };

        let entry = self.entries.entry(subject.value().to_string()).or_default();
        *field(entry) = Some(lexical.to_string());
    }
}

/// Reads a profile from an XML+RDFa document.
pub fn profile_from_xml(uri: &str, document: &str) -> Result<Profile, ProfileError> {
    let base = Iri::parse(uri.to_string()).map_err(|source| ProfileError::InvalidUri {
        uri: uri.to_string(),
        source,
    })?;

    let mut collector = ProfileCollector::new();
    let mut parser =
        RdfaParser::new(base, &mut collector, IgnoreErrors).with_format(DocumentFormat::Xml);
    crate::xml::walk_str(document, &mut parser).map_err(|source| ProfileError::Document {
        uri: uri.to_string(),
        source,
    })?;
    parser.finish();

    Ok(collector.into_profile())
}

/// The XHTML vocabulary: link types as terms, plus the prefixes of
/// widely used vocabularies.
pub fn xhtml_vocab_profile() -> Profile {
    let terms = [
        "alternate",
        "appendix",
        "bookmark",
        "cite",
        "chapter",
        "contents",
        "copyright",
        "first",
        "glossary",
        "help",
        "icon",
        "index",
        "last",
        "license",
        "meta",
        "next",
        "p3pv1",
        "prev",
        "role",
        "section",
        "start",
        "stylesheet",
        "subsection",
        "top",
        "up",
    ];

    let mut term_mappings: IndexMap<String, String> = terms
        .into_iter()
        .map(|term| (term.to_string(), format!("{}{term}", vocab::XHTML_VOCAB_NS)))
        .collect();
    term_mappings.insert(
        "describedby".to_string(),
        "http://www.w3.org/2007/05/powder-s#describedby".to_string(),
    );

    let prefix_mappings = [
        // W3C documents
        ("as", "https://www.w3.org/ns/activitystreams#"),
        ("csvw", "http://www.w3.org/ns/csvw#"),
        ("dcat", "http://www.w3.org/ns/dcat#"),
        ("dqv", "http://www.w3.org/ns/dqv#"),
        ("duv", "http://www.w3.org/ns/duv#"),
        ("grddl", "http://www.w3.org/2003/g/data-view#"),
        ("ma", "http://www.w3.org/ns/ma-ont#"),
        ("org", "http://www.w3.org/ns/org#"),
        ("owl", "http://www.w3.org/2002/07/owl#"),
        ("prov", "http://www.w3.org/ns/prov#"),
        ("qb", "http://purl.org/linked-data/cube#"),
        ("rdf", "http://www.w3.org/1999/02/22-rdf-syntax-ns#"),
        ("rdfa", "http://www.w3.org/ns/rdfa#"),
        ("rdfs", "http://www.w3.org/2000/01/rdf-schema#"),
        ("rif", "http://www.w3.org/2007/rif#"),
        ("rr", "http://www.w3.org/ns/r2rml#"),
        ("sd", "http://www.w3.org/ns/sparql-service-description#"),
        ("skos", "http://www.w3.org/2004/02/skos/core#"),
        ("skosxl", "http://www.w3.org/2008/05/skos-xl#"),
        ("sosa", "http://www.w3.org/ns/sosa/"),
        ("ssn", "http://www.w3.org/ns/ssn/"),
        ("time", "http://www.w3.org/2006/time#"),
        ("void", "http://rdfs.org/ns/void#"),
        ("wdr", "http://www.w3.org/2007/05/powder#"),
        ("wdrs", "http://www.w3.org/2007/05/powder-s#"),
        ("xhv", "http://www.w3.org/1999/xhtml/vocab#"),
        ("xml", "http://www.w3.org/XML/1998/namespace"),
        ("xsd", "http://www.w3.org/2001/XMLSchema#"),
        // "widely used"
        ("cc", "http://creativecommons.org/ns#"),
        ("ctag", "http://commontag.org/ns#"),
        ("dc", "http://purl.org/dc/terms/"),
        ("dc11", "http://purl.org/dc/elements/1.1/"),
        ("dcterms", "http://purl.org/dc/terms/"),
        ("foaf", "http://xmlns.com/foaf/0.1/"),
        ("gr", "http://purl.org/goodrelations/v1#"),
        ("ical", "http://www.w3.org/2002/12/cal/icaltzd#"),
        ("og", "http://ogp.me/ns#"),
        ("rev", "http://purl.org/stuff/rev#"),
        ("schema", "http://schema.org/"),
        ("sioc", "http://rdfs.org/sioc/ns#"),
        ("v", "http://rdf.data-vocabulary.org/#"),
        ("vcard", "http://www.w3.org/2006/vcard/ns#"),
    ]
    .into_iter()
    .map(|(prefix, iri)| (prefix.to_string(), iri.to_string()))
    .collect();

    Profile {
        prefix_mappings,
        term_mappings,
        default_vocabulary: None,
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    struct Counting {
        loads: usize,
    }

    impl ProfileHandler for Counting {
        fn load_profile(&mut self, uri: &str) -> Result<Rc<Profile>, ProfileError> {
            self.loads += 1;
            if uri.ends_with("missing") {
                return Err(ProfileError::NotFound { uri: uri.into() });
            }
            Ok(Rc::new(Profile::default()))
        }
    }

    #[test]
    fn caching_handler_loads_once() {
        let mut handler = CachingProfileHandler::new(Counting { loads: 0 });
        handler.load_profile("http://a/").unwrap();
        handler.load_profile("http://a/").unwrap();
        assert!(handler.load_profile("http://a/missing").is_err());
        assert!(handler.load_profile("http://a/missing").is_err());

        assert_eq!(handler.cached(), 1);
        assert_eq!(handler.inner.loads, 3);
    }

    #[test]
    fn static_profiles_serve_xhtml_vocab() {
        let mut profiles = StaticProfiles::xhtml();
        let profile = profiles.load_profile(vocab::XHTML_VOCAB_PROFILE).unwrap();
        assert_eq!(
            profile.term_mappings.get("license").map(String::as_str),
            Some("http://www.w3.org/1999/xhtml/vocab#license")
        );
        assert_eq!(
            profile.prefix_mappings.get("foaf").map(String::as_str),
            Some("http://xmlns.com/foaf/0.1/")
        );
        assert!(matches!(
            profiles.load_profile("http://example.org/other"),
            Err(ProfileError::NotFound { .. })
        ));
    }

    #[test]
    fn profile_document_is_read_from_rdfa() {
        let document = r##"<profile xmlns:rdfa="http://www.w3.org/ns/rdfa#">
            <entry about="#foaf" property="rdfa:prefix" content="foaf">
              <span property="rdfa:uri" content="http://xmlns.com/foaf/0.1/"/>
            </entry>
            <entry about="#name">
              <span property="rdfa:term">name</span>
              <span property="rdfa:uri">http://xmlns.com/foaf/0.1/name</span>
            </entry>
            <entry property="rdfa:vocabulary" content="http://schema.org/"/>
            <entry about="#orphan" property="rdfa:term" content="orphan"/>
          </profile>"##;

        let profile = profile_from_xml("http://example.org/profile", document).unwrap();
        assert_eq!(
            profile,
            Profile {
                prefix_mappings: [("foaf".to_string(), "http://xmlns.com/foaf/0.1/".to_string())]
                    .into_iter()
                    .collect(),
                term_mappings: [(
                    "name".to_string(),
                    "http://xmlns.com/foaf/0.1/name".to_string()
                )]
                .into_iter()
                .collect(),
                default_vocabulary: Some("http://schema.org/".to_string()),
            }
        );
    }
}
