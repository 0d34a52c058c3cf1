use std::cell::RefCell;
use std::rc::Rc;

use oxiri::Iri;

use crate::blank::BlankNodeAllocator;
use crate::error::ResolveError;
use crate::registry::Registry;
use crate::uri::{SharedBase, UriRef};
use crate::vocab;

/// How terms are matched against the registered term mappings.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TermMatching {
    #[default]
    CaseSensitive,
    /// Falls back to an ASCII case-insensitive scan when there is no exact
    /// match.
    CaseInsensitiveFallback,
}

/// State shared by every context of one parse.
#[derive(Debug)]
pub struct Session {
    pub base: SharedBase,
    pub blank_nodes: RefCell<BlankNodeAllocator>,
    pub term_matching: TermMatching,
}

impl Session {
    pub fn new(base: Iri<String>, term_matching: TermMatching) -> Rc<Self> {
        Rc::new(Self {
            base: SharedBase::new(base),
            blank_nodes: RefCell::default(),
            term_matching,
        })
    }

    pub fn new_blank_node(&self) -> UriRef {
        UriRef::blank_node(self.blank_nodes.borrow_mut().allocate())
    }
}

/// A predicate waiting for a subject from a descendant element.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IncompleteTriple {
    pub predicate: UriRef,
    pub reverse: bool,
}

/// What an element inherits from its ancestors and passes to its children.
#[derive(Clone, Debug)]
pub struct Context {
    pub(crate) session: Rc<Session>,
    pub(crate) skip_element: bool,
    pub(crate) new_subject: Option<UriRef>,
    pub(crate) current_object_resource: Option<UriRef>,
    pub(crate) content: Option<String>,
    pub(crate) property: Option<Vec<String>>,
    pub(crate) datatype: Option<UriRef>,
    pub(crate) language: Option<String>,
    pub(crate) vocabulary: Option<String>,
    pub(crate) prefix_mappings: Registry,
    pub(crate) term_mappings: Registry,
    pub(crate) incomplete_triples: Option<Vec<IncompleteTriple>>,
    pub(crate) parent_subject: Option<UriRef>,
    pub(crate) parent_object: Option<UriRef>,
    pub(crate) profile_failed: bool,
}

impl Context {
    /// The context the document element is evaluated in: subject and
    /// object are the base itself.
    pub fn initial(session: Rc<Session>) -> Self {
        let base = UriRef::relative(&session.base, "").ok();
        Self {
            skip_element: false,
            new_subject: base.clone(),
            current_object_resource: None,
            content: None,
            property: None,
            datatype: None,
            language: None,
            vocabulary: None,
            prefix_mappings: Registry::new(),
            term_mappings: Registry::new(),
            incomplete_triples: None,
            parent_subject: base.clone(),
            parent_object: base,
            profile_failed: false,
            session,
        }
    }

    /// Builds the context for a child of the element `parent` belongs to.
    ///
    /// When `parent` was skipped, subject and object pass through it
    /// unchanged, and vocabulary and term mappings come from
    /// `grandparent` instead.
    pub fn child(parent: &Context, grandparent: Option<&Context>) -> Self {
        let (parent_subject, parent_object, inherit_from) = if parent.skip_element {
            (
                parent.parent_subject.clone(),
                parent.parent_object.clone(),
                grandparent.unwrap_or(parent),
            )
        } else {
            (
                parent.new_subject.clone().or_else(|| parent.parent_subject.clone()),
                parent
                    .current_object_resource
                    .clone()
                    .or_else(|| parent.new_subject.clone())
                    .or_else(|| parent.parent_subject.clone()),
                parent,
            )
        };

        Self {
            session: parent.session.clone(),
            skip_element: false,
            new_subject: None,
            current_object_resource: None,
            content: None,
            property: None,
            datatype: None,
            language: parent.language.clone(),
            vocabulary: inherit_from.vocabulary.clone(),
            prefix_mappings: parent.prefix_mappings.share(),
            term_mappings: inherit_from.term_mappings.share(),
            incomplete_triples: None,
            parent_subject,
            parent_object,
            profile_failed: parent.profile_failed,
        }
    }

    pub fn session(&self) -> &Rc<Session> {
        &self.session
    }

    pub fn base(&self) -> &SharedBase {
        &self.session.base
    }

    pub fn skip_element(&self) -> bool {
        self.skip_element
    }

    pub fn new_subject(&self) -> Option<&UriRef> {
        self.new_subject.as_ref()
    }

    pub fn current_object_resource(&self) -> Option<&UriRef> {
        self.current_object_resource.as_ref()
    }

    pub fn parent_subject(&self) -> Option<&UriRef> {
        self.parent_subject.as_ref()
    }

    pub fn parent_object(&self) -> Option<&UriRef> {
        self.parent_object.as_ref()
    }

    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }

    pub fn vocabulary(&self) -> Option<&str> {
        self.vocabulary.as_deref()
    }

    pub fn profile_failed(&self) -> bool {
        self.profile_failed
    }

    pub fn incomplete_triples(&self) -> &[IncompleteTriple] {
        self.incomplete_triples.as_deref().unwrap_or_default()
    }

    pub fn set_vocabulary(&mut self, vocabulary: Option<String>) {
        self.vocabulary = vocabulary;
    }

    /// Prefixes are case-insensitive: they are stored lower-cased. The
    /// reserved prefix `_` and the empty prefix are refused.
    pub fn register_prefix(&mut self, prefix: &str, uri: &str) -> bool {
        if prefix.is_empty() || prefix == "_" {
            return false;
        }

        self.prefix_mappings.set(prefix.to_ascii_lowercase(), uri);
        true
    }

    pub fn resolve_prefix(&self, prefix: &str) -> Option<&str> {
        self.prefix_mappings.get(&prefix.to_ascii_lowercase())
    }

    pub fn register_term(&mut self, term: &str, uri: &str) {
        self.term_mappings.set(term, uri);
    }

    pub fn resolve_term(&self, term: &str) -> Option<&str> {
        match self.session.term_matching {
            TermMatching::CaseSensitive => self.term_mappings.get(term),
            TermMatching::CaseInsensitiveFallback => self.term_mappings.get_ignore_ascii_case(term),
        }
    }

    /// Resolves a plain URI attribute (`@href`, `@src`). The empty string is
    /// the base itself.
    pub fn expand_uri(&self, value: &str) -> Result<UriRef, ResolveError> {
        if !value.is_empty() && Iri::parse(value).is_ok() {
            return Ok(UriRef::absolute(value));
        }

        UriRef::relative(self.base(), value).map_err(|source| ResolveError::InvalidIri {
            value: value.to_string(),
            source,
        })
    }

    /// Resolves `@about` and `@resource`: a safe CURIE, a CURIE or a URI.
    pub fn expand_curie_or_uri(&self, value: &str) -> Result<UriRef, ResolveError> {
        if let Some(inner) = value.strip_prefix('[').and_then(|v| v.strip_suffix(']')) {
            if inner.is_empty() {
                return Err(ResolveError::EmptySafeCurie);
            }
            return self.expand_curie_or_uri(inner);
        }

        match value.find(':') {
            Some(colon) => self.expand_curie_or_abs_uri(value, colon),
            None => self.expand_uri(value),
        }
    }

    /// Resolves `@rel`, `@rev`, `@property`, `@typeof` and `@datatype`
    /// tokens.
    pub fn expand_term_or_curie_or_abs_uri(&self, value: &str) -> Result<UriRef, ResolveError> {
        match value.find(':') {
            Some(colon) => self.expand_curie_or_abs_uri(value, colon),
            None => self.expand_term(value),
        }
    }

    fn expand_term(&self, value: &str) -> Result<UriRef, ResolveError> {
        if let Some(uri) = self.resolve_term(value) {
            return Ok(UriRef::absolute(uri));
        }

        if !is_term(value) {
            return Err(ResolveError::InvalidTerm {
                value: value.to_string(),
            });
        }

        match &self.vocabulary {
            Some(vocabulary) => Ok(UriRef::absolute(format!("{vocabulary}{value}"))),
            None => Err(ResolveError::NoVocabulary {
                term: value.to_string(),
            }),
        }
    }

    fn expand_curie_or_abs_uri(&self, value: &str, colon: usize) -> Result<UriRef, ResolveError> {
        let (prefix, reference) = (&value[..colon], &value[colon + 1..]);

        if prefix.is_empty() {
            if !reference.is_empty() && rxml_validation::validate_ncname(reference).is_err() {
                return Err(ResolveError::InvalidDefaultPrefixReference {
                    value: value.to_string(),
                });
            }
            return Ok(UriRef::absolute(format!("{}{reference}", vocab::XHTML_VOCAB_NS)));
        }

        if let Some(namespace) = self.resolve_prefix(prefix) {
            // prefixes are usually absolute, but a relative one resolves
            // against the base like any other reference
            return self.expand_uri(&format!("{namespace}{reference}"));
        }

        if prefix == "_" {
            let id = self.session.blank_nodes.borrow_mut().map_name(reference);
            return Ok(UriRef::blank_node(id));
        }

        match Iri::parse(value) {
            Ok(_) => Ok(UriRef::absolute(value)),
            Err(_) => Err(ResolveError::NotAbsolute {
                value: value.to_string(),
            }),
        }
    }
}

/// An XML NCName that may also contain non-leading slashes.
pub(crate) fn is_term(value: &str) -> bool {
    !value.is_empty()
        && !value.starts_with('/')
        && value
            .split('/')
            .all(|part| part.is_empty() || rxml_validation::validate_ncname(part).is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root() -> Context {
        let session = Session::new(
            Iri::parse("http://example.org/dir/doc".to_string()).unwrap(),
            TermMatching::CaseSensitive,
        );
        Context::initial(session)
    }

    #[test]
    fn terms_allow_inner_slashes() {
        assert!(is_term("name"));
        assert!(is_term("a/b"));
        assert!(is_term("a/"));
        assert!(!is_term("/a"));
        assert!(!is_term("1a"));
        assert!(!is_term(""));
    }

    #[test]
    fn skipped_parent_is_transparent() {
        let root = root();
        let mut div = Context::child(&root, None);
        div.new_subject = Some(UriRef::absolute("http://ex/div"));
        div.vocabulary = Some("http://a/".into());

        let mut span = Context::child(&div, Some(&root));
        span.skip_element = true;
        span.new_subject = Some(span.parent_object.clone().unwrap());
        span.vocabulary = None;

        let p = Context::child(&span, Some(&div));
        assert_eq!(p.parent_object(), Some(&UriRef::absolute("http://ex/div")));
        assert_eq!(p.parent_subject(), Some(&UriRef::absolute("http://ex/div")));
        assert_eq!(p.vocabulary(), Some("http://a/"));
    }

    #[test]
    fn current_object_resource_becomes_parent_object() {
        let root = root();
        let mut a = Context::child(&root, None);
        a.new_subject = Some(UriRef::absolute("http://ex/s"));
        a.current_object_resource = Some(UriRef::absolute("http://ex/o"));

        let b = Context::child(&a, Some(&root));
        assert_eq!(b.parent_subject(), Some(&UriRef::absolute("http://ex/s")));
        assert_eq!(b.parent_object(), Some(&UriRef::absolute("http://ex/o")));
    }
}
