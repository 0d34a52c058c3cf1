use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use oxiri::{Iri, IriParseError};

/// The document's current base IRI.
///
/// Every [`UriRef`] built from a relative reference holds a handle to the
/// same cell, so replacing the base (XHTML `<base>` inside `<head>`)
/// retroactively changes what those references resolve to. Each
/// replacement bumps a generation counter that readers use to invalidate
/// memoized values.
#[derive(Clone)]
pub struct SharedBase(Rc<RefCell<BaseState>>);

struct BaseState {
    iri: Iri<String>,
    generation: u64,
}

impl SharedBase {
    /// The fragment of `iri` is dropped.
    pub fn new(iri: Iri<String>) -> Self {
        Self(Rc::new(RefCell::new(BaseState {
            iri: without_fragment(iri),
            generation: 0,
        })))
    }

    /// Replaces the base with `href` resolved against the current base.
    pub fn set(&self, href: &str) -> Result<(), IriParseError> {
        let mut state = self.0.borrow_mut();
        let iri = state.iri.resolve(href)?;
        state.iri = without_fragment(iri);
        state.generation += 1;
        tracing::trace!(base = %state.iri, generation = state.generation, "base changed");
        Ok(())
    }

    pub fn generation(&self) -> u64 {
        self.0.borrow().generation
    }

    pub fn iri(&self) -> Iri<String> {
        self.0.borrow().iri.clone()
    }

    pub fn resolve(&self, reference: &str) -> Result<Iri<String>, IriParseError> {
        self.0.borrow().iri.resolve(reference)
    }
}

impl fmt::Debug for SharedBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.0.borrow();
        f.debug_struct("SharedBase")
            .field("iri", &state.iri.as_str())
            .field("generation", &state.generation)
            .finish()
    }
}

fn without_fragment(iri: Iri<String>) -> Iri<String> {
    match iri.as_str().split_once('#') {
        // dropping a fragment cannot make a valid IRI invalid
        Some((head, _)) => Iri::parse(head.to_string()).unwrap_or(iri),
        None => iri,
    }
}

/// A resource reference produced by the resolution rules.
///
/// Relative references are resolved when read, against whatever the shared
/// base is at that moment.
#[derive(Clone, Debug)]
pub enum UriRef {
    Absolute(Rc<str>),
    Relative(Rc<RelativeUri>),
    /// A generated blank node identifier such as `_:BNsk1`.
    BlankNode(Rc<str>),
}

#[derive(Debug)]
pub struct RelativeUri {
    base: SharedBase,
    relative: String,
    resolved: RefCell<Option<(u64, Rc<str>)>>,
}

impl UriRef {
    pub fn absolute(value: impl Into<Rc<str>>) -> Self {
        Self::Absolute(value.into())
    }

    pub fn blank_node(id: impl Into<Rc<str>>) -> Self {
        Self::BlankNode(id.into())
    }

    /// Fails if `relative` cannot be resolved against the current base.
    pub fn relative(base: &SharedBase, relative: &str) -> Result<Self, IriParseError> {
        let resolved = base.resolve(relative)?;
        Ok(Self::Relative(Rc::new(RelativeUri {
            base: base.clone(),
            relative: relative.to_string(),
            resolved: RefCell::new(Some((base.generation(), resolved.into_inner().into()))),
        })))
    }

    pub fn is_blank_node(&self) -> bool {
        matches!(self, Self::BlankNode(_))
    }

    pub fn is_relative(&self) -> bool {
        matches!(self, Self::Relative(_))
    }

    /// The absolute IRI, or the `_:` identifier for blank nodes.
    pub fn value(&self) -> Rc<str> {
        match self {
            Self::Absolute(value) | Self::BlankNode(value) => value.clone(),
            Self::Relative(relative) => relative.value(),
        }
    }
}

impl RelativeUri {
    fn value(&self) -> Rc<str> {
        let generation = self.base.generation();
        if let Some((cached_generation, value)) = &*self.resolved.borrow() {
            if *cached_generation == generation {
                return value.clone();
            }
        }

        let value: Rc<str> = match self.base.resolve(&self.relative) {
            Ok(iri) => iri.into_inner().into(),
            // resolution succeeded once against a different base
            Err(_) => self.relative.as_str().into(),
        };
        *self.resolved.borrow_mut() = Some((generation, value.clone()));
        value
    }
}

impl PartialEq for UriRef {
    fn eq(&self, other: &Self) -> bool {
        self.is_blank_node() == other.is_blank_node() && self.value() == other.value()
    }
}

impl Eq for UriRef {}

impl fmt::Display for UriRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BlankNode(id) => f.write_str(id),
            _ => write!(f, "<{}>", self.value()),
        }
    }
}
