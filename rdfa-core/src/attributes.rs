use std::borrow::Cow;
use std::fmt;

use vec1::Vec1;

/// A position in the source document. Walkers that cannot track positions
/// report `0:0`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Location {
    pub line: u64,
    pub column: u64,
}

impl Location {
    pub fn new(line: u64, column: u64) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A raw attribute as handed over by a document walker.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attribute<'a> {
    /// The qualified name as written (`xml:lang`, `xmlns:foaf`, `href`).
    pub name: Cow<'a, str>,
    pub value: Cow<'a, str>,
    pub location: Location,
}

impl<'a> Attribute<'a> {
    pub fn new(name: impl Into<Cow<'a, str>>, value: impl Into<Cow<'a, str>>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            location: Location::default(),
        }
    }

    pub fn at(mut self, location: Location) -> Self {
        self.location = location;
        self
    }
}

/// The attributes the processor reacts to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, derive_more::Display)]
pub enum AttrKind {
    #[display("@about")]
    About,
    #[display("@rel")]
    Rel,
    #[display("@rev")]
    Rev,
    #[display("@property")]
    Property,
    #[display("@resource")]
    Resource,
    #[display("@href")]
    Href,
    #[display("@src")]
    Src,
    #[display("@typeof")]
    Typeof,
    #[display("@datatype")]
    Datatype,
    #[display("@content")]
    Content,
    #[display("@vocab")]
    Vocab,
    #[display("@prefix")]
    Prefix,
    #[display("@profile")]
    Profile,
    #[display("@lang")]
    Lang,
    #[display("@xml:lang")]
    XmlLang,
    #[display("@xmlns")]
    DefaultXmlns,
    #[display("@xmlns:*")]
    Xmlns,
}

impl AttrKind {
    /// Attribute names are matched case-sensitively.
    pub fn classify(name: &str) -> Option<Self> {
        Some(match name {
            "about" => Self::About,
            "rel" => Self::Rel,
            "rev" => Self::Rev,
            "property" => Self::Property,
            "resource" => Self::Resource,
            "href" => Self::Href,
            "src" => Self::Src,
            "typeof" => Self::Typeof,
            "datatype" => Self::Datatype,
            "content" => Self::Content,
            "vocab" => Self::Vocab,
            "prefix" => Self::Prefix,
            "profile" => Self::Profile,
            "lang" => Self::Lang,
            "xml:lang" => Self::XmlLang,
            "xmlns" => Self::DefaultXmlns,
            _ if name.starts_with("xmlns:") => Self::Xmlns,
            _ => return None,
        })
    }
}

/// Presence of a whitespace-separated attribute.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Attr<T> {
    Missing,
    /// Present but without any tokens (`rel=""`).
    Empty,
    Value(T),
}

impl<T> Attr<T> {
    pub fn is_present(&self) -> bool {
        !matches!(self, Attr::Missing)
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Attr::Value(v) => Some(v),
            Attr::Missing | Attr::Empty => None,
        }
    }
}

/// A single RDFa attribute value with where it came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AttrValue<'a> {
    pub value: &'a str,
    pub location: Location,
}

impl<'a> AttrValue<'a> {
    pub fn tokens(&self) -> Attr<Vec1<&'a str>> {
        match Vec1::try_from_vec(self.value.split_ascii_whitespace().collect()) {
            Ok(tokens) => Attr::Value(tokens),
            Err(_) => Attr::Empty,
        }
    }
}

/// An element's attributes, classified once.
#[derive(Clone, Debug, Default)]
pub struct AttributeView<'a> {
    pub about: Option<AttrValue<'a>>,
    pub rel: Option<AttrValue<'a>>,
    pub rev: Option<AttrValue<'a>>,
    pub property: Option<AttrValue<'a>>,
    pub resource: Option<AttrValue<'a>>,
    pub href: Option<AttrValue<'a>>,
    pub src: Option<AttrValue<'a>>,
    pub type_of: Option<AttrValue<'a>>,
    pub datatype: Option<AttrValue<'a>>,
    pub content: Option<AttrValue<'a>>,
    pub vocab: Option<AttrValue<'a>>,
    pub prefix: Option<AttrValue<'a>>,
    pub profile: Option<AttrValue<'a>>,
    lang: Option<AttrValue<'a>>,
    xml_lang: Option<AttrValue<'a>>,
    pub default_xmlns: Option<AttrValue<'a>>,
    /// `xmlns:*` declarations in document order, keyed by prefix.
    pub xmlns: Vec<(&'a str, AttrValue<'a>)>,
}

impl<'a> AttributeView<'a> {
    pub fn classify(attributes: &'a [Attribute<'_>]) -> Self {
        let mut view = Self::default();
        for attribute in attributes {
            let Some(kind) = AttrKind::classify(&attribute.name) else {
                continue;
            };

            let value = AttrValue {
                value: &attribute.value,
                location: attribute.location,
            };

            let slot = match kind {
                AttrKind::About => &mut view.about,
                AttrKind::Rel => &mut view.rel,
                AttrKind::Rev => &mut view.rev,
                AttrKind::Property => &mut view.property,
                AttrKind::Resource => &mut view.resource,
                AttrKind::Href => &mut view.href,
                AttrKind::Src => &mut view.src,
                AttrKind::Typeof => &mut view.type_of,
                AttrKind::Datatype => &mut view.datatype,
                AttrKind::Content => &mut view.content,
                AttrKind::Vocab => &mut view.vocab,
                AttrKind::Prefix => &mut view.prefix,
                AttrKind::Profile => &mut view.profile,
                AttrKind::Lang => &mut view.lang,
                AttrKind::XmlLang => &mut view.xml_lang,
                AttrKind::DefaultXmlns => &mut view.default_xmlns,
                AttrKind::Xmlns => {
                    let prefix = &attribute.name["xmlns:".len()..];
                    view.xmlns.push((prefix, value));
                    continue;
                }
            };

            *slot = Some(value);
        }

        view
    }

    /// `@xml:lang` wins over `@lang` when both are present.
    pub fn language(&self) -> Option<(AttrKind, AttrValue<'a>)> {
        self.xml_lang
            .map(|v| (AttrKind::XmlLang, v))
            .or(self.lang.map(|v| (AttrKind::Lang, v)))
    }

    pub fn has_rel_or_rev(&self) -> bool {
        self.rel.is_some() || self.rev.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_rdfa_attributes() {
        let attributes = [
            Attribute::new("about", "#me"),
            Attribute::new("class", "ignored"),
            Attribute::new("xmlns:foaf", "http://xmlns.com/foaf/0.1/"),
            Attribute::new("xmlns", "http://www.w3.org/1999/xhtml"),
            Attribute::new("lang", "de"),
            Attribute::new("xml:lang", "en"),
            Attribute::new("REL", "ignored"),
            Attribute::new("rel", ""),
        ];

        let view = AttributeView::classify(&attributes);
        assert_eq!(view.about.map(|v| v.value), Some("#me"));
        assert_eq!(view.xmlns.len(), 1);
        assert_eq!(view.xmlns[0].0, "foaf");
        assert_eq!(
            view.default_xmlns.map(|v| v.value),
            Some("http://www.w3.org/1999/xhtml")
        );
        assert_eq!(
            view.language().map(|(kind, v)| (kind, v.value)),
            Some((AttrKind::XmlLang, "en"))
        );
        assert!(view.has_rel_or_rev());
        assert_eq!(view.rel.map(|v| v.tokens()), Some(Attr::Empty));
    }

    #[test]
    fn tokens_split_on_ascii_whitespace() {
        let value = AttrValue {
            value: " foaf:name\n\tdc:title ",
            location: Location::default(),
        };

        let Attr::Value(tokens) = value.tokens() else {
            panic!("expected tokens");
        };
        assert_eq!(tokens.as_slice(), &["foaf:name", "dc:title"]);
    }
}
