use oxiri::Iri;
use pretty_assertions::assert_eq;
use rdfa_core::ResolveError;
use rdfa_core::context::{Context, Session, TermMatching};
use rstest::*;

#[fixture]
fn context() -> Context {
    let session = Session::new(
        Iri::parse("http://example.org/dir/doc".to_string()).unwrap(),
        TermMatching::CaseSensitive,
    );
    let mut context = Context::child(&Context::initial(session), None);
    context.register_prefix("ex", "http://ex/");
    context.register_term("license", "http://www.w3.org/1999/xhtml/vocab#license");
    context
}

#[rstest]
#[case::absolute("http://abs.example/x", "http://abs.example/x")]
#[case::relative("page", "http://example.org/dir/page")]
#[case::empty_is_base("", "http://example.org/dir/doc")]
#[case::fragment("#frag", "http://example.org/dir/doc#frag")]
#[case::curie_like_is_still_a_uri("ex:a", "ex:a")]
fn expand_uri(context: Context, #[case] value: &str, #[case] expected: &str) {
    assert_eq!(&*context.expand_uri(value).unwrap().value(), expected);
}

#[rstest]
#[case::curie("ex:a", "http://ex/a")]
#[case::safe_curie("[ex:a]", "http://ex/a")]
#[case::prefix_case("EX:a", "http://ex/a")]
#[case::default_prefix(":next", "http://www.w3.org/1999/xhtml/vocab#next")]
#[case::unknown_prefix_is_absolute("urn:isbn:0451450523", "urn:isbn:0451450523")]
#[case::relative("other", "http://example.org/dir/other")]
fn expand_curie_or_uri(context: Context, #[case] value: &str, #[case] expected: &str) {
    assert_eq!(&*context.expand_curie_or_uri(value).unwrap().value(), expected);
}

#[rstest]
#[case::term("license", "http://www.w3.org/1999/xhtml/vocab#license")]
#[case::curie("ex:b", "http://ex/b")]
#[case::absolute("http://abs.example/p", "http://abs.example/p")]
fn expand_term_or_curie_or_abs_uri(context: Context, #[case] value: &str, #[case] expected: &str) {
    assert_eq!(
        &*context.expand_term_or_curie_or_abs_uri(value).unwrap().value(),
        expected
    );
}

#[rstest]
fn terms_fall_back_to_vocabulary(mut context: Context) {
    assert!(matches!(
        context.expand_term_or_curie_or_abs_uri("name"),
        Err(ResolveError::NoVocabulary { .. })
    ));

    context.set_vocabulary(Some("http://schema.org/".to_string()));
    assert_eq!(
        &*context.expand_term_or_curie_or_abs_uri("name").unwrap().value(),
        "http://schema.org/name"
    );
    assert!(matches!(
        context.expand_term_or_curie_or_abs_uri("not a term"),
        Err(ResolveError::InvalidTerm { .. })
    ));
}

#[rstest]
fn terms_are_case_sensitive_by_default(context: Context) {
    assert!(context.expand_term_or_curie_or_abs_uri("LICENSE").is_err());
}

#[rstest]
fn safe_and_plain_blank_node_curies_agree(context: Context) {
    let safe = context.expand_curie_or_uri("[_:x]").unwrap();
    let plain = context.expand_curie_or_uri("_:x").unwrap();
    let other = context.expand_curie_or_uri("_:y").unwrap();

    assert!(safe.is_blank_node());
    assert_eq!(safe, plain);
    assert_ne!(safe, other);
}

#[rstest]
#[case::empty_safe_curie("[]")]
#[case::bad_default_prefix(":1bad")]
fn expand_curie_or_uri_rejects(context: Context, #[case] value: &str) {
    assert!(context.expand_curie_or_uri(value).is_err());
}

#[rstest]
fn reserved_prefixes_are_refused(mut context: Context) {
    assert!(!context.register_prefix("_", "http://x/"));
    assert!(!context.register_prefix("", "http://x/"));
    assert!(context.register_prefix("Foo", "http://foo/"));
    assert_eq!(context.resolve_prefix("FOO"), Some("http://foo/"));
}

#[rstest]
fn sibling_mappings_are_isolated(context: Context) {
    let mut first = Context::child(&context, None);
    first.register_prefix("only", "http://first/");
    let second = Context::child(&context, None);

    assert_eq!(first.resolve_prefix("only"), Some("http://first/"));
    assert_eq!(second.resolve_prefix("only"), None);
    assert_eq!(context.resolve_prefix("only"), None);
    assert_eq!(second.resolve_prefix("ex"), Some("http://ex/"));
}

#[rstest]
fn relative_results_follow_base_changes(context: Context) {
    let page = context.expand_uri("page").unwrap();
    assert!(page.is_relative());

    context.base().set("http://moved.example/root/").unwrap();
    assert_eq!(&*page.value(), "http://moved.example/root/page");
}
