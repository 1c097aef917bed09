use super::*;
use crate::error::TemplateError;

fn values() -> TemplateValues {
    TemplateValues::new()
}

#[test]
fn test_parse_static_template() {
    let tmpl = Template::parse("products").unwrap();
    assert!(tmpl.is_static());
    assert!(!tmpl.is_wildcard());
    assert!(!tmpl.has_pattern());
    assert_eq!(tmpl.name(), None);
    assert_eq!(tmpl.content(), "products");
}

#[test]
fn test_parse_named_static_template() {
    let tmpl = Template::parse("$catalog:products").unwrap();
    assert!(tmpl.is_static());
    assert_eq!(tmpl.name(), Some("catalog"));
    assert_eq!(tmpl.to_string(), "$catalog:products");
}

#[test]
fn test_parse_wildcard_template() {
    let tmpl = Template::parse("{tail}").unwrap();
    assert!(tmpl.is_wildcard());
    assert!(!tmpl.has_pattern());
    // A wildcard-only template takes the wildcard's name.
    assert_eq!(tmpl.name(), Some("tail"));
}

#[test]
fn test_parse_pattern_template_takes_value_name() {
    let tmpl = Template::parse("{id:[0-9]+}").unwrap();
    assert!(tmpl.has_pattern());
    assert_eq!(tmpl.name(), Some("id"));
}

#[test]
fn test_parse_multi_dynamic_template_stays_unnamed() {
    let tmpl = Template::parse("{lang:[a-z]+}-{rest}").unwrap();
    assert_eq!(tmpl.name(), None);
}

#[test]
fn test_parse_empty_template() {
    assert!(matches!(
        Template::parse(""),
        Err(TemplateError::InvalidTemplate { .. })
    ));
}

#[test]
fn test_parse_name_without_content() {
    assert!(matches!(
        Template::parse("$orders:"),
        Err(TemplateError::InvalidTemplate { .. })
    ));
    assert!(matches!(
        Template::parse("$"),
        Err(TemplateError::InvalidTemplate { .. })
    ));
}

#[test]
fn test_parse_unescaped_closing_brace() {
    assert!(matches!(
        Template::parse("bad}segment"),
        Err(TemplateError::InvalidTemplate { .. })
    ));
}

#[test]
fn test_parse_incomplete_dynamic_slice() {
    assert!(matches!(
        Template::parse("{id:[0-9]+"),
        Err(TemplateError::InvalidTemplate { .. })
    ));
}

#[test]
fn test_parse_second_wildcard() {
    assert!(matches!(
        Template::parse("{tail}{more}"),
        Err(TemplateError::AnotherWildcardName { .. })
    ));
}

#[test]
fn test_parse_repeated_wildcard_name() {
    assert!(matches!(
        Template::parse("{tail}{tail}"),
        Err(TemplateError::RepeatedWildcardName { .. })
    ));
}

#[test]
fn test_parse_repeated_value_name_different_pattern() {
    assert!(matches!(
        Template::parse("{id:[0-9]+}-{id:[a-z]+}"),
        Err(TemplateError::DifferentPattern { .. })
    ));
}

#[test]
fn test_parse_repeated_value_name_same_pattern() {
    let tmpl = Template::parse("{id:[0-9]+}-{id:[0-9]+}").unwrap();
    let mut vs = values();
    assert!(tmpl.matches("7-7", &mut vs));
    assert_eq!(vs.get("id"), Some("7"));
}

#[test]
fn test_parse_invalid_regex() {
    assert!(matches!(
        Template::parse("{id:[0-9+}"),
        Err(TemplateError::InvalidRegex(_))
    ));
}

#[test]
fn test_escaped_dollar_is_literal() {
    let tmpl = Template::parse("\\$price").unwrap();
    assert!(tmpl.is_static());
    assert_eq!(tmpl.name(), None);
    let mut vs = values();
    assert!(tmpl.matches("$price", &mut vs));
    assert_eq!(tmpl.to_string(), "\\$price");
}

#[test]
fn test_escaped_colon_in_name() {
    let tmpl = Template::parse("$ver\\:1:releases").unwrap();
    assert_eq!(tmpl.name(), Some("ver:1"));
    assert_eq!(tmpl.to_string(), "$ver\\:1:releases");
}

#[test]
fn test_escaped_braces_in_static() {
    let tmpl = Template::parse("a\\{b\\}c").unwrap();
    assert!(tmpl.is_static());
    let mut vs = values();
    assert!(tmpl.matches("a{b}c", &mut vs));
    assert_eq!(tmpl.content(), "a\\{b\\}c");
}

#[test]
fn test_braces_in_value_name() {
    let tmpl = Template::parse("$page:{wild{card}}").unwrap();
    assert!(tmpl.is_wildcard());
    let mut vs = values();
    assert!(tmpl.matches("anything", &mut vs));
    assert_eq!(vs.get("wild{card}"), Some("anything"));
}

#[test]
fn test_pattern_with_braced_repetition() {
    // The {2} repetition must not terminate the dynamic slice.
    let tmpl = Template::parse("{lang:[a-z]{2}}").unwrap();
    let mut vs = values();
    assert!(tmpl.matches("en", &mut vs));
    assert_eq!(vs.get("lang"), Some("en"));

    let mut vs = values();
    assert!(!tmpl.matches("eng", &mut vs));
}

#[test]
fn test_pattern_character_class_with_brace() {
    // A '}' inside a character class must not count against the depth.
    let tmpl = Template::parse("{sym:[}]+}").unwrap();
    let mut vs = values();
    assert!(tmpl.matches("}", &mut vs));
}

#[test]
fn test_pattern_empty_character_class_does_not_close() {
    // Neither "[]" nor "[^]" closes a character class, so the closing '}'
    // stays suspended and the dynamic slice never completes.
    assert!(matches!(
        Template::parse("{x:[]}"),
        Err(TemplateError::InvalidTemplate { .. })
    ));
    assert!(matches!(
        Template::parse("{x:[^]}"),
        Err(TemplateError::InvalidTemplate { .. })
    ));
}

#[test]
fn test_match_static() {
    let tmpl = Template::parse("products").unwrap();
    let mut vs = values();
    assert!(tmpl.matches("products", &mut vs));
    assert!(vs.is_empty());
    assert!(!tmpl.matches("product", &mut vs));
}

#[test]
fn test_match_wildcard_captures_all() {
    let tmpl = Template::parse("{tail}").unwrap();
    let mut vs = values();
    assert!(tmpl.matches("a-b-c", &mut vs));
    assert_eq!(vs.get("tail"), Some("a-b-c"));
}

#[test]
fn test_match_pattern_between_statics() {
    let tmpl = Template::parse("order-{id:[0-9]+}.json").unwrap();
    let mut vs = values();
    assert!(tmpl.matches("order-42.json", &mut vs));
    assert_eq!(vs.get("id"), Some("42"));

    let mut vs = values();
    assert!(!tmpl.matches("order-x.json", &mut vs));
}

#[test]
fn test_match_rejects_leftover_without_wildcard() {
    let tmpl = Template::parse("a{id:[0-9]+}b").unwrap();
    let mut vs = values();
    assert!(!tmpl.matches("a1bXX", &mut vs));
    assert!(vs.is_empty());
}

#[test]
fn test_match_wildcard_between_statics() {
    let tmpl = Template::parse("v{rest}.tar.gz").unwrap();
    let mut vs = values();
    assert!(tmpl.matches("v1.2.3.tar.gz", &mut vs));
    assert_eq!(vs.get("rest"), Some("1.2.3"));

    // An empty remainder still matches; it just records no value.
    let mut vs = values();
    assert!(tmpl.matches("v.tar.gz", &mut vs));
    assert_eq!(vs.get("rest"), None);
}

#[test]
fn test_match_pattern_after_wildcard_is_right_anchored() {
    let tmpl = Template::parse("{tail}-{id:[0-9]+}").unwrap();
    let mut vs = values();
    // The rightmost occurrence of the pattern wins; everything before the
    // final "-" belongs to the wildcard.
    assert!(tmpl.matches("a-1-b-42", &mut vs));
    assert_eq!(vs.get("id"), Some("42"));
    assert_eq!(vs.get("tail"), Some("a-1-b"));
}

#[test]
fn test_match_repeated_value_name_must_agree() {
    let tmpl = Template::parse("$item:{id:[0-9]+}-detail-{id}").unwrap();
    let mut vs = values();
    assert!(tmpl.matches("42-detail-42", &mut vs));
    assert_eq!(vs.get("id"), Some("42"));

    let mut vs = values();
    assert!(!tmpl.matches("42-detail-43", &mut vs));
    assert!(vs.is_empty());
}

#[test]
fn test_match_failure_restores_values() {
    let tmpl = Template::parse("{id:[0-9]+}-{tag:[a-z]+}").unwrap();
    let mut vs = values();
    vs.push("outer".into(), "kept".to_string());
    assert!(!tmpl.matches("42-42", &mut vs));
    assert_eq!(vs.len(), 1);
    assert_eq!(vs.get("outer"), Some("kept"));
}

#[test]
fn test_apply_round_trips_match() {
    let tmpl = Template::parse("order-{id:[0-9]+}-{tag:[a-z]+}").unwrap();
    let mut vs = values();
    assert!(tmpl.matches("order-42-spare", &mut vs));
    assert_eq!(tmpl.apply(&vs, false).unwrap(), "order-42-spare");
}

#[test]
fn test_apply_rejects_partial_match() {
    let tmpl = Template::parse("{id:[0-9]+}").unwrap();
    let vs: TemplateValues = [("id", "42x")].into_iter().collect();
    assert!(matches!(
        tmpl.apply(&vs, false),
        Err(TemplateError::InvalidValue { .. })
    ));
}

#[test]
fn test_apply_missing_value() {
    let tmpl = Template::parse("{id:[0-9]+}").unwrap();
    let vs = values();
    assert!(matches!(
        tmpl.apply(&vs, false),
        Err(TemplateError::MissingValue { .. })
    ));
    assert_eq!(tmpl.apply(&vs, true).unwrap(), "");
}

#[test]
fn test_similarity_reflexive() {
    for s in ["products", "{id:[0-9]+}", "{tail}", "$x:a{v:[a-z]+}b{tail}"] {
        let tmpl = Template::parse(s).unwrap();
        assert_eq!(tmpl.similarity(&tmpl), Similarity::TheSame, "{}", s);
    }
}

#[test]
fn test_similarity_symmetric() {
    let cases = [
        ("products", "orders"),
        ("{id:[0-9]+}", "{num:[0-9]+}"),
        ("$a:{tail}", "$b:{tail}"),
        ("a{v:[a-z]+}", "a{v:[0-9]+}"),
    ];

    for (left, right) in cases {
        let a = Template::parse(left).unwrap();
        let b = Template::parse(right).unwrap();
        assert_eq!(a.similarity(&b), b.similarity(&a), "{} vs {}", left, right);
    }
}

#[test]
fn test_similarity_static() {
    let a = Template::parse("products").unwrap();
    let b = Template::parse("products").unwrap();
    let c = Template::parse("$catalog:products").unwrap();
    let d = Template::parse("orders").unwrap();

    assert_eq!(a.similarity(&b), Similarity::TheSame);
    assert_eq!(a.similarity(&c), Similarity::DifferentNames);
    assert_eq!(a.similarity(&d), Similarity::Different);
}

#[test]
fn test_similarity_wildcard() {
    let a = Template::parse("{tail}").unwrap();
    let b = Template::parse("{rest}").unwrap();
    let c = Template::parse("$x:{tail}").unwrap();

    assert_eq!(a.similarity(&b), Similarity::DifferentValueNames);
    assert_eq!(a.similarity(&c), Similarity::DifferentNames);
}

#[test]
fn test_similarity_mixed_shapes() {
    let stat = Template::parse("products").unwrap();
    let wild = Template::parse("{tail}").unwrap();
    let patt = Template::parse("{id:[0-9]+}").unwrap();

    assert_eq!(stat.similarity(&wild), Similarity::Different);
    assert_eq!(wild.similarity(&patt), Similarity::Different);
    assert_eq!(patt.similarity(&stat), Similarity::Different);
}

#[test]
fn test_similarity_pattern_templates() {
    let a = Template::parse("a{id:[0-9]+}b{tail}").unwrap();
    let b = Template::parse("$x:a{num:[0-9]+}b{rest}").unwrap();
    let c = Template::parse("a{id:[a-f]+}b{tail}").unwrap();

    assert_eq!(a.similarity(&b), Similarity::DifferentValueNames);
    assert_eq!(a.similarity(&c), Similarity::Different);
}

#[test]
fn test_wildcard_has_exactly_one_regexless_slice() {
    let tmpl = Template::parse("a{v:[a-z]+}-{tail}-{v}").unwrap();
    let names = tmpl.value_names();
    assert_eq!(names.len(), 2);

    let mut vs = values();
    assert!(tmpl.matches("abc-x-y-abc", &mut vs));
    assert_eq!(vs.get("v"), Some("abc"));
    assert_eq!(vs.get("tail"), Some("x-y"));
}

#[test]
fn test_render_parse_round_trip() {
    let sources = [
        "products",
        "$catalog:products",
        "{id:[0-9]+}",
        "$item:a\\{b\\}c{id:[0-9]+}{tail}{id}",
        "\\$price{rest}",
    ];

    for source in sources {
        let tmpl = Template::parse(source).unwrap();
        let rendered = tmpl.to_string();
        let reparsed = Template::parse(&rendered).unwrap();
        assert_eq!(
            tmpl.similarity(&reparsed),
            Similarity::TheSame,
            "{} -> {}",
            source,
            rendered
        );
    }
}
