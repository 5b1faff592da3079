use protoforge_engine::compiler::compile;
use protoforge_engine::normalize::{NormalizeContext, normalize, normalize_str};
use protoforge_engine::schema::{ComponentKind, Specification};
use serde_json::{Value, json};

fn ctx() -> NormalizeContext {
    NormalizeContext::new("Budget Buddy", "Helps people track spending")
}

fn assert_invariants(spec: &Specification) {
    assert!(!spec.title.trim().is_empty(), "title must not be empty");
    assert!(!spec.key_screens.is_empty(), "at least one screen");
    for screen in &spec.key_screens {
        assert!(!screen.name.trim().is_empty(), "screen name must not be empty");
        assert!(!screen.components.is_empty(), "screen {} has no components", screen.name);
    }
    spec.validate().expect("normalized output should validate");
}

#[test]
fn test_malformed_inputs_never_break_invariants() {
    let inputs = vec![
        json!({}),
        json!({ "title": "" }),
        json!({ "key_screens": "not a list" }),
        json!({ "key_screens": [null, 3, "Dashboard", { "components": "oops" }] }),
        json!({ "webpages": [] }),
        json!({ "sections": ["Intro", { "title": "Pricing" }] }),
        json!({ "prototype_spec": { "keyScreens": [{ "title": "Home", "components": [{ "type": "nonsense" }] }] } }),
        json!({ "summary": ["line one", "line two"], "success_metrics": "Retention" }),
        Value::String("{\"title\": \"Encoded\"}".to_string()),
    ];

    for input in inputs {
        let spec = normalize(&input, &ctx())
            .unwrap_or_else(|| panic!("object input should normalize: {}", input));
        assert_invariants(&spec);
    }
}

#[test]
fn test_non_object_inputs_are_rejected() {
    for input in [Value::Null, json!(42), json!([1, 2]), json!("not json at all")] {
        assert!(normalize(&input, &ctx()).is_none(), "{} should be rejected", input);
    }
    assert!(normalize_str("{ broken", &ctx()).is_none());
}

#[test]
fn test_canonical_round_trip_is_stable() {
    let raw = json!({
        "title": "Budget Buddy",
        "keyScreens": [
            { "name": "Home", "components": [{ "type": "hero", "title": "Save more" }] },
            { "title": "Insights", "components": ["Spending by category"] }
        ],
        "userFlow": ["Home", "Insights"]
    });
    let once = normalize(&raw, &ctx()).unwrap();
    let canonical = serde_json::to_value(&once).unwrap();
    let twice = normalize(&canonical, &ctx()).unwrap();
    assert_eq!(once, twice);
}

#[test]
fn test_webpages_become_screens() {
    let raw = json!({ "webpages": [{ "name": "Home", "sections": [{ "type": "hero", "title": "Hi" }] }] });
    let spec = normalize(&raw, &ctx()).unwrap();
    assert_eq!(spec.key_screens.len(), 1);
    assert_eq!(spec.key_screens[0].name, "Home");
    assert_eq!(spec.key_screens[0].components.len(), 1);
    assert_eq!(spec.key_screens[0].components[0].kind, ComponentKind::Hero);
}

#[test]
fn test_empty_screens_with_bulleted_notes() {
    let ctx = ctx().with_notes("Here is the plan:\n- Track signups\n- Track retention");
    let spec = normalize(&json!({ "key_screens": [] }), &ctx).unwrap();
    assert_eq!(spec.key_screens.len(), 1);
    let components = &spec.key_screens[0].components;
    assert_eq!(components.len(), 1);
    assert_eq!(components[0].kind, ComponentKind::List);
    assert_eq!(
        components[0].sample_items.as_deref(),
        Some(&["Track signups".to_string(), "Track retention".to_string()][..])
    );
}

#[test]
fn test_normalized_output_always_compiles() {
    let spec = normalize(&json!({ "title": "???" }), &ctx()).unwrap();
    let bundle = compile(&spec);
    assert!(!bundle.markup.is_empty());
    assert!(!bundle.stylesheet.is_empty());
    assert!(!bundle.script.is_empty());
    assert!(
        bundle
            .slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    );
    assert!(!bundle.slug.is_empty());
}
