//! Declarative key aliases.
//!
//! Model output mixes camelCase and snake_case freely. Every alias lives in
//! one of the tables below and is applied by [`rename_keys`] before any
//! semantic coercion runs, so the coercion code only ever sees canonical keys.

use serde_json::{Map, Value};

/// The nesting level an object was found at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Spec,
    Screen,
    Component,
}

const SPEC_ALIASES: &[(&str, &str)] = &[
    ("keyScreens", "key_screens"),
    ("userFlow", "user_flow"),
    ("callToAction", "call_to_action"),
    ("successMetrics", "success_metrics"),
    ("visualStyle", "visual_style"),
    ("mainPage", "main_page"),
    ("secondaryPages", "secondary_pages"),
    ("prototypeSpec", "prototype_spec"),
];

const SCREEN_ALIASES: &[(&str, &str)] = &[
    ("primaryActions", "primary_actions"),
    ("layoutNotes", "layout_notes"),
];

const COMPONENT_ALIASES: &[(&str, &str)] = &[
    ("primaryActions", "actions"),
    ("primary_actions", "actions"),
    ("sampleItems", "sample_items"),
    ("type", "kind"),
];

impl Scope {
    fn aliases(self) -> &'static [(&'static str, &'static str)] {
        match self {
            Scope::Spec => SPEC_ALIASES,
            Scope::Screen => SCREEN_ALIASES,
            Scope::Component => COMPONENT_ALIASES,
        }
    }
}

/// Returns a copy of `map` with every aliased key renamed to its canonical
/// form. When both spellings are present the canonical key wins.
pub fn rename_keys(map: &Map<String, Value>, scope: Scope) -> Map<String, Value> {
    let aliases = scope.aliases();
    let mut renamed = Map::new();

    for (key, value) in map {
        if let Some((_, canonical)) = aliases.iter().find(|(alias, _)| alias == key) {
            if map.contains_key(*canonical) {
                continue;
            }
            renamed
                .entry((*canonical).to_string())
                .or_insert_with(|| value.clone());
        } else {
            renamed.insert(key.clone(), value.clone());
        }
    }

    renamed
}
