//! Forgiving normalizer from model output to a canonical [`Specification`].
//!
//! The input is treated as a loose JSON tree. Keys are first renamed through
//! the alias tables in [`aliases`], then each canonical field is coerced by a
//! dedicated function. Nothing is mutated in place: every step builds a new
//! value from the previous one.

pub mod aliases;
pub mod bullets;
mod coerce;

use crate::schema::{Component, ComponentKind, Screen, Specification};
use aliases::{Scope, rename_keys};
use coerce::{first_array, first_text, kind_name, string_list, string_text, text, truncate};
use serde_json::{Map, Value};
use tracing::debug;

pub use bullets::extract_bullets;

/// Goal used for page-like objects that do not state one.
pub const PLACEHOLDER_GOAL: &str = "Help visitors complete the main task on this screen.";
/// Screen name used when neither the payload nor the focus hint offers one.
pub const GENERIC_SCREEN_NAME: &str = "Prototype overview";
pub const UNTITLED: &str = "Untitled prototype";
pub const DEFAULT_SUCCESS_METRICS: [&str; 2] = [
    "Visitors complete the primary flow without assistance",
    "Stakeholders can explain the value proposition after one walkthrough",
];

const MAX_NOTE_ITEMS: usize = 8;
const MAX_SCREEN_NAME_CHARS: usize = 48;
const MAX_NOTE_TITLE_CHARS: usize = 60;

const COMPONENT_KEYS: &[&str] = &["components", "sections", "widgets", "panels"];
const SCREEN_NAME_KEYS: &[&str] = &["name", "title", "slug", "heading"];
const SCREEN_GOAL_KEYS: &[&str] = &["goal", "purpose", "objective"];

/// Project facts the normalizer falls back on when the payload is silent.
#[derive(Debug, Clone, Default)]
pub struct NormalizeContext {
    pub default_title: String,
    pub default_summary: String,
    pub default_goal: Option<String>,
    pub focus_hint: String,
    pub assistant_notes: Option<String>,
}

impl NormalizeContext {
    pub fn new(default_title: impl Into<String>, default_summary: impl Into<String>) -> Self {
        Self {
            default_title: default_title.into(),
            default_summary: default_summary.into(),
            ..Self::default()
        }
    }

    pub fn with_goal(mut self, goal: impl Into<String>) -> Self {
        self.default_goal = Some(goal.into());
        self
    }

    pub fn with_focus(mut self, focus: impl Into<String>) -> Self {
        self.focus_hint = focus.into();
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.assistant_notes = Some(notes.into());
        self
    }
}

#[derive(Debug, thiserror::Error)]
pub enum NormalizeError {
    #[error("input is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("expected a JSON object, found {0}")]
    NotAnObject(&'static str),
}

/// Best-effort normalization; `None` only when the input cannot be read as a
/// JSON object at all.
pub fn normalize(raw: &Value, ctx: &NormalizeContext) -> Option<Specification> {
    match try_normalize(raw, ctx) {
        Ok(spec) => Some(spec),
        Err(e) => {
            debug!("Normalization rejected input: {}", e);
            None
        }
    }
}

/// Same as [`normalize`] for raw model text.
pub fn normalize_str(raw: &str, ctx: &NormalizeContext) -> Option<Specification> {
    normalize(&Value::String(raw.to_string()), ctx)
}

pub fn try_normalize(raw: &Value, ctx: &NormalizeContext) -> Result<Specification, NormalizeError> {
    let root = decode_root(raw)?;
    let root = unwrap_envelope(root);
    let root = rename_keys(&root, Scope::Spec);

    let note_items = ctx
        .assistant_notes
        .as_deref()
        .map(extract_bullets)
        .unwrap_or_default();

    let title = root
        .get("title")
        .and_then(string_text)
        .or_else(|| non_empty(&ctx.default_title))
        .unwrap_or_else(|| UNTITLED.to_string());
    let summary = summary_text(&root).unwrap_or_else(|| ctx.default_summary.trim().to_string());
    let explicit_goal = root.get("goal").and_then(text);

    let key_screens = explicit_screens(&root)
        .or_else(|| derive_screens(&root))
        .unwrap_or_else(|| {
            vec![synthesize_screen(
                &root,
                ctx,
                explicit_goal.as_deref(),
                &title,
                &summary,
                &note_items,
            )]
        });

    let goal = explicit_goal.or_else(|| ctx.default_goal.as_deref().and_then(non_empty));

    let success_metrics = match root.get("success_metrics") {
        Some(value) if value.is_array() => string_list(value),
        _ => Some(DEFAULT_SUCCESS_METRICS.iter().map(|m| m.to_string()).collect()),
    };

    Ok(Specification {
        title,
        summary,
        goal,
        success_metrics,
        key_screens,
        user_flow: root.get("user_flow").and_then(string_list),
        visual_style: root.get("visual_style").and_then(text),
        call_to_action: root.get("call_to_action").and_then(text),
        metadata: metadata(&root, &note_items),
    })
}

fn decode_root(raw: &Value) -> Result<Map<String, Value>, NormalizeError> {
    match raw {
        Value::Object(map) => Ok(map.clone()),
        Value::String(s) => match serde_json::from_str::<Value>(s)? {
            Value::Object(map) => Ok(map),
            other => Err(NormalizeError::NotAnObject(kind_name(&other))),
        },
        other => Err(NormalizeError::NotAnObject(kind_name(other))),
    }
}

/// Descends one level into a `prototype_spec` envelope when present.
fn unwrap_envelope(root: Map<String, Value>) -> Map<String, Value> {
    let inner = root
        .get("prototype_spec")
        .or_else(|| root.get("prototypeSpec"))
        .and_then(Value::as_object)
        .cloned();
    inner.unwrap_or(root)
}

fn non_empty(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn summary_text(root: &Map<String, Value>) -> Option<String> {
    match root.get("summary")? {
        Value::Array(lines) => {
            let joined = lines
                .iter()
                .filter_map(string_text)
                .collect::<Vec<_>>()
                .join("\n");
            non_empty(&joined)
        }
        other => string_text(other),
    }
}

fn explicit_screens(root: &Map<String, Value>) -> Option<Vec<Screen>> {
    let items = root.get("key_screens")?.as_array()?;
    non_empty_vec(
        items
            .iter()
            .enumerate()
            .filter_map(|(index, item)| coerce_screen(item, index))
            .collect(),
    )
}

/// Tries page-like source shapes in priority order; the first one yielding at
/// least one screen wins.
fn derive_screens(root: &Map<String, Value>) -> Option<Vec<Screen>> {
    page_sources(root).into_iter().find_map(|pages| {
        non_empty_vec(
            pages
                .into_iter()
                .enumerate()
                .filter_map(|(index, page)| coerce_screen(page, index))
                .collect(),
        )
    })
}

fn page_sources(root: &Map<String, Value>) -> [Vec<&Value>; 5] {
    let webpage = root.get("webpage").filter(|v| v.is_object());
    let main_page = root.get("main_page").filter(|v| v.is_object());
    [
        array_items(root, "webpages"),
        webpage.into_iter().collect(),
        array_items(root, "pages"),
        main_page
            .into_iter()
            .chain(array_items(root, "secondary_pages"))
            .collect(),
        COMPONENT_KEYS
            .iter()
            .flat_map(|key| array_items(root, key))
            .filter(|item| is_page_like(item))
            .collect(),
    ]
}

fn array_items<'a>(root: &'a Map<String, Value>, key: &str) -> Vec<&'a Value> {
    root.get(key)
        .and_then(Value::as_array)
        .map(|items| items.iter().collect())
        .unwrap_or_default()
}

fn is_page_like(value: &Value) -> bool {
    value
        .as_object()
        .is_some_and(|map| first_array(map, COMPONENT_KEYS).is_some())
}

fn non_empty_vec<T>(items: Vec<T>) -> Option<Vec<T>> {
    (!items.is_empty()).then_some(items)
}

fn coerce_screen(value: &Value, index: usize) -> Option<Screen> {
    match value {
        Value::String(_) => {
            let name = text(value)?;
            let goal = PLACEHOLDER_GOAL.to_string();
            let components = ensure_components(Vec::new(), &name, &goal);
            Some(Screen {
                name,
                goal,
                primary_actions: Vec::new(),
                layout_notes: None,
                components,
            })
        }
        Value::Object(map) => {
            let map = rename_keys(map, Scope::Screen);
            let name = first_text(&map, SCREEN_NAME_KEYS)
                .unwrap_or_else(|| format!("Screen {}", index + 1));
            let goal =
                first_text(&map, SCREEN_GOAL_KEYS).unwrap_or_else(|| PLACEHOLDER_GOAL.to_string());
            let primary_actions = ["primary_actions", "actions"]
                .iter()
                .find_map(|key| map.get(*key).and_then(string_list))
                .unwrap_or_default();
            let layout_notes = first_text(&map, &["layout_notes", "layout"]);
            let components = first_array(&map, COMPONENT_KEYS)
                .map(|items| coerce_components(items))
                .unwrap_or_default();
            let components = ensure_components(components, &name, &goal);

            Some(Screen {
                name,
                goal,
                primary_actions,
                layout_notes,
                components,
            })
        }
        Value::Null | Value::Bool(_) | Value::Number(_) | Value::Array(_) => None,
    }
}

fn coerce_components(items: &[Value]) -> Vec<Component> {
    items.iter().filter_map(coerce_component).collect()
}

fn coerce_component(value: &Value) -> Option<Component> {
    match value {
        Value::String(_) => {
            let body = text(value)?;
            Some(
                Component::new(ComponentKind::Note)
                    .with_title(truncate(&body, MAX_NOTE_TITLE_CHARS))
                    .with_description(body),
            )
        }
        Value::Object(map) => {
            let map = rename_keys(map, Scope::Component);
            let kind = map
                .get("kind")
                .and_then(Value::as_str)
                .and_then(ComponentKind::parse)
                .unwrap_or(ComponentKind::Custom);

            Some(Component {
                kind,
                title: first_text(&map, &["title", "name", "heading", "label"]),
                description: first_text(
                    &map,
                    &["description", "body", "text", "content", "summary"],
                ),
                fields: map.get("fields").and_then(string_list),
                actions: map.get("actions").and_then(string_list).unwrap_or_default(),
                sample_items: ["sample_items", "items"]
                    .iter()
                    .find_map(|key| map.get(*key).and_then(string_list)),
                dataset: map.get("dataset").and_then(coerce::dataset),
            })
        }
        Value::Null | Value::Bool(_) | Value::Number(_) | Value::Array(_) => None,
    }
}

/// A screen never leaves normalization without a component.
fn ensure_components(components: Vec<Component>, name: &str, goal: &str) -> Vec<Component> {
    if !components.is_empty() {
        return components;
    }
    vec![
        Component::new(ComponentKind::Custom)
            .with_title(name)
            .with_description(goal),
    ]
}

fn synthesize_screen(
    root: &Map<String, Value>,
    ctx: &NormalizeContext,
    explicit_goal: Option<&str>,
    title: &str,
    summary: &str,
    note_items: &[String],
) -> Screen {
    let name = non_empty(&ctx.focus_hint)
        .map(|focus| truncate(&focus, MAX_SCREEN_NAME_CHARS))
        .unwrap_or_else(|| GENERIC_SCREEN_NAME.to_string());

    let goal = explicit_goal
        .and_then(non_empty)
        .or_else(|| ctx.default_goal.as_deref().and_then(non_empty))
        .or_else(|| non_empty(&ctx.default_summary))
        .or_else(|| non_empty(summary))
        .unwrap_or_else(|| PLACEHOLDER_GOAL.to_string());

    let loose = first_array(root, COMPONENT_KEYS)
        .map(|items| coerce_components(items))
        .and_then(non_empty_vec);

    let components = loose.unwrap_or_else(|| {
        if note_items.is_empty() {
            let description = non_empty(summary).unwrap_or_else(|| goal.clone());
            vec![
                Component::new(ComponentKind::Custom)
                    .with_title(title)
                    .with_description(description),
            ]
        } else {
            vec![
                Component::new(ComponentKind::List)
                    .with_title("Highlights")
                    .with_sample_items(note_items.iter().take(MAX_NOTE_ITEMS).cloned().collect()),
            ]
        }
    });

    debug!(
        "Synthesized single screen '{}' with {} component(s)",
        name,
        components.len()
    );

    Screen {
        name,
        goal,
        primary_actions: Vec::new(),
        layout_notes: None,
        components,
    }
}

fn metadata(root: &Map<String, Value>, note_items: &[String]) -> Option<Map<String, Value>> {
    let mut metadata = root.get("metadata").and_then(Value::as_object).cloned();
    if !note_items.is_empty() {
        metadata.get_or_insert_with(Map::new).insert(
            "assistant_metrics".to_string(),
            Value::from(note_items.to_vec()),
        );
    }
    metadata
}
