use jsonschema::JSONSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// The canonical description of a prototype. The normalizer and the
/// fallback synthesizer produce it; the bundle compiler consumes it.
///
/// Field names are serialized exactly as listed (snake_case); persistence
/// collaborators depend on this shape.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Specification {
    pub title: String,
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goal: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success_metrics: Option<Vec<String>>,
    /// Never empty once normalization has completed.
    pub key_screens: Vec<Screen>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_flow: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visual_style: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_to_action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
}

/// One navigable view within a prototype.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Screen {
    pub name: String,
    pub goal: String,
    #[serde(default)]
    pub primary_actions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout_notes: Option<String>,
    #[serde(default)]
    pub components: Vec<Component>,
}

/// A typed UI block within a screen.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Component {
    pub kind: ComponentKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Input labels; only meaningful for `form` components.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<String>>,
    #[serde(default)]
    pub actions: Vec<String>,
    /// Rows for `list` components and tiles for `stats` components.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_items: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dataset: Option<Vec<BTreeMap<String, String>>>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ComponentKind {
    Hero,
    Form,
    List,
    Cta,
    Stats,
    Custom,
    Navigation,
    Modal,
    Note,
}

impl ComponentKind {
    pub const ALL: [ComponentKind; 9] = [
        ComponentKind::Hero,
        ComponentKind::Form,
        ComponentKind::List,
        ComponentKind::Cta,
        ComponentKind::Stats,
        ComponentKind::Custom,
        ComponentKind::Navigation,
        ComponentKind::Modal,
        ComponentKind::Note,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentKind::Hero => "hero",
            ComponentKind::Form => "form",
            ComponentKind::List => "list",
            ComponentKind::Cta => "cta",
            ComponentKind::Stats => "stats",
            ComponentKind::Custom => "custom",
            ComponentKind::Navigation => "navigation",
            ComponentKind::Modal => "modal",
            ComponentKind::Note => "note",
        }
    }

    /// Case-insensitive lookup; `None` for anything outside the enum.
    pub fn parse(raw: &str) -> Option<Self> {
        let wanted = raw.trim().to_lowercase();
        Self::ALL.into_iter().find(|kind| kind.as_str() == wanted)
    }
}

impl std::fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Component {
    /// A bare component of the given kind with no content.
    pub fn new(kind: ComponentKind) -> Self {
        Self {
            kind,
            title: None,
            description: None,
            fields: None,
            actions: Vec::new(),
            sample_items: None,
            dataset: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_fields(mut self, fields: Vec<String>) -> Self {
        self.fields = Some(fields);
        self
    }

    pub fn with_actions(mut self, actions: Vec<String>) -> Self {
        self.actions = actions;
        self
    }

    pub fn with_sample_items(mut self, items: Vec<String>) -> Self {
        self.sample_items = Some(items);
        self
    }
}

/// Invariant violations of a [`Specification`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SpecError {
    #[error("specification title is empty")]
    EmptyTitle,
    #[error("specification has no key screens")]
    NoScreens,
    #[error("screen #{index} has an empty name")]
    UnnamedScreen { index: usize },
    #[error("screen '{name}' has no components")]
    ComponentlessScreen { name: String },
    #[error("specification does not match the canonical schema: {0}")]
    Schema(String),
}

impl Specification {
    /// Checks every data-model invariant the compiler relies on.
    pub fn validate(&self) -> Result<(), SpecError> {
        if self.title.trim().is_empty() {
            return Err(SpecError::EmptyTitle);
        }
        if self.key_screens.is_empty() {
            return Err(SpecError::NoScreens);
        }
        for (index, screen) in self.key_screens.iter().enumerate() {
            if screen.name.trim().is_empty() {
                return Err(SpecError::UnnamedScreen { index });
            }
            if screen.components.is_empty() {
                return Err(SpecError::ComponentlessScreen {
                    name: screen.name.clone(),
                });
            }
        }
        validate_json(&serde_json::to_value(self).map_err(|e| SpecError::Schema(e.to_string()))?)
    }

    /// True when the synthesizer (rather than a model) produced this value.
    pub fn is_fallback(&self) -> bool {
        self.metadata
            .as_ref()
            .and_then(|m| m.get("fallback"))
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }
}

/// Validates a serialized specification against the embedded JSON Schema.
pub fn validate_json(instance: &Value) -> Result<(), SpecError> {
    let schema_json = include_str!("../schemas/prototype_spec.schema.json");
    let schema_val: Value =
        serde_json::from_str(schema_json).map_err(|e| SpecError::Schema(e.to_string()))?;
    let compiled = JSONSchema::compile(&schema_val)
        .map_err(|e| SpecError::Schema(format!("failed to compile schema: {}", e)))?;

    if let Err(errors) = compiled.validate(instance) {
        let error_msgs: Vec<String> = errors.map(|e| e.to_string()).collect();
        return Err(SpecError::Schema(error_msgs.join(", ")));
    }
    Ok(())
}
