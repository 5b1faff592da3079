use serde::{Deserialize, Serialize};

/// Known facts about the project a prototype is generated for.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProjectContext {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default)]
    pub goals: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub north_star_metric: Option<String>,
    /// Free-text area the next prototype should concentrate on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub focus: Option<String>,
    /// Delivery phase label, e.g. "discovery" or "beta".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,
}

impl ProjectContext {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn with_goals(mut self, goals: Vec<String>) -> Self {
        self.goals = goals;
        self
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    pub fn with_north_star(mut self, metric: impl Into<String>) -> Self {
        self.north_star_metric = Some(metric.into());
        self
    }

    pub fn with_focus(mut self, focus: impl Into<String>) -> Self {
        self.focus = Some(focus.into());
        self
    }

    pub fn with_phase(mut self, phase: impl Into<String>) -> Self {
        self.phase = Some(phase.into());
        self
    }

    /// Goals with blank entries removed.
    pub fn meaningful_goals(&self) -> Vec<&str> {
        self.goals
            .iter()
            .map(|g| g.trim())
            .filter(|g| !g.is_empty())
            .collect()
    }

    /// Explicit summary, else the goals joined into one sentence.
    pub fn summary_or_goals(&self) -> String {
        match self.summary.as_deref().map(str::trim) {
            Some(summary) if !summary.is_empty() => summary.to_string(),
            _ => self.meaningful_goals().join("; "),
        }
    }
}
