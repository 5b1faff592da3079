//! Turns a [`Specification`] into a self-contained static bundle: an HTML
//! shell, a fixed stylesheet and a client runtime that renders the
//! prototype from embedded data.

mod markup;
mod script;

pub use markup::{escape_html, render_markup};
pub use script::{embed_spec, render_script};

use crate::normalize::{GENERIC_SCREEN_NAME, PLACEHOLDER_GOAL, UNTITLED};
use crate::schema::{Component, ComponentKind, Screen, Specification};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const STYLESHEET: &str = include_str!("styles.css");

pub const MARKUP_FILE: &str = "index.html";
pub const STYLESHEET_FILE: &str = "styles.css";
pub const SCRIPT_FILE: &str = "app.js";

/// The three artifacts of a compiled prototype plus its URL-safe name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bundle {
    pub markup: String,
    pub stylesheet: String,
    pub script: String,
    pub slug: String,
}

impl Bundle {
    /// `(file name, contents)` pairs in write order.
    pub fn files(&self) -> [(&'static str, &str); 3] {
        [
            (MARKUP_FILE, self.markup.as_str()),
            (STYLESHEET_FILE, self.stylesheet.as_str()),
            (SCRIPT_FILE, self.script.as_str()),
        ]
    }
}

/// Compiles a specification. Never fails: structural gaps are filled before
/// rendering.
pub fn compile(spec: &Specification) -> Bundle {
    let spec = sanitize(spec);
    let slug = slugify(&spec.title);
    debug!(
        "Compiling '{}' ({} screens) as {}",
        spec.title,
        spec.key_screens.len(),
        slug
    );

    Bundle {
        markup: render_markup(&spec),
        stylesheet: STYLESHEET.to_string(),
        script: render_script(&spec),
        slug,
    }
}

/// Lower-cases `title` and collapses every run outside `[a-z0-9-]` into a
/// single `-`. Falls back to a random 8-character id when nothing survives.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_dash = false;
    for ch in title.to_lowercase().chars() {
        if ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '-' {
            if pending_dash {
                slug.push('-');
                pending_dash = false;
            }
            slug.push(ch);
        } else {
            pending_dash = true;
        }
    }
    let slug = slug.trim_matches('-').to_string();
    if slug.is_empty() {
        uuid::Uuid::new_v4().simple().to_string()[..8].to_string()
    } else {
        slug
    }
}

/// Returns a copy of `spec` with at least one screen and at least one
/// component per screen.
pub fn sanitize(spec: &Specification) -> Specification {
    let mut spec = spec.clone();
    if spec.title.trim().is_empty() {
        spec.title = UNTITLED.to_string();
    }
    if spec.key_screens.is_empty() {
        spec.key_screens.push(Screen {
            name: GENERIC_SCREEN_NAME.to_string(),
            goal: spec
                .goal
                .clone()
                .unwrap_or_else(|| PLACEHOLDER_GOAL.to_string()),
            primary_actions: Vec::new(),
            layout_notes: None,
            components: Vec::new(),
        });
    }
    for (index, screen) in spec.key_screens.iter_mut().enumerate() {
        if screen.name.trim().is_empty() {
            screen.name = format!("Screen {}", index + 1);
        }
        if screen.components.is_empty() {
            screen.components.push(
                Component::new(ComponentKind::Custom)
                    .with_title(screen.name.clone())
                    .with_description(screen.goal.clone()),
            );
        }
    }
    spec
}
