//! Deterministic prototype synthesis from project facts alone.
//!
//! This is the terminal success path of generation: it performs no I/O,
//! reads no clock and has no failure mode. Identical inputs always produce
//! identical specifications.

use crate::normalize::DEFAULT_SUCCESS_METRICS;
use crate::project::ProjectContext;
use crate::schema::{Component, ComponentKind, Screen, Specification};
use serde_json::{Map, Value};

const NEUTRAL_TITLE: &str = "New product concept";
const NEUTRAL_GOAL: &str = "Show the core value of the product in a few clicks";
const NEUTRAL_FOCUS: &str = "Key workflow";
const NEUTRAL_METRIC: &str = "Weekly active users";

pub fn synthesize(
    project: &ProjectContext,
    focus: Option<&str>,
    phase: Option<&str>,
) -> Specification {
    let title = clean(Some(project.title.as_str())).unwrap_or(NEUTRAL_TITLE);
    let goals: Vec<&str> = project.meaningful_goals();
    let primary_goal = goals.first().copied().unwrap_or(NEUTRAL_GOAL);
    let focus = clean(focus);
    let phase = clean(phase);
    let metric = clean(project.north_star_metric.as_deref()).unwrap_or(NEUTRAL_METRIC);

    let summary = match focus {
        Some(focus) => format!("{} prototype focused on {}.", title, focus),
        None => format!("{} prototype covering the core journey.", title),
    };

    let key_screens = vec![
        value_screen(title, primary_goal, metric),
        focus_screen(focus, &goals, phase),
        interaction_screen(title, focus),
        conversion_screen(title),
    ];

    let mut success_metrics = vec![format!("Improve {}", metric)];
    success_metrics.extend(goals.iter().take(2).map(|g| format!("Progress on: {}", g)));
    if success_metrics.len() < 2 {
        success_metrics.push(DEFAULT_SUCCESS_METRICS[0].to_string());
    }

    let mut metadata = Map::new();
    metadata.insert("fallback".to_string(), Value::Bool(true));
    if let Some(focus) = focus {
        metadata.insert("focus".to_string(), Value::from(focus));
    }
    if let Some(phase) = phase {
        metadata.insert("phase".to_string(), Value::from(phase));
    }

    Specification {
        title: title.to_string(),
        summary,
        goal: Some(primary_goal.to_string()),
        success_metrics: Some(success_metrics),
        user_flow: Some(key_screens.iter().map(|s| s.name.clone()).collect()),
        key_screens,
        visual_style: Some("Clean, high-contrast layout with generous spacing".to_string()),
        call_to_action: Some("Get started".to_string()),
        metadata: Some(metadata),
    }
}

fn clean(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|s| !s.is_empty())
}

fn value_screen(title: &str, goal: &str, metric: &str) -> Screen {
    Screen {
        name: "Welcome".to_string(),
        goal: format!("Explain why {} matters", title),
        primary_actions: vec!["Get started".to_string()],
        layout_notes: Some("Hero on top, proof points below".to_string()),
        components: vec![
            Component::new(ComponentKind::Hero)
                .with_title(title)
                .with_description(goal)
                .with_actions(vec!["Get started".to_string()]),
            Component::new(ComponentKind::Stats)
                .with_title("North star")
                .with_sample_items(vec![metric.to_string()]),
        ],
    }
}

fn focus_screen(focus: Option<&str>, goals: &[&str], phase: Option<&str>) -> Screen {
    let name = focus.unwrap_or(NEUTRAL_FOCUS);
    let items: Vec<String> = if goals.is_empty() {
        vec![
            "Capture the main need".to_string(),
            "Show the first useful result".to_string(),
        ]
    } else {
        goals.iter().map(|g| g.to_string()).collect()
    };

    let mut components = vec![
        Component::new(ComponentKind::List)
            .with_title("What this covers")
            .with_sample_items(items),
    ];
    if let Some(phase) = phase {
        components.push(
            Component::new(ComponentKind::Note)
                .with_title("Phase")
                .with_description(format!("Scoped for the {} phase.", phase)),
        );
    }

    Screen {
        name: name.to_string(),
        goal: format!("Walk through {}", name.to_lowercase()),
        primary_actions: vec!["Continue".to_string()],
        layout_notes: None,
        components,
    }
}

fn interaction_screen(title: &str, focus: Option<&str>) -> Screen {
    let subject = focus.unwrap_or("your request");
    Screen {
        name: "Try it".to_string(),
        goal: format!("Let visitors try {} hands-on", title),
        primary_actions: vec!["Submit".to_string()],
        layout_notes: Some("Form on the left, results on the right".to_string()),
        components: vec![
            Component::new(ComponentKind::Form)
                .with_title(format!("Describe {}", subject))
                .with_fields(vec!["Name".to_string(), "Details".to_string()])
                .with_actions(vec!["Submit".to_string()]),
            Component::new(ComponentKind::List)
                .with_title("Recent entries")
                .with_sample_items(vec!["Example entry".to_string()]),
        ],
    }
}

fn conversion_screen(title: &str) -> Screen {
    Screen {
        name: "Get started".to_string(),
        goal: format!("Turn interest in {} into a sign-up", title),
        primary_actions: vec!["Join the waitlist".to_string()],
        layout_notes: None,
        components: vec![
            Component::new(ComponentKind::Cta)
                .with_title("Ready to try it?")
                .with_description(format!("Be first to use {}.", title))
                .with_actions(vec!["Join the waitlist".to_string()]),
            Component::new(ComponentKind::Form)
                .with_title("Stay in touch")
                .with_fields(vec!["Email".to_string()])
                .with_actions(vec!["Notify me".to_string()]),
        ],
    }
}
