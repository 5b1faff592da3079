use anyhow::{Result, anyhow};
use boa_engine::{Context, Source};
use protoforge_engine::compile;
use protoforge_engine::fallback::synthesize;
use protoforge_engine::project::ProjectContext;
use protoforge_engine::schema::{Component, ComponentKind, Screen, Specification};
use serde::Deserialize;

const STUB_DOM: &str = include_str!("support/stub_dom.js");

/// What the stub DOM shows after the runtime last rendered.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snapshot {
    screen: Option<String>,
    buttons: Vec<String>,
    notifications: Vec<String>,
    list_items: Vec<String>,
    stat_tiles: Vec<String>,
    inputs: Vec<String>,
}

/// The compiled `app.js` running against the stub DOM.
struct ClientRuntime {
    context: Context,
}

impl ClientRuntime {
    fn load(spec: &Specification) -> Result<Self> {
        let mut runtime = Self {
            context: Context::default(),
        };
        runtime.run(STUB_DOM)?;
        runtime.run(&compile(spec).script)?;
        Ok(runtime)
    }

    fn run(&mut self, code: &str) -> Result<String> {
        let value = self
            .context
            .eval(Source::from_bytes(code))
            .map_err(|e| anyhow!("{}", e))?;
        let text = value
            .to_string(&mut self.context)
            .map_err(|e| anyhow!("{}", e))?;
        Ok(text.to_std_string_escaped())
    }

    fn snapshot(&mut self) -> Result<Snapshot> {
        Ok(serde_json::from_str(&self.run("__snapshot()")?)?)
    }

    fn click(&mut self, label: &str) -> Result<Snapshot> {
        self.run(&format!("__click({})", serde_json::to_string(label)?))?;
        self.snapshot()
    }
}

fn one_screen(components: Vec<Component>) -> Specification {
    Specification {
        title: "Budget Buddy".to_string(),
        summary: "Personal finance".to_string(),
        goal: None,
        success_metrics: None,
        key_screens: vec![Screen {
            name: "Home".to_string(),
            goal: "Start".to_string(),
            primary_actions: vec![],
            layout_notes: None,
            components,
        }],
        user_flow: None,
        visual_style: None,
        call_to_action: None,
        metadata: None,
    }
}

#[test]
fn test_action_named_after_a_screen_notifies_and_navigates() -> Result<()> {
    let spec = synthesize(&ProjectContext::new("Budget Buddy"), None, None);
    let mut runtime = ClientRuntime::load(&spec)?;
    assert_eq!(runtime.snapshot()?.screen.as_deref(), Some("Welcome"));

    let after = runtime.click("Get started")?;
    assert_eq!(after.screen.as_deref(), Some("Get started"));
    assert_eq!(after.notifications, vec!["“Get started” clicked"]);

    let after = runtime.click("Join the waitlist")?;
    assert_eq!(after.screen.as_deref(), Some("Get started"));
    assert_eq!(
        after.notifications,
        vec!["“Join the waitlist” clicked", "“Get started” clicked"]
    );
    Ok(())
}

#[test]
fn test_notifications_keep_three_most_recent_and_expire() -> Result<()> {
    let spec = one_screen(vec![
        Component::new(ComponentKind::Cta).with_actions(vec![
            "A".to_string(),
            "B".to_string(),
            "C".to_string(),
            "D".to_string(),
        ]),
    ]);
    let mut runtime = ClientRuntime::load(&spec)?;
    for label in ["A", "B", "C"] {
        runtime.click(label)?;
    }
    let after = runtime.click("D")?;
    assert_eq!(
        after.notifications,
        vec!["“D” clicked", "“C” clicked", "“B” clicked"]
    );

    // Every notification schedules its own dismissal.
    let delays: Vec<u64> = serde_json::from_str(&runtime.run("JSON.stringify(__runTimers())")?)?;
    assert_eq!(delays, vec![4000; 4]);
    assert!(runtime.snapshot()?.notifications.is_empty());
    Ok(())
}

#[test]
fn test_form_renders_every_action_and_keeps_values() -> Result<()> {
    let spec = one_screen(vec![
        Component::new(ComponentKind::Form)
            .with_title("Income")
            .with_fields(vec!["Monthly income".to_string()])
            .with_actions(vec![
                "Submit".to_string(),
                "Cancel".to_string(),
                "Share".to_string(),
            ]),
    ]);
    let mut runtime = ClientRuntime::load(&spec)?;
    assert_eq!(runtime.snapshot()?.buttons, vec!["Submit", "Cancel", "Share"]);

    runtime.run(r#"__fill("Monthly income", "1200")"#)?;
    let after = runtime.click("Submit")?;
    assert_eq!(after.inputs, vec!["1200"]);
    assert_eq!(after.notifications.len(), 1);
    assert!(after.notifications[0].contains("“Submit”"));

    let after = runtime.click("Share")?;
    assert_eq!(after.notifications[0], "“Share” clicked");
    assert_eq!(after.inputs, vec!["1200"]);
    Ok(())
}

#[test]
fn test_list_add_item_prompts_and_rerenders() -> Result<()> {
    let spec = one_screen(vec![
        Component::new(ComponentKind::List).with_sample_items(vec!["Coffee".to_string()]),
    ]);
    let mut runtime = ClientRuntime::load(&spec)?;

    runtime.run(r#"__promptReply = "  Rent ""#)?;
    let after = runtime.click("Add item")?;
    assert_eq!(after.list_items, vec!["Coffee", "Rent"]);
    assert_eq!(after.notifications, vec!["Added “Rent”"]);

    // A cancelled prompt changes nothing.
    runtime.run("__promptReply = null")?;
    let after = runtime.click("Add item")?;
    assert_eq!(after.list_items, vec!["Coffee", "Rent"]);
    assert_eq!(after.notifications.len(), 1);
    Ok(())
}

#[test]
fn test_stats_render_sample_items_as_tiles() -> Result<()> {
    let spec = one_screen(vec![
        Component::new(ComponentKind::Stats)
            .with_sample_items(vec!["Spent this week".to_string(), "Saved".to_string()]),
    ]);
    let mut runtime = ClientRuntime::load(&spec)?;
    let snapshot = runtime.snapshot()?;
    assert_eq!(snapshot.stat_tiles, vec!["Spent this week", "Saved"]);
    assert!(snapshot.buttons.is_empty());
    Ok(())
}
