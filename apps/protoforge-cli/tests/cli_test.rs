use anyhow::Result;
use async_trait::async_trait;
use clap::Parser;
use protoforge_cli::{
    Cli, Command, CompileArgs, GenerateArgs, NormalizeArgs, ProjectArgs, apply_overrides,
    run_compile, run_delete, run_fallback, run_generate, run_normalize,
};
use protoforge_engine::agents::{ChatMessage, CompletionClient, ResponseFormat};
use protoforge_engine::config::GenerationConfig;
use protoforge_engine::orchestrator::GenerationSource;
use std::sync::{Arc, Mutex};
use tempfile::tempdir;

struct FixedClient {
    reply: String,
    seen: Arc<Mutex<Vec<usize>>>,
}

#[async_trait]
impl CompletionClient for FixedClient {
    fn name(&self) -> &str {
        "fixed"
    }

    async fn complete(
        &self,
        _model: &str,
        messages: &[ChatMessage],
        _format: ResponseFormat,
    ) -> Result<String> {
        self.seen.lock().unwrap().push(messages.len());
        Ok(self.reply.clone())
    }
}

fn config_in(dir: &std::path::Path) -> GenerationConfig {
    GenerationConfig {
        output_dir: dir.join("out").to_string_lossy().to_string(),
        log_dir: Some(dir.to_string_lossy().to_string()),
        ..GenerationConfig::default()
    }
}

fn project() -> ProjectArgs {
    ProjectArgs {
        title: "Budget Buddy".to_string(),
        goals: vec!["Track spending".to_string()],
        ..ProjectArgs::default()
    }
}

#[test]
fn test_parse_generate_command() {
    let cli = Cli::parse_from([
        "protoforge",
        "--debug",
        "--output-dir",
        "/tmp/protos",
        "generate",
        "--title",
        "Budget Buddy",
        "--goal",
        "Track spending",
        "--goal",
        "Save more",
        "--prompt",
        "Focus on onboarding",
    ]);
    assert!(cli.debug);
    match &cli.command {
        Command::Generate(args) => {
            assert_eq!(args.project.goals.len(), 2);
            assert_eq!(args.owner, "local");
            assert_eq!(args.prompt.as_deref(), Some("Focus on onboarding"));
        }
        other => panic!("unexpected command {:?}", other),
    }
    let config = apply_overrides(GenerationConfig::default(), &cli);
    assert_eq!(config.output_dir, "/tmp/protos");
}

#[tokio::test]
async fn test_generate_writes_spec_and_bundle() -> Result<()> {
    let tmp = tempdir()?;
    let config = config_in(tmp.path());

    let history_path = tmp.path().join("history.json");
    std::fs::write(
        &history_path,
        r#"[{"role": "user", "content": "Hi"}, {"role": "assistant", "content": "Hello"}]"#,
    )?;

    let seen = Arc::new(Mutex::new(Vec::new()));
    let client = FixedClient {
        reply: r#"{"assistant_message": "Done", "prototype_spec": {"title": "Budget Buddy", "key_screens": [{"name": "Home", "components": [{"kind": "hero"}]}]}}"#.to_string(),
        seen: seen.clone(),
    };
    let args = GenerateArgs {
        project: project(),
        prompt: Some("Make it friendly".to_string()),
        history: Some(history_path),
        owner: "team-a".to_string(),
    };

    let report = run_generate(&config, Some(client), &args).await?;
    assert!(matches!(report.outcome.source, GenerationSource::Model { .. }));
    assert_eq!(report.outcome.assistant_message, "Done");
    // system + brief + two history turns + request
    assert_eq!(seen.lock().unwrap().as_slice(), &[5]);

    assert!(report.spec_path.exists());
    assert!(report.published.path.join("index.html").exists());
    assert_eq!(
        report.published.public_url,
        "/prototypes/team-a/budget-buddy/index.html"
    );

    let log = std::fs::read_to_string(tmp.path().join("logs/generation.jsonl"))?;
    assert!(log.contains("bundle_published"));

    assert!(run_delete(&config, "team-a").await?);
    assert!(!report.published.path.exists());
    Ok(())
}

#[tokio::test]
async fn test_generate_without_backend_uses_fallback() -> Result<()> {
    let tmp = tempdir()?;
    let config = config_in(tmp.path());
    let args = GenerateArgs {
        project: project(),
        prompt: None,
        history: None,
        owner: "local".to_string(),
    };

    let report = run_generate::<FixedClient>(&config, None, &args).await?;
    assert!(report.outcome.used_fallback());
    assert!(report.outcome.spec.is_fallback());
    assert!(report.published.path.join("app.js").exists());
    Ok(())
}

#[tokio::test]
async fn test_normalize_file() -> Result<()> {
    let tmp = tempdir()?;
    let good = tmp.path().join("raw.json");
    std::fs::write(&good, r#"{"webpages": [{"name": "Home", "sections": [{"type": "hero"}]}]}"#)?;
    let spec = run_normalize(&NormalizeArgs {
        file: good,
        title: "Budget Buddy".to_string(),
        summary: String::new(),
        goal: None,
        focus: None,
        notes: None,
    })
    .await?
    .expect("object input normalizes");
    assert_eq!(spec.title, "Budget Buddy");
    assert_eq!(spec.key_screens[0].name, "Home");

    let bad = tmp.path().join("bad.json");
    std::fs::write(&bad, "[1, 2, 3]")?;
    let result = run_normalize(&NormalizeArgs {
        file: bad,
        title: String::new(),
        summary: String::new(),
        goal: None,
        focus: None,
        notes: None,
    })
    .await?;
    assert!(result.is_none());
    Ok(())
}

#[tokio::test]
async fn test_normalize_passes_goal_and_focus() -> Result<()> {
    let tmp = tempdir()?;
    let raw = tmp.path().join("raw.json");
    std::fs::write(&raw, r#"{"summary": "Split bills with roommates"}"#)?;

    let cli = Cli::parse_from([
        "protoforge",
        "normalize",
        raw.to_str().unwrap(),
        "--title",
        "Budget Buddy",
        "--goal",
        "Settle up monthly",
        "--focus",
        "Shared expenses",
    ]);
    let Command::Normalize(args) = &cli.command else {
        panic!("unexpected command {:?}", cli.command);
    };

    let spec = run_normalize(args).await?.expect("object input normalizes");
    assert_eq!(spec.goal.as_deref(), Some("Settle up monthly"));
    assert_eq!(spec.key_screens.len(), 1);
    assert_eq!(spec.key_screens[0].name, "Shared expenses");
    Ok(())
}

#[tokio::test]
async fn test_compile_validates_before_publishing() -> Result<()> {
    let tmp = tempdir()?;
    let config = config_in(tmp.path());

    let spec_path = tmp.path().join("spec.json");
    std::fs::write(&spec_path, serde_json::to_string(&run_fallback(&project()))?)?;
    let published = run_compile(
        &config,
        &CompileArgs {
            spec: spec_path.clone(),
            owner: "local".to_string(),
        },
    )
    .await?;
    assert!(!published.reused);

    let invalid = tmp.path().join("invalid.json");
    std::fs::write(&invalid, r#"{"title": "X", "summary": "", "key_screens": []}"#)?;
    let result = run_compile(
        &config,
        &CompileArgs {
            spec: invalid,
            owner: "local".to_string(),
        },
    )
    .await;
    assert!(result.is_err());
    Ok(())
}

#[tokio::test]
async fn test_failed_publish_is_logged_as_error() -> Result<()> {
    let tmp = tempdir()?;
    let config = config_in(tmp.path());

    let spec_path = tmp.path().join("spec.json");
    std::fs::write(&spec_path, serde_json::to_string(&run_fallback(&project()))?)?;
    let result = run_compile(
        &config,
        &CompileArgs {
            spec: spec_path,
            owner: "../escape".to_string(),
        },
    )
    .await;
    assert!(result.is_err());

    let log = std::fs::read_to_string(tmp.path().join("logs/generation.jsonl"))?;
    let event: serde_json::Value = serde_json::from_str(log.trim())?;
    assert_eq!(event["event_type"], "error");
    assert_eq!(event["level"], "error");
    assert!(event["message"].as_str().unwrap().contains("../escape"));
    Ok(())
}

#[test]
fn test_fallback_command_is_deterministic() {
    let args = ProjectArgs {
        focus: Some("Onboarding".to_string()),
        phase: Some("beta".to_string()),
        ..project()
    };
    let spec = run_fallback(&args);
    assert_eq!(spec, run_fallback(&args));
    assert_eq!(spec.key_screens[1].name, "Onboarding");
    assert!(spec.is_fallback());
}
