use anyhow::Result;
use async_trait::async_trait;
use protoforge_engine::agents::{ChatMessage, CompletionClient, ResponseFormat};
use protoforge_engine::config::GenerationConfig;
use protoforge_engine::fallback::synthesize;
use protoforge_engine::logging::GenerationLogger;
use protoforge_engine::orchestrator::{FallbackReason, GenerationSource, Orchestrator};
use protoforge_engine::project::ProjectContext;
use protoforge_engine::store::FsBundleStore;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tempfile::tempdir;

/// Queue-backed backend that records every prompt it receives.
#[derive(Clone, Default)]
struct QueueClient {
    responses: Arc<Mutex<VecDeque<Result<String, String>>>>,
    prompts: Arc<Mutex<Vec<(String, Vec<ChatMessage>)>>>,
}

impl QueueClient {
    fn push(&self, response: Result<&str, &str>) {
        self.responses
            .lock()
            .unwrap()
            .push_back(response.map(str::to_string).map_err(str::to_string));
    }
}

#[async_trait]
impl CompletionClient for QueueClient {
    fn name(&self) -> &str {
        "queue"
    }

    async fn complete(
        &self,
        model: &str,
        messages: &[ChatMessage],
        _format: ResponseFormat,
    ) -> Result<String> {
        self.prompts
            .lock()
            .unwrap()
            .push((model.to_string(), messages.to_vec()));
        match self.responses.lock().unwrap().pop_front() {
            Some(Ok(text)) => Ok(text),
            Some(Err(e)) => Err(anyhow::anyhow!(e)),
            None => Err(anyhow::anyhow!("queue empty")),
        }
    }
}

fn project() -> ProjectContext {
    ProjectContext::new("Budget Buddy")
        .with_summary("Personal finance for students")
        .with_goals(vec!["Track spending".into(), "Build a savings habit".into()])
        .with_north_star("Monthly savings rate")
        .with_phase("discovery")
}

fn config() -> GenerationConfig {
    GenerationConfig {
        default_models: vec!["primary".into(), "secondary".into()],
        ..GenerationConfig::default()
    }
}

#[tokio::test]
async fn test_generate_compile_and_publish() -> Result<()> {
    // 1. The first candidate fails, the second answers with a loose payload
    let client = QueueClient::default();
    client.push(Err("503 Service Unavailable"));
    client.push(Ok(r#"Sure! ```json
{
  "assistantMessage": "Focus areas:\n1. Budget setup\n2. Weekly check-in",
  "prototypeSpec": {
    "title": "Budget Buddy",
    "pages": [
      { "title": "Setup", "sections": [{ "type": "form", "fields": ["Income", "Rent"], "primaryActions": ["Save"] }] },
      { "title": "Check-in", "widgets": [{ "type": "stats", "sampleItems": ["Spent", "Saved"] }] }
    ]
  }
}
```"#));

    let tmp = tempdir()?;
    let logger = GenerationLogger::new(tmp.path()).await?;
    let orchestrator = Orchestrator::new(Some(client.clone()), config()).with_logger(logger);

    // 2. Generate with prior conversation
    let history = vec![
        ChatMessage::user("I want a budgeting app"),
        ChatMessage::assistant("Great, tell me more"),
    ];
    let outcome = orchestrator
        .generate(&project(), &history, Some("Focus on onboarding"))
        .await;

    assert_eq!(
        outcome.source,
        GenerationSource::Model {
            candidate: "secondary".into()
        }
    );
    assert_eq!(outcome.attempts.len(), 2);
    let names: Vec<&str> = outcome.spec.key_screens.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["Setup", "Check-in"]);
    assert_eq!(
        outcome.spec.key_screens[0].components[0].actions,
        vec!["Save".to_string()]
    );
    assert_eq!(
        outcome.spec.metadata.as_ref().unwrap()["assistant_metrics"],
        serde_json::json!(["Budget setup", "Weekly check-in"])
    );

    // 3. The prompt carried history and the new request, to both candidates
    let prompts = client.prompts.lock().unwrap().clone();
    assert_eq!(prompts.len(), 2);
    assert_eq!(prompts[0].0, "primary");
    assert_eq!(prompts[1].0, "secondary");
    let last_prompt = &prompts[1].1;
    assert!(last_prompt.iter().any(|m| m.content == "I want a budgeting app"));
    assert_eq!(last_prompt.last().unwrap().content, "Focus on onboarding");

    // 4. Publish and republish
    let store = FsBundleStore::new(tmp.path().join("out"), "/prototypes");
    let published = store.publish("student-7", &outcome.spec).await?;
    assert_eq!(published.slug, "budget-buddy");
    assert_eq!(
        published.public_url,
        "/prototypes/student-7/budget-buddy/index.html"
    );
    let markup = std::fs::read_to_string(published.path.join("index.html"))?;
    assert!(markup.contains("component component--form"));
    assert!(markup.contains("component component--stats"));

    let again = store.publish("student-7", &outcome.spec).await?;
    assert!(again.reused);

    // 5. Every step was logged
    let log = std::fs::read_to_string(tmp.path().join("logs/generation.jsonl"))?;
    assert!(log.contains("\"attempt_failed\""));
    assert!(log.contains("\"normalization_result\""));
    assert!(log.contains("\"generation_end\""));

    Ok(())
}

#[tokio::test]
async fn test_null_response_falls_back_to_synthesizer() -> Result<()> {
    let client = QueueClient::default();
    client.push(Ok("null"));

    let orchestrator = Orchestrator::new(Some(client), config());
    let outcome = orchestrator.generate(&project(), &[], None).await;

    assert_eq!(
        outcome.source,
        GenerationSource::Fallback {
            reason: FallbackReason::NormalizationFailed {
                candidate: "primary".into()
            }
        }
    );
    assert!(outcome.spec.is_fallback());
    assert_eq!(outcome.spec.key_screens.len(), 4);
    outcome.spec.validate()?;
    Ok(())
}

#[tokio::test]
async fn test_missing_backend_matches_synthesizer_output() -> Result<()> {
    let orchestrator: Orchestrator<QueueClient> = Orchestrator::new(None, config());
    let outcome = orchestrator.generate(&project(), &[], None).await;

    assert!(outcome.used_fallback());
    assert_eq!(outcome.spec, synthesize(&project(), None, Some("discovery")));
    assert!(!outcome.assistant_message.is_empty());
    Ok(())
}

#[test]
fn test_synthesizer_is_deterministic_and_valid() {
    let a = synthesize(&project(), Some("Onboarding"), Some("beta"));
    let b = synthesize(&project(), Some("Onboarding"), Some("beta"));
    assert_eq!(a, b);
    assert!(a.validate().is_ok());

    let empty = synthesize(&ProjectContext::default(), Some("  "), None);
    assert!(empty.validate().is_ok());
    assert_eq!(empty.key_screens.len(), 4);
}
