use crate::agents::{ChatMessage, CompletionClient, ResponseFormat, clean_response};
use crate::config::GenerationConfig;
use crate::fallback;
use crate::logging::GenerationLogger;
use crate::normalize::{NormalizeContext, normalize};
use crate::project::ProjectContext;
use crate::schema::Specification;
use anyhow::Result;
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

const SYSTEM_PROMPT: &str = r#"You are a product prototyping assistant. You design small, clickable web prototypes.

Reply with ONE JSON object of the form:
{
  "assistant_message": string (a short note to the user; bullet points allowed),
  "prototype_spec": {
    "title": string,
    "summary": string,
    "goal": string,
    "success_metrics": string[],
    "key_screens": [
      {
        "name": string,
        "goal": string,
        "primary_actions": string[],
        "layout_notes": string,
        "components": [
          {
            "kind": "hero" | "form" | "list" | "cta" | "stats" | "custom" | "navigation" | "modal" | "note",
            "title": string,
            "description": string,
            "fields": string[] (form only),
            "actions": string[],
            "sample_items": string[] (list and stats only)
          }
        ]
      }
    ],
    "user_flow": string[],
    "visual_style": string,
    "call_to_action": string
  }
}

Use between two and five key screens. Do not wrap the JSON in prose."#;

const DEFAULT_REQUEST: &str = "Draft the first clickable prototype for this project.";

/// Why generation ended on the deterministic synthesizer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum FallbackReason {
    NoClient,
    CandidatesExhausted,
    NormalizationFailed { candidate: String },
    ValidationFailed { candidate: String, error: String },
}

impl std::fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FallbackReason::NoClient => write!(f, "no generation backend available"),
            FallbackReason::CandidatesExhausted => write!(f, "every candidate model failed"),
            FallbackReason::NormalizationFailed { candidate } => {
                write!(f, "response from {} could not be normalized", candidate)
            }
            FallbackReason::ValidationFailed { candidate, error } => {
                write!(f, "response from {} failed validation: {}", candidate, error)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GenerationSource {
    Model { candidate: String },
    Fallback { reason: FallbackReason },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum AttemptOutcome {
    BackendError(String),
    InvalidJson(String),
    Accepted,
    NormalizationFailed,
    ValidationFailed(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttemptRecord {
    pub candidate: String,
    pub outcome: AttemptOutcome,
}

#[derive(Debug, Clone)]
pub struct GenerationOutcome {
    pub spec: Specification,
    pub assistant_message: String,
    pub source: GenerationSource,
    pub attempts: Vec<AttemptRecord>,
}

impl GenerationOutcome {
    pub fn used_fallback(&self) -> bool {
        matches!(self.source, GenerationSource::Fallback { .. })
    }
}

/// Generation states. Transitions only move forward through the candidate
/// list; `Fallback` and `Success` are terminal.
#[derive(Debug)]
enum State {
    NoClient,
    TryCandidate(usize),
    Normalize { candidate: String, payload: Value },
    Fallback(FallbackReason),
    Success { candidate: String, spec: Specification, message: String },
}

/// Drives generation attempts against a backend, falling back to the
/// deterministic synthesizer when no candidate produces a valid prototype.
pub struct Orchestrator<C: CompletionClient> {
    client: Option<C>,
    config: GenerationConfig,
    logger: Option<GenerationLogger>,
}

impl<C: CompletionClient> Orchestrator<C> {
    /// `client` is `None` when the backend could not be constructed (for
    /// example missing credentials); every request then falls back.
    pub fn new(client: Option<C>, config: GenerationConfig) -> Self {
        Self {
            client,
            config,
            logger: None,
        }
    }

    pub fn with_logger(mut self, logger: GenerationLogger) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }

    pub async fn generate(
        &self,
        project: &ProjectContext,
        history: &[ChatMessage],
        new_prompt: Option<&str>,
    ) -> GenerationOutcome {
        let candidates = self.config.candidate_models();
        let messages = build_messages(project, history, new_prompt);
        let focus = focus_of(project, new_prompt);
        let mut attempts: Vec<AttemptRecord> = Vec::new();

        info!(
            "Generating prototype for '{}' with {} candidate(s)",
            project.title,
            candidates.len()
        );
        if let Some(logger) = &self.logger {
            quiet(logger.log_generation_start(&project.title, &candidates).await);
        }

        let mut state = if self.client.is_some() {
            State::TryCandidate(0)
        } else {
            State::NoClient
        };

        loop {
            state = match state {
                State::NoClient => {
                    warn!("No generation backend configured");
                    State::Fallback(FallbackReason::NoClient)
                }
                State::TryCandidate(index) => match (&self.client, candidates.get(index)) {
                    (Some(client), Some(candidate)) => {
                        match self.attempt(client, candidate, index, &messages).await {
                            Ok(payload) => State::Normalize {
                                candidate: candidate.clone(),
                                payload,
                            },
                            Err(outcome) => {
                                attempts.push(AttemptRecord {
                                    candidate: candidate.clone(),
                                    outcome,
                                });
                                State::TryCandidate(index + 1)
                            }
                        }
                    }
                    _ => State::Fallback(FallbackReason::CandidatesExhausted),
                },
                State::Normalize { candidate, payload } => {
                    let message = assistant_message(&payload);
                    let ctx = normalize_context(project, focus.as_deref(), message.as_deref());
                    let normalized = normalize(&payload, &ctx);
                    if let Some(logger) = &self.logger {
                        quiet(
                            logger
                                .log_normalization(
                                    &candidate,
                                    normalized.as_ref().map(|s| s.key_screens.len()),
                                )
                                .await,
                        );
                    }

                    match normalized {
                        None => {
                            attempts.push(AttemptRecord {
                                candidate: candidate.clone(),
                                outcome: AttemptOutcome::NormalizationFailed,
                            });
                            State::Fallback(FallbackReason::NormalizationFailed { candidate })
                        }
                        Some(spec) => {
                            let validation = spec.validate();
                            if let Some(logger) = &self.logger {
                                let error = validation.as_ref().err().map(|e| e.to_string());
                                quiet(
                                    logger
                                        .log_validation(
                                            &candidate,
                                            validation.is_ok(),
                                            error.as_deref(),
                                        )
                                        .await,
                                );
                            }
                            match validation {
                                Ok(()) => {
                                    attempts.push(AttemptRecord {
                                        candidate: candidate.clone(),
                                        outcome: AttemptOutcome::Accepted,
                                    });
                                    let message =
                                        message.unwrap_or_else(|| default_message(&spec));
                                    State::Success {
                                        candidate,
                                        spec,
                                        message,
                                    }
                                }
                                Err(e) => {
                                    attempts.push(AttemptRecord {
                                        candidate: candidate.clone(),
                                        outcome: AttemptOutcome::ValidationFailed(e.to_string()),
                                    });
                                    State::Fallback(FallbackReason::ValidationFailed {
                                        candidate,
                                        error: e.to_string(),
                                    })
                                }
                            }
                        }
                    }
                }
                State::Fallback(reason) => {
                    return self.fall_back(project, focus.as_deref(), reason, attempts).await;
                }
                State::Success {
                    candidate,
                    spec,
                    message,
                } => {
                    info!(
                        "Candidate {} produced {} screen(s)",
                        candidate,
                        spec.key_screens.len()
                    );
                    if let Some(logger) = &self.logger {
                        quiet(
                            logger
                                .log_generation_end(&candidate, spec.key_screens.len())
                                .await,
                        );
                    }
                    return GenerationOutcome {
                        spec,
                        assistant_message: message,
                        source: GenerationSource::Model { candidate },
                        attempts,
                    };
                }
            };
        }
    }

    /// One backend call. Returns the parsed JSON payload, or the reason the
    /// attempt failed structurally.
    async fn attempt(
        &self,
        client: &C,
        candidate: &str,
        index: usize,
        messages: &[ChatMessage],
    ) -> Result<Value, AttemptOutcome> {
        info!("Attempt {} with {} via {}", index + 1, candidate, client.name());
        if let Some(logger) = &self.logger {
            quiet(logger.log_attempt_started(candidate, index + 1).await);
        }

        let outcome = match client.complete(candidate, messages, ResponseFormat::Json).await {
            Ok(text) => {
                if let Some(logger) = &self.logger {
                    quiet(logger.log_response_received(candidate, &text).await);
                }
                parse_payload(&text).map_err(AttemptOutcome::InvalidJson)
            }
            Err(e) => Err(AttemptOutcome::BackendError(e.to_string())),
        };

        if let Err(failure) = &outcome {
            let reason = match failure {
                AttemptOutcome::BackendError(e) => format!("backend error: {}", e),
                AttemptOutcome::InvalidJson(e) => format!("invalid JSON: {}", e),
                other => format!("{:?}", other),
            };
            warn!("Candidate {} failed: {}", candidate, reason);
            if let Some(logger) = &self.logger {
                quiet(logger.log_attempt_failed(candidate, &reason).await);
            }
        }
        outcome
    }

    async fn fall_back(
        &self,
        project: &ProjectContext,
        focus: Option<&str>,
        reason: FallbackReason,
        attempts: Vec<AttemptRecord>,
    ) -> GenerationOutcome {
        warn!("Falling back to synthesized prototype: {}", reason);
        let spec = fallback::synthesize(project, focus, project.phase.as_deref());
        if let Some(logger) = &self.logger {
            quiet(logger.log_fallback(&reason.to_string()).await);
            quiet(
                logger
                    .log_generation_end("fallback", spec.key_screens.len())
                    .await,
            );
        }

        let assistant_message = format!(
            "I couldn't reach the design model, so I drafted a {}-screen prototype for {} from your project goals. \
             Ask me to refine any screen.",
            spec.key_screens.len(),
            spec.title
        );
        GenerationOutcome {
            spec,
            assistant_message,
            source: GenerationSource::Fallback { reason },
            attempts,
        }
    }
}

fn quiet(result: Result<()>) {
    if let Err(e) = result {
        warn!("Failed to write generation log: {}", e);
    }
}

/// Parses model text (optionally fenced in a code block) as JSON.
pub fn parse_payload(text: &str) -> Result<Value, String> {
    let cleaned = clean_response(text);
    serde_json::from_str::<Value>(&cleaned).map_err(|e| e.to_string())
}

fn focus_of(project: &ProjectContext, new_prompt: Option<&str>) -> Option<String> {
    project
        .focus
        .as_deref()
        .or(new_prompt)
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .map(str::to_string)
}

fn assistant_message(payload: &Value) -> Option<String> {
    let map = payload.as_object()?;
    ["assistant_message", "assistantMessage", "message", "reply"]
        .iter()
        .find_map(|key| map.get(*key).and_then(Value::as_str))
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(str::to_string)
}

fn default_message(spec: &Specification) -> String {
    format!(
        "Here is a {}-screen prototype for {}.",
        spec.key_screens.len(),
        spec.title
    )
}

fn normalize_context(
    project: &ProjectContext,
    focus: Option<&str>,
    notes: Option<&str>,
) -> NormalizeContext {
    let mut ctx = NormalizeContext::new(project.title.clone(), project.summary_or_goals());
    if let Some(goal) = project.meaningful_goals().first() {
        ctx = ctx.with_goal(*goal);
    }
    if let Some(focus) = focus {
        ctx = ctx.with_focus(focus);
    }
    if let Some(notes) = notes {
        ctx = ctx.with_notes(notes);
    }
    ctx
}

/// System instructions, a project brief, the prior conversation, then the
/// new request.
pub fn build_messages(
    project: &ProjectContext,
    history: &[ChatMessage],
    new_prompt: Option<&str>,
) -> Vec<ChatMessage> {
    let mut brief = format!("Project: {}", project.title);
    if let Some(summary) = project.summary.as_deref().filter(|s| !s.trim().is_empty()) {
        brief.push_str(&format!("\nSummary: {}", summary));
    }
    let goals = project.meaningful_goals();
    if !goals.is_empty() {
        brief.push_str("\nGoals:");
        for goal in goals {
            brief.push_str(&format!("\n- {}", goal));
        }
    }
    if let Some(metric) = &project.north_star_metric {
        brief.push_str(&format!("\nNorth star metric: {}", metric));
    }
    if let Some(phase) = &project.phase {
        brief.push_str(&format!("\nPhase: {}", phase));
    }
    if let Some(focus) = &project.focus {
        brief.push_str(&format!("\nFocus: {}", focus));
    }

    let mut messages = vec![ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(brief)];
    messages.extend(history.iter().cloned());
    let request = new_prompt
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .unwrap_or(DEFAULT_REQUEST);
    messages.push(ChatMessage::user(request));
    messages
}
