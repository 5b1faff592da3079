use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

/// Structured log event types for generation traceability.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum LogEventType {
    GenerationStart,
    AttemptStarted,
    AttemptFailed,
    ResponseReceived,
    NormalizationResult,
    ValidationResult,
    FallbackUsed,
    GenerationEnd,
    BundlePublished,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

/// A single structured log entry, serialized as one JSON line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEvent {
    pub timestamp: String,
    pub event_type: LogEventType,
    pub level: LogLevel,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl LogEvent {
    pub fn new(
        event_type: LogEventType,
        level: LogLevel,
        message: impl Into<String>,
        details: Option<serde_json::Value>,
    ) -> Self {
        Self {
            timestamp: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            event_type,
            level,
            message: message.into(),
            details,
        }
    }

    pub fn info_with_details(
        event_type: LogEventType,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self::new(event_type, LogLevel::Info, message, Some(details))
    }

    pub fn debug_with_details(
        event_type: LogEventType,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self::new(event_type, LogLevel::Debug, message, Some(details))
    }

    pub fn warn_with_details(
        event_type: LogEventType,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self::new(event_type, LogLevel::Warn, message, Some(details))
    }
}

/// Append-only JSONL log of generation runs, one file per log directory
/// (`<dir>/logs/generation.jsonl`).
#[derive(Debug, Clone)]
pub struct GenerationLogger {
    log_file_path: PathBuf,
}

impl GenerationLogger {
    /// Creates the `logs/` subdirectory if it doesn't exist.
    pub async fn new(dir: &Path) -> Result<Self> {
        let logs_dir = dir.join("logs");
        tokio::fs::create_dir_all(&logs_dir)
            .await
            .context("Failed to create logs directory")?;

        let log_file_path = logs_dir.join("generation.jsonl");

        Ok(Self { log_file_path })
    }

    /// Appends a log event as a JSON line.
    /// Each call opens/appends/flushes for crash safety.
    pub async fn log(&self, event: LogEvent) -> Result<()> {
        let mut line = serde_json::to_string(&event).context("Failed to serialize log event")?;
        line.push('\n');

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_file_path)
            .await
            .context("Failed to open log file")?;

        file.write_all(line.as_bytes()).await?;
        file.flush().await?;

        Ok(())
    }

    pub async fn log_generation_start(&self, project: &str, candidates: &[String]) -> Result<()> {
        self.log(LogEvent::info_with_details(
            LogEventType::GenerationStart,
            format!("Generating prototype for {}", project),
            serde_json::json!({
                "project": project,
                "candidates": candidates,
            }),
        ))
        .await
    }

    pub async fn log_attempt_started(&self, candidate: &str, attempt: usize) -> Result<()> {
        self.log(LogEvent::info_with_details(
            LogEventType::AttemptStarted,
            format!("Attempt {} with {}", attempt, candidate),
            serde_json::json!({ "candidate": candidate, "attempt": attempt }),
        ))
        .await
    }

    pub async fn log_attempt_failed(&self, candidate: &str, reason: &str) -> Result<()> {
        self.log(LogEvent::warn_with_details(
            LogEventType::AttemptFailed,
            format!("Candidate {} failed", candidate),
            serde_json::json!({ "candidate": candidate, "reason": reason }),
        ))
        .await
    }

    /// Logs the raw model text at debug level.
    pub async fn log_response_received(&self, candidate: &str, response: &str) -> Result<()> {
        self.log(LogEvent::debug_with_details(
            LogEventType::ResponseReceived,
            format!("Response from {}", candidate),
            serde_json::json!({
                "candidate": candidate,
                "response": response,
                "response_length": response.len(),
            }),
        ))
        .await
    }

    pub async fn log_normalization(&self, candidate: &str, screens: Option<usize>) -> Result<()> {
        let (level, msg) = match screens {
            Some(n) => (LogLevel::Info, format!("Normalized {} screen(s)", n)),
            None => (LogLevel::Warn, "Normalization produced nothing".to_string()),
        };
        self.log(LogEvent::new(
            LogEventType::NormalizationResult,
            level,
            msg,
            Some(serde_json::json!({ "candidate": candidate, "screens": screens })),
        ))
        .await
    }

    pub async fn log_validation(
        &self,
        candidate: &str,
        passed: bool,
        error: Option<&str>,
    ) -> Result<()> {
        let (level, msg) = if passed {
            (LogLevel::Info, format!("Validation passed for {}", candidate))
        } else {
            (LogLevel::Warn, format!("Validation failed for {}", candidate))
        };
        self.log(LogEvent::new(
            LogEventType::ValidationResult,
            level,
            msg,
            Some(serde_json::json!({
                "candidate": candidate,
                "passed": passed,
                "error": error,
            })),
        ))
        .await
    }

    pub async fn log_fallback(&self, reason: &str) -> Result<()> {
        self.log(LogEvent::warn_with_details(
            LogEventType::FallbackUsed,
            "Using deterministic fallback",
            serde_json::json!({ "reason": reason }),
        ))
        .await
    }

    pub async fn log_generation_end(&self, source: &str, screens: usize) -> Result<()> {
        self.log(LogEvent::info_with_details(
            LogEventType::GenerationEnd,
            format!("Generation finished via {}", source),
            serde_json::json!({ "source": source, "screens": screens }),
        ))
        .await
    }

    pub async fn log_bundle_published(&self, slug: &str, url: &str, reused: bool) -> Result<()> {
        self.log(LogEvent::info_with_details(
            LogEventType::BundlePublished,
            format!("Published {} to {}", slug, url),
            serde_json::json!({ "slug": slug, "url": url, "reused": reused }),
        ))
        .await
    }

    pub async fn log_error(&self, message: &str, details: Option<&str>) -> Result<()> {
        self.log(LogEvent::new(
            LogEventType::Error,
            LogLevel::Error,
            message,
            details.map(|d| serde_json::json!({ "error": d })),
        ))
        .await
    }

    pub fn log_file_path(&self) -> &Path {
        &self.log_file_path
    }
}
