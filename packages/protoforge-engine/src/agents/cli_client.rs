use super::{ChatMessage, CompletionClient, ResponseFormat, Role};
use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

/// Generation backend that shells out to an AI CLI (default: gemini).
///
/// The conversation is flattened into a single prompt passed with `-p`; the
/// candidate model is forwarded with `--model`.
#[derive(Clone)]
pub struct ShellCliClient {
    pub executable: String,
    pub work_dir: Option<String>,
    pub extra_args: Vec<String>,
}

impl ShellCliClient {
    pub fn new(executable: &str) -> Self {
        Self {
            executable: executable.to_string(),
            work_dir: None,
            extra_args: Vec::new(),
        }
    }

    pub fn with_work_dir(mut self, work_dir: String) -> Self {
        self.work_dir = Some(work_dir);
        self
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.extra_args = args;
        self
    }
}

/// Renders the conversation as labelled plain-text sections.
pub fn flatten_messages(messages: &[ChatMessage], format: ResponseFormat) -> String {
    let mut prompt = messages
        .iter()
        .map(|m| {
            let label = match m.role {
                Role::System => "SYSTEM",
                Role::User => "USER",
                Role::Assistant => "ASSISTANT",
            };
            format!("### {}\n{}", label, m.content)
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    if format == ResponseFormat::Json {
        prompt.push_str("\n\nRespond with a single JSON object and nothing else.");
    }
    prompt
}

#[async_trait]
impl CompletionClient for ShellCliClient {
    fn name(&self) -> &str {
        &self.executable
    }

    async fn complete(
        &self,
        model: &str,
        messages: &[ChatMessage],
        format: ResponseFormat,
    ) -> Result<String> {
        let prompt = flatten_messages(messages, format);

        let mut cmd = Command::new(&self.executable);
        cmd.arg("-p").arg(&prompt);
        if !model.is_empty() {
            cmd.arg("--model").arg(model);
        }
        cmd.args(&self.extra_args);
        if let Some(ref wd) = self.work_dir {
            cmd.current_dir(wd);
        }

        let output = cmd
            .output()
            .await
            .with_context(|| format!("Failed to run {}", self.executable))?;

        if !output.status.success() {
            return Err(anyhow::anyhow!(
                "AI CLI failed: {}",
                String::from_utf8_lossy(&output.stderr)
            ));
        }

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        debug!("Model output ({} bytes) from {}", stdout.len(), self.executable);
        Ok(stdout)
    }
}
