use crate::agents::CompletionClient;
use crate::agents::cli_client::ShellCliClient;
use crate::agents::http_client::{DEFAULT_BASE_URL, HttpCompletionClient};
use anyhow::{Context, Result};
use jsonschema::JSONSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use std::time::Duration;
use tokio::fs;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Http,
    Cli,
}

/// Everything the orchestrator and the bundle store need at call time.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct GenerationConfig {
    #[serde(default)]
    pub backend: BackendKind,
    /// Tried before `default_models` when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_override: Option<String>,
    #[serde(default = "default_models")]
    pub default_models: Vec<String>,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Never written back to disk.
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_temperature")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_cli_executable")]
    pub cli_executable: String,
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<String>,
}

pub fn default_models() -> Vec<String> {
    vec![
        "gpt-4o-mini".to_string(),
        "gpt-4.1-mini".to_string(),
        "gpt-4o".to_string(),
    ]
}

pub fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

pub fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

pub fn default_temperature() -> Option<f64> {
    Some(0.4)
}

pub fn default_timeout_secs() -> u64 {
    60
}

pub fn default_cli_executable() -> String {
    "gemini".to_string()
}

pub fn default_output_dir() -> String {
    "prototypes".to_string()
}

pub fn default_public_base_url() -> String {
    "/prototypes".to_string()
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            model_override: None,
            default_models: default_models(),
            base_url: default_base_url(),
            api_key: None,
            api_key_env: default_api_key_env(),
            temperature: default_temperature(),
            max_tokens: None,
            timeout_secs: default_timeout_secs(),
            cli_executable: default_cli_executable(),
            output_dir: default_output_dir(),
            public_base_url: default_public_base_url(),
            log_dir: None,
        }
    }
}

impl GenerationConfig {
    pub fn validate(&self) -> Result<()> {
        let schema_json = include_str!("../schemas/config.schema.json");
        let schema_val: Value = serde_json::from_str(schema_json)?;
        let compiled = JSONSchema::compile(&schema_val)
            .map_err(|e| anyhow::anyhow!("Failed to compile schema: {}", e))?;

        let instance = serde_json::to_value(self)?;
        if let Err(errors) = compiled.validate(&instance) {
            let error_msgs: Vec<String> = errors.map(|e| e.to_string()).collect();
            anyhow::bail!("Generation config validation failed: {}", error_msgs.join(", "));
        }
        Ok(())
    }

    /// Applies environment overrides read through `lookup`.
    pub fn with_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(model) = lookup("PROTOFORGE_MODEL").filter(|m| !m.trim().is_empty()) {
            self.model_override = Some(model);
        }
        if let Some(url) = lookup("PROTOFORGE_BASE_URL").filter(|u| !u.trim().is_empty()) {
            self.base_url = url;
        }
        if let Some(backend) = lookup("PROTOFORGE_BACKEND") {
            match backend.trim().to_lowercase().as_str() {
                "cli" => self.backend = BackendKind::Cli,
                "http" => self.backend = BackendKind::Http,
                _ => {}
            }
        }
        if self.api_key.is_none() {
            self.api_key = lookup("PROTOFORGE_API_KEY")
                .or_else(|| lookup(&self.api_key_env))
                .filter(|k| !k.trim().is_empty());
        }
        self
    }

    /// Applies overrides from the process environment.
    pub fn with_process_env(self) -> Self {
        self.with_env(|key| std::env::var(key).ok())
    }

    /// Ordered candidate models: the override first, then the defaults,
    /// without duplicates or blanks.
    pub fn candidate_models(&self) -> Vec<String> {
        let mut candidates: Vec<String> = Vec::new();
        for model in self.model_override.iter().chain(self.default_models.iter()) {
            let model = model.trim();
            if !model.is_empty() && !candidates.iter().any(|c| c == model) {
                candidates.push(model.to_string());
            }
        }
        candidates
    }

    /// Builds the configured backend. Fails when credentials are missing.
    pub fn build_client(&self) -> Result<Box<dyn CompletionClient>> {
        match self.backend {
            BackendKind::Http => {
                let api_key = self.api_key.clone().ok_or_else(|| {
                    anyhow::anyhow!("No API key found (set {} or PROTOFORGE_API_KEY)", self.api_key_env)
                })?;
                let client = HttpCompletionClient::new(
                    &self.base_url,
                    api_key,
                    Duration::from_secs(self.timeout_secs),
                )?
                .with_temperature(self.temperature)
                .with_max_tokens(self.max_tokens);
                Ok(Box::new(client))
            }
            BackendKind::Cli => Ok(Box::new(ShellCliClient::new(&self.cli_executable))),
        }
    }
}

/// Loads a YAML or JSON configuration file (by extension) and validates it.
pub async fn load_config(path: &Path) -> Result<GenerationConfig> {
    let content = fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));

    let config: GenerationConfig = if is_json {
        serde_json::from_str(&content)?
    } else {
        serde_yaml::from_str(&content)?
    };
    config
        .validate()
        .context("Failed to validate loaded generation config")?;
    Ok(config)
}

/// Loads `path` when given, otherwise the defaults; environment overrides are
/// applied last.
pub async fn resolve_config(path: Option<&Path>) -> Result<GenerationConfig> {
    let config = match path {
        Some(path) => load_config(path).await?,
        None => GenerationConfig::default(),
    };
    Ok(config.with_process_env())
}
