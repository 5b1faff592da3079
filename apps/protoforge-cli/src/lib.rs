use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use protoforge_engine::{
    agents::{ChatMessage, CompletionClient},
    config::GenerationConfig,
    fallback,
    logging::GenerationLogger,
    normalize::{NormalizeContext, normalize},
    orchestrator::{GenerationOutcome, Orchestrator},
    project::ProjectContext,
    schema::Specification,
    store::{FsBundleStore, PublishedBundle},
};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Parser, Debug, Clone)]
#[command(name = "protoforge", version, about = "Generate clickable web prototypes", long_about = None)]
pub struct Cli {
    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// YAML or JSON configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Overrides the configured bundle output directory
    #[arg(long, global = true)]
    pub output_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Generate a prototype with the configured backend and publish it
    Generate(GenerateArgs),
    /// Normalize a loosely shaped JSON file into a canonical specification
    Normalize(NormalizeArgs),
    /// Validate and publish an existing specification
    Compile(CompileArgs),
    /// Print the deterministic prototype for the given project facts
    Fallback(ProjectArgs),
    /// Remove everything published for an owner
    Delete {
        #[arg(long, default_value = "local")]
        owner: String,
    },
}

#[derive(Args, Debug, Clone, Default)]
pub struct ProjectArgs {
    /// Project title
    #[arg(long)]
    pub title: String,

    #[arg(long)]
    pub summary: Option<String>,

    /// Project goal (repeatable)
    #[arg(long = "goal")]
    pub goals: Vec<String>,

    #[arg(long)]
    pub north_star: Option<String>,

    /// Area the prototype should concentrate on
    #[arg(long)]
    pub focus: Option<String>,

    /// Delivery phase, e.g. "discovery"
    #[arg(long)]
    pub phase: Option<String>,
}

impl ProjectArgs {
    pub fn to_project(&self) -> ProjectContext {
        ProjectContext {
            title: self.title.clone(),
            summary: self.summary.clone(),
            goals: self.goals.clone(),
            north_star_metric: self.north_star.clone(),
            focus: self.focus.clone(),
            phase: self.phase.clone(),
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct GenerateArgs {
    #[command(flatten)]
    pub project: ProjectArgs,

    /// New request for this round
    #[arg(long)]
    pub prompt: Option<String>,

    /// JSON file with prior messages: [{"role": "user", "content": "..."}]
    #[arg(long)]
    pub history: Option<PathBuf>,

    #[arg(long, default_value = "local")]
    pub owner: String,
}

#[derive(Args, Debug, Clone)]
pub struct NormalizeArgs {
    /// File holding the raw JSON
    pub file: PathBuf,

    /// Title used when the payload has none
    #[arg(long, default_value = "")]
    pub title: String,

    /// Summary used when the payload has none
    #[arg(long, default_value = "")]
    pub summary: String,

    /// Goal used when the payload has none
    #[arg(long)]
    pub goal: Option<String>,

    /// Names the screen synthesized when the payload has no screens
    #[arg(long)]
    pub focus: Option<String>,

    /// Plain-text assistant notes whose bullets become metrics
    #[arg(long)]
    pub notes: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct CompileArgs {
    /// Canonical specification JSON
    pub spec: PathBuf,

    #[arg(long, default_value = "local")]
    pub owner: String,
}

/// Result of a `generate` run.
#[derive(Debug)]
pub struct GenerateReport {
    pub outcome: GenerationOutcome,
    pub spec_path: PathBuf,
    pub published: PublishedBundle,
}

/// Applies the CLI-level overrides on top of the resolved configuration.
pub fn apply_overrides(mut config: GenerationConfig, cli: &Cli) -> GenerationConfig {
    if let Some(dir) = &cli.output_dir {
        config.output_dir = dir.to_string_lossy().to_string();
    }
    config
}

async fn logger_for(config: &GenerationConfig) -> Option<GenerationLogger> {
    let dir = config.log_dir.as_ref()?;
    match GenerationLogger::new(Path::new(dir)).await {
        Ok(logger) => Some(logger),
        Err(e) => {
            warn!("Generation log disabled: {}", e);
            None
        }
    }
}

/// Publishes `spec` for `owner`, recording the outcome in the generation log.
async fn publish_logged(
    store: &FsBundleStore,
    logger: Option<&GenerationLogger>,
    owner: &str,
    spec: &Specification,
) -> Result<PublishedBundle> {
    let result = store.publish(owner, spec).await;
    if let Some(logger) = logger {
        match &result {
            Ok(published) => {
                logger
                    .log_bundle_published(&published.slug, &published.public_url, published.reused)
                    .await?
            }
            Err(e) => {
                logger
                    .log_error(
                        &format!("Publishing for {} failed", owner),
                        Some(&format!("{:#}", e)),
                    )
                    .await?
            }
        }
    }
    result
}

pub async fn load_history(path: &Path) -> Result<Vec<ChatMessage>> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read history {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("History {} is not a list of messages", path.display()))
}

/// Runs the orchestrator with `client`, writes `spec.json` next to the
/// owner's bundles and publishes the result.
pub async fn run_generate<C: CompletionClient>(
    config: &GenerationConfig,
    client: Option<C>,
    args: &GenerateArgs,
) -> Result<GenerateReport> {
    let project = args.project.to_project();
    let history = match &args.history {
        Some(path) => load_history(path).await?,
        None => Vec::new(),
    };

    let logger = logger_for(config).await;
    let mut orchestrator = Orchestrator::new(client, config.clone());
    if let Some(logger) = &logger {
        orchestrator = orchestrator.with_logger(logger.clone());
    }
    let outcome = orchestrator
        .generate(&project, &history, args.prompt.as_deref())
        .await;

    let store = FsBundleStore::from_config(config);
    let published = publish_logged(&store, logger.as_ref(), &args.owner, &outcome.spec).await?;

    let spec_path = store.root().join(&args.owner).join("spec.json");
    tokio::fs::write(&spec_path, serde_json::to_string_pretty(&outcome.spec)?)
        .await
        .with_context(|| format!("Failed to write {}", spec_path.display()))?;
    info!("Wrote {}", spec_path.display());

    Ok(GenerateReport {
        outcome,
        spec_path,
        published,
    })
}

/// Normalizes the file at `args.file`. `Ok(None)` when the content is not a
/// JSON object.
pub async fn run_normalize(args: &NormalizeArgs) -> Result<Option<Specification>> {
    let raw = tokio::fs::read_to_string(&args.file)
        .await
        .with_context(|| format!("Failed to read {}", args.file.display()))?;
    let mut ctx = NormalizeContext::new(args.title.clone(), args.summary.clone());
    if let Some(goal) = &args.goal {
        ctx = ctx.with_goal(goal.clone());
    }
    if let Some(focus) = &args.focus {
        ctx = ctx.with_focus(focus.clone());
    }
    if let Some(notes) = &args.notes {
        let notes = tokio::fs::read_to_string(notes)
            .await
            .with_context(|| format!("Failed to read {}", notes.display()))?;
        ctx = ctx.with_notes(notes);
    }
    Ok(normalize(&Value::String(raw), &ctx))
}

/// Loads a canonical specification, validates it and publishes it.
pub async fn run_compile(config: &GenerationConfig, args: &CompileArgs) -> Result<PublishedBundle> {
    let content = tokio::fs::read_to_string(&args.spec)
        .await
        .with_context(|| format!("Failed to read {}", args.spec.display()))?;
    let spec: Specification = serde_json::from_str(&content)
        .with_context(|| format!("{} is not a specification", args.spec.display()))?;
    spec.validate()
        .with_context(|| format!("{} failed validation", args.spec.display()))?;

    let logger = logger_for(config).await;
    publish_logged(
        &FsBundleStore::from_config(config),
        logger.as_ref(),
        &args.owner,
        &spec,
    )
    .await
}

pub fn run_fallback(args: &ProjectArgs) -> Specification {
    fallback::synthesize(
        &args.to_project(),
        args.focus.as_deref(),
        args.phase.as_deref(),
    )
}

pub async fn run_delete(config: &GenerationConfig, owner: &str) -> Result<bool> {
    FsBundleStore::from_config(config).delete_owner(owner).await
}
