use anyhow::Result;
use clap::Parser;
use console::style;
use protoforge_cli::{
    Cli, Command, apply_overrides, run_compile, run_delete, run_fallback, run_generate,
    run_normalize,
};
use protoforge_engine::{config, orchestrator::GenerationSource};
use tracing::warn;
use tracing_subscriber::{EnvFilter, fmt};

fn setup_logging(debug: bool) {
    let filter = if debug {
        EnvFilter::new("info,protoforge_cli=debug,protoforge_engine=debug")
    } else {
        EnvFilter::new("warn,protoforge_cli=info,protoforge_engine=info")
    };

    fmt::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.debug);

    let config = apply_overrides(config::resolve_config(cli.config.as_deref()).await?, &cli);

    match &cli.command {
        Command::Generate(args) => {
            let client = match config.build_client() {
                Ok(client) => Some(client),
                Err(e) => {
                    warn!("Generation backend unavailable: {}", e);
                    None
                }
            };
            let report = run_generate(&config, client, args).await?;

            match &report.outcome.source {
                GenerationSource::Model { candidate } => {
                    println!("{} {}", style("Generated with").green(), style(candidate).bold());
                }
                GenerationSource::Fallback { reason } => {
                    println!("{} {}", style("Used fallback:").yellow(), reason);
                }
            }
            println!("\n{}", report.outcome.assistant_message);
            println!(
                "\n{} {}",
                style("Specification:").dim(),
                report.spec_path.display()
            );
            let label = if report.published.reused {
                "Unchanged:"
            } else {
                "Published:"
            };
            println!("{} {}", style(label).bold().cyan(), report.published.public_url);
        }
        Command::Normalize(args) => match run_normalize(args).await? {
            Some(spec) => println!("{}", serde_json::to_string_pretty(&spec)?),
            None => anyhow::bail!("{} is not a JSON object", args.file.display()),
        },
        Command::Compile(args) => {
            let published = run_compile(&config, args).await?;
            let label = if published.reused {
                "Unchanged:"
            } else {
                "Published:"
            };
            println!("{} {}", style(label).bold().cyan(), published.public_url);
        }
        Command::Fallback(args) => {
            println!("{}", serde_json::to_string_pretty(&run_fallback(args))?);
        }
        Command::Delete { owner } => {
            if run_delete(&config, owner).await? {
                println!("{} {}", style("Deleted bundles for").green(), owner);
            } else {
                println!("{}", style(format!("Nothing published for {}", owner)).dim());
            }
        }
    }

    Ok(())
}
