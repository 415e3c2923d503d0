mod cli;
mod commands;
mod output;

use anyhow::{Result, anyhow};
use clap::Parser;

use cli::{Cli, Commands};
use mediaurl_resolver::config::loader::load_config;
use output::print_error;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        print_error(&format!("{e:#}"));
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let format = cli.format.unwrap_or_default();

    mediaurl_resolver::init_tracing_with_level("warn");
    let config = load_config(cli.config.as_deref()).map_err(|e| anyhow!(e))?;
    if cli.verbose {
        mediaurl_resolver::apply_logging_level("debug");
    } else {
        mediaurl_resolver::apply_logging_config(&config.logging);
    }

    if let Commands::Config(args) = &cli.command {
        return match &args.command {
            cli::ConfigCommands::Show => {
                commands::config::show(&config, cli.config.as_deref(), format)
            }
        };
    }

    let resolver = mediaurl_resolver::build_resolver(&config).await?;
    tracing::debug!(stats = ?resolver.stats(), "resolver ready");
    let sweeper = config
        .cache
        .local_sweep_interval()
        .map(|interval| resolver.spawn_local_sweeper(interval));

    match &cli.command {
        Commands::Resolve(args) => {
            commands::resolve::resolve(&resolver, &args.references, format).await?;
        }
        Commands::Batch(args) => {
            commands::resolve::batch(
                &resolver,
                &args.references,
                args.file.as_deref(),
                args.settled,
                format,
            )
            .await?;
        }
        Commands::Attachment(args) => {
            commands::resolve::attachment(&resolver, &args.reference, &args.filename, format)
                .await?;
        }
        Commands::Check => {
            commands::status::check(&resolver, format).await?;
        }
        Commands::Config(_) => {}
    }

    resolver.flush_background_writes().await;
    if let Some(sweeper) = sweeper {
        sweeper.abort();
    }
    Ok(())
}
