//! Kolosal Pipeline - Main Entry Point

use clap::Parser;
use kolosal_pipeline::cli::{cmd_evaluate, cmd_predict, cmd_run, cmd_tasks, cmd_train, Cli, Commands};

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kolosal_pipeline=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Train {
            config,
            data,
            model,
            test,
        } => {
            cmd_train(&config, &data, &model, test.as_deref())?;
        }
        Commands::Evaluate { model, data } => {
            cmd_evaluate(&model, &data)?;
        }
        Commands::Predict { model, record } => {
            cmd_predict(&model, &record)?;
        }
        Commands::Tasks => {
            cmd_tasks();
        }
        Commands::Run {
            task,
            train,
            test,
            model,
        } => {
            cmd_run(&task, &train, &test, &model)?;
        }
    }

    Ok(())
}
