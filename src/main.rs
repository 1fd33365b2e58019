//! scorecast - main entry point

use clap::Parser;
use scorecast::cli::{build_request, cmd_health, cmd_info, cmd_model_info, cmd_predict, cmd_train, Cli, Commands};
use std::process::ExitCode;
use tracing::error;

fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "scorecast=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli.command) {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(command: Commands) -> anyhow::Result<ExitCode> {
    match command {
        Commands::Train { data, artifacts, config, seed, strict } => {
            cmd_train(&data, artifacts.as_deref(), config.as_deref(), seed, strict)?;
        }
        Commands::Predict {
            gender,
            race_ethnicity,
            parental_education,
            lunch,
            test_prep,
            reading,
            writing,
            artifacts,
            config,
        } => {
            let request = build_request(
                &gender,
                &race_ethnicity,
                &parental_education,
                &lunch,
                &test_prep,
                reading,
                writing,
            );
            cmd_predict(request, artifacts.as_deref(), config.as_deref())?;
        }
        Commands::Health { artifacts, config } => {
            if !cmd_health(artifacts.as_deref(), config.as_deref())? {
                return Ok(ExitCode::FAILURE);
            }
        }
        Commands::Info { data } => {
            cmd_info(&data)?;
        }
        Commands::ModelInfo { artifacts, config } => {
            cmd_model_info(artifacts.as_deref(), config.as_deref())?;
        }
    }

    Ok(ExitCode::SUCCESS)
}
