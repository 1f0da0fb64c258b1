//! Ensemble CLI binary.
//!
//! This binary provides command-line access to ensemble's functionality:
//! - Run a task through the configured orchestration engine, streaming events
//! - Browse, search, share and delete past runs

use clap::Parser;

mod cli;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    use cli::{Cli, Commands, handle_history_command, run_task};

    // An API key may live in .env next to the logs
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            return Err(e.into());
        }
    }

    let cli = Cli::parse();
    ensemble::init_tracing(cli.verbose, cli.json_logs)?;

    let config = ensemble::EnsembleConfig::load_with(cli.config.as_deref())?;
    config.validate()?;

    match cli.command {
        Commands::Run { task, template } => {
            run_task(&config, &task, template.as_deref()).await?;
        }
        Commands::Templates => cli::print_templates(),
        command => handle_history_command(&config, command).await?,
    }

    Ok(())
}
