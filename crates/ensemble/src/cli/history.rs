//! History browsing command handlers.

use super::{Commands, open_store};
use ensemble::{
    EnsembleConfig, EnsembleResult, HistoryIndex, RunId, RunStatus, RunSummary, SessionState,
    TaskTemplate, TranscriptStore, format_event, share_text,
};
use std::sync::Arc;
use tracing::debug;

/// One history line: date, status, task.
fn summary_line(summary: &RunSummary) -> String {
    let marker = match summary.status {
        RunStatus::Completed if summary.final_answer.is_some() => "✅",
        RunStatus::Completed => "❔",
        RunStatus::Failed => "❌",
        RunStatus::Pending | RunStatus::Running => "⏳",
    };
    format!(
        "{} {}  {}  {}",
        marker,
        summary.created_at.format("%Y-%m-%d %H:%M"),
        summary.id,
        summary.task
    )
}

/// Handle the commands that read or edit run history.
pub async fn handle_history_command(config: &EnsembleConfig, command: Commands) -> EnsembleResult<()> {
    let store = Arc::new(open_store(config)?);
    let mut index = HistoryIndex::new(store.clone());
    index.refresh().await;

    match command {
        Commands::List => {
            if index.is_empty() {
                println!("No runs yet.");
            }
            for summary in index.iter() {
                println!("{}", summary_line(summary));
            }
        }

        Commands::Search { query } => {
            let mut found = 0;
            for summary in index.search(&query) {
                println!("{}", summary_line(summary));
                found += 1;
            }
            debug!(query = %query, found, "Search finished");
            if found == 0 {
                println!("No runs match '{}'.", query);
            }
        }

        Commands::Show { run_id } => {
            let run_id: RunId = run_id.parse()?;
            let loaded = store.load(&run_id).await?;
            let run = &loaded.run;
            println!("📜 Task: {}", run.task());
            println!("🕒 {}  [{}]\n", run.created_at().format("%Y-%m-%d %H:%M:%S"), run.status());
            for event in run.events().iter().filter(|e| e.is_displayable()) {
                let formatted = format_event(event);
                println!("{}", formatted);
                for url in &formatted.urls {
                    println!("  🔗 {}", url);
                }
                println!();
            }
            if loaded.skipped > 0 {
                println!("({} unreadable records skipped)", loaded.skipped);
            }
            match (run.final_answer(), run.failure()) {
                (Some(answer), _) => println!("Final Answer:\n{}", answer),
                (None, Some(reason)) => println!("An error occurred: {}", reason),
                (None, None) => println!("No final answer found."),
            }
        }

        Commands::Delete { run_id } => {
            let run_id: RunId = run_id.parse()?;
            let mut session = SessionState::default();
            index.remove(&run_id, &mut session).await?;
            println!("Deleted {}", run_id);
        }

        Commands::Share { run_id } => {
            let run_id: RunId = run_id.parse()?;
            let summary = match index.get(&run_id) {
                Some(summary) => summary.clone(),
                None => store.load(&run_id).await?.run.summary(),
            };
            print!("{}", share_text(&summary));
        }

        Commands::Files { run_id } => {
            let run_id: RunId = run_id.parse()?;
            let files = store.files(&run_id).await?;
            if let Some(dir) = store.location(&run_id) {
                println!("📁 {}", dir.display());
            }
            for file in files {
                println!("  {:>10}  {}", file.size, file.name);
            }
        }

        Commands::Run { .. } | Commands::Templates => {}
    }

    Ok(())
}

/// Print the built-in task templates.
pub fn print_templates() {
    for template in TaskTemplate::all() {
        if template.prompt.is_empty() {
            println!("{}", template.name);
        } else {
            println!("{:<20} {}", template.name, template.prompt);
        }
    }
}
