//! Live transcript printing.

use async_trait::async_trait;
use ensemble_core::{Event, RunStatus, RunSummary};
use ensemble_error::{EnsembleResult, StoreError, StoreErrorKind};
use ensemble_history::format_event;
use ensemble_interface::Renderer;
use std::io::Write;

/// Renderer printing events as they stream in.
///
/// Bookkeeping records without a source are not shown.
#[derive(Debug)]
pub struct TerminalRenderer<W> {
    out: W,
    shown: usize,
}

impl TerminalRenderer<std::io::Stdout> {
    /// Print to standard output.
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send> TerminalRenderer<W> {
    /// Print to `out`.
    pub fn new(out: W) -> Self {
        Self { out, shown: 0 }
    }

    /// Number of events printed so far.
    pub fn shown(&self) -> usize {
        self.shown
    }

    /// The underlying writer.
    pub fn into_inner(self) -> W {
        self.out
    }

    fn write(&mut self, text: &str) -> EnsembleResult<()> {
        self.out
            .write_all(text.as_bytes())
            .and_then(|()| self.out.flush())
            .map_err(|e| StoreError::new(StoreErrorKind::FileWrite(format!("terminal: {}", e))))?;
        Ok(())
    }
}

#[async_trait]
impl<W: Write + Send> Renderer for TerminalRenderer<W> {
    async fn on_event(&mut self, event: &Event) -> EnsembleResult<()> {
        if !event.is_displayable() {
            return Ok(());
        }
        let formatted = format_event(event);
        let mut text = format!("{}\n", formatted);
        for url in &formatted.urls {
            text.push_str(&format!("  🔗 {}\n", url));
        }
        text.push('\n');
        self.write(&text)?;
        self.shown += 1;
        Ok(())
    }

    async fn finish(&mut self, summary: &RunSummary) -> EnsembleResult<()> {
        let text = match (summary.status, &summary.final_answer, &summary.failure) {
            (RunStatus::Completed, Some(answer), _) => format!("Final Answer:\n{}\n", answer),
            (RunStatus::Completed, None, _) => "No final answer found.\n".to_string(),
            (RunStatus::Failed, _, Some(reason)) => format!("An error occurred: {}\n", reason),
            (status, _, _) => format!("Run {}\n", status),
        };
        self.write(&text)
    }
}
