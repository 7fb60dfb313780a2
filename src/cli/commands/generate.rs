//! Generate Commands
//!
//! `project`, `class` and `method` all funnel through here. Ctrl-C cancels
//! the run; finished artifacts stay on disk.

use tracing::warn;

use crate::cli::{CommandContext, Output};
use crate::synthesis::{RunSummary, cancel_pair};
use crate::types::Result;

/// What to generate tests for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Project,
    Class(String),
    Method { class: String, selector: String },
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Project => write!(f, "project"),
            Self::Class(name) => write!(f, "class {}", name),
            Self::Method { class, selector } => write!(f, "method {}#{}", class, selector),
        }
    }
}

pub async fn run(ctx: &CommandContext, target: Target) -> Result<RunSummary> {
    let (handle, token) = cancel_pair();
    let orchestrator = ctx.orchestrator(token)?;

    let signal = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling run");
            handle.cancel();
        }
    });

    let output = Output::new();
    output.header(&format!("unitforge: {}", target));

    let result = match &target {
        Target::Project => orchestrator.run_project().await,
        Target::Class(name) => orchestrator.run_class(name).await,
        Target::Method { class, selector } => orchestrator.run_method(class, selector).await,
    };
    signal.abort();

    let summary = result?;
    output.summary(&summary);
    Ok(summary)
}
