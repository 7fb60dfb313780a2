//! Staged Validator
//!
//! Forced order within one invocation: SYNTAX → COMPILE → RUNTIME.
//! The first failing stage stops the run; later stages are never attempted.
//! Failures are values, not errors. Only toolchain breakage (missing
//! executable, unwritable output) surfaces as `Err`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

use super::syntax::check_syntax;
use super::toolchain::{CompileOutcome, TestSummary, Toolchain};
use crate::types::{Result, TestName};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Syntax,
    Compile,
    Runtime,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Syntax => write!(f, "syntax"),
            Self::Compile => write!(f, "compile"),
            Self::Runtime => write!(f, "runtime"),
        }
    }
}

/// Result of one validation run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    Pass,
    SyntaxFail { diagnostics: String },
    CompileFail { diagnostics: String },
    RuntimeFail { failed: u32, report: String },
}

impl ValidationOutcome {
    pub fn is_pass(&self) -> bool {
        matches!(self, Self::Pass)
    }

    /// Stage that failed, if any
    pub fn failed_stage(&self) -> Option<Stage> {
        match self {
            Self::Pass => None,
            Self::SyntaxFail { .. } => Some(Stage::Syntax),
            Self::CompileFail { .. } => Some(Stage::Compile),
            Self::RuntimeFail { .. } => Some(Stage::Runtime),
        }
    }

    pub fn diagnostics(&self) -> Option<&str> {
        match self {
            Self::Pass => None,
            Self::SyntaxFail { diagnostics } | Self::CompileFail { diagnostics } => {
                Some(diagnostics)
            }
            Self::RuntimeFail { report, .. } => Some(report),
        }
    }
}

/// Three-stage checker over an injected toolchain
#[derive(Clone)]
pub struct Validator {
    toolchain: Arc<dyn Toolchain>,
    tests_dir: PathBuf,
}

impl Validator {
    /// `tests_dir` is the source root candidates are written under
    pub fn new(toolchain: Arc<dyn Toolchain>, tests_dir: PathBuf) -> Self {
        Self {
            toolchain,
            tests_dir,
        }
    }

    /// Run all three stages in order against `code`
    pub async fn validate(&self, code: &str, test: &TestName) -> Result<ValidationOutcome> {
        let problems = self.syntactic_validate(code)?;
        if !problems.is_empty() {
            debug!("{}: syntax stage failed ({} problems)", test, problems.len());
            return Ok(ValidationOutcome::SyntaxFail {
                diagnostics: problems.join("\n"),
            });
        }

        if let CompileOutcome::Diagnostics(diagnostics) = self.compile(code, test).await? {
            debug!("{}: compile stage failed", test);
            return Ok(ValidationOutcome::CompileFail { diagnostics });
        }

        let summary = self.execute(test).await?;
        if !summary.is_passing() {
            debug!("{}: runtime stage failed ({} failures)", test, summary.failures());
            return Ok(ValidationOutcome::RuntimeFail {
                failed: summary.failures(),
                report: summary.report,
            });
        }

        Ok(ValidationOutcome::Pass)
    }

    /// Syntax stage alone; empty means valid
    pub fn syntactic_validate(&self, code: &str) -> Result<Vec<String>> {
        check_syntax(code)
    }

    /// Compile stage alone
    pub async fn compile(&self, code: &str, test: &TestName) -> Result<CompileOutcome> {
        self.toolchain.compile(code, test, &self.tests_dir).await
    }

    /// Runtime stage alone; expects a prior successful compile
    pub async fn execute(&self, test: &TestName) -> Result<TestSummary> {
        self.toolchain.execute(test).await
    }
}
