//! Method Job
//!
//! Drives one (class, method) pair end to end:
//!
//! ```text
//! prompt ─► generate ─► rule repair ─► validate ⇄ llm repair (≤ max_rounds)
//!                                                   │
//!                                                   └─► final validate ─► persist
//! ```
//!
//! ## Design
//!
//! - One `PromptConstructor` per job; nothing mutable is shared with siblings
//! - Every error is caught at `run`; the latest candidate is still persisted
//! - Exhausting the round cap is not an error: the last candidate is
//!   validated once more and accepted

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{instrument, warn};

use super::generator::Generator;
use super::log::{RunEvent, SharedRunLog};
use super::prompt::PromptConstructor;
use super::record::{RecordWriter, RoundRecord};
use super::repair::{Repair, RepairStep, rule_based_repair};
use crate::index::SharedRepository;
use crate::types::{ClassInfo, MethodInfo, Result, TestName};
use crate::validation::Validator;

// =============================================================================
// Job Status & Report
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Final candidate passed all three stages
    Passed,
    /// Final candidate still fails, or nothing usable was generated
    Failed,
    /// Prompt exceeded the size ceiling
    Abandoned,
    /// Provider, toolchain or IO failure caught at the job boundary
    Error,
    /// Target could not be resolved; no job ran
    Skipped,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Abandoned => "abandoned",
            Self::Error => "error",
            Self::Skipped => "skipped",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobReport {
    /// Fully-qualified test name, or the unresolved target for skips
    pub test_name: String,
    pub class: String,
    pub method: String,
    pub status: JobStatus,
    /// LLM repair rounds consumed
    pub rounds: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl JobReport {
    pub fn skipped(target: impl Into<String>, reason: impl Into<String>) -> Self {
        let target = target.into();
        Self {
            test_name: target.clone(),
            class: target,
            method: String::new(),
            status: JobStatus::Skipped,
            rounds: 0,
            artifact: None,
            error: Some(reason.into()),
        }
    }

    /// A unit whose task died before producing a report
    pub fn crashed(label: impl Into<String>, error: impl Into<String>) -> Self {
        let label = label.into();
        Self {
            test_name: label.clone(),
            class: label,
            method: String::new(),
            status: JobStatus::Error,
            rounds: 0,
            artifact: None,
            error: Some(error.into()),
        }
    }
}

// =============================================================================
// Job Context
// =============================================================================

/// Per-job limits, shared read-only by all jobs of a run
#[derive(Debug, Clone)]
pub struct JobSettings {
    pub max_prompt_tokens: usize,
    pub max_rounds: u32,
    pub include_dependencies: bool,
    pub max_error_chars: usize,
    pub tests_dir: PathBuf,
    pub records_dir: PathBuf,
}

/// Collaborators handed to every job
#[derive(Clone)]
pub struct JobContext {
    pub repository: SharedRepository,
    pub generator: Generator,
    pub validator: Validator,
    pub log: SharedRunLog,
    pub settings: Arc<JobSettings>,
}

impl JobContext {
    fn repair(&self) -> Repair {
        Repair::new(self.validator.clone(), self.generator.clone(), self.log.clone())
    }
}

// =============================================================================
// Method Job
// =============================================================================

pub struct MethodJob {
    ctx: JobContext,
    class: Arc<ClassInfo>,
    method: MethodInfo,
    test: TestName,
    /// Latest candidate; persisted whatever the outcome
    candidate: String,
    /// Repair rounds that completed, including on error exits
    rounds: u32,
}

impl MethodJob {
    pub fn new(ctx: JobContext, class: Arc<ClassInfo>, method: MethodInfo) -> Self {
        let test = TestName::derive(&class, &method);
        Self {
            ctx,
            class,
            method,
            test,
            candidate: String::new(),
            rounds: 0,
        }
    }

    pub fn test_name(&self) -> &TestName {
        &self.test
    }

    /// Run to completion. Never fails: errors become `JobStatus::Error`.
    #[instrument(skip_all, fields(test = %self.test))]
    pub async fn run(mut self) -> JobReport {
        let label = self.test.full_name();
        self.ctx.log.record(RunEvent::JobStarted {
            test: label.clone(),
        });

        let (status, error) = match self.drive().await {
            Ok(status) => (status, None),
            Err(e) => {
                self.ctx.log.record(RunEvent::JobError {
                    test: label.clone(),
                    error: e.to_string(),
                    category: e.category(),
                });
                (JobStatus::Error, Some(e.to_string()))
            }
        };
        let rounds = self.rounds;

        let artifact = match self.persist().await {
            Ok(path) => path,
            Err(e) => {
                warn!("Failed to persist {}: {}", label, e);
                None
            }
        };

        self.ctx.log.record(RunEvent::JobFinished {
            test: label.clone(),
            status,
            rounds,
        });

        JobReport {
            test_name: label,
            class: self.class.full_name(),
            method: self.method.signature.clone(),
            status,
            rounds,
            artifact,
            error,
        }
    }

    async fn drive(&mut self) -> Result<JobStatus> {
        let settings = self.ctx.settings.clone();
        let label = self.test.full_name();
        let records = RecordWriter::create(&settings.records_dir, &self.test).await?;

        let mut constructor = PromptConstructor::new(
            self.ctx.repository.clone(),
            settings.max_prompt_tokens,
            settings.max_error_chars,
        );
        constructor.set_context(self.class.clone(), &self.method, settings.include_dependencies);

        let messages = constructor.generate()?;
        if constructor.is_exceed_max_tokens() {
            self.ctx.log.record(RunEvent::PromptSkipped {
                test: label,
                round: 0,
                tokens: constructor.token_count(),
                ceiling: constructor.max_prompt_tokens(),
            });
            return Ok(JobStatus::Abandoned);
        }

        let generated = self.ctx.generator.generate(&messages).await?;
        if generated.is_empty() {
            self.ctx.log.record(RunEvent::ExtractionFailed {
                test: label,
                round: 0,
            });
            return Ok(JobStatus::Failed);
        }
        self.ctx.log.record(RunEvent::Generated {
            test: label.clone(),
            round: 0,
        });
        self.candidate = rule_based_repair(&generated, &self.test, &self.class);

        let repair = self.ctx.repair();
        for round in 1..=settings.max_rounds {
            let step = repair
                .llm_based_repair(&mut constructor, &self.candidate, round)
                .await?;
            records
                .append(&RoundRecord::new(&self.test, round, &self.candidate, step.outcome()))
                .await?;

            // Passed and BudgetExceeded made no provider call this round
            match step {
                RepairStep::Passed { .. } => return Ok(JobStatus::Passed),
                RepairStep::BudgetExceeded { .. } => return Ok(JobStatus::Abandoned),
                RepairStep::Regenerated { code, .. } => self.candidate = code,
                RepairStep::ExtractionFailed { .. } => {}
            }
            self.rounds = round;
        }

        // Round cap reached: the last candidate is final
        let outcome = self.ctx.validator.validate(&self.candidate, &self.test).await?;
        self.ctx.log.record(RunEvent::Validated {
            test: label,
            round: settings.max_rounds + 1,
            failed_stage: outcome.failed_stage(),
        });
        records
            .append(&RoundRecord::new(
                &self.test,
                settings.max_rounds + 1,
                &self.candidate,
                &outcome,
            ))
            .await?;

        Ok(if outcome.is_pass() {
            JobStatus::Passed
        } else {
            JobStatus::Failed
        })
    }

    async fn persist(&self) -> Result<Option<PathBuf>> {
        if self.candidate.trim().is_empty() {
            return Ok(None);
        }
        let path = write_artifact(&self.ctx.settings.tests_dir, &self.test, &self.candidate).await?;
        Ok(Some(path))
    }
}

async fn write_artifact(tests_dir: &Path, test: &TestName, source: &str) -> Result<PathBuf> {
    let path = tests_dir.join(test.source_path());
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(&path, source).await?;
    Ok(path)
}

#[cfg(test)]
pub(crate) mod harness {
    use super::*;
    use crate::ai::provider::scripted::ScriptedProvider;
    use crate::index::InMemoryClassRepository;
    use crate::synthesis::log::memory::MemoryRunLog;
    use crate::validation::toolchain::fake::FakeToolchain;
    use tempfile::TempDir;

    pub const PASSING_REPLY: &str =
        "```java\npackage com.x;\n\npublic class Calc_add_Test {\n    void adds() {}\n}\n```";

    pub struct JobHarness {
        pub dir: TempDir,
        pub provider: Arc<ScriptedProvider>,
        pub toolchain: Arc<FakeToolchain>,
        pub log: Arc<MemoryRunLog>,
        pub ctx: JobContext,
    }

    pub fn job_harness(
        classes: Vec<ClassInfo>,
        provider: ScriptedProvider,
        max_prompt_tokens: usize,
        max_rounds: u32,
    ) -> JobHarness {
        let dir = TempDir::new().unwrap();
        let provider = Arc::new(provider);
        let toolchain = Arc::new(FakeToolchain::default());
        let log = Arc::new(MemoryRunLog::default());
        let tests_dir = dir.path().join("tests");

        let ctx = JobContext {
            repository: Arc::new(InMemoryClassRepository::new(classes)),
            generator: Generator::new(provider.clone()),
            validator: Validator::new(toolchain.clone(), tests_dir.clone()),
            log: log.clone(),
            settings: Arc::new(JobSettings {
                max_prompt_tokens,
                max_rounds,
                include_dependencies: true,
                max_error_chars: 4000,
                tests_dir,
                records_dir: dir.path().join("records"),
            }),
        };

        JobHarness {
            dir,
            provider,
            toolchain,
            log,
            ctx,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::harness::*;
    use super::*;
    use crate::ai::provider::scripted::ScriptedProvider;
    use crate::types::model::fixtures::calc;
    use crate::validation::toolchain::fake::{COMPILE_ERROR, FAILING};

    fn job(h: &JobHarness) -> MethodJob {
        let calc = calc();
        MethodJob::new(h.ctx.clone(), Arc::new(calc.clone()), calc.methods[0].clone())
    }

    fn reply_with(marker: &str) -> String {
        format!(
            "```java\npublic class Calc_add_Test {{\n    void adds() {{ {} }}\n}}\n```",
            marker
        )
    }

    #[tokio::test]
    async fn test_first_candidate_passes() {
        let h = job_harness(vec![calc()], ScriptedProvider::new([Some(PASSING_REPLY)]), 2600, 5);
        let report = job(&h).run().await;

        assert_eq!(report.status, JobStatus::Passed);
        assert_eq!(report.rounds, 0);
        assert_eq!(report.test_name, "com.x.Calc_add_Test");
        assert_eq!(h.provider.calls(), 1);

        let artifact = report.artifact.unwrap();
        assert_eq!(artifact, h.ctx.settings.tests_dir.join("com/x/Calc_add_Test.java"));
        let source = std::fs::read_to_string(artifact).unwrap();
        assert!(source.starts_with("package com.x;"));

        let records = std::fs::read_to_string(h.dir.path().join("records/com.x.Calc_add_Test.jsonl")).unwrap();
        assert_eq!(records.lines().count(), 1);
    }

    #[tokio::test]
    async fn test_abandoned_before_any_provider_call() {
        let h = job_harness(vec![calc()], ScriptedProvider::new([Some(PASSING_REPLY)]), 10, 5);
        let report = job(&h).run().await;

        assert_eq!(report.status, JobStatus::Abandoned);
        assert_eq!(h.provider.calls(), 0);
        assert!(report.artifact.is_none());
        assert!(h.log.events().iter().any(|e| matches!(
            e,
            RunEvent::PromptSkipped { round: 0, .. }
        )));
    }

    #[tokio::test]
    async fn test_repair_round_fixes_candidate() {
        let broken = reply_with(COMPILE_ERROR);
        let broken: &'static str = Box::leak(broken.into_boxed_str());
        let h = job_harness(
            vec![calc()],
            ScriptedProvider::new([Some(broken), Some(PASSING_REPLY)]),
            100_000,
            5,
        );
        let report = job(&h).run().await;

        assert_eq!(report.status, JobStatus::Passed);
        assert_eq!(report.rounds, 1);
        assert_eq!(h.provider.calls(), 2);
        let repair_prompt = &h.provider.prompts()[1][1].content;
        assert!(repair_prompt.contains("cannot find symbol"));
        assert!(repair_prompt.contains(COMPILE_ERROR));
    }

    #[tokio::test]
    async fn test_round_cap_accepts_last_candidate() {
        let failing: &'static str = Box::leak(reply_with(FAILING).into_boxed_str());
        let h = job_harness(
            vec![calc()],
            ScriptedProvider::new([Some(failing), Some(failing), Some(failing)]),
            100_000,
            2,
        );
        let report = job(&h).run().await;

        assert_eq!(report.status, JobStatus::Failed);
        assert_eq!(report.rounds, 2);
        assert!(report.error.is_none());
        assert_eq!(h.provider.calls(), 3);
        let source = std::fs::read_to_string(report.artifact.unwrap()).unwrap();
        assert!(source.contains(FAILING));
    }

    #[tokio::test]
    async fn test_empty_first_extraction_fails_job() {
        let h = job_harness(vec![calc()], ScriptedProvider::new([Some("no code here")]), 2600, 5);
        let report = job(&h).run().await;

        assert_eq!(report.status, JobStatus::Failed);
        assert_eq!(h.provider.calls(), 1);
        assert!(report.artifact.is_none());
    }

    #[tokio::test]
    async fn test_transport_error_persists_latest_candidate() {
        let broken: &'static str = Box::leak(reply_with(COMPILE_ERROR).into_boxed_str());
        let h = job_harness(vec![calc()], ScriptedProvider::new([Some(broken), None]), 100_000, 5);
        let report = job(&h).run().await;

        assert_eq!(report.status, JobStatus::Error);
        assert!(report.error.unwrap().contains("No response"));
        let source = std::fs::read_to_string(report.artifact.unwrap()).unwrap();
        assert!(source.contains("class Calc_add_Test"));
        assert!(h.log.events().iter().any(|e| matches!(e, RunEvent::JobError { .. })));
    }

    #[tokio::test]
    async fn test_error_keeps_completed_rounds() {
        let first: &'static str = Box::leak(reply_with(COMPILE_ERROR).into_boxed_str());
        let second: &'static str =
            Box::leak(reply_with(&format!("{} /*second*/", COMPILE_ERROR)).into_boxed_str());
        let h = job_harness(
            vec![calc()],
            ScriptedProvider::new([Some(first), Some(second), None]),
            100_000,
            5,
        );
        let report = job(&h).run().await;

        assert_eq!(report.status, JobStatus::Error);
        assert_eq!(report.rounds, 1);
        let source = std::fs::read_to_string(report.artifact.unwrap()).unwrap();
        assert!(source.contains("/*second*/"));
    }

    #[tokio::test]
    async fn test_each_round_repairs_previous_output() {
        let replies: Vec<&'static str> = ["/*r0*/", "/*r1*/", "/*r2*/"]
            .iter()
            .map(|marker| {
                let reply: &'static str =
                    Box::leak(reply_with(&format!("{} {}", FAILING, marker)).into_boxed_str());
                reply
            })
            .collect();
        let h = job_harness(
            vec![calc()],
            ScriptedProvider::new(replies.iter().map(|r| Some(*r))),
            100_000,
            2,
        );
        let report = job(&h).run().await;

        assert_eq!(report.status, JobStatus::Failed);
        assert_eq!(report.rounds, 2);

        let prompts = h.provider.prompts();
        assert_eq!(prompts.len(), 3);
        assert!(prompts[1][1].content.contains("/*r0*/"));
        assert!(!prompts[1][1].content.contains("/*r1*/"));
        assert!(prompts[2][1].content.contains("/*r1*/"));
        assert!(!prompts[2][1].content.contains("/*r0*/"));

        let source = std::fs::read_to_string(report.artifact.unwrap()).unwrap();
        assert!(source.contains("/*r2*/"));
    }

    #[tokio::test]
    async fn test_budget_exceeded_mid_repair_abandons_and_persists() {
        let calc = calc();
        let mut sizing = PromptConstructor::new(
            Arc::new(crate::index::InMemoryClassRepository::new([calc.clone()])),
            usize::MAX,
            4000,
        );
        sizing.set_context(Arc::new(calc.clone()), &calc.methods[0], true);
        sizing.generate().unwrap();
        let ceiling = sizing.token_count();

        let failing: &'static str = Box::leak(reply_with(FAILING).into_boxed_str());
        let h = job_harness(
            vec![calc.clone()],
            ScriptedProvider::new([Some(failing), Some(PASSING_REPLY)]),
            ceiling,
            5,
        );
        let report = job(&h).run().await;

        assert_eq!(report.status, JobStatus::Abandoned);
        assert_eq!(report.rounds, 0);
        assert_eq!(h.provider.calls(), 1);
        let source = std::fs::read_to_string(report.artifact.unwrap()).unwrap();
        assert!(source.contains(FAILING));
        assert!(h.log.events().iter().any(|e| matches!(
            e,
            RunEvent::PromptSkipped { round: 1, .. }
        )));
    }
}
