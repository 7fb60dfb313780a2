//! Orchestrator
//!
//! Turns a project, class or method request into independent `MethodJob`s
//! and runs them sequentially or on a bounded worker pool.
//!
//! ## Design
//!
//! - Fatal checks (build output present, unambiguous class name) run before
//!   any job is scheduled
//! - The pool is a `JoinSet` gated by a `Semaphore`; it is owned by the call
//!   and drained or aborted on every exit path
//! - A panicking or failing job becomes an `error` report; siblings continue
//! - Cancellation aborts queued and in-flight jobs; partial output stays

use dashmap::DashMap;
use serde::Serialize;
use std::collections::HashMap;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{Semaphore, watch};
use tokio::task::JoinSet;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::generator::Generator;
use super::job::{JobContext, JobReport, JobSettings, JobStatus, MethodJob};
use super::log::{RunEvent, SharedRunLog};
use crate::ai::SharedProvider;
use crate::config::Config;
use crate::constants::toolchain::POM_PACKAGING;
use crate::index::{ClassResolution, SharedRepository};
use crate::types::{ClassInfo, ForgeError, MethodInfo, Result};
use crate::validation::{Toolchain, Validator};

// =============================================================================
// Cancellation
// =============================================================================

/// Create a linked cancel handle and token
pub fn cancel_pair() -> (CancelHandle, CancelToken) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle(Arc::new(tx)), CancelToken(rx))
}

/// Trigger side, held by the signal handler
#[derive(Clone)]
pub struct CancelHandle(Arc<watch::Sender<bool>>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.send_replace(true);
    }
}

/// Observer side, held by the orchestrator
#[derive(Clone)]
pub struct CancelToken(watch::Receiver<bool>);

impl CancelToken {
    /// A token that never fires
    pub fn never() -> Self {
        cancel_pair().1
    }

    pub fn is_cancelled(&self) -> bool {
        *self.0.borrow()
    }

    /// Resolves once cancelled; pends forever if the handle is gone
    pub async fn cancelled(&self) {
        let mut rx = self.0.clone();
        if rx.wait_for(|cancelled| *cancelled).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

// =============================================================================
// Run Summary
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub passed: usize,
    pub failed: usize,
    pub abandoned: usize,
    pub errored: usize,
    pub skipped: usize,
    pub cancelled: bool,
    pub reports: Vec<JobReport>,
}

impl RunSummary {
    fn new(mut reports: Vec<JobReport>, cancelled: bool) -> Self {
        reports.sort_by(|a, b| a.test_name.cmp(&b.test_name));
        let count = |status: JobStatus| reports.iter().filter(|r| r.status == status).count();
        Self {
            run_id: Uuid::new_v4(),
            passed: count(JobStatus::Passed),
            failed: count(JobStatus::Failed),
            abandoned: count(JobStatus::Abandoned),
            errored: count(JobStatus::Error),
            skipped: count(JobStatus::Skipped),
            cancelled,
            reports,
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new(), false)
    }

    pub fn total(&self) -> usize {
        self.reports.len()
    }

    pub fn is_success(&self) -> bool {
        !self.cancelled && self.passed == self.total()
    }
}

// =============================================================================
// Orchestrator
// =============================================================================

#[derive(Clone)]
pub struct Orchestrator {
    build_dir: PathBuf,
    packaging: String,
    multithreading: bool,
    class_threads: usize,
    method_threads: usize,
    repository: SharedRepository,
    ctx: JobContext,
    log: SharedRunLog,
    cancel: CancelToken,
    reports: Arc<DashMap<String, JobReport>>,
}

impl Orchestrator {
    pub fn new(
        config: &Config,
        repository: SharedRepository,
        provider: SharedProvider,
        toolchain: Arc<dyn Toolchain>,
        log: SharedRunLog,
        cancel: CancelToken,
    ) -> Self {
        let tests_dir = config.resolve(&config.output.tests_dir);
        let settings = JobSettings {
            max_prompt_tokens: config.generation.max_prompt_tokens,
            max_rounds: config.generation.max_rounds,
            include_dependencies: config.generation.include_dependencies,
            max_error_chars: config.generation.max_error_chars,
            records_dir: config.resolve(&config.output.records_dir),
            tests_dir: tests_dir.clone(),
        };

        let ctx = JobContext {
            repository: repository.clone(),
            generator: Generator::new(provider),
            validator: Validator::new(toolchain, tests_dir),
            log: log.clone(),
            settings: Arc::new(settings),
        };

        Self {
            build_dir: config.build_dir(),
            packaging: config.project.packaging.clone(),
            multithreading: config.concurrency.enable_multithreading,
            class_threads: config.concurrency.class_threads,
            method_threads: config.concurrency.method_threads,
            repository,
            ctx,
            log,
            cancel,
            reports: Arc::new(DashMap::new()),
        }
    }

    /// Snapshot of every report recorded so far, keyed by test name
    pub fn reports(&self) -> Vec<JobReport> {
        let mut reports: Vec<JobReport> = self.reports.iter().map(|r| r.value().clone()).collect();
        reports.sort_by(|a, b| a.test_name.cmp(&b.test_name));
        reports
    }

    // -------------------------------------------------------------------------
    // Entry points
    // -------------------------------------------------------------------------

    /// Every eligible class in the repository
    #[instrument(skip(self))]
    pub async fn run_project(&self) -> Result<RunSummary> {
        if !self.precheck()? {
            return Ok(RunSummary::empty());
        }

        let mut units = Vec::new();
        for fqn in self.repository.all_classes() {
            let class = match self.repository.class_info(&fqn) {
                Ok(Some(class)) => class,
                Ok(None) => continue,
                Err(e) => {
                    warn!("Skipping {}: {}", fqn, e);
                    continue;
                }
            };
            if !class.is_eligible() {
                debug!("Skipping ineligible class {}", fqn);
                continue;
            }
            units.push((fqn.clone(), self.clone().class_unit(fqn)));
        }

        info!("Scheduling {} classes", units.len());
        let (reports, cancelled) = self.run_units(self.class_threads, units).await;
        Ok(RunSummary::new(reports, cancelled))
    }

    /// Every testable method of one class
    #[instrument(skip(self))]
    pub async fn run_class(&self, name: &str) -> Result<RunSummary> {
        if !self.precheck()? {
            return Ok(RunSummary::empty());
        }
        let Some(class) = self.resolve_class(name)? else {
            return Ok(RunSummary::new(vec![self.skip(name, "class not found")], false));
        };

        let methods: Vec<MethodInfo> = class.testable_methods().cloned().collect();
        let (reports, cancelled) = self.run_methods(class, methods).await;
        Ok(RunSummary::new(reports, cancelled))
    }

    /// One method of one class; `selector` is a method id or a method name
    #[instrument(skip(self))]
    pub async fn run_method(&self, name: &str, selector: &str) -> Result<RunSummary> {
        if !self.precheck()? {
            return Ok(RunSummary::empty());
        }
        let Some(class) = self.resolve_class(name)? else {
            return Ok(RunSummary::new(vec![self.skip(name, "class not found")], false));
        };

        let methods: Vec<MethodInfo> = select_methods(&class, selector).into_iter().cloned().collect();
        if methods.is_empty() {
            let err = ForgeError::MethodNotFound {
                class: class.full_name(),
                method: selector.to_string(),
            };
            let target = format!("{}#{}", class.full_name(), selector);
            return Ok(RunSummary::new(vec![self.skip(&target, &err.to_string())], false));
        }

        let (reports, cancelled) = self.run_methods(class, methods).await;
        Ok(RunSummary::new(reports, cancelled))
    }

    /// All testable methods of an already-qualified class. No prechecks.
    pub async fn run_class_job(&self, fqn: &str) -> Vec<JobReport> {
        match self.repository.class_info(fqn) {
            Ok(Some(class)) => {
                let methods: Vec<MethodInfo> = class.testable_methods().cloned().collect();
                self.run_methods(class, methods).await.0
            }
            Ok(None) => vec![self.skip(fqn, "class not found")],
            Err(e) => vec![self.skip(fqn, &e.to_string())],
        }
    }

    /// One method of an already-qualified class. No prechecks.
    pub async fn run_method_job(&self, fqn: &str, method: &MethodInfo) -> JobReport {
        match self.repository.class_info(fqn) {
            Ok(Some(class)) => self.execute(class, method.clone()).await,
            Ok(None) => self.skip(fqn, "class not found"),
            Err(e) => self.skip(fqn, &e.to_string()),
        }
    }

    // -------------------------------------------------------------------------
    // Checks & resolution
    // -------------------------------------------------------------------------

    /// `Ok(false)` means there is nothing to do for this project
    fn precheck(&self) -> Result<bool> {
        if self.packaging == POM_PACKAGING {
            info!("Project packaging is {}; nothing to test", POM_PACKAGING);
            return Ok(false);
        }
        if !self.build_dir.is_dir() {
            return Err(ForgeError::ProjectNotBuilt {
                path: self.build_dir.display().to_string(),
            });
        }
        Ok(true)
    }

    /// `Ok(None)` for an unknown class; ambiguity is fatal
    fn resolve_class(&self, name: &str) -> Result<Option<Arc<ClassInfo>>> {
        let fqn = match self.repository.resolve(name) {
            ClassResolution::NotFound => return Ok(None),
            resolution => resolution.into_result(name)?,
        };
        self.repository.class_info(&fqn)
    }

    fn skip(&self, target: &str, reason: &str) -> JobReport {
        self.log.record(RunEvent::Skipped {
            target: target.to_string(),
            reason: reason.to_string(),
        });
        let report = JobReport::skipped(target, reason);
        self.reports.insert(report.test_name.clone(), report.clone());
        report
    }

    // -------------------------------------------------------------------------
    // Scheduling
    // -------------------------------------------------------------------------

    async fn run_methods(&self, class: Arc<ClassInfo>, methods: Vec<MethodInfo>) -> (Vec<JobReport>, bool) {
        let units = methods
            .into_iter()
            .map(|method| {
                let label = format!("{}#{}", class.full_name(), method.name);
                (label, self.clone().method_unit(class.clone(), method))
            })
            .collect();
        self.run_units(self.method_threads, units).await
    }

    async fn class_unit(self, fqn: String) -> Vec<JobReport> {
        self.run_class_job(&fqn).await
    }

    async fn method_unit(self, class: Arc<ClassInfo>, method: MethodInfo) -> Vec<JobReport> {
        vec![self.execute(class, method).await]
    }

    async fn execute(&self, class: Arc<ClassInfo>, method: MethodInfo) -> JobReport {
        let report = MethodJob::new(self.ctx.clone(), class, method).run().await;
        self.reports.insert(report.test_name.clone(), report.clone());
        report
    }

    /// Run labelled units; returns their reports and whether the run was cancelled
    async fn run_units<F>(&self, threads: usize, units: Vec<(String, F)>) -> (Vec<JobReport>, bool)
    where
        F: Future<Output = Vec<JobReport>> + Send + 'static,
    {
        if units.is_empty() {
            return (Vec::new(), false);
        }
        if self.multithreading {
            self.run_pool(threads, units).await
        } else {
            self.run_sequential(units).await
        }
    }

    async fn run_sequential<F>(&self, units: Vec<(String, F)>) -> (Vec<JobReport>, bool)
    where
        F: Future<Output = Vec<JobReport>> + Send + 'static,
    {
        let total = units.len();
        let mut reports = Vec::new();
        for (done, (label, unit)) in units.into_iter().enumerate() {
            if self.cancel.is_cancelled() {
                self.log.record(RunEvent::Cancelled {
                    pending: total - done,
                });
                return (reports, true);
            }
            debug!("Running {}", label);
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    self.log.record(RunEvent::Cancelled { pending: total - done });
                    return (reports, true);
                }
                unit_reports = unit => reports.extend(unit_reports),
            }
        }
        (reports, false)
    }

    async fn run_pool<F>(&self, threads: usize, units: Vec<(String, F)>) -> (Vec<JobReport>, bool)
    where
        F: Future<Output = Vec<JobReport>> + Send + 'static,
    {
        let semaphore = Arc::new(Semaphore::new(threads.max(1)));
        let mut set = JoinSet::new();
        let mut labels = HashMap::new();

        for (label, unit) in units {
            let semaphore = semaphore.clone();
            let handle = set.spawn(async move {
                let _permit = semaphore.acquire_owned().await;
                unit.await
            });
            labels.insert(handle.id(), label);
        }
        debug!("Pool started: {} units on {} workers", labels.len(), threads);

        let mut reports = Vec::new();
        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    let pending = set.len();
                    set.abort_all();
                    while set.join_next().await.is_some() {}
                    self.log.record(RunEvent::Cancelled { pending });
                    return (reports, true);
                }
                next = set.join_next_with_id() => match next {
                    None => break,
                    Some(Ok((_, unit_reports))) => reports.extend(unit_reports),
                    Some(Err(e)) => {
                        let label = labels
                            .get(&e.id())
                            .cloned()
                            .unwrap_or_else(|| "unknown".to_string());
                        let message = if e.is_panic() { "job panicked" } else { "job aborted" };
                        self.log.record(RunEvent::JobError {
                            test: label.clone(),
                            error: message.to_string(),
                            category: None,
                        });
                        let report = JobReport::crashed(label, message);
                        self.reports.insert(report.test_name.clone(), report.clone());
                        reports.push(report);
                    }
                },
            }
        }
        (reports, false)
    }
}

/// All-digit selectors match a method id exactly; anything else matches
/// every overload with that name
pub fn select_methods<'a>(class: &'a ClassInfo, selector: &str) -> Vec<&'a MethodInfo> {
    if !selector.is_empty() && selector.chars().all(|c| c.is_ascii_digit()) {
        class.method_by_id(selector).into_iter().collect()
    } else {
        class.methods_named(selector)
    }
}
