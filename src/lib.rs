//! unitforge - LLM-Driven Unit Test Synthesis
//!
//! Generates JUnit tests for methods of a pre-built Java project, then
//! validates and repairs them until they compile and pass or a round budget
//! runs out.
//!
//! ## Core Features
//!
//! - **Staged Validation**: tree-sitter syntax check, `javac`, JUnit console launcher
//! - **Bounded Repair**: rule-based fixups plus re-prompting with diagnostics
//! - **Prompt Budget**: jobs whose prompt outgrows the ceiling are abandoned
//! - **Worker Pool**: per-job isolation with cancellation
//!
//! ## Quick Start
//!
//! ```ignore
//! use unitforge::{ConfigLoader, Orchestrator, TracingRunLog, cancel_pair};
//!
//! let config = ConfigLoader::load()?;
//! let (_handle, token) = cancel_pair();
//! let orchestrator = Orchestrator::new(
//!     &config,
//!     Arc::new(FsClassRepository::open(&parse_dir)?),
//!     create_provider(&config.provider_config())?,
//!     Arc::new(JavaToolchain::from_config(&config)),
//!     Arc::new(TracingRunLog),
//!     token,
//! );
//! let summary = orchestrator.run_class("Calc").await?;
//! ```
//!
//! ## Modules
//!
//! - [`ai`]: completion providers, prompt rendering, size estimation
//! - [`index`]: read access to the structural extractor's output
//! - [`validation`]: syntax, compile and runtime stages
//! - [`synthesis`]: prompt construction, repair loop, orchestration
//! - [`config`]: layered configuration

pub mod ai;
pub mod cli;
pub mod config;
pub mod constants;
pub mod index;
pub mod synthesis;
pub mod types;
pub mod validation;

// =============================================================================
// Core Re-exports
// =============================================================================

pub use config::{Config, ConfigLoader};
pub use types::{ClassInfo, ErrorCategory, ForgeError, MethodInfo, Result, TestName};

// =============================================================================
// Engine Re-exports
// =============================================================================

pub use ai::{CompletionProvider, Message, Role, SharedProvider, TokenBudget, create_provider};
pub use index::{ClassRepository, ClassResolution, FsClassRepository, SharedRepository};
pub use synthesis::{
    CancelHandle, CancelToken, Generator, JobReport, JobStatus, Orchestrator, PromptConstructor,
    RunEvent, RunLog, RunSummary, TracingRunLog, cancel_pair, rule_based_repair,
};
pub use validation::{JavaToolchain, Stage, Toolchain, ValidationOutcome, Validator};
