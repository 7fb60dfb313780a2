//! Test Synthesis & Repair Engine
//!
//! ```text
//! Orchestrator ──► MethodJob ──► PromptConstructor ──► Generator
//!                      │                                   │
//!                      └──── Validator ◄──── Repair ◄──────┘
//! ```

pub mod generator;
pub mod job;
pub mod log;
pub mod orchestrator;
pub mod prompt;
pub mod record;
pub mod repair;

pub use generator::Generator;
pub use job::{JobContext, JobReport, JobSettings, JobStatus, MethodJob};
pub use log::{RunEvent, RunLog, SharedRunLog, TracingRunLog};
pub use orchestrator::{CancelHandle, CancelToken, Orchestrator, RunSummary, cancel_pair, select_methods};
pub use prompt::{PromptConstructor, PromptInfo};
pub use record::{RecordWriter, RoundRecord};
pub use repair::{Repair, RepairStep, rule_based_repair};
