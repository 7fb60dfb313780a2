//! Candidate Validation
//!
//! Syntax (tree-sitter), compile (`javac`) and runtime (JUnit console
//! launcher) checks for generated test classes.

pub mod syntax;
pub mod toolchain;
pub mod validator;

pub use syntax::{check_syntax, parse_java};
pub use toolchain::{CompileOutcome, JavaToolchain, TestSummary, Toolchain, parse_launcher_summary};
pub use validator::{Stage, ValidationOutcome, Validator};
