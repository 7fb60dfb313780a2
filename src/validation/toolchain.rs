//! Java Toolchain
//!
//! Compiles candidate test sources with `javac` and runs them with the JUnit
//! Platform console launcher. Both are external processes driven through
//! `tokio::process`.
//!
//! ## Design
//!
//! - The build output directory and dependency classpath are shared read-only
//! - Every compile writes to a path derived from the unique test name
//! - No timeouts: a hung test blocks only its own job

use async_trait::async_trait;
use regex::Regex;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::LazyLock;
use tokio::process::Command;
use tracing::debug;

use crate::config::Config;
use crate::types::{ForgeError, Result, TestName};

const CONSOLE_LAUNCHER_MAIN: &str = "org.junit.platform.console.ConsoleLauncher";

// =============================================================================
// Outcomes
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileOutcome {
    Success,
    /// Compiler output for the failing unit
    Diagnostics(String),
}

/// Execution summary reported by the test framework
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestSummary {
    pub found: u32,
    pub passed: u32,
    pub failed: u32,
    /// Containers (classes) that failed during discovery or setup
    pub errored: u32,
    /// Launcher output, kept for repair prompts
    pub report: String,
}

impl TestSummary {
    /// Failed count as the runtime stage sees it.
    ///
    /// A run that found no tests counts as one failure.
    pub fn failures(&self) -> u32 {
        let failures = self.failed + self.errored;
        if self.found == 0 { failures.max(1) } else { failures }
    }

    pub fn is_passing(&self) -> bool {
        self.failures() == 0
    }
}

// =============================================================================
// Toolchain Trait
// =============================================================================

#[async_trait]
pub trait Toolchain: Send + Sync {
    /// Write `source` under `output_dir/<package path>/` and compile it
    async fn compile(
        &self,
        source: &str,
        test: &TestName,
        output_dir: &Path,
    ) -> Result<CompileOutcome>;

    /// Run the compiled test class
    async fn execute(&self, test: &TestName) -> Result<TestSummary>;
}

// =============================================================================
// Java Toolchain
// =============================================================================

#[derive(Debug, Clone)]
pub struct JavaToolchain {
    javac: String,
    java: String,
    launcher_jar: Option<PathBuf>,
    build_dir: PathBuf,
    classpath: Vec<PathBuf>,
    compile_dir: PathBuf,
}

impl JavaToolchain {
    pub fn new(
        javac: impl Into<String>,
        java: impl Into<String>,
        build_dir: PathBuf,
        classpath: Vec<PathBuf>,
        compile_dir: PathBuf,
    ) -> Self {
        Self {
            javac: javac.into(),
            java: java.into(),
            launcher_jar: None,
            build_dir,
            classpath,
            compile_dir,
        }
    }

    pub fn with_launcher(mut self, jar: PathBuf) -> Self {
        self.launcher_jar = Some(jar);
        self
    }

    pub fn from_config(config: &Config) -> Self {
        let classpath = config
            .project
            .classpath
            .iter()
            .map(|p| config.resolve(p))
            .collect();
        let toolchain = Self::new(
            &config.toolchain.javac,
            &config.toolchain.java,
            config.build_dir(),
            classpath,
            config.resolve(&config.output.compile_dir),
        );
        match &config.toolchain.junit_launcher_jar {
            Some(jar) => toolchain.with_launcher(config.resolve(jar)),
            None => toolchain,
        }
    }

    /// Build output plus dependencies, for compilation
    fn compile_classpath(&self) -> Result<OsString> {
        let entries = std::iter::once(&self.build_dir).chain(self.classpath.iter());
        std::env::join_paths(entries)
            .map_err(|e| ForgeError::toolchain(&self.javac, format!("Invalid classpath: {}", e)))
    }

    /// Compiled tests first, then build output and dependencies
    fn runtime_classpath(&self) -> Result<OsString> {
        let entries = [&self.compile_dir, &self.build_dir]
            .into_iter()
            .chain(self.classpath.iter());
        std::env::join_paths(entries)
            .map_err(|e| ForgeError::toolchain(&self.java, format!("Invalid classpath: {}", e)))
    }

    async fn run(&self, mut cmd: Command, tool: &str) -> Result<std::process::Output> {
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = cmd.spawn().map_err(|e| {
            ForgeError::toolchain(tool, format!("Failed to spawn {}: {}. Is it installed?", tool, e))
        })?;

        child
            .wait_with_output()
            .await
            .map_err(|e| ForgeError::toolchain(tool, format!("Execution failed: {}", e)))
    }
}

#[async_trait]
impl Toolchain for JavaToolchain {
    async fn compile(
        &self,
        source: &str,
        test: &TestName,
        output_dir: &Path,
    ) -> Result<CompileOutcome> {
        let source_path = output_dir.join(test.source_path());
        if let Some(parent) = source_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&source_path, source).await?;
        tokio::fs::create_dir_all(&self.compile_dir).await?;

        debug!("Compiling {} -> {}", source_path.display(), self.compile_dir.display());

        let mut cmd = Command::new(&self.javac);
        cmd.arg("-d")
            .arg(&self.compile_dir)
            .arg("-cp")
            .arg(self.compile_classpath()?)
            .arg("-encoding")
            .arg("UTF-8")
            .arg(&source_path);

        let output = self.run(cmd, &self.javac).await?;
        if output.status.success() {
            return Ok(CompileOutcome::Success);
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let stdout = String::from_utf8_lossy(&output.stdout);
        let diagnostics = format!("{}{}", stdout, stderr).trim().to_string();
        Ok(CompileOutcome::Diagnostics(if diagnostics.is_empty() {
            "javac exited with non-zero status".to_string()
        } else {
            diagnostics
        }))
    }

    async fn execute(&self, test: &TestName) -> Result<TestSummary> {
        let mut cmd = Command::new(&self.java);
        match &self.launcher_jar {
            Some(jar) => {
                cmd.arg("-jar").arg(jar);
            }
            None => {
                cmd.arg("-cp").arg(self.runtime_classpath()?).arg(CONSOLE_LAUNCHER_MAIN);
            }
        }
        cmd.arg("--class-path")
            .arg(self.runtime_classpath()?)
            .arg("--select-class")
            .arg(test.full_name())
            .arg("--disable-banner")
            .arg("--details=summary");

        debug!("Executing {}", test);

        let output = self.run(cmd, &self.java).await?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        Ok(parse_launcher_summary(&stdout, &stderr))
    }
}

// =============================================================================
// Output Parsing
// =============================================================================

static SUMMARY_LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[\s*(\d+)\s+(tests|containers)\s+(found|successful|failed)\s*\]")
        .expect("SUMMARY_LINE_RE regex should compile")
});

/// Parse the JUnit console launcher summary table.
///
/// ```text
/// [         3 tests found           ]
/// [         2 tests successful      ]
/// [         1 tests failed          ]
/// ```
pub fn parse_launcher_summary(stdout: &str, stderr: &str) -> TestSummary {
    let combined = format!("{}\n{}", stdout, stderr);
    let mut summary = TestSummary::default();

    for caps in SUMMARY_LINE_RE.captures_iter(&combined) {
        let Ok(count) = caps[1].parse::<u32>() else {
            continue;
        };
        match (&caps[2], &caps[3]) {
            ("tests", "found") => summary.found = count,
            ("tests", "successful") => summary.passed = count,
            ("tests", "failed") => summary.failed = count,
            ("containers", "failed") => summary.errored = count,
            _ => {}
        }
    }

    summary.report = combined.trim().to_string();
    summary
}

// =============================================================================
// Fake Toolchain (tests)
// =============================================================================


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_passing_summary() {
        let stdout = r#"
Test run finished after 64 ms
[         2 containers found      ]
[         0 containers skipped    ]
[         2 containers started    ]
[         0 containers aborted    ]
[         2 containers successful ]
[         0 containers failed     ]
[         3 tests found           ]
[         0 tests skipped         ]
[         3 tests started         ]
[         0 tests aborted         ]
[         3 tests successful      ]
[         0 tests failed          ]
"#;
        let summary = parse_launcher_summary(stdout, "");
        assert_eq!(summary.found, 3);
        assert_eq!(summary.passed, 3);
        assert_eq!(summary.failed, 0);
        assert_eq!(summary.errored, 0);
        assert!(summary.is_passing());
    }

    #[test]
    fn test_parse_failing_summary() {
        let stdout = "[         2 tests found           ]\n[         1 tests successful      ]\n[         1 tests failed          ]\n";
        let summary = parse_launcher_summary(stdout, "");
        assert_eq!(summary.failures(), 1);
        assert!(!summary.is_passing());
    }

    #[test]
    fn test_zero_tests_found_counts_as_failed() {
        let stdout = "[         1 containers failed     ]\n[         0 tests found           ]\n";
        let summary = parse_launcher_summary(stdout, "");
        assert_eq!(summary.found, 0);
        assert!(summary.failures() >= 1);

        let nothing = parse_launcher_summary("", "Error: Could not find or load main class");
        assert_eq!(nothing.failures(), 1);
        assert!(nothing.report.contains("Could not find"));
    }

    #[test]
    fn test_classpath_order() {
        let toolchain = JavaToolchain::new(
            "javac",
            "java",
            PathBuf::from("/p/target/classes"),
            vec![PathBuf::from("/libs/junit.jar")],
            PathBuf::from("/p/.unitforge/test-classes"),
        );
        let cp = toolchain.runtime_classpath().unwrap();
        let entries: Vec<PathBuf> = std::env::split_paths(&cp).collect();
        assert_eq!(
            entries,
            vec![
                PathBuf::from("/p/.unitforge/test-classes"),
                PathBuf::from("/p/target/classes"),
                PathBuf::from("/libs/junit.jar"),
            ]
        );
    }

    #[tokio::test]
    async fn test_missing_compiler_is_toolchain_error() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let toolchain = JavaToolchain::new(
            "unitforge-no-such-javac",
            "java",
            temp_dir.path().join("classes"),
            vec![],
            temp_dir.path().join("out"),
        );
        let test = TestName::new("com.x", "Calc_add_Test");

        let err = toolchain
            .compile("class A {}", &test, temp_dir.path())
            .await
            .unwrap_err();
        assert!(matches!(err, ForgeError::Toolchain { .. }));
        assert!(temp_dir.path().join("com/x/Calc_add_Test.java").exists());
    }
}
