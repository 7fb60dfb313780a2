//! Configuration Types
//!
//! All configuration structures with sensible defaults.
//! Supports global (~/.config/unitforge/) and project (.unitforge/) level configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::ai::provider::ProviderConfig;
use crate::constants::{network, prompt, repair, scheduling, toolchain};
use crate::types::{ForgeError, Result};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Configuration version
    pub version: String,

    /// Project under test
    pub project: ProjectConfig,

    /// LLM provider settings
    pub llm: LlmConfig,

    /// Prompt and repair-loop settings
    pub generation: GenerationConfig,

    /// Worker pool settings
    pub concurrency: ConcurrencyConfig,

    /// Where generated artifacts land
    pub output: OutputConfig,

    /// Java toolchain executables
    pub toolchain: ToolchainConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            project: ProjectConfig::default(),
            llm: LlmConfig::default(),
            generation: GenerationConfig::default(),
            concurrency: ConcurrencyConfig::default(),
            output: OutputConfig::default(),
            toolchain: ToolchainConfig::default(),
        }
    }
}

impl Config {
    /// Validate configuration values are within acceptable ranges.
    /// Returns `ForgeError::Config` on validation failure.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(ForgeError::Config(format!(
                "LLM temperature must be between 0.0 and 2.0, got {}",
                self.llm.temperature
            )));
        }

        if self.llm.timeout_secs == 0 {
            return Err(ForgeError::Config(
                "LLM timeout_secs must be greater than 0".to_string(),
            ));
        }

        if let Some(base) = &self.llm.api_base {
            let url = url::Url::parse(base).map_err(|e| {
                ForgeError::Config(format!("Invalid llm.api_base '{}': {}", base, e))
            })?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(ForgeError::Config(format!(
                    "llm.api_base must use http or https, got: {}",
                    url.scheme()
                )));
            }
        }

        if self.generation.max_prompt_tokens == 0 {
            return Err(ForgeError::Config(
                "generation.max_prompt_tokens must be greater than 0".to_string(),
            ));
        }

        if self.generation.max_rounds == 0 {
            return Err(ForgeError::Config(
                "generation.max_rounds must be greater than 0".to_string(),
            ));
        }

        if self.concurrency.class_threads == 0 || self.concurrency.method_threads == 0 {
            return Err(ForgeError::Config(
                "concurrency thread counts must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Resolve a project-relative path against `project.root`
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.project.root.join(path)
        }
    }

    /// Absolute build output directory
    pub fn build_dir(&self) -> PathBuf {
        self.resolve(&self.project.build_dir)
    }

    /// Provider settings for `create_provider`
    pub fn provider_config(&self) -> ProviderConfig {
        ProviderConfig {
            provider: self.llm.provider.clone(),
            model: self.llm.model.clone(),
            timeout_secs: self.llm.timeout_secs,
            temperature: self.llm.temperature,
            api_key: self.llm.api_key.clone(),
            api_base: self.llm.api_base.clone(),
            max_tokens: self.llm.max_tokens,
        }
    }
}

// =============================================================================
// Project Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// Project root directory
    pub root: PathBuf,

    /// Compiled classes of the project (must exist before a run)
    pub build_dir: PathBuf,

    /// Dependency classpath entries
    pub classpath: Vec<PathBuf>,

    /// Build packaging; `pom` projects are skipped
    pub packaging: String,

    /// Structural extractor output (`class/**/*.json`, `classNameMap.json`)
    pub parse_dir: PathBuf,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            build_dir: PathBuf::from("target/classes"),
            classpath: Vec::new(),
            packaging: "jar".to_string(),
            parse_dir: PathBuf::from(".unitforge/parse"),
        }
    }
}

// =============================================================================
// LLM Configuration
// =============================================================================

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider name: "openai" or "ollama"
    pub provider: String,

    /// Model name (provider default when absent)
    pub model: Option<String>,

    /// Custom endpoint
    pub api_base: Option<String>,

    /// Never written back out
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Temperature for generation (0.0 = deterministic)
    pub temperature: f32,

    /// Maximum tokens to generate per reply
    pub max_tokens: usize,
}

impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("api_base", &self.api_base)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("timeout_secs", &self.timeout_secs)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: None,
            api_base: None,
            api_key: None,
            timeout_secs: network::DEFAULT_TIMEOUT_SECS,
            temperature: 0.5,
            max_tokens: 2048,
        }
    }
}

// =============================================================================
// Generation Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Prompt size ceiling in estimated tokens
    pub max_prompt_tokens: usize,

    /// Maximum LLM repair rounds per job
    pub max_rounds: u32,

    /// Render briefs of dependent classes into the prompt
    pub include_dependencies: bool,

    /// Diagnostic text is truncated to this many characters in repair prompts
    pub max_error_chars: usize,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_prompt_tokens: prompt::DEFAULT_MAX_PROMPT_TOKENS,
            max_rounds: repair::DEFAULT_MAX_ROUNDS,
            include_dependencies: true,
            max_error_chars: prompt::MAX_ERROR_CHARS,
        }
    }
}

// =============================================================================
// Concurrency Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConcurrencyConfig {
    /// Run jobs on a worker pool instead of one after another
    pub enable_multithreading: bool,

    /// Pool size when scheduling classes
    pub class_threads: usize,

    /// Pool size when scheduling methods of one class
    pub method_threads: usize,
}

impl Default for ConcurrencyConfig {
    fn default() -> Self {
        Self {
            enable_multithreading: true,
            class_threads: scheduling::DEFAULT_CLASS_THREADS,
            method_threads: scheduling::DEFAULT_METHOD_THREADS,
        }
    }
}

// =============================================================================
// Output Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Generated test sources root
    pub tests_dir: PathBuf,

    /// Round record JSONL files
    pub records_dir: PathBuf,

    /// Compiled test classes
    pub compile_dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            tests_dir: PathBuf::from(".unitforge/tests"),
            records_dir: PathBuf::from(".unitforge/records"),
            compile_dir: PathBuf::from(".unitforge/test-classes"),
        }
    }
}

// =============================================================================
// Toolchain Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolchainConfig {
    pub javac: String,
    pub java: String,

    /// JUnit Platform console launcher (standalone jar)
    pub junit_launcher_jar: Option<PathBuf>,
}

impl Default for ToolchainConfig {
    fn default() -> Self {
        Self {
            javac: toolchain::DEFAULT_JAVAC.to_string(),
            java: toolchain::DEFAULT_JAVA.to_string(),
            junit_launcher_jar: None,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.version, "1.0");
        assert_eq!(config.llm.provider, "openai");
        assert_eq!(config.generation.max_prompt_tokens, 2600);
        assert_eq!(config.generation.max_rounds, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_limits() {
        let mut config = Config::default();
        config.generation.max_rounds = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.concurrency.method_threads = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.generation.max_prompt_tokens = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_provider_settings() {
        let mut config = Config::default();
        config.llm.temperature = 3.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.llm.api_base = Some("file:///etc/passwd".to_string());
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.llm.api_base = Some("not a url".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_api_key_redacted_and_not_serialized() {
        let mut config = Config::default();
        config.llm.api_key = Some("sk-secret".to_string());

        let debug = format!("{:?}", config.llm);
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("[REDACTED]"));

        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("sk-secret"));
    }

    #[test]
    fn test_resolve_relative_to_root() {
        let mut config = Config::default();
        config.project.root = PathBuf::from("/work/app");
        assert_eq!(config.build_dir(), PathBuf::from("/work/app/target/classes"));
        assert_eq!(
            config.resolve(Path::new("/abs/dir")),
            PathBuf::from("/abs/dir")
        );
    }
}
