//! Global Constants
//!
//! Centralized constants for configuration and tuning.
//! All magic numbers should be defined here with documentation.

/// Prompt construction constants
pub mod prompt {
    /// Maximum prompt size (estimated tokens) before a job is abandoned
    pub const DEFAULT_MAX_PROMPT_TOKENS: usize = 2600;

    /// Separator between tokens of a derived test class name
    pub const TEST_NAME_SEPARATOR: &str = "_";

    /// Suffix token of every derived test class name
    pub const TEST_NAME_SUFFIX: &str = "Test";

    /// Maximum characters of diagnostic text embedded in a repair prompt
    pub const MAX_ERROR_CHARS: usize = 4000;

    /// Maximum number of dependency briefs rendered into one prompt
    pub const MAX_DEPENDENCY_BRIEFS: usize = 8;
}

/// Repair loop constants
pub mod repair {
    /// Default maximum number of LLM repair rounds per job
    pub const DEFAULT_MAX_ROUNDS: u32 = 5;
}

/// Scheduling constants
pub mod scheduling {
    /// Default worker count when scheduling classes
    pub const DEFAULT_CLASS_THREADS: usize = 4;

    /// Default worker count when scheduling methods of one class
    pub const DEFAULT_METHOD_THREADS: usize = 2;
}

/// Toolchain constants
pub mod toolchain {
    /// Default Java compiler executable
    pub const DEFAULT_JAVAC: &str = "javac";

    /// Default Java launcher executable
    pub const DEFAULT_JAVA: &str = "java";

    /// Build output directory packaging value that disables generation
    pub const POM_PACKAGING: &str = "pom";
}

/// Filesystem layout constants
pub mod layout {
    /// Project data directory name
    pub const PROJECT_DIR: &str = ".unitforge";

    /// Class-name index file written by the structural extractor
    pub const CLASS_NAME_MAP: &str = "classNameMap.json";

    /// Sub-directory holding one ClassInfo JSON per class
    pub const CLASS_INFO_DIR: &str = "class";
}

/// HTTP/Network constants
pub mod network {
    /// Default request timeout (seconds)
    pub const DEFAULT_TIMEOUT_SECS: u64 = 300;
}
