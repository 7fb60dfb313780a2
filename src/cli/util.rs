//! CLI Common Utilities
//!
//! Shared configuration loading and engine wiring for CLI commands.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::ai::create_provider;
use crate::config::{Config, ConfigLoader};
use crate::index::FsClassRepository;
use crate::synthesis::{CancelToken, Orchestrator, TracingRunLog};
use crate::types::Result;
use crate::validation::JavaToolchain;

/// Command-line values that win over every config layer
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub threads: Option<usize>,
    pub max_rounds: Option<u32>,
    pub no_deps: bool,
    pub sequential: bool,
}

impl Overrides {
    pub fn apply(&self, config: &mut Config) {
        if let Some(threads) = self.threads {
            config.concurrency.class_threads = threads;
            config.concurrency.method_threads = threads;
        }
        if let Some(max_rounds) = self.max_rounds {
            config.generation.max_rounds = max_rounds;
        }
        if self.no_deps {
            config.generation.include_dependencies = false;
        }
        if self.sequential {
            config.concurrency.enable_multithreading = false;
        }
    }
}

/// Command execution context
#[derive(Clone)]
pub struct CommandContext {
    /// Loaded configuration, overrides applied
    pub config: Config,
    /// Explicit `--config` path, if any
    pub config_path: Option<PathBuf>,
}

impl CommandContext {
    /// Load the layered config, apply CLI overrides, validate the result
    pub fn load(config_path: Option<&Path>, overrides: &Overrides) -> Result<Self> {
        let mut config = ConfigLoader::load_with(config_path)?;
        overrides.apply(&mut config);
        config.validate()?;

        Ok(Self {
            config,
            config_path: config_path.map(Path::to_path_buf),
        })
    }

    /// Wire repository, provider and toolchain into an orchestrator
    pub fn orchestrator(&self, cancel: CancelToken) -> Result<Orchestrator> {
        let parse_dir = self.config.resolve(&self.config.project.parse_dir);
        let repository = Arc::new(FsClassRepository::open(&parse_dir)?);
        let provider = create_provider(&self.config.provider_config())?;
        let toolchain = Arc::new(JavaToolchain::from_config(&self.config));

        Ok(Orchestrator::new(
            &self.config,
            repository,
            provider,
            toolchain,
            Arc::new(TracingRunLog),
            cancel,
        ))
    }
}
