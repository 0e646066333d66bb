use std::path::Path;

use anyhow::Context;
use gem_core::InstrumentationConfig;
use serde::{Deserialize, Serialize};

use crate::cli::SelfcheckArgs;

/// Parameters of `gem selfcheck`.
///
/// ```toml
/// threads = 8
/// iterations = 5000
///
/// [instrumentation]
/// trace_lifetime = false
/// strict = true
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelfCheckConfig {
    /// Worker threads in the concurrency scenario.
    pub threads: usize,
    /// Acquire/query/release rounds per worker.
    pub iterations: usize,
    pub instrumentation: InstrumentationConfig,
}

impl Default for SelfCheckConfig {
    fn default() -> Self {
        Self {
            threads: 4,
            iterations: 1_000,
            instrumentation: InstrumentationConfig::default(),
        }
    }
}

impl SelfCheckConfig {
    /// Load from a TOML file. Missing keys take their defaults.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config: Self = toml::from_str(&text)
            .with_context(|| format!("parsing {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// The file at `path` (or the defaults), with `args` applied on top.
    pub fn resolve(path: Option<&Path>, args: &SelfcheckArgs) -> anyhow::Result<Self> {
        let base = match path {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        base.with_overrides(args)
    }

    /// Apply command-line overrides on top of the loaded values.
    pub fn with_overrides(mut self, args: &SelfcheckArgs) -> anyhow::Result<Self> {
        if let Some(threads) = args.threads {
            self.threads = threads;
        }
        if let Some(iterations) = args.iterations {
            self.iterations = iterations;
        }
        self.instrumentation.trace_lifetime |= args.trace;
        self.instrumentation.strict |= args.strict;
        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(self.threads > 0, "threads must be at least 1");
        anyhow::ensure!(self.iterations > 0, "iterations must be at least 1");
        Ok(())
    }
}
