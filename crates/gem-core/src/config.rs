use std::sync::OnceLock;

use gem_types::{GemError, GemResult, ResultCode};
use serde::{Deserialize, Serialize};

/// Process-wide instrumentation of the lifetime protocol.
///
/// Installed at most once, typically by the host binary at startup. Until
/// then [`current`] returns the default (quiet, non-strict) configuration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstrumentationConfig {
    /// Emit a `trace` event for every acquire and release.
    pub trace_lifetime: bool,
    /// Panic on reference-counting discipline violations in every build,
    /// not only when debug assertions are enabled.
    pub strict: bool,
}

impl InstrumentationConfig {
    /// Tracing of every count transition plus strict violation checks.
    pub fn diagnostic() -> Self {
        Self {
            trace_lifetime: true,
            strict: true,
        }
    }
}

static INSTALLED: OnceLock<InstrumentationConfig> = OnceLock::new();

/// Install the process-wide configuration.
///
/// Fails with [`ResultCode::UNAVAILABLE`] if a configuration is already
/// installed.
pub fn install(config: InstrumentationConfig) -> GemResult<()> {
    INSTALLED.set(config).map_err(|_| {
        GemError::context(
            ResultCode::UNAVAILABLE,
            "instrumentation is already installed",
        )
    })?;
    tracing::debug!(
        trace_lifetime = config.trace_lifetime,
        strict = config.strict,
        "instrumentation installed"
    );
    Ok(())
}

/// The installed configuration, or the default.
pub fn current() -> InstrumentationConfig {
    INSTALLED.get().copied().unwrap_or_default()
}
