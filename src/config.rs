//! TOML configuration for the expression interpreter.
//!
//! Loaded from --config (missing file means defaults). CLI flags override
//! file values.

use serde::{Deserialize, Serialize};
use std::path::Path;

use tracing::warn;

use crate::vm::interpreter::{Limits, DEFAULT_MAX_CALL_DEPTH, DEFAULT_STACK_LIMIT, MAX_CALL_DEPTH};

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct InterpreterConfig {
    #[serde(default)]
    pub limits: LimitsSection,
    #[serde(default)]
    pub gas: GasSection,
    #[serde(default)]
    pub observability: ObservabilitySection,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LimitsSection {
    /// Words per stack frame
    pub max_stack:      usize,
    /// Nested frames opened by call / loop-n / do-while; capped at
    /// [`MAX_CALL_DEPTH`]
    pub max_call_depth: usize,
}

impl Default for LimitsSection {
    fn default() -> Self {
        Self { max_stack: DEFAULT_STACK_LIMIT, max_call_depth: DEFAULT_MAX_CALL_DEPTH }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GasSection {
    /// Gas available to one top-level evaluation
    pub limit: u64,
}

impl Default for GasSection {
    fn default() -> Self {
        Self { limit: 10_000_000 }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DebugSinkKind {
    #[default]
    Tracing,
    None,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ObservabilitySection {
    pub log_level:  String,
    /// Where `debug` ops go: "tracing" | "none"
    pub debug_sink: DebugSinkKind,
}

impl Default for ObservabilitySection {
    fn default() -> Self {
        Self { log_level: "info".into(), debug_sink: DebugSinkKind::Tracing }
    }
}

impl InterpreterConfig {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        if !Path::new(path).exists() {
            return Ok(Self::default());
        }
        let s = std::fs::read_to_string(path)?;
        let cfg: InterpreterConfig = toml::from_str(&s)?;
        if cfg.limits.max_call_depth > MAX_CALL_DEPTH {
            warn!(
                configured = cfg.limits.max_call_depth,
                cap = MAX_CALL_DEPTH,
                "max_call_depth above hard cap, clamping"
            );
        }
        Ok(cfg)
    }

    pub fn limits(&self) -> Limits {
        Limits { max_stack: self.limits.max_stack, max_call_depth: self.limits.max_call_depth }.clamped()
    }

    pub fn example_toml() -> &'static str {
        r#"# IONA expression interpreter configuration
# All values shown are defaults.

[limits]
max_stack      = 1024   # words per stack frame
max_call_depth = 32     # nested call / loop-n / do-while frames (max 128)

[gas]
limit = 10000000        # per top-level evaluation; the only bound on do-while

[observability]
log_level  = "info"     # trace | debug | info | warn | error
debug_sink = "tracing"  # tracing | none
"#
    }
}
