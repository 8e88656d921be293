//! Invocation coaching: remembers repeated failed calls per (tool, input)
//! signature and turns a bare validation error into an escalating diagnostic.

pub mod analyzer;
pub mod composer;
pub mod signature;
pub mod store;

use serde_json::Value;

pub use analyzer::{Analysis, ExampleCatalog, PatternAnalyzer, PatternLabel};
pub use composer::{behavior_analysis_line, compose_message};
pub use signature::attempt_signature;
pub use store::{
    ATTEMPT_RESET_INTERVAL, AttemptRecord, AttemptResetTask, AttemptStore, spawn_reset_task,
};

/// Helper tool that lists tools and shows per-tool examples.
pub const DISCOVERY_TOOL: &str = "tool-examples";
/// Helper tool that validates parameters without executing.
pub const DRY_RUN_TOOL: &str = "validate-call";
/// How a well-formed call carries its arguments, as shown in corrected examples.
pub const STRUCTURED_PARAMETER_NOTATION: &str = "named parameter entries";

/// Result of coaching one validation failure.
#[derive(Clone, Debug)]
pub struct CoachedFailure {
    pub analysis: Analysis,
    /// Attempt count stored before this failure was recorded.
    pub prior_attempts: u32,
    pub detail: String,
}

#[derive(Clone, Debug)]
pub struct InvocationCoach {
    analyzer: PatternAnalyzer,
}

impl Default for InvocationCoach {
    fn default() -> Self {
        Self::new(AttemptStore::new(), ExampleCatalog::builtin())
    }
}

impl InvocationCoach {
    pub fn new(store: AttemptStore, examples: ExampleCatalog) -> Self {
        Self {
            analyzer: PatternAnalyzer::new(store, examples),
        }
    }

    pub fn store(&self) -> &AttemptStore {
        self.analyzer.store()
    }

    pub fn examples(&self) -> &ExampleCatalog {
        self.analyzer.examples()
    }

    /// Records the failed attempt and builds the detail text of the
    /// structured error.
    pub fn coach(&self, tool_name: &str, input: &Value, validation_error: &str) -> CoachedFailure {
        let signature = attempt_signature(tool_name, input);
        let prior_attempts = self
            .store()
            .get(&signature)
            .map(|record| record.count)
            .unwrap_or(0);

        let analysis = self
            .analyzer
            .analyze(tool_name, input, Some(validation_error));
        let mut detail = compose_message(validation_error, tool_name, &analysis);
        if let Some(line) = behavior_analysis_line(&analysis) {
            detail.push_str(&line);
        }

        CoachedFailure {
            analysis,
            prior_attempts,
            detail,
        }
    }
}
