use std::collections::BTreeMap;

use serde_json::{Map, Value, json};

use super::signature::attempt_signature;
use super::store::AttemptStore;
use super::{DISCOVERY_TOOL, STRUCTURED_PARAMETER_NOTATION};

/// Same-signature attempts needed before a repeat counts as a pattern.
const REPEATED_SYNTAX_MIN_ATTEMPTS: u32 = 3;
/// Topic-matching error messages needed before escalating.
const IGNORED_ERROR_MIN_MATCHES: usize = 3;
const IGNORED_ERROR_TOPICS: [&str; 2] = ["parameter", "syntax"];

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PatternLabel {
    RepeatedSameSyntax,
    MissingRequiredParams,
    WrongParameterFormat,
    IgnoringErrorMessages,
}

impl PatternLabel {
    pub fn as_str(self) -> &'static str {
        match self {
            PatternLabel::RepeatedSameSyntax => "repeated_same_syntax",
            PatternLabel::MissingRequiredParams => "missing_required_params",
            PatternLabel::WrongParameterFormat => "wrong_parameter_format",
            PatternLabel::IgnoringErrorMessages => "ignoring_error_messages",
        }
    }

    pub fn suggestion(self) -> String {
        match self {
            PatternLabel::RepeatedSameSyntax => format!(
                "PATTERN DETECTED: you are repeating the same call. Look up a working example first with {DISCOVERY_TOOL}."
            ),
            PatternLabel::MissingRequiredParams => {
                "AUTO-CORRECTION: the call carried no parameters. The expected format with required parameters follows."
                    .to_string()
            }
            PatternLabel::WrongParameterFormat => format!(
                "FORMAT ERROR: pass arguments as {STRUCTURED_PARAMETER_NOTATION}, not function-call syntax."
            ),
            PatternLabel::IgnoringErrorMessages => {
                "ESCALATION: the same kind of error keeps coming back. Switching to guided mode."
                    .to_string()
            }
        }
    }
}

/// Minimal valid payloads per tool, used for corrected examples and by the
/// discovery helper. Extend with [`ExampleCatalog::with_example`].
#[derive(Clone, Debug)]
pub struct ExampleCatalog {
    examples: BTreeMap<String, Value>,
    fallback: Value,
}

impl Default for ExampleCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ExampleCatalog {
    pub fn empty() -> Self {
        Self {
            examples: BTreeMap::new(),
            fallback: json!({ "name": "example-value" }),
        }
    }

    pub fn builtin() -> Self {
        Self::empty()
            .with_example("project-create", json!({ "name": "my-project" }))
            .with_example(
                "application-create",
                json!({ "name": "my-app", "projectId": "abc123xyz" }),
            )
            .with_example(
                "compose-create",
                json!({ "name": "my-stack", "projectId": "abc123xyz" }),
            )
            .with_example("compose-deploy", json!({ "composeId": "cmp123xyz" }))
            .with_example(
                "postgres-create",
                json!({
                    "name": "my-postgres",
                    "appName": "postgres-app",
                    "databaseName": "mydb",
                    "databaseUser": "user",
                    "databasePassword": "password",
                    "projectId": "abc123xyz"
                }),
            )
            .with_example(
                "mysql-create",
                json!({
                    "name": "my-mysql",
                    "appName": "mysql-app",
                    "databaseName": "mydb",
                    "databaseUser": "user",
                    "databasePassword": "password",
                    "databaseRootPassword": "rootpass",
                    "projectId": "abc123xyz"
                }),
            )
            .with_example(
                "dokploy_database",
                json!({
                    "databaseType": "postgres",
                    "action": "get",
                    "params": { "postgresId": "pg123xyz" }
                }),
            )
    }

    pub fn with_example(mut self, tool_name: impl Into<String>, example: Value) -> Self {
        self.examples.insert(tool_name.into(), example);
        self
    }

    pub fn get(&self, tool_name: &str) -> Option<&Value> {
        self.examples.get(tool_name)
    }

    /// Example for `tool_name`, or the generic placeholder for unknown tools.
    pub fn example_for(&self, tool_name: &str) -> &Value {
        self.get(tool_name).unwrap_or(&self.fallback)
    }
}

/// Outcome of analysing one attempt.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Analysis {
    pub patterns: Vec<PatternLabel>,
    pub suggestions: Vec<String>,
    pub corrected_example: Option<Map<String, Value>>,
    pub escalation_needed: bool,
    /// Attempt count for the signature, including this attempt.
    pub attempt: u32,
}

impl Analysis {
    pub fn pattern_names(&self) -> Vec<&'static str> {
        self.patterns.iter().map(|p| p.as_str()).collect()
    }
}

#[derive(Clone, Debug)]
pub struct PatternAnalyzer {
    store: AttemptStore,
    examples: ExampleCatalog,
}

impl PatternAnalyzer {
    pub fn new(store: AttemptStore, examples: ExampleCatalog) -> Self {
        Self { store, examples }
    }

    pub fn store(&self) -> &AttemptStore {
        &self.store
    }

    pub fn examples(&self) -> &ExampleCatalog {
        &self.examples
    }

    /// Records the attempt and runs every detection rule against it.
    /// Rules are independent; labels come back in rule order.
    pub fn analyze(&self, tool_name: &str, input: &Value, error_message: Option<&str>) -> Analysis {
        let signature = attempt_signature(tool_name, input);
        self.store.upsert(&signature, |record, now| {
            let previous_input = record.last_input.take();
            record.count = record.count.saturating_add(1);
            record.last_input = Some(input.clone());
            record.last_attempt = now;
            if let Some(message) = error_message {
                record.error_messages.push(message.to_string());
            }

            let mut analysis = Analysis {
                attempt: record.count,
                ..Analysis::default()
            };

            // Only the immediately previous input is compared: alternating
            // between two bad payloads never trips this rule.
            if record.count >= REPEATED_SYNTAX_MIN_ATTEMPTS
                && previous_input.as_ref() == Some(input)
            {
                analysis.patterns.push(PatternLabel::RepeatedSameSyntax);
            }

            if is_empty_input(input) {
                analysis.patterns.push(PatternLabel::MissingRequiredParams);
                analysis.corrected_example = Some(example_object(self.examples.example_for(tool_name)));
            }

            if looks_like_call_syntax(input) {
                analysis.patterns.push(PatternLabel::WrongParameterFormat);
            }

            let topic_matches = record
                .error_messages
                .iter()
                .filter(|message| mentions_parameter_topic(message))
                .count();
            if topic_matches >= IGNORED_ERROR_MIN_MATCHES {
                analysis.patterns.push(PatternLabel::IgnoringErrorMessages);
                analysis.escalation_needed = true;
            }

            analysis.suggestions = analysis.patterns.iter().map(|p| p.suggestion()).collect();
            record.patterns.extend(analysis.patterns.iter().copied());
            analysis
        })
    }
}

fn is_empty_input(input: &Value) -> bool {
    match input {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::String(text) => text.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

/// `name(value)`-style input: parentheses present, no quoting at all.
fn looks_like_call_syntax(input: &Value) -> bool {
    let text = match input {
        Value::String(raw) => raw.clone(),
        other => serde_json::to_string(other).unwrap_or_default(),
    };
    text.contains('(') && text.contains(')') && !text.contains('"') && !text.contains('\'')
}

fn mentions_parameter_topic(message: &str) -> bool {
    let lowered = message.to_ascii_lowercase();
    IGNORED_ERROR_TOPICS
        .iter()
        .any(|topic| lowered.contains(topic))
}

fn example_object(example: &Value) -> Map<String, Value> {
    match example {
        Value::Object(map) => map.clone(),
        other => {
            let mut map = Map::new();
            map.insert("value".to_string(), other.clone());
            map
        }
    }
}
