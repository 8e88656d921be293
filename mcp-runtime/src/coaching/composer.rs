use serde_json::{Map, Value};

use super::analyzer::Analysis;
use super::{DISCOVERY_TOOL, DRY_RUN_TOOL, STRUCTURED_PARAMETER_NOTATION};

/// Renders the coached diagnostic for one failed validation.
///
/// Sections, in order: the validation error, one suggestion per pattern, the
/// corrected example, the attempt-tiered hint, guided mode when escalated,
/// and the dry-run reminder.
pub fn compose_message(validation_error: &str, tool_name: &str, analysis: &Analysis) -> String {
    let mut message = validation_error.to_string();

    if !analysis.suggestions.is_empty() {
        message.push_str("\n\n");
        message.push_str(&analysis.suggestions.join("\n"));
    }

    if let Some(example) = &analysis.corrected_example {
        message.push_str(&corrected_example_block(tool_name, example));
    }

    message.push_str(&contextual_hint(analysis.attempt));

    if analysis.escalation_needed {
        message.push_str(&guided_mode_block(tool_name));
    }

    message.push_str(&format!(
        "\n\nDRY RUN: test your parameters before retrying:\n{DRY_RUN_TOOL} {{\"tool\": \"{tool_name}\", \"params\": {{\"name\": \"test\"}}}}"
    ));
    message
}

/// Secondary line appended by the invocation wrapper when patterns fired.
pub fn behavior_analysis_line(analysis: &Analysis) -> Option<String> {
    if analysis.patterns.is_empty() {
        return None;
    }
    Some(format!(
        "\n\nBEHAVIOR ANALYSIS: detected patterns: {}\nAttempt #{} - pattern recognition active",
        analysis.pattern_names().join(", "),
        analysis.attempt
    ))
}

fn corrected_example_block(tool_name: &str, example: &Map<String, Value>) -> String {
    let params = example
        .iter()
        .map(|(key, value)| {
            format!(
                "    <parameter name=\"{key}\">{}</parameter>",
                render_parameter_value(value)
            )
        })
        .collect::<Vec<_>>()
        .join("\n");
    let required = example.keys().cloned().collect::<Vec<_>>().join(", ");
    format!(
        "\n\nAUTO-CORRECTION GENERATED\n\nWrong: {tool_name}()\nCorrect ({STRUCTURED_PARAMETER_NOTATION}):\n\n<invoke name=\"{tool_name}\">\n{params}\n</invoke>\n\nRequired parameters: {required}"
    )
}

fn render_parameter_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn contextual_hint(attempt: u32) -> String {
    match attempt {
        ..=1 => format!(
            "\n\nHINT: tools take {STRUCTURED_PARAMETER_NOTATION}, not function-call arguments."
        ),
        2 => format!(
            "\n\nANALYSIS: you have tried {attempt} times. The error points at the parameter format; compare it with the schema."
        ),
        _ => format!(
            "\n\nPATTERN DETECTED: {attempt} attempts with similar errors. Run {DISCOVERY_TOOL} first."
        ),
    }
}

fn guided_mode_block(tool_name: &str) -> String {
    format!(
        "\n\nGUIDED MODE ACTIVATED\n\nStep-by-step for {tool_name}:\n\
         1. Discover the available tools: {DISCOVERY_TOOL} {{}}\n\
         2. Inspect the example for this tool: {DISCOVERY_TOOL} {{\"tool\": \"{tool_name}\"}}\n\
         3. Dry-run validate your parameters: {DRY_RUN_TOOL} {{\"tool\": \"{tool_name}\", \"params\": {{...}}}}\n\
         4. Call {tool_name} again with the corrected {STRUCTURED_PARAMETER_NOTATION}"
    )
}
