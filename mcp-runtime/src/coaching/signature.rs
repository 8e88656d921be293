use serde_json::Value;

/// Characters of serialized input that take part in a signature.
pub const SIGNATURE_INPUT_PREFIX_CHARS: usize = 100;

/// Groups attempts by tool and input prefix. Collisions between large payloads
/// that share a prefix are accepted: this is a grouping key, not an identity.
pub fn attempt_signature(tool_name: &str, input: &Value) -> String {
    // serde_json maps serialize in sorted key order, so key order never
    // changes the signature.
    let serialized = serde_json::to_string(input).unwrap_or_else(|_| "null".to_string());
    let prefix: String = serialized
        .chars()
        .take(SIGNATURE_INPUT_PREFIX_CHARS)
        .collect();
    format!("{tool_name}-{prefix}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn signature_is_stable_for_equal_inputs() {
        let a = json!({"name": "web", "projectId": "p1"});
        let b = json!({"projectId": "p1", "name": "web"});
        assert_eq!(
            attempt_signature("compose-create", &a),
            attempt_signature("compose-create", &b)
        );
        assert_ne!(
            attempt_signature("compose-create", &a),
            attempt_signature("compose-update", &a)
        );
    }

    #[test]
    fn signature_ignores_differences_past_the_prefix() {
        let filler = "x".repeat(SIGNATURE_INPUT_PREFIX_CHARS);
        let a = json!({"a": filler, "z": 1});
        let b = json!({"a": filler, "z": 2});
        assert_eq!(
            attempt_signature("project-create", &a),
            attempt_signature("project-create", &b)
        );
    }

    #[test]
    fn absent_input_still_produces_a_key() {
        assert_eq!(attempt_signature("project-all", &Value::Null), "project-all-null");
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let wide = "é".repeat(SIGNATURE_INPUT_PREFIX_CHARS * 2);
        let signature = attempt_signature("t", &json!(wide));
        assert_eq!(
            signature.chars().count(),
            "t-".chars().count() + SIGNATURE_INPUT_PREFIX_CHARS
        );
    }
}
