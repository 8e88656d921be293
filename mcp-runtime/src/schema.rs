//! Declarative tool input shapes: validation with defaults, issue rendering,
//! and the JSON Schema advertised on `tools/list`.

use std::fmt;

use serde_json::{Map, Value, json};

#[derive(Clone, Debug, PartialEq)]
pub enum FieldKind {
    String { min_len: usize },
    Enum(&'static [&'static str]),
    Number,
    Boolean,
    Record,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub description: &'static str,
    pub required: bool,
    pub nullable: bool,
    pub default: Option<Value>,
}

impl FieldSpec {
    fn new(name: &'static str, kind: FieldKind, description: &'static str) -> Self {
        Self {
            name,
            kind,
            description,
            required: true,
            nullable: false,
            default: None,
        }
    }

    pub fn string(name: &'static str, description: &'static str) -> Self {
        Self::new(name, FieldKind::String { min_len: 0 }, description)
    }

    /// Required string that must not be empty.
    pub fn non_empty(name: &'static str, description: &'static str) -> Self {
        Self::new(name, FieldKind::String { min_len: 1 }, description)
    }

    pub fn one_of(
        name: &'static str,
        values: &'static [&'static str],
        description: &'static str,
    ) -> Self {
        Self::new(name, FieldKind::Enum(values), description)
    }

    pub fn number(name: &'static str, description: &'static str) -> Self {
        Self::new(name, FieldKind::Number, description)
    }

    pub fn boolean(name: &'static str, description: &'static str) -> Self {
        Self::new(name, FieldKind::Boolean, description)
    }

    pub fn record(name: &'static str, description: &'static str) -> Self {
        Self::new(name, FieldKind::Record, description)
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Optional and accepts an explicit `null`.
    pub fn nullable(mut self) -> Self {
        self.required = false;
        self.nullable = true;
        self
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.required = false;
        self.default = Some(value);
        self
    }

    fn check(&self, value: &Value) -> Result<(), String> {
        match (&self.kind, value) {
            (_, Value::Null) if self.nullable => Ok(()),
            (FieldKind::String { min_len }, Value::String(text)) => {
                if text.chars().count() < *min_len {
                    Err(format!(
                        "must contain at least {min_len} character(s)"
                    ))
                } else {
                    Ok(())
                }
            }
            (FieldKind::Enum(values), Value::String(text)) => {
                if values.contains(&text.as_str()) {
                    Ok(())
                } else {
                    Err(format!(
                        "invalid value '{text}', expected one of {}",
                        quoted_list(values)
                    ))
                }
            }
            (FieldKind::Number, Value::Number(_)) => Ok(()),
            (FieldKind::Boolean, Value::Bool(_)) => Ok(()),
            (FieldKind::Record, Value::Object(_)) => Ok(()),
            (kind, other) => Err(format!(
                "expected {}, received {}",
                kind_name(kind),
                value_type_name(other)
            )),
        }
    }
}

/// One problem found while validating an input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SchemaIssue {
    /// Parameter path; empty for the root value.
    pub path: String,
    pub message: String,
}

impl fmt::Display for SchemaIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "parameters {}", self.message)
        } else {
            write!(f, "parameter \"{}\": {}", self.path, self.message)
        }
    }
}

/// Single human-readable summary of all issues.
pub fn render_issues(issues: &[SchemaIssue]) -> String {
    let joined = issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ");
    format!("Validation failed: {joined}")
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct InputSchema {
    fields: Vec<FieldSpec>,
}

impl InputSchema {
    pub fn new(fields: Vec<FieldSpec>) -> Self {
        Self { fields }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn required_fields(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().filter(|f| f.required).map(|f| f.name)
    }

    /// Checks `input` and returns the coerced object: defaults filled in,
    /// undeclared keys dropped.
    pub fn validate(&self, input: &Value) -> Result<Map<String, Value>, Vec<SchemaIssue>> {
        let Some(object) = input.as_object() else {
            return Err(vec![SchemaIssue {
                path: String::new(),
                message: format!("must be an object, received {}", value_type_name(input)),
            }]);
        };

        let mut issues = Vec::new();
        let mut data = Map::new();
        for field in &self.fields {
            match object.get(field.name) {
                None => {
                    if let Some(default) = &field.default {
                        data.insert(field.name.to_string(), default.clone());
                    } else if field.required {
                        issues.push(SchemaIssue {
                            path: field.name.to_string(),
                            message: "required".to_string(),
                        });
                    }
                }
                Some(value) => match field.check(value) {
                    Ok(()) => {
                        data.insert(field.name.to_string(), value.clone());
                    }
                    Err(message) => issues.push(SchemaIssue {
                        path: field.name.to_string(),
                        message,
                    }),
                },
            }
        }

        if issues.is_empty() { Ok(data) } else { Err(issues) }
    }

    pub fn to_json_schema(&self) -> Value {
        let mut properties = Map::new();
        for field in &self.fields {
            let mut property = match &field.kind {
                FieldKind::String { min_len } if *min_len > 0 => {
                    json!({ "type": "string", "minLength": min_len })
                }
                FieldKind::String { .. } => json!({ "type": "string" }),
                FieldKind::Enum(values) => json!({ "type": "string", "enum": values }),
                FieldKind::Number => json!({ "type": "number" }),
                FieldKind::Boolean => json!({ "type": "boolean" }),
                FieldKind::Record => json!({ "type": "object", "additionalProperties": {} }),
            };
            if field.nullable {
                let base = property["type"].clone();
                property["type"] = json!([base, "null"]);
            }
            property["description"] = json!(field.description);
            if let Some(default) = &field.default {
                property["default"] = default.clone();
            }
            properties.insert(field.name.to_string(), property);
        }
        let required: Vec<&str> = self.required_fields().collect();
        json!({
            "type": "object",
            "properties": properties,
            "required": required,
            "additionalProperties": false
        })
    }
}

fn kind_name(kind: &FieldKind) -> &'static str {
    match kind {
        FieldKind::String { .. } | FieldKind::Enum(_) => "string",
        FieldKind::Number => "number",
        FieldKind::Boolean => "boolean",
        FieldKind::Record => "object",
    }
}

fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn quoted_list(values: &[&str]) -> String {
    values
        .iter()
        .map(|v| format!("'{v}'"))
        .collect::<Vec<_>>()
        .join(" | ")
}
