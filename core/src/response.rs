use serde::Serialize;
use serde_json::{Value, json};

/// Title plus detail, the error half of every tool result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    pub title: String,
    pub detail: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Success { message: String, data: Value },
    Error(ErrorBody),
}

/// Uniform success/error envelope returned by every tool invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolResponse {
    pub body: ResponseBody,
}

impl ToolResponse {
    pub fn success(message: impl Into<String>, data: Value) -> Self {
        Self {
            body: ResponseBody::Success {
                message: message.into(),
                data,
            },
        }
    }

    pub fn error(title: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            body: ResponseBody::Error(ErrorBody {
                title: title.into(),
                detail: detail.into(),
            }),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self.body, ResponseBody::Error(_))
    }

    pub fn error_body(&self) -> Option<&ErrorBody> {
        match &self.body {
            ResponseBody::Error(body) => Some(body),
            ResponseBody::Success { .. } => None,
        }
    }

    pub fn data(&self) -> Option<&Value> {
        match &self.body {
            ResponseBody::Success { data, .. } => Some(data),
            ResponseBody::Error(_) => None,
        }
    }

    /// Text block shown to the model. Agents mostly read this, not the
    /// structured content, so the payload is inlined.
    pub fn text(&self) -> String {
        match &self.body {
            ResponseBody::Success { message, data } => {
                if data.is_null() {
                    message.clone()
                } else {
                    let rendered =
                        serde_json::to_string_pretty(data).unwrap_or_else(|_| "{}".to_string());
                    format!("{message}\n\n{rendered}")
                }
            }
            ResponseBody::Error(body) => format!("{}\n\n{}", body.title, body.detail),
        }
    }

    /// MCP `tools/call` result shape.
    pub fn to_value(&self) -> Value {
        let text = self.text();
        match &self.body {
            ResponseBody::Success { message, data } => json!({
                "content": [{ "type": "text", "text": text }],
                "structuredContent": {
                    "status": "success",
                    "message": message,
                    "data": data
                }
            }),
            ResponseBody::Error(body) => json!({
                "isError": true,
                "content": [{ "type": "text", "text": text }],
                "structuredContent": {
                    "status": "error",
                    "error": body
                }
            }),
        }
    }
}
