//! Completion API wire types
//!
//! Structs that mirror the OpenAI-compatible chat completions JSON format.
//! Used to serialize the outbound transcript and deserialize model replies.
//! Conversion from the in-turn transcript lives here so the rest of the
//! orchestrator never touches wire-level roles.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::actions::registry::{self, ActionSpec};
use crate::chat::{ChatMessage, ChatRole};

/// Request structure for the completions endpoint
#[derive(Serialize, Debug)]
pub struct CompletionRequest {
    /// Model name to invoke
    pub model: String,
    /// Outbound transcript in wire form
    pub messages: Vec<WireMessage>,
    /// Action catalog rendered as tool declarations
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolSpec>,
    /// Tool selection policy ("auto" whenever tools are declared)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<String>,
    /// Upper bound on completion tokens
    pub max_tokens: u32,
}

/// A single message in wire form
#[derive(Serialize, Debug)]
pub struct WireMessage {
    /// Wire role: system, user, assistant or tool
    pub role: String,
    /// Text content, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Tool invocations attached to an assistant message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<WireToolCall>>,
    /// Correlation id attached to a tool-result message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl WireMessage {
    /// Render a transcript message in wire form
    ///
    /// Action-request messages become assistant messages with `tool_calls`;
    /// action-result messages become `tool` messages keyed by their
    /// correlation id.
    pub fn from_chat(message: &ChatMessage) -> Self {
        match message.role {
            ChatRole::System | ChatRole::User | ChatRole::Assistant => Self {
                role: message.role.as_str().to_string(),
                content: message.content.clone(),
                tool_calls: None,
                tool_call_id: None,
            },
            ChatRole::ActionRequest => Self {
                role: "assistant".to_string(),
                content: message.content.clone(),
                tool_calls: Some(
                    message
                        .requests
                        .iter()
                        .map(|request| WireToolCall {
                            id: request.call_id.clone(),
                            call_type: "function".to_string(),
                            function: WireFunctionCall {
                                name: request.name.clone(),
                                arguments: request.arguments.to_string(),
                            },
                        })
                        .collect(),
                ),
                tool_call_id: None,
            },
            ChatRole::ActionResult => Self {
                role: "tool".to_string(),
                content: message.content.clone(),
                tool_calls: None,
                tool_call_id: message.call_id.clone(),
            },
        }
    }
}

/// A tool invocation as the wire carries it
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct WireToolCall {
    /// Correlation id minted by the model
    pub id: String,
    /// Always "function"
    #[serde(rename = "type")]
    pub call_type: String,
    /// Invoked function and its arguments
    pub function: WireFunctionCall,
}

/// Function name and JSON-encoded arguments of a tool invocation
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct WireFunctionCall {
    /// Action name
    pub name: String,
    /// Arguments as a JSON-encoded string (the wire quirk; parsed at the
    /// client boundary)
    pub arguments: String,
}

/// A declared tool in the completions request
#[derive(Serialize, Clone, Debug)]
pub struct ToolSpec {
    /// Always "function"
    #[serde(rename = "type")]
    pub tool_type: &'static str,
    /// Declared function
    pub function: FunctionSpec,
}

/// Function declaration inside a tool spec
#[derive(Serialize, Clone, Debug)]
pub struct FunctionSpec {
    /// Action name
    pub name: &'static str,
    /// Model-facing description
    pub description: &'static str,
    /// JSON Schema of the parameters
    pub parameters: Value,
}

impl ToolSpec {
    /// Render one catalog entry as a tool declaration
    pub fn from_action(spec: &ActionSpec) -> Self {
        Self {
            tool_type: "function",
            function: FunctionSpec {
                name: spec.name,
                description: spec.description,
                parameters: spec.parameters_schema(),
            },
        }
    }
}

/// The full catalog rendered as tool declarations
pub fn tool_declarations() -> Vec<ToolSpec> {
    registry::catalog().iter().map(ToolSpec::from_action).collect()
}

/// Top-level completions response
#[derive(Deserialize, Debug)]
pub struct CompletionResponse {
    /// Candidate completions (the first one is used)
    pub choices: Vec<Choice>,
}

/// A single completion choice
#[derive(Deserialize, Debug)]
pub struct Choice {
    /// The reply message
    pub message: ResponseMessage,
    /// Why the model stopped generating (if reported)
    #[serde(default)]
    #[allow(dead_code)] // Part of API response format, may be used in future
    pub finish_reason: Option<String>,
}

/// Reply message content
#[derive(Deserialize, Debug)]
pub struct ResponseMessage {
    /// Text content, if any
    #[serde(default)]
    pub content: Option<String>,
    /// Requested tool invocations, if any
    #[serde(default)]
    pub tool_calls: Option<Vec<WireToolCall>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::ActionRequest;
    use serde_json::json;

    #[test]
    fn test_action_request_message_wire_form() {
        let message = ChatMessage::action_requests(
            Some("checking".to_string()),
            vec![ActionRequest {
                call_id: "call_7".to_string(),
                name: "get_daily_quote".to_string(),
                arguments: json!({}),
            }],
        );
        let wire = WireMessage::from_chat(&message);
        assert_eq!(wire.role, "assistant");
        let calls = wire.tool_calls.unwrap();
        assert_eq!(calls[0].id, "call_7");
        assert_eq!(calls[0].function.name, "get_daily_quote");
        assert_eq!(calls[0].function.arguments, "{}");
    }

    #[test]
    fn test_action_result_message_wire_form() {
        let result = crate::actions::ActionResult::success("call_7", "get_daily_quote", json!({}));
        let wire = WireMessage::from_chat(&ChatMessage::action_result(&result));
        assert_eq!(wire.role, "tool");
        assert_eq!(wire.tool_call_id.as_deref(), Some("call_7"));
        assert!(wire.content.unwrap().contains("\"success\":true"));
    }

    #[test]
    fn test_tool_declarations_cover_catalog() {
        let tools = tool_declarations();
        assert_eq!(tools.len(), registry::catalog().len());
        assert!(tools.iter().any(|t| t.function.name == "send_message"));

        let rendered = serde_json::to_value(&tools[0]).unwrap();
        assert_eq!(rendered["type"], json!("function"));
        assert_eq!(rendered["function"]["parameters"]["type"], json!("object"));
    }
}
