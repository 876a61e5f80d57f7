//! Action catalog and argument validation
//!
//! The catalog is fixed at compile time: every action the model may request
//! is declared here with its parameter schema, owning backend, and whether
//! it needs the authenticated messenger identity. Validation is pure and
//! side-effect-free; it never touches the network.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use serde_json::{json, Map, Value};
use thiserror::Error;

/// The independent remote backend an action executes against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// Messenger service (requires the OAuth bearer identity)
    Messenger,
    /// Repository listing service
    Repos,
    /// Developer forum service
    Forum,
    /// Helpdesk service (tickets, customers, developer accounts)
    Helpdesk,
    /// Daily quote service
    Quotes,
}

/// Declared type of an action parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// JSON string
    String,
    /// JSON integer
    Integer,
    /// Any JSON number
    Number,
    /// JSON boolean
    Boolean,
    /// JSON array of strings
    StringArray,
    /// JSON object
    Object,
}

impl ParamKind {
    /// Whether a JSON value satisfies this kind
    fn matches(&self, value: &Value) -> bool {
        match self {
            ParamKind::String => value.is_string(),
            ParamKind::Integer => value.is_i64() || value.is_u64(),
            ParamKind::Number => value.is_number(),
            ParamKind::Boolean => value.is_boolean(),
            ParamKind::StringArray => value
                .as_array()
                .map(|items| items.iter().all(Value::is_string))
                .unwrap_or(false),
            ParamKind::Object => value.is_object(),
        }
    }

    /// Name used in error messages and schema declarations
    fn type_name(&self) -> &'static str {
        match self {
            ParamKind::String => "string",
            ParamKind::Integer => "integer",
            ParamKind::Number => "number",
            ParamKind::Boolean => "boolean",
            ParamKind::StringArray => "array of strings",
            ParamKind::Object => "object",
        }
    }

    /// JSON Schema fragment for the model-facing declaration
    fn schema(&self) -> Value {
        match self {
            ParamKind::String => json!({"type": "string"}),
            ParamKind::Integer => json!({"type": "integer"}),
            ParamKind::Number => json!({"type": "number"}),
            ParamKind::Boolean => json!({"type": "boolean"}),
            ParamKind::StringArray => json!({"type": "array", "items": {"type": "string"}}),
            ParamKind::Object => json!({"type": "object"}),
        }
    }
}

/// Declaration of one action parameter
#[derive(Debug, Clone, Copy)]
pub struct ParamSpec {
    /// Parameter name as the model must send it
    pub name: &'static str,
    /// Declared type
    pub kind: ParamKind,
    /// Whether the parameter must be present
    pub required: bool,
    /// Model-facing description
    pub description: &'static str,
    /// Closed set of allowed string values (empty = unrestricted)
    pub allowed: &'static [&'static str],
}

const fn req(name: &'static str, kind: ParamKind, description: &'static str) -> ParamSpec {
    ParamSpec {
        name,
        kind,
        required: true,
        description,
        allowed: &[],
    }
}

const fn opt(name: &'static str, kind: ParamKind, description: &'static str) -> ParamSpec {
    ParamSpec {
        name,
        kind,
        required: false,
        description,
        allowed: &[],
    }
}

/// Declaration of one invocable action
#[derive(Debug, Clone, Copy)]
pub struct ActionSpec {
    /// Unique action name
    pub name: &'static str,
    /// Model-facing description
    pub description: &'static str,
    /// Backend the gateway routes this action to
    pub backend: Backend,
    /// Whether the call needs the messenger bearer token
    pub requires_auth: bool,
    /// Parameter declarations
    pub params: &'static [ParamSpec],
}

impl ActionSpec {
    /// Render the parameter declarations as a JSON Schema object
    pub fn parameters_schema(&self) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();
        for param in self.params {
            let mut schema = param.kind.schema();
            schema["description"] = json!(param.description);
            if !param.allowed.is_empty() {
                schema["enum"] = json!(param.allowed);
            }
            properties.insert(param.name.to_string(), schema);
            if param.required {
                required.push(json!(param.name));
            }
        }
        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }
}

/// The fixed action catalog
static CATALOG: &[ActionSpec] = &[
    // Messenger
    ActionSpec {
        name: "send_message",
        description: "Send a messenger note to the signed-in user's own chat",
        backend: Backend::Messenger,
        requires_auth: true,
        params: &[
            req("message", ParamKind::String, "Message text to send"),
            opt("web_url", ParamKind::String, "Web link attached to the message"),
            opt(
                "mobile_web_url",
                ParamKind::String,
                "Mobile web link attached to the message",
            ),
            opt("button_title", ParamKind::String, "Title of the link button"),
        ],
    },
    ActionSpec {
        name: "send_message_to_friends",
        description: "Send a messenger message to one or more friends by their ids",
        backend: Backend::Messenger,
        requires_auth: true,
        params: &[
            req(
                "receiver_uuids",
                ParamKind::StringArray,
                "Friend ids to deliver the message to (at least one)",
            ),
            req("message", ParamKind::String, "Message text to send"),
            opt("web_url", ParamKind::String, "Web link attached to the message"),
            opt(
                "mobile_web_url",
                ParamKind::String,
                "Mobile web link attached to the message",
            ),
            opt("button_title", ParamKind::String, "Title of the link button"),
        ],
    },
    ActionSpec {
        name: "list_friends",
        description: "List the signed-in user's messenger friends",
        backend: Backend::Messenger,
        requires_auth: true,
        params: &[
            opt("offset", ParamKind::Integer, "Start position of the page"),
            opt("limit", ParamKind::Integer, "Number of friends to return"),
            opt("order", ParamKind::String, "Sort order, asc or desc"),
        ],
    },
    ActionSpec {
        name: "get_profile",
        description: "Fetch the signed-in user's messenger profile",
        backend: Backend::Messenger,
        requires_auth: true,
        params: &[],
    },
    // Repos
    ActionSpec {
        name: "list_repos",
        description: "List repositories for the authenticated account or a named user",
        backend: Backend::Repos,
        requires_auth: false,
        params: &[
            opt("user", ParamKind::String, "Specific username (defaults to the service account)"),
            opt("visibility", ParamKind::String, "all, public or private"),
            opt(
                "affiliation",
                ParamKind::String,
                "Comma-separated owner, collaborator, organization_member",
            ),
            opt("per_page", ParamKind::Integer, "Results per page"),
            opt("page", ParamKind::Integer, "Page number"),
        ],
    },
    // Forum
    ActionSpec {
        name: "get_unanswered_count",
        description: "Count recent forum topics that have no reply yet",
        backend: Backend::Forum,
        requires_auth: false,
        params: &[],
    },
    ActionSpec {
        name: "list_unanswered_topics",
        description: "List recent forum topics that have no reply yet",
        backend: Backend::Forum,
        requires_auth: false,
        params: &[],
    },
    ActionSpec {
        name: "post_reply",
        description: "Post a reply to a forum topic",
        backend: Backend::Forum,
        requires_auth: false,
        params: &[
            req("topic_id", ParamKind::Integer, "Topic id to reply to"),
            req("body", ParamKind::String, "Reply body"),
            opt("target_recipients", ParamKind::String, "Recipient override"),
            opt("archetype", ParamKind::String, "Reply archetype"),
        ],
    },
    ActionSpec {
        name: "list_canned_replies",
        description: "List the prepared reply templates grouped by topic category",
        backend: Backend::Forum,
        requires_auth: false,
        params: &[],
    },
    // Helpdesk
    ActionSpec {
        name: "get_customer",
        description: "Look up a customer record",
        backend: Backend::Helpdesk,
        requires_auth: false,
        params: &[req("customer_id", ParamKind::String, "Customer id")],
    },
    ActionSpec {
        name: "check_developer_status",
        description: "Check whether a developer account is blocked and why",
        backend: Backend::Helpdesk,
        requires_auth: false,
        params: &[req("developer_id", ParamKind::String, "Developer id")],
    },
    ActionSpec {
        name: "create_unblock_request",
        description: "File an unblock request for a blocked developer account",
        backend: Backend::Helpdesk,
        requires_auth: false,
        params: &[
            req("developer_id", ParamKind::String, "Developer id"),
            req("reason", ParamKind::String, "Why the block should be lifted"),
            req(
                "additional_info",
                ParamKind::String,
                "Supporting details, e.g. what caused the violation",
            ),
        ],
    },
    ActionSpec {
        name: "create_ticket",
        description: "Create a support ticket",
        backend: Backend::Helpdesk,
        requires_auth: false,
        params: &[
            req("title", ParamKind::String, "Ticket title"),
            req("description", ParamKind::String, "Ticket description"),
            ParamSpec {
                name: "priority",
                kind: ParamKind::String,
                required: true,
                description: "Ticket priority",
                allowed: &["low", "medium", "high", "urgent"],
            },
            opt("customer_id", ParamKind::String, "Customer the ticket belongs to"),
        ],
    },
    ActionSpec {
        name: "get_ticket",
        description: "Look up the status of a support ticket",
        backend: Backend::Helpdesk,
        requires_auth: false,
        params: &[req("ticket_id", ParamKind::String, "Ticket id")],
    },
    ActionSpec {
        name: "search_error_logs",
        description: "Search an app's error logs for a specific error code",
        backend: Backend::Helpdesk,
        requires_auth: false,
        params: &[
            req("app_id", ParamKind::String, "App id"),
            req("error_code", ParamKind::String, "Error code, e.g. KOE009"),
        ],
    },
    ActionSpec {
        name: "helpdesk_action",
        description: "Invoke a named helpdesk admin action with an arbitrary payload",
        backend: Backend::Helpdesk,
        requires_auth: false,
        params: &[
            req("action", ParamKind::String, "Admin action name"),
            opt("payload", ParamKind::Object, "Request body for the action"),
        ],
    },
    // Quotes
    ActionSpec {
        name: "get_daily_quote",
        description: "Fetch a random famous quote",
        backend: Backend::Quotes,
        requires_auth: false,
        params: &[],
    },
];

static INDEX: Lazy<HashMap<&'static str, &'static ActionSpec>> =
    Lazy::new(|| CATALOG.iter().map(|spec| (spec.name, spec)).collect());

/// All declared actions, in catalog order
pub fn catalog() -> &'static [ActionSpec] {
    CATALOG
}

/// Look up an action by name
pub fn find(name: &str) -> Option<&'static ActionSpec> {
    INDEX.get(name).copied()
}

/// Validation failures for an action request
///
/// These never reach the network; they are reported back to the model as
/// failure results so it can correct itself within the same turn.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// The action name is not in the catalog
    #[error("unknown action '{0}'")]
    UnknownAction(String),

    /// A declared-required argument is absent
    #[error("missing required argument '{name}' for action '{action}'")]
    MissingArgument {
        /// Action being validated
        action: String,
        /// Name of the absent argument
        name: String,
    },

    /// An argument is present with the wrong type or value
    #[error("invalid argument '{name}' for action '{action}': expected {expected}, got {actual}")]
    InvalidArgumentType {
        /// Action being validated
        action: String,
        /// Name of the offending argument
        name: String,
        /// What the schema declares
        expected: String,
        /// What the model sent
        actual: String,
    },
}

/// Arguments that passed schema validation
///
/// Only declared parameters are retained; anything else the model sent is
/// dropped before the gateway sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedArguments(Map<String, Value>);

impl ValidatedArguments {
    /// Get a validated argument by name
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Get a validated string argument by name
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(Value::as_str)
    }

    /// Iterate over the validated arguments
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// View the arguments as a JSON object
    pub fn as_object(&self) -> &Map<String, Value> {
        &self.0
    }
}

/// Validate an action request against the catalog
///
/// Returns the retained arguments on success. Fails with `UnknownAction`
/// for a name outside the catalog, `MissingArgument` for an absent required
/// parameter, and `InvalidArgumentType` for a type or enum mismatch.
pub fn validate(name: &str, arguments: &Value) -> Result<ValidatedArguments, SchemaError> {
    let spec = find(name).ok_or_else(|| SchemaError::UnknownAction(name.to_string()))?;

    let empty = Map::new();
    let supplied = arguments.as_object().unwrap_or(&empty);

    let mut retained = Map::new();
    for param in spec.params {
        match supplied.get(param.name) {
            None | Some(Value::Null) => {
                if param.required {
                    return Err(SchemaError::MissingArgument {
                        action: spec.name.to_string(),
                        name: param.name.to_string(),
                    });
                }
            }
            Some(value) => {
                if !param.kind.matches(value) {
                    return Err(SchemaError::InvalidArgumentType {
                        action: spec.name.to_string(),
                        name: param.name.to_string(),
                        expected: param.kind.type_name().to_string(),
                        actual: json_type_name(value).to_string(),
                    });
                }
                if !param.allowed.is_empty() {
                    let matches_allowed = value
                        .as_str()
                        .map(|s| param.allowed.contains(&s))
                        .unwrap_or(false);
                    if !matches_allowed {
                        return Err(SchemaError::InvalidArgumentType {
                            action: spec.name.to_string(),
                            name: param.name.to_string(),
                            expected: format!("one of {}", param.allowed.join(", ")),
                            actual: value.to_string(),
                        });
                    }
                }
                retained.insert(param.name.to_string(), value.clone());
            }
        }
    }

    Ok(ValidatedArguments(retained))
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
