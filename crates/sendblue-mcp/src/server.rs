//! MCP tool registry: binds the Sendblue tool functions onto rmcp's `ServerHandler`.

use crate::config::{Config, SendStyle};
use crate::error::{ConfigError, ValidationError};
use crate::gateway::SendblueGateway;
use crate::semantics::annotations_for_method;
use crate::tools::{SendblueTools, ToolOutput};
use crate::validation::{
    HISTORY_DEFAULT_LIMIT, HISTORY_LIMIT_MAX, HISTORY_LIMIT_MIN, MAX_GROUP_RECIPIENTS, decode_args,
};
use reqwest::Method;
use rmcp::model::{
    CallToolRequestParam, CallToolResult, Content, JsonObject, ListToolsResult,
    PaginatedRequestParam, ServerCapabilities, ServerInfo, Tool,
};
use rmcp::service::RequestContext;
use rmcp::{ErrorData as McpError, RoleServer, ServerHandler};
use serde_json::{Value, json};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

pub const SERVER_NAME: &str = "sendblue";

const INSTRUCTIONS: &str = "Sendblue MCP: send iMessage/SMS to single recipients or groups, \
check whether a number supports iMessage, send typing indicators, read message history, add \
recipients to groups, and upload media. Phone numbers must be E.164 (e.g. +19998887777).";

const E164_PATTERN: &str = r"^\+[1-9]\d{1,14}$";

#[derive(Error, Debug)]
pub enum ToolCallError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

struct ToolDef {
    name: &'static str,
    title: &'static str,
    description: &'static str,
    method: Method,
    input_schema: Value,
}

fn phone_schema(description: &str) -> Value {
    json!({
        "type": "string",
        "pattern": E164_PATTERN,
        "description": description,
    })
}

fn send_style_schema() -> Value {
    let styles: Vec<&str> = SendStyle::ALL.iter().map(|s| s.as_str()).collect();
    json!({
        "type": "string",
        "enum": styles,
        "description": "Expressive style for iMessage",
    })
}

#[allow(clippy::too_many_lines)]
fn tool_defs() -> Vec<ToolDef> {
    vec![
        ToolDef {
            name: "send_message",
            title: "Send message",
            description: "Send a message (iMessage or SMS) to a single recipient. Either content \
                          or media_url must be provided.",
            method: Method::POST,
            input_schema: json!({
                "type": "object",
                "properties": {
                    "to_number": phone_schema("The E.164 formatted phone number of the recipient"),
                    "content": {
                        "type": "string",
                        "description": "The text content of the message"
                    },
                    "from_number": phone_schema("The E.164 formatted Sendblue number to send from"),
                    "media_url": {
                        "type": "string",
                        "description": "Publicly accessible URL of an image or .caf voice note file"
                    },
                    "send_style": send_style_schema(),
                    "status_callback": {
                        "type": "string",
                        "description": "Webhook URL for message status updates"
                    }
                },
                "required": ["to_number"]
            }),
        },
        ToolDef {
            name: "send_group_message",
            title: "Send group message",
            description: "Send a message to a group. Address it with to_numbers (a new group is \
                          created if needed) or the group_id of an existing group; to_numbers \
                          takes precedence when both are given.",
            method: Method::POST,
            input_schema: json!({
                "type": "object",
                "properties": {
                    "to_numbers": {
                        "type": "array",
                        "items": phone_schema("E.164 phone number"),
                        "maxItems": MAX_GROUP_RECIPIENTS,
                        "description": "E.164 formatted phone numbers of the group recipients"
                    },
                    "group_id": { "type": "string", "description": "UUID of an existing group" },
                    "content": {
                        "type": "string",
                        "description": "The text content of the message"
                    },
                    "from_number": phone_schema("The E.164 formatted Sendblue number to send from"),
                    "media_url": {
                        "type": "string",
                        "description": "Publicly accessible URL to media"
                    },
                    "send_style": send_style_schema(),
                    "status_callback": {
                        "type": "string",
                        "description": "Webhook URL for message status updates"
                    }
                }
            }),
        },
        ToolDef {
            name: "lookup_number_service",
            title: "Lookup number service",
            description: "Determine whether a phone number supports iMessage or only SMS.",
            method: Method::GET,
            input_schema: json!({
                "type": "object",
                "properties": {
                    "phone_number": phone_schema("The E.164 formatted phone number to evaluate")
                },
                "required": ["phone_number"]
            }),
        },
        ToolDef {
            name: "send_typing_indicator",
            title: "Send typing indicator",
            description: "Show the animated typing indicator to a recipient.",
            method: Method::POST,
            input_schema: json!({
                "type": "object",
                "properties": {
                    "to_number": phone_schema(
                        "The E.164 formatted phone number to send the typing indicator to"
                    )
                },
                "required": ["to_number"]
            }),
        },
        ToolDef {
            name: "get_message_history",
            title: "Get message history",
            description: "Retrieve message history for the account as a list of message objects.",
            method: Method::GET,
            input_schema: json!({
                "type": "object",
                "properties": {
                    "contact_phone_number": phone_schema(
                        "Filter by sender/recipient E.164 phone number"
                    ),
                    "conversation_id": {
                        "type": "string",
                        "description": "Filter by conversation ID (contact ID)"
                    },
                    "limit": {
                        "type": "integer",
                        "minimum": HISTORY_LIMIT_MIN,
                        "maximum": HISTORY_LIMIT_MAX,
                        "default": HISTORY_DEFAULT_LIMIT,
                        "description": "Maximum number of messages per request"
                    },
                    "offset": {
                        "type": "integer",
                        "minimum": 0,
                        "default": 0,
                        "description": "Offset for paginating through messages"
                    },
                    "from_date": {
                        "type": "string",
                        "description":
                            "Only messages sent after this date/time (e.g. '2023-06-15 12:00:00')"
                    }
                }
            }),
        },
        ToolDef {
            name: "add_recipient_to_group",
            title: "Add recipient to group",
            description: "Add a recipient to an existing group chat.",
            method: Method::POST,
            input_schema: json!({
                "type": "object",
                "properties": {
                    "group_id": { "type": "string", "description": "The ID (uuid) of the group" },
                    "recipient_number": phone_schema(
                        "The E.164 formatted phone number to add to the group"
                    )
                },
                "required": ["group_id", "recipient_number"]
            }),
        },
        ToolDef {
            name: "upload_media_for_sending",
            title: "Upload media",
            description: "Upload a media file from a publicly accessible URL to Sendblue storage \
                          for later sending.",
            method: Method::POST,
            input_schema: json!({
                "type": "object",
                "properties": {
                    "media_file_url": {
                        "type": "string",
                        "description": "The publicly accessible URL of the media file"
                    }
                },
                "required": ["media_file_url"]
            }),
        },
    ]
}

/// `is_error` comes from the output's tag, never from the payload's contents.
fn to_call_result(output: &ToolOutput, structured: Value) -> CallToolResult {
    let value = output.value();
    let text = serde_json::to_string(value).unwrap_or_else(|_| value.to_string());
    CallToolResult {
        content: vec![Content::text(text)],
        structured_content: Some(structured),
        is_error: Some(output.is_error()),
        meta: None,
    }
}

fn object_result(output: ToolOutput) -> CallToolResult {
    let structured = match output.value() {
        v @ Value::Object(_) => v.clone(),
        v => json!({ "body": v }),
    };
    to_call_result(&output, structured)
}

fn list_result(output: ToolOutput) -> CallToolResult {
    let structured = json!({ "messages": output.value() });
    to_call_result(&output, structured)
}

/// The Sendblue MCP server. Cheap to clone; one clone per session in HTTP mode.
#[derive(Clone)]
pub struct SendblueServer {
    tools: SendblueTools,
    catalog: Arc<Vec<Tool>>,
}

impl SendblueServer {
    #[must_use]
    pub fn new(tools: SendblueTools) -> Self {
        let catalog = tool_defs()
            .into_iter()
            .map(|d| {
                let schema = d.input_schema.as_object().cloned().unwrap_or_default();
                let mut tool = Tool::new(d.name, d.description, Arc::new(schema));
                tool.annotations = Some(annotations_for_method(d.title, &d.method));
                tool
            })
            .collect();
        Self {
            tools,
            catalog: Arc::new(catalog),
        }
    }

    /// Build the server against the real Sendblue API.
    ///
    /// # Errors
    ///
    /// Fails if credentials are missing; no tool can run without them.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let credentials = config.check_credentials()?;
        let gateway = SendblueGateway::new(config, credentials)?;
        Ok(Self::new(SendblueTools::new(Arc::new(gateway))))
    }

    #[must_use]
    pub fn tool_catalog(&self) -> Vec<Tool> {
        self.catalog.as_ref().clone()
    }

    /// Dispatch one tool call by name.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown tools or invalid arguments. Sendblue failures are not errors
    /// here: they come back as a result with `is_error` set.
    pub async fn call_tool_by_name(
        &self,
        name: &str,
        arguments: Option<JsonObject>,
    ) -> Result<CallToolResult, ToolCallError> {
        let t = &self.tools;
        let result = match name {
            "send_message" => object_result(t.send_message(decode_args(arguments)?).await?),
            "send_group_message" => {
                object_result(t.send_group_message(decode_args(arguments)?).await?)
            }
            "lookup_number_service" => {
                object_result(t.lookup_number_service(decode_args(arguments)?).await?)
            }
            "send_typing_indicator" => {
                object_result(t.send_typing_indicator(decode_args(arguments)?).await?)
            }
            "get_message_history" => {
                list_result(t.get_message_history(decode_args(arguments)?).await?)
            }
            "add_recipient_to_group" => {
                object_result(t.add_recipient_to_group(decode_args(arguments)?).await?)
            }
            "upload_media_for_sending" => {
                object_result(t.upload_media_for_sending(decode_args(arguments)?).await?)
            }
            other => return Err(ToolCallError::UnknownTool(other.to_string())),
        };
        Ok(result)
    }
}

impl ServerHandler for SendblueServer {
    fn get_info(&self) -> ServerInfo {
        let mut info = ServerInfo::default();
        info.capabilities = ServerCapabilities::builder().enable_tools().build();
        info.server_info.name = SERVER_NAME.to_string();
        info.server_info.version = env!("CARGO_PKG_VERSION").to_string();
        info.instructions = Some(INSTRUCTIONS.to_string());
        info
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        Ok(ListToolsResult {
            tools: self.tool_catalog(),
            ..Default::default()
        })
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        info!(tool = %request.name, "tools/call");
        self.call_tool_by_name(&request.name, request.arguments)
            .await
            .map_err(|e| McpError::invalid_params(e.to_string(), None))
    }
}
