//! Tool functions: validate → shape → call the gateway → map the result.
//!
//! Validation failures are returned as `Err` (the invocation is rejected). Gateway failures are
//! never returned as `Err`: they become [`ToolOutput::Failed`] carrying the uniform
//! `{"status": "ERROR", "error_message": ...}` record (a one-element list for history lookups).
//! Provider responses are passed through as [`ToolOutput::Provider`] without inspecting their
//! fields, so a delivered record that itself reports `"status": "ERROR"` is still a success.

use crate::error::{GatewayError, Result};
use crate::gateway::{ApiRequest, Gateway};
use crate::validation::{
    AddRecipientArgs, GroupMessageRequest, GroupModification, GroupTarget, HistoryQuery,
    LookupNumberArgs, MediaUploadRequest, MessageHistoryArgs, MessageRequest, PhoneNumber,
    SendGroupMessageArgs, SendMessageArgs, TypingIndicatorArgs, UploadMediaArgs,
};
use serde_json::{Map, Value, json};
use std::sync::Arc;
use tracing::{debug, warn};

pub const SEND_MESSAGE_ENDPOINT: &str = "/send-message";
pub const SEND_GROUP_MESSAGE_ENDPOINT: &str = "/send-group-message";
pub const EVALUATE_SERVICE_ENDPOINT: &str = "/evaluate-service";
pub const TYPING_INDICATOR_ENDPOINT: &str = "/send-typing-indicator";
pub const MESSAGES_ENDPOINT: &str = "/accounts/messages";
pub const MODIFY_GROUP_ENDPOINT: &str = "/modify-group";
pub const UPLOAD_MEDIA_ENDPOINT: &str = "/upload-media-object";

const MODIFY_TYPE_ADD_RECIPIENT: &str = "add_recipient";

/// Uniform error record returned in place of a provider response.
#[must_use]
pub fn error_record(e: &GatewayError) -> Value {
    json!({
        "status": "ERROR",
        "error_message": e.to_string(),
    })
}

/// Result of a tool invocation that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutput {
    /// The decoded Sendblue response, untouched.
    Provider(Value),
    /// The uniform error record built from a [`GatewayError`].
    Failed(Value),
}

impl ToolOutput {
    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    #[must_use]
    pub fn value(&self) -> &Value {
        match self {
            Self::Provider(v) | Self::Failed(v) => v,
        }
    }

    #[must_use]
    pub fn into_value(self) -> Value {
        match self {
            Self::Provider(v) | Self::Failed(v) => v,
        }
    }
}

fn insert_opt(body: &mut Map<String, Value>, key: &str, v: Option<&str>) {
    if let Some(v) = v {
        body.insert(key.to_string(), Value::String(v.to_string()));
    }
}

fn insert_common(
    body: &mut Map<String, Value>,
    from: Option<&PhoneNumber>,
    media_url: Option<&str>,
    send_style: Option<crate::config::SendStyle>,
    status_callback: Option<&str>,
) {
    insert_opt(body, "from_number", from.map(PhoneNumber::as_str));
    insert_opt(body, "media_url", media_url);
    insert_opt(body, "send_style", send_style.map(|s| s.as_str()));
    insert_opt(body, "status_callback", status_callback);
}

#[must_use]
pub fn shape_send_message(req: &MessageRequest) -> ApiRequest {
    let mut body = Map::new();
    body.insert("number".to_string(), json!(req.to));
    body.insert("content".to_string(), json!(req.content));
    insert_common(
        &mut body,
        req.from.as_ref(),
        req.media_url.as_deref(),
        req.send_style,
        req.status_callback.as_deref(),
    );
    ApiRequest::post(SEND_MESSAGE_ENDPOINT, Value::Object(body))
}

#[must_use]
pub fn shape_send_group_message(req: &GroupMessageRequest) -> ApiRequest {
    let mut body = Map::new();
    match &req.target {
        GroupTarget::Recipients(numbers) => {
            body.insert("numbers".to_string(), json!(numbers));
        }
        GroupTarget::Group(id) => {
            body.insert("group_id".to_string(), json!(id));
        }
    }
    insert_opt(&mut body, "content", req.content.as_deref());
    insert_common(
        &mut body,
        req.from.as_ref(),
        req.media_url.as_deref(),
        req.send_style,
        req.status_callback.as_deref(),
    );
    ApiRequest::post(SEND_GROUP_MESSAGE_ENDPOINT, Value::Object(body))
}

#[must_use]
pub fn shape_lookup_number(number: &PhoneNumber) -> ApiRequest {
    ApiRequest::get(
        EVALUATE_SERVICE_ENDPOINT,
        vec![("number".to_string(), number.to_string())],
    )
}

#[must_use]
pub fn shape_typing_indicator(number: &PhoneNumber) -> ApiRequest {
    ApiRequest::post(TYPING_INDICATOR_ENDPOINT, json!({ "number": number }))
}

/// Only present filters are sent; `offset` only when non-zero.
#[must_use]
pub fn shape_message_history(q: &HistoryQuery) -> ApiRequest {
    let mut query = Vec::new();
    if let Some(n) = &q.contact {
        query.push(("number".to_string(), n.to_string()));
    }
    if let Some(cid) = &q.conversation_id {
        query.push(("cid".to_string(), cid.clone()));
    }
    query.push(("limit".to_string(), q.limit.to_string()));
    if q.offset > 0 {
        query.push(("offset".to_string(), q.offset.to_string()));
    }
    if let Some(d) = &q.from_date {
        query.push(("from_date".to_string(), d.clone()));
    }
    ApiRequest::get(MESSAGES_ENDPOINT, query)
}

#[must_use]
pub fn shape_add_recipient(m: &GroupModification) -> ApiRequest {
    ApiRequest::post(
        MODIFY_GROUP_ENDPOINT,
        json!({
            "group_id": m.group_id,
            "modify_type": MODIFY_TYPE_ADD_RECIPIENT,
            "number": m.number,
        }),
    )
}

#[must_use]
pub fn shape_upload_media(m: &MediaUploadRequest) -> ApiRequest {
    ApiRequest::post(UPLOAD_MEDIA_ENDPOINT, json!({ "media_url": m.media_url }))
}

/// The seven Sendblue tools bound to a gateway.
#[derive(Clone)]
pub struct SendblueTools {
    gateway: Arc<dyn Gateway>,
}

impl SendblueTools {
    #[must_use]
    pub fn new(gateway: Arc<dyn Gateway>) -> Self {
        Self { gateway }
    }

    async fn dispatch(&self, request: ApiRequest) -> ToolOutput {
        let endpoint = request.endpoint;
        debug!(endpoint, "dispatching tool request");
        match self.gateway.call(request).await {
            Ok(v) => ToolOutput::Provider(v),
            Err(e) => {
                warn!(endpoint, error = %e, "tool call failed");
                ToolOutput::Failed(error_record(&e))
            }
        }
    }

    /// Send an iMessage/SMS to a single recipient.
    ///
    /// # Errors
    ///
    /// Returns a validation error for malformed arguments; the gateway is not called.
    pub async fn send_message(&self, args: SendMessageArgs) -> Result<ToolOutput> {
        let req = MessageRequest::from_args(args)?;
        Ok(self.dispatch(shape_send_message(&req)).await)
    }

    /// Send to a group; Sendblue creates an ad-hoc group from `to_numbers` if needed.
    ///
    /// # Errors
    ///
    /// Returns a validation error for malformed arguments; the gateway is not called.
    pub async fn send_group_message(&self, args: SendGroupMessageArgs) -> Result<ToolOutput> {
        let req = GroupMessageRequest::from_args(args)?;
        Ok(self.dispatch(shape_send_group_message(&req)).await)
    }

    /// Whether a number is reachable over iMessage or only SMS.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the number is not E.164.
    pub async fn lookup_number_service(&self, args: LookupNumberArgs) -> Result<ToolOutput> {
        let number = PhoneNumber::parse(&args.phone_number)?;
        Ok(self.dispatch(shape_lookup_number(&number)).await)
    }

    /// # Errors
    ///
    /// Returns a validation error if the number is not E.164.
    pub async fn send_typing_indicator(&self, args: TypingIndicatorArgs) -> Result<ToolOutput> {
        let number = PhoneNumber::parse(&args.to_number)?;
        Ok(self.dispatch(shape_typing_indicator(&number)).await)
    }

    /// Message history, unwrapped from Sendblue's `{"messages": [...]}` envelope.
    ///
    /// The output value is always a JSON array.
    ///
    /// # Errors
    ///
    /// Returns a validation error for malformed filters or paging values.
    pub async fn get_message_history(&self, args: MessageHistoryArgs) -> Result<ToolOutput> {
        let q = HistoryQuery::from_args(args)?;
        Ok(match self.dispatch(shape_message_history(&q)).await {
            ToolOutput::Provider(body) => {
                let messages = match body {
                    Value::Object(mut o) => match o.remove("messages") {
                        Some(Value::Array(messages)) => messages,
                        _ => Vec::new(),
                    },
                    _ => Vec::new(),
                };
                ToolOutput::Provider(Value::Array(messages))
            }
            ToolOutput::Failed(record) => ToolOutput::Failed(Value::Array(vec![record])),
        })
    }

    /// # Errors
    ///
    /// Returns a validation error if `group_id` is empty or the number is not E.164.
    pub async fn add_recipient_to_group(&self, args: AddRecipientArgs) -> Result<ToolOutput> {
        let m = GroupModification::from_args(args)?;
        Ok(self.dispatch(shape_add_recipient(&m)).await)
    }

    /// Mirror a publicly reachable media file onto Sendblue storage.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the URL is empty.
    pub async fn upload_media_for_sending(&self, args: UploadMediaArgs) -> Result<ToolOutput> {
        let m = MediaUploadRequest::from_args(args)?;
        Ok(self.dispatch(shape_upload_media(&m)).await)
    }
}
