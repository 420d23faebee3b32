//! Tool argument decoding and validation.
//!
//! Each tool has a raw `*Args` struct (what the MCP caller sent) and a validated value object.
//! Validation is pure: no I/O, no side effects. Cross-field rules always see the whole input.

use crate::config::SendStyle;
use crate::error::{Result, ValidationError};
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::LazyLock;

pub const MAX_GROUP_RECIPIENTS: usize = 25;
pub const HISTORY_LIMIT_MIN: i64 = 1;
pub const HISTORY_LIMIT_MAX: i64 = 1000;
pub const HISTORY_DEFAULT_LIMIT: i64 = 50;

static E164: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+[1-9]\d{1,14}$").expect("E.164 pattern is valid"));

/// Decode an MCP `arguments` object into a tool's raw argument struct.
///
/// # Errors
///
/// Returns [`ValidationError::InvalidArguments`] if a required field is missing or a field has
/// the wrong JSON type.
pub fn decode_args<T: DeserializeOwned>(arguments: Option<Map<String, Value>>) -> Result<T> {
    let obj = Value::Object(arguments.unwrap_or_default());
    serde_json::from_value(obj).map_err(|e| ValidationError::InvalidArguments(e.to_string()))
}

/// An E.164 phone number (`+` then 2-15 digits, no leading zero).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct PhoneNumber(String);

impl PhoneNumber {
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidPhoneNumber`] if `raw` is not E.164.
    pub fn parse(raw: &str) -> Result<Self> {
        if E164.is_match(raw) {
            Ok(Self(raw.to_string()))
        } else {
            Err(ValidationError::InvalidPhoneNumber(raw.to_string()))
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn parse_send_style(raw: &str) -> Result<SendStyle> {
    raw.parse().map_err(|()| ValidationError::InvalidSendStyle {
        value: raw.to_string(),
        allowed: SendStyle::allowed_values(),
    })
}

/// Empty strings count as absent.
fn present(v: Option<String>) -> Option<String> {
    v.filter(|s| !s.is_empty())
}

fn optional_phone(v: Option<String>) -> Result<Option<PhoneNumber>> {
    present(v).map(|s| PhoneNumber::parse(&s)).transpose()
}

fn optional_style(v: Option<String>) -> Result<Option<SendStyle>> {
    present(v).map(|s| parse_send_style(&s)).transpose()
}

fn required(v: String, field: &'static str) -> Result<String> {
    if v.is_empty() {
        Err(ValidationError::MissingField(field))
    } else {
        Ok(v)
    }
}

// ---------------------------------------------------------------------------------------------
// send_message

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SendMessageArgs {
    pub to_number: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub from_number: Option<String>,
    #[serde(default)]
    pub media_url: Option<String>,
    #[serde(default)]
    pub send_style: Option<String>,
    #[serde(default)]
    pub status_callback: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRequest {
    pub to: PhoneNumber,
    pub content: Option<String>,
    pub from: Option<PhoneNumber>,
    pub media_url: Option<String>,
    pub send_style: Option<SendStyle>,
    pub status_callback: Option<String>,
}

impl MessageRequest {
    /// # Errors
    ///
    /// Returns the first failing field check, then [`ValidationError::MissingContent`] if
    /// neither content nor media was supplied.
    pub fn from_args(args: SendMessageArgs) -> Result<Self> {
        let to = PhoneNumber::parse(&args.to_number)?;
        let from = optional_phone(args.from_number)?;
        let send_style = optional_style(args.send_style)?;
        // Forwarded as given, but only non-empty content satisfies the content-or-media rule.
        let content = args.content;
        let media_url = present(args.media_url);
        if content.as_deref().is_none_or(str::is_empty) && media_url.is_none() {
            return Err(ValidationError::MissingContent);
        }
        Ok(Self {
            to,
            content,
            from,
            media_url,
            send_style,
            status_callback: present(args.status_callback),
        })
    }
}

// ---------------------------------------------------------------------------------------------
// send_group_message

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SendGroupMessageArgs {
    #[serde(default)]
    pub to_numbers: Option<Vec<String>>,
    #[serde(default)]
    pub group_id: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub from_number: Option<String>,
    #[serde(default)]
    pub media_url: Option<String>,
    #[serde(default)]
    pub send_style: Option<String>,
    #[serde(default)]
    pub status_callback: Option<String>,
}

/// How a group message is addressed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupTarget {
    /// Ad-hoc group; Sendblue creates it if it doesn't exist.
    Recipients(Vec<PhoneNumber>),
    /// Existing group by id.
    Group(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupMessageRequest {
    pub target: GroupTarget,
    pub content: Option<String>,
    pub from: Option<PhoneNumber>,
    pub media_url: Option<String>,
    pub send_style: Option<SendStyle>,
    pub status_callback: Option<String>,
}

impl GroupMessageRequest {
    /// A non-empty `to_numbers` wins over `group_id` when both are given.
    ///
    /// # Errors
    ///
    /// Returns an error if the recipient list is over the cap or has a non-E.164 entry, if any
    /// other field is malformed, if neither addressing mode is present, or if neither content
    /// nor media is present.
    pub fn from_args(args: SendGroupMessageArgs) -> Result<Self> {
        let recipients = match args.to_numbers.filter(|v| !v.is_empty()) {
            Some(numbers) => {
                if numbers.len() > MAX_GROUP_RECIPIENTS {
                    return Err(ValidationError::TooManyRecipients {
                        max: MAX_GROUP_RECIPIENTS,
                        got: numbers.len(),
                    });
                }
                Some(
                    numbers
                        .iter()
                        .map(|n| PhoneNumber::parse(n))
                        .collect::<Result<Vec<_>>>()?,
                )
            }
            None => None,
        };
        let group_id = present(args.group_id);
        let from = optional_phone(args.from_number)?;
        let send_style = optional_style(args.send_style)?;

        let target = match (recipients, group_id) {
            (Some(numbers), _) => GroupTarget::Recipients(numbers),
            (None, Some(id)) => GroupTarget::Group(id),
            (None, None) => return Err(ValidationError::MissingAddressing),
        };

        let content = present(args.content);
        let media_url = present(args.media_url);
        if content.is_none() && media_url.is_none() {
            return Err(ValidationError::MissingContent);
        }

        Ok(Self {
            target,
            content,
            from,
            media_url,
            send_style,
            status_callback: present(args.status_callback),
        })
    }
}

// ---------------------------------------------------------------------------------------------
// lookup_number_service / send_typing_indicator

#[derive(Debug, Clone, Deserialize)]
pub struct LookupNumberArgs {
    pub phone_number: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TypingIndicatorArgs {
    pub to_number: String,
}

// ---------------------------------------------------------------------------------------------
// get_message_history

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageHistoryArgs {
    #[serde(default)]
    pub contact_phone_number: Option<String>,
    #[serde(default)]
    pub conversation_id: Option<String>,
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub offset: Option<i64>,
    #[serde(default)]
    pub from_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryQuery {
    pub contact: Option<PhoneNumber>,
    pub conversation_id: Option<String>,
    pub limit: i64,
    pub offset: i64,
    pub from_date: Option<String>,
}

impl HistoryQuery {
    /// # Errors
    ///
    /// Returns an error if the contact number is not E.164, `limit` is outside `[1, 1000]`, or
    /// `offset` is negative.
    pub fn from_args(args: MessageHistoryArgs) -> Result<Self> {
        let contact = optional_phone(args.contact_phone_number)?;
        let limit = args.limit.unwrap_or(HISTORY_DEFAULT_LIMIT);
        if !(HISTORY_LIMIT_MIN..=HISTORY_LIMIT_MAX).contains(&limit) {
            return Err(ValidationError::LimitOutOfRange {
                min: HISTORY_LIMIT_MIN,
                max: HISTORY_LIMIT_MAX,
                got: limit,
            });
        }
        let offset = args.offset.unwrap_or(0);
        if offset < 0 {
            return Err(ValidationError::NegativeOffset(offset));
        }
        Ok(Self {
            contact,
            conversation_id: present(args.conversation_id),
            limit,
            offset,
            from_date: present(args.from_date),
        })
    }
}

// ---------------------------------------------------------------------------------------------
// add_recipient_to_group

#[derive(Debug, Clone, Deserialize)]
pub struct AddRecipientArgs {
    pub group_id: String,
    pub recipient_number: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupModification {
    pub group_id: String,
    pub number: PhoneNumber,
}

impl GroupModification {
    /// # Errors
    ///
    /// Returns an error if `group_id` is empty or the recipient is not E.164.
    pub fn from_args(args: AddRecipientArgs) -> Result<Self> {
        let group_id = required(args.group_id, "group_id")?;
        let number = PhoneNumber::parse(&args.recipient_number)?;
        Ok(Self { group_id, number })
    }
}

// ---------------------------------------------------------------------------------------------
// upload_media_for_sending

#[derive(Debug, Clone, Deserialize)]
pub struct UploadMediaArgs {
    pub media_file_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaUploadRequest {
    pub media_url: String,
}

impl MediaUploadRequest {
    /// # Errors
    ///
    /// Returns [`ValidationError::MissingField`] if the URL is empty.
    pub fn from_args(args: UploadMediaArgs) -> Result<Self> {
        Ok(Self {
            media_url: required(args.media_file_url, "media_file_url")?,
        })
    }
}
