//! Purpose: Decode the `sendMessage` argument bag into a typed request.
//! Exports: `SendRequest`, `DecodeError`, `decode`.
//! Role: Schema step in front of the slot; runs before any state is touched.
//! Invariants: Pure; a decoded request always has non-empty recipient and body.
//! Invariants: Failures keep the offending field name for diagnostics.

use std::fmt;

use serde_json::{Map, Value};

use crate::core::error::{Error, ErrorKind};

pub const RECIPIENT_FIELD: &str = "recipient";
pub const MESSAGE_FIELD: &str = "message";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SendRequest {
    pub recipient: String,
    pub body: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DecodeError {
    Shape,
    MissingField(&'static str),
    EmptyField(&'static str),
}

impl DecodeError {
    pub fn field(&self) -> Option<&'static str> {
        match self {
            DecodeError::Shape => None,
            DecodeError::MissingField(field) | DecodeError::EmptyField(field) => Some(field),
        }
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::Shape => write!(f, "arguments must be an object"),
            DecodeError::MissingField(field) => write!(f, "missing string field `{field}`"),
            DecodeError::EmptyField(field) => write!(f, "field `{field}` must not be empty"),
        }
    }
}

impl std::error::Error for DecodeError {}

impl From<DecodeError> for Error {
    fn from(err: DecodeError) -> Self {
        let message = match err {
            DecodeError::Shape => "Arguments not in expected format",
            DecodeError::MissingField(RECIPIENT_FIELD) => "Recipient not found",
            DecodeError::MissingField(_) => "Message not found",
            DecodeError::EmptyField(RECIPIENT_FIELD) => "Recipient is empty",
            DecodeError::EmptyField(_) => "Message is empty",
        };
        let error = Error::new(ErrorKind::InvalidArguments).with_message(message);
        match err.field() {
            Some(field) => error.with_field(field),
            None => error.with_hint("Pass an object with string `recipient` and `message` keys."),
        }
    }
}

pub fn decode(arguments: &Value) -> Result<SendRequest, DecodeError> {
    let object = arguments.as_object().ok_or(DecodeError::Shape)?;
    let recipient = required_string(object, RECIPIENT_FIELD)?;
    let body = required_string(object, MESSAGE_FIELD)?;
    Ok(SendRequest {
        recipient: recipient.to_string(),
        body: body.to_string(),
    })
}

fn required_string<'a>(
    object: &'a Map<String, Value>,
    field: &'static str,
) -> Result<&'a str, DecodeError> {
    let value = object
        .get(field)
        .and_then(Value::as_str)
        .ok_or(DecodeError::MissingField(field))?;
    if value.is_empty() {
        return Err(DecodeError::EmptyField(field));
    }
    Ok(value)
}
