//! Purpose: Single error type shared by the bridge core, the host, and the CLI.
//! Exports: `Error`, `ErrorKind`, `to_wire_code`, `to_exit_code`.
//! Role: Carries the stable failure code a caller sees plus diagnostic context.
//! Invariants: Wire codes and exit codes are stable once published.
//! Invariants: Details are additive key/value context, never required for routing.

use std::error::Error as StdError;
use std::fmt;

use serde_json::{Map, Value};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    Internal,
    Usage,
    InvalidArguments,
    Unavailable,
    Busy,
    SendFailed,
    UnknownResult,
    NotImplemented,
    Abandoned,
    Io,
}

#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    message: Option<String>,
    hint: Option<String>,
    details: Map<String, Value>,
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl Error {
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: None,
            hint: None,
            details: Map::new(),
            source: None,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn code(&self) -> &'static str {
        to_wire_code(self.kind)
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn hint(&self) -> Option<&str> {
        self.hint.as_deref()
    }

    pub fn details(&self) -> &Map<String, Value> {
        &self.details
    }

    pub fn field(&self) -> Option<&str> {
        self.details.get("field").and_then(Value::as_str)
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn with_field(self, field: &str) -> Self {
        self.with_detail("field", Value::from(field))
    }

    pub fn with_detail(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.details.insert(key.to_string(), value.into());
        self
    }

    pub fn with_source(mut self, source: impl StdError + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())?;
        if let Some(message) = &self.message {
            write!(f, ": {message}")?;
        }
        if let Some(field) = self.field() {
            write!(f, " (field: {field})")?;
        }
        Ok(())
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|source| source.as_ref() as &(dyn StdError + 'static))
    }
}

pub fn to_wire_code(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::Internal => "INTERNAL",
        ErrorKind::Usage => "USAGE",
        ErrorKind::InvalidArguments => "INVALID_ARGUMENTS",
        ErrorKind::Unavailable => "SMS_NOT_AVAILABLE",
        ErrorKind::Busy => "ALREADY_IN_PROGRESS",
        ErrorKind::SendFailed => "SEND_FAILED",
        ErrorKind::UnknownResult => "UNKNOWN_RESULT",
        ErrorKind::NotImplemented => "NOT_IMPLEMENTED",
        ErrorKind::Abandoned => "CALL_ABANDONED",
        ErrorKind::Io => "IO",
    }
}

pub fn to_exit_code(kind: ErrorKind) -> i32 {
    match kind {
        ErrorKind::Internal => 1,
        ErrorKind::Usage => 2,
        ErrorKind::InvalidArguments => 3,
        ErrorKind::Unavailable => 4,
        ErrorKind::Busy => 5,
        ErrorKind::SendFailed => 6,
        ErrorKind::UnknownResult => 7,
        ErrorKind::NotImplemented => 8,
        ErrorKind::Abandoned => 9,
        ErrorKind::Io => 10,
    }
}
