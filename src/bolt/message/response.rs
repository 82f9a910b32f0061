//! Bolt protocol response messages.
//!
//! Response messages are sent from the server to the client.

use std::collections::HashMap;
use std::fmt;

use super::tag;
use crate::bolt::value::{fmt_map, Value};

/// All Bolt response messages.
#[derive(Debug, Clone, PartialEq)]
pub enum BoltResponse {
    /// SUCCESS - Operation completed successfully
    Success(SuccessMessage),
    /// RECORD - Query result record
    Record(RecordMessage),
    /// FAILURE - Operation failed
    Failure(FailureMessage),
    /// IGNORED - Message was ignored (connection in FAILED state)
    Ignored,
}

impl BoltResponse {
    /// Get the message tag.
    pub fn tag(&self) -> u8 {
        match self {
            BoltResponse::Success(_) => tag::SUCCESS,
            BoltResponse::Record(_) => tag::RECORD,
            BoltResponse::Failure(_) => tag::FAILURE,
            BoltResponse::Ignored => tag::IGNORED,
        }
    }

    /// Get message name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            BoltResponse::Success(_) => "SUCCESS",
            BoltResponse::Record(_) => "RECORD",
            BoltResponse::Failure(_) => "FAILURE",
            BoltResponse::Ignored => "IGNORED",
        }
    }
}

impl fmt::Display for BoltResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoltResponse::Success(msg) => {
                write!(f, "SUCCESS ")?;
                fmt_map(f, &msg.metadata)
            }
            BoltResponse::Record(msg) => {
                write!(f, "RECORD ")?;
                fmt::Display::fmt(&Value::List(msg.fields.clone()), f)
            }
            BoltResponse::Failure(msg) => write!(f, "FAILURE {} \"{}\"", msg.code, msg.message),
            BoltResponse::Ignored => write!(f, "IGNORED"),
        }
    }
}

/// SUCCESS message - Operation completed successfully.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SuccessMessage {
    /// Response metadata
    pub metadata: HashMap<String, Value>,
}

impl SuccessMessage {
    /// Create a new SUCCESS message with empty metadata.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a SUCCESS message with metadata.
    pub fn with_metadata(metadata: HashMap<String, Value>) -> Self {
        Self { metadata }
    }

    /// Add metadata entry.
    pub fn add(&mut self, key: &str, value: impl Into<Value>) {
        self.metadata.insert(key.to_string(), value.into());
    }

    /// Get metadata entry.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.metadata.get(key)
    }

    /// Get server agent.
    pub fn server(&self) -> Option<&str> {
        self.get("server").and_then(Value::as_str)
    }

    /// Get field names from RUN success.
    pub fn fields(&self) -> Option<Vec<String>> {
        self.get("fields").and_then(Value::as_list).map(|list| {
            list.iter()
                .filter_map(|item| item.as_str().map(str::to_string))
                .collect()
        })
    }

    /// Check if there are more results.
    pub fn has_more(&self) -> bool {
        self.get("has_more").and_then(Value::as_bool).unwrap_or(false)
    }

    /// Get bookmark.
    pub fn bookmark(&self) -> Option<&str> {
        self.get("bookmark").and_then(Value::as_str)
    }

    /// Get query ID.
    pub fn qid(&self) -> Option<i64> {
        self.get("qid").and_then(Value::as_int)
    }

    /// Get connection ID.
    pub fn connection_id(&self) -> Option<&str> {
        self.get("connection_id").and_then(Value::as_str)
    }

    /// Patches the server agreed to in HELLO.
    pub fn patch_bolt(&self) -> Vec<String> {
        self.get("patch_bolt")
            .and_then(Value::as_list)
            .map(|list| {
                list.iter()
                    .filter_map(|item| item.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Create a HELLO success response.
    pub fn hello_success(server: &str, connection_id: &str) -> Self {
        let mut msg = Self::new();
        msg.add("server", server);
        msg.add("connection_id", connection_id);
        msg
    }

    /// Create a RUN success response.
    pub fn run_success(fields: Vec<String>, qid: Option<i64>) -> Self {
        let mut msg = Self::new();
        let field_list: Vec<Value> = fields.into_iter().map(Value::String).collect();
        msg.add("fields", field_list);
        if let Some(id) = qid {
            msg.add("qid", id);
        }
        msg
    }

    /// Create a PULL/DISCARD success response.
    pub fn streaming_success(has_more: bool, bookmark: Option<String>) -> Self {
        let mut msg = Self::new();
        if has_more {
            msg.add("has_more", true);
        }
        if let Some(bm) = bookmark {
            msg.add("bookmark", bm);
        }
        msg
    }
}

/// RECORD message - Query result record.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RecordMessage {
    /// Field values
    pub fields: Vec<Value>,
}

impl RecordMessage {
    /// Create a new RECORD message.
    pub fn new(fields: Vec<Value>) -> Self {
        Self { fields }
    }

    /// Get field count.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Check if record is empty.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Get field at index.
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.fields.get(index)
    }
}

/// FAILURE message - Operation failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureMessage {
    /// Server status code
    pub code: String,
    /// Error message
    pub message: String,
}

impl FailureMessage {
    /// Create a new FAILURE message.
    pub fn new(code: &str, message: &str) -> Self {
        Self {
            code: code.to_string(),
            message: message.to_string(),
        }
    }
}

impl fmt::Display for FailureMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}
