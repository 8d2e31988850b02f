//! Wire contract: event names, the response envelope, and error descriptors.
//!
//! Every acknowledgement and broadcast is one JSON envelope. `data` is
//! present exactly on success, `errors` exactly on failure (and may itself
//! be null for requests whose arguments never decoded).

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Default listen port.
pub const DEFAULT_PORT: u16 = 30000;

pub const STATUS_OK: u16 = 200;
pub const STATUS_FAILED: u16 = 400;

/// Event names as they appear on the wire.
pub mod event {
    pub const CREATE_SESSION: &str = "create session";
    pub const CREATED_SESSION: &str = "created session";
    pub const JOIN_SESSION: &str = "join session";
    pub const USER_JOINED: &str = "user joined";
    pub const ADD_QUESTION: &str = "add question";
    pub const EDIT_QUESTION: &str = "edit question";
    pub const REMOVE_QUESTION: &str = "remove question";
    pub const KICK: &str = "kick";
    pub const USER_KICKED: &str = "user kicked";
    pub const START_SESSION: &str = "start session";
    pub const SESSION_STARTED: &str = "session started";
    pub const END_SESSION: &str = "end session";
    pub const SESSION_ENDED: &str = "session ended";
    pub const NEXT_QUESTION: &str = "next question";
    pub const QUESTION_RESPONSE: &str = "question response";
    pub const QUESTION_RESPONSE_ADDED: &str = "question response added";
    pub const END_QUESTION: &str = "end question";
    pub const QUESTION_ENDED: &str = "question ended";
    pub const SUBMIT_FEEDBACK: &str = "submit feedback";
    pub const FEEDBACK_SUBMITTED: &str = "feedback submitted";
    pub const SEND_HINT: &str = "send hint";
    pub const HINT_RECEIVED: &str = "hint received";
    pub const USER_DISCONNECTED: &str = "user disconnected";
}

/// An inbound frame: event name plus an optional argument object.
#[derive(Debug, Clone, Deserialize)]
pub struct RawRequest {
    pub event: String,
    #[serde(default)]
    pub args: Option<Value>,
}

/// One rejected argument. `value` is a scalar, null, or a nested
/// `{index, field, value}` object for per-element body errors.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub value: Value,
}

impl FieldError {
    pub fn new(field: &'static str, value: impl Into<Value>) -> Self {
        Self { field, value: value.into() }
    }

    pub fn null(field: &'static str) -> Self {
        Self { field, value: Value::Null }
    }

    /// Error against element `index` of a list-valued field.
    pub fn nested(
        field: &'static str,
        index: usize,
        inner: &'static str,
        value: impl Into<Value>,
    ) -> Self {
        Self {
            field,
            value: json!({ "index": index, "field": inner, "value": value.into() }),
        }
    }
}

/// The envelope carried by every acknowledgement and broadcast.
#[derive(Debug, Clone, Serialize)]
pub struct Envelope {
    pub status: u16,
    pub event: String,
    pub session: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Value>,
}

impl Envelope {
    pub fn ok(event: &str, session: Option<&str>, data: Value) -> Self {
        Self {
            status: STATUS_OK,
            event: event.to_string(),
            session: session.map(str::to_string),
            data: Some(data),
            errors: None,
        }
    }

    pub fn failed(event: &str, session: Option<&str>, errors: Vec<FieldError>) -> Self {
        Self {
            status: STATUS_FAILED,
            event: event.to_string(),
            session: session.map(str::to_string),
            data: None,
            errors: Some(json!(errors)),
        }
    }

    /// Failure for a request whose arguments never decoded: null errors.
    pub fn malformed(event: &str) -> Self {
        Self {
            status: STATUS_FAILED,
            event: event.to_string(),
            session: None,
            data: None,
            errors: Some(Value::Null),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_envelope_has_data_and_no_errors() {
        let envelope = Envelope::ok(event::CREATED_SESSION, Some("ABCD1234"), json!("ABCD1234"));
        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["status"], 200);
        assert_eq!(json["event"], "created session");
        assert_eq!(json["session"], "ABCD1234");
        assert_eq!(json["data"], "ABCD1234");
        assert!(json.get("errors").is_none());
    }

    #[test]
    fn failure_envelope_carries_descriptors() {
        let envelope = Envelope::failed(
            event::ADD_QUESTION,
            None,
            vec![FieldError::null("session")],
        );
        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["status"], 400);
        assert_eq!(json["session"], Value::Null);
        assert!(json.get("data").is_none());
        assert_eq!(json["errors"][0]["field"], "session");
        assert_eq!(json["errors"][0]["value"], Value::Null);
    }

    #[test]
    fn malformed_envelope_has_null_errors() {
        let envelope = Envelope::malformed(event::JOIN_SESSION);
        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["status"], 400);
        assert_eq!(json["session"], Value::Null);
        assert_eq!(json["errors"], Value::Null);
    }

    #[test]
    fn nested_descriptor_points_at_the_element() {
        let error = FieldError::nested("choices", 2, "points", -5);
        let json = serde_json::to_value(&error).unwrap();
        assert_eq!(json["field"], "choices");
        assert_eq!(json["value"]["index"], 2);
        assert_eq!(json["value"]["field"], "points");
        assert_eq!(json["value"]["value"], -5);
    }

    #[test]
    fn raw_request_decodes_with_and_without_args() {
        let with: RawRequest =
            serde_json::from_str(r#"{"event":"join session","args":{"id":"X"}}"#).unwrap();
        assert_eq!(with.event, "join session");
        assert!(with.args.is_some());

        let without: RawRequest = serde_json::from_str(r#"{"event":"create session"}"#).unwrap();
        assert!(without.args.is_none());
    }
}
