//! Decoded argument shapes for each request event.
//!
//! Every field is optional on the wire; handlers report precise descriptors
//! for whatever is absent or out of range.

use serde::Deserialize;
use serde_json::Value;

use crate::models::{FEEDBACK_MESSAGE_MAX_LENGTH, Feedback, Rating, Response};

use super::events::FieldError;

#[derive(Debug, Clone, Deserialize)]
pub struct JoinSessionArgs {
    pub id: Option<String>,
    pub name: Option<String>,
}

/// Arguments for owner requests that name only the session.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionArgs {
    pub session: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AddQuestionArgs {
    pub session: Option<String>,
    pub question: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EditQuestionArgs {
    pub session: Option<String>,
    pub index: Option<i64>,
    pub question: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemoveQuestionArgs {
    pub session: Option<String>,
    pub index: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KickArgs {
    pub session: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuestionResponseArgs {
    pub session: Option<String>,
    pub name: Option<String>,
    pub index: Option<i64>,
    pub response: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EndQuestionArgs {
    pub session: Option<String>,
    pub question: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubmitFeedbackArgs {
    pub session: Option<String>,
    pub name: Option<String>,
    pub question: Option<i64>,
    pub feedback: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SendHintArgs {
    pub session: Option<String>,
    pub question: Option<i64>,
    pub hint: Option<String>,
}

/// Raw response payload as submitted by a participant.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ResponseSubmission {
    MultipleChoice { answer: Option<i64> },
    FillIn { answer: Option<String> },
}

/// Decode a submitted response for the named participant. `None` means the
/// payload was malformed (missing kind, missing answer, negative index).
pub fn parse_response(raw: &Value, submitter: &str) -> Option<Response> {
    let submission: ResponseSubmission = serde_json::from_value(raw.clone()).ok()?;
    match submission {
        ResponseSubmission::MultipleChoice { answer } => {
            let answer = answer.filter(|a| *a >= 0)?;
            Some(Response::multiple_choice(submitter, answer as usize))
        }
        ResponseSubmission::FillIn { answer } => {
            let answer = answer.filter(|a| !a.is_empty())?;
            Some(Response::fill_in(submitter, answer))
        }
    }
}

/// Raw feedback payload as submitted by a participant.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeedbackSubmission {
    pub rating: Option<i64>,
    pub message: Option<String>,
}

/// Validate a submitted feedback payload, collecting every failure.
pub fn parse_feedback(raw: &Value) -> Result<Feedback, Vec<FieldError>> {
    let submission: FeedbackSubmission =
        serde_json::from_value(raw.clone()).map_err(|_| vec![FieldError::null("feedback")])?;

    let mut errors = Vec::new();
    let rating = match submission.rating {
        Some(raw) => match u8::try_from(raw).ok().and_then(|r| Rating::try_from(r).ok()) {
            Some(rating) => Some(rating),
            None => {
                errors.push(FieldError::new("rating", raw));
                None
            }
        },
        None => {
            errors.push(FieldError::null("rating"));
            None
        }
    };
    let message = match submission.message {
        Some(message) if message.chars().count() <= FEEDBACK_MESSAGE_MAX_LENGTH => Some(message),
        Some(message) => {
            errors.push(FieldError::new("message", message));
            None
        }
        None => {
            errors.push(FieldError::null("message"));
            None
        }
    };

    match (rating, message) {
        (Some(rating), Some(message)) if errors.is_empty() => Ok(Feedback::new(rating, message)),
        _ => Err(errors),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ResponseKind;
    use serde_json::json;

    #[test]
    fn parses_multiple_choice_response() {
        let raw = json!({ "kind": "multiple-choice", "answer": 1, "submitter": "b" });
        let response = parse_response(&raw, "b").unwrap();
        assert_eq!(response.submitter, "b");
        assert_eq!(response.kind, ResponseKind::MultipleChoice { answer: 1 });
    }

    #[test]
    fn rejects_malformed_responses() {
        assert!(parse_response(&json!({ "answer": 1 }), "b").is_none());
        assert!(parse_response(&json!({ "kind": "multiple-choice" }), "b").is_none());
        assert!(parse_response(&json!({ "kind": "multiple-choice", "answer": -1 }), "b").is_none());
        assert!(parse_response(&json!({ "kind": "fill-in", "answer": "" }), "b").is_none());
        assert!(parse_response(&json!({ "kind": "essay", "answer": "x" }), "b").is_none());
    }

    #[test]
    fn feedback_accepts_message_at_the_limit() {
        let raw = json!({ "rating": 4, "message": "m".repeat(100) });
        assert!(parse_feedback(&raw).is_ok());
    }

    #[test]
    fn feedback_rejects_overlong_message() {
        let raw = json!({ "rating": 4, "message": "m".repeat(101) });
        let errors = parse_feedback(&raw).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "message");
    }

    #[test]
    fn feedback_rejects_unknown_or_missing_rating() {
        let errors = parse_feedback(&json!({ "rating": 5, "message": "ok" })).unwrap_err();
        assert_eq!(errors[0].field, "rating");

        let errors = parse_feedback(&json!({ "message": "ok" })).unwrap_err();
        assert_eq!(errors[0].field, "rating");
        assert_eq!(errors[0].value, serde_json::Value::Null);
    }

    #[test]
    fn feedback_collects_both_failures() {
        let errors = parse_feedback(&json!({ "rating": 9, "message": "m".repeat(101) }))
            .unwrap_err();
        assert_eq!(errors.len(), 2);
    }
}
