//! A participant's answer to a question.

use serde::{Deserialize, Serialize};

/// The typed answer payload, matching the question body kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ResponseKind {
    /// Index of the chosen option.
    MultipleChoice { answer: usize },
    /// Free-form text, matched case-insensitively during grading.
    FillIn { answer: String },
}

/// One participant's response to one question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub submitter: String,
    #[serde(flatten)]
    pub kind: ResponseKind,
}

impl Response {
    pub fn multiple_choice(submitter: impl Into<String>, answer: usize) -> Self {
        Self {
            submitter: submitter.into(),
            kind: ResponseKind::MultipleChoice { answer },
        }
    }

    pub fn fill_in(submitter: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            submitter: submitter.into(),
            kind: ResponseKind::FillIn { answer: answer.into() },
        }
    }

    /// Key under which this response is counted in a question's frequency map.
    ///
    /// Multiple-choice responses key on the stringified option index,
    /// fill-in responses on the lowercased answer text.
    pub fn key(&self) -> String {
        match &self.kind {
            ResponseKind::MultipleChoice { answer } => answer.to_string(),
            ResponseKind::FillIn { answer } => answer.to_lowercase(),
        }
    }

    /// The answer as submitted, rendered for display to the session owner.
    pub fn as_text(&self) -> String {
        match &self.kind {
            ResponseKind::MultipleChoice { answer } => answer.to_string(),
            ResponseKind::FillIn { answer } => answer.clone(),
        }
    }
}
