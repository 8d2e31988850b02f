//! Question state machine, grading, and per-answer statistics.
//!
//! A question moves through `Created -> Started -> Ended`. While started it
//! collects at most one response per participant, grades each on arrival,
//! and maintains a frequency count per answer key. A started question holds
//! the abort handle of its expiry task; ending the question from any path
//! cancels the pending expiry.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;
use tokio::task::AbortHandle;

use super::feedback::Feedback;
use super::response::{Response, ResponseKind};

/// Shortest admissible time limit, in seconds.
pub const TIME_LIMIT_MIN: u64 = 60;
/// Longest admissible time limit, in seconds.
pub const TIME_LIMIT_MAX: u64 = 300;
/// Minimum total points a question must award to be accepted.
pub const TOTAL_POINTS_MIN: u32 = 100;
/// Maximum total points a question may award.
pub const TOTAL_POINTS_MAX: u32 = 1000;
/// Bounds on the number of multiple-choice options.
pub const CHOICES_MIN: usize = 2;
pub const CHOICES_MAX: usize = 4;
/// Bounds on the number of accepted fill-in answers.
pub const FILL_ANSWERS_MIN: usize = 1;
pub const FILL_ANSWERS_MAX: usize = 3;

/// Why a response was not recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum QuestionError {
    #[error("question has not been started")]
    NotStarted,
    #[error("question has already ended")]
    Ended,
    #[error("submitter has already responded")]
    DuplicateResponse,
}

/// One multiple-choice option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    pub text: String,
    pub points: u32,
}

impl Choice {
    pub fn new(text: impl Into<String>, points: u32) -> Self {
        Self { text: text.into(), points }
    }
}

/// One accepted fill-in answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FillAnswer {
    pub text: String,
    pub points: u32,
}

impl FillAnswer {
    pub fn new(text: impl Into<String>, points: u32) -> Self {
        Self { text: text.into(), points }
    }
}

/// The gradable body of a question.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum QuestionBody {
    MultipleChoice {
        choices: Vec<Choice>,
        answer: usize,
    },
    FillIn {
        answers: Vec<FillAnswer>,
        /// Lowercased answer text -> points, built once so grading avoids
        /// rescanning the answer list.
        #[serde(skip)]
        lookup: HashMap<String, u32>,
    },
}

impl QuestionBody {
    pub fn multiple_choice(choices: Vec<Choice>, answer: usize) -> Self {
        Self::MultipleChoice { choices, answer }
    }

    pub fn fill_in(answers: Vec<FillAnswer>) -> Self {
        let lookup = answers
            .iter()
            .map(|a| (a.text.to_lowercase(), a.points))
            .collect();
        Self::FillIn { answers, lookup }
    }

    /// Whether both bodies are the same kind (used by question replacement).
    pub fn kind_matches(&self, other: &QuestionBody) -> bool {
        matches!(
            (self, other),
            (Self::MultipleChoice { .. }, Self::MultipleChoice { .. })
                | (Self::FillIn { .. }, Self::FillIn { .. })
        )
    }

    /// Sum of the points across all options or answers.
    pub fn total_points(&self) -> u32 {
        match self {
            Self::MultipleChoice { choices, .. } => choices.iter().map(|c| c.points).sum(),
            Self::FillIn { answers, .. } => answers.iter().map(|a| a.points).sum(),
        }
    }

    /// Frequency keys known at construction time.
    fn answer_keys(&self) -> Vec<String> {
        match self {
            Self::MultipleChoice { choices, .. } => {
                (0..choices.len()).map(|i| i.to_string()).collect()
            }
            Self::FillIn { answers, .. } => {
                answers.iter().map(|a| a.text.to_lowercase()).collect()
            }
        }
    }
}

/// A single quiz question with its collected responses and statistics.
#[derive(Debug)]
pub struct Question {
    index: i64,
    text: String,
    time_limit: u64,
    total_points: u32,
    body: QuestionBody,
    is_started: bool,
    has_ended: bool,
    responses: HashMap<String, Response>,
    frequency: HashMap<String, u64>,
    first_correct: Option<String>,
    feedback: HashMap<String, Feedback>,
    timer: Option<AbortHandle>,
}

impl Question {
    /// Create an unstarted question. The frequency map is pre-seeded at zero
    /// for every known answer key so relative frequencies are defined for
    /// canonical answers from the first response.
    pub fn new(text: impl Into<String>, body: QuestionBody, time_limit: u64) -> Self {
        let frequency = body.answer_keys().into_iter().map(|k| (k, 0)).collect();
        let total_points = body.total_points();
        Self {
            index: -1,
            text: text.into(),
            time_limit,
            total_points,
            body,
            is_started: false,
            has_ended: false,
            responses: HashMap::new(),
            frequency,
            first_correct: None,
            feedback: HashMap::new(),
            timer: None,
        }
    }

    pub fn index(&self) -> i64 {
        self.index
    }

    pub(crate) fn set_index(&mut self, index: i64) {
        self.index = index;
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn time_limit(&self) -> u64 {
        self.time_limit
    }

    pub fn total_points(&self) -> u32 {
        self.total_points
    }

    pub fn body(&self) -> &QuestionBody {
        &self.body
    }

    pub fn is_started(&self) -> bool {
        self.is_started
    }

    pub fn has_ended(&self) -> bool {
        self.has_ended
    }

    pub fn first_correct(&self) -> Option<&str> {
        self.first_correct.as_deref()
    }

    pub fn responses(&self) -> &HashMap<String, Response> {
        &self.responses
    }

    pub fn frequency(&self) -> &HashMap<String, u64> {
        &self.frequency
    }

    /// Mark the question started. Starting an already-started question is a
    /// no-op; the expiry task is armed separately by the controller.
    pub fn start(&mut self) {
        self.is_started = true;
    }

    /// Store the abort handle of the pending expiry task.
    pub fn arm_timer(&mut self, handle: AbortHandle) {
        self.timer = Some(handle);
    }

    /// End the question, cancelling any pending expiry. Returns `true` only
    /// on the first successful transition from started to ended.
    pub fn end(&mut self) -> bool {
        if !self.is_started || self.has_ended {
            return false;
        }
        self.has_ended = true;
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
        true
    }

    /// Record a response, grade it, and return the points earned.
    pub fn add_response(&mut self, response: Response) -> Result<u32, QuestionError> {
        if !self.is_started {
            return Err(QuestionError::NotStarted);
        }
        if self.has_ended {
            return Err(QuestionError::Ended);
        }
        if self.responses.contains_key(&response.submitter) {
            return Err(QuestionError::DuplicateResponse);
        }

        let points = self.grade(&response);
        *self.frequency.entry(response.key()).or_insert(0) += 1;
        if points > 0 && self.first_correct.is_none() {
            self.first_correct = Some(response.submitter.clone());
        }
        self.responses.insert(response.submitter.clone(), response);
        Ok(points)
    }

    /// Points a response earns against this body. A response of the wrong
    /// kind earns zero; fill-in matching is case-insensitive.
    pub fn grade(&self, response: &Response) -> u32 {
        match (&self.body, &response.kind) {
            (
                QuestionBody::MultipleChoice { choices, answer },
                ResponseKind::MultipleChoice { answer: submitted },
            ) => {
                if submitted == answer {
                    choices[*answer].points
                } else {
                    0
                }
            }
            (QuestionBody::FillIn { lookup, .. }, ResponseKind::FillIn { answer }) => {
                lookup.get(&answer.to_lowercase()).copied().unwrap_or(0)
            }
            _ => 0,
        }
    }

    /// How many recorded responses share this response's answer key.
    pub fn frequency_of(&self, response: &Response) -> u64 {
        self.frequency.get(&response.key()).copied().unwrap_or(0)
    }

    /// Share of recorded responses at this response's answer key. The caller
    /// guarantees at least one response has been recorded.
    pub fn relative_frequency_of(&self, response: &Response) -> f64 {
        self.frequency_of(response) as f64 / self.responses.len() as f64
    }

    /// Store a participant's feedback. Returns `false` on a duplicate.
    pub fn add_feedback(&mut self, name: &str, feedback: Feedback) -> bool {
        if self.feedback.contains_key(name) {
            return false;
        }
        self.feedback.insert(name.to_string(), feedback);
        true
    }

    pub fn feedback(&self) -> &HashMap<String, Feedback> {
        &self.feedback
    }

    /// The question as sent to clients with a `next question` broadcast.
    pub fn to_wire(&self) -> Value {
        json!({
            "index": self.index,
            "text": &self.text,
            "timeLimit": self.time_limit,
            "totalPoints": self.total_points,
            "body": &self.body,
        })
    }
}

// A cloned question is a snapshot: it carries no live expiry task.
impl Clone for Question {
    fn clone(&self) -> Self {
        Self {
            index: self.index,
            text: self.text.clone(),
            time_limit: self.time_limit,
            total_points: self.total_points,
            body: self.body.clone(),
            is_started: self.is_started,
            has_ended: self.has_ended,
            responses: self.responses.clone(),
            frequency: self.frequency.clone(),
            first_correct: self.first_correct.clone(),
            feedback: self.feedback.clone(),
            timer: None,
        }
    }
}
