//! Parser turning raw client question submissions into validated questions.
//!
//! Every field of a submission is potentially absent. Validation collects
//! all failures into one descriptor list; only an absent or undecodable
//! body stops further checks.

use serde::Deserialize;
use serde_json::Value;

use crate::models::{
    CHOICES_MAX, CHOICES_MIN, Choice, FILL_ANSWERS_MAX, FILL_ANSWERS_MIN, FillAnswer, Question,
    QuestionBody, TIME_LIMIT_MAX, TIME_LIMIT_MIN, TOTAL_POINTS_MAX, TOTAL_POINTS_MIN,
};

use super::events::FieldError;

/// Raw question shape as clients submit it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionSubmission {
    pub text: Option<String>,
    pub time_limit: Option<i64>,
    pub body: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
enum BodySubmission {
    MultipleChoice {
        choices: Option<Vec<ElementSubmission>>,
        answer: Option<i64>,
    },
    FillIn {
        answers: Option<Vec<ElementSubmission>>,
    },
}

/// One submitted choice or fill-in answer.
#[derive(Debug, Deserialize)]
struct ElementSubmission {
    text: Option<String>,
    points: Option<i64>,
}

/// Validate a submission and build the question, or report every failure.
pub fn parse_question(raw: &Value) -> Result<Question, Vec<FieldError>> {
    let submission: QuestionSubmission =
        serde_json::from_value(raw.clone()).map_err(|_| vec![FieldError::null("question")])?;

    let mut errors = Vec::new();

    let text = match submission.text {
        Some(text) if !text.is_empty() => Some(text),
        Some(_) => {
            errors.push(FieldError::new("text", ""));
            None
        }
        None => {
            errors.push(FieldError::null("text"));
            None
        }
    };

    let time_limit = match submission.time_limit {
        Some(limit) if (TIME_LIMIT_MIN as i64..=TIME_LIMIT_MAX as i64).contains(&limit) => {
            Some(limit as u64)
        }
        Some(limit) => {
            errors.push(FieldError::new("timeLimit", limit));
            None
        }
        None => {
            errors.push(FieldError::null("timeLimit"));
            None
        }
    };

    let Some(body_raw) = submission.body else {
        errors.push(FieldError::null("question"));
        return Err(errors);
    };
    let body_submission: BodySubmission = match serde_json::from_value(body_raw) {
        Ok(body) => body,
        Err(_) => {
            errors.push(FieldError::null("question"));
            return Err(errors);
        }
    };

    let body = match body_submission {
        BodySubmission::MultipleChoice { choices, answer } => {
            parse_multiple_choice(choices.unwrap_or_default(), answer, &mut errors)
        }
        BodySubmission::FillIn { answers } => {
            parse_fill_in(answers.unwrap_or_default(), &mut errors)
        }
    };

    match (text, time_limit, body) {
        (Some(text), Some(time_limit), Some(body)) if errors.is_empty() => {
            Ok(Question::new(text, body, time_limit))
        }
        _ => Err(errors),
    }
}

fn parse_multiple_choice(
    choices: Vec<ElementSubmission>,
    answer: Option<i64>,
    errors: &mut Vec<FieldError>,
) -> Option<QuestionBody> {
    let count = choices.len();
    if !(CHOICES_MIN..=CHOICES_MAX).contains(&count) {
        errors.push(FieldError::new("choices", count as i64));
    }

    let parsed = parse_elements("choices", choices, errors);

    let answer = match answer {
        Some(answer) if answer >= 0 && (answer as usize) < count => Some(answer as usize),
        Some(answer) => {
            errors.push(FieldError::new("answer", answer));
            None
        }
        None => {
            errors.push(FieldError::null("answer"));
            None
        }
    };

    check_total_points(&parsed, errors);

    match (parsed, answer) {
        (Some(choices), Some(answer)) if errors.is_empty() => {
            Some(QuestionBody::multiple_choice(choices, answer))
        }
        _ => None,
    }
}

fn parse_fill_in(
    answers: Vec<ElementSubmission>,
    errors: &mut Vec<FieldError>,
) -> Option<QuestionBody> {
    if !(FILL_ANSWERS_MIN..=FILL_ANSWERS_MAX).contains(&answers.len()) {
        errors.push(FieldError::new("answers", answers.len() as i64));
    }

    let parsed = parse_elements("answers", answers, errors);
    check_total_points(&parsed, errors);

    match parsed {
        Some(answers) if errors.is_empty() => Some(QuestionBody::fill_in(
            answers
                .into_iter()
                .map(|c| FillAnswer::new(c.text, c.points))
                .collect(),
        )),
        _ => None,
    }
}

/// Validate each element's text and points; `None` when any element failed.
fn parse_elements(
    field: &'static str,
    elements: Vec<ElementSubmission>,
    errors: &mut Vec<FieldError>,
) -> Option<Vec<Choice>> {
    let mut parsed = Vec::with_capacity(elements.len());
    let mut complete = true;
    for (index, element) in elements.into_iter().enumerate() {
        let text = match element.text {
            Some(text) if !text.is_empty() => Some(text),
            Some(_) => {
                errors.push(FieldError::nested(field, index, "text", ""));
                None
            }
            None => {
                errors.push(FieldError::nested(field, index, "text", Value::Null));
                None
            }
        };
        let points = match element.points {
            Some(points) if points >= 0 => Some(points as u32),
            Some(points) => {
                errors.push(FieldError::nested(field, index, "points", points));
                None
            }
            None => {
                errors.push(FieldError::nested(field, index, "points", Value::Null));
                None
            }
        };
        match (text, points) {
            (Some(text), Some(points)) => parsed.push(Choice::new(text, points)),
            _ => complete = false,
        }
    }
    complete.then_some(parsed)
}

fn check_total_points(elements: &Option<Vec<Choice>>, errors: &mut Vec<FieldError>) {
    let Some(elements) = elements else { return };
    let total: u32 = elements.iter().map(|e| e.points).sum();
    if !(TOTAL_POINTS_MIN..=TOTAL_POINTS_MAX).contains(&total) {
        errors.push(FieldError::new("totalPoints", total));
    }
}
