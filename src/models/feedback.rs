//! Participant feedback on a revealed question.

use serde::{Deserialize, Serialize};

/// Maximum length of a feedback message, in characters.
pub const FEEDBACK_MESSAGE_MAX_LENGTH: usize = 100;

/// One of the five known feedback levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Rating {
    Terrible,
    Poor,
    Fair,
    Good,
    Excellent,
}

impl From<Rating> for u8 {
    fn from(rating: Rating) -> u8 {
        match rating {
            Rating::Terrible => 0,
            Rating::Poor => 1,
            Rating::Fair => 2,
            Rating::Good => 3,
            Rating::Excellent => 4,
        }
    }
}

impl TryFrom<u8> for Rating {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, u8> {
        match value {
            0 => Ok(Rating::Terrible),
            1 => Ok(Rating::Poor),
            2 => Ok(Rating::Fair),
            3 => Ok(Rating::Good),
            4 => Ok(Rating::Excellent),
            other => Err(other),
        }
    }
}

/// A participant's rating and short message for one question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feedback {
    pub rating: Rating,
    pub message: String,
}

impl Feedback {
    pub fn new(rating: Rating, message: String) -> Self {
        Self { rating, message }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rating_converts_from_known_levels() {
        assert_eq!(Rating::try_from(0), Ok(Rating::Terrible));
        assert_eq!(Rating::try_from(4), Ok(Rating::Excellent));
        assert_eq!(Rating::try_from(5), Err(5));
    }

    #[test]
    fn rating_round_trips_through_wire_integer() {
        for raw in 0u8..=4 {
            let rating = Rating::try_from(raw).unwrap();
            assert_eq!(u8::from(rating), raw);
        }
    }

    #[test]
    fn feedback_serializes_rating_as_integer() {
        let feedback = Feedback::new(Rating::Good, "nice one".to_string());
        let json = serde_json::to_value(&feedback).unwrap();
        assert_eq!(json["rating"], 3);
        assert_eq!(json["message"], "nice one");
    }
}
