//! Core state objects: sessions, quizzes, questions, responses, feedback.

mod feedback;
mod question;
mod quiz;
mod response;
mod session;

pub use feedback::{FEEDBACK_MESSAGE_MAX_LENGTH, Feedback, Rating};
pub use question::{
    CHOICES_MAX, CHOICES_MIN, Choice, FILL_ANSWERS_MAX, FILL_ANSWERS_MIN, FillAnswer, Question,
    QuestionBody, QuestionError, TIME_LIMIT_MAX, TIME_LIMIT_MIN, TOTAL_POINTS_MAX,
    TOTAL_POINTS_MIN,
};
pub use quiz::Quiz;
pub use response::{Response, ResponseKind};
pub use session::{SESSION_CODE_LENGTH, Session, User, generate_code};
