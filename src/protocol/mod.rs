//! Wire contract between the server and quiz clients.
//!
//! Requests arrive as `{event, args}` frames; every acknowledgement and
//! broadcast leaves as an [`Envelope`].

mod events;
mod requests;
mod submission;

pub use events::{
    DEFAULT_PORT, Envelope, FieldError, RawRequest, STATUS_FAILED, STATUS_OK, event,
};
pub use requests::{
    AddQuestionArgs, EditQuestionArgs, EndQuestionArgs, FeedbackSubmission, JoinSessionArgs,
    KickArgs, QuestionResponseArgs, RemoveQuestionArgs, ResponseSubmission, SendHintArgs,
    SessionArgs, SubmitFeedbackArgs, parse_feedback, parse_response,
};
pub use submission::{QuestionSubmission, parse_question};
