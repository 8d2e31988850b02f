//! # quizroom
//!
//! A real-time server for interactive classroom quiz sessions.
//!
//! An owner creates a session and shares its 8-character code;
//! participants join the session's room over WebSocket. The owner authors
//! questions, advances the quiz question-by-question under per-question
//! time limits, kicks users, and pushes hints. The server grades each
//! response as it arrives, tracks first-correct attribution and per-answer
//! frequencies, and broadcasts lifecycle events to the room.
//!
//! Everything is in-memory: a session lives exactly as long as its owner's
//! connection.

pub mod models;
pub mod protocol;
pub mod server;
