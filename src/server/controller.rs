//! Session controller: routes wire events to handlers, enforces owner and
//! identity authorization, mutates session state, and fans out broadcasts.
//!
//! All state lives behind one mutex, so operations on a session never
//! interleave. Handlers mutate first, then acknowledge the caller, then
//! broadcast, so a follow-up request always observes the new state. Every
//! recognized request is acknowledged exactly once.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::models::{QuestionError, Session, User, generate_code};
use crate::protocol::{
    AddQuestionArgs, EditQuestionArgs, EndQuestionArgs, Envelope, FieldError, JoinSessionArgs,
    KickArgs, QuestionResponseArgs, RawRequest, RemoveQuestionArgs, SendHintArgs, SessionArgs,
    SubmitFeedbackArgs, event, parse_feedback, parse_question, parse_response,
};

use super::transport::{ConnectionId, Transport};

/// Controller state shared across connection tasks and question timers.
pub type SharedController = Arc<Mutex<Controller>>;

#[derive(Debug, Default)]
pub struct Controller {
    sessions: HashMap<String, Session>,
    transport: Transport,
}

fn decode<T: DeserializeOwned>(args: Option<Value>) -> Option<T> {
    serde_json::from_value(args?).ok()
}

impl Controller {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedController {
        Arc::new(Mutex::new(Self::new()))
    }

    pub fn transport_mut(&mut self) -> &mut Transport {
        &mut self.transport
    }

    /// Route one decoded frame to its handler.
    pub async fn dispatch(shared: &SharedController, caller: ConnectionId, request: RawRequest) {
        let mut controller = shared.lock().await;
        match request.event.as_str() {
            event::CREATE_SESSION => controller.create_session(caller),
            event::JOIN_SESSION => controller.join_session(caller, request.args),
            event::ADD_QUESTION => controller.add_question(caller, request.args),
            event::EDIT_QUESTION => controller.edit_question(caller, request.args),
            event::REMOVE_QUESTION => controller.remove_question(caller, request.args),
            event::KICK => controller.kick(caller, request.args),
            event::START_SESSION => controller.start_session(caller, request.args),
            event::END_SESSION => controller.end_session(caller, request.args),
            event::NEXT_QUESTION => controller.next_question(shared, caller, request.args),
            event::QUESTION_RESPONSE => controller.question_response(caller, request.args),
            event::END_QUESTION => controller.end_question(caller, request.args),
            event::SUBMIT_FEEDBACK => controller.submit_feedback(caller, request.args),
            event::SEND_HINT => controller.send_hint(caller, request.args),
            other => warn!(event = other, "ignoring unknown event"),
        }
    }

    /// The transport fires this when a connection closes.
    pub async fn handle_disconnect(shared: &SharedController, caller: ConnectionId) {
        let mut controller = shared.lock().await;
        controller.disconnect(caller);
    }

    /// Owner authorization: the session must exist and be owned by the
    /// caller. An unknown id is reported back; a foreign session is not.
    fn owned_session<'a>(
        sessions: &'a mut HashMap<String, Session>,
        caller: ConnectionId,
        id: Option<&str>,
    ) -> Result<&'a mut Session, FieldError> {
        let Some(id) = id else {
            return Err(FieldError::null("session"));
        };
        match sessions.get_mut(id) {
            None => Err(FieldError::new("session", id)),
            Some(session) if session.owner() != caller => Err(FieldError::null("session")),
            Some(session) => Ok(session),
        }
    }

    fn live_session<'a>(
        sessions: &'a mut HashMap<String, Session>,
        id: Option<&str>,
    ) -> Result<&'a mut Session, FieldError> {
        let Some(id) = id else {
            return Err(FieldError::null("session"));
        };
        sessions
            .get_mut(id)
            .ok_or_else(|| FieldError::new("session", id))
    }

    fn create_session(&mut self, caller: ConnectionId) {
        let code = loop {
            let code = generate_code();
            if !self.sessions.contains_key(&code) {
                break code;
            }
        };
        self.sessions.insert(code.clone(), Session::new(code.clone(), caller));
        self.transport.join_room(caller, &code);
        info!(session = %code, "session created");
        self.transport.emit_to_one(
            caller,
            Envelope::ok(event::CREATED_SESSION, Some(&code), json!(&code)),
        );
    }

    fn join_session(&mut self, caller: ConnectionId, args: Option<Value>) {
        let Some(args) = decode::<JoinSessionArgs>(args) else {
            self.transport.emit_to_one(caller, Envelope::malformed(event::JOIN_SESSION));
            return;
        };
        let session = match Self::live_session(&mut self.sessions, args.id.as_deref()) {
            Ok(session) => session,
            Err(error) => {
                self.transport.emit_to_one(
                    caller,
                    Envelope::failed(event::JOIN_SESSION, None, vec![error]),
                );
                return;
            }
        };
        let Some(name) = args.name.filter(|n| !n.is_empty()) else {
            self.transport.emit_to_one(
                caller,
                Envelope::failed(event::JOIN_SESSION, None, vec![FieldError::null("name")]),
            );
            return;
        };
        if !session.add_user(User::new(name.clone(), caller)) {
            self.transport.emit_to_one(
                caller,
                Envelope::failed(event::JOIN_SESSION, None, vec![FieldError::new("name", name)]),
            );
            return;
        }
        let id = session.id().to_string();
        debug!(session = %id, user = %name, "user joined");
        self.transport.join_room(caller, &id);
        self.transport
            .emit_to_one(caller, Envelope::ok(event::JOIN_SESSION, Some(&id), Value::Null));
        self.transport.emit_to_room_except(
            &id,
            caller,
            Envelope::ok(event::USER_JOINED, Some(&id), json!({ "name": name })),
        );
    }

    fn add_question(&mut self, caller: ConnectionId, args: Option<Value>) {
        let Some(args) = decode::<AddQuestionArgs>(args) else {
            self.transport.emit_to_one(caller, Envelope::malformed(event::ADD_QUESTION));
            return;
        };
        let session = match Self::owned_session(&mut self.sessions, caller, args.session.as_deref())
        {
            Ok(session) => session,
            Err(error) => {
                self.transport.emit_to_one(
                    caller,
                    Envelope::failed(event::ADD_QUESTION, None, vec![error]),
                );
                return;
            }
        };
        let Some(question_raw) = args.question else {
            self.transport.emit_to_one(
                caller,
                Envelope::failed(event::ADD_QUESTION, None, vec![FieldError::null("question")]),
            );
            return;
        };
        match parse_question(&question_raw) {
            Err(errors) => {
                self.transport
                    .emit_to_one(caller, Envelope::failed(event::ADD_QUESTION, None, errors));
            }
            Ok(question) => {
                session.quiz_mut().add_question(question);
                let id = session.id().to_string();
                debug!(session = %id, count = session.quiz().num_questions(), "question added");
                self.transport
                    .emit_to_one(caller, Envelope::ok(event::ADD_QUESTION, Some(&id), Value::Null));
            }
        }
    }

    fn edit_question(&mut self, caller: ConnectionId, args: Option<Value>) {
        let Some(args) = decode::<EditQuestionArgs>(args) else {
            self.transport.emit_to_one(caller, Envelope::malformed(event::EDIT_QUESTION));
            return;
        };
        let session = match Self::owned_session(&mut self.sessions, caller, args.session.as_deref())
        {
            Ok(session) => session,
            Err(error) => {
                self.transport.emit_to_one(
                    caller,
                    Envelope::failed(event::EDIT_QUESTION, None, vec![error]),
                );
                return;
            }
        };
        let index = match Self::editable_index(session, args.index) {
            Ok(index) => index,
            Err(error) => {
                self.transport.emit_to_one(
                    caller,
                    Envelope::failed(event::EDIT_QUESTION, None, vec![error]),
                );
                return;
            }
        };
        let Some(question_raw) = args.question else {
            self.transport.emit_to_one(
                caller,
                Envelope::failed(event::EDIT_QUESTION, None, vec![FieldError::null("question")]),
            );
            return;
        };
        match parse_question(&question_raw) {
            Err(errors) => {
                self.transport
                    .emit_to_one(caller, Envelope::failed(event::EDIT_QUESTION, None, errors));
            }
            Ok(question) => {
                if !session.quiz_mut().replace_question(index, question) {
                    // Bounds were checked above, so this is a body-kind mismatch.
                    self.transport.emit_to_one(
                        caller,
                        Envelope::failed(
                            event::EDIT_QUESTION,
                            None,
                            vec![FieldError::null("question")],
                        ),
                    );
                    return;
                }
                let id = session.id().to_string();
                self.transport.emit_to_one(
                    caller,
                    Envelope::ok(event::EDIT_QUESTION, Some(&id), Value::Null),
                );
            }
        }
    }

    fn remove_question(&mut self, caller: ConnectionId, args: Option<Value>) {
        let Some(args) = decode::<RemoveQuestionArgs>(args) else {
            self.transport.emit_to_one(caller, Envelope::malformed(event::REMOVE_QUESTION));
            return;
        };
        let session = match Self::owned_session(&mut self.sessions, caller, args.session.as_deref())
        {
            Ok(session) => session,
            Err(error) => {
                self.transport.emit_to_one(
                    caller,
                    Envelope::failed(event::REMOVE_QUESTION, None, vec![error]),
                );
                return;
            }
        };
        match Self::editable_index(session, args.index) {
            Err(error) => {
                self.transport.emit_to_one(
                    caller,
                    Envelope::failed(event::REMOVE_QUESTION, None, vec![error]),
                );
            }
            Ok(index) => {
                session.quiz_mut().remove_question(index);
                let id = session.id().to_string();
                self.transport.emit_to_one(
                    caller,
                    Envelope::ok(event::REMOVE_QUESTION, Some(&id), Value::Null),
                );
            }
        }
    }

    /// A question position that exists and has not been revealed in a
    /// started session. Positions at or before the cursor are off limits:
    /// removing one shifts the live question out from under the cursor.
    fn editable_index(session: &Session, index: Option<i64>) -> Result<usize, FieldError> {
        let Some(index) = index.filter(|i| *i >= 0) else {
            return Err(FieldError::null("index"));
        };
        if index as usize >= session.quiz().num_questions() {
            return Err(FieldError::new("index", index));
        }
        if session.is_started() && index <= session.quiz().current_index() {
            return Err(FieldError::new("index", index));
        }
        Ok(index as usize)
    }

    fn kick(&mut self, caller: ConnectionId, args: Option<Value>) {
        let Some(args) = decode::<KickArgs>(args) else {
            self.transport.emit_to_one(caller, Envelope::malformed(event::KICK));
            return;
        };
        let session = match Self::owned_session(&mut self.sessions, caller, args.session.as_deref())
        {
            Ok(session) => session,
            Err(error) => {
                self.transport
                    .emit_to_one(caller, Envelope::failed(event::KICK, None, vec![error]));
                return;
            }
        };
        let Some(name) = args.name else {
            self.transport.emit_to_one(
                caller,
                Envelope::failed(event::KICK, None, vec![FieldError::null("name")]),
            );
            return;
        };
        let Some(user) = session.remove_user(&name) else {
            self.transport.emit_to_one(
                caller,
                Envelope::failed(event::KICK, None, vec![FieldError::new("name", name)]),
            );
            return;
        };
        let id = session.id().to_string();
        info!(session = %id, user = %name, "user kicked");
        self.transport.emit_to_one(
            caller,
            Envelope::ok(event::KICK, Some(&id), json!({ "name": &name })),
        );
        self.transport.emit_to_room_except(
            &id,
            caller,
            Envelope::ok(event::USER_KICKED, Some(&id), json!({ "name": &name })),
        );
        self.transport.leave_room(user.id, &id);
    }

    fn start_session(&mut self, caller: ConnectionId, args: Option<Value>) {
        let Some(args) = decode::<SessionArgs>(args) else {
            self.transport.emit_to_one(caller, Envelope::malformed(event::START_SESSION));
            return;
        };
        let session = match Self::owned_session(&mut self.sessions, caller, args.session.as_deref())
        {
            Ok(session) => session,
            Err(error) => {
                self.transport.emit_to_one(
                    caller,
                    Envelope::failed(event::START_SESSION, None, vec![error]),
                );
                return;
            }
        };
        if !session.start() {
            self.transport
                .emit_to_one(caller, Envelope::failed(event::START_SESSION, None, vec![]));
            return;
        }
        let id = session.id().to_string();
        info!(session = %id, "session started");
        self.transport
            .emit_to_one(caller, Envelope::ok(event::START_SESSION, Some(&id), Value::Null));
        self.transport.emit_to_room_except(
            &id,
            caller,
            Envelope::ok(event::SESSION_STARTED, Some(&id), Value::Null),
        );
    }

    fn end_session(&mut self, caller: ConnectionId, args: Option<Value>) {
        let Some(args) = decode::<SessionArgs>(args) else {
            self.transport.emit_to_one(caller, Envelope::malformed(event::END_SESSION));
            return;
        };
        let session = match Self::owned_session(&mut self.sessions, caller, args.session.as_deref())
        {
            Ok(session) => session,
            Err(error) => {
                self.transport.emit_to_one(
                    caller,
                    Envelope::failed(event::END_SESSION, None, vec![error]),
                );
                return;
            }
        };
        if !session.end() {
            self.transport
                .emit_to_one(caller, Envelope::failed(event::END_SESSION, None, vec![]));
            return;
        }
        let id = session.id().to_string();
        let participants: Vec<ConnectionId> = session.users().map(|u| u.id).collect();
        // A session's lifetime ends with end(), same as on owner disconnect.
        self.sessions.remove(&id);
        info!(session = %id, "session ended");
        self.transport
            .emit_to_one(caller, Envelope::ok(event::END_SESSION, Some(&id), Value::Null));
        self.transport.emit_to_room_except(
            &id,
            caller,
            Envelope::ok(event::SESSION_ENDED, Some(&id), Value::Null),
        );
        // The owner stays in the room to read terminal state.
        for participant in participants {
            self.transport.leave_room(participant, &id);
        }
    }

    fn next_question(&mut self, shared: &SharedController, caller: ConnectionId, args: Option<Value>) {
        let Some(args) = decode::<SessionArgs>(args) else {
            self.transport.emit_to_one(caller, Envelope::malformed(event::NEXT_QUESTION));
            return;
        };
        let session = match Self::owned_session(&mut self.sessions, caller, args.session.as_deref())
        {
            Ok(session) => session,
            Err(error) => {
                self.transport.emit_to_one(
                    caller,
                    Envelope::failed(event::NEXT_QUESTION, None, vec![error]),
                );
                return;
            }
        };

        let exhausted = |session: &Session| {
            vec![
                FieldError::new("numQuestions", session.quiz().num_questions() as i64),
                FieldError::new("currentIndex", session.quiz().current_index()),
            ]
        };
        if !session.is_started() || session.has_ended() {
            let errors = exhausted(session);
            self.transport
                .emit_to_one(caller, Envelope::failed(event::NEXT_QUESTION, None, errors));
            return;
        }
        let room = session.id().to_string();
        let (index, limit, wire) = match session.quiz_mut().advance_to_next_question() {
            None => {
                let errors = exhausted(session);
                self.transport
                    .emit_to_one(caller, Envelope::failed(event::NEXT_QUESTION, None, errors));
                return;
            }
            Some(question) => (question.index(), question.time_limit(), question.to_wire()),
        };

        // One expiry task per started question; ending the question from any
        // path aborts it before it can fire.
        let timer_state = Arc::clone(shared);
        let timer_room = room.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(limit)).await;
            let mut controller = timer_state.lock().await;
            controller.expire_question(&timer_room, index);
        });
        if let Some(question) = session.quiz_mut().current_question_mut() {
            question.arm_timer(handle.abort_handle());
        }

        debug!(session = %room, index, "question advanced");
        let payload = json!({ "index": index, "question": wire });
        self.transport.emit_to_one(
            caller,
            Envelope::ok(event::NEXT_QUESTION, Some(&room), payload.clone()),
        );
        self.transport.emit_to_room_except(
            &room,
            caller,
            Envelope::ok(event::NEXT_QUESTION, Some(&room), payload),
        );
    }

    /// Timer-driven question end. A no-op when the question was already
    /// ended manually or the session is gone.
    fn expire_question(&mut self, session_id: &str, index: i64) {
        let Some(session) = self.sessions.get_mut(session_id) else {
            return;
        };
        let Some(question) = session.quiz_mut().question_at_mut(index as usize) else {
            return;
        };
        if question.index() != index || !question.end() {
            return;
        }
        debug!(session = %session_id, index, "question expired");
        self.transport.emit_to_room(
            session_id,
            Envelope::ok(event::QUESTION_ENDED, Some(session_id), json!({ "question": index })),
        );
    }

    fn question_response(&mut self, caller: ConnectionId, args: Option<Value>) {
        let Some(args) = decode::<QuestionResponseArgs>(args) else {
            self.transport.emit_to_one(caller, Envelope::malformed(event::QUESTION_RESPONSE));
            return;
        };
        let fail = |transport: &Transport, errors: Vec<FieldError>| {
            transport.emit_to_one(
                caller,
                Envelope::failed(event::QUESTION_RESPONSE, None, errors),
            );
        };
        let session = match Self::live_session(&mut self.sessions, args.session.as_deref()) {
            Ok(session) => session,
            Err(error) => {
                fail(&self.transport, vec![error]);
                return;
            }
        };
        let name = match Self::identified_user(session, caller, args.name) {
            Ok(name) => name,
            Err(error) => {
                fail(&self.transport, vec![error]);
                return;
            }
        };

        let current_index = session.quiz().current_index();
        let has_current = session.quiz().current_question().is_some();
        let index = match args.index {
            Some(index) if has_current && index == current_index => index,
            Some(index) => {
                fail(&self.transport, vec![FieldError::new("index", index)]);
                return;
            }
            None => {
                fail(&self.transport, vec![FieldError::null("index")]);
                return;
            }
        };

        let response = match args.response.as_ref().and_then(|raw| parse_response(raw, &name)) {
            Some(response) => response,
            None => {
                fail(&self.transport, vec![FieldError::null("response")]);
                return;
            }
        };

        let Some(question) = session.quiz_mut().current_question_mut() else {
            fail(&self.transport, vec![FieldError::new("index", index)]);
            return;
        };
        let points = match question.add_response(response.clone()) {
            Ok(points) => points,
            Err(QuestionError::DuplicateResponse) => {
                fail(&self.transport, vec![FieldError::new("response", "duplicate")]);
                return;
            }
            Err(_) => {
                fail(&self.transport, vec![FieldError::null("response")]);
                return;
            }
        };
        let first_correct = question.first_correct().unwrap_or_default().to_string();
        let frequency = question.frequency_of(&response);
        let relative_frequency = question.relative_frequency_of(&response);
        let id = session.id().to_string();
        let owner = session.owner();

        debug!(session = %id, user = %name, index, points, "response recorded");
        self.transport.emit_to_one(
            caller,
            Envelope::ok(
                event::QUESTION_RESPONSE,
                Some(&id),
                json!({
                    "index": index,
                    "firstCorrect": first_correct == name,
                    "points": points,
                }),
            ),
        );
        self.transport.emit_to_one(
            owner,
            Envelope::ok(
                event::QUESTION_RESPONSE_ADDED,
                Some(&id),
                json!({
                    "index": index,
                    "user": name,
                    "response": response.as_text(),
                    "points": points,
                    "firstCorrect": first_correct,
                    "frequency": frequency,
                    "relativeFrequency": relative_frequency,
                }),
            ),
        );
    }

    /// Identity check: the named user must exist and be the caller.
    fn identified_user(
        session: &Session,
        caller: ConnectionId,
        name: Option<String>,
    ) -> Result<String, FieldError> {
        let Some(name) = name else {
            return Err(FieldError::null("name"));
        };
        match session.find_user_by_name(&name) {
            Some(user) if user.id == caller => Ok(name),
            _ => Err(FieldError::new("name", name)),
        }
    }

    fn end_question(&mut self, caller: ConnectionId, args: Option<Value>) {
        let Some(args) = decode::<EndQuestionArgs>(args) else {
            self.transport.emit_to_one(caller, Envelope::malformed(event::END_QUESTION));
            return;
        };
        let session = match Self::owned_session(&mut self.sessions, caller, args.session.as_deref())
        {
            Ok(session) => session,
            Err(error) => {
                self.transport.emit_to_one(
                    caller,
                    Envelope::failed(event::END_QUESTION, None, vec![error]),
                );
                return;
            }
        };
        if !session.is_started() || session.has_ended() {
            self.transport
                .emit_to_one(caller, Envelope::failed(event::END_QUESTION, None, vec![]));
            return;
        }
        let index = match Self::current_question_index(session, args.question) {
            Ok(index) => index,
            Err(error) => {
                self.transport.emit_to_one(
                    caller,
                    Envelope::failed(event::END_QUESTION, None, vec![error]),
                );
                return;
            }
        };
        let ended = session
            .quiz_mut()
            .current_question_mut()
            .is_some_and(|question| question.end());
        if !ended {
            // The expiry timer got there first.
            self.transport
                .emit_to_one(caller, Envelope::failed(event::END_QUESTION, None, vec![]));
            return;
        }
        let id = session.id().to_string();
        debug!(session = %id, index, "question ended");
        self.transport
            .emit_to_one(caller, Envelope::ok(event::END_QUESTION, Some(&id), Value::Null));
        self.transport.emit_to_room_except(
            &id,
            caller,
            Envelope::ok(event::QUESTION_ENDED, Some(&id), json!({ "question": index })),
        );
    }

    /// The submitted index must name the live current question.
    fn current_question_index(
        session: &Session,
        question: Option<i64>,
    ) -> Result<i64, FieldError> {
        let current = session.quiz().current_index();
        let has_current = session.quiz().current_question().is_some();
        match question {
            Some(index) if has_current && index == current => Ok(index),
            Some(index) => Err(FieldError::new("question", index)),
            None => Err(FieldError::null("question")),
        }
    }

    fn submit_feedback(&mut self, caller: ConnectionId, args: Option<Value>) {
        let Some(args) = decode::<SubmitFeedbackArgs>(args) else {
            self.transport.emit_to_one(caller, Envelope::malformed(event::SUBMIT_FEEDBACK));
            return;
        };
        let fail = |transport: &Transport, errors: Vec<FieldError>| {
            transport.emit_to_one(
                caller,
                Envelope::failed(event::SUBMIT_FEEDBACK, None, errors),
            );
        };
        let session = match Self::live_session(&mut self.sessions, args.session.as_deref()) {
            Ok(session) => session,
            Err(error) => {
                fail(&self.transport, vec![error]);
                return;
            }
        };
        let name = match Self::identified_user(session, caller, args.name) {
            Ok(name) => name,
            Err(error) => {
                fail(&self.transport, vec![error]);
                return;
            }
        };
        // Feedback may target any question already revealed.
        let index = match args.question {
            Some(index) if index >= 0 && index <= session.quiz().current_index() => index,
            Some(index) => {
                fail(&self.transport, vec![FieldError::new("question", index)]);
                return;
            }
            None => {
                fail(&self.transport, vec![FieldError::null("question")]);
                return;
            }
        };
        let Some(raw) = args.feedback else {
            fail(&self.transport, vec![FieldError::null("feedback")]);
            return;
        };
        let feedback = match parse_feedback(&raw) {
            Ok(feedback) => feedback,
            Err(errors) => {
                fail(&self.transport, errors);
                return;
            }
        };
        let Some(question) = session.quiz_mut().question_at_mut(index as usize) else {
            fail(&self.transport, vec![FieldError::new("question", index)]);
            return;
        };
        if !question.add_feedback(&name, feedback.clone()) {
            fail(&self.transport, vec![FieldError::new("feedback", "duplicate")]);
            return;
        }
        let id = session.id().to_string();
        let owner = session.owner();
        debug!(session = %id, user = %name, question = index, "feedback submitted");
        self.transport
            .emit_to_one(caller, Envelope::ok(event::SUBMIT_FEEDBACK, Some(&id), Value::Null));
        self.transport.emit_to_one(
            owner,
            Envelope::ok(
                event::FEEDBACK_SUBMITTED,
                Some(&id),
                json!({ "user": name, "question": index, "feedback": feedback }),
            ),
        );
    }

    fn send_hint(&mut self, caller: ConnectionId, args: Option<Value>) {
        let Some(args) = decode::<SendHintArgs>(args) else {
            self.transport.emit_to_one(caller, Envelope::malformed(event::SEND_HINT));
            return;
        };
        let session = match Self::owned_session(&mut self.sessions, caller, args.session.as_deref())
        {
            Ok(session) => session,
            Err(error) => {
                self.transport
                    .emit_to_one(caller, Envelope::failed(event::SEND_HINT, None, vec![error]));
                return;
            }
        };
        let Some(hint) = args.hint.filter(|h| !h.is_empty()) else {
            self.transport.emit_to_one(
                caller,
                Envelope::failed(event::SEND_HINT, None, vec![FieldError::null("hint")]),
            );
            return;
        };
        if !session.is_started() || session.has_ended() {
            self.transport
                .emit_to_one(caller, Envelope::failed(event::SEND_HINT, None, vec![]));
            return;
        }
        let index = match Self::current_question_index(session, args.question) {
            Ok(index) => index,
            Err(error) => {
                self.transport
                    .emit_to_one(caller, Envelope::failed(event::SEND_HINT, None, vec![error]));
                return;
            }
        };
        let id = session.id().to_string();
        debug!(session = %id, index, "hint sent");
        self.transport
            .emit_to_one(caller, Envelope::ok(event::SEND_HINT, Some(&id), Value::Null));
        self.transport.emit_to_room_except(
            &id,
            caller,
            Envelope::ok(
                event::HINT_RECEIVED,
                Some(&id),
                json!({ "question": index, "hint": hint }),
            ),
        );
    }

    /// Disconnect cascade: an owner's loss ends and drops the session; a
    /// participant's loss notifies each room they were part of.
    fn disconnect(&mut self, caller: ConnectionId) {
        let owned: Vec<String> = self
            .sessions
            .values()
            .filter(|s| s.owner() == caller)
            .map(|s| s.id().to_string())
            .collect();
        for id in owned {
            if let Some(mut session) = self.sessions.remove(&id) {
                session.end();
                info!(session = %id, "owner disconnected, session ended");
                self.transport.emit_to_room(
                    &id,
                    Envelope::ok(event::SESSION_ENDED, Some(&id), Value::Null),
                );
                self.transport.force_all_to_leave(&id);
            }
        }

        for room in self.transport.rooms_of(caller) {
            let Some(session) = self.sessions.get_mut(&room) else {
                continue;
            };
            let Some(user) = session.find_user_by_id(caller) else {
                continue;
            };
            let name = user.name.clone();
            session.remove_user(&name);
            debug!(session = %room, user = %name, "participant disconnected");
            self.transport.emit_to_room(
                &room,
                Envelope::ok(event::USER_DISCONNECTED, Some(&room), json!({ "name": name })),
            );
        }
        self.transport.unregister(caller);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{STATUS_FAILED, STATUS_OK};
    use tokio::sync::mpsc::{self, UnboundedReceiver};
    use uuid::Uuid;

    async fn connect(shared: &SharedController) -> (ConnectionId, UnboundedReceiver<Envelope>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = Uuid::new_v4();
        shared.lock().await.transport_mut().register(id, tx);
        (id, rx)
    }

    async fn send(shared: &SharedController, caller: ConnectionId, event_name: &str, args: Value) {
        Controller::dispatch(
            shared,
            caller,
            RawRequest { event: event_name.to_string(), args: Some(args) },
        )
        .await;
    }

    fn recv(rx: &mut UnboundedReceiver<Envelope>) -> Envelope {
        rx.try_recv().expect("expected an envelope")
    }

    /// Pop envelopes until one carries the wanted event name.
    fn find(rx: &mut UnboundedReceiver<Envelope>, event_name: &str) -> Envelope {
        loop {
            let envelope = rx
                .try_recv()
                .unwrap_or_else(|_| panic!("no `{event_name}` envelope queued"));
            if envelope.event == event_name {
                return envelope;
            }
        }
    }

    async fn create(
        shared: &SharedController,
        owner: ConnectionId,
        rx: &mut UnboundedReceiver<Envelope>,
    ) -> String {
        Controller::dispatch(
            shared,
            owner,
            RawRequest { event: event::CREATE_SESSION.to_string(), args: None },
        )
        .await;
        let ack = recv(rx);
        assert_eq!(ack.status, STATUS_OK);
        assert_eq!(ack.event, event::CREATED_SESSION);
        let code = ack.data.unwrap().as_str().unwrap().to_string();
        assert_eq!(ack.session.as_deref(), Some(code.as_str()));
        code
    }

    async fn join(
        shared: &SharedController,
        caller: ConnectionId,
        rx: &mut UnboundedReceiver<Envelope>,
        code: &str,
        name: &str,
    ) {
        send(shared, caller, event::JOIN_SESSION, json!({ "id": code, "name": name })).await;
        let ack = find(rx, event::JOIN_SESSION);
        assert_eq!(ack.status, STATUS_OK);
    }

    fn two_choice_submission() -> Value {
        json!({
            "text": "Q",
            "timeLimit": 60,
            "body": {
                "kind": "multiple-choice",
                "choices": [
                    { "text": "c1", "points": 200 },
                    { "text": "c2", "points": 200 },
                ],
                "answer": 1,
            },
        })
    }

    fn paris_submission() -> Value {
        json!({
            "text": "capital of France",
            "timeLimit": 60,
            "body": {
                "kind": "fill-in",
                "answers": [{ "text": "Paris", "points": 100 }],
            },
        })
    }

    /// Author a question, start the session, and reveal the first question.
    async fn start_with_question(
        shared: &SharedController,
        owner: ConnectionId,
        rx: &mut UnboundedReceiver<Envelope>,
        code: &str,
        question: Value,
    ) {
        send(shared, owner, event::ADD_QUESTION, json!({ "session": &code, "question": question }))
            .await;
        assert_eq!(find(rx, event::ADD_QUESTION).status, STATUS_OK);
        send(shared, owner, event::START_SESSION, json!({ "session": &code })).await;
        assert_eq!(find(rx, event::START_SESSION).status, STATUS_OK);
        send(shared, owner, event::NEXT_QUESTION, json!({ "session": &code })).await;
        assert_eq!(find(rx, event::NEXT_QUESTION).status, STATUS_OK);
    }

    #[tokio::test]
    async fn create_and_join_round_trip() {
        let shared = Controller::shared();
        let (a, mut rx_a) = connect(&shared).await;
        let code = create(&shared, a, &mut rx_a).await;
        assert_eq!(code.len(), 8);
        assert!(code.bytes().all(|b| b.is_ascii_digit() || b.is_ascii_uppercase()));

        let (b, mut rx_b) = connect(&shared).await;
        send(&shared, b, event::JOIN_SESSION, json!({ "id": &code, "name": "b" })).await;

        let ack = recv(&mut rx_b);
        assert_eq!(ack.status, STATUS_OK);
        assert_eq!(ack.session.as_deref(), Some(code.as_str()));
        assert_eq!(ack.data, Some(Value::Null));
        assert!(rx_b.try_recv().is_err());

        let joined = recv(&mut rx_a);
        assert_eq!(joined.event, event::USER_JOINED);
        assert_eq!(joined.data, Some(json!({ "name": "b" })));
    }

    #[tokio::test]
    async fn non_owner_cannot_add_questions() {
        let shared = Controller::shared();
        let (a, mut rx_a) = connect(&shared).await;
        let code = create(&shared, a, &mut rx_a).await;
        let (b, mut rx_b) = connect(&shared).await;
        join(&shared, b, &mut rx_b, &code, "b").await;

        send(
            &shared,
            b,
            event::ADD_QUESTION,
            json!({ "session": &code, "question": two_choice_submission() }),
        )
        .await;
        let ack = recv(&mut rx_b);
        assert_eq!(ack.status, STATUS_FAILED);
        assert_eq!(ack.event, event::ADD_QUESTION);
        assert_eq!(ack.session, None);
        assert_eq!(ack.errors, Some(json!([{ "field": "session", "value": null }])));
    }

    #[tokio::test]
    async fn grades_responses_and_reports_statistics_to_the_owner() {
        let shared = Controller::shared();
        let (a, mut rx_a) = connect(&shared).await;
        let code = create(&shared, a, &mut rx_a).await;
        let (b, mut rx_b) = connect(&shared).await;
        join(&shared, b, &mut rx_b, &code, "b").await;
        start_with_question(&shared, a, &mut rx_a, &code, two_choice_submission()).await;

        let revealed = find(&mut rx_b, event::NEXT_QUESTION);
        assert_eq!(revealed.data.as_ref().unwrap()["index"], 0);
        assert_eq!(
            revealed.data.as_ref().unwrap()["question"]["body"]["kind"],
            "multiple-choice"
        );

        send(
            &shared,
            b,
            event::QUESTION_RESPONSE,
            json!({
                "session": &code,
                "name": "b",
                "index": 0,
                "response": { "kind": "multiple-choice", "answer": 1, "submitter": "b" },
            }),
        )
        .await;

        let ack = recv(&mut rx_b);
        assert_eq!(ack.status, STATUS_OK);
        assert_eq!(
            ack.data,
            Some(json!({ "index": 0, "firstCorrect": true, "points": 200 }))
        );

        let added = find(&mut rx_a, event::QUESTION_RESPONSE_ADDED);
        assert_eq!(
            added.data,
            Some(json!({
                "index": 0,
                "user": "b",
                "response": "1",
                "points": 200,
                "firstCorrect": "b",
                "frequency": 1,
                "relativeFrequency": 1.0,
            }))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn timer_ends_the_question_and_blocks_a_second_end() {
        let shared = Controller::shared();
        let (a, mut rx_a) = connect(&shared).await;
        let code = create(&shared, a, &mut rx_a).await;
        let (b, mut rx_b) = connect(&shared).await;
        join(&shared, b, &mut rx_b, &code, "b").await;
        start_with_question(&shared, a, &mut rx_a, &code, two_choice_submission()).await;

        tokio::time::sleep(Duration::from_secs(61)).await;

        let ended = find(&mut rx_b, event::QUESTION_ENDED);
        assert_eq!(ended.status, STATUS_OK);
        assert_eq!(ended.data, Some(json!({ "question": 0 })));
        let ended_owner = find(&mut rx_a, event::QUESTION_ENDED);
        assert_eq!(ended_owner.data, Some(json!({ "question": 0 })));

        send(&shared, a, event::END_QUESTION, json!({ "session": &code, "question": 0 })).await;
        assert_eq!(recv(&mut rx_a).status, STATUS_FAILED);
        // Only the timer's broadcast went out.
        assert!(rx_b.try_recv().is_err());
    }

    #[tokio::test]
    async fn manual_end_cancels_the_timer_and_matches_the_expiry_broadcast() {
        let shared = Controller::shared();
        let (a, mut rx_a) = connect(&shared).await;
        let code = create(&shared, a, &mut rx_a).await;
        let (b, mut rx_b) = connect(&shared).await;
        join(&shared, b, &mut rx_b, &code, "b").await;
        start_with_question(&shared, a, &mut rx_a, &code, two_choice_submission()).await;

        send(&shared, a, event::END_QUESTION, json!({ "session": &code, "question": 0 })).await;
        assert_eq!(recv(&mut rx_a).status, STATUS_OK);
        let ended = find(&mut rx_b, event::QUESTION_ENDED);
        assert_eq!(ended.data, Some(json!({ "question": 0 })));

        let controller = shared.lock().await;
        let question = controller.sessions[&code].quiz().question_at(0).unwrap();
        assert!(question.is_started() && question.has_ended());
    }

    #[tokio::test]
    async fn owner_disconnect_ends_and_frees_the_session() {
        let shared = Controller::shared();
        let (a, mut rx_a) = connect(&shared).await;
        let code = create(&shared, a, &mut rx_a).await;
        let (b, mut rx_b) = connect(&shared).await;
        join(&shared, b, &mut rx_b, &code, "b").await;

        Controller::handle_disconnect(&shared, a).await;

        let ended = find(&mut rx_b, event::SESSION_ENDED);
        assert_eq!(ended.status, STATUS_OK);
        assert_eq!(ended.data, Some(Value::Null));
        assert!(shared.lock().await.sessions.is_empty());

        let (c, mut rx_c) = connect(&shared).await;
        send(&shared, c, event::JOIN_SESSION, json!({ "id": &code, "name": "c" })).await;
        let ack = recv(&mut rx_c);
        assert_eq!(ack.status, STATUS_FAILED);
        assert_eq!(ack.errors, Some(json!([{ "field": "session", "value": &code }])));
    }

    #[tokio::test]
    async fn participant_disconnect_notifies_the_room() {
        let shared = Controller::shared();
        let (a, mut rx_a) = connect(&shared).await;
        let code = create(&shared, a, &mut rx_a).await;
        let (b, mut rx_b) = connect(&shared).await;
        join(&shared, b, &mut rx_b, &code, "b").await;

        Controller::handle_disconnect(&shared, b).await;

        let gone = find(&mut rx_a, event::USER_DISCONNECTED);
        assert_eq!(gone.data, Some(json!({ "name": "b" })));
        let controller = shared.lock().await;
        assert!(controller.sessions[&code].find_user_by_name("b").is_none());
    }

    #[tokio::test]
    async fn fill_in_scoring_is_case_insensitive_per_key() {
        let shared = Controller::shared();
        let (a, mut rx_a) = connect(&shared).await;
        let code = create(&shared, a, &mut rx_a).await;
        let (b, mut rx_b) = connect(&shared).await;
        join(&shared, b, &mut rx_b, &code, "b").await;
        let (c, mut rx_c) = connect(&shared).await;
        join(&shared, c, &mut rx_c, &code, "c").await;
        start_with_question(&shared, a, &mut rx_a, &code, paris_submission()).await;

        send(
            &shared,
            b,
            event::QUESTION_RESPONSE,
            json!({
                "session": &code,
                "name": "b",
                "index": 0,
                "response": { "kind": "fill-in", "answer": "pArIs" },
            }),
        )
        .await;
        let ack = find(&mut rx_b, event::QUESTION_RESPONSE);
        assert_eq!(
            ack.data,
            Some(json!({ "index": 0, "firstCorrect": true, "points": 100 }))
        );

        send(
            &shared,
            c,
            event::QUESTION_RESPONSE,
            json!({
                "session": &code,
                "name": "c",
                "index": 0,
                "response": { "kind": "fill-in", "answer": "London" },
            }),
        )
        .await;
        let ack = find(&mut rx_c, event::QUESTION_RESPONSE);
        assert_eq!(
            ack.data,
            Some(json!({ "index": 0, "firstCorrect": false, "points": 0 }))
        );

        let first = find(&mut rx_a, event::QUESTION_RESPONSE_ADDED);
        assert_eq!(first.data.as_ref().unwrap()["frequency"], 1);
        assert_eq!(first.data.as_ref().unwrap()["relativeFrequency"], 1.0);
        let second = find(&mut rx_a, event::QUESTION_RESPONSE_ADDED);
        assert_eq!(second.data.as_ref().unwrap()["response"], "London");
        assert_eq!(second.data.as_ref().unwrap()["frequency"], 1);
        assert_eq!(second.data.as_ref().unwrap()["relativeFrequency"], 0.5);
    }

    #[tokio::test]
    async fn duplicate_responses_are_rejected() {
        let shared = Controller::shared();
        let (a, mut rx_a) = connect(&shared).await;
        let code = create(&shared, a, &mut rx_a).await;
        let (b, mut rx_b) = connect(&shared).await;
        join(&shared, b, &mut rx_b, &code, "b").await;
        start_with_question(&shared, a, &mut rx_a, &code, two_choice_submission()).await;

        let response = json!({
            "session": &code,
            "name": "b",
            "index": 0,
            "response": { "kind": "multiple-choice", "answer": 0 },
        });
        send(&shared, b, event::QUESTION_RESPONSE, response.clone()).await;
        assert_eq!(find(&mut rx_b, event::QUESTION_RESPONSE).status, STATUS_OK);

        send(&shared, b, event::QUESTION_RESPONSE, response).await;
        let ack = find(&mut rx_b, event::QUESTION_RESPONSE);
        assert_eq!(ack.status, STATUS_FAILED);
        assert_eq!(ack.errors, Some(json!([{ "field": "response", "value": "duplicate" }])));
    }

    #[tokio::test]
    async fn responses_must_come_from_the_named_user() {
        let shared = Controller::shared();
        let (a, mut rx_a) = connect(&shared).await;
        let code = create(&shared, a, &mut rx_a).await;
        let (b, mut rx_b) = connect(&shared).await;
        join(&shared, b, &mut rx_b, &code, "b").await;
        let (intruder, mut rx_intruder) = connect(&shared).await;
        join(&shared, intruder, &mut rx_intruder, &code, "i").await;
        start_with_question(&shared, a, &mut rx_a, &code, two_choice_submission()).await;

        send(
            &shared,
            intruder,
            event::QUESTION_RESPONSE,
            json!({
                "session": &code,
                "name": "b",
                "index": 0,
                "response": { "kind": "multiple-choice", "answer": 1 },
            }),
        )
        .await;
        let ack = find(&mut rx_intruder, event::QUESTION_RESPONSE);
        assert_eq!(ack.status, STATUS_FAILED);
        assert_eq!(ack.errors, Some(json!([{ "field": "name", "value": "b" }])));
    }

    #[tokio::test]
    async fn kicked_name_is_freed_for_rejoin() {
        let shared = Controller::shared();
        let (a, mut rx_a) = connect(&shared).await;
        let code = create(&shared, a, &mut rx_a).await;
        let (b, mut rx_b) = connect(&shared).await;
        join(&shared, b, &mut rx_b, &code, "b").await;

        send(&shared, a, event::KICK, json!({ "session": &code, "name": "b" })).await;
        let ack = find(&mut rx_a, event::KICK);
        assert_eq!(ack.status, STATUS_OK);
        assert_eq!(ack.data, Some(json!({ "name": "b" })));
        let kicked = find(&mut rx_b, event::USER_KICKED);
        assert_eq!(kicked.data, Some(json!({ "name": "b" })));

        let (b2, mut rx_b2) = connect(&shared).await;
        join(&shared, b2, &mut rx_b2, &code, "b").await;
    }

    #[tokio::test]
    async fn session_start_and_end_do_not_repeat() {
        let shared = Controller::shared();
        let (a, mut rx_a) = connect(&shared).await;
        let code = create(&shared, a, &mut rx_a).await;
        let (b, mut rx_b) = connect(&shared).await;
        join(&shared, b, &mut rx_b, &code, "b").await;

        send(&shared, a, event::START_SESSION, json!({ "session": &code })).await;
        assert_eq!(recv(&mut rx_a).status, STATUS_OK);
        assert_eq!(find(&mut rx_b, event::SESSION_STARTED).status, STATUS_OK);

        send(&shared, a, event::START_SESSION, json!({ "session": &code })).await;
        assert_eq!(recv(&mut rx_a).status, STATUS_FAILED);

        send(&shared, a, event::END_SESSION, json!({ "session": &code })).await;
        assert_eq!(recv(&mut rx_a).status, STATUS_OK);
        assert_eq!(find(&mut rx_b, event::SESSION_ENDED).status, STATUS_OK);

        send(&shared, a, event::END_SESSION, json!({ "session": &code })).await;
        assert_eq!(recv(&mut rx_a).status, STATUS_FAILED);
    }

    #[tokio::test]
    async fn next_question_failure_reports_retry_context() {
        let shared = Controller::shared();
        let (a, mut rx_a) = connect(&shared).await;
        let code = create(&shared, a, &mut rx_a).await;

        send(&shared, a, event::START_SESSION, json!({ "session": &code })).await;
        assert_eq!(recv(&mut rx_a).status, STATUS_OK);

        send(&shared, a, event::NEXT_QUESTION, json!({ "session": &code })).await;
        let ack = recv(&mut rx_a);
        assert_eq!(ack.status, STATUS_FAILED);
        assert_eq!(
            ack.errors,
            Some(json!([
                { "field": "numQuestions", "value": 0 },
                { "field": "currentIndex", "value": -1 },
            ]))
        );
    }

    #[tokio::test]
    async fn feedback_reaches_the_owner_once_per_user() {
        let shared = Controller::shared();
        let (a, mut rx_a) = connect(&shared).await;
        let code = create(&shared, a, &mut rx_a).await;
        let (b, mut rx_b) = connect(&shared).await;
        join(&shared, b, &mut rx_b, &code, "b").await;
        start_with_question(&shared, a, &mut rx_a, &code, two_choice_submission()).await;

        let args = json!({
            "session": &code,
            "name": "b",
            "question": 0,
            "feedback": { "rating": 3, "message": "good pace" },
        });
        send(&shared, b, event::SUBMIT_FEEDBACK, args.clone()).await;
        assert_eq!(find(&mut rx_b, event::SUBMIT_FEEDBACK).status, STATUS_OK);
        let submitted = find(&mut rx_a, event::FEEDBACK_SUBMITTED);
        assert_eq!(
            submitted.data,
            Some(json!({
                "user": "b",
                "question": 0,
                "feedback": { "rating": 3, "message": "good pace" },
            }))
        );

        send(&shared, b, event::SUBMIT_FEEDBACK, args).await;
        let ack = find(&mut rx_b, event::SUBMIT_FEEDBACK);
        assert_eq!(ack.status, STATUS_FAILED);
        assert_eq!(ack.errors, Some(json!([{ "field": "feedback", "value": "duplicate" }])));
    }

    #[tokio::test]
    async fn feedback_is_limited_to_revealed_questions() {
        let shared = Controller::shared();
        let (a, mut rx_a) = connect(&shared).await;
        let code = create(&shared, a, &mut rx_a).await;
        let (b, mut rx_b) = connect(&shared).await;
        join(&shared, b, &mut rx_b, &code, "b").await;
        start_with_question(&shared, a, &mut rx_a, &code, two_choice_submission()).await;

        send(
            &shared,
            b,
            event::SUBMIT_FEEDBACK,
            json!({
                "session": &code,
                "name": "b",
                "question": 1,
                "feedback": { "rating": 3, "message": "early" },
            }),
        )
        .await;
        let ack = find(&mut rx_b, event::SUBMIT_FEEDBACK);
        assert_eq!(ack.status, STATUS_FAILED);
        assert_eq!(ack.errors, Some(json!([{ "field": "question", "value": 1 }])));
    }

    #[tokio::test]
    async fn hints_broadcast_to_participants_only() {
        let shared = Controller::shared();
        let (a, mut rx_a) = connect(&shared).await;
        let code = create(&shared, a, &mut rx_a).await;
        let (b, mut rx_b) = connect(&shared).await;
        join(&shared, b, &mut rx_b, &code, "b").await;
        start_with_question(&shared, a, &mut rx_a, &code, two_choice_submission()).await;

        send(
            &shared,
            a,
            event::SEND_HINT,
            json!({ "session": &code, "question": 0, "hint": "think twice" }),
        )
        .await;
        assert_eq!(find(&mut rx_a, event::SEND_HINT).status, STATUS_OK);
        let hint = find(&mut rx_b, event::HINT_RECEIVED);
        assert_eq!(hint.data, Some(json!({ "question": 0, "hint": "think twice" })));
        assert!(rx_a.try_recv().is_err());

        send(&shared, a, event::SEND_HINT, json!({ "session": &code, "question": 0, "hint": "" }))
            .await;
        let ack = find(&mut rx_a, event::SEND_HINT);
        assert_eq!(ack.status, STATUS_FAILED);
        assert_eq!(ack.errors, Some(json!([{ "field": "hint", "value": null }])));
    }

    #[tokio::test]
    async fn questions_can_be_edited_until_they_are_revealed() {
        let shared = Controller::shared();
        let (a, mut rx_a) = connect(&shared).await;
        let code = create(&shared, a, &mut rx_a).await;
        for _ in 0..3 {
            send(
                &shared,
                a,
                event::ADD_QUESTION,
                json!({ "session": &code, "question": two_choice_submission() }),
            )
            .await;
            assert_eq!(recv(&mut rx_a).status, STATUS_OK);
        }

        // Replacement must keep the body kind.
        send(
            &shared,
            a,
            event::EDIT_QUESTION,
            json!({ "session": &code, "index": 1, "question": paris_submission() }),
        )
        .await;
        assert_eq!(recv(&mut rx_a).status, STATUS_FAILED);

        send(
            &shared,
            a,
            event::EDIT_QUESTION,
            json!({ "session": &code, "index": 1, "question": two_choice_submission() }),
        )
        .await;
        assert_eq!(recv(&mut rx_a).status, STATUS_OK);

        send(&shared, a, event::START_SESSION, json!({ "session": &code })).await;
        assert_eq!(recv(&mut rx_a).status, STATUS_OK);
        send(&shared, a, event::NEXT_QUESTION, json!({ "session": &code })).await;
        assert_eq!(recv(&mut rx_a).status, STATUS_OK);

        // The live question can be neither edited nor removed.
        send(
            &shared,
            a,
            event::EDIT_QUESTION,
            json!({ "session": &code, "index": 0, "question": two_choice_submission() }),
        )
        .await;
        let ack = recv(&mut rx_a);
        assert_eq!(ack.status, STATUS_FAILED);
        assert_eq!(ack.errors, Some(json!([{ "field": "index", "value": 0 }])));

        send(&shared, a, event::REMOVE_QUESTION, json!({ "session": &code, "index": 0 })).await;
        assert_eq!(recv(&mut rx_a).status, STATUS_FAILED);

        send(&shared, a, event::NEXT_QUESTION, json!({ "session": &code })).await;
        assert_eq!(recv(&mut rx_a).status, STATUS_OK);

        // Removing an already-revealed question would shift the live one out
        // from under the cursor.
        send(&shared, a, event::REMOVE_QUESTION, json!({ "session": &code, "index": 0 })).await;
        let ack = recv(&mut rx_a);
        assert_eq!(ack.status, STATUS_FAILED);
        assert_eq!(ack.errors, Some(json!([{ "field": "index", "value": 0 }])));

        // Questions still ahead of the cursor stay editable.
        send(&shared, a, event::REMOVE_QUESTION, json!({ "session": &code, "index": 2 })).await;
        assert_eq!(recv(&mut rx_a).status, STATUS_OK);

        let controller = shared.lock().await;
        let quiz = controller.sessions[&code].quiz();
        assert_eq!(quiz.num_questions(), 2);
        assert_eq!(quiz.current_index(), 1);
        assert!(quiz.current_question().unwrap().is_started());
    }

    #[tokio::test]
    async fn absent_args_yield_a_null_error_ack() {
        let shared = Controller::shared();
        let (a, mut rx_a) = connect(&shared).await;
        Controller::dispatch(
            &shared,
            a,
            RawRequest { event: event::JOIN_SESSION.to_string(), args: None },
        )
        .await;
        let ack = recv(&mut rx_a);
        assert_eq!(ack.status, STATUS_FAILED);
        assert_eq!(ack.session, None);
        assert_eq!(ack.errors, Some(Value::Null));
    }
}
