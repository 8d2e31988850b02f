//! A live session: one owner, a quiz, and the joined participants.

use std::collections::HashMap;

use rand::Rng;
use uuid::Uuid;

use super::quiz::Quiz;

/// Length of a session join code.
pub const SESSION_CODE_LENGTH: usize = 8;

const CODE_ALPHABET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Draw a join code uniformly from `{0-9, A-Z}`. Uniqueness against live
/// sessions is the caller's concern.
pub fn generate_code() -> String {
    let mut rng = rand::rng();
    (0..SESSION_CODE_LENGTH)
        .map(|_| CODE_ALPHABET[rng.random_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}

/// A joined participant: display name plus transport connection id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub name: String,
    pub id: Uuid,
}

impl User {
    pub fn new(name: impl Into<String>, id: Uuid) -> Self {
        Self { name: name.into(), id }
    }
}

/// One owner's session. Participants are indexed both by name and by
/// connection id; both indices are maintained by the same insert/remove
/// paths so they cannot drift apart.
#[derive(Debug)]
pub struct Session {
    id: String,
    owner: Uuid,
    users_by_name: HashMap<String, User>,
    names_by_id: HashMap<Uuid, String>,
    quiz: Quiz,
    is_started: bool,
    has_ended: bool,
}

impl Session {
    pub fn new(id: impl Into<String>, owner: Uuid) -> Self {
        Self {
            id: id.into(),
            owner,
            users_by_name: HashMap::new(),
            names_by_id: HashMap::new(),
            quiz: Quiz::new(),
            is_started: false,
            has_ended: false,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn owner(&self) -> Uuid {
        self.owner
    }

    pub fn quiz(&self) -> &Quiz {
        &self.quiz
    }

    pub fn quiz_mut(&mut self) -> &mut Quiz {
        &mut self.quiz
    }

    pub fn is_started(&self) -> bool {
        self.is_started
    }

    pub fn has_ended(&self) -> bool {
        self.has_ended
    }

    pub fn users(&self) -> impl Iterator<Item = &User> {
        self.users_by_name.values()
    }

    /// Admit a user. Fails when the session has started or ended, when the
    /// name is taken, or when the joining connection is the owner itself.
    pub fn add_user(&mut self, user: User) -> bool {
        if user.id == self.owner
            || self.is_started
            || self.has_ended
            || self.users_by_name.contains_key(&user.name)
        {
            return false;
        }
        self.names_by_id.insert(user.id, user.name.clone());
        self.users_by_name.insert(user.name.clone(), user);
        true
    }

    /// Remove a user by name, freeing the name for later joins. Not
    /// permitted once the session has ended.
    pub fn remove_user(&mut self, name: &str) -> Option<User> {
        if self.has_ended {
            return None;
        }
        let user = self.users_by_name.remove(name)?;
        self.names_by_id.remove(&user.id);
        Some(user)
    }

    pub fn find_user_by_name(&self, name: &str) -> Option<&User> {
        self.users_by_name.get(name)
    }

    pub fn find_user_by_id(&self, id: Uuid) -> Option<&User> {
        self.names_by_id
            .get(&id)
            .and_then(|name| self.users_by_name.get(name))
    }

    /// Mark the session started. Fails on re-start.
    pub fn start(&mut self) -> bool {
        if self.is_started {
            return false;
        }
        self.is_started = true;
        true
    }

    /// End a started session, also ending the live question so its expiry
    /// task is cancelled. Fails when unstarted or already ended.
    pub fn end(&mut self) -> bool {
        if !self.is_started || self.has_ended {
            return false;
        }
        self.has_ended = true;
        if let Some(question) = self.quiz.current_question_mut() {
            question.end();
        }
        true
    }
}
