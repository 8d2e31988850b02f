//! Ordered collection of questions for one session.

use super::question::Question;

/// The questions of a session in presentation order, with a cursor on the
/// question currently live. The cursor starts at -1 and only moves forward.
#[derive(Debug, Clone)]
pub struct Quiz {
    questions: Vec<Question>,
    current_index: i64,
}

impl Default for Quiz {
    fn default() -> Self {
        Self::new()
    }
}

impl Quiz {
    pub fn new() -> Self {
        Self {
            questions: Vec::new(),
            current_index: -1,
        }
    }

    pub fn num_questions(&self) -> usize {
        self.questions.len()
    }

    pub fn current_index(&self) -> i64 {
        self.current_index
    }

    pub fn current_question(&self) -> Option<&Question> {
        if self.current_index < 0 {
            return None;
        }
        self.questions.get(self.current_index as usize)
    }

    pub fn current_question_mut(&mut self) -> Option<&mut Question> {
        if self.current_index < 0 {
            return None;
        }
        self.questions.get_mut(self.current_index as usize)
    }

    /// Append a question and assign its position.
    pub fn add_question(&mut self, mut question: Question) {
        question.set_index(self.questions.len() as i64);
        self.questions.push(question);
    }

    pub fn question_at(&self, index: usize) -> Option<&Question> {
        self.questions.get(index)
    }

    pub fn question_at_mut(&mut self, index: usize) -> Option<&mut Question> {
        self.questions.get_mut(index)
    }

    /// Move the cursor to the next question and start it. Returns `None`
    /// without mutating when the quiz is exhausted.
    pub fn advance_to_next_question(&mut self) -> Option<&mut Question> {
        let next = self.current_index + 1;
        if next >= self.questions.len() as i64 {
            return None;
        }
        self.current_index = next;
        let question = &mut self.questions[next as usize];
        question.start();
        Some(question)
    }

    /// Remove a question by position. Surviving questions keep the index
    /// they were assigned at append time.
    pub fn remove_question(&mut self, index: usize) -> Option<Question> {
        if index >= self.questions.len() {
            return None;
        }
        Some(self.questions.remove(index))
    }

    /// Swap in a replacement at `index`. Fails when out of bounds or when
    /// the replacement is a different body kind than the original.
    pub fn replace_question(&mut self, index: usize, mut question: Question) -> bool {
        let Some(old) = self.questions.get(index) else {
            return false;
        };
        if !old.body().kind_matches(question.body()) {
            return false;
        }
        question.set_index(index as i64);
        self.questions[index] = question;
        true
    }
}
