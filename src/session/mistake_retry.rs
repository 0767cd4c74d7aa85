use crate::engine::question::Question;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RetryState {
    Idle,
    Correct,
    Incorrect,
    Revealed,
}

/// Re-attempting a logged mistake. Purely local: the stats are untouched.
#[derive(Clone, Debug)]
pub struct MistakeRetry {
    pub question: Question,
    pub selected: Option<usize>,
    state: RetryState,
}

impl MistakeRetry {
    pub fn new(question: Question) -> Self {
        Self {
            question,
            selected: None,
            state: RetryState::Idle,
        }
    }

    pub fn state(&self) -> RetryState {
        self.state
    }

    /// Selection is locked once solved or once the solution is shown.
    pub fn is_locked(&self) -> bool {
        matches!(self.state, RetryState::Correct | RetryState::Revealed)
    }

    pub fn select(&mut self, option: usize) -> bool {
        if self.is_locked() || option >= self.question.options.len() {
            return false;
        }
        self.selected = Some(option);
        true
    }

    pub fn submit(&mut self) -> RetryState {
        if self.is_locked() {
            return self.state;
        }
        if let Some(choice) = self.selected {
            self.state = if self.question.is_correct(choice) {
                RetryState::Correct
            } else {
                RetryState::Incorrect
            };
        }
        self.state
    }

    pub fn reveal(&mut self) {
        self.state = RetryState::Revealed;
    }

    pub fn retry(&mut self) {
        self.state = RetryState::Idle;
        self.selected = None;
    }
}
