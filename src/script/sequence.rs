use super::parser::Action;

/// An immutable list of actions behind a forward-only cursor.
///
/// Once the cursor passes the last action the sequence stays exhausted; there
/// is no way to rewind it.
#[derive(Debug, Clone, Default)]
pub struct ActionSequence {
    actions: Vec<Action>,
    cursor: usize,
}

impl ActionSequence {
    pub fn new(actions: Vec<Action>) -> Self {
        ActionSequence { actions, cursor: 0 }
    }

    /// Number of actions already handed out.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_exhausted(&self) -> bool {
        self.cursor >= self.actions.len()
    }
}

impl Iterator for ActionSequence {
    type Item = Action;

    fn next(&mut self) -> Option<Action> {
        let action = self.actions.get(self.cursor)?.clone();
        self.cursor += 1;
        Some(action)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.actions.len().saturating_sub(self.cursor);
        (left, Some(left))
    }
}

impl std::iter::FusedIterator for ActionSequence {}

impl From<Vec<Action>> for ActionSequence {
    fn from(actions: Vec<Action>) -> Self {
        ActionSequence::new(actions)
    }
}
