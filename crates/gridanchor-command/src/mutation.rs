use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A command as seen by interceptors and listeners.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandInfo {
    pub id: String,
    pub params: Value,
}

impl CommandInfo {
    pub fn new(id: impl Into<String>, params: Value) -> Self {
        Self {
            id: id.into(),
            params,
        }
    }
}

/// Replayable mutation descriptor: a command id plus its serialized parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mutation {
    pub id: String,
    pub params: Value,
}

impl Mutation {
    pub fn new(id: impl Into<String>, params: Value) -> Self {
        Self {
            id: id.into(),
            params,
        }
    }
}

/// Compensating mutations synthesized for one command execution. Applying
/// `redo` and then `undo` restores the state observed before the command.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UndoRedoPair {
    pub undo: Vec<Mutation>,
    pub redo: Vec<Mutation>,
}

impl UndoRedoPair {
    pub fn new(undo: Vec<Mutation>, redo: Vec<Mutation>) -> Self {
        Self { undo, redo }
    }

    pub fn is_empty(&self) -> bool {
        self.undo.is_empty() && self.redo.is_empty()
    }

    /// Concatenate another pair's lists after this one's; no deduplication.
    pub fn append(&mut self, other: UndoRedoPair) {
        self.undo.extend(other.undo);
        self.redo.extend(other.redo);
    }
}
