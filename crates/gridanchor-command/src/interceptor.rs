//! Interceptors contribute undo/redo mutations to commands they recognise.
//!
//! Synthesis runs in two phases around the handler: [`CommandInterceptor::capture`]
//! sees the document before the command mutates it and returns a snapshot, and
//! [`CommandInterceptor::synthesize`] sees the mutated document plus that
//! snapshot. Interceptors only get `&self`, so there is no per-call memo that
//! could leak state from one command into another.

use serde_json::Value;

use crate::mutation::{CommandInfo, UndoRedoPair};

pub trait CommandInterceptor<D> {
    fn matches(&self, command_id: &str) -> bool;

    /// Pre-mutation snapshot handed back to [`synthesize`](Self::synthesize).
    fn capture(&self, _doc: &D, _command: &CommandInfo) -> Value {
        Value::Null
    }

    fn synthesize(&self, doc: &D, command: &CommandInfo, snapshot: &Value) -> UndoRedoPair;
}

/// Closure-backed interceptor without a capture phase.
pub struct FnInterceptor<P, S> {
    predicate: P,
    synthesize: S,
}

impl<P, S> FnInterceptor<P, S> {
    pub fn new(predicate: P, synthesize: S) -> Self {
        Self {
            predicate,
            synthesize,
        }
    }
}

impl<D, P, S> CommandInterceptor<D> for FnInterceptor<P, S>
where
    P: Fn(&str) -> bool,
    S: Fn(&D, &CommandInfo) -> UndoRedoPair,
{
    fn matches(&self, command_id: &str) -> bool {
        (self.predicate)(command_id)
    }

    fn synthesize(&self, doc: &D, command: &CommandInfo, _snapshot: &Value) -> UndoRedoPair {
        (self.synthesize)(doc, command)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InterceptorId(u64);

/// Snapshots taken before a command ran, keyed by the interceptor that took them.
#[derive(Debug, Default)]
pub struct Captured {
    snapshots: Vec<(InterceptorId, Value)>,
}

impl Captured {
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

pub struct InterceptorRegistry<D> {
    next_id: u64,
    entries: Vec<(InterceptorId, Box<dyn CommandInterceptor<D>>)>,
}

impl<D> Default for InterceptorRegistry<D> {
    fn default() -> Self {
        Self {
            next_id: 0,
            entries: Vec::new(),
        }
    }
}

impl<D> InterceptorRegistry<D> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, interceptor: Box<dyn CommandInterceptor<D>>) -> InterceptorId {
        let id = InterceptorId(self.next_id);
        self.next_id += 1;
        self.entries.push((id, interceptor));
        id
    }

    pub fn unregister(&mut self, id: InterceptorId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(i, _)| *i != id);
        self.entries.len() != before
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Run the capture phase of every interceptor matching `command`.
    pub fn capture(&self, doc: &D, command: &CommandInfo) -> Captured {
        let snapshots = self
            .entries
            .iter()
            .filter(|(_, i)| i.matches(&command.id))
            .map(|(id, i)| (*id, i.capture(doc, command)))
            .collect();
        Captured { snapshots }
    }

    /// Merge the pairs of every interceptor that captured for this command, in
    /// registration order.
    pub fn synthesize(&self, doc: &D, command: &CommandInfo, captured: Captured) -> UndoRedoPair {
        let mut merged = UndoRedoPair::default();
        for (id, snapshot) in captured.snapshots {
            let Some((_, interceptor)) = self.entries.iter().find(|(i, _)| *i == id) else {
                continue;
            };
            merged.append(interceptor.synthesize(doc, command, &snapshot));
        }
        merged
    }

    /// Single-phase synthesis against the current document, for callers that
    /// already hold a pre-mutation document.
    pub fn intercept(&self, doc: &D, command: &CommandInfo) -> UndoRedoPair {
        let captured = self.capture(doc, command);
        self.synthesize(doc, command, captured)
    }
}
