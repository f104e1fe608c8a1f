//! Command dispatch with post-execution notifications.
//!
//! Commands run to completion on the caller's thread. Listeners are notified
//! synchronously, in subscription order, before `execute_command` returns, so
//! notifications of two commands never interleave.

use rustc_hash::FxHashMap;
use serde_json::Value;
use tracing::{debug, trace};

use crate::error::CommandError;
use crate::interceptor::{CommandInterceptor, FnInterceptor, InterceptorId, InterceptorRegistry};
use crate::mutation::{CommandInfo, Mutation, UndoRedoPair};

/// Returns `Ok(true)` when applied, `Ok(false)` when the handler declined.
pub type CommandHandler<D> = Box<dyn FnMut(&mut D, &Value) -> Result<bool, CommandError>>;
pub type CommandListener<D> = Box<dyn FnMut(&mut D, &ExecutedCommand)>;

/// Post-execution notification.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutedCommand {
    pub id: String,
    pub params: Value,
    pub applied: bool,
    /// Mutations contributed by interceptors; empty when the handler declined.
    pub undo_redo: UndoRedoPair,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

pub struct CommandBus<D> {
    handlers: FxHashMap<String, CommandHandler<D>>,
    interceptors: InterceptorRegistry<D>,
    listeners: Vec<(ListenerId, CommandListener<D>)>,
    next_listener: u64,
}

impl<D> Default for CommandBus<D> {
    fn default() -> Self {
        Self {
            handlers: FxHashMap::default(),
            interceptors: InterceptorRegistry::new(),
            listeners: Vec::new(),
            next_listener: 0,
        }
    }
}

impl<D> CommandBus<D> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_command(
        &mut self,
        id: impl Into<String>,
        handler: CommandHandler<D>,
    ) -> Result<(), CommandError> {
        let id = id.into();
        if self.handlers.contains_key(&id) {
            return Err(CommandError::DuplicateCommand(id));
        }
        trace!(%id, "command registered");
        self.handlers.insert(id, handler);
        Ok(())
    }

    pub fn has_command(&self, id: &str) -> bool {
        self.handlers.contains_key(id)
    }

    pub fn register(&mut self, interceptor: Box<dyn CommandInterceptor<D>>) -> InterceptorId {
        self.interceptors.register(interceptor)
    }

    /// Register a predicate + synthesizer pair.
    pub fn register_interceptor<P, S>(&mut self, predicate: P, synthesize: S) -> InterceptorId
    where
        D: 'static,
        P: Fn(&str) -> bool + 'static,
        S: Fn(&D, &CommandInfo) -> UndoRedoPair + 'static,
    {
        self.interceptors
            .register(Box::new(FnInterceptor::new(predicate, synthesize)))
    }

    pub fn unregister_interceptor(&mut self, id: InterceptorId) -> bool {
        self.interceptors.unregister(id)
    }

    pub fn interceptors(&self) -> &InterceptorRegistry<D> {
        &self.interceptors
    }

    pub fn subscribe(&mut self, listener: CommandListener<D>) -> ListenerId {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.listeners.push((id, listener));
        id
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(l, _)| *l != id);
        self.listeners.len() != before
    }

    /// Run the handler registered under `id`, synthesize undo/redo through the
    /// interceptors and notify every listener.
    pub fn execute_command(
        &mut self,
        doc: &mut D,
        id: &str,
        params: Value,
    ) -> Result<ExecutedCommand, CommandError> {
        let _span = tracing::debug_span!("execute_command", id).entered();
        let Some(handler) = self.handlers.get_mut(id) else {
            return Err(CommandError::HandlerMissing(id.to_string()));
        };

        let command = CommandInfo::new(id, params);
        let captured = self.interceptors.capture(doc, &command);
        let applied = handler(doc, &command.params)?;
        let undo_redo = if applied {
            self.interceptors.synthesize(doc, &command, captured)
        } else {
            UndoRedoPair::default()
        };

        let CommandInfo { id, params } = command;
        let executed = ExecutedCommand {
            id,
            params,
            applied,
            undo_redo,
        };
        debug!(
            applied,
            undo = executed.undo_redo.undo.len(),
            redo = executed.undo_redo.redo.len(),
            "command executed"
        );
        for (_, listener) in self.listeners.iter_mut() {
            listener(doc, &executed);
        }
        Ok(executed)
    }

    /// Replay a synthesized mutation list in order, stopping at the first error.
    pub fn apply_mutations(
        &mut self,
        doc: &mut D,
        mutations: &[Mutation],
    ) -> Result<usize, CommandError> {
        let mut applied = 0;
        for mutation in mutations {
            if self
                .execute_command(doc, &mutation.id, mutation.params.clone())?
                .applied
            {
                applied += 1;
            }
        }
        Ok(applied)
    }
}
