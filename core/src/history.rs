//! Undo/redo history and the coordinator deriving its availability.

use std::collections::VecDeque;
use std::fmt;

use crate::transaction::Transaction;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Undo,
    Redo,
}

/// One recorded step: replaying `forward` redoes it, `inverse` undoes it.
/// Both carry the token snapshot and caret of their target state.
#[derive(Debug, Clone)]
pub struct Revision {
    pub forward: Transaction,
    pub inverse: Transaction,
}

#[derive(Debug, Clone)]
pub struct History {
    undo: VecDeque<Revision>,
    redo: Vec<Revision>,
    max_depth: usize,
}

impl History {
    pub fn new(max_depth: usize) -> Self {
        Self {
            undo: VecDeque::new(),
            redo: Vec::new(),
            max_depth,
        }
    }

    /// Pushes a new step and forgets everything redoable.
    pub fn record(&mut self, revision: Revision) {
        if self.max_depth == 0 {
            return;
        }
        self.redo.clear();
        if self.undo.len() == self.max_depth {
            self.undo.pop_front();
        }
        self.undo.push_back(revision);
    }

    /// Transaction reverting the latest step, which becomes redoable.
    pub fn undo(&mut self) -> Option<Transaction> {
        let revision = self.undo.pop_back()?;
        let tx = revision.inverse.clone();
        self.redo.push(revision);
        Some(tx)
    }

    /// Transaction replaying the latest undone step.
    pub fn redo(&mut self) -> Option<Transaction> {
        let revision = self.redo.pop()?;
        let tx = revision.forward.clone();
        self.undo.push_back(revision);
        Some(tx)
    }

    pub fn depth(&self, direction: Direction) -> usize {
        match direction {
            Direction::Undo => self.undo.len(),
            Direction::Redo => self.redo.len(),
        }
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new(100)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UndoRedoState {
    pub can_undo: bool,
    pub can_redo: bool,
}

impl UndoRedoState {
    pub fn of(history: &History) -> Self {
        Self {
            can_undo: history.depth(Direction::Undo) > 0,
            can_redo: history.depth(Direction::Redo) > 0,
        }
    }
}

pub type UpdateObserver = Box<dyn FnMut(UndoRedoState)>;

/// Recomputes undo/redo availability and reports it to an observer.
#[derive(Default)]
pub struct UndoRedoCoordinator {
    state: UndoRedoState,
    observer: Option<UpdateObserver>,
}

impl UndoRedoCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_observer(&mut self, observer: impl FnMut(UndoRedoState) + 'static) {
        self.observer = Some(Box::new(observer));
    }

    /// Recomputes the state from `history` and notifies the observer.
    pub fn refresh(&mut self, history: &History) -> UndoRedoState {
        self.state = UndoRedoState::of(history);
        tracing::trace!(
            can_undo = self.state.can_undo,
            can_redo = self.state.can_redo,
            "undo/redo availability"
        );
        if let Some(observer) = self.observer.as_mut() {
            observer(self.state);
        }
        self.state
    }

    pub fn state(&self) -> UndoRedoState {
        self.state
    }
}

impl fmt::Debug for UndoRedoCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UndoRedoCoordinator")
            .field("state", &self.state)
            .field("observer", &self.observer.is_some())
            .finish()
    }
}
