// scope/lifecycle.rs
//! Per-symbol lifecycle: DECLARED -> INITIALIZED -> DEAD.
//!
//! Every transition is recorded together with the node that caused it, so a
//! later diagnostic can point at the assignment or move responsible.

use smallvec::SmallVec;
use spindle_frontend::{NodeId, Span};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleState {
    Declared,
    Initialized,
    /// Moved from or destroyed.
    Dead,
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            LifecycleState::Declared => "declared",
            LifecycleState::Initialized => "initialized",
            LifecycleState::Dead => "dead",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifecycleEvent {
    pub state: LifecycleState,
    pub node: NodeId,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LifecycleError {
    #[error("destroy of uninitialized variable")]
    DestroyUninitialized,
    #[error("double destroy")]
    DoubleDestroy { previous: Span },
    #[error("initialization of a dead variable without a fresh declaration")]
    Revive { destroyed_at: Span },
    #[error("redeclaration of a live variable")]
    RedeclareLive,
}

#[derive(Debug, Clone, Default)]
pub struct Lifecycle {
    events: SmallVec<[LifecycleEvent; 4]>,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state. A lifecycle without events is DEAD.
    pub fn state(&self) -> LifecycleState {
        self.events.last().map_or(LifecycleState::Dead, |e| e.state)
    }

    pub fn is_declared(&self) -> bool {
        self.state() == LifecycleState::Declared
    }

    pub fn is_initialized(&self) -> bool {
        self.state() == LifecycleState::Initialized
    }

    pub fn is_dead(&self) -> bool {
        self.state() == LifecycleState::Dead
    }

    pub fn events(&self) -> &[LifecycleEvent] {
        &self.events
    }

    /// Most recent event that entered `state`.
    pub fn last_event_of(&self, state: LifecycleState) -> Option<&LifecycleEvent> {
        self.events.iter().rev().find(|e| e.state == state)
    }

    /// Apply a transition, rejecting the illegal ones.
    pub fn transition(&mut self, state: LifecycleState, node: NodeId, span: Span) -> Result<(), LifecycleError> {
        let current = self.state();
        match (current, state) {
            (LifecycleState::Initialized, LifecycleState::Declared) => {
                return Err(LifecycleError::RedeclareLive);
            }
            (LifecycleState::Declared, LifecycleState::Dead) => {
                return Err(LifecycleError::DestroyUninitialized);
            }
            (LifecycleState::Dead, LifecycleState::Dead) => {
                let previous = self.last_event_of(LifecycleState::Dead).map_or(span, |e| e.span);
                return Err(LifecycleError::DoubleDestroy { previous });
            }
            (LifecycleState::Dead, LifecycleState::Initialized) => {
                let destroyed_at = self.last_event_of(LifecycleState::Dead).map_or(span, |e| e.span);
                return Err(LifecycleError::Revive { destroyed_at });
            }
            _ => {}
        }
        self.events.push(LifecycleEvent { state, node, span });
        Ok(())
    }

    pub fn declare(&mut self, node: NodeId, span: Span) -> Result<(), LifecycleError> {
        self.transition(LifecycleState::Declared, node, span)
    }

    pub fn initialize(&mut self, node: NodeId, span: Span) -> Result<(), LifecycleError> {
        self.transition(LifecycleState::Initialized, node, span)
    }

    pub fn destroy(&mut self, node: NodeId, span: Span) -> Result<(), LifecycleError> {
        self.transition(LifecycleState::Dead, node, span)
    }
}
