//! Session state machine.

use serde::{Deserialize, Serialize};

/// Lifecycle state of a server session.
///
/// ```text
/// Starting -> Ready -> (Exchanging -> Ready)* -> Terminating -> Terminated
/// ```
///
/// A transport failure moves any live state straight to `Terminated`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    #[default]
    Starting,
    Ready,
    Exchanging,
    Terminating,
    Terminated,
}

impl SessionState {
    /// Returns `true` if moving from `self` to `to` is allowed.
    #[must_use]
    pub fn can_transition(self, to: SessionState) -> bool {
        use SessionState::{Exchanging, Ready, Starting, Terminated, Terminating};

        matches!(
            (self, to),
            (Starting, Ready | Terminating | Terminated)
                | (Ready, Exchanging | Terminating | Terminated)
                | (Exchanging, Ready | Terminated)
                | (Terminating, Terminated)
        )
    }

    /// Returns `true` if no further exchanges are possible.
    #[must_use]
    pub fn is_finished(self) -> bool {
        matches!(self, Self::Terminating | Self::Terminated)
    }
}

/// How one exchange ended, for statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeKind {
    Success,
    RemoteError,
    Timeout,
    ParseError,
    TransportFailure,
}

/// State machine for tracking session progress.
#[derive(Debug, Clone)]
pub struct SessionStateMachine {
    state: SessionState,
    stats: SessionStats,
}

impl Default for SessionStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStateMachine {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: SessionState::Starting,
            stats: SessionStats::default(),
        }
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Move to `new_state`.
    ///
    /// Returns `false` and leaves the state unchanged if the move is not allowed.
    pub fn transition(&mut self, new_state: SessionState) -> bool {
        if self.state == new_state {
            return true;
        }
        if !self.state.can_transition(new_state) {
            tracing::warn!(from = ?self.state, to = ?new_state, "Rejected state transition");
            return false;
        }
        tracing::debug!(from = ?self.state, to = ?new_state, "State transition");
        self.state = new_state;
        true
    }

    pub fn record(&mut self, kind: ExchangeKind) {
        let counter = match kind {
            ExchangeKind::Success => &mut self.stats.successes,
            ExchangeKind::RemoteError => &mut self.stats.remote_errors,
            ExchangeKind::Timeout => &mut self.stats.timeouts,
            ExchangeKind::ParseError => &mut self.stats.parse_errors,
            ExchangeKind::TransportFailure => &mut self.stats.transport_failures,
        };
        *counter = counter.saturating_add(1);
    }

    #[must_use]
    pub fn stats(&self) -> SessionStats {
        self.stats
    }
}

/// Session statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub successes: usize,
    pub remote_errors: usize,
    pub timeouts: usize,
    pub parse_errors: usize,
    pub transport_failures: usize,
}

impl SessionStats {
    /// Total number of exchanges attempted.
    #[must_use]
    pub fn total(&self) -> usize {
        self.successes
            + self.remote_errors
            + self.timeouts
            + self.parse_errors
            + self.transport_failures
    }
}
