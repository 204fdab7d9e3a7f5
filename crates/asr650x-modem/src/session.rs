//! Join session state machine.
//!
//! The module itself keeps no queryable join flag the driver can trust
//! across commands, so the driver tracks the session on the host side and
//! validates every transition. The tracker also keeps a bounded history
//! of transitions for debugging flaky gateways.
//!
//! # States and Valid Transitions
//!
//! - `NotJoined` → `Joining` (join attempt started)
//! - `Joining` → `Joined` (join evidence observed)
//! - `Joining` → `JoinFailed` (retries exhausted or command failed)
//! - `Joining` → `NotJoined` (attempt aborted)
//! - `Joined` → `NotJoined` (reboot acknowledged; the only way out of Joined)
//! - `JoinFailed` → `Joining` (new attempt)
//!
//! # Examples
//!
//! ```
//! use asr650x_modem::{SessionState, SessionTracker};
//!
//! let mut session = SessionTracker::new();
//! assert_eq!(session.current(), SessionState::NotJoined);
//!
//! session.transition_to(SessionState::Joining).unwrap();
//! session.transition_to(SessionState::Joined).unwrap();
//! assert!(session.is_joined());
//!
//! // Joined cannot fall back to Joining
//! assert!(session.transition_to(SessionState::Joining).is_err());
//! ```

use std::collections::VecDeque;
use std::fmt;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use asr650x_core::{Error, Result};

/// Maximum number of session transitions to keep in history.
///
/// Join cycles are rare (one per power cycle in the common case), so a
/// small window covers weeks of operation while staying a fixed cost.
const MAX_HISTORY_SIZE: usize = 32;

/// Host-side view of the LoRaWAN join session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// No network session; the module has not joined since the last reset.
    NotJoined,

    /// A join attempt is in progress and being polled.
    Joining,

    /// The network accepted the join; uplinks are possible.
    Joined,

    /// The last join attempt exhausted its retries or failed outright.
    JoinFailed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            SessionState::NotJoined => "NotJoined",
            SessionState::Joining => "Joining",
            SessionState::Joined => "Joined",
            SessionState::JoinFailed => "JoinFailed",
        };
        write!(f, "{text}")
    }
}

impl SessionState {
    /// Check if transition to the target state is valid from this state.
    ///
    /// # Examples
    ///
    /// ```
    /// use asr650x_modem::SessionState;
    ///
    /// assert!(SessionState::NotJoined.can_transition_to(SessionState::Joining));
    /// assert!(!SessionState::NotJoined.can_transition_to(SessionState::Joined));
    /// assert!(!SessionState::Joined.can_transition_to(SessionState::Joining));
    /// ```
    #[must_use]
    pub fn can_transition_to(self, target: SessionState) -> bool {
        matches!(
            (self, target),
            // From NotJoined
            (SessionState::NotJoined, SessionState::Joining)
            // From Joining
            | (
                SessionState::Joining,
                SessionState::Joined | SessionState::JoinFailed | SessionState::NotJoined
            )
            // From Joined: only a reboot acknowledgment tears the session down
            | (SessionState::Joined, SessionState::NotJoined)
            // From JoinFailed
            | (SessionState::JoinFailed, SessionState::Joining)
        )
    }
}

/// A single session transition with timestamp.
///
/// The `timestamp` field is not serialized as `Instant` is
/// process-specific; on deserialization it is set to the current time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionTransition {
    /// The state transitioned from.
    pub from: SessionState,

    /// The state transitioned to.
    pub to: SessionState,

    /// When the transition occurred.
    #[serde(skip, default = "Instant::now")]
    pub timestamp: Instant,
}

impl SessionTransition {
    /// Create a transition record stamped with the current time.
    pub fn new(from: SessionState, to: SessionState) -> Self {
        Self {
            from,
            to,
            timestamp: Instant::now(),
        }
    }

    /// Get the duration since this transition occurred.
    pub fn elapsed(&self) -> Duration {
        self.timestamp.elapsed()
    }
}

/// Session tracker enforcing valid transitions and recording history.
///
/// Not thread-safe by design; the driver owns exactly one and all access
/// goes through `&mut self`.
#[derive(Debug)]
pub struct SessionTracker {
    /// Current session state.
    current: SessionState,

    /// When the current state was entered.
    entered_at: Instant,

    /// Recent transitions, oldest first, bounded to [`MAX_HISTORY_SIZE`].
    history: VecDeque<SessionTransition>,
}

impl SessionTracker {
    /// Create a tracker in the `NotJoined` state.
    pub fn new() -> Self {
        Self {
            current: SessionState::NotJoined,
            entered_at: Instant::now(),
            history: VecDeque::with_capacity(MAX_HISTORY_SIZE),
        }
    }

    /// Get the current session state.
    #[must_use]
    pub fn current(&self) -> SessionState {
        self.current
    }

    /// Returns `true` if the session is currently joined.
    #[must_use]
    pub fn is_joined(&self) -> bool {
        self.current == SessionState::Joined
    }

    /// Get the time elapsed in the current state.
    #[must_use]
    pub fn time_in_current_state(&self) -> Duration {
        self.entered_at.elapsed()
    }

    /// Get the transition history, oldest first.
    #[must_use]
    pub fn history(&self) -> &VecDeque<SessionTransition> {
        &self.history
    }

    /// Transition to a new state.
    ///
    /// # Errors
    /// Returns `Error::InvalidStateTransition` if the transition is not in
    /// the legal set; the current state is left unchanged.
    pub fn transition_to(&mut self, target: SessionState) -> Result<()> {
        if !self.current.can_transition_to(target) {
            return Err(Error::InvalidStateTransition {
                from: self.current.to_string(),
                to: target.to_string(),
            });
        }

        if self.history.len() >= MAX_HISTORY_SIZE {
            self.history.pop_front();
        }
        self.history
            .push_back(SessionTransition::new(self.current, target));

        self.current = target;
        self.entered_at = Instant::now();
        Ok(())
    }
}

impl Default for SessionTracker {
    fn default() -> Self {
        Self::new()
    }
}
