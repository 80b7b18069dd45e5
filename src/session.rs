//! Responder session state machine.
//!
//! ```text
//! DISCONNECTED ─▶ CONNECTING ─▶ REGISTERING ─▶ RUNNING ─▶ FAILURE
//!                                   ▲             │
//!                                   └─ COLLISION ◀┘
//! ```
//!
//! [`transition`] decides what a state change requires; [`Session`] carries
//! the action out against the responder and the record set.

use std::fmt;
use std::io::{self, Write};

use tracing::{debug, error, info, warn};

use crate::error::{AliasError, ErrorCode, ResponderError};
use crate::metrics;
use crate::records::{PublishOutcome, PublishReport, RecordSet};
use crate::responder::{GroupState, Responder, ResponderEvent};

/// Lifecycle state of the responder session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// No connection yet.
    Disconnected,
    /// Connecting to the responder.
    Connecting,
    /// The responder is registering its host records.
    Registering,
    /// The responder accepts records.
    Running,
    /// The responder's host name collided; it will re-register.
    Collision,
    /// The session is dead.
    Failure,
}

impl SessionState {
    /// Map an avahi-daemon server state code.
    ///
    /// The daemon's "invalid" state (0) only occurs while it re-registers, so
    /// it is treated as registering.
    pub fn from_server_code(code: i32) -> Option<Self> {
        match code {
            0 | 1 => Some(Self::Registering),
            2 => Some(Self::Running),
            3 => Some(Self::Collision),
            4 => Some(Self::Failure),
            _ => None,
        }
    }

    /// Lowercase name for logs and metrics labels.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Registering => "registering",
            Self::Running => "running",
            Self::Collision => "collision",
            Self::Failure => "failure",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a session state change requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Make sure the records are published.
    Publish,
    /// Withdraw the records; a new generation starts.
    Reset,
    /// Stop the event loop with the given cause.
    Shutdown(ErrorCode),
}

/// Decide the action for a change from `current` to `next`.
///
/// `error` is the cause reported along with the change. Failure is terminal:
/// nothing that follows it produces an action.
pub fn transition(current: SessionState, next: SessionState, error: ErrorCode) -> Option<Action> {
    use SessionState::*;

    match (current, next) {
        (Failure, _) => None,
        (_, Running) => Some(Action::Publish),
        (_, Failure) => Some(Action::Shutdown(error)),
        (_, Collision) | (_, Registering) => Some(Action::Reset),
        (_, Connecting) | (_, Disconnected) => None,
    }
}

/// The one session with the responder, and the record set published on it.
pub struct Session<R: Responder> {
    state: SessionState,
    generation: u64,
    responder: R,
    records: RecordSet<R::Group>,
    out: Box<dyn Write + Send>,
}

impl<R: Responder> Session<R> {
    /// Create a session in the disconnected state. Confirmations go to stdout.
    pub fn new(responder: R, records: RecordSet<R::Group>) -> Self {
        Self {
            state: SessionState::Disconnected,
            generation: 0,
            responder,
            records,
            out: Box::new(io::stdout()),
        }
    }

    /// Send confirmation lines to `out` instead of stdout.
    pub fn with_output(mut self, out: Box<dyn Write + Send>) -> Self {
        self.out = out;
        self
    }

    /// Current session state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Current session generation. Starts at 0, bumped on every reset.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The record set.
    pub fn records(&self) -> &RecordSet<R::Group> {
        &self.records
    }

    /// Handle one responder notification.
    ///
    /// An `Err` means the event loop must stop; the cause has already been
    /// logged.
    pub async fn handle_event(&mut self, event: ResponderEvent) -> Result<(), AliasError> {
        match event {
            ResponderEvent::Session { state, error } => self.on_session_state(state, error).await,
            ResponderEvent::Group {
                group,
                state,
                error,
            } => self.on_group_state(&group, state, error),
        }
    }

    async fn on_session_state(
        &mut self,
        next: SessionState,
        error: ErrorCode,
    ) -> Result<(), AliasError> {
        let current = self.state;
        let action = transition(current, next, error);
        if current != SessionState::Failure {
            self.state = next;
        }

        debug!(from = %current, to = %next, action = ?action, "session state changed");
        metrics::record_session_transition(next);

        match action {
            None => Ok(()),
            Some(Action::Publish) => {
                let outcome = self
                    .records
                    .ensure_published(&mut self.responder, self.generation)
                    .await;
                match outcome {
                    Ok(PublishOutcome::Published(report)) => self.confirm(&report),
                    Ok(PublishOutcome::AlreadyPublished) => Ok(()),
                    Err(e) => {
                        error!("{}", e);
                        Err(e.into())
                    }
                }
            }
            Some(Action::Reset) => {
                self.generation += 1;
                info!(
                    state = %next,
                    generation = self.generation,
                    "responder re-registering, withdrawing aliases"
                );
                // Retried on the next RUNNING, where a failure is fatal.
                if let Err(e) = self.records.reset(&mut self.responder).await {
                    warn!(error = %e, "entry group reset failed");
                }
                Ok(())
            }
            Some(Action::Shutdown(code)) => {
                error!(code = code.0, "Client failure: {}", self.responder.describe(code));
                Err(ResponderError::code("session", code).into())
            }
        }
    }

    fn on_group_state(
        &mut self,
        group: &str,
        state: GroupState,
        error: ErrorCode,
    ) -> Result<(), AliasError> {
        let current = self
            .records
            .group()
            .map(|g| self.responder.group_id(g.handle()));
        if current.as_deref() != Some(group) {
            debug!(group, ?state, "ignoring event for a stale entry group");
            return Ok(());
        }

        match state {
            GroupState::Failure => {
                error!(
                    group,
                    code = error.0,
                    "Entry group failure: {}",
                    self.responder.describe(error)
                );
                Err(ResponderError::code("entry group", error).into())
            }
            GroupState::Collision => {
                warn!(group, "entry group name collision");
                Ok(())
            }
            GroupState::Established => {
                info!(group, "entry group established");
                Ok(())
            }
            GroupState::Uncommitted | GroupState::Registering => {
                debug!(group, ?state, "entry group state changed");
                Ok(())
            }
        }
    }

    fn confirm(&mut self, report: &PublishReport) -> Result<(), AliasError> {
        for alias in &report.aliases {
            writeln!(
                self.out,
                "Published DNS-SD hostname {} with CNAME {}",
                report.target, alias
            )?;
        }
        self.out.flush()?;
        Ok(())
    }

    /// Free the record group and hand back the responder.
    pub async fn close(mut self) -> R {
        self.records.free(&mut self.responder).await;
        self.responder
    }
}
