//! Message types for actor communication
//!
//! Every action actor owns an mpsc command channel. Callers talk to it
//! through an [`ActionHandle`](super::action::ActionHandle), and replies
//! travel back over oneshot channels.

use chrono::{DateTime, Utc};
use tokio::sync::oneshot;

use crate::command::ExecutionReport;
use crate::error::{ExecutionError, FetchError};

/// Commands that can be sent to an ActionActor
#[derive(Debug)]
pub enum ActionCommand {
    /// Run one check cycle immediately, outside the schedule
    ///
    /// The pending sleep is not reset.
    CheckNow {
        /// Channel to send the result back
        respond_to: oneshot::Sender<CheckReport>,
    },

    /// Gracefully shut down the action
    ///
    /// The actor finishes any in-flight check (including a running command)
    /// and then exits.
    Shutdown,
}

/// Result of a single fetch → evaluate → trigger cycle
#[derive(Debug)]
pub struct CheckReport {
    /// Name of the action that ran the check
    pub action: String,

    /// When the check started
    pub checked_at: DateTime<Utc>,

    pub outcome: CheckOutcome,
}

#[derive(Debug)]
pub enum CheckOutcome {
    /// No value could be obtained, so nothing was evaluated
    FetchFailed(FetchError),

    /// The value did not cross the threshold
    Idle { value: f64 },

    /// The value crossed the threshold and the command was run
    Triggered {
        value: f64,
        execution: Result<ExecutionReport, ExecutionError>,
    },

    /// The check panicked; the actor keeps running
    Panicked,
}

impl CheckOutcome {
    pub fn is_triggered(&self) -> bool {
        matches!(self, CheckOutcome::Triggered { .. })
    }
}
