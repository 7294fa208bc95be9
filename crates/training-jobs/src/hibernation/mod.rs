//! Pause and resume of training jobs
//!
//! Queue-managed jobs are hibernated by deactivating their Workload and
//! letting Kueue suspend the job; if the job's own flag has not followed by
//! the settle deadline it is patched directly. Unmanaged jobs are patched
//! directly from the start.

pub mod guard;
pub mod reconciler;
pub mod result;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use guard::{InFlightGuard, InFlightRegistry};
pub use reconciler::HibernationReconciler;
pub use result::HibernationResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HibernationAction {
    Pause,
    Resume,
}

impl HibernationAction {
    pub fn verb(&self) -> &'static str {
        match self {
            HibernationAction::Pause => "pause",
            HibernationAction::Resume => "resume",
        }
    }

    /// Target value of the job's suspend flag
    pub fn suspends(&self) -> bool {
        matches!(self, HibernationAction::Pause)
    }

    /// The action that flips a job's current suspend flag
    pub fn toggle_from(suspended: bool) -> Self {
        if suspended {
            HibernationAction::Resume
        } else {
            HibernationAction::Pause
        }
    }
}

impl fmt::Display for HibernationAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.verb())
    }
}
