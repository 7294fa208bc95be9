use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobState {
    Created,
    Pending,
    Queued,
    Running,
    Restarting,
    Succeeded,
    Complete,
    Failed,
    Paused,
    Suspended,
    Preempted,
    Resumed,
    Unknown,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Created => "Created",
            JobState::Pending => "Pending",
            JobState::Queued => "Queued",
            JobState::Running => "Running",
            JobState::Restarting => "Restarting",
            JobState::Succeeded => "Succeeded",
            JobState::Complete => "Complete",
            JobState::Failed => "Failed",
            JobState::Paused => "Paused",
            JobState::Suspended => "Suspended",
            JobState::Preempted => "Preempted",
            JobState::Resumed => "Resumed",
            JobState::Unknown => "Unknown",
        }
    }

    /// Terminal states never change again and are never overridden by queue state
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobState::Succeeded | JobState::Complete | JobState::Failed
        )
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
