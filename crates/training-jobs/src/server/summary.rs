use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
    hibernation::HibernationAction,
    job::{JobKind, NodeCounts, TrainingJob},
    queue::QueueLabels,
    status::{progress_info, JobState, ProgressInfo},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobAction {
    Pause,
    Resume,
    Delete,
}

impl From<HibernationAction> for JobAction {
    fn from(action: HibernationAction) -> Self {
        match action {
            HibernationAction::Pause => JobAction::Pause,
            HibernationAction::Resume => JobAction::Resume,
        }
    }
}

/// Finished jobs can only be deleted; others flip on their own suspend flag.
/// The derived state is not consulted, so a job shown as paused through its
/// Workload still offers pause until its own flag follows.
pub fn available_actions(state: JobState, suspended: bool) -> Vec<JobAction> {
    if state.is_terminal() {
        return vec![JobAction::Delete];
    }
    vec![HibernationAction::toggle_from(suspended).into(), JobAction::Delete]
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSummary {
    pub kind: JobKind,
    pub name: String,
    pub namespace: String,
    pub uid: Option<String>,
    pub display_name: String,
    pub queue: Option<String>,
    pub state: JobState,
    pub progress: ProgressInfo,
    pub nodes: NodeCounts,
    pub actions: Vec<JobAction>,
}

impl JobSummary {
    pub fn new(job: &TrainingJob, state: JobState, labels: &QueueLabels, now: DateTime<Utc>) -> Self {
        Self {
            kind: job.kind(),
            name: job.name(),
            namespace: job.namespace(),
            uid: job.uid().map(str::to_string),
            display_name: job.display_name(),
            queue: job.queue_name(labels).map(str::to_string),
            state,
            progress: progress_info(job, now),
            nodes: job.node_counts(),
            actions: available_actions(state, job.is_suspended()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobDetail {
    #[serde(flatten)]
    pub summary: JobSummary,
    pub workload: Option<String>,
    pub cluster_queue: Option<String>,
}
