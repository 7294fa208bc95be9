use serde::Serialize;

use crate::{crd::Workload, job::TrainingJob, status::JobState, Error};

use super::HibernationAction;

/// Outcome of a pause or resume, returned instead of an error
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HibernationResult {
    pub success: bool,
    pub action: HibernationAction,
    /// Optimistic state to show until the next refresh
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<JobState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job: Option<TrainingJob>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workload: Option<Workload>,
    /// The job's flag was patched directly after the Workload change did not propagate
    pub fallback_patched: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Rejected because another change for the same job was in flight
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub conflict: bool,
}

impl HibernationResult {
    pub fn success(
        action: HibernationAction,
        state: JobState,
        job: TrainingJob,
        workload: Option<Workload>,
        fallback_patched: bool,
    ) -> Self {
        Self {
            success: true,
            action,
            state: Some(state),
            job: Some(job),
            workload,
            fallback_patched,
            error: None,
            conflict: false,
        }
    }

    pub fn failure(action: HibernationAction, error: &Error) -> Self {
        Self {
            success: false,
            action,
            state: None,
            job: None,
            workload: None,
            fallback_patched: false,
            error: Some(format!("Failed to {} job: {}", action.verb(), error)),
            conflict: matches!(error, Error::Conflict(_)),
        }
    }
}
