use std::time::Duration;

use tracing::{debug, warn};

use crate::{
    crd::Workload,
    job::{JobResource, TrainingJob},
    queue::WorkloadResolver,
};

use super::JobState;

/// State from the job's own status, ignoring any queue
///
/// The most recent `True` condition wins; on equal transition times the one
/// listed first is kept. Kinds without conditions report a phase string instead.
pub fn derive_basic_status(job: &dyn JobResource) -> JobState {
    if !job.has_observed_status() {
        return JobState::Pending;
    }

    let latest = job
        .conditions()
        .iter()
        .filter(|c| c.is_true())
        .min_by(|a, b| b.transition_time().cmp(a.transition_time()))
        .map(|c| c.condition_type.as_str());

    let signal = match latest {
        Some(signal) => signal,
        None if job.conditions().is_empty() => match job.reported_phase() {
            Some(phase) => phase,
            None => return JobState::Unknown,
        },
        None => return JobState::Unknown,
    };

    job.kind()
        .state_for(signal)
        .or_else(|| job.secondary_state())
        .unwrap_or(JobState::Unknown)
}

/// Full status: the basic status adjusted for the job's Workload, if any
pub fn derive_status(job: &TrainingJob, workload: Option<&Workload>) -> JobState {
    let basic = derive_basic_status(job.resource());
    if basic.is_terminal() {
        return basic;
    }
    overlay_workload(job, basic, workload)
}

fn overlay_workload(job: &TrainingJob, basic: JobState, workload: Option<&Workload>) -> JobState {
    let kind = job.kind();
    match workload {
        Some(workload) if !workload.is_active() => kind.hibernated_state(),
        // The queue wants the job running but the job is still suspended: evicted
        Some(_) if job.is_suspended() => JobState::Preempted,
        Some(workload) if workload.is_waiting_for_admission() => JobState::Queued,
        Some(_) => basic,
        None if job.is_suspended() => kind.hibernated_state(),
        None => basic,
    }
}

/// Derives status with a bounded Workload lookup
#[derive(Clone)]
pub struct StatusDeriver {
    resolver: WorkloadResolver,
    lookup_timeout: Duration,
}

impl StatusDeriver {
    pub fn new(resolver: WorkloadResolver, lookup_timeout: Duration) -> Self {
        Self {
            resolver,
            lookup_timeout,
        }
    }

    pub fn resolver(&self) -> &WorkloadResolver {
        &self.resolver
    }

    /// Never fails: an unreachable or slow Kueue degrades to the job-only status
    pub async fn derive(&self, job: &TrainingJob) -> JobState {
        let basic = derive_basic_status(job.resource());
        if basic.is_terminal() {
            return basic;
        }

        let workload =
            match tokio::time::timeout(self.lookup_timeout, self.resolver.find_workload(job)).await
            {
                Ok(workload) => workload,
                Err(_) => {
                    warn!(
                        "Workload lookup for {} {}/{} timed out after {:?}",
                        job.kind(),
                        job.namespace(),
                        job.name(),
                        self.lookup_timeout
                    );
                    crate::metrics::record_workload_lookup_failure("timeout");
                    None
                }
            };

        let state = overlay_workload(job, basic, workload.as_ref());
        debug!("Derived {} for {} {}", state, job.kind(), job.name());
        state
    }
}
