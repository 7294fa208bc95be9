use serde::Serialize;

use crate::{
    crd::{JobCondition, ProgressionStatus, PyTorchJob, RayJob, TrainJob},
    kubernetes::FieldPatch,
    status::JobState,
};

use super::JobKind;

/// Node topology of a job as shown in list views
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
pub struct NodeCounts {
    pub total: i32,
    /// Master replicas (PyTorchJob) or head replicas (RayJob)
    pub coordinators: i32,
    pub workers: i32,
}

/// Kind-specific accessors the derivation and reconciliation code relies on
pub trait JobResource {
    fn kind(&self) -> JobKind;

    /// Status conditions in the order the controller wrote them
    fn conditions(&self) -> &[JobCondition];

    /// Phase string for kinds that report lifecycle without conditions
    fn reported_phase(&self) -> Option<&str> {
        None
    }

    /// False until the kind's controller has written any status at all
    fn has_observed_status(&self) -> bool;

    /// State implied by sub-resource counters when the condition is not in the vocabulary
    fn secondary_state(&self) -> Option<JobState> {
        None
    }

    fn is_suspended(&self) -> bool;

    fn suspend_patch(&self, suspend: bool) -> FieldPatch {
        FieldPatch::replace(self.kind().suspend_path(), suspend)
    }

    /// Raw completion percentage as reported, unvalidated
    fn percentage(&self) -> Option<&serde_json::Value>;

    fn progression(&self) -> Option<&ProgressionStatus> {
        None
    }

    fn node_counts(&self) -> NodeCounts;
}

impl JobResource for PyTorchJob {
    fn kind(&self) -> JobKind {
        JobKind::PyTorchJob
    }

    fn conditions(&self) -> &[JobCondition] {
        self.status
            .as_ref()
            .map(|s| s.conditions.as_slice())
            .unwrap_or(&[])
    }

    fn has_observed_status(&self) -> bool {
        self.status.as_ref().is_some_and(|s| {
            !s.conditions.is_empty()
                || !s.replica_statuses.is_empty()
                || s.completion_percentage.is_some()
        })
    }

    fn secondary_state(&self) -> Option<JobState> {
        let status = self.status.as_ref()?;
        status
            .replica_statuses
            .values()
            .any(|r| r.active > 0)
            .then_some(JobState::Running)
    }

    fn is_suspended(&self) -> bool {
        self.spec
            .run_policy
            .as_ref()
            .and_then(|p| p.suspend)
            .unwrap_or(false)
    }

    fn percentage(&self) -> Option<&serde_json::Value> {
        self.status.as_ref()?.completion_percentage.as_ref()
    }

    fn node_counts(&self) -> NodeCounts {
        let replicas = |role: &str| {
            self.spec
                .pytorch_replica_specs
                .get(role)
                .and_then(|r| r.replicas)
                .unwrap_or(0)
        };
        let coordinators = replicas("Master");
        let workers = replicas("Worker");
        NodeCounts {
            total: coordinators + workers,
            coordinators,
            workers,
        }
    }
}

impl JobResource for TrainJob {
    fn kind(&self) -> JobKind {
        JobKind::TrainJob
    }

    fn conditions(&self) -> &[JobCondition] {
        self.status
            .as_ref()
            .map(|s| s.conditions.as_slice())
            .unwrap_or(&[])
    }

    fn has_observed_status(&self) -> bool {
        self.status.as_ref().is_some_and(|s| {
            !s.conditions.is_empty()
                || !s.jobs_status.is_empty()
                || s.progression_status.is_some()
                || s.training_progress.is_some()
        })
    }

    // Without a recognised condition the JobSet counters decide
    fn secondary_state(&self) -> Option<JobState> {
        let status = self.status.as_ref()?;
        if status.jobs_status.iter().any(|j| j.active > 0) {
            Some(JobState::Running)
        } else {
            Some(JobState::Pending)
        }
    }

    fn is_suspended(&self) -> bool {
        self.spec.suspend.unwrap_or(false)
    }

    fn percentage(&self) -> Option<&serde_json::Value> {
        let status = self.status.as_ref()?;
        status
            .progression_status
            .as_ref()
            .and_then(|p| p.percentage_complete.as_ref())
            .or_else(|| {
                status
                    .training_progress
                    .as_ref()
                    .and_then(|p| p.percent_complete.as_ref())
            })
    }

    fn progression(&self) -> Option<&ProgressionStatus> {
        self.status.as_ref()?.progression_status.as_ref()
    }

    fn node_counts(&self) -> NodeCounts {
        let workers = self
            .spec
            .trainer
            .as_ref()
            .and_then(|t| t.num_nodes)
            .unwrap_or(1);
        NodeCounts {
            total: workers,
            coordinators: 0,
            workers,
        }
    }
}

impl JobResource for RayJob {
    fn kind(&self) -> JobKind {
        JobKind::RayJob
    }

    fn conditions(&self) -> &[JobCondition] {
        &[]
    }

    // A finished jobStatus outranks whatever the deployment is still doing
    fn reported_phase(&self) -> Option<&str> {
        let status = self.status.as_ref()?;
        let job_status = status.job_status.as_deref().filter(|s| !s.is_empty());
        let deployment = status
            .job_deployment_status
            .as_deref()
            .filter(|s| !s.is_empty());
        match job_status {
            Some(s @ ("SUCCEEDED" | "FAILED" | "STOPPED")) => Some(s),
            _ => deployment.or(job_status),
        }
    }

    fn has_observed_status(&self) -> bool {
        self.reported_phase().is_some()
    }

    fn is_suspended(&self) -> bool {
        self.spec.suspend.unwrap_or(false)
    }

    fn percentage(&self) -> Option<&serde_json::Value> {
        None
    }

    fn node_counts(&self) -> NodeCounts {
        let Some(cluster) = self.spec.ray_cluster_spec.as_ref() else {
            return NodeCounts::default();
        };
        let coordinators = cluster
            .head_group_spec
            .as_ref()
            .and_then(|h| h.replicas)
            .unwrap_or(1);
        let workers = cluster
            .worker_group_specs
            .iter()
            .map(|g| g.replicas.unwrap_or(0))
            .sum();
        NodeCounts {
            total: coordinators + workers,
            coordinators,
            workers,
        }
    }
}
