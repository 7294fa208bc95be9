//! Resource model for training jobs
//!
//! `TrainingJob` is a closed union over the supported kinds. Everything that
//! differs between kinds goes through `JobResource` or the per-kind tables on
//! `JobKind`, so adding a kind means adding one variant and one impl.

pub mod filter;
pub mod kinds;

use std::fmt;
use std::str::FromStr;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::Resource;
use serde::{Deserialize, Serialize};

use crate::{
    crd::{PyTorchJob, RayJob, TrainJob, DISPLAY_NAME_ANNOTATION},
    queue::QueueLabels,
    status::JobState,
    Error,
};

pub use filter::JobFilter;
pub use kinds::{JobResource, NodeCounts};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobKind {
    PyTorchJob,
    TrainJob,
    RayJob,
}

const PYTORCH_VOCABULARY: &[(&str, JobState)] = &[
    ("Created", JobState::Created),
    ("Running", JobState::Running),
    ("Restarting", JobState::Restarting),
    ("Succeeded", JobState::Succeeded),
    ("Failed", JobState::Failed),
    ("Suspended", JobState::Paused),
];

const TRAIN_VOCABULARY: &[(&str, JobState)] = &[
    ("Complete", JobState::Complete),
    ("Failed", JobState::Failed),
    ("Suspended", JobState::Suspended),
];

// jobStatus values are upper case, jobDeploymentStatus values are capitalized
const RAY_VOCABULARY: &[(&str, JobState)] = &[
    ("PENDING", JobState::Pending),
    ("RUNNING", JobState::Running),
    ("STOPPED", JobState::Failed),
    ("SUCCEEDED", JobState::Succeeded),
    ("FAILED", JobState::Failed),
    ("New", JobState::Created),
    ("Initializing", JobState::Created),
    ("Waiting", JobState::Queued),
    ("Running", JobState::Running),
    ("Retrying", JobState::Restarting),
    ("Suspending", JobState::Suspended),
    ("Suspended", JobState::Suspended),
    ("Complete", JobState::Succeeded),
    ("Failed", JobState::Failed),
];

impl JobKind {
    pub const ALL: [JobKind; 3] = [JobKind::PyTorchJob, JobKind::TrainJob, JobKind::RayJob];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::PyTorchJob => "PyTorchJob",
            JobKind::TrainJob => "TrainJob",
            JobKind::RayJob => "RayJob",
        }
    }

    /// Condition type (or reported phase) to state table for this kind
    pub fn vocabulary(&self) -> &'static [(&'static str, JobState)] {
        match self {
            JobKind::PyTorchJob => PYTORCH_VOCABULARY,
            JobKind::TrainJob => TRAIN_VOCABULARY,
            JobKind::RayJob => RAY_VOCABULARY,
        }
    }

    pub fn state_for(&self, signal: &str) -> Option<JobState> {
        self.vocabulary()
            .iter()
            .find(|(name, _)| *name == signal)
            .map(|(_, state)| *state)
    }

    /// The state this kind reports while hibernated
    pub fn hibernated_state(&self) -> JobState {
        match self {
            JobKind::PyTorchJob => JobState::Paused,
            JobKind::TrainJob | JobKind::RayJob => JobState::Suspended,
        }
    }

    /// JSON pointer of the job's own suspend flag
    pub fn suspend_path(&self) -> &'static str {
        match self {
            JobKind::PyTorchJob => "/spec/runPolicy/suspend",
            JobKind::TrainJob | JobKind::RayJob => "/spec/suspend",
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobKind {
    type Err = Error;

    /// Accepts the kind name or its plural resource name, in any case
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pytorchjob" | "pytorchjobs" => Ok(JobKind::PyTorchJob),
            "trainjob" | "trainjobs" => Ok(JobKind::TrainJob),
            "rayjob" | "rayjobs" => Ok(JobKind::RayJob),
            _ => Err(Error::Validation(format!("Unknown training job kind: {}", s))),
        }
    }
}

/// Stable identity of a job: its uid, or kind/namespace/name before one is assigned
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobKey(String);

impl JobKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn for_job(job: &TrainingJob) -> Self {
        match job.uid() {
            Some(uid) if !uid.is_empty() => Self(uid.to_string()),
            _ => Self(format!("{}/{}/{}", job.kind(), job.namespace(), job.name())),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum TrainingJob {
    PyTorch(PyTorchJob),
    Train(TrainJob),
    Ray(RayJob),
}

impl TrainingJob {
    pub fn kind(&self) -> JobKind {
        self.resource().kind()
    }

    pub fn resource(&self) -> &dyn JobResource {
        match self {
            TrainingJob::PyTorch(job) => job,
            TrainingJob::Train(job) => job,
            TrainingJob::Ray(job) => job,
        }
    }

    pub fn meta(&self) -> &ObjectMeta {
        match self {
            TrainingJob::PyTorch(job) => job.meta(),
            TrainingJob::Train(job) => job.meta(),
            TrainingJob::Ray(job) => job.meta(),
        }
    }

    pub fn name(&self) -> String {
        self.meta().name.clone().unwrap_or_default()
    }

    pub fn namespace(&self) -> String {
        self.meta()
            .namespace
            .clone()
            .unwrap_or_else(|| "default".to_string())
    }

    pub fn uid(&self) -> Option<&str> {
        self.meta().uid.as_deref()
    }

    pub fn key(&self) -> JobKey {
        JobKey::for_job(self)
    }

    pub fn display_name(&self) -> String {
        self.meta()
            .annotations
            .as_ref()
            .and_then(|a| a.get(DISPLAY_NAME_ANNOTATION))
            .filter(|n| !n.is_empty())
            .cloned()
            .unwrap_or_else(|| self.name())
    }

    /// Local queue the job was submitted to, if it is queue-managed
    pub fn queue_name(&self, labels: &QueueLabels) -> Option<&str> {
        self.meta()
            .labels
            .as_ref()
            .and_then(|l| l.get(&labels.queue_name()))
            .map(String::as_str)
    }

    pub fn is_suspended(&self) -> bool {
        self.resource().is_suspended()
    }

    pub fn node_counts(&self) -> NodeCounts {
        self.resource().node_counts()
    }
}

impl From<PyTorchJob> for TrainingJob {
    fn from(job: PyTorchJob) -> Self {
        TrainingJob::PyTorch(job)
    }
}

impl From<TrainJob> for TrainingJob {
    fn from(job: TrainJob) -> Self {
        TrainingJob::Train(job)
    }
}

impl From<RayJob> for TrainingJob {
    fn from(job: RayJob) -> Self {
        TrainingJob::Ray(job)
    }
}
