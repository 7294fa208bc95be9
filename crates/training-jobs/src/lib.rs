pub mod cache;
pub mod config;
pub mod crd;
pub mod hibernation;
pub mod job;
pub mod kubernetes;
pub mod metrics;
pub mod queue;
pub mod server;
pub mod status;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Kubernetes error: {0}")]
    Kubernetes(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Cancelled: {0}")]
    Cancelled(String),
    #[error("Convergence error: {0}")]
    Convergence(String),
    #[error("JSON error: {0}")]
    SerdeJson(#[from] serde_json::Error),
    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;

pub use cache::{StatusCache, StatusPoller};
pub use hibernation::{HibernationAction, HibernationReconciler, HibernationResult};
pub use job::{JobKey, JobKind, TrainingJob};
pub use kubernetes::{ClusterApi, FieldPatch, KubeClient};
pub use queue::WorkloadResolver;
pub use status::{derive_status, JobState, StatusDeriver};
