//! Correlation between training jobs and Kueue objects

pub mod cluster_queue;
pub mod resolver;

pub use resolver::WorkloadResolver;

pub const DEFAULT_LABEL_PREFIX: &str = "kueue.x-k8s.io";

/// Well-known label keys written by the queue controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueLabels {
    prefix: String,
}

impl QueueLabels {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn job_uid(&self) -> String {
        format!("{}/job-uid", self.prefix)
    }

    pub fn job_name(&self) -> String {
        format!("{}/job-name", self.prefix)
    }

    pub fn queue_name(&self) -> String {
        format!("{}/queue-name", self.prefix)
    }
}

impl Default for QueueLabels {
    fn default() -> Self {
        Self::new(DEFAULT_LABEL_PREFIX)
    }
}
