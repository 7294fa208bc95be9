use serde::Deserialize;

use crate::{queue::QueueLabels, status::JobState};

use super::TrainingJob;

/// Case-insensitive substring filters applied to job lists
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobFilter {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub queue: Option<String>,
}

impl JobFilter {
    pub fn is_empty(&self) -> bool {
        [&self.name, &self.status, &self.queue]
            .iter()
            .all(|f| f.as_deref().map_or(true, str::is_empty))
    }

    pub fn matches(&self, job: &TrainingJob, state: JobState, labels: &QueueLabels) -> bool {
        if let Some(name) = non_empty(&self.name) {
            if !job.display_name().to_lowercase().contains(&name) {
                return false;
            }
        }

        if let Some(status) = non_empty(&self.status) {
            if !state.as_str().to_lowercase().contains(&status) {
                return false;
            }
        }

        if let Some(queue) = non_empty(&self.queue) {
            let job_queue = job.queue_name(labels).unwrap_or_default().to_lowercase();
            if !job_queue.contains(&queue) {
                return false;
            }
        }

        true
    }
}

fn non_empty(filter: &Option<String>) -> Option<String> {
    filter
        .as_deref()
        .filter(|f| !f.is_empty())
        .map(str::to_lowercase)
}
