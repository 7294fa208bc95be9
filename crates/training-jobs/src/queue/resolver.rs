use std::sync::Arc;

use tracing::{debug, warn};

use crate::{crd::Workload, job::TrainingJob, kubernetes::ClusterApi, metrics};

use super::QueueLabels;

/// Finds the Kueue Workload admitting a job
///
/// Most jobs are not queue-managed, so "no Workload" is the common answer and
/// never an error. Lookup failures are logged and reported as absent.
#[derive(Clone)]
pub struct WorkloadResolver {
    client: Arc<dyn ClusterApi>,
    labels: QueueLabels,
}

impl WorkloadResolver {
    pub fn new(client: Arc<dyn ClusterApi>, labels: QueueLabels) -> Self {
        Self { client, labels }
    }

    pub fn labels(&self) -> &QueueLabels {
        &self.labels
    }

    pub(crate) fn client(&self) -> &Arc<dyn ClusterApi> {
        &self.client
    }

    pub async fn find_workload(&self, job: &TrainingJob) -> Option<Workload> {
        let namespace = job.namespace();

        if let Some(uid) = job.uid().filter(|u| !u.is_empty()) {
            let selector = format!("{}={}", self.labels.job_uid(), uid);
            if let Some(workload) = self.query(&namespace, &selector).await {
                return Some(workload);
            }
        }

        let selector = format!("{}={}", self.labels.job_name(), job.name());
        self.query(&namespace, &selector).await
    }

    async fn query(&self, namespace: &str, selector: &str) -> Option<Workload> {
        let workloads = match self.client.list_workloads(namespace, selector).await {
            Ok(workloads) => workloads,
            Err(e) => {
                warn!("Failed to list workloads in {} for {}: {}", namespace, selector, e);
                metrics::record_workload_lookup_failure("error");
                return None;
            }
        };

        if workloads.len() > 1 {
            warn!(
                "{} workloads in {} match {}; using the most recently created",
                workloads.len(),
                namespace,
                selector
            );
        }

        let workload = newest(workloads);
        if let Some(workload) = &workload {
            debug!(
                "Resolved workload {:?} for {}",
                workload.metadata.name, selector
            );
        }
        workload
    }
}

/// Latest creationTimestamp wins; on a tie the earlier list entry is kept
fn newest(workloads: Vec<Workload>) -> Option<Workload> {
    workloads.into_iter().reduce(|best, candidate| {
        let created = |w: &Workload| w.metadata.creation_timestamp.as_ref().map(|t| t.0);
        if created(&candidate) > created(&best) {
            candidate
        } else {
            best
        }
    })
}
