use tracing::warn;

use crate::{job::TrainingJob, Error};

use super::WorkloadResolver;

impl WorkloadResolver {
    /// ClusterQueue behind the job's local queue label
    ///
    /// `None` when the job carries no queue label or the LocalQueue cannot be read.
    pub async fn resolve_cluster_queue(&self, job: &TrainingJob) -> Option<String> {
        let local_queue = job.queue_name(self.labels())?;
        let namespace = job.namespace();

        match self.client().get_local_queue(&namespace, local_queue).await {
            Ok(queue) => Some(queue.spec.cluster_queue).filter(|q| !q.is_empty()),
            Err(Error::NotFound(_)) => {
                warn!("LocalQueue {}/{} does not exist", namespace, local_queue);
                None
            }
            Err(e) => {
                warn!(
                    "Failed to resolve cluster queue for LocalQueue {}/{}: {}",
                    namespace, local_queue, e
                );
                None
            }
        }
    }
}
