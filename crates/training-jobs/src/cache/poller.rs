use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    job::{JobKey, JobKind, TrainingJob},
    kubernetes::ClusterApi,
    metrics,
    status::{JobState, StatusDeriver},
    Error, Result,
};

use super::StatusCache;

/// Keeps a `StatusCache` current while any job can still change state
#[derive(Clone)]
pub struct StatusPoller {
    deriver: StatusDeriver,
    client: Arc<dyn ClusterApi>,
    cache: StatusCache,
    namespace: String,
    kinds: Vec<JobKind>,
    interval: Duration,
    wake: Arc<Notify>,
}

impl StatusPoller {
    pub fn new(
        deriver: StatusDeriver,
        cache: StatusCache,
        namespace: impl Into<String>,
        kinds: Vec<JobKind>,
        interval: Duration,
    ) -> Self {
        Self {
            client: Arc::clone(deriver.resolver().client()),
            deriver,
            cache,
            namespace: namespace.into(),
            kinds,
            interval,
            wake: Arc::new(Notify::new()),
        }
    }

    pub fn cache(&self) -> &StatusCache {
        &self.cache
    }

    pub fn deriver(&self) -> &StatusDeriver {
        &self.deriver
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn kinds(&self) -> &[JobKind] {
        &self.kinds
    }

    /// Derives every job concurrently and swaps the result into the cache
    pub async fn sync(&self, jobs: &[TrainingJob]) -> HashMap<JobKey, JobState> {
        let states = join_all(jobs.iter().map(|job| async move {
            (job.key(), self.deriver.derive(job).await)
        }))
        .await;

        let states: HashMap<_, _> = states.into_iter().collect();
        self.cache.replace(states.clone());
        debug!("Cached status for {} jobs", states.len());
        self.wake.notify_one();
        states
    }

    /// Lists all configured kinds; a kind whose CRD is not installed lists as empty
    pub async fn list_jobs(&self) -> Result<Vec<TrainingJob>> {
        let mut jobs = Vec::new();
        for kind in &self.kinds {
            match self.client.list_jobs(*kind, &self.namespace).await {
                Ok(found) => jobs.extend(found),
                Err(Error::NotFound(_)) => {
                    debug!("{} is not served by this cluster", kind);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(jobs)
    }

    pub async fn refresh(&self) -> Result<usize> {
        let jobs = match self.list_jobs().await {
            Ok(jobs) => jobs,
            Err(e) => {
                metrics::record_refresh("failure");
                return Err(e);
            }
        };
        self.sync(&jobs).await;
        metrics::record_refresh("success");
        Ok(jobs.len())
    }

    /// Polls on the interval while the cache holds non-terminal jobs or the
    /// last refresh failed, idles otherwise
    pub async fn run(&self, cancel: CancellationToken) {
        info!(
            "Status poller started for {} every {:?}",
            self.namespace, self.interval
        );

        let mut healthy = match self.refresh().await {
            Ok(_) => true,
            Err(e) => {
                warn!("Initial status refresh failed: {}", e);
                false
            }
        };

        loop {
            if !healthy || self.cache.needs_polling() {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(self.interval) => {}
                }
                healthy = match self.refresh().await {
                    Ok(_) => true,
                    Err(e) => {
                        warn!("Status refresh failed: {}", e);
                        false
                    }
                };
            } else {
                debug!("All cached jobs are terminal; poller idle");
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = self.wake.notified() => {}
                }
            }
        }

        info!("Status poller stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::{JobCondition, PyTorchJob, PyTorchJobSpec, PyTorchJobStatus};
    use crate::kubernetes::MockClusterApi;
    use crate::queue::{QueueLabels, WorkloadResolver};
    use mockall::predicate::eq;
    use tokio_test::{assert_err, assert_ok};

    fn job(name: &str, condition: &str) -> TrainingJob {
        let mut job = PyTorchJob::new(name, PyTorchJobSpec::default());
        job.metadata.namespace = Some("default".to_string());
        job.metadata.uid = Some(format!("uid-{}", name));
        job.status = Some(PyTorchJobStatus {
            conditions: vec![JobCondition {
                condition_type: condition.to_string(),
                status: "True".to_string(),
                last_transition_time: Some("2024-01-01T00:00:00Z".to_string()),
                ..Default::default()
            }],
            ..Default::default()
        });
        job.into()
    }

    fn poller(mock: MockClusterApi, kinds: Vec<JobKind>) -> StatusPoller {
        let resolver = WorkloadResolver::new(Arc::new(mock), QueueLabels::default());
        let deriver = StatusDeriver::new(resolver, Duration::from_millis(50));
        StatusPoller::new(
            deriver,
            StatusCache::new(),
            "default",
            kinds,
            Duration::from_millis(10),
        )
    }

    #[tokio::test]
    async fn sync_replaces_the_whole_map() {
        let mut mock = MockClusterApi::new();
        mock.expect_list_workloads().returning(|_, _| Ok(vec![]));
        let poller = poller(mock, vec![JobKind::PyTorchJob]);

        poller.sync(&[job("a", "Running"), job("b", "Succeeded")]).await;
        assert_eq!(poller.cache().len(), 2);
        assert!(poller.cache().needs_polling());

        poller.sync(&[job("b", "Succeeded")]).await;
        assert_eq!(poller.cache().len(), 1);
        assert_eq!(poller.cache().get(&job("b", "Succeeded").key()), Some(JobState::Succeeded));
        assert!(!poller.cache().needs_polling());
    }

    #[tokio::test]
    async fn missing_kind_lists_as_empty() {
        let mut mock = MockClusterApi::new();
        mock.expect_list_jobs()
            .with(eq(JobKind::PyTorchJob), eq("default"))
            .returning(|_, _| Ok(vec![job("a", "Failed")]));
        mock.expect_list_jobs()
            .with(eq(JobKind::RayJob), eq("default"))
            .returning(|kind, _| Err(Error::NotFound(format!("{}", kind))));

        let poller = poller(mock, vec![JobKind::PyTorchJob, JobKind::RayJob]);
        assert_eq!(assert_ok!(poller.refresh().await), 1);
        assert_eq!(poller.cache().get(&job("a", "Failed").key()), Some(JobState::Failed));
    }

    #[tokio::test]
    async fn list_failures_propagate() {
        let mut mock = MockClusterApi::new();
        mock.expect_list_jobs()
            .returning(|_, _| Err(Error::Kubernetes("connection refused".to_string())));

        let poller = poller(mock, vec![JobKind::TrainJob]);
        assert_err!(poller.refresh().await);
    }

    #[tokio::test]
    async fn run_stops_on_cancel() {
        let mut mock = MockClusterApi::new();
        mock.expect_list_jobs().returning(|_, _| Ok(vec![job("a", "Running")]));
        mock.expect_list_workloads().returning(|_, _| Ok(vec![]));

        let poller = poller(mock, vec![JobKind::PyTorchJob]);
        let cancel = CancellationToken::new();
        let handle = tokio::spawn({
            let poller = poller.clone();
            let cancel = cancel.clone();
            async move { poller.run(cancel).await }
        });

        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(poller.cache().get(&job("a", "Running").key()), Some(JobState::Running));

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("poller did not stop")
            .unwrap();
    }

    #[tokio::test]
    async fn run_retries_after_failed_first_refresh() {
        let mut mock = MockClusterApi::new();
        let mut seq = mockall::Sequence::new();
        mock.expect_list_jobs()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Err(Error::Kubernetes("connection refused".to_string())));
        mock.expect_list_jobs()
            .returning(|_, _| Ok(vec![job("a", "Running")]));
        mock.expect_list_workloads().returning(|_, _| Ok(vec![]));

        let poller = poller(mock, vec![JobKind::PyTorchJob]);
        let cancel = CancellationToken::new();
        let handle = tokio::spawn({
            let poller = poller.clone();
            let cancel = cancel.clone();
            async move { poller.run(cancel).await }
        });

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(poller.cache().get(&job("a", "Running").key()), Some(JobState::Running));

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("poller did not stop")
            .unwrap();
    }
}
