use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::{
    cache::StatusCache,
    crd::Workload,
    job::{JobKind, TrainingJob},
    kubernetes::{ClusterApi, FieldPatch},
    metrics,
    queue::WorkloadResolver,
    status::JobState,
    Error, Result,
};

use super::{HibernationAction, HibernationResult, InFlightRegistry};

struct Applied {
    job: TrainingJob,
    workload: Option<Workload>,
    fallback_patched: bool,
}

#[derive(Clone)]
pub struct HibernationReconciler {
    client: Arc<dyn ClusterApi>,
    resolver: WorkloadResolver,
    settle_timeout: Duration,
    poll_interval: Duration,
    in_flight: InFlightRegistry,
    cache: Option<StatusCache>,
}

impl HibernationReconciler {
    pub fn new(resolver: WorkloadResolver, settle_timeout: Duration, poll_interval: Duration) -> Self {
        Self {
            client: Arc::clone(resolver.client()),
            resolver,
            settle_timeout,
            poll_interval,
            in_flight: InFlightRegistry::new(),
            cache: None,
        }
    }

    /// Successful changes write their optimistic state into `cache`
    pub fn with_cache(mut self, cache: StatusCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn in_flight(&self) -> &InFlightRegistry {
        &self.in_flight
    }

    pub async fn pause(&self, job: &TrainingJob, cancel: &CancellationToken) -> HibernationResult {
        self.run(job, HibernationAction::Pause, cancel).await
    }

    pub async fn resume(&self, job: &TrainingJob, cancel: &CancellationToken) -> HibernationResult {
        self.run(job, HibernationAction::Resume, cancel).await
    }

    /// Flips the job's own suspend flag, not its derived state
    pub async fn toggle(&self, job: &TrainingJob, cancel: &CancellationToken) -> HibernationResult {
        let action = HibernationAction::toggle_from(job.is_suspended());
        self.run(job, action, cancel).await
    }

    pub async fn run(
        &self,
        job: &TrainingJob,
        action: HibernationAction,
        cancel: &CancellationToken,
    ) -> HibernationResult {
        let key = job.key();
        let Some(_guard) = self.in_flight.try_acquire(key.clone()) else {
            warn!(
                "Rejected {} of {} {}: another change is in flight",
                action,
                job.kind(),
                job.name()
            );
            metrics::record_hibernation(action.verb(), "conflict");
            return HibernationResult::failure(
                action,
                &Error::Conflict("hibernation change already in progress".to_string()),
            );
        };

        match self.apply(job, action, cancel).await {
            Ok(applied) => {
                let state = match action {
                    HibernationAction::Pause => job.kind().hibernated_state(),
                    HibernationAction::Resume => JobState::Resumed,
                };
                if let Some(cache) = &self.cache {
                    cache.update(key, state);
                }
                metrics::record_hibernation(action.verb(), "success");
                info!(
                    "{} {} {}/{} ({})",
                    action,
                    job.kind(),
                    job.namespace(),
                    job.name(),
                    state
                );
                HibernationResult::success(
                    action,
                    state,
                    applied.job,
                    applied.workload,
                    applied.fallback_patched,
                )
            }
            Err(e) => {
                error!(
                    "Failed to {} {} {}/{}: {}",
                    action,
                    job.kind(),
                    job.namespace(),
                    job.name(),
                    e
                );
                metrics::record_hibernation(action.verb(), "failure");
                HibernationResult::failure(action, &e)
            }
        }
    }

    async fn apply(
        &self,
        job: &TrainingJob,
        action: HibernationAction,
        cancel: &CancellationToken,
    ) -> Result<Applied> {
        let suspend = action.suspends();
        let kind = job.kind();
        let namespace = job.namespace();
        let name = job.name();
        let suspend_patch = job.resource().suspend_patch(suspend);

        let Some(workload) = self.resolver.find_workload(job).await else {
            let patched = self
                .client
                .patch_job(kind, &namespace, &name, &suspend_patch)
                .await?;
            return Ok(Applied {
                job: patched,
                workload: None,
                fallback_patched: false,
            });
        };

        let workload_name = workload
            .metadata
            .name
            .clone()
            .ok_or_else(|| Error::Internal("Workload has no name".to_string()))?;
        let workload_namespace = workload
            .metadata
            .namespace
            .clone()
            .unwrap_or_else(|| namespace.clone());

        let workload = self
            .client
            .patch_workload(
                &workload_namespace,
                &workload_name,
                &FieldPatch::workload_active(!suspend),
            )
            .await?;

        if let Some(converged) = self
            .await_convergence(kind, &namespace, &name, suspend, cancel)
            .await?
        {
            return Ok(Applied {
                job: converged,
                workload: Some(workload),
                fallback_patched: false,
            });
        }

        warn!(
            "{} {}/{} suspend flag did not follow Workload {} within {:?}; patching the job directly",
            kind, namespace, name, workload_name, self.settle_timeout
        );
        metrics::record_fallback_patch(kind.as_str());

        let patched = self
            .client
            .patch_job(kind, &namespace, &name, &suspend_patch)
            .await?;
        if patched.is_suspended() != suspend {
            return Err(Error::Convergence(format!(
                "{} {}/{} suspend flag is still {} after direct patch",
                kind,
                namespace,
                name,
                !suspend
            )));
        }

        Ok(Applied {
            job: patched,
            workload: Some(workload),
            fallback_patched: true,
        })
    }

    /// Re-reads the job until its suspend flag equals `suspend` or the settle deadline passes
    async fn await_convergence(
        &self,
        kind: JobKind,
        namespace: &str,
        name: &str,
        suspend: bool,
        cancel: &CancellationToken,
    ) -> Result<Option<TrainingJob>> {
        let deadline = Instant::now() + self.settle_timeout;

        loop {
            let wait = self
                .poll_interval
                .min(deadline.saturating_duration_since(Instant::now()));

            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return Err(Error::Cancelled(format!(
                        "stopped waiting for {} {}/{} to settle",
                        kind, namespace, name
                    )));
                }
                _ = tokio::time::sleep(wait) => {}
            }

            let current = self.client.get_job(kind, namespace, name).await?;
            if current.is_suspended() == suspend {
                return Ok(Some(current));
            }

            if Instant::now() >= deadline {
                if cancel.is_cancelled() {
                    return Err(Error::Cancelled(format!(
                        "stopped waiting for {} {}/{} to settle",
                        kind, namespace, name
                    )));
                }
                return Ok(None);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::{PyTorchJob, PyTorchJobSpec, RunPolicy, TrainJob, TrainJobSpec, WorkloadSpec};
    use crate::kubernetes::MockClusterApi;
    use crate::queue::QueueLabels;
    use mockall::predicate::{always, eq};

    fn pytorch(suspend: bool) -> TrainingJob {
        let mut job = PyTorchJob::new("mnist", PyTorchJobSpec::default());
        job.metadata.namespace = Some("default".to_string());
        job.metadata.uid = Some("uid-1".to_string());
        job.spec.run_policy = Some(RunPolicy {
            suspend: Some(suspend),
            ..Default::default()
        });
        job.into()
    }

    fn workload(active: bool) -> Workload {
        let mut workload = Workload::new(
            "pytorchjob-mnist-1a2b",
            WorkloadSpec {
                active: Some(active),
                ..Default::default()
            },
        );
        workload.metadata.namespace = Some("default".to_string());
        workload
    }

    fn reconciler(mock: MockClusterApi) -> HibernationReconciler {
        let resolver = WorkloadResolver::new(Arc::new(mock), QueueLabels::default());
        HibernationReconciler::new(resolver, Duration::from_millis(30), Duration::from_millis(5))
    }

    fn expect_workload(mock: &mut MockClusterApi, found: Option<Workload>) {
        mock.expect_list_workloads()
            .returning(move |_, _| Ok(found.clone().into_iter().collect()));
    }

    #[tokio::test]
    async fn unmanaged_job_is_patched_directly() {
        let mut mock = MockClusterApi::new();
        expect_workload(&mut mock, None);
        mock.expect_patch_workload().times(0);
        mock.expect_get_job().times(0);
        mock.expect_patch_job()
            .with(
                eq(JobKind::PyTorchJob),
                eq("default"),
                eq("mnist"),
                eq(FieldPatch::replace("/spec/runPolicy/suspend", true)),
            )
            .times(1)
            .returning(|_, _, _, _| Ok(pytorch(true)));

        let result = reconciler(mock)
            .pause(&pytorch(false), &CancellationToken::new())
            .await;

        assert!(result.success, "{:?}", result.error);
        assert_eq!(result.state, Some(JobState::Paused));
        assert!(result.workload.is_none());
        assert!(!result.fallback_patched);
    }

    #[tokio::test]
    async fn converged_job_needs_no_fallback() {
        let mut mock = MockClusterApi::new();
        expect_workload(&mut mock, Some(workload(true)));
        mock.expect_patch_workload()
            .with(
                eq("default"),
                eq("pytorchjob-mnist-1a2b"),
                eq(FieldPatch::workload_active(false)),
            )
            .times(1)
            .returning(|_, _, _| Ok(workload(false)));
        mock.expect_get_job().returning(|_, _, _| Ok(pytorch(true)));
        mock.expect_patch_job().times(0);

        let result = reconciler(mock)
            .pause(&pytorch(false), &CancellationToken::new())
            .await;

        assert!(result.success);
        assert!(!result.fallback_patched);
        assert_eq!(result.workload.map(|w| w.is_active()), Some(false));
    }

    #[tokio::test]
    async fn unconverged_job_gets_direct_patch() {
        let mut mock = MockClusterApi::new();
        expect_workload(&mut mock, Some(workload(true)));
        mock.expect_patch_workload()
            .times(1)
            .returning(|_, _, _| Ok(workload(false)));
        mock.expect_get_job()
            .times(1..)
            .returning(|_, _, _| Ok(pytorch(false)));
        mock.expect_patch_job()
            .with(always(), always(), always(), eq(FieldPatch::suspend(JobKind::PyTorchJob, true)))
            .times(1)
            .returning(|_, _, _, _| Ok(pytorch(true)));

        let result = reconciler(mock)
            .pause(&pytorch(false), &CancellationToken::new())
            .await;

        assert!(result.success, "{:?}", result.error);
        assert!(result.fallback_patched);
        assert!(result.job.unwrap().is_suspended());
    }

    #[tokio::test]
    async fn fallback_that_does_not_stick_is_a_failure() {
        let mut mock = MockClusterApi::new();
        expect_workload(&mut mock, Some(workload(true)));
        mock.expect_patch_workload()
            .returning(|_, _, _| Ok(workload(false)));
        mock.expect_get_job().returning(|_, _, _| Ok(pytorch(false)));
        mock.expect_patch_job()
            .times(1)
            .returning(|_, _, _, _| Ok(pytorch(false)));

        let result = reconciler(mock)
            .pause(&pytorch(false), &CancellationToken::new())
            .await;

        assert!(!result.success);
        let message = result.error.unwrap();
        assert!(message.starts_with("Failed to pause job: Convergence error:"), "{}", message);
    }

    #[tokio::test]
    async fn cancellation_skips_fallback_patch() {
        let mut mock = MockClusterApi::new();
        expect_workload(&mut mock, Some(workload(true)));
        mock.expect_patch_workload()
            .times(1)
            .returning(|_, _, _| Ok(workload(false)));
        mock.expect_get_job().times(0);
        mock.expect_patch_job().times(0);

        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = reconciler(mock).pause(&pytorch(false), &cancel).await;

        assert!(!result.success);
        assert!(result.error.unwrap().contains("Cancelled"));
    }

    #[tokio::test]
    async fn workload_patch_failure_aborts() {
        let mut mock = MockClusterApi::new();
        expect_workload(&mut mock, Some(workload(false)));
        mock.expect_patch_workload()
            .returning(|_, _, _| Err(Error::Kubernetes("admission webhook denied".to_string())));
        mock.expect_get_job().times(0);
        mock.expect_patch_job().times(0);

        let result = reconciler(mock)
            .resume(&pytorch(true), &CancellationToken::new())
            .await;

        assert!(!result.success);
        assert_eq!(
            result.error.as_deref(),
            Some("Failed to resume job: Kubernetes error: admission webhook denied")
        );
    }

    #[tokio::test]
    async fn concurrent_change_is_rejected() {
        let mut mock = MockClusterApi::new();
        mock.expect_list_workloads().times(0);
        mock.expect_patch_job().times(0);

        let reconciler = reconciler(mock);
        let job = pytorch(false);
        let _held = reconciler.in_flight().try_acquire(job.key()).unwrap();

        let result = reconciler.toggle(&job, &CancellationToken::new()).await;

        assert!(!result.success);
        assert!(result.conflict);
        assert_eq!(
            result.error.as_deref(),
            Some("Failed to pause job: Conflict: hibernation change already in progress")
        );
    }

    #[tokio::test]
    async fn toggle_resumes_suspended_job_and_updates_cache() {
        let mut suspended = TrainJob::new("llama", TrainJobSpec::default());
        suspended.metadata.namespace = Some("default".to_string());
        suspended.metadata.uid = Some("uid-9".to_string());
        suspended.spec.suspend = Some(true);
        let suspended: TrainingJob = suspended.into();

        let mut running = suspended.clone();
        if let TrainingJob::Train(job) = &mut running {
            job.spec.suspend = Some(false);
        }

        let mut mock = MockClusterApi::new();
        expect_workload(&mut mock, None);
        mock.expect_patch_job()
            .with(
                eq(JobKind::TrainJob),
                eq("default"),
                eq("llama"),
                eq(FieldPatch::replace("/spec/suspend", false)),
            )
            .times(1)
            .returning(move |_, _, _, _| Ok(running.clone()));

        let cache = StatusCache::new();
        cache.update(suspended.key(), JobState::Suspended);
        let reconciler = reconciler(mock).with_cache(cache.clone());

        let result = reconciler.toggle(&suspended, &CancellationToken::new()).await;

        assert!(result.success);
        assert_eq!(result.action, HibernationAction::Resume);
        assert_eq!(cache.get(&suspended.key()), Some(JobState::Resumed));
        assert!(!reconciler.in_flight().contains(&suspended.key()));
    }
}
