#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use training_jobs::{
    crd::{
        JobCondition, LocalQueue, LocalQueueSpec, PyTorchJob, PyTorchJobSpec, PyTorchJobStatus,
        RunPolicy, TrainJob, TrainJobSpec, TrainJobStatus, Workload, WorkloadSpec,
    },
    ClusterApi, Error, FieldPatch, JobKind, Result, TrainingJob,
};

pub const NAMESPACE: &str = "default";

#[derive(Default)]
struct State {
    jobs: Vec<TrainingJob>,
    workloads: Vec<Workload>,
    local_queues: Vec<LocalQueue>,
    /// Mirrors Kueue: deactivating a Workload suspends its job and vice versa
    kueue_syncs_suspend: bool,
    job_patches: Vec<FieldPatch>,
    workload_patches: Vec<FieldPatch>,
    fail_workload_lookups: bool,
}

/// In-memory cluster holding jobs, Workloads and LocalQueues
#[derive(Default)]
pub struct FakeCluster {
    state: Mutex<State>,
}

impl FakeCluster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_job(self, job: impl Into<TrainingJob>) -> Self {
        self.state.lock().unwrap().jobs.push(job.into());
        self
    }

    pub fn with_workload(self, workload: Workload) -> Self {
        self.state.lock().unwrap().workloads.push(workload);
        self
    }

    pub fn with_local_queue(self, name: &str, cluster_queue: &str) -> Self {
        let mut queue = LocalQueue::new(
            name,
            LocalQueueSpec {
                cluster_queue: cluster_queue.to_string(),
            },
        );
        queue.metadata.namespace = Some(NAMESPACE.to_string());
        self.state.lock().unwrap().local_queues.push(queue);
        self
    }

    pub fn kueue_syncs_suspend(self, enabled: bool) -> Self {
        self.state.lock().unwrap().kueue_syncs_suspend = enabled;
        self
    }

    pub fn failing_workload_lookups(self) -> Self {
        self.state.lock().unwrap().fail_workload_lookups = true;
        self
    }

    pub fn job(&self, kind: JobKind, name: &str) -> Option<TrainingJob> {
        self.state
            .lock()
            .unwrap()
            .jobs
            .iter()
            .find(|j| j.kind() == kind && j.name() == name)
            .cloned()
    }

    pub fn workload(&self, name: &str) -> Option<Workload> {
        self.state
            .lock()
            .unwrap()
            .workloads
            .iter()
            .find(|w| w.metadata.name.as_deref() == Some(name))
            .cloned()
    }

    pub fn job_patches(&self) -> Vec<FieldPatch> {
        self.state.lock().unwrap().job_patches.clone()
    }

    pub fn workload_patches(&self) -> Vec<FieldPatch> {
        self.state.lock().unwrap().workload_patches.clone()
    }
}

fn replace_field<T>(object: &T, patch: &FieldPatch) -> Result<T>
where
    T: Serialize + DeserializeOwned,
{
    let mut value = serde_json::to_value(object)?;
    let target = value
        .pointer_mut(&patch.path)
        .ok_or_else(|| Error::Kubernetes(format!("path {} does not exist", patch.path)))?;
    *target = patch.value.clone();
    Ok(serde_json::from_value(value)?)
}

fn patch_job_object(job: &TrainingJob, patch: &FieldPatch) -> Result<TrainingJob> {
    Ok(match job {
        TrainingJob::PyTorch(j) => replace_field(j, patch)?.into(),
        TrainingJob::Train(j) => replace_field(j, patch)?.into(),
        TrainingJob::Ray(j) => replace_field(j, patch)?.into(),
    })
}

fn matches_selector(workload: &Workload, selector: &str) -> bool {
    let Some((key, value)) = selector.split_once('=') else {
        return false;
    };
    workload
        .metadata
        .labels
        .as_ref()
        .and_then(|l| l.get(key))
        .is_some_and(|v| v == value)
}

#[async_trait]
impl ClusterApi for FakeCluster {
    async fn list_jobs(&self, kind: JobKind, namespace: &str) -> Result<Vec<TrainingJob>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .jobs
            .iter()
            .filter(|j| j.kind() == kind && j.namespace() == namespace)
            .cloned()
            .collect())
    }

    async fn get_job(&self, kind: JobKind, namespace: &str, name: &str) -> Result<TrainingJob> {
        self.state
            .lock()
            .unwrap()
            .jobs
            .iter()
            .find(|j| j.kind() == kind && j.namespace() == namespace && j.name() == name)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("{} {}/{}", kind, namespace, name)))
    }

    async fn patch_job(
        &self,
        kind: JobKind,
        namespace: &str,
        name: &str,
        patch: &FieldPatch,
    ) -> Result<TrainingJob> {
        let mut state = self.state.lock().unwrap();
        state.job_patches.push(patch.clone());
        let slot = state
            .jobs
            .iter_mut()
            .find(|j| j.kind() == kind && j.namespace() == namespace && j.name() == name)
            .ok_or_else(|| Error::NotFound(format!("{} {}/{}", kind, namespace, name)))?;
        *slot = patch_job_object(slot, patch)?;
        Ok(slot.clone())
    }

    async fn delete_job(&self, kind: JobKind, namespace: &str, name: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let before = state.jobs.len();
        state
            .jobs
            .retain(|j| !(j.kind() == kind && j.namespace() == namespace && j.name() == name));
        if state.jobs.len() == before {
            return Err(Error::NotFound(format!("{} {}/{}", kind, namespace, name)));
        }
        Ok(())
    }

    async fn list_workloads(&self, namespace: &str, label_selector: &str) -> Result<Vec<Workload>> {
        let state = self.state.lock().unwrap();
        if state.fail_workload_lookups {
            return Err(Error::Kubernetes("workloads.kueue.x-k8s.io is forbidden".to_string()));
        }
        Ok(state
            .workloads
            .iter()
            .filter(|w| w.metadata.namespace.as_deref() == Some(namespace))
            .filter(|w| matches_selector(w, label_selector))
            .cloned()
            .collect())
    }

    async fn patch_workload(
        &self,
        namespace: &str,
        name: &str,
        patch: &FieldPatch,
    ) -> Result<Workload> {
        let mut state = self.state.lock().unwrap();
        state.workload_patches.push(patch.clone());
        let slot = state
            .workloads
            .iter_mut()
            .find(|w| {
                w.metadata.namespace.as_deref() == Some(namespace)
                    && w.metadata.name.as_deref() == Some(name)
            })
            .ok_or_else(|| Error::NotFound(format!("Workload {}/{}", namespace, name)))?;
        *slot = replace_field(slot, patch)?;
        let workload = slot.clone();

        if state.kueue_syncs_suspend {
            let owner_uid = workload
                .metadata
                .labels
                .as_ref()
                .and_then(|l| l.get("kueue.x-k8s.io/job-uid"))
                .cloned();
            let suspend = !workload.is_active();
            if let Some(job) = state
                .jobs
                .iter_mut()
                .find(|j| j.uid().map(str::to_string) == owner_uid)
            {
                let sync = FieldPatch::suspend(job.kind(), suspend);
                *job = patch_job_object(job, &sync)?;
            }
        }

        Ok(workload)
    }

    async fn get_local_queue(&self, namespace: &str, name: &str) -> Result<LocalQueue> {
        self.state
            .lock()
            .unwrap()
            .local_queues
            .iter()
            .find(|q| {
                q.metadata.namespace.as_deref() == Some(namespace)
                    && q.metadata.name.as_deref() == Some(name)
            })
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("LocalQueue {}/{}", namespace, name)))
    }
}

pub fn condition(condition_type: &str, at: &str) -> JobCondition {
    JobCondition {
        condition_type: condition_type.to_string(),
        status: "True".to_string(),
        last_transition_time: Some(at.to_string()),
        ..Default::default()
    }
}

pub fn pytorch_job(name: &str, suspend: bool, conditions: Vec<JobCondition>) -> PyTorchJob {
    let mut job = PyTorchJob::new(name, PyTorchJobSpec::default());
    job.metadata.namespace = Some(NAMESPACE.to_string());
    job.metadata.uid = Some(format!("uid-{}", name));
    job.spec.run_policy = Some(RunPolicy {
        suspend: Some(suspend),
        ..Default::default()
    });
    job.status = Some(PyTorchJobStatus {
        conditions,
        ..Default::default()
    });
    job
}

pub fn train_job(name: &str, suspend: bool, conditions: Vec<JobCondition>) -> TrainJob {
    let mut job = TrainJob::new(name, TrainJobSpec::default());
    job.metadata.namespace = Some(NAMESPACE.to_string());
    job.metadata.uid = Some(format!("uid-{}", name));
    job.spec.suspend = Some(suspend);
    job.status = Some(TrainJobStatus {
        conditions,
        ..Default::default()
    });
    job
}

pub fn with_queue<K: kube::Resource>(mut job: K, queue: &str) -> K {
    job.meta_mut().labels = Some(BTreeMap::from([(
        "kueue.x-k8s.io/queue-name".to_string(),
        queue.to_string(),
    )]));
    job
}

/// Workload correlated to `job` through the job-uid and job-name labels
pub fn workload_for(job: &TrainingJob, active: bool) -> Workload {
    let mut workload = Workload::new(
        &format!("{}-{}", job.kind().as_str().to_lowercase(), job.name()),
        WorkloadSpec {
            active: Some(active),
            ..Default::default()
        },
    );
    workload.metadata.namespace = Some(NAMESPACE.to_string());
    workload.metadata.labels = Some(BTreeMap::from([
        (
            "kueue.x-k8s.io/job-uid".to_string(),
            job.uid().unwrap_or_default().to_string(),
        ),
        ("kueue.x-k8s.io/job-name".to_string(), job.name()),
    ]));
    workload
}
