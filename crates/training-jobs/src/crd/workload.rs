use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::common::JobCondition;

pub const QUOTA_RESERVED: &str = "QuotaReserved";
pub const PODS_READY: &str = "PodsReady";

/// Kueue's admission record for one job
#[derive(CustomResource, Debug, Serialize, Deserialize, Clone, JsonSchema, Default)]
#[kube(
    group = "kueue.x-k8s.io",
    version = "v1beta1",
    kind = "Workload",
    namespaced,
    status = "WorkloadStatus"
)]
pub struct WorkloadSpec {
    /// Queue-level pause flag; Kueue treats an absent value as `true`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,

    #[serde(rename = "queueName", skip_serializing_if = "Option::is_none")]
    pub queue_name: Option<String>,

    #[serde(rename = "priorityClassName", skip_serializing_if = "Option::is_none")]
    pub priority_class_name: Option<String>,

    /// Pod sets requested by the job, kept opaque
    #[serde(rename = "podSets", default)]
    pub pod_sets: Vec<serde_json::Value>,
}

#[derive(Debug, Serialize, Deserialize, Clone, JsonSchema, Default)]
pub struct WorkloadStatus {
    #[serde(default)]
    pub conditions: Vec<JobCondition>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub admission: Option<serde_json::Value>,
}

impl Workload {
    pub fn is_active(&self) -> bool {
        self.spec.active.unwrap_or(true)
    }

    pub fn condition(&self, condition_type: &str) -> Option<&JobCondition> {
        self.status
            .as_ref()
            .and_then(|s| s.conditions.iter().find(|c| c.condition_type == condition_type))
    }

    /// Waiting for quota and for pods to start: the job is admitted to a queue but not running
    pub fn is_waiting_for_admission(&self) -> bool {
        let waiting_for_quota = self
            .condition(QUOTA_RESERVED)
            .is_some_and(|c| c.is_false_with_reason("Pending"));
        let waiting_for_pods = self
            .condition(PODS_READY)
            .is_some_and(|c| c.is_false_with_reason("WaitForStart"));
        waiting_for_quota && waiting_for_pods
    }
}

#[derive(CustomResource, Debug, Serialize, Deserialize, Clone, JsonSchema, Default)]
#[kube(
    group = "kueue.x-k8s.io",
    version = "v1beta1",
    kind = "LocalQueue",
    namespaced
)]
pub struct LocalQueueSpec {
    #[serde(rename = "clusterQueue")]
    pub cluster_queue: String,
}
