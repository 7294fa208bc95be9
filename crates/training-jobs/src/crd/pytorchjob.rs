use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::common::JobCondition;

#[derive(CustomResource, Debug, Serialize, Deserialize, Clone, JsonSchema, Default)]
#[kube(
    group = "kubeflow.org",
    version = "v1",
    kind = "PyTorchJob",
    namespaced,
    status = "PyTorchJobStatus"
)]
pub struct PyTorchJobSpec {
    /// Scheduling and lifecycle policy, including the suspend flag
    #[serde(rename = "runPolicy", skip_serializing_if = "Option::is_none")]
    pub run_policy: Option<RunPolicy>,

    /// Replica groups keyed by role ("Master", "Worker")
    #[serde(rename = "pytorchReplicaSpecs", default)]
    pub pytorch_replica_specs: BTreeMap<String, ReplicaSpec>,
}

#[derive(Debug, Serialize, Deserialize, Clone, JsonSchema, Default)]
pub struct RunPolicy {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suspend: Option<bool>,

    #[serde(rename = "backoffLimit", skip_serializing_if = "Option::is_none")]
    pub backoff_limit: Option<i32>,

    #[serde(rename = "ttlSecondsAfterFinished", skip_serializing_if = "Option::is_none")]
    pub ttl_seconds_after_finished: Option<i32>,
}

#[derive(Debug, Serialize, Deserialize, Clone, JsonSchema, Default)]
pub struct ReplicaSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replicas: Option<i32>,

    #[serde(rename = "restartPolicy", skip_serializing_if = "Option::is_none")]
    pub restart_policy: Option<String>,

    /// Pod template, kept opaque
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<serde_json::Value>,
}

#[derive(Debug, Serialize, Deserialize, Clone, JsonSchema, Default)]
pub struct PyTorchJobStatus {
    #[serde(default)]
    pub conditions: Vec<JobCondition>,

    #[serde(rename = "replicaStatuses", default)]
    pub replica_statuses: BTreeMap<String, ReplicaStatus>,

    /// Reported by instrumented training images; may be a number or a string
    #[serde(rename = "completionPercentage", skip_serializing_if = "Option::is_none")]
    pub completion_percentage: Option<serde_json::Value>,

    #[serde(rename = "startTime", skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,

    #[serde(rename = "completionTime", skip_serializing_if = "Option::is_none")]
    pub completion_time: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, JsonSchema, Default)]
pub struct ReplicaStatus {
    #[serde(default)]
    pub active: i32,
    #[serde(default)]
    pub succeeded: i32,
    #[serde(default)]
    pub failed: i32,
}
