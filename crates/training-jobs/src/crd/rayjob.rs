use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(CustomResource, Debug, Serialize, Deserialize, Clone, JsonSchema, Default)]
#[kube(
    group = "ray.io",
    version = "v1",
    kind = "RayJob",
    namespaced,
    status = "RayJobStatus"
)]
pub struct RayJobSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entrypoint: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub suspend: Option<bool>,

    #[serde(rename = "rayClusterSpec", skip_serializing_if = "Option::is_none")]
    pub ray_cluster_spec: Option<RayClusterSpec>,
}

#[derive(Debug, Serialize, Deserialize, Clone, JsonSchema, Default)]
pub struct RayClusterSpec {
    #[serde(rename = "rayVersion", skip_serializing_if = "Option::is_none")]
    pub ray_version: Option<String>,

    #[serde(rename = "headGroupSpec", skip_serializing_if = "Option::is_none")]
    pub head_group_spec: Option<HeadGroupSpec>,

    #[serde(rename = "workerGroupSpecs", default)]
    pub worker_group_specs: Vec<WorkerGroupSpec>,
}

#[derive(Debug, Serialize, Deserialize, Clone, JsonSchema, Default)]
pub struct HeadGroupSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replicas: Option<i32>,
}

#[derive(Debug, Serialize, Deserialize, Clone, JsonSchema, Default)]
pub struct WorkerGroupSpec {
    #[serde(rename = "groupName", skip_serializing_if = "Option::is_none")]
    pub group_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub replicas: Option<i32>,

    #[serde(rename = "minReplicas", skip_serializing_if = "Option::is_none")]
    pub min_replicas: Option<i32>,

    #[serde(rename = "maxReplicas", skip_serializing_if = "Option::is_none")]
    pub max_replicas: Option<i32>,
}

/// KubeRay reports lifecycle as two phase strings rather than conditions
#[derive(Debug, Serialize, Deserialize, Clone, JsonSchema, Default)]
pub struct RayJobStatus {
    /// PENDING, RUNNING, STOPPED, SUCCEEDED or FAILED
    #[serde(rename = "jobStatus", skip_serializing_if = "Option::is_none")]
    pub job_status: Option<String>,

    /// Initializing, Running, Complete, Failed, Suspending, Suspended, Retrying, Waiting
    #[serde(rename = "jobDeploymentStatus", skip_serializing_if = "Option::is_none")]
    pub job_deployment_status: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(rename = "startTime", skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,

    #[serde(rename = "endTime", skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
}
