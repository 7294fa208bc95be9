use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::common::JobCondition;

#[derive(CustomResource, Debug, Serialize, Deserialize, Clone, JsonSchema, Default)]
#[kube(
    group = "trainer.kubeflow.org",
    version = "v1alpha1",
    kind = "TrainJob",
    namespaced,
    status = "TrainJobStatus"
)]
pub struct TrainJobSpec {
    /// Reference to the TrainingRuntime, kept opaque
    #[serde(rename = "runtimeRef", skip_serializing_if = "Option::is_none")]
    pub runtime_ref: Option<serde_json::Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub trainer: Option<TrainerSpec>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub suspend: Option<bool>,

    #[serde(rename = "managedBy", skip_serializing_if = "Option::is_none")]
    pub managed_by: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, JsonSchema, Default)]
pub struct TrainerSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    #[serde(rename = "numNodes", skip_serializing_if = "Option::is_none")]
    pub num_nodes: Option<i32>,

    /// Either an integer or a keyword such as "auto"
    #[serde(rename = "numProcPerNode", skip_serializing_if = "Option::is_none")]
    pub num_proc_per_node: Option<serde_json::Value>,
}

#[derive(Debug, Serialize, Deserialize, Clone, JsonSchema, Default)]
pub struct TrainJobStatus {
    #[serde(default)]
    pub conditions: Vec<JobCondition>,

    /// Per replicated-job counters of the underlying JobSet
    #[serde(rename = "jobsStatus", default)]
    pub jobs_status: Vec<JobsStatus>,

    #[serde(rename = "progressionStatus", skip_serializing_if = "Option::is_none")]
    pub progression_status: Option<ProgressionStatus>,

    /// Older progress field emitted by some trainer images
    #[serde(rename = "trainingProgress", skip_serializing_if = "Option::is_none")]
    pub training_progress: Option<TrainingProgress>,
}

#[derive(Debug, Serialize, Deserialize, Clone, JsonSchema, Default)]
pub struct JobsStatus {
    pub name: String,
    #[serde(default)]
    pub ready: i32,
    #[serde(default)]
    pub succeeded: i32,
    #[serde(default)]
    pub failed: i32,
    #[serde(default)]
    pub active: i32,
    #[serde(default)]
    pub suspended: i32,
}

#[derive(Debug, Serialize, Deserialize, Clone, JsonSchema, Default)]
pub struct ProgressionStatus {
    #[serde(rename = "currentStep", skip_serializing_if = "Option::is_none")]
    pub current_step: Option<i64>,

    #[serde(rename = "totalSteps", skip_serializing_if = "Option::is_none")]
    pub total_steps: Option<i64>,

    /// Usually a decimal string such as "42.5"
    #[serde(rename = "percentageComplete", skip_serializing_if = "Option::is_none")]
    pub percentage_complete: Option<serde_json::Value>,

    /// Seconds
    #[serde(rename = "estimatedTimeRemaining", skip_serializing_if = "Option::is_none")]
    pub estimated_time_remaining: Option<i64>,

    #[serde(rename = "currentEpoch", skip_serializing_if = "Option::is_none")]
    pub current_epoch: Option<i64>,

    #[serde(rename = "totalEpochs", skip_serializing_if = "Option::is_none")]
    pub total_epochs: Option<i64>,

    #[serde(rename = "lastUpdateTime", skip_serializing_if = "Option::is_none")]
    pub last_update_time: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, JsonSchema, Default)]
pub struct TrainingProgress {
    #[serde(rename = "percentComplete", skip_serializing_if = "Option::is_none")]
    pub percent_complete: Option<serde_json::Value>,
}
