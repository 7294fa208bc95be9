use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Annotation carrying the human-friendly job name shown by the dashboard
pub const DISPLAY_NAME_ANNOTATION: &str = "opendatahub.io/display-name";

/// Status condition shared by training jobs and Workloads
#[derive(Debug, Serialize, Deserialize, Clone, JsonSchema, PartialEq, Eq, Default)]
pub struct JobCondition {
    #[serde(rename = "type")]
    pub condition_type: String,

    /// "True", "False" or "Unknown"
    pub status: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// RFC 3339 timestamp; fixed-width, so string order is time order
    #[serde(rename = "lastTransitionTime", skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<String>,
}

impl JobCondition {
    pub fn is_true(&self) -> bool {
        self.status == "True"
    }

    pub fn transition_time(&self) -> &str {
        self.last_transition_time.as_deref().unwrap_or("")
    }

    /// Whether this condition is `False` with the given reason
    pub fn is_false_with_reason(&self, reason: &str) -> bool {
        self.status == "False" && self.reason.as_deref() == Some(reason)
    }
}
