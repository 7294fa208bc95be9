use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::job::{JobResource, TrainingJob};

/// Progress updates older than this mean the trainer is no longer reporting
const ACTIVE_WINDOW_MINUTES: i64 = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressInfo {
    pub percent: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_step: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_steps: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_epoch: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_epochs: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_seconds_remaining: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_update_time: Option<String>,
    pub actively_training: bool,
}

/// Completion percentage in `[0, 100]`; anything unparseable counts as 0
pub fn completion_percentage(job: &dyn JobResource) -> f64 {
    match job.percentage() {
        Some(value) => parse_percentage(value),
        None if finished_successfully(job) => 100.0,
        None => 0.0,
    }
}

fn finished_successfully(job: &dyn JobResource) -> bool {
    job.conditions()
        .iter()
        .any(|c| c.is_true() && matches!(c.condition_type.as_str(), "Succeeded" | "Complete"))
}

fn parse_percentage(value: &Value) -> f64 {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_end_matches('%').trim().parse::<f64>().ok(),
        _ => None,
    };
    match parsed {
        Some(p) if p.is_finite() => p.clamp(0.0, 100.0),
        _ => 0.0,
    }
}

pub fn progress_info(job: &TrainingJob, now: DateTime<Utc>) -> ProgressInfo {
    let resource = job.resource();
    let progression = resource.progression();

    let last_update_time = progression.and_then(|p| p.last_update_time.clone());
    let recently_updated = last_update_time
        .as_deref()
        .and_then(|t| DateTime::parse_from_rfc3339(t).ok())
        .is_some_and(|t| now - t.with_timezone(&Utc) <= Duration::minutes(ACTIVE_WINDOW_MINUTES));

    ProgressInfo {
        percent: completion_percentage(resource),
        current_step: progression.and_then(|p| p.current_step),
        total_steps: progression.and_then(|p| p.total_steps),
        current_epoch: progression.and_then(|p| p.current_epoch),
        total_epochs: progression.and_then(|p| p.total_epochs),
        estimated_seconds_remaining: progression.and_then(|p| p.estimated_time_remaining),
        last_update_time,
        actively_training: recently_updated && !job.is_suspended(),
    }
}
