use lazy_static::lazy_static;
use prometheus::{
    register_int_counter_vec_with_registry, Encoder, IntCounterVec, Registry, TextEncoder,
};

use crate::{Error, Result};

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();
    pub static ref HIBERNATION_REQUESTS_TOTAL: IntCounterVec =
        register_int_counter_vec_with_registry!(
            "trainingjobs_hibernation_requests_total",
            "Pause and resume requests by action and outcome.",
            &["action", "outcome"],
            REGISTRY
        )
        .unwrap();
    pub static ref FALLBACK_PATCHES_TOTAL: IntCounterVec =
        register_int_counter_vec_with_registry!(
            "trainingjobs_fallback_patches_total",
            "Direct job patches issued after a Workload change did not propagate.",
            &["kind"],
            REGISTRY
        )
        .unwrap();
    pub static ref WORKLOAD_LOOKUP_FAILURES_TOTAL: IntCounterVec =
        register_int_counter_vec_with_registry!(
            "trainingjobs_workload_lookup_failures_total",
            "Workload lookups that failed or timed out.",
            &["reason"],
            REGISTRY
        )
        .unwrap();
    pub static ref STATUS_REFRESHES_TOTAL: IntCounterVec =
        register_int_counter_vec_with_registry!(
            "trainingjobs_status_refreshes_total",
            "Full status cache refreshes by outcome.",
            &["outcome"],
            REGISTRY
        )
        .unwrap();
}

/// Forces registration so every series is exported before its first increment
pub fn register_metrics() {
    lazy_static::initialize(&HIBERNATION_REQUESTS_TOTAL);
    lazy_static::initialize(&FALLBACK_PATCHES_TOTAL);
    lazy_static::initialize(&WORKLOAD_LOOKUP_FAILURES_TOTAL);
    lazy_static::initialize(&STATUS_REFRESHES_TOTAL);
}

pub fn record_hibernation(action: &str, outcome: &str) {
    HIBERNATION_REQUESTS_TOTAL
        .with_label_values(&[action, outcome])
        .inc();
}

pub fn record_fallback_patch(kind: &str) {
    FALLBACK_PATCHES_TOTAL.with_label_values(&[kind]).inc();
}

pub fn record_workload_lookup_failure(reason: &str) {
    WORKLOAD_LOOKUP_FAILURES_TOTAL
        .with_label_values(&[reason])
        .inc();
}

pub fn record_refresh(outcome: &str) {
    STATUS_REFRESHES_TOTAL.with_label_values(&[outcome]).inc();
}

pub fn gather_metrics() -> Result<String> {
    let mut buffer = vec![];
    let encoder = TextEncoder::new();
    encoder
        .encode(&REGISTRY.gather(), &mut buffer)
        .map_err(|e| Error::Internal(format!("Failed to encode metrics: {}", e)))?;
    String::from_utf8(buffer).map_err(|e| Error::Internal(format!("Metrics are not UTF-8: {}", e)))
}
