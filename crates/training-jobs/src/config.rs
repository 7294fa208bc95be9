use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{job::JobKind, queue::DEFAULT_LABEL_PREFIX, Error, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub kube: KubeConfig,
    pub queue: QueueConfig,
    pub hibernation: HibernationConfig,
    pub status: StatusConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub addr: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KubeConfig {
    pub namespace: String,
    pub job_kinds: Vec<JobKind>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    pub label_prefix: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HibernationConfig {
    pub settle_timeout_ms: u64,
    pub poll_interval_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusConfig {
    pub refresh_interval_secs: u64,
    pub workload_lookup_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                addr: "0.0.0.0:8080".to_string(),
            },
            kube: KubeConfig {
                namespace: "default".to_string(),
                job_kinds: JobKind::ALL.to_vec(),
            },
            queue: QueueConfig {
                label_prefix: DEFAULT_LABEL_PREFIX.to_string(),
            },
            hibernation: HibernationConfig {
                settle_timeout_ms: 2000,
                poll_interval_ms: 250,
            },
            status: StatusConfig {
                refresh_interval_secs: 10,
                workload_lookup_timeout_ms: 5000,
            },
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        // Load environment variables from .env file if it exists
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any variable source, falling back to defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();

        let job_kinds = match lookup("TRAINING_JOB_KINDS") {
            Some(kinds) => kinds
                .split(',')
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .map(JobKind::from_str)
                .collect::<Result<Vec<_>>>()
                .map_err(|e| {
                    Error::Config(format!("Invalid TRAINING_JOB_KINDS={:?}: {}", kinds, e))
                })?,
            None => defaults.kube.job_kinds,
        };

        let config = Config {
            server: ServerConfig {
                addr: lookup("SERVER_ADDR").unwrap_or(defaults.server.addr),
            },
            kube: KubeConfig {
                namespace: lookup("KUBE_NAMESPACE").unwrap_or(defaults.kube.namespace),
                job_kinds,
            },
            queue: QueueConfig {
                label_prefix: lookup("QUEUE_LABEL_PREFIX").unwrap_or(defaults.queue.label_prefix),
            },
            hibernation: HibernationConfig {
                settle_timeout_ms: parse_var(
                    &lookup,
                    "HIBERNATION_SETTLE_TIMEOUT_MS",
                    defaults.hibernation.settle_timeout_ms,
                )?,
                poll_interval_ms: parse_var(
                    &lookup,
                    "HIBERNATION_POLL_INTERVAL_MS",
                    defaults.hibernation.poll_interval_ms,
                )?,
            },
            status: StatusConfig {
                refresh_interval_secs: parse_var(
                    &lookup,
                    "STATUS_REFRESH_INTERVAL_SECS",
                    defaults.status.refresh_interval_secs,
                )?,
                workload_lookup_timeout_ms: parse_var(
                    &lookup,
                    "WORKLOAD_LOOKUP_TIMEOUT_MS",
                    defaults.status.workload_lookup_timeout_ms,
                )?,
            },
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.kube.job_kinds.is_empty() {
            return Err(Error::Config("TRAINING_JOB_KINDS names no job kinds".to_string()));
        }
        if self.queue.label_prefix.is_empty() {
            return Err(Error::Config("QUEUE_LABEL_PREFIX must not be empty".to_string()));
        }
        if self.hibernation.poll_interval_ms == 0 {
            return Err(Error::Config("HIBERNATION_POLL_INTERVAL_MS must be greater than 0".to_string()));
        }
        if self.hibernation.poll_interval_ms > self.hibernation.settle_timeout_ms {
            return Err(Error::Config(format!(
                "HIBERNATION_POLL_INTERVAL_MS ({}) exceeds HIBERNATION_SETTLE_TIMEOUT_MS ({})",
                self.hibernation.poll_interval_ms, self.hibernation.settle_timeout_ms
            )));
        }
        if self.status.refresh_interval_secs == 0 {
            return Err(Error::Config("STATUS_REFRESH_INTERVAL_SECS must be greater than 0".to_string()));
        }
        Ok(())
    }

    pub fn settle_timeout(&self) -> Duration {
        Duration::from_millis(self.hibernation.settle_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.hibernation.poll_interval_ms)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.status.refresh_interval_secs)
    }

    pub fn workload_lookup_timeout(&self) -> Duration {
        Duration::from_millis(self.status.workload_lookup_timeout_ms)
    }
}

fn parse_var<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| Error::Config(format!("Invalid {}={:?}: {}", key, raw, e))),
        None => Ok(default),
    }
}
