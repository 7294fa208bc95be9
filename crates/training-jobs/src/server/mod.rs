mod routes;
mod summary;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::{
    cache::{StatusCache, StatusPoller},
    config::Config,
    hibernation::HibernationReconciler,
    kubernetes::ClusterApi,
    queue::{QueueLabels, WorkloadResolver},
    status::StatusDeriver,
    Error, Result,
};

pub use summary::{available_actions, JobAction, JobDetail, JobSummary};

pub(crate) struct AppState {
    pub client: Arc<dyn ClusterApi>,
    pub resolver: WorkloadResolver,
    pub poller: StatusPoller,
    pub reconciler: HibernationReconciler,
    pub labels: QueueLabels,
    pub shutdown: CancellationToken,
}

pub struct Server {
    state: Arc<AppState>,
}

impl Server {
    pub fn new(config: &Config, client: Arc<dyn ClusterApi>) -> Self {
        let labels = QueueLabels::new(config.queue.label_prefix.clone());
        let resolver = WorkloadResolver::new(Arc::clone(&client), labels.clone());
        let cache = StatusCache::new();

        let deriver = StatusDeriver::new(resolver.clone(), config.workload_lookup_timeout());
        let poller = StatusPoller::new(
            deriver,
            cache.clone(),
            config.kube.namespace.clone(),
            config.kube.job_kinds.clone(),
            config.refresh_interval(),
        );
        let reconciler = HibernationReconciler::new(
            resolver.clone(),
            config.settle_timeout(),
            config.poll_interval(),
        )
        .with_cache(cache);

        Self {
            state: Arc::new(AppState {
                client,
                resolver,
                poller,
                reconciler,
                labels,
                shutdown: CancellationToken::new(),
            }),
        }
    }

    pub fn poller(&self) -> StatusPoller {
        self.state.poller.clone()
    }

    pub fn cache(&self) -> StatusCache {
        self.state.poller.cache().clone()
    }

    /// Cancelled when the server shuts down; in-flight hibernation waits observe it
    pub fn shutdown_token(&self) -> CancellationToken {
        self.state.shutdown.clone()
    }

    pub fn build_router(&self) -> Router {
        Router::new()
            .route("/health", get(routes::health))
            .route("/metrics", get(routes::metrics))
            .route("/jobs", get(routes::list_jobs))
            .route(
                "/jobs/{kind}/{name}",
                get(routes::get_job).delete(routes::delete_job),
            )
            .route("/jobs/{kind}/{name}/pause", post(routes::pause_job))
            .route("/jobs/{kind}/{name}/resume", post(routes::resume_job))
            .route("/jobs/{kind}/{name}/hibernation", post(routes::toggle_hibernation))
            .layer(TraceLayer::new_for_http())
            .with_state(Arc::clone(&self.state))
    }

    pub async fn start(&self, addr: &str) -> Result<()> {
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| Error::Internal(format!("Failed to bind {}: {}", addr, e)))?;
        info!("Listening on {}", addr);

        let shutdown = self.state.shutdown.clone();
        axum::serve(listener, self.build_router())
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await
            .map_err(|e| Error::Internal(format!("Server error: {}", e)))
    }
}
