use std::fmt::Debug;

use async_trait::async_trait;
use k8s_openapi::NamespaceResourceScope;
use kube::{
    api::{Api, DeleteParams, ListParams, Patch, PatchParams},
    Client, Resource,
};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::{
    crd::{LocalQueue, PyTorchJob, RayJob, TrainJob, Workload},
    job::{JobKind, TrainingJob},
    Error, Result,
};

use super::FieldPatch;

/// Everything the status and hibernation code needs from the API server
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ClusterApi: Send + Sync {
    async fn list_jobs(&self, kind: JobKind, namespace: &str) -> Result<Vec<TrainingJob>>;

    async fn get_job(&self, kind: JobKind, namespace: &str, name: &str) -> Result<TrainingJob>;

    async fn patch_job(
        &self,
        kind: JobKind,
        namespace: &str,
        name: &str,
        patch: &FieldPatch,
    ) -> Result<TrainingJob>;

    async fn delete_job(&self, kind: JobKind, namespace: &str, name: &str) -> Result<()>;

    async fn list_workloads(&self, namespace: &str, label_selector: &str) -> Result<Vec<Workload>>;

    async fn patch_workload(
        &self,
        namespace: &str,
        name: &str,
        patch: &FieldPatch,
    ) -> Result<Workload>;

    async fn get_local_queue(&self, namespace: &str, name: &str) -> Result<LocalQueue>;
}

#[derive(Clone)]
pub struct KubeClient {
    client: Client,
}

impl KubeClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub async fn try_default() -> Result<Self> {
        let client = Client::try_default()
            .await
            .map_err(|e| Error::Kubernetes(format!("Failed to create client: {}", e)))?;
        Ok(Self::new(client))
    }

    fn api<K>(&self, namespace: &str) -> Api<K>
    where
        K: Resource<Scope = NamespaceResourceScope>,
        K::DynamicType: Default,
    {
        Api::namespaced(self.client.clone(), namespace)
    }

    async fn list<K>(&self, namespace: &str, params: &ListParams) -> Result<Vec<K>>
    where
        K: Resource<Scope = NamespaceResourceScope> + Clone + DeserializeOwned + Debug,
        K::DynamicType: Default,
    {
        let list = self
            .api::<K>(namespace)
            .list(params)
            .await
            .map_err(|e| map_error(e, format!("{} in {}", K::kind(&Default::default()), namespace)))?;
        Ok(list.items)
    }

    async fn get<K>(&self, namespace: &str, name: &str) -> Result<K>
    where
        K: Resource<Scope = NamespaceResourceScope> + Clone + DeserializeOwned + Debug,
        K::DynamicType: Default,
    {
        self.api::<K>(namespace)
            .get(name)
            .await
            .map_err(|e| map_error(e, qualified::<K>(namespace, name)))
    }

    async fn patch<K>(&self, namespace: &str, name: &str, patch: &FieldPatch) -> Result<K>
    where
        K: Resource<Scope = NamespaceResourceScope> + Clone + DeserializeOwned + Debug,
        K::DynamicType: Default,
    {
        let json_patch = patch.to_json_patch()?;
        let patched = self
            .api::<K>(namespace)
            .patch(name, &PatchParams::default(), &Patch::Json::<()>(json_patch))
            .await
            .map_err(|e| map_error(e, qualified::<K>(namespace, name)))?;
        info!(
            "Patched {} {} = {}",
            qualified::<K>(namespace, name),
            patch.path,
            patch.value
        );
        Ok(patched)
    }

    async fn delete<K>(&self, namespace: &str, name: &str) -> Result<()>
    where
        K: Resource<Scope = NamespaceResourceScope> + Clone + DeserializeOwned + Debug,
        K::DynamicType: Default,
    {
        self.api::<K>(namespace)
            .delete(name, &DeleteParams::default())
            .await
            .map_err(|e| map_error(e, qualified::<K>(namespace, name)))?;
        info!("Deleted {}", qualified::<K>(namespace, name));
        Ok(())
    }
}

fn qualified<K>(namespace: &str, name: &str) -> String
where
    K: Resource,
    K::DynamicType: Default,
{
    format!("{} {}/{}", K::kind(&Default::default()), namespace, name)
}

fn map_error(err: kube::Error, target: String) -> Error {
    match err {
        kube::Error::Api(response) if response.code == 404 => Error::NotFound(target),
        kube::Error::Api(response) => Error::Kubernetes(format!("{}: {}", target, response.message)),
        other => Error::Kubernetes(format!("{}: {}", target, other)),
    }
}

fn into_jobs<K: Into<TrainingJob>>(items: Vec<K>) -> Vec<TrainingJob> {
    items.into_iter().map(Into::into).collect()
}

#[async_trait]
impl ClusterApi for KubeClient {
    async fn list_jobs(&self, kind: JobKind, namespace: &str) -> Result<Vec<TrainingJob>> {
        let params = ListParams::default();
        let jobs = match kind {
            JobKind::PyTorchJob => into_jobs(self.list::<PyTorchJob>(namespace, &params).await?),
            JobKind::TrainJob => into_jobs(self.list::<TrainJob>(namespace, &params).await?),
            JobKind::RayJob => into_jobs(self.list::<RayJob>(namespace, &params).await?),
        };
        debug!("Listed {} {}s in {}", jobs.len(), kind, namespace);
        Ok(jobs)
    }

    async fn get_job(&self, kind: JobKind, namespace: &str, name: &str) -> Result<TrainingJob> {
        Ok(match kind {
            JobKind::PyTorchJob => self.get::<PyTorchJob>(namespace, name).await?.into(),
            JobKind::TrainJob => self.get::<TrainJob>(namespace, name).await?.into(),
            JobKind::RayJob => self.get::<RayJob>(namespace, name).await?.into(),
        })
    }

    async fn patch_job(
        &self,
        kind: JobKind,
        namespace: &str,
        name: &str,
        patch: &FieldPatch,
    ) -> Result<TrainingJob> {
        Ok(match kind {
            JobKind::PyTorchJob => self.patch::<PyTorchJob>(namespace, name, patch).await?.into(),
            JobKind::TrainJob => self.patch::<TrainJob>(namespace, name, patch).await?.into(),
            JobKind::RayJob => self.patch::<RayJob>(namespace, name, patch).await?.into(),
        })
    }

    async fn delete_job(&self, kind: JobKind, namespace: &str, name: &str) -> Result<()> {
        match kind {
            JobKind::PyTorchJob => self.delete::<PyTorchJob>(namespace, name).await,
            JobKind::TrainJob => self.delete::<TrainJob>(namespace, name).await,
            JobKind::RayJob => self.delete::<RayJob>(namespace, name).await,
        }
    }

    async fn list_workloads(&self, namespace: &str, label_selector: &str) -> Result<Vec<Workload>> {
        self.list::<Workload>(namespace, &ListParams::default().labels(label_selector))
            .await
    }

    async fn patch_workload(
        &self,
        namespace: &str,
        name: &str,
        patch: &FieldPatch,
    ) -> Result<Workload> {
        self.patch::<Workload>(namespace, name, patch).await
    }

    async fn get_local_queue(&self, namespace: &str, name: &str) -> Result<LocalQueue> {
        self.get::<LocalQueue>(namespace, name).await
    }
}
