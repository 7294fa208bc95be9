pub mod client;
pub mod patch;

pub use client::{ClusterApi, KubeClient};
#[cfg(test)]
pub use client::MockClusterApi;
pub use patch::FieldPatch;
