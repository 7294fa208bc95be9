pub mod common;
pub mod pytorchjob;
pub mod rayjob;
pub mod trainjob;
pub mod workload;

pub use common::{JobCondition, DISPLAY_NAME_ANNOTATION};
pub use pytorchjob::{PyTorchJob, PyTorchJobSpec, PyTorchJobStatus, ReplicaSpec, ReplicaStatus, RunPolicy};
pub use rayjob::{RayClusterSpec, RayJob, RayJobSpec, RayJobStatus, WorkerGroupSpec};
pub use trainjob::{JobsStatus, ProgressionStatus, TrainJob, TrainJobSpec, TrainJobStatus, TrainerSpec};
pub use workload::{LocalQueue, LocalQueueSpec, Workload, WorkloadSpec, WorkloadStatus};
