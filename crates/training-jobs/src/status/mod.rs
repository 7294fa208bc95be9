//! Job status derivation
//!
//! A job's displayed state is computed from its own conditions and, for
//! queue-managed jobs, from the Kueue Workload admitting it. Nothing here
//! writes to the cluster.

pub mod derive;
pub mod progress;
pub mod state;

pub use derive::{derive_basic_status, derive_status, StatusDeriver};
pub use progress::{completion_percentage, progress_info, ProgressInfo};
pub use state::JobState;
