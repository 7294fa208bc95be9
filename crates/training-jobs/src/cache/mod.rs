pub mod poller;
pub mod store;

pub use poller::StatusPoller;
pub use store::StatusCache;
