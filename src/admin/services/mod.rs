pub mod poller;

pub use poller::{StatusPoller, DEFAULT_POLL_INTERVAL};
