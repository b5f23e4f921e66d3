pub mod monitor;

pub use monitor::{AlertMonitor, CALL_NOT_READ};
