//! CLI command implementations

pub mod report;
pub mod snapshot;
pub mod watch;
