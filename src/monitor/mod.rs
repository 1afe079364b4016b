//! Check execution: probes, status classification, the check runner and the
//! due-time scheduler that drives it.

pub mod classifier;
pub mod outcome;
pub mod probe;
pub mod runner;
pub mod scheduler;

pub use classifier::classify;
pub use outcome::ProbeOutcome;
pub use probe::{NetworkProber, ProbeKind, Prober};
pub use runner::{CheckReport, CheckRunner, Disposition, PassReport, PassSummary};
pub use scheduler::{DueQueue, MonitorScheduler};
