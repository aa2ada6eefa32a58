pub mod dispatcher;
pub mod probe;
pub mod sweep;

pub use dispatcher::{HttpScheduler, JobDispatcher, Scheduler};
pub use probe::{classify, HttpProber, ProbeOutcome, Prober};
pub use sweep::SweepEngine;
