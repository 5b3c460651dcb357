//! Wiring, run control, and end-of-run accounting.

pub mod report;
pub mod sim;
pub mod tracing;

pub use report::{ActorReport, Report};
pub use sim::Simulation;
pub use tracing::setup_tracing;
