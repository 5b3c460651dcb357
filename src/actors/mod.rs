//! The four actor kinds and their shared run-loop plumbing.
//!
//! Each actor owns its funds and stock behind a single state lock and
//! runs as one tokio task. The deep inheritance chain of a classic
//! actor hierarchy is replaced with composition: every actor struct
//! holds its id, its `Mutex`-guarded state, and an injected
//! [`Notifier`](crate::observer::Notifier); the heterogeneous fleet is
//! the tagged [`Actor`] variant rather than a base class.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::Rng;
use tokio::task::JoinHandle;

use crate::trading::Trader;

pub mod ambulance;
pub mod clinic;
pub mod hospital;
pub mod supplier;

pub use ambulance::Ambulance;
pub use clinic::Clinic;
pub use hospital::Hospital;
pub use supplier::Supplier;

/// Identifies one actor instance for the whole run.
pub type ActorId = u32;

/// An actor started without a required, non-empty partner set. Detected
/// before the run loop begins; the loop is skipped and the condition
/// reported to the operator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SetupError {
    #[error("{actor} {id} has no {role} partners, refusing to start")]
    MissingPartners {
        actor: &'static str,
        id: ActorId,
        role: &'static str,
    },
}

/// Process-wide cooperative stop signal, polled at the top of every run
/// loop and after each discrete action. An actor always finishes its
/// current critical section before observing it.
#[derive(Clone, Default)]
pub struct StopFlag(Arc<AtomicBool>);

impl StopFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Provider of the per-cycle service pause. Always awaited outside any
/// lock; it is the only intentional long suspension point in a loop.
#[async_trait]
pub trait Pacer: Send + Sync {
    async fn pause(&self);
}

/// Sleeps a uniformly random, bounded duration each cycle.
pub struct UniformPacer {
    min: Duration,
    max: Duration,
}

impl UniformPacer {
    pub fn new(min: Duration, max: Duration) -> Self {
        Self { min, max }
    }
}

#[async_trait]
impl Pacer for UniformPacer {
    async fn pause(&self) {
        let min = self.min.as_millis() as u64;
        let max = self.max.as_millis() as u64;
        let ms = rand::rng().random_range(min..=max.max(min));
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }
}

/// Yields instead of sleeping, so tests can spin the loops fast.
pub struct NoPacer;

#[async_trait]
impl Pacer for NoPacer {
    async fn pause(&self) {
        tokio::task::yield_now().await;
    }
}

/// One member of the fleet. Dispatches the run loop and the trading
/// handle over the four concrete kinds.
pub enum Actor {
    Supplier(Arc<Supplier>),
    Clinic(Arc<Clinic>),
    Hospital(Arc<Hospital>),
    Ambulance(Arc<Ambulance>),
}

impl Actor {
    pub fn id(&self) -> ActorId {
        match self {
            Actor::Supplier(a) => a.id(),
            Actor::Clinic(a) => a.id(),
            Actor::Hospital(a) => a.id(),
            Actor::Ambulance(a) => a.id(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Actor::Supplier(_) => "supplier",
            Actor::Clinic(_) => "clinic",
            Actor::Hospital(_) => "hospital",
            Actor::Ambulance(_) => "ambulance",
        }
    }

    /// The trading handle other actors are wired to.
    pub fn trader(&self) -> Arc<dyn Trader> {
        match self {
            Actor::Supplier(a) => a.clone(),
            Actor::Clinic(a) => a.clone(),
            Actor::Hospital(a) => a.clone(),
            Actor::Ambulance(a) => a.clone(),
        }
    }

    /// Spawns the actor's run loop as its own tokio task.
    pub fn spawn(&self, stop: StopFlag, pacer: Arc<dyn Pacer>, rng: StdRng) -> JoinHandle<()> {
        match self {
            Actor::Supplier(a) => {
                let a = a.clone();
                tokio::spawn(async move { a.run(stop, pacer).await })
            }
            Actor::Clinic(a) => {
                let a = a.clone();
                tokio::spawn(async move { a.run(stop, pacer, rng).await })
            }
            Actor::Hospital(a) => {
                let a = a.clone();
                tokio::spawn(async move { a.run(stop, pacer, rng).await })
            }
            Actor::Ambulance(a) => {
                let a = a.clone();
                tokio::spawn(async move { a.run(stop, pacer, rng).await })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stop_flag_is_shared_between_clones() {
        let flag = StopFlag::new();
        let clone = flag.clone();
        assert!(!clone.is_stopped());
        flag.stop();
        assert!(clone.is_stopped());
    }
}
