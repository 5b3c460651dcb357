//! # caresim
//!
//! > **A small concurrent economy of autonomous medical actors.**
//!
//! Suppliers produce raw materials, clinics turn sick patients plus
//! materials into healed ones, hospitals admit, rest and discharge
//! patients, and ambulances feed a finite pool of sick patients into the
//! system. Every actor runs as its own tokio task, owns its funds and
//! stock behind a single state lock, and trades with the others only
//! through the request/send protocol.
//!
//! ## Concurrency Model
//!
//! The whole design hangs on one locking rule: **never hold your own
//! lock while calling out**. An actor's lock protects only its own
//! state; a trade is a single, bounded critical section on the callee's
//! side, and the caller commits its own bookkeeping only after the call
//! has returned. That one-directional discipline keeps mutually-trading
//! actors deadlock-free without a global lock order. A second, per-actor
//! lock serializes notifications to the observer so a slow display can
//! never stall trading; it is taken after the state lock has been
//! released, never before.
//!
//! Stopping is cooperative: a process-wide [`StopFlag`](actors::StopFlag)
//! is polled at the top of every run loop, and an actor always finishes
//! its current critical section first.
//!
//! ## Module Tour
//!
//! - [`model`]: pure data: item kinds, stock maps, the cost/wage table.
//! - [`trading`]: the request/send contract, the one-pass buying
//!   algorithm, and scripted doubles for tests.
//! - [`observer`]: one-way notifications out of the core, injected per
//!   actor instead of reached through global state.
//! - [`actors`]: the four actor kinds plus the shared run-loop
//!   plumbing (stop flag, pacer, the tagged fleet variant).
//! - [`lifecycle`]: wiring and spawn ([`Simulation`]), the end-of-run
//!   accounting [`Report`], and tracing setup.
//! - [`config`]: env-driven runtime configuration.
//!
//! ## Running the Demo
//!
//! ```bash
//! RUST_LOG=info cargo run
//! ```

pub mod actors;
pub mod config;
pub mod lifecycle;
pub mod model;
pub mod observer;
pub mod trading;

pub use actors::{Actor, ActorId, NoPacer, Pacer, StopFlag, UniformPacer};
pub use config::Config;
pub use lifecycle::{Report, Simulation};
pub use model::{ItemKind, Stock, StockSnapshot};
pub use observer::{NullObserver, Observer, RecordingObserver, TracingObserver};
pub use trading::{TradeError, Trader};
