//! Tracing setup for the demo binary.
//!
//! Structured logging with `RUST_LOG`-driven filtering:
//!
//! ```bash
//! RUST_LOG=info cargo run          # trading activity
//! RUST_LOG=debug cargo run         # plus refused orders and passes
//! RUST_LOG=caresim=trace cargo run # everything
//! ```

pub fn setup_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false) // actor ids carry the context, not module paths
        .compact()
        .init();
}
