//! Nullable infrastructure for deterministic testing.
//!
//! Every external dependency of the consensus core (clock, peer RPC, liveness
//! probe, secret store) sits behind a trait. This crate provides
//! implementations that:
//! - Return deterministic values
//! - Can be controlled programmatically
//! - Never touch the network
//!
//! Usage: swap real implementations for nullables in tests.

pub mod clock;
pub mod health;
pub mod secrets;
pub mod transport;

pub use clock::NullClock;
pub use health::NullHealthProbe;
pub use secrets::NullSecretProvider;
pub use transport::{NullTransport, PeerBehavior};
