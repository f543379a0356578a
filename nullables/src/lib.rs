//! Nullable infrastructure for deterministic testing.
//!
//! Inspired by the "A-frame architecture" pattern from RsNano.
//! Every external dependency of the flow (clock, backend, recoverable
//! storage, location and camera hardware) sits behind a trait. This crate
//! provides test-friendly implementations that:
//! - Return deterministic values
//! - Can be controlled programmatically
//! - Never touch the filesystem, network or devices
//!
//! Usage: swap real implementations for nullables in tests.

pub mod backend;
pub mod clock;
pub mod devices;
pub mod storage;

pub use backend::NullBackend;
pub use clock::NullClock;
pub use devices::{NullGeolocator, NullMediaDevice, StreamProbe};
pub use storage::NullStorage;
