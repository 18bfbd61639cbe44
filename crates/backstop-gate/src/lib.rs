//! Admission control for backend workloads.
//!
//! - [`ConcurrencyGate`]: caps in-flight tasks of one class, FIFO admission
//! - [`GateSet`]: the four classes (database reads and writes, external API
//!   calls, CPU-bound work) with their ceilings
//! - [`process_batch`]: runs an async transform over fixed-size chunks, one
//!   chunk at a time
//!
//! Nothing here cancels or times out running work. Queued callers wait for a
//! slot indefinitely unless they opt into
//! [`ConcurrencyGate::run_with_wait_timeout`].

pub mod batch;
pub mod config;
pub mod error;
pub mod gate;
pub mod kind;
pub mod metrics;
pub mod set;

pub use batch::process_batch;
pub use config::GateConfig;
pub use error::{BatchError, GateError};
pub use gate::{ConcurrencyGate, GateStatus};
pub use kind::GateKind;
pub use set::GateSet;
