//! Gate metrics recorded through the `metrics` facade.

use std::time::Duration;

use metrics::{gauge, histogram};

/// Metric names as constants for consistency.
pub mod names {
    pub const GATE_IN_FLIGHT: &str = "gate_in_flight";
    pub const GATE_WAITING: &str = "gate_waiting";
    pub const GATE_WAIT_SECONDS: &str = "gate_wait_seconds";
}

pub fn set_in_flight(gate: &'static str, count: usize) {
    gauge!(names::GATE_IN_FLIGHT, "gate" => gate).set(count as f64);
}

pub fn set_waiting(gate: &'static str, count: usize) {
    gauge!(names::GATE_WAITING, "gate" => gate).set(count as f64);
}

/// Record how long a task queued before admission.
pub fn record_wait(gate: &'static str, waited: Duration) {
    histogram!(names::GATE_WAIT_SECONDS, "gate" => gate).record(waited.as_secs_f64());
}
