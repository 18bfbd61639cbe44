use std::fmt;

use serde::{Deserialize, Serialize};

/// Workload classes with their own admission gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateKind {
    /// Database reads: cheap and plentiful.
    DbRead,
    /// Database writes: lock contention and replication lag.
    DbWrite,
    /// Third-party API calls: rate limits.
    ExternalApi,
    /// CPU-bound work that would starve request handling.
    Cpu,
}

impl GateKind {
    pub const ALL: [GateKind; 4] = [
        GateKind::DbRead,
        GateKind::DbWrite,
        GateKind::ExternalApi,
        GateKind::Cpu,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            GateKind::DbRead => "db_read",
            GateKind::DbWrite => "db_write",
            GateKind::ExternalApi => "external_api",
            GateKind::Cpu => "cpu",
        }
    }

    /// Built-in ceiling for this class.
    pub fn default_capacity(&self) -> usize {
        match self {
            GateKind::DbRead => 50,
            GateKind::DbWrite => 10,
            GateKind::ExternalApi => 5,
            GateKind::Cpu => 2,
        }
    }
}

impl fmt::Display for GateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
