//! Gate capacity configuration.

use serde::{Deserialize, Serialize};

use crate::kind::GateKind;

/// Per-class gate capacities
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateConfig {
    #[serde(default = "default_db_read")]
    pub db_read: usize,

    #[serde(default = "default_db_write")]
    pub db_write: usize,

    #[serde(default = "default_external_api")]
    pub external_api: usize,

    #[serde(default = "default_cpu")]
    pub cpu: usize,
}

fn default_db_read() -> usize {
    GateKind::DbRead.default_capacity()
}

fn default_db_write() -> usize {
    GateKind::DbWrite.default_capacity()
}

fn default_external_api() -> usize {
    GateKind::ExternalApi.default_capacity()
}

fn default_cpu() -> usize {
    GateKind::Cpu.default_capacity()
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            db_read: default_db_read(),
            db_write: default_db_write(),
            external_api: default_external_api(),
            cpu: default_cpu(),
        }
    }
}

impl GateConfig {
    pub fn capacity(&self, kind: GateKind) -> usize {
        match kind {
            GateKind::DbRead => self.db_read,
            GateKind::DbWrite => self.db_write,
            GateKind::ExternalApi => self.external_api,
            GateKind::Cpu => self.cpu,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        for kind in GateKind::ALL {
            if self.capacity(kind) == 0 {
                return Err(format!("gates.{kind} must be > 0"));
            }
        }
        Ok(())
    }
}
