//! The four workload gates, constructed once and shared.

use std::future::Future;

use crate::config::GateConfig;
use crate::error::GateError;
use crate::gate::{ConcurrencyGate, GateStatus};
use crate::kind::GateKind;

/// One [`ConcurrencyGate`] per [`GateKind`].
///
/// Build it once at start-up and share it (usually behind an `Arc`) with
/// everything that touches the protected resources.
#[derive(Debug)]
pub struct GateSet {
    db_read: ConcurrencyGate,
    db_write: ConcurrencyGate,
    external_api: ConcurrencyGate,
    cpu: ConcurrencyGate,
}

impl GateSet {
    /// Build the gates with the given capacities.
    ///
    /// # Panics
    ///
    /// Panics if a capacity is zero; [`GateConfig::validate`] rejects that
    /// beforehand.
    pub fn from_config(config: &GateConfig) -> Self {
        let gate = |kind| ConcurrencyGate::new(kind, config.capacity(kind));
        Self {
            db_read: gate(GateKind::DbRead),
            db_write: gate(GateKind::DbWrite),
            external_api: gate(GateKind::ExternalApi),
            cpu: gate(GateKind::Cpu),
        }
    }

    pub fn get(&self, kind: GateKind) -> &ConcurrencyGate {
        match kind {
            GateKind::DbRead => &self.db_read,
            GateKind::DbWrite => &self.db_write,
            GateKind::ExternalApi => &self.external_api,
            GateKind::Cpu => &self.cpu,
        }
    }

    pub fn db_read(&self) -> &ConcurrencyGate {
        &self.db_read
    }

    pub fn db_write(&self) -> &ConcurrencyGate {
        &self.db_write
    }

    pub fn external_api(&self) -> &ConcurrencyGate {
        &self.external_api
    }

    pub fn cpu(&self) -> &ConcurrencyGate {
        &self.cpu
    }

    /// Run `task` through the gate for `kind`.
    pub async fn run<F, T>(&self, kind: GateKind, task: F) -> Result<T, GateError>
    where
        F: Future<Output = T>,
    {
        self.get(kind).run(task).await
    }

    /// Status of every gate, in [`GateKind::ALL`] order.
    pub fn snapshot(&self) -> Vec<GateStatus> {
        GateKind::ALL
            .iter()
            .map(|kind| self.get(*kind).status())
            .collect()
    }

    /// Close every gate (shutdown).
    pub fn close_all(&self) {
        for kind in GateKind::ALL {
            self.get(kind).close();
        }
    }
}

impl Default for GateSet {
    fn default() -> Self {
        Self::from_config(&GateConfig::default())
    }
}
