//! Per-owner gate registry
//!
//! Every session manager of one owner must share a single gate, otherwise
//! their handshakes are not serialized against each other. The registry hands
//! out that shared gate, creating it the first time the owner shows up with
//! the capacity the server reported.

use crate::config::GateConfig;
use crate::error::Result;
use crate::protocol::gate::{ConcurrencyGate, DEFAULT_READY_COOLDOWN};
use crate::utils::metrics::Metrics;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tracing::debug;

/// Owner key to gate map
#[derive(Debug)]
pub struct GateRegistry {
    gates: RwLock<HashMap<u64, Arc<ConcurrencyGate>>>,
    default_hold: Duration,
    /// Capacity used when the server reports no limit
    fallback_capacity: usize,
    ready_cooldown: Duration,
    metrics: Arc<Metrics>,
}

impl GateRegistry {
    /// Registry whose gates use `default_hold` for unextended holds
    pub fn new(default_hold: Duration) -> Self {
        Self {
            gates: RwLock::new(HashMap::new()),
            default_hold,
            fallback_capacity: 1,
            ready_cooldown: DEFAULT_READY_COOLDOWN,
            metrics: Arc::new(Metrics::new()),
        }
    }

    /// Registry using the configured hold, fallback capacity and ready cool-down
    pub fn from_config(config: &GateConfig) -> Self {
        Self {
            fallback_capacity: config.max_concurrency,
            ready_cooldown: config.ready_cooldown,
            ..Self::new(config.default_hold)
        }
    }

    pub fn fallback_capacity(&self) -> usize {
        self.fallback_capacity
    }

    /// Share one metrics collector between every gate created from now on
    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Gate for `owner`, created with `capacity` permits if it does not exist yet.
    ///
    /// An existing gate keeps the capacity it was created with.
    pub fn get_or_create(&self, owner: u64, capacity: usize) -> Result<Arc<ConcurrencyGate>> {
        if let Some(gate) = self.get(owner) {
            if gate.capacity() != capacity {
                debug!(
                    owner,
                    existing = gate.capacity(),
                    requested = capacity,
                    "Reusing gate with its original capacity"
                );
            }
            return Ok(gate);
        }

        let mut gates = self.gates.write().unwrap_or_else(PoisonError::into_inner);
        // Another caller may have created it between the read and the write lock.
        if let Some(gate) = gates.get(&owner) {
            return Ok(Arc::clone(gate));
        }

        let gate = Arc::new(
            ConcurrencyGate::with_options(
                owner,
                capacity,
                self.default_hold,
                Arc::clone(&self.metrics),
            )?
            .with_ready_cooldown(self.ready_cooldown),
        );
        gates.insert(owner, Arc::clone(&gate));
        Ok(gate)
    }

    /// Like [`get_or_create`](Self::get_or_create), with the capacity the server
    /// reported, or the registry's fallback capacity when it reported none.
    pub fn get_or_create_reported(
        &self,
        owner: u64,
        reported: Option<usize>,
    ) -> Result<Arc<ConcurrencyGate>> {
        self.get_or_create(owner, reported.unwrap_or(self.fallback_capacity))
    }

    pub fn get(&self, owner: u64) -> Option<Arc<ConcurrencyGate>> {
        self.gates
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&owner)
            .cloned()
    }

    /// Drop the owner's gate, disposing its pending holds
    pub fn remove(&self, owner: u64) -> Option<Arc<ConcurrencyGate>> {
        let gate = self
            .gates
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&owner)?;
        gate.dispose();
        debug!(owner, "Gate removed");
        Some(gate)
    }

    /// Dispose and forget every gate
    pub fn dispose_all(&self) {
        let gates: Vec<_> = self
            .gates
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .drain()
            .collect();

        for (_, gate) in &gates {
            gate.dispose();
        }
        debug!(count = gates.len(), "All gates disposed");
    }

    pub fn len(&self) -> usize {
        self.gates.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }
}

impl Default for GateRegistry {
    fn default() -> Self {
        Self::from_config(&GateConfig::default())
    }
}
