//! Handshake concurrency gate
//!
//! Limits how many identify handshakes for one owner may be in flight at once.
//! The voice/gateway server only accepts `capacity` handshakes per rate-limit
//! window, so callers take a permit before sending the handshake and the
//! permit comes back on a timer rather than when the caller finishes.
//!
//! ## Hold lifecycle
//! ```text
//! Free ──acquire──▶ Held(auto, default hold) ──extend_release(d)──▶ Held(custom, d) ──timer──▶ Free
//!                          │                                                               ▲
//!                          └──────────────────────────timer───────────────────────────────┘
//! ```
//!
//! Each outstanding acquisition owns exactly one armed timer, recorded in a
//! hold table behind a mutex. Replacing a timer removes the old hold from the
//! table and cancels its token in the same critical section; a timer only
//! returns its permit if its hold is still in the table when it fires. At most
//! one release happens per acquisition, so `available <= capacity` holds.

use crate::config::saturating_millis;
use crate::error::{constants, Result, VoiceError};
use crate::utils::metrics::Metrics;
use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, trace, warn};

/// How long a permit stays out when the caller never extends it
pub const DEFAULT_HOLD: Duration = Duration::from_secs(30);

/// Hold applied after a confirmed handshake when the server names no delay
pub const DEFAULT_READY_COOLDOWN: Duration = Duration::from_secs(5);

/// Identifies one armed hold. Re-arming a hold issues a new id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HoldId(u64);

/// Which timer a hold is currently waiting on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoldKind {
    /// Default hold armed by `acquire`
    Auto,
    /// Caller-supplied hold armed by `extend_release`
    Custom,
}

#[derive(Debug)]
struct Hold {
    id: HoldId,
    kind: HoldKind,
    cancel: CancellationToken,
}

#[derive(Debug, Default)]
struct HoldTable {
    /// Outstanding holds in arming order
    holds: VecDeque<Hold>,
    next_id: u64,
}

/// State shared with the timer tasks
struct GateShared {
    owner: u64,
    semaphore: Semaphore,
    table: Mutex<HoldTable>,
    /// Runtime that timers are spawned on, captured at construction
    runtime: Handle,
    metrics: Arc<Metrics>,
}

impl GateShared {
    /// The table is never left half-updated, so a poisoned lock is still usable.
    fn table(&self) -> MutexGuard<'_, HoldTable> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record a new hold and spawn its timer. Must be called with the table locked.
    fn arm(self: &Arc<Self>, table: &mut HoldTable, kind: HoldKind, delay: Duration) -> HoldId {
        let id = HoldId(table.next_id);
        table.next_id += 1;

        let cancel = CancellationToken::new();
        let cancelled = cancel.clone();
        let shared = Arc::clone(self);
        self.runtime.spawn(async move {
            tokio::select! {
                _ = cancelled.cancelled() => {
                    trace!(owner = shared.owner, ?id, "Hold timer cancelled");
                }
                _ = tokio::time::sleep(delay) => shared.expire(id),
            }
        });

        table.holds.push_back(Hold { id, kind, cancel });
        id
    }

    /// Timer callback: return the permit if the hold is still outstanding
    fn expire(&self, id: HoldId) {
        let mut table = self.table();
        let Some(pos) = table.holds.iter().position(|hold| hold.id == id) else {
            trace!(owner = self.owner, ?id, "Hold already replaced or disposed");
            return;
        };
        let Some(hold) = table.holds.remove(pos) else {
            return;
        };

        self.semaphore.add_permits(1);
        drop(table);

        match hold.kind {
            HoldKind::Auto => {
                debug!(owner = self.owner, ?id, "Default hold expired, permit returned");
                self.metrics.auto_released();
            }
            HoldKind::Custom => {
                debug!(owner = self.owner, ?id, "Hold released");
                self.metrics.custom_released();
            }
        }
    }

    /// Swap the hold at `pos` for a custom hold of `delay`. Must be called with the table locked.
    fn rearm(self: &Arc<Self>, table: &mut HoldTable, pos: usize, delay: Duration) -> Option<HoldId> {
        let old = table.holds.remove(pos)?;
        old.cancel.cancel();

        let id = self.arm(table, HoldKind::Custom, delay);
        debug!(
            owner = self.owner,
            replaced = ?old.id,
            ?id,
            delay_ms = saturating_millis(delay),
            "Hold extended"
        );
        self.metrics.hold_extended();
        Some(id)
    }
}

/// Capacity-bounded gate with self-expiring holds.
///
/// Created once per owner (usually an application id) and shared by every
/// session manager of that owner. Dropping the gate disposes it.
pub struct ConcurrencyGate {
    shared: Arc<GateShared>,
    capacity: usize,
    default_hold: Duration,
    ready_cooldown: Duration,
}

impl ConcurrencyGate {
    /// Gate with the protocol's default hold of [`DEFAULT_HOLD`]
    pub fn new(owner: u64, capacity: usize) -> Result<Self> {
        Self::with_options(owner, capacity, DEFAULT_HOLD, Arc::new(Metrics::new()))
    }

    /// Gate whose unextended holds expire after `default_hold`
    pub fn with_default_hold(owner: u64, capacity: usize, default_hold: Duration) -> Result<Self> {
        Self::with_options(owner, capacity, default_hold, Arc::new(Metrics::new()))
    }

    /// Fully specified gate.
    ///
    /// Must be called from within a Tokio runtime; hold timers run on it.
    ///
    /// # Errors
    /// [`VoiceError::ConfigError`] if `capacity` is zero or beyond what a
    /// Tokio semaphore can hold, or if no Tokio runtime is running.
    pub fn with_options(
        owner: u64,
        capacity: usize,
        default_hold: Duration,
        metrics: Arc<Metrics>,
    ) -> Result<Self> {
        if capacity == 0 {
            return Err(VoiceError::ConfigError(constants::ERR_ZERO_CAPACITY.to_string()));
        }
        if capacity > Semaphore::MAX_PERMITS {
            return Err(VoiceError::ConfigError(format!(
                "Gate capacity too large: {capacity} (maximum: {})",
                Semaphore::MAX_PERMITS
            )));
        }

        let runtime = Handle::try_current()
            .map_err(|e| VoiceError::ConfigError(format!("{}: {e}", constants::ERR_NO_RUNTIME)))?;

        debug!(owner, capacity, default_hold_ms = saturating_millis(default_hold), "Gate created");
        Ok(Self {
            shared: Arc::new(GateShared {
                owner,
                semaphore: Semaphore::new(capacity),
                table: Mutex::new(HoldTable::default()),
                runtime,
                metrics,
            }),
            capacity,
            default_hold,
            ready_cooldown: DEFAULT_READY_COOLDOWN,
        })
    }

    /// Delay used by [`release_after_ready`](Self::release_after_ready) when the server names none
    pub fn with_ready_cooldown(mut self, ready_cooldown: Duration) -> Self {
        self.ready_cooldown = ready_cooldown;
        self
    }

    pub fn owner(&self) -> u64 {
        self.shared.owner
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn default_hold(&self) -> Duration {
        self.default_hold
    }

    pub fn ready_cooldown(&self) -> Duration {
        self.ready_cooldown
    }

    /// Permits free right now
    pub fn available(&self) -> usize {
        self.shared.semaphore.available_permits()
    }

    /// Holds whose timer has not yet returned their permit
    pub fn outstanding(&self) -> usize {
        self.shared.table().holds.len()
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.shared.metrics
    }

    /// Wait for a permit, then hold it for the default hold duration.
    ///
    /// Waiters are served in arrival order. The permit returns on its own when
    /// the default hold expires unless [`extend_release`](Self::extend_release)
    /// replaces the timer first.
    ///
    /// # Errors
    /// [`VoiceError::GateClosed`] only if the semaphore is closed, which this
    /// gate never does; the variant is reserved for that case.
    #[instrument(skip(self), fields(owner = self.shared.owner))]
    pub async fn acquire(&self) -> Result<HoldId> {
        let contended = self.shared.semaphore.available_permits() == 0;
        let permit = self
            .shared
            .semaphore
            .acquire()
            .await
            .map_err(|_| VoiceError::GateClosed)?;
        // The permit comes back through a hold timer, not through drop.
        permit.forget();

        let mut table = self.shared.table();
        let id = self.shared.arm(&mut table, HoldKind::Auto, self.default_hold);
        let outstanding = table.holds.len();
        drop(table);

        self.shared.metrics.gate_acquired(contended);
        debug!(?id, contended, outstanding, "Gate acquired");
        Ok(id)
    }

    /// Replace a hold's timer with one that returns its permit after `delay`.
    ///
    /// Picks the oldest hold still on its default timer, or the most recently
    /// armed hold when every hold already has a custom timer. Does nothing when
    /// nothing is held. Returns the id of the re-armed hold.
    pub fn extend_release(&self, delay: Duration) -> Option<HoldId> {
        let mut table = self.shared.table();
        let target = table
            .holds
            .iter()
            .position(|hold| hold.kind == HoldKind::Auto)
            .or_else(|| table.holds.len().checked_sub(1));

        let Some(pos) = target else {
            debug!(owner = self.shared.owner, "Extend requested with nothing held");
            self.shared.metrics.spurious_extension();
            return None;
        };

        self.shared.rearm(&mut table, pos, delay)
    }

    /// Extend after the server confirmed the handshake.
    ///
    /// Uses the server's `delay` when it sent one, otherwise the gate's ready
    /// cool-down. Same target selection as [`extend_release`](Self::extend_release).
    pub fn release_after_ready(&self, delay: Option<Duration>) -> Option<HoldId> {
        self.extend_release(delay.unwrap_or(self.ready_cooldown))
    }

    /// Replace the timer of one specific hold.
    ///
    /// Returns `None` if that hold's permit was already returned or disposed.
    pub fn extend_hold(&self, id: HoldId, delay: Duration) -> Option<HoldId> {
        let mut table = self.shared.table();
        let Some(pos) = table.holds.iter().position(|hold| hold.id == id) else {
            debug!(owner = self.shared.owner, ?id, "Extend requested for a released hold");
            self.shared.metrics.spurious_extension();
            return None;
        };

        self.shared.rearm(&mut table, pos, delay)
    }

    /// Wait until a permit is free without keeping it.
    ///
    /// Queues behind earlier `acquire` callers like any other waiter. Errors
    /// like [`acquire`](Self::acquire).
    pub async fn wait_only(&self) -> Result<()> {
        let _permit = self
            .shared
            .semaphore
            .acquire()
            .await
            .map_err(|_| VoiceError::GateClosed)?;
        Ok(())
    }

    /// Cancel every armed timer without returning the held permits.
    ///
    /// Best effort: never fails, safe to call repeatedly, and a timer that
    /// fires concurrently finds its hold gone and releases nothing. The
    /// abandoned permits stay out for the lifetime of the gate.
    pub fn dispose(&self) {
        let mut table = self.shared.table();
        let abandoned = table.holds.len();
        for hold in table.holds.drain(..) {
            hold.cancel.cancel();
        }
        drop(table);

        if abandoned > 0 {
            warn!(
                owner = self.shared.owner,
                abandoned, "Gate disposed with holds outstanding, permits not returned"
            );
            self.shared.metrics.holds_disposed(abandoned as u64);
        }
    }
}

impl Drop for ConcurrencyGate {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl fmt::Debug for ConcurrencyGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConcurrencyGate")
            .field("owner", &self.shared.owner)
            .field("capacity", &self.capacity)
            .field("available", &self.available())
            .field("default_hold", &self.default_hold)
            .field("ready_cooldown", &self.ready_cooldown)
            .finish()
    }
}
