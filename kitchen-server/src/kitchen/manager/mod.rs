//! KitchenManager - command processing for kitchen orders
//!
//! # Command Flow
//!
//! ```text
//! start_timer(id, minutes)
//!     ├─ 1. Take the write lock
//!     ├─ 2. Begin write transaction (redb: one writer at a time)
//!     ├─ 3. Load current record
//!     ├─ 4. Apply KitchenAction (pure transition, may reject)
//!     ├─ 5. Write record + indexes
//!     ├─ 6. Commit
//!     ├─ 7. Publish event to the kitchen hub (try_send, never waits)
//!     ├─ 8. Release the write lock
//!     └─ 9. Return the new record
//! ```
//!
//! Commit and publish happen under the same lock, so subscribers receive
//! events in commit order. Reads do not take the lock.
//!
//! All operations are synchronous and short. HTTP handlers run them on the
//! blocking pool; the timer sweep calls [`KitchenManager::sweep_expired`].

mod error;
pub use error::*;

use super::actions::KitchenAction;
use super::hub::KitchenHub;
use super::storage::{KitchenStorage, Mutation, StorageError};
use parking_lot::Mutex;
use shared::kitchen::{DEFAULT_EXTRA_SECONDS, KitchenEvent, KitchenOrder, NewKitchenOrder};
use shared::util::{now_millis, snowflake_id};
use std::sync::atomic::{AtomicBool, Ordering};

/// Fresh ids tried before intake gives up on a collision
const MAX_ID_ATTEMPTS: usize = 5;

/// Result of one sweep pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Due timers found in the index
    pub scanned: usize,
    /// Orders moved to `timer_expired`
    pub expired: Vec<i64>,
    /// Orders that failed and will be retried next tick
    pub failed: usize,
    /// Another sweep was still running
    pub skipped: bool,
}

impl SweepReport {
    pub fn skipped() -> Self {
        Self {
            skipped: true,
            ..Self::default()
        }
    }
}

/// Clears the sweep flag even if the pass unwinds
struct SweepGuard<'a>(&'a AtomicBool);

impl Drop for SweepGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// KitchenManager owns the order store and the broadcast hub
pub struct KitchenManager {
    storage: KitchenStorage,
    hub: KitchenHub,
    sweeping: AtomicBool,
    /// Held from commit through publish
    write_lock: Mutex<()>,
}

impl std::fmt::Debug for KitchenManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KitchenManager")
            .field("storage", &"<KitchenStorage>")
            .field("hub", &self.hub)
            .finish()
    }
}

impl KitchenManager {
    pub fn new(storage: KitchenStorage, hub: KitchenHub) -> Self {
        Self {
            storage,
            hub,
            sweeping: AtomicBool::new(false),
            write_lock: Mutex::new(()),
        }
    }

    pub fn hub(&self) -> &KitchenHub {
        &self.hub
    }

    pub fn storage(&self) -> &KitchenStorage {
        &self.storage
    }

    // ========== Intake ==========

    /// Store a new `pending` order and announce it
    pub fn create_order(&self, input: NewKitchenOrder) -> ManagerResult<KitchenOrder> {
        self.create_order_at(input, now_millis())
    }

    pub fn create_order_at(&self, input: NewKitchenOrder, now: i64) -> ManagerResult<KitchenOrder> {
        self.create_order_with_ids(input, now, snowflake_id)
    }

    /// Intake with an explicit id source; an id already in use is redrawn
    pub(crate) fn create_order_with_ids(
        &self,
        input: NewKitchenOrder,
        now: i64,
        mut next_id: impl FnMut() -> i64,
    ) -> ManagerResult<KitchenOrder> {
        input.validate().map_err(ManagerError::Validation)?;

        let _write = self.write_lock.lock();
        let mut attempt = 1;
        let order = loop {
            let order = KitchenOrder::new_pending(next_id(), &input, now);
            match self.storage.insert(&order) {
                Ok(()) => break order,
                Err(StorageError::DuplicateId(id)) if attempt < MAX_ID_ATTEMPTS => {
                    tracing::warn!(order_id = id, attempt, "Kitchen order id already in use, drawing a new one");
                    attempt += 1;
                }
                Err(e) => return Err(e.into()),
            }
        };

        tracing::info!(
            order_id = order.id,
            kitchen_id = order.restaurant_id,
            menu_item_id = order.menu_item_id,
            batch_number = order.batch_number,
            "Kitchen order created"
        );
        self.broadcast(
            order.restaurant_id,
            KitchenEvent::OrderCreated {
                order: order.clone(),
            },
        );
        Ok(order)
    }

    // ========== Commands ==========

    pub fn start_timer(&self, order_id: i64, cooking_time_minutes: u32) -> ManagerResult<KitchenOrder> {
        self.start_timer_at(order_id, cooking_time_minutes, now_millis())
    }

    pub fn start_timer_at(
        &self,
        order_id: i64,
        cooking_time_minutes: u32,
        now: i64,
    ) -> ManagerResult<KitchenOrder> {
        let action = KitchenAction::StartTimer {
            cooking_time_minutes,
        };
        let _write = self.write_lock.lock();
        let order = self.transition(order_id, action, now)?;
        self.broadcast(order.restaurant_id, KitchenEvent::OrderUpdated { order: order.clone() });
        Ok(order)
    }

    /// Re-open the cook window of an expired order; `None` uses 20 seconds
    pub fn add_time(&self, order_id: i64, extra_seconds: Option<u32>) -> ManagerResult<KitchenOrder> {
        self.add_time_at(order_id, extra_seconds, now_millis())
    }

    pub fn add_time_at(
        &self,
        order_id: i64,
        extra_seconds: Option<u32>,
        now: i64,
    ) -> ManagerResult<KitchenOrder> {
        let action = KitchenAction::AddTime {
            extra_seconds: extra_seconds.unwrap_or(DEFAULT_EXTRA_SECONDS),
        };
        let _write = self.write_lock.lock();
        let order = self.transition(order_id, action, now)?;
        self.broadcast(order.restaurant_id, KitchenEvent::OrderUpdated { order: order.clone() });
        Ok(order)
    }

    pub fn mark_ready(&self, order_id: i64) -> ManagerResult<KitchenOrder> {
        self.mark_ready_at(order_id, now_millis())
    }

    pub fn mark_ready_at(&self, order_id: i64, now: i64) -> ManagerResult<KitchenOrder> {
        let _write = self.write_lock.lock();
        let order = self.transition(order_id, KitchenAction::MarkReady, now)?;
        self.broadcast(order.restaurant_id, KitchenEvent::OrderUpdated { order: order.clone() });
        Ok(order)
    }

    pub fn complete(&self, order_id: i64) -> ManagerResult<KitchenOrder> {
        self.complete_at(order_id, now_millis())
    }

    pub fn complete_at(&self, order_id: i64, now: i64) -> ManagerResult<KitchenOrder> {
        let _write = self.write_lock.lock();
        let order = self.transition(order_id, KitchenAction::Complete, now)?;
        self.broadcast(
            order.restaurant_id,
            KitchenEvent::OrderCompleted {
                order: order.clone(),
            },
        );
        Ok(order)
    }

    /// Complete and purge in one transaction
    ///
    /// A crash can leave either the untouched order or nothing, never a
    /// `completed` record. Subscribers see `OrderCompleted` then `OrderDeleted`.
    pub fn complete_and_remove(&self, order_id: i64) -> ManagerResult<KitchenOrder> {
        self.complete_and_remove_at(order_id, now_millis())
    }

    pub fn complete_and_remove_at(&self, order_id: i64, now: i64) -> ManagerResult<KitchenOrder> {
        let _write = self.write_lock.lock();
        let completed = self
            .storage
            .mutate(order_id, |current| {
                let completed = KitchenAction::Complete
                    .apply(current, now)?
                    .ok_or(ManagerError::OrderNotFound(order_id))?;
                Ok::<_, ManagerError>((Mutation::Remove, completed))
            })?
            .ok_or(ManagerError::OrderNotFound(order_id))?;

        tracing::info!(order_id, kitchen_id = completed.restaurant_id, "Kitchen order completed and removed");
        self.broadcast(
            completed.restaurant_id,
            KitchenEvent::OrderCompleted {
                order: completed.clone(),
            },
        );
        self.broadcast(completed.restaurant_id, KitchenEvent::OrderDeleted { order_id });
        Ok(completed)
    }

    /// Hard-delete an order in any status
    pub fn delete(&self, order_id: i64) -> ManagerResult<()> {
        let _write = self.write_lock.lock();
        let removed = self
            .storage
            .remove(order_id)?
            .ok_or(ManagerError::OrderNotFound(order_id))?;

        tracing::info!(
            order_id,
            kitchen_id = removed.restaurant_id,
            status = %removed.status,
            "Kitchen order deleted"
        );
        self.broadcast(removed.restaurant_id, KitchenEvent::OrderDeleted { order_id });
        Ok(())
    }

    /// Administrative reset of one kitchen, returns the number removed
    pub fn delete_all(&self, kitchen_id: i64) -> ManagerResult<usize> {
        let _write = self.write_lock.lock();
        let removed = self.storage.remove_all(kitchen_id)?;
        tracing::info!(kitchen_id, removed = removed.len(), "All kitchen orders deleted");
        self.broadcast(kitchen_id, KitchenEvent::AllOrdersDeleted);
        Ok(removed.len())
    }

    // ========== Queries ==========

    pub fn list_orders(&self, kitchen_id: i64) -> ManagerResult<Vec<KitchenOrder>> {
        Ok(self.storage.list_by_kitchen(kitchen_id)?)
    }

    pub fn get_order(&self, order_id: i64) -> ManagerResult<KitchenOrder> {
        self.storage
            .get(order_id)?
            .ok_or(ManagerError::OrderNotFound(order_id))
    }

    // ========== Timer sweep ==========

    /// Expire every cooking order whose window has elapsed at `now`
    ///
    /// A concurrent call returns [`SweepReport::skipped`] immediately. Errors
    /// on single orders are logged and left for the next pass.
    pub fn sweep_expired(&self, now: i64) -> SweepReport {
        if self.sweeping.swap(true, Ordering::AcqRel) {
            tracing::debug!("Timer sweep still running, tick skipped");
            return SweepReport::skipped();
        }
        let _guard = SweepGuard(&self.sweeping);

        let due = match self.storage.list_due_timers(now) {
            Ok(due) => due,
            Err(e) => {
                tracing::warn!(error = %e, "Timer sweep could not scan cooking timers");
                return SweepReport {
                    failed: 1,
                    ..SweepReport::default()
                };
            }
        };

        let mut report = SweepReport {
            scanned: due.len(),
            ..SweepReport::default()
        };

        for order_id in due {
            let _write = self.write_lock.lock();
            let result = self.storage.mutate(order_id, |current| {
                match KitchenAction::SweepTick.apply(current, now) {
                    Ok(Some(next)) => Ok((Mutation::Update(next.clone()), Some(next))),
                    Ok(None) => Ok((Mutation::Unchanged, None)),
                    Err(e) => Err(ManagerError::from(e)),
                }
            });

            match result {
                Ok(Some(Some(order))) => {
                    tracing::info!(
                        order_id,
                        kitchen_id = order.restaurant_id,
                        "Kitchen timer expired"
                    );
                    report.expired.push(order_id);
                    self.broadcast(order.restaurant_id, KitchenEvent::OrderUpdated { order });
                }
                // Already handled by a command or a previous pass
                Ok(Some(None)) | Ok(None) => {}
                Err(e) => {
                    tracing::warn!(order_id, error = %e, "Timer sweep failed for order, retrying next tick");
                    report.failed += 1;
                }
            }
        }

        report
    }

    // ========== Internals ==========

    /// Apply a command action; the caller holds `write_lock`
    fn transition(&self, order_id: i64, action: KitchenAction, now: i64) -> ManagerResult<KitchenOrder> {
        let order = self
            .storage
            .mutate(order_id, |current| {
                let next = action
                    .apply(current, now)?
                    .ok_or(ManagerError::InvalidTransition {
                        order_id,
                        status: current.status,
                        action: action.name(),
                    })?;
                Ok::<_, ManagerError>((Mutation::Update(next.clone()), next))
            })?
            .ok_or(ManagerError::OrderNotFound(order_id))?;

        tracing::info!(
            order_id,
            kitchen_id = order.restaurant_id,
            action = action.name(),
            status = %order.status,
            "Kitchen order updated"
        );
        Ok(order)
    }

    /// Fire-and-forget fan-out after commit, under `write_lock`
    fn broadcast(&self, kitchen_id: i64, event: KitchenEvent) {
        let kind = event.kind();
        let delivered = self.hub.publish(kitchen_id, event);
        tracing::debug!(kitchen_id, event = kind, delivered, "Kitchen event published");
    }
}

#[cfg(test)]
mod tests;
