//! Reconciler - 显示屏本地订单表
//!
//! 三个输入来源，统一走 [`Reconciler::merge`]:
//!
//! ```text
//! 初始 ListOrders ─┐
//! WS Ready/Resync ─┼─▶ Update::Snapshot  (ground truth, 整表替换)
//! 轮询 ListOrders ─┘
//! WS Event ──────────▶ Update::Event     (hint, 按 updatedAt 合并)
//! ```
//!
//! 每次合并后执行告警检查: 进入 `timer_expired` 的订单启动告警，
//! 没有任何 `timer_expired` 订单时停止告警。
//!
//! 删除会留下墓碑: 迟到的事件或 HTTP 应答不会让已删除的订单复活。
//! 墓碑在下一次 Snapshot 时清空。

use std::collections::{HashMap, HashSet};

use shared::kitchen::{KitchenEvent, KitchenOrder, KitchenOrderStatus};

use crate::alarm::AlarmCommand;
use crate::countdown::{format_remaining, remaining_seconds};

/// One input to the local table
#[derive(Debug, Clone)]
pub enum Update {
    /// Full list of the kitchen's orders
    Snapshot(Vec<KitchenOrder>),
    /// Single pushed change
    Event(KitchenEvent),
}

/// What the caller has to act on after a merge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileOutcome {
    /// Orders that entered `timer_expired` in this pass
    pub newly_expired: Vec<i64>,
    /// Desired alarm state
    pub alarm: AlarmCommand,
    /// Completed orders past the grace period, to be deleted
    pub stale_completed: Vec<i64>,
}

/// Row handed to the UI
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderView {
    pub order: KitchenOrder,
    pub remaining_seconds: Option<u64>,
    /// `MM:SS`, present when `remaining_seconds` is
    pub countdown: Option<String>,
}

/// 本地订单表 + 告警状态跟踪
#[derive(Debug)]
pub struct Reconciler {
    orders: HashMap<i64, KitchenOrder>,
    /// orderId → lastKnownStatus (告警判断用)
    last_status: HashMap<i64, KitchenOrderStatus>,
    /// Deleted since the last snapshot
    tombstones: HashSet<i64>,
    completed_grace_ms: i64,
    needs_refresh: bool,
}

impl Reconciler {
    pub fn new(completed_grace_ms: i64) -> Self {
        Self {
            orders: HashMap::new(),
            last_status: HashMap::new(),
            tombstones: HashSet::new(),
            completed_grace_ms,
            needs_refresh: true,
        }
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    pub fn get(&self, order_id: i64) -> Option<&KitchenOrder> {
        self.orders.get(&order_id)
    }

    /// A full re-fetch is owed (start-up or a rejected command)
    pub fn needs_refresh(&self) -> bool {
        self.needs_refresh
    }

    pub fn invalidate(&mut self) {
        self.needs_refresh = true;
    }

    /// Merge one update and run the alarm pass
    pub fn merge(&mut self, update: Update, now: i64) -> ReconcileOutcome {
        match update {
            Update::Snapshot(orders) => {
                self.orders = orders.into_iter().map(|o| (o.id, o)).collect();
                self.tombstones.clear();
                self.needs_refresh = false;
            }
            Update::Event(event) => self.apply_event(event),
        }
        self.reconcile(now)
    }

    /// Predict a command's result before the server answers
    ///
    /// `updatedAt` is left alone so the server's answer always wins.
    pub fn apply_optimistic(&mut self, order_id: i64, status: KitchenOrderStatus, now: i64) -> ReconcileOutcome {
        if let Some(order) = self.orders.get_mut(&order_id) {
            order.status = status;
            if status == KitchenOrderStatus::Completed {
                order.completed_at = Some(now);
            }
        }
        self.reconcile(now)
    }

    /// Predict a delete
    pub fn remove_optimistic(&mut self, order_id: i64, now: i64) -> ReconcileOutcome {
        self.bury(order_id);
        self.reconcile(now)
    }

    /// Visible orders, oldest first; completed orders are hidden
    pub fn view(&self, now: i64) -> Vec<OrderView> {
        let mut visible: Vec<&KitchenOrder> = self
            .orders
            .values()
            .filter(|o| o.status != KitchenOrderStatus::Completed)
            .collect();
        visible.sort_by_key(|o| (o.created_at, o.id));

        visible
            .into_iter()
            .map(|order| {
                let remaining = remaining_seconds(order, now);
                OrderView {
                    order: order.clone(),
                    remaining_seconds: remaining,
                    countdown: remaining.map(format_remaining),
                }
            })
            .collect()
    }

    fn apply_event(&mut self, event: KitchenEvent) {
        match event {
            KitchenEvent::OrderCreated { order }
            | KitchenEvent::OrderUpdated { order }
            | KitchenEvent::OrderCompleted { order } => {
                if self.tombstones.contains(&order.id) {
                    tracing::debug!(order_id = order.id, "Ignoring event for deleted kitchen order");
                    return;
                }
                let newer = self
                    .orders
                    .get(&order.id)
                    .is_none_or(|local| order.updated_at >= local.updated_at);
                if newer {
                    self.orders.insert(order.id, order);
                } else {
                    tracing::debug!(order_id = order.id, "Ignoring stale kitchen event");
                }
            }
            KitchenEvent::OrderDeleted { order_id } => self.bury(order_id),
            KitchenEvent::AllOrdersDeleted => {
                self.tombstones.extend(self.orders.keys().copied());
                self.orders.clear();
            }
        }
    }

    fn bury(&mut self, order_id: i64) {
        self.orders.remove(&order_id);
        self.tombstones.insert(order_id);
    }

    /// 告警检查 + 过期完成订单检查，并重建 last_status
    fn reconcile(&mut self, now: i64) -> ReconcileOutcome {
        let mut newly_expired: Vec<i64> = self
            .orders
            .values()
            .filter(|o| o.status == KitchenOrderStatus::TimerExpired)
            .filter(|o| self.last_status.get(&o.id) != Some(&KitchenOrderStatus::TimerExpired))
            .map(|o| o.id)
            .collect();
        newly_expired.sort_unstable();

        let any_expired = self
            .orders
            .values()
            .any(|o| o.status == KitchenOrderStatus::TimerExpired);

        let mut stale_completed: Vec<i64> = self
            .orders
            .values()
            .filter(|o| o.status == KitchenOrderStatus::Completed)
            .filter(|o| {
                o.completed_at
                    .is_none_or(|at| now - at >= self.completed_grace_ms)
            })
            .map(|o| o.id)
            .collect();
        stale_completed.sort_unstable();

        self.last_status = self.orders.values().map(|o| (o.id, o.status)).collect();

        ReconcileOutcome {
            newly_expired,
            alarm: if any_expired {
                AlarmCommand::Start
            } else {
                AlarmCommand::Stop
            },
            stale_completed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::kitchen::NewKitchenOrder;

    const GRACE: i64 = 10_000;

    fn order(id: i64, status: KitchenOrderStatus, updated_at: i64) -> KitchenOrder {
        let input = NewKitchenOrder {
            restaurant_id: 1,
            table_section: 0,
            menu_item_id: 5,
            batch_number: 1,
            batch_size: 2,
        };
        let mut order = KitchenOrder::new_pending(id, &input, id * 10);
        order.status = status;
        order.updated_at = updated_at;
        if status.has_timer() {
            order.timer_start = Some(0);
            order.timer_end = Some(60_000);
        }
        if status == KitchenOrderStatus::Completed {
            order.completed_at = Some(updated_at);
        }
        order
    }

    fn updated(order: KitchenOrder) -> Update {
        Update::Event(KitchenEvent::OrderUpdated { order })
    }

    #[test]
    fn test_snapshot_replaces_table() {
        let mut r = Reconciler::new(GRACE);
        assert!(r.needs_refresh());
        r.merge(Update::Snapshot(vec![order(1, KitchenOrderStatus::Pending, 1)]), 0);
        r.merge(Update::Snapshot(vec![order(2, KitchenOrderStatus::Pending, 1)]), 0);

        assert_eq!(r.len(), 1);
        assert!(r.get(1).is_none());
        assert!(!r.needs_refresh());
    }

    #[test]
    fn test_stale_event_is_ignored() {
        let mut r = Reconciler::new(GRACE);
        r.merge(Update::Snapshot(vec![order(1, KitchenOrderStatus::Cooking, 50)]), 0);

        r.merge(updated(order(1, KitchenOrderStatus::Pending, 40)), 0);
        assert_eq!(r.get(1).unwrap().status, KitchenOrderStatus::Cooking);

        r.merge(updated(order(1, KitchenOrderStatus::Ready, 60)), 0);
        assert_eq!(r.get(1).unwrap().status, KitchenOrderStatus::Ready);
    }

    #[test]
    fn test_delete_events() {
        let mut r = Reconciler::new(GRACE);
        r.merge(
            Update::Snapshot(vec![
                order(1, KitchenOrderStatus::Pending, 1),
                order(2, KitchenOrderStatus::Pending, 1),
            ]),
            0,
        );
        r.merge(Update::Event(KitchenEvent::OrderDeleted { order_id: 1 }), 0);
        assert_eq!(r.len(), 1);
        r.merge(Update::Event(KitchenEvent::AllOrdersDeleted), 0);
        assert!(r.is_empty());
    }

    #[test]
    fn test_late_update_after_delete_is_dropped() {
        let mut r = Reconciler::new(GRACE);
        r.merge(Update::Snapshot(vec![]), 0);

        let out = r.merge(Update::Event(KitchenEvent::OrderDeleted { order_id: 1 }), 0);
        assert_eq!(out.alarm, AlarmCommand::Stop);

        // the sweep's expiry was published before the delete reached us
        let out = r.merge(updated(order(1, KitchenOrderStatus::TimerExpired, 9)), 0);
        assert!(r.is_empty());
        assert!(out.newly_expired.is_empty());
        assert_eq!(out.alarm, AlarmCommand::Stop);
    }

    #[test]
    fn test_command_answer_after_remote_delete_is_dropped() {
        let mut r = Reconciler::new(GRACE);
        r.merge(Update::Snapshot(vec![order(1, KitchenOrderStatus::Pending, 1)]), 0);
        r.apply_optimistic(1, KitchenOrderStatus::Cooking, 0);

        r.merge(Update::Event(KitchenEvent::AllOrdersDeleted), 0);
        r.merge(updated(order(1, KitchenOrderStatus::Cooking, 2)), 0);
        assert!(r.get(1).is_none());

        // a fresh snapshot is ground truth again
        r.merge(Update::Snapshot(vec![order(1, KitchenOrderStatus::Cooking, 2)]), 0);
        assert_eq!(r.get(1).unwrap().status, KitchenOrderStatus::Cooking);
    }

    #[test]
    fn test_alarm_starts_once_per_expiry_and_stops() {
        let mut r = Reconciler::new(GRACE);
        let out = r.merge(Update::Snapshot(vec![order(1, KitchenOrderStatus::Cooking, 1)]), 0);
        assert_eq!(out.alarm, AlarmCommand::Stop);
        assert!(out.newly_expired.is_empty());

        let out = r.merge(updated(order(1, KitchenOrderStatus::TimerExpired, 2)), 0);
        assert_eq!(out.newly_expired, vec![1]);
        assert_eq!(out.alarm, AlarmCommand::Start);

        // a poll seeing the same state keeps the alarm without re-reporting
        let out = r.merge(
            Update::Snapshot(vec![order(1, KitchenOrderStatus::TimerExpired, 2)]),
            0,
        );
        assert!(out.newly_expired.is_empty());
        assert_eq!(out.alarm, AlarmCommand::Start);

        // add-time resolves the last expired order
        let out = r.merge(updated(order(1, KitchenOrderStatus::Cooking, 3)), 0);
        assert_eq!(out.alarm, AlarmCommand::Stop);
    }

    #[test]
    fn test_alarm_keeps_running_while_any_expired() {
        let mut r = Reconciler::new(GRACE);
        let out = r.merge(
            Update::Snapshot(vec![
                order(1, KitchenOrderStatus::TimerExpired, 1),
                order(2, KitchenOrderStatus::TimerExpired, 1),
            ]),
            0,
        );
        assert_eq!(out.newly_expired, vec![1, 2]);

        let out = r.merge(Update::Event(KitchenEvent::OrderDeleted { order_id: 1 }), 0);
        assert_eq!(out.alarm, AlarmCommand::Start);
        let out = r.merge(Update::Event(KitchenEvent::OrderDeleted { order_id: 2 }), 0);
        assert_eq!(out.alarm, AlarmCommand::Stop);
    }

    #[test]
    fn test_optimistic_then_revert() {
        let mut r = Reconciler::new(GRACE);
        r.merge(
            Update::Snapshot(vec![order(1, KitchenOrderStatus::TimerExpired, 5)]),
            0,
        );

        let out = r.apply_optimistic(1, KitchenOrderStatus::Cooking, 0);
        assert_eq!(out.alarm, AlarmCommand::Stop);

        // server rejected the command; the re-fetch brings the expiry back
        r.invalidate();
        let out = r.merge(
            Update::Snapshot(vec![order(1, KitchenOrderStatus::TimerExpired, 5)]),
            0,
        );
        assert_eq!(out.newly_expired, vec![1]);
        assert_eq!(out.alarm, AlarmCommand::Start);
    }

    #[test]
    fn test_completed_hidden_and_purged_after_grace() {
        let mut r = Reconciler::new(GRACE);
        let out = r.merge(
            Update::Snapshot(vec![
                order(1, KitchenOrderStatus::Completed, 1_000),
                order(2, KitchenOrderStatus::Pending, 1),
            ]),
            5_000,
        );
        assert!(out.stale_completed.is_empty());
        assert_eq!(r.view(5_000).len(), 1);

        let out = r.merge(Update::Snapshot(vec![order(1, KitchenOrderStatus::Completed, 1_000)]), 11_000);
        assert_eq!(out.stale_completed, vec![1]);
    }

    #[test]
    fn test_view_order_and_countdown() {
        let mut r = Reconciler::new(GRACE);
        r.merge(
            Update::Snapshot(vec![
                order(3, KitchenOrderStatus::Cooking, 1),
                order(1, KitchenOrderStatus::Pending, 1),
            ]),
            0,
        );
        let view = r.view(15_000);
        assert_eq!(view[0].order.id, 1);
        assert_eq!(view[0].countdown, None);
        assert_eq!(view[1].remaining_seconds, Some(45));
        assert_eq!(view[1].countdown.as_deref(), Some("00:45"));
    }
}
