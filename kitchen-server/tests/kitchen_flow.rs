//! 厨房订单流程测试 - 真实 redb 文件 + 真实线程
//!
//! 使用 ServerState::initialize 完整初始化

use std::sync::{Arc, Barrier};
use std::thread;

use kitchen_display::{AlarmCommand, Reconciler, Update};
use kitchen_server::kitchen::ManagerError;
use kitchen_server::{Config, ServerState};
use shared::kitchen::{KitchenEvent, KitchenOrder, KitchenOrderStatus, NewKitchenOrder};
use shared::util::now_millis;

const KITCHEN: i64 = 21;

fn setup() -> (tempfile::TempDir, ServerState) {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::with_overrides(dir.path().to_string_lossy(), 0);
    let state = ServerState::initialize(&config).unwrap();
    (dir, state)
}

fn new_order(menu_item_id: i64) -> NewKitchenOrder {
    NewKitchenOrder {
        restaurant_id: KITCHEN,
        table_section: 1,
        menu_item_id,
        batch_number: 1,
        batch_size: 6,
    }
}

fn create(state: &ServerState, now: i64) -> KitchenOrder {
    state.manager.create_order_at(new_order(3), now).unwrap()
}

fn drain(rx: &mut tokio::sync::mpsc::Receiver<KitchenEvent>) -> Vec<KitchenEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

#[test]
fn scenario_a_start_timer_opens_cook_window() {
    let (_dir, state) = setup();
    let now = now_millis();
    let order = create(&state, now);
    assert_eq!(order.status, KitchenOrderStatus::Pending);

    let cooking = state.manager.start_timer_at(order.id, 10, now + 5).unwrap();
    assert_eq!(cooking.status, KitchenOrderStatus::Cooking);
    assert_eq!(cooking.timer_end.unwrap() - cooking.timer_start.unwrap(), 600_000);
}

#[test]
fn scenario_b_sweep_expires_once() {
    let (_dir, state) = setup();
    let now = now_millis();
    let order = create(&state, now - 61_000);
    state.manager.start_timer_at(order.id, 1, now - 61_000).unwrap();
    let mut rx = state.hub().join(KITCHEN, "pass");

    let report = state.manager.sweep_expired(now);
    assert_eq!(report.expired, vec![order.id]);
    assert_eq!(
        state.manager.get_order(order.id).unwrap().status,
        KitchenOrderStatus::TimerExpired
    );

    let report = state.manager.sweep_expired(now + 1_000);
    assert!(report.expired.is_empty());

    let events = drain(&mut rx);
    assert_eq!(events.len(), 1);
    assert!(matches!(
        &events[0],
        KitchenEvent::OrderUpdated { order: o } if o.status == KitchenOrderStatus::TimerExpired
    ));
}

#[test]
fn scenario_c_add_time_restarts_and_silences_alarm() {
    let (_dir, state) = setup();
    let now = now_millis();
    let order = create(&state, now - 61_000);
    state.manager.start_timer_at(order.id, 1, now - 61_000).unwrap();
    state.manager.sweep_expired(now);

    let mut display = Reconciler::new(10_000);
    let outcome = display.merge(
        Update::Snapshot(state.manager.list_orders(KITCHEN).unwrap()),
        now,
    );
    assert_eq!(outcome.newly_expired, vec![order.id]);
    assert_eq!(outcome.alarm, AlarmCommand::Start);

    let later = now + 2_000;
    let resumed = state.manager.add_time_at(order.id, Some(20), later).unwrap();
    assert_eq!(resumed.status, KitchenOrderStatus::Cooking);
    assert_eq!(resumed.timer_end, Some(later + 20_000));

    let outcome = display.merge(
        Update::Event(KitchenEvent::OrderUpdated { order: resumed }),
        later,
    );
    assert_eq!(outcome.alarm, AlarmCommand::Stop);
}

#[test]
fn scenario_d_complete_then_delete() {
    let (_dir, state) = setup();
    let now = now_millis();
    let order = create(&state, now);
    state.manager.start_timer_at(order.id, 4, now).unwrap();
    let mut rx = state.hub().join(KITCHEN, "pass");

    state.manager.complete_at(order.id, now + 10).unwrap();
    state.manager.delete(order.id).unwrap();

    assert!(state.manager.list_orders(KITCHEN).unwrap().is_empty());
    let events = drain(&mut rx);
    assert!(matches!(events[0], KitchenEvent::OrderCompleted { .. }));
    assert_eq!(events[1], KitchenEvent::OrderDeleted { order_id: order.id });
}

#[test]
fn scenario_e_add_time_on_pending_is_rejected() {
    let (_dir, state) = setup();
    let order = create(&state, now_millis());

    let err = state.manager.add_time(order.id, Some(20)).unwrap_err();
    assert!(matches!(
        err,
        ManagerError::InvalidTransition {
            status: KitchenOrderStatus::Pending,
            ..
        }
    ));
    assert_eq!(state.manager.get_order(order.id).unwrap(), order);
}

#[test]
fn concurrent_start_timer_has_one_winner() {
    let (_dir, state) = setup();

    for round in 0..20 {
        let order = create(&state, now_millis());
        let barrier = Arc::new(Barrier::new(2));

        let handles: Vec<_> = (0..2)
            .map(|i| {
                let manager = state.manager.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    manager.start_timer(order.id, 5 + i)
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let wins = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(wins, 1, "round {round}");
        assert!(results.iter().any(|r| matches!(
            r,
            Err(ManagerError::InvalidTransition {
                status: KitchenOrderStatus::Cooking,
                ..
            })
        )));

        let stored = state.manager.get_order(order.id).unwrap();
        let winner = results.into_iter().find_map(Result::ok).unwrap();
        assert_eq!(stored.timer_start, winner.timer_start);
        assert_eq!(stored.timer_end, winner.timer_end);
    }
}

#[test]
fn concurrent_commands_and_sweep_keep_invariants() {
    let (_dir, state) = setup();
    let now = now_millis();
    let ids: Vec<i64> = (0..30)
        .map(|_| {
            let order = create(&state, now - 120_000);
            state.manager.start_timer_at(order.id, 1, now - 61_000).unwrap();
            order.id
        })
        .collect();

    let sweeper = {
        let manager = state.manager.clone();
        thread::spawn(move || {
            for _ in 0..10 {
                manager.sweep_expired(now_millis());
            }
        })
    };
    let completer = {
        let manager = state.manager.clone();
        let ids = ids.clone();
        thread::spawn(move || {
            for id in ids.iter().step_by(2) {
                // may lose against the sweep or win; both are fine
                let _ = manager.complete(*id);
            }
        })
    };
    sweeper.join().unwrap();
    completer.join().unwrap();
    state.manager.sweep_expired(now_millis());

    for order in state.manager.list_orders(KITCHEN).unwrap() {
        order.check_invariants().unwrap();
        assert!(matches!(
            order.status,
            KitchenOrderStatus::TimerExpired | KitchenOrderStatus::Completed
        ));
    }
    assert_eq!(state.manager.storage().cooking_count().unwrap(), 0);
}

#[test]
fn events_arrive_in_commit_order_under_races() {
    let (_dir, state) = setup();
    let now = now_millis();
    let ids: Vec<i64> = (0..40)
        .map(|_| {
            let order = create(&state, now - 120_000);
            state.manager.start_timer_at(order.id, 1, now - 61_000).unwrap();
            order.id
        })
        .collect();
    let mut rx = state.manager.hub().join(KITCHEN, "display-1");

    let barrier = Arc::new(Barrier::new(2));
    let sweeper = {
        let manager = state.manager.clone();
        let barrier = barrier.clone();
        thread::spawn(move || {
            barrier.wait();
            for _ in 0..5 {
                manager.sweep_expired(now_millis());
            }
        })
    };
    let deleter = {
        let manager = state.manager.clone();
        let barrier = barrier.clone();
        let ids = ids.clone();
        thread::spawn(move || {
            barrier.wait();
            for id in ids.iter().rev().step_by(2) {
                manager.delete(*id).unwrap();
            }
        })
    };
    sweeper.join().unwrap();
    deleter.join().unwrap();

    let events = drain(&mut rx);
    let mut deleted = std::collections::HashSet::new();
    for event in &events {
        match event {
            KitchenEvent::OrderDeleted { order_id } => {
                assert!(deleted.insert(*order_id));
            }
            KitchenEvent::OrderUpdated { order } => {
                assert!(!deleted.contains(&order.id), "update for {} after its delete", order.id);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    // a display fed only these events ends up matching the store
    let mut reconciler = Reconciler::new(10_000);
    reconciler.merge(Update::Snapshot(Vec::new()), now);
    for event in events {
        reconciler.merge(Update::Event(event), now);
    }
    for id in &ids {
        match state.manager.get_order(*id) {
            Ok(order) => {
                assert_eq!(order.status, KitchenOrderStatus::TimerExpired);
                assert_eq!(reconciler.get(*id), Some(&order));
            }
            Err(ManagerError::OrderNotFound(_)) => assert!(reconciler.get(*id).is_none()),
            Err(e) => panic!("unexpected error: {e}"),
        }
    }
}

#[test]
fn orders_survive_restart() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::with_overrides(dir.path().to_string_lossy(), 0);
    let now = now_millis();

    let id = {
        let state = ServerState::initialize(&config).unwrap();
        let order = create(&state, now);
        state.manager.start_timer_at(order.id, 3, now).unwrap();
        order.id
    };

    let state = ServerState::initialize(&config).unwrap();
    let order = state.manager.get_order(id).unwrap();
    assert_eq!(order.status, KitchenOrderStatus::Cooking);
    assert_eq!(state.manager.storage().cooking_count().unwrap(), 1);

    // the restarted sweep picks the timer up again
    let report = state.manager.sweep_expired(now + 180_000);
    assert_eq!(report.expired, vec![id]);
}
