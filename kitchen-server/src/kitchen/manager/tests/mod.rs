use super::*;
use crate::kitchen::storage::KitchenStorage;
use shared::kitchen::KitchenOrderStatus;
use tokio::sync::mpsc;

const T0: i64 = 1_700_000_000_000;
const KITCHEN: i64 = 1;

fn create_test_manager() -> KitchenManager {
    let storage = KitchenStorage::open_in_memory().unwrap();
    KitchenManager::new(storage, KitchenHub::default())
}

fn new_order(kitchen_id: i64) -> NewKitchenOrder {
    NewKitchenOrder {
        restaurant_id: kitchen_id,
        table_section: 3,
        menu_item_id: 501,
        batch_number: 1,
        batch_size: 4,
    }
}

fn create_pending(manager: &KitchenManager) -> KitchenOrder {
    manager.create_order_at(new_order(KITCHEN), T0).unwrap()
}

/// Pending order started at T0 with a one minute window
fn create_cooking(manager: &KitchenManager) -> KitchenOrder {
    let order = create_pending(manager);
    manager.start_timer_at(order.id, 1, T0).unwrap()
}

/// Cooking order expired by a sweep at T0 + 60s
fn create_expired(manager: &KitchenManager) -> KitchenOrder {
    let order = create_cooking(manager);
    let report = manager.sweep_expired(T0 + 60_000);
    assert!(report.expired.contains(&order.id));
    manager.get_order(order.id).unwrap()
}

fn drain(rx: &mut mpsc::Receiver<KitchenEvent>) -> Vec<KitchenEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
