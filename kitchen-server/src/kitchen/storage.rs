//! redb-based storage for in-flight kitchen orders
//!
//! # Tables
//!
//! | Table | Key | Value | Purpose |
//! |-------|-----|-------|---------|
//! | `orders` | `order_id` | `KitchenOrder` (JSON) | Order records |
//! | `kitchen_orders` | `(restaurant_id, order_id)` | `()` | Per-kitchen index |
//! | `cooking_timers` | `order_id` | `timer_end` | Orders in `cooking`, scanned by the sweep |
//!
//! # Serialization
//!
//! redb admits one write transaction at a time. Every mutation reads, checks
//! and writes inside the same transaction, so two commands on one order never
//! interleave: the second one sees the first one's result.

use redb::{
    Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition,
    WriteTransaction,
};
use shared::kitchen::{KitchenOrder, KitchenOrderStatus};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Order records: key = order_id, value = JSON-serialized KitchenOrder
const ORDERS_TABLE: TableDefinition<i64, &[u8]> = TableDefinition::new("orders");

/// Kitchen index: key = (restaurant_id, order_id), value = empty
const KITCHEN_ORDERS_TABLE: TableDefinition<(i64, i64), ()> =
    TableDefinition::new("kitchen_orders");

/// Running timers: key = order_id, value = timer_end (unix millis)
const COOKING_TIMERS_TABLE: TableDefinition<i64, i64> = TableDefinition::new("cooking_timers");

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Order id already in use: {0}")]
    DuplicateId(i64),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// What a [`KitchenStorage::mutate`] closure wants written back
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    /// Nothing to write
    Unchanged,
    /// Replace the stored record
    Update(KitchenOrder),
    /// Purge the record and its index entries
    Remove,
}

/// Kitchen order storage backed by redb
#[derive(Clone)]
pub struct KitchenStorage {
    db: Arc<Database>,
}

impl std::fmt::Debug for KitchenStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KitchenStorage").finish_non_exhaustive()
    }
}

impl KitchenStorage {
    /// Open or create the database at the given path
    ///
    /// redb commits with `Durability::Immediate` by default: once `commit()`
    /// returns the change survives a power loss, so a completed-and-removed
    /// order can never come back after a restart.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let db = Database::create(path)?;
        Self::init(db)
    }

    /// Open an in-memory database (tests)
    pub fn open_in_memory() -> StorageResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        Self::init(db)
    }

    fn init(db: Database) -> StorageResult<Self> {
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(ORDERS_TABLE)?;
            let _ = write_txn.open_table(KITCHEN_ORDERS_TABLE)?;
            let _ = write_txn.open_table(COOKING_TIMERS_TABLE)?;
        }
        write_txn.commit()?;
        Ok(Self { db: Arc::new(db) })
    }

    // ========== Writes ==========

    /// Store a new order and index it
    ///
    /// Fails with [`StorageError::DuplicateId`] when the id is taken; the
    /// stored order is left as it was.
    pub fn insert(&self, order: &KitchenOrder) -> StorageResult<()> {
        let txn = self.db.begin_write()?;
        let taken = {
            let orders = txn.open_table(ORDERS_TABLE)?;
            orders.get(order.id)?.is_some()
        };
        if taken {
            txn.abort()?;
            return Err(StorageError::DuplicateId(order.id));
        }
        Self::write_order(&txn, order)?;
        txn.commit()?;
        Ok(())
    }

    /// Read-check-write one order inside a single write transaction
    ///
    /// The closure sees the current record and decides what to write back;
    /// its second return value is handed to the caller. Returns `Ok(None)`
    /// when the order does not exist. An `Err` from the closure aborts the
    /// transaction without writing anything.
    pub fn mutate<T, E, F>(&self, order_id: i64, f: F) -> Result<Option<T>, E>
    where
        F: FnOnce(&KitchenOrder) -> Result<(Mutation, T), E>,
        E: From<StorageError>,
    {
        let txn = self.db.begin_write().map_err(StorageError::from)?;

        let current = Self::read_order_txn(&txn, order_id)?;
        let Some(current) = current else {
            txn.abort().map_err(StorageError::from)?;
            return Ok(None);
        };

        let (mutation, output) = f(&current)?;
        match mutation {
            Mutation::Unchanged => {
                txn.abort().map_err(StorageError::from)?;
                return Ok(Some(output));
            }
            Mutation::Update(next) => Self::write_order(&txn, &next)?,
            Mutation::Remove => Self::delete_order(&txn, &current)?,
        }

        txn.commit().map_err(StorageError::from)?;
        Ok(Some(output))
    }

    /// Remove one order, returning the record that was stored
    pub fn remove(&self, order_id: i64) -> StorageResult<Option<KitchenOrder>> {
        let txn = self.db.begin_write()?;
        let removed = Self::read_order_txn(&txn, order_id)?;
        if let Some(order) = &removed {
            Self::delete_order(&txn, order)?;
        }
        txn.commit()?;
        Ok(removed)
    }

    /// Remove every order of a kitchen, returning the removed ids
    pub fn remove_all(&self, restaurant_id: i64) -> StorageResult<Vec<i64>> {
        let txn = self.db.begin_write()?;
        let ids = {
            let index = txn.open_table(KITCHEN_ORDERS_TABLE)?;
            let mut ids = Vec::new();
            for entry in index.range((restaurant_id, i64::MIN)..=(restaurant_id, i64::MAX))? {
                let (key, _) = entry?;
                ids.push(key.value().1);
            }
            ids
        };
        {
            let mut orders = txn.open_table(ORDERS_TABLE)?;
            let mut index = txn.open_table(KITCHEN_ORDERS_TABLE)?;
            let mut timers = txn.open_table(COOKING_TIMERS_TABLE)?;
            for id in &ids {
                orders.remove(*id)?;
                index.remove((restaurant_id, *id))?;
                timers.remove(*id)?;
            }
        }
        txn.commit()?;
        Ok(ids)
    }

    // ========== Reads ==========

    /// Get one order
    pub fn get(&self, order_id: i64) -> StorageResult<Option<KitchenOrder>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(ORDERS_TABLE)?;
        match table.get(order_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// All orders of a kitchen, oldest first
    pub fn list_by_kitchen(&self, restaurant_id: i64) -> StorageResult<Vec<KitchenOrder>> {
        let txn = self.db.begin_read()?;
        let index = txn.open_table(KITCHEN_ORDERS_TABLE)?;
        let orders = txn.open_table(ORDERS_TABLE)?;

        let mut result = Vec::new();
        for entry in index.range((restaurant_id, i64::MIN)..=(restaurant_id, i64::MAX))? {
            let (key, _) = entry?;
            let (_, order_id) = key.value();
            if let Some(value) = orders.get(order_id)? {
                result.push(serde_json::from_slice::<KitchenOrder>(value.value())?);
            }
        }
        result.sort_by_key(|o| (o.created_at, o.id));
        Ok(result)
    }

    /// Ids of cooking orders whose window has elapsed at `now`
    pub fn list_due_timers(&self, now: i64) -> StorageResult<Vec<i64>> {
        let txn = self.db.begin_read()?;
        let timers = txn.open_table(COOKING_TIMERS_TABLE)?;
        let mut due = Vec::new();
        for entry in timers.iter()? {
            let (id, end) = entry?;
            if end.value() <= now {
                due.push(id.value());
            }
        }
        Ok(due)
    }

    /// Number of stored orders
    pub fn count(&self) -> StorageResult<u64> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(ORDERS_TABLE)?;
        Ok(table.len()?)
    }

    /// Number of running timers
    pub fn cooking_count(&self) -> StorageResult<u64> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(COOKING_TIMERS_TABLE)?;
        Ok(table.len()?)
    }

    // ========== Transaction helpers ==========

    fn read_order_txn(txn: &WriteTransaction, order_id: i64) -> StorageResult<Option<KitchenOrder>> {
        let table = txn.open_table(ORDERS_TABLE)?;
        let order = match table.get(order_id)? {
            Some(value) => Some(serde_json::from_slice(value.value())?),
            None => None,
        };
        Ok(order)
    }

    /// Write the record and keep both indexes in line with its status
    fn write_order(txn: &WriteTransaction, order: &KitchenOrder) -> StorageResult<()> {
        let value = serde_json::to_vec(order)?;
        {
            let mut orders = txn.open_table(ORDERS_TABLE)?;
            orders.insert(order.id, value.as_slice())?;
        }
        {
            let mut index = txn.open_table(KITCHEN_ORDERS_TABLE)?;
            index.insert((order.restaurant_id, order.id), ())?;
        }
        {
            let mut timers = txn.open_table(COOKING_TIMERS_TABLE)?;
            match (order.status, order.timer_end) {
                (KitchenOrderStatus::Cooking, Some(end)) => {
                    timers.insert(order.id, end)?;
                }
                _ => {
                    timers.remove(order.id)?;
                }
            }
        }
        Ok(())
    }

    fn delete_order(txn: &WriteTransaction, order: &KitchenOrder) -> StorageResult<()> {
        {
            let mut orders = txn.open_table(ORDERS_TABLE)?;
            orders.remove(order.id)?;
        }
        {
            let mut index = txn.open_table(KITCHEN_ORDERS_TABLE)?;
            index.remove((order.restaurant_id, order.id))?;
        }
        {
            let mut timers = txn.open_table(COOKING_TIMERS_TABLE)?;
            timers.remove(order.id)?;
        }
        Ok(())
    }
}
