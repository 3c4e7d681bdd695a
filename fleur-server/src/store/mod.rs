//! redb-based storage layer for the storefront
//!
//! # Tables
//!
//! | Table | Key | Value | Purpose |
//! |-------|-----|-------|---------|
//! | `categories` | category id | `Category` | Catalog |
//! | `products` | product id | `Product` | Catalog |
//! | `slots` | slot id | `Slot` | Cabinet inventory |
//! | `slot_codes` | slot code | slot id | Unique-code index |
//! | `orders` | order id | `Order` | Purchase intents |
//! | `payments` | payment id | `Payment` | Money collection |
//! | `order_payments` | order id | payment id | 1-1 index |
//!
//! # Concurrency
//!
//! redb allows exactly one write transaction at a time; `begin_write` blocks
//! until the previous writer commits or aborts. Every read-modify-write on a
//! payment or a slot runs inside one write transaction, which is the
//! pessimistic lock the fulfillment path relies on. Dropping a write
//! transaction without committing aborts it.

pub mod models;

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition, WriteTransaction};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

pub use models::{Category, Order, OrderStatus, Payment, PaymentStatus, Product, Slot};

const CATEGORIES_TABLE: TableDefinition<i64, &[u8]> = TableDefinition::new("categories");
const PRODUCTS_TABLE: TableDefinition<i64, &[u8]> = TableDefinition::new("products");
const SLOTS_TABLE: TableDefinition<i64, &[u8]> = TableDefinition::new("slots");
const SLOT_CODES_TABLE: TableDefinition<&str, i64> = TableDefinition::new("slot_codes");
const ORDERS_TABLE: TableDefinition<i64, &[u8]> = TableDefinition::new("orders");
const PAYMENTS_TABLE: TableDefinition<i64, &[u8]> = TableDefinition::new("payments");
const ORDER_PAYMENTS_TABLE: TableDefinition<i64, i64> = TableDefinition::new("order_payments");

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

    #[error("Slot code already exists: {0}")]
    SlotCodeExists(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Embedded store backed by redb
#[derive(Clone)]
pub struct Store {
    db: Arc<Database>,
}

impl Store {
    /// Open or create the database at the given path
    ///
    /// redb commits with `Durability::Immediate`: once `commit()` returns the
    /// data survives power loss, which matters for a kiosk that collects
    /// physical cash.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let db = Database::create(path)?;
        let store = Self { db: Arc::new(db) };
        store.init_tables()?;
        Ok(store)
    }

    /// Open an in-memory database (tests, ephemeral demo mode)
    pub fn open_in_memory() -> StorageResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        let store = Self { db: Arc::new(db) };
        store.init_tables()?;
        Ok(store)
    }

    fn init_tables(&self) -> StorageResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            let _ = write_txn.open_table(CATEGORIES_TABLE)?;
            let _ = write_txn.open_table(PRODUCTS_TABLE)?;
            let _ = write_txn.open_table(SLOTS_TABLE)?;
            let _ = write_txn.open_table(SLOT_CODES_TABLE)?;
            let _ = write_txn.open_table(ORDERS_TABLE)?;
            let _ = write_txn.open_table(PAYMENTS_TABLE)?;
            let _ = write_txn.open_table(ORDER_PAYMENTS_TABLE)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Begin a write transaction (blocks while another writer is active)
    pub fn begin_write(&self) -> StorageResult<WriteTransaction> {
        Ok(self.db.begin_write()?)
    }

    // ========== Categories ==========

    pub fn put_category(&self, txn: &WriteTransaction, category: &Category) -> StorageResult<()> {
        let mut table = txn.open_table(CATEGORIES_TABLE)?;
        let value = serde_json::to_vec(category)?;
        table.insert(category.id, value.as_slice())?;
        Ok(())
    }

    pub fn get_category(&self, id: i64) -> StorageResult<Option<Category>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(CATEGORIES_TABLE)?;
        match table.get(id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    pub fn list_categories(&self) -> StorageResult<Vec<Category>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(CATEGORIES_TABLE)?;
        let mut categories = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            categories.push(serde_json::from_slice::<Category>(value.value())?);
        }
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    // ========== Products ==========

    pub fn put_product(&self, txn: &WriteTransaction, product: &Product) -> StorageResult<()> {
        let mut table = txn.open_table(PRODUCTS_TABLE)?;
        let value = serde_json::to_vec(product)?;
        table.insert(product.id, value.as_slice())?;
        Ok(())
    }

    pub fn get_product(&self, id: i64) -> StorageResult<Option<Product>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PRODUCTS_TABLE)?;
        match table.get(id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    pub fn get_product_txn(
        &self,
        txn: &WriteTransaction,
        id: i64,
    ) -> StorageResult<Option<Product>> {
        let table = txn.open_table(PRODUCTS_TABLE)?;
        match table.get(id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    pub fn list_products(&self) -> StorageResult<Vec<Product>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PRODUCTS_TABLE)?;
        let mut products = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            products.push(serde_json::from_slice::<Product>(value.value())?);
        }
        products.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(products)
    }

    // ========== Slots ==========

    /// Insert or update a slot, maintaining the unique code index
    ///
    /// Fails with [`StorageError::SlotCodeExists`] when another slot already
    /// holds the code.
    pub fn put_slot(&self, txn: &WriteTransaction, slot: &Slot) -> StorageResult<()> {
        let mut codes = txn.open_table(SLOT_CODES_TABLE)?;
        if let Some(existing) = codes.get(slot.code.as_str())?
            && existing.value() != slot.id
        {
            return Err(StorageError::SlotCodeExists(slot.code.clone()));
        }
        codes.insert(slot.code.as_str(), slot.id)?;
        drop(codes);

        let mut table = txn.open_table(SLOTS_TABLE)?;
        let value = serde_json::to_vec(slot)?;
        table.insert(slot.id, value.as_slice())?;
        Ok(())
    }

    pub fn get_slot(&self, id: i64) -> StorageResult<Option<Slot>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(SLOTS_TABLE)?;
        match table.get(id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    pub fn get_slot_txn(&self, txn: &WriteTransaction, id: i64) -> StorageResult<Option<Slot>> {
        let table = txn.open_table(SLOTS_TABLE)?;
        match table.get(id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    pub fn find_slot_by_code(&self, code: &str) -> StorageResult<Option<Slot>> {
        let read_txn = self.db.begin_read()?;
        let codes = read_txn.open_table(SLOT_CODES_TABLE)?;
        let id = match codes.get(code)? {
            Some(guard) => guard.value(),
            None => return Ok(None),
        };
        let table = read_txn.open_table(SLOTS_TABLE)?;
        match table.get(id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    pub fn list_slots(&self) -> StorageResult<Vec<Slot>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(SLOTS_TABLE)?;
        let mut slots = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            slots.push(serde_json::from_slice::<Slot>(value.value())?);
        }
        slots.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(slots)
    }

    // ========== Orders ==========

    pub fn put_order(&self, txn: &WriteTransaction, order: &Order) -> StorageResult<()> {
        let mut table = txn.open_table(ORDERS_TABLE)?;
        let value = serde_json::to_vec(order)?;
        table.insert(order.id, value.as_slice())?;
        Ok(())
    }

    pub fn get_order(&self, id: i64) -> StorageResult<Option<Order>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ORDERS_TABLE)?;
        match table.get(id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    pub fn get_order_txn(&self, txn: &WriteTransaction, id: i64) -> StorageResult<Option<Order>> {
        let table = txn.open_table(ORDERS_TABLE)?;
        match table.get(id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    pub fn list_orders(&self) -> StorageResult<Vec<Order>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ORDERS_TABLE)?;
        let mut orders = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            orders.push(serde_json::from_slice::<Order>(value.value())?);
        }
        orders.sort_by_key(|o| std::cmp::Reverse(o.created_at));
        Ok(orders)
    }

    // ========== Payments ==========

    /// Insert or update a payment, maintaining the order -> payment index
    pub fn put_payment(&self, txn: &WriteTransaction, payment: &Payment) -> StorageResult<()> {
        let mut index = txn.open_table(ORDER_PAYMENTS_TABLE)?;
        index.insert(payment.order_id, payment.id)?;
        drop(index);

        let mut table = txn.open_table(PAYMENTS_TABLE)?;
        let value = serde_json::to_vec(payment)?;
        table.insert(payment.id, value.as_slice())?;
        Ok(())
    }

    pub fn get_payment(&self, id: i64) -> StorageResult<Option<Payment>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PAYMENTS_TABLE)?;
        match table.get(id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    pub fn get_payment_txn(
        &self,
        txn: &WriteTransaction,
        id: i64,
    ) -> StorageResult<Option<Payment>> {
        let table = txn.open_table(PAYMENTS_TABLE)?;
        match table.get(id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    pub fn payment_id_for_order(&self, order_id: i64) -> StorageResult<Option<i64>> {
        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_table(ORDER_PAYMENTS_TABLE)?;
        Ok(index.get(order_id)?.map(|guard| guard.value()))
    }

    pub fn payment_id_for_order_txn(
        &self,
        txn: &WriteTransaction,
        order_id: i64,
    ) -> StorageResult<Option<i64>> {
        let index = txn.open_table(ORDER_PAYMENTS_TABLE)?;
        Ok(index.get(order_id)?.map(|guard| guard.value()))
    }
}
