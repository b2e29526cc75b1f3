use crate::domain::cart::{Cart, PersistedCart};
use crate::domain::checkout::CheckoutRecord;
use crate::domain::ports::{CartStore, CheckoutJournal};
use crate::error::{Result, StorefrontError};
use async_trait::async_trait;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, Options};
use std::path::Path;
use std::sync::Arc;

/// Column Family for persisted carts.
pub const CF_CARTS: &str = "carts";
/// Column Family for checkout stage records.
pub const CF_CHECKOUTS: &str = "checkouts";

/// A persistent store for carts and checkout records using RocksDB.
///
/// Both are keyed by session id in separate Column Families and stored as
/// JSON. `Clone` shares the underlying `Arc<DB>`.
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at `path`, creating the "carts"
    /// and "checkouts" column families if missing.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_carts = ColumnFamilyDescriptor::new(CF_CARTS, Options::default());
        let cf_checkouts = ColumnFamilyDescriptor::new(CF_CHECKOUTS, Options::default());

        let db = DB::open_cf_descriptors(&opts, path, vec![cf_carts, cf_checkouts])?;

        Ok(Self { db: Arc::new(db) })
    }

    fn cf(&self, name: &str) -> Result<&ColumnFamily> {
        self.db.cf_handle(name).ok_or_else(|| {
            StorefrontError::InternalError(Box::new(std::io::Error::other(format!(
                "{name} column family not found"
            ))))
        })
    }
}

#[async_trait]
impl CartStore for RocksDBStore {
    async fn load(&self, session_id: &str) -> Result<Option<Cart>> {
        let cf = self.cf(CF_CARTS)?;
        match self.db.get_cf(cf, session_id.as_bytes())? {
            Some(bytes) => {
                let persisted: PersistedCart = serde_json::from_slice(&bytes)?;
                persisted.into_cart().map(Some)
            }
            None => Ok(None),
        }
    }

    async fn save(&self, session_id: &str, cart: &Cart) -> Result<()> {
        let cf = self.cf(CF_CARTS)?;
        let value = serde_json::to_vec(&PersistedCart::from_cart(cart))?;
        self.db.put_cf(cf, session_id.as_bytes(), value)?;
        Ok(())
    }

    async fn remove(&self, session_id: &str) -> Result<()> {
        let cf = self.cf(CF_CARTS)?;
        self.db.delete_cf(cf, session_id.as_bytes())?;
        Ok(())
    }
}

#[async_trait]
impl CheckoutJournal for RocksDBStore {
    async fn get(&self, session_id: &str) -> Result<Option<CheckoutRecord>> {
        let cf = self.cf(CF_CHECKOUTS)?;
        match self.db.get_pinned_cf(cf, session_id.as_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn store(&self, session_id: &str, record: &CheckoutRecord) -> Result<()> {
        let cf = self.cf(CF_CHECKOUTS)?;
        let value = serde_json::to_vec(record)?;
        self.db.put_cf(cf, session_id.as_bytes(), value)?;
        Ok(())
    }

    async fn remove(&self, session_id: &str) -> Result<()> {
        let cf = self.cf(CF_CHECKOUTS)?;
        self.db.delete_cf(cf, session_id.as_bytes())?;
        Ok(())
    }
}
