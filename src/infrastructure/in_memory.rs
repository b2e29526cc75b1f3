use crate::domain::cart::{Cart, PersistedCart};
use crate::domain::checkout::CheckoutRecord;
use crate::domain::ports::{CartStore, CheckoutJournal};
use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A thread-safe in-memory cart store keyed by session id.
///
/// Holds the same `PersistedCart` snapshot a durable store would, so
/// schema checks apply on load here too.
#[derive(Default, Clone)]
pub struct InMemoryCartStore {
    carts: Arc<RwLock<HashMap<String, PersistedCart>>>,
}

impl InMemoryCartStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.carts.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.carts.read().await.is_empty()
    }
}

#[async_trait]
impl CartStore for InMemoryCartStore {
    async fn load(&self, session_id: &str) -> Result<Option<Cart>> {
        let carts = self.carts.read().await;
        carts
            .get(session_id)
            .cloned()
            .map(PersistedCart::into_cart)
            .transpose()
    }

    async fn save(&self, session_id: &str, cart: &Cart) -> Result<()> {
        let mut carts = self.carts.write().await;
        carts.insert(session_id.to_string(), PersistedCart::from_cart(cart));
        Ok(())
    }

    async fn remove(&self, session_id: &str) -> Result<()> {
        self.carts.write().await.remove(session_id);
        Ok(())
    }
}

/// A thread-safe in-memory checkout journal keyed by session id.
#[derive(Default, Clone)]
pub struct InMemoryCheckoutJournal {
    records: Arc<RwLock<HashMap<String, CheckoutRecord>>>,
}

impl InMemoryCheckoutJournal {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CheckoutJournal for InMemoryCheckoutJournal {
    async fn get(&self, session_id: &str) -> Result<Option<CheckoutRecord>> {
        let records = self.records.read().await;
        Ok(records.get(session_id).cloned())
    }

    async fn store(&self, session_id: &str, record: &CheckoutRecord) -> Result<()> {
        let mut records = self.records.write().await;
        records.insert(session_id.to_string(), record.clone());
        Ok(())
    }

    async fn remove(&self, session_id: &str) -> Result<()> {
        self.records.write().await.remove(session_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::checkout::CheckoutStage;
    use crate::domain::money::Money;
    use crate::domain::order::OrderType;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_in_memory_cart_store() {
        let store = InMemoryCartStore::new();
        let mut cart = Cart::new();
        cart.add_priced(1, "Burger", Money::new(dec!(8.00)), 2, "no onions");

        store.save("a", &cart).await.unwrap();
        assert_eq!(store.load("a").await.unwrap(), Some(cart));
        assert!(store.load("b").await.unwrap().is_none());

        store.remove("a").await.unwrap();
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_in_memory_checkout_journal() {
        let journal = InMemoryCheckoutJournal::new();
        let mut record = CheckoutRecord::new(42, OrderType::Delivery);
        journal.store("a", &record).await.unwrap();

        record.advance(CheckoutStage::PaymentConfirmed);
        journal.store("a", &record).await.unwrap();
        let stored = journal.get("a").await.unwrap().unwrap();
        assert_eq!(stored.stage, CheckoutStage::PaymentConfirmed);

        journal.remove("a").await.unwrap();
        assert!(journal.get("a").await.unwrap().is_none());
    }
}
