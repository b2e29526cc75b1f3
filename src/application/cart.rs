use crate::domain::cart::{Cart, CartLine};
use crate::domain::menu::MenuItem;
use crate::domain::money::Money;
use crate::domain::ports::CartStoreRef;
use crate::error::Result;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

/// The session's cart ledger with change notification.
///
/// Mutations are synchronous and notify every subscriber. Persistence is
/// explicit: call [`CartHandle::persist`] after a batch of edits and
/// [`CartHandle::restore`] when a session resumes.
#[derive(Clone)]
pub struct CartHandle {
    cart: Arc<watch::Sender<Cart>>,
    store: Option<(CartStoreRef, String)>,
}

impl Default for CartHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl CartHandle {
    pub fn new() -> Self {
        let (cart, _) = watch::channel(Cart::new());
        Self {
            cart: Arc::new(cart),
            store: None,
        }
    }

    /// A cart that saves to and loads from `store` under `session_id`.
    pub fn persistent(store: CartStoreRef, session_id: impl Into<String>) -> Self {
        Self {
            store: Some((store, session_id.into())),
            ..Self::new()
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Cart> {
        self.cart.subscribe()
    }

    pub fn snapshot(&self) -> Cart {
        self.cart.borrow().clone()
    }

    pub fn lines(&self) -> Vec<CartLine> {
        self.cart.borrow().lines().to_vec()
    }

    pub fn update<F: FnOnce(&mut Cart)>(&self, f: F) {
        self.cart.send_modify(f);
    }

    pub fn add_item(&self, item: &MenuItem, quantity: u32, instructions: &str) {
        self.update(|c| c.add_item(item, quantity, instructions));
    }

    pub fn remove_item(&self, menu_item_id: i64) {
        self.update(|c| c.remove_item(menu_item_id));
    }

    pub fn update_quantity(&self, menu_item_id: i64, quantity: i64) {
        self.update(|c| c.update_quantity(menu_item_id, quantity));
    }

    pub fn update_instructions(&self, menu_item_id: i64, instructions: &str) {
        self.update(|c| c.update_instructions(menu_item_id, instructions));
    }

    pub fn clear(&self) {
        self.update(Cart::clear);
    }

    pub fn is_empty(&self) -> bool {
        self.cart.borrow().is_empty()
    }

    pub fn total_items(&self) -> u64 {
        self.cart.borrow().total_items()
    }

    pub fn total_price(&self) -> Money {
        self.cart.borrow().total_price()
    }

    /// Replaces the in-memory cart with the stored one, if any. Returns
    /// whether a stored cart was found.
    pub async fn restore(&self) -> Result<bool> {
        let Some((store, session_id)) = &self.store else {
            return Ok(false);
        };
        match store.load(session_id).await? {
            Some(cart) => {
                debug!(session_id = %session_id, lines = cart.lines().len(), "cart restored");
                self.cart.send_replace(cart);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Writes the current cart; an empty cart removes the stored entry.
    pub async fn persist(&self) -> Result<()> {
        let Some((store, session_id)) = &self.store else {
            return Ok(());
        };
        let cart = self.snapshot();
        if cart.is_empty() {
            store.remove(session_id).await
        } else {
            store.save(session_id, &cart).await
        }
    }
}
