use super::menu::MenuItem;
use super::money::Money;
use super::order::{CreateOrderItem, CreateOrderRequest, OrderType};
use crate::error::{Result, StorefrontError};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One cart line, unique by `menu_item_id` within a [`Cart`].
///
/// The line total is derived from `quantity` and `unit_price` on every read,
/// so it cannot drift from the values it is computed from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub menu_item_id: i64,
    pub item_name: String,
    pub quantity: u32,
    /// Price copied from the menu item when it was last added.
    pub unit_price: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub special_instructions: Option<String>,
}

impl CartLine {
    pub fn line_total(&self) -> Money {
        self.unit_price * self.quantity
    }
}

/// The customer's in-progress order.
///
/// Lines keep insertion order. All operations are infallible: unknown ids are
/// ignored and a non-positive quantity removes the line.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn line(&self, menu_item_id: i64) -> Option<&CartLine> {
        self.lines.iter().find(|l| l.menu_item_id == menu_item_id)
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Adds `quantity` of `item`, merging with an existing line for the same id.
    pub fn add_item(&mut self, item: &MenuItem, quantity: u32, instructions: &str) {
        self.add_priced(
            item.menu_item_id,
            &item.item_name,
            item.price,
            quantity,
            instructions,
        );
    }

    /// Same as [`Cart::add_item`] for callers that only have id, name and price.
    ///
    /// On merge the unit price is refreshed to `unit_price`, and instructions are
    /// replaced only when `instructions` is non-empty. A zero quantity is ignored.
    pub fn add_priced(
        &mut self,
        menu_item_id: i64,
        item_name: &str,
        unit_price: Money,
        quantity: u32,
        instructions: &str,
    ) {
        if quantity == 0 {
            return;
        }

        if let Some(line) = self.line_mut(menu_item_id) {
            line.quantity = line.quantity.saturating_add(quantity);
            line.unit_price = unit_price;
            if !instructions.is_empty() {
                line.special_instructions = Some(instructions.to_string());
            }
            return;
        }

        self.lines.push(CartLine {
            menu_item_id,
            item_name: item_name.to_string(),
            quantity,
            unit_price,
            special_instructions: (!instructions.is_empty()).then(|| instructions.to_string()),
        });
    }

    pub fn remove_item(&mut self, menu_item_id: i64) {
        self.lines.retain(|l| l.menu_item_id != menu_item_id);
    }

    /// Sets the quantity of a line. `quantity <= 0` removes it.
    pub fn update_quantity(&mut self, menu_item_id: i64, quantity: i64) {
        if quantity <= 0 {
            self.remove_item(menu_item_id);
            return;
        }
        let quantity = u32::try_from(quantity).unwrap_or(u32::MAX);
        if let Some(line) = self.line_mut(menu_item_id) {
            line.quantity = quantity;
        }
    }

    /// Replaces the instructions of a line; empty text clears them.
    pub fn update_instructions(&mut self, menu_item_id: i64, instructions: &str) {
        if let Some(line) = self.line_mut(menu_item_id) {
            line.special_instructions =
                (!instructions.is_empty()).then(|| instructions.to_string());
        }
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    pub fn total_items(&self) -> u64 {
        self.lines.iter().map(|l| u64::from(l.quantity)).sum()
    }

    /// Subtotal before tax.
    pub fn total_price(&self) -> Money {
        self.lines.iter().map(CartLine::line_total).sum()
    }

    pub fn tax(&self, rate: Decimal) -> Money {
        self.total_price().tax(rate)
    }

    pub fn total_with_tax(&self, rate: Decimal) -> Money {
        self.total_price().with_tax(rate)
    }

    /// Snapshot of the cart as a create-order request. Prices are not sent;
    /// the backend prices every line itself.
    pub fn to_order_request(&self, order_type: OrderType) -> CreateOrderRequest {
        CreateOrderRequest {
            customer_id: None,
            order_type,
            order_items: self
                .lines
                .iter()
                .map(|l| CreateOrderItem {
                    menu_item_id: l.menu_item_id,
                    quantity: l.quantity,
                    special_instructions: l.special_instructions.clone(),
                })
                .collect(),
        }
    }

    fn line_mut(&mut self, menu_item_id: i64) -> Option<&mut CartLine> {
        self.lines.iter_mut().find(|l| l.menu_item_id == menu_item_id)
    }
}

/// Durable form of a cart. Bump [`PersistedCart::SCHEMA_VERSION`] whenever
/// the layout of [`CartLine`] changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedCart {
    pub schema_version: u32,
    pub lines: Vec<CartLine>,
}

impl PersistedCart {
    pub const SCHEMA_VERSION: u32 = 1;

    pub fn from_cart(cart: &Cart) -> Self {
        Self {
            schema_version: Self::SCHEMA_VERSION,
            lines: cart.lines.clone(),
        }
    }

    pub fn into_cart(self) -> Result<Cart> {
        if self.schema_version > Self::SCHEMA_VERSION {
            return Err(StorefrontError::SchemaVersionError {
                found: self.schema_version,
                supported: Self::SCHEMA_VERSION,
            });
        }
        let mut cart = Cart::new();
        // Re-insert through the ledger so duplicates and zero quantities collapse.
        for line in self.lines {
            cart.add_priced(
                line.menu_item_id,
                &line.item_name,
                line.unit_price,
                line.quantity,
                line.special_instructions.as_deref().unwrap_or(""),
            );
        }
        Ok(cart)
    }
}
