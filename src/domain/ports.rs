use super::auth::{AuthResponse, LoginRequest, RegisterRequest};
use super::cart::Cart;
use super::checkout::CheckoutRecord;
use super::delivery::{
    CreateDeliveryRequest, DeliveryBooking, DeliveryCancellation, DeliveryQuote,
    DeliveryQuoteRequest, DeliveryTracking,
};
use super::inventory::{InventoryFilter, InventoryItem, LowStockAlert, StockAdjustment};
use super::kitchen::KitchenOrder;
use super::menu::{Menu, MenuDraft, MenuItem, MenuItemDetail, MenuItemDraft, MenuItemFilter, MenuWithItems};
use super::order::{CreateOrderRequest, Order, OrderPage, OrderQuery, OrderStatus};
use super::payment::{CardConfirmation, PaymentIntent};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

#[async_trait]
pub trait AuthApi: Send + Sync {
    async fn login(&self, request: &LoginRequest) -> Result<AuthResponse>;
    async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse>;
    /// Validates the current token (`GET /auth/me`).
    async fn current_user(&self) -> Result<AuthResponse>;
}

#[async_trait]
pub trait OrderApi: Send + Sync {
    async fn create_order(&self, request: &CreateOrderRequest) -> Result<Order>;
    async fn get_order(&self, order_id: i64) -> Result<Order>;
    async fn update_order_status(&self, order_id: i64, status: OrderStatus) -> Result<()>;
    async fn cancel_order(&self, order_id: i64) -> Result<()>;
    async fn kitchen_queue(&self) -> Result<Vec<KitchenOrder>>;
    async fn customer_orders(&self, query: &OrderQuery) -> Result<OrderPage>;
}

#[async_trait]
pub trait PaymentApi: Send + Sync {
    async fn create_payment_intent(&self, order_id: i64) -> Result<PaymentIntent>;
    async fn confirm_payment(&self, payment_intent_id: &str) -> Result<()>;
}

#[async_trait]
pub trait DeliveryApi: Send + Sync {
    async fn quote(&self, request: &DeliveryQuoteRequest) -> Result<DeliveryQuote>;
    async fn create_delivery(&self, request: &CreateDeliveryRequest) -> Result<DeliveryBooking>;
    async fn delivery_status(&self, delivery_id: &str) -> Result<DeliveryTracking>;
    async fn delivery_for_order(&self, order_id: i64) -> Result<DeliveryTracking>;
    async fn cancel_delivery(&self, delivery_id: &str) -> Result<DeliveryCancellation>;
}

#[async_trait]
pub trait CatalogApi: Send + Sync {
    async fn menus(&self) -> Result<Vec<Menu>>;
    async fn menu(&self, menu_id: i64) -> Result<MenuWithItems>;
    async fn create_menu(&self, draft: &MenuDraft) -> Result<Menu>;
    async fn update_menu(&self, menu_id: i64, draft: &MenuDraft) -> Result<()>;
    async fn delete_menu(&self, menu_id: i64) -> Result<()>;
    async fn menu_items(&self, filter: &MenuItemFilter) -> Result<Vec<MenuItem>>;
    async fn menu_item(&self, menu_item_id: i64) -> Result<MenuItemDetail>;
    async fn categories(&self) -> Result<Vec<String>>;
    async fn create_menu_item(&self, draft: &MenuItemDraft) -> Result<MenuItem>;
    async fn update_menu_item(&self, menu_item_id: i64, draft: &MenuItemDraft) -> Result<()>;
    async fn set_item_availability(&self, menu_item_id: i64, is_available: bool) -> Result<()>;
    async fn delete_menu_item(&self, menu_item_id: i64) -> Result<()>;
}

#[async_trait]
pub trait InventoryApi: Send + Sync {
    async fn inventory(&self, filter: &InventoryFilter) -> Result<Vec<InventoryItem>>;
    async fn inventory_item(&self, inventory_id: i64) -> Result<InventoryItem>;
    async fn low_stock_alerts(&self) -> Result<Vec<LowStockAlert>>;
    async fn adjust_stock(&self, inventory_id: i64, adjustment: &StockAdjustment) -> Result<InventoryItem>;
}

/// Runs card confirmation for a payment intent with the card processor.
/// A decline is a normal outcome, not an error.
#[async_trait]
pub trait CardProcessor: Send + Sync {
    async fn confirm_card_payment(&self, intent: &PaymentIntent) -> Result<CardConfirmation>;
    /// Current state of an intent submitted earlier whose outcome was lost.
    async fn charge_status(&self, payment_intent_id: &str) -> Result<CardConfirmation>;
}

#[async_trait]
pub trait CartStore: Send + Sync {
    async fn load(&self, session_id: &str) -> Result<Option<Cart>>;
    async fn save(&self, session_id: &str, cart: &Cart) -> Result<()>;
    async fn remove(&self, session_id: &str) -> Result<()>;
}

#[async_trait]
pub trait CheckoutJournal: Send + Sync {
    async fn get(&self, session_id: &str) -> Result<Option<CheckoutRecord>>;
    async fn store(&self, session_id: &str, record: &CheckoutRecord) -> Result<()>;
    async fn remove(&self, session_id: &str) -> Result<()>;
}

pub type OrderApiRef = Arc<dyn OrderApi>;
pub type PaymentApiRef = Arc<dyn PaymentApi>;
pub type DeliveryApiRef = Arc<dyn DeliveryApi>;
pub type AuthApiRef = Arc<dyn AuthApi>;
pub type CardProcessorRef = Arc<dyn CardProcessor>;
pub type CartStoreRef = Arc<dyn CartStore>;
pub type CheckoutJournalRef = Arc<dyn CheckoutJournal>;
