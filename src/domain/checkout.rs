use super::money::Money;
use super::order::{CreateOrderItem, OrderType};
use serde::{Deserialize, Serialize};

/// Checkout stage markers, in pipeline order. A record only moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutStage {
    OrderCreated,
    /// The card processor charged the card; the backend has not acknowledged it yet.
    CardConfirmed,
    PaymentConfirmed,
    DeliveryScheduled,
    DeliverySkipped,
}

impl CheckoutStage {
    pub fn is_paid(&self) -> bool {
        *self >= Self::PaymentConfirmed
    }

    pub fn is_finished(&self) -> bool {
        matches!(self, Self::DeliveryScheduled | Self::DeliverySkipped)
    }
}

/// Durable marker of an in-progress checkout, keyed by session id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutRecord {
    pub order_id: i64,
    pub order_type: OrderType,
    pub stage: CheckoutStage,
    /// Set once an intent exists. Before `CardConfirmed` it names an intent
    /// whose outcome is not yet known.
    #[serde(default)]
    pub payment_intent_id: Option<String>,
    #[serde(default)]
    pub amount_due: Option<Money>,
    #[serde(default)]
    pub delivery_id: Option<String>,
    /// Lines the order was created from.
    #[serde(default)]
    pub items: Vec<CreateOrderItem>,
}

impl CheckoutRecord {
    pub fn new(order_id: i64, order_type: OrderType) -> Self {
        Self {
            order_id,
            order_type,
            stage: CheckoutStage::OrderCreated,
            payment_intent_id: None,
            amount_due: None,
            delivery_id: None,
            items: Vec::new(),
        }
    }

    /// Whether the order was created from exactly these lines.
    pub fn ordered(&self, order_type: OrderType, items: &[CreateOrderItem]) -> bool {
        self.order_type == order_type && self.items == items
    }

    /// Moves to `stage`; moving backwards is ignored.
    pub fn advance(&mut self, stage: CheckoutStage) {
        if stage > self.stage {
            self.stage = stage;
        }
    }

    /// Paid, and either no delivery is needed or it has been resolved.
    pub fn is_complete(&self) -> bool {
        if self.order_type.requires_delivery() {
            self.stage.is_finished()
        } else {
            self.stage.is_paid()
        }
    }
}
