use super::money::Money;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIntentRequest {
    pub order_id: i64,
}

/// Handle returned by the backend for a card payment on one order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIntent {
    pub client_secret: String,
    pub payment_intent_id: String,
    pub amount: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmPaymentRequest {
    pub payment_intent_id: String,
}

/// Result of running card confirmation through the card processor, or of
/// looking up an intent that was already submitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CardConfirmation {
    Succeeded { payment_intent_id: String },
    /// Submitted but not settled; the card may still be charged.
    Processing { payment_intent_id: String },
    /// Not charged. A new intent may be created.
    Declined { reason: String },
}
