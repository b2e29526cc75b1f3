use super::money::Money;
use crate::error::StorefrontError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[serde(alias = "Pending")]
    Pending,
    #[serde(alias = "Preparing")]
    Preparing,
    #[serde(alias = "Ready")]
    Ready,
    #[serde(alias = "Completed")]
    Completed,
    #[serde(alias = "Cancelled")]
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 5] = [
        Self::Pending,
        Self::Preparing,
        Self::Ready,
        Self::Completed,
        Self::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Preparing => "preparing",
            Self::Ready => "ready",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// The single action a kitchen ticket offers in this status, if any.
    pub fn next_kitchen_action(&self) -> Option<KitchenAction> {
        match self {
            Self::Preparing => Some(KitchenAction {
                label: "Mark Ready",
                target: Self::Ready,
            }),
            Self::Ready => Some(KitchenAction {
                label: "Complete",
                target: Self::Completed,
            }),
            _ => None,
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = StorefrontError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == lowered)
            .ok_or_else(|| StorefrontError::ValidationError(format!("Unknown order status: {s}")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KitchenAction {
    pub label: &'static str,
    pub target: OrderStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OrderType {
    #[serde(alias = "dinein", alias = "Dine-In")]
    DineIn,
    #[serde(alias = "Takeout")]
    Takeout,
    #[serde(alias = "Delivery")]
    Delivery,
    #[serde(alias = "Online")]
    Online,
}

impl OrderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DineIn => "dine-in",
            Self::Takeout => "takeout",
            Self::Delivery => "delivery",
            Self::Online => "online",
        }
    }

    pub fn requires_delivery(&self) -> bool {
        matches!(self, Self::Delivery)
    }
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderType {
    type Err = StorefrontError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dine-in" | "dinein" => Ok(Self::DineIn),
            "takeout" => Ok(Self::Takeout),
            "delivery" => Ok(Self::Delivery),
            "online" => Ok(Self::Online),
            other => Err(StorefrontError::ValidationError(format!(
                "Unknown order type: {other}"
            ))),
        }
    }
}

/// A server-priced order line. Never modified by the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub order_item_id: i64,
    pub menu_item_id: i64,
    pub menu_item_name: String,
    pub quantity: u32,
    pub unit_price: Money,
    pub line_total: Money,
    #[serde(default)]
    pub special_instructions: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub payment_id: i64,
    pub payment_method: String,
    pub payment_amount: Money,
    pub payment_date: String,
    #[serde(default)]
    pub transaction_id: Option<String>,
}

/// The client's cached copy of a backend-owned order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub order_id: i64,
    #[serde(default)]
    pub customer_id: Option<i64>,
    #[serde(default)]
    pub customer_name: String,
    #[serde(default)]
    pub customer_email: Option<String>,
    #[serde(default)]
    pub employee_id: Option<i64>,
    #[serde(default)]
    pub employee_name: Option<String>,
    #[serde(default)]
    pub order_date: String,
    #[serde(default)]
    pub order_time: String,
    pub order_type: OrderType,
    pub order_status: OrderStatus,
    #[serde(default)]
    pub subtotal: Option<Money>,
    pub total_amount: Money,
    #[serde(default)]
    pub order_items: Vec<OrderItem>,
    #[serde(default)]
    pub payments: Vec<Payment>,
}

impl Order {
    pub fn amount_paid(&self) -> Money {
        self.payments.iter().map(|p| p.payment_amount).sum()
    }

    pub fn is_paid(&self) -> bool {
        !self.payments.is_empty() && self.amount_paid() >= self.total_amount
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderItem {
    pub menu_item_id: i64,
    pub quantity: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub special_instructions: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<i64>,
    pub order_type: OrderType,
    pub order_items: Vec<CreateOrderItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdate {
    pub order_status: OrderStatus,
}

/// Query for the paged order listings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderQuery {
    pub status: Option<OrderStatus>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

impl OrderQuery {
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(page) = self.page {
            pairs.push(("page", page.to_string()));
        }
        if let Some(page_size) = self.page_size {
            pairs.push(("pageSize", page_size.to_string()));
        }
        if let Some(status) = self.status {
            pairs.push(("status", status.to_string()));
        }
        pairs
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderPage {
    pub orders: Vec<Order>,
    pub total_orders: u64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_status_parsing_is_case_insensitive() {
        assert_eq!("Preparing".parse::<OrderStatus>().unwrap(), OrderStatus::Preparing);
        assert_eq!(" ready ".parse::<OrderStatus>().unwrap(), OrderStatus::Ready);
        assert!("lost".parse::<OrderStatus>().is_err());

        let status: OrderStatus = serde_json::from_str("\"Completed\"").unwrap();
        assert_eq!(status, OrderStatus::Completed);
        assert_eq!(serde_json::to_string(&OrderStatus::Pending).unwrap(), "\"pending\"");
    }

    #[test]
    fn test_order_type_wire_names() {
        assert_eq!(serde_json::to_string(&OrderType::DineIn).unwrap(), "\"dine-in\"");
        let parsed: OrderType = serde_json::from_str("\"delivery\"").unwrap();
        assert!(parsed.requires_delivery());
        assert!(!OrderType::Takeout.requires_delivery());
        assert_eq!("Dine-In".parse::<OrderType>().unwrap(), OrderType::DineIn);
    }

    #[test]
    fn test_kitchen_actions() {
        let action = OrderStatus::Preparing.next_kitchen_action().unwrap();
        assert_eq!(action.label, "Mark Ready");
        assert_eq!(action.target, OrderStatus::Ready);
        assert_eq!(
            OrderStatus::Ready.next_kitchen_action().unwrap().target,
            OrderStatus::Completed
        );
        assert!(OrderStatus::Pending.next_kitchen_action().is_none());
        assert!(OrderStatus::Completed.next_kitchen_action().is_none());
    }

    #[test]
    fn test_order_from_backend_json() {
        let json = r#"{
            "orderId": 41, "customerName": "Ada", "employeeId": 0, "employeeName": "",
            "orderDate": "2024-05-01", "orderTime": "12:30:00",
            "orderType": "takeout", "orderStatus": "pending", "totalAmount": 20.52,
            "orderItems": [{"orderItemId": 1, "menuItemId": 7, "menuItemName": "Burger",
                            "quantity": 2, "unitPrice": 8.0, "lineTotal": 16.0}],
            "payments": []
        }"#;
        let order: Order = serde_json::from_str(json).unwrap();
        assert_eq!(order.order_id, 41);
        assert_eq!(order.order_status, OrderStatus::Pending);
        assert_eq!(order.total_amount, Money::new(dec!(20.52)));
        assert_eq!(order.order_items[0].line_total, Money::new(dec!(16)));
        assert!(!order.is_paid());
    }

    #[test]
    fn test_create_request_serialization() {
        let request = CreateOrderRequest {
            customer_id: None,
            order_type: OrderType::Delivery,
            order_items: vec![CreateOrderItem {
                menu_item_id: 3,
                quantity: 2,
                special_instructions: None,
            }],
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "orderType": "delivery",
                "orderItems": [{"menuItemId": 3, "quantity": 2}]
            })
        );
    }
}
