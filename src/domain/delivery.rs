use super::money::Money;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryQuoteRequest {
    pub dropoff_latitude: f64,
    pub dropoff_longitude: f64,
    pub dropoff_address: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryQuote {
    pub delivery_fee: Money,
    /// Minutes.
    pub estimated_delivery_time: u32,
    pub currency: String,
    pub quote_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDeliveryRequest {
    pub order_id: i64,
    pub delivery_address: String,
    pub customer_name: String,
    pub customer_phone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_instructions: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryBooking {
    pub delivery_id: String,
    pub status: String,
    pub tracking_url: String,
    pub estimated_delivery_time: u32,
    pub delivery_fee: Money,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryTracking {
    pub delivery_id: String,
    pub status: String,
    pub tracking_url: String,
    pub estimated_delivery_time: u32,
    #[serde(default)]
    pub driver_name: Option<String>,
    #[serde(default)]
    pub driver_phone: Option<String>,
    #[serde(default)]
    pub driver_location: Option<GeoPoint>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeliveryCancellation {
    pub success: bool,
}

/// Where and to whom a delivery order goes.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DeliveryDetails {
    pub address: String,
    pub instructions: Option<String>,
    pub customer_name: String,
    pub customer_phone: String,
}

/// Formats a minute count the way the delivery screen shows it.
pub fn format_eta(minutes: u32) -> String {
    if minutes < 60 {
        return format!("{minutes} minutes");
    }
    format!("{}h {}m", minutes / 60, minutes % 60)
}
