use crate::domain::delivery::GeoPoint;
use crate::error::{Result, StorefrontError};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://localhost:5000/api";
pub const DEFAULT_CARD_PROCESSOR_URL: &str = "https://api.stripe.com";

/// Client-side settings. Everything priced or persisted lives on the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct StorefrontConfig {
    pub api_url: String,
    pub request_timeout: Duration,
    pub tax_rate: Decimal,
    /// Kitchen screen refresh period.
    pub kitchen_refresh_interval: Duration,
    /// Sent with delivery quotes in place of geocoded coordinates.
    pub dropoff_fallback: GeoPoint,
    pub contact_phone: String,
    pub card_processor_url: String,
}

impl Default for StorefrontConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            request_timeout: Duration::from_secs(10),
            tax_rate: dec!(0.08),
            kitchen_refresh_interval: Duration::from_secs(15),
            dropoff_fallback: GeoPoint {
                latitude: 40.7589,
                longitude: -73.9851,
            },
            contact_phone: "+1234567890".to_string(),
            card_processor_url: DEFAULT_CARD_PROCESSOR_URL.to_string(),
        }
    }
}

impl StorefrontConfig {
    /// Refresh period for ticket lists embedded outside the kitchen screen.
    pub const COMPONENT_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: &str| Err(StorefrontError::ValidationError(msg.to_string()));

        if !(self.api_url.starts_with("http://") || self.api_url.starts_with("https://")) {
            return invalid("api_url must be an http(s) URL");
        }
        if self.request_timeout.is_zero() {
            return invalid("request_timeout must be > 0");
        }
        if self.tax_rate.is_sign_negative() || self.tax_rate >= Decimal::ONE {
            return invalid("tax_rate must be within [0, 1)");
        }
        if self.kitchen_refresh_interval < Duration::from_secs(1) {
            return invalid("kitchen_refresh_interval must be at least 1s");
        }
        let GeoPoint {
            latitude,
            longitude,
        } = self.dropoff_fallback;
        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return invalid("dropoff_fallback is not a valid coordinate");
        }
        Ok(())
    }

    /// `api_url` without a trailing slash, for joining endpoint paths.
    pub fn base_url(&self) -> &str {
        self.api_url.trim_end_matches('/')
    }
}
