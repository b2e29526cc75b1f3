use crate::domain::payment::{CardConfirmation, PaymentIntent};
use crate::domain::ports::CardProcessor;
use crate::error::{Result, StorefrontError};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{info, instrument, warn};

/// Stripe's reusable test card.
pub const TEST_PAYMENT_METHOD: &str = "pm_card_visa";

#[derive(Debug, Deserialize)]
struct IntentStatus {
    id: String,
    status: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: CardError,
}

#[derive(Debug, Deserialize)]
struct CardError {
    #[serde(default)]
    r#type: String,
    #[serde(default)]
    message: Option<String>,
}

/// Confirms payment intents against the Stripe REST API with a server-side
/// secret key.
pub struct StripeCardProcessor {
    client: Client,
    base_url: String,
    secret_key: String,
    payment_method: String,
}

impl StripeCardProcessor {
    pub fn new(
        base_url: &str,
        secret_key: impl Into<String>,
        payment_method: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
            secret_key: secret_key.into(),
            payment_method: payment_method.into(),
        })
    }
}

#[async_trait]
impl CardProcessor for StripeCardProcessor {
    #[instrument(skip_all, fields(payment_intent = %intent.payment_intent_id))]
    async fn confirm_card_payment(&self, intent: &PaymentIntent) -> Result<CardConfirmation> {
        let url = format!(
            "{}/v1/payment_intents/{}/confirm",
            self.base_url, intent.payment_intent_id
        );
        let response = self
            .client
            .post(url)
            .bearer_auth(&self.secret_key)
            .form(&[("payment_method", self.payment_method.as_str())])
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;

        if status.is_success() {
            let intent: IntentStatus = serde_json::from_str(&body)?;
            return Ok(classify(intent));
        }

        match serde_json::from_str::<ErrorBody>(&body) {
            Ok(ErrorBody { error }) if error.r#type == "card_error" => {
                let reason = error
                    .message
                    .unwrap_or_else(|| "Your card was declined.".to_string());
                warn!(%reason, "card declined by processor");
                Ok(CardConfirmation::Declined { reason })
            }
            Ok(ErrorBody { error }) => Err(StorefrontError::api(
                status.as_u16(),
                error.message.unwrap_or_else(|| error.r#type.clone()),
            )),
            Err(_) => Err(StorefrontError::api(status.as_u16(), body)),
        }
    }

    #[instrument(skip(self))]
    async fn charge_status(&self, payment_intent_id: &str) -> Result<CardConfirmation> {
        let url = format!("{}/v1/payment_intents/{}", self.base_url, payment_intent_id);
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.secret_key)
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            let message = serde_json::from_str::<ErrorBody>(&body)
                .ok()
                .and_then(|b| b.error.message)
                .unwrap_or(body);
            return Err(StorefrontError::api(status.as_u16(), message));
        }
        let intent: IntentStatus = serde_json::from_str(&body)?;
        Ok(classify(intent))
    }
}

fn classify(intent: IntentStatus) -> CardConfirmation {
    match intent.status.as_str() {
        "succeeded" => {
            info!(payment_intent = %intent.id, "card payment succeeded");
            CardConfirmation::Succeeded {
                payment_intent_id: intent.id,
            }
        }
        "processing" | "requires_capture" => CardConfirmation::Processing {
            payment_intent_id: intent.id,
        },
        other => CardConfirmation::Declined {
            reason: format!("Payment not completed (status: {other})"),
        },
    }
}
