//! Order submission: create order, take payment, book delivery.
//!
//! Each stage calls a system of record that cannot be rolled back locally, so
//! the pipeline only moves forward. Progress is journaled per session; calling
//! [`CheckoutPipeline::submit`] again after a failure resumes from the last
//! recorded stage instead of creating a second order or charging twice.
//! An order that was never charged is replaced when the cart changed since it
//! was created.

use super::cart::CartHandle;
use super::notifications::{Notifications, ToastKind};
use crate::domain::checkout::{CheckoutRecord, CheckoutStage};
use crate::domain::delivery::{
    CreateDeliveryRequest, DeliveryBooking, DeliveryDetails, DeliveryQuoteRequest, GeoPoint,
};
use crate::domain::money::Money;
use crate::domain::order::{Order, OrderType};
use crate::domain::payment::CardConfirmation;
use crate::domain::ports::{
    CardProcessorRef, CheckoutJournalRef, DeliveryApiRef, OrderApiRef, PaymentApiRef,
};
use crate::error::StorefrontError;
use thiserror::Error;
use tracing::{info, instrument, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutRequest {
    pub order_type: OrderType,
    /// Required when `order_type` is delivery.
    pub delivery: Option<DeliveryDetails>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutReceipt {
    pub order_id: i64,
    pub order_type: OrderType,
    /// The order as created, when creation happened in this call.
    pub order: Option<Order>,
    pub payment_intent_id: Option<String>,
    /// Amount of the intent charged in this call.
    pub amount_charged: Option<Money>,
    pub delivery: Option<DeliveryBooking>,
}

/// Why a checkout stopped. In every case the cart is left as it was.
#[derive(Error, Debug)]
pub enum CheckoutError {
    #[error("{0}")]
    Validation(String),
    #[error("Unable to place order: {0}")]
    OrderCreation(#[source] StorefrontError),
    #[error("Failed to initialize payment for order #{order_id}: {source}")]
    PaymentSetup {
        order_id: i64,
        #[source]
        source: StorefrontError,
    },
    #[error("Payment declined for order #{order_id}: {reason}")]
    PaymentDeclined { order_id: i64, reason: String },
    /// The card may have been charged. Submitting again checks before charging.
    #[error("Payment for order #{order_id} is not settled yet")]
    PaymentPending { order_id: i64 },
    #[error("Payment processed but confirmation failed for order #{order_id}: {source}")]
    PaymentConfirmation {
        order_id: i64,
        #[source]
        source: StorefrontError,
    },
    #[error("Unable to schedule delivery for order #{order_id}: {source}")]
    Delivery {
        order_id: i64,
        #[source]
        source: StorefrontError,
    },
    #[error("Checkout journal error: {0}")]
    Journal(#[from] StorefrontError),
}

impl CheckoutError {
    pub fn order_id(&self) -> Option<i64> {
        match self {
            Self::PaymentSetup { order_id, .. }
            | Self::PaymentDeclined { order_id, .. }
            | Self::PaymentPending { order_id }
            | Self::PaymentConfirmation { order_id, .. }
            | Self::Delivery { order_id, .. } => Some(*order_id),
            _ => None,
        }
    }

    /// Payment went through but delivery did not; the caller may offer
    /// [`CheckoutPipeline::skip_delivery`].
    pub fn can_skip_delivery(&self) -> bool {
        matches!(self, Self::Delivery { .. })
    }
}

/// Pickup coordinates sent with quotes until addresses are geocoded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CheckoutSettings {
    pub dropoff_fallback: GeoPoint,
}

pub struct CheckoutPipeline {
    orders: OrderApiRef,
    payments: PaymentApiRef,
    deliveries: DeliveryApiRef,
    cards: CardProcessorRef,
    journal: CheckoutJournalRef,
    cart: CartHandle,
    notifications: Notifications,
    session_id: String,
    settings: CheckoutSettings,
}

impl CheckoutPipeline {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        orders: OrderApiRef,
        payments: PaymentApiRef,
        deliveries: DeliveryApiRef,
        cards: CardProcessorRef,
        journal: CheckoutJournalRef,
        cart: CartHandle,
        notifications: Notifications,
        session_id: impl Into<String>,
        settings: CheckoutSettings,
    ) -> Self {
        Self {
            orders,
            payments,
            deliveries,
            cards,
            journal,
            cart,
            notifications,
            session_id: session_id.into(),
            settings,
        }
    }

    /// The open checkout for this session, if a previous attempt stopped midway.
    pub async fn pending(&self) -> Result<Option<CheckoutRecord>, CheckoutError> {
        Ok(self
            .journal
            .get(&self.session_id)
            .await?
            .filter(|r| !r.is_complete()))
    }

    #[instrument(skip_all, fields(session = %self.session_id, order_type = %request.order_type))]
    pub async fn submit(&self, request: &CheckoutRequest) -> Result<CheckoutReceipt, CheckoutError> {
        let mut receipt;
        let mut pending = self.pending().await?;
        let mut charged_earlier = false;
        let mut stale = false;
        if let Some(open) = pending.as_mut() {
            if open.stage < CheckoutStage::CardConfirmed {
                charged_earlier = self.resolve_open_intent(open).await?;
                let items = self
                    .cart
                    .snapshot()
                    .to_order_request(request.order_type)
                    .order_items;
                stale = !charged_earlier && !open.ordered(request.order_type, &items);
            }
        }
        if let Some(open) = pending.take_if(|_| stale) {
            info!(order_id = open.order_id, "cart changed since the order was created; replacing it");
            self.discard(&open).await?;
        }

        let mut record = match pending {
            Some(record) => {
                info!(order_id = record.order_id, stage = ?record.stage, "resuming checkout");
                receipt = CheckoutReceipt::for_record(&record);
                if charged_earlier {
                    receipt.amount_charged = record.amount_due;
                }
                record
            }
            None => {
                self.validate(request.order_type, request.delivery.as_ref())?;
                let (record, order) = self.create_order(request.order_type).await?;
                receipt = CheckoutReceipt::for_record(&record);
                receipt.order = Some(order);
                record
            }
        };

        if record.order_type.requires_delivery() {
            self.validate(record.order_type, request.delivery.as_ref())?;
        }

        if record.stage < CheckoutStage::CardConfirmed {
            receipt.amount_charged = self.charge_card(&mut record).await?;
        }
        if record.stage < CheckoutStage::PaymentConfirmed {
            self.confirm_payment(&mut record).await?;
        }
        receipt.payment_intent_id = record.payment_intent_id.clone();

        if record.order_type.requires_delivery() && !record.stage.is_finished() {
            if let Some(details) = &request.delivery {
                receipt.delivery = Some(self.schedule_delivery(&mut record, details).await?);
            }
        }

        self.finish(&record).await?;
        Ok(receipt)
    }

    /// Completes a paid delivery order as pickup after delivery booking failed.
    #[instrument(skip_all, fields(session = %self.session_id))]
    pub async fn skip_delivery(&self) -> Result<CheckoutReceipt, CheckoutError> {
        let Some(mut record) = self.pending().await? else {
            return Err(CheckoutError::Validation("No checkout in progress".to_string()));
        };
        if !record.stage.is_paid() || !record.order_type.requires_delivery() {
            return Err(CheckoutError::Validation(format!(
                "Order #{} is not awaiting delivery",
                record.order_id
            )));
        }

        record.advance(CheckoutStage::DeliverySkipped);
        self.journal.store(&self.session_id, &record).await?;
        self.notifications.push(
            ToastKind::Info,
            "Pickup Instead",
            Some(format!("Order #{} will be ready for pickup", record.order_id)),
        );
        self.finish(&record).await?;
        Ok(CheckoutReceipt::for_record(&record))
    }

    /// Drops this session's open checkout. An order that was never charged
    /// is cancelled; one that may have been charged is left to the backend.
    #[instrument(skip_all, fields(session = %self.session_id))]
    pub async fn abandon(&self) -> Result<Option<CheckoutRecord>, CheckoutError> {
        let Some(mut record) = self.pending().await? else {
            return Ok(None);
        };
        let unpaid = record.stage < CheckoutStage::CardConfirmed
            && matches!(self.resolve_open_intent(&mut record).await, Ok(false));
        if unpaid {
            self.discard(&record).await?;
        } else {
            warn!(order_id = record.order_id, stage = ?record.stage, "abandoning a checkout that may be paid");
            self.journal.remove(&self.session_id).await?;
        }
        Ok(Some(record))
    }

    /// Cancels an uncharged order and forgets it.
    async fn discard(&self, record: &CheckoutRecord) -> Result<(), CheckoutError> {
        if let Err(e) = self.orders.cancel_order(record.order_id).await {
            warn!(order_id = record.order_id, error = %e, "could not cancel unpaid order");
        }
        self.journal.remove(&self.session_id).await?;
        info!(order_id = record.order_id, "unpaid order dropped");
        Ok(())
    }

    /// Settles an intent submitted by an earlier attempt whose outcome was
    /// lost. Returns whether the card was charged.
    async fn resolve_open_intent(&self, record: &mut CheckoutRecord) -> Result<bool, CheckoutError> {
        let order_id = record.order_id;
        let Some(intent_id) = record.payment_intent_id.clone() else {
            return Ok(false);
        };
        match self.cards.charge_status(&intent_id).await {
            Ok(CardConfirmation::Succeeded { payment_intent_id }) => {
                info!(order_id, "earlier card payment went through");
                record.payment_intent_id = Some(payment_intent_id);
                record.advance(CheckoutStage::CardConfirmed);
                self.journal.store(&self.session_id, record).await?;
                Ok(true)
            }
            Ok(CardConfirmation::Declined { .. }) => {
                record.payment_intent_id = None;
                record.amount_due = None;
                self.journal.store(&self.session_id, record).await?;
                Ok(false)
            }
            Ok(CardConfirmation::Processing { .. }) => Err(self.payment_pending(order_id)),
            Err(e) => {
                warn!(order_id, error = %e, "card payment status lookup failed");
                Err(self.payment_pending(order_id))
            }
        }
    }

    fn payment_pending(&self, order_id: i64) -> CheckoutError {
        self.notifications.error(
            "Payment Pending",
            "We could not confirm your payment yet. Please try again shortly.",
        );
        CheckoutError::PaymentPending { order_id }
    }

    fn validate(
        &self,
        order_type: OrderType,
        delivery: Option<&DeliveryDetails>,
    ) -> Result<(), CheckoutError> {
        if self.cart.is_empty() {
            return Err(CheckoutError::Validation("Cart is empty".to_string()));
        }
        if order_type.requires_delivery()
            && delivery.is_none_or(|d| d.address.trim().is_empty())
        {
            self.notifications.error(
                "Delivery Address Required",
                "Please enter a delivery address",
            );
            return Err(CheckoutError::Validation(
                "Delivery address required".to_string(),
            ));
        }
        Ok(())
    }

    async fn create_order(
        &self,
        order_type: OrderType,
    ) -> Result<(CheckoutRecord, Order), CheckoutError> {
        let request = self.cart.snapshot().to_order_request(order_type);
        let order = match self.orders.create_order(&request).await {
            Ok(order) => order,
            Err(e) => {
                warn!(error = %e, "order creation failed");
                self.notifications
                    .error("Order Failed", "Unable to place order. Please try again.");
                return Err(CheckoutError::OrderCreation(e));
            }
        };

        let mut record = CheckoutRecord::new(order.order_id, order_type);
        record.items = request.order_items;
        self.journal.store(&self.session_id, &record).await?;
        info!(order_id = order.order_id, "order created");
        self.notifications.push(
            ToastKind::Info,
            "Order Created!",
            Some(format!(
                "Order #{} created. Please complete payment.",
                order.order_id
            )),
        );
        Ok((record, order))
    }

    /// Creates an intent and runs the card. The intent is journaled before
    /// the card processor is called so a lost response can be looked up.
    async fn charge_card(
        &self,
        record: &mut CheckoutRecord,
    ) -> Result<Option<Money>, CheckoutError> {
        let order_id = record.order_id;
        let intent = match self.payments.create_payment_intent(order_id).await {
            Ok(intent) => intent,
            Err(e) => {
                warn!(order_id, error = %e, "payment intent failed");
                self.notifications
                    .error("Payment Failed", "Failed to initialize payment");
                return Err(CheckoutError::PaymentSetup {
                    order_id,
                    source: e,
                });
            }
        };

        record.payment_intent_id = Some(intent.payment_intent_id.clone());
        record.amount_due = Some(intent.amount);
        self.journal.store(&self.session_id, record).await?;

        let confirmation = match self.cards.confirm_card_payment(&intent).await {
            Ok(confirmation) => confirmation,
            Err(e) => {
                warn!(order_id, error = %e, "card processor gave no answer");
                return Err(self.payment_pending(order_id));
            }
        };

        match confirmation {
            CardConfirmation::Declined { reason } => {
                warn!(order_id, %reason, "card declined");
                record.payment_intent_id = None;
                record.amount_due = None;
                self.journal.store(&self.session_id, record).await?;
                self.notifications.error("Payment Failed", reason.clone());
                Err(CheckoutError::PaymentDeclined { order_id, reason })
            }
            CardConfirmation::Processing { .. } => {
                info!(order_id, "card payment still processing");
                Err(self.payment_pending(order_id))
            }
            CardConfirmation::Succeeded { payment_intent_id } => {
                record.payment_intent_id = Some(payment_intent_id);
                record.advance(CheckoutStage::CardConfirmed);
                self.journal.store(&self.session_id, record).await?;
                Ok(record.amount_due)
            }
        }
    }

    async fn confirm_payment(&self, record: &mut CheckoutRecord) -> Result<(), CheckoutError> {
        let order_id = record.order_id;
        let payment_intent_id = record.payment_intent_id.clone().unwrap_or_default();

        match self.payments.confirm_payment(&payment_intent_id).await {
            Ok(()) => {}
            Err(e) if e.is_already_confirmed() => {
                info!(order_id, "payment already confirmed by backend");
            }
            Err(e) => {
                warn!(order_id, error = %e, "payment confirmation failed");
                self.notifications.error(
                    "Payment Failed",
                    "Payment processed but confirmation failed",
                );
                return Err(CheckoutError::PaymentConfirmation {
                    order_id,
                    source: e,
                });
            }
        }

        record.advance(CheckoutStage::PaymentConfirmed);
        self.journal.store(&self.session_id, record).await?;
        info!(order_id, "payment confirmed");
        self.notifications
            .success("Payment Successful", "Your payment has been processed!");
        Ok(())
    }

    async fn schedule_delivery(
        &self,
        record: &mut CheckoutRecord,
        details: &DeliveryDetails,
    ) -> Result<DeliveryBooking, CheckoutError> {
        let order_id = record.order_id;
        let quote_request = DeliveryQuoteRequest {
            dropoff_latitude: self.settings.dropoff_fallback.latitude,
            dropoff_longitude: self.settings.dropoff_fallback.longitude,
            dropoff_address: details.address.clone(),
        };
        let quote = match self.deliveries.quote(&quote_request).await {
            Ok(quote) => quote,
            Err(e) => {
                warn!(order_id, error = %e, "delivery quote failed");
                self.notifications.error(
                    "Quote Failed",
                    "Unable to get delivery quote for this address",
                );
                return Err(CheckoutError::Delivery {
                    order_id,
                    source: e,
                });
            }
        };
        info!(order_id, fee = %quote.delivery_fee, eta = quote.estimated_delivery_time, "delivery quoted");

        let booking_request = CreateDeliveryRequest {
            order_id,
            delivery_address: details.address.clone(),
            customer_name: details.customer_name.clone(),
            customer_phone: details.customer_phone.clone(),
            delivery_instructions: details.instructions.clone().filter(|s| !s.is_empty()),
        };
        let booking = match self.deliveries.create_delivery(&booking_request).await {
            Ok(booking) => booking,
            Err(e) => {
                warn!(order_id, error = %e, "delivery booking failed");
                self.notifications.error(
                    "Delivery Failed",
                    "Unable to schedule delivery. Please try again.",
                );
                return Err(CheckoutError::Delivery {
                    order_id,
                    source: e,
                });
            }
        };

        record.delivery_id = Some(booking.delivery_id.clone());
        record.advance(CheckoutStage::DeliveryScheduled);
        self.journal.store(&self.session_id, record).await?;
        self.notifications
            .success("Delivery Scheduled", "Your delivery has been scheduled!");
        Ok(booking)
    }

    async fn finish(&self, record: &CheckoutRecord) -> Result<(), CheckoutError> {
        self.cart.clear();
        self.cart.persist().await?;
        self.journal.remove(&self.session_id).await?;
        info!(order_id = record.order_id, stage = ?record.stage, "checkout complete");
        Ok(())
    }
}

impl CheckoutReceipt {
    fn for_record(record: &CheckoutRecord) -> Self {
        Self {
            order_id: record.order_id,
            order_type: record.order_type,
            order: None,
            payment_intent_id: record.payment_intent_id.clone(),
            amount_charged: None,
            delivery: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::OrderStatus;
    use crate::infrastructure::fake::FakeBackend;
    use crate::infrastructure::in_memory::InMemoryCheckoutJournal;
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    struct Harness {
        backend: Arc<FakeBackend>,
        cart: CartHandle,
        notes: Notifications,
        pipeline: CheckoutPipeline,
    }

    fn harness() -> Harness {
        let backend = Arc::new(FakeBackend::new());
        let cart = CartHandle::new();
        let notes = Notifications::new();
        let pipeline = CheckoutPipeline::new(
            backend.clone(),
            backend.clone(),
            backend.clone(),
            backend.clone(),
            Arc::new(InMemoryCheckoutJournal::new()),
            cart.clone(),
            notes.clone(),
            "session",
            CheckoutSettings {
                dropoff_fallback: GeoPoint {
                    latitude: 40.7589,
                    longitude: -73.9851,
                },
            },
        );
        cart.update(|c| {
            c.add_priced(1, "Burger", Money::new(dec!(8.00)), 2, "");
            c.add_priced(2, "Fries", Money::new(dec!(3.00)), 1, "");
        });
        Harness {
            backend,
            cart,
            notes,
            pipeline,
        }
    }

    fn takeout() -> CheckoutRequest {
        CheckoutRequest {
            order_type: OrderType::Takeout,
            delivery: None,
        }
    }

    fn delivery() -> CheckoutRequest {
        CheckoutRequest {
            order_type: OrderType::Delivery,
            delivery: Some(DeliveryDetails {
                address: "1 Main St".into(),
                instructions: Some("Ring twice".into()),
                customer_name: "Ada Lovelace".into(),
                customer_phone: "+15550100".into(),
            }),
        }
    }

    #[tokio::test]
    async fn test_takeout_happy_path_clears_cart() {
        let h = harness();
        let receipt = h.pipeline.submit(&takeout()).await.unwrap();

        assert!(h.cart.is_empty());
        assert!(receipt.order.is_some());
        assert!(receipt.payment_intent_id.is_some());
        assert!(receipt.delivery.is_none());
        assert_eq!(h.backend.calls("create_delivery"), 0);
        assert_eq!(h.notes.count(ToastKind::Success), 1);
        assert!(h.pipeline.pending().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_order_creation_failure_keeps_cart_and_skips_payment() {
        let h = harness();
        let before = h.cart.snapshot();
        h.backend.fail_next("create_order", StorefrontError::api(500, "db down"));

        let err = h.pipeline.submit(&takeout()).await.unwrap_err();
        assert!(matches!(err, CheckoutError::OrderCreation(_)));
        assert_eq!(h.cart.snapshot(), before);
        assert_eq!(h.backend.calls("create_payment_intent"), 0);
        assert_eq!(h.backend.calls("confirm_card_payment"), 0);
        assert_eq!(h.notes.count(ToastKind::Error), 1);
    }

    #[tokio::test]
    async fn test_already_confirmed_counts_as_success_once() {
        let h = harness();
        h.backend
            .fail_next("confirm_payment", StorefrontError::api(409, "Payment already confirmed"));

        h.pipeline.submit(&takeout()).await.unwrap();
        assert!(h.cart.is_empty());
        assert_eq!(h.notes.count(ToastKind::Success), 1);
        assert_eq!(h.notes.count(ToastKind::Error), 0);

        // nothing left to resume, so a second submit cannot repeat the success
        let err = h.pipeline.submit(&takeout()).await.unwrap_err();
        assert!(matches!(err, CheckoutError::Validation(_)));
        assert_eq!(h.notes.count(ToastKind::Success), 1);
    }

    #[tokio::test]
    async fn test_decline_keeps_cart_and_retry_reuses_order() {
        let h = harness();
        h.backend.decline_next_card("Your card was declined.");

        let err = h.pipeline.submit(&takeout()).await.unwrap_err();
        match &err {
            CheckoutError::PaymentDeclined { reason, .. } => {
                assert_eq!(reason, "Your card was declined.")
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(!h.cart.is_empty());
        let pending = h.pipeline.pending().await.unwrap().unwrap();
        assert_eq!(pending.stage, CheckoutStage::OrderCreated);

        let receipt = h.pipeline.submit(&takeout()).await.unwrap();
        assert_eq!(receipt.order_id, pending.order_id);
        assert_eq!(h.backend.calls("create_order"), 1);
        assert_eq!(h.backend.calls("create_payment_intent"), 2);
        assert!(h.cart.is_empty());
    }

    #[tokio::test]
    async fn test_changed_cart_replaces_unpaid_order() {
        let h = harness();
        h.backend.decline_next_card("Your card was declined.");
        let first = h.pipeline.submit(&takeout()).await.unwrap_err().order_id().unwrap();

        h.cart.update(|c| {
            c.clear();
            c.add_priced(3, "Soda", Money::new(dec!(1.50)), 1, "");
        });
        let receipt = h.pipeline.submit(&takeout()).await.unwrap();

        assert_ne!(receipt.order_id, first);
        assert_eq!(
            h.backend.order(first).map(|o| o.order_status),
            Some(OrderStatus::Cancelled)
        );
        let items: Vec<_> = receipt
            .order
            .unwrap()
            .order_items
            .iter()
            .map(|i| (i.menu_item_id, i.quantity))
            .collect();
        assert_eq!(items, vec![(3, 1)]);
        assert_eq!(h.backend.calls("create_order"), 2);
        assert!(h.cart.is_empty());
    }

    #[tokio::test]
    async fn test_changed_order_type_replaces_unpaid_order() {
        let h = harness();
        h.backend.decline_next_card("Your card was declined.");
        let first = h.pipeline.submit(&takeout()).await.unwrap_err().order_id().unwrap();

        let receipt = h
            .pipeline
            .submit(&CheckoutRequest {
                order_type: OrderType::DineIn,
                delivery: None,
            })
            .await
            .unwrap();
        assert_ne!(receipt.order_id, first);
        assert_eq!(receipt.order_type, OrderType::DineIn);
    }

    #[tokio::test]
    async fn test_lost_card_response_is_looked_up_not_recharged() {
        let h = harness();
        h.backend.lose_next_card_response();

        let err = h.pipeline.submit(&takeout()).await.unwrap_err();
        assert!(matches!(err, CheckoutError::PaymentPending { .. }));
        assert!(!h.cart.is_empty());
        let pending = h.pipeline.pending().await.unwrap().unwrap();
        assert!(pending.payment_intent_id.is_some());

        // the cart changing does not matter once the card was charged
        h.cart.update(|c| c.add_priced(3, "Soda", Money::new(dec!(1.50)), 1, ""));
        let receipt = h.pipeline.submit(&takeout()).await.unwrap();
        assert_eq!(receipt.order_id, pending.order_id);
        assert_eq!(receipt.amount_charged, pending.amount_due);
        assert_eq!(h.backend.calls("charge_status"), 1);
        assert_eq!(h.backend.calls("create_payment_intent"), 1);
        assert_eq!(h.backend.calls("confirm_card_payment"), 1);
        assert_eq!(h.notes.count(ToastKind::Success), 1);
    }

    #[tokio::test]
    async fn test_abandon_cancels_only_unpaid_orders() {
        let h = harness();
        h.backend.decline_next_card("Your card was declined.");
        let unpaid = h.pipeline.submit(&takeout()).await.unwrap_err().order_id().unwrap();

        let dropped = h.pipeline.abandon().await.unwrap().unwrap();
        assert_eq!(dropped.order_id, unpaid);
        assert_eq!(
            h.backend.order(unpaid).map(|o| o.order_status),
            Some(OrderStatus::Cancelled)
        );
        assert!(h.pipeline.pending().await.unwrap().is_none());
        assert!(h.pipeline.abandon().await.unwrap().is_none());

        h.backend.lose_next_card_response();
        let charged = h.pipeline.submit(&takeout()).await.unwrap_err().order_id().unwrap();
        h.pipeline.abandon().await.unwrap();
        assert_eq!(
            h.backend.order(charged).map(|o| o.order_status),
            Some(OrderStatus::Pending)
        );
        assert_eq!(h.backend.calls("cancel_order"), 1);
        assert!(h.pipeline.pending().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_confirmation_failure_retry_does_not_charge_twice() {
        let h = harness();
        h.backend.fail_next("confirm_payment", StorefrontError::api(500, "timeout"));

        let err = h.pipeline.submit(&takeout()).await.unwrap_err();
        assert!(matches!(err, CheckoutError::PaymentConfirmation { .. }));
        assert!(!h.cart.is_empty());

        h.pipeline.submit(&takeout()).await.unwrap();
        assert_eq!(h.backend.calls("confirm_card_payment"), 1);
        assert_eq!(h.backend.calls("confirm_payment"), 2);
        assert!(h.cart.is_empty());
    }

    #[tokio::test]
    async fn test_delivery_missing_address_is_blocked() {
        let h = harness();
        let request = CheckoutRequest {
            order_type: OrderType::Delivery,
            delivery: Some(DeliveryDetails {
                address: "   ".into(),
                ..DeliveryDetails::default()
            }),
        };
        let err = h.pipeline.submit(&request).await.unwrap_err();
        assert!(matches!(err, CheckoutError::Validation(_)));
        assert_eq!(h.backend.calls("create_order"), 0);
    }

    #[tokio::test]
    async fn test_delivery_happy_path() {
        let h = harness();
        let receipt = h.pipeline.submit(&delivery()).await.unwrap();
        let booking = receipt.delivery.unwrap();
        assert!(!booking.delivery_id.is_empty());
        assert_eq!(h.backend.calls("quote"), 1);
        assert!(h.cart.is_empty());

        let sent = h.backend.last_delivery_request().unwrap();
        assert_eq!(sent.delivery_instructions.as_deref(), Some("Ring twice"));
    }

    #[tokio::test]
    async fn test_delivery_failure_offers_pickup() {
        let h = harness();
        h.backend
            .fail_next("create_delivery", StorefrontError::api(502, "courier unavailable"));

        let err = h.pipeline.submit(&delivery()).await.unwrap_err();
        assert!(err.can_skip_delivery());
        assert!(!h.cart.is_empty());
        let pending = h.pipeline.pending().await.unwrap().unwrap();
        assert_eq!(pending.stage, CheckoutStage::PaymentConfirmed);

        let receipt = h.pipeline.skip_delivery().await.unwrap();
        assert_eq!(receipt.order_id, pending.order_id);
        assert!(h.cart.is_empty());
        assert!(h.pipeline.pending().await.unwrap().is_none());
        assert_eq!(h.backend.calls("confirm_card_payment"), 1);
    }

    #[tokio::test]
    async fn test_skip_delivery_without_open_checkout() {
        let h = harness();
        assert!(matches!(
            h.pipeline.skip_delivery().await,
            Err(CheckoutError::Validation(_))
        ));
    }
}
