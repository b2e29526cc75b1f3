use super::cart::CartHandle;
use super::checkout::{CheckoutPipeline, CheckoutSettings};
use super::kitchen::{KitchenQueue, PollerHandle};
use super::notifications::Notifications;
use super::session::{Authenticator, Session};
use crate::config::StorefrontConfig;
use crate::domain::delivery::{DeliveryCancellation, DeliveryTracking};
use crate::domain::money::Money;
use crate::domain::order::{Order, OrderPage, OrderQuery, OrderStatus};
use crate::domain::ports::{
    AuthApi, AuthApiRef, CardProcessorRef, CartStoreRef, CheckoutJournalRef, DeliveryApi,
    DeliveryApiRef, OrderApi, OrderApiRef, PaymentApi, PaymentApiRef,
};
use crate::error::Result;
use std::sync::Arc;
use tokio::sync::{Mutex, watch};
use tracing::{info, instrument, warn};

/// Every port the context talks to.
#[derive(Clone)]
pub struct StorefrontPorts {
    pub auth: AuthApiRef,
    pub orders: OrderApiRef,
    pub payments: PaymentApiRef,
    pub deliveries: DeliveryApiRef,
    pub cards: CardProcessorRef,
    pub carts: Option<CartStoreRef>,
    pub journal: CheckoutJournalRef,
}

impl StorefrontPorts {
    /// Uses one backend object for every REST port.
    pub fn from_backend<A>(
        api: Arc<A>,
        cards: CardProcessorRef,
        carts: Option<CartStoreRef>,
        journal: CheckoutJournalRef,
    ) -> Self
    where
        A: AuthApi + OrderApi + PaymentApi + DeliveryApi + 'static,
    {
        Self {
            auth: api.clone(),
            orders: api.clone(),
            payments: api.clone(),
            deliveries: api,
            cards,
            carts,
            journal,
        }
    }
}

/// One customer or staff session: cart, current order, kitchen queue and
/// checkout, wired to the same notifications and credentials.
pub struct StorefrontContext {
    config: StorefrontConfig,
    session: Session,
    authenticator: Authenticator,
    notifications: Notifications,
    cart: CartHandle,
    current_order: watch::Sender<Option<Order>>,
    kitchen: KitchenQueue,
    checkout: CheckoutPipeline,
    orders: OrderApiRef,
    deliveries: DeliveryApiRef,
    poller: Mutex<Option<PollerHandle>>,
}

impl StorefrontContext {
    pub fn new(
        config: StorefrontConfig,
        ports: StorefrontPorts,
        session: Session,
        session_id: impl Into<String>,
    ) -> Self {
        let session_id = session_id.into();
        let notifications = Notifications::new();
        let cart = match ports.carts {
            Some(store) => CartHandle::persistent(store, session_id.clone()),
            None => CartHandle::new(),
        };
        let checkout = CheckoutPipeline::new(
            ports.orders.clone(),
            ports.payments,
            ports.deliveries.clone(),
            ports.cards,
            ports.journal,
            cart.clone(),
            notifications.clone(),
            session_id,
            CheckoutSettings {
                dropoff_fallback: config.dropoff_fallback,
            },
        );
        let (current_order, _) = watch::channel(None);

        Self {
            authenticator: Authenticator::new(ports.auth, session.clone()),
            kitchen: KitchenQueue::new(ports.orders.clone(), notifications.clone()),
            orders: ports.orders,
            deliveries: ports.deliveries,
            config,
            session,
            notifications,
            cart,
            current_order,
            checkout,
            poller: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &StorefrontConfig {
        &self.config
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn authenticator(&self) -> &Authenticator {
        &self.authenticator
    }

    pub fn notifications(&self) -> &Notifications {
        &self.notifications
    }

    pub fn cart(&self) -> &CartHandle {
        &self.cart
    }

    pub fn kitchen(&self) -> &KitchenQueue {
        &self.kitchen
    }

    pub fn checkout(&self) -> &CheckoutPipeline {
        &self.checkout
    }

    /// Cart subtotal plus tax at the configured rate.
    pub fn cart_total_with_tax(&self) -> Money {
        self.cart.snapshot().total_with_tax(self.config.tax_rate)
    }

    pub fn current_order(&self) -> Option<Order> {
        self.current_order.borrow().clone()
    }

    pub fn subscribe_current_order(&self) -> watch::Receiver<Option<Order>> {
        self.current_order.subscribe()
    }

    #[instrument(skip(self))]
    pub async fn load_order(&self, order_id: i64) -> Result<Order> {
        match self.orders.get_order(order_id).await {
            Ok(order) => {
                self.current_order.send_replace(Some(order.clone()));
                Ok(order)
            }
            Err(e) => {
                warn!(error = %e, "failed to load order");
                self.notifications.error("Error", "Failed to load order");
                Err(e)
            }
        }
    }

    /// Applies a status transition and reflects it in both the current order
    /// and the kitchen queue.
    #[instrument(skip(self))]
    pub async fn update_order_status(&self, order_id: i64, status: OrderStatus) -> Result<()> {
        if let Err(e) = self.orders.update_order_status(order_id, status).await {
            warn!(error = %e, "order status update failed");
            self.notifications.error("Error", "Failed to update order status");
            return Err(e);
        }
        self.patch_current_order(order_id, status);
        self.kitchen.record_status(order_id, status).await;
        info!("order status updated");
        self.notifications
            .success("Order Updated", format!("Order status changed to {status}"));
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn cancel_order(&self, order_id: i64) -> Result<()> {
        if let Err(e) = self.orders.cancel_order(order_id).await {
            warn!(error = %e, "order cancellation failed");
            self.notifications.error("Error", "Failed to cancel order");
            return Err(e);
        }
        self.patch_current_order(order_id, OrderStatus::Cancelled);
        self.kitchen
            .record_status(order_id, OrderStatus::Cancelled)
            .await;
        self.notifications
            .success("Order Cancelled", format!("Order #{order_id} has been cancelled"));
        Ok(())
    }

    pub async fn customer_orders(&self, query: &OrderQuery) -> Result<OrderPage> {
        self.orders.customer_orders(query).await
    }

    pub async fn track_delivery(&self, order_id: i64) -> Result<DeliveryTracking> {
        self.deliveries.delivery_for_order(order_id).await
    }

    #[instrument(skip(self))]
    pub async fn cancel_delivery(&self, delivery_id: &str) -> Result<DeliveryCancellation> {
        let outcome = self.deliveries.cancel_delivery(delivery_id).await?;
        if outcome.success {
            self.notifications
                .success("Delivery Cancelled", "The delivery has been cancelled");
        } else {
            self.notifications
                .error("Cancellation Failed", "The courier could not cancel this delivery");
        }
        Ok(outcome)
    }

    /// Starts kitchen polling at the configured interval, replacing any
    /// poller already running.
    pub async fn start_kitchen_polling(&self) {
        let handle = self
            .kitchen
            .spawn_poller(self.config.kitchen_refresh_interval);
        self.poller.lock().await.replace(handle);
    }

    pub async fn stop_kitchen_polling(&self) {
        self.poller.lock().await.take();
    }

    /// Stops background work and resets every state holder, including the
    /// session's stored cart and any open checkout.
    pub async fn dispose(&self) {
        self.stop_kitchen_polling().await;
        if let Err(e) = self.checkout.abandon().await {
            warn!(error = %e, "could not abandon open checkout");
        }
        self.cart.clear();
        if let Err(e) = self.cart.persist().await {
            warn!(error = %e, "could not clear stored cart");
        }
        self.current_order.send_replace(None);
        self.notifications.clear();
        self.authenticator.logout();
    }

    fn patch_current_order(&self, order_id: i64, status: OrderStatus) {
        self.current_order.send_if_modified(|current| match current {
            Some(order) if order.order_id == order_id && order.order_status != status => {
                order.order_status = status;
                true
            }
            _ => false,
        });
    }
}
