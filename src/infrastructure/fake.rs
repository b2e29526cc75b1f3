//! Scriptable in-process backend for tests and offline demos.
//!
//! Implements the REST ports and the card processor over in-memory state.
//! Every call is counted by operation name, and failures can be queued per
//! operation with [`FakeBackend::fail_next`].

use crate::domain::auth::{AuthResponse, LoginRequest, RegisterRequest, Role};
use crate::domain::delivery::{
    CreateDeliveryRequest, DeliveryBooking, DeliveryCancellation, DeliveryQuote,
    DeliveryQuoteRequest, DeliveryTracking,
};
use crate::domain::kitchen::{KitchenOrder, KitchenOrderItem};
use crate::domain::money::Money;
use crate::domain::order::{
    CreateOrderRequest, Order, OrderItem, OrderPage, OrderQuery, OrderStatus, OrderType,
};
use crate::domain::payment::{CardConfirmation, PaymentIntent};
use crate::domain::ports::{AuthApi, CardProcessor, DeliveryApi, OrderApi, PaymentApi};
use crate::error::{Result, StorefrontError};
use async_trait::async_trait;
use rust_decimal_macros::dec;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

const USER_EMAIL: &str = "customer@example.com";
const UNKNOWN_ITEM_PRICE: Money = Money(dec!(10.00));

#[derive(Default)]
struct FakeState {
    calls: HashMap<&'static str, usize>,
    failures: HashMap<&'static str, VecDeque<StorefrontError>>,
    declines: VecDeque<String>,
    lost_card_responses: usize,
    charges: HashMap<String, CardConfirmation>,
    token_rejected: bool,
    prices: HashMap<i64, (String, Money)>,
    orders: HashMap<i64, Order>,
    next_order_id: i64,
    intents: HashMap<String, i64>,
    next_intent: u64,
    kitchen_queue: Vec<KitchenOrder>,
    last_delivery_request: Option<CreateDeliveryRequest>,
}

#[derive(Default)]
pub struct FakeBackend {
    state: Mutex<FakeState>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// A small menu (1 Burger $8.00, 2 Fries $3.00, 3 Soda $1.50) and two
    /// tickets in the kitchen queue.
    pub fn with_sample_data() -> Self {
        let backend = Self::new();
        backend.set_price(1, "Burger", Money(dec!(8.00)));
        backend.set_price(2, "Fries", Money(dec!(3.00)));
        backend.set_price(3, "Soda", Money(dec!(1.50)));
        let ticket = |order_id, customer: &str, status, items: Vec<(&str, u32)>| KitchenOrder {
            order_id,
            customer_name: customer.to_string(),
            order_date: "2024-05-01".into(),
            order_time: "12:00:00".into(),
            order_type: OrderType::DineIn,
            order_status: status,
            estimated_prep_time: 15,
            order_items: items
                .into_iter()
                .map(|(name, quantity)| KitchenOrderItem {
                    menu_item_name: name.to_string(),
                    quantity,
                    special_instructions: None,
                })
                .collect(),
        };
        backend.set_kitchen_queue(vec![
            ticket(101, "Grace", OrderStatus::Preparing, vec![("Burger", 2), ("Fries", 1)]),
            ticket(102, "", OrderStatus::Ready, vec![("Soda", 3)]),
        ]);
        backend
    }

    fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Counts the call and returns the next queued failure for `op`, if any.
    fn enter(&self, op: &'static str) -> Result<MutexGuard<'_, FakeState>> {
        let mut state = self.state();
        *state.calls.entry(op).or_default() += 1;
        let failure = state.failures.get_mut(op).and_then(VecDeque::pop_front);
        match failure {
            Some(err) => Err(err),
            None => Ok(state),
        }
    }

    pub fn calls(&self, op: &str) -> usize {
        self.state().calls.get(op).copied().unwrap_or(0)
    }

    /// Makes the next call to `op` fail with `err`.
    pub fn fail_next(&self, op: &'static str, err: StorefrontError) {
        self.state().failures.entry(op).or_default().push_back(err);
    }

    pub fn decline_next_card(&self, reason: impl Into<String>) {
        self.state().declines.push_back(reason.into());
    }

    /// The next card confirmation charges the card but the caller sees a
    /// gateway timeout.
    pub fn lose_next_card_response(&self) {
        self.state().lost_card_responses += 1;
    }

    /// `/auth/me` answers 401 from now on.
    pub fn reject_token(&self) {
        self.state().token_rejected = true;
    }

    pub fn user_email(&self) -> &'static str {
        USER_EMAIL
    }

    /// Server-side price for `menu_item_id`; unknown items cost $10.00.
    pub fn set_price(&self, menu_item_id: i64, name: &str, price: Money) {
        self.state()
            .prices
            .insert(menu_item_id, (name.to_string(), price));
    }

    pub fn set_kitchen_queue(&self, queue: Vec<KitchenOrder>) {
        self.state().kitchen_queue = queue;
    }

    /// Inserts an empty order as if another client had created it.
    pub fn seed_order(&self, order_id: i64, order_type: OrderType, status: OrderStatus) -> Order {
        let order = Order {
            order_id,
            customer_id: None,
            customer_name: String::new(),
            customer_email: None,
            employee_id: None,
            employee_name: None,
            order_date: "2024-05-01".into(),
            order_time: "12:00:00".into(),
            order_type,
            order_status: status,
            subtotal: Some(Money::ZERO),
            total_amount: Money::ZERO,
            order_items: vec![],
            payments: vec![],
        };
        let mut state = self.state();
        state.next_order_id = state.next_order_id.max(order_id);
        state.orders.insert(order_id, order.clone());
        order
    }

    pub fn order(&self, order_id: i64) -> Option<Order> {
        self.state().orders.get(&order_id).cloned()
    }

    pub fn last_delivery_request(&self) -> Option<CreateDeliveryRequest> {
        self.state().last_delivery_request.clone()
    }

    fn auth_response(email: &str, first_name: &str, last_name: &str, roles: &[Role]) -> AuthResponse {
        AuthResponse {
            token: "fake-token".to_string(),
            email: email.to_string(),
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            roles: roles.iter().map(|r| format!("{r:?}")).collect(),
            expiration: None,
        }
    }
}

#[async_trait]
impl AuthApi for FakeBackend {
    async fn login(&self, request: &LoginRequest) -> Result<AuthResponse> {
        drop(self.enter("login")?);
        Ok(Self::auth_response(
            &request.email,
            "Demo",
            "User",
            &[Role::Customer, Role::Employee],
        ))
    }

    async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse> {
        drop(self.enter("register")?);
        Ok(Self::auth_response(
            &request.email,
            &request.first_name,
            &request.last_name,
            &[request.role],
        ))
    }

    async fn current_user(&self) -> Result<AuthResponse> {
        let state = self.enter("current_user")?;
        if state.token_rejected {
            return Err(StorefrontError::Unauthorized);
        }
        Ok(Self::auth_response(USER_EMAIL, "Demo", "User", &[Role::Customer]))
    }
}

#[async_trait]
impl OrderApi for FakeBackend {
    async fn create_order(&self, request: &CreateOrderRequest) -> Result<Order> {
        let mut state = self.enter("create_order")?;
        if request.order_items.is_empty() {
            return Err(StorefrontError::api(400, "Order must contain at least one item"));
        }
        state.next_order_id += 1;
        let order_id = state.next_order_id;

        let order_items: Vec<OrderItem> = request
            .order_items
            .iter()
            .enumerate()
            .map(|(i, line)| {
                let (name, price) = state
                    .prices
                    .get(&line.menu_item_id)
                    .cloned()
                    .unwrap_or_else(|| (format!("Item {}", line.menu_item_id), UNKNOWN_ITEM_PRICE));
                OrderItem {
                    order_item_id: order_id * 100 + i as i64,
                    menu_item_id: line.menu_item_id,
                    menu_item_name: name,
                    quantity: line.quantity,
                    unit_price: price,
                    line_total: price * line.quantity,
                    special_instructions: line.special_instructions.clone(),
                }
            })
            .collect();
        let subtotal: Money = order_items.iter().map(|i| i.line_total).sum();

        let order = Order {
            order_id,
            customer_id: request.customer_id,
            customer_name: String::new(),
            customer_email: Some(USER_EMAIL.to_string()),
            employee_id: None,
            employee_name: None,
            order_date: "2024-05-01".into(),
            order_time: "12:00:00".into(),
            order_type: request.order_type,
            order_status: OrderStatus::Pending,
            subtotal: Some(subtotal),
            total_amount: subtotal.with_tax(dec!(0.08)),
            order_items,
            payments: vec![],
        };
        state.orders.insert(order_id, order.clone());
        Ok(order)
    }

    async fn get_order(&self, order_id: i64) -> Result<Order> {
        let state = self.enter("get_order")?;
        state
            .orders
            .get(&order_id)
            .cloned()
            .ok_or_else(|| StorefrontError::api(404, "Order not found"))
    }

    async fn update_order_status(&self, order_id: i64, status: OrderStatus) -> Result<()> {
        let mut state = self.enter("update_order_status")?;
        if let Some(order) = state.orders.get_mut(&order_id) {
            order.order_status = status;
        }
        if let Some(ticket) = state.kitchen_queue.iter_mut().find(|o| o.order_id == order_id) {
            ticket.order_status = status;
        }
        Ok(())
    }

    async fn cancel_order(&self, order_id: i64) -> Result<()> {
        let mut state = self.enter("cancel_order")?;
        match state.orders.get_mut(&order_id) {
            Some(order) => {
                order.order_status = OrderStatus::Cancelled;
                Ok(())
            }
            None => Err(StorefrontError::api(404, "Order not found")),
        }
    }

    async fn kitchen_queue(&self) -> Result<Vec<KitchenOrder>> {
        let state = self.enter("kitchen_queue")?;
        Ok(state.kitchen_queue.clone())
    }

    async fn customer_orders(&self, query: &OrderQuery) -> Result<OrderPage> {
        let state = self.enter("customer_orders")?;
        let mut orders: Vec<Order> = state
            .orders
            .values()
            .filter(|o| query.status.is_none_or(|s| o.order_status == s))
            .cloned()
            .collect();
        orders.sort_by_key(|o| std::cmp::Reverse(o.order_id));

        let page = query.page.unwrap_or(1).max(1);
        let page_size = query.page_size.unwrap_or(10).max(1);
        let total_orders = orders.len() as u64;
        let total_pages = orders.len().div_ceil(page_size as usize) as u32;
        let orders = orders
            .into_iter()
            .skip((page - 1).saturating_mul(page_size) as usize)
            .take(page_size as usize)
            .collect();
        Ok(OrderPage {
            orders,
            total_orders,
            page,
            page_size,
            total_pages,
        })
    }
}

#[async_trait]
impl PaymentApi for FakeBackend {
    async fn create_payment_intent(&self, order_id: i64) -> Result<PaymentIntent> {
        let mut state = self.enter("create_payment_intent")?;
        let amount = state
            .orders
            .get(&order_id)
            .map(|o| o.total_amount)
            .ok_or_else(|| StorefrontError::api(404, "Order not found"))?;
        state.next_intent += 1;
        let payment_intent_id = format!("pi_fake_{}", state.next_intent);
        state.intents.insert(payment_intent_id.clone(), order_id);
        Ok(PaymentIntent {
            client_secret: format!("{payment_intent_id}_secret"),
            payment_intent_id,
            amount,
        })
    }

    async fn confirm_payment(&self, payment_intent_id: &str) -> Result<()> {
        let mut state = self.enter("confirm_payment")?;
        let order_id = state
            .intents
            .get(payment_intent_id)
            .copied()
            .ok_or_else(|| StorefrontError::api(404, "Payment intent not found"))?;
        if let Some(order) = state.orders.get_mut(&order_id) {
            order.order_status = OrderStatus::Preparing;
        }
        Ok(())
    }
}

#[async_trait]
impl CardProcessor for FakeBackend {
    async fn confirm_card_payment(&self, intent: &PaymentIntent) -> Result<CardConfirmation> {
        let mut state = self.enter("confirm_card_payment")?;
        let outcome = match state.declines.pop_front() {
            Some(reason) => CardConfirmation::Declined { reason },
            None => CardConfirmation::Succeeded {
                payment_intent_id: intent.payment_intent_id.clone(),
            },
        };
        state
            .charges
            .insert(intent.payment_intent_id.clone(), outcome.clone());
        if state.lost_card_responses > 0 {
            state.lost_card_responses -= 1;
            return Err(StorefrontError::api(504, "Gateway timeout"));
        }
        Ok(outcome)
    }

    async fn charge_status(&self, payment_intent_id: &str) -> Result<CardConfirmation> {
        let state = self.enter("charge_status")?;
        Ok(state
            .charges
            .get(payment_intent_id)
            .cloned()
            .unwrap_or_else(|| CardConfirmation::Declined {
                reason: "Payment was never submitted".to_string(),
            }))
    }
}

#[async_trait]
impl DeliveryApi for FakeBackend {
    async fn quote(&self, _request: &DeliveryQuoteRequest) -> Result<DeliveryQuote> {
        let state = self.enter("quote")?;
        Ok(DeliveryQuote {
            delivery_fee: Money(dec!(5.99)),
            estimated_delivery_time: 35,
            currency: "USD".to_string(),
            quote_id: format!("quote_{}", state.calls.get("quote").copied().unwrap_or(0)),
        })
    }

    async fn create_delivery(&self, request: &CreateDeliveryRequest) -> Result<DeliveryBooking> {
        let mut state = self.enter("create_delivery")?;
        state.last_delivery_request = Some(request.clone());
        let delivery_id = format!("del_{}", request.order_id);
        Ok(DeliveryBooking {
            tracking_url: format!("https://track.example.com/{delivery_id}"),
            delivery_id,
            status: "pending".to_string(),
            estimated_delivery_time: 35,
            delivery_fee: Money(dec!(5.99)),
        })
    }

    async fn delivery_status(&self, delivery_id: &str) -> Result<DeliveryTracking> {
        drop(self.enter("delivery_status")?);
        Ok(DeliveryTracking {
            delivery_id: delivery_id.to_string(),
            status: "en_route".to_string(),
            tracking_url: format!("https://track.example.com/{delivery_id}"),
            estimated_delivery_time: 20,
            driver_name: Some("Sam".to_string()),
            driver_phone: None,
            driver_location: None,
        })
    }

    async fn delivery_for_order(&self, order_id: i64) -> Result<DeliveryTracking> {
        self.delivery_status(&format!("del_{order_id}")).await
    }

    async fn cancel_delivery(&self, _delivery_id: &str) -> Result<DeliveryCancellation> {
        drop(self.enter("cancel_delivery")?);
        Ok(DeliveryCancellation { success: true })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::CreateOrderItem;

    #[tokio::test]
    async fn test_orders_are_priced_server_side() {
        let backend = FakeBackend::new();
        backend.set_price(1, "Burger", Money(dec!(8.00)));
        let order = backend
            .create_order(&CreateOrderRequest {
                customer_id: None,
                order_type: OrderType::Takeout,
                order_items: vec![
                    CreateOrderItem {
                        menu_item_id: 1,
                        quantity: 2,
                        special_instructions: None,
                    },
                    CreateOrderItem {
                        menu_item_id: 9,
                        quantity: 1,
                        special_instructions: None,
                    },
                ],
            })
            .await
            .unwrap();
        assert_eq!(order.subtotal, Some(Money(dec!(26.00))));
        assert_eq!(order.total_amount, Money(dec!(28.08)));
        assert_eq!(order.order_items[0].menu_item_name, "Burger");
    }

    #[tokio::test]
    async fn test_queued_failures_are_consumed_in_order() {
        let backend = FakeBackend::new();
        backend.fail_next("kitchen_queue", StorefrontError::api(500, "first"));
        assert!(backend.kitchen_queue().await.is_err());
        assert!(backend.kitchen_queue().await.is_ok());
        assert_eq!(backend.calls("kitchen_queue"), 2);
        assert_eq!(backend.calls("get_order"), 0);
    }

    #[tokio::test]
    async fn test_far_page_is_empty() {
        let backend = FakeBackend::new();
        backend.seed_order(1, OrderType::Takeout, OrderStatus::Completed);
        let page = backend
            .customer_orders(&OrderQuery {
                status: None,
                page: Some(u32::MAX),
                page_size: Some(50),
            })
            .await
            .unwrap();
        assert!(page.orders.is_empty());
        assert_eq!(page.total_orders, 1);
    }

    #[tokio::test]
    async fn test_lost_card_response_still_charges() {
        let backend = FakeBackend::new();
        let order = backend.seed_order(1, OrderType::Takeout, OrderStatus::Pending);
        let intent = backend.create_payment_intent(order.order_id).await.unwrap();

        backend.lose_next_card_response();
        assert!(backend.confirm_card_payment(&intent).await.is_err());
        assert_eq!(
            backend.charge_status(&intent.payment_intent_id).await.unwrap(),
            CardConfirmation::Succeeded {
                payment_intent_id: intent.payment_intent_id.clone()
            }
        );
        assert!(matches!(
            backend.charge_status("pi_unknown").await.unwrap(),
            CardConfirmation::Declined { .. }
        ));
    }
}
