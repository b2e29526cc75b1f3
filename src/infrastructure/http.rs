use crate::application::session::{Session, SignOutReason};
use crate::config::StorefrontConfig;
use crate::domain::auth::{AuthResponse, LoginRequest, RegisterRequest};
use crate::domain::delivery::{
    CreateDeliveryRequest, DeliveryBooking, DeliveryCancellation, DeliveryQuote,
    DeliveryQuoteRequest, DeliveryTracking,
};
use crate::domain::inventory::{InventoryFilter, InventoryItem, LowStockAlert, StockAdjustment};
use crate::domain::kitchen::KitchenOrder;
use crate::domain::menu::{
    Menu, MenuDraft, MenuItem, MenuItemDetail, MenuItemDraft, MenuItemFilter, MenuWithItems,
};
use crate::domain::order::{
    CreateOrderRequest, Order, OrderPage, OrderQuery, OrderStatus, StatusUpdate,
};
use crate::domain::payment::{ConfirmPaymentRequest, PaymentIntent, PaymentIntentRequest};
use crate::domain::ports::{
    AuthApi, CatalogApi, DeliveryApi, InventoryApi, OrderApi, PaymentApi,
};
use crate::error::{Result, StorefrontError};
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, instrument, warn};

/// REST client for the storefront backend.
///
/// One method per endpoint, no retries and no caching. The bearer token is
/// read from the shared [`Session`] on every request, and any 401 tears
/// that session down.
#[derive(Clone)]
pub struct HttpStorefrontApi {
    client: Client,
    base_url: String,
    session: Session,
}

impl HttpStorefrontApi {
    pub fn new(config: &StorefrontConfig, session: Session) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url().to_string(),
            session,
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self
            .client
            .request(method, format!("{}{}", self.base_url, path));
        match self.session.token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn dispatch(&self, builder: RequestBuilder) -> Result<Response> {
        let response = builder.send().await?;
        let status = response.status();
        debug!(status = status.as_u16(), url = %response.url(), "response");

        if status == StatusCode::UNAUTHORIZED {
            warn!("backend rejected credentials");
            self.session.teardown(SignOutReason::Expired);
            return Err(StorefrontError::Unauthorized);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StorefrontError::api(
                status.as_u16(),
                error_message(status, &body),
            ));
        }
        Ok(response)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.dispatch(self.request(Method::GET, path)).await?;
        Ok(response.json().await?)
    }

    async fn get_query<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&'static str, String)],
    ) -> Result<T> {
        let response = self
            .dispatch(self.request(Method::GET, path).query(query))
            .await?;
        Ok(response.json().await?)
    }

    async fn send_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let response = self.dispatch(self.request(method, path).json(body)).await?;
        Ok(response.json().await?)
    }

    /// For endpoints whose response body is ignored.
    async fn send_unit<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<()> {
        let builder = self.request(method, path);
        let builder = match body {
            Some(body) => builder.json(body),
            None => builder,
        };
        self.dispatch(builder).await?;
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<()> {
        self.send_unit::<()>(Method::DELETE, path, None).await
    }
}

/// Best human-readable message from an error body: a JSON `message`,
/// `error` or `title` field, the raw text, or the status reason.
fn error_message(status: StatusCode, body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["message", "error", "title"] {
            if let Some(msg) = value.get(key).and_then(|v| v.as_str()) {
                return msg.to_string();
            }
        }
    }
    let text = body.trim();
    if !text.is_empty() && !text.starts_with('{') {
        return text.to_string();
    }
    status
        .canonical_reason()
        .unwrap_or("Request failed")
        .to_string()
}

#[async_trait]
impl AuthApi for HttpStorefrontApi {
    #[instrument(skip_all)]
    async fn login(&self, request: &LoginRequest) -> Result<AuthResponse> {
        self.send_json(Method::POST, "/auth/login", request).await
    }

    #[instrument(skip_all)]
    async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse> {
        self.send_json(Method::POST, "/auth/register", request).await
    }

    #[instrument(skip_all)]
    async fn current_user(&self) -> Result<AuthResponse> {
        self.get("/auth/me").await
    }
}

#[async_trait]
impl OrderApi for HttpStorefrontApi {
    #[instrument(skip_all, fields(lines = request.order_items.len()))]
    async fn create_order(&self, request: &CreateOrderRequest) -> Result<Order> {
        self.send_json(Method::POST, "/order", request).await
    }

    #[instrument(skip(self))]
    async fn get_order(&self, order_id: i64) -> Result<Order> {
        self.get(&format!("/order/{order_id}")).await
    }

    #[instrument(skip(self))]
    async fn update_order_status(&self, order_id: i64, status: OrderStatus) -> Result<()> {
        let body = StatusUpdate {
            order_status: status,
        };
        self.send_unit(Method::PATCH, &format!("/order/{order_id}/status"), Some(&body))
            .await
    }

    #[instrument(skip(self))]
    async fn cancel_order(&self, order_id: i64) -> Result<()> {
        self.delete(&format!("/order/{order_id}")).await
    }

    #[instrument(skip(self))]
    async fn kitchen_queue(&self) -> Result<Vec<KitchenOrder>> {
        self.get("/order/kitchen-queue").await
    }

    #[instrument(skip(self))]
    async fn customer_orders(&self, query: &OrderQuery) -> Result<OrderPage> {
        self.get_query("/customer/orders", &query.query_pairs()).await
    }
}

#[async_trait]
impl PaymentApi for HttpStorefrontApi {
    #[instrument(skip(self))]
    async fn create_payment_intent(&self, order_id: i64) -> Result<PaymentIntent> {
        let body = PaymentIntentRequest { order_id };
        self.send_json(Method::POST, "/payment/create-payment-intent", &body)
            .await
    }

    #[instrument(skip(self))]
    async fn confirm_payment(&self, payment_intent_id: &str) -> Result<()> {
        let body = ConfirmPaymentRequest {
            payment_intent_id: payment_intent_id.to_string(),
        };
        self.send_unit(Method::POST, "/payment/confirm-payment", Some(&body))
            .await
    }
}

#[async_trait]
impl DeliveryApi for HttpStorefrontApi {
    #[instrument(skip_all)]
    async fn quote(&self, request: &DeliveryQuoteRequest) -> Result<DeliveryQuote> {
        self.send_json(Method::POST, "/delivery/quote", request).await
    }

    #[instrument(skip_all, fields(order_id = request.order_id))]
    async fn create_delivery(&self, request: &CreateDeliveryRequest) -> Result<DeliveryBooking> {
        self.send_json(Method::POST, "/delivery/create", request).await
    }

    async fn delivery_status(&self, delivery_id: &str) -> Result<DeliveryTracking> {
        self.get(&format!("/delivery/status/{delivery_id}")).await
    }

    async fn delivery_for_order(&self, order_id: i64) -> Result<DeliveryTracking> {
        self.get(&format!("/delivery/order/{order_id}")).await
    }

    #[instrument(skip(self))]
    async fn cancel_delivery(&self, delivery_id: &str) -> Result<DeliveryCancellation> {
        let response = self
            .dispatch(self.request(Method::DELETE, &format!("/delivery/cancel/{delivery_id}")))
            .await?;
        Ok(response.json().await?)
    }
}

#[async_trait]
impl CatalogApi for HttpStorefrontApi {
    async fn menus(&self) -> Result<Vec<Menu>> {
        self.get("/menu").await
    }

    async fn menu(&self, menu_id: i64) -> Result<MenuWithItems> {
        self.get(&format!("/menu/{menu_id}")).await
    }

    async fn create_menu(&self, draft: &MenuDraft) -> Result<Menu> {
        self.send_json(Method::POST, "/menu", draft).await
    }

    async fn update_menu(&self, menu_id: i64, draft: &MenuDraft) -> Result<()> {
        self.send_unit(Method::PUT, &format!("/menu/{menu_id}"), Some(draft))
            .await
    }

    async fn delete_menu(&self, menu_id: i64) -> Result<()> {
        self.delete(&format!("/menu/{menu_id}")).await
    }

    async fn menu_items(&self, filter: &MenuItemFilter) -> Result<Vec<MenuItem>> {
        self.get_query("/menu/items", &filter.query_pairs()).await
    }

    async fn menu_item(&self, menu_item_id: i64) -> Result<MenuItemDetail> {
        self.get(&format!("/menu/items/{menu_item_id}")).await
    }

    async fn categories(&self) -> Result<Vec<String>> {
        self.get("/menu/categories").await
    }

    async fn create_menu_item(&self, draft: &MenuItemDraft) -> Result<MenuItem> {
        self.send_json(Method::POST, "/menu/items", draft).await
    }

    async fn update_menu_item(&self, menu_item_id: i64, draft: &MenuItemDraft) -> Result<()> {
        self.send_unit(
            Method::PUT,
            &format!("/menu/items/{menu_item_id}"),
            Some(draft),
        )
        .await
    }

    async fn set_item_availability(&self, menu_item_id: i64, is_available: bool) -> Result<()> {
        self.send_unit(
            Method::PATCH,
            &format!("/menu/items/{menu_item_id}/availability"),
            Some(&json!({ "isAvailable": is_available })),
        )
        .await
    }

    async fn delete_menu_item(&self, menu_item_id: i64) -> Result<()> {
        self.delete(&format!("/menu/items/{menu_item_id}")).await
    }
}

#[async_trait]
impl InventoryApi for HttpStorefrontApi {
    async fn inventory(&self, filter: &InventoryFilter) -> Result<Vec<InventoryItem>> {
        self.get_query("/inventory", &filter.query_pairs()).await
    }

    async fn inventory_item(&self, inventory_id: i64) -> Result<InventoryItem> {
        self.get(&format!("/inventory/{inventory_id}")).await
    }

    async fn low_stock_alerts(&self) -> Result<Vec<LowStockAlert>> {
        self.get("/inventory/low-stock").await
    }

    #[instrument(skip(self, adjustment))]
    async fn adjust_stock(
        &self,
        inventory_id: i64,
        adjustment: &StockAdjustment,
    ) -> Result<InventoryItem> {
        self.send_json(
            Method::POST,
            &format!("/inventory/{inventory_id}/adjust"),
            adjustment,
        )
        .await
    }
}
