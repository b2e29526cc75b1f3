use super::notifications::Notifications;
use crate::domain::kitchen::{KitchenOrder, QueueCounts, StatusFilter};
use crate::domain::order::OrderStatus;
use crate::domain::ports::OrderApiRef;
use crate::error::Result;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct KitchenState {
    pub queue: Vec<KitchenOrder>,
    pub is_loading: bool,
    pub last_error: Option<String>,
}

/// A local status change that outlives fetches already in flight when it
/// was made.
#[derive(Debug, Clone, Copy)]
struct StatusPatch {
    order_id: i64,
    status: OrderStatus,
    /// Last sequence number issued before the patch.
    watermark: u64,
}

#[derive(Debug, Default)]
struct Sequencer {
    issued: u64,
    applied: u64,
    patches: Vec<StatusPatch>,
}

impl Sequencer {
    fn reapply(&self, queue: &mut [KitchenOrder]) {
        for patch in &self.patches {
            if let Some(order) = queue.iter_mut().find(|o| o.order_id == patch.order_id) {
                order.order_status = patch.status;
            }
        }
    }
}

struct Inner {
    api: OrderApiRef,
    notifications: Notifications,
    state: watch::Sender<KitchenState>,
    sequencer: Mutex<Sequencer>,
    in_flight: AtomicUsize,
}

/// Counts one fetch as in flight until released. A fetch dropped before
/// completing (poller aborted mid-request) still gives its slot back, so
/// `is_loading` cannot stick.
struct LoadingGuard<'a> {
    inner: &'a Inner,
    armed: bool,
}

impl<'a> LoadingGuard<'a> {
    fn enter(inner: &'a Inner) -> Self {
        inner.in_flight.fetch_add(1, Ordering::SeqCst);
        inner.state.send_modify(|s| s.is_loading = true);
        Self { inner, armed: true }
    }

    /// Gives the slot back and reports whether other fetches are still running.
    fn release(mut self) -> bool {
        self.armed = false;
        self.inner.in_flight.fetch_sub(1, Ordering::SeqCst) > 1
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if self.inner.in_flight.fetch_sub(1, Ordering::SeqCst) == 1 {
            debug!("abandoned kitchen fetch was the last in flight");
            self.inner.state.send_if_modified(|s| {
                let was_loading = s.is_loading;
                s.is_loading = false;
                was_loading
            });
        }
    }
}

/// Kitchen ticket queue, refreshed wholesale from the backend.
///
/// Every fetch is numbered. A response is applied only if no later-numbered
/// response has been applied already, so overlapping ticks and manual
/// refreshes settle on the newest data.
#[derive(Clone)]
pub struct KitchenQueue {
    inner: Arc<Inner>,
}

impl KitchenQueue {
    pub fn new(api: OrderApiRef, notifications: Notifications) -> Self {
        let (state, _) = watch::channel(KitchenState::default());
        Self {
            inner: Arc::new(Inner {
                api,
                notifications,
                state,
                sequencer: Mutex::new(Sequencer::default()),
                in_flight: AtomicUsize::new(0),
            }),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<KitchenState> {
        self.inner.state.subscribe()
    }

    pub fn snapshot(&self) -> KitchenState {
        self.inner.state.borrow().clone()
    }

    pub fn queue(&self) -> Vec<KitchenOrder> {
        self.inner.state.borrow().queue.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.inner.state.borrow().is_loading
    }

    pub fn last_error(&self) -> Option<String> {
        self.inner.state.borrow().last_error.clone()
    }

    pub fn filtered(&self, filter: StatusFilter) -> Vec<KitchenOrder> {
        self.inner
            .state
            .borrow()
            .queue
            .iter()
            .filter(|o| filter.matches(o))
            .cloned()
            .collect()
    }

    pub fn counts(&self) -> QueueCounts {
        QueueCounts::of(&self.inner.state.borrow().queue)
    }

    /// Fetches the queue and replaces local state, unless a newer fetch
    /// landed first. Failures keep the previous queue and are recorded.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> Result<()> {
        let seq = {
            let mut seq = self.inner.sequencer.lock().await;
            seq.issued += 1;
            seq.issued
        };
        let loading = LoadingGuard::enter(&self.inner);

        let response = self.inner.api.kitchen_queue().await;

        let mut sequencer = self.inner.sequencer.lock().await;
        let still_loading = loading.release();

        if seq <= sequencer.applied {
            debug!(seq, applied = sequencer.applied, "discarding stale kitchen queue response");
            self.inner.state.send_modify(|s| s.is_loading = still_loading);
            return Ok(());
        }

        match response {
            Ok(mut queue) => {
                sequencer.applied = seq;
                sequencer.patches.retain(|p| p.watermark >= seq);
                sequencer.reapply(&mut queue);
                debug!(seq, tickets = queue.len(), "kitchen queue refreshed");
                self.inner.state.send_replace(KitchenState {
                    queue,
                    is_loading: still_loading,
                    last_error: None,
                });
                Ok(())
            }
            Err(e) => {
                warn!(seq, error = %e, "kitchen queue refresh failed");
                self.inner.state.send_modify(|s| {
                    s.is_loading = still_loading;
                    s.last_error = Some(e.user_message());
                });
                self.inner
                    .notifications
                    .error("Refresh Failed", "Failed to load kitchen queue");
                Err(e)
            }
        }
    }

    /// Sends the transition to the backend, then patches the local ticket.
    #[instrument(skip(self))]
    pub async fn update_status(&self, order_id: i64, status: OrderStatus) -> Result<()> {
        if let Err(e) = self.inner.api.update_order_status(order_id, status).await {
            warn!(error = %e, "order status update failed");
            self.inner
                .notifications
                .error("Update Failed", format!("Could not update order #{order_id}"));
            return Err(e);
        }
        self.record_status(order_id, status).await;
        info!("order status updated");
        self.inner.notifications.success(
            "Order Updated",
            format!("Order #{order_id} is now {status}"),
        );
        Ok(())
    }

    /// Applies the ticket's next kitchen action. Returns the new status, or
    /// `None` when the ticket is unknown or has no action.
    pub async fn advance(&self, order_id: i64) -> Result<Option<OrderStatus>> {
        let action = self
            .inner
            .state
            .borrow()
            .queue
            .iter()
            .find(|o| o.order_id == order_id)
            .and_then(|o| o.order_status.next_kitchen_action());
        let Some(action) = action else {
            return Ok(None);
        };
        self.update_status(order_id, action.target).await?;
        Ok(Some(action.target))
    }

    /// Patches the local ticket after the backend accepted a transition.
    /// Fetches already in flight will not undo it.
    pub async fn record_status(&self, order_id: i64, status: OrderStatus) {
        let mut sequencer = self.inner.sequencer.lock().await;
        let watermark = sequencer.issued;
        sequencer.patches.retain(|p| p.order_id != order_id);
        sequencer.patches.push(StatusPatch {
            order_id,
            status,
            watermark,
        });
        self.inner.state.send_if_modified(|s| {
            match s.queue.iter_mut().find(|o| o.order_id == order_id) {
                Some(order) if order.order_status != status => {
                    order.order_status = status;
                    true
                }
                _ => false,
            }
        });
    }

    /// Refreshes now and then every `interval` until the handle is stopped
    /// or dropped.
    pub fn spawn_poller(&self, interval: Duration) -> PollerHandle {
        let queue = self.clone();
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                // failures are already recorded in state
                let _ = queue.refresh().await;
            }
        });
        info!(interval_ms = interval.as_millis() as u64, "kitchen poller started");
        PollerHandle { task }
    }
}

/// Owns the polling task. Dropping the handle stops polling.
pub struct PollerHandle {
    task: JoinHandle<()>,
}

impl PollerHandle {
    /// Same as dropping the handle.
    pub fn stop(self) {
        drop(self);
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.task.abort();
        debug!("kitchen poller stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::notifications::ToastKind;
    use crate::domain::kitchen::KitchenOrder;
    use crate::domain::order::{CreateOrderRequest, Order, OrderPage, OrderQuery, OrderType};
    use crate::domain::ports::OrderApi;
    use crate::error::StorefrontError;
    use crate::infrastructure::fake::FakeBackend;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use tokio::sync::oneshot;

    fn ticket(id: i64, status: OrderStatus) -> KitchenOrder {
        KitchenOrder {
            order_id: id,
            customer_name: "Grace".into(),
            order_date: "2024-05-01".into(),
            order_time: "12:00:00".into(),
            order_type: OrderType::Takeout,
            order_status: status,
            estimated_prep_time: 10,
            order_items: vec![],
        }
    }

    /// Kitchen queue responses released by the test, in call order.
    #[derive(Default)]
    struct Gated {
        pending: std::sync::Mutex<VecDeque<oneshot::Receiver<Vec<KitchenOrder>>>>,
    }

    impl Gated {
        fn gate(&self) -> oneshot::Sender<Vec<KitchenOrder>> {
            let (tx, rx) = oneshot::channel();
            self.pending.lock().unwrap().push_back(rx);
            tx
        }
    }

    #[async_trait]
    impl OrderApi for Gated {
        async fn create_order(&self, _: &CreateOrderRequest) -> Result<Order> {
            Err(StorefrontError::api(501, "unused"))
        }
        async fn get_order(&self, _: i64) -> Result<Order> {
            Err(StorefrontError::api(501, "unused"))
        }
        async fn update_order_status(&self, _: i64, _: OrderStatus) -> Result<()> {
            Ok(())
        }
        async fn cancel_order(&self, _: i64) -> Result<()> {
            Ok(())
        }
        async fn kitchen_queue(&self) -> Result<Vec<KitchenOrder>> {
            let rx = self.pending.lock().unwrap().pop_front();
            match rx {
                Some(rx) => rx.await.map_err(|_| StorefrontError::api(503, "gate dropped")),
                None => Ok(vec![]),
            }
        }
        async fn customer_orders(&self, _: &OrderQuery) -> Result<OrderPage> {
            Err(StorefrontError::api(501, "unused"))
        }
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_previous_queue() {
        let backend = Arc::new(FakeBackend::new());
        backend.set_kitchen_queue(vec![ticket(1, OrderStatus::Preparing)]);
        let notes = Notifications::new();
        let kitchen = KitchenQueue::new(backend.clone(), notes.clone());

        kitchen.refresh().await.unwrap();
        assert_eq!(kitchen.queue().len(), 1);

        backend.fail_next("kitchen_queue", StorefrontError::api(500, "boom"));
        assert!(kitchen.refresh().await.is_err());

        let state = kitchen.snapshot();
        assert_eq!(state.queue.len(), 1);
        assert!(!state.is_loading);
        assert!(state.last_error.is_some());
        assert_eq!(notes.count(ToastKind::Error), 1);

        kitchen.refresh().await.unwrap();
        assert!(kitchen.last_error().is_none());
    }

    #[tokio::test]
    async fn test_older_response_is_discarded() {
        let gated = Arc::new(Gated::default());
        let first = gated.gate();
        let second = gated.gate();
        let kitchen = KitchenQueue::new(gated.clone(), Notifications::new());

        let (a, b, ()) = tokio::join!(kitchen.refresh(), kitchen.refresh(), async {
            second.send(vec![ticket(1, OrderStatus::Ready)]).unwrap();
            tokio::task::yield_now().await;
            first.send(vec![ticket(1, OrderStatus::Preparing)]).unwrap();
        });
        a.unwrap();
        b.unwrap();

        let state = kitchen.snapshot();
        assert_eq!(state.queue[0].order_status, OrderStatus::Ready);
        assert!(!state.is_loading);
    }

    #[tokio::test]
    async fn test_status_patch_survives_in_flight_fetch() {
        let gated = Arc::new(Gated::default());
        let initial = gated.gate();
        let kitchen = KitchenQueue::new(gated.clone(), Notifications::new());
        initial.send(vec![ticket(1, OrderStatus::Preparing)]).unwrap();
        kitchen.refresh().await.unwrap();

        let in_flight = gated.gate();
        let (refreshed, ()) = tokio::join!(kitchen.refresh(), async {
            kitchen.update_status(1, OrderStatus::Ready).await.unwrap();
            // the backend snapshot predates the update
            in_flight.send(vec![ticket(1, OrderStatus::Preparing)]).unwrap();
        });
        refreshed.unwrap();
        assert_eq!(kitchen.queue()[0].order_status, OrderStatus::Ready);

        // a fetch started after the patch is authoritative
        let later = gated.gate();
        later.send(vec![ticket(1, OrderStatus::Preparing)]).unwrap();
        kitchen.refresh().await.unwrap();
        assert_eq!(kitchen.queue()[0].order_status, OrderStatus::Preparing);
    }

    #[tokio::test]
    async fn test_advance_follows_ticket_actions() {
        let backend = Arc::new(FakeBackend::new());
        backend.set_kitchen_queue(vec![
            ticket(1, OrderStatus::Preparing),
            ticket(2, OrderStatus::Pending),
        ]);
        let kitchen = KitchenQueue::new(backend.clone(), Notifications::new());
        kitchen.refresh().await.unwrap();

        assert_eq!(kitchen.advance(1).await.unwrap(), Some(OrderStatus::Ready));
        assert_eq!(kitchen.advance(1).await.unwrap(), Some(OrderStatus::Completed));
        assert_eq!(kitchen.advance(2).await.unwrap(), None);
        assert_eq!(kitchen.advance(99).await.unwrap(), None);
        assert_eq!(backend.calls("update_order_status"), 2);

        let counts = kitchen.counts();
        assert_eq!(counts.total, 2);
        assert_eq!(counts.preparing, 0);
        assert_eq!(
            kitchen.filtered(StatusFilter::Only(OrderStatus::Completed)).len(),
            1
        );
    }

    #[tokio::test]
    async fn test_failed_update_leaves_ticket() {
        let backend = Arc::new(FakeBackend::new());
        backend.set_kitchen_queue(vec![ticket(1, OrderStatus::Preparing)]);
        let kitchen = KitchenQueue::new(backend.clone(), Notifications::new());
        kitchen.refresh().await.unwrap();

        backend.fail_next("update_order_status", StorefrontError::api(409, "conflict"));
        assert!(kitchen.update_status(1, OrderStatus::Ready).await.is_err());
        assert_eq!(kitchen.queue()[0].order_status, OrderStatus::Preparing);
    }

    #[tokio::test]
    async fn test_stopping_poller_mid_fetch_clears_loading() {
        let gated = Arc::new(Gated::default());
        // held open so the first fetch never completes
        let _stalled = gated.gate();
        let kitchen = KitchenQueue::new(gated.clone(), Notifications::new());
        let mut updates = kitchen.subscribe();

        let handle = kitchen.spawn_poller(Duration::from_secs(60));
        updates.wait_for(|s| s.is_loading).await.unwrap();
        handle.stop();
        tokio::time::timeout(Duration::from_secs(5), updates.wait_for(|s| !s.is_loading))
            .await
            .expect("loading flag stuck after the poller was stopped")
            .unwrap();

        kitchen.refresh().await.unwrap();
        assert!(!kitchen.is_loading());
    }

    #[tokio::test]
    async fn test_poller_refreshes_until_stopped() {
        let backend = Arc::new(FakeBackend::new());
        let kitchen = KitchenQueue::new(backend.clone(), Notifications::new());

        let handle = kitchen.spawn_poller(Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(handle.is_running());
        handle.stop();

        let calls = backend.calls("kitchen_queue");
        assert!(calls >= 2, "expected repeated polls, got {calls}");
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(backend.calls("kitchen_queue"), calls);
    }
}
