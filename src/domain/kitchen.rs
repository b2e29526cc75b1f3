use super::order::{OrderStatus, OrderType};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KitchenOrderItem {
    pub menu_item_name: String,
    pub quantity: u32,
    #[serde(default)]
    pub special_instructions: Option<String>,
}

/// Kitchen-display projection of an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KitchenOrder {
    pub order_id: i64,
    #[serde(default)]
    pub customer_name: String,
    #[serde(default)]
    pub order_date: String,
    /// Wall-clock time of day the order was placed, `HH:MM[:SS]`.
    #[serde(default)]
    pub order_time: String,
    pub order_type: OrderType,
    pub order_status: OrderStatus,
    #[serde(default)]
    pub estimated_prep_time: u32,
    #[serde(default)]
    pub order_items: Vec<KitchenOrderItem>,
}

impl KitchenOrder {
    pub fn display_name(&self) -> &str {
        if self.customer_name.is_empty() {
            "Walk-in"
        } else {
            &self.customer_name
        }
    }

    /// Placement instant from `order_date` and `order_time`. A missing or
    /// unparseable date falls back to `today`.
    pub fn placed_at(&self, today: NaiveDate) -> Option<NaiveDateTime> {
        let time = parse_time_of_day(&self.order_time)?;
        let date = parse_date(&self.order_date).unwrap_or(today);
        Some(date.and_time(time))
    }

    /// Timer state relative to `now`; `None` when `order_time` is unparseable.
    pub fn timer(&self, now: NaiveDateTime) -> Option<OrderTimer> {
        let placed = self.placed_at(now.date())?;
        Some(OrderTimer::new(placed, now, self.estimated_prep_time))
    }
}

/// Accepts `YYYY-MM-DD` with or without a trailing time part.
fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    let day = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

fn parse_time_of_day(raw: &str) -> Option<NaiveTime> {
    let raw = raw.trim();
    NaiveTime::parse_from_str(raw, "%H:%M:%S%.f")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
        .ok()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
    /// No estimate; only elapsed time is known.
    Elapsed,
    Remaining(u32),
    Overdue(u32),
}

/// Minutes since an order was placed compared against its prep estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderTimer {
    pub elapsed_minutes: u32,
    pub state: TimerState,
}

impl OrderTimer {
    /// A placement after `now` (clock skew) clamps elapsed time to zero.
    pub fn new(placed: NaiveDateTime, now: NaiveDateTime, estimated_prep_time: u32) -> Self {
        let elapsed_minutes = u32::try_from((now - placed).num_minutes().max(0)).unwrap_or(u32::MAX);

        let state = if estimated_prep_time == 0 {
            TimerState::Elapsed
        } else if elapsed_minutes > estimated_prep_time {
            TimerState::Overdue(elapsed_minutes - estimated_prep_time)
        } else {
            TimerState::Remaining(estimated_prep_time - elapsed_minutes)
        };

        Self {
            elapsed_minutes,
            state,
        }
    }

    /// At most five minutes left, or already late.
    pub fn is_urgent(&self) -> bool {
        matches!(self.state, TimerState::Overdue(_))
            || matches!(self.state, TimerState::Remaining(m) if m <= 5)
    }

    pub fn label(&self) -> String {
        match self.state {
            TimerState::Elapsed => format!("{}m elapsed", self.elapsed_minutes),
            TimerState::Remaining(m) => format!("{m}m remaining"),
            TimerState::Overdue(m) => format!("{m}m overdue"),
        }
    }
}

/// Local predicate over the fetched queue. Never affects what is fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Only(OrderStatus),
}

impl StatusFilter {
    pub fn matches(&self, order: &KitchenOrder) -> bool {
        match self {
            Self::All => true,
            Self::Only(status) => order.order_status == *status,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QueueCounts {
    pub preparing: usize,
    pub ready: usize,
    pub total: usize,
}

impl QueueCounts {
    pub fn of(queue: &[KitchenOrder]) -> Self {
        queue.iter().fold(
            Self {
                total: queue.len(),
                ..Self::default()
            },
            |mut counts, order| {
                match order.order_status {
                    OrderStatus::Preparing => counts.preparing += 1,
                    OrderStatus::Ready => counts.ready += 1,
                    _ => {}
                }
                counts
            },
        )
    }
}
