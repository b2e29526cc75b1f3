use crate::domain::kitchen::KitchenOrder;
use crate::error::Result;
use chrono::NaiveDateTime;
use serde::Serialize;
use std::io::Write;

#[derive(Serialize)]
struct TicketRow<'a> {
    order_id: i64,
    customer: &'a str,
    order_type: &'static str,
    status: &'static str,
    items: String,
    timer: String,
    next_action: &'static str,
}

/// Writes kitchen tickets as CSV. Items are joined as `2x Burger (no onions); 1x Fries`.
pub struct TicketWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> TicketWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_tickets(&mut self, tickets: &[KitchenOrder], now: NaiveDateTime) -> Result<()> {
        if tickets.is_empty() {
            self.writer.write_record([
                "order_id",
                "customer",
                "order_type",
                "status",
                "items",
                "timer",
                "next_action",
            ])?;
        }
        for ticket in tickets {
            let items = ticket
                .order_items
                .iter()
                .map(|item| match item.special_instructions.as_deref() {
                    Some(note) if !note.is_empty() => {
                        format!("{}x {} ({note})", item.quantity, item.menu_item_name)
                    }
                    _ => format!("{}x {}", item.quantity, item.menu_item_name),
                })
                .collect::<Vec<_>>()
                .join("; ");
            self.writer.serialize(TicketRow {
                order_id: ticket.order_id,
                customer: ticket.display_name(),
                order_type: ticket.order_type.as_str(),
                status: ticket.order_status.as_str(),
                items,
                timer: ticket.timer(now).map(|t| t.label()).unwrap_or_default(),
                next_action: ticket
                    .order_status
                    .next_kitchen_action()
                    .map_or("", |a| a.label),
            })?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
