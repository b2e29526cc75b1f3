use crate::domain::cart::Cart;
use crate::error::Result;
use rust_decimal::Decimal;
use serde::Serialize;
use std::io::Write;

#[derive(Serialize)]
struct LineRow<'a> {
    menu_item_id: i64,
    name: &'a str,
    quantity: u32,
    unit_price: String,
    line_total: String,
    instructions: &'a str,
}

/// Writes a cart as CSV, one row per line, followed by `subtotal`, `tax`
/// and `total` rows.
pub struct CartWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> CartWriter<W> {
    pub fn new(sink: W) -> Self {
        let writer = csv::WriterBuilder::new().flexible(true).from_writer(sink);
        Self { writer }
    }

    pub fn write_cart(&mut self, cart: &Cart, tax_rate: Decimal) -> Result<()> {
        if cart.is_empty() {
            self.writer.write_record([
                "menu_item_id",
                "name",
                "quantity",
                "unit_price",
                "line_total",
                "instructions",
            ])?;
        }
        for line in cart.lines() {
            self.writer.serialize(LineRow {
                menu_item_id: line.menu_item_id,
                name: &line.item_name,
                quantity: line.quantity,
                unit_price: line.unit_price.to_plain(),
                line_total: line.line_total().to_plain(),
                instructions: line.special_instructions.as_deref().unwrap_or(""),
            })?;
        }

        let subtotal = cart.total_price();
        self.writer.write_record(["subtotal", subtotal.to_plain().as_str()])?;
        self.writer.write_record(["tax", cart.tax(tax_rate).to_plain().as_str()])?;
        self.writer
            .write_record(["total", cart.total_with_tax(tax_rate).to_plain().as_str()])?;
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::money::Money;
    use rust_decimal_macros::dec;

    fn render(cart: &Cart) -> String {
        let mut out = Vec::new();
        CartWriter::new(&mut out).write_cart(cart, dec!(0.08)).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_write_cart_with_totals() {
        let mut cart = Cart::new();
        cart.add_priced(1, "Burger", Money::new(dec!(8.00)), 2, "no onions");
        cart.add_priced(2, "Fries", Money::new(dec!(3)), 1, "");

        let csv = render(&cart);
        assert_eq!(
            csv,
            "menu_item_id,name,quantity,unit_price,line_total,instructions\n\
             1,Burger,2,8.00,16.00,no onions\n\
             2,Fries,1,3.00,3.00,\n\
             subtotal,19.00\n\
             tax,1.52\n\
             total,20.52\n"
        );
    }

    #[test]
    fn test_write_empty_cart_keeps_header() {
        let csv = render(&Cart::new());
        assert!(csv.starts_with("menu_item_id,name,quantity"));
        assert!(csv.ends_with("total,0.00\n"));
    }
}
