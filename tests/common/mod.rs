use std::fs::File;
use std::io::{Error, Write};
use std::path::Path;
use std::process::Command;

use assert_cmd::cargo_bin;

pub const HEADER: [&str; 6] = [
    "action",
    "menu_item_id",
    "name",
    "quantity",
    "unit_price",
    "instructions",
];

/// Writes `rows` add events cycling over three menu items at fixed prices.
pub fn generate_cart_events(path: &Path, rows: usize) -> Result<(), Error> {
    let file = File::create(path)?;
    let mut wtr = csv::WriterBuilder::new().from_writer(file);
    wtr.write_record(HEADER)?;

    let items = [("1", "Burger", "8.00"), ("2", "Fries", "3.00"), ("3", "Soda", "1.50")];
    for i in 0..rows {
        let (id, name, price) = items[i % items.len()];
        wtr.write_record(["add", id, name, "1", price, ""])?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_lines(path: &Path, lines: &[&str]) -> Result<(), Error> {
    let mut file = File::create(path)?;
    for line in lines {
        writeln!(file, "{line}")?;
    }
    Ok(())
}

pub fn storefront() -> Command {
    let mut cmd = Command::new(cargo_bin!("storefront"));
    cmd.env_remove("STOREFRONT_TOKEN")
        .env_remove("STOREFRONT_TAX_RATE")
        .env_remove("STOREFRONT_API_URL")
        .env_remove("STRIPE_SECRET_KEY");
    cmd
}
