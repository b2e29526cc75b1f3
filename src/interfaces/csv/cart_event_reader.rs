use crate::domain::cart::Cart;
use crate::domain::money::Money;
use crate::error::{Result, StorefrontError};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Read;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CartAction {
    Add,
    Remove,
    Quantity,
    Instructions,
    Clear,
}

/// One CSV row: `action, menu_item_id, name, quantity, unit_price, instructions`.
/// Columns an action does not use may be left empty.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CartEvent {
    pub action: CartAction,
    #[serde(default)]
    pub menu_item_id: Option<i64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub quantity: Option<i64>,
    /// Kept as text so prices are parsed as decimals, never floats.
    #[serde(default)]
    pub unit_price: Option<String>,
    #[serde(default)]
    pub instructions: Option<String>,
}

/// A validated cart mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum CartCommand {
    Add {
        menu_item_id: i64,
        name: String,
        quantity: u32,
        unit_price: Money,
        instructions: String,
    },
    Remove {
        menu_item_id: i64,
    },
    SetQuantity {
        menu_item_id: i64,
        quantity: i64,
    },
    SetInstructions {
        menu_item_id: i64,
        instructions: String,
    },
    Clear,
}

impl CartCommand {
    pub fn apply(self, cart: &mut Cart) {
        match self {
            Self::Add {
                menu_item_id,
                name,
                quantity,
                unit_price,
                instructions,
            } => cart.add_priced(menu_item_id, &name, unit_price, quantity, &instructions),
            Self::Remove { menu_item_id } => cart.remove_item(menu_item_id),
            Self::SetQuantity {
                menu_item_id,
                quantity,
            } => cart.update_quantity(menu_item_id, quantity),
            Self::SetInstructions {
                menu_item_id,
                instructions,
            } => cart.update_instructions(menu_item_id, &instructions),
            Self::Clear => cart.clear(),
        }
    }
}

impl TryFrom<CartEvent> for CartCommand {
    type Error = StorefrontError;

    fn try_from(event: CartEvent) -> Result<Self> {
        let invalid = StorefrontError::ValidationError;
        let id = || {
            event
                .menu_item_id
                .ok_or_else(|| invalid(format!("{:?} requires menu_item_id", event.action)))
        };

        Ok(match event.action {
            CartAction::Add => {
                let menu_item_id = id()?;
                let quantity = event.quantity.unwrap_or(1);
                let quantity = u32::try_from(quantity)
                    .map_err(|_| invalid(format!("invalid quantity {quantity} for add")))?;
                let raw_price = event
                    .unit_price
                    .as_deref()
                    .ok_or_else(|| invalid("add requires unit_price".to_string()))?;
                let price = Decimal::from_str(raw_price)
                    .map_err(|e| invalid(format!("invalid unit_price {raw_price:?}: {e}")))?;
                if price.is_sign_negative() {
                    return Err(invalid(format!("negative unit_price {raw_price}")));
                }
                Self::Add {
                    menu_item_id,
                    name: event
                        .name
                        .clone()
                        .unwrap_or_else(|| format!("Item {menu_item_id}")),
                    quantity,
                    unit_price: Money::new(price),
                    instructions: event.instructions.clone().unwrap_or_default(),
                }
            }
            CartAction::Remove => Self::Remove {
                menu_item_id: id()?,
            },
            CartAction::Quantity => Self::SetQuantity {
                menu_item_id: id()?,
                quantity: event
                    .quantity
                    .ok_or_else(|| invalid("quantity requires a quantity".to_string()))?,
            },
            CartAction::Instructions => Self::SetInstructions {
                menu_item_id: id()?,
                instructions: event.instructions.clone().unwrap_or_default(),
            },
            CartAction::Clear => Self::Clear,
        })
    }
}

/// Reads cart events from a CSV source, trimming whitespace and tolerating
/// short rows.
pub struct CartEventReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> CartEventReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Lazily parses and validates each row. A bad row yields an error and
    /// the stream continues with the next one.
    pub fn commands(self) -> impl Iterator<Item = Result<CartCommand>> {
        self.reader.into_deserialize::<CartEvent>().map(|row| {
            let event = row.map_err(StorefrontError::from)?;
            CartCommand::try_from(event)
        })
    }
}
