use super::money::Money;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Menu {
    pub menu_id: i64,
    pub menu_name: String,
    pub start_date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    pub is_active: bool,
}

/// A menu with its items, as returned by `GET /menu/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuWithItems {
    #[serde(flatten)]
    pub menu: Menu,
    #[serde(default)]
    pub menu_items: Vec<MenuItem>,
}

/// A sellable item. The `price` is what the cart copies at add time; the
/// backend re-prices every order line on creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuItem {
    pub menu_item_id: i64,
    pub menu_id: i64,
    pub item_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub price: Money,
    pub category: String,
    pub is_available: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prep_time_minutes: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ingredient {
    pub ingredient_id: i64,
    pub ingredient_name: String,
    pub quantity_needed: f64,
    pub is_optional: bool,
    #[serde(default)]
    pub allergen_info: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuItemDetail {
    #[serde(flatten)]
    pub item: MenuItem,
    #[serde(default)]
    pub ingredients: Vec<Ingredient>,
}

impl MenuItemDetail {
    /// Distinct allergen notes across the item's ingredients.
    pub fn allergens(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for note in self.ingredients.iter().filter_map(|i| i.allergen_info.as_deref()) {
            if !note.is_empty() && !out.contains(&note) {
                out.push(note);
            }
        }
        out
    }
}

/// Query filters for `GET /menu/items`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MenuItemFilter {
    pub category: Option<String>,
    pub max_price: Option<Money>,
    pub available_only: Option<bool>,
}

impl MenuItemFilter {
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(category) = &self.category {
            pairs.push(("category", category.clone()));
        }
        if let Some(max_price) = self.max_price {
            pairs.push(("maxPrice", max_price.value().normalize().to_string()));
        }
        if let Some(available_only) = self.available_only {
            pairs.push(("availableOnly", available_only.to_string()));
        }
        pairs
    }
}

/// Body for creating (`menu_id` set) or updating (`menu_id` ignored) an item.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuItemDraft {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub menu_id: Option<i64>,
    pub item_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub price: Money,
    pub category: String,
    pub is_available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prep_time_minutes: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuDraft {
    pub menu_name: String,
    pub start_date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    pub is_active: bool,
}
