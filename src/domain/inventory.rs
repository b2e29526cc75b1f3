use super::money::Money;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StockStatus {
    Good,
    Warning,
    Low,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItem {
    pub inventory_id: i64,
    pub ingredient_id: i64,
    pub ingredient_name: String,
    pub unit_of_measure: String,
    pub current_stock: f64,
    pub minimum_stock: f64,
    #[serde(default)]
    pub maximum_stock: Option<f64>,
    pub last_updated: String,
    #[serde(default)]
    pub location: Option<String>,
    pub stock_status: StockStatus,
    #[serde(default)]
    pub cost_per_unit: Option<Money>,
    pub stock_value: Money,
    #[serde(default)]
    pub allergen_info: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LowStockAlert {
    pub inventory_id: i64,
    pub ingredient_name: String,
    pub current_stock: f64,
    pub minimum_stock: f64,
    pub unit_of_measure: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub supplier_name: Option<String>,
    pub days_until_stock_out: f64,
    pub suggested_order_quantity: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdjustmentType {
    Add,
    Subtract,
    Set,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockAdjustment {
    pub adjustment_type: AdjustmentType,
    pub quantity: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct InventoryFilter {
    pub low_stock_only: bool,
    pub location: Option<String>,
    pub search: Option<String>,
}

impl InventoryFilter {
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if self.low_stock_only {
            pairs.push(("lowStockOnly", "true".to_string()));
        }
        if let Some(location) = &self.location {
            pairs.push(("location", location.clone()));
        }
        if let Some(search) = &self.search {
            pairs.push(("search", search.clone()));
        }
        pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adjustment_wire_format() {
        let adj = StockAdjustment {
            adjustment_type: AdjustmentType::Subtract,
            quantity: 2.5,
            reason: Some("spoilage".into()),
        };
        assert_eq!(
            serde_json::to_value(&adj).unwrap(),
            serde_json::json!({"adjustmentType": "subtract", "quantity": 2.5, "reason": "spoilage"})
        );
    }

    #[test]
    fn test_inventory_filter_pairs() {
        let filter = InventoryFilter {
            low_stock_only: true,
            location: None,
            search: Some("flour".into()),
        };
        assert_eq!(
            filter.query_pairs(),
            vec![("lowStockOnly", "true".to_string()), ("search", "flour".to_string())]
        );
    }
}
