//! Core domain types for the retail graph.
//!
//! The relational side (customers, products, orders) is what the ETL reads;
//! the graph side (labels, relationship types, derived relations) is what it
//! writes. Both are shared by every relgraph crate.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ── Identifiers ───────────────────────────────────────────────────

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_type!(
    /// Source-system id of a customer row.
    CustomerId
);
id_type!(
    /// Source-system id of a product row.
    ProductId
);
id_type!(
    /// Source-system id of an order row.
    OrderId
);

// ── Relational rows ───────────────────────────────────────────────

/// A customer record from the relational source.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Customer {
    pub id: CustomerId,
    pub name: String,
    pub email: String,
    pub city: String,
    pub country: String,
    pub segment: String,
    pub registration_date: NaiveDate,
    pub lifetime_value: f64,
}

/// A product record. `category` becomes a `Category` node on load.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub category: String,
    pub price: f64,
    pub cost: f64,
    pub margin: f64,
    pub launch_date: NaiveDate,
}

/// A single-line order: one customer buying one product.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Order {
    pub id: OrderId,
    pub customer_id: CustomerId,
    pub product_id: ProductId,
    pub order_date: NaiveDate,
    pub quantity: u32,
    pub unit_price: f64,
    pub total_amount: f64,
    pub discount: f64,
}

/// A product category, derived from distinct `Product::category` values.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Category {
    pub name: String,
}

/// The relational input to the ETL pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Dataset {
    #[serde(default)]
    pub customers: Vec<Customer>,
    #[serde(default)]
    pub products: Vec<Product>,
    #[serde(default)]
    pub orders: Vec<Order>,
}

impl Dataset {
    pub fn is_empty(&self) -> bool {
        self.customers.is_empty() && self.products.is_empty() && self.orders.is_empty()
    }
}

// ── Graph vocabulary ──────────────────────────────────────────────

/// Node labels in the graph store.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum NodeLabel {
    Customer,
    Product,
    Order,
    Category,
    /// Constrained in the schema but not loaded by the pipeline.
    Employee,
}

impl NodeLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeLabel::Customer => "Customer",
            NodeLabel::Product => "Product",
            NodeLabel::Order => "Order",
            NodeLabel::Category => "Category",
            NodeLabel::Employee => "Employee",
        }
    }

    /// Labels that carry a unique `id` constraint.
    pub fn constrained() -> [NodeLabel; 4] {
        [
            NodeLabel::Customer,
            NodeLabel::Product,
            NodeLabel::Order,
            NodeLabel::Employee,
        ]
    }
}

impl fmt::Display for NodeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Relationship types in the graph store.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelType {
    Placed,
    Contains,
    BelongsTo,
    SimilarTo,
    CoPurchased,
}

impl RelType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelType::Placed => "PLACED",
            RelType::Contains => "CONTAINS",
            RelType::BelongsTo => "BELONGS_TO",
            RelType::SimilarTo => "SIMILAR_TO",
            RelType::CoPurchased => "CO_PURCHASED",
        }
    }
}

impl fmt::Display for RelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Derived relations ─────────────────────────────────────────────

/// `(source)-[:SIMILAR_TO {strength}]->(target)` with `source < target`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Similarity {
    pub source: CustomerId,
    pub target: CustomerId,
    pub strength: u32,
}

/// `(source)-[:CO_PURCHASED {frequency}]->(target)` with `source < target`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct CoPurchase {
    pub source: ProductId,
    pub target: ProductId,
    pub frequency: u32,
}

/// Spend tier assigned from a customer's total spend.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum CustomerTier {
    #[serde(rename = "VIP")]
    Vip,
    Premium,
    Standard,
}

impl CustomerTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            CustomerTier::Vip => "VIP",
            CustomerTier::Premium => "Premium",
            CustomerTier::Standard => "Standard",
        }
    }
}

/// Aggregates computed over a customer's orders.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CustomerMetrics {
    pub total_orders: u32,
    pub total_spent: f64,
    pub avg_order_value: f64,
    pub last_order_date: NaiveDate,
    pub customer_tier: CustomerTier,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rel_type_serializes_screaming_snake() {
        let json = serde_json::to_string(&RelType::CoPurchased).unwrap();
        assert_eq!(json, "\"CO_PURCHASED\"");
        assert_eq!(RelType::SimilarTo.as_str(), "SIMILAR_TO");
    }

    #[test]
    fn ids_are_transparent_numbers() {
        let json = serde_json::to_string(&CustomerId(42)).unwrap();
        assert_eq!(json, "42");
        let id: ProductId = serde_json::from_str("7").unwrap();
        assert_eq!(id, ProductId(7));
    }

    #[test]
    fn tier_names_match_graph_properties() {
        assert_eq!(serde_json::to_string(&CustomerTier::Vip).unwrap(), "\"VIP\"");
        assert_eq!(CustomerTier::Premium.as_str(), "Premium");
    }

    #[test]
    fn dataset_parses_with_missing_sections() {
        let json = r#"{
            "customers": [{
                "id": 1, "name": "Customer 1", "email": "customer1@example.com",
                "city": "Tokyo", "country": "Japan", "segment": "SMB",
                "registration_date": "2020-01-01", "lifetime_value": 120.5
            }]
        }"#;
        let ds: Dataset = serde_json::from_str(json).unwrap();
        assert_eq!(ds.customers.len(), 1);
        assert!(ds.products.is_empty());
        assert_eq!(
            ds.customers[0].registration_date,
            NaiveDate::from_ymd_opt(2020, 1, 1).unwrap()
        );
    }

    #[test]
    fn constrained_labels_exclude_category() {
        assert!(!NodeLabel::constrained().contains(&NodeLabel::Category));
    }
}
