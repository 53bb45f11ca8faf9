//! Row-level checks applied before anything is written to the graph.
//!
//! Invalid rows are dropped from the dataset and reported, never fatal.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use relgraph_core::{Customer, Dataset, Order, Product};

/// Which relational table a rejected row came from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Customer,
    Product,
    Order,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EntityKind::Customer => "customer",
            EntityKind::Product => "product",
            EntityKind::Order => "order",
        };
        f.write_str(s)
    }
}

/// A row excluded from the load, with the first reason it failed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RejectedRow {
    pub entity: EntityKind,
    pub id: i64,
    pub reason: String,
}

/// Split a dataset into the rows that can be loaded and the rows that
/// cannot. Customers and products are checked first so that orders are
/// resolved against the accepted rows only.
pub fn validate(dataset: Dataset) -> (Dataset, Vec<RejectedRow>) {
    let mut rejected = Vec::new();

    let mut seen = HashSet::new();
    let customers: Vec<Customer> = dataset
        .customers
        .into_iter()
        .filter(|c| {
            let reason = if !seen.insert(c.id) {
                Some("duplicate id".to_string())
            } else {
                check_amount("lifetime_value", c.lifetime_value)
            };
            keep(&mut rejected, EntityKind::Customer, c.id.0, reason)
        })
        .collect();

    let mut seen = HashSet::new();
    let products: Vec<Product> = dataset
        .products
        .into_iter()
        .filter(|p| {
            let reason = if !seen.insert(p.id) {
                Some("duplicate id".to_string())
            } else if p.category.trim().is_empty() {
                Some("empty category".to_string())
            } else if !p.margin.is_finite() {
                Some(format!("margin is not finite: {}", p.margin))
            } else {
                check_amount("price", p.price).or_else(|| check_amount("cost", p.cost))
            };
            keep(&mut rejected, EntityKind::Product, p.id.0, reason)
        })
        .collect();

    let customer_ids: HashSet<_> = customers.iter().map(|c| c.id).collect();
    let product_ids: HashSet<_> = products.iter().map(|p| p.id).collect();

    let mut seen = HashSet::new();
    let orders: Vec<Order> = dataset
        .orders
        .into_iter()
        .filter(|o| {
            let reason = if !seen.insert(o.id) {
                Some("duplicate id".to_string())
            } else if !customer_ids.contains(&o.customer_id) {
                Some(format!("unknown customer {}", o.customer_id))
            } else if !product_ids.contains(&o.product_id) {
                Some(format!("unknown product {}", o.product_id))
            } else if o.quantity == 0 {
                Some("quantity is zero".to_string())
            } else if !(0.0..=1.0).contains(&o.discount) {
                Some(format!("discount outside [0, 1]: {}", o.discount))
            } else {
                check_amount("unit_price", o.unit_price)
                    .or_else(|| check_amount("total_amount", o.total_amount))
            };
            keep(&mut rejected, EntityKind::Order, o.id.0, reason)
        })
        .collect();

    for row in &rejected {
        tracing::warn!(entity = %row.entity, id = row.id, reason = %row.reason, "Row rejected");
    }

    (
        Dataset {
            customers,
            products,
            orders,
        },
        rejected,
    )
}

fn keep(
    rejected: &mut Vec<RejectedRow>,
    entity: EntityKind,
    id: i64,
    reason: Option<String>,
) -> bool {
    match reason {
        Some(reason) => {
            rejected.push(RejectedRow { entity, id, reason });
            false
        }
        None => true,
    }
}

fn check_amount(field: &str, value: f64) -> Option<String> {
    if !value.is_finite() {
        Some(format!("{field} is not finite: {value}"))
    } else if value < 0.0 {
        Some(format!("{field} is negative: {value}"))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use relgraph_core::{CustomerId, OrderId, ProductId};

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2023, 1, 1).unwrap()
    }

    fn customer(id: i64) -> Customer {
        Customer {
            id: CustomerId(id),
            name: format!("Customer {id}"),
            email: format!("customer{id}@example.com"),
            city: "Tokyo".into(),
            country: "Japan".into(),
            segment: "Consumer".into(),
            registration_date: date(),
            lifetime_value: 500.0,
        }
    }

    fn product(id: i64) -> Product {
        Product {
            id: ProductId(id),
            name: format!("Product {id}"),
            category: "Books".into(),
            price: 20.0,
            cost: 8.0,
            margin: 0.4,
            launch_date: date(),
        }
    }

    fn order(id: i64, customer: i64, product: i64) -> Order {
        Order {
            id: OrderId(id),
            customer_id: CustomerId(customer),
            product_id: ProductId(product),
            order_date: date(),
            quantity: 1,
            unit_price: 20.0,
            total_amount: 20.0,
            discount: 0.1,
        }
    }

    fn reasons(rejected: &[RejectedRow]) -> Vec<(EntityKind, i64, &str)> {
        rejected
            .iter()
            .map(|r| (r.entity, r.id, r.reason.as_str()))
            .collect()
    }

    #[test]
    fn test_clean_dataset_passes_through() {
        let ds = Dataset {
            customers: vec![customer(1), customer(2)],
            products: vec![product(1)],
            orders: vec![order(1, 1, 1), order(2, 2, 1)],
        };
        let (valid, rejected) = validate(ds.clone());
        assert_eq!(valid, ds);
        assert!(rejected.is_empty());
    }

    #[test]
    fn test_duplicate_ids_keep_first_row() {
        let mut second = customer(1);
        second.name = "Impostor".into();
        let ds = Dataset {
            customers: vec![customer(1), second],
            products: vec![product(1), product(1)],
            orders: vec![order(1, 1, 1), order(1, 1, 1)],
        };
        let (valid, rejected) = validate(ds);

        assert_eq!(valid.customers.len(), 1);
        assert_eq!(valid.customers[0].name, "Customer 1");
        assert_eq!(valid.products.len(), 1);
        assert_eq!(valid.orders.len(), 1);
        assert_eq!(
            reasons(&rejected),
            vec![
                (EntityKind::Customer, 1, "duplicate id"),
                (EntityKind::Product, 1, "duplicate id"),
                (EntityKind::Order, 1, "duplicate id"),
            ]
        );
    }

    #[test]
    fn test_orders_resolve_against_accepted_rows() {
        let mut bad_customer = customer(2);
        bad_customer.lifetime_value = f64::NAN;
        let ds = Dataset {
            customers: vec![customer(1), bad_customer],
            products: vec![product(1)],
            orders: vec![order(1, 2, 1), order(2, 1, 9), order(3, 1, 1)],
        };
        let (valid, rejected) = validate(ds);

        assert_eq!(valid.orders.len(), 1);
        assert_eq!(valid.orders[0].id, OrderId(3));
        assert_eq!(
            reasons(&rejected),
            vec![
                (EntityKind::Customer, 2, "lifetime_value is not finite: NaN"),
                (EntityKind::Order, 1, "unknown customer 2"),
                (EntityKind::Order, 2, "unknown product 9"),
            ]
        );
    }

    #[test]
    fn test_order_value_checks() {
        let mut zero_qty = order(1, 1, 1);
        zero_qty.quantity = 0;
        let mut big_discount = order(2, 1, 1);
        big_discount.discount = 1.5;
        let mut negative = order(3, 1, 1);
        negative.total_amount = -4.0;
        let mut full_discount = order(4, 1, 1);
        full_discount.discount = 1.0;

        let ds = Dataset {
            customers: vec![customer(1)],
            products: vec![product(1)],
            orders: vec![zero_qty, big_discount, negative, full_discount],
        };
        let (valid, rejected) = validate(ds);

        assert_eq!(valid.orders.len(), 1);
        assert_eq!(valid.orders[0].id, OrderId(4));
        assert_eq!(
            reasons(&rejected),
            vec![
                (EntityKind::Order, 1, "quantity is zero"),
                (EntityKind::Order, 2, "discount outside [0, 1]: 1.5"),
                (EntityKind::Order, 3, "total_amount is negative: -4"),
            ]
        );
    }

    #[test]
    fn test_product_checks() {
        let mut no_category = product(1);
        no_category.category = "  ".into();
        let mut bad_cost = product(2);
        bad_cost.cost = f64::INFINITY;
        let ds = Dataset {
            customers: vec![],
            products: vec![no_category, bad_cost, product(3)],
            orders: vec![],
        };
        let (valid, rejected) = validate(ds);

        assert_eq!(valid.products.len(), 1);
        assert_eq!(rejected[0].reason, "empty category");
        assert_eq!(rejected[1].reason, "cost is not finite: inf");
    }

    #[test]
    fn test_rejected_row_serializes_entity_in_snake_case() {
        let row = RejectedRow {
            entity: EntityKind::Order,
            id: 7,
            reason: "quantity is zero".into(),
        };
        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["entity"], "order");
    }
}
