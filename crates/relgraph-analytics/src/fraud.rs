//! Fraud pattern detection over customer orders.
//!
//! Three patterns are checked. Each alert carries a 0–10 score so alerts
//! from different patterns can be ranked together.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use relgraph_core::config::AnalyticsSettings;
use relgraph_core::{CustomerId, Order, OrderId};
use relgraph_etl::RetailGraph;
use relgraph_graph::{OrderFlag, SameDayRecord};

const MAX_SCORE: f64 = 10.0;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum FraudPattern {
    /// Several orders on one day adding up to a large total.
    SameDayHighValue,
    /// An order far above the customer's usual amount.
    AmountSpike,
    /// A heavily discounted large order.
    HighDiscountHighValue,
}

impl FraudPattern {
    pub fn as_str(&self) -> &'static str {
        match self {
            FraudPattern::SameDayHighValue => "same_day_high_value",
            FraudPattern::AmountSpike => "amount_spike",
            FraudPattern::HighDiscountHighValue => "high_discount_high_value",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FraudAlert {
    pub customer_id: CustomerId,
    pub pattern: FraudPattern,
    /// Ascending.
    pub order_ids: Vec<OrderId>,
    pub total_amount: f64,
    pub score: f64,
    pub description: String,
}

#[derive(Debug, Clone)]
pub struct FraudThresholds {
    pub same_day_threshold: f64,
    pub same_day_min_orders: usize,
    pub spike_multiplier: f64,
    pub spike_min_history: usize,
    pub discount_threshold: f64,
    pub discount_min_amount: f64,
}

impl Default for FraudThresholds {
    fn default() -> Self {
        Self::from(&AnalyticsSettings::default())
    }
}

impl From<&AnalyticsSettings> for FraudThresholds {
    fn from(s: &AnalyticsSettings) -> Self {
        Self {
            same_day_threshold: s.same_day_threshold,
            same_day_min_orders: s.same_day_min_orders,
            spike_multiplier: s.spike_multiplier,
            spike_min_history: s.spike_min_history,
            discount_threshold: s.discount_threshold,
            discount_min_amount: s.discount_min_amount,
        }
    }
}

/// Run every pattern. Sorted by score (highest first), then customer id,
/// then first order id.
pub fn detect(model: &RetailGraph, t: &FraudThresholds) -> Vec<FraudAlert> {
    let mut alerts = detect_same_day(model, t);
    alerts.extend(detect_amount_spikes(model, t));
    alerts.extend(detect_high_discount(model, t));

    alerts.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then(a.customer_id.cmp(&b.customer_id))
            .then(a.order_ids.first().cmp(&b.order_ids.first()))
    });
    alerts
}

/// Per customer and order date: order count and total, keeping days with
/// at least `min_orders` orders totalling at least `threshold`. Highest
/// total first, then customer id.
pub fn same_day_totals(model: &RetailGraph, threshold: f64, min_orders: usize) -> Vec<SameDayRecord> {
    let mut days: BTreeMap<(CustomerId, NaiveDate), Vec<&Order>> = BTreeMap::new();
    for o in &model.orders {
        days.entry((o.customer_id, o.order_date)).or_default().push(o);
    }

    let mut records: Vec<SameDayRecord> = days
        .into_iter()
        .filter_map(|((customer_id, day), orders)| {
            let total: f64 = orders.iter().map(|o| o.total_amount).sum();
            (orders.len() >= min_orders && total >= threshold).then(|| SameDayRecord {
                customer_id,
                day,
                orders: orders.len() as i64,
                total,
                order_ids: orders.iter().map(|o| o.id).collect(),
            })
        })
        .collect();

    records.sort_by(|a, b| b.total.total_cmp(&a.total).then(a.customer_id.cmp(&b.customer_id)));
    records
}

pub fn detect_same_day(model: &RetailGraph, t: &FraudThresholds) -> Vec<FraudAlert> {
    same_day_totals(model, t.same_day_threshold, t.same_day_min_orders)
        .into_iter()
        .map(|r| FraudAlert {
            customer_id: r.customer_id,
            pattern: FraudPattern::SameDayHighValue,
            description: format!("{} orders totalling {:.2} on {}", r.orders, r.total, r.day),
            score: capped(5.0 * ratio(r.total, t.same_day_threshold)),
            total_amount: r.total,
            order_ids: r.order_ids,
        })
        .collect()
}

/// Orders whose amount exceeds `spike_multiplier` times the mean of the
/// same customer's other orders.
pub fn detect_amount_spikes(model: &RetailGraph, t: &FraudThresholds) -> Vec<FraudAlert> {
    let mut alerts = Vec::new();

    for customer in &model.customers {
        let orders: Vec<&Order> = model.orders_of_customer(customer.id).collect();
        if orders.len() < t.spike_min_history.max(2) {
            continue;
        }
        let sum: f64 = orders.iter().map(|o| o.total_amount).sum();

        for o in &orders {
            let mean_others = (sum - o.total_amount) / (orders.len() - 1) as f64;
            if mean_others <= 0.0 || o.total_amount <= t.spike_multiplier * mean_others {
                continue;
            }
            let factor = o.total_amount / mean_others;
            alerts.push(FraudAlert {
                customer_id: customer.id,
                pattern: FraudPattern::AmountSpike,
                order_ids: vec![o.id],
                total_amount: o.total_amount,
                score: capped(2.5 * factor),
                description: format!(
                    "Order of {:.2} is {:.1}x the customer's average of {:.2}",
                    o.total_amount, factor, mean_others
                ),
            });
        }
    }
    alerts
}

pub fn detect_high_discount(model: &RetailGraph, t: &FraudThresholds) -> Vec<FraudAlert> {
    model
        .orders
        .iter()
        .filter(|o| o.discount >= t.discount_threshold && o.total_amount >= t.discount_min_amount)
        .map(|o| FraudAlert {
            customer_id: o.customer_id,
            pattern: FraudPattern::HighDiscountHighValue,
            order_ids: vec![o.id],
            total_amount: o.total_amount,
            score: capped(10.0 * o.discount + 2.5 * ratio(o.total_amount, t.discount_min_amount)),
            description: format!(
                "{:.0}% discount on an order of {:.2}",
                o.discount * 100.0,
                o.total_amount
            ),
        })
        .collect()
}

fn ratio(value: f64, threshold: f64) -> f64 {
    if threshold > 0.0 {
        value / threshold
    } else {
        1.0
    }
}

fn capped(score: f64) -> f64 {
    score.clamp(0.0, MAX_SCORE)
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FraudSummary {
    pub total_alerts: usize,
    pub by_pattern: BTreeMap<String, usize>,
    pub customers_flagged: usize,
    pub orders_flagged: usize,
}

pub fn summarize(alerts: &[FraudAlert]) -> FraudSummary {
    let mut by_pattern = BTreeMap::new();
    let mut customers = BTreeSet::new();
    let mut orders = BTreeSet::new();
    for a in alerts {
        *by_pattern.entry(a.pattern.as_str().to_string()).or_insert(0) += 1;
        customers.insert(a.customer_id);
        orders.extend(a.order_ids.iter().copied());
    }
    FraudSummary {
        total_alerts: alerts.len(),
        by_pattern,
        customers_flagged: customers.len(),
        orders_flagged: orders.len(),
    }
}

/// One flag per (order, alert) for writing back to the graph.
pub fn order_flags(alerts: &[FraudAlert]) -> Vec<OrderFlag> {
    alerts
        .iter()
        .flat_map(|a| {
            a.order_ids.iter().map(move |&order_id| OrderFlag {
                order_id,
                customer_id: a.customer_id,
                pattern: a.pattern.as_str().to_string(),
                score: a.score,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use relgraph_core::{Customer, Dataset, Product, ProductId};
    use relgraph_etl::derive::DeriveSettings;

    fn order(id: i64, customer: i64, day: u32, total: f64, discount: f64) -> Order {
        Order {
            id: OrderId(id),
            customer_id: CustomerId(customer),
            product_id: ProductId(1),
            order_date: NaiveDate::from_ymd_opt(2023, 3, day).unwrap(),
            quantity: 1,
            unit_price: total,
            total_amount: total,
            discount,
        }
    }

    fn model(orders: Vec<Order>) -> RetailGraph {
        let date = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let customers = (1..=3)
            .map(|id| Customer {
                id: CustomerId(id),
                name: format!("Customer {id}"),
                email: format!("customer{id}@example.com"),
                city: "London".into(),
                country: "UK".into(),
                segment: "Enterprise".into(),
                registration_date: date,
                lifetime_value: 0.0,
            })
            .collect();
        let products = vec![Product {
            id: ProductId(1),
            name: "Product 1".into(),
            category: "Electronics".into(),
            price: 100.0,
            cost: 50.0,
            margin: 0.5,
            launch_date: date,
        }];
        RetailGraph::build(
            Dataset {
                customers,
                products,
                orders,
            },
            &DeriveSettings::default(),
        )
    }

    #[test]
    fn test_same_day_high_value() {
        let m = model(vec![
            order(1, 1, 5, 3000.0, 0.0),
            order(2, 1, 5, 2500.0, 0.0),
            order(3, 1, 6, 9000.0, 0.0),
            order(4, 2, 5, 2000.0, 0.0),
            order(5, 2, 5, 2000.0, 0.0),
        ]);
        let alerts = detect_same_day(&m, &FraudThresholds::default());

        assert_eq!(alerts.len(), 1);
        let a = &alerts[0];
        assert_eq!(a.customer_id, CustomerId(1));
        assert_eq!(a.order_ids, vec![OrderId(1), OrderId(2)]);
        assert_eq!(a.total_amount, 5500.0);
        assert!((a.score - 5.5).abs() < 1e-9);
        assert_eq!(a.description, "2 orders totalling 5500.00 on 2023-03-05");
    }

    #[test]
    fn test_same_day_threshold_is_inclusive() {
        let m = model(vec![order(1, 1, 5, 2500.0, 0.0), order(2, 1, 5, 2500.0, 0.0)]);
        let records = same_day_totals(&m, 5000.0, 2);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].orders, 2);
    }

    #[test]
    fn test_amount_spike_uses_mean_of_other_orders() {
        let m = model(vec![
            order(1, 1, 1, 100.0, 0.0),
            order(2, 1, 2, 100.0, 0.0),
            order(3, 1, 3, 100.0, 0.0),
            order(4, 1, 4, 1000.0, 0.0),
            // Two orders only: below the history requirement.
            order(5, 2, 1, 10.0, 0.0),
            order(6, 2, 2, 900.0, 0.0),
        ]);
        let alerts = detect_amount_spikes(&m, &FraudThresholds::default());

        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].order_ids, vec![OrderId(4)]);
        // 1000 / 100 = 10x, capped at 10.
        assert_eq!(alerts[0].score, 10.0);
    }

    #[test]
    fn test_amount_at_multiplier_is_not_a_spike() {
        let m = model(vec![
            order(1, 1, 1, 100.0, 0.0),
            order(2, 1, 2, 100.0, 0.0),
            order(3, 1, 3, 300.0, 0.0),
        ]);
        assert!(detect_amount_spikes(&m, &FraudThresholds::default()).is_empty());
    }

    #[test]
    fn test_high_discount_high_value() {
        let m = model(vec![
            order(1, 1, 1, 2000.0, 0.25),
            order(2, 1, 2, 1999.0, 0.29),
            order(3, 2, 3, 4000.0, 0.2),
        ]);
        let alerts = detect_high_discount(&m, &FraudThresholds::default());

        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].order_ids, vec![OrderId(1)]);
        assert!((alerts[0].score - 5.0).abs() < 1e-9);
        assert_eq!(alerts[0].description, "25% discount on an order of 2000.00");
    }

    #[test]
    fn test_detect_orders_alerts_by_score() {
        let m = model(vec![
            order(1, 2, 5, 3000.0, 0.0),
            order(2, 2, 5, 2500.0, 0.0),
            order(3, 1, 9, 6000.0, 0.3),
        ]);
        let alerts = detect(&m, &FraudThresholds::default());

        // Discount alert: 3 + 7.5 capped at 10; same-day alert: 5.5.
        assert_eq!(alerts.len(), 2);
        assert_eq!(alerts[0].pattern, FraudPattern::HighDiscountHighValue);
        assert_eq!(alerts[0].score, 10.0);
        assert_eq!(alerts[1].pattern, FraudPattern::SameDayHighValue);
    }

    #[test]
    fn test_summary_and_flags() {
        let m = model(vec![
            order(1, 1, 5, 3000.0, 0.3),
            order(2, 1, 5, 2500.0, 0.0),
        ]);
        let alerts = detect(&m, &FraudThresholds::default());
        let summary = summarize(&alerts);

        assert_eq!(summary.total_alerts, 2);
        assert_eq!(summary.by_pattern["same_day_high_value"], 1);
        assert_eq!(summary.by_pattern["high_discount_high_value"], 1);
        assert_eq!(summary.customers_flagged, 1);
        assert_eq!(summary.orders_flagged, 2);

        let flags = order_flags(&alerts);
        assert_eq!(flags.len(), 3);
        assert!(flags.iter().all(|f| f.customer_id == CustomerId(1)));
    }

    #[test]
    fn test_pattern_serializes_snake_case() {
        let json = serde_json::to_value(FraudPattern::AmountSpike).unwrap();
        assert_eq!(json, "amount_spike");
    }
}
