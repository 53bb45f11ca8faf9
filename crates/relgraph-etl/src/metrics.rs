//! Per-customer aggregates written back onto `Customer` nodes.

use std::collections::BTreeMap;

use relgraph_core::{CustomerId, CustomerMetrics, CustomerTier, Order};

use crate::derive::DeriveSettings;

/// Spend tier. Both thresholds are exclusive.
pub fn tier_for(total_spent: f64, settings: &DeriveSettings) -> CustomerTier {
    if total_spent > settings.vip_threshold {
        CustomerTier::Vip
    } else if total_spent > settings.premium_threshold {
        CustomerTier::Premium
    } else {
        CustomerTier::Standard
    }
}

/// Metrics for every customer that placed at least one order.
pub fn compute_metrics(
    orders: &[Order],
    settings: &DeriveSettings,
) -> BTreeMap<CustomerId, CustomerMetrics> {
    let mut by_customer: BTreeMap<CustomerId, Vec<&Order>> = BTreeMap::new();
    for o in orders {
        by_customer.entry(o.customer_id).or_default().push(o);
    }

    by_customer
        .into_iter()
        .filter_map(|(customer, orders)| {
            let last_order_date = orders.iter().map(|o| o.order_date).max()?;
            let total_spent: f64 = orders.iter().map(|o| o.total_amount).sum();
            let total_orders = orders.len() as u32;
            Some((
                customer,
                CustomerMetrics {
                    total_orders,
                    total_spent,
                    avg_order_value: total_spent / total_orders as f64,
                    last_order_date,
                    customer_tier: tier_for(total_spent, settings),
                },
            ))
        })
        .collect()
}
