//! Relationship derivation: customer similarity and product co-purchase.
//!
//! Both relations count purchase *pairs*. If customer A bought product P
//! twice and customer B bought it three times, P contributes 2 × 3 = 6 to
//! the A–B similarity strength. Co-purchase frequency is the same product
//! taken over customers.

use std::collections::BTreeMap;

use relgraph_core::config::EtlSettings;
use relgraph_core::{CoPurchase, CustomerId, Order, ProductId, Similarity};

/// Thresholds used when building the retail graph.
#[derive(Debug, Clone)]
pub struct DeriveSettings {
    pub min_common_products: u32,
    pub min_co_purchases: u32,
    pub vip_threshold: f64,
    pub premium_threshold: f64,
}

impl Default for DeriveSettings {
    fn default() -> Self {
        Self::from(&EtlSettings::default())
    }
}

impl From<&EtlSettings> for DeriveSettings {
    fn from(s: &EtlSettings) -> Self {
        Self {
            min_common_products: s.min_common_products,
            min_co_purchases: s.min_co_purchases,
            vip_threshold: s.vip_threshold,
            premium_threshold: s.premium_threshold,
        }
    }
}

/// `n(c, p)`: how many of customer `c`'s orders contain product `p`.
pub type PurchaseCounts = BTreeMap<CustomerId, BTreeMap<ProductId, u32>>;

pub fn purchase_counts(orders: &[Order]) -> PurchaseCounts {
    let mut counts = PurchaseCounts::new();
    for o in orders {
        *counts
            .entry(o.customer_id)
            .or_default()
            .entry(o.product_id)
            .or_default() += 1;
    }
    counts
}

/// `SIMILAR_TO` relations for customer pairs whose strength reaches
/// `min_strength`, sorted by (source, target).
pub fn derive_similarities(counts: &PurchaseCounts, min_strength: u32) -> Vec<Similarity> {
    // Invert to product -> buyers so only customers sharing a product meet.
    let mut buyers: BTreeMap<ProductId, Vec<(CustomerId, u32)>> = BTreeMap::new();
    for (&customer, products) in counts {
        for (&product, &n) in products {
            buyers.entry(product).or_default().push((customer, n));
        }
    }

    let mut pairs: BTreeMap<(CustomerId, CustomerId), u32> = BTreeMap::new();
    for list in buyers.values() {
        accumulate_pairs(list, &mut pairs);
    }

    pairs
        .into_iter()
        .filter(|&(_, strength)| strength >= min_strength)
        .map(|((source, target), strength)| Similarity {
            source,
            target,
            strength,
        })
        .collect()
}

/// `CO_PURCHASED` relations for product pairs whose frequency reaches
/// `min_frequency`, sorted by (source, target).
pub fn derive_co_purchases(counts: &PurchaseCounts, min_frequency: u32) -> Vec<CoPurchase> {
    let mut pairs: BTreeMap<(ProductId, ProductId), u32> = BTreeMap::new();
    for products in counts.values() {
        let list: Vec<(ProductId, u32)> = products.iter().map(|(&p, &n)| (p, n)).collect();
        accumulate_pairs(&list, &mut pairs);
    }

    pairs
        .into_iter()
        .filter(|&(_, frequency)| frequency >= min_frequency)
        .map(|((source, target), frequency)| CoPurchase {
            source,
            target,
            frequency,
        })
        .collect()
}

/// Add `n_a * n_b` for every pair in `list`, saturating at `u32::MAX`.
/// `list` is sorted by key, so the first element of each pair is the
/// lower id.
fn accumulate_pairs<K: Ord + Copy>(list: &[(K, u32)], pairs: &mut BTreeMap<(K, K), u32>) {
    for (i, &(a, na)) in list.iter().enumerate() {
        for &(b, nb) in &list[i + 1..] {
            let total = pairs.entry((a, b)).or_default();
            *total = total.saturating_add(na.saturating_mul(nb));
        }
    }
}
