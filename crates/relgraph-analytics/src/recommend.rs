//! Product recommendations and co-purchase influence.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use relgraph_core::{CustomerId, ProductId};
use relgraph_etl::RetailGraph;

use crate::error::{AnalyticsError, Result};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recommendation {
    pub product_id: ProductId,
    pub name: String,
    pub category: String,
    pub score: u64,
    /// Σ co-purchase frequency with products the customer already bought.
    pub co_purchase_score: u64,
    /// Σ similarity strength of similar customers who bought the product.
    pub similar_customer_score: u64,
}

/// Products the customer has not bought, ranked by combined evidence from
/// co-purchases and similar customers. Products with no evidence are not
/// returned.
pub fn recommend_products(
    model: &RetailGraph,
    customer: CustomerId,
    limit: usize,
) -> Result<Vec<Recommendation>> {
    if model.customer(customer).is_none() {
        return Err(AnalyticsError::CustomerNotFound(customer));
    }
    let owned = model.products_bought_by(customer);

    let mut co_scores: BTreeMap<ProductId, u64> = BTreeMap::new();
    for cp in &model.co_purchases {
        let f = cp.frequency as u64;
        match (owned.contains(&cp.source), owned.contains(&cp.target)) {
            (true, false) => *co_scores.entry(cp.target).or_default() += f,
            (false, true) => *co_scores.entry(cp.source).or_default() += f,
            _ => {}
        }
    }

    let mut peer_scores: BTreeMap<ProductId, u64> = BTreeMap::new();
    for s in &model.similarities {
        let peer = if s.source == customer {
            s.target
        } else if s.target == customer {
            s.source
        } else {
            continue;
        };
        for product in model.products_bought_by(peer) {
            if !owned.contains(&product) {
                *peer_scores.entry(product).or_default() += s.strength as u64;
            }
        }
    }

    let candidates: BTreeSet<ProductId> = co_scores.keys().chain(peer_scores.keys()).copied().collect();
    let mut recommendations: Vec<Recommendation> = candidates
        .into_iter()
        .filter_map(|id| {
            let product = model.product(id)?;
            let co = co_scores.get(&id).copied().unwrap_or(0);
            let peer = peer_scores.get(&id).copied().unwrap_or(0);
            Some(Recommendation {
                product_id: id,
                name: product.name.clone(),
                category: product.category.clone(),
                score: co + peer,
                co_purchase_score: co,
                similar_customer_score: peer,
            })
        })
        .collect();

    recommendations.sort_by(|a, b| b.score.cmp(&a.score).then(a.product_id.cmp(&b.product_id)));
    recommendations.truncate(limit);
    Ok(recommendations)
}

/// A product's pull on other purchases.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InfluenceEntry {
    pub product_id: ProductId,
    pub name: String,
    /// Σ frequency over the product's `CO_PURCHASED` relations.
    pub total_frequency: u64,
    /// Number of distinct co-purchased products.
    pub partners: usize,
}

/// Products ranked by total co-purchase frequency, then id.
pub fn co_purchase_influence(model: &RetailGraph, limit: usize) -> Vec<InfluenceEntry> {
    let mut totals: BTreeMap<ProductId, (u64, usize)> = BTreeMap::new();
    for cp in &model.co_purchases {
        for id in [cp.source, cp.target] {
            let entry = totals.entry(id).or_default();
            entry.0 += cp.frequency as u64;
            entry.1 += 1;
        }
    }

    let mut entries: Vec<InfluenceEntry> = totals
        .into_iter()
        .map(|(id, (total_frequency, partners))| InfluenceEntry {
            product_id: id,
            name: model.product(id).map(|p| p.name.clone()).unwrap_or_default(),
            total_frequency,
            partners,
        })
        .collect();

    entries.sort_by(|a, b| {
        b.total_frequency
            .cmp(&a.total_frequency)
            .then(a.product_id.cmp(&b.product_id))
    });
    entries.truncate(limit);
    entries
}
