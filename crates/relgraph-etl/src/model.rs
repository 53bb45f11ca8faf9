//! The in-memory retail graph: validated entities plus everything derived
//! from them, ready to be written to Neo4j or analysed offline.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::Serialize;

use relgraph_core::{
    Category, CoPurchase, Customer, CustomerId, CustomerMetrics, Dataset, Order, Product,
    ProductId, Similarity,
};

use crate::derive::{self, DeriveSettings};
use crate::metrics;
use crate::validate::{self, RejectedRow};

#[derive(Debug, Clone)]
pub struct RetailGraph {
    /// Sorted by id.
    pub customers: Vec<Customer>,
    /// Sorted by id.
    pub products: Vec<Product>,
    /// Sorted by id.
    pub orders: Vec<Order>,
    /// Distinct product categories, sorted by name.
    pub categories: Vec<Category>,
    pub similarities: Vec<Similarity>,
    pub co_purchases: Vec<CoPurchase>,
    pub metrics: BTreeMap<CustomerId, CustomerMetrics>,
    pub rejected: Vec<RejectedRow>,

    customer_index: HashMap<CustomerId, usize>,
    product_index: HashMap<ProductId, usize>,
    orders_by_customer: HashMap<CustomerId, Vec<usize>>,
    orders_by_product: HashMap<ProductId, Vec<usize>>,
}

/// Entity and relationship counts for a built graph.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct GraphStats {
    pub customers: usize,
    pub products: usize,
    pub orders: usize,
    pub categories: usize,
    pub similarities: usize,
    pub co_purchases: usize,
    pub customers_with_metrics: usize,
    pub rejected: usize,
}

impl RetailGraph {
    /// Validate `dataset` and derive categories, relations and metrics.
    pub fn build(dataset: Dataset, settings: &DeriveSettings) -> Self {
        let (mut valid, rejected) = validate::validate(dataset);
        valid.customers.sort_by_key(|c| c.id);
        valid.products.sort_by_key(|p| p.id);
        valid.orders.sort_by_key(|o| o.id);

        let categories: Vec<Category> = valid
            .products
            .iter()
            .map(|p| p.category.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(|name| Category { name })
            .collect();

        let counts = derive::purchase_counts(&valid.orders);
        let similarities = derive::derive_similarities(&counts, settings.min_common_products);
        let co_purchases = derive::derive_co_purchases(&counts, settings.min_co_purchases);
        let metrics = metrics::compute_metrics(&valid.orders, settings);

        let customer_index = valid
            .customers
            .iter()
            .enumerate()
            .map(|(i, c)| (c.id, i))
            .collect();
        let product_index = valid
            .products
            .iter()
            .enumerate()
            .map(|(i, p)| (p.id, i))
            .collect();

        let mut orders_by_customer: HashMap<CustomerId, Vec<usize>> = HashMap::new();
        let mut orders_by_product: HashMap<ProductId, Vec<usize>> = HashMap::new();
        for (i, o) in valid.orders.iter().enumerate() {
            orders_by_customer.entry(o.customer_id).or_default().push(i);
            orders_by_product.entry(o.product_id).or_default().push(i);
        }

        let graph = Self {
            customers: valid.customers,
            products: valid.products,
            orders: valid.orders,
            categories,
            similarities,
            co_purchases,
            metrics,
            rejected,
            customer_index,
            product_index,
            orders_by_customer,
            orders_by_product,
        };

        tracing::debug!(stats = ?graph.stats(), "Retail graph built");
        graph
    }

    pub fn customer(&self, id: CustomerId) -> Option<&Customer> {
        self.customer_index.get(&id).map(|&i| &self.customers[i])
    }

    pub fn product(&self, id: ProductId) -> Option<&Product> {
        self.product_index.get(&id).map(|&i| &self.products[i])
    }

    /// A customer's orders in id order.
    pub fn orders_of_customer(&self, id: CustomerId) -> impl Iterator<Item = &Order> + '_ {
        self.orders_by_customer
            .get(&id)
            .into_iter()
            .flatten()
            .map(|&i| &self.orders[i])
    }

    /// Orders containing a product, in id order.
    pub fn orders_of_product(&self, id: ProductId) -> impl Iterator<Item = &Order> + '_ {
        self.orders_by_product
            .get(&id)
            .into_iter()
            .flatten()
            .map(|&i| &self.orders[i])
    }

    /// Distinct products a customer has ordered.
    pub fn products_bought_by(&self, id: CustomerId) -> BTreeSet<ProductId> {
        self.orders_of_customer(id).map(|o| o.product_id).collect()
    }

    /// Distinct customers who ordered a product.
    pub fn buyers_of(&self, id: ProductId) -> BTreeSet<CustomerId> {
        self.orders_of_product(id).map(|o| o.customer_id).collect()
    }

    pub fn stats(&self) -> GraphStats {
        GraphStats {
            customers: self.customers.len(),
            products: self.products.len(),
            orders: self.orders.len(),
            categories: self.categories.len(),
            similarities: self.similarities.len(),
            co_purchases: self.co_purchases.len(),
            customers_with_metrics: self.metrics.len(),
            rejected: self.rejected.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{generate_sample, SampleSpec};
    use chrono::NaiveDate;
    use relgraph_core::{CustomerTier, OrderId};

    fn small_dataset() -> Dataset {
        let date = NaiveDate::from_ymd_opt(2023, 4, 1).unwrap();
        let customer = |id: i64| Customer {
            id: CustomerId(id),
            name: format!("Customer {id}"),
            email: format!("customer{id}@example.com"),
            city: "Sydney".into(),
            country: "Australia".into(),
            segment: "SMB".into(),
            registration_date: date,
            lifetime_value: 1.0,
        };
        let product = |id: i64, category: &str| Product {
            id: ProductId(id),
            name: format!("Product {id}"),
            category: category.into(),
            price: 1.0,
            cost: 1.0,
            margin: 0.2,
            launch_date: date,
        };
        let order = |id: i64, c: i64, p: i64, total: f64| Order {
            id: OrderId(id),
            customer_id: CustomerId(c),
            product_id: ProductId(p),
            order_date: date,
            quantity: 1,
            unit_price: total,
            total_amount: total,
            discount: 0.0,
        };

        Dataset {
            customers: vec![customer(2), customer(1), customer(3)],
            products: vec![product(1, "Home"), product(2, "Books"), product(3, "Home")],
            orders: vec![
                order(4, 2, 2, 10.0),
                order(1, 1, 1, 3000.0),
                order(2, 1, 2, 3000.0),
                order(3, 2, 1, 10.0),
                order(5, 3, 9, 10.0),
            ],
        }
    }

    #[test]
    fn test_build_sorts_and_indexes() {
        let graph = RetailGraph::build(small_dataset(), &DeriveSettings::default());

        let ids: Vec<_> = graph.customers.iter().map(|c| c.id.0).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(graph.customer(CustomerId(2)).unwrap().name, "Customer 2");
        assert!(graph.customer(CustomerId(99)).is_none());
        assert_eq!(graph.product(ProductId(3)).unwrap().category, "Home");

        let order_ids: Vec<_> = graph.orders_of_customer(CustomerId(2)).map(|o| o.id.0).collect();
        assert_eq!(order_ids, vec![3, 4]);
        assert_eq!(graph.orders_of_customer(CustomerId(3)).count(), 0);
        assert_eq!(
            graph.buyers_of(ProductId(1)).into_iter().collect::<Vec<_>>(),
            vec![CustomerId(1), CustomerId(2)]
        );
        assert_eq!(graph.products_bought_by(CustomerId(1)).len(), 2);
    }

    #[test]
    fn test_build_derives_relations_and_metrics() {
        let graph = RetailGraph::build(small_dataset(), &DeriveSettings::default());

        let names: Vec<_> = graph.categories.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Books", "Home"]);

        assert_eq!(graph.similarities.len(), 1);
        assert_eq!(graph.similarities[0].strength, 2);
        assert_eq!(graph.co_purchases.len(), 1);
        assert_eq!(graph.co_purchases[0].frequency, 2);

        assert_eq!(graph.metrics[&CustomerId(1)].customer_tier, CustomerTier::Vip);
        assert!(!graph.metrics.contains_key(&CustomerId(3)));

        let stats = graph.stats();
        assert_eq!(stats.orders, 4);
        assert_eq!(stats.rejected, 1);
        assert_eq!(stats.customers_with_metrics, 2);
    }

    #[test]
    fn test_build_on_generated_sample() {
        let ds = generate_sample(&SampleSpec::default(), 42);
        let graph = RetailGraph::build(ds, &DeriveSettings::default());

        assert!(graph.rejected.is_empty());
        assert_eq!(graph.orders.len(), 200);
        assert!(graph.categories.len() <= 4);
        for s in &graph.similarities {
            assert!(s.source < s.target);
            assert!(s.strength >= 2);
        }
        for w in graph.co_purchases.windows(2) {
            assert!((w[0].source, w[0].target) < (w[1].source, w[1].target));
        }
    }
}
