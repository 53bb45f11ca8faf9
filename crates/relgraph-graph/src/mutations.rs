//! Write operations for the retail graph.
//!
//! Loads use MERGE keyed on the source-system `id` so re-running a load
//! over the same rows updates in place instead of duplicating nodes.
//! Batched writes commit one transaction per `batch_size` rows.

use neo4rs::{query, Query};

use relgraph_core::{
    CoPurchase, Customer, CustomerId, CustomerMetrics, NodeLabel, Order, OrderId, Product,
    Similarity,
};

use crate::client::{GraphClient, GraphError};
use crate::queries::read_count;

/// Per-customer algorithm results written back as node properties.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomerScore {
    pub customer_id: CustomerId,
    pub pagerank: f64,
    pub betweenness: f64,
    pub community: u32,
}

/// One order implicated by a fraud pattern.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderFlag {
    pub order_id: OrderId,
    pub customer_id: CustomerId,
    pub pattern: String,
    pub score: f64,
}

impl GraphClient {
    // ── Schema ───────────────────────────────────────────────────

    /// Remove every node and relationship.
    pub async fn clear_database(&self) -> Result<(), GraphError> {
        self.run(query("MATCH (n) DETACH DELETE n")).await?;
        tracing::info!("Database cleared");
        Ok(())
    }

    /// Create unique `id` constraints for the constrained labels.
    ///
    /// A failing statement is logged and skipped. Returns how many
    /// statements succeeded.
    pub async fn create_constraints(&self) -> Result<usize, GraphError> {
        let mut created = 0;
        for label in NodeLabel::constrained() {
            let statement = constraint_statement(label);
            match self.run(query(&statement)).await {
                Ok(()) => {
                    created += 1;
                    tracing::info!(label = %label, "Constraint ensured");
                }
                Err(e) => {
                    tracing::warn!(label = %label, error = %e, "Constraint may already exist");
                }
            }
        }
        Ok(created)
    }

    // ── Entity Loads ─────────────────────────────────────────────

    pub async fn load_customers(
        &self,
        customers: &[Customer],
        batch_size: usize,
    ) -> Result<usize, GraphError> {
        let written = self
            .run_batched(customers, batch_size, |c| {
                query(
                    "MERGE (c:Customer {id: $id})
                     SET c.name = $name, c.email = $email, c.city = $city,
                         c.country = $country, c.segment = $segment,
                         c.registration_date = date($registration_date),
                         c.lifetime_value = $lifetime_value",
                )
                .param("id", c.id.0)
                .param("name", c.name.clone())
                .param("email", c.email.clone())
                .param("city", c.city.clone())
                .param("country", c.country.clone())
                .param("segment", c.segment.clone())
                .param("registration_date", c.registration_date.to_string())
                .param("lifetime_value", c.lifetime_value)
            })
            .await?;
        tracing::info!(customers = written, "Loaded customers");
        Ok(written)
    }

    /// Load products, then link each to its `Category`.
    /// Returns `(products_written, categories)`.
    pub async fn load_products(
        &self,
        products: &[Product],
        batch_size: usize,
    ) -> Result<(usize, i64), GraphError> {
        let written = self
            .run_batched(products, batch_size, |p| {
                query(
                    "MERGE (p:Product {id: $id})
                     SET p.name = $name, p.category = $category, p.price = $price,
                         p.cost = $cost, p.margin = $margin,
                         p.launch_date = date($launch_date)",
                )
                .param("id", p.id.0)
                .param("name", p.name.clone())
                .param("category", p.category.clone())
                .param("price", p.price)
                .param("cost", p.cost)
                .param("margin", p.margin)
                .param("launch_date", p.launch_date.to_string())
            })
            .await?;
        tracing::info!(products = written, "Loaded products");

        let categories = self
            .query_count(query(
                "MATCH (p:Product) WHERE p.category IS NOT NULL
                 MERGE (c:Category {name: p.category})
                 MERGE (p)-[:BELONGS_TO]->(c)
                 RETURN count(DISTINCT c) AS cnt",
            ))
            .await?;
        tracing::info!(categories, "Created product-category relationships");

        Ok((written, categories))
    }

    /// Load orders with their `PLACED` and `CONTAINS` relationships.
    ///
    /// Orders whose customer or product is absent from the graph match
    /// nothing and are not written; callers validate references first.
    pub async fn load_orders(&self, orders: &[Order], batch_size: usize) -> Result<usize, GraphError> {
        let written = self
            .run_batched(orders, batch_size, |o| {
                query(
                    "MATCH (c:Customer {id: $customer_id})
                     MATCH (p:Product {id: $product_id})
                     MERGE (o:Order {id: $id})
                     SET o.order_date = date($order_date), o.quantity = $quantity,
                         o.unit_price = $unit_price, o.total_amount = $total_amount,
                         o.discount = $discount
                     MERGE (c)-[:PLACED]->(o)
                     MERGE (o)-[:CONTAINS]->(p)",
                )
                .param("id", o.id.0)
                .param("customer_id", o.customer_id.0)
                .param("product_id", o.product_id.0)
                .param("order_date", o.order_date.to_string())
                .param("quantity", o.quantity as i64)
                .param("unit_price", o.unit_price)
                .param("total_amount", o.total_amount)
                .param("discount", o.discount)
            })
            .await?;
        tracing::info!(orders = written, "Loaded orders with relationships");
        Ok(written)
    }

    // ── Derived Relationships ────────────────────────────────────

    pub async fn write_similarities(
        &self,
        similarities: &[Similarity],
        batch_size: usize,
    ) -> Result<usize, GraphError> {
        let written = self
            .run_batched(similarities, batch_size, |s| {
                query(
                    "MATCH (a:Customer {id: $source})
                     MATCH (b:Customer {id: $target})
                     MERGE (a)-[r:SIMILAR_TO]->(b)
                     SET r.strength = $strength",
                )
                .param("source", s.source.0)
                .param("target", s.target.0)
                .param("strength", s.strength as i64)
            })
            .await?;
        tracing::info!(similarities = written, "Created customer similarity relationships");
        Ok(written)
    }

    pub async fn write_co_purchases(
        &self,
        co_purchases: &[CoPurchase],
        batch_size: usize,
    ) -> Result<usize, GraphError> {
        let written = self
            .run_batched(co_purchases, batch_size, |cp| {
                query(
                    "MATCH (a:Product {id: $source})
                     MATCH (b:Product {id: $target})
                     MERGE (a)-[r:CO_PURCHASED]->(b)
                     SET r.frequency = $frequency",
                )
                .param("source", cp.source.0)
                .param("target", cp.target.0)
                .param("frequency", cp.frequency as i64)
            })
            .await?;
        tracing::info!(co_purchases = written, "Created product co-purchase relationships");
        Ok(written)
    }

    // ── Node Properties ──────────────────────────────────────────

    pub async fn write_customer_metrics(
        &self,
        metrics: &[(CustomerId, CustomerMetrics)],
        batch_size: usize,
    ) -> Result<usize, GraphError> {
        let written = self
            .run_batched(metrics, batch_size, |(id, m)| {
                query(
                    "MATCH (c:Customer {id: $id})
                     SET c.total_orders = $total_orders,
                         c.total_spent = $total_spent,
                         c.avg_order_value = $avg_order_value,
                         c.last_order_date = date($last_order_date),
                         c.customer_tier = $customer_tier",
                )
                .param("id", id.0)
                .param("total_orders", m.total_orders as i64)
                .param("total_spent", m.total_spent)
                .param("avg_order_value", m.avg_order_value)
                .param("last_order_date", m.last_order_date.to_string())
                .param("customer_tier", m.customer_tier.as_str())
            })
            .await?;
        tracing::info!(customers = written, "Updated customer metrics");
        Ok(written)
    }

    pub async fn write_customer_scores(
        &self,
        scores: &[CustomerScore],
        batch_size: usize,
    ) -> Result<usize, GraphError> {
        let written = self
            .run_batched(scores, batch_size, |s| {
                query(
                    "MATCH (c:Customer {id: $id})
                     SET c.pagerank = $pagerank, c.betweenness = $betweenness,
                         c.community = $community",
                )
                .param("id", s.customer_id.0)
                .param("pagerank", s.pagerank)
                .param("betweenness", s.betweenness)
                .param("community", s.community as i64)
            })
            .await?;
        tracing::info!(customers = written, "Wrote centrality and community scores");
        Ok(written)
    }

    /// Remove fraud flags left by an earlier detection run.
    pub async fn clear_fraud_flags(&self) -> Result<(), GraphError> {
        self.run(query(
            "MATCH (o:Order) WHERE o.flagged IS NOT NULL
             REMOVE o.flagged, o.fraud_patterns",
        ))
        .await?;
        self.run(query(
            "MATCH (c:Customer) WHERE c.fraud_score IS NOT NULL
             REMOVE c.fraud_score",
        ))
        .await
    }

    /// Mark flagged orders and raise each customer's `fraud_score` to the
    /// highest score among its flags.
    pub async fn flag_orders(&self, flags: &[OrderFlag], batch_size: usize) -> Result<usize, GraphError> {
        let written = self
            .run_batched(flags, batch_size, |f| {
                query(
                    "MATCH (c:Customer {id: $customer_id})-[:PLACED]->(o:Order {id: $order_id})
                     WITH c, o, coalesce(o.fraud_patterns, []) AS existing
                     SET o.flagged = true,
                         o.fraud_patterns = CASE WHEN $pattern IN existing
                                                 THEN existing ELSE existing + $pattern END,
                         c.fraud_score = CASE WHEN coalesce(c.fraud_score, 0.0) >= $score
                                              THEN c.fraud_score ELSE $score END",
                )
                .param("customer_id", f.customer_id.0)
                .param("order_id", f.order_id.0)
                .param("pattern", f.pattern.clone())
                .param("score", f.score)
            })
            .await?;
        tracing::info!(flags = written, "Flagged suspicious orders");
        Ok(written)
    }

    // ── Helpers ──────────────────────────────────────────────────

    /// Run one query per row, committing a transaction every `batch_size` rows.
    async fn run_batched<T, F>(
        &self,
        rows: &[T],
        batch_size: usize,
        build: F,
    ) -> Result<usize, GraphError>
    where
        F: Fn(&T) -> Query,
    {
        let mut written = 0;
        for chunk in rows.chunks(batch_size.max(1)) {
            let mut txn = self.start_txn().await?;
            for row in chunk {
                txn.run(build(row)).await?;
            }
            txn.commit().await?;
            written += chunk.len();
            tracing::debug!(written, total = rows.len(), "Committed batch");
        }
        Ok(written)
    }

    async fn query_count(&self, q: Query) -> Result<i64, GraphError> {
        read_count(self.query_one(q).await?)
    }
}

/// `CREATE CONSTRAINT` statement for a label's unique `id`.
pub fn constraint_statement(label: NodeLabel) -> String {
    format!(
        "CREATE CONSTRAINT {name}_id IF NOT EXISTS FOR (n:{label}) REQUIRE n.id IS UNIQUE",
        name = label.as_str().to_lowercase(),
        label = label.as_str(),
    )
}
