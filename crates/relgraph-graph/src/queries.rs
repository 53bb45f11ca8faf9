//! Read operations for the retail graph.

use chrono::NaiveDate;
use neo4rs::{query, Row};
use serde::{Deserialize, Serialize};

use relgraph_core::{
    Customer, CustomerId, Dataset, NodeLabel, Order, OrderId, Product, ProductId, RelType,
};

use crate::client::{GraphClient, GraphError};

/// A `CO_PURCHASED` pair as returned by the influence query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CoPurchaseRecord {
    pub source: ProductId,
    pub source_name: String,
    pub target: ProductId,
    pub target_name: String,
    pub frequency: i64,
}

/// A customer-day whose orders add up to a high value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SameDayRecord {
    pub customer_id: CustomerId,
    pub day: NaiveDate,
    pub orders: i64,
    pub total: f64,
    pub order_ids: Vec<OrderId>,
}

impl GraphClient {
    // ── Dataset Reconstruction ───────────────────────────────────

    pub async fn fetch_customers(&self) -> Result<Vec<Customer>, GraphError> {
        let rows = self
            .query_rows(query(
                "MATCH (c:Customer)
                 RETURN c.id AS id, c.name AS name, c.email AS email, c.city AS city,
                        c.country AS country, c.segment AS segment,
                        toString(c.registration_date) AS registration_date,
                        c.lifetime_value AS lifetime_value
                 ORDER BY c.id",
            ))
            .await?;

        rows.iter()
            .map(|row| {
                Ok(Customer {
                    id: CustomerId(get_i64(row, "id")?),
                    name: get_string(row, "name"),
                    email: get_string(row, "email"),
                    city: get_string(row, "city"),
                    country: get_string(row, "country"),
                    segment: get_string(row, "segment"),
                    registration_date: get_date(row, "registration_date")?,
                    lifetime_value: get_f64(row, "lifetime_value"),
                })
            })
            .collect()
    }

    pub async fn fetch_products(&self) -> Result<Vec<Product>, GraphError> {
        let rows = self
            .query_rows(query(
                "MATCH (p:Product)
                 RETURN p.id AS id, p.name AS name, p.category AS category,
                        p.price AS price, p.cost AS cost, p.margin AS margin,
                        toString(p.launch_date) AS launch_date
                 ORDER BY p.id",
            ))
            .await?;

        rows.iter()
            .map(|row| {
                Ok(Product {
                    id: ProductId(get_i64(row, "id")?),
                    name: get_string(row, "name"),
                    category: get_string(row, "category"),
                    price: get_f64(row, "price"),
                    cost: get_f64(row, "cost"),
                    margin: get_f64(row, "margin"),
                    launch_date: get_date(row, "launch_date")?,
                })
            })
            .collect()
    }

    /// Orders joined with the customer that placed them and the product
    /// they contain.
    pub async fn fetch_orders(&self) -> Result<Vec<Order>, GraphError> {
        let rows = self
            .query_rows(query(
                "MATCH (c:Customer)-[:PLACED]->(o:Order)-[:CONTAINS]->(p:Product)
                 RETURN o.id AS id, c.id AS customer_id, p.id AS product_id,
                        toString(o.order_date) AS order_date, o.quantity AS quantity,
                        o.unit_price AS unit_price, o.total_amount AS total_amount,
                        o.discount AS discount
                 ORDER BY o.id",
            ))
            .await?;

        rows.iter()
            .map(|row| {
                let quantity = get_i64(row, "quantity")?;
                Ok(Order {
                    id: OrderId(get_i64(row, "id")?),
                    customer_id: CustomerId(get_i64(row, "customer_id")?),
                    product_id: ProductId(get_i64(row, "product_id")?),
                    order_date: get_date(row, "order_date")?,
                    quantity: u32::try_from(quantity).map_err(|_| {
                        GraphError::Serialization(format!("quantity out of range: {quantity}"))
                    })?,
                    unit_price: get_f64(row, "unit_price"),
                    total_amount: get_f64(row, "total_amount"),
                    discount: get_f64(row, "discount"),
                })
            })
            .collect()
    }

    /// Rebuild the relational dataset from the graph.
    pub async fn fetch_dataset(&self) -> Result<Dataset, GraphError> {
        let dataset = Dataset {
            customers: self.fetch_customers().await?,
            products: self.fetch_products().await?,
            orders: self.fetch_orders().await?,
        };
        tracing::debug!(
            customers = dataset.customers.len(),
            products = dataset.products.len(),
            orders = dataset.orders.len(),
            "Fetched dataset from graph"
        );
        Ok(dataset)
    }

    // ── Counts ───────────────────────────────────────────────────

    pub async fn count_nodes(&self, label: NodeLabel) -> Result<i64, GraphError> {
        let cypher = format!("MATCH (n:{label}) RETURN count(n) AS cnt");
        read_count(self.query_one(query(&cypher)).await?)
    }

    pub async fn count_relationships(&self, rel: RelType) -> Result<i64, GraphError> {
        let cypher = format!("MATCH ()-[r:{rel}]->() RETURN count(r) AS cnt");
        read_count(self.query_one(query(&cypher)).await?)
    }

    // ── Relationship Analysis ────────────────────────────────────

    /// Most frequent co-purchase pairs.
    pub async fn top_co_purchased(&self, limit: u32) -> Result<Vec<CoPurchaseRecord>, GraphError> {
        let q = query(
            "MATCH (p1:Product)-[r:CO_PURCHASED]->(p2:Product)
             RETURN p1.id AS source, p1.name AS source_name,
                    p2.id AS target, p2.name AS target_name,
                    r.frequency AS frequency
             ORDER BY frequency DESC, source, target
             LIMIT $limit",
        )
        .param("limit", limit as i64);

        let rows = self.query_rows(q).await?;
        rows.iter()
            .map(|row| {
                Ok(CoPurchaseRecord {
                    source: ProductId(get_i64(row, "source")?),
                    source_name: get_string(row, "source_name"),
                    target: ProductId(get_i64(row, "target")?),
                    target_name: get_string(row, "target_name"),
                    frequency: get_i64(row, "frequency")?,
                })
            })
            .collect()
    }

    /// Customer-days with at least `min_orders` orders totalling at least
    /// `threshold`, highest total first.
    pub async fn same_day_high_value(
        &self,
        threshold: f64,
        min_orders: i64,
    ) -> Result<Vec<SameDayRecord>, GraphError> {
        let q = query(
            "MATCH (c:Customer)-[:PLACED]->(o:Order)
             WITH c, o.order_date AS day, count(o) AS orders,
                  sum(o.total_amount) AS total, collect(o.id) AS order_ids
             WHERE orders >= $min_orders AND total >= $threshold
             RETURN c.id AS customer_id, toString(day) AS day, orders, total, order_ids
             ORDER BY total DESC, customer_id",
        )
        .param("threshold", threshold)
        .param("min_orders", min_orders);

        let rows = self.query_rows(q).await?;
        rows.iter()
            .map(|row| {
                let mut order_ids: Vec<i64> = row.get("order_ids").map_err(|e| {
                    GraphError::Serialization(format!("Failed to read order_ids: {e}"))
                })?;
                order_ids.sort_unstable();
                Ok(SameDayRecord {
                    customer_id: CustomerId(get_i64(row, "customer_id")?),
                    day: get_date(row, "day")?,
                    orders: get_i64(row, "orders")?,
                    total: get_f64(row, "total"),
                    order_ids: order_ids.into_iter().map(OrderId).collect(),
                })
            })
            .collect()
    }
}

// ── Row Decoding ─────────────────────────────────────────────────

/// The `cnt` column of a count query. No row reads as 0; a value that is
/// not an integer is an error.
pub fn read_count(row: Option<Row>) -> Result<i64, GraphError> {
    match row {
        Some(row) => get_i64(&row, "cnt"),
        None => Ok(0),
    }
}

fn get_i64(row: &Row, key: &str) -> Result<i64, GraphError> {
    row.get::<i64>(key)
        .map_err(|e| GraphError::Serialization(format!("Failed to read {key}: {e}")))
}

/// Missing or non-numeric values read as 0.0.
fn get_f64(row: &Row, key: &str) -> f64 {
    row.get::<f64>(key)
        .or_else(|_| row.get::<i64>(key).map(|v| v as f64))
        .unwrap_or(0.0)
}

fn get_string(row: &Row, key: &str) -> String {
    row.get::<String>(key).unwrap_or_default()
}

fn get_date(row: &Row, key: &str) -> Result<NaiveDate, GraphError> {
    let raw = row
        .get::<String>(key)
        .map_err(|e| GraphError::Serialization(format!("Failed to read {key}: {e}")))?;
    parse_date(&raw)
}

/// Parse a Neo4j `toString(date)` value (`YYYY-MM-DD`).
pub fn parse_date(raw: &str) -> Result<NaiveDate, GraphError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|e| GraphError::Serialization(format!("Invalid date {raw:?}: {e}")))
}
