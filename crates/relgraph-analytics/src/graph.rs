//! In-memory customer similarity graph.
//!
//! Customers become dense-indexed nodes; each `SIMILAR_TO` relation becomes
//! a directed edge from the lower customer id to the higher one, weighted by
//! its strength. Community detection and path search use the undirected view.

use std::collections::HashMap;

use relgraph_core::{Customer, CustomerId, Similarity};
use relgraph_etl::RetailGraph;

#[derive(Debug, Clone)]
pub struct GraphNode {
    /// Dense index (0..N-1).
    pub index: usize,
    pub customer_id: CustomerId,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraphEdge {
    pub target_index: usize,
    pub strength: u32,
}

pub struct SimilarityGraph {
    /// Nodes in customer id order.
    pub nodes: Vec<GraphNode>,
    /// `adjacency[i]` = outgoing edges from node `i`.
    pub adjacency: Vec<Vec<GraphEdge>>,
    pub node_index: HashMap<CustomerId, usize>,
}

impl SimilarityGraph {
    pub fn from_model(model: &RetailGraph) -> Self {
        Self::from_parts(&model.customers, &model.similarities)
    }

    /// Relations naming an unknown customer, or a customer with itself,
    /// are skipped.
    pub fn from_parts(customers: &[Customer], similarities: &[Similarity]) -> Self {
        let mut sorted: Vec<&Customer> = customers.iter().collect();
        sorted.sort_by_key(|c| c.id);
        sorted.dedup_by_key(|c| c.id);

        let mut node_index = HashMap::with_capacity(sorted.len());
        let nodes: Vec<GraphNode> = sorted
            .into_iter()
            .enumerate()
            .map(|(i, c)| {
                node_index.insert(c.id, i);
                GraphNode {
                    index: i,
                    customer_id: c.id,
                    name: c.name.clone(),
                }
            })
            .collect();

        let mut adjacency = vec![Vec::new(); nodes.len()];
        for s in similarities {
            let (Some(&a), Some(&b)) = (node_index.get(&s.source), node_index.get(&s.target)) else {
                tracing::debug!(source = %s.source, target = %s.target, "Similarity references unknown customer");
                continue;
            };
            if a == b {
                continue;
            }
            let (from, to) = if a < b { (a, b) } else { (b, a) };
            adjacency[from].push(GraphEdge {
                target_index: to,
                strength: s.strength,
            });
        }

        Self {
            nodes,
            adjacency,
            node_index,
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.adjacency.iter().map(|edges| edges.len()).sum()
    }

    /// Each edge listed in both directions as `(neighbor, weight)`. With
    /// `weighted` false every edge weighs 1.
    pub fn undirected(&self, weighted: bool) -> Vec<Vec<(usize, f64)>> {
        let mut adj = vec![Vec::new(); self.nodes.len()];
        for (from, edges) in self.adjacency.iter().enumerate() {
            for e in edges {
                let w = if weighted { e.strength as f64 } else { 1.0 };
                adj[from].push((e.target_index, w));
                adj[e.target_index].push((from, w));
            }
        }
        adj
    }

    pub fn customer_id(&self, index: usize) -> CustomerId {
        self.nodes[index].customer_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn customer(id: i64) -> Customer {
        Customer {
            id: CustomerId(id),
            name: format!("Customer {id}"),
            email: format!("customer{id}@example.com"),
            city: "London".into(),
            country: "UK".into(),
            segment: "SMB".into(),
            registration_date: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
            lifetime_value: 100.0,
        }
    }

    fn sim(a: i64, b: i64, strength: u32) -> Similarity {
        Similarity {
            source: CustomerId(a),
            target: CustomerId(b),
            strength,
        }
    }

    #[test]
    fn test_from_parts_indexes_by_customer_id() {
        let customers = vec![customer(30), customer(10), customer(20)];
        let graph = SimilarityGraph::from_parts(&customers, &[sim(10, 30, 4), sim(20, 30, 2)]);

        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.edge_count(), 2);
        assert_eq!(graph.node_index[&CustomerId(10)], 0);
        assert_eq!(graph.customer_id(2), CustomerId(30));
        assert_eq!(
            graph.adjacency[0],
            vec![GraphEdge {
                target_index: 2,
                strength: 4
            }]
        );
        assert!(graph.adjacency[2].is_empty());
    }

    #[test]
    fn test_edges_run_lower_to_higher() {
        let customers = vec![customer(1), customer(2)];
        let graph = SimilarityGraph::from_parts(&customers, &[sim(2, 1, 3)]);
        assert_eq!(graph.adjacency[0].len(), 1);
        assert!(graph.adjacency[1].is_empty());
    }

    #[test]
    fn test_unknown_and_self_relations_skipped() {
        let customers = vec![customer(1), customer(2)];
        let graph = SimilarityGraph::from_parts(&customers, &[sim(1, 9, 3), sim(2, 2, 5)]);
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn test_undirected_view() {
        let customers = vec![customer(1), customer(2), customer(3)];
        let graph = SimilarityGraph::from_parts(&customers, &[sim(1, 2, 3), sim(2, 3, 5)]);

        let weighted = graph.undirected(true);
        assert_eq!(weighted[1], vec![(0, 3.0), (2, 5.0)]);
        let unweighted = graph.undirected(false);
        assert_eq!(unweighted[2], vec![(1, 1.0)]);
    }
}
