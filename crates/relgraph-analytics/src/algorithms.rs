//! Graph algorithms over the customer similarity graph: PageRank, Louvain
//! community detection, betweenness centrality and strongest-similarity
//! shortest paths.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BinaryHeap, HashMap, VecDeque};

use relgraph_core::config::AnalyticsSettings;

use crate::graph::SimilarityGraph;

// ── PageRank ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
pub struct PageRankParams {
    pub damping: f64,
    pub tolerance: f64,
    pub max_iterations: usize,
}

impl From<&AnalyticsSettings> for PageRankParams {
    fn from(s: &AnalyticsSettings) -> Self {
        Self {
            damping: s.pagerank_damping,
            tolerance: s.pagerank_tolerance,
            max_iterations: s.pagerank_max_iterations,
        }
    }
}

/// PageRank by power iteration, following edge direction and ignoring
/// strength. Dangling nodes spread their rank evenly over all nodes.
/// Scores are indexed by node and sum to 1.
pub fn pagerank(graph: &SimilarityGraph, params: &PageRankParams) -> Vec<f64> {
    let n = graph.node_count();
    if n == 0 {
        return Vec::new();
    }

    let damping = params.damping;
    let base = (1.0 - damping) / n as f64;
    let mut scores = vec![1.0 / n as f64; n];
    let mut next = vec![0.0; n];

    for _ in 0..params.max_iterations {
        let dangling: f64 = graph
            .adjacency
            .iter()
            .zip(&scores)
            .filter(|(edges, _)| edges.is_empty())
            .map(|(_, s)| s)
            .sum();
        let spread = damping * dangling / n as f64;
        next.iter_mut().for_each(|s| *s = base + spread);

        for (i, edges) in graph.adjacency.iter().enumerate() {
            if edges.is_empty() {
                continue;
            }
            let share = damping * scores[i] / edges.len() as f64;
            for e in edges {
                next[e.target_index] += share;
            }
        }

        let diff: f64 = scores.iter().zip(&next).map(|(a, b)| (a - b).abs()).sum();
        std::mem::swap(&mut scores, &mut next);
        if diff < params.tolerance {
            break;
        }
    }

    let total: f64 = scores.iter().sum();
    if total > 0.0 {
        scores.iter_mut().for_each(|s| *s /= total);
    }
    scores
}

// ── Louvain ──────────────────────────────────────────────────────

/// A detected community; `members` are node indices in ascending order.
#[derive(Debug, Clone, PartialEq)]
pub struct Community {
    pub id: u32,
    pub members: Vec<usize>,
}

#[derive(Debug, Clone)]
pub struct CommunityResult {
    /// Community id per node index.
    pub assignment: Vec<u32>,
    /// Largest first; equal sizes by id.
    pub communities: Vec<Community>,
    pub modularity: f64,
}

const LOUVAIN_MAX_PASSES: usize = 100;

/// Louvain local-moving phase over the undirected view.
///
/// Nodes are visited in index order and move to the neighbouring community
/// with the largest strictly positive modularity gain (ties go to the lower
/// community id) until a full pass moves nothing. Community ids are then
/// renumbered contiguously in order of first appearance.
pub fn louvain(graph: &SimilarityGraph, resolution: f64, weighted: bool) -> CommunityResult {
    let n = graph.node_count();
    let adj = graph.undirected(weighted);
    let strengths: Vec<f64> = adj
        .iter()
        .map(|edges| edges.iter().map(|&(_, w)| w).sum())
        .collect();
    let total_weight: f64 = strengths.iter().sum::<f64>() / 2.0;

    let mut community: Vec<u32> = (0..n as u32).collect();

    if total_weight > 0.0 {
        let m2 = 2.0 * total_weight;
        let mut comm_strength: Vec<f64> = strengths.clone();

        let mut improved = true;
        let mut passes = 0;
        while improved && passes < LOUVAIN_MAX_PASSES {
            improved = false;
            passes += 1;

            for node in 0..n {
                let current = community[node];
                let ki = strengths[node];

                let mut links: BTreeMap<u32, f64> = BTreeMap::new();
                for &(neighbor, w) in &adj[node] {
                    *links.entry(community[neighbor]).or_default() += w;
                }

                let w_current = links.get(&current).copied().unwrap_or(0.0);
                let remove_cost = w_current / m2
                    - resolution * ki * (comm_strength[current as usize] - ki) / (m2 * m2);

                let mut best = current;
                let mut best_gain = 0.0;
                for (&target, &w_target) in &links {
                    if target == current {
                        continue;
                    }
                    let insert_cost = w_target / m2
                        - resolution * ki * comm_strength[target as usize] / (m2 * m2);
                    let gain = insert_cost - remove_cost;
                    if gain > best_gain {
                        best_gain = gain;
                        best = target;
                    }
                }

                if best != current {
                    comm_strength[current as usize] -= ki;
                    comm_strength[best as usize] += ki;
                    community[node] = best;
                    improved = true;
                }
            }
        }
    }

    let mut remap: HashMap<u32, u32> = HashMap::new();
    for c in community.iter_mut() {
        let next_id = remap.len() as u32;
        *c = *remap.entry(*c).or_insert(next_id);
    }

    let mut members: Vec<Vec<usize>> = vec![Vec::new(); remap.len()];
    for (node, &c) in community.iter().enumerate() {
        members[c as usize].push(node);
    }
    let mut communities: Vec<Community> = members
        .into_iter()
        .enumerate()
        .map(|(id, members)| Community {
            id: id as u32,
            members,
        })
        .collect();
    communities.sort_by(|a, b| b.members.len().cmp(&a.members.len()).then(a.id.cmp(&b.id)));

    let modularity = modularity(&community, &adj, &strengths, total_weight, resolution);

    CommunityResult {
        assignment: community,
        communities,
        modularity,
    }
}

/// Q = Σ_c [ L_c / m − γ (S_c / 2m)² ], where L_c is the edge weight inside
/// community c and S_c the total strength of its nodes.
fn modularity(
    community: &[u32],
    adj: &[Vec<(usize, f64)>],
    strengths: &[f64],
    total_weight: f64,
    resolution: f64,
) -> f64 {
    if total_weight == 0.0 {
        return 0.0;
    }
    let k = community.iter().map(|&c| c as usize + 1).max().unwrap_or(0);
    let mut internal = vec![0.0; k];
    let mut strength = vec![0.0; k];

    for (i, neighbors) in adj.iter().enumerate() {
        let ci = community[i] as usize;
        strength[ci] += strengths[i];
        for &(j, w) in neighbors {
            if community[j] as usize == ci {
                // Each undirected edge is seen from both ends.
                internal[ci] += w / 2.0;
            }
        }
    }

    let m2 = 2.0 * total_weight;
    internal
        .iter()
        .zip(&strength)
        .map(|(l, s)| l / total_weight - resolution * (s / m2) * (s / m2))
        .sum()
}

// ── Betweenness ──────────────────────────────────────────────────

/// Brandes betweenness over directed, unweighted edges, normalised by
/// `1 / ((n-1)(n-2))`. Graphs with fewer than three nodes score zero.
pub fn betweenness(graph: &SimilarityGraph) -> Vec<f64> {
    let n = graph.node_count();
    let mut centrality = vec![0.0; n];
    if n < 3 {
        return centrality;
    }

    for s in 0..n {
        let mut stack = Vec::with_capacity(n);
        let mut predecessors: Vec<Vec<usize>> = vec![Vec::new(); n];
        let mut sigma = vec![0.0_f64; n];
        let mut dist: Vec<i64> = vec![-1; n];
        sigma[s] = 1.0;
        dist[s] = 0;

        let mut queue = VecDeque::from([s]);
        while let Some(v) = queue.pop_front() {
            stack.push(v);
            for e in &graph.adjacency[v] {
                let w = e.target_index;
                if dist[w] < 0 {
                    dist[w] = dist[v] + 1;
                    queue.push_back(w);
                }
                if dist[w] == dist[v] + 1 {
                    sigma[w] += sigma[v];
                    predecessors[w].push(v);
                }
            }
        }

        let mut delta = vec![0.0; n];
        while let Some(w) = stack.pop() {
            for &v in &predecessors[w] {
                delta[v] += sigma[v] / sigma[w] * (1.0 + delta[w]);
            }
            if w != s {
                centrality[w] += delta[w];
            }
        }
    }

    let scale = 1.0 / ((n - 1) * (n - 2)) as f64;
    centrality.iter_mut().for_each(|c| *c *= scale);
    centrality
}

// ── Shortest path ────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct WeightedPath {
    pub node_indices: Vec<usize>,
    /// Sum of `1 / strength` over the path's edges.
    pub total_cost: f64,
}

/// Dijkstra over the undirected view with edge cost `1 / strength`, so the
/// cheapest path follows the strongest similarities. `None` if `target`
/// is unreachable.
pub fn shortest_path(graph: &SimilarityGraph, source: usize, target: usize) -> Option<WeightedPath> {
    let n = graph.node_count();
    if source >= n || target >= n {
        return None;
    }
    let adj = graph.undirected(true);

    let mut dist = vec![f64::INFINITY; n];
    let mut prev: Vec<Option<usize>> = vec![None; n];
    let mut visited = vec![false; n];
    dist[source] = 0.0;

    let mut heap = BinaryHeap::new();
    heap.push(DijkstraState {
        cost: 0.0,
        node: source,
    });

    while let Some(DijkstraState { cost, node }) = heap.pop() {
        if node == target {
            break;
        }
        if visited[node] {
            continue;
        }
        visited[node] = true;
        if cost > dist[node] {
            continue;
        }

        for &(next, strength) in &adj[node] {
            if strength <= 0.0 {
                continue;
            }
            let candidate = dist[node] + 1.0 / strength;
            if candidate < dist[next] {
                dist[next] = candidate;
                prev[next] = Some(node);
                heap.push(DijkstraState {
                    cost: candidate,
                    node: next,
                });
            }
        }
    }

    if dist[target].is_infinite() {
        return None;
    }

    let mut node_indices = vec![target];
    let mut current = target;
    while let Some(parent) = prev[current] {
        node_indices.push(parent);
        current = parent;
    }
    node_indices.reverse();

    Some(WeightedPath {
        node_indices,
        total_cost: dist[target],
    })
}

/// Min-heap entry for Dijkstra.
#[derive(Debug, Clone, PartialEq)]
struct DijkstraState {
    cost: f64,
    node: usize,
}

impl Eq for DijkstraState {}

impl Ord for DijkstraState {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse for min-heap (BinaryHeap is a max-heap).
        other
            .cost
            .partial_cmp(&self.cost)
            .unwrap_or(Ordering::Equal)
            .then_with(|| other.node.cmp(&self.node))
    }
}

impl PartialOrd for DijkstraState {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
