//! Hierarchical navigable small world graph over dense ordinals.
//!
//! Nodes are addressed by their insertion ordinal (0..n), which doubles as
//! the tie-break key for equal similarity scores. Level selection uses a
//! fixed-seed LCG so that rebuilding from the same insertion sequence
//! reproduces the same graph.

use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashSet};

/// Cap on layer height; the exponential level distribution makes anything
/// above this unreachable in practice.
const MAX_LEVEL: u8 = 16;

const LCG_MUL: u64 = 6364136223846793005;
const LCG_ADD: u64 = 1442695040888963407;
const LCG_SEED: u64 = 0x5f0e_11b8;

#[derive(Debug)]
pub(crate) struct GraphNode {
    pub vector: Vec<f32>,
    pub magnitude: f32,
    /// Adjacency lists, layer 0 first; length = node level + 1.
    pub neighbors: Vec<Vec<u32>>,
}

#[derive(Debug)]
pub(crate) struct HnswGraph {
    m: usize,
    m_max0: usize,
    ef_construction: usize,
    level_mult: f64,
    nodes: Vec<GraphNode>,
    entry_point: Option<u32>,
    level_max: u8,
    rng_state: u64,
}

impl HnswGraph {
    pub fn new(m: usize, ef_construction: usize) -> Self {
        Self {
            m,
            m_max0: m * 2,
            ef_construction,
            level_mult: 1.0 / (m as f64).ln(),
            nodes: Vec::new(),
            entry_point: None,
            level_max: 0,
            rng_state: LCG_SEED,
        }
    }

    /// Rebuild a graph from persisted parts. Magnitudes are recomputed.
    pub fn from_parts(
        m: usize,
        ef_construction: usize,
        nodes: Vec<(Vec<f32>, Vec<Vec<u32>>)>,
        entry_point: Option<u32>,
        level_max: u8,
        rng_state: u64,
    ) -> Self {
        let nodes = nodes
            .into_iter()
            .map(|(vector, neighbors)| {
                let magnitude = magnitude(&vector);
                GraphNode {
                    vector,
                    magnitude,
                    neighbors,
                }
            })
            .collect();
        Self {
            m,
            m_max0: m * 2,
            ef_construction,
            level_mult: 1.0 / (m as f64).ln(),
            nodes,
            entry_point,
            level_max,
            rng_state,
        }
    }

    pub fn entry_point(&self) -> Option<u32> {
        self.entry_point
    }

    pub fn level_max(&self) -> u8 {
        self.level_max
    }

    pub fn rng_state(&self) -> u64 {
        self.rng_state
    }

    pub fn node(&self, ordinal: u32) -> &GraphNode {
        &self.nodes[ordinal as usize]
    }

    pub fn vector(&self, ordinal: u32) -> &[f32] {
        &self.nodes[ordinal as usize].vector
    }

    /// Insert a vector; the assigned ordinal is the current node count.
    pub fn add_point(&mut self, vector: Vec<f32>) -> u32 {
        let ordinal = self.nodes.len() as u32;
        let level = self.select_level();
        let mag = magnitude(&vector);

        let node = GraphNode {
            vector,
            magnitude: mag,
            neighbors: vec![Vec::new(); level as usize + 1],
        };

        let Some(entry) = self.entry_point else {
            self.entry_point = Some(ordinal);
            self.level_max = level;
            self.nodes.push(node);
            return ordinal;
        };

        let query = node.vector.clone();
        self.nodes.push(node);

        // Phase 1: greedy descent through layers above the node's level.
        let mut ep = entry;
        let mut current = self.level_max;
        while current > level {
            ep = self.greedy_step(ep, &query, mag, current);
            current -= 1;
        }

        // Phase 2: connect at every layer from the node's level down.
        let top = level.min(self.level_max);
        for layer in (0..=top).rev() {
            let found = self.beam_search(ep, &query, mag, self.ef_construction, layer);
            let limit = if layer == 0 { self.m_max0 } else { self.m };

            let selected: Vec<u32> = found
                .iter()
                .map(|&(o, _)| o)
                .filter(|&o| o != ordinal)
                .take(limit)
                .collect();

            for &nb in &selected {
                self.link(nb, ordinal, layer);
                self.link(ordinal, nb, layer);
            }
            for &nb in &selected {
                self.prune(nb, layer, limit);
            }

            if let Some(&(best, _)) = found.first() {
                ep = best;
            }
        }

        if level > self.level_max {
            self.entry_point = Some(ordinal);
            self.level_max = level;
        }

        ordinal
    }

    /// k approximate nearest neighbors by cosine similarity, scores
    /// descending, ties broken by lower ordinal.
    pub fn search(&self, query: &[f32], k: usize, ef_search: usize) -> Vec<(u32, f32)> {
        let Some(entry) = self.entry_point else {
            return Vec::new();
        };
        if k == 0 {
            return Vec::new();
        }

        let qmag = magnitude(query);
        let mut ep = entry;
        let mut level = self.level_max;
        while level > 0 {
            ep = self.greedy_step(ep, query, qmag, level);
            level -= 1;
        }

        let ef = ef_search.max(k);
        let mut hits = self.beam_search(ep, query, qmag, ef, 0);
        hits.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        hits.truncate(k);
        hits
    }

    fn select_level(&mut self) -> u8 {
        self.rng_state = self.rng_state.wrapping_mul(LCG_MUL).wrapping_add(LCG_ADD);
        let uniform = ((self.rng_state >> 32) as u32 as f64 / u32::MAX as f64).max(1e-9);
        let level = (-uniform.ln() * self.level_mult).floor() as u64;
        level.min(MAX_LEVEL as u64) as u8
    }

    /// Greedy hill-climb at one layer, returns the nearest node found.
    fn greedy_step(&self, entry: u32, query: &[f32], qmag: f32, layer: u8) -> u32 {
        let mut current = entry;
        let mut current_sim = self.similarity(current, query, qmag);

        loop {
            let mut improved = false;
            let node = &self.nodes[current as usize];
            if let Some(neighbors) = node.neighbors.get(layer as usize) {
                for &nb in neighbors {
                    let sim = self.similarity(nb, query, qmag);
                    if sim > current_sim {
                        current = nb;
                        current_sim = sim;
                        improved = true;
                    }
                }
            }
            if !improved {
                return current;
            }
        }
    }

    /// Beam search at one layer; result is sorted by similarity descending.
    fn beam_search(
        &self,
        entry: u32,
        query: &[f32],
        qmag: f32,
        ef: usize,
        layer: u8,
    ) -> Vec<(u32, f32)> {
        let mut visited: HashSet<u32> = HashSet::new();
        let mut candidates: BinaryHeap<ScoredOrd> = BinaryHeap::new();
        let mut results: BinaryHeap<Reverse<ScoredOrd>> = BinaryHeap::new();

        let entry_sim = self.similarity(entry, query, qmag);
        visited.insert(entry);
        candidates.push(ScoredOrd::new(entry_sim, entry));
        results.push(Reverse(ScoredOrd::new(entry_sim, entry)));

        while let Some(candidate) = candidates.pop() {
            let worst = results.peek().map(|r| r.0.score).unwrap_or(f32::NEG_INFINITY);
            if candidate.score < worst && results.len() >= ef {
                break;
            }

            let node = &self.nodes[candidate.ordinal as usize];
            if let Some(neighbors) = node.neighbors.get(layer as usize) {
                for &nb in neighbors {
                    if !visited.insert(nb) {
                        continue;
                    }
                    let sim = self.similarity(nb, query, qmag);
                    let worst = results.peek().map(|r| r.0.score).unwrap_or(f32::NEG_INFINITY);
                    if sim > worst || results.len() < ef {
                        candidates.push(ScoredOrd::new(sim, nb));
                        results.push(Reverse(ScoredOrd::new(sim, nb)));
                        if results.len() > ef {
                            results.pop();
                        }
                    }
                }
            }
        }

        let mut out: Vec<(u32, f32)> = results
            .into_iter()
            .map(|r| (r.0.ordinal, r.0.score))
            .collect();
        out.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        out
    }

    fn link(&mut self, from: u32, to: u32, layer: u8) {
        let node = &mut self.nodes[from as usize];
        while node.neighbors.len() <= layer as usize {
            node.neighbors.push(Vec::new());
        }
        let list = &mut node.neighbors[layer as usize];
        if !list.contains(&to) {
            list.push(to);
        }
    }

    /// Keep only the `limit` most similar neighbors of a node at one layer.
    fn prune(&mut self, ordinal: u32, layer: u8, limit: usize) {
        let (vector, mag, current) = {
            let node = &self.nodes[ordinal as usize];
            match node.neighbors.get(layer as usize) {
                Some(list) if list.len() > limit => {
                    (node.vector.clone(), node.magnitude, list.clone())
                }
                _ => return,
            }
        };

        let mut scored: Vec<(u32, f32)> = current
            .into_iter()
            .map(|nb| (nb, self.similarity(nb, &vector, mag)))
            .collect();
        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        scored.truncate(limit);

        self.nodes[ordinal as usize].neighbors[layer as usize] =
            scored.into_iter().map(|(nb, _)| nb).collect();
    }

    fn similarity(&self, ordinal: u32, query: &[f32], qmag: f32) -> f32 {
        let node = &self.nodes[ordinal as usize];
        cosine(&node.vector, node.magnitude, query, qmag)
    }
}

/// Heap entry ordered by score; ties prefer the lower ordinal.
#[derive(Clone, Copy, Debug)]
struct ScoredOrd {
    score: f32,
    ordinal: u32,
}

impl ScoredOrd {
    fn new(score: f32, ordinal: u32) -> Self {
        Self { score, ordinal }
    }
}

impl PartialEq for ScoredOrd {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ScoredOrd {}

impl PartialOrd for ScoredOrd {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScoredOrd {
    fn cmp(&self, other: &Self) -> Ordering {
        self.score
            .partial_cmp(&other.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| other.ordinal.cmp(&self.ordinal))
    }
}

pub(crate) fn magnitude(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

fn cosine(a: &[f32], mag_a: f32, b: &[f32], mag_b: f32) -> f32 {
    if mag_a == 0.0 || mag_b == 0.0 {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    dot / (mag_a * mag_b)
}
