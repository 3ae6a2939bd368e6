/*
* Licensed to Elasticsearch B.V. under one or more contributor
* license agreements. See the NOTICE file distributed with
* this work for additional information regarding copyright
* ownership. Elasticsearch B.V. licenses this file to you under
* the Apache License, Version 2.0 (the "License"); you may
* not use this file except in compliance with the License.
* You may obtain a copy of the License at
*
*  http://www.apache.org/licenses/LICENSE-2.0
*
* Unless required by applicable law or agreed to in writing,
* software distributed under the License is distributed on an
* "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
* KIND, either express or implied.  See the License for the
* specific language governing permissions and limitations
* under the License.
*/

use super::node::{KdNode, NodeKind};
use super::query_tools::{KnnQueryHeap, NodeQueryHeap, PointQueryHeap};
use super::*;
use rayon::prelude::*;
use skycloud::projection::chord_sq;
use skycloud::{PointIndex, UnitVector};
use std::sync::Arc;

/// # Kd-Tree
///
/// Built by a [`KdTreeBuilder`], immutable afterwards. The tree shares the points it indexes with the cloud they
/// were projected in, and knows nothing of the sky coordinates. Every radius and distance it deals with is a chord.
///
/// The nodes live in one arena. Node 0 is the root and the two children of a split are adjacent. Each node
/// covers a contiguous range of `indices`, which is a permutation of `0..len()`.
#[derive(Debug, Clone)]
pub struct KdTree {
    pub(crate) parameters: KdTreeParameters,
    pub(crate) points: Arc<[UnitVector]>,
    pub(crate) indices: Vec<PointIndex>,
    pub(crate) nodes: Vec<KdNode>,
    pub(crate) leaves: Vec<usize>,
}

impl KdTree {
    /// The number of indexed points. This is also the index used for missing neighbors.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// If the tree holds no points
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Total number of nodes, leaves included
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// How the nodes were split
    pub fn build_mode(&self) -> BuildMode {
        self.parameters.build_mode
    }

    /// The parameters the tree was built with
    pub fn parameters(&self) -> &KdTreeParameters {
        &self.parameters
    }

    /// The indexed points, in their original order
    pub fn points(&self) -> &[UnitVector] {
        &self.points
    }

    /// The root node, `None` for an empty tree.
    pub fn root(&self) -> Option<&KdNode> {
        self.nodes.first()
    }

    /// A node by its arena index
    pub fn get_node(&self, node_index: usize) -> Option<&KdNode> {
        self.nodes.get(node_index)
    }

    /// The points a node covers
    pub fn node_points(&self, node: &KdNode) -> &[PointIndex] {
        &self.indices[node.address.0..node.address.1]
    }

    /// The `k` nearest points to `point` by chord, closest first. Equal chords are ordered by index.
    ///
    /// Always returns exactly `k` entries. Slots that have no point within `max_chord` are
    /// `(f64::INFINITY, self.len())`. Pass `f64::INFINITY` for an unbounded search.
    pub fn knn(&self, point: &UnitVector, k: usize, max_chord: f64) -> Vec<(f64, PointIndex)> {
        if k == 0 {
            return Vec::new();
        }
        let mut query_heap = KnnQueryHeap::new(k, max_chord);
        if let Some(root) = self.root() {
            query_heap.push_nodes(&[0], &[root.bounds.min_dist_sq(point)]);
        }
        let mut dists_sq = Vec::with_capacity(self.parameters.leaf_cutoff);
        while let Some((_, node_index)) = query_heap.closest_unvisited_node() {
            let node = &self.nodes[node_index];
            match node.kind {
                NodeKind::Leaf => {
                    let indexes = self.node_points(node);
                    dists_sq.clear();
                    dists_sq.extend(indexes.iter().map(|i| chord_sq(point, &self.points[*i])));
                    query_heap.push_points(indexes, &dists_sq);
                }
                NodeKind::Split { left, right, .. } => {
                    query_heap.push_nodes(
                        &[left, right],
                        &[
                            self.nodes[left].bounds.min_dist_sq(point),
                            self.nodes[right].bounds.min_dist_sq(point),
                        ],
                    );
                }
            }
        }
        query_heap.unpack(self.len())
    }

    /// Runs [`knn`](Self::knn) for every point in parallel. The output is in the same order as the input.
    pub fn query_knn(
        &self,
        points: &[UnitVector],
        k: usize,
        max_chord: f64,
    ) -> Vec<Vec<(f64, PointIndex)>> {
        points
            .par_iter()
            .map(|point| self.knn(point, k, max_chord))
            .collect()
    }

    /// All points within `radius` (chord) of `point`, ascending.
    ///
    /// With `eps > 0` whole nodes are taken once their far corner is within `radius * (1 + eps)`, so some
    /// points up to that distance may show up. `eps = 0` is exact.
    pub fn ball(&self, point: &UnitVector, radius: f64, eps: f64) -> Vec<PointIndex> {
        let radius_sq = radius * radius;
        let bulk_sq = (radius * (1.0 + eps)).powi(2);
        let mut found = Vec::new();
        let mut unvisited: Vec<usize> = if self.is_empty() { vec![] } else { vec![0] };
        while let Some(node_index) = unvisited.pop() {
            let node = &self.nodes[node_index];
            if node.bounds.min_dist_sq(point) > radius_sq {
                continue;
            }
            if node.bounds.max_dist_sq(point) <= bulk_sq {
                found.extend_from_slice(self.node_points(node));
                continue;
            }
            match node.kind {
                NodeKind::Leaf => found.extend(
                    self.node_points(node)
                        .iter()
                        .filter(|i| chord_sq(point, &self.points[**i]) <= radius_sq),
                ),
                NodeKind::Split { left, right, .. } => {
                    unvisited.push(right);
                    unvisited.push(left);
                }
            }
        }
        found.sort_unstable();
        found
    }

    /// For every point of `self`, the points of `other` within `radius` (chord) of it, each list ascending.
    /// Same `eps` semantics as [`ball`](Self::ball).
    ///
    /// This is a dual tree traversal. Each leaf of `self` walks `other` in parallel, pruning on the distance
    /// between bounding boxes, so the cost is driven by the number of close pairs rather than `self.len()`.
    pub fn query_ball(&self, other: &KdTree, radius: f64, eps: f64) -> Vec<Vec<PointIndex>> {
        let mut neighbors = vec![Vec::new(); self.len()];
        if self.is_empty() || other.is_empty() {
            return neighbors;
        }
        let radius_sq = radius * radius;
        let bulk_sq = (radius * (1.0 + eps)).powi(2);

        let per_leaf: Vec<Vec<(PointIndex, Vec<PointIndex>)>> = self
            .leaves
            .par_iter()
            .map(|leaf_index| {
                let leaf = &self.nodes[*leaf_index];
                let own = self.node_points(leaf);
                let mut found: Vec<Vec<PointIndex>> = vec![Vec::new(); own.len()];
                let mut unvisited = vec![0];
                while let Some(node_index) = unvisited.pop() {
                    let node = &other.nodes[node_index];
                    if leaf.bounds.min_dist_sq_to_box(&node.bounds) > radius_sq {
                        continue;
                    }
                    if leaf.bounds.max_dist_sq_to_box(&node.bounds) <= bulk_sq {
                        for list in found.iter_mut() {
                            list.extend_from_slice(other.node_points(node));
                        }
                        continue;
                    }
                    match node.kind {
                        NodeKind::Leaf => {
                            for (list, i) in found.iter_mut().zip(own) {
                                let p = &self.points[*i];
                                list.extend(
                                    other
                                        .node_points(node)
                                        .iter()
                                        .filter(|j| chord_sq(p, &other.points[**j]) <= radius_sq),
                                );
                            }
                        }
                        NodeKind::Split { left, right, .. } => {
                            unvisited.push(right);
                            unvisited.push(left);
                        }
                    }
                }
                own.iter().copied().zip(found).collect()
            })
            .collect();

        for (i, list) in per_leaf.into_iter().flatten() {
            neighbors[i] = list;
        }
        neighbors.par_iter_mut().for_each(|list| list.sort_unstable());
        neighbors
    }
}
