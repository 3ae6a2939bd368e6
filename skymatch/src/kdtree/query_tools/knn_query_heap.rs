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

use skycloud::PointIndex;
use std::collections::BinaryHeap;

use super::query_items::{QueryAddress, QuerySingleton};
use super::{NodeQueryHeap, PointQueryHeap};

/// The heaps for doing a best first KNN query. There are 2 heaps, the node min-heap and the distance max-heap.
/// The distance heap is for the output KNN. Each point that's pushed onto it is kept only while it's one of the
/// `k` closest seen so far, so its top is the distance to the furthest of the current nearest neighbors.
///
/// The node heap holds the nodes we haven't opened yet, keyed by the closest any of their points could be.
/// Once that is further than the top of the distance heap (or the distance bound) no unopened node can improve
/// the result and the query is over.
///
/// Everything is in squared chord lengths, the square root is only taken when unpacking.
#[derive(Debug)]
pub struct KnnQueryHeap {
    node_heap: BinaryHeap<QueryAddress>,
    dist_heap: BinaryHeap<QuerySingleton>,
    k: usize,
    bound_sq: f64,
}

impl NodeQueryHeap for KnnQueryHeap {
    fn push_nodes(&mut self, nodes: &[usize], min_dists_sq: &[f64]) {
        let max_dist_sq = self.max_dist_sq();
        for (node, d) in nodes.iter().zip(min_dists_sq) {
            if *d <= max_dist_sq {
                self.node_heap.push(QueryAddress {
                    min_dist_sq: *d,
                    node: *node,
                });
            }
        }
    }
}

impl PointQueryHeap for KnnQueryHeap {
    fn push_points(&mut self, indexes: &[PointIndex], dists_sq: &[f64]) {
        for (i, d) in indexes.iter().zip(dists_sq) {
            if *d > self.bound_sq {
                continue;
            }
            let candidate = QuerySingleton::new(*i, *d);
            if self.dist_heap.len() < self.k {
                self.dist_heap.push(candidate);
            } else if let Some(furthest) = self.dist_heap.peek() {
                if candidate < *furthest {
                    self.dist_heap.pop();
                    self.dist_heap.push(candidate);
                }
            }
        }
    }
}

impl KnnQueryHeap {
    /// Creates a new KNN heap. Points further than `max_chord` are never kept, pass infinity for no bound.
    pub fn new(k: usize, max_chord: f64) -> KnnQueryHeap {
        KnnQueryHeap {
            node_heap: BinaryHeap::new(),
            dist_heap: BinaryHeap::new(),
            k,
            bound_sq: max_chord * max_chord,
        }
    }

    /// Pops the closest node that could still hold one of the k nearest neighbors.
    /// Returns `None` once there are none left.
    pub fn closest_unvisited_node(&mut self) -> Option<(f64, usize)> {
        let node_to_visit = self.node_heap.pop()?;
        if node_to_visit.min_dist_sq <= self.max_dist_sq() {
            Some((node_to_visit.min_dist_sq, node_to_visit.node))
        } else {
            // Everything left is further still
            self.node_heap.clear();
            None
        }
    }

    /// The current number of points on the distance heap
    pub fn len(&self) -> usize {
        self.dist_heap.len()
    }

    /// If no point has made it onto the distance heap
    pub fn is_empty(&self) -> bool {
        self.dist_heap.is_empty()
    }

    /// The current number of nodes still waiting to be opened
    pub fn node_len(&self) -> usize {
        self.node_heap.len()
    }

    /// The current maximum squared distance a useful point could be at. This is the distance bound until the
    /// heap has `k` points, then it's the smaller of that and the kth distance.
    pub fn max_dist_sq(&self) -> f64 {
        if self.len() < self.k {
            self.bound_sq
        } else {
            self.dist_heap
                .peek()
                .map(|x| x.dist_sq.min(self.bound_sq))
                .unwrap_or(self.bound_sq)
        }
    }

    /// Unpacks the distance heap into exactly `k` `(chord, index)` pairs, closest first. Missing neighbors
    /// are filled in with `(infinity, sentinel)`. This consumes the query heap.
    pub fn unpack(self, sentinel: PointIndex) -> Vec<(f64, PointIndex)> {
        let k = self.k;
        let mut result: Vec<(f64, PointIndex)> = self
            .dist_heap
            .into_sorted_vec()
            .into_iter()
            .map(|el| (el.dist_sq.sqrt(), el.index))
            .collect();
        result.resize(k, (f64::INFINITY, sentinel));
        result
    }
}
