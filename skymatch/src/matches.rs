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

//! The results handed back by the [`Matcher`](crate::Matcher).

use ndarray::ArrayD;
use serde::{Deserialize, Serialize};
use skycloud::PointIndex;

use crate::self_match::Cluster;

/// Matches flattened into parallel columns, one row per matched pair. Distances are in degrees.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchPairs {
    /// Index into the reference points, or the cluster representative for self matches
    pub ref_indices: Vec<PointIndex>,
    /// Index into the flattened query points, or the cluster member for self matches
    pub query_indices: Vec<PointIndex>,
    /// Angular distance between the two
    pub distances: Vec<f64>,
}

impl MatchPairs {
    /// Empty columns with room for `capacity` rows
    pub fn with_capacity(capacity: usize) -> MatchPairs {
        MatchPairs {
            ref_indices: Vec::with_capacity(capacity),
            query_indices: Vec::with_capacity(capacity),
            distances: Vec::with_capacity(capacity),
        }
    }

    /// Appends a row
    pub fn push(&mut self, ref_index: PointIndex, query_index: PointIndex, distance: f64) {
        self.ref_indices.push(ref_index);
        self.query_indices.push(query_index);
        self.distances.push(distance);
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.ref_indices.len()
    }

    /// If there are no rows
    pub fn is_empty(&self) -> bool {
        self.ref_indices.is_empty()
    }

    /// Iterates over the rows as `(ref_index, query_index, distance)`
    pub fn iter(&self) -> impl Iterator<Item = (PointIndex, PointIndex, f64)> + '_ {
        self.ref_indices
            .iter()
            .zip(self.query_indices.iter())
            .zip(self.distances.iter())
            .map(|((r, q), d)| (*r, *q, *d))
    }
}

/// Result of a k nearest neighbor match.
///
/// Both arrays have the shape of the query coordinates with a trailing axis of length `k`. The trailing axis
/// is left off when `k == 1`. Ranks without a match within the distance bound have an infinite distance and
/// the index one past the last reference point.
#[derive(Debug, Clone)]
pub struct KnnMatches {
    /// Angular distances, in degrees
    pub distances: ArrayD<f64>,
    /// Indices into the reference points
    pub indices: ArrayD<PointIndex>,
    /// The queries that found a match, only when asked for. Query indices are positions in the
    /// row-major flattening of the query arrays.
    pub pairs: Option<MatchPairs>,
}

/// Result of a radius match.
#[derive(Debug, Clone)]
pub struct RadiusMatches {
    /// For every reference point, the positions of the query points within the radius, ascending
    pub neighbors: Vec<Vec<PointIndex>>,
    /// Every matched pair with its great circle distance, only when asked for
    pub pairs: Option<MatchPairs>,
}

impl RadiusMatches {
    /// Total number of matched pairs
    pub fn pair_count(&self) -> usize {
        self.neighbors.iter().map(|n| n.len()).sum()
    }
}

/// Result of matching the reference points against themselves.
#[derive(Debug, Clone)]
pub struct SelfMatches {
    /// Exclusive clusters in the order they were accepted
    pub clusters: Vec<Cluster>,
    /// One row per cluster member, paired with its representative, only when asked for
    pub pairs: Option<MatchPairs>,
}
