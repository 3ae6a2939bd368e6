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
use std::cmp::Ordering;

/// A node waiting to be visited, keyed by the smallest squared distance anything inside it could be from the query.
#[derive(Clone, Copy, Debug)]
pub(crate) struct QueryAddress {
    pub(crate) min_dist_sq: f64,
    pub(crate) node: usize,
}

impl PartialEq for QueryAddress {
    fn eq(&self, other: &QueryAddress) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for QueryAddress {}

impl Ord for QueryAddress {
    fn cmp(&self, other: &QueryAddress) -> Ordering {
        // Backwards to make it a min heap. Arena order breaks ties so the visit order is fixed.
        other
            .min_dist_sq
            .partial_cmp(&self.min_dist_sq)
            .unwrap_or(Ordering::Equal)
            .then_with(|| other.node.cmp(&self.node))
    }
}

impl PartialOrd for QueryAddress {
    fn partial_cmp(&self, other: &QueryAddress) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A candidate neighbor. Ordered by distance, then by index, so the max heap evicts the larger index
/// between two equally distant points.
#[derive(Clone, Copy, Debug)]
pub(crate) struct QuerySingleton {
    pub(crate) dist_sq: f64,
    pub(crate) index: PointIndex,
}

impl QuerySingleton {
    pub(crate) fn new(index: PointIndex, dist_sq: f64) -> QuerySingleton {
        QuerySingleton { dist_sq, index }
    }
}

impl PartialEq for QuerySingleton {
    fn eq(&self, other: &QuerySingleton) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for QuerySingleton {}

impl Ord for QuerySingleton {
    fn cmp(&self, other: &QuerySingleton) -> Ordering {
        self.dist_sq
            .partial_cmp(&other.dist_sq)
            .unwrap_or(Ordering::Equal)
            .then_with(|| self.index.cmp(&other.index))
    }
}

impl PartialOrd for QuerySingleton {
    fn partial_cmp(&self, other: &QuerySingleton) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
