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

//! # Self matching
//! Collapses points that sit close together into exclusive clusters. The input is, for every point, the list
//! of points within the match radius of it (itself included). The resolution is greedy: the points with the
//! most neighbors claim their neighborhoods first, and a point that has been claimed can't start or join
//! another cluster. This is not the optimal covering, just a fast and predictable one.

use serde::{Deserialize, Serialize};
use skycloud::{PointIndex, SkyCloud};

use crate::errors::{SphMatchError, SphMatchResult};
use crate::matches::MatchPairs;

/// An exclusive group of points.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cluster {
    /// The point that claimed the cluster
    pub representative: PointIndex,
    /// All points in the cluster, the representative included, ascending
    pub members: Vec<PointIndex>,
    /// Length of the representative's neighbor list, before any of it was claimed by other clusters
    pub neighbor_count: usize,
}

impl Cluster {
    /// Number of members
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Clusters always hold their representative, this is here for completeness
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Greedily resolves neighbor lists into exclusive clusters.
///
/// Points are visited by descending neighbor count, equal counts in ascending index order. A visited point
/// that's still unclaimed and has at least `min_match` neighbors becomes a representative. Its cluster is
/// every neighbor that is still unclaimed, plus itself. Points that are never accepted and never claimed are
/// left out of the result, so with `min_match <= 1` the clusters partition the points.
///
/// Fails if a neighbor list refers to a point past the end.
pub fn resolve_clusters(
    neighbors: &[Vec<PointIndex>],
    min_match: usize,
) -> SphMatchResult<Vec<Cluster>> {
    let n = neighbors.len();
    for (i, list) in neighbors.iter().enumerate() {
        if let Some(j) = list.iter().find(|j| **j >= n) {
            return Err(SphMatchError::invalid(format!(
                "point {} lists neighbor {}, but there are only {} points",
                i, j, n
            )));
        }
    }

    // Stable, so equal counts stay in index order
    let mut order: Vec<PointIndex> = (0..n).collect();
    order.sort_by(|a, b| neighbors[*b].len().cmp(&neighbors[*a].len()));

    let mut owner: Vec<Option<PointIndex>> = vec![None; n];
    let mut clusters = Vec::new();
    for j in order {
        let neighbor_count = neighbors[j].len();
        if neighbor_count < min_match {
            break;
        }
        if owner[j].is_some() {
            continue;
        }
        let mut members: Vec<PointIndex> = neighbors[j]
            .iter()
            .copied()
            .filter(|m| owner[*m].is_none())
            .collect();
        members.push(j);
        members.sort_unstable();
        members.dedup();
        for m in members.iter() {
            owner[*m] = Some(j);
        }
        clusters.push(Cluster {
            representative: j,
            members,
            neighbor_count,
        });
    }
    Ok(clusters)
}

/// One row per cluster member: `(representative, member, distance)` with the great circle distance in degrees.
/// The representative's own row has distance 0.
pub fn flatten_clusters(clusters: &[Cluster], cloud: &SkyCloud) -> SphMatchResult<MatchPairs> {
    let mut representatives = Vec::with_capacity(clusters.iter().map(|c| c.len()).sum());
    let mut members = Vec::with_capacity(representatives.capacity());
    for cluster in clusters {
        for member in cluster.members.iter() {
            representatives.push(cluster.representative);
            members.push(*member);
        }
    }
    let mut distances = cloud.paired_distances(cloud, &representatives, &members)?;
    for ((r, m), d) in representatives.iter().zip(members.iter()).zip(distances.iter_mut()) {
        if r == m {
            *d = 0.0;
        }
    }
    Ok(MatchPairs {
        ref_indices: representatives,
        query_indices: members,
        distances,
    })
}
