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

//! # Matcher
//! The entry point of the library. A matcher holds a reference set of sky coordinates and a balanced kd-tree
//! over their unit vectors, and answers angular queries against it. All angles in and out are degrees.

use log::{debug, info};
use ndarray::{ArrayD, ArrayView, Dimension, IxDyn};
use skycloud::projection::{angle_to_chord, chord_to_angle};
use skycloud::{PointIndex, SkyCloud};

use crate::errors::{SphMatchError, SphMatchResult};
use crate::kdtree::{BuildMode, KdTree, KdTreeBuilder};
use crate::matches::{KnnMatches, MatchPairs, RadiusMatches, SelfMatches};
use crate::self_match::{flatten_clusters, resolve_clusters};

/// A reference point set with its spatial index.
///
/// The index is released by [`close`](Matcher::close) or when the matcher is dropped. Queries on a closed
/// matcher fail with [`SphMatchError::Closed`]. Queries only need `&self`, so a matcher can be shared between
/// threads.
#[derive(Debug)]
pub struct Matcher {
    cloud: SkyCloud,
    tree: Option<KdTree>,
}

fn check_shapes(lon: &[usize], lat: &[usize]) -> SphMatchResult<()> {
    if lon != lat {
        return Err(SphMatchError::invalid(format!(
            "longitude has shape {:?} but latitude has shape {:?}",
            lon, lat
        )));
    }
    Ok(())
}

fn cloud_from_views<D: Dimension>(
    lon: &ArrayView<f64, D>,
    lat: &ArrayView<f64, D>,
) -> SphMatchResult<SkyCloud> {
    check_shapes(lon.shape(), lat.shape())?;
    Ok(SkyCloud::from_iters(
        lon.len(),
        lon.iter().copied(),
        lat.len(),
        lat.iter().copied(),
    )?)
}

fn check_radius(radius: f64, eps: f64) -> SphMatchResult<()> {
    if !(radius.is_finite() && radius >= 0.0) {
        return Err(SphMatchError::invalid(format!(
            "the radius must be finite and non-negative, got {}",
            radius
        )));
    }
    if !(eps.is_finite() && eps >= 0.0) {
        return Err(SphMatchError::invalid(format!(
            "eps must be finite and non-negative, got {}",
            eps
        )));
    }
    Ok(())
}

impl Matcher {
    /// Builds a matcher over the reference coordinates with the default tree parameters.
    ///
    /// Fails with `InvalidArgument` if the slices differ in length, and with `DomainError` if a latitude is
    /// outside of [-90, 90] or a coordinate isn't finite.
    pub fn new(lon: &[f64], lat: &[f64]) -> SphMatchResult<Matcher> {
        Matcher::with_builder(lon, lat, &KdTreeBuilder::default())
    }

    /// Same as `new`, with the tree parameters taken from the builder. The reference tree is always balanced.
    pub fn with_builder(lon: &[f64], lat: &[f64], builder: &KdTreeBuilder) -> SphMatchResult<Matcher> {
        let cloud = SkyCloud::new(lon, lat)?;
        let mut builder = builder.clone();
        builder.set_build_mode(BuildMode::Balanced);
        let tree = builder.build_from_cloud(&cloud)?;
        info!(
            "Built a matcher over {} reference points with {} nodes",
            cloud.len(),
            tree.node_count()
        );
        Ok(Matcher {
            cloud,
            tree: Some(tree),
        })
    }

    /// Number of reference points
    pub fn len(&self) -> usize {
        self.cloud.len()
    }

    /// If there are no reference points
    pub fn is_empty(&self) -> bool {
        self.cloud.is_empty()
    }

    /// The reference points
    pub fn cloud(&self) -> &SkyCloud {
        &self.cloud
    }

    /// The reference index, or `Closed`.
    pub fn tree(&self) -> SphMatchResult<&KdTree> {
        self.tree.as_ref().ok_or(SphMatchError::Closed)
    }

    /// If `close` has been called
    pub fn is_closed(&self) -> bool {
        self.tree.is_none()
    }

    /// Releases the index. Calling this more than once is fine. The reference coordinates stay readable.
    pub fn close(&mut self) {
        if self.tree.take().is_some() {
            debug!("Closed the matcher over {} points", self.cloud.len());
        }
    }

    /// The `k` nearest reference points to every query point.
    ///
    /// `lon` and `lat` must have the same shape, which can be anything. The output arrays have that shape
    /// with a trailing axis of length `k`, dropped for `k == 1`. Neighbors further than
    /// `distance_upper_bound` degrees are reported as `(infinity, self.len())`. A bound of 180 degrees or
    /// more is the same as no bound.
    ///
    /// With `return_pairs` (only allowed for `k == 1`) the queries that found a match are also flattened
    /// into [`MatchPairs`], with query indices counted in row-major order.
    pub fn query_knn<D: Dimension>(
        &self,
        lon: ArrayView<f64, D>,
        lat: ArrayView<f64, D>,
        k: usize,
        distance_upper_bound: Option<f64>,
        return_pairs: bool,
    ) -> SphMatchResult<KnnMatches> {
        let tree = self.tree()?;
        if k == 0 {
            return Err(SphMatchError::invalid("k must be at least 1"));
        }
        if return_pairs && k != 1 {
            return Err(SphMatchError::invalid(format!(
                "pairs can only be returned for k = 1, got k = {}",
                k
            )));
        }
        let max_chord = match distance_upper_bound {
            None => f64::INFINITY,
            Some(bound) if bound >= 0.0 => angle_to_chord(bound),
            Some(bound) => {
                return Err(SphMatchError::invalid(format!(
                    "the distance upper bound must be non-negative, got {}",
                    bound
                )))
            }
        };
        let queries = cloud_from_views(&lon, &lat)?;

        let results = tree.query_knn(queries.vectors(), k, max_chord);
        let mut distances = Vec::with_capacity(results.len() * k);
        let mut indices = Vec::with_capacity(results.len() * k);
        for row in results.iter() {
            for (chord, index) in row.iter() {
                distances.push(chord_to_angle(*chord));
                indices.push(*index);
            }
        }

        let pairs = if return_pairs {
            let mut pairs = MatchPairs::default();
            for (position, row) in results.iter().enumerate() {
                let (chord, index) = row[0];
                if chord.is_finite() {
                    pairs.push(index, position, chord_to_angle(chord));
                }
            }
            Some(pairs)
        } else {
            None
        };
        debug!(
            "Matched {} query points to their {} nearest neighbors",
            queries.len(),
            k
        );

        let mut shape = lon.shape().to_vec();
        if k != 1 {
            shape.push(k);
        }
        Ok(KnnMatches {
            distances: ArrayD::from_shape_vec(IxDyn(&shape), distances)?,
            indices: ArrayD::from_shape_vec(IxDyn(&shape), indices)?,
            pairs,
        })
    }

    /// For every reference point, the query points within `radius` degrees of it.
    ///
    /// The query points are indexed by a throwaway fast tree and the two trees are walked together. Query
    /// indices are positions in the row-major flattening of `lon` and `lat`. See [`KdTree::ball`] for `eps`.
    /// Pair distances are great circle distances computed from the coordinates.
    pub fn query_radius<D: Dimension>(
        &self,
        lon: ArrayView<f64, D>,
        lat: ArrayView<f64, D>,
        radius: f64,
        eps: f64,
        return_pairs: bool,
    ) -> SphMatchResult<RadiusMatches> {
        let tree = self.tree()?;
        check_radius(radius, eps)?;
        let queries = cloud_from_views(&lon, &lat)?;
        let query_tree = KdTreeBuilder::new()
            .set_build_mode(BuildMode::Fast)
            .set_leaf_cutoff(tree.parameters().leaf_cutoff)
            .build_from_cloud(&queries)?;

        let neighbors = tree.query_ball(&query_tree, angle_to_chord(radius), eps);
        let matches = RadiusMatches {
            neighbors,
            pairs: None,
        };
        debug!(
            "Found {} pairs within {} degrees between {} reference and {} query points",
            matches.pair_count(),
            radius,
            self.len(),
            queries.len()
        );
        if !return_pairs {
            return Ok(matches);
        }

        let mut ref_indices: Vec<PointIndex> = Vec::with_capacity(matches.pair_count());
        let mut query_indices: Vec<PointIndex> = Vec::with_capacity(matches.pair_count());
        for (i, list) in matches.neighbors.iter().enumerate() {
            ref_indices.extend(std::iter::repeat(i).take(list.len()));
            query_indices.extend_from_slice(list);
        }
        let distances = self
            .cloud
            .paired_distances(&queries, &ref_indices, &query_indices)?;
        Ok(RadiusMatches {
            pairs: Some(MatchPairs {
                ref_indices,
                query_indices,
                distances,
            }),
            ..matches
        })
    }

    /// Collapses the reference points into exclusive clusters of points within `radius` degrees of each other.
    ///
    /// Points are grouped greedily, see [`resolve_clusters`]. Points with fewer than `min_match` neighbors
    /// (themselves included) never start a cluster, so with `min_match > 1` isolated points are dropped.
    pub fn query_self(
        &self,
        radius: f64,
        min_match: usize,
        eps: f64,
        return_pairs: bool,
    ) -> SphMatchResult<SelfMatches> {
        let tree = self.tree()?;
        check_radius(radius, eps)?;
        let neighbors = tree.query_ball(tree, angle_to_chord(radius), eps);
        let clusters = resolve_clusters(&neighbors, min_match)?;
        info!(
            "Resolved {} reference points into {} clusters at {} degrees",
            self.len(),
            clusters.len(),
            radius
        );
        let pairs = if return_pairs {
            Some(flatten_clusters(&clusters, &self.cloud)?)
        } else {
            None
        };
        Ok(SelfMatches { clusters, pairs })
    }
}
