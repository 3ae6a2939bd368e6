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

#![allow(dead_code)]
#![warn(missing_docs)]
#![doc(test(attr(allow(unused_variables), deny(warnings))))]

//! # Skymatch
//! Proximity matching of points on the sky. A [`Matcher`] is built once over a reference catalog of
//! longitude/latitude pairs, in degrees, and then answers three kinds of queries:
//!
//! * `query_knn`: the k nearest reference points to each query point, optionally within a distance bound.
//! * `query_radius`: for each reference point, every query point within a fixed radius.
//! * `query_self`: the reference catalog against itself, collapsed into exclusive clusters.
//!
//! ## How it works
//! Coordinates are projected onto the unit sphere and indexed with a kd-tree. The straight line distance
//! between two unit vectors, the chord, grows with the angle between them, so nearest neighbors and radius
//! searches by chord give exactly the same answers as they would by angle. Radii go in as angles and are
//! turned into chords, distances come out as chords and are turned back into angles. See
//! [`projection`] for the conversions.
//!
//! The reference tree is built balanced, with median splits. Radius queries build a second, cheaper tree over
//! the query points and walk both at once.
//!
//! ```
//! use ndarray::aview1;
//! use skymatch::Matcher;
//!
//! let matcher = Matcher::new(&[0.0, 0.0, 10.0, 10.0], &[0.0, 0.0001, 0.0, 10.0]).unwrap();
//! let matches = matcher.query_knn(aview1(&[10.0]), aview1(&[9.9]), 1, None, false).unwrap();
//! assert_eq!(matches.indices[[0]], 3);
//!
//! let clusters = matcher.query_self(0.001, 1, 0.0, false).unwrap().clusters;
//! assert_eq!(clusters[0].members, vec![0, 1]);
//! ```

#[cfg(test)]
#[macro_use]
extern crate assert_approx_eq;

pub mod errors;
pub use errors::{SphMatchError, SphMatchResult};

pub mod kdtree;
pub use kdtree::{BuildMode, KdTree, KdTreeBuilder, KdTreeParameters, NodeAddress};

mod matcher;
pub use matcher::Matcher;

pub mod matches;
pub use matches::{KnnMatches, MatchPairs, RadiusMatches, SelfMatches};

pub mod self_match;
pub use self_match::Cluster;

pub mod utils;

pub use skycloud::{projection, PointIndex, SkyCloud};
