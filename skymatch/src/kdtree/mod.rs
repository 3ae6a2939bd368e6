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

//! # The kd-tree
//! The spatial index under the matcher. It indexes points on the unit sphere by their euclidean (chord)
//! distance, which orders neighbors exactly the same way as the angle between them.
//!
//! ## Build modes
//! There are two ways to split a node, controlled by [`BuildMode`].
//!
//! `Balanced` splits at the median of the widest axis of the points in the node and shrinks every node's
//! bounding box to the points it holds. Depth is logarithmic and pruning is tight, this is the mode for a
//! tree that is queried over and over.
//!
//! `Fast` splits the node's cell at its midpoint, sliding the plane onto the nearest point if one side would
//! be empty. There's no median selection and no box shrinking, so the build is a few linear passes. This is
//! for throwaway trees that are queried once, like the query side of a radius match.

pub(crate) mod builders;
pub mod node;
pub mod query_tools;

mod tree;

pub use builders::KdTreeBuilder;
pub use tree::*;

use serde::{Deserialize, Serialize};

/// A node covers the range `[address.0, address.1)` of the tree's permuted index list. Children
/// always cover strictly smaller ranges than their parent, so the range identifies the node.
pub type NodeAddress = (usize, usize);

/// How the tree splits nodes. See the module docs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BuildMode {
    /// Median splits and tight bounding boxes, for long lived trees.
    Balanced,
    /// Sliding midpoint splits and cell bounding boxes, for one-shot trees.
    Fast,
}

/// Container for the parameters governing the construction of the kd-tree
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KdTreeParameters {
    /// Nodes with at most this many points are not split further. A smaller value gives faster
    /// leaf scans at the cost of more nodes.
    pub leaf_cutoff: usize,
    /// See [`BuildMode`].
    pub build_mode: BuildMode,
    /// Control parameter for the build logging. 0 is quiet, above 1 logs timing at info level.
    pub verbosity: u32,
}
