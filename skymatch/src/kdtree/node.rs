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

//! # The Node
//! Nodes live in a flat arena owned by the tree. Every node covers a contiguous range of the tree's
//! permuted index list, so a whole subtree can be handed out as a slice without walking it.

use skycloud::UnitVector;

use super::NodeAddress;

/// Axis aligned box in R^3. Used to bound the distance from a query to anything a node covers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub(crate) min: [f64; 3],
    pub(crate) max: [f64; 3],
}

impl BoundingBox {
    /// The box that contains nothing. Growing it by a point gives that point's box.
    pub fn empty() -> BoundingBox {
        BoundingBox {
            min: [f64::INFINITY; 3],
            max: [f64::NEG_INFINITY; 3],
        }
    }

    /// The smallest box around the given points.
    pub fn around<'a, I: IntoIterator<Item = &'a UnitVector>>(points: I) -> BoundingBox {
        let mut bounds = BoundingBox::empty();
        for p in points {
            bounds.grow(p);
        }
        bounds
    }

    #[inline]
    fn grow(&mut self, p: &UnitVector) {
        for d in 0..3 {
            self.min[d] = self.min[d].min(p[d]);
            self.max[d] = self.max[d].max(p[d]);
        }
    }

    /// Lower corner
    pub fn min(&self) -> &[f64; 3] {
        &self.min
    }

    /// Upper corner
    pub fn max(&self) -> &[f64; 3] {
        &self.max
    }

    /// The axis the box is longest along, and that length. Ties go to the lower axis.
    pub fn widest_axis(&self) -> (usize, f64) {
        let mut axis = 0;
        let mut extent = self.max[0] - self.min[0];
        for d in 1..3 {
            let e = self.max[d] - self.min[d];
            if e > extent {
                axis = d;
                extent = e;
            }
        }
        (axis, extent)
    }

    /// Splits the box with a plane orthogonal to `axis`.
    pub(crate) fn cut(&self, axis: usize, value: f64) -> (BoundingBox, BoundingBox) {
        let mut lower = *self;
        let mut upper = *self;
        lower.max[axis] = value;
        upper.min[axis] = value;
        (lower, upper)
    }

    /// Squared distance from the point to the closest point of the box. Zero inside.
    #[inline]
    pub fn min_dist_sq(&self, p: &UnitVector) -> f64 {
        let mut acc = 0.0;
        for d in 0..3 {
            let gap = (self.min[d] - p[d]).max(p[d] - self.max[d]).max(0.0);
            acc += gap * gap;
        }
        acc
    }

    /// Squared distance from the point to the furthest corner of the box.
    #[inline]
    pub fn max_dist_sq(&self, p: &UnitVector) -> f64 {
        let mut acc = 0.0;
        for d in 0..3 {
            let reach = (p[d] - self.min[d]).abs().max((self.max[d] - p[d]).abs());
            acc += reach * reach;
        }
        acc
    }

    /// Squared distance between the closest points of two boxes.
    #[inline]
    pub fn min_dist_sq_to_box(&self, other: &BoundingBox) -> f64 {
        let mut acc = 0.0;
        for d in 0..3 {
            let gap = (self.min[d] - other.max[d])
                .max(other.min[d] - self.max[d])
                .max(0.0);
            acc += gap * gap;
        }
        acc
    }

    /// Squared distance between the furthest points of two boxes.
    #[inline]
    pub fn max_dist_sq_to_box(&self, other: &BoundingBox) -> f64 {
        let mut acc = 0.0;
        for d in 0..3 {
            let reach = (self.max[d] - other.min[d])
                .abs()
                .max((other.max[d] - self.min[d]).abs());
            acc += reach * reach;
        }
        acc
    }
}

/// What a node does with the points it covers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NodeKind {
    /// The points are checked one by one.
    Leaf,
    /// The points are split between two children by the plane `x[axis] = value`.
    Split {
        /// Coordinate the split is along
        axis: usize,
        /// Location of the split plane
        value: f64,
        /// Arena index of the lower child
        left: usize,
        /// Arena index of the upper child
        right: usize,
    },
}

/// A node of the kd-tree.
#[derive(Debug, Clone)]
pub struct KdNode {
    pub(crate) address: NodeAddress,
    pub(crate) bounds: BoundingBox,
    pub(crate) kind: NodeKind,
}

impl KdNode {
    /// The range of the tree's index list this node covers.
    pub fn address(&self) -> NodeAddress {
        self.address
    }

    /// Bounding box of the node. Tight around the covered points for balanced trees, the cell of the
    /// split for fast ones.
    pub fn bounds(&self) -> &BoundingBox {
        &self.bounds
    }

    /// How this node is split
    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// If the node has no children
    pub fn is_leaf(&self) -> bool {
        self.kind == NodeKind::Leaf
    }

    /// Number of points in this node and everything under it
    pub fn coverage_count(&self) -> usize {
        self.address.1 - self.address.0
    }
}
