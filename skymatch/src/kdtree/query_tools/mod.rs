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

//! Tools and data structures for assisting kd-tree queries.

use skycloud::PointIndex;

pub(crate) mod query_items;

pub(crate) mod knn_query_heap;
pub use knn_query_heap::KnnQueryHeap;

/// If you have a algorithm that walks the tree node by node,
/// implement this to receive the children of a split node
pub trait NodeQueryHeap {
    /// Shoves nodes in, with the smallest squared distance each one could hold a point at.
    fn push_nodes(&mut self, nodes: &[usize], min_dists_sq: &[f64]);
}

/// If you have a algorithm that does local brute force KNN on the points of a leaf,
/// implement this to receive them
pub trait PointQueryHeap {
    /// Shove a bunch of single points onto the heap
    fn push_points(&mut self, indexes: &[PointIndex], dists_sq: &[f64]);
}
