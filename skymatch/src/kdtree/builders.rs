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

use super::node::{BoundingBox, KdNode, NodeKind};
use super::*;
use crate::errors::{ParsingError, SphMatchError, SphMatchResult};
use crossbeam_channel::{unbounded, Sender};
use fxhash::FxBuildHasher;
use hashbrown::HashMap;
use log::{debug, info};
use rayon::Scope;
use skycloud::{PointIndex, SkyCloud, UnitVector};
use smallvec::SmallVec;
use std::cmp::Ordering;
use std::collections::VecDeque;
use std::fs::read_to_string;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use yaml_rust::{Yaml, YamlLoader};

/// Subtrees smaller than this are split on the thread that found them.
const SERIAL_CUTOFF: usize = 2048;

#[derive(Debug)]
struct BuilderNode {
    address: NodeAddress,
    bounds: BoundingBox,
    indexes: Vec<PointIndex>,
}

#[derive(Debug)]
enum BuiltKind {
    Leaf(SmallVec<[PointIndex; 16]>),
    Split {
        axis: usize,
        value: f64,
        left: NodeAddress,
        right: NodeAddress,
    },
}

/// A finished node as it comes off the builder threads, children still referenced by address.
#[derive(Debug)]
struct BuiltNode {
    address: NodeAddress,
    bounds: BoundingBox,
    kind: BuiltKind,
}

type Halves = (Vec<PointIndex>, Vec<PointIndex>, usize, f64);

fn send(node_sender: &Sender<BuiltNode>, node: BuiltNode) {
    // The receiver is only dropped after the build scope has joined.
    let _ = node_sender.send(node);
}

impl BuilderNode {
    fn root(points: &[UnitVector]) -> BuilderNode {
        BuilderNode {
            address: (0, points.len()),
            bounds: BoundingBox::around(points),
            indexes: (0..points.len()).collect(),
        }
    }

    fn split_parallel<'s>(
        self,
        scope: &Scope<'s>,
        points: &'s [UnitVector],
        parameters: &'s KdTreeParameters,
        node_sender: Sender<BuiltNode>,
    ) {
        scope.spawn(move |scope| {
            if self.indexes.len() < SERIAL_CUTOFF {
                self.split_serial(points, parameters, &node_sender);
            } else {
                let (node, children) = self.split(points, parameters);
                send(&node_sender, node);
                for child in children {
                    child.split_parallel(scope, points, parameters, node_sender.clone());
                }
            }
        });
    }

    fn split_serial(
        self,
        points: &[UnitVector],
        parameters: &KdTreeParameters,
        node_sender: &Sender<BuiltNode>,
    ) {
        let mut unfinished = vec![self];
        while let Some(builder_node) = unfinished.pop() {
            let (node, children) = builder_node.split(points, parameters);
            send(node_sender, node);
            unfinished.extend(children);
        }
    }

    fn split(
        self,
        points: &[UnitVector],
        parameters: &KdTreeParameters,
    ) -> (BuiltNode, Vec<BuilderNode>) {
        if self.indexes.len() <= parameters.leaf_cutoff {
            return (self.into_leaf(), vec![]);
        }
        let halves = match parameters.build_mode {
            BuildMode::Balanced => self.split_median(points),
            BuildMode::Fast => self.split_midpoint(points),
        };
        let (left_indexes, right_indexes, axis, value) = match halves {
            Some(halves) => halves,
            // Every point in the node is identical
            None => return (self.into_leaf(), vec![]),
        };

        let (start, end) = self.address;
        let middle = start + left_indexes.len();
        let (left_bounds, right_bounds) = match parameters.build_mode {
            BuildMode::Balanced => (
                BoundingBox::around(left_indexes.iter().map(|i| &points[*i])),
                BoundingBox::around(right_indexes.iter().map(|i| &points[*i])),
            ),
            BuildMode::Fast => self.bounds.cut(axis, value),
        };
        let left = BuilderNode {
            address: (start, middle),
            bounds: left_bounds,
            indexes: left_indexes,
        };
        let right = BuilderNode {
            address: (middle, end),
            bounds: right_bounds,
            indexes: right_indexes,
        };
        let node = BuiltNode {
            address: self.address,
            bounds: self.bounds,
            kind: BuiltKind::Split {
                axis,
                value,
                left: left.address,
                right: right.address,
            },
        };
        (node, vec![left, right])
    }

    /// Median of the widest axis. The bounds are tight, so a zero extent means all the points coincide.
    fn split_median(&self, points: &[UnitVector]) -> Option<Halves> {
        let (axis, extent) = self.bounds.widest_axis();
        if !(extent > 0.0) {
            return None;
        }
        let mut indexes = self.indexes.clone();
        let middle = indexes.len() / 2;
        indexes.select_nth_unstable_by(middle, |a, b| {
            points[*a][axis]
                .partial_cmp(&points[*b][axis])
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.cmp(b))
        });
        let value = points[indexes[middle]][axis];
        let right = indexes.split_off(middle);
        Some((indexes, right, axis, value))
    }

    /// Sliding midpoint of the cell. Axes the points don't spread along are skipped, widest cell axis first.
    fn split_midpoint(&self, points: &[UnitVector]) -> Option<Halves> {
        let mut axes = [0, 1, 2];
        let extents = [
            self.bounds.max[0] - self.bounds.min[0],
            self.bounds.max[1] - self.bounds.min[1],
            self.bounds.max[2] - self.bounds.min[2],
        ];
        axes.sort_by(|a, b| {
            extents[*b]
                .partial_cmp(&extents[*a])
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.cmp(b))
        });

        for axis in axes.iter().copied() {
            let (lo, hi) = self.indexes.iter().fold(
                (f64::INFINITY, f64::NEG_INFINITY),
                |(lo, hi), i| (lo.min(points[*i][axis]), hi.max(points[*i][axis])),
            );
            if !(hi > lo) {
                continue;
            }
            let midpoint = (self.bounds.min[axis] + self.bounds.max[axis]) / 2.0;
            let value = if midpoint <= lo {
                lo
            } else if midpoint > hi {
                hi
            } else {
                midpoint
            };
            // Sliding onto lo keeps the points sitting on lo below the plane, otherwise they go above it
            let (left, right): (Vec<PointIndex>, Vec<PointIndex>) = if value == lo {
                self.indexes.iter().partition(|i| points[**i][axis] <= value)
            } else {
                self.indexes.iter().partition(|i| points[**i][axis] < value)
            };
            return Some((left, right, axis, value));
        }
        None
    }

    fn into_leaf(self) -> BuiltNode {
        BuiltNode {
            address: self.address,
            bounds: self.bounds,
            kind: BuiltKind::Leaf(SmallVec::from_vec(self.indexes)),
        }
    }
}

/// Lays the finished nodes out breadth first from the root, so the children of a split sit next to each
/// other in the arena, and writes each leaf's points into its range of the index list.
fn flatten(
    mut built: HashMap<NodeAddress, BuiltNode, FxBuildHasher>,
    root_address: NodeAddress,
    point_count: usize,
) -> SphMatchResult<(Vec<KdNode>, Vec<PointIndex>, Vec<usize>)> {
    let mut nodes = Vec::with_capacity(built.len());
    let mut indices = vec![0; point_count];
    let mut leaves = Vec::new();

    let mut unvisited: VecDeque<NodeAddress> = VecDeque::new();
    unvisited.push_back(root_address);
    while let Some(address) = unvisited.pop_front() {
        let built_node = built
            .remove(&address)
            .ok_or(SphMatchError::MissingNode(address))?;
        let this = nodes.len();
        let kind = match built_node.kind {
            BuiltKind::Leaf(indexes) => {
                indices[address.0..address.1].copy_from_slice(&indexes[..]);
                leaves.push(this);
                NodeKind::Leaf
            }
            BuiltKind::Split {
                axis,
                value,
                left,
                right,
            } => {
                let left_index = this + unvisited.len() + 1;
                unvisited.push_back(left);
                unvisited.push_back(right);
                NodeKind::Split {
                    axis,
                    value,
                    left: left_index,
                    right: left_index + 1,
                }
            }
        };
        nodes.push(KdNode {
            address,
            bounds: built_node.bounds,
            kind,
        });
    }
    Ok((nodes, indices, leaves))
}

/// A construction object for a kd-tree. See [`KdTreeParameters`] for docs
#[derive(Debug, Clone)]
pub struct KdTreeBuilder {
    pub(crate) leaf_cutoff: usize,
    pub(crate) build_mode: BuildMode,
    pub(crate) verbosity: u32,
}

impl Default for KdTreeBuilder {
    fn default() -> KdTreeBuilder {
        KdTreeBuilder {
            leaf_cutoff: 16,
            build_mode: BuildMode::Balanced,
            verbosity: 0,
        }
    }
}

impl KdTreeBuilder {
    /// Creates a new builder with sensible defaults.
    pub fn new() -> KdTreeBuilder {
        KdTreeBuilder::default()
    }

    /// Creates a builder from a yaml file. Missing keys keep their defaults.
    ///
    /// ```yaml
    /// ---
    /// leaf_cutoff: 16
    /// build_mode: balanced
    /// verbosity: 0
    /// ```
    pub fn from_yaml<P: AsRef<Path>>(path: P) -> SphMatchResult<Self> {
        let config = read_to_string(&path)?;
        KdTreeBuilder::from_yaml_str(&config, &path.as_ref().to_string_lossy())
    }

    pub(crate) fn from_yaml_str(config: &str, file_name: &str) -> SphMatchResult<Self> {
        let params_files = YamlLoader::load_from_str(config)?;
        let params = params_files.get(0).ok_or_else(|| {
            SphMatchError::ParsingError(ParsingError::EmptyYamlError {
                file_name: file_name.to_string(),
            })
        })?;
        let malformed = |field: &str| {
            SphMatchError::ParsingError(ParsingError::MalformedYamlError {
                file_name: file_name.to_string(),
                field: field.to_string(),
            })
        };

        let mut builder = KdTreeBuilder::default();
        match &params["leaf_cutoff"] {
            Yaml::BadValue => {}
            value => match value.as_i64() {
                Some(cutoff) if cutoff >= 1 => builder.leaf_cutoff = cutoff as usize,
                _ => return Err(malformed("leaf_cutoff")),
            },
        }
        match &params["build_mode"] {
            Yaml::BadValue => {}
            value => match value.as_str() {
                Some("balanced") => builder.build_mode = BuildMode::Balanced,
                Some("fast") => builder.build_mode = BuildMode::Fast,
                _ => return Err(malformed("build_mode")),
            },
        }
        match &params["verbosity"] {
            Yaml::BadValue => {}
            value => match value.as_i64() {
                Some(verbosity) if verbosity >= 0 => builder.verbosity = verbosity as u32,
                _ => return Err(malformed("verbosity")),
            },
        }
        Ok(builder)
    }

    /// See [`KdTreeParameters`] for docs. Clamped to at least 1.
    pub fn set_leaf_cutoff(&mut self, x: usize) -> &mut Self {
        self.leaf_cutoff = x.max(1);
        self
    }
    /// See [`KdTreeParameters`] for docs
    pub fn set_build_mode(&mut self, x: BuildMode) -> &mut Self {
        self.build_mode = x;
        self
    }
    /// See [`KdTreeParameters`] for docs
    pub fn set_verbosity(&mut self, x: u32) -> &mut Self {
        self.verbosity = x;
        self
    }

    /// The parameters a tree built now would carry.
    pub fn parameters(&self) -> KdTreeParameters {
        KdTreeParameters {
            leaf_cutoff: self.leaf_cutoff,
            build_mode: self.build_mode,
            verbosity: self.verbosity,
        }
    }

    /// Builds a tree over the projected points of a sky cloud. The points are shared with the cloud, not copied.
    pub fn build_from_cloud(&self, cloud: &SkyCloud) -> SphMatchResult<KdTree> {
        self.build_shared(cloud.shared_vectors())
    }

    /// Builds a tree that owns the given points. Point `i` of the input is index `i` in every query result.
    pub fn build(&self, points: Vec<UnitVector>) -> SphMatchResult<KdTree> {
        self.build_shared(points.into())
    }

    /// Same as `build`, over points that may be shared with other owners.
    pub fn build_shared(&self, points: Arc<[UnitVector]>) -> SphMatchResult<KdTree> {
        let parameters = self.parameters();
        let now = Instant::now();
        if points.is_empty() {
            debug!("Built an empty kd-tree");
            return Ok(KdTree {
                parameters,
                points,
                indices: Vec::new(),
                nodes: Vec::new(),
                leaves: Vec::new(),
            });
        }

        let (node_sender, node_receiver) = unbounded();
        let root = BuilderNode::root(&points);
        let root_address = root.address;
        {
            let points = &points[..];
            let parameters = &parameters;
            rayon::scope(move |scope| root.split_parallel(scope, points, parameters, node_sender));
        }
        let built: HashMap<NodeAddress, BuiltNode, FxBuildHasher> = node_receiver
            .iter()
            .map(|node| (node.address, node))
            .collect();
        let node_count = built.len();
        let (nodes, indices, leaves) = flatten(built, root_address, points.len())?;

        if parameters.verbosity > 1 {
            info!(
                "Finished building a {:?} kd-tree over {} points, {} nodes, took {:?}",
                parameters.build_mode,
                points.len(),
                node_count,
                now.elapsed()
            );
        } else {
            debug!(
                "Built a {:?} kd-tree over {} points with {} nodes",
                parameters.build_mode,
                points.len(),
                node_count
            );
        }
        Ok(KdTree {
            parameters,
            points,
            indices,
            nodes,
            leaves,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::{Rng, SeedableRng};
    use skycloud::projection::to_vector;
    use std::io::Write;
    use tempdir::TempDir;

    pub(crate) fn random_vectors(n: usize, seed: u64) -> Vec<UnitVector> {
        let mut rng = SmallRng::seed_from_u64(seed);
        (0..n)
            .map(|_| {
                let lon = rng.gen_range(0.0..360.0);
                let lat = rng.gen_range(-1.0f64..1.0).asin().to_degrees();
                to_vector(lon, lat).unwrap()
            })
            .collect()
    }

    fn check_structure(tree: &KdTree) {
        let mut seen = tree.indices.clone();
        seen.sort_unstable();
        assert_eq!(seen, (0..tree.len()).collect::<Vec<_>>());

        for node in tree.nodes.iter() {
            let (start, end) = node.address();
            for i in &tree.indices[start..end] {
                assert_eq!(node.bounds().min_dist_sq(&tree.points[*i]), 0.0);
            }
            if let NodeKind::Split { left, right, .. } = node.kind() {
                assert_eq!(tree.nodes[left].address().0, start);
                assert_eq!(tree.nodes[left].address().1, tree.nodes[right].address().0);
                assert_eq!(tree.nodes[right].address().1, end);
                assert!(tree.nodes[left].coverage_count() > 0);
                assert!(tree.nodes[right].coverage_count() > 0);
            }
        }
        for leaf in tree.leaves.iter() {
            assert!(tree.nodes[*leaf].is_leaf());
        }
    }

    #[test]
    fn balanced_structure() {
        let points = vec![
            [1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [0.0, 0.0, 1.0],
            [-1.0, 0.0, 0.0],
        ];
        let tree = KdTreeBuilder::new()
            .set_leaf_cutoff(1)
            .build(points)
            .unwrap();
        assert_eq!(tree.node_count(), 7);
        assert_eq!(tree.leaves.len(), 4);
        assert_eq!(tree.nodes[0].address(), (0, 4));
        check_structure(&tree);
    }

    #[test]
    fn balanced_boxes_are_tight() {
        let tree = KdTreeBuilder::new()
            .set_leaf_cutoff(4)
            .build(random_vectors(200, 1))
            .unwrap();
        for node in tree.nodes.iter() {
            let (start, end) = node.address();
            let tight = BoundingBox::around(tree.indices[start..end].iter().map(|i| &tree.points[*i]));
            assert_eq!(&tight, node.bounds());
        }
        check_structure(&tree);
    }

    #[test]
    fn fast_structure() {
        let tree = KdTreeBuilder::new()
            .set_build_mode(BuildMode::Fast)
            .set_leaf_cutoff(3)
            .build(random_vectors(500, 2))
            .unwrap();
        assert_eq!(tree.build_mode(), BuildMode::Fast);
        check_structure(&tree);
    }

    #[test]
    fn duplicates_terminate() {
        let mut points = vec![[0.0, 0.0, 1.0]; 100];
        points.extend(random_vectors(20, 3));
        for mode in [BuildMode::Balanced, BuildMode::Fast].iter() {
            let tree = KdTreeBuilder::new()
                .set_build_mode(*mode)
                .set_leaf_cutoff(2)
                .build(points.clone())
                .unwrap();
            check_structure(&tree);
            assert!(tree.node_count() < 2 * points.len());
        }
    }

    #[test]
    fn parallel_build_is_deterministic() {
        let points = random_vectors(5 * SERIAL_CUTOFF, 4);
        for mode in [BuildMode::Balanced, BuildMode::Fast].iter() {
            let mut builder = KdTreeBuilder::new();
            builder.set_build_mode(*mode);
            let first = builder.build(points.clone()).unwrap();
            let second = builder.build(points.clone()).unwrap();
            assert_eq!(first.indices, second.indices);
            assert_eq!(first.node_count(), second.node_count());
            for (a, b) in first.nodes.iter().zip(second.nodes.iter()) {
                assert_eq!(a.address(), b.address());
                assert_eq!(a.kind(), b.kind());
            }
            check_structure(&first);
        }
    }

    #[test]
    fn empty_build() {
        let tree = KdTreeBuilder::new().build(Vec::new()).unwrap();
        assert!(tree.is_empty());
        assert_eq!(tree.node_count(), 0);
    }

    #[test]
    fn yaml_config() {
        let builder = KdTreeBuilder::from_yaml_str(
            "---\nleaf_cutoff: 4\nbuild_mode: fast\nverbosity: 2\n",
            "inline",
        )
        .unwrap();
        assert_eq!(builder.leaf_cutoff, 4);
        assert_eq!(builder.build_mode, BuildMode::Fast);
        assert_eq!(builder.verbosity, 2);

        let defaults = KdTreeBuilder::from_yaml_str("---\nunrelated: 1\n", "inline").unwrap();
        assert_eq!(defaults.parameters(), KdTreeBuilder::new().parameters());
    }

    #[test]
    fn yaml_config_rejects_bad_values() {
        for config in &[
            "---\nleaf_cutoff: 0\n",
            "---\nleaf_cutoff: many\n",
            "---\nbuild_mode: sideways\n",
            "---\nverbosity: -1\n",
        ] {
            match KdTreeBuilder::from_yaml_str(config, "inline") {
                Err(SphMatchError::ParsingError(ParsingError::MalformedYamlError { .. })) => {}
                other => panic!("{} should be malformed, got {:?}", config, other),
            }
        }
        assert!(matches!(
            KdTreeBuilder::from_yaml_str("", "inline"),
            Err(SphMatchError::ParsingError(ParsingError::EmptyYamlError { .. }))
        ));
    }

    #[test]
    fn yaml_config_from_file() {
        let dir = TempDir::new("skymatch_builder").unwrap();
        let path = dir.path().join("tree.yml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "---\nleaf_cutoff: 8\n").unwrap();
        let builder = KdTreeBuilder::from_yaml(&path).unwrap();
        assert_eq!(builder.leaf_cutoff, 8);
        assert!(matches!(
            KdTreeBuilder::from_yaml(dir.path().join("missing.yml")),
            Err(SphMatchError::IoError(_))
        ));
    }
}
