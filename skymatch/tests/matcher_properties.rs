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

extern crate rand;
extern crate skymatch;

use ndarray::aview1;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use skymatch::projection::great_circle_distance;
use skymatch::*;
use std::collections::BTreeSet;

fn init_logging() {
    let _ = pretty_env_logger::try_init();
}

/// Uniform on the sphere
fn random_sky(n: usize, seed: u64) -> (Vec<f64>, Vec<f64>) {
    let mut rng = SmallRng::seed_from_u64(seed);
    let lon = (0..n).map(|_| rng.gen_range(0.0..360.0)).collect();
    let lat = (0..n)
        .map(|_| rng.gen_range(-1.0f64..1.0).asin().to_degrees())
        .collect();
    (lon, lat)
}

/// A small patch of sky, dense enough for radius queries to find plenty of pairs
fn random_patch(n: usize, seed: u64) -> (Vec<f64>, Vec<f64>) {
    let mut rng = SmallRng::seed_from_u64(seed);
    let lon = (0..n).map(|_| rng.gen_range(200.0..201.0)).collect();
    let lat = (0..n).map(|_| rng.gen_range(-30.0..-29.0)).collect();
    (lon, lat)
}

fn brute_force_sorted(lon: &[f64], lat: &[f64], qlon: f64, qlat: f64) -> Vec<(f64, usize)> {
    let mut dists: Vec<(f64, usize)> = lon
        .iter()
        .zip(lat.iter())
        .enumerate()
        .map(|(i, (lo, la))| (great_circle_distance(qlon, qlat, *lo, *la), i))
        .collect();
    dists.sort_by(|a, b| a.partial_cmp(b).unwrap());
    dists
}

#[test]
fn self_knn_is_exact() {
    init_logging();
    let (lon, lat) = random_sky(2000, 1);
    let matcher = Matcher::new(&lon, &lat).unwrap();
    let matches = matcher
        .query_knn(aview1(&lon), aview1(&lat), 1, None, false)
        .unwrap();
    for i in 0..lon.len() {
        assert_eq!(matches.indices[[i]], i);
        assert_eq!(matches.distances[[i]], 0.0);
    }
}

#[test]
fn knn_agrees_with_brute_force() {
    init_logging();
    let (lon, lat) = random_sky(3000, 2);
    let (qlon, qlat) = random_sky(100, 3);
    let matcher = Matcher::new(&lon, &lat).unwrap();
    for k in 1..4 {
        let matches = matcher
            .query_knn(aview1(&qlon), aview1(&qlat), k, None, false)
            .unwrap();
        for q in 0..qlon.len() {
            let expected = brute_force_sorted(&lon, &lat, qlon[q], qlat[q]);
            for rank in 0..k {
                let (distance, index) = if k == 1 {
                    (matches.distances[[q]], matches.indices[[q]])
                } else {
                    (matches.distances[[q, rank]], matches.indices[[q, rank]])
                };
                assert_eq!(index, expected[rank].1);
                assert!((distance - expected[rank].0).abs() < 1e-6);
            }
        }
    }
}

#[test]
fn bounded_knn_sentinels_agree_with_brute_force() {
    init_logging();
    let (lon, lat) = random_sky(1000, 4);
    let (qlon, qlat) = random_sky(200, 5);
    let matcher = Matcher::new(&lon, &lat).unwrap();
    let bound = 3.0;
    let matches = matcher
        .query_knn(aview1(&qlon), aview1(&qlat), 2, Some(bound), false)
        .unwrap();
    for q in 0..qlon.len() {
        let expected = brute_force_sorted(&lon, &lat, qlon[q], qlat[q]);
        for rank in 0..2 {
            if expected[rank].0 <= bound {
                assert_eq!(matches.indices[[q, rank]], expected[rank].1);
            } else {
                assert_eq!(matches.indices[[q, rank]], lon.len());
                assert_eq!(matches.distances[[q, rank]], f64::INFINITY);
            }
        }
    }
}

#[test]
fn radius_pairs_agree_with_brute_force() {
    init_logging();
    let (lon, lat) = random_patch(1500, 6);
    let (qlon, qlat) = random_patch(1200, 7);
    let radius = 0.02;
    let matcher = Matcher::new(&lon, &lat).unwrap();
    let matches = matcher
        .query_radius(aview1(&qlon), aview1(&qlat), radius, 0.0, true)
        .unwrap();
    let pairs = matches.pairs.unwrap();

    let mut expected = BTreeSet::new();
    for i in 0..lon.len() {
        for j in 0..qlon.len() {
            if great_circle_distance(lon[i], lat[i], qlon[j], qlat[j]) < radius {
                expected.insert((i, j));
            }
        }
    }
    let found: BTreeSet<(usize, usize)> = pairs
        .ref_indices
        .iter()
        .copied()
        .zip(pairs.query_indices.iter().copied())
        .collect();
    assert!(!expected.is_empty());
    assert_eq!(found, expected);
    assert_eq!(pairs.len(), found.len());

    for (i, j, d) in pairs.iter() {
        assert!((d - great_circle_distance(lon[i], lat[i], qlon[j], qlat[j])).abs() < 1e-12);
    }
    for list in matches.neighbors.iter() {
        assert!(list.windows(2).all(|w| w[0] < w[1]));
    }
}

#[test]
fn half_turn_bounds_keep_antipodes() {
    init_logging();
    let (lon, lat) = random_sky(300, 13);
    let alon: Vec<f64> = lon.iter().map(|l| (l + 180.0) % 360.0).collect();
    let alat: Vec<f64> = lat.iter().map(|l| -l).collect();
    let matcher = Matcher::new(&lon, &lat).unwrap();

    let matches = matcher
        .query_knn(aview1(&alon), aview1(&alat), lon.len(), Some(180.0), false)
        .unwrap();
    assert!(matches.indices.iter().all(|i| *i < lon.len()));
    assert!(matches.distances.iter().all(|d| d.is_finite()));

    // The furthest neighbor of an antipode is the point it was mirrored from
    let furthest = matches.indices.index_axis(ndarray::Axis(1), lon.len() - 1);
    for (q, i) in furthest.iter().enumerate() {
        assert_eq!(*i, q);
    }

    for radius in [180.0, 190.0].iter() {
        let matches = matcher
            .query_radius(aview1(&alon), aview1(&alat), *radius, 0.0, false)
            .unwrap();
        assert!(matches.neighbors.iter().all(|list| list.len() == alon.len()));
        let clusters = matcher.query_self(*radius, 1, 0.0, false).unwrap().clusters;
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].members.len(), lon.len());
    }
}

#[test]
fn loose_radius_pairs_stay_within_eps() {
    init_logging();
    let (lon, lat) = random_patch(1500, 14);
    let (qlon, qlat) = random_patch(1200, 15);
    let radius = 0.02;
    let eps = 0.5;
    let matcher = Matcher::new(&lon, &lat).unwrap();
    let pairs = matcher
        .query_radius(aview1(&qlon), aview1(&qlat), radius, eps, true)
        .unwrap()
        .pairs
        .unwrap();

    let found: BTreeSet<(usize, usize)> = pairs
        .ref_indices
        .iter()
        .copied()
        .zip(pairs.query_indices.iter().copied())
        .collect();
    assert_eq!(found.len(), pairs.len());
    for i in 0..lon.len() {
        for j in 0..qlon.len() {
            if great_circle_distance(lon[i], lat[i], qlon[j], qlat[j]) < radius {
                assert!(found.contains(&(i, j)));
            }
        }
    }
    assert!(pairs.distances.iter().all(|d| *d <= radius * (1.0 + eps) + 1e-9));
}

#[test]
fn loose_self_match_is_a_partition() {
    init_logging();
    let (lon, lat) = random_patch(2000, 16);
    let radius = 0.03;
    let eps = 0.5;
    let matcher = Matcher::new(&lon, &lat).unwrap();
    let matches = matcher.query_self(radius, 1, eps, true).unwrap();

    let mut seen = vec![0; lon.len()];
    for cluster in matches.clusters.iter() {
        for m in cluster.members.iter() {
            seen[*m] += 1;
        }
    }
    assert!(seen.iter().all(|s| *s == 1));
    let pairs = matches.pairs.unwrap();
    assert_eq!(pairs.len(), lon.len());
    assert!(pairs.distances.iter().all(|d| *d <= radius * (1.0 + eps) + 1e-9));
}

#[test]
fn self_match_is_a_partition() {
    init_logging();
    let (lon, lat) = random_patch(2000, 8);
    let matcher = Matcher::new(&lon, &lat).unwrap();
    let clusters = matcher.query_self(0.03, 1, 0.0, false).unwrap().clusters;

    let mut seen = vec![0; lon.len()];
    for cluster in clusters.iter() {
        assert!(cluster.members.contains(&cluster.representative));
        for m in cluster.members.iter() {
            seen[*m] += 1;
        }
    }
    assert!(seen.iter().all(|s| *s == 1));
    assert!(clusters
        .windows(2)
        .all(|w| w[0].neighbor_count >= w[1].neighbor_count));
    assert!(clusters.len() < lon.len());
}

#[test]
fn min_match_drops_isolated_points() {
    init_logging();
    let (lon, lat) = random_patch(800, 9);
    let radius = 0.02;
    let matcher = Matcher::new(&lon, &lat).unwrap();
    let clusters = matcher.query_self(radius, 2, 0.0, false).unwrap().clusters;

    let isolated: Vec<usize> = (0..lon.len())
        .filter(|i| {
            (0..lon.len())
                .all(|j| j == *i || great_circle_distance(lon[*i], lat[*i], lon[j], lat[j]) >= radius)
        })
        .collect();
    assert!(!isolated.is_empty());
    for cluster in clusters.iter() {
        assert!(cluster.neighbor_count >= 2);
        for i in isolated.iter() {
            assert!(!cluster.members.contains(i));
        }
    }
}

#[test]
fn four_point_scenario() {
    init_logging();
    let lon = [0.0, 0.0, 10.0, 10.0];
    let lat = [0.0, 0.0001, 0.0, 10.0];
    let matcher = Matcher::new(&lon, &lat).unwrap();

    let matches = matcher.query_self(0.001, 1, 0.0, true).unwrap();
    let members: Vec<Vec<usize>> = matches.clusters.iter().map(|c| c.members.clone()).collect();
    assert_eq!(members, vec![vec![0, 1], vec![2], vec![3]]);
    let pairs = matches.pairs.unwrap();
    assert_eq!(pairs.ref_indices, vec![0, 0, 2, 3]);
    assert_eq!(pairs.query_indices, vec![0, 1, 2, 3]);
    assert_eq!(pairs.distances[0], 0.0);
    assert!((pairs.distances[1] - 0.0001).abs() < 1e-9);

    let matches = matcher.query_self(0.001, 2, 0.0, false).unwrap();
    assert_eq!(matches.clusters.len(), 1);
    assert_eq!(matches.clusters[0].members, vec![0, 1]);
}

#[test]
fn rebuilds_are_deterministic() {
    init_logging();
    let (lon, lat) = random_patch(3000, 10);
    let first = Matcher::new(&lon, &lat).unwrap();
    let second = Matcher::new(&lon, &lat).unwrap();

    let a = first.query_self(0.02, 1, 0.0, false).unwrap().clusters;
    let b = second.query_self(0.02, 1, 0.0, false).unwrap().clusters;
    assert_eq!(a, b);

    let a = first.query_knn(aview1(&lon), aview1(&lat), 3, None, false).unwrap();
    let b = second.query_knn(aview1(&lon), aview1(&lat), 3, None, false).unwrap();
    assert_eq!(a.indices, b.indices);
}

#[test]
fn shared_between_threads() {
    init_logging();
    let (lon, lat) = random_sky(1000, 11);
    let matcher = Matcher::new(&lon, &lat).unwrap();
    let expected = matcher.query_self(1.0, 1, 0.0, false).unwrap().clusters;
    query_from_threads(&matcher, &expected);
}

fn query_from_threads(matcher: &Matcher, expected: &[Cluster]) {
    rayon::scope(|s| {
        for _ in 0..4 {
            s.spawn(|_| {
                let clusters = matcher.query_self(1.0, 1, 0.0, false).unwrap().clusters;
                assert_eq!(clusters, expected);
            });
        }
    });
}

#[test]
fn closed_matcher_refuses_queries() {
    init_logging();
    let (lon, lat) = random_sky(50, 12);
    let mut matcher = Matcher::new(&lon, &lat).unwrap();
    matcher.close();
    assert!(matches!(
        matcher.query_self(1.0, 1, 0.0, false),
        Err(SphMatchError::Closed)
    ));
}

#[test]
fn pairs_serialize() {
    init_logging();
    let matcher = Matcher::new(&[0.0, 0.0, 10.0], &[0.0, 0.0001, 0.0]).unwrap();
    let matches = matcher.query_self(0.001, 1, 0.0, true).unwrap();
    let pairs = matches.pairs.unwrap();
    let json = serde_json::to_string(&pairs).unwrap();
    let back: MatchPairs = serde_json::from_str(&json).unwrap();
    assert_eq!(back.ref_indices, pairs.ref_indices);
    assert_eq!(back.query_indices, pairs.query_indices);

    let json = serde_json::to_string(&matches.clusters).unwrap();
    let back: Vec<Cluster> = serde_json::from_str(&json).unwrap();
    assert_eq!(back, matches.clusters);
}
