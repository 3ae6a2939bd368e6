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

//! The reference point set, in both sky coordinates and projected unit vectors.

use rayon::prelude::*;
use std::sync::Arc;

use crate::errors::{SkyCloudError, SkyCloudResult};
use crate::projection::{self, UnitVector};
use crate::PointIndex;

/// Lists of pairs are only computed in parallel past this size.
const PAR_CUTOFF: usize = 4096;

/// An immutable, ordered set of points on the sky. The position of a point in the input slices is its
/// `PointIndex` everywhere in the library.
#[derive(Debug, Clone)]
pub struct SkyCloud {
    lon: Vec<f64>,
    lat: Vec<f64>,
    vectors: Arc<[UnitVector]>,
}

impl SkyCloud {
    /// Copies and projects the coordinates. Fails if the slices differ in length or a point is off the sphere.
    pub fn new(lon: &[f64], lat: &[f64]) -> SkyCloudResult<SkyCloud> {
        SkyCloud::from_iters(lon.len(), lon.iter().copied(), lat.len(), lat.iter().copied())
    }

    /// Same as `new`, for coordinates that are not laid out in slices (strided array views for example).
    pub fn from_iters<I, J>(lon_len: usize, lon: I, lat_len: usize, lat: J) -> SkyCloudResult<SkyCloud>
    where
        I: IntoIterator<Item = f64>,
        J: IntoIterator<Item = f64>,
    {
        if lon_len != lat_len {
            return Err(SkyCloudError::length_mismatch(lon_len, lat_len));
        }
        let lon: Vec<f64> = lon.into_iter().collect();
        let lat: Vec<f64> = lat.into_iter().collect();
        let vectors = project_all(&lon, &lat)?;
        log::trace!("Projected {} points onto the unit sphere", vectors.len());
        Ok(SkyCloud {
            lon,
            lat,
            vectors: vectors.into(),
        })
    }

    /// The number of points
    #[inline]
    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    /// If there are no points
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Longitudes, in degrees
    pub fn lon(&self) -> &[f64] {
        &self.lon
    }

    /// Latitudes, in degrees
    pub fn lat(&self) -> &[f64] {
        &self.lat
    }

    /// The projected points
    pub fn vectors(&self) -> &[UnitVector] {
        &self.vectors
    }

    /// The projected points, shared. Trees built over the cloud hold on to this instead of copying it.
    pub fn shared_vectors(&self) -> Arc<[UnitVector]> {
        Arc::clone(&self.vectors)
    }

    /// Sky coordinate of a point
    pub fn coordinate(&self, i: PointIndex) -> Option<(f64, f64)> {
        Some((*self.lon.get(i)?, *self.lat.get(i)?))
    }

    /// Great circle distance between two points of this cloud
    pub fn distance(&self, i: PointIndex, j: PointIndex) -> f64 {
        projection::great_circle_distance(self.lon[i], self.lat[i], self.lon[j], self.lat[j])
    }

    /// Great circle distances, in degrees, between `self[is[n]]` and `other[js[n]]` for every `n`.
    /// Parallelizes for long lists.
    pub fn paired_distances(
        &self,
        other: &SkyCloud,
        is: &[PointIndex],
        js: &[PointIndex],
    ) -> SkyCloudResult<Vec<f64>> {
        if is.len() != js.len() {
            return Err(SkyCloudError::InvalidArgument(format!(
                "paired distances need equal length index lists, got {} and {}",
                is.len(),
                js.len()
            )));
        }
        let out_of_range = is
            .iter()
            .find(|i| **i >= self.len())
            .map(|i| (*i, self.len()))
            .or_else(|| js.iter().find(|j| **j >= other.len()).map(|j| (*j, other.len())));
        if let Some((index, len)) = out_of_range {
            return Err(SkyCloudError::InvalidArgument(format!(
                "index {} is out of range for a cloud of {} points",
                index, len
            )));
        }

        let dist = |(i, j): (&PointIndex, &PointIndex)| {
            projection::great_circle_distance(self.lon[*i], self.lat[*i], other.lon[*j], other.lat[*j])
        };
        if is.len() > PAR_CUTOFF {
            Ok(is.par_iter().zip(js.par_iter()).map(dist).collect())
        } else {
            Ok(is.iter().zip(js.iter()).map(dist).collect())
        }
    }
}

fn project_all(lon: &[f64], lat: &[f64]) -> SkyCloudResult<Vec<UnitVector>> {
    if lon.len() > PAR_CUTOFF {
        lon.par_iter()
            .zip(lat.par_iter())
            .map(|(lon, lat)| projection::to_vector(*lon, *lat))
            .collect()
    } else {
        lon.iter()
            .zip(lat.iter())
            .map(|(lon, lat)| projection::to_vector(*lon, *lat))
            .collect()
    }
}
