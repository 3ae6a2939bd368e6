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

//! # Projection
//! Moves between sky coordinates and the unit sphere in R^3. Angular separation on the sky is a
//! monotone function of the euclidean distance between the projected vectors (the chord), so any
//! euclidean index over the vectors answers angular questions once the radii are converted.
//!
//! All angles handed to or returned from this module are in degrees.

use crate::errors::{SkyCloudError, SkyCloudResult};

/// Largest possible chord between two unit vectors, the diameter.
pub const MAX_CHORD: f64 = 2.0;

/// A point on the unit sphere.
pub type UnitVector = [f64; 3];

/// Checks that a coordinate pair is on the sphere. Longitude wraps, so any finite value is fine.
#[inline]
pub fn validate(lon: f64, lat: f64) -> SkyCloudResult<()> {
    if lon.is_finite() && lat.is_finite() && (-90.0..=90.0).contains(&lat) {
        Ok(())
    } else {
        Err(SkyCloudError::domain(lon, lat))
    }
}

/// Projects `(lon, lat)` onto the unit sphere.
///
/// Fails with a `DomainError` if the latitude is outside of [-90, 90] or either value is not finite.
#[inline]
pub fn to_vector(lon: f64, lat: f64) -> SkyCloudResult<UnitVector> {
    validate(lon, lat)?;
    let (sin_lon, cos_lon) = lon.to_radians().sin_cos();
    let (sin_lat, cos_lat) = lat.to_radians().sin_cos();
    Ok([cos_lat * cos_lon, cos_lat * sin_lon, sin_lat])
}

/// The angle subtended by a chord. The chord is clamped into [0, 2] first so that round off from
/// the index never produces a NaN. An infinite chord is the sentinel for "no match" and stays infinite.
#[inline]
pub fn chord_to_angle(chord: f64) -> f64 {
    if chord == f64::INFINITY {
        return f64::INFINITY;
    }
    let half = (chord.max(0.0).min(MAX_CHORD)) / 2.0;
    (2.0 * half.asin()).to_degrees()
}

/// The chord subtended by an angle.
///
/// At or past 180 degrees every pair of points qualifies, so the chord is infinite. Clamping to the
/// diameter instead would lose antipodes whose computed chord rounds to just over 2.
#[inline]
pub fn angle_to_chord(angle: f64) -> f64 {
    if angle >= 180.0 {
        return f64::INFINITY;
    }
    2.0 * (angle.to_radians() / 2.0).sin()
}

/// The squared euclidean distance between two unit vectors.
#[inline]
pub fn chord_sq(x: &UnitVector, y: &UnitVector) -> f64 {
    let dx = x[0] - y[0];
    let dy = x[1] - y[1];
    let dz = x[2] - y[2];
    dx * dx + dy * dy + dz * dz
}

/// The euclidean distance between two unit vectors.
#[inline]
pub fn chord(x: &UnitVector, y: &UnitVector) -> f64 {
    chord_sq(x, y).sqrt()
}

/// Great circle distance between two sky coordinates.
///
/// Uses the Vincenty special case of the inverse problem on a sphere, which keeps full precision
/// for both tiny and antipodal separations. Identical inputs give exactly zero.
pub fn great_circle_distance(lon1: f64, lat1: f64, lon2: f64, lat2: f64) -> f64 {
    let (sin_dlon, cos_dlon) = (lon2 - lon1).to_radians().sin_cos();
    let (sin_lat1, cos_lat1) = lat1.to_radians().sin_cos();
    let (sin_lat2, cos_lat2) = lat2.to_radians().sin_cos();

    let a = cos_lat2 * sin_dlon;
    let b = cos_lat1 * sin_lat2 - sin_lat1 * cos_lat2 * cos_dlon;
    let numerator = (a * a + b * b).sqrt();
    let denominator = sin_lat1 * sin_lat2 + cos_lat1 * cos_lat2 * cos_dlon;
    numerator.atan2(denominator).to_degrees()
}
