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

//! The errors that can occur when coordinates are projected or a sky cloud is assembled.
use std::error::Error;
use std::fmt;

/// Helper type for a call that could go wrong.
pub type SkyCloudResult<T> = Result<T, SkyCloudError>;

/// Error type for the sky cloud
#[derive(Debug, Clone, PartialEq)]
pub enum SkyCloudError {
    /// A coordinate that does not describe a point on the sphere. Either the latitude is outside
    /// of [-90, 90] or one of the two values is not finite.
    DomainError {
        /// Offending longitude, in degrees
        lon: f64,
        /// Offending latitude, in degrees
        lat: f64,
    },
    /// The caller handed us something malformed, like longitude and latitude arrays of different lengths.
    InvalidArgument(String),
}

impl fmt::Display for SkyCloudError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SkyCloudError::DomainError { lon, lat } => write!(
                f,
                "({}, {}) is not a valid sky coordinate, latitude must be in [-90, 90]",
                lon, lat
            ),
            SkyCloudError::InvalidArgument(message) => write!(f, "invalid argument: {}", message),
        }
    }
}

#[allow(deprecated)]
impl Error for SkyCloudError {
    fn description(&self) -> &str {
        match self {
            SkyCloudError::DomainError { .. } => "coordinate outside of the valid domain",
            SkyCloudError::InvalidArgument(..) => "invalid argument",
        }
    }

    fn cause(&self) -> Option<&dyn Error> {
        None
    }
}

impl SkyCloudError {
    /// The coordinate pair isn't on the sphere
    pub fn domain(lon: f64, lat: f64) -> SkyCloudError {
        SkyCloudError::DomainError { lon, lat }
    }

    /// The longitude and latitude slices disagree on the number of points
    pub fn length_mismatch(lon_len: usize, lat_len: usize) -> SkyCloudError {
        SkyCloudError::InvalidArgument(format!(
            "longitude has {} entries but latitude has {}",
            lon_len, lat_len
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_message_names_the_coordinate() {
        let message = SkyCloudError::domain(10.0, 95.0).to_string();
        assert!(message.contains("95"));
        assert!(message.contains("[-90, 90]"));
    }

    #[test]
    fn length_mismatch_is_invalid_argument() {
        match SkyCloudError::length_mismatch(3, 4) {
            SkyCloudError::InvalidArgument(m) => assert!(m.contains('3') && m.contains('4')),
            e => panic!("expected an invalid argument, got {:?}", e),
        }
    }
}
