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

//! The errors that can occur when a matcher is built, queried or configured.
//! Coordinate problems are floated up from `SkyCloud`, as that's where points enter the library.

use crate::kdtree::NodeAddress;
use ndarray::ShapeError;
use skycloud::SkyCloudError;
use std::error::Error;
use std::fmt;
use std::io;
use yaml_rust::ScanError;

/// Helper type for a call that could go wrong.
pub type SphMatchResult<T> = Result<T, SphMatchError>;

/// Error type for the matcher.
#[derive(Debug)]
pub enum SphMatchError {
    /// Bad parameters, or longitude and latitude inputs that disagree in shape
    InvalidArgument(String),
    /// A latitude outside of [-90, 90], or a coordinate that isn't finite
    DomainError {
        /// Offending longitude
        lon: f64,
        /// Offending latitude
        lat: f64,
    },
    /// The matcher's index was released with `close`
    Closed,
    /// A split node never came back from the builder threads. The tree is unusable.
    MissingNode(NodeAddress),
    /// IO error when opening a configuration file
    IoError(io::Error),
    /// Parsing error when reading a configuration file
    ParsingError(ParsingError),
    /// The flat results didn't fit the requested output shape
    ShapeError(ShapeError),
}

impl fmt::Display for SphMatchError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            SphMatchError::InvalidArgument(ref message) => {
                write!(f, "invalid argument: {}", message)
            }
            SphMatchError::DomainError { lon, lat } => write!(
                f,
                "({}, {}) is not a valid sky coordinate, latitude must be in [-90, 90]",
                lon, lat
            ),
            SphMatchError::Closed => write!(f, "the matcher has been closed"),
            SphMatchError::MissingNode(address) => write!(
                f,
                "the node covering {:?} was never built",
                address
            ),
            SphMatchError::IoError(ref e) => write!(f, "{}", e),
            SphMatchError::ParsingError(ref e) => write!(f, "{}", e),
            SphMatchError::ShapeError(ref e) => write!(f, "{}", e),
        }
    }
}

#[allow(deprecated)]
impl Error for SphMatchError {
    fn description(&self) -> &str {
        match *self {
            SphMatchError::InvalidArgument(..) => "invalid argument",
            SphMatchError::DomainError { .. } => "coordinate outside of the valid domain",
            SphMatchError::Closed => "the matcher has been closed",
            SphMatchError::MissingNode(..) => "a node was never built",
            SphMatchError::IoError(ref e) => e.description(),
            SphMatchError::ParsingError(ref e) => e.description(),
            SphMatchError::ShapeError(ref e) => e.description(),
        }
    }

    fn cause(&self) -> Option<&dyn Error> {
        match *self {
            SphMatchError::IoError(ref e) => Some(e),
            SphMatchError::ParsingError(ref e) => Some(e),
            SphMatchError::ShapeError(ref e) => Some(e),
            _ => None,
        }
    }
}

impl SphMatchError {
    pub(crate) fn invalid<S: Into<String>>(message: S) -> SphMatchError {
        SphMatchError::InvalidArgument(message.into())
    }
}

impl From<SkyCloudError> for SphMatchError {
    fn from(err: SkyCloudError) -> Self {
        match err {
            SkyCloudError::DomainError { lon, lat } => SphMatchError::DomainError { lon, lat },
            SkyCloudError::InvalidArgument(message) => SphMatchError::InvalidArgument(message),
        }
    }
}

impl From<io::Error> for SphMatchError {
    fn from(err: io::Error) -> Self {
        SphMatchError::IoError(err)
    }
}

impl From<ScanError> for SphMatchError {
    fn from(err: ScanError) -> Self {
        SphMatchError::ParsingError(ParsingError::ScanError(err))
    }
}

impl From<ShapeError> for SphMatchError {
    fn from(err: ShapeError) -> Self {
        SphMatchError::ShapeError(err)
    }
}

/// A parsing error occored while reading a configuration file
#[derive(Debug)]
pub enum ParsingError {
    /// Yaml was messed up
    MalformedYamlError {
        /// The file that was messed up
        file_name: String,
        /// The value that was messed up
        field: String,
    },
    /// The file had no yaml document in it
    EmptyYamlError {
        /// The file
        file_name: String,
    },
    /// The yaml scanner choked
    ScanError(ScanError),
}

impl fmt::Display for ParsingError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            ParsingError::MalformedYamlError {
                ref file_name,
                ref field,
            } => write!(f, "there is a error reading {} in {}", field, file_name),
            ParsingError::EmptyYamlError { ref file_name } => {
                write!(f, "{} has no yaml document", file_name)
            }
            ParsingError::ScanError(ref e) => write!(f, "{}", e),
        }
    }
}

#[allow(deprecated)]
impl Error for ParsingError {
    fn description(&self) -> &str {
        match *self {
            ParsingError::MalformedYamlError { .. } => "there is a error reading a yaml entry",
            ParsingError::EmptyYamlError { .. } => "the yaml file is empty",
            ParsingError::ScanError(ref e) => e.description(),
        }
    }

    fn cause(&self) -> Option<&dyn Error> {
        match *self {
            ParsingError::ScanError(ref e) => Some(e),
            _ => None,
        }
    }
}
