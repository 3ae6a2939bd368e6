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
//! # Sky Cloud
//! Holds catalog positions for the matcher and moves them between sky coordinates and the unit sphere.

//#![deny(warnings)]
#![warn(missing_docs)]

#[cfg(test)]
#[macro_use]
extern crate assert_approx_eq;

pub mod errors;
pub use errors::{SkyCloudError, SkyCloudResult};

pub mod projection;
pub use projection::UnitVector;

mod sky_cloud;
#[doc(inline)]
pub use sky_cloud::*;

/// To make things more obvious, we type the point index.
/// This is the position of the point in the slices used to build the cloud.
pub type PointIndex = usize;
