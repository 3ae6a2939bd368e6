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

//! Utility functions for configuration files

use log::info;
use std::fs::read_to_string;
use std::path::Path;
use yaml_rust::YamlLoader;

use crate::errors::{SphMatchError, SphMatchResult};
use crate::kdtree::KdTreeBuilder;
use crate::Matcher;

/// Builds a matcher over in-memory coordinates, with the tree parameters read from a yaml file.
///
/// ```yaml
/// ---
/// leaf_cutoff: 16
/// verbosity: 2
/// count: NUMBER_OF_REFERENCE_POINTS
/// ```
///
/// `count` is optional. If it's there it has to agree with the number of coordinates passed in.
/// A `build_mode` is accepted but the reference tree is always balanced.
pub fn matcher_from_yaml<P: AsRef<Path>>(
    path: P,
    lon: &[f64],
    lat: &[f64],
) -> SphMatchResult<Matcher> {
    let config = read_to_string(&path)?;
    let file_name = path.as_ref().to_string_lossy();
    let builder = KdTreeBuilder::from_yaml_str(&config, &file_name)?;

    let params_files = YamlLoader::load_from_str(&config)?;
    if let Some(count) = params_files.get(0).and_then(|p| p["count"].as_i64()) {
        if count < 0 || count as usize != lon.len() {
            return Err(SphMatchError::invalid(format!(
                "{} expects {} points, but {} were given",
                file_name,
                count,
                lon.len()
            )));
        }
    }

    info!(
        "Loaded {}, building a matcher with leaf_cutoff {}",
        file_name, builder.leaf_cutoff
    );
    Matcher::with_builder(lon, lat, &builder)
}
