/*
 * dhtfs
 * Copyright (C) 2026 The dhtfs developers
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Affero General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU Affero General Public License for more details.
 *
 * You should have received a copy of the GNU Affero General Public License
 * along with this program.  If not, see <http://www.gnu.org/licenses/>.
 */
use crate::common::constants;
use ::config::{ConfigError, Source, Value};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct HashMapSource(pub HashMap<String, config::Value>);

impl config::Source for HashMapSource {
    fn clone_into_box(&self) -> Box<dyn Source + Send + Sync> {
        Box::new((*self).clone())
    }

    fn collect(&self) -> Result<HashMap<String, Value>, ConfigError> {
        Ok(self.0.clone())
    }
}

/// Mount settings.  `root` is the data directory whose contents back the
/// virtual hierarchy; it is resolved when the settings are built, never
/// captured earlier.
#[derive(Serialize, Deserialize, Clone)]
pub struct Mount {
    pub root: PathBuf,
}

/// Controls whether directory listings fall back to a covering set of tags.
/// `DontCare` leaves the decision to the listing size policy.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum CoverPolicy {
    Always,
    Never,
    DontCare,
}

#[derive(Serialize, Deserialize, Clone)]
pub struct Listing {
    pub get_cover: CoverPolicy,
}

#[derive(Serialize, Deserialize, Clone)]
pub struct Config {
    pub mount: Mount,
    pub listing: Listing,
}

/// Builds a merged config from our default toml, the supplied source, and
/// environment variables.
pub fn build<T>(source: T) -> ::config::Config
where
    T: config::Source + Send + Sync + 'static,
{
    let mut merged_config = config::Config::new();

    merged_config
        .merge(config::File::from_str(
            constants::DEFAULT_CONFIG_TOML,
            config::FileFormat::Toml,
        ))
        .expect("Unable to merge default config")
        .merge(source)
        .expect("Unable to merge app config")
        .merge(config::Environment::with_prefix(constants::ENV_PREFIX))
        .expect("Unable to merge settings from environment variables");

    merged_config
}
