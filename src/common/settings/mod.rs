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

use super::constants;
use parking_lot::RwLock;
use std::path::{Path, PathBuf};

pub mod config;

pub use config::CoverPolicy;

/// Settings represents the merged view of our configuration: the built-in
/// defaults, the mount options handed to us by the entry point, and the
/// `DHTFS_*` environment.  The typed `Config` is frozen out of the merged
/// sources and handed out by value.
pub struct Settings {
    config: RwLock<Option<config::Config>>,
    merged_config: ::config::Config,
}

impl Settings {
    pub fn new() -> Self {
        Settings {
            config: Default::default(),
            merged_config: Default::default(),
        }
    }

    /// Settings for a known data directory, the common case for the mount
    /// daemon and the tests: `root=PATH` as a mount option.
    pub fn for_root<P: AsRef<Path>>(root: P) -> Self {
        let mut source = config::HashMapSource(Default::default());
        source.0.insert(
            "mount.root".to_string(),
            root.as_ref().to_string_lossy().to_string().into(),
        );

        let mut settings = Settings::new();
        settings.update_config(config::build(source));
        settings
    }

    pub fn update_config<T>(&mut self, merged_config: T)
    where
        T: ::config::Source + Send + Sync + 'static,
    {
        let mut guard = self.config.write();
        self.merged_config
            .merge(merged_config)
            .expect("Couldn't merge in new config");
        let frozen = self.merged_config.clone().try_into().unwrap();
        *guard = Some(frozen);
    }

    pub fn get_config(&self) -> config::Config {
        let guard = self.config.read();
        guard.as_ref().expect("Config not set!").clone()
    }

    /// The data directory underneath the mount.
    pub fn data_dir(&self) -> PathBuf {
        self.get_config().mount.root
    }

    pub fn db_file(&self) -> PathBuf {
        self.data_dir().join(constants::DB_FILE)
    }

    pub fn seq_file(&self) -> PathBuf {
        self.data_dir().join(constants::SEQ_FILE)
    }

    pub fn cover_policy(&self) -> CoverPolicy {
        self.get_config().listing.get_cover
    }
}

impl Default for Settings {
    fn default() -> Self {
        let source = config::HashMapSource(Default::default());
        let mut settings = Settings::new();
        settings.update_config(config::build(source));
        settings
    }
}
