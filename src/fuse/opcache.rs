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

//! The path resolution cache.  Computing a tag intersection for every
//! `getattr` is expensive, and the bridge stats every entry right after a
//! directory listing; `readdir` therefore pre-populates this map and the
//! per-entry lookups become O(1).  Entries never expire on their own --
//! every mutation that could change a path→backing mapping clears the cache
//! wholesale, and creations drop their own entry.

use log::{debug, info};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

const OPCACHE_TAG: &str = "opcache";

pub(crate) struct PathCache {
    entries: RwLock<HashMap<PathBuf, PathBuf>>,
}

impl PathCache {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn check_entry(&self, path: &Path) -> Option<PathBuf> {
        let guard = self.entries.read();
        match guard.get(path) {
            Some(backing) => {
                debug!(
                    target: OPCACHE_TAG,
                    "Cache hit! {:?} -> {:?}", path, backing
                );
                Some(backing.clone())
            }
            None => {
                debug!(target: OPCACHE_TAG, "Cache miss for {:?}", path);
                None
            }
        }
    }

    pub fn add_entry(&self, path: &Path, backing: &Path) {
        debug!(
            target: OPCACHE_TAG,
            "Caching {:?} -> {:?}", path, backing
        );
        let mut guard = self.entries.write();
        guard.insert(path.to_owned(), backing.to_owned());
    }

    pub fn remove_entry(&self, path: &Path) {
        let mut guard = self.entries.write();
        if guard.remove(path).is_some() {
            debug!(target: OPCACHE_TAG, "Removed {:?} from cache", path);
        }
    }

    /// Repopulates the cache with a just-computed directory listing.
    pub fn extend<I>(&self, entries: I)
    where
        I: IntoIterator<Item = (PathBuf, PathBuf)>,
    {
        let mut guard = self.entries.write();
        guard.extend(entries);
    }

    pub fn clear(&self) {
        info!(target: OPCACHE_TAG, "Clearing path cache");
        let mut guard = self.entries.write();
        guard.clear();
    }
}
