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

//! A monotonic counter persisted through its own [`Store`], used to allocate
//! unique backing file names.

use super::{Store, StoreResult};
use crate::common::constants;
use log::{debug, info};
use std::path::Path;

const SEQ_TAG: &str = "seq";

pub struct SequenceStore {
    store: Store<u64>,
}

impl SequenceStore {
    /// Opens the counter under `dir`, initializing it to zero when it cannot
    /// be read yet.
    pub fn open<P: AsRef<Path>>(dir: P) -> Self {
        let mut seq = SequenceStore {
            store: Store::new(dir, constants::SEQ_FILE),
        };
        if seq.store.read().is_err() {
            info!(target: SEQ_TAG, "Initializing sequence store to 0");
            seq.init();
        }
        seq
    }

    pub fn check_setup<P: AsRef<Path>>(dir: P) -> bool {
        Store::<u64>::check_setup(dir, constants::SEQ_FILE)
    }

    /// Resets the counter to zero regardless of its current state.
    pub fn init(&mut self) {
        let _ = self.store.begin_write();
        let _ = self.store.commit_write(&0);
    }

    /// Increments the counter under the exclusive lock and returns the new
    /// value.  Values are never reused.
    pub fn next(&mut self) -> StoreResult<u64> {
        let current = match self.store.begin_write() {
            Ok(n) => n,
            Err(e) => {
                self.store.release_write();
                return Err(e);
            }
        };
        let next = current + 1;
        self.store.commit_write(&next)?;
        debug!(target: SEQ_TAG, "Allocated sequence number {}", next);
        Ok(next)
    }
}
