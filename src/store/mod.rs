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

//! A durable store for one serialized value, shared between processes.
//!
//! Each store owns two sibling files: the data file holding the bincoded
//! value, and a `.lock` file carrying advisory whole-file locks.  Many
//! processes may read concurrently under a shared lock; a writer takes an
//! exclusive lock across the whole `begin_write`/`commit_write` window and
//! excludes readers and writers alike.  Reads are served from an in-process
//! cache as long as the cached timestamp is not older than the data file's
//! mtime.

use crate::common::constants;
use log::{debug, trace};
use nix::fcntl::{flock, FlockArg};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::error::Error;
use std::fs::{File, OpenOptions};
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

pub mod seq;

const STORE_TAG: &str = "store";

pub type StoreResult<T> = Result<T, StoreError>;

pub enum StoreError {
    /// The data file does not exist; the store was never initialized here.
    NotSetUp(PathBuf),
    /// The data file could not be decoded, or the lock file could not be
    /// opened.
    Corrupt(PathBuf, Box<dyn Error + Send + Sync>),
    /// `commit_write` was called without a prior exclusive lock.
    NoLock,
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            StoreError::Corrupt(_path, e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        match self {
            StoreError::NotSetUp(path) => {
                write!(f, "Store at {} is not set up", path.display())
            }
            StoreError::Corrupt(path, e) => {
                write!(f, "Store at {} is corrupt: {:?}", path.display(), e)
            }
            StoreError::NoLock => write!(f, "Write attempted without an exclusive lock"),
        }
    }
}

impl std::fmt::Debug for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        std::fmt::Display::fmt(self, f)
    }
}

struct CacheEntry<T> {
    value: T,
    /// The data file's mtime at the moment the cached value was loaded or
    /// written.
    stamp: SystemTime,
}

pub struct Store<T> {
    store_file: PathBuf,
    lock_file: PathBuf,
    caching: bool,
    cache: Option<CacheEntry<T>>,
    write_lock: Option<File>,
}

impl<T> std::fmt::Debug for Store<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        write!(f, "Store at {}", self.store_file.display())
    }
}

impl<T> Store<T>
where
    T: Serialize + DeserializeOwned + Clone,
{
    pub fn new<P: AsRef<Path>>(dir: P, name: &str) -> Self {
        Self::with_caching(dir, name, true)
    }

    /// A store with the read cache disabled; every read deserializes from
    /// disk.
    pub fn with_caching<P: AsRef<Path>>(dir: P, name: &str, caching: bool) -> Self {
        let store_file = dir.as_ref().join(name);
        let lock_file = dir.as_ref().join(format!("{}{}", name, constants::LOCK_SUFFIX));
        Store {
            store_file,
            lock_file,
            caching,
            cache: None,
            write_lock: None,
        }
    }

    /// True iff both sibling files exist.
    pub fn check_setup<P: AsRef<Path>>(dir: P, name: &str) -> bool {
        let store_file = dir.as_ref().join(name);
        let lock_file = dir.as_ref().join(format!("{}{}", name, constants::LOCK_SUFFIX));
        store_file.is_file() && lock_file.is_file()
    }

    pub fn store_file(&self) -> &Path {
        &self.store_file
    }

    /// Instance form of [`Store::check_setup`].
    pub fn is_set_up(&self) -> bool {
        self.store_file.is_file() && self.lock_file.is_file()
    }

    /// Reads the stored value under a shared lock.  Served from the cache
    /// when the cached timestamp is at least as new as the data file's
    /// mtime.
    pub fn read(&mut self) -> StoreResult<T> {
        let lock = match self.lock_shared() {
            Ok(lock) => lock,
            // a store that was never initialized has no lock file either;
            // report that as not-set-up rather than corruption
            Err(e) => {
                return if self.store_file.is_file() {
                    Err(e)
                } else {
                    Err(StoreError::NotSetUp(self.store_file.clone()))
                };
            }
        };

        let res = self.load();
        Self::unlock(&lock);
        res
    }

    /// Takes the exclusive lock and returns the current value.  The lock is
    /// retained by this store until `commit_write` or `release_write`, even
    /// when the read fails -- initialization commits a skeleton over a
    /// store that cannot be read yet.
    pub fn begin_write(&mut self) -> StoreResult<T> {
        let lock = self.lock_exclusive()?;
        self.write_lock = Some(lock);
        self.load()
    }

    /// Serializes `value` over the whole data file and releases the
    /// exclusive lock.  Fails with `NoLock` unless `begin_write` was called
    /// first.
    pub fn commit_write(&mut self, value: &T) -> StoreResult<()> {
        let lock = match self.write_lock.take() {
            Some(lock) => lock,
            None => return Err(StoreError::NoLock),
        };

        let res = self.write_to_disk(value);
        // other store instances detect the change through the mtime; our own
        // cache is simply dropped
        self.cache = None;
        Self::unlock(&lock);
        res
    }

    /// Drops a held exclusive lock without writing anything.
    pub fn release_write(&mut self) {
        if let Some(lock) = self.write_lock.take() {
            Self::unlock(&lock);
        }
    }

    fn load(&mut self) -> StoreResult<T> {
        if self.caching && self.cache_fresh() {
            trace!(
                target: STORE_TAG,
                "Serving {} from cache",
                self.store_file.display()
            );
            if let Some(entry) = &self.cache {
                return Ok(entry.value.clone());
            }
        }

        let res = self.load_from_disk();
        match &res {
            Ok(value) => {
                if let Ok(stamp) = Self::mtime(&self.store_file) {
                    self.cache = Some(CacheEntry {
                        value: value.clone(),
                        stamp,
                    });
                }
            }
            Err(_e) => self.cache = None,
        }
        res
    }

    fn load_from_disk(&self) -> StoreResult<T> {
        if !self.store_file.is_file() {
            return Err(StoreError::NotSetUp(self.store_file.clone()));
        }

        debug!(
            target: STORE_TAG,
            "Reading {} from disk",
            self.store_file.display()
        );
        let bytes = std::fs::read(&self.store_file)
            .map_err(|e| StoreError::Corrupt(self.store_file.clone(), Box::new(e)))?;
        bincode::deserialize(&bytes).map_err(|e| StoreError::Corrupt(self.store_file.clone(), e))
    }

    fn write_to_disk(&self, value: &T) -> StoreResult<()> {
        debug!(
            target: STORE_TAG,
            "Writing {} to disk",
            self.store_file.display()
        );
        let bytes = bincode::serialize(value)
            .map_err(|e| StoreError::Corrupt(self.store_file.clone(), e))?;
        std::fs::write(&self.store_file, &bytes)
            .map_err(|e| StoreError::Corrupt(self.store_file.clone(), Box::new(e)))
    }

    fn cache_fresh(&self) -> bool {
        match (&self.cache, Self::mtime(&self.store_file)) {
            (Some(entry), Ok(mtime)) => entry.stamp >= mtime,
            _ => false,
        }
    }

    fn mtime(path: &Path) -> std::io::Result<SystemTime> {
        std::fs::metadata(path)?.modified()
    }

    fn lock_shared(&self) -> StoreResult<File> {
        let lock = OpenOptions::new()
            .read(true)
            .open(&self.lock_file)
            .map_err(|e| StoreError::Corrupt(self.lock_file.clone(), Box::new(e)))?;
        trace!(
            target: STORE_TAG,
            "Acquiring shared lock on {}",
            self.lock_file.display()
        );
        flock(lock.as_raw_fd(), FlockArg::LockShared)
            .map_err(|e| StoreError::Corrupt(self.lock_file.clone(), Box::new(e)))?;
        Ok(lock)
    }

    fn lock_exclusive(&self) -> StoreResult<File> {
        let lock = OpenOptions::new()
            .write(true)
            .create(true)
            .open(&self.lock_file)
            .map_err(|e| StoreError::Corrupt(self.lock_file.clone(), Box::new(e)))?;
        trace!(
            target: STORE_TAG,
            "Acquiring exclusive lock on {}",
            self.lock_file.display()
        );
        flock(lock.as_raw_fd(), FlockArg::LockExclusive)
            .map_err(|e| StoreError::Corrupt(self.lock_file.clone(), Box::new(e)))?;
        Ok(lock)
    }

}

impl<T> Store<T> {
    fn unlock(lock: &File) {
        // closing the fd would drop the flock anyway; the explicit unlock
        // keeps the window as small as possible
        let _ = flock(lock.as_raw_fd(), FlockArg::Unlock);
    }
}

impl<T> Drop for Store<T> {
    fn drop(&mut self) {
        if let Some(lock) = self.write_lock.take() {
            Self::unlock(&lock);
        }
    }
}
