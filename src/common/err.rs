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

use crate::store::StoreError;
use std::error::Error;
use std::io::ErrorKind;
use std::path::PathBuf;

pub type DhtfsResult<T> = Result<T, DhtfsError>;

pub enum DhtfsError {
    /// The persistent store underneath the index failed.
    Store(StoreError),
    /// A virtual path that cannot be interpreted as a tag query.
    InvalidPath(PathBuf),
    /// The resolver produced the missing sentinel for a path that was
    /// expected to exist.
    MissingFile(PathBuf),
    IOError(Box<dyn Error>),
    Other(Box<dyn Error>),
}

impl From<std::io::Error> for DhtfsError {
    fn from(e: std::io::Error) -> Self {
        match e.kind() {
            ErrorKind::NotFound => DhtfsError::IOError(Box::new(e)),
            ErrorKind::Other => DhtfsError::IOError(Box::new(e)),
            _kind => DhtfsError::Other(Box::new(e)),
        }
    }
}

impl From<nix::Error> for DhtfsError {
    fn from(e: nix::Error) -> Self {
        DhtfsError::Other(Box::new(e))
    }
}

impl From<StoreError> for DhtfsError {
    fn from(e: StoreError) -> Self {
        DhtfsError::Store(e)
    }
}

impl From<Box<dyn Error>> for DhtfsError {
    fn from(e: Box<dyn Error>) -> Self {
        DhtfsError::Other(e)
    }
}

impl Error for DhtfsError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            DhtfsError::Store(e) => Some(e),
            _ => None,
        }
    }
}

impl std::fmt::Display for DhtfsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        match self {
            DhtfsError::Store(se) => write!(f, "Store error: {}", se),
            DhtfsError::InvalidPath(path) => write!(f, "Invalid path {}", path.display()),
            DhtfsError::MissingFile(path) => {
                write!(f, "No backing file for {}", path.display())
            }
            DhtfsError::IOError(e) => write!(f, "IO error: {:?}", e),
            DhtfsError::Other(e) => write!(f, "Other unknown error: {:?}", e),
        }
    }
}

impl std::fmt::Debug for DhtfsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        std::fmt::Display::fmt(self, f)
    }
}
