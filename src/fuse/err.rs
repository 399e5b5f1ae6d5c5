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

use crate::common::err::DhtfsError;
use crate::store::StoreError;
use nix::errno::Errno;
use nix::errno::Errno::{EIO, ENOENT, EPERM};
use std::borrow::Borrow;
use std::error::Error;
use std::io::ErrorKind;

/// An errno on its way back to the bridge, holding on to whatever error
/// produced it.
#[derive(Debug)]
pub struct FuseErrno {
    pub errno: Errno,
    pub original: Option<Box<dyn Error>>,
}

impl From<FuseErrno> for libc::c_int {
    fn from(e: FuseErrno) -> Self {
        // fuse errnos are negative, because that's what they said
        -(e.errno as libc::c_int)
    }
}

impl From<Errno> for FuseErrno {
    fn from(num: Errno) -> Self {
        Self {
            errno: num,
            original: None,
        }
    }
}

fn map_io_err(e: &std::io::Error) -> Errno {
    match e.kind() {
        ErrorKind::InvalidData => EIO,
        ErrorKind::PermissionDenied => EPERM,
        _kind => Errno::from_i32(e.raw_os_error().unwrap_or(EIO as i32)),
    }
}

impl From<std::io::Error> for FuseErrno {
    fn from(e: std::io::Error) -> Self {
        Self {
            errno: map_io_err(&e),
            original: Some(Box::new(e)),
        }
    }
}

impl From<nix::Error> for FuseErrno {
    fn from(e: nix::Error) -> Self {
        Self {
            errno: e.as_errno().unwrap_or(EIO),
            original: Some(Box::new(e)),
        }
    }
}

impl From<StoreError> for FuseErrno {
    fn from(e: StoreError) -> Self {
        Self {
            errno: EIO,
            original: Some(Box::new(e)),
        }
    }
}

impl From<DhtfsError> for FuseErrno {
    fn from(e: DhtfsError) -> Self {
        let errno = match &e {
            DhtfsError::MissingFile(_path) => ENOENT,
            DhtfsError::InvalidPath(_path) => ENOENT,
            _other => EIO,
        };
        Self {
            errno,
            original: Some(Box::new(e)),
        }
    }
}

impl Error for FuseErrno {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.original {
            Some(original) => Some(original.borrow()),
            None => None,
        }
    }
}

impl std::fmt::Display for FuseErrno {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.original {
            Some(original) => write!(f, "{} ({:?})", self.errno, *original),
            None => write!(f, "{}", self.errno),
        }
    }
}
