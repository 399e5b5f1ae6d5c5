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

//! The interface the kernel-side userspace-filesystem bridge drives.  The
//! bridge itself (the libfuse loop, mount plumbing, option parsing) lives in
//! the mount daemon; this module only defines the surface it calls into.

use self::err::FuseErrno;
use libc::{c_int, gid_t, mode_t, off_t, pid_t, uid_t};
use std::path::Path;

pub mod err;
pub mod fs;
pub(crate) mod opcache;
pub mod util;

pub use libc::timeval;
pub use nix::sys::stat::FileStat;
pub use nix::sys::statvfs::Statvfs;

pub type FuseResult<T> = Result<T, FuseErrno>;

/// The requesting process, as reported by the bridge.
#[derive(Debug, Clone, Copy, Default, Hash, Ord, PartialOrd, Eq, PartialEq)]
pub struct Request {
    pub uid: uid_t,
    pub gid: gid_t,
    pub pid: pid_t,
}

/// One directory listing entry.
#[derive(Debug, Clone, Hash, Ord, PartialOrd, Eq, PartialEq)]
pub struct FileEntry {
    pub name: String,
}

impl FileEntry {
    pub fn new<S: Into<String>>(name: S) -> Self {
        FileEntry { name: name.into() }
    }
}

/// Per-open-file operations.  A handle owns its backing file descriptor and
/// is dropped on release.
pub trait FileOps {
    fn read(&self, buf: &mut [u8], offset: off_t) -> FuseResult<usize>;
    fn write(&self, data: &[u8], offset: off_t) -> FuseResult<usize>;
    fn flush(&self) -> FuseResult<()>;
    fn fsync(&self, datasync: bool) -> FuseResult<()>;
    fn ftruncate(&self, offset: off_t) -> FuseResult<()>;
    fn fgetattr(&self) -> FuseResult<FileStat>;
    fn release(&mut self) -> FuseResult<()>;
}

pub trait Filesystem {
    // notice that none of the methods are &mut self.  the bridge dispatches
    // one operation at a time per mount, but we don't rely on that here; any
    // mutation goes through interior locking.

    fn getattr(&self, req: &Request, path: &Path) -> FuseResult<FileStat>;

    fn readdir(
        &self,
        req: &Request,
        path: &Path,
    ) -> FuseResult<Box<dyn Iterator<Item = FileEntry>>>;

    fn readdir_common(
        &self,
        _req: &Request,
        _path: &Path,
    ) -> FuseResult<Box<dyn Iterator<Item = FileEntry>>> {
        let common = vec![FileEntry::new("."), FileEntry::new("..")];
        Ok(Box::new(common.into_iter()))
    }

    fn open(
        &self,
        req: &Request,
        path: &Path,
        flags: c_int,
        mode: mode_t,
    ) -> FuseResult<Box<dyn FileOps>>;

    fn mkdir(&self, req: &Request, path: &Path, mode: mode_t) -> FuseResult<()>;
    fn rmdir(&self, req: &Request, path: &Path) -> FuseResult<()>;
    fn unlink(&self, req: &Request, path: &Path) -> FuseResult<()>;
    fn rename(&self, req: &Request, path: &Path, new_path: &Path) -> FuseResult<()>;

    fn chmod(&self, req: &Request, path: &Path, mode: mode_t) -> FuseResult<()>;
    fn chown(&self, req: &Request, path: &Path, uid: uid_t, gid: gid_t) -> FuseResult<()>;
    fn utime(&self, req: &Request, path: &Path, atime: timeval, mtime: timeval)
        -> FuseResult<()>;
    fn truncate(&self, req: &Request, path: &Path, offset: off_t) -> FuseResult<()>;
    fn access(&self, req: &Request, path: &Path, mask: c_int) -> FuseResult<()>;
    fn statfs(&self, req: &Request, path: &Path) -> FuseResult<Statvfs>;
}
