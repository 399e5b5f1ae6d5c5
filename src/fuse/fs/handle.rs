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

use crate::fuse::err::FuseErrno;
use crate::fuse::{FileOps, FileStat, FuseResult};
use libc::off_t;
use log::trace;
use std::fs::File;
use std::os::unix::fs::FileExt;
use std::os::unix::io::AsRawFd;

fn check_libc(err: libc::c_int) -> FuseResult<()> {
    if err == -1 {
        Err(std::io::Error::last_os_error().into())
    } else {
        Ok(())
    }
}

const HANDLE_TAG: &str = "handle";

/// One open file: owns the backing descriptor, which closes on release.
pub struct TagFileHandle {
    file: File,
}

impl TagFileHandle {
    pub(super) fn new(file: File) -> Self {
        TagFileHandle { file }
    }
}

impl FileOps for TagFileHandle {
    fn read(&self, buf: &mut [u8], offset: off_t) -> FuseResult<usize> {
        trace!(
            target: HANDLE_TAG,
            "read {} bytes at {}",
            buf.len(),
            offset
        );
        self.file.read_at(buf, offset as u64).map_err(FuseErrno::from)
    }

    fn write(&self, data: &[u8], offset: off_t) -> FuseResult<usize> {
        trace!(
            target: HANDLE_TAG,
            "write {} bytes at {}",
            data.len(),
            offset
        );
        self.file
            .write_at(data, offset as u64)
            .map_err(FuseErrno::from)
    }

    fn flush(&self) -> FuseResult<()> {
        // cf. xmp_flush() in fusexmp_fh.c: flushing means closing a dup of
        // the descriptor
        let fd = unsafe { libc::dup(self.file.as_raw_fd()) };
        check_libc(fd)?;
        check_libc(unsafe { libc::close(fd) })
    }

    fn fsync(&self, datasync: bool) -> FuseResult<()> {
        if datasync {
            check_libc(unsafe { libc::fdatasync(self.file.as_raw_fd()) })
        } else {
            check_libc(unsafe { libc::fsync(self.file.as_raw_fd()) })
        }
    }

    fn ftruncate(&self, offset: off_t) -> FuseResult<()> {
        self.file.set_len(offset as u64).map_err(FuseErrno::from)
    }

    fn fgetattr(&self) -> FuseResult<FileStat> {
        nix::sys::stat::fstat(self.file.as_raw_fd()).map_err(FuseErrno::from)
    }

    fn release(&mut self) -> FuseResult<()> {
        trace!(target: HANDLE_TAG, "release fd {}", self.file.as_raw_fd());
        Ok(())
    }
}
