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

use libc::{
    c_int, mode_t, off_t, timeval, O_ACCMODE, O_APPEND, O_CREAT, O_EXCL, O_RDWR, O_TRUNC,
    O_WRONLY,
};
use log::info;
use std::ffi::CString;
use std::fs::OpenOptions;
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;

const UTIL_TAG: &str = "util";

/// Maps POSIX open flags onto `OpenOptions`.  O_RDONLY is zero, so the
/// access mode has to be compared rather than bit-tested; O_APPEND is a
/// bit-test (`&`, not `|`).
pub fn open_opts_from_flags(flags: c_int, mode: mode_t) -> OpenOptions {
    let mut opts = OpenOptions::new();

    let access = flags & O_ACCMODE;
    if access == O_RDWR {
        opts.read(true).write(true);
    } else if access == O_WRONLY {
        opts.read(false).write(true);
    } else {
        opts.read(true).write(false);
    }

    if flags & O_APPEND != 0 {
        opts.append(true);
    }
    if flags & O_TRUNC != 0 {
        opts.truncate(true);
    }
    if flags & O_CREAT != 0 {
        opts.create(true).mode(mode as u32);
    }
    if flags & O_EXCL != 0 {
        opts.create_new(true).mode(mode as u32);
    }

    opts
}

fn c_path(path: &Path) -> std::io::Result<CString> {
    CString::new(path.to_string_lossy().to_string())
        .map_err(|_e| std::io::ErrorKind::InvalidInput.into())
}

pub fn truncate(path: &Path, offset: off_t) -> std::io::Result<()> {
    info!(target: UTIL_TAG, "truncate {:?} to {}", path, offset);
    let c_path = c_path(path)?;
    let err = unsafe { libc::truncate(c_path.as_ptr(), offset) };
    if err == -1 {
        Err(std::io::Error::last_os_error())
    } else {
        Ok(())
    }
}

pub fn access(path: &Path, mask: c_int) -> std::io::Result<()> {
    let c_path = c_path(path)?;
    let err = unsafe { libc::access(c_path.as_ptr(), mask) };
    if err == -1 {
        Err(std::io::Error::last_os_error())
    } else {
        Ok(())
    }
}

pub fn utimes(path: &Path, atime: &timeval, mtime: &timeval) -> std::io::Result<()> {
    info!(
        target: UTIL_TAG,
        "utimes on {:?}: atime {}s, mtime {}s", path, atime.tv_sec, mtime.tv_sec
    );
    let c_path = c_path(path)?;
    let times = [*atime, *mtime];
    let err = unsafe { libc::utimes(c_path.as_ptr(), times.as_ptr()) };
    if err == -1 {
        Err(std::io::Error::last_os_error())
    } else {
        Ok(())
    }
}
