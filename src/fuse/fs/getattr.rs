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

use super::TagFilesystem;
use super::OP_TAG;
use crate::fuse::err::FuseErrno;
use crate::fuse::{FileStat, FuseResult, Request};
use log::debug;
use std::path::Path;

impl TagFilesystem {
    /// Stats the backing path.  A path that resolves to the missing sentinel
    /// fails here with ENOENT, since the sentinel never exists on disk.
    pub(super) fn getattr_impl(&self, _req: &Request, path: &Path) -> FuseResult<FileStat> {
        debug!(target: OP_TAG, "getattr {:?}", path);
        let backing = self.get_backing_path(path)?;
        nix::sys::stat::lstat(&backing).map_err(FuseErrno::from)
    }
}
