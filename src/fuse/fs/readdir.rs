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
use crate::common::settings::CoverPolicy;
use crate::common::{backing_dir_name, constants, path_tags};
use crate::fuse::{FileEntry, FuseResult, Request};
use crate::tag::Element;
use log::{debug, info};
use std::path::{Path, PathBuf};

impl TagFilesystem {
    pub(super) fn readdir_impl(
        &self,
        _req: &Request,
        path: &Path,
    ) -> FuseResult<Box<dyn Iterator<Item = FileEntry>>> {
        info!(target: OP_TAG, "Listing directory {:?}", path);

        let (dirs, files) = self.directory_entries(path)?;

        // the bridge will getattr every entry we yield, so flush the path
        // cache and seed it with this listing
        self.path_cache.clear();
        let file_entries = files
            .iter()
            .map(|f| (path.join(&f.name), self.root.join(f.location.as_file_name())));
        let dir_entries = dirs
            .iter()
            .map(|d| (path.join(d), self.root.join(backing_dir_name(d))));
        self.path_cache
            .extend(file_entries.chain(dir_entries).collect::<Vec<(PathBuf, PathBuf)>>());

        let entries: Vec<FileEntry> = files
            .into_iter()
            .map(|f| FileEntry::new(f.name))
            .chain(dirs.into_iter().map(FileEntry::new))
            .collect();
        debug!(target: OP_TAG, "Yielding {} entries", entries.len());

        Ok(Box::new(entries.into_iter()))
    }

    /// The files and refinement directories for a virtual path, after the
    /// fan-out policy has been applied.  Placeholder files (no backing yet)
    /// are filtered out of the returned files.
    pub(super) fn directory_entries(
        &self,
        path: &Path,
    ) -> FuseResult<(Vec<String>, Vec<Element>)> {
        let dirs_in_path = path_tags(path);
        let policy = self.settings.cover_policy();

        let (mut dirs, mut files) = if policy == CoverPolicy::Always {
            (vec![], vec![])
        } else {
            self.tagdir
                .lock()
                .directory_listing(&dirs_in_path, true, false)
        };

        // Too many entries make a directory useless: fall back to tags that
        // cover the result set.  A listing with almost no files gets the
        // same treatment so sparse queries still show a way deeper.
        if policy == CoverPolicy::Always
            || files.len() < 2
            || (!dirs.is_empty()
                && dirs.len() + files.len() > constants::MAX_DIR_ENTRIES
                && policy != CoverPolicy::Never)
        {
            let (cover_dirs, cover_files) = self
                .tagdir
                .lock()
                .directory_listing(&dirs_in_path, false, true);
            dirs = cover_dirs;
            files = cover_files;
            debug!(
                target: OP_TAG,
                "Cover listing: {} dirs, {} files",
                dirs.len(),
                files.len()
            );
        }

        files.retain(|f| !f.location.is_missing());

        Ok((dirs, files))
    }
}
