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

//! Reifies tags as directories.  Every directory-like tag owns a backing
//! subdirectory `t_<tag>` under the data directory, kept solely so the
//! underlying filesystem accounts for directory attributes; the hierarchy
//! itself lives in the tag index, which this helper wraps by composition.

use super::{Element, Location, Tagging};
use crate::common::{backing_dir_name, err::DhtfsResult};
use log::{debug, warn};
use std::collections::BTreeSet;
use std::fs::DirBuilder;
use std::os::unix::fs::DirBuilderExt;
use std::path::{Path, PathBuf};

const DIRS_TAG: &str = "tagdirs";

/// Mode for backing directories when the caller does not supply one.
pub const DEFAULT_DIR_MODE: u32 = 0o755;

pub struct DirHelper {
    data_dir: PathBuf,
    tagging: Tagging,
}

impl std::fmt::Debug for DirHelper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        write!(f, "Directory helper for {:?}", self.tagging)
    }
}

impl DirHelper {
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Self {
        DirHelper {
            data_dir: data_dir.as_ref().to_owned(),
            tagging: Tagging::new(data_dir),
        }
    }

    pub fn tagging(&mut self) -> &mut Tagging {
        &mut self.tagging
    }

    fn backing_path(&self, dir: &str) -> PathBuf {
        self.data_dir.join(backing_dir_name(dir))
    }

    /// Creates backing directories for the dirs not yet known as tags.
    fn create_backing_dirs(&mut self, dirs: &[String], mode: u32) -> DhtfsResult<()> {
        let known = self.all_dirs();
        for dir in dirs.iter().filter(|d| !known.contains(*d)) {
            let dirname = self.backing_path(dir);
            if !dirname.is_dir() {
                debug!(
                    target: DIRS_TAG,
                    "Creating backing dir {}",
                    dirname.display()
                );
                DirBuilder::new().mode(mode).create(&dirname)?;
            }
        }
        Ok(())
    }

    /// Removes the backing directories of dirs that are known tags.
    fn remove_backing_dirs(&mut self, dirs: &[String]) {
        let known = self.all_dirs();
        for dir in dirs.iter().filter(|d| known.contains(*d)) {
            let dirname = self.backing_path(dir);
            if dirname.is_dir() {
                debug!(
                    target: DIRS_TAG,
                    "Removing backing dir {}",
                    dirname.display()
                );
                if let Err(e) = std::fs::remove_dir(&dirname) {
                    warn!(
                        target: DIRS_TAG,
                        "Couldn't remove backing dir {}: {}",
                        dirname.display(),
                        e
                    );
                }
            }
        }
    }

    /// Associates the dirs, as tags, with the files, creating backing
    /// directories as needed.
    pub fn add_dirs_to_files(
        &mut self,
        files: &[Element],
        dirs: &[String],
        mode: u32,
    ) -> DhtfsResult<()> {
        self.create_backing_dirs(dirs, mode)?;
        self.tagging.add_tags(files, dirs);
        Ok(())
    }

    /// Brings dirs into existence with no files in them.
    pub fn create_dirs(&mut self, dirs: &[String], mode: u32) -> DhtfsResult<()> {
        self.create_backing_dirs(dirs, mode)?;
        self.tagging.add_tags(&[], dirs);
        Ok(())
    }

    /// Deletes dirs outright: their tags vanish from every element and their
    /// backing directories go away.
    pub fn delete_dirs(&mut self, dirs: &[String]) {
        self.remove_backing_dirs(dirs);
        self.tagging.remove_tags_from_elements(dirs, &[]);
    }

    /// Removes files from dirs; a file that loses its last dir is deleted
    /// from the index entirely.
    pub fn delete_files(&mut self, files: &[Element], dirs: &[String]) {
        self.tagging.remove_elements_from_tags(files, dirs);
    }

    /// Renames a directory.  Only the last component of each path carries
    /// meaning: every element tagged with it is re-tagged with the new last
    /// component, and the backing directory follows.  The other components
    /// are informational.
    pub fn rename_dir(&mut self, old_dirs: &[String], new_dirs: &[String]) -> DhtfsResult<()> {
        let (old, new) = match (old_dirs.last(), new_dirs.last()) {
            (Some(old), Some(new)) => (old.clone(), new.clone()),
            _other => return Ok(()),
        };
        debug!(target: DIRS_TAG, "Renaming dir {} to {}", old, new);

        self.tagging.rename_tag(&old, &new);

        if old != new {
            std::fs::rename(self.backing_path(&old), self.backing_path(&new))?;
        }
        Ok(())
    }

    /// Every tag in the index, i.e. every name the adapter may treat as a
    /// directory.
    pub fn all_dirs(&mut self) -> BTreeSet<String> {
        self.tagging.tags_for(&[])
    }

    pub fn dirs_for_files(&mut self, files: &[Element]) -> BTreeSet<String> {
        self.tagging.tags_for(files)
    }

    pub fn files_for_dirs(&mut self, dirs: &[String]) -> Vec<Element> {
        self.tagging.elements_for(dirs)
    }

    /// Files in the conjunction of `dirs` plus the tags that would refine
    /// it, under the caller's restrictive/cover policy.
    pub fn directory_listing(
        &mut self,
        dirs: &[String],
        restrictive: bool,
        cover: bool,
    ) -> (Vec<String>, Vec<Element>) {
        self.tagging.tags_and_elements_for(dirs, restrictive, cover)
    }

    pub fn is_directory(&mut self, name: &str) -> bool {
        self.tagging.tag_exists(name)
    }

    /// Resolves `(dirs, filename)` to the backing location of the (expected
    /// unique) matching element.
    pub fn resolve(&mut self, dirs: &[String], filename: &str) -> Option<Location> {
        self.tagging
            .elements_for(dirs)
            .into_iter()
            .find(|e| e.name == filename)
            .map(|e| e.location)
    }
}
