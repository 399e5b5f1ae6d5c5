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

//! The filesystem adapter: translates bridge operations on virtual paths
//! into tag index queries and backing-file I/O under the data directory.

use crate::common::err::DhtfsError;
use crate::common::settings::Settings;
use crate::common::{backing_file_name, constants, get_filename, parent_tags, path_tags};
use crate::fuse::err::FuseErrno;
use crate::fuse::{opcache, util, FileEntry, FileOps, Filesystem, FuseResult, Request};
use crate::fuse::{timeval, FileStat, Statvfs};
use crate::store::seq::SequenceStore;
use crate::tag::dirs::{DirHelper, DEFAULT_DIR_MODE};
use crate::tag::{Element, Location, Tagging};
use libc::{c_int, gid_t, mode_t, off_t, uid_t};
use log::{debug, info};
use nix::errno::Errno::EACCES;
use parking_lot::Mutex;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const OP_TAG: &str = "dhtfs_op";

mod getattr;
mod handle;
mod readdir;

pub use handle::TagFileHandle;

pub struct TagFilesystem {
    settings: Arc<Settings>,
    root: PathBuf,
    tagdir: Mutex<DirHelper>,
    seq: Mutex<SequenceStore>,
    path_cache: opcache::PathCache,
}

impl TagFilesystem {
    /// Builds the adapter for the data directory named by the settings.  The
    /// sequence store is brought up (and zeroed if unreadable) here, the way
    /// a mount begins.
    #[must_use]
    pub fn new(settings: Arc<Settings>) -> TagFilesystem {
        let root = settings.data_dir();
        info!(target: OP_TAG, "Mounting data directory {}", root.display());

        let tagdir = DirHelper::new(&root);
        let seq = SequenceStore::open(&root);

        TagFilesystem {
            settings,
            root,
            tagdir: Mutex::new(tagdir),
            seq: Mutex::new(seq),
            path_cache: opcache::PathCache::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// True iff both the tag dictionary and the sequence store are present
    /// under `path`.
    pub fn check_setup<P: AsRef<Path>>(path: P) -> bool {
        Tagging::check_setup(&path) && SequenceStore::check_setup(&path)
    }

    /// Prepares `path` for mounting: wipes it when `force` is set, then
    /// initializes the tag dictionary and the sequence counter.
    pub fn setup<P: AsRef<Path>>(path: P, force: bool) -> Result<(), DhtfsError> {
        let path = path.as_ref();

        if force {
            for entry in std::fs::read_dir(path)? {
                let entry = entry?;
                if entry.file_type()?.is_dir() {
                    std::fs::remove_dir_all(entry.path())?;
                } else {
                    std::fs::remove_file(entry.path())?;
                }
            }
        }

        let mut tagging = Tagging::new(path);
        tagging.init(force);

        let mut seq = SequenceStore::open(path);
        if force {
            seq.init();
        }
        Ok(())
    }

    /// Allocates a fresh backing file name from the sequence store.
    fn generate_new_file_name(&self) -> FuseResult<String> {
        let number = self.seq.lock().next().map_err(FuseErrno::from)?;
        let name = backing_file_name(number);
        debug!(target: OP_TAG, "New backing file name {}", name);
        Ok(name)
    }

    /// Resolves a virtual path to its backing path under the data root.  A
    /// path with no backing yet resolves to the missing sentinel, which
    /// signals "allocate on first write" to `open` and fails every other
    /// caller with ENOENT when the sentinel hits the real filesystem.
    fn get_backing_path(&self, path: &Path) -> FuseResult<PathBuf> {
        if let Some(hit) = self.path_cache.check_entry(path) {
            return Ok(hit);
        }

        let backing = if path == Path::new("/") {
            self.root.clone()
        } else {
            let filename = get_filename(path).map_err(FuseErrno::from)?.to_owned();
            let is_dir = self.tagdir.lock().is_directory(&filename);

            if is_dir {
                // a tag only names a directory here if the refinement
                // listing of the parent actually shows it
                let parent = path.parent().unwrap_or_else(|| Path::new("/"));
                let (dirs, _files) = self.directory_entries(parent)?;
                if dirs.iter().any(|d| d == &filename) {
                    self.root.join(crate::common::backing_dir_name(&filename))
                } else {
                    debug!(target: OP_TAG, "Directory {} not found here", filename);
                    self.root.join(constants::MISSING_FILE)
                }
            } else {
                let dirs = parent_tags(path);
                match self.tagdir.lock().resolve(&dirs, &filename) {
                    Some(location) => self.root.join(location.as_file_name()),
                    None => self.root.join(constants::MISSING_FILE),
                }
            }
        };

        debug!(
            target: OP_TAG,
            "Resolved {:?} to backing path {:?}", path, backing
        );
        self.path_cache.add_entry(path, &backing);
        Ok(backing)
    }

    fn open_impl(
        &self,
        _req: &Request,
        path: &Path,
        flags: c_int,
        mode: mode_t,
    ) -> FuseResult<Box<dyn FileOps>> {
        info!(target: OP_TAG, "open {:?} flags {:#o}", path, flags);

        let resolved = self.get_backing_path(path)?;
        let missing = resolved
            .file_name()
            .map_or(false, |name| name == constants::MISSING_FILE);

        let (backing, location) = if missing {
            // first write to this path: allocate a backing file and forget
            // the sentinel we just cached for it
            let new_name = self.generate_new_file_name()?;
            self.path_cache.remove_entry(path);
            (
                self.root.join(&new_name),
                Some(Location::Allocated(new_name)),
            )
        } else {
            (resolved, None)
        };

        let file = util::open_opts_from_flags(flags, mode)
            .open(&backing)
            .map_err(FuseErrno::from)?;

        // the index learns about the element only once the backing file
        // exists, so a failed open never leaves a dangling index entry
        if let Some(location) = location {
            let filename = get_filename(path).map_err(FuseErrno::from)?;
            let element = Element::new(location, filename);
            let dirs = parent_tags(path);
            debug!(
                target: OP_TAG,
                "Adding dirs {:?} to new file {}", dirs, element
            );
            self.tagdir
                .lock()
                .add_dirs_to_files(&[element], &dirs, DEFAULT_DIR_MODE)
                .map_err(FuseErrno::from)?;
        }

        Ok(Box::new(TagFileHandle::new(file)))
    }

    fn mkdir_impl(&self, _req: &Request, path: &Path, mode: mode_t) -> FuseResult<()> {
        info!(target: OP_TAG, "mkdir {:?}", path);

        let dirs = path_tags(path);
        // the placeholder keeps the deepest tag non-empty and marks every
        // component directory-like; its backing file is allocated lazily
        let placeholder = Element::missing(self.generate_new_file_name()?);
        self.tagdir
            .lock()
            .add_dirs_to_files(&[placeholder], &dirs, mode as u32)
            .map_err(FuseErrno::from)?;

        self.path_cache.remove_entry(path);
        Ok(())
    }

    fn unlink_impl(&self, _req: &Request, path: &Path) -> FuseResult<()> {
        info!(target: OP_TAG, "unlink {:?}", path);

        let dirs = parent_tags(path);
        let filename = get_filename(path).map_err(FuseErrno::from)?.to_owned();

        let mut tagdir = self.tagdir.lock();
        let location = match tagdir.resolve(&dirs, &filename) {
            Some(location) => location,
            None => return Err(DhtfsError::MissingFile(path.to_owned()).into()),
        };
        let element = Element::new(location.clone(), filename);

        if !tagdir.dirs_for_files(std::slice::from_ref(&element)).is_empty() {
            tagdir.delete_files(std::slice::from_ref(&element), &dirs);
        }

        // dropping the last reference kills the element and its backing file
        if tagdir.dirs_for_files(std::slice::from_ref(&element)).is_empty() {
            tagdir.delete_files(std::slice::from_ref(&element), &[]);
            if let Location::Allocated(name) = &location {
                debug!(
                    target: OP_TAG,
                    "Last reference gone, unlinking backing file {}", name
                );
                std::fs::remove_file(self.root.join(name)).map_err(FuseErrno::from)?;
            }
        }
        drop(tagdir);

        self.path_cache.clear();
        Ok(())
    }

    fn rename_impl(&self, _req: &Request, path: &Path, new_path: &Path) -> FuseResult<()> {
        info!(target: OP_TAG, "rename {:?} to {:?}", path, new_path);

        let filename = get_filename(path).map_err(FuseErrno::from)?.to_owned();
        let is_dir = self.tagdir.lock().is_directory(&filename);

        if is_dir {
            let old_dirs = path_tags(path);
            let new_dirs = path_tags(new_path);
            self.tagdir
                .lock()
                .rename_dir(&old_dirs, &new_dirs)
                .map_err(FuseErrno::from)?;
        } else {
            let dirs = parent_tags(path);
            let mut tagdir = self.tagdir.lock();
            let location = match tagdir.resolve(&dirs, &filename) {
                Some(location) => location,
                None => return Err(DhtfsError::MissingFile(path.to_owned()).into()),
            };

            let old = Element::new(location.clone(), filename);
            tagdir.delete_files(&[old], &dirs);

            let new_name = get_filename(new_path).map_err(FuseErrno::from)?;
            let renamed = Element::new(location, new_name);
            let new_dirs = parent_tags(new_path);
            tagdir
                .add_dirs_to_files(&[renamed], &new_dirs, DEFAULT_DIR_MODE)
                .map_err(FuseErrno::from)?;
        }

        self.path_cache.clear();
        Ok(())
    }

    fn rmdir_impl(&self, _req: &Request, path: &Path) -> FuseResult<()> {
        info!(target: OP_TAG, "rmdir {:?}", path);

        let dirname = get_filename(path).map_err(FuseErrno::from)?.to_owned();
        self.tagdir.lock().delete_dirs(&[dirname]);

        self.path_cache.clear();
        Ok(())
    }
}

impl Filesystem for TagFilesystem {
    fn getattr(&self, req: &Request, path: &Path) -> FuseResult<FileStat> {
        self.getattr_impl(req, path)
    }

    fn readdir(
        &self,
        req: &Request,
        path: &Path,
    ) -> FuseResult<Box<dyn Iterator<Item = FileEntry>>> {
        self.readdir_impl(req, path)
    }

    fn open(
        &self,
        req: &Request,
        path: &Path,
        flags: c_int,
        mode: mode_t,
    ) -> FuseResult<Box<dyn FileOps>> {
        self.open_impl(req, path, flags, mode)
    }

    fn mkdir(&self, req: &Request, path: &Path, mode: mode_t) -> FuseResult<()> {
        self.mkdir_impl(req, path, mode)
    }

    fn rmdir(&self, req: &Request, path: &Path) -> FuseResult<()> {
        self.rmdir_impl(req, path)
    }

    fn unlink(&self, req: &Request, path: &Path) -> FuseResult<()> {
        self.unlink_impl(req, path)
    }

    fn rename(&self, req: &Request, path: &Path, new_path: &Path) -> FuseResult<()> {
        self.rename_impl(req, path, new_path)
    }

    fn chmod(&self, _req: &Request, path: &Path, mode: mode_t) -> FuseResult<()> {
        let backing = self.get_backing_path(path)?;
        std::fs::set_permissions(&backing, std::fs::Permissions::from_mode(mode as u32))
            .map_err(FuseErrno::from)
    }

    fn chown(&self, _req: &Request, path: &Path, uid: uid_t, gid: gid_t) -> FuseResult<()> {
        let backing = self.get_backing_path(path)?;
        nix::unistd::chown(
            &backing,
            Some(nix::unistd::Uid::from_raw(uid)),
            Some(nix::unistd::Gid::from_raw(gid)),
        )
        .map_err(FuseErrno::from)
    }

    fn utime(
        &self,
        _req: &Request,
        path: &Path,
        atime: timeval,
        mtime: timeval,
    ) -> FuseResult<()> {
        let backing = self.get_backing_path(path)?;
        util::utimes(&backing, &atime, &mtime).map_err(FuseErrno::from)
    }

    fn truncate(&self, _req: &Request, path: &Path, offset: off_t) -> FuseResult<()> {
        let backing = self.get_backing_path(path)?;
        util::truncate(&backing, offset).map_err(FuseErrno::from)
    }

    fn access(&self, _req: &Request, path: &Path, mask: c_int) -> FuseResult<()> {
        let backing = self.get_backing_path(path)?;
        util::access(&backing, mask).map_err(|_e| EACCES.into())
    }

    fn statfs(&self, _req: &Request, _path: &Path) -> FuseResult<Statvfs> {
        nix::sys::statvfs::statvfs(&self.root).map_err(FuseErrno::from)
    }
}
