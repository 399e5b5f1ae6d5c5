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

use dhtfs::common::settings::{config::HashMapSource, Settings};
use dhtfs::fuse::{FileOps, Filesystem, Request};
use dhtfs::TagFilesystem;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

pub type TestResult = Result<(), Box<dyn std::error::Error>>;

/// Sets up a data directory in a tempdir and an adapter mounted over it.
pub struct TestHelper {
    pub td: TempDir,
    pub fs: TagFilesystem,
    pub req: Request,
}

impl TestHelper {
    pub fn new() -> Self {
        Self::with_overrides(&[])
    }

    /// A helper whose settings carry extra config overrides, e.g.
    /// `("listing.get_cover", "always")`.
    pub fn with_overrides(overrides: &[(&str, &str)]) -> Self {
        let td = TempDir::new().expect("Couldn't create tempdir");
        TagFilesystem::setup(td.path(), false).expect("Couldn't set up data dir");

        let mut settings = Settings::for_root(td.path());
        if !overrides.is_empty() {
            let mut source = HashMapSource(Default::default());
            for (key, value) in overrides {
                source.0.insert((*key).to_string(), (*value).into());
            }
            settings.update_config(source);
        }

        let fs = TagFilesystem::new(Arc::new(settings));
        TestHelper {
            td,
            fs,
            req: Request::default(),
        }
    }

    pub fn data_path(&self, name: &str) -> PathBuf {
        self.td.path().join(name)
    }

    /// Sorted names yielded by readdir, without `.`/`..`.
    pub fn readdir_names(&self, path: &str) -> Vec<String> {
        let mut names: Vec<String> = self
            .fs
            .readdir(&self.req, Path::new(path))
            .expect("readdir failed")
            .map(|entry| entry.name)
            .collect();
        names.sort();
        names
    }

    pub fn open(
        &self,
        path: &str,
        flags: libc::c_int,
        mode: libc::mode_t,
    ) -> Result<Box<dyn FileOps>, dhtfs::fuse::err::FuseErrno> {
        self.fs.open(&self.req, Path::new(path), flags, mode)
    }

    /// Creates a file through the adapter and writes `contents` into it.
    pub fn create_file(&self, path: &str, contents: &[u8]) -> TestResult {
        let mut handle = self.open(path, libc::O_WRONLY | libc::O_CREAT, 0o644)?;
        handle.write(contents, 0)?;
        handle.release()?;
        Ok(())
    }

    /// Reads a whole file back through the adapter.
    pub fn read_file(&self, path: &str) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
        let handle = self.open(path, libc::O_RDONLY, 0)?;
        let mut buf = vec![0u8; 64 * 1024];
        let n = handle.read(&mut buf, 0)?;
        buf.truncate(n);
        Ok(buf)
    }

    /// The `f_`-prefixed backing files currently in the data directory,
    /// sorted by name.
    pub fn backing_files(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(self.td.path())
            .expect("Couldn't list data dir")
            .filter_map(|e| e.ok())
            .filter_map(|e| e.file_name().into_string().ok())
            .filter(|name| name.starts_with("f_"))
            .collect();
        names.sort();
        names
    }

    pub fn assert_getattr_exists(&self, path: &str) {
        assert!(
            self.fs.getattr(&self.req, Path::new(path)).is_ok(),
            "expected {} to stat",
            path
        );
    }

    pub fn assert_enoent(&self, path: &str) {
        match self.fs.getattr(&self.req, Path::new(path)) {
            Err(e) => assert_eq!(e.errno, nix::errno::Errno::ENOENT, "for {}", path),
            Ok(_stat) => panic!("expected ENOENT for {}", path),
        }
    }
}
