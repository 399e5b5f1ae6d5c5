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

use super::{TestHelper, TestResult};
use dhtfs::common::backing_file_name;
use dhtfs::fuse::{FileOps, Filesystem};
use dhtfs::TagFilesystem;
use std::path::Path;

#[test]
fn test_setup_and_check_setup() -> TestResult {
    let td = tempfile::TempDir::new()?;
    assert!(!TagFilesystem::check_setup(td.path()));

    TagFilesystem::setup(td.path(), false)?;
    assert!(TagFilesystem::check_setup(td.path()));
    assert!(td.path().join(".dhtfs.db").is_file());
    assert!(td.path().join(".dhtfs.db.lock").is_file());
    assert!(td.path().join(".dhtfs.seq").is_file());
    assert!(td.path().join(".dhtfs.seq.lock").is_file());
    Ok(())
}

#[test]
fn test_forced_setup_wipes() -> TestResult {
    let td = tempfile::TempDir::new()?;
    TagFilesystem::setup(td.path(), false)?;
    std::fs::write(td.path().join("stray"), b"junk")?;
    std::fs::create_dir(td.path().join("t_stale"))?;

    TagFilesystem::setup(td.path(), true)?;
    assert!(!td.path().join("stray").exists());
    assert!(!td.path().join("t_stale").exists());
    assert!(TagFilesystem::check_setup(td.path()));
    Ok(())
}

// an empty mount lists nothing; the first mkdir makes one tag appear and its
// backing directory materializes in the data dir
#[test]
fn test_mkdir_appears_in_root() -> TestResult {
    let th = TestHelper::new();

    assert!(th.readdir_names("/").is_empty());

    th.fs.mkdir(&th.req, Path::new("/work"), 0o755)?;
    assert_eq!(th.readdir_names("/"), vec!["work"]);
    assert!(th.data_path("t_work").is_dir());
    th.assert_getattr_exists("/work");
    Ok(())
}

// creating a file under a multi-tag path allocates a backing file and tags it
// with every path component; any permutation of the tags finds it again
#[test]
fn test_create_on_first_write() -> TestResult {
    let th = TestHelper::new();
    th.fs.mkdir(&th.req, Path::new("/work"), 0o755)?;

    th.create_file("/work/text/notes", b"remember the milk")?;

    // the mkdir placeholder took sequence number 1, the file takes 2
    assert_eq!(th.backing_files(), vec![backing_file_name(2)]);
    assert_eq!(
        std::fs::read(th.data_path(&backing_file_name(2)))?,
        b"remember the milk"
    );

    let work = th.readdir_names("/work");
    assert!(work.contains(&"text".to_string()), "got {:?}", work);
    assert!(work.contains(&"notes".to_string()), "got {:?}", work);

    assert_eq!(th.readdir_names("/text"), vec!["notes", "work"]);
    assert_eq!(th.readdir_names("/work/text"), vec!["notes"]);

    // reading it back through any tag order works
    assert_eq!(th.read_file("/work/text/notes")?, b"remember the milk");
    assert_eq!(th.read_file("/text/work/notes")?, b"remember the milk");
    Ok(())
}

#[test]
fn test_getattr_on_missing_path() -> TestResult {
    let th = TestHelper::new();
    th.fs.mkdir(&th.req, Path::new("/work"), 0o755)?;

    th.assert_enoent("/work/absent");
    th.assert_enoent("/nosuchtag");
    Ok(())
}

#[test]
fn test_open_without_create_fails() -> TestResult {
    let th = TestHelper::new();
    th.fs.mkdir(&th.req, Path::new("/work"), 0o755)?;

    let res = th.open("/work/absent", libc::O_RDONLY, 0);
    assert_eq!(
        res.err().map(|e| e.errno),
        Some(nix::errno::Errno::ENOENT)
    );
    Ok(())
}

#[test]
fn test_write_and_truncate() -> TestResult {
    let th = TestHelper::new();
    th.create_file("/work/log", b"0123456789")?;

    th.fs.truncate(&th.req, Path::new("/work/log"), 4)?;
    assert_eq!(th.read_file("/work/log")?, b"0123");

    // per-handle truncate as well
    let handle = th.open("/work/log", libc::O_RDWR, 0)?;
    handle.ftruncate(2)?;
    assert_eq!(th.read_file("/work/log")?, b"01");
    Ok(())
}

#[test]
fn test_readdir_seeds_path_cache() -> TestResult {
    let th = TestHelper::new();
    th.create_file("/work/notes", b"x")?;

    // every entry a listing yields must stat without further index work
    for name in th.readdir_names("/work") {
        th.assert_getattr_exists(&format!("/work/{}", name));
    }
    Ok(())
}

#[test]
fn test_statfs_and_access() -> TestResult {
    let th = TestHelper::new();
    th.create_file("/work/notes", b"x")?;

    let stat = th.fs.statfs(&th.req, Path::new("/"))?;
    assert!(stat.blocks() > 0);

    th.fs
        .access(&th.req, Path::new("/work/notes"), libc::R_OK)?;
    Ok(())
}

#[test]
fn test_fsync_and_flush() -> TestResult {
    let th = TestHelper::new();
    let mut handle = th.open("/work/notes", libc::O_WRONLY | libc::O_CREAT, 0o644)?;
    handle.write(b"durable", 0)?;
    handle.fsync(true)?;
    handle.fsync(false)?;
    handle.flush()?;
    handle.release()?;

    assert_eq!(th.read_file("/work/notes")?, b"durable");
    Ok(())
}

#[test]
fn test_chmod_and_utime_pass_through() -> TestResult {
    let th = TestHelper::new();
    th.create_file("/work/notes", b"x")?;

    th.fs.chmod(&th.req, Path::new("/work/notes"), 0o600)?;
    let stat = th.fs.getattr(&th.req, Path::new("/work/notes"))?;
    assert_eq!(stat.st_mode & 0o777, 0o600);

    let stamp = |secs| libc::timeval {
        tv_sec: secs,
        tv_usec: 0,
    };
    th.fs.utime(
        &th.req,
        Path::new("/work/notes"),
        stamp(1_000_000),
        stamp(2_000_000),
    )?;
    let stat = th.fs.getattr(&th.req, Path::new("/work/notes"))?;
    assert_eq!(stat.st_mtime, 2_000_000);
    Ok(())
}

#[test]
fn test_fgetattr_matches_written_size() -> TestResult {
    let th = TestHelper::new();
    let handle = th.open("/work/notes", libc::O_RDWR | libc::O_CREAT, 0o644)?;
    handle.write(b"12345", 0)?;

    let stat = handle.fgetattr()?;
    assert_eq!(stat.st_size, 5);
    Ok(())
}
