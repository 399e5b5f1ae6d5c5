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

//! Cross-instance store behavior.  The advisory locks are per open file
//! description, so independent [`Store`] handles in one process contend
//! exactly like separate processes sharing the data directory would.

use super::TestResult;
use dhtfs::Store;
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

const STORE_NAME: &str = "contended";

fn init(dir: &Path, value: u64) -> TestResult {
    let mut store: Store<u64> = Store::new(dir, STORE_NAME);
    let _ = store.begin_write();
    store.commit_write(&value)?;
    Ok(())
}

// two writers: the second begin_write blocks until the first commits, and
// then observes the committed value
#[test]
fn test_writers_are_serialized() -> TestResult {
    let td = tempfile::TempDir::new()?;
    init(td.path(), 0)?;

    let dir = td.path().to_owned();
    let writer = thread::spawn(move || {
        let mut store: Store<u64> = Store::new(&dir, STORE_NAME);
        let value = store.begin_write().expect("first writer couldn't lock");
        assert_eq!(value, 0);
        thread::sleep(Duration::from_millis(500));
        store.commit_write(&1).expect("first writer couldn't commit");
    });

    // give the thread time to take the exclusive lock
    thread::sleep(Duration::from_millis(100));

    let start = Instant::now();
    let mut store: Store<u64> = Store::new(td.path(), STORE_NAME);
    let value = store.begin_write()?;
    let waited = start.elapsed();

    // we must have blocked behind the holder and seen its commit
    assert_eq!(value, 1);
    assert!(waited >= Duration::from_millis(300), "waited {:?}", waited);

    store.commit_write(&2)?;
    writer.join().expect("writer thread panicked");

    let mut reader: Store<u64> = Store::new(td.path(), STORE_NAME);
    assert_eq!(reader.read()?, 2);
    Ok(())
}

// a reader arriving during a write blocks until the commit and then sees the
// new value
#[test]
fn test_reader_blocks_until_commit() -> TestResult {
    let td = tempfile::TempDir::new()?;
    init(td.path(), 10)?;

    let dir = td.path().to_owned();
    let writer = thread::spawn(move || {
        let mut store: Store<u64> = Store::new(&dir, STORE_NAME);
        let _ = store.begin_write().expect("couldn't lock");
        thread::sleep(Duration::from_millis(500));
        store.commit_write(&11).expect("couldn't commit");
    });

    thread::sleep(Duration::from_millis(100));

    let mut reader: Store<u64> = Store::new(td.path(), STORE_NAME);
    let value = reader.read()?;
    assert_eq!(value, 11);

    writer.join().expect("writer thread panicked");
    Ok(())
}

// shared readers do not exclude each other
#[test]
fn test_concurrent_readers() -> TestResult {
    let td = tempfile::TempDir::new()?;
    init(td.path(), 7)?;

    let mut handles = vec![];
    for _ in 0..4 {
        let dir = td.path().to_owned();
        handles.push(thread::spawn(move || {
            let mut store: Store<u64> = Store::new(&dir, STORE_NAME);
            for _ in 0..25 {
                assert_eq!(store.read().expect("read failed"), 7);
            }
        }));
    }
    for handle in handles {
        handle.join().expect("reader thread panicked");
    }
    Ok(())
}

// sequence allocations from competing instances never hand out the same
// number
#[test]
fn test_sequence_contention() -> TestResult {
    use dhtfs::SequenceStore;
    use std::collections::BTreeSet;
    use std::sync::{Arc, Mutex};

    let td = tempfile::TempDir::new()?;
    // bring the counter up before the race starts
    SequenceStore::open(td.path());
    let seen = Arc::new(Mutex::new(BTreeSet::new()));

    let mut handles = vec![];
    for _ in 0..4 {
        let dir = td.path().to_owned();
        let seen = seen.clone();
        handles.push(thread::spawn(move || {
            let mut seq = SequenceStore::open(&dir);
            for _ in 0..25 {
                let n = seq.next().expect("next failed");
                assert!(seen.lock().unwrap().insert(n), "duplicate sequence {}", n);
            }
        }));
    }
    for handle in handles {
        handle.join().expect("seq thread panicked");
    }

    assert_eq!(seen.lock().unwrap().len(), 100);
    Ok(())
}
