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
use dhtfs::tag::Element;
use dhtfs::Tagging;
use std::collections::BTreeSet;

/// Bulk-seeds the helper's data directory through a second index instance,
/// the way an external tool would; the adapter picks the changes up through
/// the store's mtime check.
fn seed<F>(th: &TestHelper, populate: F)
where
    F: FnOnce(&mut Tagging),
{
    let mut tagging = Tagging::new(th.td.path());
    tagging.set_write_caching();
    populate(&mut tagging);
    tagging.done_write_caching();
}

fn element(i: usize) -> Element {
    Element::allocated(format!("f_{:032x}", i + 1000), format!("file{:03}", i))
}

// 500 files under one tag push the listing over MAX_DIR_ENTRIES, so the
// adapter recomputes with a cover: the refinement tags plus the uncovered
// remainder come back instead of the raw five hundred
#[test]
fn test_big_directory_falls_back_to_cover() -> TestResult {
    let th = TestHelper::new();

    seed(&th, |tagging| {
        for i in 0..500 {
            let mut tags = vec!["big".to_string()];
            // the first 300 files land in 20 groups of 15
            if i < 300 {
                tags.push(format!("g{:02}", i / 15));
            }
            tagging.add_tags(&[element(i)], &tags);
        }
    });

    let listing = th.readdir_names("/big");
    assert_eq!(listing.len(), 220, "20 cover tags + 200 uncovered files");

    let dirs: Vec<&String> = listing.iter().filter(|n| n.starts_with('g')).collect();
    let files: Vec<&String> = listing.iter().filter(|n| n.starts_with("file")).collect();
    assert_eq!(dirs.len(), 20);
    assert_eq!(files.len(), 200);

    // the cover law, end to end: every element is either behind a returned
    // refinement tag or listed directly
    let mut covered: BTreeSet<String> = files.iter().map(|n| (*n).clone()).collect();
    for dir in dirs {
        for name in th.readdir_names(&format!("/big/{}", dir)) {
            covered.insert(name);
        }
    }
    assert_eq!(covered.len(), 500);
    Ok(())
}

// with get_cover=never the subsumed refinement tag stays; the default policy
// drops it once the listing overflows
#[test]
fn test_never_override_skips_cover() -> TestResult {
    let seed_subsets = |th: &TestHelper| {
        seed(th, |tagging| {
            for i in 0..500 {
                let mut tags = vec!["big".to_string()];
                if i < 250 {
                    tags.push("half".to_string());
                }
                if i < 125 {
                    tags.push("quarter".to_string());
                }
                tagging.add_tags(&[element(i)], &tags);
            }
        });
    };

    let th = TestHelper::new();
    seed_subsets(&th);
    let listing = th.readdir_names("/big");
    // cover keeps "half" and drops "quarter" as a strict subset of it
    assert!(listing.contains(&"half".to_string()));
    assert!(!listing.contains(&"quarter".to_string()));
    assert_eq!(listing.len(), 251);

    let th = TestHelper::with_overrides(&[("listing.get_cover", "never")]);
    seed_subsets(&th);
    let listing = th.readdir_names("/big");
    // restrictive results only, however big they get
    assert!(listing.contains(&"half".to_string()));
    assert!(listing.contains(&"quarter".to_string()));
    assert_eq!(listing.len(), 252);
    Ok(())
}

// with get_cover=always even a tiny directory gets the covering tags, which
// keep a tag the restrictive filter would reject for not narrowing anything
#[test]
fn test_always_override_forces_cover() -> TestResult {
    let seed_span = |th: &TestHelper| {
        seed(th, |tagging| {
            for i in 0..3 {
                let mut tags = vec!["work".to_string(), "span".to_string()];
                if i < 2 {
                    tags.push("sub".to_string());
                }
                tagging.add_tags(&[element(i)], &tags);
            }
        });
    };

    let th = TestHelper::new();
    seed_span(&th);
    let listing = th.readdir_names("/work");
    // "span" holds every match, so it cannot restrict and is left out
    assert!(!listing.contains(&"span".to_string()));
    assert!(listing.contains(&"sub".to_string()));

    let th = TestHelper::with_overrides(&[("listing.get_cover", "always")]);
    seed_span(&th);
    let listing = th.readdir_names("/work");
    // the cover picks "span" first and subsumes "sub"
    assert!(listing.contains(&"span".to_string()));
    assert!(!listing.contains(&"sub".to_string()));
    Ok(())
}

// a sparse query result (fewer than 2 files) also falls back to the cover,
// so there is always a way further down the hierarchy
#[test]
fn test_sparse_listing_shows_cover_tags() -> TestResult {
    let th = TestHelper::new();
    th.create_file("/work/text/notes", b"x")?;

    // "work" does not restrict {notes} -- only the cover brings it back
    assert_eq!(th.readdir_names("/text"), vec!["notes", "work"]);
    Ok(())
}
