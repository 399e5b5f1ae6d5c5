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

//! The tag index: a bidirectional set-valued mapping between elements and
//! tags, persisted through a [`Store`] and queried with the set algebra
//! that bounds directory fan-out.
//!
//! Store failures degrade to safe no-ops here -- queries come back empty and
//! mutations are dropped with a warning.  The filesystem layer above then
//! fails naturally through its missing-path handling.

use crate::common::constants;
use crate::store::Store;
use log::{debug, warn};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

pub mod dirs;
pub mod types;

pub use types::{Element, Location, SortOrder, TagDict};

const TAGGING_TAG: &str = "tagging";

/// Result sets larger than this have the refined tags' elements subtracted
/// from the returned remainder; smaller sets are returned whole because the
/// caller will render them in full anyway.
const COVER_REMAINDER_THRESHOLD: usize = 20;

pub struct Tagging {
    store: Store<TagDict>,
    use_write_cache: bool,
    write_dict: TagDict,
}

impl std::fmt::Debug for Tagging {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        write!(f, "Tagging over {:?}", self.store)
    }
}

impl Tagging {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Tagging {
            store: Store::new(dir, constants::DB_FILE),
            use_write_cache: false,
            write_dict: TagDict::default(),
        }
    }

    pub fn check_setup<P: AsRef<Path>>(dir: P) -> bool {
        Store::<TagDict>::check_setup(dir, constants::DB_FILE)
    }

    /// Writes the empty skeleton.  Does nothing when the store already
    /// exists, unless `force` is set.
    pub fn init(&mut self, force: bool) {
        if self.store.is_set_up() && !force {
            return;
        }
        let _ = self.store.begin_write();
        if let Err(e) = self.store.commit_write(&TagDict::default()) {
            warn!(target: TAGGING_TAG, "Couldn't initialize tag index: {}", e);
        }
    }

    // ---- write cache ----

    /// Materializes the dictionary under the exclusive lock.  Until
    /// `done_write_caching`, mutations are applied in memory and queries see
    /// the uncommitted state.
    pub fn set_write_caching(&mut self) {
        if self.use_write_cache {
            return;
        }
        match self.store.begin_write() {
            Ok(dict) => {
                self.write_dict = dict;
                self.use_write_cache = true;
            }
            Err(e) => {
                warn!(target: TAGGING_TAG, "Couldn't enter write caching: {}", e);
                self.store.release_write();
            }
        }
    }

    /// Commits the materialized dictionary in one write.
    pub fn done_write_caching(&mut self) {
        if !self.use_write_cache {
            return;
        }
        self.use_write_cache = false;
        let dict = std::mem::take(&mut self.write_dict);
        if let Err(e) = self.store.commit_write(&dict) {
            warn!(target: TAGGING_TAG, "Couldn't commit write cache: {}", e);
        }
    }

    fn dict_snapshot(&mut self) -> Option<TagDict> {
        if self.use_write_cache {
            return Some(self.write_dict.clone());
        }
        match self.store.read() {
            Ok(dict) => Some(dict),
            Err(e) => {
                warn!(target: TAGGING_TAG, "Read degraded to empty: {}", e);
                None
            }
        }
    }

    fn dict_for_update(&mut self) -> Option<TagDict> {
        if self.use_write_cache {
            return Some(std::mem::take(&mut self.write_dict));
        }
        match self.store.begin_write() {
            Ok(dict) => Some(dict),
            Err(e) => {
                warn!(target: TAGGING_TAG, "Mutation dropped: {}", e);
                self.store.release_write();
                None
            }
        }
    }

    fn finish_update(&mut self, dict: TagDict) {
        if self.use_write_cache {
            self.write_dict = dict;
        } else if let Err(e) = self.store.commit_write(&dict) {
            warn!(target: TAGGING_TAG, "Couldn't commit mutation: {}", e);
        }
    }

    // ---- queries ----

    /// A copy of the whole dictionary, empty when the store cannot be read.
    pub fn snapshot(&mut self) -> TagDict {
        self.dict_snapshot().unwrap_or_default()
    }

    /// The elements tagged with every tag in `tags`.  Empty `tags` returns
    /// all elements; an unknown tag empties the result.
    pub fn elements_for(&mut self, tags: &[String]) -> Vec<Element> {
        let dict = match self.dict_snapshot() {
            Some(dict) => dict,
            None => return vec![],
        };
        Self::intersect(&dict, tags).into_iter().collect()
    }

    /// The union of tags across `elements`.  Empty `elements` returns every
    /// tag in the index.
    pub fn tags_for(&mut self, elements: &[Element]) -> BTreeSet<String> {
        let dict = match self.dict_snapshot() {
            Some(dict) => dict,
            None => return BTreeSet::new(),
        };

        if elements.is_empty() {
            return dict.t2e.keys().cloned().collect();
        }

        let mut tags = BTreeSet::new();
        for element in elements {
            if let Some(ts) = dict.e2t.get(element) {
                tags.extend(ts.iter().cloned());
            }
        }
        tags
    }

    /// The tags shared by every element in `elements`.
    pub fn common_tags(&mut self, elements: &[Element]) -> BTreeSet<String> {
        if elements.is_empty() {
            return BTreeSet::new();
        }
        let dict = match self.dict_snapshot() {
            Some(dict) => dict,
            None => return BTreeSet::new(),
        };

        let mut common = dict.e2t.get(&elements[0]).cloned().unwrap_or_default();
        for element in &elements[1..] {
            match dict.e2t.get(element) {
                Some(ts) => common = common.intersection(ts).cloned().collect(),
                None => {
                    common.clear();
                    break;
                }
            }
        }
        common
    }

    /// `(tag, |t2e[tag]|)` pairs for the requested tags, optionally sorted.
    /// Anything other than `Ascending` sorts descending.
    pub fn frequency(
        &mut self,
        tags: &[String],
        order: Option<SortOrder>,
    ) -> Vec<(String, usize)> {
        let dict = match self.dict_snapshot() {
            Some(dict) => dict,
            None => return vec![],
        };

        let mut freqs: Vec<(String, usize)> = tags
            .iter()
            .map(|t| (t.clone(), dict.t2e.get(t).map_or(0, BTreeSet::len)))
            .collect();

        if let Some(order) = order {
            freqs.sort_by(|a, b| match order {
                SortOrder::Ascending => a.1.cmp(&b.1),
                _other => b.1.cmp(&a.1),
            });
        }
        freqs
    }

    /// The refinement listing for a conjunction: the tags that could extend
    /// the query, plus the matching elements.
    ///
    /// With `restrictive`, only tags that would actually narrow the result
    /// are returned (never applied to the empty conjunction).  With `cover`,
    /// a greedy near-minimal set of tags whose elements together include the
    /// whole result.  When either was requested and the result holds more
    /// than [`COVER_REMAINDER_THRESHOLD`] elements, the returned elements are
    /// reduced to those not already reachable through the returned tags.
    pub fn tags_and_elements_for(
        &mut self,
        tags: &[String],
        restrictive: bool,
        cover: bool,
    ) -> (Vec<String>, Vec<Element>) {
        let dict = match self.dict_snapshot() {
            Some(dict) => dict,
            None => return (vec![], vec![]),
        };

        let intersection = Self::intersect(&dict, tags);
        let mut refined: Vec<String> = if tags.is_empty() {
            dict.t2e.keys().cloned().collect()
        } else {
            let mut candidates = BTreeSet::new();
            for element in &intersection {
                if let Some(ts) = dict.e2t.get(element) {
                    candidates.extend(ts.iter().cloned());
                }
            }
            for tag in tags {
                candidates.remove(tag);
            }
            candidates.into_iter().collect()
        };

        if restrictive {
            if !tags.is_empty() {
                let full = intersection.len();
                refined.retain(|t| {
                    dict.t2e
                        .get(t)
                        .map_or(0, |es| es.intersection(&intersection).count())
                        < full
                });
            }
        } else if cover {
            refined = Self::greedy_cover(&dict, refined);
        }

        let mut remaining = intersection;
        if (restrictive || cover) && remaining.len() > COVER_REMAINDER_THRESHOLD {
            for tag in &refined {
                if let Some(es) = dict.t2e.get(tag) {
                    remaining = remaining.difference(es).cloned().collect();
                }
            }
        }

        (refined, remaining.into_iter().collect())
    }

    /// Tags-only form of [`Tagging::tags_and_elements_for`].
    pub fn tags_for_tags(
        &mut self,
        tags: &[String],
        restrictive: bool,
        cover: bool,
    ) -> Vec<String> {
        self.tags_and_elements_for(tags, restrictive, cover).0
    }

    pub fn tag_exists(&mut self, tag: &str) -> bool {
        self.dict_snapshot()
            .map_or(false, |dict| dict.t2e.contains_key(tag))
    }

    pub fn element_exists(&mut self, element: &Element) -> bool {
        self.dict_snapshot()
            .map_or(false, |dict| dict.e2t.contains_key(element))
    }

    // ---- mutations ----

    /// Associates every tag with every element, registering tags and
    /// elements as needed.  Blank tags are filtered.  With no elements, the
    /// tags are merely registered -- that is how directory-like tags come
    /// into existence before any file carries them.
    pub fn add_tags(&mut self, elements: &[Element], tags: &[String]) {
        if elements.is_empty() && tags.is_empty() {
            return;
        }
        let mut dict = match self.dict_for_update() {
            Some(dict) => dict,
            None => return,
        };

        let tags: Vec<&String> = tags.iter().filter(|t| !t.is_empty()).collect();
        debug!(
            target: TAGGING_TAG,
            "Adding tags {:?} to {} elements",
            tags,
            elements.len()
        );

        for element in elements {
            dict.e2t
                .entry(element.clone())
                .or_default()
                .extend(tags.iter().map(|t| (*t).clone()));
        }
        for tag in &tags {
            dict.t2e
                .entry((*tag).clone())
                .or_default()
                .extend(elements.iter().cloned());
        }

        self.finish_update(dict);
    }

    /// Removes the tags from the elements.  Empty `elements` means "from
    /// every element" and deletes the tags outright; empty `tags` strips all
    /// tags from the given elements, deleting them.  Value sets that become
    /// empty are dropped on both sides.
    pub fn remove_tags_from_elements(&mut self, tags: &[String], elements: &[Element]) {
        let mut dict = match self.dict_for_update() {
            Some(dict) => dict,
            None => return,
        };
        debug!(
            target: TAGGING_TAG,
            "Removing tags {:?} from {} elements",
            tags,
            elements.len()
        );

        if elements.is_empty() {
            for tagset in dict.e2t.values_mut() {
                for tag in tags {
                    tagset.remove(tag);
                }
            }
            dict.e2t.retain(|_element, ts| !ts.is_empty());
            for tag in tags {
                dict.t2e.remove(tag);
            }
        } else if tags.is_empty() {
            for element in elements {
                if let Some(ts) = dict.e2t.remove(element) {
                    for tag in ts {
                        let emptied = match dict.t2e.get_mut(&tag) {
                            Some(es) => {
                                es.remove(element);
                                es.is_empty()
                            }
                            None => false,
                        };
                        if emptied {
                            dict.t2e.remove(&tag);
                        }
                    }
                }
            }
        } else {
            Self::unlink_pairs(&mut dict, tags, elements);
        }

        self.finish_update(dict);
    }

    /// Removes the elements from the tags.  Empty `tags` drops the elements
    /// from every tag's element set and deletes them from the index.
    pub fn remove_elements_from_tags(&mut self, elements: &[Element], tags: &[String]) {
        let mut dict = match self.dict_for_update() {
            Some(dict) => dict,
            None => return,
        };
        debug!(
            target: TAGGING_TAG,
            "Removing {} elements from tags {:?}",
            elements.len(),
            tags
        );

        if tags.is_empty() {
            for es in dict.t2e.values_mut() {
                for element in elements {
                    es.remove(element);
                }
            }
            dict.t2e.retain(|_tag, es| !es.is_empty());
            for element in elements {
                dict.e2t.remove(element);
            }
        } else {
            Self::unlink_pairs(&mut dict, tags, elements);
        }

        self.finish_update(dict);
    }

    /// Re-tags everything carrying `old` with `new`, committing once.
    pub fn rename_tag(&mut self, old: &str, new: &str) {
        let nested = self.use_write_cache;
        if !nested {
            self.set_write_caching();
        }

        let old_tags = vec![old.to_string()];
        let elements = self.elements_for(&old_tags);
        self.remove_tags_from_elements(&old_tags, &[]);
        self.add_tags(&elements, &[new.to_string()]);

        if !nested {
            self.done_write_caching();
        }
    }

    // ---- helpers ----

    fn intersect(dict: &TagDict, tags: &[String]) -> BTreeSet<Element> {
        if tags.is_empty() {
            return dict.e2t.keys().cloned().collect();
        }

        let mut set = dict.t2e.get(&tags[0]).cloned().unwrap_or_default();
        for tag in &tags[1..] {
            match dict.t2e.get(tag) {
                Some(other) => set = set.intersection(other).cloned().collect(),
                None => {
                    set.clear();
                    break;
                }
            }
        }
        set
    }

    /// Removes every (tag, element) association between the two slices,
    /// dropping value sets that become empty.
    fn unlink_pairs(dict: &mut TagDict, tags: &[String], elements: &[Element]) {
        for element in elements {
            let emptied = match dict.e2t.get_mut(element) {
                Some(ts) => {
                    for tag in tags {
                        ts.remove(tag);
                    }
                    ts.is_empty()
                }
                None => false,
            };
            if emptied {
                dict.e2t.remove(element);
            }
        }
        for tag in tags {
            let emptied = match dict.t2e.get_mut(tag) {
                Some(es) => {
                    for element in elements {
                        es.remove(element);
                    }
                    es.is_empty()
                }
                None => false,
            };
            if emptied {
                dict.t2e.remove(tag);
            }
        }
    }

    /// Greedy minimal-ish set cover: repeatedly take the candidate with the
    /// largest element set and drop every candidate it strictly subsumes.
    /// Deterministic (size descending, name ascending) and near-minimal for
    /// power-law tag distributions, though not globally optimal.
    fn greedy_cover(dict: &TagDict, mut candidates: Vec<String>) -> Vec<String> {
        let size =
            |tag: &String| -> usize { dict.t2e.get(tag).map_or(0, BTreeSet::len) };
        candidates.sort_by(|a, b| size(b).cmp(&size(a)).then_with(|| a.cmp(b)));

        let empty = BTreeSet::new();
        let mut cover = vec![];
        while candidates.len() > 1 {
            let biggest = candidates.remove(0);
            let big_set = dict.t2e.get(&biggest).unwrap_or(&empty);
            candidates.retain(|tag| {
                let set = dict.t2e.get(tag).unwrap_or(&empty);
                !(set.len() < big_set.len() && set.is_subset(big_set))
            });
            cover.push(biggest);
        }
        cover.extend(candidates);
        cover
    }
}
