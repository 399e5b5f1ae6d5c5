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

use crate::common::constants;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Where an element's contents live.  `Missing` marks an element whose
/// backing file has not been allocated yet: placeholders created by `mkdir`,
/// or paths pending their first open-for-write.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Location {
    Allocated(String),
    Missing,
}

impl Location {
    /// The backing file name, with the reserved sentinel standing in for
    /// `Missing`.  The sentinel never exists on disk.
    pub fn as_file_name(&self) -> &str {
        match self {
            Location::Allocated(name) => name,
            Location::Missing => constants::MISSING_FILE,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Location::Missing)
    }
}

impl From<&str> for Location {
    fn from(name: &str) -> Self {
        if name == constants::MISSING_FILE {
            Location::Missing
        } else {
            Location::Allocated(name.to_owned())
        }
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        write!(f, "{}", self.as_file_name())
    }
}

/// The identity of a file as seen by the tag layer: its backing location and
/// its user-visible name.  Renaming a file produces a new element.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Element {
    pub location: Location,
    pub name: String,
}

impl Element {
    pub fn new<S: Into<String>>(location: Location, name: S) -> Self {
        Element {
            location,
            name: name.into(),
        }
    }

    pub fn allocated<L: Into<String>, S: Into<String>>(location: L, name: S) -> Self {
        Element {
            location: Location::Allocated(location.into()),
            name: name.into(),
        }
    }

    pub fn missing<S: Into<String>>(name: S) -> Self {
        Element {
            location: Location::Missing,
            name: name.into(),
        }
    }
}

impl std::fmt::Display for Element {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        write!(f, "{} at {}", self.name, self.location)
    }
}

/// Attributes reserved for future use.  Present in the serialized schema and
/// round-tripped untouched.
pub type AttrMap = BTreeMap<String, String>;

/// The single persisted value of the tag index: a set-valued mapping in both
/// directions.  Both directions are the source of truth and must stay dual
/// at every commit point.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TagDict {
    pub t2e: BTreeMap<String, BTreeSet<Element>>,
    pub e2t: BTreeMap<Element, BTreeSet<String>>,
    pub e2a: BTreeMap<Element, AttrMap>,
}

/// Sort order for [`crate::tag::Tagging::frequency`].  Anything other than
/// `Ascending` sorts descending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}
