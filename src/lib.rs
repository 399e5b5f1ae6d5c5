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

//! dhtfs synthesizes a directory hierarchy on demand from a many-to-many
//! association between files and tags.  A path like `/a/b/c` is the
//! conjunctive query "files tagged with `a`, `b` and `c`"; listing it yields
//! the matching files plus further tags that would refine the query.  File
//! contents live in a flat data directory and are addressed by synthetic
//! names.

#![warn(clippy::all, clippy::pedantic, clippy::cargo)]
#![allow(
    clippy::multiple_crate_versions,
    clippy::missing_errors_doc,
    clippy::module_name_repetitions,
    clippy::similar_names,
    clippy::single_match_else,
    clippy::wildcard_enum_match_arm
)]

pub mod common;
pub mod fuse;
pub mod store;
pub mod tag;

pub use fuse::fs::TagFilesystem;
pub use store::seq::SequenceStore;
pub use store::Store;
pub use tag::dirs::DirHelper;
pub use tag::Tagging;
