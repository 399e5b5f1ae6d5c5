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

use crate::common::constants::VERSION;
use std::path::{Component, Path};

pub mod constants;
pub mod err;
pub mod log;
pub mod settings;

pub fn get_filename(path: &Path) -> err::DhtfsResult<&str> {
    Ok(path
        .components()
        .last()
        .ok_or_else(|| err::DhtfsError::InvalidPath(path.to_owned()))?
        .as_os_str()
        .to_str()
        .ok_or_else(|| err::DhtfsError::InvalidPath(path.to_owned()))?)
}

/// Splits a virtual path into the tags named by its components.  The root
/// produces no tags.
pub fn path_tags(path: &Path) -> Vec<String> {
    let mut tags = vec![];
    for comp in path.components() {
        if let Component::Normal(name) = comp {
            if let Some(tag) = name.to_str() {
                if !tag.is_empty() {
                    tags.push(tag.to_owned());
                }
            }
        }
    }
    tags
}

/// The tags of the directory part of `path`, i.e. everything but the final
/// component.
pub fn parent_tags(path: &Path) -> Vec<String> {
    match path.parent() {
        Some(parent) => path_tags(parent),
        None => vec![],
    }
}

/// Derives the backing file name for a sequence value: the `f_` prefix plus
/// the value in zero-padded hex, so names sort lexicographically and cannot
/// collide with user-visible names.
pub fn backing_file_name(seq: u64) -> String {
    format!(
        "{}{:0>width$x}",
        constants::FILE_PREFIX,
        seq,
        width = constants::SEQ_HEX_WIDTH
    )
}

/// The backing directory name for a directory-like tag.
pub fn backing_dir_name(tag: &str) -> String {
    format!("{}{}", constants::DIR_PREFIX, tag)
}

pub fn version_str() -> String {
    format!("{}.{}.{}", VERSION.0, VERSION.1, VERSION.2)
}
