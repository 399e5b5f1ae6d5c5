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

pub const VERSION: (&str, &str, &str) = (
    env!("CARGO_PKG_VERSION_MAJOR"),
    env!("CARGO_PKG_VERSION_MINOR"),
    env!("CARGO_PKG_VERSION_PATCH"),
);
pub const ENV_PREFIX: &str = "DHTFS";
pub const APP_NAME: &str = "dhtfs";

/// Tag dictionary store, relative to the data directory.  The store keeps a
/// sibling `.lock` file next to it.
pub const DB_FILE: &str = ".dhtfs.db";

/// Sequence counter store, relative to the data directory.
pub const SEQ_FILE: &str = ".dhtfs.seq";

/// Suffix of the advisory lock file that accompanies each store file.
pub const LOCK_SUFFIX: &str = ".lock";

/// Backing subdirectories for directory-like tags are named `t_<tag>`.
pub const DIR_PREFIX: &str = "t_";

/// Backing regular files are named `f_<32 hex digits>`.
pub const FILE_PREFIX: &str = "f_";

/// Width of the zero-padded hex sequence number in backing file names.  Wide
/// enough that the names sort lexicographically for any u64.
pub const SEQ_HEX_WIDTH: usize = 32;

/// Reserved location meaning "this element has no backing file yet".  Never
/// present on disk; the resolver returns it for paths that are expected to be
/// allocated on first write.
pub const MISSING_FILE: &str = "__MISSING_FILE_qwertyuiopasdfghjklzxcvbnm0987654321";

/// Listings bigger than this fall back to a covering set of tags.
pub const MAX_DIR_ENTRIES: usize = 210;

pub const DEFAULT_CONFIG_TOML: &str = r###"
[mount]
root = "/"

[listing]
get_cover = "dont-care"
"###;
