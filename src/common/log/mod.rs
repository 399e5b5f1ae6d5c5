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

//! Logging setup for the mount daemon.  The entry point decides where the
//! output goes (stderr, a file under the data dir, both); this module only
//! owns the format and dispatch.

pub fn setup_logger(
    level: log::LevelFilter,
    outputs: Vec<fern::Output>,
) -> Result<(), fern::InitError> {
    let mut logger = fern::Dispatch::new()
        .format(move |out, message, record| {
            out.finish(format_args!(
                "{}[Thread: {:?}][{}][{}] {}",
                chrono::Local::now().format("[%Y-%m-%d][%H:%M:%S][%s%.3f]"),
                std::thread::current().id(),
                record.target(),
                record.level(),
                message
            ))
        })
        .level(level);

    for output in outputs {
        logger = logger.chain(output);
    }

    logger.apply()?;

    Ok(())
}
