/*
 * sensors-rs - hardware sensor monitoring library for x86 PCs
 * Copyright (c) 2024-2026  The sensors-rs contributors
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with this program.  If not, see <https://www.gnu.org/licenses/>.
 */

//! This crate only ever calls [`log`] macros; it never installs a logger itself. Embedding
//! binaries configure the sink (journald, stderr, whatever fits) the same way
//! `coolercontrold` does in its own `main`. [`init_for_tests`] is the one exception, used by
//! `#[cfg(test)]` modules across this crate so test output doesn't depend on run order.

#[cfg(test)]
pub fn init_for_tests() {
    let _ = env_logger::Builder::from_default_env()
        .is_test(true)
        .try_init();
}
