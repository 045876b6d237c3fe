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

//! The only configuration surface this library has: an optional override file for the
//! super-I/O chip database. This does not reintroduce `sensors_init(FILE*)` config-file
//! parsing (unsupported by design) — it is a library-level knob, set before `init()` runs,
//! not something the libsensors ABI exposes.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SensorsConfig {
    /// Path to a TOML file merged into the compiled-in super-I/O device catalog, in the
    /// same schema `sensors_detect::catalog` loads from `include_str!`.
    pub superio_override_path: Option<PathBuf>,
}

impl SensorsConfig {
    pub fn from_file(path: &std::path::Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&text)?)
    }
}
