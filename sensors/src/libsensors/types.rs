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

//! Plain data types mirroring libsensors' `sensors_chip_name`/`sensors_feature`/
//! `sensors_subfeature` structs.

use crate::types::{Attribute, BusType, SensorType};

/// A bus number of `-1` in the C struct means "wildcard, match any bus number of this
/// type"; `-2` addresses a chip that never changes bus number (rare, ISA-only chips).
pub const BUS_NR_ANY: i16 = -1;
pub const BUS_NR_IGNORE: i16 = -2;

/// An address of `u32::MAX` marks "wildcard", mirroring libsensors' own sentinel.
pub const ADDR_ANY: u32 = u32::MAX;

#[derive(Debug, Clone, PartialEq)]
pub struct ChipName {
    pub prefix: String,
    pub bus_type: Option<BusType>,
    pub bus_nr: i16,
    pub addr: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub sensor_type: SensorType,
    pub number: usize,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Subfeature {
    pub name: String,
    pub number: u32,
    pub subfeature_type: u32,
    pub attribute: Attribute,
    pub channel: usize,
}
