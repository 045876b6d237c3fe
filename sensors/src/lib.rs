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

//! Hardware sensor monitoring for x86 PCs: Super-I/O, CPU, ACPI EC and USB-HID chip
//! drivers unified behind [`chip::SensorChip`] and organized into a [`tree::SensorTreeNode`],
//! with a libsensors-compatible C ABI ([`libsensors::ffi`]) for existing consumers.

pub mod chip;
pub mod config;
pub mod cpu;
pub mod cpuid;
pub mod dmi;
pub mod ec;
pub mod error;
pub mod hid;
pub mod libsensors;
pub mod logging;
pub mod memory;
pub mod probe;
pub mod ring0;
pub mod superio;
#[cfg(test)]
pub mod testutil;
pub mod tree;
pub mod types;

pub use chip::{ReadValue, SensorChip, Visibility};
pub use error::{SensorError, SensorResult};
pub use types::{Attribute, BusType, ChannelConfig, Identifier, SensorType, TypeConfig};
