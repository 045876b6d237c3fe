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

//! The data model shared by every chip driver and by the libsensors adapter: channel
//! semantics ([`SensorType`]), the per-channel attribute bitset, and the stable identity a
//! chip carries for its whole lifetime ([`Identifier`]).

use std::collections::HashMap;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// Channel semantics. Values are raw `f64` in SI-ish units (V, A, W, °C, RPM, Hz, fraction
/// in `[0, 1]`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SensorType {
    Chip,
    Temp,
    In,
    Curr,
    Power,
    Energy,
    Humidity,
    Fan,
    Pwm,
    Intrusion,
    Data,
    DataRate,
    Duration,
    Frequency,
    Flow,
    Load,
    Raw,
    Fraction,
}

bitflags! {
    /// Bits 0–2 are generic across every [`SensorType`]; bit 3 and up carry
    /// type-specific meaning assigned in [`type_specific_bits`]. One `Attribute` value is
    /// the full mask for one channel.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub struct Attribute: u32 {
        const ENABLE = 1 << 0;
        const INPUT  = 1 << 1;
        const LABEL  = 1 << 2;

        const MIN        = 1 << 3;
        const MAX        = 1 << 4;
        const CRIT       = 1 << 5;
        const CRIT_LOW   = 1 << 6;
        const ALARM      = 1 << 7;
        const HYST       = 1 << 8;
        const RATED_MIN  = 1 << 9;
        const RATED_MAX  = 1 << 10;
        const AVERAGE    = 1 << 11;
        const LOWEST     = 1 << 12;
        const HIGHEST    = 1 << 13;
        const BEEP       = 1 << 14;
        const FAULT      = 1 << 15;
        const DIV        = 1 << 16;
        const TARGET     = 1 << 17;
        const TYPE_SEL   = 1 << 18;
    }
}

/// Maps one set bit of an [`Attribute`] mask, for a given [`SensorType`], onto the
/// libsensors `sensors_subfeature_type` constant it corresponds to. `None` means the bit
/// has no libsensors-visible subfeature for that type (it is still a valid internal
/// attribute, e.g. used for chip-local bookkeeping).
pub fn libsensors_subfeature_type(t: SensorType, bit: Attribute) -> Option<u32> {
    use SensorType::*;
    // Numbering follows the real lm-sensors `sensors_subfeature_type` table: each type
    // owns a contiguous block of 0x00-based subfeature codes, `_input` always first.
    let base: u32 = match t {
        In => 0x00,
        Fan => 0x0B,
        Temp => 0x10,
        Power => 0x2B,
        Energy => 0x2F,
        Curr => 0x30,
        Humidity => 0x3A,
        Intrusion => 0x39,
        _ => return None,
    };
    let offset = match bit {
        Attribute::INPUT => 0,
        Attribute::MIN => 1,
        Attribute::MAX => 2,
        Attribute::CRIT_LOW => 3,
        Attribute::CRIT => 4,
        Attribute::AVERAGE => 5,
        Attribute::LOWEST => 6,
        Attribute::HIGHEST => 7,
        Attribute::ALARM => 8,
        Attribute::FAULT => 9,
        Attribute::BEEP => 10,
        Attribute::DIV => 11,
        Attribute::HYST => 12,
        Attribute::TARGET => 13,
        Attribute::RATED_MIN => 14,
        Attribute::RATED_MAX => 15,
        _ => return None,
    };
    Some(base + offset)
}

/// Per-type channel map a chip publishes: `channel_attributes[i]` is the mask for channel
/// `i`. `channel_attributes.len()` is the channel count for that type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TypeConfig {
    pub channel_attributes: Vec<Attribute>,
}

/// The full channel map a chip publishes. Stable for the chip's lifetime unless the chip
/// explicitly signals a sensor added/removed event.
#[derive(Debug, Clone, Default)]
pub struct ChannelConfig {
    pub sensors: HashMap<SensorType, TypeConfig>,
}

impl ChannelConfig {
    pub fn channel_count(&self, t: SensorType) -> usize {
        self.sensors.get(&t).map_or(0, |c| c.channel_attributes.len())
    }

    pub fn attributes(&self, t: SensorType, channel: usize) -> Option<Attribute> {
        self.sensors.get(&t)?.channel_attributes.get(channel).copied()
    }
}

/// Bus the chip is reachable over. Mirrors libsensors' `bus_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BusType {
    I2C,
    Isa,
    Pci,
    Spi,
    Virtual,
    Acpi,
    Hid,
    Mdio,
    Scsi,
}

impl BusType {
    pub fn as_str(self) -> &'static str {
        match self {
            BusType::I2C => "i2c",
            BusType::Isa => "isa",
            BusType::Pci => "pci",
            BusType::Spi => "spi",
            BusType::Virtual => "virtual",
            BusType::Acpi => "acpi",
            BusType::Hid => "hid",
            BusType::Mdio => "mdio",
            BusType::Scsi => "scsi",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Some(match s {
            "i2c" => BusType::I2C,
            "isa" => BusType::Isa,
            "pci" => BusType::Pci,
            "spi" => BusType::Spi,
            "virtual" => BusType::Virtual,
            "acpi" => BusType::Acpi,
            "hid" => BusType::Hid,
            "mdio" => BusType::Mdio,
            "scsi" => BusType::Scsi,
            _ => return None,
        })
    }
}

/// A string tag naming the concrete driver family (`"nct6798"`, `"k10temp"`, `"kraken-x3"`,
/// …). Used as the libsensors chip name prefix.
pub type HardwareType = String;

/// Stable identity of a chip for its whole lifetime.
#[derive(Debug, Clone)]
pub struct Identifier {
    pub name: String,
    pub hardware_type: HardwareType,
    pub bus: BusType,
    /// Chip address/index on its bus (I/O base for super-I/O, PCI device/function word for
    /// CPU drivers, USB path hash for HID, 0 for virtual chips).
    pub addr: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generic_bits_are_shared_across_types() {
        assert_eq!(Attribute::ENABLE.bits(), 1);
        assert_eq!(Attribute::INPUT.bits(), 2);
        assert_eq!(Attribute::LABEL.bits(), 4);
    }

    #[test]
    fn subfeature_mapping_is_stable_per_type() {
        assert_eq!(
            libsensors_subfeature_type(SensorType::In, Attribute::INPUT),
            Some(0x00)
        );
        assert_eq!(
            libsensors_subfeature_type(SensorType::Temp, Attribute::INPUT),
            Some(0x10)
        );
        assert_eq!(
            libsensors_subfeature_type(SensorType::Fan, Attribute::ALARM),
            Some(0x0B + 8)
        );
    }

    #[test]
    fn channel_config_reports_count_from_masks() {
        let mut cfg = ChannelConfig::default();
        cfg.sensors.insert(
            SensorType::In,
            TypeConfig {
                channel_attributes: vec![Attribute::INPUT | Attribute::LABEL; 3],
            },
        );
        assert_eq!(cfg.channel_count(SensorType::In), 3);
        assert_eq!(cfg.channel_count(SensorType::Temp), 0);
    }
}
