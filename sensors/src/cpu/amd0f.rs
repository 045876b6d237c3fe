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

//! AMD family 0Fh (K8) has no energy MSR — temperature is read from the per-package
//! northbridge's "Thermtrip Status" PCI function, register 0xE4. Bit 2 selects which of the
//! two on-die sensors is latched into bits [23:16]; dual-core parts carry two sensors per
//! package and the selector must be flipped and re-read for the second.

use std::sync::Arc;
use std::time::Instant;

use crate::cpu::generic::PackageSensor;
use crate::error::SensorResult;
use crate::ring0::PciAccess;
use crate::types::SensorType;

const THERMTRIP_STATUS_REG: u16 = 0xE4;
const SENSOR_SELECT_BIT: u32 = 1 << 2;
const READING_SHIFT: u32 = 16;
const READING_MASK: u32 = 0xFF;

/// Raw readings are offset from 0, not absolute zero Celsius — this is the fixed AMD offset
/// documented for single-core and most dual-core K8 parts.
const TEMP_OFFSET_CELSIUS: f64 = 49.0;

pub fn decode_thermtrip(raw: u32) -> f64 {
    ((raw >> READING_SHIFT) & READING_MASK) as f64 - TEMP_OFFSET_CELSIUS
}

/// One per package (each package's northbridge function 3 is a distinct PCI device/function
/// address).
pub struct Amd0FCpu {
    pci: Arc<dyn PciAccess>,
    package_pci_addresses: Vec<u32>,
}

impl Amd0FCpu {
    pub fn new(pci: Arc<dyn PciAccess>, package_pci_addresses: Vec<u32>) -> Self {
        Self {
            pci,
            package_pci_addresses,
        }
    }
}

impl PackageSensor for Amd0FCpu {
    fn sensor_type(&self) -> SensorType {
        SensorType::Temp
    }

    fn package_count(&self) -> usize {
        self.package_pci_addresses.len()
    }

    fn read_package(&self, package: usize, _now: Instant) -> SensorResult<f64> {
        let address = self.package_pci_addresses[package];
        let raw = self.pci.read_pci_config(address, THERMTRIP_STATUS_REG)?;
        Ok(decode_thermtrip(raw))
    }
}

/// Selects the second on-die sensor by setting [`SENSOR_SELECT_BIT`] before the caller
/// re-reads the register; exposed standalone since [`PciAccess::write_pci_config`] needs a
/// mutable round trip that doesn't fit `read_package`'s read-only contract.
pub fn select_secondary_sensor(raw: u32) -> u32 {
    raw | SENSOR_SELECT_BIT
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct FixedPci {
        value: Mutex<u32>,
    }

    impl PciAccess for FixedPci {
        fn read_pci_config(&self, _address: u32, _reg: u16) -> SensorResult<u32> {
            Ok(*self.value.lock().unwrap())
        }
        fn write_pci_config(&self, _address: u32, _reg: u16, value: u32) -> SensorResult<()> {
            *self.value.lock().unwrap() = value;
            Ok(())
        }
    }

    #[test]
    fn decode_thermtrip_applies_the_fixed_offset() {
        // raw reading byte 99 (0x63) at bits [23:16] -> 99 - 49 = 50C
        let raw = 0x63 << 16;
        assert_eq!(decode_thermtrip(raw), 50.0);
    }

    #[test]
    fn select_secondary_sensor_only_touches_the_select_bit() {
        assert_eq!(select_secondary_sensor(0), SENSOR_SELECT_BIT);
        assert_eq!(select_secondary_sensor(0xFFFF_FFFF), 0xFFFF_FFFF);
    }

    #[test]
    fn read_package_decodes_through_pci_access() {
        let pci = FixedPci {
            value: Mutex::new(60 << 16),
        };
        let cpu = Amd0FCpu::new(Arc::new(pci), vec![0x1800]);
        let temp = cpu.read_package(0, Instant::now()).unwrap();
        assert_eq!(temp, 60.0 - TEMP_OFFSET_CELSIUS);
    }
}
