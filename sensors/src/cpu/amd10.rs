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

//! AMD family 10h-16h ("k10temp") reads package temperature from the northbridge
//! "Reported Temperature Control" PCI register. `CurTmp` sits at bits [27:21] in 0.125C
//! units; if bit 19 (`CurTmpTjSel` high range) is set the raw value needs an extra -49C
//! shift some Family 15h models require to land on a sane absolute temperature.

use std::sync::Arc;
use std::time::Instant;

use crate::cpu::generic::PackageSensor;
use crate::error::SensorResult;
use crate::ring0::PciAccess;
use crate::types::SensorType;

const REPORTED_TEMP_REG: u16 = 0xA4;
const CUR_TMP_SHIFT: u32 = 21;
const CUR_TMP_MASK: u32 = 0x7FF;
const CUR_TMP_RANGE_SEL_BIT: u32 = 1 << 19;
const HIGH_RANGE_OFFSET_CELSIUS: f64 = 49.0;

pub fn decode_reported_temp(raw: u32) -> f64 {
    let cur_tmp = (raw >> CUR_TMP_SHIFT) & CUR_TMP_MASK;
    let celsius = cur_tmp as f64 / 8.0;
    if raw & CUR_TMP_RANGE_SEL_BIT != 0 {
        celsius - HIGH_RANGE_OFFSET_CELSIUS
    } else {
        celsius
    }
}

pub struct Amd10Cpu {
    pci: Arc<dyn PciAccess>,
    package_pci_addresses: Vec<u32>,
}

impl Amd10Cpu {
    pub fn new(pci: Arc<dyn PciAccess>, package_pci_addresses: Vec<u32>) -> Self {
        Self {
            pci,
            package_pci_addresses,
        }
    }
}

impl PackageSensor for Amd10Cpu {
    fn sensor_type(&self) -> SensorType {
        SensorType::Temp
    }

    fn package_count(&self) -> usize {
        self.package_pci_addresses.len()
    }

    fn read_package(&self, package: usize, _now: Instant) -> SensorResult<f64> {
        let address = self.package_pci_addresses[package];
        let raw = self.pci.read_pci_config(address, REPORTED_TEMP_REG)?;
        Ok(decode_reported_temp(raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedPci {
        value: u32,
    }

    impl PciAccess for FixedPci {
        fn read_pci_config(&self, _address: u32, _reg: u16) -> SensorResult<u32> {
            Ok(self.value)
        }
        fn write_pci_config(&self, _address: u32, _reg: u16, _value: u32) -> SensorResult<()> {
            Ok(())
        }
    }

    #[test]
    fn decode_low_range_divides_by_eight() {
        // cur_tmp = 400 (0x190) -> 50.0C, range-select bit clear
        let raw = 400 << CUR_TMP_SHIFT;
        assert_eq!(decode_reported_temp(raw), 50.0);
    }

    #[test]
    fn decode_high_range_applies_negative_offset() {
        let raw = (400 << CUR_TMP_SHIFT) | CUR_TMP_RANGE_SEL_BIT;
        assert_eq!(decode_reported_temp(raw), 50.0 - HIGH_RANGE_OFFSET_CELSIUS);
    }

    #[test]
    fn read_package_decodes_through_pci_access() {
        let cpu = Amd10Cpu::new(Arc::new(FixedPci { value: 400 << CUR_TMP_SHIFT }), vec![0x1800]);
        assert_eq!(cpu.read_package(0, Instant::now()).unwrap(), 50.0);
    }
}
