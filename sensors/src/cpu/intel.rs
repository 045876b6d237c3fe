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

//! Intel ("coretemp") per-core temperature: `IA32_THERM_STATUS` (0x19C) bits [22:16] carry
//! "degrees below Tj(max)", and `MSR_TEMPERATURE_TARGET` (0x1A2) bits [23:16] carry Tj(max)
//! itself. One reading needs both MSRs since the offset alone is meaningless without the
//! chip's own junction-temperature ceiling.

use std::sync::Arc;
use std::time::Instant;

use crate::cpu::generic::PackageSensor;
use crate::error::SensorResult;
use crate::ring0::MsrAccess;
use crate::types::SensorType;

pub const MSR_IA32_THERM_STATUS: u32 = 0x19C;
pub const MSR_TEMPERATURE_TARGET: u32 = 0x1A2;

const READING_VALID_BIT: u32 = 1 << 31;
const DEGREES_BELOW_TJMAX_SHIFT: u32 = 16;
const DEGREES_BELOW_TJMAX_MASK: u32 = 0x7F;
const TJMAX_SHIFT: u32 = 16;
const TJMAX_MASK: u32 = 0xFF;

/// `None` when the status MSR's "reading valid" bit is clear — the core hasn't taken a
/// sample yet, distinct from a genuine zero-degrees-below-max reading.
pub fn decode_core_temp(therm_status_eax: u32, tjmax_target_eax: u32) -> Option<f64> {
    if therm_status_eax & READING_VALID_BIT == 0 {
        return None;
    }
    let degrees_below = (therm_status_eax >> DEGREES_BELOW_TJMAX_SHIFT) & DEGREES_BELOW_TJMAX_MASK;
    let tjmax = (tjmax_target_eax >> TJMAX_SHIFT) & TJMAX_MASK;
    Some((tjmax as f64) - (degrees_below as f64))
}

/// One instance per core; `cpu` is the Linux logical CPU number backing `/dev/cpu/N/msr`.
pub struct IntelCpu {
    msr: Arc<dyn MsrAccess>,
    cpus: Vec<u32>,
}

impl IntelCpu {
    pub fn new(msr: Arc<dyn MsrAccess>, cpus: Vec<u32>) -> Self {
        Self { msr, cpus }
    }
}

impl PackageSensor for IntelCpu {
    fn sensor_type(&self) -> SensorType {
        SensorType::Temp
    }

    fn package_count(&self) -> usize {
        self.cpus.len()
    }

    fn read_package(&self, package: usize, _now: Instant) -> SensorResult<f64> {
        let cpu = self.cpus[package];
        let (status, _) = self.msr.read_msr(cpu, MSR_IA32_THERM_STATUS)?;
        let (tjmax, _) = self.msr.read_msr(cpu, MSR_TEMPERATURE_TARGET)?;
        match decode_core_temp(status, tjmax) {
            Some(celsius) => Ok(celsius),
            None => Err(crate::error::SensorError::transient("core temperature reading not yet valid")),
        }
    }

    fn label(&self, package: usize) -> String {
        format!("Core {package}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct FixedMsr {
        status: u32,
        tjmax: u32,
        calls: Mutex<u32>,
    }

    impl MsrAccess for FixedMsr {
        fn read_msr(&self, _cpu: u32, index: u32) -> SensorResult<(u32, u32)> {
            *self.calls.lock().unwrap() += 1;
            let eax = if index == MSR_IA32_THERM_STATUS { self.status } else { self.tjmax };
            Ok((eax, 0))
        }
        fn write_msr(&self, _cpu: u32, _index: u32, _eax: u32, _edx: u32) -> SensorResult<()> {
            Ok(())
        }
    }

    #[test]
    fn decode_subtracts_degrees_below_tjmax() {
        let status = READING_VALID_BIT | (20 << DEGREES_BELOW_TJMAX_SHIFT);
        let tjmax = 100 << TJMAX_SHIFT;
        assert_eq!(decode_core_temp(status, tjmax), Some(80.0));
    }

    #[test]
    fn decode_returns_none_when_reading_invalid() {
        assert_eq!(decode_core_temp(0, 100 << TJMAX_SHIFT), None);
    }

    #[test]
    fn read_package_surfaces_transient_error_for_invalid_reading() {
        let msr = FixedMsr {
            status: 0,
            tjmax: 100 << TJMAX_SHIFT,
            calls: Mutex::new(0),
        };
        let cpu = IntelCpu::new(Arc::new(msr), vec![0]);
        assert!(cpu.read_package(0, Instant::now()).is_err());
    }

    #[test]
    fn label_names_cores_not_packages() {
        let cpu = IntelCpu::new(Arc::new(FixedMsr { status: 0, tjmax: 0, calls: Mutex::new(0) }), vec![0, 1]);
        assert_eq!(cpu.label(1), "Core 1");
    }
}
