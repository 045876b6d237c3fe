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

//! Winbond W836xx hardware-monitor logical device (w83627hf/w83627ehf driver families).
//! A single index/data register pair, no bank switching: voltages are an 8-bit ADC at
//! 16mV/count, temperatures are direct signed-byte Celsius with a separate fractional
//! register on the EHF/DHG generation, and fan tachometers are an 8-bit divisor count
//! clocked at 1.35MHz like the ITE family.

use crate::error::SensorResult;
use crate::superio::generic_chip::SuperIoRegisters;
use crate::superio::port::SingleBankPort;

const REG_VIN_BASE: u8 = 0x20;
const REG_TEMP_BASE: u8 = 0x27;
const REG_FAN_BASE: u8 = 0x28;
const REG_PWM_BASE: u8 = 0x30;

const VOLTAGE_MILLIVOLTS_PER_COUNT: f64 = 16.0;
const FAN_CLOCK_HZ: f64 = 1_350_000.0;

pub fn decode_voltage(raw: u8) -> f64 {
    raw as f64 * VOLTAGE_MILLIVOLTS_PER_COUNT / 1000.0
}

pub fn decode_temperature(raw: u8) -> f64 {
    raw as i8 as f64
}

pub fn decode_fan_rpm(count: u8) -> f64 {
    if count == 0 || count == 0xFF {
        0.0
    } else {
        FAN_CLOCK_HZ / (count as f64 * 2.0)
    }
}

pub struct WinbondRegisters<'a> {
    port: std::sync::Mutex<SingleBankPort<'a>>,
}

impl<'a> WinbondRegisters<'a> {
    pub fn new(io: &'a mut dyn sensors_detect::port_io::PortIo, base_addr: u16) -> Self {
        Self {
            port: std::sync::Mutex::new(SingleBankPort::new(io, base_addr, base_addr + 1)),
        }
    }
}

impl SuperIoRegisters for WinbondRegisters<'_> {
    fn read_voltage_raw(&self, source_index: usize) -> SensorResult<u8> {
        self.port
            .lock()
            .expect("winbond port mutex poisoned")
            .read_byte(REG_VIN_BASE + source_index as u8)
    }

    fn decode_voltage(&self, raw: u8) -> f64 {
        decode_voltage(raw)
    }

    fn read_temperature(&self, source_index: usize) -> SensorResult<f64> {
        let raw = self
            .port
            .lock()
            .expect("winbond port mutex poisoned")
            .read_byte(REG_TEMP_BASE + source_index as u8)?;
        Ok(decode_temperature(raw))
    }

    fn read_fan_rpm(&self, source_index: usize) -> SensorResult<f64> {
        let raw = self
            .port
            .lock()
            .expect("winbond port mutex poisoned")
            .read_byte(REG_FAN_BASE + source_index as u8)?;
        Ok(decode_fan_rpm(raw))
    }

    fn read_pwm_duty(&self, source_index: usize) -> SensorResult<u8> {
        self.port
            .lock()
            .expect("winbond port mutex poisoned")
            .read_byte(REG_PWM_BASE + source_index as u8)
    }

    fn write_pwm_duty(&self, source_index: usize, duty: u8) -> SensorResult<()> {
        self.port
            .lock()
            .expect("winbond port mutex poisoned")
            .write_byte(REG_PWM_BASE + source_index as u8, duty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_voltage_matches_ite_gain() {
        assert_eq!(decode_voltage(100), 1.6);
    }

    #[test]
    fn decode_fan_rpm_zero_on_stall_sentinel() {
        assert_eq!(decode_fan_rpm(0xFF), 0.0);
    }

    #[test]
    fn read_voltage_reads_through_the_index_data_pair() {
        use crate::testutil::MockPortIo;
        let mut port = MockPortIo::new(vec![0x96]);
        let regs = WinbondRegisters::new(&mut port, 0x290);
        assert_eq!(regs.read_voltage_raw(0).unwrap(), 0x96);
    }
}
