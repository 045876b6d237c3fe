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

//! Fintek F71882FG-family hardware-monitor logical device. Voltages use an 8mV LSB (half
//! the Winbond/ITE gain), temperatures are direct signed-byte Celsius, and fan tachometers
//! are a 16-bit count clocked at 1.5MHz rather than an 8-bit divisor, so a stalled fan reads
//! as the all-ones sentinel across two bytes instead of one.

use crate::error::SensorResult;
use crate::superio::generic_chip::SuperIoRegisters;
use crate::superio::port::SingleBankPort;

const REG_VIN_BASE: u8 = 0x10;
const REG_TEMP_BASE: u8 = 0x70;
const REG_FAN_COUNT_BASE: u8 = 0xA0; // 16-bit, two registers per channel
const REG_PWM_BASE: u8 = 0x60;

const VOLTAGE_MILLIVOLTS_PER_COUNT: f64 = 8.0;
const FAN_CLOCK_HZ: f64 = 1_500_000.0;
const FAN_STALL_SENTINEL: u16 = 0xFFFF;

pub fn decode_voltage(raw: u8) -> f64 {
    raw as f64 * VOLTAGE_MILLIVOLTS_PER_COUNT / 1000.0
}

pub fn decode_temperature(raw: u8) -> f64 {
    raw as i8 as f64
}

/// `count` is `(hi << 8) | lo`; the all-ones sentinel means the tachometer counter never
/// saw a pulse before its sample window elapsed.
pub fn decode_fan_rpm(count: u16) -> f64 {
    if count == 0 || count == FAN_STALL_SENTINEL {
        0.0
    } else {
        FAN_CLOCK_HZ / count as f64
    }
}

pub struct FintekRegisters<'a> {
    port: std::sync::Mutex<SingleBankPort<'a>>,
}

impl<'a> FintekRegisters<'a> {
    pub fn new(io: &'a mut dyn sensors_detect::port_io::PortIo, base_addr: u16) -> Self {
        Self {
            port: std::sync::Mutex::new(SingleBankPort::new(io, base_addr, base_addr + 1)),
        }
    }
}

impl SuperIoRegisters for FintekRegisters<'_> {
    fn read_voltage_raw(&self, source_index: usize) -> SensorResult<u8> {
        self.port
            .lock()
            .expect("fintek port mutex poisoned")
            .read_byte(REG_VIN_BASE + source_index as u8)
    }

    fn decode_voltage(&self, raw: u8) -> f64 {
        decode_voltage(raw)
    }

    fn read_temperature(&self, source_index: usize) -> SensorResult<f64> {
        let raw = self
            .port
            .lock()
            .expect("fintek port mutex poisoned")
            .read_byte(REG_TEMP_BASE + source_index as u8)?;
        Ok(decode_temperature(raw))
    }

    fn read_fan_rpm(&self, source_index: usize) -> SensorResult<f64> {
        let reg = REG_FAN_COUNT_BASE + (source_index as u8 * 2);
        let count = self
            .port
            .lock()
            .expect("fintek port mutex poisoned")
            .read_word(reg)?;
        Ok(decode_fan_rpm(count))
    }

    fn read_pwm_duty(&self, source_index: usize) -> SensorResult<u8> {
        self.port
            .lock()
            .expect("fintek port mutex poisoned")
            .read_byte(REG_PWM_BASE + source_index as u8)
    }

    fn write_pwm_duty(&self, source_index: usize, duty: u8) -> SensorResult<()> {
        self.port
            .lock()
            .expect("fintek port mutex poisoned")
            .write_byte(REG_PWM_BASE + source_index as u8, duty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_voltage_uses_8mv_lsb() {
        assert_eq!(decode_voltage(200), 1.6);
    }

    #[test]
    fn decode_fan_rpm_matches_1_5mhz_clock() {
        assert_eq!(decode_fan_rpm(1500), 1000.0);
    }

    #[test]
    fn decode_fan_rpm_zero_on_stall_sentinel() {
        assert_eq!(decode_fan_rpm(0xFFFF), 0.0);
        assert_eq!(decode_fan_rpm(0), 0.0);
    }

    #[test]
    fn read_fan_rpm_reads_the_16_bit_count() {
        use crate::testutil::MockPortIo;
        let mut port = MockPortIo::new(vec![0x05, 0xDC]); // 0x05DC = 1500
        let regs = FintekRegisters::new(&mut port, 0x290);
        assert_eq!(regs.read_fan_rpm(0).unwrap(), 1000.0);
    }
}
