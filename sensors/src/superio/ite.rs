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

//! ITE IT87xx hardware-monitor logical device. Voltages are an 8-bit ADC at 16mV/count,
//! temperatures are direct signed-byte Celsius, and fan tachometers are an 8-bit divisor
//! count clocked at 1.35MHz (`rpm = 1_350_000 / (count * 2)`), all accessed through the
//! chip's own indexed register window (index register at offset 5, data at offset 6 from
//! the hardware-monitor base address) rather than the Super-I/O config-mode ports.
//!
//! Entry sequence `0x87, 0x01, 0x55, 0x55` (or `0x55, 0xAA` on the `0x4E` pair) belongs to
//! chip identification in `sensors_detect`; this module only ever talks to the
//! already-activated hardware-monitor base address.

use sensors_detect::port_io::PortIo;

use crate::error::{SensorError, SensorResult};
use crate::superio::generic_chip::SuperIoRegisters;

const INDEX_OFFSET: u16 = 5;
const DATA_OFFSET: u16 = 6;

const REG_VIN_BASE: u8 = 0x20;
const REG_TEMP_BASE: u8 = 0x29;
const REG_FAN_BASE: u8 = 0x0D;
const REG_PWM_BASE: u8 = 0x15;

const VOLTAGE_MILLIVOLTS_PER_COUNT: f64 = 16.0;
const FAN_CLOCK_HZ: f64 = 1_350_000.0;

/// `raw` is a free-running 8-bit ADC count; each LSB is 16mV before any board divider.
pub fn decode_voltage(raw: u8) -> f64 {
    raw as f64 * VOLTAGE_MILLIVOLTS_PER_COUNT / 1000.0
}

/// IT87 temperature registers hold signed Celsius directly, one register per channel.
pub fn decode_temperature(raw: u8) -> f64 {
    raw as i8 as f64
}

/// `0xFF` means "no tachometer pulses counted" (a stalled or absent fan), not a real
/// divisor; zero is excluded too since `count * 2` would otherwise divide by zero.
pub fn decode_fan_rpm(count: u8) -> f64 {
    if count == 0 || count == 0xFF {
        0.0
    } else {
        FAN_CLOCK_HZ / (count as f64 * 2.0)
    }
}

pub struct IteRegisters<'a> {
    port: std::sync::Mutex<&'a mut dyn PortIo>,
    base_addr: u16,
}

impl<'a> IteRegisters<'a> {
    pub fn new(port: &'a mut dyn PortIo, base_addr: u16) -> Self {
        Self {
            port: std::sync::Mutex::new(port),
            base_addr,
        }
    }

    fn read_reg(&self, reg: u8) -> SensorResult<u8> {
        let mut port = self.port.lock().expect("it87 port mutex poisoned");
        port.outb(self.base_addr + INDEX_OFFSET, reg)
            .map_err(|e| SensorError::transient(format!("it87 index write: {e}")))?;
        port.inb(self.base_addr + DATA_OFFSET)
            .map_err(|e| SensorError::transient(format!("it87 data read: {e}")))
    }

    fn write_reg(&self, reg: u8, value: u8) -> SensorResult<()> {
        let mut port = self.port.lock().expect("it87 port mutex poisoned");
        port.outb(self.base_addr + INDEX_OFFSET, reg)
            .map_err(|e| SensorError::transient(format!("it87 index write: {e}")))?;
        port.outb(self.base_addr + DATA_OFFSET, value)
            .map_err(|e| SensorError::transient(format!("it87 data write: {e}")))
    }
}

impl SuperIoRegisters for IteRegisters<'_> {
    fn read_voltage_raw(&self, source_index: usize) -> SensorResult<u8> {
        self.read_reg(REG_VIN_BASE + source_index as u8)
    }

    fn decode_voltage(&self, raw: u8) -> f64 {
        decode_voltage(raw)
    }

    fn read_temperature(&self, source_index: usize) -> SensorResult<f64> {
        Ok(decode_temperature(self.read_reg(REG_TEMP_BASE + source_index as u8)?))
    }

    fn read_fan_rpm(&self, source_index: usize) -> SensorResult<f64> {
        Ok(decode_fan_rpm(self.read_reg(REG_FAN_BASE + source_index as u8)?))
    }

    fn read_pwm_duty(&self, source_index: usize) -> SensorResult<u8> {
        self.read_reg(REG_PWM_BASE + source_index as u8)
    }

    fn write_pwm_duty(&self, source_index: usize, duty: u8) -> SensorResult<()> {
        self.write_reg(REG_PWM_BASE + source_index as u8, duty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_voltage_applies_16mv_lsb() {
        // 150 counts * 16mV = 2.4V
        assert_eq!(decode_voltage(150), 2.4);
    }

    #[test]
    fn decode_temperature_is_signed_direct_celsius() {
        assert_eq!(decode_temperature(45), 45.0);
        assert_eq!(decode_temperature(0xFF), -1.0);
    }

    #[test]
    fn decode_fan_rpm_matches_clock_formula() {
        // 1_350_000 / (500 * 2) = 1350
        assert_eq!(decode_fan_rpm(500), 1350.0);
    }

    #[test]
    fn decode_fan_rpm_treats_stalled_sentinel_as_zero() {
        assert_eq!(decode_fan_rpm(0xFF), 0.0);
        assert_eq!(decode_fan_rpm(0), 0.0);
    }

    #[test]
    fn read_reg_issues_index_then_data_transaction() {
        use crate::testutil::MockPortIo;
        let mut port = MockPortIo::new(vec![0x99]);
        let regs = IteRegisters::new(&mut port, 0x290);
        assert_eq!(regs.read_reg(REG_VIN_BASE).unwrap(), 0x99);
    }
}
