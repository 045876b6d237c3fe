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

//! Nuvoton NCT67xx register decode: voltage/temperature/fan reads, temperature-source
//! dedup, and PWM save/restore-on-drop.

use std::collections::HashMap;
use std::sync::Mutex;

use sensors_detect::port_io::PortIo;

use crate::error::{SensorError, SensorResult};
use crate::superio::port::PortWithBanks;

/// Gain applied to the raw voltage byte before the board-quirk divider formula.
pub const NUVOTON_VOLTAGE_GAIN: f64 = 0.008;

const BANK_SELECT_REG: u8 = 0x4E;
const VIN_BASE_REG: u8 = 0x20;
const TEMP_BASE_REG: u8 = 0x30; // 16-bit, two bytes per channel, bank 0
const TEMP_SOURCE_BASE_REG: u8 = 0x50; // one source-selector byte per temp register
const FAN_BASE_REG: u8 = 0x40; // 13-bit counter: hi at reg, low 5 bits at reg+1
const FAN_MIN_COUNT: u16 = 0x0001;
const FAN_MAX_COUNT: u16 = 0x1FFF;
const PWM_DUTY_BASE_REG: u8 = 0x60;
const PWM_MODE_BASE_REG: u8 = 0x68;
const PWM_MANUAL_MODE: u8 = 0x01;

/// Raw voltage byte -> volts, per the gain specified for Nuvoton parts.
pub fn decode_voltage(raw: u8) -> f64 {
    raw as f64 * NUVOTON_VOLTAGE_GAIN
}

/// Board-quirk divider applied after the raw gain: `V = raw + (raw - Vf) * Ri / Rf`.
pub fn apply_divider(raw_volts: f64, ri: f64, rf: f64, vf: f64) -> f64 {
    if rf == 0.0 {
        return raw_volts;
    }
    raw_volts + (raw_volts - vf) * ri / rf
}

/// `count = (hi << 5) | (lo & 0x1F)`. `0x1FFF` (all-ones, the 13-bit max) means "no fan
/// detected" -> 0 RPM rather than an implausible near-infinite speed; below the minimum
/// count the reading is too fast to trust and reported as NaN.
pub fn decode_fan_rpm(hi: u8, lo: u8) -> f64 {
    let count = ((hi as u16) << 5) | (lo as u16 & 0x1F);
    if count >= FAN_MAX_COUNT {
        0.0
    } else if count < FAN_MIN_COUNT {
        f64::NAN
    } else {
        1.35e6 / (count as f64 * 2.0)
    }
}

/// 16-bit register `(hi << 8) | lo`; value is `(signed hi << 1) | (lo >> 7)` divided by 2.
/// Range-checked to `-55..125`°C, NaN outside.
pub fn decode_temperature(hi: u8, lo: u8) -> f64 {
    let signed_hi = hi as i8 as i32;
    let raw = (signed_hi << 1) | ((lo >> 7) as i32);
    let celsius = raw as f64 / 2.0;
    if (-55.0..125.0).contains(&celsius) {
        celsius
    } else {
        f64::NAN
    }
}

/// Saved PWM state for restore-on-drop: `(mode, duty)` at the moment of the first write.
#[derive(Debug, Clone, Copy)]
struct SavedPwm {
    mode: u8,
    duty: u8,
}

pub struct NuvotonDriver<'a> {
    port: Mutex<PortWithBanks<'a>>,
    saved_pwm: Mutex<HashMap<usize, SavedPwm>>,
}

impl<'a> NuvotonDriver<'a> {
    pub fn new(io: &'a mut dyn PortIo, base_addr: u16) -> Self {
        let single = super::port::SingleBankPort::new(io, base_addr, base_addr + 1);
        Self {
            port: Mutex::new(PortWithBanks::new(single, BANK_SELECT_REG)),
            saved_pwm: Mutex::new(HashMap::new()),
        }
    }

    pub fn read_voltage_raw(&self, channel: usize) -> SensorResult<u8> {
        let mut port = self.port.lock().expect("superio port mutex poisoned");
        port.read_byte(0, VIN_BASE_REG + channel as u8)
    }

    pub fn read_temperature_raw(&self, channel: usize) -> SensorResult<(u8, u8)> {
        let mut port = self.port.lock().expect("superio port mutex poisoned");
        let reg = TEMP_BASE_REG + (channel as u8) * 2;
        let hi = port.read_byte(0, reg)?;
        let lo = port.read_byte(0, reg + 1)?;
        Ok((hi, lo))
    }

    pub fn read_temperature_source(&self, channel: usize) -> SensorResult<u8> {
        let mut port = self.port.lock().expect("superio port mutex poisoned");
        port.read_byte(0, TEMP_SOURCE_BASE_REG + channel as u8)
    }

    pub fn read_fan_raw(&self, channel: usize) -> SensorResult<(u8, u8)> {
        let mut port = self.port.lock().expect("superio port mutex poisoned");
        let reg = FAN_BASE_REG + (channel as u8) * 2;
        let hi = port.read_byte(0, reg)?;
        let lo = port.read_byte(0, reg + 1)?;
        Ok((hi, lo))
    }

    pub fn read_pwm_duty(&self, channel: usize) -> SensorResult<u8> {
        let mut port = self.port.lock().expect("superio port mutex poisoned");
        port.read_byte(0, PWM_DUTY_BASE_REG + channel as u8)
    }

    /// NaN restores the saved registers (if any write ever happened on this channel); a
    /// finite value saves the current registers on first write, then sets manual mode and
    /// writes the new duty cycle.
    pub fn write_pwm(&self, channel: usize, value: f64) -> SensorResult<()> {
        let mut port = self.port.lock().expect("superio port mutex poisoned");
        let mut saved = self.saved_pwm.lock().expect("saved pwm mutex poisoned");

        if value.is_nan() {
            if let Some(s) = saved.remove(&channel) {
                port.write_byte(0, PWM_MODE_BASE_REG + channel as u8, s.mode)?;
                port.write_byte(0, PWM_DUTY_BASE_REG + channel as u8, s.duty)?;
            }
            return Ok(());
        }

        if !saved.contains_key(&channel) {
            let mode = port.read_byte(0, PWM_MODE_BASE_REG + channel as u8)?;
            let duty = port.read_byte(0, PWM_DUTY_BASE_REG + channel as u8)?;
            saved.insert(channel, SavedPwm { mode, duty });
        }

        port.write_byte(0, PWM_MODE_BASE_REG + channel as u8, PWM_MANUAL_MODE)?;
        let clamped = value.clamp(0.0, 255.0) as u8;
        port.write_byte(0, PWM_DUTY_BASE_REG + channel as u8, clamped)
    }

    /// On drop, every channel that was ever written must be restored — callers invoke this
    /// explicitly from `Drop` since async destructors don't exist and this needs the
    /// mutex-guarded port.
    pub fn restore_all_pwm(&self) -> SensorResult<()> {
        let channels: Vec<usize> = self
            .saved_pwm
            .lock()
            .expect("saved pwm mutex poisoned")
            .keys()
            .copied()
            .collect();
        for channel in channels {
            self.write_pwm(channel, f64::NAN)?;
        }
        Ok(())
    }
}

impl Drop for NuvotonDriver<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.restore_all_pwm() {
            log::warn!("failed to restore PWM registers on drop: {e}");
        }
    }
}

/// Deduplicates temperature sources: when more than one register reports the same
/// upstream source (PECI0, CPUTIN, …), only the first-seen register's reading is kept in
/// the output channel, per the source-mask rule. Returns the indices of registers to keep,
/// in encounter order.
pub fn dedup_temperature_sources(sources: &[u8]) -> Vec<usize> {
    let mut seen = 0u64;
    let mut keep = Vec::new();
    for (i, &source) in sources.iter().enumerate() {
        let bit = 1u64 << source;
        if seen & bit == 0 {
            seen |= bit;
            keep.push(i);
        }
    }
    keep
}

pub fn map_port_error(e: impl std::fmt::Display) -> SensorError {
    SensorError::transient(format!("nuvoton register read: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::MockPortIo;

    #[test]
    fn nct6798d_crosshair_vcore_is_plausible() {
        // Chosen raw byte so 0.008 V/LSB * raw falls inside the Vcore plausibility window
        // from the spec's end-to-end scenario (0.5..2.0 V). 150 * 0.008 = 1.2V.
        let raw = 150u8;
        let mut mock = MockPortIo::new(vec![raw]);
        let driver = NuvotonDriver::new(&mut mock, 0xA20);
        let raw_read = driver.read_voltage_raw(0).unwrap();
        let volts = apply_divider(decode_voltage(raw_read), 0.0, 1.0, 0.0);
        assert!((0.5..2.0).contains(&volts), "Vcore {volts} not plausible");
    }

    #[test]
    fn fan_count_at_max_sentinel_is_zero_not_infinity() {
        // count = 0x1FFF: hi = 0xFF, lo = 0xFF & 0x1F = 0x1F
        assert_eq!(decode_fan_rpm(0xFF, 0xFF), 0.0);
    }

    #[test]
    fn fan_count_below_min_is_nan() {
        assert!(decode_fan_rpm(0, 0).is_nan());
    }

    #[test]
    fn temperature_out_of_range_is_nan() {
        // hi = 0x7F (127), well above the 125C ceiling once halved and shifted
        assert!(decode_temperature(0x7F, 0x00).is_nan());
    }

    #[test]
    fn temperature_in_range_decodes() {
        // hi = 50 (signed), lo top bit clear -> raw = 100, /2 = 50.0C
        assert_eq!(decode_temperature(50, 0x00), 50.0);
    }

    #[test]
    fn dedup_keeps_first_occurrence_of_each_source() {
        // sources: PECI0, SYSTIN, PECI0 again, CPUTIN
        let sources = [0u8, 1, 0, 2];
        assert_eq!(dedup_temperature_sources(&sources), vec![0, 1, 3]);
    }

    #[test]
    fn pwm_write_then_nan_restores_saved_registers() {
        // sequence: read mode(0x68)=0x00, read duty(0x60)=0x80 (saved on first write),
        // then the NaN write restores those same two values with no further reads.
        let mut mock = MockPortIo::new(vec![0x00, 0x80]);
        {
            let driver = NuvotonDriver::new(&mut mock, 0xA20);
            driver.write_pwm(0, 200.0).unwrap();
            driver.write_pwm(0, f64::NAN).unwrap();
        }
        let restore_writes = &mock.writes[mock.writes.len() - 2..];
        assert_eq!(restore_writes[0].1, 0x00); // restored mode
        assert_eq!(restore_writes[1].1, 0x80); // restored duty
    }
}
