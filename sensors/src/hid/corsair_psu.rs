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

//! Corsair HXi/RMi series PSUs: a request/response HID protocol (one command byte, one
//! rail-select byte, a LINEAR11-encoded reply) rather than Kraken X3's unsolicited push
//! reports. Per-rail critical (OCP) thresholds are read once and cached, since they're
//! fixed configuration the PSU reports on every query as if it were a live reading.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use hidapi::{DeviceInfo, HidApi, HidDevice};

use crate::chip::{ReadValue, SensorChip, Visibility};
use crate::error::{SensorError, SensorResult};
use crate::types::{Attribute, BusType, ChannelConfig, Identifier, SensorType, TypeConfig};

const VENDOR_ID: u16 = 0x1b1c;
const PRODUCT_ID: u16 = 0x1c05;

const REPORT_LEN: usize = 64;
const CRITICAL_CACHE_TTL: Duration = Duration::from_secs(30);

const CMD_SELECT_RAIL: u8 = 0x00;
const CMD_READ_VOLTAGE: u8 = 0x88;
const CMD_READ_CURRENT: u8 = 0x8c;
const CMD_READ_POWER: u8 = 0x96;
const CMD_READ_OCP_LIMIT: u8 = 0x46;

const RAILS: [(u8, &str); 3] = [(0, "+12V"), (1, "+5V"), (2, "+3.3V")];

/// Decodes a PMBus LINEAR11 word: a 5-bit two's-complement exponent in the top bits and an
/// 11-bit two's-complement mantissa in the bottom bits, `value = mantissa * 2^exponent`.
pub fn decode_linear11(raw: u16) -> f64 {
    let exponent = (raw as i16) >> 11;
    let raw_mantissa = raw & 0x07FF;
    let mantissa = if raw_mantissa & 0x0400 != 0 {
        raw_mantissa as i16 - 0x0800
    } else {
        raw_mantissa as i16
    };
    mantissa as f64 * 2f64.powi(exponent as i32)
}

pub fn open_if_matching(api: &HidApi, info: &DeviceInfo) -> Option<CorsairPsuChip> {
    if info.vendor_id() != VENDOR_ID || info.product_id() != PRODUCT_ID {
        return None;
    }
    let device = info.open_device(api).ok()?;
    Some(CorsairPsuChip::new(device))
}

struct CachedCritical {
    at: Instant,
    amps: f64,
}

/// One voltage + one current channel per rail in [`RAILS`], indexed in the same order as the
/// table; the critical-threshold read only ever feeds `Attribute::CRIT`, never `INPUT`.
pub struct CorsairPsuChip {
    identifier: Identifier,
    config: ChannelConfig,
    device: Mutex<HidDevice>,
    critical_cache: Mutex<HashMap<u8, CachedCritical>>,
}

impl CorsairPsuChip {
    fn new(device: HidDevice) -> Self {
        let mut config = ChannelConfig::default();
        config.sensors.insert(
            SensorType::In,
            TypeConfig {
                channel_attributes: vec![Attribute::INPUT | Attribute::LABEL; RAILS.len()],
            },
        );
        config.sensors.insert(
            SensorType::Curr,
            TypeConfig {
                channel_attributes: vec![
                    Attribute::INPUT | Attribute::LABEL | Attribute::CRIT;
                    RAILS.len()
                ],
            },
        );
        config.sensors.insert(
            SensorType::Power,
            TypeConfig {
                channel_attributes: vec![Attribute::INPUT | Attribute::LABEL; RAILS.len()],
            },
        );
        Self {
            identifier: Identifier {
                name: "corsair-psu".to_string(),
                hardware_type: "corsair-psu".to_string(),
                bus: BusType::Hid,
                addr: PRODUCT_ID as u32,
            },
            config,
            device: Mutex::new(device),
            critical_cache: Mutex::new(HashMap::new()),
        }
    }

    fn transact(&self, rail: u8, command: u8) -> SensorResult<f64> {
        let device = self.device.lock().expect("corsair psu device mutex poisoned");
        let mut select = [0u8; REPORT_LEN];
        select[0] = CMD_SELECT_RAIL;
        select[1] = rail;
        device
            .write(&select)
            .map_err(|e| SensorError::transient(format!("corsair psu rail select: {e}")))?;

        let mut request = [0u8; REPORT_LEN];
        request[0] = command;
        device
            .write(&request)
            .map_err(|e| SensorError::transient(format!("corsair psu command write: {e}")))?;

        let mut reply = [0u8; REPORT_LEN];
        device
            .read(&mut reply)
            .map_err(|e| SensorError::transient(format!("corsair psu reply read: {e}")))?;
        let raw = u16::from_le_bytes([reply[1], reply[2]]);
        Ok(decode_linear11(raw))
    }

    fn critical_amps(&self, rail: u8) -> SensorResult<f64> {
        {
            let cache = self.critical_cache.lock().expect("corsair psu critical cache poisoned");
            if let Some(entry) = cache.get(&rail) {
                if entry.at.elapsed() < CRITICAL_CACHE_TTL {
                    return Ok(entry.amps);
                }
            }
        }
        let amps = self.transact(rail, CMD_READ_OCP_LIMIT)?;
        self.critical_cache
            .lock()
            .expect("corsair psu critical cache poisoned")
            .insert(rail, CachedCritical { at: Instant::now(), amps });
        Ok(amps)
    }
}

impl SensorChip for CorsairPsuChip {
    fn config(&self) -> &ChannelConfig {
        &self.config
    }

    fn identifier(&self) -> &Identifier {
        &self.identifier
    }

    fn is_visible(&self, t: SensorType, attr: Attribute, channel: usize) -> Visibility {
        let Some(mask) = self.config.attributes(t, channel) else {
            return Visibility::default();
        };
        if !mask.contains(attr) {
            return Visibility::default();
        }
        Visibility {
            readable: true,
            writable: false,
        }
    }

    fn read(&self, t: SensorType, attr: Attribute, channel: usize) -> SensorResult<ReadValue> {
        if !self.is_visible(t, attr, channel).readable {
            return Err(SensorError::not_supported(format!(
                "{t:?} attr {attr:?} channel {channel} not published by this chip"
            )));
        }
        if attr == Attribute::LABEL {
            return Ok(ReadValue::Text(self.channel_label(t, channel)));
        }
        let (rail, _) = RAILS
            .get(channel)
            .ok_or_else(|| SensorError::not_supported("rail channel out of range"))?;
        match (t, attr) {
            (SensorType::In, Attribute::INPUT) => Ok(ReadValue::Float(self.transact(*rail, CMD_READ_VOLTAGE)?)),
            (SensorType::Curr, Attribute::INPUT) => Ok(ReadValue::Float(self.transact(*rail, CMD_READ_CURRENT)?)),
            (SensorType::Curr, Attribute::CRIT) => Ok(ReadValue::Float(self.critical_amps(*rail)?)),
            (SensorType::Power, Attribute::INPUT) => Ok(ReadValue::Float(self.transact(*rail, CMD_READ_POWER)?)),
            _ => Err(SensorError::not_supported(format!("{t:?} attr {attr:?} not published"))),
        }
    }

    fn write(&self, _t: SensorType, _attr: Attribute, _channel: usize, _value: f64) -> SensorResult<()> {
        Err(SensorError::not_supported("corsair psu rails are read-only"))
    }

    fn channel_label(&self, t: SensorType, channel: usize) -> String {
        match RAILS.get(channel) {
            Some((_, label)) => label.to_string(),
            None => format!("{}{}", crate::chip::type_tag(t), channel),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_linear11_handles_positive_exponent() {
        // mantissa 1, exponent 4 -> 1 * 2^4 = 16.0 (e.g. a 16A OCP limit)
        let raw: u16 = (4u16 << 11) | 1;
        assert_eq!(decode_linear11(raw), 16.0);
    }

    #[test]
    fn decode_linear11_handles_negative_exponent() {
        // mantissa 750, exponent -5 -> 750 / 32 = 23.4375 (a plausible +12V reading)
        let exponent: i16 = -5;
        let raw = (((exponent as u16) & 0x1F) << 11) | 750;
        assert_eq!(decode_linear11(raw), 23.4375);
    }

    #[test]
    fn decode_linear11_handles_negative_mantissa() {
        let raw: u16 = 0x0800 | 0x07FF; // exponent 0, mantissa -1
        assert_eq!(decode_linear11(raw), -1.0);
    }
}
