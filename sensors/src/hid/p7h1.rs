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

//! AeroCool P7-H1 fan/RGB hub: a single polled status report carries all four fan
//! tachometers and two thermistor probes, so unlike Kraken X3's push model this driver
//! issues one request report per poll and decodes whatever comes back.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use hidapi::{DeviceInfo, HidApi, HidDevice};

use crate::chip::{ReadValue, SensorChip, Visibility};
use crate::error::{SensorError, SensorResult};
use crate::types::{Attribute, BusType, ChannelConfig, Identifier, SensorType, TypeConfig};

const VENDOR_ID: u16 = 0x2e97;
const PRODUCT_ID: u16 = 0x0001;

const REPORT_LEN: usize = 64;
const STATUS_REQUEST: u8 = 0xd0;
const FAN_COUNT: usize = 4;
const TEMP_COUNT: usize = 2;
const CACHE_TTL: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, Default)]
pub struct P7h1Reading {
    pub fan_rpm: [f64; FAN_COUNT],
    pub temp_celsius: [f64; TEMP_COUNT],
}

/// Fan tachometers are little-endian u16 RPM starting at byte 2; temperature probes are
/// signed tenths-of-a-degree little-endian i16 starting at byte 10. `0xFFFF` on a fan
/// channel means no fan is connected to that header.
pub fn decode_status_report(data: &[u8]) -> SensorResult<P7h1Reading> {
    if data.len() < REPORT_LEN {
        return Err(SensorError::transient(format!(
            "p7h1 report too short: {} bytes",
            data.len()
        )));
    }
    let mut reading = P7h1Reading::default();
    for i in 0..FAN_COUNT {
        let raw = u16::from_le_bytes([data[2 + i * 2], data[3 + i * 2]]);
        reading.fan_rpm[i] = if raw == 0xFFFF { 0.0 } else { raw as f64 };
    }
    for i in 0..TEMP_COUNT {
        let raw = i16::from_le_bytes([data[10 + i * 2], data[11 + i * 2]]);
        reading.temp_celsius[i] = raw as f64 / 10.0;
    }
    Ok(reading)
}

pub fn open_if_matching(api: &HidApi, info: &DeviceInfo) -> Option<P7h1Chip> {
    if info.vendor_id() != VENDOR_ID || info.product_id() != PRODUCT_ID {
        return None;
    }
    let device = info.open_device(api).ok()?;
    Some(P7h1Chip::new(device))
}

struct Cache {
    at: Instant,
    reading: P7h1Reading,
}

pub struct P7h1Chip {
    identifier: Identifier,
    config: ChannelConfig,
    device: Mutex<HidDevice>,
    cache: Mutex<Option<Cache>>,
}

impl P7h1Chip {
    fn new(device: HidDevice) -> Self {
        let mut config = ChannelConfig::default();
        config.sensors.insert(
            SensorType::Fan,
            TypeConfig {
                channel_attributes: vec![Attribute::INPUT | Attribute::LABEL; FAN_COUNT],
            },
        );
        config.sensors.insert(
            SensorType::Temp,
            TypeConfig {
                channel_attributes: vec![Attribute::INPUT | Attribute::LABEL; TEMP_COUNT],
            },
        );
        Self {
            identifier: Identifier {
                name: "p7h1".to_string(),
                hardware_type: "p7h1".to_string(),
                bus: BusType::Hid,
                addr: PRODUCT_ID as u32,
            },
            config,
            device: Mutex::new(device),
            cache: Mutex::new(None),
        }
    }

    fn poll(&self) -> SensorResult<P7h1Reading> {
        {
            let cache = self.cache.lock().expect("p7h1 cache mutex poisoned");
            if let Some(entry) = cache.as_ref() {
                if entry.at.elapsed() < CACHE_TTL {
                    return Ok(entry.reading);
                }
            }
        }
        let reading = {
            let device = self.device.lock().expect("p7h1 device mutex poisoned");
            let mut request = [0u8; REPORT_LEN];
            request[0] = STATUS_REQUEST;
            device
                .write(&request)
                .map_err(|e| SensorError::transient(format!("p7h1 status request: {e}")))?;
            let mut reply = [0u8; REPORT_LEN];
            device
                .read(&mut reply)
                .map_err(|e| SensorError::transient(format!("p7h1 status read: {e}")))?;
            decode_status_report(&reply)?
        };
        *self.cache.lock().expect("p7h1 cache mutex poisoned") = Some(Cache {
            at: Instant::now(),
            reading,
        });
        Ok(reading)
    }
}

impl SensorChip for P7h1Chip {
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
        let reading = self.poll()?;
        match t {
            SensorType::Fan => reading
                .fan_rpm
                .get(channel)
                .map(|v| ReadValue::Float(*v))
                .ok_or_else(|| SensorError::not_supported("fan channel out of range")),
            SensorType::Temp => reading
                .temp_celsius
                .get(channel)
                .map(|v| ReadValue::Float(*v))
                .ok_or_else(|| SensorError::not_supported("temp channel out of range")),
            _ => Err(SensorError::not_supported(format!("{t:?} not published"))),
        }
    }

    fn write(&self, _t: SensorType, _attr: Attribute, _channel: usize, _value: f64) -> SensorResult<()> {
        Err(SensorError::not_supported("p7h1 status endpoint is read-only"))
    }

    fn channel_label(&self, t: SensorType, channel: usize) -> String {
        match t {
            SensorType::Fan => format!("Fan {}", channel + 1),
            SensorType::Temp => format!("Probe {}", channel + 1),
            _ => format!("{}{}", crate::chip::type_tag(t), channel),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_fan_and_temperature_channels() {
        let mut data = [0u8; REPORT_LEN];
        let rpm_bytes = 1200u16.to_le_bytes();
        data[2] = rpm_bytes[0];
        data[3] = rpm_bytes[1];
        data[4] = 0xFF;
        data[5] = 0xFF; // fan 1 disconnected
        let temp_bytes = 305i16.to_le_bytes(); // 30.5C
        data[10] = temp_bytes[0];
        data[11] = temp_bytes[1];

        let reading = decode_status_report(&data).unwrap();
        assert_eq!(reading.fan_rpm[0], 1200.0);
        assert_eq!(reading.fan_rpm[1], 0.0);
        assert_eq!(reading.temp_celsius[0], 30.5);
    }

    #[test]
    fn short_report_is_transient_error() {
        assert!(decode_status_report(&[0u8; 4]).is_err());
    }
}
