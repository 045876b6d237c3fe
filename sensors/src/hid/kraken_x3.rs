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

//! NZXT Kraken X3 AIO: the device pushes a 64-byte status report roughly every 500ms
//! without being asked, so the driver side is a background reader that just decodes
//! whatever the last report was rather than issuing request/response transactions.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use hidapi::{DeviceInfo, HidApi};

use crate::chip::{ReadValue, SensorChip, Visibility};
use crate::error::{SensorError, SensorResult};
use crate::types::{Attribute, BusType, ChannelConfig, Identifier, SensorType, TypeConfig};

pub const REPORT_LEN: usize = 64;
pub const POLL_INTERVAL_MS: u64 = 500;

const VENDOR_ID: u16 = 0x1e71;
const PRODUCT_ID: u16 = 0x3008;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KrakenReading {
    pub liquid_temp_celsius: f64,
    pub pump_rpm: f64,
}

/// `data[15]` is whole degrees, `data[16]` tenths; `data[17..19]` is the pump speed as a
/// little-endian u16. Byte 0/1 (`0x75, 0x02`) identify the status report type and are
/// validated so a firmware update that reshuffles the layout fails loudly instead of
/// silently returning garbage.
pub fn decode_status_report(data: &[u8]) -> SensorResult<KrakenReading> {
    if data.len() < REPORT_LEN {
        return Err(SensorError::transient(format!(
            "kraken x3 report too short: {} bytes",
            data.len()
        )));
    }
    if data[0] != 0x75 || data[1] != 0x02 {
        return Err(SensorError::transient(format!(
            "unrecognized kraken x3 report type {:#04x}{:02x}",
            data[0], data[1]
        )));
    }
    let whole = data[15] as f64;
    let tenths = data[16] as f64 / 10.0;
    let pump_rpm = u16::from_le_bytes([data[17], data[18]]) as f64;
    Ok(KrakenReading {
        liquid_temp_celsius: whole + tenths,
        pump_rpm,
    })
}

/// Opens `info` as a live [`KrakenX3Chip`] if its USB IDs match a Kraken X3, spawning the
/// background reader thread that keeps [`KrakenReading`]s flowing in. Any other device
/// returns `None` so callers can try it against the next candidate driver.
pub fn open_if_matching(api: &HidApi, info: &DeviceInfo) -> Option<KrakenX3Chip> {
    if info.vendor_id() != VENDOR_ID || info.product_id() != PRODUCT_ID {
        return None;
    }
    let device = info.open_device(api).ok()?;
    Some(KrakenX3Chip::spawn(device))
}

/// `SensorChip` façade over the background reader: one temperature channel (liquid inlet)
/// and one fan channel (pump speed), always published but unreadable until the first
/// report arrives.
pub struct KrakenX3Chip {
    identifier: Identifier,
    config: ChannelConfig,
    last: Arc<Mutex<Option<KrakenReading>>>,
}

impl KrakenX3Chip {
    fn spawn(device: hidapi::HidDevice) -> Self {
        let last = Arc::new(Mutex::new(None));
        let reader_last = Arc::clone(&last);
        std::thread::spawn(move || loop {
            let mut buf = [0u8; REPORT_LEN];
            match device.read(&mut buf) {
                Ok(n) if n >= REPORT_LEN => {
                    if let Ok(reading) = decode_status_report(&buf) {
                        *reader_last.lock().expect("kraken reading mutex poisoned") = Some(reading);
                    }
                }
                _ => std::thread::sleep(Duration::from_millis(POLL_INTERVAL_MS)),
            }
        });

        let mut config = ChannelConfig::default();
        config.sensors.insert(
            SensorType::Temp,
            TypeConfig {
                channel_attributes: vec![Attribute::INPUT | Attribute::LABEL],
            },
        );
        config.sensors.insert(
            SensorType::Fan,
            TypeConfig {
                channel_attributes: vec![Attribute::INPUT | Attribute::LABEL],
            },
        );

        Self {
            identifier: Identifier {
                name: "kraken-x3".to_string(),
                hardware_type: "kraken-x3".to_string(),
                bus: BusType::Hid,
                addr: PRODUCT_ID as u32,
            },
            config,
            last,
        }
    }
}

impl SensorChip for KrakenX3Chip {
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
        let reading = self
            .last
            .lock()
            .expect("kraken reading mutex poisoned")
            .ok_or_else(|| SensorError::transient("no kraken x3 status report received yet"))?;
        match t {
            SensorType::Temp => Ok(ReadValue::Float(reading.liquid_temp_celsius)),
            SensorType::Fan => Ok(ReadValue::Float(reading.pump_rpm)),
            _ => Err(SensorError::not_supported(format!("{t:?} not published"))),
        }
    }

    fn write(&self, _t: SensorType, _attr: Attribute, _channel: usize, _value: f64) -> SensorResult<()> {
        Err(SensorError::not_supported("kraken x3 status endpoint is read-only"))
    }

    fn channel_label(&self, t: SensorType, _channel: usize) -> String {
        match t {
            SensorType::Temp => "Liquid".to_string(),
            SensorType::Fan => "Pump".to_string(),
            _ => crate::chip::type_tag(t).to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthetic_status_report_decodes_to_documented_reading() {
        let mut data = [0u8; REPORT_LEN];
        data[0] = 0x75;
        data[1] = 0x02;
        data[15] = 28;
        data[16] = 5;
        let rpm_bytes = 1000u16.to_le_bytes();
        data[17] = rpm_bytes[0];
        data[18] = rpm_bytes[1];

        let reading = decode_status_report(&data).unwrap();
        assert_eq!(reading.liquid_temp_celsius, 28.5);
        assert_eq!(reading.pump_rpm, 1000.0);
    }

    #[test]
    fn short_report_is_transient_error() {
        assert!(decode_status_report(&[0x75, 0x02]).is_err());
    }

    #[test]
    fn wrong_report_type_is_transient_error() {
        let mut data = [0u8; REPORT_LEN];
        data[0] = 0x01;
        assert!(decode_status_report(&data).is_err());
    }
}
