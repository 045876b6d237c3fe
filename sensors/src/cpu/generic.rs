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

//! Shared [`SensorChip`] body every CPU family driver is built from: one channel per
//! package, dispatched through a [`PackageSensor`] that knows how to turn its family's raw
//! register layout into a single reading. Family drivers ([`super::amd17`], [`super::amd0f`],
//! [`super::amd10`], [`super::intel`]) only ever implement [`PackageSensor`]; none of them
//! touch [`crate::chip::SensorChip`] directly.

use std::time::Instant;

use crate::chip::{ReadValue, SensorChip, Visibility};
use crate::error::{SensorError, SensorResult};
use crate::types::{Attribute, ChannelConfig, Identifier, SensorType, TypeConfig};

/// One value a CPU family driver can produce per package: which [`SensorType`] it is and
/// how to read the current value for a given package index.
pub trait PackageSensor: Send + Sync {
    fn sensor_type(&self) -> SensorType;
    fn package_count(&self) -> usize;
    fn read_package(&self, package: usize, now: Instant) -> SensorResult<f64>;
    fn label(&self, package: usize) -> String {
        format!("{}{package}", crate::chip::type_tag(self.sensor_type()))
    }
}

/// A CPU chip exposing one or more [`PackageSensor`]s (e.g. AMD 17h exposes only package
/// power; Intel exposes only per-package temperature) under a common identity.
pub struct GenericCpuChip {
    identifier: Identifier,
    config: ChannelConfig,
    sensors: Vec<Box<dyn PackageSensor>>,
}

impl GenericCpuChip {
    pub fn new(hardware_type: &str, sensors: Vec<Box<dyn PackageSensor>>) -> Self {
        let mut config = ChannelConfig::default();
        for sensor in &sensors {
            config.sensors.insert(
                sensor.sensor_type(),
                TypeConfig {
                    channel_attributes: vec![Attribute::INPUT | Attribute::LABEL; sensor.package_count()],
                },
            );
        }
        Self {
            identifier: Identifier {
                name: hardware_type.to_string(),
                hardware_type: hardware_type.to_string(),
                bus: crate::types::BusType::Virtual,
                addr: 0,
            },
            config,
            sensors,
        }
    }

    fn sensor_for(&self, t: SensorType) -> Option<&dyn PackageSensor> {
        self.sensors.iter().find(|s| s.sensor_type() == t).map(|b| b.as_ref())
    }
}

impl SensorChip for GenericCpuChip {
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
        Visibility {
            readable: mask.contains(attr),
            writable: false,
        }
    }

    fn read(&self, t: SensorType, attr: Attribute, channel: usize) -> SensorResult<ReadValue> {
        let sensor = self
            .sensor_for(t)
            .ok_or_else(|| SensorError::not_supported(format!("{t:?} not published by this CPU")))?;
        if attr == Attribute::LABEL {
            return Ok(ReadValue::Text(sensor.label(channel)));
        }
        if attr != Attribute::INPUT {
            return Err(SensorError::not_supported(format!("{t:?} attr {attr:?} not published")));
        }
        let value = sensor.read_package(channel, Instant::now())?;
        Ok(ReadValue::Float(value))
    }

    fn write(&self, _t: SensorType, _attr: Attribute, _channel: usize, _value: f64) -> SensorResult<()> {
        Err(SensorError::not_supported("CPU channels are read-only"))
    }

    fn channel_label(&self, t: SensorType, channel: usize) -> String {
        self.sensor_for(t)
            .map(|s| s.label(channel))
            .unwrap_or_else(|| format!("{}{}", crate::chip::type_tag(t), channel))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct FakeSensor {
        t: SensorType,
        count: usize,
        calls: AtomicU32,
    }

    impl PackageSensor for FakeSensor {
        fn sensor_type(&self) -> SensorType {
            self.t
        }
        fn package_count(&self) -> usize {
            self.count
        }
        fn read_package(&self, package: usize, _now: Instant) -> SensorResult<f64> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(package as f64 + 1.0)
        }
    }

    #[test]
    fn reads_route_to_the_matching_sensor_type() {
        let chip = GenericCpuChip::new(
            "amd17",
            vec![Box::new(FakeSensor {
                t: SensorType::Power,
                count: 2,
                calls: AtomicU32::new(0),
            })],
        );
        let v0 = chip.read(SensorType::Power, Attribute::INPUT, 0).unwrap();
        let v1 = chip.read(SensorType::Power, Attribute::INPUT, 1).unwrap();
        assert_eq!(v0.as_f64(), Some(1.0));
        assert_eq!(v1.as_f64(), Some(2.0));
        assert!(chip.read(SensorType::Temp, Attribute::INPUT, 0).is_err());
    }

    #[test]
    fn label_falls_back_to_type_tag_when_type_is_absent() {
        let chip = GenericCpuChip::new("amd17", vec![]);
        assert_eq!(chip.channel_label(SensorType::Power, 0), "power0");
    }
}
