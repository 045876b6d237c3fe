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

//! The channel-mapping and `SensorChip` plumbing shared by every Super-I/O vendor driver
//! except Nuvoton's ([`super::Nct679xChip`] predates this and keeps its own copy rather
//! than being retrofit onto a trait it was never designed against). A vendor module only
//! has to implement [`SuperIoRegisters`] — the raw-register read/write and decode formulas
//! for its own chip family — and gets channel lookup, visibility, and labeling for free.

use board_config::{Chip, ChannelsConfiguration, Manufacturer};

use crate::chip::{ReadValue, SensorChip, Visibility};
use crate::error::{SensorError, SensorResult};
use crate::superio::board_config;
use crate::types::{Attribute, ChannelConfig, Identifier, SensorType, TypeConfig};

/// One vendor family's register access and decode formulas. `read_voltage_raw`/
/// `decode_voltage` are split because the divider math in [`GenericSuperIoChip::read`]
/// needs the pre-divider volts value, not just a finished reading.
pub trait SuperIoRegisters: Send + Sync {
    fn read_voltage_raw(&self, source_index: usize) -> SensorResult<u8>;
    fn decode_voltage(&self, raw: u8) -> f64;
    fn read_temperature(&self, source_index: usize) -> SensorResult<f64>;
    fn read_fan_rpm(&self, source_index: usize) -> SensorResult<f64>;
    fn read_pwm_duty(&self, source_index: usize) -> SensorResult<u8>;
    fn write_pwm_duty(&self, source_index: usize, duty: u8) -> SensorResult<()>;
}

pub struct GenericSuperIoChip<R> {
    identifier: Identifier,
    registers: R,
    channels: ChannelsConfiguration,
    config: ChannelConfig,
}

impl<R: SuperIoRegisters> GenericSuperIoChip<R> {
    pub fn new(
        registers: R,
        base_addr: u16,
        hardware_type: &str,
        manufacturer: Manufacturer,
        board_model: &str,
        chip: Chip,
        default_counts: board_config::ChannelCounts,
    ) -> Self {
        let channels = board_config::super_io_configuration(manufacturer, board_model, chip, default_counts);

        let mut config = ChannelConfig::default();
        config.sensors.insert(
            SensorType::In,
            TypeConfig {
                channel_attributes: vec![Attribute::INPUT | Attribute::LABEL; channels.voltage.len()],
            },
        );
        config.sensors.insert(
            SensorType::Temp,
            TypeConfig {
                channel_attributes: vec![Attribute::INPUT | Attribute::LABEL; channels.temperature.len()],
            },
        );
        config.sensors.insert(
            SensorType::Fan,
            TypeConfig {
                channel_attributes: vec![Attribute::INPUT | Attribute::LABEL; channels.fan.len()],
            },
        );
        config.sensors.insert(
            SensorType::Pwm,
            TypeConfig {
                channel_attributes: vec![Attribute::INPUT | Attribute::LABEL; channels.pwm.len()],
            },
        );

        Self {
            identifier: Identifier {
                name: hardware_type.to_string(),
                hardware_type: hardware_type.to_string(),
                bus: crate::types::BusType::Isa,
                addr: base_addr as u32,
            },
            registers,
            channels,
            config,
        }
    }
}

impl<R: SuperIoRegisters> SensorChip for GenericSuperIoChip<R> {
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
            writable: t == SensorType::Pwm && attr == Attribute::INPUT,
        }
    }

    fn read(&self, t: SensorType, attr: Attribute, channel: usize) -> SensorResult<ReadValue> {
        if self.is_visible(t, attr, channel) == (Visibility { readable: false, writable: false }) {
            return Err(SensorError::not_supported(format!(
                "{t:?} attr {attr:?} channel {channel} not published by this chip"
            )));
        }
        if attr == Attribute::LABEL {
            return Ok(ReadValue::Text(self.channel_label(t, channel)));
        }
        match t {
            SensorType::In => {
                let entry = self
                    .channels
                    .voltage
                    .get(channel)
                    .ok_or_else(|| SensorError::not_supported("voltage channel out of range"))?;
                let raw = self.registers.read_voltage_raw(entry.source_index)?;
                let raw_volts = self.registers.decode_voltage(raw);
                Ok(ReadValue::Float(crate::superio::nuvoton::apply_divider(
                    raw_volts, entry.ri, entry.rf, entry.vf,
                )))
            }
            SensorType::Temp => {
                let entry = self
                    .channels
                    .temperature
                    .get(channel)
                    .ok_or_else(|| SensorError::not_supported("temp channel out of range"))?;
                Ok(ReadValue::Float(self.registers.read_temperature(entry.source_index)?))
            }
            SensorType::Fan => {
                let entry = self
                    .channels
                    .fan
                    .get(channel)
                    .ok_or_else(|| SensorError::not_supported("fan channel out of range"))?;
                Ok(ReadValue::Float(self.registers.read_fan_rpm(entry.source_index)?))
            }
            SensorType::Pwm => {
                let entry = self
                    .channels
                    .pwm
                    .get(channel)
                    .ok_or_else(|| SensorError::not_supported("pwm channel out of range"))?;
                let duty = self.registers.read_pwm_duty(entry.source_index)?;
                Ok(ReadValue::Float(duty as f64 / 255.0))
            }
            _ => Err(SensorError::not_supported(format!("{t:?} not published"))),
        }
    }

    fn write(&self, t: SensorType, attr: Attribute, channel: usize, value: f64) -> SensorResult<()> {
        if t != SensorType::Pwm || attr != Attribute::INPUT {
            return Err(SensorError::not_supported("only pwm input is writable"));
        }
        let entry = self
            .channels
            .pwm
            .get(channel)
            .ok_or_else(|| SensorError::not_supported("pwm channel out of range"))?;
        self.registers
            .write_pwm_duty(entry.source_index, (value * 255.0).clamp(0.0, 255.0) as u8)
    }

    fn channel_label(&self, t: SensorType, channel: usize) -> String {
        match t {
            SensorType::In => self
                .channels
                .voltage
                .get(channel)
                .map(|c| c.label.to_string())
                .unwrap_or_else(|| crate::chip::type_tag(t).to_string() + &channel.to_string()),
            SensorType::Temp => self.channels.temperature.get(channel).map(|c| c.label.to_string()).unwrap_or_default(),
            SensorType::Fan => self.channels.fan.get(channel).map(|c| c.label.to_string()).unwrap_or_default(),
            SensorType::Pwm => self.channels.pwm.get(channel).map(|c| c.label.to_string()).unwrap_or_default(),
            _ => format!("{}{}", crate::chip::type_tag(t), channel),
        }
    }
}
