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

//! Super-I/O chip drivers, wired together by a common [`SuperIoSensorChip`] façade that
//! translates client channel numbers through the board-quirk table and applies the
//! voltage-divider formula uniformly across vendors.
//!
//! Chip identification itself (which family, which address) happens in
//! [`sensors_detect::superio`]; this module starts from an already-identified chip's base
//! address and builds its live [`crate::chip::SensorChip`].

pub mod board_config;
pub mod fintek;
pub mod generic_chip;
pub mod ite;
pub mod nuvoton;
pub mod port;
pub mod winbond;

use generic_chip::GenericSuperIoChip;

pub type IteChip<'a> = GenericSuperIoChip<ite::IteRegisters<'a>>;
pub type WinbondChip<'a> = GenericSuperIoChip<winbond::WinbondRegisters<'a>>;
pub type FintekChip<'a> = GenericSuperIoChip<fintek::FintekRegisters<'a>>;

use board_config::{Chip, ChannelsConfiguration, Manufacturer};
use nuvoton::NuvotonDriver;
use sensors_detect::port_io::PortIo;

use crate::chip::{ReadValue, SensorChip, Visibility};
use crate::error::{SensorError, SensorResult};
use crate::types::{Attribute, ChannelConfig, Identifier, SensorType, TypeConfig};

/// A Nuvoton NCT679x hardware-monitor chip bound to a board's channel quirk table.
pub struct Nct679xChip<'a> {
    identifier: Identifier,
    driver: NuvotonDriver<'a>,
    channels: ChannelsConfiguration,
    config: ChannelConfig,
}

impl<'a> Nct679xChip<'a> {
    pub fn new(
        io: &'a mut dyn PortIo,
        base_addr: u16,
        hardware_type: &str,
        manufacturer: Manufacturer,
        board_model: &str,
        chip: Chip,
    ) -> Self {
        let driver = NuvotonDriver::new(io, base_addr);
        // probe-time channel counts would normally come from the chip's own LDN/feature
        // bits; a board-specific entry in BOARD_CONFIG always wins regardless of the count
        // passed here, so a conservative default suffices for the generic fallback path.
        let mut channels = board_config::super_io_configuration(
            manufacturer,
            board_model,
            chip,
            board_config::ChannelCounts {
                voltage: 3,
                temperature: 2,
                fan: 2,
                pwm: 2,
            },
        );
        Self::dedup_temperature_channels(&driver, &mut channels);

        let mut config = ChannelConfig::default();
        config.sensors.insert(
            SensorType::In,
            TypeConfig {
                channel_attributes: vec![
                    Attribute::INPUT | Attribute::LABEL;
                    channels.voltage.len()
                ],
            },
        );
        config.sensors.insert(
            SensorType::Temp,
            TypeConfig {
                channel_attributes: vec![
                    Attribute::INPUT | Attribute::LABEL;
                    channels.temperature.len()
                ],
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
                channel_attributes: vec![
                    Attribute::INPUT | Attribute::LABEL;
                    channels.pwm.len()
                ],
            },
        );

        Self {
            identifier: Identifier {
                name: hardware_type.to_string(),
                hardware_type: hardware_type.to_string(),
                bus: crate::types::BusType::Isa,
                addr: base_addr as u32,
            },
            driver,
            channels,
            config,
        }
    }

    /// Reads the upstream source selector for every configured temperature channel and
    /// drops every channel after the first that shares a source with one already kept, per
    /// the source-deduplication rule. A failed source read is treated as its own unique
    /// source so it is never silently dropped.
    fn dedup_temperature_channels(driver: &NuvotonDriver<'a>, channels: &mut ChannelsConfiguration) {
        let sources: Vec<u8> = channels
            .temperature
            .iter()
            .enumerate()
            .map(|(i, entry)| {
                driver
                    .read_temperature_source(entry.source_index)
                    .unwrap_or(0x80 + i as u8)
            })
            .collect();
        let keep = nuvoton::dedup_temperature_sources(&sources);
        channels.temperature = keep
            .into_iter()
            .map(|i| channels.temperature[i].clone())
            .collect();
    }
}

impl SensorChip for Nct679xChip<'_> {
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
        if self.is_visible(t, attr, channel) == (Visibility { readable: false, writable: false })
        {
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
                let raw = self.driver.read_voltage_raw(entry.source_index)?;
                let raw_volts = nuvoton::decode_voltage(raw);
                let volts = nuvoton::apply_divider(raw_volts, entry.ri, entry.rf, entry.vf);
                Ok(ReadValue::Float(volts))
            }
            SensorType::Temp => {
                let entry = self
                    .channels
                    .temperature
                    .get(channel)
                    .ok_or_else(|| SensorError::not_supported("temp channel out of range"))?;
                let (hi, lo) = self.driver.read_temperature_raw(entry.source_index)?;
                Ok(ReadValue::Float(nuvoton::decode_temperature(hi, lo)))
            }
            SensorType::Fan => {
                let entry = self
                    .channels
                    .fan
                    .get(channel)
                    .ok_or_else(|| SensorError::not_supported("fan channel out of range"))?;
                let (hi, lo) = self.driver.read_fan_raw(entry.source_index)?;
                Ok(ReadValue::Float(nuvoton::decode_fan_rpm(hi, lo)))
            }
            SensorType::Pwm => {
                let entry = self
                    .channels
                    .pwm
                    .get(channel)
                    .ok_or_else(|| SensorError::not_supported("pwm channel out of range"))?;
                let duty = self.driver.read_pwm_duty(entry.source_index)?;
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
        self.driver
            .write_pwm(entry.source_index, (value * 255.0).clamp(0.0, 255.0))
    }

    fn channel_label(&self, t: SensorType, channel: usize) -> String {
        match t {
            SensorType::In => self
                .channels
                .voltage
                .get(channel)
                .map(|c| c.label.to_string())
                .unwrap_or_else(|| crate::chip::type_tag(t).to_string() + &channel.to_string()),
            SensorType::Temp => self
                .channels
                .temperature
                .get(channel)
                .map(|c| c.label.to_string())
                .unwrap_or_default(),
            SensorType::Fan => self
                .channels
                .fan
                .get(channel)
                .map(|c| c.label.to_string())
                .unwrap_or_default(),
            SensorType::Pwm => self
                .channels
                .pwm
                .get(channel)
                .map(|c| c.label.to_string())
                .unwrap_or_default(),
            _ => format!("{}{}", crate::chip::type_tag(t), channel),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::MockPortIo;

    #[test]
    fn crosshair_vcore_read_matches_label_and_plausibility() {
        // First two reads are the temperature-source selectors consulted by the dedup pass
        // at construction time (distinct sources, so both temp channels survive); the third
        // is the voltage raw byte the test actually exercises. 150 * 0.008V = 1.2V.
        let mut mock = MockPortIo::new(vec![0x00, 0x01, 150]);
        let chip = Nct679xChip::new(
            &mut mock,
            0xA20,
            "nct6798",
            Manufacturer::Asus,
            "ROG CROSSHAIR VIII HERO",
            Chip::Nct6798D,
        );
        let value = chip
            .read(SensorType::In, Attribute::INPUT, 0)
            .unwrap()
            .as_f64()
            .unwrap();
        assert!((0.5..2.0).contains(&value));
        assert_eq!(chip.channel_label(SensorType::In, 0), "Vcore");
    }

    #[test]
    fn duplicate_temperature_sources_are_collapsed_at_construction() {
        // Both temp registers report source 0x00 (e.g. the board wires SYSTIN and an
        // auxiliary register to the same PECI channel); the second must not surface as its
        // own output channel.
        let mut mock = MockPortIo::new(vec![0x00, 0x00]);
        let chip = Nct679xChip::new(
            &mut mock,
            0xA20,
            "nct6798",
            Manufacturer::Asus,
            "ROG CROSSHAIR VIII HERO",
            Chip::Nct6798D,
        );
        assert_eq!(chip.channels.temperature.len(), 1);
        assert_eq!(chip.config.channel_count(SensorType::Temp), 1);
    }
}
