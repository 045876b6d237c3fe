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

//! Flattens a [`crate::chip::SensorChip`]'s channel/attribute space into the
//! feature/subfeature numbering libsensors consumers expect. Numbering is derived once at
//! construction time from `chip.config()`, which is why [`crate::chip::SensorChip::config`]
//! is documented as stable for the chip's lifetime.

use crate::chip::SensorChip;
use crate::libsensors::types::{Feature, Subfeature};
use crate::types::{libsensors_subfeature_type, Attribute, SensorType};

const FEATURE_ORDER: &[SensorType] = &[
    SensorType::In,
    SensorType::Fan,
    SensorType::Temp,
    SensorType::Power,
    SensorType::Energy,
    SensorType::Curr,
    SensorType::Humidity,
    SensorType::Intrusion,
];

/// One entry per visible `(type, channel)` pair, each carrying the subfeatures visible on
/// it (only bits that also have a libsensors subfeature number are exposed).
pub struct ChipAdapter {
    pub features: Vec<Feature>,
    pub subfeatures: Vec<Subfeature>,
}

impl ChipAdapter {
    pub fn build(chip: &dyn SensorChip) -> Self {
        let mut features = Vec::new();
        let mut subfeatures = Vec::new();
        let mut subfeature_number = 0u32;

        for &t in FEATURE_ORDER {
            let count = chip.config().channel_count(t);
            for channel in 0..count {
                let Some(mask) = chip.config().attributes(t, channel) else {
                    continue;
                };
                if !mask.contains(Attribute::INPUT) {
                    continue;
                }
                let feature_index = features.len();
                features.push(Feature {
                    sensor_type: t,
                    number: feature_index,
                    name: format!("{}{}", crate::chip::type_tag(t), channel + 1),
                });

                for bit in attribute_bits(mask) {
                    let Some(subfeature_type) = libsensors_subfeature_type(t, bit) else {
                        continue;
                    };
                    subfeatures.push(Subfeature {
                        name: subfeature_name(t, channel, bit),
                        number: subfeature_number,
                        subfeature_type,
                        attribute: bit,
                        channel,
                    });
                    subfeature_number += 1;
                }
            }
        }

        Self {
            features,
            subfeatures,
        }
    }
}

fn attribute_bits(mask: Attribute) -> impl Iterator<Item = Attribute> {
    mask.iter()
}

fn subfeature_name(t: SensorType, channel: usize, bit: Attribute) -> String {
    let suffix = match bit {
        Attribute::INPUT => "input",
        Attribute::MIN => "min",
        Attribute::MAX => "max",
        Attribute::CRIT => "crit",
        Attribute::CRIT_LOW => "crit_low",
        Attribute::ALARM => "alarm",
        Attribute::AVERAGE => "average",
        Attribute::LOWEST => "lowest",
        Attribute::HIGHEST => "highest",
        Attribute::BEEP => "beep",
        Attribute::FAULT => "fault",
        Attribute::DIV => "div",
        Attribute::TARGET => "target",
        _ => "unknown",
    };
    format!("{}{}_{}", crate::chip::type_tag(t), channel + 1, suffix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chip::{ReadValue, Visibility};
    use crate::error::SensorResult;
    use crate::types::{ChannelConfig, Identifier, TypeConfig};

    struct FakeNct {
        config: ChannelConfig,
        identifier: Identifier,
    }

    impl SensorChip for FakeNct {
        fn config(&self) -> &ChannelConfig {
            &self.config
        }
        fn identifier(&self) -> &Identifier {
            &self.identifier
        }
        fn is_visible(&self, _: SensorType, _: Attribute, _: usize) -> Visibility {
            Visibility::default()
        }
        fn read(&self, _: SensorType, _: Attribute, _: usize) -> SensorResult<ReadValue> {
            unimplemented!()
        }
        fn write(&self, _: SensorType, _: Attribute, _: usize, _: f64) -> SensorResult<()> {
            unimplemented!()
        }
    }

    #[test]
    fn single_voltage_input_channel_gets_in1_input_subfeature() {
        let mut config = ChannelConfig::default();
        config.sensors.insert(
            SensorType::In,
            TypeConfig {
                channel_attributes: vec![Attribute::INPUT | Attribute::LABEL],
            },
        );
        let chip = FakeNct {
            config,
            identifier: Identifier {
                name: "nct6798".into(),
                hardware_type: "nct6798".into(),
                bus: crate::types::BusType::Isa,
                addr: 0xa20,
            },
        };
        let adapter = ChipAdapter::build(&chip);
        assert_eq!(adapter.features.len(), 1);
        assert_eq!(adapter.features[0].name, "in1");
        assert_eq!(adapter.subfeatures.len(), 1);
        assert_eq!(adapter.subfeatures[0].name, "in1_input");
    }
}
