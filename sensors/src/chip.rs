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

//! The polymorphic chip boundary every driver family implements. The driver set is closed
//! (one variant per vendor family plus the virtual memory chip), so concrete drivers are
//! boxed trait objects rather than an enum — new HID or super-I/O chip drivers get added
//! without touching every match site that handles [`SensorChip`].

use crate::error::SensorResult;
use crate::types::{Attribute, ChannelConfig, Identifier, SensorType};

/// What a single `read` call yields. Most channels are numeric; `label` reads and a
/// handful of string-valued subfeatures return text instead.
#[derive(Debug, Clone, PartialEq)]
pub enum ReadValue {
    Float(f64),
    Text(String),
}

impl ReadValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ReadValue::Float(v) => Some(*v),
            ReadValue::Text(_) => None,
        }
    }
}

/// Whether `(type, attr, channel)` can be read and/or written on this chip.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Visibility {
    pub readable: bool,
    pub writable: bool,
}

/// A chip's polymorphic interface: stable `config()` and `identifier()`, and the one
/// read/write dispatch pair every driver family routes through. `config()` MUST stay
/// stable for the chip's lifetime — callers (in particular the libsensors adapter) cache
/// feature/subfeature numbering derived from it at construction time.
pub trait SensorChip: Send + Sync {
    fn config(&self) -> &ChannelConfig;

    fn identifier(&self) -> &Identifier;

    fn is_visible(&self, t: SensorType, attr: Attribute, channel: usize) -> Visibility;

    /// Never panics and never returns an error for a transient hardware hiccup silently —
    /// `Err(SensorError::TransientHardwareFailure)` is the explicit "value unknown this
    /// cycle" signal; `Err(SensorError::NotSupported)` means the tuple will never work.
    fn read(&self, t: SensorType, attr: Attribute, channel: usize) -> SensorResult<ReadValue>;

    fn write(&self, t: SensorType, attr: Attribute, channel: usize, value: f64) -> SensorResult<()>;

    /// Defaults to `"<type><index>"`; drivers override for board-specific or
    /// vendor-specific labels (e.g. `"Vcore"`).
    fn channel_label(&self, t: SensorType, channel: usize) -> String {
        format!("{}{}", type_tag(t), channel)
    }
}

pub fn type_tag(t: SensorType) -> &'static str {
    match t {
        SensorType::Chip => "chip",
        SensorType::Temp => "temp",
        SensorType::In => "in",
        SensorType::Curr => "curr",
        SensorType::Power => "power",
        SensorType::Energy => "energy",
        SensorType::Humidity => "humidity",
        SensorType::Fan => "fan",
        SensorType::Pwm => "pwm",
        SensorType::Intrusion => "intrusion",
        SensorType::Data => "data",
        SensorType::DataRate => "dataRate",
        SensorType::Duration => "duration",
        SensorType::Frequency => "frequency",
        SensorType::Flow => "flow",
        SensorType::Load => "load",
        SensorType::Raw => "raw",
        SensorType::Fraction => "fraction",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Stub;

    impl SensorChip for Stub {
        fn config(&self) -> &ChannelConfig {
            unimplemented!()
        }
        fn identifier(&self) -> &Identifier {
            unimplemented!()
        }
        fn is_visible(&self, _: SensorType, _: Attribute, _: usize) -> Visibility {
            Visibility::default()
        }
        fn read(&self, _: SensorType, _: Attribute, _: usize) -> SensorResult<ReadValue> {
            Err(crate::error::SensorError::not_supported("stub"))
        }
        fn write(&self, _: SensorType, _: Attribute, _: usize, _: f64) -> SensorResult<()> {
            Err(crate::error::SensorError::not_supported("stub"))
        }
    }

    #[test]
    fn default_channel_label_uses_type_tag_and_index() {
        let chip = Stub;
        assert_eq!(chip.channel_label(SensorType::Temp, 2), "temp2");
        assert_eq!(chip.channel_label(SensorType::In, 0), "in0");
    }
}
