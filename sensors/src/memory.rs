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

//! The memory virtual chip: two load fractions (physical RAM, swap) and four absolute
//! byte counts, backed by [`sysinfo`] the same way the rest of this workspace already
//! depends on it for process/host introspection. Readings are cached for one second since
//! `sysinfo::System::refresh_memory` is not free to call on every single channel read.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use sysinfo::System;

use crate::chip::{ReadValue, SensorChip, Visibility};
use crate::error::{SensorError, SensorResult};
use crate::types::{Attribute, BusType, ChannelConfig, Identifier, SensorType, TypeConfig};

const CACHE_TTL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, Default)]
struct MemorySnapshot {
    total_physical: u64,
    available_physical: u64,
    total_swap: u64,
    available_swap: u64,
}

impl MemorySnapshot {
    fn physical_load_fraction(&self) -> f64 {
        if self.total_physical == 0 {
            return 0.0;
        }
        let used = self.total_physical.saturating_sub(self.available_physical);
        used as f64 / self.total_physical as f64
    }

    fn swap_load_fraction(&self) -> f64 {
        if self.total_swap == 0 {
            return 0.0;
        }
        let used = self.total_swap.saturating_sub(self.available_swap);
        used as f64 / self.total_swap as f64
    }
}

struct Cache {
    at: Instant,
    snapshot: MemorySnapshot,
}

pub struct GenericMemory {
    identifier: Identifier,
    config: ChannelConfig,
    system: Mutex<System>,
    cache: Mutex<Option<Cache>>,
}

impl GenericMemory {
    pub fn new() -> Self {
        let mut config = ChannelConfig::default();
        config.sensors.insert(
            SensorType::Load,
            TypeConfig {
                channel_attributes: vec![Attribute::INPUT | Attribute::LABEL; 2],
            },
        );
        config.sensors.insert(
            SensorType::Data,
            TypeConfig {
                channel_attributes: vec![Attribute::INPUT | Attribute::LABEL; 4],
            },
        );
        Self {
            identifier: Identifier {
                name: "Generic Memory".to_string(),
                hardware_type: "memory".to_string(),
                bus: BusType::Virtual,
                addr: 0,
            },
            config,
            system: Mutex::new(System::new()),
            cache: Mutex::new(None),
        }
    }

    fn snapshot(&self) -> MemorySnapshot {
        let mut cache = self.cache.lock().expect("memory cache mutex poisoned");
        if let Some(c) = cache.as_ref() {
            if c.at.elapsed() < CACHE_TTL {
                return c.snapshot;
            }
        }
        let mut system = self.system.lock().expect("sysinfo mutex poisoned");
        system.refresh_memory();
        let snapshot = MemorySnapshot {
            total_physical: system.total_memory(),
            available_physical: system.available_memory(),
            total_swap: system.total_swap(),
            available_swap: system.free_swap(),
        };
        *cache = Some(Cache {
            at: Instant::now(),
            snapshot,
        });
        snapshot
    }
}

impl Default for GenericMemory {
    fn default() -> Self {
        Self::new()
    }
}

impl SensorChip for GenericMemory {
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
        if attr == Attribute::LABEL {
            return Ok(ReadValue::Text(self.channel_label(t, channel)));
        }
        let snapshot = self.snapshot();
        let value = match (t, channel) {
            (SensorType::Load, 0) => snapshot.physical_load_fraction(),
            (SensorType::Load, 1) => snapshot.swap_load_fraction(),
            (SensorType::Data, 0) => snapshot.total_physical as f64,
            (SensorType::Data, 1) => snapshot.available_physical as f64,
            (SensorType::Data, 2) => snapshot.total_swap as f64,
            (SensorType::Data, 3) => snapshot.available_swap as f64,
            _ => return Err(SensorError::not_supported(format!("{t:?} channel {channel}"))),
        };
        Ok(ReadValue::Float(value))
    }

    fn write(&self, _: SensorType, _: Attribute, _: usize, _: f64) -> SensorResult<()> {
        Err(SensorError::not_supported("memory chip is read-only"))
    }

    fn channel_label(&self, t: SensorType, channel: usize) -> String {
        match (t, channel) {
            (SensorType::Load, 0) => "Memory".to_string(),
            (SensorType::Load, 1) => "Virtual Memory".to_string(),
            (SensorType::Data, 0) => "Memory Used".to_string(),
            (SensorType::Data, 1) => "Memory Available".to_string(),
            (SensorType::Data, 2) => "Virtual Memory Used".to_string(),
            (SensorType::Data, 3) => "Virtual Memory Available".to_string(),
            _ => format!("{}{}", crate::chip::type_tag(t), channel),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_memory_load_fraction_is_one() {
        let snapshot = MemorySnapshot {
            total_physical: 1000,
            available_physical: 0,
            total_swap: 0,
            available_swap: 0,
        };
        assert_eq!(snapshot.physical_load_fraction(), 1.0);
        assert_eq!(snapshot.swap_load_fraction(), 0.0);
    }

    #[test]
    fn label_identifies_physical_vs_virtual() {
        let mem = GenericMemory::new();
        assert_eq!(mem.channel_label(SensorType::Load, 0), "Memory");
        assert_eq!(mem.channel_label(SensorType::Load, 1), "Virtual Memory");
    }
}
