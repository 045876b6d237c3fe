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

//! Asus embedded-controller sensors: unlike the flat [`super::acpi_ec::AcpiEc`] register
//! space, Asus EC registers live in 256-byte banks selected by writing a bank number to
//! register `0x05` before reading the target offset. A per-board table names which
//! (bank, offset) pairs carry live data; a full scan sorts the wanted registers by bank so
//! each bank is only selected once, and restores the bank the EC was in before the scan
//! started so any other firmware path reading through the same EC sees it unchanged.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use sensors_detect::port_io::PortIo;

use crate::chip::{ReadValue, SensorChip, Visibility};
use crate::ec::acpi_ec::AcpiEc;
use crate::error::{SensorError, SensorResult};
use crate::types::{Attribute, BusType, ChannelConfig, Identifier, SensorType, TypeConfig};

const BANK_SELECT_OFFSET: u8 = 0x05;
const SCAN_CACHE_TTL: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy)]
pub struct EcRegister {
    pub bank: u8,
    pub offset: u8,
    pub label: &'static str,
    /// Divides the raw signed-byte reading to turn it into the channel's published unit
    /// (e.g. `1.0` for whole-degree Celsius temperatures, `0.5` for half-RPM fan counters).
    pub scale: f64,
}

/// Asus boards publish roughly the same CPU/chipset/VRM thermal diodes across generations;
/// this table is the common ROG-series layout and is used for every board until per-model
/// quirks are known to need their own table, mirroring `board_config`'s generic fallback.
const GENERIC_TEMPERATURE_REGISTERS: &[EcRegister] = &[
    EcRegister { bank: 0x00, offset: 0x3A, label: "CPU", scale: 1.0 },
    EcRegister { bank: 0x00, offset: 0x3B, label: "Motherboard", scale: 1.0 },
    EcRegister { bank: 0x01, offset: 0x04, label: "VRM", scale: 1.0 },
    EcRegister { bank: 0x01, offset: 0x05, label: "Chipset", scale: 1.0 },
];

const GENERIC_FAN_REGISTERS: &[EcRegister] = &[
    EcRegister { bank: 0x00, offset: 0xBC, label: "Chassis 1", scale: 1.0 },
    EcRegister { bank: 0x00, offset: 0xBE, label: "Chassis 2", scale: 1.0 },
];

struct ScanCache {
    at: Instant,
    values: Vec<u8>,
}

/// Wraps [`AcpiEc`] (whose transaction methods take `&mut self`) behind a mutex so the
/// chip can expose the `&self` [`SensorChip`] read/write interface every driver family
/// shares.
pub struct AsusEcChip<'a> {
    identifier: Identifier,
    config: ChannelConfig,
    ec: Mutex<AcpiEc<'a>>,
    temperature: &'static [EcRegister],
    fan: &'static [EcRegister],
    cache: Mutex<Option<ScanCache>>,
}

impl<'a> AsusEcChip<'a> {
    pub fn new(port: &'a mut dyn PortIo, hardware_type: &str) -> Self {
        let temperature = GENERIC_TEMPERATURE_REGISTERS;
        let fan = GENERIC_FAN_REGISTERS;

        let mut config = ChannelConfig::default();
        config.sensors.insert(
            SensorType::Temp,
            TypeConfig {
                channel_attributes: vec![Attribute::INPUT | Attribute::LABEL; temperature.len()],
            },
        );
        config.sensors.insert(
            SensorType::Fan,
            TypeConfig {
                channel_attributes: vec![Attribute::INPUT | Attribute::LABEL; fan.len()],
            },
        );

        Self {
            identifier: Identifier {
                name: hardware_type.to_string(),
                hardware_type: hardware_type.to_string(),
                bus: BusType::Acpi,
                addr: 0,
            },
            config,
            ec: Mutex::new(AcpiEc::new(port)),
            temperature,
            fan,
            cache: Mutex::new(None),
        }
    }

    fn all_registers(&self) -> Vec<EcRegister> {
        self.temperature.iter().chain(self.fan.iter()).copied().collect()
    }

    /// Reads every register this chip publishes in one pass, banks sorted so each bank is
    /// selected at most once, and restores the bank the EC was already in before returning
    /// control. Results are cached briefly since a full scan touches the EC far more than a
    /// single channel read would need to.
    fn scan(&self) -> SensorResult<Vec<u8>> {
        {
            let cache = self.cache.lock().expect("asus ec cache mutex poisoned");
            if let Some(entry) = cache.as_ref() {
                if entry.at.elapsed() < SCAN_CACHE_TTL {
                    return Ok(entry.values.clone());
                }
            }
        }

        let mut ec = self.ec.lock().expect("asus ec mutex poisoned");
        let original_bank = ec.read_register(BANK_SELECT_OFFSET)?;

        let registers = self.all_registers();
        let mut order: Vec<usize> = (0..registers.len()).collect();
        order.sort_by_key(|&i| registers[i].bank);

        let mut values = vec![0u8; registers.len()];
        let mut current_bank: Option<u8> = None;
        for i in order {
            let reg = &registers[i];
            if current_bank != Some(reg.bank) {
                ec.write_register(BANK_SELECT_OFFSET, reg.bank)?;
                current_bank = Some(reg.bank);
            }
            values[i] = ec.read_register(reg.offset)?;
        }

        if current_bank != Some(original_bank) {
            ec.write_register(BANK_SELECT_OFFSET, original_bank)?;
        }

        *self.cache.lock().expect("asus ec cache mutex poisoned") = Some(ScanCache {
            at: Instant::now(),
            values: values.clone(),
        });
        Ok(values)
    }
}

impl SensorChip for AsusEcChip<'_> {
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
        let values = self.scan()?;
        let (registers, offset) = match t {
            SensorType::Temp => (self.temperature, 0),
            SensorType::Fan => (self.fan, self.temperature.len()),
            _ => return Err(SensorError::not_supported(format!("{t:?} not published"))),
        };
        let reg = registers
            .get(channel)
            .ok_or_else(|| SensorError::not_supported("channel out of range"))?;
        let raw = values[offset + channel] as i8 as f64;
        Ok(ReadValue::Float(raw * reg.scale))
    }

    fn write(&self, _t: SensorType, _attr: Attribute, _channel: usize, _value: f64) -> SensorResult<()> {
        Err(SensorError::not_supported("asus ec channels are read-only"))
    }

    fn channel_label(&self, t: SensorType, channel: usize) -> String {
        match t {
            SensorType::Temp => self.temperature.get(channel).map(|r| r.label.to_string()).unwrap_or_default(),
            SensorType::Fan => self.fan.get(channel).map(|r| r.label.to_string()).unwrap_or_default(),
            _ => format!("{}{}", crate::chip::type_tag(t), channel),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use sensors_detect::port_io::PortIoError;

    use super::*;
    use crate::ec::acpi_ec::{EC_COMMAND_PORT, EC_DATA_PORT, RD_EC, WR_EC};

    const OBF: u8 = 1; // always "ready" for both wait_for(IBF, false) and wait_for(OBF, true)

    /// A bank-switching EC: `(bank, offset)` keyed register file, current bank tracked like
    /// real hardware so a read only sees values written while that bank was selected.
    struct FakeEc {
        registers: HashMap<(u8, u8), u8>,
        current_bank: u8,
        pending_cmd: Option<u8>,
        pending_addr: Option<u8>,
    }

    impl PortIo for FakeEc {
        fn inb(&mut self, port: u16) -> Result<u8, PortIoError> {
            if port == EC_COMMAND_PORT {
                return Ok(OBF);
            }
            let addr = self.pending_addr.take().unwrap_or(0);
            Ok(*self.registers.get(&(self.current_bank, addr)).unwrap_or(&0))
        }

        fn outb(&mut self, port: u16, value: u8) -> Result<(), PortIoError> {
            if port == EC_COMMAND_PORT {
                self.pending_cmd = Some(value);
                return Ok(());
            }
            match (self.pending_cmd, self.pending_addr) {
                (Some(RD_EC), _) if self.pending_addr.is_none() => self.pending_addr = Some(value),
                (Some(WR_EC), None) => self.pending_addr = Some(value),
                (Some(WR_EC), Some(addr)) => {
                    if addr == BANK_SELECT_OFFSET {
                        self.current_bank = value;
                    }
                    self.registers.insert((self.current_bank, addr), value);
                    self.pending_addr = None;
                }
                _ => {}
            }
            Ok(())
        }
    }

    #[test]
    fn scan_sorts_banks_and_restores_original_bank() {
        let mut registers = HashMap::new();
        registers.insert((0x00, BANK_SELECT_OFFSET), 0x00);
        registers.insert((0x00, 0x3A), 40); // CPU temp
        registers.insert((0x00, 0x3B), 41); // Motherboard temp
        registers.insert((0x00, 0xBC), 10); // fan 1
        registers.insert((0x00, 0xBE), 11); // fan 2
        registers.insert((0x01, 0x04), 60); // VRM temp
        registers.insert((0x01, 0x05), 61); // Chipset temp
        let mut fake = FakeEc {
            registers,
            current_bank: 0x00,
            pending_cmd: None,
            pending_addr: None,
        };

        let chip = AsusEcChip::new(&mut fake, "asusec");
        let cpu = chip.read(SensorType::Temp, Attribute::INPUT, 0).unwrap().as_f64().unwrap();
        assert_eq!(cpu, 40.0);
        let vrm = chip.read(SensorType::Temp, Attribute::INPUT, 2).unwrap().as_f64().unwrap();
        assert_eq!(vrm, 60.0);
        assert_eq!(chip.channel_label(SensorType::Temp, 0), "CPU");
        // the scan visited bank 0x01 to read VRM/Chipset but must leave the EC back on the
        // bank it found at the start (0x00).
        assert_eq!(fake.current_bank, 0x00);
    }
}
