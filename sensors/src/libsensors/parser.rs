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

//! `<prefix>-<bus>[-<bus_nr>]-<addr>` chip-name grammar, matching libsensors'
//! `sensors_parse_chip_name`/`sensors_snprintf_chip_name` pair. `addr` is always rendered
//! as lowercase, zero-padded-to-4 hex, matching every known libsensors chip name in the
//! wild (`"nct6798-isa-0a20"`, `"k10temp-pci-00c3"`).

use crate::error::{SensorError, SensorResult};
use crate::libsensors::types::{ChipName, BUS_NR_ANY};
use crate::types::BusType;

pub fn sensors_parse_chip_name(s: &str) -> SensorResult<ChipName> {
    let parts: Vec<&str> = s.split('-').collect();
    if parts.len() < 3 {
        return Err(SensorError::not_supported(format!(
            "malformed chip name {s:?}: expected at least prefix-bus-addr"
        )));
    }
    let prefix = parts[0].to_string();
    let addr_str = parts[parts.len() - 1];
    let addr = u32::from_str_radix(addr_str, 16)
        .map_err(|_| SensorError::not_supported(format!("invalid chip address {addr_str:?}")))?;

    let bus_parts = &parts[1..parts.len() - 1];
    let (bus_str, bus_nr) = match bus_parts {
        [bus] => (*bus, BUS_NR_ANY),
        [bus, nr] => {
            let nr = nr
                .parse::<i16>()
                .map_err(|_| SensorError::not_supported(format!("invalid bus number {nr:?}")))?;
            (*bus, nr)
        }
        _ => {
            return Err(SensorError::not_supported(format!(
                "malformed chip name {s:?}: too many bus components"
            )))
        }
    };

    let bus_type = if bus_str == "*" {
        None
    } else {
        Some(BusType::from_str(bus_str).ok_or_else(|| {
            SensorError::not_supported(format!("unknown bus type {bus_str:?}"))
        })?)
    };

    Ok(ChipName {
        prefix,
        bus_type,
        bus_nr,
        addr,
    })
}

pub fn sensors_snprintf_chip_name(chip: &ChipName) -> String {
    let bus = chip.bus_type.map(BusType::as_str).unwrap_or("*");
    let mut out = format!("{}-{}", chip.prefix, bus);
    if chip.bus_nr != BUS_NR_ANY {
        out.push('-');
        out.push_str(&chip.bus_nr.to_string());
    }
    out.push('-');
    out.push_str(&format!("{:04x}", chip.addr));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nct6798_isa_chip_name_round_trips() {
        let chip = sensors_parse_chip_name("nct6798-isa-0a20").unwrap();
        assert_eq!(chip.prefix, "nct6798");
        assert_eq!(chip.bus_type, Some(BusType::Isa));
        assert_eq!(chip.bus_nr, BUS_NR_ANY);
        assert_eq!(chip.addr, 0x0a20);
        assert_eq!(sensors_snprintf_chip_name(&chip), "nct6798-isa-0a20");
    }

    #[test]
    fn explicit_bus_number_is_preserved() {
        let chip = sensors_parse_chip_name("k10temp-pci-3-00c3").unwrap();
        assert_eq!(chip.bus_nr, 3);
        assert_eq!(sensors_snprintf_chip_name(&chip), "k10temp-pci-3-00c3");
    }

    #[test]
    fn malformed_name_is_rejected() {
        assert!(sensors_parse_chip_name("nct6798").is_err());
    }
}
