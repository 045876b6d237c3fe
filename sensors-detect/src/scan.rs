/*
 * sensors-rs - hardware sensor monitoring library for x86 PCs
 * Copyright (C) 2026  sensors-rs contributors
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

//! Walks both legacy Super-I/O config-mode address pairs looking for a chip that answers.
//! A non-invasive ID read is always tried first; only a chip that doesn't answer that way
//! forces the slower path of trying every vendor's password sequence in turn.

use log::{debug, warn};

use crate::catalog::{custom_probes, DeviceSignature, SioCatalog, ITE_ESPI_BRIDGE_ID};
use crate::port_io::PortIo;

/// `(index port, data port)` for the two legacy Super-I/O config-space locations.
pub const CONFIG_ADDRESS_PAIRS: [(u16, u16); 2] = [(0x2E, 0x2F), (0x4E, 0x4F)];

const DEVID_HI: u8 = 0x20;
const DEVID_LO: u8 = 0x21;
const LOGICAL_DEVICE_REG: u8 = 0x07;
const ACTIVATE_REG: u8 = 0x30;
const ACTIVATE_MASK: u8 = 0x01;
const BASE_ADDR_HI: u8 = 0x60;
const BASE_ADDR_LO: u8 = 0x61;
const EXIT_SEQUENCE: [u8; 3] = [0xAA, 0x02, 0x02];

/// A chip identified at a particular config-mode address pair, shaped close to
/// [`crate::catalog::DeviceSignature`] plus the address data a live driver needs to start
/// talking to the chip's hardware-monitor logical device.
#[derive(Debug, Clone)]
pub struct IdentifiedChip {
    pub vendor: String,
    pub signature: DeviceSignature,
    pub address_port: u16,
    pub data_port: u16,
    pub observed_id: u16,
    pub base_address: Option<u16>,
    pub activated: bool,
}

fn read_device_id(port: &mut dyn PortIo, addr: u16, data: u16) -> Result<u16, crate::port_io::PortIoError> {
    port.outb(addr, DEVID_HI)?;
    let hi = port.inb(data)?;
    port.outb(addr, DEVID_LO)?;
    let lo = port.inb(data)?;
    Ok(((hi as u16) << 8) | lo as u16)
}

fn read_base_address(
    port: &mut dyn PortIo,
    addr: u16,
    data: u16,
    logdev: u8,
) -> Result<(u16, bool), crate::port_io::PortIoError> {
    port.outb(addr, LOGICAL_DEVICE_REG)?;
    port.outb(data, logdev)?;

    port.outb(addr, ACTIVATE_REG)?;
    let activated = port.inb(data)? & ACTIVATE_MASK != 0;

    port.outb(addr, BASE_ADDR_HI)?;
    let hi = port.inb(data)?;
    port.outb(addr, BASE_ADDR_LO)?;
    let lo = port.inb(data)?;
    Ok((((hi as u16) << 8) | lo as u16, activated))
}

fn exit_config_mode(port: &mut dyn PortIo, addr: u16) {
    for &byte in &EXIT_SEQUENCE {
        let _ = port.outb(addr, byte);
    }
}

/// A no-password ID read: most modern chips answer this even outside config mode, so it's
/// tried before committing to any vendor's entry sequence.
fn try_direct_read(port: &mut dyn PortIo, catalog: &SioCatalog, addr: u16, data: u16) -> Option<IdentifiedChip> {
    let observed_id = read_device_id(port, addr, data).ok()?;
    if observed_id == 0x0000 || observed_id == 0xFFFF {
        return None;
    }
    if observed_id == ITE_ESPI_BRIDGE_ID {
        warn!("ITE eSPI-to-LPC bridge detected at {addr:#06x}; the real Super-I/O chip is behind eSPI and unreachable over legacy port I/O");
        return None;
    }
    let (vendor, sig) = catalog.identify(observed_id)?;
    let (base_address, activated) = read_base_address(port, addr, data, sig.logical_device).ok()?;
    Some(IdentifiedChip {
        vendor: vendor.vendor.clone(),
        signature: sig.clone(),
        address_port: addr,
        data_port: data,
        observed_id,
        base_address: Some(base_address),
        activated,
    })
}

/// Tries every vendor's password sequence in turn, including that vendor's custom probes,
/// always releasing config mode afterward regardless of whether a chip was found.
fn try_password_sequences(port: &mut dyn PortIo, catalog: &SioCatalog, addr: u16, data: u16) -> Option<IdentifiedChip> {
    for vendor in catalog.vendors() {
        for &byte in vendor.entry_sequence(addr) {
            let _ = port.outb(addr, byte);
        }

        let found = custom_probes()
            .into_iter()
            .filter(|p| p.vendor == vendor.vendor)
            .find_map(|p| match (p.probe)(port, addr, data) {
                Ok(true) => Some(IdentifiedChip {
                    vendor: vendor.vendor.clone(),
                    signature: p.signature,
                    address_port: addr,
                    data_port: data,
                    observed_id: 0,
                    base_address: None,
                    activated: false,
                }),
                _ => None,
            })
            .or_else(|| {
                read_device_id(port, addr, data).ok().and_then(|observed_id| {
                    vendor.identify(observed_id).map(|sig| IdentifiedChip {
                        vendor: vendor.vendor.clone(),
                        signature: sig.clone(),
                        address_port: addr,
                        data_port: data,
                        observed_id,
                        base_address: None,
                        activated: false,
                    })
                })
            });

        exit_config_mode(port, addr);

        if found.is_some() {
            return found;
        }
    }
    None
}

/// Scans both config-mode address pairs and returns every chip found (normally zero or one,
/// since boards rarely wire two Super-I/O chips at once, but nothing here assumes that).
pub fn scan(port: &mut dyn PortIo, catalog: &SioCatalog) -> Vec<IdentifiedChip> {
    let mut found = Vec::new();
    for (addr, data) in CONFIG_ADDRESS_PAIRS {
        debug!("probing Super-I/O config space at {addr:#06x}/{data:#06x}");
        if let Some(chip) = try_direct_read(port, catalog, addr, data) {
            found.push(chip);
            continue;
        }
        if let Some(chip) = try_password_sequences(port, catalog, addr, data) {
            found.push(chip);
        }
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port_io::RecordingPort;

    #[test]
    fn direct_read_identifies_ite_chip_without_a_password() {
        let catalog = SioCatalog::compiled();
        // it87 is 8-bit (0x86xx pattern): devid hi=0x86, lo=0x00 (ignored by match), then
        // base-address logical-device select/activate/base-hi/base-lo reads.
        let mut port = RecordingPort::with_replies(vec![0x86, 0x00, 0x01, 0x02, 0x03]);
        let found = scan(&mut port, &catalog);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].vendor, "ITE");
    }

    #[test]
    fn espi_bridge_id_is_not_reported_as_a_chip() {
        let catalog = SioCatalog::compiled();
        let hi = (ITE_ESPI_BRIDGE_ID >> 8) as u8;
        let lo = (ITE_ESPI_BRIDGE_ID & 0xFF) as u8;
        // Direct read returns the bridge sentinel at both address pairs; the password
        // fallback then also finds nothing, so the scan reports zero chips overall.
        let mut port = RecordingPort::with_replies(vec![hi, lo, hi, lo]);
        assert!(scan(&mut port, &catalog).is_empty());
    }

    #[test]
    fn unanswered_ports_yield_no_chips() {
        let catalog = SioCatalog::compiled();
        let mut port = RecordingPort::with_replies(vec![0xFF, 0xFF, 0xFF, 0xFF]);
        assert!(scan(&mut port, &catalog).is_empty());
    }
}
