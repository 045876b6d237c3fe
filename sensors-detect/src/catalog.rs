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

//! The Super-I/O device-ID catalog: one [`VendorTable`] per chip family, each carrying its
//! config-mode entry sequence and the [`DeviceSignature`]s that identify its chips, plus the
//! handful of chips that need more than an ID-register comparison ([`CustomProbe`]).
//!
//! Identification is a single pass over every signature in every table rather than a
//! "16-bit pass then 8-bit pass" split: each signature already knows its own specificity
//! (how many ID bits it pins down), so [`SioCatalog::identify`] just keeps the most specific
//! match it has seen, preferring the earliest one on a tie. Vendor tables are loaded in a
//! fixed order (ITE first) so that tie-break still favors the chip families most likely to
//! produce a false 8-bit overlap with a later family's wider ID space.

use std::path::Path;

use log::{debug, warn};
use serde::Deserialize;

use crate::port_io::{PortIo, PortIoError};

/// One chip's ID-register fingerprint and what it's known to expose.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceSignature {
    pub label: String,
    pub driver_hint: String,
    pub device_id: u32,
    pub id_mask: u32,
    pub logical_device: u8,
    pub feature_tags: Vec<String>,
}

impl DeviceSignature {
    /// A 16-bit `device_id` (i.e. > 0xFF) pins down the full ID register pair and always
    /// outranks an 8-bit high-byte-only signature, regardless of mask width.
    fn is_precise(&self) -> bool {
        self.device_id > 0xFF
    }

    fn matches(&self, observed_id: u16) -> bool {
        if self.is_precise() {
            (observed_id as u32) & self.id_mask == self.device_id & self.id_mask
        } else {
            ((observed_id as u32) >> 8) & self.id_mask == self.device_id & self.id_mask
        }
    }
}

/// A family of chips sharing one config-mode entry sequence (see §4.4's password tables).
pub struct VendorTable {
    pub vendor: String,
    entry_sequence_2e: Vec<u8>,
    entry_sequence_4e: Vec<u8>,
    pub signatures: Vec<DeviceSignature>,
}

impl VendorTable {
    pub fn entry_sequence(&self, address_port: u16) -> &[u8] {
        if address_port == 0x4E {
            &self.entry_sequence_4e
        } else {
            &self.entry_sequence_2e
        }
    }

    /// Same precision-preferring scan as [`SioCatalog::identify`], scoped to this vendor's
    /// own signatures — used once a password sequence has committed the probe to one family.
    pub fn identify(&self, observed_id: u16) -> Option<&DeviceSignature> {
        let mut best: Option<&DeviceSignature> = None;
        for sig in &self.signatures {
            if !sig.matches(observed_id) {
                continue;
            }
            let upgrade = match best {
                None => true,
                Some(current) => sig.is_precise() && !current.is_precise(),
            };
            if upgrade {
                best = Some(sig);
            }
        }
        best
    }
}

/// A chip that can't be told apart from its siblings by ID register alone. `probe` is run
/// against the family's own config-mode state, after the family's standard entry sequence
/// has already been issued, and returns `true` if this specific chip is the one present.
pub struct CustomProbe {
    pub vendor: &'static str,
    pub signature: DeviceSignature,
    pub probe: fn(&mut dyn PortIo, u16, u16) -> Result<bool, PortIoError>,
}

/// The ITE eSPI-to-LPC bridge reports this ID on boards where the real Super-I/O chip sits
/// behind an eSPI bus and is therefore unreachable over legacy port I/O.
pub const ITE_ESPI_BRIDGE_ID: u16 = 0x8883;

fn smsc_alt_id_register_probe(
    port: &mut dyn PortIo,
    addr_reg: u16,
    data_reg: u16,
    expect: u8,
) -> Result<bool, PortIoError> {
    port.outb(addr_reg, 0x20)?;
    Ok(port.inb(data_reg)? == expect)
}

fn sch5627_probe(port: &mut dyn PortIo, a: u16, d: u16) -> Result<bool, PortIoError> {
    let hit = smsc_alt_id_register_probe(port, a, d, 0xC6)?;
    if hit {
        debug!("SCH5627 matched via its non-standard base-address registers (0x66/0x67)");
    }
    Ok(hit)
}

fn sch5636_probe(port: &mut dyn PortIo, a: u16, d: u16) -> Result<bool, PortIoError> {
    let hit = smsc_alt_id_register_probe(port, a, d, 0xC7)?;
    if hit {
        debug!("SCH5636 matched via its non-standard base-address registers (0x66/0x67)");
    }
    Ok(hit)
}

/// PC8374L and WPCD377I share device ID 0xF1; register 0x27 disambiguates them (the
/// revision byte is below 0x80 on PC8374L parts).
fn pc8374l_probe(port: &mut dyn PortIo, addr_reg: u16, data_reg: u16) -> Result<bool, PortIoError> {
    port.outb(addr_reg, 0x20)?;
    if port.inb(data_reg)? != 0xF1 {
        return Ok(false);
    }
    port.outb(addr_reg, 0x27)?;
    let revision = port.inb(data_reg)?;
    debug!("PC8374L/WPCD377I disambiguation byte at 0x27 = {revision:#04x}");
    Ok(revision < 0x80)
}

/// Chips needing [`CustomProbe`] logic, grouped under the vendor table they're tried against.
pub fn custom_probes() -> Vec<CustomProbe> {
    vec![
        CustomProbe {
            vendor: "National Semiconductor",
            signature: DeviceSignature {
                label: "Nat. Semi. PC8374L Super IO Sensors".into(),
                driver_hint: String::new(),
                device_id: 0xF1,
                id_mask: 0xFF,
                logical_device: 0x08,
                feature_tags: vec!["voltage".into(), "fan".into(), "temp".into()],
            },
            probe: pc8374l_probe,
        },
        CustomProbe {
            vendor: "SMSC",
            signature: DeviceSignature {
                label: "SMSC SCH5627 Super IO".into(),
                driver_hint: "sch5627".into(),
                device_id: 0xC6,
                id_mask: 0xFF,
                logical_device: 0x0C,
                feature_tags: vec!["voltage".into(), "fan".into(), "temp".into()],
            },
            probe: sch5627_probe,
        },
        CustomProbe {
            vendor: "SMSC",
            signature: DeviceSignature {
                label: "SMSC SCH5636 Super IO".into(),
                driver_hint: "sch5636".into(),
                device_id: 0xC7,
                id_mask: 0xFF,
                logical_device: 0x0C,
                feature_tags: vec!["voltage".into(), "fan".into(), "temp".into()],
            },
            probe: sch5636_probe,
        },
    ]
}

#[derive(Debug, Deserialize)]
struct TableFile {
    family: FamilyMeta,
    #[serde(default, rename = "chips")]
    signatures: Vec<SignatureRow>,
}

#[derive(Debug, Deserialize)]
struct FamilyMeta {
    name: String,
    entry_sequence_2e: Vec<u8>,
    entry_sequence_4e: Vec<u8>,
}

#[derive(Debug, Deserialize)]
struct SignatureRow {
    name: String,
    driver: String,
    devid: u32,
    devid_mask: u32,
    logdev: u8,
    #[serde(default)]
    features: Vec<String>,
}

impl From<SignatureRow> for DeviceSignature {
    fn from(row: SignatureRow) -> Self {
        Self {
            label: row.name,
            driver_hint: row.driver,
            device_id: row.devid,
            id_mask: row.devid_mask,
            logical_device: row.logdev,
            feature_tags: row.features,
        }
    }
}

fn parse_table(toml_text: &str, origin: &str) -> Option<VendorTable> {
    match toml::from_str::<TableFile>(toml_text) {
        Ok(file) => Some(VendorTable {
            vendor: file.family.name,
            entry_sequence_2e: file.family.entry_sequence_2e,
            entry_sequence_4e: file.family.entry_sequence_4e,
            signatures: file.signatures.into_iter().map(Into::into).collect(),
        }),
        Err(err) => {
            warn!("failed to parse built-in Super-I/O table {origin}: {err}");
            None
        }
    }
}

/// The catalog consulted when identifying a chip: every compiled-in vendor table, optionally
/// extended or patched by a runtime override file.
pub struct SioCatalog {
    vendors: Vec<VendorTable>,
}

impl SioCatalog {
    /// ITE is loaded first: its 8-bit IDs live in a range that would otherwise overlap a
    /// later family's wider signature before that family's own table is even consulted.
    pub fn compiled() -> Self {
        let sources: [(&str, &str); 4] = [
            ("superio_ite.toml", include_str!("../data/superio_ite.toml")),
            ("superio_winbond.toml", include_str!("../data/superio_winbond.toml")),
            (
                "superio_national_semi.toml",
                include_str!("../data/superio_national_semi.toml"),
            ),
            ("superio_smsc.toml", include_str!("../data/superio_smsc.toml")),
        ];
        let vendors = sources
            .into_iter()
            .filter_map(|(origin, text)| parse_table(text, origin))
            .collect();
        Self { vendors }
    }

    pub fn vendors(&self) -> &[VendorTable] {
        &self.vendors
    }

    /// Loads an on-disk override file: a vendor name matching an existing table merges its
    /// signatures in (replacing any with the same `devid`, appending the rest); an unknown
    /// vendor name is added as a brand-new table.
    pub fn apply_override(&mut self, path: &Path) -> std::io::Result<()> {
        let text = std::fs::read_to_string(path)?;
        let Some(incoming) = parse_table(&text, &path.display().to_string()) else {
            return Ok(());
        };
        match self.vendors.iter_mut().find(|v| v.vendor == incoming.vendor) {
            Some(existing) => {
                for sig in incoming.signatures {
                    if let Some(slot) = existing
                        .signatures
                        .iter_mut()
                        .find(|s| s.device_id == sig.device_id)
                    {
                        *slot = sig;
                    } else {
                        existing.signatures.push(sig);
                    }
                }
            }
            None => self.vendors.push(incoming),
        }
        Ok(())
    }

    /// Finds the single best signature match for an observed ID-register value, scanning
    /// every vendor table once. A 16-bit signature always beats an 8-bit one; among equally
    /// precise signatures the first encountered (in vendor-table load order) wins.
    pub fn identify(&self, observed_id: u16) -> Option<(&VendorTable, &DeviceSignature)> {
        let mut best: Option<(&VendorTable, &DeviceSignature)> = None;
        for vendor in &self.vendors {
            let Some(sig) = vendor.identify(observed_id) else {
                continue;
            };
            let upgrade = match best {
                None => true,
                Some((_, current)) => sig.is_precise() && !current.is_precise(),
            };
            if upgrade {
                best = Some((vendor, sig));
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port_io::RecordingPort;

    #[test]
    fn precise_signature_wins_over_imprecise_overlap() {
        let catalog = SioCatalog::compiled();
        // it87 (8-bit family) sits at 0x86xx; an imprecise match alone should never win
        // against a vendor table carrying a genuine 16-bit signature for the same prefix.
        let (vendor, sig) = catalog.identify(0x8686).expect("it87 should be identified");
        assert_eq!(vendor.vendor, "ITE");
        assert_eq!(sig.driver_hint, "it87");
    }

    #[test]
    fn unknown_id_has_no_match() {
        let catalog = SioCatalog::compiled();
        assert!(catalog.identify(0x0000).is_none());
        assert!(catalog.identify(0xFFFF).is_none());
    }

    #[test]
    fn apply_override_replaces_matching_devid_and_appends_new() {
        let mut catalog = SioCatalog::compiled();
        let dir = std::env::temp_dir().join(format!(
            "sensors-rs-catalog-override-test-{:?}",
            std::thread::current().id()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("override.toml");
        std::fs::write(
            &path,
            r#"
            [family]
            name = "SMSC"
            entry_sequence_2e = [0x55]
            entry_sequence_4e = [0x55]

            [[chips]]
            name = "SMSC replacement for SCH5627"
            driver = "sch5627-new"
            devid = 0xC6
            devid_mask = 0xFF
            logdev = 0x0C
            features = ["voltage"]

            [[chips]]
            name = "Brand new SMSC chip"
            driver = "smsc-new"
            devid = 0xD1
            devid_mask = 0xFF
            logdev = 0x01
            features = []
            "#,
        )
        .unwrap();

        catalog.apply_override(&path).unwrap();
        let smsc = catalog.vendors().iter().find(|v| v.vendor == "SMSC").unwrap();
        let replaced = smsc.signatures.iter().find(|s| s.device_id == 0xC6).unwrap();
        assert_eq!(replaced.driver_hint, "sch5627-new");
        assert!(smsc.signatures.iter().any(|s| s.device_id == 0xD1));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn pc8374l_probe_disambiguates_from_wpcd377i() {
        let mut port = RecordingPort::with_replies(vec![0xF1, 0x11]);
        assert!(pc8374l_probe(&mut port, 0x2E, 0x2F).unwrap());

        let mut port = RecordingPort::with_replies(vec![0xF1, 0x91]);
        assert!(!pc8374l_probe(&mut port, 0x2E, 0x2F).unwrap());
    }

    #[test]
    fn sch5627_probe_matches_on_alt_id_byte() {
        let mut port = RecordingPort::with_replies(vec![0xC6]);
        assert!(sch5627_probe(&mut port, 0x2E, 0x2F).unwrap());

        let mut port = RecordingPort::with_replies(vec![0x00]);
        assert!(!sch5627_probe(&mut port, 0x2E, 0x2F).unwrap());
    }
}
