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

//! Top-level chip discovery: motherboard (Super-I/O), then CPU, then memory, then USB-HID.
//! Order matters only in that a Super-I/O probe failing to find hardware (no LPC chip
//! answers at either config-mode pair) must not prevent CPU/memory/HID probing from still
//! running — each probe stage is independent and only ever adds to the tree, never removes.

use std::sync::Arc;

use sensors_detect::catalog::SioCatalog;
use sensors_detect::port_io::{PortIo, SystemPort};
use sensors_detect::scan;

use crate::chip::SensorChip;
use crate::cpu::{self, CpuTopology};
use crate::cpuid::{self, CpuIdSource, RawCpuId, ThreadAffinityGuard};
use crate::dmi;
use crate::hid;
use crate::memory::GenericMemory;
use crate::ring0::{self, Ring0Handle};
use crate::superio::{self, board_config};
use crate::tree::SensorTreeNode;

/// One entry per discovered chip, keyed by the tree path it should live under
/// (`"motherboard/lpc"`, `"amdcpu"`, `"memory"`, `"hid"`, …), mirroring the path conventions
/// `sensors_detect`'s own detection report already uses.
pub type ChipTree = SensorTreeNode<Box<dyn SensorChip>>;

/// Runs every probe stage and returns whatever was found. A probe stage that finds nothing
/// (e.g. no Super-I/O chip answers on either config-mode address pair, or no CPU family this
/// build recognizes) contributes nothing to the tree rather than erroring.
pub fn probe_all() -> ChipTree {
    let mut tree = SensorTreeNode::default();

    probe_super_io(&mut tree);
    probe_asus_ec(&mut tree);
    probe_cpu(&mut tree);
    probe_memory(&mut tree);
    probe_hid(&mut tree);

    tree
}

/// Reads the baseboard manufacturer/model string pair `board_config::super_io_configuration`
/// keys its quirk table on. Falls back to an empty model string (which never matches any
/// table entry, so callers always land on the generic channel-labeling fallback) when the
/// DMI table is unreadable — containers and some virtualized guests don't expose it.
fn board_identity() -> (board_config::Manufacturer, String) {
    let baseboard = std::fs::read(dmi::DMI_TABLE_PATH)
        .ok()
        .map(|raw| dmi::parse_smbios_table(&raw))
        .and_then(|tables| tables.baseboard.into_iter().next());
    match baseboard {
        Some(b) => (manufacturer_from_dmi_string(&b.manufacturer), b.product),
        None => (board_config::Manufacturer::Asus, String::new()),
    }
}

fn manufacturer_from_dmi_string(s: &str) -> board_config::Manufacturer {
    let upper = s.to_ascii_uppercase();
    if upper.contains("GIGABYTE") {
        board_config::Manufacturer::Gigabyte
    } else if upper.contains("MSI") || upper.contains("MICRO-STAR") {
        board_config::Manufacturer::Msi
    } else if upper.contains("ASROCK") {
        board_config::Manufacturer::AsRock
    } else {
        // ASUS and every manufacturer this build doesn't special-case yet: an unmatched
        // model string under any of these variants still falls through to the generic
        // channel-labeling path, so defaulting here costs nothing.
        board_config::Manufacturer::Asus
    }
}

fn default_super_io_counts() -> board_config::ChannelCounts {
    board_config::ChannelCounts {
        voltage: 3,
        temperature: 2,
        fan: 2,
        pwm: 2,
    }
}

/// Approximates a `board_config::Chip` enum member from a catalog `driver_hint` string. The
/// catalog only carries driver-family hints, not this crate's own chip enum, so a hint that
/// names an older or newer sibling of an already-modeled chip still maps to the closest
/// variant rather than being dropped — the two only differ in which `BOARD_CONFIG` entries
/// can match them by exact chip, not in register layout.
fn chip_for_driver_hint(hint: &str) -> Option<board_config::Chip> {
    if hint.starts_with("nct6687") {
        Some(board_config::Chip::Nct6687D)
    } else if hint.starts_with("nct6775") || hint.starts_with("nct6796") {
        Some(board_config::Chip::Nct6798D)
    } else if hint == "it87" {
        Some(board_config::Chip::It8688E)
    } else if hint.starts_with("w83627") {
        Some(board_config::Chip::W83627Dhg)
    } else if hint.starts_with("f7188") || hint.starts_with("f71858") {
        Some(board_config::Chip::F71882Fg)
    } else {
        None
    }
}

fn probe_super_io(tree: &mut ChipTree) {
    let catalog = SioCatalog::compiled();
    let Ok(mut scan_port) = SystemPort::open() else {
        return;
    };
    let found = scan::scan(&mut scan_port, &catalog);
    if found.is_empty() {
        return;
    }
    let (manufacturer, board_model) = board_identity();

    for identified in found {
        // A chip identified only via a vendor password sequence (no direct-ID hit) never
        // had its base address read back; wiring that case to a live driver would need a
        // second config-mode round trip this probe stage doesn't attempt.
        let (Some(base_addr), true) = (identified.base_address, identified.activated) else {
            continue;
        };
        let Some(chip) = chip_for_driver_hint(&identified.signature.driver_hint) else {
            continue;
        };
        let hint = identified.signature.driver_hint.clone();

        // Each live driver gets its own `/dev/port` handle rather than sharing one, since
        // every driver here holds an exclusive `&'static mut dyn PortIo` and boards rarely
        // wire more than one Super-I/O chip at once anyway. Leaked deliberately: these
        // drivers live in the tree for the rest of the process, the same lifetime
        // `Ring0Handle`'s own doc comment already accepts for privileged-access handles.
        let Ok(owned_port) = SystemPort::open() else {
            continue;
        };
        let port: &'static mut dyn PortIo = Box::leak(Box::new(owned_port));

        let driver: Box<dyn SensorChip> = if hint.starts_with("nct6775") || hint.starts_with("nct6687") {
            Box::new(superio::Nct679xChip::new(
                port,
                base_addr,
                &hint,
                manufacturer,
                &board_model,
                chip,
            ))
        } else if hint == "it87" {
            let registers = superio::ite::IteRegisters::new(port, base_addr);
            Box::new(superio::IteChip::new(
                registers,
                base_addr,
                &hint,
                manufacturer,
                &board_model,
                chip,
                default_super_io_counts(),
            ))
        } else if hint.starts_with("w83627") {
            let registers = superio::winbond::WinbondRegisters::new(port, base_addr);
            Box::new(superio::WinbondChip::new(
                registers,
                base_addr,
                &hint,
                manufacturer,
                &board_model,
                chip,
                default_super_io_counts(),
            ))
        } else {
            let registers = superio::fintek::FintekRegisters::new(port, base_addr);
            Box::new(superio::FintekChip::new(
                registers,
                base_addr,
                &hint,
                manufacturer,
                &board_model,
                chip,
                default_super_io_counts(),
            ))
        };

        tree.child_mut("motherboard/lpc").push(driver);
    }
}

/// Asus's extended EC register layout is vendor-specific, so this stage only runs on
/// boards DMI already identifies as Asus; other manufacturers either expose no EC sensors
/// at all or use a layout this build doesn't decode.
fn probe_asus_ec(tree: &mut ChipTree) {
    let (manufacturer, _) = board_identity();
    if manufacturer != board_config::Manufacturer::Asus {
        return;
    }
    let Ok(owned_port) = SystemPort::open() else {
        return;
    };
    let port: &'static mut dyn PortIo = Box::leak(Box::new(owned_port));
    let chip = crate::ec::asus_ec::AsusEcChip::new(port, "asusec");
    tree.child_mut("motherboard/ec").push(Box::new(chip));
}

/// Visits every logical CPU in turn (pinning this thread to it so `cpuid` describes that
/// core specifically), assembling the per-thread APIC topology data
/// [`cpuid::group_by_topology`] groups into packages/cores/threads.
fn build_cpu_topology() -> Option<CpuTopology> {
    let thread_count = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
    let source = RawCpuId;
    let mut vendor = String::new();
    let mut family = 0u32;
    let mut model = 0u32;
    let mut threads = Vec::with_capacity(thread_count);

    for cpu in 0..thread_count {
        let Ok(_guard) = ThreadAffinityGuard::pin_to_cpu(cpu) else {
            continue;
        };
        let leaf1 = source.cpuid(1, 0);
        let apic_id = leaf1[1] >> 24;
        let mut snapshot = cpuid::read_snapshot(&source, apic_id);
        let (f, m) = cpuid::family_and_model(leaf1[0]);
        vendor = snapshot.vendor.clone();
        family = f;
        model = m;

        let (processor_id, core_id, thread_id) = topology_ids_for_thread(&snapshot, &source, f, apic_id);
        snapshot.processor_id = processor_id;
        snapshot.core_id = core_id;
        snapshot.thread_id = thread_id;
        threads.push(snapshot);
    }

    if threads.is_empty() {
        return None;
    }
    let groups = cpuid::group_by_topology(threads);
    Some(CpuTopology::from_groups(vendor, family, model, &groups))
}

/// AMD splits an APIC ID into thread/core/die bits from `cpuid(0x8000001E)`'s thread-count
/// and `maxCoresPerDie` fields; Intel splits it from `cpuid(0xB)`'s logical-processor counts
/// and `cpuid(4)`'s cores-per-package field, via the same [`cpuid::derive_intel_ids`] math
/// the source's topology enumeration already documents.
fn topology_ids_for_thread(
    snapshot: &cpuid::CpuIdData,
    source: &dyn CpuIdSource,
    family: u32,
    apic_id: u32,
) -> (u32, u32, u32) {
    if snapshot.vendor.contains("AMD") {
        let ext = source.cpuid(0x8000_001E, 0);
        let threads_per_core = ((ext[1] >> 8) & 0xFF) + 1;
        let thread_width = cpuid::next_log2(threads_per_core);
        let combined_width = if family >= 0x17 {
            let max_cores_per_die_field = (ext[2] >> 8) & 0x1F;
            cpuid::amd17_core_mask_width(max_cores_per_die_field)
        } else {
            thread_width
        };
        let thread_id = apic_id & (1u32 << thread_width).saturating_sub(1);
        let core_width = combined_width.saturating_sub(thread_width);
        let core_id = (apic_id >> thread_width) & (1u32 << core_width).saturating_sub(1);
        let processor_id = apic_id >> combined_width.max(thread_width);
        (processor_id, core_id, thread_id)
    } else {
        let leaf4 = source.cpuid(4, 0);
        let max_core_id_per_package = ((leaf4[0] >> 26) & 0x3F) + 1;
        let leaf0b_core_level = source.cpuid(0x0B, 1);
        let max_core_and_thread_id_per_package = if leaf0b_core_level[1] != 0 {
            leaf0b_core_level[1]
        } else {
            max_core_id_per_package
        };
        let (thread_id, core_id, processor_id) =
            cpuid::derive_intel_ids(apic_id, max_core_and_thread_id_per_package, max_core_id_per_package);
        (processor_id, core_id, thread_id)
    }
}

fn probe_cpu(tree: &mut ChipTree) {
    let Some(topology) = build_cpu_topology() else {
        return;
    };
    let Ok(handle) = Ring0Handle::acquire() else {
        return;
    };
    // Chips built here read MSRs directly through `DevMsr`/`ProcBusPci` independent of this
    // handle, but the `msr` module only stays loaded while at least one handle is alive;
    // leaking it keeps the module present for the rest of the process instead of unloading
    // it the instant this function returns.
    std::mem::forget(handle);

    let msr: Arc<dyn ring0::MsrAccess> = Arc::new(ring0::DevMsr);
    let pci: Arc<dyn ring0::PciAccess> = Arc::new(ring0::ProcBusPci);
    if let Some(chip) = cpu::build_chip(&topology, msr, pci) {
        tree.child_mut("cpu").push(chip);
    }
}

fn probe_memory(tree: &mut ChipTree) {
    tree.child_mut("memory").push(Box::new(GenericMemory::new()));
}

fn probe_hid(tree: &mut ChipTree) {
    let Ok(api) = hidapi::HidApi::new() else {
        return;
    };
    for device in api.device_list() {
        if let Some(chip) = hid::kraken_x3::open_if_matching(&api, device) {
            tree.child_mut("hid/kraken-x3").push(Box::new(chip));
        } else if let Some(chip) = hid::p7h1::open_if_matching(&api, device) {
            tree.child_mut("hid/p7h1").push(Box::new(chip));
        } else if let Some(chip) = hid::corsair_psu::open_if_matching(&api, device) {
            tree.child_mut("hid/corsair-psu").push(Box::new(chip));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probe_all_always_reports_memory_chip() {
        let tree = probe_all();
        let memory = tree.child("memory").expect("memory node present");
        assert_eq!(memory.payloads().len(), 1);
    }

    #[test]
    fn chip_for_driver_hint_maps_known_families() {
        assert_eq!(chip_for_driver_hint("it87"), Some(board_config::Chip::It8688E));
        assert_eq!(
            chip_for_driver_hint("nct6687d"),
            Some(board_config::Chip::Nct6687D)
        );
        assert_eq!(chip_for_driver_hint("sch5627"), None);
    }

    #[test]
    fn manufacturer_from_dmi_string_recognizes_known_vendors() {
        assert_eq!(
            manufacturer_from_dmi_string("Gigabyte Technology Co., Ltd."),
            board_config::Manufacturer::Gigabyte
        );
        assert_eq!(manufacturer_from_dmi_string("ASRock"), board_config::Manufacturer::AsRock);
        assert_eq!(
            manufacturer_from_dmi_string("Micro-Star International Co., Ltd."),
            board_config::Manufacturer::Msi
        );
    }
}
