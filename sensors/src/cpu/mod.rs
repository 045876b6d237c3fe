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

//! CPU chip drivers, one submodule per vendor/family MSR and PCI layout. Every driver
//! reads through [`crate::ring0::MsrAccess`]/[`crate::ring0::PciAccess`] rather than the
//! concrete `/dev/cpu/*/msr` files directly, so register-decode logic is testable without
//! real hardware.

pub mod amd0f;
pub mod amd10;
pub mod amd17;
pub mod generic;
pub mod intel;

use crate::cpuid::CpuIdData;

/// Per-core topology plus identifying CPUID leaves a probe needs to pick a driver family.
#[derive(Debug, Clone)]
pub struct CpuTopology {
    pub vendor: String,
    pub family: u32,
    pub model: u32,
    pub package_count: usize,
    pub core_count: usize,
    pub thread_count: usize,
}

impl CpuTopology {
    pub fn from_groups(vendor: String, family: u32, model: u32, groups: &[Vec<Vec<CpuIdData>>]) -> Self {
        let package_count = groups.len();
        let core_count = groups.iter().map(|p| p.len()).sum();
        let thread_count = groups.iter().flat_map(|p| p.iter()).map(|c| c.len()).sum();
        Self {
            vendor,
            family,
            model,
            package_count,
            core_count,
            thread_count,
        }
    }

    fn is_amd(&self) -> bool {
        self.vendor.contains("AMD")
    }

    fn is_intel(&self) -> bool {
        self.vendor.contains("Intel") || self.vendor.contains("GenuineIntel")
    }
}

/// Picks and constructs the one CPU family driver matching `topology`, wiring it into a
/// [`generic::GenericCpuChip`]. Families this build doesn't recognize (unusual vendors,
/// AMD families outside 0Fh/10h-16h/17h+) report nothing rather than guessing.
///
/// `msr`/`pci` are `Arc` rather than `Box` because a multi-package AMD 17h+ system hands one
/// [`amd17::PackagePowerReader`] per package its own handle onto the same underlying
/// `/dev/cpu/*/msr` facade.
pub fn build_chip(
    topology: &CpuTopology,
    msr: std::sync::Arc<dyn crate::ring0::MsrAccess>,
    pci: std::sync::Arc<dyn crate::ring0::PciAccess>,
) -> Option<Box<dyn crate::chip::SensorChip>> {
    // Each package's northbridge/SMN function lives at PCI device 0x18 + package index,
    // function 3, on this platform's conventions (bus 0) — the fixed mapping every
    // AMD desktop/server chipset from K8 onward documents for its thermal/RAPL functions.
    let package_pci_addresses: Vec<u32> = (0..topology.package_count)
        .map(|pkg| crate::ring0::pci_address(0, 0x18 + pkg as u8, 3))
        .collect();
    let cpus: Vec<u32> = (0..topology.thread_count as u32).collect();

    let sensor: Box<dyn generic::PackageSensor> = if topology.is_amd() && topology.family >= 0x17 {
        let readers = (0..topology.package_count)
            .map(|pkg| amd17::PackagePowerReader::new(msr.clone(), pkg as u32))
            .collect();
        Box::new(amd17::Amd17Cpu::new(readers))
    } else if topology.is_amd() && (0x10..0x17).contains(&topology.family) {
        Box::new(amd10::Amd10Cpu::new(pci, package_pci_addresses))
    } else if topology.is_amd() && topology.family == 0x0F {
        Box::new(amd0f::Amd0FCpu::new(pci, package_pci_addresses))
    } else if topology.is_intel() {
        Box::new(intel::IntelCpu::new(msr, cpus))
    } else {
        return None;
    };

    Some(Box::new(generic::GenericCpuChip::new(
        hardware_type_name(topology),
        vec![sensor],
    )))
}

fn hardware_type_name(topology: &CpuTopology) -> &'static str {
    if topology.is_amd() && topology.family >= 0x17 {
        "amdcpu"
    } else if topology.is_amd() {
        "amdcpu-legacy"
    } else {
        "intelcpu"
    }
}
