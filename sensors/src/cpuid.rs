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

//! Per-thread CPUID snapshots and the APIC-ID-based thread/core/package grouping that CPU
//! drivers build their sensor layout from. Affinity pinning on Linux is `sched_setaffinity`
//! rather than Windows `GroupAffinity`, hidden behind [`ThreadAffinityGuard`].

use std::collections::BTreeMap;

use crate::error::{SensorError, SensorResult};

const MAX_LEAVES: usize = 1024;

#[derive(Debug, Clone, Default)]
pub struct CpuIdData {
    pub vendor: String,
    pub data: Vec<[u32; 4]>,
    pub ext_data: Vec<[u32; 4]>,
    pub apic_id: u32,
    pub processor_id: u32,
    pub core_id: u32,
    pub thread_id: u32,
}

/// Seam over the raw `cpuid` instruction so grouping logic is testable without running on
/// the pinned thread.
pub trait CpuIdSource {
    fn cpuid(&self, leaf: u32, subleaf: u32) -> [u32; 4];
}

pub struct RawCpuId;

impl CpuIdSource for RawCpuId {
    #[cfg(target_arch = "x86_64")]
    fn cpuid(&self, leaf: u32, subleaf: u32) -> [u32; 4] {
        use std::arch::x86_64::__cpuid_count;
        unsafe {
            let r = __cpuid_count(leaf, subleaf);
            [r.eax, r.ebx, r.ecx, r.edx]
        }
    }

    #[cfg(not(target_arch = "x86_64"))]
    fn cpuid(&self, _leaf: u32, _subleaf: u32) -> [u32; 4] {
        [0, 0, 0, 0]
    }
}

/// Smallest `n` such that `2^n >= value`. `0` and `1` both need zero bits.
pub fn next_log2(value: u32) -> u32 {
    if value <= 1 {
        return 0;
    }
    32 - (value - 1).leading_zeros()
}

/// Derives `(thread_id, core_id, processor_id)` from an APIC ID given the Intel topology
/// widths computed from `cpuid(0xB)`/`cpuid(4)` leaves.
pub fn derive_intel_ids(
    apic_id: u32,
    max_core_and_thread_id_per_package: u32,
    max_core_id_per_package: u32,
) -> (u32, u32, u32) {
    let thread_mask_width = next_log2(
        (max_core_and_thread_id_per_package / max_core_id_per_package.max(1)).max(1),
    );
    let core_mask_width = next_log2(max_core_id_per_package.max(1));
    let thread_id = apic_id & ((1 << thread_mask_width) - 1).max(0);
    let core_id = (apic_id >> thread_mask_width) & ((1u32 << core_mask_width).wrapping_sub(1));
    let processor_id = apic_id >> (thread_mask_width + core_mask_width);
    (thread_id, core_id, processor_id)
}

/// AMD family 17h/19h `coreMaskWidth` comes from the `maxCoresPerDie` field of
/// `cpuid(0x8000001E)` ecx bits [12:8]: 4 -> 16 threads/die, 5 -> 32, 6 -> 64.
pub fn amd17_core_mask_width(max_cores_per_die_field: u32) -> u32 {
    match max_cores_per_die_field {
        4 => next_log2(16),
        5 => next_log2(32),
        6 => next_log2(64),
        other => next_log2(1 << other.max(1)),
    }
}

/// Groups flat per-thread data as `[package][core][thread]`, matching the source's
/// `Vec<Vec<Vec<CpuIdData>>>` ordering.
pub fn group_by_topology(threads: Vec<CpuIdData>) -> Vec<Vec<Vec<CpuIdData>>> {
    let mut by_package: BTreeMap<u32, BTreeMap<u32, Vec<CpuIdData>>> = BTreeMap::new();
    for t in threads {
        by_package
            .entry(t.processor_id)
            .or_default()
            .entry(t.core_id)
            .or_default()
            .push(t);
    }
    by_package
        .into_values()
        .map(|cores| cores.into_values().collect())
        .collect()
}

pub fn read_snapshot(source: &dyn CpuIdSource, apic_id: u32) -> CpuIdData {
    let leaf0 = source.cpuid(0, 0);
    let max_leaf = leaf0[0];
    let vendor = vendor_string(leaf0);

    let mut data = Vec::new();
    for leaf in 0..=max_leaf.min(MAX_LEAVES as u32 - 1) {
        data.push(source.cpuid(leaf, 0));
    }

    let ext_leaf0 = source.cpuid(0x8000_0000, 0);
    let max_ext_leaf = ext_leaf0[0];
    let mut ext_data = Vec::new();
    if max_ext_leaf & 0x8000_0000 != 0 {
        let count = (max_ext_leaf & 0xFFFF).min(MAX_LEAVES as u32 - 1);
        for leaf in 0..=count {
            ext_data.push(source.cpuid(0x8000_0000 + leaf, 0));
        }
    }

    CpuIdData {
        vendor,
        data,
        ext_data,
        apic_id,
        processor_id: 0,
        core_id: 0,
        thread_id: 0,
    }
}

/// Standard x86 family/model extraction from `cpuid(1).eax`: the extended family byte only
/// adds onto the base family when the base family reads as the escape value `0xF`, and the
/// extended model nibble only matters for family `0xF` or Intel's family `0x6`.
pub fn family_and_model(leaf1_eax: u32) -> (u32, u32) {
    let base_family = (leaf1_eax >> 8) & 0xF;
    let ext_family = (leaf1_eax >> 20) & 0xFF;
    let family = if base_family == 0xF { base_family + ext_family } else { base_family };

    let base_model = (leaf1_eax >> 4) & 0xF;
    let ext_model = (leaf1_eax >> 16) & 0xF;
    let model = if base_family == 0xF || base_family == 0x6 {
        (ext_model << 4) | base_model
    } else {
        base_model
    };
    (family, model)
}

/// Pins the calling thread to one logical CPU for the duration of the guard, restoring the
/// prior affinity mask on drop. `cpuid` only ever describes the core it executes on, so
/// building a topology snapshot for every logical CPU means visiting each one in turn.
#[cfg(target_os = "linux")]
pub struct ThreadAffinityGuard {
    previous: nix::sched::CpuSet,
}

#[cfg(target_os = "linux")]
impl ThreadAffinityGuard {
    pub fn pin_to_cpu(cpu: usize) -> SensorResult<Self> {
        let this_thread = nix::unistd::Pid::from_raw(0);
        let previous = nix::sched::sched_getaffinity(this_thread)
            .map_err(|e| SensorError::transient(format!("sched_getaffinity: {e}")))?;
        let mut target = nix::sched::CpuSet::new();
        target
            .set(cpu)
            .map_err(|e| SensorError::transient(format!("invalid cpu index {cpu}: {e}")))?;
        nix::sched::sched_setaffinity(this_thread, &target)
            .map_err(|e| SensorError::transient(format!("sched_setaffinity({cpu}): {e}")))?;
        Ok(Self { previous })
    }
}

#[cfg(target_os = "linux")]
impl Drop for ThreadAffinityGuard {
    fn drop(&mut self) {
        let this_thread = nix::unistd::Pid::from_raw(0);
        let _ = nix::sched::sched_setaffinity(this_thread, &self.previous);
    }
}

fn vendor_string(leaf0: [u32; 4]) -> String {
    let mut bytes = Vec::with_capacity(12);
    bytes.extend_from_slice(&leaf0[1].to_le_bytes());
    bytes.extend_from_slice(&leaf0[3].to_le_bytes());
    bytes.extend_from_slice(&leaf0[2].to_le_bytes());
    String::from_utf8_lossy(&bytes).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_log2_matches_expected_bit_widths() {
        assert_eq!(next_log2(1), 0);
        assert_eq!(next_log2(2), 1);
        assert_eq!(next_log2(8), 3);
        assert_eq!(next_log2(9), 4);
    }

    #[test]
    fn amd17_core_mask_width_matches_table() {
        assert_eq!(amd17_core_mask_width(4), 4);
        assert_eq!(amd17_core_mask_width(5), 5);
        assert_eq!(amd17_core_mask_width(6), 6);
    }

    #[test]
    fn derive_intel_ids_splits_apic_id() {
        // 2 threads/core (width 1), 8 cores/package (width 3): apic layout
        // [processor_id | core_id(3) | thread_id(1)]
        let apic_id = (2u32 << 4) | (3 << 1) | 1;
        let (thread, core, processor) = derive_intel_ids(apic_id, 16, 8);
        assert_eq!(thread, 1);
        assert_eq!(core, 3);
        assert_eq!(processor, 2);
    }

    #[test]
    fn family_and_model_handles_the_family_f_escape() {
        // base family 6, base model 0xA, no extended fields: a plain Sandy-Bridge-era Intel part
        let eax = (6 << 8) | (0xA << 4);
        assert_eq!(family_and_model(eax), (6, 0xA));
    }

    #[test]
    fn family_and_model_adds_extended_family_past_0xf() {
        // base family 0xF, extended family 8 -> reported family 0x17 (AMD Zen)
        let eax = (0xF << 8) | (8 << 20);
        assert_eq!(family_and_model(eax).0, 0x17);
    }

    #[test]
    fn group_by_topology_orders_package_core_thread() {
        let mk = |p, c, t| CpuIdData {
            processor_id: p,
            core_id: c,
            thread_id: t,
            ..Default::default()
        };
        let threads = vec![mk(0, 1, 0), mk(0, 0, 0), mk(0, 0, 1), mk(1, 0, 0)];
        let grouped = group_by_topology(threads);
        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped[0].len(), 2); // package 0 has core 0 and core 1
        assert_eq!(grouped[0][0].len(), 2); // core 0 has two threads
    }
}
