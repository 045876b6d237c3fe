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

//! Process-wide privileged-access facade. Every MSR, I/O-port, PCI-config, and
//! physical-memory access in the whole crate funnels through here; no other module is
//! allowed to open `/dev/port`, `/dev/cpu/*/msr`, or `/dev/mem` directly.
//!
//! The source this is modeled on installs two Windows kernel drivers on first use
//! (WinRing0-style MSR/IO/PCI, InpOut-style phys-mem map) and ref-counts their lifetime.
//! On Linux there is no equivalent driver-install step: MSR access is the stock `msr`
//! kernel module (`/dev/cpu/N/msr`), I/O ports are `/dev/port` (already wrapped by
//! [`sensors_detect::port_io`]), PCI configuration space is `/sys/bus/pci/devices/.../config`,
//! and physical memory is `/dev/mem`. "Install the driver" becomes "make sure `msr` is
//! loaded", reusing `sensors-detect`'s own blacklist/conflict-aware loader.

pub mod mutex;

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use sensors_detect::module_loader::{load_module, LoadResult};

use crate::error::{SensorError, SensorResult};
use mutex::GlobalMutex;

pub const INVALID_PCI_ADDRESS: u32 = 0xFFFF_FFFF;

/// `(bus << 8) | ((device & 0x1F) << 3) | (func & 7)`, matching the source's PCI address
/// packing.
pub fn pci_address(bus: u8, device: u8, func: u8) -> u32 {
    ((bus as u32) << 8) | (((device & 0x1F) as u32) << 3) | ((func & 7) as u32)
}

/// Reference-counted, lazily-initialized process singleton. `acquire()` bumps the count
/// (loading the `msr` module on the first call); dropping the returned [`Ring0Handle`]
/// decrements it. The facade itself is never torn down implicitly on `main` exit — the
/// embedding binary is expected to drop its last handle explicitly, matching the source's
/// "explicit teardown via cleanup is required" note.
static REFCOUNT: AtomicUsize = AtomicUsize::new(0);

pub struct Ring0Handle {
    _private: (),
}

impl Ring0Handle {
    pub fn acquire() -> SensorResult<Self> {
        if REFCOUNT.fetch_add(1, Ordering::SeqCst) == 0 {
            match load_module("msr", &["msr".to_string()]) {
                LoadResult::Loaded | LoadResult::AlreadyLoaded => {}
                other => {
                    REFCOUNT.fetch_sub(1, Ordering::SeqCst);
                    return Err(SensorError::Fatal {
                        msg: format!("could not ensure msr module is loaded: {other:?}"),
                    });
                }
            }
        }
        Ok(Self { _private: () })
    }
}

impl Drop for Ring0Handle {
    fn drop(&mut self) {
        REFCOUNT.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Seam over `/dev/cpu/N/msr` so chip drivers can be tested without real hardware.
pub trait MsrAccess: Send + Sync {
    fn read_msr(&self, cpu: u32, index: u32) -> SensorResult<(u32, u32)>;
    fn write_msr(&self, cpu: u32, index: u32, eax: u32, edx: u32) -> SensorResult<()>;
}

pub struct DevMsr;

impl MsrAccess for DevMsr {
    fn read_msr(&self, cpu: u32, index: u32) -> SensorResult<(u32, u32)> {
        let mut f = open_msr(cpu)?;
        f.seek(SeekFrom::Start(index as u64))
            .map_err(|e| SensorError::transient(format!("seek msr: {e}")))?;
        let mut buf = [0u8; 8];
        f.read_exact(&mut buf)
            .map_err(|e| SensorError::transient(format!("read msr {index:#x}: {e}")))?;
        let eax = u32::from_le_bytes(buf[0..4].try_into().unwrap());
        let edx = u32::from_le_bytes(buf[4..8].try_into().unwrap());
        Ok((eax, edx))
    }

    fn write_msr(&self, cpu: u32, index: u32, eax: u32, edx: u32) -> SensorResult<()> {
        let mut f = OpenOptions::new()
            .write(true)
            .open(format!("/dev/cpu/{cpu}/msr"))
            .map_err(|e| SensorError::transient(format!("open msr for write: {e}")))?;
        f.seek(SeekFrom::Start(index as u64))
            .map_err(|e| SensorError::transient(format!("seek msr: {e}")))?;
        let mut buf = [0u8; 8];
        buf[0..4].copy_from_slice(&eax.to_le_bytes());
        buf[4..8].copy_from_slice(&edx.to_le_bytes());
        f.write_all(&buf)
            .map_err(|e| SensorError::transient(format!("write msr {index:#x}: {e}")))
    }
}

fn open_msr(cpu: u32) -> SensorResult<File> {
    File::open(format!("/dev/cpu/{cpu}/msr"))
        .map_err(|e| SensorError::transient(format!("open msr for cpu {cpu}: {e}")))
}

/// Seam over PCI configuration space, addressed the same way as `pci_address`.
pub trait PciAccess: Send + Sync {
    fn read_pci_config(&self, address: u32, reg: u16) -> SensorResult<u32>;
    fn write_pci_config(&self, address: u32, reg: u16, value: u32) -> SensorResult<()>;
}

/// Reads/writes via `/proc/bus/pci/<bus>/<devfn>`, serialized by the PCI bus mutex as the
/// source mandates.
pub struct ProcBusPci;

impl PciAccess for ProcBusPci {
    fn read_pci_config(&self, address: u32, reg: u16) -> SensorResult<u32> {
        if address == INVALID_PCI_ADDRESS {
            return Ok(0);
        }
        let _guard = mutex::try_lock(GlobalMutex::PciBus, Duration::from_millis(10))?;
        let (bus, devfn) = split_pci_address(address);
        let mut f = File::open(format!("/proc/bus/pci/{bus:02x}/{devfn:02x}"))
            .map_err(|e| SensorError::transient(format!("open pci config: {e}")))?;
        f.seek(SeekFrom::Start(reg as u64))
            .map_err(|e| SensorError::transient(format!("seek pci config: {e}")))?;
        let mut buf = [0u8; 4];
        f.read_exact(&mut buf)
            .map_err(|e| SensorError::transient(format!("read pci config: {e}")))?;
        Ok(u32::from_le_bytes(buf))
    }

    fn write_pci_config(&self, address: u32, reg: u16, value: u32) -> SensorResult<()> {
        if address == INVALID_PCI_ADDRESS {
            return Ok(());
        }
        let _guard = mutex::try_lock(GlobalMutex::PciBus, Duration::from_millis(10))?;
        let (bus, devfn) = split_pci_address(address);
        let mut f = OpenOptions::new()
            .write(true)
            .open(format!("/proc/bus/pci/{bus:02x}/{devfn:02x}"))
            .map_err(|e| SensorError::transient(format!("open pci config for write: {e}")))?;
        f.seek(SeekFrom::Start(reg as u64))
            .map_err(|e| SensorError::transient(format!("seek pci config: {e}")))?;
        f.write_all(&value.to_le_bytes())
            .map_err(|e| SensorError::transient(format!("write pci config: {e}")))
    }
}

fn split_pci_address(address: u32) -> (u8, u8) {
    let bus = ((address >> 8) & 0xFF) as u8;
    let devfn = (address & 0xFF) as u8;
    (bus, devfn)
}

/// Physical-memory window reads via `/dev/mem`, mirroring the second driver's
/// MapPhys/UnmapPhys ioctls.
pub struct PhysMem {
    file: Mutex<File>,
}

impl PhysMem {
    pub fn open() -> SensorResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .open("/dev/mem")
            .map_err(|e| SensorError::Fatal {
                msg: format!("opening /dev/mem: {e}"),
            })?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }

    pub fn read_memory(&self, phys_addr: u64, buf: &mut [u8]) -> SensorResult<()> {
        let mut file = self.file.lock().expect("phys mem mutex poisoned");
        file.seek(SeekFrom::Start(phys_addr))
            .map_err(|e| SensorError::transient(format!("seek /dev/mem: {e}")))?;
        file.read_exact(buf)
            .map_err(|e| SensorError::transient(format!("read /dev/mem: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pci_address_packs_fields() {
        assert_eq!(pci_address(0, 0x18, 3), (0x18 << 3) | 3);
        assert_eq!(pci_address(1, 0, 0), 1 << 8);
    }

    #[test]
    fn invalid_pci_address_short_circuits_reads() {
        let dev = ProcBusPci;
        assert_eq!(dev.read_pci_config(INVALID_PCI_ADDRESS, 0xE4).unwrap(), 0);
    }
}
