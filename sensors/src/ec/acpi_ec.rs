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

//! ACPI embedded controller command/data port protocol: command port `0x66`, data port
//! `0x62`. `RD_EC`/`WR_EC` are the two commands every vendor's extended EC protocol
//! (Asus, Super-I/O-hosted EC) builds on top of.

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use sensors_detect::port_io::PortIo;

use crate::error::{SensorError, SensorResult};

pub const EC_COMMAND_PORT: u16 = 0x66;
pub const EC_DATA_PORT: u16 = 0x62;

pub const RD_EC: u8 = 0x80;
pub const WR_EC: u8 = 0x81;

const OBF: u8 = 1 << 0; // output buffer full: a byte is waiting to be read
const IBF: u8 = 1 << 1; // input buffer full: the EC hasn't consumed the last byte yet

const POLL_ATTEMPTS: u32 = 50;
const POLL_INTERVAL: Duration = Duration::from_millis(1);

/// After this many consecutive transaction failures the EC is assumed wedged or absent;
/// further reads fail immediately rather than spending another 50ms polling a dead chip.
const FAIL_FAST_THRESHOLD: u32 = 20;

pub struct AcpiEc<'a> {
    port: &'a mut dyn PortIo,
    consecutive_failures: AtomicU32,
}

impl<'a> AcpiEc<'a> {
    pub fn new(port: &'a mut dyn PortIo) -> Self {
        Self {
            port,
            consecutive_failures: AtomicU32::new(0),
        }
    }

    fn wait_for(&mut self, mask: u8, set: bool) -> SensorResult<()> {
        for _ in 0..POLL_ATTEMPTS {
            let status = self
                .port
                .inb(EC_COMMAND_PORT)
                .map_err(|e| SensorError::transient(format!("ec status read: {e}")))?;
            if (status & mask != 0) == set {
                return Ok(());
            }
            std::thread::sleep(POLL_INTERVAL);
        }
        Err(SensorError::transient("ec transaction timed out"))
    }

    fn transact(&mut self, cmd: u8, address: u8) -> SensorResult<u8> {
        if self.consecutive_failures.load(Ordering::SeqCst) >= FAIL_FAST_THRESHOLD {
            return Err(SensorError::transient(
                "ec marked unresponsive after repeated failures",
            ));
        }

        let result = self.transact_inner(cmd, address);
        match &result {
            Ok(_) => self.consecutive_failures.store(0, Ordering::SeqCst),
            Err(_) => {
                self.consecutive_failures.fetch_add(1, Ordering::SeqCst);
            }
        }
        result
    }

    fn transact_inner(&mut self, cmd: u8, address: u8) -> SensorResult<u8> {
        self.wait_for(IBF, false)?;
        self.port
            .outb(EC_COMMAND_PORT, cmd)
            .map_err(|e| SensorError::transient(format!("ec command write: {e}")))?;

        self.wait_for(IBF, false)?;
        self.port
            .outb(EC_DATA_PORT, address)
            .map_err(|e| SensorError::transient(format!("ec address write: {e}")))?;

        self.wait_for(OBF, true)?;
        self.port
            .inb(EC_DATA_PORT)
            .map_err(|e| SensorError::transient(format!("ec data read: {e}")))
    }

    pub fn read_register(&mut self, address: u8) -> SensorResult<u8> {
        self.transact(RD_EC, address)
    }

    fn write_inner(&mut self, address: u8, value: u8) -> SensorResult<()> {
        self.wait_for(IBF, false)?;
        self.port
            .outb(EC_COMMAND_PORT, WR_EC)
            .map_err(|e| SensorError::transient(format!("ec command write: {e}")))?;

        self.wait_for(IBF, false)?;
        self.port
            .outb(EC_DATA_PORT, address)
            .map_err(|e| SensorError::transient(format!("ec address write: {e}")))?;

        self.wait_for(IBF, false)?;
        self.port
            .outb(EC_DATA_PORT, value)
            .map_err(|e| SensorError::transient(format!("ec value write: {e}")))
    }

    pub fn write_register(&mut self, address: u8, value: u8) -> SensorResult<()> {
        if self.consecutive_failures.load(Ordering::SeqCst) >= FAIL_FAST_THRESHOLD {
            return Err(SensorError::transient(
                "ec marked unresponsive after repeated failures",
            ));
        }
        let result = self.write_inner(address, value);
        match &result {
            Ok(_) => self.consecutive_failures.store(0, Ordering::SeqCst),
            Err(_) => {
                self.consecutive_failures.fetch_add(1, Ordering::SeqCst);
            }
        }
        result
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sensors_detect::port_io::PortIoError;

    /// Always-ready EC: command-port reads report OBF/IBF already in the state the caller
    /// is waiting for, so no poll loop actually iterates.
    struct ReadyEc {
        register_value: u8,
        status_sequence: Vec<u8>,
        status_index: usize,
    }

    impl PortIo for ReadyEc {
        fn inb(&mut self, port: u16) -> Result<u8, PortIoError> {
            if port == EC_COMMAND_PORT {
                let v = self
                    .status_sequence
                    .get(self.status_index)
                    .copied()
                    .unwrap_or(*self.status_sequence.last().unwrap());
                self.status_index += 1;
                Ok(v)
            } else {
                Ok(self.register_value)
            }
        }

        fn outb(&mut self, _port: u16, _value: u8) -> Result<(), PortIoError> {
            Ok(())
        }
    }

    #[test]
    fn single_register_read_returns_expected_byte() {
        // status sequence: IBF clear before command, IBF clear before address, OBF set
        // before the final data read.
        let mut ec = ReadyEc {
            register_value: 0x34,
            status_sequence: vec![0x00, 0x00, OBF],
            status_index: 0,
        };
        let mut controller = AcpiEc::new(&mut ec);
        let value = controller.read_register(0x00).unwrap();
        assert_eq!(value, 0x34);
    }

    #[test]
    fn fail_fast_after_threshold() {
        struct NeverReady;
        impl PortIo for NeverReady {
            fn inb(&mut self, port: u16) -> Result<u8, PortIoError> {
                if port == EC_COMMAND_PORT {
                    Ok(IBF) // input buffer never clears -> every transaction times out
                } else {
                    Ok(0)
                }
            }
            fn outb(&mut self, _port: u16, _value: u8) -> Result<(), PortIoError> {
                Ok(())
            }
        }
        let mut dev = NeverReady;
        let mut controller = AcpiEc::new(&mut dev);
        for _ in 0..20 {
            assert!(controller.read_register(0x00).is_err());
        }
        assert_eq!(controller.consecutive_failures(), 20);
        // the 21st call short-circuits before even touching the port
        assert!(controller.read_register(0x00).is_err());
    }
}
