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

//! Raw x86 I/O port access via `/dev/port`. A single byte-oriented `PortIo` seam covers both
//! chip identification (this crate) and live register decode (`sensors::superio::port`) so
//! both can be exercised against the same recorded-reply test double.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};

#[derive(Debug)]
pub enum PortIoError {
    OpenFailed(io::Error),
    IoFailed(io::Error),
}

impl std::fmt::Display for PortIoError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PortIoError::OpenFailed(e) => write!(f, "opening /dev/port failed: {e}"),
            PortIoError::IoFailed(e) => write!(f, "port i/o failed: {e}"),
        }
    }
}

impl std::error::Error for PortIoError {}

/// One byte in, one byte out, addressed by port number — the two x86 `IN`/`OUT`
/// instructions, nothing more.
pub trait PortIo: Send + Sync {
    fn inb(&mut self, port: u16) -> Result<u8, PortIoError>;
    fn outb(&mut self, port: u16, value: u8) -> Result<(), PortIoError>;
}

/// `/dev/port` treats the I/O address space as a byte-seekable file: seeking to the port
/// number and reading/writing one byte performs the corresponding `IN`/`OUT`.
#[cfg(target_arch = "x86_64")]
pub struct SystemPort {
    handle: File,
}

#[cfg(target_arch = "x86_64")]
impl SystemPort {
    pub fn open() -> Result<Self, PortIoError> {
        let handle = OpenOptions::new()
            .read(true)
            .write(true)
            .open("/dev/port")
            .map_err(PortIoError::OpenFailed)?;
        Ok(Self { handle })
    }

    fn seek_to(&mut self, port: u16) -> Result<(), PortIoError> {
        self.handle
            .seek(SeekFrom::Start(port as u64))
            .map(|_| ())
            .map_err(PortIoError::IoFailed)
    }
}

#[cfg(target_arch = "x86_64")]
impl PortIo for SystemPort {
    fn inb(&mut self, port: u16) -> Result<u8, PortIoError> {
        self.seek_to(port)?;
        let mut byte = [0u8; 1];
        self.handle.read_exact(&mut byte).map_err(PortIoError::IoFailed)?;
        Ok(byte[0])
    }

    fn outb(&mut self, port: u16, value: u8) -> Result<(), PortIoError> {
        self.seek_to(port)?;
        self.handle.write_all(&[value]).map_err(PortIoError::IoFailed)
    }
}

/// One logged transaction, kept in call order so tests can assert both the sequence and the
/// exact register addressed (not just the final value).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transaction {
    Read { port: u16, value: u8 },
    Write { port: u16, value: u8 },
}

/// Test double: every `inb` pops the next queued reply (or `0xFF` once the queue is
/// exhausted, matching an unpopulated I/O line floating high); every transaction, read or
/// write, is appended to `log` for assertions.
#[cfg(test)]
pub struct RecordingPort {
    replies: std::collections::VecDeque<u8>,
    pub log: Vec<Transaction>,
}

#[cfg(test)]
impl RecordingPort {
    pub fn with_replies(replies: Vec<u8>) -> Self {
        Self {
            replies: replies.into(),
            log: Vec::new(),
        }
    }

    /// The `(port, value)` pairs written, in order — the shape most identification tests
    /// care about.
    pub fn writes(&self) -> Vec<(u16, u8)> {
        self.log
            .iter()
            .filter_map(|t| match *t {
                Transaction::Write { port, value } => Some((port, value)),
                Transaction::Read { .. } => None,
            })
            .collect()
    }
}

#[cfg(test)]
impl PortIo for RecordingPort {
    fn inb(&mut self, port: u16) -> Result<u8, PortIoError> {
        let value = self.replies.pop_front().unwrap_or(0xFF);
        self.log.push(Transaction::Read { port, value });
        Ok(value)
    }

    fn outb(&mut self, port: u16, value: u8) -> Result<(), PortIoError> {
        self.log.push(Transaction::Write { port, value });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_port_replays_queue_then_floats_high() {
        let mut port = RecordingPort::with_replies(vec![0x12, 0x34]);
        assert_eq!(port.inb(0x2E).unwrap(), 0x12);
        assert_eq!(port.inb(0x2E).unwrap(), 0x34);
        assert_eq!(port.inb(0x2E).unwrap(), 0xFF);
    }

    #[test]
    fn recording_port_logs_writes_in_order() {
        let mut port = RecordingPort::with_replies(vec![]);
        port.outb(0x2E, 0x87).unwrap();
        port.outb(0x2E, 0x87).unwrap();
        assert_eq!(port.writes(), vec![(0x2E, 0x87), (0x2E, 0x87)]);
    }
}
