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

//! Test-only hardware seam mocks shared across this crate's `#[cfg(test)]` modules.
//! `sensors_detect::port_io::MockPortIo` is itself `#[cfg(test)]`-gated inside its own
//! crate, so it isn't visible here as a dependency — this is a standalone re-implementation
//! of the same [`sensors_detect::port_io::PortIo`] contract.

#![cfg(test)]

use sensors_detect::port_io::{PortIo, PortIoError};

pub struct MockPortIo {
    read_sequence: Vec<u8>,
    read_index: usize,
    pub writes: Vec<(u16, u8)>,
}

impl MockPortIo {
    pub fn new(read_sequence: Vec<u8>) -> Self {
        Self {
            read_sequence,
            read_index: 0,
            writes: Vec::new(),
        }
    }
}

impl PortIo for MockPortIo {
    fn inb(&mut self, _port: u16) -> Result<u8, PortIoError> {
        let value = self.read_sequence.get(self.read_index).copied().unwrap_or(0xFF);
        self.read_index += 1;
        Ok(value)
    }

    fn outb(&mut self, port: u16, value: u8) -> Result<(), PortIoError> {
        self.writes.push((port, value));
        Ok(())
    }
}
