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

//! Runtime register access for the hardware-monitor logical device, once
//! [`sensors_detect::superio`] has already identified the chip and its base address. This
//! is deliberately a separate, simpler port abstraction from `sensors_detect::superio`'s
//! config-mode entry/exit dance: by the time a chip driver reads a sensor, the chip is
//! already out of configuration mode and stays there.

use sensors_detect::port_io::{PortIo, PortIoError};

use crate::error::{SensorError, SensorResult};

fn map_err(e: PortIoError) -> SensorError {
    SensorError::transient(format!("superio port io: {e}"))
}

/// One index/data register pair at a fixed I/O base.
pub struct SingleBankPort<'a> {
    port: &'a mut dyn PortIo,
    index_addr: u16,
    data_addr: u16,
}

impl<'a> SingleBankPort<'a> {
    pub fn new(port: &'a mut dyn PortIo, index_addr: u16, data_addr: u16) -> Self {
        Self {
            port,
            index_addr,
            data_addr,
        }
    }

    pub fn read_byte(&mut self, reg: u8) -> SensorResult<u8> {
        self.port.outb(self.index_addr, reg).map_err(map_err)?;
        self.port.inb(self.data_addr).map_err(map_err)
    }

    pub fn write_byte(&mut self, reg: u8, value: u8) -> SensorResult<()> {
        self.port.outb(self.index_addr, reg).map_err(map_err)?;
        self.port.outb(self.data_addr, value).map_err(map_err)
    }

    pub fn read_word(&mut self, reg: u8) -> SensorResult<u16> {
        let hi = self.read_byte(reg)?;
        let lo = self.read_byte(reg.wrapping_add(1))?;
        Ok(((hi as u16) << 8) | lo as u16)
    }

    pub fn select(&mut self, logical_device: u8) -> SensorResult<()> {
        self.write_byte(0x07, logical_device)
    }
}

/// A [`SingleBankPort`] plus a separate bank-select register, for chips (Nuvoton NCT67xx)
/// whose hardware-monitor registers are paged.
pub struct PortWithBanks<'a> {
    inner: SingleBankPort<'a>,
    bank_select_reg: u8,
}

impl<'a> PortWithBanks<'a> {
    pub fn new(inner: SingleBankPort<'a>, bank_select_reg: u8) -> Self {
        Self {
            inner,
            bank_select_reg,
        }
    }

    pub fn read_byte(&mut self, bank: u8, reg: u8) -> SensorResult<u8> {
        self.inner.write_byte(self.bank_select_reg, bank)?;
        self.inner.read_byte(reg)
    }

    pub fn write_byte(&mut self, bank: u8, reg: u8, value: u8) -> SensorResult<()> {
        self.inner.write_byte(self.bank_select_reg, bank)?;
        self.inner.write_byte(reg, value)
    }

    pub fn read_word(&mut self, bank: u8, reg: u8) -> SensorResult<u16> {
        let hi = self.read_byte(bank, reg)?;
        let lo = self.read_byte(bank, reg.wrapping_add(1))?;
        Ok(((hi as u16) << 8) | lo as u16)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::MockPortIo;

    #[test]
    fn single_bank_port_reads_through_index_data_pair() {
        let mut mock = MockPortIo::new(vec![0x34]);
        let mut port = SingleBankPort::new(&mut mock, 0x295, 0x296);
        assert_eq!(port.read_byte(0x20).unwrap(), 0x34);
        assert_eq!(mock.writes, vec![(0x295, 0x20)]);
    }

    #[test]
    fn port_with_banks_selects_bank_before_register() {
        let mut mock = MockPortIo::new(vec![0x01]);
        let single = SingleBankPort::new(&mut mock, 0xA20, 0xA21);
        let mut banked = PortWithBanks::new(single, 0x4E);
        banked.read_byte(3, 0x20).unwrap();
        assert_eq!(mock.writes[0], (0xA20, 0x4E));
        assert_eq!(mock.writes[1], (0xA21, 3));
        assert_eq!(mock.writes[2], (0xA20, 0x20));
    }
}
