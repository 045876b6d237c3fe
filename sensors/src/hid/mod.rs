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

//! USB-HID sensor devices (AIO pumps, fan controllers, PSUs). Report parsing is kept
//! independent of the transport: every driver's decode function takes a raw report byte
//! slice so it can be unit tested against recorded bytes instead of a live `hidapi` device.

pub mod corsair_psu;
pub mod kraken_x3;
pub mod p7h1;
