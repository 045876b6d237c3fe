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

//! The per-channel error taxonomy. `read`/`write` on a [`crate::chip::SensorChip`] never
//! panic and never bubble up an opaque [`anyhow::Error`] — only this enum, so that callers
//! (including the libsensors adapter) can distinguish "never supported" from "hardware
//! hiccup, try again next cycle".

use derive_more::{Display, Error};

/// Outcome of a single chip-level read or write.
#[derive(Debug, Display, Error, Clone, PartialEq)]
pub enum SensorError {
    /// `(type, attr, channel)` has no implementation on this chip. Never retried.
    #[display("sensor not supported: {msg}")]
    NotSupported { msg: String },

    /// A hardware transaction (MSR/PCI/port/HID) failed. The reading becomes NaN this
    /// cycle; the next update cycle retries.
    #[display("transient hardware failure: {msg}")]
    TransientHardwareFailure { msg: String },

    /// A named cross-process mutex could not be acquired within its timeout. Treated
    /// identically to [`SensorError::TransientHardwareFailure`] by callers.
    #[display("lock timeout acquiring {mutex_name} after {timeout_ms}ms")]
    LockTimeout { mutex_name: String, timeout_ms: u64 },

    /// Ring0 could not be initialized (module not loaded, device not opened). Library
    /// initialization fails hard; the sensor tree remains empty.
    #[display("fatal: {msg}")]
    Fatal { msg: String },

    /// Malformed chip configuration discovered at construction time (channel count
    /// mismatch, `source_index` out of range). Not recoverable at runtime.
    #[display("programmer error: {msg}")]
    ProgrammerError { msg: String },
}

impl SensorError {
    pub fn not_supported(msg: impl Into<String>) -> Self {
        Self::NotSupported { msg: msg.into() }
    }

    pub fn transient(msg: impl Into<String>) -> Self {
        Self::TransientHardwareFailure { msg: msg.into() }
    }

    pub fn lock_timeout(mutex_name: impl Into<String>, timeout_ms: u64) -> Self {
        Self::LockTimeout {
            mutex_name: mutex_name.into(),
            timeout_ms,
        }
    }

    /// `LockTimeout` is defined to behave exactly like a transient hardware failure for
    /// every caller except diagnostics, which is why it carries its own variant rather
    /// than just `TransientHardwareFailure { .. }`.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::TransientHardwareFailure { .. } | Self::LockTimeout { .. }
        )
    }
}

pub type SensorResult<T> = Result<T, SensorError>;
