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

//! The Windows build this library descends from names four global mutexes
//! (`Global\Access_ISABUS.HTP.Method` and friends) so vendor tools sharing the same bus
//! serialize with each other. On Linux there is no equivalent named-kernel-object
//! primitive available to every vendor tool, so each one is reinterpreted as an advisory
//! `flock(2)` on a fixed path under `/run/lock` — any other process (ours or a vendor
//! tool) that also takes an advisory lock on the same path serializes correctly.

use std::fs::{File, OpenOptions};
use std::os::unix::io::AsRawFd;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use nix::fcntl::{flock, FlockArg};

use crate::error::{SensorError, SensorResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GlobalMutex {
    Ec,
    IsaBus,
    PciBus,
    SmBus,
}

impl GlobalMutex {
    fn lock_path(self) -> PathBuf {
        let name = match self {
            GlobalMutex::Ec => "ec",
            GlobalMutex::IsaBus => "isabus",
            GlobalMutex::PciBus => "pcibus",
            GlobalMutex::SmBus => "smbus",
        };
        PathBuf::from(format!("/run/lock/sensors-rs.{name}.lock"))
    }
}

/// An acquired lock; releases on drop via `flock(LOCK_UN)` (guaranteed by closing the fd).
pub struct GlobalMutexGuard {
    _file: File,
    mutex: GlobalMutex,
}

impl std::fmt::Debug for GlobalMutexGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "GlobalMutexGuard({:?})", self.mutex)
    }
}

/// Polls for the lock in 1ms increments up to `timeout`. Spec calls for 10ms for most
/// paths and 100ms for SMU PM-table paths; callers choose the timeout per call site.
pub fn try_lock(mutex: GlobalMutex, timeout: Duration) -> SensorResult<GlobalMutexGuard> {
    let path = mutex.lock_path();
    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(&path)
        .map_err(|e| SensorError::transient(format!("opening lock file {path:?}: {e}")))?;

    let deadline = Instant::now() + timeout;
    loop {
        match flock(file.as_raw_fd(), FlockArg::LockExclusiveNonblock) {
            Ok(()) => return Ok(GlobalMutexGuard { _file: file, mutex }),
            Err(_) if Instant::now() < deadline => {
                std::thread::sleep(Duration::from_millis(1));
            }
            Err(_) => {
                return Err(SensorError::lock_timeout(
                    format!("{mutex:?}"),
                    timeout.as_millis() as u64,
                ))
            }
        }
    }
}

/// Acquires or panics — mirrors the source's `GlobalMutexLock`, which throws on failure.
/// Only appropriate at call sites that treat lock failure as a hard precondition
/// violation rather than a per-reading transient failure.
pub fn lock(mutex: GlobalMutex, timeout: Duration) -> GlobalMutexGuard {
    try_lock(mutex, timeout).expect("global mutex acquisition is a hard precondition here")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_paths_are_distinct_and_fixed() {
        let paths: Vec<_> = [
            GlobalMutex::Ec,
            GlobalMutex::IsaBus,
            GlobalMutex::PciBus,
            GlobalMutex::SmBus,
        ]
        .iter()
        .map(|m| m.lock_path())
        .collect();
        let unique: std::collections::HashSet<_> = paths.iter().collect();
        assert_eq!(unique.len(), paths.len());
    }
}
