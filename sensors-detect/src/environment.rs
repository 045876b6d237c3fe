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

//! Figures out, before touching any hardware, whether this process is even in a position to
//! probe it: port I/O needs `/dev/port`, and loading a kernel module needs both `modprobe` on
//! `$PATH` and a host that actually owns the kernel it's running under (not a container).

use std::path::{Path, PathBuf};

use log::debug;

const CONTAINER_MARKER_FILES: [&str; 2] = ["/.dockerenv", "/run/.containerenv"];
const CONTAINER_CGROUP_TOKENS: [&str; 4] = ["docker", "containerd", "lxc", "kubepods"];

#[derive(Debug, Clone)]
pub struct Environment {
    pub is_container: bool,
    pub has_dev_port: bool,
    pub has_modprobe: bool,
}

impl Environment {
    #[must_use]
    pub fn detect() -> Self {
        let env = Self {
            is_container: running_in_a_container(),
            has_dev_port: Path::new("/dev/port").exists(),
            has_modprobe: locate_on_path("modprobe").is_some(),
        };
        debug!(
            "environment: container={} dev_port={} modprobe={}",
            env.is_container, env.has_dev_port, env.has_modprobe
        );
        env
    }

    #[must_use]
    pub fn can_probe(&self) -> bool {
        self.has_dev_port
    }

    /// A container almost never owns the host kernel's module namespace, so loading would
    /// either no-op against a module the host already has or silently fail; neither is worth
    /// attempting even when `modprobe` itself happens to be on `$PATH` inside the container.
    #[must_use]
    pub fn can_load_modules(&self) -> bool {
        self.has_modprobe && !self.is_container
    }
}

fn running_in_a_container() -> bool {
    if CONTAINER_MARKER_FILES.iter().any(|f| Path::new(f).exists()) {
        return true;
    }
    std::fs::read_to_string("/proc/1/cgroup")
        .map(|cgroup| CONTAINER_CGROUP_TOKENS.iter().any(|token| cgroup.contains(token)))
        .unwrap_or(false)
}

/// Walks `$PATH` looking for an executable named `cmd`, the same resolution a shell does,
/// without actually spawning anything.
fn locate_on_path(cmd: &str) -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    std::env::split_paths(&path_var)
        .map(|dir| dir.join(cmd))
        .find(|candidate| is_executable_file(candidate))
}

#[cfg(unix)]
fn is_executable_file(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable_file(path: &Path) -> bool {
    path.is_file()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detect_does_not_panic_regardless_of_host() {
        let env = Environment::detect();
        let _ = (env.is_container, env.has_dev_port, env.has_modprobe);
    }

    #[test]
    fn can_probe_tracks_dev_port_only() {
        let env = Environment {
            is_container: false,
            has_dev_port: true,
            has_modprobe: true,
        };
        assert!(env.can_probe());
        assert!(!Environment { has_dev_port: false, ..env }.can_probe());
    }

    #[test]
    fn can_load_modules_requires_modprobe_and_not_a_container() {
        let base = Environment {
            is_container: false,
            has_dev_port: true,
            has_modprobe: true,
        };
        assert!(base.can_load_modules());
        assert!(!Environment { is_container: true, ..base.clone() }.can_load_modules());
        assert!(!Environment { has_modprobe: false, ..base }.can_load_modules());
    }

    #[test]
    fn locate_on_path_finds_a_coreutil_that_always_exists() {
        assert!(locate_on_path("sh").is_some());
    }

    #[test]
    fn locate_on_path_rejects_a_made_up_name() {
        assert!(locate_on_path("not-a-real-binary-xyz123").is_none());
    }
}
