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

//! Decides whether a detected driver should be loaded, then (if so) asks `modprobe`.
//! The decision — already loaded, blacklisted, shadowed by a preferred alternative, or
//! clear to go — is pure and testable on its own; [`load_module`] only adds the actual
//! subprocess call on top of it.

use std::path::Path;
use std::time::Duration;

use log::{debug, info, warn};

use crate::shell_command::{CommandOutcome, ExternalCommand};

const MODPROBE_TIMEOUT: Duration = Duration::from_secs(10);
const UDEVADM_TIMEOUT: Duration = Duration::from_secs(15);

/// A driver pair where loading both is redundant or actively harmful; only `preferred`
/// should ever be requested once it's also among the detected drivers.
pub struct DriverConflict {
    pub preferred: &'static str,
    pub conflicting: &'static str,
    pub reason: &'static str,
}

pub const DRIVER_CONFLICTS: &[DriverConflict] = &[DriverConflict {
    preferred: "nct6775",
    conflicting: "nct6687",
    reason: "nct6775 provides more complete sensor support for most NCT chips",
}];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadResult {
    Loaded,
    AlreadyLoaded,
    Blacklisted,
    ConflictSkipped { preferred: String },
    Failed(String),
}

/// What to do about a driver before any subprocess gets spawned.
#[derive(Debug, Clone, PartialEq, Eq)]
enum LoadPlan {
    Skip(LoadResult),
    Proceed,
}

/// Kernel module names are conventionally hyphenated in userspace tooling but always
/// underscored once loaded; every comparison against `/proc/modules`, modprobe.d, or the
/// kernel cmdline needs both forms, so normalize once up front.
struct ModuleName {
    underscored: String,
}

impl ModuleName {
    fn of(driver: &str) -> Self {
        Self {
            underscored: driver.replace('-', "_"),
        }
    }

    fn matches(&self, other: &str) -> bool {
        other == self.underscored || other.replace('-', "_") == self.underscored
    }
}

fn plan(driver: &str, all_detected_drivers: &[String]) -> LoadPlan {
    let name = ModuleName::of(driver);

    if is_module_loaded(&name) {
        debug!("module {driver} already loaded");
        return LoadPlan::Skip(LoadResult::AlreadyLoaded);
    }
    if is_module_blacklisted(&name) {
        info!("module {driver} is blacklisted, skipping");
        return LoadPlan::Skip(LoadResult::Blacklisted);
    }
    if let Some(preferred) = check_conflict(driver, all_detected_drivers) {
        info!("module {driver} shadowed by preferred driver {preferred}, skipping");
        return LoadPlan::Skip(LoadResult::ConflictSkipped {
            preferred: preferred.to_owned(),
        });
    }
    LoadPlan::Proceed
}

/// Loads `driver` via `modprobe`, first checking whether it's already loaded, blacklisted,
/// or shadowed by a preferred driver also present in `all_detected_drivers`.
#[must_use]
pub fn load_module(driver: &str, all_detected_drivers: &[String]) -> LoadResult {
    debug!("evaluating module load for {driver}");
    match plan(driver, all_detected_drivers) {
        LoadPlan::Skip(result) => result,
        LoadPlan::Proceed => {
            let cmd = ExternalCommand::new("modprobe", &[driver], MODPROBE_TIMEOUT);
            match cmd.run() {
                CommandOutcome::Success { .. } => {
                    info!("loaded module: {driver}");
                    LoadResult::Loaded
                }
                CommandOutcome::Error(err) => {
                    warn!("failed to load module {driver}: {err}");
                    LoadResult::Failed(err)
                }
            }
        }
    }
}

fn is_module_loaded(name: &ModuleName) -> bool {
    std::fs::read_to_string("/proc/modules")
        .map(|content| module_name_appears_in(name, &content))
        .unwrap_or(false)
}

fn module_name_appears_in(name: &ModuleName, proc_modules_content: &str) -> bool {
    proc_modules_content
        .lines()
        .filter_map(|line| line.split_whitespace().next())
        .any(|loaded_name| name.matches(loaded_name))
}

fn is_module_blacklisted(name: &ModuleName) -> bool {
    blacklisted_in_modprobe_d(name) || blacklisted_in_cmdline(name)
}

fn blacklisted_in_modprobe_d(name: &ModuleName) -> bool {
    let dir = Path::new("/etc/modprobe.d");
    let Ok(entries) = std::fs::read_dir(dir) else {
        return false;
    };
    entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "conf"))
        .filter_map(|path| std::fs::read_to_string(&path).ok())
        .any(|content| blacklist_directives(&content).any(|blocked| name.matches(blocked)))
}

fn blacklist_directives(content: &str) -> impl Iterator<Item = &str> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.strip_prefix("blacklist "))
        .map(str::trim)
}

fn blacklisted_in_cmdline(name: &ModuleName) -> bool {
    let Ok(cmdline) = std::fs::read_to_string("/proc/cmdline") else {
        return false;
    };
    cmdline
        .split_whitespace()
        .filter_map(|token| token.strip_prefix("modprobe.blacklist="))
        .flat_map(|modules| modules.split(','))
        .any(|module| name.matches(module.trim()))
}

fn check_conflict<'a>(driver: &str, all_detected_drivers: &'a [String]) -> Option<&'a str> {
    DRIVER_CONFLICTS
        .iter()
        .find(|c| driver == c.conflicting && all_detected_drivers.iter().any(|d| d == c.preferred))
        .map(|c| {
            debug!("driver conflict: {} vs {} - {}", driver, c.preferred, c.reason);
            c.preferred
        })
}

/// Waits for udev to finish processing events after a module load, giving hwmon device
/// nodes time to appear in sysfs before anything tries to open them.
pub fn udevadm_settle() {
    debug!("running udevadm settle");
    match ExternalCommand::new("udevadm", &["settle"], UDEVADM_TIMEOUT).run() {
        CommandOutcome::Success { .. } => debug!("udevadm settle completed"),
        CommandOutcome::Error(err) => warn!("udevadm settle failed: {err}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn module_name_matches_loaded_line_regardless_of_hyphenation() {
        let content = "nct6775 16384 0 - Live 0xffffffff\nit87 20480 0 - Live 0xffffffff\n";
        assert!(module_name_appears_in(&ModuleName::of("nct6775"), content));
        assert!(module_name_appears_in(&ModuleName::of("it87"), content));
        assert!(!module_name_appears_in(&ModuleName::of("nct6687"), content));
    }

    #[test]
    fn module_name_matches_across_hyphen_and_underscore_spellings() {
        let content = "some_module 16384 0 - Live 0xffffffff\n";
        assert!(module_name_appears_in(&ModuleName::of("some-module"), content));
        assert!(module_name_appears_in(&ModuleName::of("some_module"), content));
    }

    #[test]
    fn blacklist_directives_skip_comments_and_blank_lines() {
        let content = "# comment\nblacklist nct6687\n\nblacklist nouveau\n# blacklist nct6775\n";
        let found: Vec<&str> = blacklist_directives(content).collect();
        assert_eq!(found, vec!["nct6687", "nouveau"]);
    }

    #[test]
    fn cmdline_blacklist_matches_comma_separated_entries() {
        let name = ModuleName::of("nct6687");
        let cmdline = "BOOT_IMAGE=/vmlinuz root=/dev/sda1 modprobe.blacklist=nct6687,nouveau";
        assert!(cmdline
            .split_whitespace()
            .filter_map(|t| t.strip_prefix("modprobe.blacklist="))
            .flat_map(|m| m.split(','))
            .any(|m| name.matches(m.trim())));
    }

    #[test]
    fn conflict_check_flags_the_conflicting_driver_only() {
        let detected = vec!["nct6775".to_string(), "nct6687".to_string()];
        assert_eq!(check_conflict("nct6687", &detected), Some("nct6775"));
        assert_eq!(check_conflict("nct6775", &detected), None);
        assert_eq!(check_conflict("it87", &["it87".to_string()]), None);
    }
}
