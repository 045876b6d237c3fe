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

//! Finds Super-I/O hardware-monitor chips by I/O port probing and, on request, loads the
//! matching Linux kernel driver module.
//!
//! This crate is the hardware-identification front end consumed by `sensors::superio`: a
//! [`find_chips`] result carries everything a live register-level driver needs (vendor,
//! signature, config-space address, base address) to attach to the chip it identified.
//!
//! x86_64-only — Super-I/O I/O port probing is architecture-specific.

pub mod catalog;
pub mod environment;
pub mod module_loader;
pub mod port_io;
pub mod scan;
pub mod shell_command;

use std::path::Path;

use log::{info, warn};

use catalog::SioCatalog;
use environment::Environment;
use module_loader::LoadResult;
use scan::IdentifiedChip;

/// Override file path for user/distro chip signature additions.
pub const OVERRIDE_FILE_PATH: &str = "/etc/sensors-rs/detect.toml";

/// One identified chip plus the outcome of trying to load its kernel driver, when asked to.
#[derive(Debug, Clone)]
pub struct DetectionOutcome {
    pub chip: IdentifiedChip,
    pub module: ModuleOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleOutcome {
    NotAttempted,
    Loaded,
    AlreadyLoaded,
    Blacklisted,
    SkippedForConflict { preferred: String },
    Failed(String),
}

/// Runs the full Super-I/O detection pipeline: environment check, catalog load (with any
/// on-disk override merged in), a port scan, and optional driver-module loading.
#[cfg(target_arch = "x86_64")]
#[must_use]
pub fn find_chips(load_modules: bool) -> Vec<DetectionOutcome> {
    info!("starting Super-I/O hardware detection");
    let env = Environment::detect();
    if !env.can_probe() {
        info!("/dev/port unavailable, skipping hardware detection");
        return Vec::new();
    }

    let mut catalog = SioCatalog::compiled();
    let override_path = Path::new(OVERRIDE_FILE_PATH);
    if override_path.exists() {
        if let Err(err) = catalog.apply_override(override_path) {
            warn!("ignoring unreadable override file {override_path:?}: {err}");
        }
    }

    let mut port = match port_io::SystemPort::open() {
        Ok(port) => port,
        Err(err) => {
            warn!("failed to open /dev/port: {err}");
            return Vec::new();
        }
    };

    let chips = scan::scan(&mut port, &catalog);
    attach_module_outcomes(chips, load_modules, &env)
}

/// Non-x86_64 stub: port-level detection is not supported on this architecture.
#[cfg(not(target_arch = "x86_64"))]
pub fn find_chips(_load_modules: bool) -> Vec<DetectionOutcome> {
    info!("Super-I/O detection is only supported on x86_64");
    Vec::new()
}

fn attach_module_outcomes(
    chips: Vec<IdentifiedChip>,
    load_modules: bool,
    env: &Environment,
) -> Vec<DetectionOutcome> {
    let all_drivers: Vec<String> = chips.iter().map(|c| c.signature.driver_hint.clone()).collect();

    let mut any_loaded = false;
    let outcomes: Vec<DetectionOutcome> = chips
        .into_iter()
        .map(|chip| {
            let module = if !load_modules {
                ModuleOutcome::NotAttempted
            } else if !env.can_load_modules() {
                ModuleOutcome::Failed("modprobe unavailable or running in a container".into())
            } else {
                match module_loader::load_module(&chip.signature.driver_hint, &all_drivers) {
                    LoadResult::Loaded => {
                        any_loaded = true;
                        ModuleOutcome::Loaded
                    }
                    LoadResult::AlreadyLoaded => ModuleOutcome::AlreadyLoaded,
                    LoadResult::Blacklisted => ModuleOutcome::Blacklisted,
                    LoadResult::ConflictSkipped { preferred } => {
                        ModuleOutcome::SkippedForConflict { preferred }
                    }
                    LoadResult::Failed(err) => ModuleOutcome::Failed(err),
                }
            };
            DetectionOutcome { chip, module }
        })
        .collect();

    if any_loaded {
        module_loader::udevadm_settle();
    }
    outcomes
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog::DeviceSignature;

    fn fake_chip(driver: &str) -> IdentifiedChip {
        IdentifiedChip {
            vendor: "ITE".into(),
            signature: DeviceSignature {
                label: "IT8686E".into(),
                driver_hint: driver.into(),
                device_id: 0x8686,
                id_mask: 0xFFFF,
                logical_device: 0x04,
                feature_tags: vec![],
            },
            address_port: 0x2E,
            data_port: 0x2F,
            observed_id: 0x8686,
            base_address: Some(0x0290),
            activated: true,
        }
    }

    #[test]
    fn detection_only_never_touches_the_module_loader() {
        let env = Environment {
            is_container: false,
            has_dev_port: true,
            has_modprobe: true,
        };
        let outcomes = attach_module_outcomes(vec![fake_chip("it87")], false, &env);
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].module, ModuleOutcome::NotAttempted);
    }

    #[test]
    fn no_modprobe_reports_a_failure_instead_of_loading() {
        let env = Environment {
            is_container: false,
            has_dev_port: true,
            has_modprobe: false,
        };
        let outcomes = attach_module_outcomes(vec![fake_chip("it87")], true, &env);
        assert!(matches!(outcomes[0].module, ModuleOutcome::Failed(_)));
    }
}
