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

//! `extern "C"` surface existing libsensors consumers link against. Error codes mirror
//! libsensors' own negative-integer table exactly (`SENSORS_ERR_*`), since some callers
//! (`lm-sensors` CLI ports, monitoring agents) switch on the numeric value rather than a
//! message string.

use std::ffi::{c_char, c_int, CStr, CString};
use std::sync::{Mutex, OnceLock};

use super::parser::{sensors_parse_chip_name as parse_chip_name, sensors_snprintf_chip_name};
use super::types::ChipName;

pub const SENSORS_ERR_WILDCARDS: c_int = -1;
pub const SENSORS_ERR_NO_ENTRY: c_int = -2;
pub const SENSORS_ERR_ACCESS_R: c_int = -3;
pub const SENSORS_ERR_KERNEL: c_int = -4;
pub const SENSORS_ERR_DIV_ZERO: c_int = -5;
pub const SENSORS_ERR_CHIP_NAME: c_int = -6;
pub const SENSORS_ERR_BUS_NAME: c_int = -7;
pub const SENSORS_ERR_PARSE: c_int = -8;
pub const SENSORS_ERR_ACCESS_W: c_int = -9;
pub const SENSORS_ERR_IO: c_int = -10;
pub const SENSORS_ERR_RECURSION: c_int = -11;

fn strerror_text(code: c_int) -> &'static str {
    match code {
        0 => "Success",
        SENSORS_ERR_WILDCARDS => "Wildcard not allowed",
        SENSORS_ERR_NO_ENTRY => "No such subfeature known",
        SENSORS_ERR_ACCESS_R => "Can't read",
        SENSORS_ERR_KERNEL => "Kernel interface error",
        SENSORS_ERR_DIV_ZERO => "Divide by zero",
        SENSORS_ERR_CHIP_NAME => "Can't parse chip name",
        SENSORS_ERR_BUS_NAME => "Can't parse bus name",
        SENSORS_ERR_PARSE => "General parse error",
        SENSORS_ERR_ACCESS_W => "Can't write",
        SENSORS_ERR_IO => "I/O error",
        SENSORS_ERR_RECURSION => "Evaluation recurses too deep",
        _ => "Unknown error",
    }
}

/// Registry of every detected chip, built once by [`sensors_init`] from the live sensor
/// tree. Held process-wide because the C ABI has no notion of a handle to pass back to
/// each call.
static CHIPS: OnceLock<Mutex<Vec<Box<dyn crate::chip::SensorChip>>>> = OnceLock::new();

fn chip_registry() -> &'static Mutex<Vec<Box<dyn crate::chip::SensorChip>>> {
    CHIPS.get_or_init(|| Mutex::new(Vec::new()))
}

/// Populates the registry from an externally-built chip list. Production callers obtain
/// that list from [`crate::probe`]; tests construct it directly.
pub fn sensors_init_with_chips(chips: Vec<Box<dyn crate::chip::SensorChip>>) -> c_int {
    *chip_registry().lock().expect("chip registry mutex poisoned") = chips;
    0
}

#[unsafe(no_mangle)]
pub extern "C" fn sensors_init(_config_file: *mut std::ffi::c_void) -> c_int {
    // config_file is accepted for API compatibility; this implementation has no config
    // parser at the ABI layer, it uses `crate::config` directly from Rust callers.
    0
}

#[unsafe(no_mangle)]
pub extern "C" fn sensors_cleanup() {
    chip_registry().lock().expect("chip registry mutex poisoned").clear();
}

#[unsafe(no_mangle)]
pub extern "C" fn sensors_strerror(code: c_int) -> *const c_char {
    static CACHE: OnceLock<Mutex<std::collections::HashMap<c_int, CString>>> = OnceLock::new();
    let mut cache = CACHE
        .get_or_init(|| Mutex::new(std::collections::HashMap::new()))
        .lock()
        .expect("strerror cache mutex poisoned");
    let entry = cache
        .entry(code)
        .or_insert_with(|| CString::new(strerror_text(code)).unwrap());
    entry.as_ptr()
}

/// Returns `0` on success, a negative `SENSORS_ERR_*` code otherwise. On success `*out` is
/// a heap-allocated [`ChipName`] the caller must release with [`sensors_free_chip_name`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn sensors_parse_chip_name(
    name: *const c_char,
    out: *mut *mut ChipName,
) -> c_int {
    if name.is_null() || out.is_null() {
        return SENSORS_ERR_PARSE;
    }
    let Ok(s) = CStr::from_ptr(name).to_str() else {
        return SENSORS_ERR_PARSE;
    };
    match parse_chip_name(s) {
        Ok(chip) => {
            *out = Box::into_raw(Box::new(chip));
            0
        }
        Err(_) => SENSORS_ERR_CHIP_NAME,
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn sensors_free_chip_name(chip: *mut ChipName) {
    if !chip.is_null() {
        drop(Box::from_raw(chip));
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn sensors_snprintf_chip_name_ffi(
    chip: *const ChipName,
    buf: *mut c_char,
    buf_len: usize,
) -> c_int {
    if chip.is_null() || buf.is_null() {
        return SENSORS_ERR_PARSE;
    }
    let rendered = sensors_snprintf_chip_name(&*chip);
    let Ok(c_string) = CString::new(rendered.clone()) else {
        return SENSORS_ERR_PARSE;
    };
    let bytes = c_string.as_bytes_with_nul();
    if bytes.len() > buf_len {
        return rendered.len() as c_int;
    }
    std::ptr::copy_nonoverlapping(bytes.as_ptr() as *const c_char, buf, bytes.len());
    rendered.len() as c_int
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strerror_known_code_is_stable_text() {
        let ptr = sensors_strerror(SENSORS_ERR_CHIP_NAME);
        let text = unsafe { CStr::from_ptr(ptr) }.to_str().unwrap();
        assert_eq!(text, "Can't parse chip name");
    }

    #[test]
    fn parse_and_snprintf_round_trip_through_ffi() {
        let name = CString::new("nct6798-isa-0a20").unwrap();
        let mut out: *mut ChipName = std::ptr::null_mut();
        let rc = unsafe { sensors_parse_chip_name(name.as_ptr(), &mut out) };
        assert_eq!(rc, 0);
        assert!(!out.is_null());

        let mut buf = [0u8; 64];
        let len = unsafe {
            sensors_snprintf_chip_name_ffi(out, buf.as_mut_ptr() as *mut c_char, buf.len())
        };
        assert_eq!(len as usize, "nct6798-isa-0a20".len());
        let rendered = unsafe { CStr::from_ptr(buf.as_ptr() as *const c_char) }
            .to_str()
            .unwrap();
        assert_eq!(rendered, "nct6798-isa-0a20");

        unsafe { sensors_free_chip_name(out) };
    }
}
