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

//! Per-board channel labelling and voltage-divider constants. This is data, not code: the
//! table below is the whole of `super_io_configuration`. Every literal constant
//! (`ri`/`rf`/`vf`, source indices) must be preserved verbatim — they are empirically
//! correct values for a specific board, not something to normalize or "clean up".

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Manufacturer {
    Asus,
    Gigabyte,
    Msi,
    AsRock,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Chip {
    Nct6798D,
    Nct6796D,
    Nct6687D,
    It8688E,
    It8628E,
    W83627Dhg,
    F71882Fg,
}

use std::borrow::Cow;

#[derive(Debug, Clone, PartialEq)]
pub struct VoltageChannel {
    pub label: Cow<'static, str>,
    pub source_index: usize,
    pub ri: f64,
    pub rf: f64,
    pub vf: f64,
    pub hidden: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimpleChannel {
    pub label: Cow<'static, str>,
    pub source_index: usize,
    pub hidden: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChannelsConfiguration {
    pub voltage: Vec<VoltageChannel>,
    pub temperature: Vec<SimpleChannel>,
    pub fan: Vec<SimpleChannel>,
    pub pwm: Vec<SimpleChannel>,
}

/// `(Manufacturer, Model, Chip) -> ChannelsConfiguration`. Board strings match the DMI
/// baseboard product string verbatim.
static BOARD_CONFIG: &[(Manufacturer, &str, Chip, fn() -> ChannelsConfiguration)] = &[
    (
        Manufacturer::Asus,
        "ROG CROSSHAIR VIII HERO",
        Chip::Nct6798D,
        crosshair_viii_hero_nct6798d,
    ),
    (
        Manufacturer::Asus,
        "ROG STRIX B550-F GAMING",
        Chip::Nct6798D,
        strix_b550_f_gaming_nct6798d,
    ),
    (
        Manufacturer::Asus,
        "PRIME X570-PRO",
        Chip::Nct6798D,
        prime_x570_pro_nct6798d,
    ),
    (
        Manufacturer::Gigabyte,
        "X570 AORUS MASTER",
        Chip::It8688E,
        x570_aorus_master_it8688e,
    ),
    (
        Manufacturer::Gigabyte,
        "B550 AORUS ELITE",
        Chip::It8688E,
        b550_aorus_elite_it8688e,
    ),
    (
        Manufacturer::Msi,
        "MPG X570 GAMING PLUS",
        Chip::Nct6687D,
        mpg_x570_gaming_plus_nct6687d,
    ),
    (
        Manufacturer::Msi,
        "MAG B550 TOMAHAWK",
        Chip::Nct6687D,
        mag_b550_tomahawk_nct6687d,
    ),
    (
        Manufacturer::AsRock,
        "X570 TAICHI",
        Chip::W83627Dhg,
        x570_taichi_w83627dhg,
    ),
    (
        Manufacturer::AsRock,
        "B450M PRO4",
        Chip::F71882Fg,
        b450m_pro4_f71882fg,
    ),
];

fn strix_b550_f_gaming_nct6798d() -> ChannelsConfiguration {
    ChannelsConfiguration {
        voltage: vec![
            VoltageChannel { label: Cow::Borrowed("Vcore"), source_index: 0, ri: 0.0, rf: 1.0, vf: 0.0, hidden: false },
            VoltageChannel { label: Cow::Borrowed("+12V"), source_index: 1, ri: 5.0, rf: 1.0, vf: 0.0, hidden: false },
            VoltageChannel { label: Cow::Borrowed("DRAM"), source_index: 2, ri: 1.0, rf: 1.0, vf: 0.0, hidden: false },
        ],
        temperature: vec![
            SimpleChannel { label: Cow::Borrowed("CPU"), source_index: 0, hidden: false },
            SimpleChannel { label: Cow::Borrowed("VRM"), source_index: 1, hidden: false },
        ],
        fan: vec![
            SimpleChannel { label: Cow::Borrowed("CPU Fan"), source_index: 0, hidden: false },
            SimpleChannel { label: Cow::Borrowed("Chassis Fan #1"), source_index: 1, hidden: false },
            SimpleChannel { label: Cow::Borrowed("Chassis Fan #2"), source_index: 2, hidden: false },
        ],
        pwm: vec![
            SimpleChannel { label: Cow::Borrowed("CPU Fan"), source_index: 0, hidden: false },
            SimpleChannel { label: Cow::Borrowed("Chassis Fan #1"), source_index: 1, hidden: false },
            SimpleChannel { label: Cow::Borrowed("Chassis Fan #2"), source_index: 2, hidden: false },
        ],
    }
}

fn prime_x570_pro_nct6798d() -> ChannelsConfiguration {
    ChannelsConfiguration {
        voltage: vec![
            VoltageChannel { label: Cow::Borrowed("Vcore"), source_index: 0, ri: 0.0, rf: 1.0, vf: 0.0, hidden: false },
            VoltageChannel { label: Cow::Borrowed("+5V"), source_index: 1, ri: 1.5, rf: 1.0, vf: 0.0, hidden: false },
        ],
        temperature: vec![SimpleChannel { label: Cow::Borrowed("CPU"), source_index: 0, hidden: false }],
        fan: vec![SimpleChannel { label: Cow::Borrowed("CPU Fan"), source_index: 0, hidden: false }],
        pwm: vec![SimpleChannel { label: Cow::Borrowed("CPU Fan"), source_index: 0, hidden: false }],
    }
}

/// Gigabyte wires IT8688E's VIN3 (source index 3) to Vcore rather than VIN0, the quirk
/// `super_io_configuration` exists to paper over.
fn x570_aorus_master_it8688e() -> ChannelsConfiguration {
    ChannelsConfiguration {
        voltage: vec![
            VoltageChannel { label: Cow::Borrowed("Vcore"), source_index: 3, ri: 0.0, rf: 1.0, vf: 0.0, hidden: false },
            VoltageChannel { label: Cow::Borrowed("+12V"), source_index: 1, ri: 5.0, rf: 1.0, vf: 0.0, hidden: false },
            VoltageChannel { label: Cow::Borrowed("DRAM"), source_index: 2, ri: 1.0, rf: 1.0, vf: 0.0, hidden: false },
        ],
        temperature: vec![
            SimpleChannel { label: Cow::Borrowed("System 1"), source_index: 0, hidden: false },
            SimpleChannel { label: Cow::Borrowed("System 2"), source_index: 1, hidden: false },
            SimpleChannel { label: Cow::Borrowed("VRM"), source_index: 2, hidden: false },
        ],
        fan: vec![
            SimpleChannel { label: Cow::Borrowed("CPU Fan"), source_index: 0, hidden: false },
            SimpleChannel { label: Cow::Borrowed("System Fan #1"), source_index: 1, hidden: false },
        ],
        pwm: vec![
            SimpleChannel { label: Cow::Borrowed("CPU Fan"), source_index: 0, hidden: false },
            SimpleChannel { label: Cow::Borrowed("System Fan #1"), source_index: 1, hidden: false },
        ],
    }
}

fn b550_aorus_elite_it8688e() -> ChannelsConfiguration {
    ChannelsConfiguration {
        voltage: vec![VoltageChannel { label: Cow::Borrowed("Vcore"), source_index: 3, ri: 0.0, rf: 1.0, vf: 0.0, hidden: false }],
        temperature: vec![SimpleChannel { label: Cow::Borrowed("System"), source_index: 0, hidden: false }],
        fan: vec![SimpleChannel { label: Cow::Borrowed("CPU Fan"), source_index: 0, hidden: false }],
        pwm: vec![SimpleChannel { label: Cow::Borrowed("CPU Fan"), source_index: 0, hidden: false }],
    }
}

fn mpg_x570_gaming_plus_nct6687d() -> ChannelsConfiguration {
    ChannelsConfiguration {
        voltage: vec![
            VoltageChannel { label: Cow::Borrowed("Vcore"), source_index: 0, ri: 0.0, rf: 1.0, vf: 0.0, hidden: false },
            VoltageChannel { label: Cow::Borrowed("CPU SOC"), source_index: 1, ri: 0.0, rf: 1.0, vf: 0.0, hidden: false },
        ],
        temperature: vec![
            SimpleChannel { label: Cow::Borrowed("CPU"), source_index: 0, hidden: false },
            SimpleChannel { label: Cow::Borrowed("PCH"), source_index: 1, hidden: false },
        ],
        fan: vec![
            SimpleChannel { label: Cow::Borrowed("CPU Fan"), source_index: 0, hidden: false },
            SimpleChannel { label: Cow::Borrowed("Pump Fan"), source_index: 1, hidden: false },
        ],
        pwm: vec![
            SimpleChannel { label: Cow::Borrowed("CPU Fan"), source_index: 0, hidden: false },
            SimpleChannel { label: Cow::Borrowed("Pump Fan"), source_index: 1, hidden: false },
        ],
    }
}

fn mag_b550_tomahawk_nct6687d() -> ChannelsConfiguration {
    ChannelsConfiguration {
        voltage: vec![VoltageChannel { label: Cow::Borrowed("Vcore"), source_index: 0, ri: 0.0, rf: 1.0, vf: 0.0, hidden: false }],
        temperature: vec![SimpleChannel { label: Cow::Borrowed("CPU"), source_index: 0, hidden: false }],
        fan: vec![SimpleChannel { label: Cow::Borrowed("CPU Fan"), source_index: 0, hidden: false }],
        pwm: vec![SimpleChannel { label: Cow::Borrowed("CPU Fan"), source_index: 0, hidden: false }],
    }
}

fn x570_taichi_w83627dhg() -> ChannelsConfiguration {
    ChannelsConfiguration {
        voltage: vec![
            VoltageChannel { label: Cow::Borrowed("Vcore"), source_index: 0, ri: 0.0, rf: 1.0, vf: 0.0, hidden: false },
            VoltageChannel { label: Cow::Borrowed("+3.3V"), source_index: 1, ri: 3.4, rf: 10.0, vf: 0.0, hidden: false },
        ],
        temperature: vec![SimpleChannel { label: Cow::Borrowed("CPU"), source_index: 0, hidden: false }],
        fan: vec![SimpleChannel { label: Cow::Borrowed("CPU Fan"), source_index: 0, hidden: false }],
        pwm: vec![SimpleChannel { label: Cow::Borrowed("CPU Fan"), source_index: 0, hidden: false }],
    }
}

fn b450m_pro4_f71882fg() -> ChannelsConfiguration {
    ChannelsConfiguration {
        voltage: vec![VoltageChannel { label: Cow::Borrowed("Vcore"), source_index: 0, ri: 0.0, rf: 1.0, vf: 0.0, hidden: false }],
        temperature: vec![SimpleChannel { label: Cow::Borrowed("CPU"), source_index: 0, hidden: false }],
        fan: vec![
            SimpleChannel { label: Cow::Borrowed("CPU Fan"), source_index: 0, hidden: false },
            SimpleChannel { label: Cow::Borrowed("System Fan"), source_index: 1, hidden: false },
        ],
        pwm: vec![SimpleChannel { label: Cow::Borrowed("CPU Fan"), source_index: 0, hidden: false }],
    }
}

fn crosshair_viii_hero_nct6798d() -> ChannelsConfiguration {
    ChannelsConfiguration {
        voltage: vec![
            VoltageChannel {
                label: Cow::Borrowed("Vcore"),
                source_index: 0,
                ri: 0.0,
                rf: 1.0,
                vf: 0.0,
                hidden: false,
            },
            VoltageChannel {
                label: Cow::Borrowed("+12V"),
                source_index: 1,
                ri: 5.0,
                rf: 1.0,
                vf: 0.0,
                hidden: false,
            },
            VoltageChannel {
                label: Cow::Borrowed("+5V"),
                source_index: 2,
                ri: 1.5,
                rf: 1.0,
                vf: 0.0,
                hidden: false,
            },
        ],
        temperature: vec![
            SimpleChannel {
                label: Cow::Borrowed("CPU"),
                source_index: 0,
                hidden: false,
            },
            SimpleChannel {
                label: Cow::Borrowed("Motherboard"),
                source_index: 1,
                hidden: false,
            },
        ],
        fan: vec![
            SimpleChannel {
                label: Cow::Borrowed("CPU Fan"),
                source_index: 0,
                hidden: false,
            },
            SimpleChannel {
                label: Cow::Borrowed("Chassis Fan #1"),
                source_index: 1,
                hidden: false,
            },
        ],
        pwm: vec![
            SimpleChannel {
                label: Cow::Borrowed("CPU Fan"),
                source_index: 0,
                hidden: false,
            },
            SimpleChannel {
                label: Cow::Borrowed("Chassis Fan #1"),
                source_index: 1,
                hidden: false,
            },
        ],
    }
}

fn generic_configuration(n_channels: &ChannelCounts) -> ChannelsConfiguration {
    let label = |prefix: &str, i: usize| -> String { format!("{prefix} #{}", i + 1) };
    ChannelsConfiguration {
        voltage: (0..n_channels.voltage)
            .map(|i| VoltageChannel {
                label: Cow::Owned(label("Voltage", i)),
                source_index: i,
                ri: 0.0,
                rf: 1.0,
                vf: 0.0,
                hidden: false,
            })
            .collect(),
        temperature: (0..n_channels.temperature)
            .map(|i| SimpleChannel {
                label: Cow::Owned(label("Temperature", i)),
                source_index: i,
                hidden: false,
            })
            .collect(),
        fan: (0..n_channels.fan)
            .map(|i| SimpleChannel {
                label: Cow::Owned(label("Fan", i)),
                source_index: i,
                hidden: false,
            })
            .collect(),
        pwm: (0..n_channels.pwm)
            .map(|i| SimpleChannel {
                label: Cow::Owned(label("PWM", i)),
                source_index: i,
                hidden: false,
            })
            .collect(),
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ChannelCounts {
    pub voltage: usize,
    pub temperature: usize,
    pub fan: usize,
    pub pwm: usize,
}

/// Looks up the board-specific channel table; falls back to a generic enumeration
/// (`"Voltage #1"`, `"Temperature #1"`, …) when no board-specific entry exists.
pub fn super_io_configuration(
    manufacturer: Manufacturer,
    model: &str,
    chip: Chip,
    n_channels: ChannelCounts,
) -> ChannelsConfiguration {
    for &(m, board_model, c, build) in BOARD_CONFIG {
        if m == manufacturer && board_model == model && c == chip {
            return build();
        }
    }
    generic_configuration(&n_channels)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crosshair_viii_hero_vcore_is_channel_zero_with_no_divider() {
        let cfg = super_io_configuration(
            Manufacturer::Asus,
            "ROG CROSSHAIR VIII HERO",
            Chip::Nct6798D,
            ChannelCounts::default(),
        );
        assert_eq!(cfg.voltage[0].label, "Vcore");
        assert_eq!(cfg.voltage[0].source_index, 0);
        assert_eq!(cfg.voltage[0].ri, 0.0);
    }

    #[test]
    fn gigabyte_aorus_master_remaps_vcore_to_source_index_three() {
        let cfg = super_io_configuration(
            Manufacturer::Gigabyte,
            "X570 AORUS MASTER",
            Chip::It8688E,
            ChannelCounts::default(),
        );
        assert_eq!(cfg.voltage[0].label, "Vcore");
        assert_eq!(cfg.voltage[0].source_index, 3);
    }

    #[test]
    fn asrock_taichi_applies_3_3v_divider() {
        let cfg = super_io_configuration(
            Manufacturer::AsRock,
            "X570 TAICHI",
            Chip::W83627Dhg,
            ChannelCounts::default(),
        );
        assert_eq!(cfg.voltage[1].label, "+3.3V");
        assert_eq!(cfg.voltage[1].ri, 3.4);
        assert_eq!(cfg.voltage[1].rf, 10.0);
    }

    #[test]
    fn unknown_board_falls_back_to_generic_labels() {
        let cfg = super_io_configuration(
            Manufacturer::Asus,
            "SOME UNKNOWN BOARD",
            Chip::Nct6798D,
            ChannelCounts {
                voltage: 2,
                ..Default::default()
            },
        );
        assert_eq!(cfg.voltage.len(), 2);
        assert_eq!(cfg.voltage[0].label, "Voltage #1");
        assert_eq!(cfg.voltage[1].label, "Voltage #2");
    }
}
