// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2024 Jonathan Lee
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License version 3
// as published by the Free Software Foundation.
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.
// See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see https://www.gnu.org/licenses/.

pub const PIE_HUE_START: f64 = 210.0;
pub const PIE_SATURATION_PERCENT: u32 = 70;
pub const PIE_LIGHTNESS_PERCENT: u32 = 60;
pub const PIE_ALPHA: f64 = 0.8;

pub const RADAR_FILL_ALPHA_BASE: f64 = 0.2;
pub const RADAR_FILL_ALPHA_STEP: f64 = 0.2;
pub const RADAR_BORDER_ALPHA_BASE: f64 = 0.8;
pub const RADAR_BORDER_ALPHA_STEP: f64 = 0.2;

/// Rank-indexed report palette: colour `i` always maps to rank `i`.
pub const REPORT_PALETTE: [&str; 5] = ["#3B82F6", "#10B981", "#6366F1", "#F59E0B", "#EF4444"];

pub fn report_colour(rank: usize) -> &'static str {
    REPORT_PALETTE[rank % REPORT_PALETTE.len()]
}

/// One visually distinct colour per category, deterministic for a given
/// category count and order: hues evenly spaced around the wheel starting
/// at 210.
pub fn hue_rotation(count: usize) -> Vec<String> {
    (0..count)
        .map(|i| {
            let hue = (PIE_HUE_START + i as f64 * 360.0 / count as f64) % 360.0;
            format!(
                "hsla({hue:.0}, {PIE_SATURATION_PERCENT}%, {PIE_LIGHTNESS_PERCENT}%, {PIE_ALPHA})"
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hue_rotation_is_deterministic_and_starts_at_210() {
        let colours = hue_rotation(4);
        assert_eq!(colours.len(), 4);
        assert_eq!(colours[0], "hsla(210, 70%, 60%, 0.8)");
        assert_eq!(colours[1], "hsla(300, 70%, 60%, 0.8)");
        assert_eq!(colours[2], "hsla(30, 70%, 60%, 0.8)");
        assert_eq!(colours[3], "hsla(120, 70%, 60%, 0.8)");
        assert_eq!(colours, hue_rotation(4));
    }

    #[test]
    fn report_colours_are_positional() {
        assert_eq!(report_colour(0), "#3B82F6");
        assert_eq!(report_colour(4), "#EF4444");
        assert_eq!(report_colour(5), "#3B82F6");
    }
}
