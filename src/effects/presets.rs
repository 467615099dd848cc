//! Named reverb environments.
//!
//! Preset ids form one flat integer namespace. The category is informational
//! and never changes how a preset is applied.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::reverb::ReverbProperties;
use crate::error::AudioError;

/// Environment family a preset belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReverbCategory {
    Default,
    Castle,
    Outdoors,
}

impl fmt::Display for ReverbCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReverbCategory::Default => write!(f, "default"),
            ReverbCategory::Castle => write!(f, "castle"),
            ReverbCategory::Outdoors => write!(f, "outdoors"),
        }
    }
}

/// Canonical values shared by every preset: gain 0.3162, air absorption
/// 0.9943, no room rolloff.
#[allow(clippy::too_many_arguments)]
const fn preset(
    density: f32,
    diffusion: f32,
    hfgain: f32,
    decay_time: f32,
    hfdecay_ratio: f32,
    reflections_gain: f32,
    reflections_delay: f32,
    late_gain: f32,
    late_delay: f32,
    hfdecay_limited: bool,
) -> ReverbProperties {
    ReverbProperties {
        density,
        diffusion,
        gain: 0.3162,
        hfgain,
        decay_time,
        hfdecay_ratio,
        reflections_gain,
        reflections_delay,
        late_gain,
        late_delay,
        air_absorbtion_hfgain: 0.9943,
        room_rolloff_factor: 0.0,
        hfdecay_limited,
    }
}

macro_rules! reverb_presets {
    ($( $variant:ident = $id:literal, $name:literal, $category:ident, ($($value:expr),* $(,)?); )*) => {
        /// A named reverb environment
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[repr(u16)]
        pub enum ReverbPreset {
            $( $variant = $id, )*
        }

        impl ReverbPreset {
            /// Every preset in id order
            pub const ALL: &'static [ReverbPreset] = &[ $( ReverbPreset::$variant, )* ];

            /// Look a preset up by its integer id
            pub fn from_id(id: u16) -> Option<ReverbPreset> {
                match id {
                    $( $id => Some(ReverbPreset::$variant), )*
                    _ => None,
                }
            }

            /// Kebab-case preset name
            pub fn name(self) -> &'static str {
                match self {
                    $( ReverbPreset::$variant => $name, )*
                }
            }

            pub fn category(self) -> ReverbCategory {
                match self {
                    $( ReverbPreset::$variant => ReverbCategory::$category, )*
                }
            }

            /// The preset's canonical parameter values
            pub fn properties(self) -> ReverbProperties {
                match self {
                    $( ReverbPreset::$variant => preset($($value),*), )*
                }
            }
        }
    };
}

reverb_presets! {
    // density, diffusion, hfgain, decay, hf ratio, reflections gain/delay, late gain/delay, hf limit
    Generic = 0, "generic", Default, (1.0, 1.0, 0.8913, 1.49, 0.83, 0.05, 0.007, 1.2589, 0.011, true);
    PaddedCell = 1, "padded-cell", Default, (0.1715, 1.0, 0.001, 0.17, 0.1, 0.25, 0.001, 1.2691, 0.002, true);
    Room = 2, "room", Default, (0.4287, 1.0, 0.5929, 0.4, 0.83, 0.1503, 0.002, 1.0629, 0.003, true);
    Bathroom = 3, "bathroom", Default, (0.1715, 1.0, 0.2512, 1.49, 0.54, 0.6531, 0.007, 3.2734, 0.011, true);
    LivingRoom = 4, "living-room", Default, (0.9766, 1.0, 0.001, 0.5, 0.1, 0.2051, 0.003, 0.2805, 0.004, true);
    StoneRoom = 5, "stone-room", Default, (1.0, 1.0, 0.7079, 2.31, 0.64, 0.4411, 0.012, 1.1003, 0.017, true);
    Auditorium = 6, "auditorium", Default, (1.0, 1.0, 0.5781, 4.32, 0.59, 0.4032, 0.02, 0.717, 0.03, true);
    ConcertHall = 7, "concert-hall", Default, (1.0, 1.0, 0.5623, 3.92, 0.7, 0.2427, 0.02, 0.9977, 0.029, true);
    Cave = 8, "cave", Default, (1.0, 1.0, 1.0, 2.91, 1.3, 0.5, 0.015, 0.7063, 0.022, false);
    Arena = 9, "arena", Default, (1.0, 1.0, 0.4477, 7.24, 0.33, 0.2612, 0.02, 1.0186, 0.03, true);
    Hangar = 10, "hangar", Default, (1.0, 1.0, 0.3162, 10.05, 0.23, 0.5, 0.02, 1.256, 0.03, true);
    CarpetedHallway = 11, "carpeted-hallway", Default, (0.4287, 1.0, 0.01, 0.3, 0.1, 0.1215, 0.002, 0.1531, 0.03, true);
    Hallway = 12, "hallway", Default, (0.3645, 1.0, 0.7079, 1.49, 0.59, 0.2458, 0.007, 1.6615, 0.011, true);
    StoneCorridor = 13, "stone-corridor", Default, (1.0, 1.0, 0.7612, 2.7, 0.79, 0.2472, 0.013, 1.5758, 0.02, true);
    Alley = 14, "alley", Default, (1.0, 0.3, 0.7328, 1.49, 0.86, 0.25, 0.007, 0.9954, 0.011, true);
    Forest = 15, "forest", Default, (1.0, 0.3, 0.0224, 1.49, 0.54, 0.0525, 0.162, 0.7682, 0.088, true);
    City = 16, "city", Default, (1.0, 0.5, 0.3981, 1.49, 0.67, 0.073, 0.007, 0.1427, 0.011, true);
    Mountains = 17, "mountains", Default, (1.0, 0.27, 0.0562, 1.49, 0.21, 0.0407, 0.3, 0.1919, 0.1, false);
    Quarry = 18, "quarry", Default, (1.0, 1.0, 0.3162, 1.49, 0.83, 0.0, 0.061, 1.7783, 0.025, true);
    Plain = 19, "plain", Default, (1.0, 0.21, 0.1, 1.49, 0.5, 0.0585, 0.179, 0.1089, 0.1, true);
    ParkingLot = 20, "parking-lot", Default, (1.0, 1.0, 1.0, 1.65, 1.5, 0.2082, 0.008, 0.2652, 0.012, false);
    SewerPipe = 21, "sewer-pipe", Default, (0.3071, 0.8, 0.3162, 2.81, 0.14, 1.6387, 0.014, 3.2471, 0.021, true);
    Underwater = 22, "underwater", Default, (0.3645, 1.0, 0.01, 1.49, 0.1, 0.5963, 0.007, 7.0795, 0.011, true);
    Drugged = 23, "drugged", Default, (0.4287, 0.5, 1.0, 8.39, 1.39, 0.876, 0.002, 3.1081, 0.03, false);
    Dizzy = 24, "dizzy", Default, (0.3645, 0.6, 0.631, 17.23, 0.56, 0.1392, 0.02, 0.4937, 0.03, false);
    Psychotic = 25, "psychotic", Default, (0.0625, 0.5, 0.8404, 7.56, 0.91, 0.4864, 0.02, 2.4378, 0.03, false);

    CastleSmallRoom = 26, "castle-small-room", Castle, (1.0, 0.89, 0.3981, 1.22, 0.83, 0.8913, 0.022, 1.9953, 0.011, true);
    CastleShortPassage = 27, "castle-short-passage", Castle, (1.0, 0.89, 0.3162, 2.32, 0.83, 0.8913, 0.007, 1.2589, 0.023, true);
    CastleMediumRoom = 28, "castle-medium-room", Castle, (1.0, 0.93, 0.2818, 2.04, 0.83, 0.631, 0.022, 1.5849, 0.011, true);
    CastleLargeRoom = 29, "castle-large-room", Castle, (1.0, 0.82, 0.2818, 2.53, 0.83, 0.4467, 0.034, 1.2589, 0.016, true);
    CastleLongPassage = 30, "castle-long-passage", Castle, (1.0, 0.89, 0.3981, 3.42, 0.83, 0.8913, 0.007, 1.4125, 0.023, true);
    CastleHall = 31, "castle-hall", Castle, (1.0, 0.81, 0.2818, 3.14, 0.79, 0.1778, 0.056, 1.122, 0.024, true);
    CastleCupboard = 32, "castle-cupboard", Castle, (1.0, 0.89, 0.2818, 0.67, 0.87, 1.4125, 0.01, 3.5481, 0.007, true);
    CastleCourtyard = 33, "castle-courtyard", Castle, (1.0, 0.42, 0.4467, 2.13, 0.61, 0.2239, 0.16, 0.7079, 0.036, false);
    CastleAlcove = 34, "castle-alcove", Castle, (1.0, 0.89, 0.5012, 1.64, 0.87, 1.0, 0.007, 1.4125, 0.034, true);

    OutdoorsBackyard = 88, "outdoors-backyard", Outdoors, (1.0, 0.45, 0.2512, 1.12, 0.34, 0.4467, 0.069, 0.7079, 0.023, false);
    OutdoorsRollingPlains = 89, "outdoors-rolling-plains", Outdoors, (1.0, 0.0, 0.0112, 2.13, 0.21, 0.1778, 0.3, 0.4467, 0.019, false);
    OutdoorsDeepCanyon = 90, "outdoors-deep-canyon", Outdoors, (1.0, 0.74, 0.1778, 3.89, 0.21, 0.3162, 0.223, 0.3548, 0.019, false);
    OutdoorsCreek = 91, "outdoors-creek", Outdoors, (1.0, 0.35, 0.1778, 2.13, 0.21, 0.3981, 0.115, 0.1995, 0.031, false);
    OutdoorsValley = 92, "outdoors-valley", Outdoors, (1.0, 0.28, 0.0282, 2.88, 0.26, 0.1413, 0.263, 0.3981, 0.1, false);
}

impl ReverbPreset {
    pub fn id(self) -> u16 {
        self as u16
    }
}

impl Default for ReverbPreset {
    fn default() -> Self {
        ReverbPreset::Generic
    }
}

impl fmt::Display for ReverbPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for ReverbPreset {
    type Err = AudioError;

    /// Accepts a preset name (any case, `_` or `-` separated) or its id
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        if let Ok(id) = normalized.parse::<u16>() {
            if let Some(preset) = ReverbPreset::from_id(id) {
                return Ok(preset);
            }
        }
        ReverbPreset::ALL
            .iter()
            .copied()
            .find(|p| p.name() == normalized)
            .ok_or_else(|| AudioError::invalid_parameter("preset", s, "a reverb preset name or id"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_sizes() {
        let count = |c| ReverbPreset::ALL.iter().filter(|p| p.category() == c).count();
        assert_eq!(count(ReverbCategory::Default), 26);
        assert_eq!(count(ReverbCategory::Castle), 9);
        assert_eq!(count(ReverbCategory::Outdoors), 5);
    }

    #[test]
    fn test_ids_round_trip_and_are_ordered() {
        for preset in ReverbPreset::ALL {
            assert_eq!(ReverbPreset::from_id(preset.id()), Some(*preset));
        }
        assert!(ReverbPreset::Psychotic < ReverbPreset::CastleSmallRoom);
        assert!(ReverbPreset::CastleAlcove < ReverbPreset::OutdoorsBackyard);
        assert_eq!(ReverbPreset::from_id(35), None);
    }

    #[test]
    fn test_every_preset_is_within_bounds() {
        for preset in ReverbPreset::ALL {
            assert!(
                preset.properties().validate().is_ok(),
                "{} is out of bounds",
                preset
            );
        }
    }

    #[test]
    fn test_parse_names_and_ids() {
        assert_eq!("castle-hall".parse::<ReverbPreset>().unwrap(), ReverbPreset::CastleHall);
        assert_eq!("CASTLE_HALL".parse::<ReverbPreset>().unwrap(), ReverbPreset::CastleHall);
        assert_eq!("92".parse::<ReverbPreset>().unwrap(), ReverbPreset::OutdoorsValley);
        assert!("ice-palace".parse::<ReverbPreset>().is_err());
    }

    #[test]
    fn test_generic_values() {
        let props = ReverbPreset::Generic.properties();
        assert_eq!(props.decay_time, 1.49);
        assert_eq!(props.late_gain, 1.2589);
        assert!(props.hfdecay_limited);
    }
}
