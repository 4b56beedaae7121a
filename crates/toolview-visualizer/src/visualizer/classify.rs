//! Movement classification
//!
//! Maps a movement's flags to one of five draw classes. Checks run in
//! priority order and the first match wins.

use toolview_core::{Movement, MovementFlags, Rgba};
use toolview_settings::MovementColors;

/// Draw class of a movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MovementClass {
    /// Extruder idle
    Travel,
    OuterPerimeter,
    Perimeter,
    Loop,
    /// Extruding, none of the above
    Extrusion,
}

impl MovementClass {
    pub fn of(movement: &Movement) -> Self {
        if !movement.is_extruding() {
            return Self::Travel;
        }

        let flags = movement.flags;
        if flags.contains(MovementFlags::PERIMETER | MovementFlags::PERIMETER_OUTER) {
            Self::OuterPerimeter
        } else if flags.contains(MovementFlags::PERIMETER) {
            Self::Perimeter
        } else if flags.contains(MovementFlags::LOOP) {
            Self::Loop
        } else {
            Self::Extrusion
        }
    }

    pub fn color(self, colors: &MovementColors) -> Rgba {
        match self {
            Self::Travel => colors.movement_default,
            Self::OuterPerimeter => colors.outer_perimeter,
            Self::Perimeter => colors.perimeter,
            Self::Loop => colors.loop_color,
            Self::Extrusion => colors.extruder_on,
        }
    }
}

/// Draw color for `movement`.
pub fn classify(movement: &Movement, colors: &MovementColors) -> Rgba {
    MovementClass::of(movement).color(colors)
}
