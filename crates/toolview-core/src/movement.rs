//! Movement stream data model
//!
//! A [`Movement`] is one directed segment of print-head travel. Its start
//! point is implicit: the endpoint of the previous movement, or the stream
//! origin for the very first one.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{ModelError, ModelResult};

/// RGBA color with components in `0.0..=1.0`.
pub type Rgba = [f32; 4];

/// Semantic role bits attached to a movement by the parser.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MovementFlags(u32);

impl MovementFlags {
    pub const NONE: Self = Self(0);
    /// Extruder is pushing filament during this movement
    pub const EXTRUDER_ON: Self = Self(1 << 0);
    /// Movement is part of a perimeter
    pub const PERIMETER: Self = Self(1 << 1);
    /// Movement is part of the outermost perimeter (implies `PERIMETER`)
    pub const PERIMETER_OUTER: Self = Self(1 << 2);
    /// Movement is part of a loop
    pub const LOOP: Self = Self(1 << 3);

    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl std::ops::BitOr for MovementFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

impl std::ops::BitOrAssign for MovementFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Debug for MovementFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const NAMES: [(MovementFlags, &str); 4] = [
            (MovementFlags::EXTRUDER_ON, "EXTRUDER_ON"),
            (MovementFlags::PERIMETER, "PERIMETER"),
            (MovementFlags::PERIMETER_OUTER, "PERIMETER_OUTER"),
            (MovementFlags::LOOP, "LOOP"),
        ];

        let names: Vec<&str> = NAMES
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect();

        if names.is_empty() {
            write!(f, "MovementFlags(NONE)")
        } else {
            write!(f, "MovementFlags({})", names.join(" | "))
        }
    }
}

/// One linear travel segment of the print head.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Movement {
    /// Endpoint of this movement
    pub position: Vec3,
    #[serde(default)]
    pub flags: MovementFlags,
    /// Extruder advance for this movement
    #[serde(default)]
    pub delta_extrusion: f32,
    /// 1-based line number in the toolpath source
    pub source_line: u32,
}

impl Movement {
    pub fn new(position: Vec3, flags: MovementFlags, delta_extrusion: f32, source_line: u32) -> Self {
        Self {
            position,
            flags,
            delta_extrusion,
            source_line,
        }
    }

    /// Travel move without extrusion.
    pub fn travel(position: Vec3, source_line: u32) -> Self {
        Self::new(position, MovementFlags::NONE, 0.0, source_line)
    }

    /// A positive extruder advance counts as extruding even without the flag.
    pub fn is_extruding(&self) -> bool {
        self.flags.contains(MovementFlags::EXTRUDER_ON) || self.delta_extrusion > 0.0
    }

    /// Heading in the XY plane, in radians, of travel from `from` to this movement's endpoint.
    pub fn heading_from(&self, from: Vec3) -> f32 {
        let delta = self.position - from;
        delta.y.atan2(delta.x)
    }
}

/// Movements sharing one intended print height.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Layer {
    pub movements: Vec<Movement>,
}

impl Layer {
    pub fn new(movements: Vec<Movement>) -> Self {
        Self { movements }
    }

    pub fn len(&self) -> usize {
        self.movements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.movements.is_empty()
    }

    pub fn first(&self) -> Option<&Movement> {
        self.movements.first()
    }

    pub fn last(&self) -> Option<&Movement> {
        self.movements.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Movement> {
        self.movements.iter()
    }

    /// Nominal Z height, taken from the first movement.
    pub fn height(&self) -> Option<f32> {
        self.first().map(|m| m.position.z)
    }
}

impl From<Vec<Movement>> for Layer {
    fn from(movements: Vec<Movement>) -> Self {
        Self::new(movements)
    }
}

impl<'a> IntoIterator for &'a Layer {
    type Item = &'a Movement;
    type IntoIter = std::slice::Iter<'a, Movement>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Ordered layers as delivered by the parser.
///
/// The parser emits the starting point as the first movement of the first
/// layer; [`MovementStream::split_origin`] separates it out.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MovementStream {
    pub layers: Vec<Layer>,
}

impl MovementStream {
    pub fn new(layers: Vec<Layer>) -> Self {
        Self { layers }
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    pub fn movement_count(&self) -> usize {
        self.layers.iter().map(Layer::len).sum()
    }

    /// True when no layer holds a movement.
    pub fn is_empty(&self) -> bool {
        self.layers.iter().all(Layer::is_empty)
    }

    /// Height of layer `index`.
    pub fn layer_height(&self, index: usize) -> ModelResult<f32> {
        self.layers
            .get(index)
            .and_then(Layer::height)
            .ok_or(ModelError::MissingLayerHeight { layer: index })
    }

    /// Removes the first movement of the first non-empty layer and returns
    /// its position as the origin together with the remaining layers.
    pub fn split_origin(mut self) -> ModelResult<(Vec3, Vec<Layer>)> {
        let layer = self
            .layers
            .iter_mut()
            .find(|layer| !layer.is_empty())
            .ok_or(ModelError::EmptyStream)?;

        let origin = layer.movements.remove(0).position;
        Ok((origin, self.layers))
    }
}

impl From<Vec<Layer>> for MovementStream {
    fn from(layers: Vec<Layer>) -> Self {
        Self::new(layers)
    }
}
