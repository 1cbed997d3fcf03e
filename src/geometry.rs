use serde::{Deserialize, Serialize};
use std::ops::{Add, Sub};

/// Per-axis weights applied before taking the Euclidean norm.
///
/// A vertical weight above the horizontal one makes vertical offsets look
/// farther away, which spreads a layout sideways.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DistanceBias {
    pub horizontal: f32,
    pub vertical: f32,
}

impl Default for DistanceBias {
    fn default() -> Self {
        Self {
            horizontal: 1.0,
            vertical: 1.5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Coordinate {
    pub x: f32,
    pub y: f32,
}

impl Coordinate {
    pub const ORIGIN: Coordinate = Coordinate { x: 0.0, y: 0.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn sum(self, other: Coordinate) -> Coordinate {
        Coordinate::new(self.x + other.x, self.y + other.y)
    }

    pub fn difference(self, other: Coordinate) -> Coordinate {
        Coordinate::new(self.x - other.x, self.y - other.y)
    }

    pub fn floor(self) -> Coordinate {
        Coordinate::new(self.x.floor(), self.y.floor())
    }

    /// Anisotropic distance with the default bias.
    pub fn distance(self, other: Coordinate) -> f32 {
        self.scaled_distance(other, DistanceBias::default())
    }

    pub fn scaled_distance(self, other: Coordinate, bias: DistanceBias) -> f32 {
        let dx = (self.x - other.x) * bias.horizontal;
        let dy = (self.y - other.y) * bias.vertical;
        (dx * dx + dy * dy).sqrt()
    }

    pub(crate) fn to_pixel(self) -> (i32, i32) {
        (self.x.floor() as i32, self.y.floor() as i32)
    }
}

impl Add for Coordinate {
    type Output = Coordinate;

    fn add(self, rhs: Coordinate) -> Coordinate {
        self.sum(rhs)
    }
}

impl Sub for Coordinate {
    type Output = Coordinate;

    fn sub(self, rhs: Coordinate) -> Coordinate {
        self.difference(rhs)
    }
}
