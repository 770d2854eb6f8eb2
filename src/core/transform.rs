//! View transform applied to region outlines before rendering
//!
//! Flips are applied before rotation. Rotation is always a multiple of 90
//! degrees and normalized into [0, 360).

use crate::core::region::{Point, Ring};
use serde::{Deserialize, Serialize};

/// Pixel dimensions of the background image
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImageSize {
    pub width: f64,
    pub height: f64,
}

/// Accumulated flip/rotation configuration for one render
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ViewTransform {
    rotation: u32,
    flip_x: bool,
    flip_y: bool,
}

impl ViewTransform {
    /// Build a transform; `rotation` may be any multiple of 90, including negatives
    pub fn new(rotation: i64, flip_x: bool, flip_y: bool) -> Result<Self, String> {
        Ok(Self {
            rotation: normalize_rotation(rotation)?,
            flip_x,
            flip_y,
        })
    }

    /// Rotation in degrees, one of 0, 90, 180, 270
    pub fn rotation(&self) -> u32 {
        self.rotation
    }

    pub fn flip_x(&self) -> bool {
        self.flip_x
    }

    pub fn flip_y(&self) -> bool {
        self.flip_y
    }

    pub fn is_identity(&self) -> bool {
        self.rotation == 0 && !self.flip_x && !self.flip_y
    }

    /// Map one point through the flips, then the rotation
    pub fn apply(&self, point: Point, size: ImageSize) -> Point {
        let [mut x, mut y] = point;
        if self.flip_x {
            x = size.width - x;
        }
        if self.flip_y {
            y = size.height - y;
        }
        rotate([x, y], self.rotation, size)
    }

    pub fn apply_ring(&self, ring: &[Point], size: ImageSize) -> Ring {
        ring.iter().map(|&point| self.apply(point, size)).collect()
    }
}

/// Reduce a rotation to [0, 360), rejecting anything not a multiple of 90
pub fn normalize_rotation(degrees: i64) -> Result<u32, String> {
    if degrees % 90 != 0 {
        return Err(format!("{} is not a multiple of 90 degrees", degrees));
    }
    Ok(degrees.rem_euclid(360) as u32)
}

/// Rotate a point by a normalized multiple of 90 degrees
pub fn rotate(point: Point, rotation: u32, size: ImageSize) -> Point {
    let [x, y] = point;
    match rotation {
        90 => [y, size.width - x],
        180 => [size.width - x, size.height - y],
        270 => [size.height - y, x],
        _ => [x, y],
    }
}
