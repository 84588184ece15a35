//! Direction types and surface-normal classification.
//!
//! External mesh synthesis uses these to orient logo embossing and
//! slope-brick variants: a source-surface normal is snapped to the
//! nearest axis direction, and the direction decides the flip/rotate
//! flags of the generated brick mesh.

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Default snap tolerance for normal classification, in degrees.
pub const DEFAULT_MAX_ANGLE_DEG: f32 = 40.0;

/// The six cardinal axis directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    XPos,
    XNeg,
    YPos,
    YNeg,
    ZPos,
    ZNeg,
}

impl Direction {
    /// All six directions in order.
    pub const ALL: [Direction; 6] = [
        Direction::XPos,
        Direction::XNeg,
        Direction::YPos,
        Direction::YNeg,
        Direction::ZPos,
        Direction::ZNeg,
    ];

    /// Get the grid offset for this direction.
    pub fn offset(&self) -> (i32, i32, i32) {
        match self {
            Direction::XPos => (1, 0, 0),
            Direction::XNeg => (-1, 0, 0),
            Direction::YPos => (0, 1, 0),
            Direction::YNeg => (0, -1, 0),
            Direction::ZPos => (0, 0, 1),
            Direction::ZNeg => (0, 0, -1),
        }
    }

    /// Get the unit normal vector for this direction.
    pub fn normal(&self) -> Vec3 {
        let (x, y, z) = self.offset();
        Vec3::new(x as f32, y as f32, z as f32)
    }

    /// Get the opposite direction.
    pub fn opposite(&self) -> Direction {
        match self {
            Direction::XPos => Direction::XNeg,
            Direction::XNeg => Direction::XPos,
            Direction::YPos => Direction::YNeg,
            Direction::YNeg => Direction::YPos,
            Direction::ZPos => Direction::ZNeg,
            Direction::ZNeg => Direction::ZPos,
        }
    }

    /// Get the axis this direction is on.
    pub fn axis(&self) -> Axis {
        match self {
            Direction::XPos | Direction::XNeg => Axis::X,
            Direction::YPos | Direction::YNeg => Axis::Y,
            Direction::ZPos | Direction::ZNeg => Axis::Z,
        }
    }

    /// Derive the mesh flip/rotate flags for this direction: meshes are
    /// modeled facing X+, so negative directions flip and Y directions
    /// rotate a quarter turn.
    pub fn flip_rotate(&self) -> (bool, bool) {
        let flip = matches!(self, Direction::XNeg | Direction::YNeg);
        let rotate = matches!(self, Direction::YPos | Direction::YNeg);
        (flip, rotate)
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::XPos => write!(f, "x+"),
            Direction::XNeg => write!(f, "x-"),
            Direction::YPos => write!(f, "y+"),
            Direction::YNeg => write!(f, "y-"),
            Direction::ZPos => write!(f, "z+"),
            Direction::ZNeg => write!(f, "z-"),
        }
    }
}

/// The three axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    X,
    Y,
    Z,
}

/// The eight half-height slope directions: a horizontal cardinal
/// combined with an upward or downward tilt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlopeDirection {
    UpXPos,
    UpXNeg,
    UpYPos,
    UpYNeg,
    DownXPos,
    DownXNeg,
    DownYPos,
    DownYNeg,
}

impl SlopeDirection {
    /// All eight slope directions in order.
    pub const ALL: [SlopeDirection; 8] = [
        SlopeDirection::UpXPos,
        SlopeDirection::UpXNeg,
        SlopeDirection::UpYPos,
        SlopeDirection::UpYNeg,
        SlopeDirection::DownXPos,
        SlopeDirection::DownXNeg,
        SlopeDirection::DownYPos,
        SlopeDirection::DownYNeg,
    ];

    /// The (unnormalized) reference normal of a half-height slope face
    /// tilted this way.
    pub fn reference_normal(&self) -> Vec3 {
        let (h, z) = match self {
            SlopeDirection::UpXPos => (Vec3::X, 0.5),
            SlopeDirection::UpXNeg => (Vec3::NEG_X, 0.5),
            SlopeDirection::UpYPos => (Vec3::Y, 0.5),
            SlopeDirection::UpYNeg => (Vec3::NEG_Y, 0.5),
            SlopeDirection::DownXPos => (Vec3::X, -0.5),
            SlopeDirection::DownXNeg => (Vec3::NEG_X, -0.5),
            SlopeDirection::DownYPos => (Vec3::Y, -0.5),
            SlopeDirection::DownYNeg => (Vec3::NEG_Y, -0.5),
        };
        h + Vec3::new(0.0, 0.0, z)
    }

    /// The horizontal cardinal component of this slope direction.
    pub fn horizontal(&self) -> Direction {
        match self {
            SlopeDirection::UpXPos | SlopeDirection::DownXPos => Direction::XPos,
            SlopeDirection::UpXNeg | SlopeDirection::DownXNeg => Direction::XNeg,
            SlopeDirection::UpYPos | SlopeDirection::DownYPos => Direction::YPos,
            SlopeDirection::UpYNeg | SlopeDirection::DownYNeg => Direction::YNeg,
        }
    }

    /// Whether the slope faces upward (a regular slope brick) rather
    /// than downward (an inverted one).
    pub fn is_upward(&self) -> bool {
        matches!(
            self,
            SlopeDirection::UpXPos
                | SlopeDirection::UpXNeg
                | SlopeDirection::UpYPos
                | SlopeDirection::UpYNeg
        )
    }

    /// Flip/rotate flags, taken from the horizontal component.
    pub fn flip_rotate(&self) -> (bool, bool) {
        self.horizontal().flip_rotate()
    }
}

/// Chord length on the unit sphere corresponding to an angle in
/// degrees.
fn chord(angle_deg: f32) -> f32 {
    2.0 * (angle_deg.to_radians() / 2.0).sin()
}

/// Snap a unit surface normal to the nearest cardinal direction, if it
/// lies within `max_angle_deg` of one.
pub fn classify_direction(normal: Vec3, max_angle_deg: f32) -> Option<Direction> {
    let max_dist = chord(max_angle_deg);
    let mut best = None;
    let mut best_dist = max_dist;
    for dir in Direction::ALL {
        let dist = (dir.normal() - normal).length();
        if dist < best_dist {
            best_dist = dist;
            best = Some(dir);
        }
    }
    best
}

/// Snap a unit surface normal to the nearest half-height slope
/// direction. Normals outside the slope band (|z| not in (0.2, 0.8))
/// never classify: they are flat enough for a plain brick or steep
/// enough for a top/bottom face.
pub fn classify_slope_direction(normal: Vec3, max_angle_deg: f32) -> Option<SlopeDirection> {
    let z = normal.z;
    if !(0.2..0.8).contains(&z.abs()) {
        return None;
    }
    let max_dist = chord(max_angle_deg);
    let mut best = None;
    let mut best_dist = max_dist;
    for dir in SlopeDirection::ALL {
        let dist = (dir.reference_normal().normalize() - normal).length();
        if dist < best_dist {
            best_dist = dist;
            best = Some(dir);
        }
    }
    best
}
