//! Shared types used throughout the library.

mod direction;

pub use direction::{
    classify_direction, classify_slope_direction, Axis, Direction, SlopeDirection,
    DEFAULT_MAX_ANGLE_DEG,
};

use serde::{Deserialize, Serialize};

/// A cell position in the sparse grid. Z is up; consecutive z values
/// are vertically adjacent key-layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridPosition {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl GridPosition {
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Get the neighboring position in the given direction.
    pub fn neighbor(&self, direction: Direction) -> Self {
        let (dx, dy, dz) = direction.offset();
        Self {
            x: self.x + dx,
            y: self.y + dy,
            z: self.z + dz,
        }
    }

    /// Position directly above (next key-layer up).
    pub fn above(&self) -> Self {
        Self::new(self.x, self.y, self.z + 1)
    }

    /// Position directly below (next key-layer down).
    pub fn below(&self) -> Self {
        Self::new(self.x, self.y, self.z - 1)
    }
}

impl std::fmt::Display for GridPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({},{},{})", self.x, self.y, self.z)
    }
}

/// Extent of a footprint in grid units. `height` is a multiple of the
/// active z-step: 1 for plates, 3 for bricks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FootprintSize {
    pub width: i32,
    pub depth: i32,
    pub height: i32,
}

impl FootprintSize {
    pub fn new(width: i32, depth: i32, height: i32) -> Self {
        Self {
            width,
            depth,
            height,
        }
    }

    /// Plan-view area in cells.
    pub fn area(&self) -> i32 {
        self.width * self.depth
    }

    /// Width/depth normalized so orientation does not matter. Used for
    /// usage reporting, where a 1x2 and a 2x1 are the same piece.
    pub fn normalized(&self) -> (i32, i32, i32) {
        (
            self.width.min(self.depth),
            self.width.max(self.depth),
            self.height,
        )
    }
}

impl std::fmt::Display for FootprintSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}x{}", self.width, self.depth, self.height)
    }
}

/// The closed set of brick shapes. Custom geometry is selected by the
/// cell's `custom_index`, not by extra enum variants.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum BrickType {
    Brick,
    Plate,
    Slope,
    SlopeInverted,
    Cylinder,
    Custom,
}

impl BrickType {
    /// All brick types in order.
    pub const ALL: [BrickType; 6] = [
        BrickType::Brick,
        BrickType::Plate,
        BrickType::Slope,
        BrickType::SlopeInverted,
        BrickType::Cylinder,
        BrickType::Custom,
    ];

    /// Whether this type's bottom face is flat, hiding the top of the
    /// cell below it.
    pub fn obscures_below(&self) -> bool {
        matches!(
            self,
            BrickType::Brick | BrickType::Plate | BrickType::Slope | BrickType::Cylinder
        )
    }

    /// Whether this type's top face is flat, hiding the underside of
    /// the cell above it.
    pub fn obscures_above(&self) -> bool {
        matches!(
            self,
            BrickType::Brick | BrickType::Plate | BrickType::SlopeInverted | BrickType::Cylinder
        )
    }
}

impl std::fmt::Display for BrickType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BrickType::Brick => write!(f, "brick"),
            BrickType::Plate => write!(f, "plate"),
            BrickType::Slope => write!(f, "slope"),
            BrickType::SlopeInverted => write!(f, "slope_inverted"),
            BrickType::Cylinder => write!(f, "cylinder"),
            BrickType::Custom => write!(f, "custom"),
        }
    }
}

/// Tri-state exposure of a cell face. `Unknown` until the propagator
/// has run over the cell's footprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Exposure {
    #[default]
    Unknown,
    Exposed,
    Covered,
}

impl Exposure {
    pub fn is_exposed(&self) -> bool {
        matches!(self, Exposure::Exposed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_neighbor_offsets() {
        let pos = GridPosition::new(3, 5, 7);
        assert_eq!(pos.neighbor(Direction::XPos), GridPosition::new(4, 5, 7));
        assert_eq!(pos.neighbor(Direction::YNeg), GridPosition::new(3, 4, 7));
        assert_eq!(pos.above(), GridPosition::new(3, 5, 8));
        assert_eq!(pos.below(), GridPosition::new(3, 5, 6));
    }

    #[test]
    fn test_size_normalized() {
        assert_eq!(FootprintSize::new(4, 2, 1).normalized(), (2, 4, 1));
        assert_eq!(FootprintSize::new(2, 4, 1).normalized(), (2, 4, 1));
    }

    #[test]
    fn test_obscuring_sets() {
        // Slope has a flat bottom but a slanted top.
        assert!(BrickType::Slope.obscures_below());
        assert!(!BrickType::Slope.obscures_above());
        // Inverted slope is the mirror case.
        assert!(!BrickType::SlopeInverted.obscures_below());
        assert!(BrickType::SlopeInverted.obscures_above());
        // Custom geometry is unknown, so it hides nothing.
        assert!(!BrickType::Custom.obscures_below());
        assert!(!BrickType::Custom.obscures_above());
    }
}
