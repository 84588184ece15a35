//! Legal size catalog: which (width, depth) footprints exist for each
//! brick type and height class.
//!
//! Width and depth are orientation-significant; the table stores both
//! orientations of every piece explicitly and never transposes on
//! lookup.

use crate::config::HeightMode;
use crate::error::{PackerError, Result};
use crate::types::BrickType;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Height class of a catalog entry: one plate tall or one brick
/// (three plates) tall.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeightClass {
    Flat,
    Tall,
}

impl HeightClass {
    /// Recorded footprint height in grid units.
    pub fn footprint_height(&self) -> i32 {
        match self {
            HeightClass::Flat => 1,
            HeightClass::Tall => 3,
        }
    }

    /// Key-layers a footprint of this class consumes. In TALL mode the
    /// grid itself is brick-height resolution, so a tall footprint
    /// still spans one key-layer.
    pub fn layers_consumed(&self, mode: HeightMode) -> i32 {
        match (self, mode) {
            (HeightClass::Flat, _) => 1,
            (HeightClass::Tall, HeightMode::Tall) => 1,
            (HeightClass::Tall, _) => 3,
        }
    }
}

impl std::fmt::Display for HeightClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HeightClass::Flat => write!(f, "flat"),
            HeightClass::Tall => write!(f, "tall"),
        }
    }
}

/// Immutable lookup of permitted footprints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegalSizeCatalog {
    sizes: HashMap<HeightClass, HashMap<BrickType, HashSet<(i32, i32)>>>,
}

/// Canonical plate footprints (width <= depth; both orientations are
/// inserted).
const PLATE_SIZES: &[(i32, i32)] = &[
    (1, 1),
    (1, 2),
    (1, 3),
    (1, 4),
    (1, 6),
    (1, 8),
    (1, 10),
    (1, 12),
    (2, 2),
    (2, 3),
    (2, 4),
    (2, 6),
    (2, 8),
    (2, 10),
    (2, 12),
    (2, 16),
    (3, 3),
    (4, 4),
    (4, 6),
    (4, 8),
    (4, 10),
    (4, 12),
    (6, 6),
    (6, 8),
    (6, 10),
    (6, 12),
    (6, 14),
    (6, 16),
    (8, 8),
    (8, 11),
    (8, 16),
    (16, 16),
];

/// Canonical brick footprints.
const BRICK_SIZES: &[(i32, i32)] = &[
    (1, 1),
    (1, 2),
    (1, 3),
    (1, 4),
    (1, 6),
    (1, 8),
    (1, 10),
    (1, 12),
    (1, 16),
    (2, 2),
    (2, 3),
    (2, 4),
    (2, 6),
    (2, 8),
    (2, 10),
];

/// Canonical slope footprints. Slopes run along their depth axis, so
/// the assortment is narrower than for plain bricks.
const SLOPE_SIZES: &[(i32, i32)] = &[
    (1, 1),
    (1, 2),
    (1, 3),
    (1, 4),
    (2, 2),
    (2, 3),
    (2, 4),
    (2, 6),
    (2, 8),
    (3, 3),
];

/// Canonical inverted-slope footprints.
const SLOPE_INVERTED_SIZES: &[(i32, i32)] = &[(1, 1), (1, 2), (1, 3), (2, 2), (2, 3)];

impl Default for LegalSizeCatalog {
    fn default() -> Self {
        let mut catalog = Self {
            sizes: HashMap::new(),
        };
        catalog.add_all(HeightClass::Flat, BrickType::Plate, PLATE_SIZES);
        catalog.add_all(HeightClass::Tall, BrickType::Brick, BRICK_SIZES);
        catalog.add_all(HeightClass::Tall, BrickType::Slope, SLOPE_SIZES);
        catalog.add_all(
            HeightClass::Tall,
            BrickType::SlopeInverted,
            SLOPE_INVERTED_SIZES,
        );
        // Round pieces: 1x1 round plate/brick plus the 2x2 round brick.
        catalog.add_all(HeightClass::Flat, BrickType::Cylinder, &[(1, 1)]);
        catalog.add_all(HeightClass::Tall, BrickType::Cylinder, &[(1, 1), (2, 2)]);
        // Custom objects occupy a single cell per instance.
        catalog.add_all(HeightClass::Flat, BrickType::Custom, &[(1, 1)]);
        catalog.add_all(HeightClass::Tall, BrickType::Custom, &[(1, 1)]);
        catalog
    }
}

impl LegalSizeCatalog {
    /// An empty catalog; populate with [`add`](Self::add).
    pub fn empty() -> Self {
        Self {
            sizes: HashMap::new(),
        }
    }

    /// Permit a footprint, in both orientations.
    pub fn add(&mut self, class: HeightClass, brick_type: BrickType, width: i32, depth: i32) {
        let entry = self
            .sizes
            .entry(class)
            .or_default()
            .entry(brick_type)
            .or_default();
        entry.insert((width, depth));
        entry.insert((depth, width));
    }

    fn add_all(&mut self, class: HeightClass, brick_type: BrickType, sizes: &[(i32, i32)]) {
        for &(w, d) in sizes {
            self.add(class, brick_type, w, d);
        }
    }

    fn entries(&self, class: HeightClass, brick_type: BrickType) -> Option<&HashSet<(i32, i32)>> {
        self.sizes.get(&class)?.get(&brick_type)
    }

    /// Map a cell's type to the type actually looked up in the given
    /// class: types with no entries there fall back to the class's
    /// plain shape.
    pub fn resolve_type(&self, brick_type: BrickType, class: HeightClass) -> BrickType {
        if self.entries(class, brick_type).is_some() {
            brick_type
        } else {
            match class {
                HeightClass::Flat => BrickType::Plate,
                HeightClass::Tall => BrickType::Brick,
            }
        }
    }

    /// Whether a type only exists in the tall class (so a mixed-mode
    /// build must not degrade it to a plate if it can avoid it).
    pub fn tall_only(&self, brick_type: BrickType) -> bool {
        self.entries(HeightClass::Tall, brick_type).is_some()
            && self.entries(HeightClass::Flat, brick_type).is_none()
    }

    /// Membership test: is (width, depth) exactly a permitted footprint?
    pub fn legal(&self, width: i32, depth: i32, brick_type: BrickType, class: HeightClass) -> bool {
        self.entries(class, self.resolve_type(brick_type, class))
            .is_some_and(|set| set.contains(&(width, depth)))
    }

    /// Prefix test: can (width, depth) still grow into some permitted
    /// footprint?
    pub fn fits_within(
        &self,
        width: i32,
        depth: i32,
        brick_type: BrickType,
        class: HeightClass,
    ) -> bool {
        self.entries(class, self.resolve_type(brick_type, class))
            .is_some_and(|set| set.iter().any(|&(w, d)| w >= width && d >= depth))
    }

    /// The largest permitted footprint within a grown bound: maximum
    /// area, ties broken toward larger width, then larger depth.
    pub fn largest_within(
        &self,
        width: i32,
        depth: i32,
        brick_type: BrickType,
        class: HeightClass,
    ) -> Option<(i32, i32)> {
        self.entries(class, self.resolve_type(brick_type, class))?
            .iter()
            .filter(|&&(w, d)| w <= width && d <= depth)
            .max_by_key(|&&(w, d)| (w * d, w, d))
            .copied()
    }

    /// Verify that every listed type can produce a 1x1 in every listed
    /// class (after fallback mapping). The merge engine relies on the
    /// 1x1 as its unconditional fallback footprint.
    pub fn validate(&self, brick_types: &[BrickType], classes: &[HeightClass]) -> Result<()> {
        for &class in classes {
            for &brick_type in brick_types {
                if !self.legal(1, 1, brick_type, class) {
                    return Err(PackerError::Configuration {
                        brick_type,
                        height_class: class,
                    });
                }
            }
        }
        Ok(())
    }
}
