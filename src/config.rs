//! Build configuration.

use serde::{Deserialize, Serialize};

/// Order in which seed cells are visited within a layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MergeOrder {
    /// Sorted (x, y) scan. Bit-identical results across runs.
    Consistent,
    /// Seeded shuffle per layer; enables variation search.
    #[default]
    Random,
}

/// Height granularity of the build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum HeightMode {
    /// Plate-height footprints only (z-step 1).
    Flat,
    /// Brick-height footprints only. The grid is brick-height
    /// resolution, so a cell is one 1x1x3 volume (z-step 3).
    #[default]
    Tall,
    /// Bricks and plates mixed on a plate-resolution grid, staggered
    /// by two offset scheduler passes (z-step 1).
    Mixed,
}

impl HeightMode {
    /// The active z-step: the height, in grid layers, of one cell.
    pub fn z_step(&self) -> i32 {
        match self {
            HeightMode::Tall => 3,
            HeightMode::Flat | HeightMode::Mixed => 1,
        }
    }
}

/// How a footprint's single display material is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MaterialMode {
    /// No material assigned.
    #[default]
    None,
    /// Fixed user-chosen material, no cell inspection.
    Custom,
    /// Derived from the member cells' sampled source materials. This
    /// mode also arms the merge engine's material-compatibility check.
    Source,
    /// Seeded pick from a user palette.
    Random,
}

/// Configuration for a packing run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Restrict footprints to catalog entries. When off, any rectangle
    /// within the width/depth caps is allowed.
    pub legal_bricks_only: bool,
    /// Maximum footprint extent along x.
    pub max_width: i32,
    /// Maximum footprint extent along y.
    pub max_depth: i32,
    /// Allow cells with differing materials in one footprint.
    pub merge_inconsistent_mats: bool,
    /// Allow internal cells (val == 1) to be consumed by extensions.
    /// When off, only shell cells merge and internal cells stay 1x1.
    pub merge_internals: bool,
    /// Seed-cell scan order.
    pub merge_order: MergeOrder,
    /// Seed for the per-layer shuffle and variation search.
    pub merge_seed: u64,
    /// Number of layer variations to score per z level. 1 disables
    /// variation search; values above 1 take effect under random order.
    pub connect_thresh: u32,
    /// Height granularity.
    pub height_mode: HeightMode,
    /// Shifts which layers the first mixed-mode pass starts bricks on.
    pub offset_brick_layers: i32,
    /// Material policy for committed footprints.
    pub material_mode: MaterialMode,
    /// Material name used by [`MaterialMode::Custom`].
    pub custom_material: Option<String>,
    /// Seed for [`MaterialMode::Random`].
    pub random_mat_seed: u64,
    /// Palette drawn from by [`MaterialMode::Random`].
    pub random_palette: Vec<String>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            legal_bricks_only: true,
            max_width: 2,
            max_depth: 10,
            merge_inconsistent_mats: false,
            merge_internals: true,
            merge_order: MergeOrder::Random,
            merge_seed: 1000,
            connect_thresh: 1,
            height_mode: HeightMode::Tall,
            offset_brick_layers: 0,
            material_mode: MaterialMode::None,
            custom_material: None,
            random_mat_seed: 1000,
            random_palette: Vec::new(),
        }
    }
}

impl BuildConfig {
    /// Number of layer variations actually run per z level. Variation
    /// search needs randomized scans to produce distinct candidates.
    pub fn effective_connect_thresh(&self) -> u32 {
        match self.merge_order {
            MergeOrder::Random => self.connect_thresh.max(1),
            MergeOrder::Consistent => 1,
        }
    }

    /// Whether the merge engine must reject mixed-material extensions.
    pub fn materials_must_match(&self) -> bool {
        self.material_mode == MaterialMode::Source && !self.merge_inconsistent_mats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = BuildConfig::default();
        assert!(cfg.legal_bricks_only);
        assert_eq!(cfg.max_width, 2);
        assert_eq!(cfg.max_depth, 10);
        assert_eq!(cfg.height_mode.z_step(), 3);
        assert_eq!(cfg.effective_connect_thresh(), 1);
    }

    #[test]
    fn test_variation_search_needs_random_order() {
        let cfg = BuildConfig {
            connect_thresh: 4,
            merge_order: MergeOrder::Consistent,
            ..Default::default()
        };
        assert_eq!(cfg.effective_connect_thresh(), 1);
        let cfg = BuildConfig {
            connect_thresh: 4,
            ..Default::default()
        };
        assert_eq!(cfg.effective_connect_thresh(), 4);
    }

    #[test]
    fn test_material_gating() {
        let mut cfg = BuildConfig {
            material_mode: MaterialMode::Source,
            ..Default::default()
        };
        assert!(cfg.materials_must_match());
        cfg.merge_inconsistent_mats = true;
        assert!(!cfg.materials_must_match());
        cfg.merge_inconsistent_mats = false;
        cfg.material_mode = MaterialMode::Random;
        assert!(!cfg.materials_must_match());
    }
}
