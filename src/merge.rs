//! The merge engine: grows a catalog-legal rectangular footprint from a
//! seed cell and commits ownership over the consumed cells.
//!
//! Growth starts at 1x1 and repeatedly attempts to extend by one unit
//! in x, then in y. An extension is accepted only if every newly
//! included cell is available (drawn, unowned, unvisited, same type,
//! compatible material, allowed by the shell/internal policy), the
//! result stays within the configured caps, and — under strict
//! legality — the rectangle remains a prefix of some catalog entry.
//!
//! Shell seeds prefer the largest brick: they grow to the maximal
//! bound and snap down to the largest legal entry inside it. Internal
//! seeds stop at the first exactly-legal fit an extension reaches,
//! keeping interior fills small and quick to place.

use crate::catalog::{HeightClass, LegalSizeCatalog};
use crate::config::{BuildConfig, HeightMode};
use crate::error::{PackerError, Result};
use crate::grid::{BrickGrid, FootprintId, LayerPatch};
use crate::types::{BrickType, FootprintSize, GridPosition};

/// Grow a footprint from `seed` and commit it into the patch.
///
/// The seed must be a drawn, unowned, unvisited cell; violating that is
/// a [`PackerError::Consistency`].
pub fn attempt_merge(
    patch: &mut LayerPatch,
    seed: GridPosition,
    config: &BuildConfig,
    catalog: &LegalSizeCatalog,
) -> Result<FootprintId> {
    let seed_cell = patch
        .cell(seed)
        .ok_or(PackerError::Consistency(seed))?
        .clone();
    if !seed_cell.draw || seed_cell.owner.is_some() || seed_cell.attempted_merge {
        return Err(PackerError::Consistency(seed));
    }

    let prefer_largest = seed_cell.is_shell();
    let class = pick_height_class(patch, seed, config);
    let layers = class.layers_consumed(config.height_mode);
    let brick_type = catalog.resolve_type(seed_cell.brick_type, class);

    // Internal seeds never grow when internal merging is off.
    let allow_growth = config.merge_internals || seed_cell.is_shell();

    let consumable = |patch: &LayerPatch, pos: GridPosition| -> bool {
        let Some(cell) = patch.cell(pos) else {
            return false;
        };
        cell.draw
            && cell.owner.is_none()
            && !cell.attempted_merge
            && cell.brick_type == seed_cell.brick_type
            && (config.merge_internals || cell.is_shell())
            && (!config.materials_must_match() || cell.material == seed_cell.material)
    };
    let column_consumable = |patch: &LayerPatch, x: i32, y: i32| -> bool {
        (0..layers).all(|dz| consumable(patch, GridPosition::new(x, y, seed.z + dz)))
    };

    // Exact-legality under strict mode; anything goes otherwise.
    let exact_legal = |w: i32, d: i32| -> bool {
        !config.legal_bricks_only || catalog.legal(w, d, brick_type, class)
    };
    let can_still_grow = |w: i32, d: i32| -> bool {
        !config.legal_bricks_only || catalog.fits_within(w, d, brick_type, class)
    };

    let max_width = config.max_width.max(1);
    let max_depth = config.max_depth.max(1);

    let mut width = 1;
    let mut depth = 1;
    let mut first_fit = None;

    if allow_growth {
        let mut blocked_x = false;
        let mut blocked_y = false;
        'grow: while !(blocked_x && blocked_y) {
            if !blocked_x {
                let next = width + 1;
                let fits = next <= max_width
                    && can_still_grow(next, depth)
                    && (0..depth).all(|dy| column_consumable(patch, seed.x + width, seed.y + dy));
                if fits {
                    width = next;
                    if !prefer_largest && exact_legal(width, depth) {
                        first_fit = Some((width, depth));
                        break 'grow;
                    }
                } else {
                    blocked_x = true;
                }
            }
            if !blocked_y {
                let next = depth + 1;
                let fits = next <= max_depth
                    && can_still_grow(width, next)
                    && (0..width).all(|dx| column_consumable(patch, seed.x + dx, seed.y + depth));
                if fits {
                    depth = next;
                    if !prefer_largest && exact_legal(width, depth) {
                        first_fit = Some((width, depth));
                        break 'grow;
                    }
                } else {
                    blocked_y = true;
                }
            }
        }
    }

    // Snap the grown bound to the catalog.
    let (width, depth) = match first_fit {
        Some(fit) => fit,
        None if config.legal_bricks_only => catalog
            .largest_within(width, depth, brick_type, class)
            .ok_or(PackerError::Configuration {
                brick_type,
                height_class: class,
            })?,
        None => (width, depth),
    };

    let size = FootprintSize::new(width, depth, class.footprint_height());
    commit(patch, seed, size, brick_type, config)
}

/// Decide the height class for a seed. MIXED builds try a brick first:
/// the seed's own column must supply three consumable key-layers.
fn pick_height_class(patch: &LayerPatch, seed: GridPosition, config: &BuildConfig) -> HeightClass {
    match config.height_mode {
        HeightMode::Flat => HeightClass::Flat,
        HeightMode::Tall => HeightClass::Tall,
        HeightMode::Mixed => {
            let column_free = (1..3).all(|dz| {
                patch
                    .cell(GridPosition::new(seed.x, seed.y, seed.z + dz))
                    .is_some_and(|c| c.draw && c.owner.is_none() && !c.attempted_merge)
            });
            if column_free {
                HeightClass::Tall
            } else {
                HeightClass::Flat
            }
        }
    }
}

/// Write ownership over all member cells. Double-checks availability:
/// consuming an owned or visited cell here is a programming error, not
/// a recoverable state.
fn commit(
    patch: &mut LayerPatch,
    anchor: GridPosition,
    size: FootprintSize,
    brick_type: BrickType,
    config: &BuildConfig,
) -> Result<FootprintId> {
    let members = BrickGrid::member_positions(anchor, size, config.height_mode.z_step());
    for &pos in &members {
        let occupied = patch
            .cell(pos)
            .map_or(true, |c| c.owner.is_some() || c.attempted_merge);
        if occupied {
            return Err(PackerError::Consistency(pos));
        }
    }
    let id = patch.push_footprint(anchor, size, brick_type);
    for &pos in &members {
        let cell = patch.cell_mut(pos).ok_or(PackerError::Consistency(pos))?;
        cell.owner = Some(id);
        cell.attempted_merge = true;
    }
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MaterialMode, MergeOrder};
    use crate::grid::CellRecord;
    use crate::types::BrickType;

    fn flat_config(max_width: i32, max_depth: i32) -> BuildConfig {
        BuildConfig {
            height_mode: HeightMode::Flat,
            max_width,
            max_depth,
            merge_order: MergeOrder::Consistent,
            ..Default::default()
        }
    }

    fn small_catalog() -> LegalSizeCatalog {
        let mut catalog = LegalSizeCatalog::empty();
        catalog.add(HeightClass::Flat, BrickType::Plate, 1, 1);
        catalog.add(HeightClass::Flat, BrickType::Plate, 1, 2);
        catalog.add(HeightClass::Flat, BrickType::Plate, 2, 2);
        catalog
    }

    fn shell(x: i32, y: i32, z: i32) -> CellRecord {
        CellRecord::new(GridPosition::new(x, y, z), 0.5, BrickType::Plate)
    }

    fn internal(x: i32, y: i32, z: i32) -> CellRecord {
        CellRecord::new(GridPosition::new(x, y, z), 1.0, BrickType::Plate)
    }

    fn square_grid(n: i32) -> BrickGrid {
        let mut grid = BrickGrid::new();
        for y in 0..n {
            for x in 0..n {
                grid.insert(shell(x, y, 0));
            }
        }
        grid
    }

    #[test]
    fn test_full_square_becomes_one_brick() {
        // 2x2x1 fully occupied, caps at 2: a single 2x2 footprint.
        let grid = square_grid(2);
        let mut patch = LayerPatch::new(&grid);
        let id = attempt_merge(
            &mut patch,
            GridPosition::new(0, 0, 0),
            &flat_config(2, 2),
            &small_catalog(),
        )
        .unwrap();
        let fp = patch.footprint(id).unwrap();
        assert_eq!(fp.size, FootprintSize::new(2, 2, 1));
        for y in 0..2 {
            for x in 0..2 {
                let cell = patch.cell(GridPosition::new(x, y, 0)).unwrap();
                assert_eq!(cell.owner, Some(id));
            }
        }
    }

    #[test]
    fn test_material_mismatch_splits() {
        let mut grid = square_grid(2);
        for y in 0..2 {
            for x in 0..2 {
                grid.cell_mut(GridPosition::new(x, y, 0)).unwrap().material =
                    Some("red".to_string());
            }
        }
        grid.cell_mut(GridPosition::new(1, 1, 0)).unwrap().material = Some("blue".to_string());

        let config = BuildConfig {
            material_mode: MaterialMode::Source,
            ..flat_config(2, 2)
        };
        let catalog = small_catalog();
        let mut patch = LayerPatch::new(&grid);
        for y in 0..2 {
            for x in 0..2 {
                let pos = GridPosition::new(x, y, 0);
                if patch.cell(pos).unwrap().owner.is_none() {
                    attempt_merge(&mut patch, pos, &config, &catalog).unwrap();
                }
            }
        }

        // The three red cells form a legal decomposition, the blue cell
        // stands alone, and no footprint mixes materials.
        assert_eq!(patch.new_footprints().len(), 3);
        let blue_owner = patch.cell(GridPosition::new(1, 1, 0)).unwrap().owner;
        let blue_fp = patch.footprint(blue_owner.unwrap()).unwrap();
        assert_eq!(blue_fp.size, FootprintSize::new(1, 1, 1));
        let covered: i32 = patch.new_footprints().iter().map(|f| f.size.area()).sum();
        assert_eq!(covered, 4);
    }

    #[test]
    fn test_width_cap_forbids_strip_merge() {
        // 1x4 strip with max_width 1: four independent 1x1 footprints.
        let mut grid = BrickGrid::new();
        for x in 0..4 {
            grid.insert(shell(x, 0, 0));
        }
        let config = flat_config(1, 10);
        let catalog = LegalSizeCatalog::default();
        let mut patch = LayerPatch::new(&grid);
        for x in 0..4 {
            let pos = GridPosition::new(x, 0, 0);
            if patch.cell(pos).unwrap().owner.is_none() {
                attempt_merge(&mut patch, pos, &config, &catalog).unwrap();
            }
        }
        assert_eq!(patch.new_footprints().len(), 4);
        assert!(patch
            .new_footprints()
            .iter()
            .all(|f| f.size == FootprintSize::new(1, 1, 1)));
    }

    #[test]
    fn test_growth_through_non_legal_prefix() {
        // Catalog holds only 1x1 and 1x3: growth passes through the
        // illegal 2x1 on its way to 3x1.
        let mut catalog = LegalSizeCatalog::empty();
        catalog.add(HeightClass::Flat, BrickType::Plate, 1, 1);
        catalog.add(HeightClass::Flat, BrickType::Plate, 1, 3);
        let mut grid = BrickGrid::new();
        for x in 0..3 {
            grid.insert(shell(x, 0, 0));
        }
        let mut patch = LayerPatch::new(&grid);
        let id = attempt_merge(
            &mut patch,
            GridPosition::new(0, 0, 0),
            &flat_config(8, 8),
            &catalog,
        )
        .unwrap();
        assert_eq!(
            patch.footprint(id).unwrap().size,
            FootprintSize::new(3, 1, 1)
        );
    }

    #[test]
    fn test_internal_seed_takes_first_fit() {
        // Internal cells stop at the first exactly-legal fit (2x1)
        // instead of growing to the 2x2 bound.
        let mut grid = BrickGrid::new();
        for y in 0..2 {
            for x in 0..2 {
                grid.insert(internal(x, y, 0));
            }
        }
        let mut patch = LayerPatch::new(&grid);
        let id = attempt_merge(
            &mut patch,
            GridPosition::new(0, 0, 0),
            &flat_config(2, 2),
            &small_catalog(),
        )
        .unwrap();
        assert_eq!(
            patch.footprint(id).unwrap().size,
            FootprintSize::new(2, 1, 1)
        );
    }

    #[test]
    fn test_internal_merging_disabled() {
        let mut grid = BrickGrid::new();
        for x in 0..2 {
            grid.insert(internal(x, 0, 0));
        }
        let config = BuildConfig {
            merge_internals: false,
            ..flat_config(2, 2)
        };
        let mut patch = LayerPatch::new(&grid);
        let id = attempt_merge(
            &mut patch,
            GridPosition::new(0, 0, 0),
            &config,
            &small_catalog(),
        )
        .unwrap();
        assert_eq!(
            patch.footprint(id).unwrap().size,
            FootprintSize::new(1, 1, 1)
        );
    }

    #[test]
    fn test_reseeding_owned_cell_is_consistency_error() {
        let grid = square_grid(2);
        let mut patch = LayerPatch::new(&grid);
        let config = flat_config(2, 2);
        let catalog = small_catalog();
        attempt_merge(&mut patch, GridPosition::new(0, 0, 0), &config, &catalog).unwrap();
        let err =
            attempt_merge(&mut patch, GridPosition::new(0, 0, 0), &config, &catalog).unwrap_err();
        assert!(matches!(err, PackerError::Consistency(_)));
    }

    #[test]
    fn test_missing_unit_entry_is_configuration_error() {
        let mut catalog = LegalSizeCatalog::empty();
        catalog.add(HeightClass::Flat, BrickType::Plate, 2, 2);
        let mut grid = BrickGrid::new();
        grid.insert(shell(0, 0, 0));
        let mut patch = LayerPatch::new(&grid);
        let err = attempt_merge(
            &mut patch,
            GridPosition::new(0, 0, 0),
            &flat_config(2, 2),
            &catalog,
        )
        .unwrap_err();
        assert!(matches!(err, PackerError::Configuration { .. }));
    }

    #[test]
    fn test_mixed_mode_prefers_tall_column() {
        let mut grid = BrickGrid::new();
        for z in 0..3 {
            grid.insert(CellRecord::new(GridPosition::new(0, 0, z), 0.5, BrickType::Brick));
        }
        let config = BuildConfig {
            height_mode: HeightMode::Mixed,
            merge_order: MergeOrder::Consistent,
            ..Default::default()
        };
        let catalog = LegalSizeCatalog::default();
        let mut patch = LayerPatch::new(&grid);
        let id = attempt_merge(&mut patch, GridPosition::new(0, 0, 0), &config, &catalog).unwrap();
        let fp = patch.footprint(id).unwrap();
        assert_eq!(fp.size, FootprintSize::new(1, 1, 3));
        assert_eq!(fp.brick_type, BrickType::Brick);
        for z in 0..3 {
            assert_eq!(
                patch.cell(GridPosition::new(0, 0, z)).unwrap().owner,
                Some(id)
            );
        }
    }

    #[test]
    fn test_mixed_mode_short_column_falls_back_to_plate() {
        let mut grid = BrickGrid::new();
        grid.insert(CellRecord::new(GridPosition::new(0, 0, 0), 0.5, BrickType::Brick));
        grid.insert(CellRecord::new(GridPosition::new(0, 0, 1), 0.5, BrickType::Brick));
        let config = BuildConfig {
            height_mode: HeightMode::Mixed,
            merge_order: MergeOrder::Consistent,
            ..Default::default()
        };
        let catalog = LegalSizeCatalog::default();
        let mut patch = LayerPatch::new(&grid);
        let id = attempt_merge(&mut patch, GridPosition::new(0, 0, 0), &config, &catalog).unwrap();
        let fp = patch.footprint(id).unwrap();
        assert_eq!(fp.size.height, 1);
        assert_eq!(fp.brick_type, BrickType::Plate);
    }
}
