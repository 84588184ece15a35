//! The sparse occupancy grid and footprint ownership bookkeeping.
//!
//! Cells are produced externally by voxelization, fully seeded with
//! `val`, `material`, `draw` and `brick_type`. The merge engine and the
//! exposure propagator are the only writers of the derived fields
//! (`owner`, exposure, `attempted_merge`), and only during a build.
//!
//! Ownership is an arena of [`Footprint`]s plus a per-cell
//! `Option<FootprintId>`; the footprint whose anchor equals a cell's
//! location carries the authoritative size.

use crate::types::{BrickType, Exposure, FootprintSize, GridPosition};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Index of a footprint in the grid's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FootprintId(u32);

impl FootprintId {
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

/// A committed rectangular run of cells rendering as a single brick.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Footprint {
    pub id: FootprintId,
    /// The owning cell: the member with the lowest (x, y, z).
    pub anchor: GridPosition,
    pub size: FootprintSize,
    pub brick_type: BrickType,
    /// Resolved display material, filled in by the material policy.
    pub material: Option<String>,
}

/// One cell of the sparse grid: a 1x1xzStep volume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellRecord {
    pub loc: GridPosition,
    /// Shell-depth/occupancy strength in [0, 1]. Shell cells sit on
    /// the source surface boundary (0 < val < 1); internal cells are
    /// fully inside the solid (val == 1).
    pub val: f32,
    /// Whether this cell renders at all.
    pub draw: bool,
    /// Material sampled from the source surface, if any.
    #[serde(default)]
    pub material: Option<String>,
    pub brick_type: BrickType,
    /// Selects the custom object for [`BrickType::Custom`] cells.
    #[serde(default)]
    pub custom_index: Option<u8>,
    #[serde(default)]
    pub owner: Option<FootprintId>,
    #[serde(default)]
    pub flipped: bool,
    #[serde(default)]
    pub rotated: bool,
    #[serde(default)]
    pub top_exposed: Exposure,
    #[serde(default)]
    pub bot_exposed: Exposure,
    #[serde(default, skip_serializing)]
    pub attempted_merge: bool,
}

impl CellRecord {
    /// A drawn cell with the given occupancy value and type, derived
    /// state unset.
    pub fn new(loc: GridPosition, val: f32, brick_type: BrickType) -> Self {
        Self {
            loc,
            val,
            draw: true,
            material: None,
            brick_type,
            custom_index: None,
            owner: None,
            flipped: false,
            rotated: false,
            top_exposed: Exposure::Unknown,
            bot_exposed: Exposure::Unknown,
            attempted_merge: false,
        }
    }

    pub fn with_material(mut self, material: impl Into<String>) -> Self {
        self.material = Some(material.into());
        self
    }

    /// Shell cells sit on the source surface boundary.
    pub fn is_shell(&self) -> bool {
        self.val > 0.0 && self.val < 1.0
    }
}

/// The sparse 3D occupancy grid plus the footprint arena.
#[derive(Debug, Clone, Default)]
pub struct BrickGrid {
    cells: HashMap<GridPosition, CellRecord>,
    footprints: Vec<Footprint>,
}

impl BrickGrid {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a grid from externally voxelized cells.
    pub fn from_cells(cells: impl IntoIterator<Item = CellRecord>) -> Self {
        let mut grid = Self::new();
        for cell in cells {
            grid.insert(cell);
        }
        grid
    }

    pub fn insert(&mut self, cell: CellRecord) {
        self.cells.insert(cell.loc, cell);
    }

    pub fn cell(&self, pos: GridPosition) -> Option<&CellRecord> {
        self.cells.get(&pos)
    }

    pub fn cell_mut(&mut self, pos: GridPosition) -> Option<&mut CellRecord> {
        self.cells.get_mut(&pos)
    }

    pub fn contains(&self, pos: GridPosition) -> bool {
        self.cells.contains_key(&pos)
    }

    pub fn cells(&self) -> impl Iterator<Item = &CellRecord> {
        self.cells.values()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn footprint(&self, id: FootprintId) -> Option<&Footprint> {
        self.footprints.get(id.index())
    }

    pub fn footprint_mut(&mut self, id: FootprintId) -> Option<&mut Footprint> {
        self.footprints.get_mut(id.index())
    }

    pub fn footprints(&self) -> &[Footprint] {
        &self.footprints
    }

    /// Whether the cell at `pos` anchors its footprint.
    pub fn is_anchor(&self, pos: GridPosition) -> bool {
        self.cells
            .get(&pos)
            .and_then(|c| c.owner)
            .and_then(|id| self.footprint(id))
            .is_some_and(|f| f.anchor == pos)
    }

    /// Member positions of a footprint: its plan rectangle repeated
    /// over the key-layers it consumes (z advances by the active
    /// z-step, so a tall footprint on a brick-resolution grid lists
    /// one layer).
    pub fn member_positions(
        anchor: GridPosition,
        size: FootprintSize,
        z_step: i32,
    ) -> Vec<GridPosition> {
        let layers = (size.height / z_step.max(1)).max(1);
        let mut positions = Vec::with_capacity((size.width * size.depth * layers) as usize);
        for dz in 0..layers {
            for dy in 0..size.depth {
                for dx in 0..size.width {
                    positions.push(GridPosition::new(
                        anchor.x + dx,
                        anchor.y + dy,
                        anchor.z + dz,
                    ));
                }
            }
        }
        positions
    }

    /// Reset all derived fields ahead of a rebuild. Skipping this on a
    /// dirty grid is the classic stale-state bug: old owners mask new
    /// merges.
    pub fn reset_derived(&mut self) {
        for cell in self.cells.values_mut() {
            cell.owner = None;
            cell.top_exposed = Exposure::Unknown;
            cell.bot_exposed = Exposure::Unknown;
            cell.attempted_merge = false;
        }
        self.footprints.clear();
    }

    /// Clear per-pass merge markers, leaving ownership intact.
    pub fn clear_attempted(&mut self) {
        for cell in self.cells.values_mut() {
            cell.attempted_merge = false;
        }
    }

    /// Append a footprint to the arena, returning its id.
    pub(crate) fn push_footprint(
        &mut self,
        anchor: GridPosition,
        size: FootprintSize,
        brick_type: BrickType,
    ) -> FootprintId {
        let id = FootprintId(self.footprints.len() as u32);
        self.footprints.push(Footprint {
            id,
            anchor,
            size,
            brick_type,
            material: None,
        });
        id
    }

    /// Merge a layer patch's recorded changes into the grid.
    pub(crate) fn apply_changes(&mut self, changes: PatchChanges) {
        debug_assert_eq!(changes.base_footprints, self.footprints.len());
        for (pos, cell) in changes.cells {
            self.cells.insert(pos, cell);
        }
        self.footprints.extend(changes.new_footprints);
    }
}

/// The cells and footprints a [`LayerPatch`] accumulated, detached
/// from its borrow of the base grid so they can be committed.
pub(crate) struct PatchChanges {
    base_footprints: usize,
    cells: HashMap<GridPosition, CellRecord>,
    new_footprints: Vec<Footprint>,
}

/// Copy-on-write view of the grid for one layer's merge work.
///
/// Variation search runs several competing merges of the same layer;
/// only the best is kept, so each variant records just the cells it
/// touched and the footprints it created instead of deep-copying the
/// sub-grid. Dropping a patch rolls its layer back for free.
pub struct LayerPatch<'g> {
    base: &'g BrickGrid,
    base_footprints: usize,
    cells: HashMap<GridPosition, CellRecord>,
    new_footprints: Vec<Footprint>,
}

impl<'g> LayerPatch<'g> {
    pub fn new(base: &'g BrickGrid) -> Self {
        Self {
            base,
            base_footprints: base.footprints.len(),
            cells: HashMap::new(),
            new_footprints: Vec::new(),
        }
    }

    pub fn cell(&self, pos: GridPosition) -> Option<&CellRecord> {
        self.cells.get(&pos).or_else(|| self.base.cell(pos))
    }

    /// Mutable access; clones the base cell into the patch on first
    /// write.
    pub fn cell_mut(&mut self, pos: GridPosition) -> Option<&mut CellRecord> {
        if !self.cells.contains_key(&pos) {
            let cell = self.base.cell(pos)?.clone();
            self.cells.insert(pos, cell);
        }
        self.cells.get_mut(&pos)
    }

    pub fn footprint(&self, id: FootprintId) -> Option<&Footprint> {
        let idx = id.index();
        if idx < self.base_footprints {
            self.base.footprint(id)
        } else {
            self.new_footprints.get(idx - self.base_footprints)
        }
    }

    /// Footprints created within this patch.
    pub fn new_footprints(&self) -> &[Footprint] {
        &self.new_footprints
    }

    pub(crate) fn push_footprint(
        &mut self,
        anchor: GridPosition,
        size: FootprintSize,
        brick_type: BrickType,
    ) -> FootprintId {
        let id = FootprintId((self.base_footprints + self.new_footprints.len()) as u32);
        self.new_footprints.push(Footprint {
            id,
            anchor,
            size,
            brick_type,
            material: None,
        });
        id
    }

    /// Detach the recorded changes from the base-grid borrow.
    pub(crate) fn into_changes(self) -> PatchChanges {
        PatchChanges {
            base_footprints: self.base_footprints,
            cells: self.cells,
            new_footprints: self.new_footprints,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shell_cell(x: i32, y: i32, z: i32) -> CellRecord {
        CellRecord::new(GridPosition::new(x, y, z), 0.5, BrickType::Plate)
    }

    #[test]
    fn test_member_positions_flat() {
        let positions = BrickGrid::member_positions(
            GridPosition::new(2, 3, 0),
            FootprintSize::new(2, 2, 1),
            1,
        );
        assert_eq!(positions.len(), 4);
        assert!(positions.contains(&GridPosition::new(3, 4, 0)));
    }

    #[test]
    fn test_member_positions_mixed_tall() {
        // Height-3 footprint on a plate-resolution grid: three layers.
        let positions = BrickGrid::member_positions(
            GridPosition::new(0, 0, 5),
            FootprintSize::new(2, 1, 3),
            1,
        );
        assert_eq!(positions.len(), 6);
        assert!(positions.contains(&GridPosition::new(1, 0, 7)));
    }

    #[test]
    fn test_member_positions_tall_grid() {
        // z-step 3: a tall footprint occupies a single key-layer.
        let positions = BrickGrid::member_positions(
            GridPosition::new(0, 0, 5),
            FootprintSize::new(2, 2, 3),
            3,
        );
        assert_eq!(positions.len(), 4);
        assert!(positions.iter().all(|p| p.z == 5));
    }

    #[test]
    fn test_patch_copy_on_write() {
        let mut grid = BrickGrid::new();
        grid.insert(shell_cell(0, 0, 0));
        grid.insert(shell_cell(1, 0, 0));

        let mut patch = LayerPatch::new(&grid);
        patch
            .cell_mut(GridPosition::new(0, 0, 0))
            .unwrap()
            .attempted_merge = true;

        // Patch sees the write, base does not.
        assert!(patch.cell(GridPosition::new(0, 0, 0)).unwrap().attempted_merge);
        assert!(!grid.cell(GridPosition::new(0, 0, 0)).unwrap().attempted_merge);
        // Untouched cells read through to the base.
        assert!(patch.cell(GridPosition::new(1, 0, 0)).is_some());

        let changes = patch.into_changes();
        grid.apply_changes(changes);
        assert!(grid.cell(GridPosition::new(0, 0, 0)).unwrap().attempted_merge);
    }

    #[test]
    fn test_patch_footprint_ids_continue_arena() {
        let mut grid = BrickGrid::new();
        grid.insert(shell_cell(0, 0, 0));
        let base_id = grid.push_footprint(
            GridPosition::new(0, 0, 0),
            FootprintSize::new(1, 1, 1),
            BrickType::Plate,
        );

        let mut patch = LayerPatch::new(&grid);
        let new_id = patch.push_footprint(
            GridPosition::new(1, 0, 0),
            FootprintSize::new(1, 1, 1),
            BrickType::Plate,
        );
        assert_eq!(new_id.index(), 1);
        assert_eq!(patch.footprint(base_id).unwrap().anchor, GridPosition::new(0, 0, 0));
        assert_eq!(patch.footprint(new_id).unwrap().anchor, GridPosition::new(1, 0, 0));

        let changes = patch.into_changes();
        grid.apply_changes(changes);
        assert_eq!(grid.footprints().len(), 2);
        assert_eq!(grid.footprint(new_id).unwrap().id, new_id);
    }

    #[test]
    fn test_reset_derived() {
        let mut grid = BrickGrid::new();
        grid.insert(shell_cell(0, 0, 0));
        let id = grid.push_footprint(
            GridPosition::new(0, 0, 0),
            FootprintSize::new(1, 1, 1),
            BrickType::Plate,
        );
        let cell = grid.cell_mut(GridPosition::new(0, 0, 0)).unwrap();
        cell.owner = Some(id);
        cell.top_exposed = Exposure::Exposed;
        cell.attempted_merge = true;

        grid.reset_derived();
        let cell = grid.cell(GridPosition::new(0, 0, 0)).unwrap();
        assert_eq!(cell.owner, None);
        assert_eq!(cell.top_exposed, Exposure::Unknown);
        assert!(!cell.attempted_merge);
        assert!(grid.footprints().is_empty());
    }
}
