//! Top/bottom exposure propagation.
//!
//! Exposure is computed per unit cell, not per footprint, because a
//! neighboring footprint may be finer-grained than this one. Mesh
//! synthesis consults `top_exposed` to decide whether to emit a stud
//! and `bot_exposed` to pick the underside detail level.

use crate::grid::{BrickGrid, FootprintId};
use crate::types::{Exposure, GridPosition};

/// Recompute exposure for every member cell of a footprint.
pub fn propagate_footprint(grid: &mut BrickGrid, id: FootprintId, z_step: i32) {
    let Some(footprint) = grid.footprint(id) else {
        return;
    };
    let members = BrickGrid::member_positions(footprint.anchor, footprint.size, z_step);
    for pos in members {
        let top = face_exposure(grid, pos.above(), true);
        let bot = face_exposure(grid, pos.below(), false);
        if let Some(cell) = grid.cell_mut(pos) {
            cell.top_exposed = top;
            cell.bot_exposed = bot;
        }
    }
}

/// Recompute exposure for every footprint in the grid.
pub fn propagate_all(grid: &mut BrickGrid, z_step: i32) {
    for idx in 0..grid.footprints().len() {
        let id = grid.footprints()[idx].id;
        propagate_footprint(grid, id, z_step);
    }
}

/// Exposure of a face given the neighbor key on its far side. A face
/// is covered only by a drawn, owned neighbor whose footprint type
/// presents a flat face toward it.
fn face_exposure(grid: &BrickGrid, neighbor: GridPosition, looking_up: bool) -> Exposure {
    let covered = grid
        .cell(neighbor)
        .filter(|cell| cell.draw)
        .and_then(|cell| cell.owner)
        .and_then(|owner| grid.footprint(owner))
        .is_some_and(|fp| {
            if looking_up {
                // The neighbor above hides our top iff its bottom is flat.
                fp.brick_type.obscures_below()
            } else {
                fp.brick_type.obscures_above()
            }
        });
    if covered {
        Exposure::Covered
    } else {
        Exposure::Exposed
    }
}

/// Footprint-level exposure: whether any member cell's top or bottom
/// face is exposed. Mesh synthesis uses this to pick stud and
/// underside variants for the whole brick.
pub fn footprint_exposure(grid: &BrickGrid, id: FootprintId, z_step: i32) -> (bool, bool) {
    let Some(footprint) = grid.footprint(id) else {
        return (false, false);
    };
    let mut top = false;
    let mut bot = false;
    for pos in BrickGrid::member_positions(footprint.anchor, footprint.size, z_step) {
        if let Some(cell) = grid.cell(pos) {
            top |= cell.top_exposed.is_exposed();
            bot |= cell.bot_exposed.is_exposed();
        }
    }
    (top, bot)
}
