//! Material resolution: one display material per committed footprint.
//!
//! SOURCE mode is also what arms the merge engine's compatibility
//! check; the other modes never inspect cell materials, so mixing is
//! harmless under them.

use crate::config::{BuildConfig, MaterialMode};
use crate::grid::{BrickGrid, FootprintId};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;

/// Resolve the material for one footprint. Returns `None` when the
/// mode assigns nothing or the lookup misses; misses degrade, they
/// never fail the build.
pub fn resolve(grid: &BrickGrid, id: FootprintId, config: &BuildConfig, z_step: i32) -> Option<String> {
    match config.material_mode {
        MaterialMode::None => None,
        MaterialMode::Custom => config.custom_material.clone(),
        MaterialMode::Source => resolve_from_source(grid, id, z_step),
        MaterialMode::Random => resolve_from_palette(config, id),
    }
}

/// Keep the member material with the highest occupancy value; break
/// ties among fully-internal members by taking the most frequent name
/// (then the lexicographically smallest, for determinism).
fn resolve_from_source(grid: &BrickGrid, id: FootprintId, z_step: i32) -> Option<String> {
    let footprint = grid.footprint(id)?;
    let mut highest_val = f32::MIN;
    let mut best: Option<&str> = None;
    let mut internal_mats: Vec<&str> = Vec::new();
    for pos in BrickGrid::member_positions(footprint.anchor, footprint.size, z_step) {
        let Some(cell) = grid.cell(pos) else { continue };
        let Some(mat) = cell.material.as_deref() else {
            continue;
        };
        if cell.val >= highest_val {
            highest_val = cell.val;
            best = Some(mat);
        }
        if cell.val == 1.0 {
            internal_mats.push(mat);
        }
    }
    if internal_mats.len() > 1 {
        best = most_common(&internal_mats);
    }
    best.map(str::to_owned)
}

fn most_common<'a>(names: &[&'a str]) -> Option<&'a str> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for &name in names {
        *counts.entry(name).or_default() += 1;
    }
    counts
        .into_iter()
        .max_by(|a, b| a.1.cmp(&b.1).then(b.0.cmp(a.0)))
        .map(|(name, _)| name)
}

/// Seeded pick from the user palette: each footprint index draws its
/// own deterministic sample.
fn resolve_from_palette(config: &BuildConfig, id: FootprintId) -> Option<String> {
    if config.random_palette.is_empty() {
        return None;
    }
    if config.random_palette.len() == 1 {
        return config.random_palette.first().cloned();
    }
    let mut rng = StdRng::seed_from_u64(config.random_mat_seed.wrapping_add(id.index() as u64));
    let idx = rng.gen_range(0..config.random_palette.len());
    config.random_palette.get(idx).cloned()
}
