//! The z-level scheduler: drives the merge engine across layers bottom
//! up, staggers mixed flat/tall builds over two offset passes, runs the
//! randomized variation search, and finishes footprints with exposure
//! and material resolution.

use crate::catalog::{HeightClass, LegalSizeCatalog};
use crate::config::{BuildConfig, HeightMode, MaterialMode, MergeOrder};
use crate::error::{PackerError, Result};
use crate::exposure;
use crate::grid::{BrickGrid, Footprint, LayerPatch};
use crate::material;
use crate::merge;
use crate::types::{BrickType, GridPosition};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Handle for aborting a build from another thread. Polled once per
/// seed cell; a cancelled layer is rolled back whole, so the grid is
/// always left at the last fully committed layer.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Summary of a completed build.
#[derive(Debug, Clone, Default)]
pub struct BuildReport {
    /// Total number of committed footprints.
    pub footprint_count: usize,
    /// Distinct (size, type) pairs used, with width/depth normalized
    /// so orientation does not split entries.
    pub bricks_used: BTreeSet<((i32, i32, i32), BrickType)>,
    /// Non-fatal degradations encountered during the build.
    pub warnings: Vec<String>,
}

impl BuildReport {
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// The packing entry point: owns the catalog and configuration, and
/// runs complete builds over caller-provided grids.
pub struct Packer {
    catalog: LegalSizeCatalog,
    config: BuildConfig,
}

impl Packer {
    /// Create a packer with default configuration.
    pub fn new(catalog: LegalSizeCatalog) -> Self {
        Self {
            catalog,
            config: BuildConfig::default(),
        }
    }

    /// Create a packer with custom configuration.
    pub fn with_config(catalog: LegalSizeCatalog, config: BuildConfig) -> Self {
        Self { catalog, config }
    }

    pub fn catalog(&self) -> &LegalSizeCatalog {
        &self.catalog
    }

    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    /// Run a full build, mutating the grid in place. Derived state is
    /// reset on entry, so re-running on an unchanged grid reproduces
    /// the same result.
    pub fn pack(&self, grid: &mut BrickGrid) -> Result<BuildReport> {
        self.pack_with_cancel(grid, &CancelToken::new())
    }

    /// [`pack`](Self::pack) for callers preferring a functional update.
    pub fn pack_owned(&self, mut grid: BrickGrid) -> Result<(BrickGrid, BuildReport)> {
        let report = self.pack(&mut grid)?;
        Ok((grid, report))
    }

    /// Run a full build with a cancellation handle.
    pub fn pack_with_cancel(&self, grid: &mut BrickGrid, cancel: &CancelToken) -> Result<BuildReport> {
        self.validate_catalog(grid)?;
        grid.reset_derived();

        let layers = layers_bottom_up(grid);
        let passes = match self.config.height_mode {
            HeightMode::Mixed => 2,
            _ => 1,
        };
        log::debug!(
            "packing {} cells across {} layers in {} pass(es)",
            grid.len(),
            layers.len(),
            passes
        );

        let lowest_z = layers.keys().next().copied().unwrap_or(0);
        let mut layer_ordinal: u64 = 0;
        for pass in 0..passes {
            for (&z, seeds) in &layers {
                if passes == 2 && skip_this_layer(pass, lowest_z, z, self.config.offset_brick_layers) {
                    continue;
                }
                self.merge_layer(grid, seeds, layer_ordinal, cancel)?;
                layer_ordinal += 1;
            }
        }

        // Per-pass markers are scan state, not results.
        grid.clear_attempted();

        let z_step = self.config.height_mode.z_step();
        exposure::propagate_all(grid, z_step);

        let mut report = BuildReport::default();
        self.resolve_materials(grid, z_step, &mut report);
        report.footprint_count = grid.footprints().len();
        for footprint in grid.footprints() {
            report
                .bricks_used
                .insert((footprint.size.normalized(), footprint.brick_type));
        }
        log::debug!(
            "packed {} footprints, {} distinct bricks",
            report.footprint_count,
            report.bricks_used.len()
        );
        Ok(report)
    }

    /// Every type present in the grid must be able to fall back to a
    /// 1x1 in every active height class.
    fn validate_catalog(&self, grid: &BrickGrid) -> Result<()> {
        let types: Vec<BrickType> = grid
            .cells()
            .filter(|c| c.draw)
            .map(|c| c.brick_type)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let classes: &[HeightClass] = match self.config.height_mode {
            HeightMode::Flat => &[HeightClass::Flat],
            HeightMode::Tall => &[HeightClass::Tall],
            HeightMode::Mixed => &[HeightClass::Flat, HeightClass::Tall],
        };
        self.catalog.validate(&types, classes)
    }

    /// Merge one layer, scoring `connect_thresh` variants when the
    /// variation search is active and committing only the best.
    fn merge_layer(
        &self,
        grid: &mut BrickGrid,
        seeds: &[GridPosition],
        layer_ordinal: u64,
        cancel: &CancelToken,
    ) -> Result<()> {
        let variants = self.config.effective_connect_thresh() as u64;
        let mut best: Option<(i64, LayerPatch)> = None;
        for variant in 0..variants {
            let (patch, aligned, count) =
                self.merge_layer_variant(grid, seeds, layer_ordinal, variant, cancel)?;
            let score = -((aligned + 2 * count) as i64);
            if variants > 1 {
                log::trace!(
                    "layer {}: variant {} scored {} ({} aligned edges, {} bricks)",
                    layer_ordinal,
                    variant,
                    score,
                    aligned,
                    count
                );
            }
            let improved = best.as_ref().map_or(true, |(s, _)| score > *s);
            if improved {
                best = Some((score, patch));
            }
            // A seam-free variant cannot be beaten on the primary term;
            // skip the remaining variants for this layer.
            if aligned == 0 {
                break;
            }
        }
        if let Some((_, patch)) = best {
            let changes = patch.into_changes();
            grid.apply_changes(changes);
        }
        Ok(())
    }

    fn merge_layer_variant<'g>(
        &self,
        grid: &'g BrickGrid,
        seeds: &[GridPosition],
        layer_ordinal: u64,
        variant: u64,
        cancel: &CancelToken,
    ) -> Result<(LayerPatch<'g>, u32, u32)> {
        let mut order: Vec<GridPosition> = seeds.to_vec();
        if self.config.merge_order == MergeOrder::Random {
            let seed = self
                .config
                .merge_seed
                .wrapping_add(layer_ordinal)
                .wrapping_add(variant);
            order.shuffle(&mut StdRng::seed_from_u64(seed));
        }

        let mut patch = LayerPatch::new(grid);
        let mut aligned = 0u32;
        let mut count = 0u32;
        for &pos in &order {
            if cancel.is_cancelled() {
                // Dropping the patch rolls this layer back.
                return Err(PackerError::Cancelled);
            }
            let available = patch
                .cell(pos)
                .map_or(false, |c| c.draw && c.owner.is_none() && !c.attempted_merge);
            if !available {
                continue;
            }
            let id = merge::attempt_merge(&mut patch, pos, &self.config, &self.catalog)?;
            if let Some(footprint) = patch.footprint(id) {
                aligned += aligned_seam_edges(&patch, footprint);
                count += 1;
            }
        }
        Ok((patch, aligned, count))
    }

    fn resolve_materials(&self, grid: &mut BrickGrid, z_step: i32, report: &mut BuildReport) {
        if self.config.material_mode == MaterialMode::None {
            return;
        }
        for idx in 0..grid.footprints().len() {
            let id = grid.footprints()[idx].id;
            let resolved = material::resolve(grid, id, &self.config, z_step);
            if resolved.is_none() {
                let anchor = grid.footprints()[idx].anchor;
                log::warn!("no material resolved for footprint at {anchor}; assigning none");
                report
                    .warnings
                    .push(format!("no material resolved for footprint at {anchor}"));
            }
            if let Some(footprint) = grid.footprint_mut(id) {
                footprint.material = resolved;
            }
        }
    }
}

/// Drawn cell positions grouped by layer, each layer sorted by (x, y).
fn layers_bottom_up(grid: &BrickGrid) -> BTreeMap<i32, Vec<GridPosition>> {
    let mut layers: BTreeMap<i32, Vec<GridPosition>> = BTreeMap::new();
    for cell in grid.cells().filter(|c| c.draw) {
        layers.entry(cell.loc.z).or_default().push(cell.loc);
    }
    for seeds in layers.values_mut() {
        seeds.sort_by_key(|p| (p.x, p.y));
    }
    layers
}

/// Mixed-mode pass staggering: the first pass starts bricks on every
/// third layer (shifted by the configured offset), the second pass
/// fills the remainder — the way stacked plates and bricks tile in
/// real assemblies.
fn skip_this_layer(pass: u32, lowest_z: i32, z: i32, offset_brick_layers: i32) -> bool {
    let phase = (z - offset_brick_layers - lowest_z).rem_euclid(3);
    match pass {
        0 => phase != 0,
        _ => phase == 0,
    }
}

/// Unit boundary edges of `footprint` sitting directly above a boundary
/// of the footprint below them on the same grid line. Aligned seams
/// stack weakly; the variation search drives them down.
fn aligned_seam_edges(patch: &LayerPatch, footprint: &Footprint) -> u32 {
    let x0 = footprint.anchor.x;
    let x1 = x0 + footprint.size.width - 1;
    let y0 = footprint.anchor.y;
    let y1 = y0 + footprint.size.depth - 1;
    let z_below = footprint.anchor.z - 1;

    let mut aligned = 0;
    for y in y0..=y1 {
        if owner_below(patch, x0, y, z_below).is_some_and(|b| b.anchor.x == x0) {
            aligned += 1;
        }
        if owner_below(patch, x1, y, z_below)
            .is_some_and(|b| b.anchor.x + b.size.width - 1 == x1)
        {
            aligned += 1;
        }
    }
    for x in x0..=x1 {
        if owner_below(patch, x, y0, z_below).is_some_and(|b| b.anchor.y == y0) {
            aligned += 1;
        }
        if owner_below(patch, x, y1, z_below)
            .is_some_and(|b| b.anchor.y + b.size.depth - 1 == y1)
        {
            aligned += 1;
        }
    }
    aligned
}

fn owner_below<'a>(patch: &'a LayerPatch, x: i32, y: i32, z: i32) -> Option<&'a Footprint> {
    patch
        .cell(GridPosition::new(x, y, z))
        .filter(|c| c.draw)
        .and_then(|c| c.owner)
        .and_then(|id| patch.footprint(id))
}
