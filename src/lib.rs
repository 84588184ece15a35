//! # Brick Packer
//!
//! A Rust library for merging voxelized models into minimal,
//! catalog-legal brick layouts.
//!
//! ## Overview
//!
//! This library takes a sparse 3D occupancy grid — one [`CellRecord`]
//! per drawn voxel, produced by an external voxelization step — and
//! greedily merges cells into rectangular [`Footprint`]s drawn from a
//! [`LegalSizeCatalog`] of real brick sizes. It then computes per-cell
//! top/bottom exposure and resolves one display material per
//! footprint. Mesh generation, UV sampling and host-application
//! integration are left to the caller.
//!
//! ## Quick Start
//!
//! ```ignore
//! use brick_packer::{BrickGrid, BuildConfig, LegalSizeCatalog, Packer};
//!
//! // Build a grid from externally voxelized cells
//! let mut grid = BrickGrid::from_cells(my_cells);
//!
//! // Create a packer with the standard brick assortment
//! let packer = Packer::with_config(LegalSizeCatalog::default(), BuildConfig::default());
//!
//! // Merge in place; the report summarizes the bricks used
//! let report = packer.pack(&mut grid)?;
//! for ((w, d, h), brick_type) in &report.bricks_used {
//!     println!("{}x{}x{} {}", w, d, h, brick_type);
//! }
//! ```
//!
//! ## Orientation metadata
//!
//! Mesh synthesis can snap source-surface normals to axis directions
//! with [`classify_direction`] / [`classify_slope_direction`] and
//! derive the flip/rotate flags of slope and logo meshes from the
//! resulting [`Direction`].

pub mod catalog;
pub mod config;
pub mod error;
pub mod exposure;
pub mod grid;
pub mod material;
pub mod merge;
pub mod scheduler;
pub mod types;

// Re-export main types for convenience
pub use catalog::{HeightClass, LegalSizeCatalog};
pub use config::{BuildConfig, HeightMode, MaterialMode, MergeOrder};
pub use error::{PackerError, Result};
pub use exposure::footprint_exposure;
pub use grid::{BrickGrid, CellRecord, Footprint, FootprintId};
pub use scheduler::{BuildReport, CancelToken, Packer};
pub use types::{
    classify_direction, classify_slope_direction, Axis, BrickType, Direction, Exposure,
    FootprintSize, GridPosition, SlopeDirection, DEFAULT_MAX_ANGLE_DEG,
};
