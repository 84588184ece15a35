//! Brick Packer CLI
//!
//! Pack a voxelized grid into catalog-legal bricks from the command
//! line. The JSON file layout here belongs to the CLI, not the core.

use brick_packer::{
    BrickGrid, BuildConfig, CellRecord, Footprint, HeightClass, LegalSizeCatalog, Packer,
};
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "brick-packer")]
#[command(author, version, about = "Pack voxelized models into catalog-legal bricks", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Pack a grid JSON file and report the bricks used
    Pack {
        /// Input JSON file containing the voxelized cells
        #[arg(short, long)]
        input: PathBuf,

        /// Optional JSON build configuration
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Write the packed grid (cells + footprints) to this path
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Override the configured maximum footprint width
        #[arg(long)]
        max_width: Option<i32>,

        /// Override the configured maximum footprint depth
        #[arg(long)]
        max_depth: Option<i32>,

        /// Override the configured merge seed
        #[arg(long)]
        seed: Option<u64>,
    },

    /// List the legal footprints of the default catalog
    Catalog,
}

/// On-disk grid layout: a flat list of cells, plus the footprints once
/// packed.
#[derive(Serialize, Deserialize)]
struct GridFile {
    cells: Vec<CellRecord>,
    #[serde(default)]
    footprints: Vec<Footprint>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Pack {
            input,
            config,
            output,
            max_width,
            max_depth,
            seed,
        } => pack(input, config, output, max_width, max_depth, seed),
        Commands::Catalog => {
            print_catalog();
            Ok(())
        }
    }
}

fn pack(
    input: PathBuf,
    config: Option<PathBuf>,
    output: Option<PathBuf>,
    max_width: Option<i32>,
    max_depth: Option<i32>,
    seed: Option<u64>,
) -> Result<(), Box<dyn std::error::Error>> {
    let grid_file: GridFile = serde_json::from_str(&fs::read_to_string(&input)?)?;
    let mut build_config = match config {
        Some(path) => serde_json::from_str(&fs::read_to_string(&path)?)?,
        None => BuildConfig::default(),
    };
    if let Some(w) = max_width {
        build_config.max_width = w;
    }
    if let Some(d) = max_depth {
        build_config.max_depth = d;
    }
    if let Some(s) = seed {
        build_config.merge_seed = s;
    }

    let mut grid = BrickGrid::from_cells(grid_file.cells);
    let packer = Packer::with_config(LegalSizeCatalog::default(), build_config);
    let report = packer.pack(&mut grid)?;

    println!(
        "packed {} cells into {} bricks",
        grid.len(),
        report.footprint_count
    );
    for ((w, d, h), brick_type) in &report.bricks_used {
        println!("  {}x{}x{} {}", w, d, h, brick_type);
    }
    for warning in &report.warnings {
        eprintln!("warning: {warning}");
    }

    if let Some(path) = output {
        let out = GridFile {
            cells: {
                let mut cells: Vec<CellRecord> = grid.cells().cloned().collect();
                cells.sort_by_key(|c| c.loc);
                cells
            },
            footprints: grid.footprints().to_vec(),
        };
        fs::write(&path, serde_json::to_string_pretty(&out)?)?;
        println!("wrote {}", path.display());
    }
    Ok(())
}

fn print_catalog() {
    let catalog = LegalSizeCatalog::default();
    for class in [HeightClass::Flat, HeightClass::Tall] {
        println!("{class}:");
        for brick_type in brick_packer::BrickType::ALL {
            let mut sizes = Vec::new();
            for w in 1..=16 {
                for d in w..=16 {
                    if catalog.legal(w, d, brick_type, class)
                        && catalog.resolve_type(brick_type, class) == brick_type
                    {
                        sizes.push(format!("{w}x{d}"));
                    }
                }
            }
            if !sizes.is_empty() {
                println!("  {brick_type}: {}", sizes.join(" "));
            }
        }
    }
}
