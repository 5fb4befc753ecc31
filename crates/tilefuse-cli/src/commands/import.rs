use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Args;
use tilefuse_core::io::{RawTileReader, SlabSource};
use tilefuse_core::pipeline::config::StitchConfig;
use tilefuse_core::project::{tile_file_name, Project, VolumeMeta};

#[derive(Args)]
pub struct ImportArgs {
    /// Directory containing r{row}_c{col}.raw tile files
    pub tiles_dir: PathBuf,

    /// Expected overlap between vertically adjacent tiles, in voxels
    #[arg(long)]
    pub overlap_v: usize,

    /// Expected overlap between horizontally adjacent tiles, in voxels
    #[arg(long)]
    pub overlap_h: usize,

    /// Voxel pitch in microns as "v,h,d"
    #[arg(long)]
    pub voxel_um: Option<String>,

    /// Output project file
    #[arg(short, long, default_value = "project.toml")]
    pub output: PathBuf,
}

pub fn run(args: &ImportArgs) -> Result<()> {
    let mut found: BTreeMap<(usize, usize), PathBuf> = BTreeMap::new();
    for entry in fs::read_dir(&args.tiles_dir)
        .with_context(|| format!("cannot read {}", args.tiles_dir.display()))?
    {
        let path = entry?.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if let Some(pos) = parse_tile_name(name) {
            found.insert(pos, path);
        }
    }
    if found.is_empty() {
        bail!(
            "no r*_c*.raw tile files found in {}",
            args.tiles_dir.display()
        );
    }

    let rows = found.keys().map(|&(r, _)| r).max().unwrap() + 1;
    let cols = found.keys().map(|&(_, c)| c).max().unwrap() + 1;
    for row in 0..rows {
        for col in 0..cols {
            if !found.contains_key(&(row, col)) {
                bail!(
                    "grid has a hole: {} is missing from {}",
                    tile_file_name(row, col),
                    args.tiles_dir.display()
                );
            }
        }
    }

    // Headers must agree with the first tile.
    let first = RawTileReader::open(&found[&(0, 0)])?;
    let shape = first.shape();
    for (pos, path) in &found {
        let reader = RawTileReader::open(path)?;
        if reader.shape() != shape || reader.header.bit_depth != first.header.bit_depth {
            bail!(
                "tile ({},{}) disagrees with tile (0,0): {:?}/{}-bit vs {:?}/{}-bit",
                pos.0,
                pos.1,
                reader.shape(),
                reader.header.bit_depth,
                shape,
                first.header.bit_depth
            );
        }
    }

    let voxel_um = match &args.voxel_um {
        Some(s) => Some(parse_voxel_um(s)?),
        None => None,
    };

    let volume = VolumeMeta {
        rows,
        cols,
        tile_height: shape.height,
        tile_width: shape.width,
        depth: shape.depth,
        bit_depth: first.header.bit_depth as u8,
        channels: first.header.channels as u8,
        overlap_v: args.overlap_v,
        overlap_h: args.overlap_h,
        voxel_um,
        tiles_dir: relative_tiles_dir(&args.tiles_dir, &args.output),
    };

    let project = Project::new(volume, StitchConfig::default());
    // Fails early if the metadata is inconsistent with a dense grid.
    project.build_grid()?;
    project.save(&args.output)?;

    println!(
        "Imported {rows}x{cols} grid of {}x{}x{} tiles into {}",
        shape.height,
        shape.width,
        shape.depth,
        args.output.display()
    );
    Ok(())
}

fn parse_tile_name(name: &str) -> Option<(usize, usize)> {
    let rest = name.strip_prefix('r')?.strip_suffix(".raw")?;
    let (row, col) = rest.split_once("_c")?;
    Some((row.parse().ok()?, col.parse().ok()?))
}

fn parse_voxel_um(text: &str) -> Result<[f32; 3]> {
    let parts: Vec<f32> = text
        .split(',')
        .map(|p| p.trim().parse::<f32>())
        .collect::<std::result::Result<_, _>>()
        .context("voxel pitch must be three comma-separated numbers")?;
    if parts.len() != 3 {
        bail!("voxel pitch must be three comma-separated numbers, got {text:?}");
    }
    Ok([parts[0], parts[1], parts[2]])
}

/// Store the tiles directory relative to the project file when possible.
fn relative_tiles_dir(tiles_dir: &Path, project: &Path) -> PathBuf {
    let project_dir = project.parent().unwrap_or_else(|| Path::new("."));
    tiles_dir
        .strip_prefix(project_dir)
        .map(Path::to_path_buf)
        .unwrap_or_else(|_| tiles_dir.to_path_buf())
}
