mod common;

use std::path::PathBuf;
use std::sync::atomic::AtomicBool;

use tilefuse_core::error::StitchError;
use tilefuse_core::io::write_raw_tile;
use tilefuse_core::pipeline::config::StitchConfig;
use tilefuse_core::pipeline::run_stitch;
use tilefuse_core::project::{tile_file_name, Project, VolumeMeta};

use common::{config_2x2, grid_2x2, truth_2x2, BlobScene};

fn meta_2x2(tiles_dir: PathBuf) -> VolumeMeta {
    VolumeMeta {
        rows: 2,
        cols: 2,
        tile_height: 48,
        tile_width: 48,
        depth: 24,
        bit_depth: 16,
        channels: 1,
        overlap_v: 24,
        overlap_h: 24,
        voxel_um: Some([0.8, 0.8, 2.0]),
        tiles_dir,
    }
}

#[test]
fn test_project_roundtrip_preserves_phase_outputs() {
    let (mut grid, tiles) = grid_2x2();
    let cancel = AtomicBool::new(false);
    let (graph, _) = run_stitch(&mut grid, &tiles, &config_2x2(), &cancel).unwrap();

    let mut project = Project::new(meta_2x2(PathBuf::from("tiles")), config_2x2());
    project.sync(&grid, &graph);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("project.toml");
    project.save(&path).unwrap();
    let loaded = Project::load(&path).unwrap();

    assert_eq!(loaded.tiles.len(), 4);
    assert_eq!(loaded.edges.len(), 4);
    for rec in &loaded.tiles {
        assert!(rec.stitchable);
        assert_eq!(rec.abs.unwrap(), truth_2x2(rec.row, rec.col));
    }
    for (orig, back) in project.edges.iter().zip(&loaded.edges) {
        assert_eq!(orig.candidates.len(), back.candidates.len());
        assert_eq!(
            orig.consensus.unwrap().coord,
            back.consensus.unwrap().coord
        );
    }

    // The reloaded records rebuild the same in-memory state.
    let grid2 = loaded.build_grid().unwrap();
    for r in 0..2 {
        for c in 0..2 {
            assert_eq!(grid2.tile(r, c).abs(), grid.tile(r, c).abs());
            assert_eq!(
                grid2.tile(r, c).is_stitchable(),
                grid.tile(r, c).is_stitchable()
            );
        }
    }
    let graph2 = loaded.build_graph().unwrap();
    for id in graph.edge_ids() {
        assert_eq!(
            graph.edge(id).unwrap().consensus,
            graph2.edge(id).unwrap().consensus
        );
    }
}

#[test]
fn test_project_survives_json_too() {
    let project = Project::new(meta_2x2(PathBuf::from("tiles")), config_2x2());
    let text = serde_json::to_string(&project).unwrap();
    let back: Project = serde_json::from_str(&text).unwrap();
    assert_eq!(back.volume.rows, 2);
    assert_eq!(back.params.search_radius_d, 3);
}

#[test]
fn test_empty_config_parses_to_defaults() {
    let config: StitchConfig = toml::from_str("").unwrap();
    let defaults = StitchConfig::default();
    assert_eq!(config.search_radius_v, defaults.search_radius_v);
    assert_eq!(config.subvol_dim_d, defaults.subvol_dim_d);
    assert_eq!(config.reliability_threshold, defaults.reliability_threshold);
    assert_eq!(config.ncc.max_iter, defaults.ncc.max_iter);
    assert_eq!(config.ncc.min_dim_ncc_src, defaults.ncc.min_dim_ncc_src);
}

#[test]
fn test_tile_records_with_holes_are_rejected() {
    let (grid, _tiles) = grid_2x2();
    let graph = tilefuse_core::graph::DisplacementGraph::new(2, 2);
    let mut project = Project::new(meta_2x2(PathBuf::from("tiles")), config_2x2());
    project.sync(&grid, &graph);

    project.tiles.pop();
    let err = project.build_grid().unwrap_err();
    assert!(matches!(err, StitchError::InconsistentTopology(_)), "{err}");
}

#[test]
fn test_duplicate_tile_records_are_rejected() {
    let (grid, _tiles) = grid_2x2();
    let graph = tilefuse_core::graph::DisplacementGraph::new(2, 2);
    let mut project = Project::new(meta_2x2(PathBuf::from("tiles")), config_2x2());
    project.sync(&grid, &graph);

    let dup = project.tiles[0].clone();
    project.tiles[3] = dup;
    let err = project.build_grid().unwrap_err();
    assert!(matches!(err, StitchError::InconsistentTopology(_)), "{err}");
}

#[test]
fn test_edge_record_outside_grid_is_rejected() {
    let mut project = Project::new(meta_2x2(PathBuf::from("tiles")), config_2x2());
    project.edges.push(tilefuse_core::project::EdgeRecord {
        kind: tilefuse_core::grid::EdgeKind::NorthSouth,
        row: 1,
        col: 1,
        candidates: vec![],
        consensus: None,
    });
    let err = project.build_graph().unwrap_err();
    assert!(matches!(err, StitchError::Project(_)), "{err}");
}

#[test]
fn test_open_tiles_from_raw_store() {
    let dir = tempfile::tempdir().unwrap();
    let tiles_dir = dir.path().join("tiles");
    std::fs::create_dir_all(&tiles_dir).unwrap();

    let scene = BlobScene::new(9, 10, [76.0, 76.0, 28.0], 1.6);
    for r in 0..2 {
        for c in 0..2 {
            let stack = scene.render(truth_2x2(r, c), 24, 48, 48);
            write_raw_tile(&tiles_dir.join(tile_file_name(r, c)), &stack, 16).unwrap();
        }
    }

    let project = Project::new(meta_2x2(PathBuf::from("tiles")), config_2x2());
    let readers = project.open_tiles(dir.path()).unwrap();
    assert_eq!(readers.len(), 4);

    // A missing tile file is an I/O error.
    std::fs::remove_file(tiles_dir.join(tile_file_name(1, 1))).unwrap();
    let err = project.open_tiles(dir.path()).unwrap_err();
    assert!(matches!(err, StitchError::Io(_)), "{err}");
}
