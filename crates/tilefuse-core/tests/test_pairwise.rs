mod common;

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use tilefuse_core::error::StitchError;
use tilefuse_core::graph::{DisplacementGraph, EdgeId};
use tilefuse_core::pairwise::{chunk_bounds, compute_displacements, pair_count};

use common::{config_2x2, grid_2x2};

#[test]
fn test_chunk_bounds_folds_trailing_runt() {
    assert_eq!(chunk_bounds(24, 12), vec![(0, 12), (12, 24)]);
    assert_eq!(chunk_bounds(32, 12), vec![(0, 12), (12, 32)]);
    assert_eq!(chunk_bounds(10, 12), vec![(0, 10)]);
    assert_eq!(chunk_bounds(12, 100), vec![(0, 12)]);
}

#[test]
fn test_candidates_land_on_their_edges() {
    let (grid, tiles) = grid_2x2();
    let mut graph = DisplacementGraph::new(2, 2);
    let config = config_2x2();
    let cancel = AtomicBool::new(false);

    let done = AtomicUsize::new(0);
    let failures = compute_displacements(&grid, &tiles, &mut graph, &config, &cancel, |_| {
        done.fetch_add(1, Ordering::Relaxed);
    })
    .unwrap();

    assert!(failures.is_empty());
    assert_eq!(done.load(Ordering::Relaxed), pair_count(&grid, &config));
    for id in graph.edge_ids() {
        let edge = graph.edge(id).unwrap();
        assert_eq!(edge.candidates.len(), 2, "{id}");
        assert_eq!(edge.candidates[0].chunk, 0);
        assert_eq!(edge.candidates[0].d0, 0);
        assert_eq!(edge.candidates[0].d1, 12);
        assert_eq!(edge.candidates[1].chunk, 1);
        assert!(edge.consensus.is_none(), "projection has not run yet");
    }
}

#[test]
fn test_processing_window_restricts_pairs() {
    let (grid, tiles) = grid_2x2();
    let mut graph = DisplacementGraph::new(2, 2);
    let mut config = config_2x2();
    config.start_row = Some(0);
    config.end_row = Some(0);
    let cancel = AtomicBool::new(false);

    assert_eq!(pair_count(&grid, &config), 1);
    compute_displacements(&grid, &tiles, &mut graph, &config, &cancel, |_| {}).unwrap();

    assert!(!graph.edge(EdgeId::west_east(0, 0)).unwrap().candidates.is_empty());
    assert!(graph.edge(EdgeId::north_south(0, 0)).unwrap().candidates.is_empty());
    assert!(graph.edge(EdgeId::north_south(0, 1)).unwrap().candidates.is_empty());
    assert!(graph.edge(EdgeId::west_east(1, 0)).unwrap().candidates.is_empty());
}

#[test]
fn test_failing_pairs_are_logged_not_fatal() {
    let (grid, tiles) = grid_2x2();
    let mut graph = DisplacementGraph::new(2, 2);
    let mut config = config_2x2();
    // A depth search radius no chunk can satisfy: every chunk fails its
    // precondition, every edge stays empty.
    config.search_radius_d = 10;
    let cancel = AtomicBool::new(false);

    let failures =
        compute_displacements(&grid, &tiles, &mut graph, &config, &cancel, |_| {}).unwrap();

    assert_eq!(failures.len(), 4 * 2, "one failure per pair chunk");
    for id in graph.edge_ids() {
        assert!(graph.edge(id).unwrap().candidates.is_empty());
    }
}

#[test]
fn test_cancellation_skips_remaining_pairs() {
    let (grid, tiles) = grid_2x2();
    let mut graph = DisplacementGraph::new(2, 2);
    let config = config_2x2();
    let cancel = AtomicBool::new(true);

    let failures =
        compute_displacements(&grid, &tiles, &mut graph, &config, &cancel, |_| {}).unwrap();
    assert!(failures.is_empty());
    for id in graph.edge_ids() {
        assert!(graph.edge(id).unwrap().candidates.is_empty());
    }
}

#[test]
fn test_tile_count_mismatch_is_inconsistent_topology() {
    let (grid, mut tiles) = grid_2x2();
    tiles.pop();
    let mut graph = DisplacementGraph::new(2, 2);
    let config = config_2x2();
    let cancel = AtomicBool::new(false);

    let err = compute_displacements(&grid, &tiles, &mut graph, &config, &cancel, |_| {})
        .unwrap_err();
    assert!(matches!(err, StitchError::InconsistentTopology(_)), "{err}");
}
