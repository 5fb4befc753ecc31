use tilefuse_core::consensus::{mark_stitchable, project_displacements};
use tilefuse_core::graph::{CandidateDisplacement, DisplacementGraph, EdgeId};
use tilefuse_core::grid::{TileShape, VolumeGrid};
use tilefuse_core::mipncc::NccDescriptor;

const INF_W: i32 = 11;

fn cand(coord: [i32; 3], rel: f32, width: i32) -> CandidateDisplacement {
    CandidateDisplacement::new(
        NccDescriptor {
            coord,
            ncc_max: [rel; 3],
            ncc_width: [width; 3],
        },
        0,
        0,
        16,
    )
}

fn grid_1x2() -> VolumeGrid {
    let shape = TileShape {
        height: 60,
        width: 60,
        depth: 30,
    };
    VolumeGrid::new(1, 2, shape, 8, 1, 20, 20).unwrap()
}

#[test]
fn test_consensus_is_median_of_qualifying_candidates() {
    let mut graph = DisplacementGraph::new(1, 2);
    let id = EdgeId::west_east(0, 0);
    graph
        .append_candidates(
            id,
            vec![
                cand([5, 5, 5], 0.9, 2),
                cand([2, 2, 2], 0.8, 1),
                cand([3, 3, 3], 0.85, 3),
            ],
        )
        .unwrap();

    project_displacements(&mut graph, 0.7, INF_W);
    let consensus = graph.edge(id).unwrap().consensus.unwrap();
    assert_eq!(consensus.coord, [3, 3, 3]);
    // Reliability is the maximum, width the minimum, of the contributors.
    assert_eq!(consensus.ncc_max, [0.9, 0.9, 0.9]);
    assert_eq!(consensus.ncc_width, [1, 1, 1]);
}

#[test]
fn test_consensus_even_count_takes_lower_width_middle() {
    let mut graph = DisplacementGraph::new(1, 2);
    let id = EdgeId::west_east(0, 0);
    graph
        .append_candidates(
            id,
            vec![
                cand([1, 1, 1], 0.9, 3),
                cand([4, 4, 4], 0.9, 1),
                cand([2, 2, 2], 0.9, 5),
                cand([9, 9, 9], 0.9, 2),
            ],
        )
        .unwrap();

    project_displacements(&mut graph, 0.7, INF_W);
    // Middle values are 2 (width 5) and 4 (width 1); the tighter peak wins.
    let consensus = graph.edge(id).unwrap().consensus.unwrap();
    assert_eq!(consensus.coord, [4, 4, 4]);
}

#[test]
fn test_consensus_even_count_width_tie_takes_lower_value() {
    let mut graph = DisplacementGraph::new(1, 2);
    let id = EdgeId::west_east(0, 0);
    graph
        .append_candidates(id, vec![cand([4, 4, 4], 0.9, 2), cand([2, 2, 2], 0.9, 2)])
        .unwrap();

    project_displacements(&mut graph, 0.7, INF_W);
    let consensus = graph.edge(id).unwrap().consensus.unwrap();
    assert_eq!(consensus.coord, [2, 2, 2]);
}

#[test]
fn test_consensus_excludes_unreliable_and_wide_candidates() {
    let mut graph = DisplacementGraph::new(1, 2);
    let id = EdgeId::west_east(0, 0);
    graph
        .append_candidates(
            id,
            vec![
                cand([7, 7, 7], 0.95, INF_W), // flat peak: excluded by width
                cand([1, 1, 1], 0.5, 1),      // below threshold
                cand([3, 3, 3], 0.8, 2),
            ],
        )
        .unwrap();

    project_displacements(&mut graph, 0.7, INF_W);
    let consensus = graph.edge(id).unwrap().consensus.unwrap();
    assert_eq!(consensus.coord, [3, 3, 3]);
    assert_eq!(consensus.ncc_max, [0.8, 0.8, 0.8]);
}

#[test]
fn test_consensus_axes_are_independent() {
    let mut graph = DisplacementGraph::new(1, 2);
    let id = EdgeId::west_east(0, 0);
    // Reliable on V and H, hopeless on D.
    let mut c = cand([3, -2, 9], 0.9, 2);
    c.ncc_max[2] = 0.1;
    graph.append_candidates(id, vec![c]).unwrap();

    project_displacements(&mut graph, 0.7, INF_W);
    let consensus = graph.edge(id).unwrap().consensus.unwrap();
    assert_eq!(consensus.coord[0], 3);
    assert_eq!(consensus.coord[1], -2);
    assert_eq!(consensus.coord[2], NccDescriptor::INV_COORD);
    assert_eq!(consensus.ncc_max[2], NccDescriptor::UNR_NCC);
    assert_eq!(consensus.ncc_width[2], INF_W);
}

#[test]
fn test_empty_edge_gets_unreliable_consensus() {
    let mut graph = DisplacementGraph::new(1, 2);
    project_displacements(&mut graph, 0.7, INF_W);
    let consensus = graph.edge(EdgeId::west_east(0, 0)).unwrap().consensus.unwrap();
    assert_eq!(consensus, NccDescriptor::unreliable(INF_W));
}

#[test]
fn test_stitchable_requires_all_axes_reliable() {
    let mut grid = grid_1x2();
    let mut graph = DisplacementGraph::new(1, 2);
    let id = EdgeId::west_east(0, 0);

    let mut c = cand([1, 1, 1], 0.9, 2);
    c.ncc_max[2] = 0.2;
    graph.append_candidates(id, vec![c]).unwrap();
    project_displacements(&mut graph, 0.7, INF_W);

    let count = mark_stitchable(&mut grid, &graph, 0.7);
    assert_eq!(count, 0);
    assert!(!grid.tile(0, 0).is_stitchable());

    // With the D axis reliable too, both endpoints become stitchable.
    graph
        .append_candidates(id, vec![cand([1, 1, 1], 0.9, 2)])
        .unwrap();
    project_displacements(&mut graph, 0.7, INF_W);
    let count = mark_stitchable(&mut grid, &graph, 0.7);
    assert_eq!(count, 2);
    assert!(grid.tile(0, 0).is_stitchable());
    assert!(grid.tile(0, 1).is_stitchable());
}

#[test]
fn test_stitchable_set_shrinks_with_threshold() {
    let shape = TileShape {
        height: 60,
        width: 60,
        depth: 30,
    };
    let mut grid = VolumeGrid::new(1, 3, shape, 8, 1, 20, 20).unwrap();
    let mut graph = DisplacementGraph::new(1, 3);
    graph
        .append_candidates(EdgeId::west_east(0, 0), vec![cand([1, 1, 1], 0.95, 2)])
        .unwrap();
    graph
        .append_candidates(EdgeId::west_east(0, 1), vec![cand([1, 1, 1], 0.75, 2)])
        .unwrap();

    let stitchable_at = |grid: &mut VolumeGrid, graph: &mut DisplacementGraph, thr: f32| {
        project_displacements(graph, thr, INF_W);
        mark_stitchable(grid, graph, thr);
        (0..3)
            .filter(|&c| grid.tile(0, c).is_stitchable())
            .collect::<Vec<_>>()
    };

    let low = stitchable_at(&mut grid, &mut graph, 0.7);
    let high = stitchable_at(&mut grid, &mut graph, 0.9);
    assert_eq!(low, vec![0, 1, 2]);
    assert_eq!(high, vec![0, 1]);
    // Raising the threshold can only shrink the stitchable set.
    assert!(high.iter().all(|c| low.contains(c)));
}
