mod util;

use cosieve::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;
use util::*;

/// Order a patch holding one value per point of `topo`, then translate the
/// indices returned for `chain` back into points.
fn numbering<S: Sieve<Point = u32>>(topo: Arc<S>, cell: u32, chain: &[u32]) -> Vec<u32> {
    let mut cs: CoSieve<_, u8> = CoSieve::new(topo);
    cs.set_patch([cell], 0);
    for d in 0..=chain.len() as u32 {
        cs.set_index_dimension_by_depth(d, 1).unwrap();
    }
    cs.order_patches().unwrap();
    let by_offset: HashMap<usize, u32> = cs
        .topology()
        .closure([cell])
        .filter_map(|p| cs.index(0, p).and_then(|i| i.offset()).map(|o| (o, p)))
        .collect();
    cs.ordered_indices(0, chain.iter().copied())
        .unwrap()
        .into_iter()
        .map(|i| by_offset[&i.offset().unwrap()])
        .collect()
}

#[test]
fn triangle_numbering_follows_the_chain() {
    assert_eq!(numbering(triangle(), 7, &[1, 4, 7]), vec![1, 2, 3, 4, 5, 6, 7]);
    assert_eq!(numbering(triangle(), 7, &[2, 5, 7]), vec![2, 3, 1, 5, 6, 4, 7]);
    // the chain may be given in any order
    assert_eq!(numbering(triangle(), 7, &[7, 4, 1]), vec![1, 2, 3, 4, 5, 6, 7]);
}

#[test]
fn tetrahedron_numbering() {
    assert_eq!(
        numbering(tetrahedron(), 15, &[1, 5, 11, 15]),
        vec![1, 2, 3, 4, 5, 8, 6, 10, 7, 9, 11, 13, 12, 14, 15]
    );
    assert_eq!(
        numbering(tetrahedron(), 15, &[2, 8, 14, 15]),
        vec![2, 3, 4, 1, 8, 10, 9, 7, 5, 6, 14, 12, 11, 13, 15]
    );
}

#[test]
fn lower_dimensional_chain_numbers_a_face() {
    // a face of the tetrahedron, ordered on its own
    assert_eq!(
        numbering(tetrahedron(), 11, &[1, 5, 11]),
        vec![1, 2, 3, 5, 8, 6, 11]
    );
}

#[test]
fn zero_length_indices_are_skipped() {
    let mut cs: CoSieve<_, u8> = CoSieve::new(triangle());
    cs.set_patch([7], 0);
    cs.set_index_dimension_by_depth(0, 2).unwrap();
    cs.set_index_dimension_by_depth(1, 0).unwrap();
    cs.order_patches().unwrap();
    let idx = cs.ordered_indices(0, [1, 4, 7]).unwrap();
    assert_eq!(idx.len(), 3);
    assert!(idx.iter().all(|i| i.len() == 2));
}

#[test]
fn invalid_chains_are_rejected() {
    let mut cs: CoSieve<_, u8> = CoSieve::new(triangle());
    cs.set_patch([7], 0);
    cs.set_index_dimension_by_depth(0, 1).unwrap();
    cs.order_patches().unwrap();

    let cases: [&[u32]; 5] = [
        &[],        // empty
        &[4, 7],    // no vertex
        &[1, 7],    // depth 1 missing
        &[1, 2, 4], // two vertices
        &[3, 4, 7], // 3 is not on edge 4
    ];
    for chain in cases {
        assert!(
            matches!(
                cs.ordered_indices(0, chain.iter().copied()),
                Err(MeshSieveError::InvalidOrderChain(_))
            ),
            "{chain:?}"
        );
    }
    assert!(matches!(
        cs.ordered_indices(9, [1, 4, 7]),
        Err(MeshSieveError::UnknownPatch(_))
    ));
}

#[test]
fn unordered_patch_reports_unresolved_index() {
    let mut cs: CoSieve<_, u8> = CoSieve::new(triangle());
    cs.set_patch([7], 0);
    cs.set_index_dimension_by_depth(0, 1).unwrap();
    assert!(matches!(
        cs.ordered_indices(0, [1, 4, 7]),
        Err(MeshSieveError::UnresolvedIndex { .. })
    ));
}

#[test]
fn edge_with_three_ends_is_not_manifold() {
    // edge 4 is bounded by three vertices
    let topo = Arc::new(sieve_from(&[(1, 4), (2, 4), (3, 4)]));
    let mut cs: CoSieve<_, u8> = CoSieve::new(topo);
    cs.set_patch([4], 0);
    cs.set_index_dimension_by_depth(0, 1).unwrap();
    cs.order_patches().unwrap();
    assert_eq!(
        cs.ordered_indices(0, [1, 4]).unwrap_err(),
        MeshSieveError::NonManifold {
            element: "4".into(),
            found: 3
        }
    );
}

#[test]
fn open_fan_is_not_manifold() {
    // face 6 has edges 4 = (1,2) and 5 = (2,3) only: vertex 1 bounds one edge
    let topo = Arc::new(sieve_from(&[(1, 4), (2, 4), (2, 5), (3, 5), (4, 6), (5, 6)]));
    let mut cs: CoSieve<_, u8> = CoSieve::new(topo);
    cs.set_patch([6], 0);
    cs.set_index_dimension_by_depth(0, 1).unwrap();
    cs.order_patches().unwrap();
    assert!(matches!(
        cs.ordered_indices(0, [1, 4, 6]),
        Err(MeshSieveError::NonManifold { found: 1, .. })
    ));
}
