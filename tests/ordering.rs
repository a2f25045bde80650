mod util;

use cosieve::prelude::*;
use proptest::prelude::*;
use std::collections::BTreeSet;
use std::sync::Arc;
use util::*;

fn offset_of<S: Sieve<Point = u32>>(cs: &CoSieve<S, u8>, patch: u8, p: u32) -> Option<usize> {
    cs.index(patch, p).and_then(|i| i.offset())
}

#[test]
fn triangle_vertices_get_one_slot_each() {
    let mut cs: CoSieve<_, u8> = CoSieve::new(triangle());
    cs.set_patch([7], 0);
    cs.set_index_dimension_by_depth(0, 1).unwrap();
    cs.set_index_dimension_by_depth(1, 0).unwrap();
    cs.set_index_dimension_by_depth(2, 0).unwrap();
    cs.order_patches().unwrap();

    assert_eq!(cs.patch_size(0).unwrap(), 3);
    let offsets: BTreeSet<_> = (1..=3).map(|v| offset_of(&cs, 0, v).unwrap()).collect();
    assert_eq!(offsets, BTreeSet::from([0, 1, 2]));
    // depth-first from the face: 4 = (1,2) first, then 5 reaches 3
    assert_eq!(offset_of(&cs, 0, 1), Some(0));
    assert_eq!(offset_of(&cs, 0, 2), Some(1));
    assert_eq!(offset_of(&cs, 0, 3), Some(2));
    // zero-dimensional points keep an unresolved index
    assert_eq!(cs.index(0, 7), Some(Interval::unresolved(0)));
    cs.validate_invariants().unwrap();
}

#[test]
fn reordering_is_idempotent_but_bumps_version() {
    let mut cs: CoSieve<_, u8> = CoSieve::new(triangle());
    cs.set_patch([7], 0);
    cs.set_index_dimension_by_depth(0, 2).unwrap();
    cs.set_index_dimension_by_depth(1, 1).unwrap();
    cs.order_patches().unwrap();
    let before: Vec<_> = (1..=7).map(|p| cs.index(0, p)).collect();
    let v1 = cs.layout_version(0).unwrap();

    cs.order_patches().unwrap();
    let after: Vec<_> = (1..=7).map(|p| cs.index(0, p)).collect();
    assert_eq!(before, after);
    assert_ne!(cs.layout_version(0).unwrap(), v1);
    assert_eq!(cs.patch_size(0).unwrap(), 3 * 2 + 3);
}

#[test]
fn shared_point_is_stored_once_per_patch() {
    let mut cs: CoSieve<_, u8> = CoSieve::new(two_triangles());
    cs.set_patch([10, 11], 0);
    cs.set_patch([11], 1);
    cs.set_index_dimension_by_depth(0, 1).unwrap();
    cs.set_index_dimension_by_depth(1, 2).unwrap();
    cs.order_patches().unwrap();

    // 4 vertices and 5 edges in patch 0; 3 vertices and 3 edges in patch 1
    assert_eq!(cs.patch_size(0).unwrap(), 4 + 5 * 2);
    assert_eq!(cs.patch_size(1).unwrap(), 3 + 3 * 2);
    // point 1 is outside the closure of patch 1, so its index there stays unresolved
    assert_eq!(cs.index(1, 1).and_then(|i| i.offset()), None);
    cs.validate_invariants().unwrap();
}

#[test]
fn colored_indices_concatenate() {
    let topo = Arc::new(InMemorySieve::<u32, u8>::from_arrows([(1, 3, 0), (2, 3, 0)]));
    let mut cs: CoSieve<_, char> = CoSieve::new(topo);
    cs.set_patch([3], 'a');
    cs.set_index_dimension_colored('a', 1, 1, 2);
    cs.set_index_dimension_colored('a', 1, 2, 3);
    assert_eq!(cs.index_dimension('a', 1), 5);
    assert_eq!(cs.index_dimension_colored('a', 1, 2), 3);
    cs.order_patches().unwrap();
    assert_eq!(cs.patch_size('a').unwrap(), 5);

    cs.update('a', 1, &[1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
    let got = cs.restrict('a', 1).unwrap();
    assert_eq!(got.len(), 5);
    assert_eq!(&*got, &[1.0, 2.0, 3.0, 4.0, 5.0]);
    // the color-1 index comes first in storage
    assert_eq!(cs.indices_colored('a', 1, 1), vec![Interval::new(0, 2)]);
    assert_eq!(cs.indices_colored('a', 1, 2), vec![Interval::new(2, 3)]);
}

#[test]
fn unknown_patch_and_empty_topology() {
    let mut cs: CoSieve<_, u8> = CoSieve::new(Arc::new(InMemorySieve::<u32>::new()));
    assert!(matches!(cs.order_patch(3), Err(MeshSieveError::UnknownPatch(_))));
    // a point without arrows is its own closure
    cs.set_patch([42], 0);
    cs.set_index_dimension(0, 42, 4);
    cs.order_patches().unwrap();
    assert_eq!(cs.patch_size(0).unwrap(), 4);
    assert_eq!(cs.index(0, 42), Some(Interval::new(0, 4)));
}

#[test]
fn set_topology_drops_storage() {
    let mut cs: CoSieve<_, u8> = CoSieve::new(triangle());
    cs.set_patch([7], 0);
    cs.set_index_dimension_by_depth(0, 1).unwrap();
    cs.order_patches().unwrap();
    assert!(cs.is_ordered(0));
    cs.set_topology(two_triangles());
    assert!(!cs.is_ordered(0));
    assert!(matches!(cs.patch_size(0), Err(MeshSieveError::PatchNotOrdered(_))));
}

/// A strip of `n` triangles glued along edges, numbered from 1.
fn strip(n: u32) -> InMemorySieve<u32> {
    // vertices 1..=n+2, then one edge per consecutive pair and per skip pair, then faces
    let nv = n + 2;
    let mut arrows = Vec::new();
    let mut next = nv + 1;
    let mut edge = std::collections::BTreeMap::new();
    let mut edge_of = |a: u32, b: u32, arrows: &mut Vec<(u32, u32, ())>| {
        let key = (a.min(b), a.max(b));
        *edge.entry(key).or_insert_with(|| {
            let e = next;
            next += 1;
            arrows.push((key.0, e, ()));
            arrows.push((key.1, e, ()));
            e
        })
    };
    let mut faces = Vec::new();
    for k in 1..=n {
        let es = [
            edge_of(k, k + 1, &mut arrows),
            edge_of(k + 1, k + 2, &mut arrows),
            edge_of(k, k + 2, &mut arrows),
        ];
        faces.push(es);
    }
    for es in faces {
        let f = next;
        next += 1;
        arrows.extend(es.iter().map(|&e| (e, f, ())));
    }
    InMemorySieve::from_arrows(arrows)
}

proptest! {
    #[test]
    fn ordered_patches_tile_storage(n in 1u32..8, vdim in 0usize..3, edim in 0usize..3, fdim in 0usize..3) {
        let topo = Arc::new(strip(n));
        let cells = topo.depth_stratum(2).unwrap();
        let mut cs: CoSieve<_, u8> = CoSieve::new(Arc::clone(&topo));
        cs.set_patch(cells.iter().copied(), 0);
        cs.set_patch(cells.iter().copied().take(1), 1);
        cs.set_index_dimension_by_depth(0, vdim).unwrap();
        cs.set_index_dimension_by_depth(1, edim).unwrap();
        cs.set_index_dimension_by_depth(2, fdim).unwrap();
        cs.order_patches().unwrap();

        let nv = topo.depth_stratum(0).unwrap().len();
        let ne = topo.depth_stratum(1).unwrap().len();
        prop_assert_eq!(cs.patch_size(0).unwrap(), nv * vdim + ne * edim + cells.len() * fdim);
        prop_assert_eq!(cs.patch_size(1).unwrap(), 3 * vdim + 3 * edim + fdim);
        prop_assert!(cs.validate_invariants().is_ok());
    }
}
