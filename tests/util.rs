#![allow(dead_code)]
use cosieve::topology::point::PointId;
use cosieve::topology::sieve::InMemorySieve;
use std::sync::Arc;

pub fn pid(u: u64) -> PointId {
    PointId::new(u).unwrap()
}

/// Build a sieve from arrows (u -> v) with unit color.
pub fn sieve_from(arrows: &[(u32, u32)]) -> InMemorySieve<u32> {
    InMemorySieve::from_arrows(arrows.iter().map(|&(u, v)| (u, v, ())))
}

/// Vertices 1..=3, edges 4 = (1,2), 5 = (2,3), 6 = (3,1), face 7.
pub fn triangle() -> Arc<InMemorySieve<u32>> {
    Arc::new(sieve_from(&[
        (1, 4),
        (2, 4),
        (2, 5),
        (3, 5),
        (3, 6),
        (1, 6),
        (4, 7),
        (5, 7),
        (6, 7),
    ]))
}

/// Vertices 1..=4; edges 5 = 12, 6 = 13, 7 = 14, 8 = 23, 9 = 24, 10 = 34;
/// faces 11 = 123, 12 = 124, 13 = 134, 14 = 234; cell 15.
pub fn tetrahedron() -> Arc<InMemorySieve<u32>> {
    let edges = [(5, 1, 2), (6, 1, 3), (7, 1, 4), (8, 2, 3), (9, 2, 4), (10, 3, 4)];
    let faces = [(11, [5, 8, 6]), (12, [5, 9, 7]), (13, [6, 10, 7]), (14, [8, 10, 9])];
    let mut arrows = Vec::new();
    for (e, a, b) in edges {
        arrows.push((a, e));
        arrows.push((b, e));
    }
    for (f, es) in faces {
        arrows.extend(es.iter().map(|&e| (e, f)));
    }
    arrows.extend([11, 12, 13, 14].map(|f| (f, 15)));
    Arc::new(sieve_from(&arrows))
}

/// Two triangles sharing edge 6 = (2,3): face 10 = (1,2,3), face 11 = (2,4,3).
/// Vertices 1..=4; edges 5 = (1,2), 6 = (2,3), 7 = (3,1), 8 = (2,4), 9 = (4,3).
pub fn two_triangles() -> Arc<InMemorySieve<u32>> {
    Arc::new(sieve_from(&[
        (1, 5),
        (2, 5),
        (2, 6),
        (3, 6),
        (3, 7),
        (1, 7),
        (2, 8),
        (4, 8),
        (4, 9),
        (3, 9),
        (5, 10),
        (6, 10),
        (7, 10),
        (8, 11),
        (9, 11),
        (6, 11),
    ]))
}
