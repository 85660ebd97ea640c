//! Adjacency graph integration tests.
//!
//! Random zone maps, declared one edge at a time in arbitrary directions,
//! must normalize to a symmetric graph with sorted neighbor lists.

use game_kernel::core::{SpatialError, ZoneId};
use game_kernel::def::ZoneDef;
use game_kernel::spatial::AdjacencyGraph;
use proptest::prelude::*;

fn zone_name(i: usize) -> String {
    format!("z{i:02}")
}

/// Zone count and a list of directed edge declarations between distinct zones.
fn zone_map() -> impl Strategy<Value = (usize, Vec<(usize, usize)>)> {
    (2..12usize).prop_flat_map(|n| {
        let edge = (0..n, 0..n).prop_filter("no self loops", |(a, b)| a != b);
        (Just(n), prop::collection::vec(edge, 0..30))
    })
}

fn build(n: usize, edges: &[(usize, usize)]) -> AdjacencyGraph {
    let zones: Vec<ZoneDef> = (0..n)
        .map(|i| {
            edges
                .iter()
                .filter(|(from, _)| *from == i)
                .fold(ZoneDef::new(zone_name(i)), |z, (_, to)| z.adjacent_to(zone_name(*to)))
        })
        .collect();
    AdjacencyGraph::build(&zones).unwrap().0
}

/// A line of five zones: reachability respects the depth bound.
#[test]
fn test_line_depths() {
    let graph = build(5, &[(0, 1), (1, 2), (2, 3), (3, 4)]);
    let start = ZoneId::new(zone_name(0));
    let within_two = graph
        .reachable::<SpatialError, _>(&start, Some(2), false, |_| Ok(true))
        .unwrap();
    assert_eq!(within_two, vec![ZoneId::new("z01"), ZoneId::new("z02")]);

    let far = ZoneId::new(zone_name(4));
    assert!(!graph.connected::<SpatialError, _>(&start, &far, Some(3), |_| Ok(true)).unwrap());
    assert!(graph.connected::<SpatialError, _>(&start, &far, None, |_| Ok(true)).unwrap());
}

/// Declaring an edge only on one side is reported but still usable both ways.
#[test]
fn test_one_sided_declaration_warns() {
    let zones = vec![ZoneDef::new("hue").adjacent_to("da_nang"), ZoneDef::new("da_nang")];
    let (graph, warnings) = AdjacencyGraph::build(&zones).unwrap();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].code(), "ADJACENCY_SYMMETRIZED");
    assert!(graph.is_adjacent(&ZoneId::new("da_nang"), &ZoneId::new("hue")).unwrap());
}

proptest! {
    /// Adjacency is symmetric whatever side declared the edge.
    #[test]
    fn prop_adjacency_is_symmetric((n, edges) in zone_map()) {
        let graph = build(n, &edges);
        for a in 0..n {
            for b in 0..n {
                let za = ZoneId::new(zone_name(a));
                let zb = ZoneId::new(zone_name(b));
                prop_assert_eq!(graph.is_adjacent(&za, &zb).unwrap(), graph.is_adjacent(&zb, &za).unwrap());
            }
        }
        for (a, b) in &edges {
            let za = ZoneId::new(zone_name(*a));
            let zb = ZoneId::new(zone_name(*b));
            prop_assert!(graph.is_adjacent(&za, &zb).unwrap());
        }
    }

    /// Neighbor lists are sorted and free of duplicates.
    #[test]
    fn prop_neighbors_sorted_and_unique((n, edges) in zone_map()) {
        let graph = build(n, &edges);
        for zone in graph.zones() {
            let neighbors = graph.neighbors(zone).unwrap();
            prop_assert!(neighbors.windows(2).all(|w| w[0] < w[1]));
            prop_assert!(!neighbors.contains(zone));
        }
    }

    /// Connectivity is symmetric too, since every hop can be walked back.
    #[test]
    fn prop_connectivity_is_symmetric((n, edges) in zone_map(), a in 0..12usize, b in 0..12usize) {
        let graph = build(n, &edges);
        let za = ZoneId::new(zone_name(a % n));
        let zb = ZoneId::new(zone_name(b % n));
        let forward = graph.connected::<SpatialError, _>(&za, &zb, None, |_| Ok(true)).unwrap();
        let backward = graph.connected::<SpatialError, _>(&zb, &za, None, |_| Ok(true)).unwrap();
        prop_assert_eq!(forward, backward);
    }
}
