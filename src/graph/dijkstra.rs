//! A small Dijkstra implementation bundled as a convenience default.
//!
//! [`crate::GraphAdapter::shortest_path`] does not mandate any particular
//! algorithm (any admissible, oneway-respecting weighted shortest path is
//! acceptable), but an encoder crate that ships nothing an adapter can reach
//! for is not much of a crate. `shortest_path` here is generic over how
//! neighbors and edge weights are produced, so an adapter backed by any
//! storage can wire it up with a closure over `outgoing_edges` and
//! [`crate::VehicleProfile::weight`].

use std::collections::{HashMap, HashSet};
use std::hash::Hash;
use std::rc::Rc;

use radix_heap::RadixHeapMap;

use crate::graph::PathSegment;
use crate::model::{Edge, Length};

/// Millimeter-resolution encoding of a cost so it can be pushed onto a
/// [`RadixHeapMap`], which requires an unsigned, monotonically
/// non-increasing key sequence. Flipping to `u64::MAX - millimeters` turns
/// "pop largest key" into "pop smallest cost", and costs only grow as the
/// search frontier advances, so the monotonicity requirement holds.
fn encode_cost(cost: Length) -> u64 {
    let millimeters = (cost.meters().max(0.0) * 1_000.0).round();
    u64::MAX - (millimeters as u64).min(u64::MAX)
}

/// Finds the cheapest path from any of `roots` to any vertex in `targets`.
///
/// `neighbors(v)` must return every edge leaving `v` as `(to, edge, weight)`;
/// `weight` is whatever cost unit the caller's [`crate::VehicleProfile`]
/// produces (typically the traversal weight of the whole edge).
pub fn shortest_path<V, T, F>(
    roots: &[PathSegment<V, T>],
    targets: &HashSet<V>,
    mut neighbors: F,
) -> Option<PathSegment<V, T>>
where
    V: Copy + Eq + Hash,
    T: Copy,
    F: FnMut(V) -> Vec<(V, Edge<T>, Length)>,
{
    let mut best: HashMap<V, Length> = HashMap::new();
    let mut heap: RadixHeapMap<u64, Rc<PathSegment<V, T>>> = RadixHeapMap::new();

    for root in roots {
        let segment = Rc::new(root.clone());
        let entry = best.entry(segment.vertex).or_insert(Length::MAX);
        if segment.cost < *entry {
            *entry = segment.cost;
            heap.push(encode_cost(segment.cost), segment);
        }
    }

    while let Some((_, segment)) = heap.pop() {
        if let Some(&recorded) = best.get(&segment.vertex) {
            if segment.cost > recorded {
                continue; // a cheaper path to this vertex was already settled
            }
        }

        if targets.contains(&segment.vertex) {
            return Some((*segment).clone());
        }

        for (to, edge, weight) in neighbors(segment.vertex) {
            let cost = segment.cost + weight;
            let entry = best.entry(to).or_insert(Length::MAX);
            if cost < *entry {
                *entry = cost;
                let next = Rc::new(PathSegment {
                    vertex: to,
                    consumed: Length::ZERO,
                    cost,
                    edge: Some(edge),
                    predecessor: Some(segment.clone()),
                });
                heap.push(encode_cost(cost), next);
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Length;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    struct TagsId(u32);

    fn edge(distance_m: f64) -> Edge<TagsId> {
        Edge::new(TagsId(0), true, Length::from_meters(distance_m))
    }

    #[test]
    fn finds_the_cheapest_of_two_paths() {
        // 0 --10m--> 1 --10m--> 3
        // 0 --50m--> 3
        let graph: HashMap<u32, Vec<(u32, Edge<TagsId>, Length)>> = HashMap::from([
            (
                0,
                vec![
                    (1, edge(10.0), Length::from_meters(10.0)),
                    (3, edge(50.0), Length::from_meters(50.0)),
                ],
            ),
            (1, vec![(3, edge(10.0), Length::from_meters(10.0))]),
            (3, vec![]),
        ]);

        let roots = [PathSegment::root(0u32, Length::ZERO)];
        let targets = HashSet::from([3u32]);

        let found = shortest_path(&roots, &targets, |v| {
            graph.get(&v).cloned().unwrap_or_default()
        })
        .expect("a path exists");

        assert_eq!(found.cost, Length::from_meters(20.0));
        let (vertices, edges) = found.flatten();
        assert_eq!(vertices, vec![0, 1, 3]);
        assert_eq!(edges.len(), 2);
    }

    #[test]
    fn returns_none_when_unreachable() {
        let graph: HashMap<u32, Vec<(u32, Edge<TagsId>, Length)>> = HashMap::from([(0, vec![])]);
        let roots = [PathSegment::root(0u32, Length::ZERO)];
        let targets = HashSet::from([9u32]);

        let found = shortest_path(&roots, &targets, |v| {
            graph.get(&v).cloned().unwrap_or_default()
        });

        assert!(found.is_none());
    }
}
