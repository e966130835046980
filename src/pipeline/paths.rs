//! Chokepoint distances, paths, accessibility and groups.
//!
//! Two layers of search: a weighted grid Dijkstra inside each area links the
//! area's chokepoints, then a graph Dijkstra over those links produces the
//! full distance and path matrices. Group ids fall out of the accessibility
//! relation at the end.

use crate::area::Area;
use crate::chokepoint::{ChokePoint, ChokePointIndex, Node};
use crate::constants::*;
use crate::grid::{AreaId, GridArray, GroupId, MiniTile};
use crate::position::*;
use log::debug;
use pathfinding::directed::dijkstra::dijkstra_all;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// Symmetric chokepoint-to-chokepoint distances (pixels, -1 when
/// unreachable) and the chokepoint sequences realizing them.
#[derive(Clone, Serialize, Deserialize)]
pub(crate) struct ChokePointMatrices {
    count: usize,
    distances: Vec<i32>,
    paths: Vec<Vec<ChokePointIndex>>,
}

impl ChokePointMatrices {
    /// Matrices of an uninitialized map.
    pub(crate) fn empty() -> ChokePointMatrices {
        ChokePointMatrices::new(0)
    }

    fn new(count: usize) -> ChokePointMatrices {
        let mut matrices = ChokePointMatrices {
            count,
            distances: vec![-1; count * count],
            paths: vec![Vec::new(); count * count],
        };
        for cp in 0..count {
            matrices.distances[cp * count + cp] = 0;
            matrices.paths[cp * count + cp] = vec![cp];
        }
        matrices
    }

    pub(crate) fn distance(&self, a: ChokePointIndex, b: ChokePointIndex) -> i32 {
        self.distances[a * self.count + b]
    }

    pub(crate) fn path(&self, a: ChokePointIndex, b: ChokePointIndex) -> &[ChokePointIndex] {
        &self.paths[a * self.count + b]
    }

    fn set_distance(&mut self, a: ChokePointIndex, b: ChokePointIndex, distance: i32) {
        self.distances[a * self.count + b] = distance;
        self.distances[b * self.count + a] = distance;
    }

    fn set_path(&mut self, a: ChokePointIndex, b: ChokePointIndex, path: Vec<ChokePointIndex>) {
        let mut reversed = path.clone();
        reversed.reverse();
        self.paths[a * self.count + b] = path;
        self.paths[b * self.count + a] = reversed;
    }
}

pub(crate) fn compute_choke_point_distance_matrix(
    mini_tiles: &GridArray<MiniTile>,
    areas: &mut [Area],
    choke_points: &[ChokePoint],
) -> ChokePointMatrices {
    let count = choke_points.len();
    let mut matrices = ChokePointMatrices::new(count);

    // Per-area chokepoint lists in global index order, so every run walks
    // the pairs in the same sequence.
    let mut cps_by_area: Vec<Vec<ChokePointIndex>> = vec![Vec::new(); areas.len()];
    for cp in choke_points {
        let (a, b) = cp.areas();
        cps_by_area[(a - 1) as usize].push(cp.index());
        cps_by_area[(b - 1) as usize].push(cp.index());
    }

    // Intra-area pass: ground distances between chokepoints sharing an
    // area. Two chokepoints can share both areas; the smaller distance
    // wins.
    for (area_index, cps) in cps_by_area.iter().enumerate() {
        let area_id = (area_index + 1) as AreaId;
        for (i, &start_cp) in cps.iter().enumerate() {
            let targets: Vec<ChokePointIndex> = cps[i + 1..].to_vec();
            if targets.is_empty() {
                continue;
            }
            let start = choke_points[start_cp].pos_in_area(Node::Middle, area_id);
            let target_positions: Vec<WalkPosition> = targets
                .iter()
                .map(|&t| choke_points[t].pos_in_area(Node::Middle, area_id))
                .collect();
            let distances = area_grid_distances(mini_tiles, area_id, start, &target_positions);
            for (&target_cp, &distance) in targets.iter().zip(&distances) {
                debug_assert!(distance >= 0, "chokepoints of one area must be connected");
                if distance < 0 {
                    continue;
                }
                let existing = matrices.distance(start_cp, target_cp);
                if existing < 0 || distance < existing {
                    matrices.set_distance(start_cp, target_cp, distance);
                    matrices.set_path(start_cp, target_cp, vec![start_cp, target_cp]);
                }
            }
        }
    }

    // Inter-area pass: Dijkstra over the chokepoint graph. A blocked
    // chokepoint only ever appears as the start of a search, never as a
    // transit hub.
    let intra = matrices.clone();
    for start in 0..count {
        let successors = |&n: &ChokePointIndex| -> Vec<(ChokePointIndex, i32)> {
            if n != start && choke_points[n].blocked() {
                return Vec::new();
            }
            let (a, b) = choke_points[n].areas();
            let mut edges = Vec::new();
            for area_id in [a, b] {
                for &m in &cps_by_area[(area_id - 1) as usize] {
                    if m != n {
                        let d = intra.distance(n, m);
                        if d >= 0 {
                            edges.push((m, d));
                        }
                    }
                }
            }
            edges
        };
        let reachable = dijkstra_all(&start, successors);
        for target in start + 1..count {
            let Some(&(_, cost)) = reachable.get(&target) else {
                continue;
            };
            let existing = matrices.distance(start, target);
            if existing < 0 || cost < existing {
                // Rebuild the chokepoint sequence through the parents.
                let mut path = vec![target];
                let mut current = target;
                while current != start {
                    current = reachable[&current].0;
                    path.push(current);
                }
                path.reverse();
                matrices.set_distance(start, target, cost);
                matrices.set_path(start, target, path);
            }
        }
    }

    collect_accessibility(areas, choke_points);
    debug!(
        "path pass: {} chokepoints, {} groups",
        count,
        areas.iter().map(|a| a.group_id()).max().unwrap_or(0)
    );
    matrices
}

/// Weighted 8-neighbour Dijkstra constrained to one area's minitiles,
/// returning the pixel distance from `start` to each target (-1 when
/// unreached). Uses a dense distance array and stale-pop deduplication.
fn area_grid_distances(
    mini_tiles: &GridArray<MiniTile>,
    area_id: AreaId,
    start: WalkPosition,
    targets: &[WalkPosition],
) -> Vec<i32> {
    let mut result = vec![-1i32; targets.len()];
    let mut remaining = targets.len();
    let width = mini_tiles.width();
    let mut dist: Vec<i32> = vec![i32::MAX; (width * mini_tiles.height()) as usize];
    let mut heap: BinaryHeap<Reverse<(i32, i32, i32)>> = BinaryHeap::new();

    dist[(start.y * width + start.x) as usize] = 0;
    heap.push(Reverse((0, start.x, start.y)));

    while let Some(Reverse((d, x, y))) = heap.pop() {
        if d > dist[(y * width + x) as usize] {
            continue;
        }
        for (i, target) in targets.iter().enumerate() {
            if result[i] < 0 && target.x == x && target.y == y {
                result[i] = ((d as i64 * TILE_PIXELS as i64 + 5000) / 10000) as i32;
                remaining -= 1;
            }
        }
        if remaining == 0 {
            break;
        }
        for &(dx, dy) in &NEIGHBORS_8 {
            let (nx, ny) = (x + dx, y + dy);
            if !mini_tiles.is_inside(nx, ny) {
                continue;
            }
            let id = mini_tiles.get(nx, ny).area_id();
            if id != area_id && id != -1 {
                continue;
            }
            let weight = if dx == 0 || dy == 0 {
                DIJKSTRA_STRAIGHT_WEIGHT
            } else {
                DIJKSTRA_DIAGONAL_WEIGHT
            };
            let next_dist = d + weight;
            let index = (ny * width + nx) as usize;
            if next_dist < dist[index] {
                dist[index] = next_dist;
                heap.push(Reverse((next_dist, nx, ny)));
            }
        }
    }
    result
}

/// Fills each area's accessible neighbours and propagates group ids over
/// the resulting adjacency.
fn collect_accessibility(areas: &mut [Area], choke_points: &[ChokePoint]) {
    for area in areas.iter_mut() {
        let mut accessible: Vec<AreaId> = area
            .choke_points_by_area()
            .iter()
            .filter(|(_, cps)| cps.iter().any(|&cp| !choke_points[cp].blocked()))
            .map(|(&neighbour, _)| neighbour)
            .collect();
        accessible.sort_unstable();
        area.set_accessible_neighbours(accessible);
    }

    let mut group_ids: Vec<GroupId> = vec![0; areas.len()];
    let mut next_group: GroupId = 1;
    for i in 0..areas.len() {
        if group_ids[i] != 0 {
            continue;
        }
        let mut stack = vec![i];
        group_ids[i] = next_group;
        while let Some(current) = stack.pop() {
            for &neighbour in areas[current].accessible_neighbours() {
                let ni = (neighbour - 1) as usize;
                if group_ids[ni] == 0 {
                    group_ids[ni] = next_group;
                    stack.push(ni);
                }
            }
        }
        next_group += 1;
    }
    for (area, &group_id) in areas.iter_mut().zip(&group_ids) {
        area.set_group_id(group_id);
    }
}
