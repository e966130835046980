//! Chokepoint extraction from the raw frontier.
//!
//! Frontier positions are bucketed per unordered area pair and clustered by
//! proximity to the cluster endpoints; each cluster becomes one chokepoint.
//! Blocking neutrals additionally get pseudo chokepoints so the graph knows
//! about passages that open up when the neutral dies.

use crate::area::Area;
use crate::chokepoint::{ChokePoint, ChokePointIndex, NODE_COUNT};
use crate::constants::*;
use crate::grid::{AreaId, GridArray, MiniTile, Tile};
use crate::neutral::{NeutralIndex, Neutrals};
use crate::pipeline::areas::RawFrontier;
use crate::position::*;
use crate::search::bfs_walk;
use itertools::Itertools;
use log::debug;
use std::collections::VecDeque;

pub(crate) fn create_choke_points(
    mini_tiles: &GridArray<MiniTile>,
    tiles: &GridArray<Tile>,
    neutrals: &Neutrals,
    areas: &mut [Area],
    raw_frontier: &RawFrontier,
) -> Vec<ChokePoint> {
    // Bucket the frontier by unordered area pair; the pairs are walked in
    // sorted order so chokepoint indices do not depend on hashing.
    let frontier_by_pair = raw_frontier
        .iter()
        .map(|&((a, b), w)| ((a.min(b), a.max(b)), w))
        .into_group_map();

    let mut choke_points: Vec<ChokePoint> = Vec::new();
    for (a, b) in frontier_by_pair.keys().copied().sorted() {
        for cluster in cluster_frontier(&frontier_by_pair[&(a, b)]) {
            let index = choke_points.len();
            let cp = build_choke_point(mini_tiles, tiles, index, (a, b), cluster, None);
            register(areas, &cp);
            choke_points.push(cp);
        }
    }
    let frontier_count = choke_points.len();

    // One pseudo chokepoint per blocking neutral per pair of areas it
    // separates. Stacked neutrals act as one obstacle: only the stack top
    // is considered here, and destruction walks down the stack.
    let mut blocking: Vec<NeutralIndex> = Vec::new();
    for (index, neutral) in neutrals
        .static_buildings()
        .chain(neutrals.minerals())
    {
        if neutral.blocking() && neutral.next_stacked().is_none() {
            blocking.push(index);
        }
    }
    for neutral_index in blocking {
        let blocked = blocked_area_ids(mini_tiles, neutrals, neutral_index);
        for i in 0..blocked.len() {
            for j in 0..i {
                let key = (blocked[j].min(blocked[i]), blocked[j].max(blocked[i]));
                let center = neutrals.get(neutral_index).center().to_walk();
                let geometry_pos =
                    bfs_walk(mini_tiles, center, |m, _| m.walkable(), |_, _| true);
                let index = choke_points.len();
                let cp = build_choke_point(
                    mini_tiles,
                    tiles,
                    index,
                    key,
                    VecDeque::from(vec![geometry_pos]),
                    Some(neutral_index),
                );
                register(areas, &cp);
                choke_points.push(cp);
            }
        }
    }
    debug!(
        "chokepoint pass: {} frontier chokepoints, {} pseudo",
        frontier_count,
        choke_points.len() - frontier_count
    );
    choke_points
}

/// Groups a bucket's positions into clusters by queen-wise proximity to
/// either endpoint of an existing cluster. Positions arrive in descending
/// altitude, so clusters grow outward from their highest position.
fn cluster_frontier(positions: &[WalkPosition]) -> Vec<VecDeque<WalkPosition>> {
    let mut clusters: Vec<VecDeque<WalkPosition>> = Vec::new();
    for &w in positions {
        let mut added = false;
        for cluster in &mut clusters {
            let dist_front = cluster.front().unwrap().queen_wise_dist(w);
            let dist_back = cluster.back().unwrap().queen_wise_dist(w);
            if dist_front.min(dist_back) <= CHOKE_POINT_CLUSTER_DIST {
                if dist_front < dist_back {
                    cluster.push_front(w);
                } else {
                    cluster.push_back(w);
                }
                added = true;
                break;
            }
        }
        if !added {
            clusters.push(VecDeque::from(vec![w]));
        }
    }
    clusters
}

fn build_choke_point(
    mini_tiles: &GridArray<MiniTile>,
    tiles: &GridArray<Tile>,
    index: ChokePointIndex,
    areas: (AreaId, AreaId),
    geometry: VecDeque<WalkPosition>,
    blocking_neutral: Option<NeutralIndex>,
) -> ChokePoint {
    let end1 = *geometry.front().unwrap();
    let end2 = *geometry.back().unwrap();

    // Hill-climb from the cluster center while the altitude increases; the
    // construction order guarantees this settles on the cluster's maximum.
    let mut i = geometry.len() / 2;
    while i > 0 && altitude_at(mini_tiles, geometry[i - 1]) > altitude_at(mini_tiles, geometry[i]) {
        i -= 1;
    }
    while i < geometry.len() - 1
        && altitude_at(mini_tiles, geometry[i + 1]) > altitude_at(mini_tiles, geometry[i])
    {
        i += 1;
    }
    let nodes = [end1, geometry[i], end2];

    let pseudo = blocking_neutral.is_some();
    let mut nodes_in_area = [[WalkPosition::new(0, 0); 2]; NODE_COUNT];
    for (n, &node) in nodes.iter().enumerate() {
        for (side, &area_id) in [areas.0, areas.1].iter().enumerate() {
            nodes_in_area[n][side] = bfs_walk(
                mini_tiles,
                node,
                |m, w| {
                    m.area_id() == area_id
                        && tiles
                            .get(w.x / WALK_PER_TILE, w.y / WALK_PER_TILE)
                            .neutral()
                            .is_none()
                },
                |m, _| m.area_id() == area_id || (pseudo && m.blocked()),
            );
        }
    }

    ChokePoint::new(index, areas, geometry, nodes, nodes_in_area, blocking_neutral)
}

fn register(areas: &mut [Area], cp: &ChokePoint) {
    let (a, b) = cp.areas();
    areas[(a - 1) as usize].add_choke_point(b, cp.index());
    areas[(b - 1) as usize].add_choke_point(a, cp.index());
}

fn altitude_at(mini_tiles: &GridArray<MiniTile>, w: WalkPosition) -> i16 {
    mini_tiles.get(w.x, w.y).altitude()
}

/// The areas a blocking neutral separates: the nearest real area of each
/// recorded true door, deduplicated in door order.
pub(crate) fn blocked_area_ids(
    mini_tiles: &GridArray<MiniTile>,
    neutrals: &Neutrals,
    neutral_index: NeutralIndex,
) -> Vec<AreaId> {
    let mut ids: Vec<AreaId> = Vec::new();
    for &door in neutrals.get(neutral_index).blocked_doors() {
        let w = bfs_walk(mini_tiles, door, |m, _| m.area_id() > 0, |_, _| true);
        let id = mini_tiles.get(w.x, w.y).area_id();
        if id > 0 && !ids.contains(&id) {
            ids.push(id);
        }
    }
    ids
}

#[cfg(test)]
mod tests {
    use super::*;

    fn w(x: i32, y: i32) -> WalkPosition {
        WalkPosition::new(x, y)
    }

    #[test]
    fn nearby_positions_form_one_cluster() {
        let positions = vec![w(10, 10), w(10, 11), w(11, 12), w(10, 13)];
        let clusters = cluster_frontier(&positions);
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].len(), 4);
    }

    #[test]
    fn distant_positions_split_into_clusters() {
        let positions = vec![w(10, 10), w(10, 11), w(60, 10), w(60, 11)];
        let clusters = cluster_frontier(&positions);
        assert_eq!(clusters.len(), 2);
    }

    #[test]
    fn closer_endpoint_wins_attachment() {
        // Grow a chain: each new position is nearest the back.
        let positions: Vec<WalkPosition> = (0..30).map(|i| w(10 + i, 10)).collect();
        let clusters = cluster_frontier(&positions);
        assert_eq!(clusters.len(), 1);
        assert_eq!(*clusters[0].front().unwrap(), w(10, 10));
        assert_eq!(*clusters[0].back().unwrap(), w(39, 10));

        // Positions alternating around a center attach to both ends, so
        // the deque stays ordered along the frontier line.
        let positions = vec![w(20, 10), w(19, 10), w(21, 10), w(18, 10), w(22, 10)];
        let clusters = cluster_frontier(&positions);
        assert_eq!(clusters.len(), 1);
        assert_eq!(*clusters[0].front().unwrap(), w(22, 10));
        assert_eq!(*clusters[0].back().unwrap(), w(18, 10));
        let xs: Vec<i32> = clusters[0].iter().map(|p| p.x).collect();
        assert_eq!(xs, vec![22, 21, 20, 19, 18]);
    }
}
