//! Sea/lake segregation and the altitude field.

use crate::constants::*;
use crate::grid::{Altitude, GridArray, MiniTile, Tile};
use crate::position::*;
use log::debug;

/// Flood-fills every undecided unwalkable component and classifies it as
/// sea or lake.
///
/// A component becomes a lake when it is small in area and extent and does
/// not hug a map edge; everything else stays sea. Lakes receive altitudes
/// from the subsequent pass, seas keep altitude 0, which is what separates
/// the two downstream.
pub(crate) fn decide_seas_or_lakes(mini_tiles: &mut GridArray<MiniTile>) {
    let walk_w = mini_tiles.width();
    let walk_h = mini_tiles.height();
    let mut lakes = 0usize;

    for y in 0..walk_h {
        for x in 0..walk_w {
            if !mini_tiles.get(x, y).sea_or_lake() {
                continue;
            }
            let origin = WalkPosition::new(x, y);
            let mut to_search = vec![origin];
            let mut extent = vec![origin];
            mini_tiles.get_mut(x, y).set_sea();
            let mut top_left = origin;
            let mut bottom_right = origin;

            while let Some(current) = to_search.pop() {
                top_left.x = top_left.x.min(current.x);
                top_left.y = top_left.y.min(current.y);
                bottom_right.x = bottom_right.x.max(current.x);
                bottom_right.y = bottom_right.y.max(current.y);
                for &(dx, dy) in &NEIGHBORS_4 {
                    let next = current + (dx, dy);
                    if mini_tiles.is_inside(next.x, next.y)
                        && mini_tiles.get(next.x, next.y).sea_or_lake()
                    {
                        mini_tiles.get_mut(next.x, next.y).set_sea();
                        to_search.push(next);
                        extent.push(next);
                    }
                }
            }

            let is_lake = extent.len() <= LAKE_MAX_MINI_TILES
                && bottom_right.x - top_left.x <= LAKE_MAX_WIDTH_IN_MINI_TILES
                && bottom_right.y - top_left.y <= LAKE_MAX_WIDTH_IN_MINI_TILES
                && top_left.x >= LAKE_MIN_DIST_FROM_EDGE
                && top_left.y >= LAKE_MIN_DIST_FROM_EDGE
                && bottom_right.x < walk_w - LAKE_MIN_DIST_FROM_EDGE
                && bottom_right.y < walk_h - LAKE_MIN_DIST_FROM_EDGE;
            if is_lake {
                lakes += 1;
                for w in extent {
                    mini_tiles.get_mut(w.x, w.y).set_lake();
                }
            }
        }
    }
    debug!("sea/lake pass: {} lakes", lakes);
}

struct ActiveSeed {
    origin: WalkPosition,
    last_assigned: Altitude,
}

/// Assigns every non-sea minitile its pixel distance to the nearest sea
/// minitile (or map border), returning the maximum altitude.
///
/// This is a multi-source sweep over a precomputed table of (delta, weight)
/// pairs sorted by weight. The stable sort and the asymmetric rounding of
/// the weights are both load-bearing: they fix the order in which
/// equal-distance minitiles are claimed, which in turn fixes area frontiers.
pub(crate) fn compute_altitude(mini_tiles: &mut GridArray<MiniTile>) -> Altitude {
    let walk_w = mini_tiles.width();
    let walk_h = mini_tiles.height();
    let range = walk_w.max(walk_h) / 2 + 3;

    let mut deltas: Vec<(i32, i32, Altitude)> = Vec::new();
    for dy in 0..=range {
        for dx in dy..=range {
            if dx != 0 || dy != 0 {
                let weight =
                    (0.5 + ((dx * dx + dy * dy) as f64).sqrt() * ALTITUDE_SCALE as f64) as i32;
                deltas.push((dx, dy, weight as Altitude));
            }
        }
    }
    deltas.sort_by_key(|&(_, _, weight)| weight);

    // Seeds: the sea side of every coast, plus a virtual ring one minitile
    // outside the map so the border acts like sea.
    let mut seeds: Vec<ActiveSeed> = Vec::new();
    for y in -1..=walk_h {
        for x in -1..=walk_w {
            let w = WalkPosition::new(x, y);
            if !mini_tiles.is_inside(x, y) || sea_side(mini_tiles, w) {
                seeds.push(ActiveSeed {
                    origin: w,
                    last_assigned: 0,
                });
            }
        }
    }

    let mut max_altitude: Altitude = 0;
    for &(dx, dy, altitude) in &deltas {
        if seeds.is_empty() {
            break;
        }
        let mut i = 0;
        while i < seeds.len() {
            // A seed that has not claimed anything for two minitiles worth
            // of distance never will again.
            if (altitude - seeds[i].last_assigned) as i32 >= 2 * ALTITUDE_SCALE {
                seeds.swap_remove(i);
                continue;
            }
            let origin = seeds[i].origin;
            for &(rx, ry) in &[
                (dx, dy),
                (-dx, dy),
                (dx, -dy),
                (-dx, -dy),
                (dy, dx),
                (-dy, dx),
                (dy, -dx),
                (-dy, -dx),
            ] {
                let w = origin + (rx, ry);
                if mini_tiles.is_inside(w.x, w.y) {
                    let mini_tile = mini_tiles.get_mut(w.x, w.y);
                    if mini_tile.altitude_missing() {
                        mini_tile.set_altitude(altitude);
                        seeds[i].last_assigned = altitude;
                        max_altitude = altitude;
                    }
                }
            }
            i += 1;
        }
    }
    debug!("altitude pass: max altitude {}", max_altitude);
    max_altitude
}

fn sea_side(mini_tiles: &GridArray<MiniTile>, w: WalkPosition) -> bool {
    if !mini_tiles.get(w.x, w.y).sea() {
        return false;
    }
    NEIGHBORS_4.iter().any(|&(dx, dy)| {
        mini_tiles.is_inside(w.x + dx, w.y + dy) && !mini_tiles.get(w.x + dx, w.y + dy).sea()
    })
}

/// Stamps each tile with the minimum altitude of its 16 minitiles.
pub(crate) fn set_tile_min_altitudes(
    mini_tiles: &GridArray<MiniTile>,
    tiles: &mut GridArray<Tile>,
) {
    for ty in 0..tiles.height() {
        for tx in 0..tiles.width() {
            let mut min_altitude = Altitude::MAX;
            for dy in 0..WALK_PER_TILE {
                for dx in 0..WALK_PER_TILE {
                    let altitude = mini_tiles
                        .get(tx * WALK_PER_TILE + dx, ty * WALK_PER_TILE + dy)
                        .altitude();
                    min_altitude = min_altitude.min(altitude);
                }
            }
            tiles.get_mut(tx, ty).set_min_altitude(min_altitude);
        }
    }
}
