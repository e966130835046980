//! Base placement.
//!
//! Each area repeatedly picks the best command center location for its
//! still-unassigned resources by accumulating a potential field over the
//! tiles, scoring every candidate footprint inside a bounding box around
//! the resources, validating the winner, and assigning nearby resources to
//! the new base exclusively.

use crate::area::Area;
use crate::base::Base;
use crate::constants::*;
use crate::grid::{GridArray, Tile};
use crate::neutral::{NeutralIndex, Neutrals};
use crate::position::*;
use log::debug;

pub(crate) fn create_bases(
    tiles: &mut GridArray<Tile>,
    areas: &mut [Area],
    neutrals: &Neutrals,
) {
    for area in areas.iter_mut() {
        if area.tiles() > 0 {
            create_bases_in_area(tiles, area, neutrals);
        }
    }
    let total: usize = areas.iter().map(|a| a.bases().len()).sum();
    debug!("base pass: {} bases", total);
}

fn create_bases_in_area(tiles: &mut GridArray<Tile>, area: &mut Area, neutrals: &Neutrals) {
    let cc = COMMAND_CENTER_SIZE;
    let reach = MAX_TILES_BETWEEN_CC_AND_RESOURCES;

    let (area_tl, area_br) = area.bounding_box();
    let clip_br = area_br - cc + (1, 1);
    if clip_br.x < area_tl.x || clip_br.y < area_tl.y {
        // The area cannot even hold the command center footprint.
        return;
    }

    let mut remaining: Vec<NeutralIndex> = Vec::new();
    for &m in area.minerals() {
        let n = neutrals.get(m);
        if n.initial_amount() >= BASE_MIN_MINERAL_AMOUNT && !n.blocking() {
            remaining.push(m);
        }
    }
    for &g in area.geysers() {
        let n = neutrals.get(g);
        if n.initial_amount() >= BASE_MIN_GEYSER_AMOUNT && !n.blocking() {
            remaining.push(g);
        }
    }

    while !remaining.is_empty() {
        // Bound the candidate search to the resources' surroundings.
        let mut resources_tl = TilePosition::new(i32::MAX, i32::MAX);
        let mut resources_br = TilePosition::new(i32::MIN, i32::MIN);
        for &r in &remaining {
            let n = neutrals.get(r);
            resources_tl.x = resources_tl.x.min(n.top_left().x);
            resources_tl.y = resources_tl.y.min(n.top_left().y);
            resources_br.x = resources_br.x.max(n.bottom_right().x);
            resources_br.y = resources_br.y.max(n.bottom_right().y);
        }
        let search_tl = TilePosition::new(
            (resources_tl.x - cc.x - reach).clamp(area_tl.x, clip_br.x),
            (resources_tl.y - cc.y - reach).clamp(area_tl.y, clip_br.y),
        );
        let search_br = TilePosition::new(
            (resources_br.x + 1 + reach).clamp(area_tl.x, clip_br.x),
            (resources_br.y + 1 + reach).clamp(area_tl.y, clip_br.y),
        );

        // Potential field: each resource contributes a plateau that decays
        // with the tile's distance to its footprint; geysers weigh triple.
        for &r in &remaining {
            let n = neutrals.get(r);
            let geyser = n.is_geyser();
            for dy in -cc.y - reach..n.size().y + cc.y + reach {
                for dx in -cc.x - reach..n.size().x + cc.x + reach {
                    let t = n.top_left() + (dx, dy);
                    if !tiles.is_inside(t.x, t.y) {
                        continue;
                    }
                    let dist =
                        (dist_to_rectangle(t.center(), n.top_left(), n.size()) + 16) / 32;
                    let mut score = (reach + 3 - dist).max(0);
                    if geyser {
                        score *= 3;
                    }
                    let tile = tiles.get_mut(t.x, t.y);
                    if tile.internal >= 0 {
                        tile.internal += score;
                    }
                }
            }
        }
        // Tiles hugging a resource are forbidden outright.
        for &r in &remaining {
            let n = neutrals.get(r);
            for dy in -3..n.size().y + 3 {
                for dx in -3..n.size().x + 3 {
                    let t = n.top_left() + (dx, dy);
                    if tiles.is_inside(t.x, t.y) {
                        tiles.get_mut(t.x, t.y).internal = -1;
                    }
                }
            }
        }

        let mut best_score = 0;
        let mut best_location = None;
        let mut best_blocking: Vec<NeutralIndex> = Vec::new();
        for y in search_tl.y..=search_br.y {
            for x in search_tl.x..=search_br.x {
                let location = TilePosition::new(x, y);
                let score = location_score(tiles, neutrals, area, location);
                if score > best_score {
                    if let Some(blocking) = validate_location(tiles, neutrals, area, location) {
                        best_score = score;
                        best_location = Some(location);
                        best_blocking = blocking;
                    }
                }
            }
        }

        // The scratch field must not leak into the next iteration.
        for &r in &remaining {
            let n = neutrals.get(r);
            for dy in -cc.y - reach..n.size().y + cc.y + reach {
                for dx in -cc.x - reach..n.size().x + cc.x + reach {
                    let t = n.top_left() + (dx, dy);
                    if tiles.is_inside(t.x, t.y) {
                        tiles.get_mut(t.x, t.y).internal = 0;
                    }
                }
            }
        }

        let Some(location) = best_location else {
            break;
        };
        let mut base = Base::new(area.id(), location, best_blocking);
        remaining.retain(|&r| {
            let n = neutrals.get(r);
            if dist_to_rectangle(n.center(), location, cc) + 2 <= reach * TILE_PIXELS {
                if n.is_mineral() {
                    base.add_mineral(r);
                } else {
                    base.add_geyser(r);
                }
                false
            } else {
                true
            }
        });
        area.bases_mut().push(base);
    }
}

/// Sum of the potential field under the command center footprint, or -1
/// when the footprint is unusable.
fn location_score(
    tiles: &GridArray<Tile>,
    neutrals: &Neutrals,
    area: &Area,
    location: TilePosition,
) -> i32 {
    let mut sum = 0;
    for dy in 0..COMMAND_CENTER_SIZE.y {
        for dx in 0..COMMAND_CENTER_SIZE.x {
            let t = location + (dx, dy);
            let tile = tiles.get(t.x, t.y);
            if !tile.buildable() || tile.internal == -1 || tile.area_id() != area.id() {
                return -1;
            }
            if let Some(n) = tile.neutral() {
                if neutrals.get(n).is_static_building() {
                    return -1;
                }
            }
            sum += tile.internal;
        }
    }
    sum
}

/// Checks the resource halo and base spacing rules. Returns the low-amount
/// minerals overlapping the halo when the location is acceptable.
fn validate_location(
    tiles: &GridArray<Tile>,
    neutrals: &Neutrals,
    area: &Area,
    location: TilePosition,
) -> Option<Vec<NeutralIndex>> {
    let mut blocking_minerals = Vec::new();
    for dy in -3..COMMAND_CENTER_SIZE.y + 3 {
        for dx in -3..COMMAND_CENTER_SIZE.x + 3 {
            let t = location + (dx, dy);
            if !tiles.is_inside(t.x, t.y) {
                continue;
            }
            if let Some(n) = tiles.get(t.x, t.y).neutral() {
                let neutral = neutrals.get(n);
                if neutral.is_geyser() {
                    return None;
                }
                if neutral.is_mineral() {
                    if neutral.initial_amount() <= BLOCKING_MINERAL_MAX_AMOUNT {
                        blocking_minerals.push(n);
                    } else {
                        return None;
                    }
                }
            }
        }
    }
    for base in area.bases() {
        if base.location().rounded_dist(location) < MIN_TILES_BETWEEN_BASES {
            return None;
        }
    }
    Some(blocking_minerals)
}
