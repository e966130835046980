//! Watershed area growth.
//!
//! Walkable minitiles are processed in descending altitude, so areas grow
//! downhill from local summits. When a minitile touches two distinct grown
//! areas, a numeric predicate decides between merging them and recording a
//! frontier position; the frontier later becomes the chokepoints.

use crate::area::Area;
use crate::constants::*;
use crate::grid::{Altitude, AreaId, GridArray, MiniTile, Tile};
use crate::position::*;
use fnv::FnvHashMap;
use log::debug;

/// A frontier entry: the two temp area ids that met, and where.
pub(crate) type RawFrontier = Vec<((AreaId, AreaId), WalkPosition)>;

pub(crate) struct AreaComputation {
    pub areas: Vec<Area>,
    pub raw_frontier: RawFrontier,
}

struct TempArea {
    id: AreaId,
    valid: bool,
    top: WalkPosition,
    highest_altitude: Altitude,
    size: usize,
}

pub(crate) fn compute_areas(
    mini_tiles: &mut GridArray<MiniTile>,
    start_locations: &[TilePosition],
) -> AreaComputation {
    let mut sorted: Vec<(WalkPosition, Altitude)> = Vec::new();
    for y in 0..mini_tiles.height() {
        for x in 0..mini_tiles.width() {
            let mini_tile = mini_tiles.get(x, y);
            if mini_tile.walkable() && mini_tile.area_id_missing() {
                sorted.push((WalkPosition::new(x, y), mini_tile.altitude()));
            }
        }
    }
    // Stable: equal altitudes keep row-major order, which pins frontier
    // positions run to run.
    sorted.sort_by(|a, b| b.1.cmp(&a.1));

    // Index 0 is a placeholder so temp ids equal vector indices.
    let mut temp_areas: Vec<TempArea> = vec![TempArea {
        id: 0,
        valid: false,
        top: WalkPosition::new(0, 0),
        highest_altitude: 0,
        size: 0,
    }];
    let mut raw_frontier: RawFrontier = Vec::new();
    let mut pair_counter: FnvHashMap<(AreaId, AreaId), u32> = FnvHashMap::default();

    for &(p, altitude) in &sorted {
        let (first, second) = find_neighbouring_areas(p, mini_tiles);
        match (first, second) {
            (None, _) => {
                let id = temp_areas.len() as AreaId;
                temp_areas.push(TempArea {
                    id,
                    valid: true,
                    top: p,
                    highest_altitude: altitude,
                    size: 1,
                });
                mini_tiles.get_mut(p.x, p.y).set_area_id(id);
            }
            (Some(id), None) => {
                temp_areas[id as usize].size += 1;
                mini_tiles.get_mut(p.x, p.y).set_area_id(id);
            }
            (Some(first), Some(second)) => {
                let (mut smaller, mut bigger) = (first, second);
                if temp_areas[smaller as usize].size > temp_areas[bigger as usize].size {
                    std::mem::swap(&mut smaller, &mut bigger);
                }
                if should_merge(
                    &temp_areas[smaller as usize],
                    &temp_areas[bigger as usize],
                    altitude,
                    p,
                    start_locations,
                ) {
                    temp_areas[bigger as usize].size += 1;
                    mini_tiles.get_mut(p.x, p.y).set_area_id(bigger);
                    let absorbed_top = temp_areas[smaller as usize].top;
                    replace_area_ids(mini_tiles, &mut raw_frontier, absorbed_top, bigger);
                    let absorbed_size = temp_areas[smaller as usize].size;
                    temp_areas[smaller as usize].valid = false;
                    temp_areas[bigger as usize].size += absorbed_size;
                } else {
                    raw_frontier.push(((first, second), p));
                    let chosen = choose_neighbouring_area(smaller, bigger, &mut pair_counter);
                    temp_areas[chosen as usize].size += 1;
                    mini_tiles.get_mut(p.x, p.y).set_area_id(chosen);
                }
            }
        }
    }

    // Merges performed after a frontier entry was recorded may have
    // collapsed its two sides into one id.
    raw_frontier.retain(|((a, b), _)| a != b);

    // Renumber: big temp areas become real areas with contiguous ids from
    // 1, the rest become negative-id fragments.
    let mut areas: Vec<Area> = Vec::new();
    let mut next_id: AreaId = 1;
    let mut next_fragment_id: AreaId = -2;
    for i in 1..temp_areas.len() {
        if !temp_areas[i].valid {
            continue;
        }
        if temp_areas[i].size >= AREA_MIN_MINI_TILES {
            debug_assert!(next_id <= temp_areas[i].id);
            if next_id != temp_areas[i].id {
                replace_area_ids(mini_tiles, &mut raw_frontier, temp_areas[i].top, next_id);
            }
            areas.push(Area::new(
                next_id,
                temp_areas[i].top,
                temp_areas[i].highest_altitude,
                temp_areas[i].size,
            ));
            next_id += 1;
        } else {
            replace_area_ids(
                mini_tiles,
                &mut raw_frontier,
                temp_areas[i].top,
                next_fragment_id,
            );
            next_fragment_id -= 1;
        }
    }
    debug!(
        "area pass: {} areas, {} fragments, {} frontier positions",
        areas.len(),
        -(next_fragment_id + 2),
        raw_frontier.len()
    );

    AreaComputation {
        areas,
        raw_frontier,
    }
}

fn should_merge(
    smaller: &TempArea,
    bigger: &TempArea,
    altitude: Altitude,
    p: WalkPosition,
    start_locations: &[TilePosition],
) -> bool {
    smaller.size < AREA_MERGE_MAX_SIZE
        || smaller.highest_altitude < AREA_MERGE_MAX_ALTITUDE
        || altitude as i32 * 10 >= bigger.highest_altitude as i32 * 9
        || altitude as i32 * 10 >= smaller.highest_altitude as i32 * 9
        || start_locations.iter().any(|&start| {
            // Starting locations pull their surroundings into one area so a
            // main never gets split; the offset aims at the depot center.
            p.to_tile().dist(start + (2, 1)) <= 3.0
        })
}

/// Up to two distinct positive area ids among the 4-neighbours: the first
/// one found, then the smallest different one.
fn find_neighbouring_areas(
    p: WalkPosition,
    mini_tiles: &GridArray<MiniTile>,
) -> (Option<AreaId>, Option<AreaId>) {
    let mut first = None;
    let mut second = None;
    for &(dx, dy) in &NEIGHBORS_4 {
        let next = p + (dx, dy);
        if !mini_tiles.is_inside(next.x, next.y) {
            continue;
        }
        let id = mini_tiles.get(next.x, next.y).area_id();
        if id <= 0 {
            continue;
        }
        match first {
            None => first = Some(id),
            Some(f) if f != id => match second {
                None => second = Some(id),
                Some(s) if id < s => second = Some(id),
                _ => {}
            },
            _ => {}
        }
    }
    (first, second)
}

/// Alternates the attribution of contested frontier minitiles between the
/// two areas of each pair, so neither side swallows the whole frontier.
fn choose_neighbouring_area(
    a: AreaId,
    b: AreaId,
    counter: &mut FnvHashMap<(AreaId, AreaId), u32>,
) -> AreaId {
    let key = (a.min(b), a.max(b));
    let count = counter.entry(key).or_insert(0);
    let chosen = if *count % 2 == 0 { key.0 } else { key.1 };
    *count += 1;
    chosen
}

/// Flood-replaces the area id found at `start` with `new_id`, then rewrites
/// frontier references (only meaningful replacements with positive target
/// ids touch the frontier).
fn replace_area_ids(
    mini_tiles: &mut GridArray<MiniTile>,
    raw_frontier: &mut RawFrontier,
    start: WalkPosition,
    new_id: AreaId,
) {
    let old_id = mini_tiles.get(start.x, start.y).area_id();
    debug_assert!(old_id > 0 && old_id != new_id);
    mini_tiles.get_mut(start.x, start.y).replace_area_id(new_id);
    let mut to_search = vec![start];
    while let Some(current) = to_search.pop() {
        for &(dx, dy) in &NEIGHBORS_4 {
            let next = current + (dx, dy);
            if mini_tiles.is_inside(next.x, next.y)
                && mini_tiles.get(next.x, next.y).area_id() == old_id
            {
                mini_tiles.get_mut(next.x, next.y).replace_area_id(new_id);
                to_search.push(next);
            }
        }
    }
    if new_id > 0 {
        for ((a, b), _) in raw_frontier.iter_mut() {
            if *a == old_id {
                *a = new_id;
            }
            if *b == old_id {
                *b = new_id;
            }
        }
    }
}

/// Aggregates minitile area ids into each tile: 0 when no minitile belongs
/// anywhere, the unique id when all assigned minitiles agree, -1 otherwise.
pub(crate) fn set_tile_area_ids(mini_tiles: &GridArray<MiniTile>, tiles: &mut GridArray<Tile>) {
    for ty in 0..tiles.height() {
        for tx in 0..tiles.width() {
            tiles
                .get_mut(tx, ty)
                .set_area_id(aggregate_tile_area_id(mini_tiles, TilePosition::new(tx, ty)));
        }
    }
}

pub(crate) fn aggregate_tile_area_id(
    mini_tiles: &GridArray<MiniTile>,
    t: TilePosition,
) -> AreaId {
    let mut aggregate: AreaId = 0;
    for dy in 0..WALK_PER_TILE {
        for dx in 0..WALK_PER_TILE {
            let id = mini_tiles
                .get(t.x * WALK_PER_TILE + dx, t.y * WALK_PER_TILE + dy)
                .area_id();
            if id != 0 {
                if aggregate == 0 {
                    aggregate = id;
                } else if aggregate != id {
                    return -1;
                }
            }
        }
    }
    aggregate
}

/// First positive area id over the 16 minitiles of `t`, in scan order.
///
/// Deliberately not a majority vote; ownership queries follow the first
/// area encountered.
pub(crate) fn main_area_id(mini_tiles: &GridArray<MiniTile>, t: TilePosition) -> Option<AreaId> {
    for dy in 0..WALK_PER_TILE {
        for dx in 0..WALK_PER_TILE {
            let id = mini_tiles
                .get(t.x * WALK_PER_TILE + dx, t.y * WALK_PER_TILE + dy)
                .area_id();
            if id > 0 {
                return Some(id);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{load_grids, TerrainSource};
    use crate::neutral::NeutralUnit;
    use crate::pipeline::altitude::{compute_altitude, decide_seas_or_lakes};

    /// Two 8x8-tile rooms joined by a corridor through a sea band.
    struct TwoRooms {
        corridor: bool,
    }

    impl TerrainSource for TwoRooms {
        fn map_size(&self) -> TilePosition {
            TilePosition::new(20, 8)
        }
        fn is_walkable(&self, walk: WalkPosition) -> bool {
            let in_band = (32..48).contains(&walk.x);
            if !in_band {
                return true;
            }
            self.corridor && (13..19).contains(&walk.y)
        }
        fn is_buildable(&self, _tile: TilePosition) -> bool {
            false
        }
        fn ground_height(&self, _tile: TilePosition) -> u8 {
            0
        }
        fn start_locations(&self) -> &[TilePosition] {
            &[]
        }
        fn neutral_units(&self) -> &[NeutralUnit] {
            &[]
        }
    }

    fn analyzed(source: &dyn TerrainSource) -> (GridArray<MiniTile>, AreaComputation) {
        let (mut mini, _tiles) = load_grids(source);
        decide_seas_or_lakes(&mut mini);
        compute_altitude(&mut mini);
        let computation = compute_areas(&mut mini, source.start_locations());
        (mini, computation)
    }

    #[test]
    fn connected_rooms_become_two_areas_with_a_frontier() {
        let (mini, computation) = analyzed(&TwoRooms { corridor: true });
        assert_eq!(computation.areas.len(), 2);
        assert!(!computation.raw_frontier.is_empty());
        for &((a, b), w) in &computation.raw_frontier {
            assert_ne!(a, b);
            assert!(a > 0 && b > 0);
            // Frontier positions sit in or just beside the corridor band.
            assert!((30..56).contains(&w.x));
            assert!((13..19).contains(&w.y));
        }
        // Every walkable minitile got a non-zero id.
        for ((x, y), m) in mini.iter() {
            if m.walkable() {
                assert_ne!(m.area_id(), 0, "unassigned walkable minitile at {},{}", x, y);
            }
        }
        // The two room interiors carry the two distinct ids.
        let left = mini.get(16, 16).area_id();
        let right = mini.get(60, 16).area_id();
        assert!(left > 0 && right > 0);
        assert_ne!(left, right);
    }

    #[test]
    fn area_tops_are_consistent() {
        let (mini, computation) = analyzed(&TwoRooms { corridor: true });
        for area in &computation.areas {
            let top = area.top();
            assert_eq!(mini.get(top.x, top.y).area_id(), area.id());
            assert_eq!(mini.get(top.x, top.y).altitude(), area.max_altitude());
        }
    }

    #[test]
    fn separated_rooms_have_no_frontier() {
        let (_mini, computation) = analyzed(&TwoRooms { corridor: false });
        assert_eq!(computation.areas.len(), 2);
        assert!(computation.raw_frontier.is_empty());
    }

    #[test]
    fn tile_aggregation_marks_disagreement() {
        let (mut mini, _tiles_unused) = load_grids(&TwoRooms { corridor: true });
        decide_seas_or_lakes(&mut mini);
        compute_altitude(&mut mini);
        let _ = compute_areas(&mut mini, &[]);
        let mut tiles = GridArray::<Tile>::new(20, 8);
        set_tile_area_ids(&mini, &mut tiles);
        // A room-interior tile agrees with its minitiles.
        assert_eq!(tiles.get(4, 4).area_id(), mini.get(16, 16).area_id());
        // A sea tile has aggregate 0.
        assert_eq!(tiles.get(9, 0).area_id(), 0);
    }
}
