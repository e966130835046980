//! Blocking-neutral detection.
//!
//! A neutral blocks when the walkable ring around its footprint splits into
//! at least two "true doors": pockets that each open into a reasonably large
//! region. Blocking neutrals get their walkable minitiles stamped with the
//! blocked sentinel so the area builder cannot merge across them, and the
//! chokepoint pass later synthesizes pseudo chokepoints on top of them.

use crate::constants::*;
use crate::grid::{GridArray, MiniTile, Tile, VisitedMask};
use crate::neutral::{NeutralIndex, Neutrals};
use crate::position::*;
use log::debug;

pub(crate) fn process_blocking_neutrals(
    mini_tiles: &mut GridArray<MiniTile>,
    tiles: &GridArray<Tile>,
    neutrals: &mut Neutrals,
) {
    let mut candidates: Vec<NeutralIndex> = Vec::new();
    for (index, neutral) in neutrals.static_buildings().chain(neutrals.minerals()) {
        // Only the bottom of each stack is examined; blocking propagates to
        // the whole stack.
        let bottom = tiles
            .get(neutral.top_left().x, neutral.top_left().y)
            .neutral();
        if bottom == Some(index) {
            candidates.push(index);
        }
    }

    let mut blocking_count = 0usize;
    for index in candidates {
        let true_doors = find_true_doors(mini_tiles, tiles, neutrals, index);
        if true_doors.len() < 2 {
            continue;
        }
        blocking_count += 1;

        // The whole stack becomes blocking.
        let mut current = Some(index);
        while let Some(i) = current {
            neutrals.get_mut(i).set_blocking(&true_doors);
            current = neutrals.get(i).next_stacked();
        }

        // Stamp the footprint so the area builder will not grow through it.
        let neutral = neutrals.get(index);
        let walk_tl = neutral.top_left().to_walk();
        let walk_size = neutral.size().to_walk();
        for dy in 0..walk_size.y {
            for dx in 0..walk_size.x {
                let w = walk_tl + (dx, dy);
                let mini_tile = mini_tiles.get_mut(w.x, w.y);
                if mini_tile.walkable() {
                    mini_tile.set_blocked();
                }
            }
        }
    }
    debug!("blocking pass: {} blocking neutrals", blocking_count);
}

/// Door analysis for one stack-bottom candidate.
fn find_true_doors(
    mini_tiles: &GridArray<MiniTile>,
    tiles: &GridArray<Tile>,
    neutrals: &Neutrals,
    index: NeutralIndex,
) -> Vec<WalkPosition> {
    let neutral = neutrals.get(index);
    let walk_tl = neutral.top_left().to_walk();
    let walk_br = walk_tl + neutral.size().to_walk() + (-1, -1);

    // The ring of minitiles around the footprint, minus positions that are
    // off-map, unwalkable, or under some other neutral.
    let mut border: Vec<WalkPosition> = outer_border(walk_tl, walk_br)
        .into_iter()
        .filter(|w| {
            mini_tiles.is_inside(w.x, w.y)
                && mini_tiles.get(w.x, w.y).walkable()
                && tiles.get(w.x / WALK_PER_TILE, w.y / WALK_PER_TILE).neutral().is_none()
        })
        .collect();

    // Each flood along the neutral's surroundings claims one door.
    let mut doors: Vec<WalkPosition> = Vec::new();
    while let Some(door) = border.pop() {
        doors.push(door);
        let mut visited = VisitedMask::new(mini_tiles.width(), mini_tiles.height());
        let mut to_visit = vec![door];
        visited.insert(door.x, door.y);
        while let Some(current) = to_visit.pop() {
            for &(dx, dy) in &NEIGHBORS_4 {
                let next = current + (dx, dy);
                if mini_tiles.is_inside(next.x, next.y)
                    && !visited.contains(next.x, next.y)
                    && mini_tiles.get(next.x, next.y).walkable()
                    && tiles
                        .get(next.x / WALK_PER_TILE, next.y / WALK_PER_TILE)
                        .neutral()
                        .is_none()
                    && adjoins_8_some_lake_or_neutral(mini_tiles, tiles, next)
                {
                    visited.insert(next.x, next.y);
                    to_visit.push(next);
                }
            }
        }
        border.retain(|w| !visited.contains(w.x, w.y));
    }

    if doors.len() < 2 {
        return Vec::new();
    }

    // A door is true when its free neighbourhood is big enough to matter.
    let limit = if neutral.is_static_building() {
        DOOR_FLOOD_LIMIT_STATIC_BUILDING
    } else {
        DOOR_FLOOD_LIMIT_MINERAL
    };
    doors
        .into_iter()
        .filter(|&door| {
            let mut visited = VisitedMask::new(mini_tiles.width(), mini_tiles.height());
            let mut visited_count = 1usize;
            let mut to_visit = vec![door];
            visited.insert(door.x, door.y);
            while let Some(current) = to_visit.pop() {
                if visited_count >= limit {
                    break;
                }
                for &(dx, dy) in &NEIGHBORS_4 {
                    let next = current + (dx, dy);
                    if mini_tiles.is_inside(next.x, next.y)
                        && !visited.contains(next.x, next.y)
                        && mini_tiles.get(next.x, next.y).walkable()
                        && tiles
                            .get(next.x / WALK_PER_TILE, next.y / WALK_PER_TILE)
                            .neutral()
                            .is_none()
                    {
                        visited.insert(next.x, next.y);
                        visited_count += 1;
                        to_visit.push(next);
                    }
                }
            }
            visited_count >= limit
        })
        .collect()
}

fn outer_border(top_left: WalkPosition, bottom_right: WalkPosition) -> Vec<WalkPosition> {
    let tl = top_left + (-1, -1);
    let br = bottom_right + (1, 1);
    let mut border = Vec::new();
    for x in tl.x..=br.x {
        border.push(WalkPosition::new(x, tl.y));
        border.push(WalkPosition::new(x, br.y));
    }
    for y in tl.y + 1..br.y {
        border.push(WalkPosition::new(tl.x, y));
        border.push(WalkPosition::new(br.x, y));
    }
    border
}

fn adjoins_8_some_lake_or_neutral(
    mini_tiles: &GridArray<MiniTile>,
    tiles: &GridArray<Tile>,
    w: WalkPosition,
) -> bool {
    NEIGHBORS_8.iter().any(|&(dx, dy)| {
        let next = w + (dx, dy);
        mini_tiles.is_inside(next.x, next.y)
            && (tiles
                .get(next.x / WALK_PER_TILE, next.y / WALK_PER_TILE)
                .neutral()
                .is_some()
                || mini_tiles.get(next.x, next.y).lake())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{load_grids, TerrainSource};
    use crate::neutral::{BuildingKind, NeutralUnit, NeutralUnitKind};
    use crate::pipeline::altitude::{compute_altitude, decide_seas_or_lakes};

    /// An 8x8 tile map: a one-tile-high corridor at tile row 3 crossing the
    /// map, walls above and below, with optional neutrals.
    struct Corridor {
        neutrals: Vec<NeutralUnit>,
        open: bool,
    }

    impl TerrainSource for Corridor {
        fn map_size(&self) -> TilePosition {
            TilePosition::new(8, 8)
        }
        fn is_walkable(&self, walk: WalkPosition) -> bool {
            self.open || (12..16).contains(&walk.y)
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
            &self.neutrals
        }
    }

    fn building_at(tile: TilePosition) -> NeutralUnit {
        NeutralUnit {
            id: 7,
            kind: NeutralUnitKind::StaticBuilding(BuildingKind::Other),
            top_left: tile,
            size: TilePosition::new(1, 1),
            resource_amount: 0,
        }
    }

    #[test]
    fn corridor_spanning_building_is_blocking() {
        let source = Corridor {
            neutrals: vec![building_at(TilePosition::new(4, 3))],
            open: false,
        };
        let (mut mini, mut tiles) = load_grids(&source);
        let mut neutrals = Neutrals::load(source.neutral_units(), &mut tiles);
        decide_seas_or_lakes(&mut mini);
        compute_altitude(&mut mini);
        process_blocking_neutrals(&mut mini, &tiles, &mut neutrals);

        assert!(neutrals.get(0).blocking());
        assert_eq!(neutrals.get(0).blocked_doors().len(), 2);
        // The corridor rows under the building carry the blocked sentinel.
        assert!(mini.get(17, 13).blocked());
        assert!(mini.get(18, 14).blocked());
        // Outside the footprint the corridor is untouched.
        assert!(!mini.get(14, 13).blocked());
    }

    #[test]
    fn building_in_the_open_is_not_blocking() {
        let source = Corridor {
            neutrals: vec![building_at(TilePosition::new(4, 3))],
            open: true,
        };
        let (mut mini, mut tiles) = load_grids(&source);
        let mut neutrals = Neutrals::load(source.neutral_units(), &mut tiles);
        decide_seas_or_lakes(&mut mini);
        compute_altitude(&mut mini);
        process_blocking_neutrals(&mut mini, &tiles, &mut neutrals);

        assert!(!neutrals.get(0).blocking());
        assert!(!mini.get(17, 13).blocked());
    }
}
