//! Grid breadth-first searches shared by several passes.
//!
//! Both routines expand 8-neighbourhoods from a seed until a cell satisfies
//! the find condition, walking only through cells that satisfy the visit
//! condition. They differ only in the grid they run over, sharing the dense
//! visited mask and queue state.

use crate::constants::NEIGHBORS_8;
use crate::grid::{GridArray, MiniTile, Tile, VisitedMask};
use crate::position::{TilePosition, WalkPosition};
use std::collections::VecDeque;

/// Nearest minitile satisfying `find`, searching outward from `start`
/// through minitiles satisfying `visit`.
///
/// Falls back to `start` when the search space is exhausted; that indicates
/// a caller bug (asserted in debug builds).
pub(crate) fn bfs_walk(
    mini_tiles: &GridArray<MiniTile>,
    start: WalkPosition,
    find: impl Fn(&MiniTile, WalkPosition) -> bool,
    visit: impl Fn(&MiniTile, WalkPosition) -> bool,
) -> WalkPosition {
    if find(mini_tiles.get(start.x, start.y), start) {
        return start;
    }
    let mut visited = VisitedMask::new(mini_tiles.width(), mini_tiles.height());
    let mut to_visit = VecDeque::new();
    to_visit.push_back(start);
    visited.insert(start.x, start.y);
    while let Some(current) = to_visit.pop_front() {
        for &(dx, dy) in &NEIGHBORS_8 {
            let next = current + (dx, dy);
            if !mini_tiles.is_inside(next.x, next.y) || !visited.insert(next.x, next.y) {
                continue;
            }
            let mini_tile = mini_tiles.get(next.x, next.y);
            if find(mini_tile, next) {
                return next;
            }
            if visit(mini_tile, next) {
                to_visit.push_back(next);
            }
        }
    }
    debug_assert!(false, "bfs_walk exhausted from {:?}", start);
    start
}

/// Tile-grid counterpart of [`bfs_walk`].
pub(crate) fn bfs_tile(
    tiles: &GridArray<Tile>,
    start: TilePosition,
    find: impl Fn(&Tile, TilePosition) -> bool,
    visit: impl Fn(&Tile, TilePosition) -> bool,
) -> TilePosition {
    if find(tiles.get(start.x, start.y), start) {
        return start;
    }
    let mut visited = VisitedMask::new(tiles.width(), tiles.height());
    let mut to_visit = VecDeque::new();
    to_visit.push_back(start);
    visited.insert(start.x, start.y);
    while let Some(current) = to_visit.pop_front() {
        for &(dx, dy) in &NEIGHBORS_8 {
            let next = current + (dx, dy);
            if !tiles.is_inside(next.x, next.y) || !visited.insert(next.x, next.y) {
                continue;
            }
            let tile = tiles.get(next.x, next.y);
            if find(tile, next) {
                return next;
            }
            if visit(tile, next) {
                to_visit.push_back(next);
            }
        }
    }
    debug_assert!(false, "bfs_tile exhausted from {:?}", start);
    start
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bfs_walk_finds_nearest_matching_cell() {
        let mini_tiles: GridArray<MiniTile> = GridArray::new(16, 16);
        // All cells are default (unwalkable, area 0); search for a specific
        // position while visiting everything.
        let target = WalkPosition::new(9, 4);
        let found = bfs_walk(
            &mini_tiles,
            WalkPosition::new(2, 2),
            |_, w| w == target,
            |_, _| true,
        );
        assert_eq!(found, target);
    }

    #[test]
    fn bfs_walk_start_satisfying_find_returns_start() {
        let mini_tiles: GridArray<MiniTile> = GridArray::new(8, 8);
        let start = WalkPosition::new(3, 3);
        assert_eq!(bfs_walk(&mini_tiles, start, |_, _| true, |_, _| false), start);
    }
}
