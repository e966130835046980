//! Policy constants of the analysis.
//!
//! Most of these are load-bearing: they decide where area frontiers fall and
//! which neutrals count as blocking, so two builds only produce comparable
//! decompositions when they agree on every value here.

use crate::position::TilePosition;

/// Altitudes are expressed in pixels; one minitile of distance is 8.
pub const ALTITUDE_SCALE: i32 = 8;

/// An unwalkable component is re-tagged as a lake when it has at most this
/// many minitiles...
pub const LAKE_MAX_MINI_TILES: usize = 300;

/// ...spans at most this many minitiles in both axes...
pub const LAKE_MAX_WIDTH_IN_MINI_TILES: i32 = 32;

/// ...and its bounding box keeps this many minitiles clear of every map edge.
pub const LAKE_MIN_DIST_FROM_EDGE: i32 = 2;

/// Temp areas below this minitile count become negative-id fragments.
pub const AREA_MIN_MINI_TILES: usize = 64;

/// Merge predicate: a temp area smaller than this is always absorbed.
pub const AREA_MERGE_MAX_SIZE: usize = 80;

/// Merge predicate: a temp area whose summit is lower than this is always
/// absorbed.
pub const AREA_MERGE_MAX_ALTITUDE: i16 = 80;

/// True-door flood cap for a static building candidate.
pub const DOOR_FLOOD_LIMIT_STATIC_BUILDING: usize = 10;

/// True-door flood cap for a mineral candidate.
pub const DOOR_FLOOD_LIMIT_MINERAL: usize = 400;

/// Frontier cluster attachment threshold in minitiles, queen-wise.
/// Derived from the lake size bound: floor(sqrt(300)) = 17.
pub const CHOKE_POINT_CLUSTER_DIST: i32 = 17;

/// Tile footprint of a command center.
pub const COMMAND_CENTER_SIZE: TilePosition = TilePosition::new(3, 2);

/// A base only gathers resources within this many tiles of its center.
pub const MAX_TILES_BETWEEN_CC_AND_RESOURCES: i32 = 10;

/// Minimum rounded tile distance between two bases of one area.
pub const MIN_TILES_BETWEEN_BASES: i32 = 10;

/// A starting location adopts a base within this queen-wise tile distance.
pub const MAX_TILES_BETWEEN_START_LOCATION_AND_BASE: i32 = 3;

/// Minerals below this initial amount are ignored by base placement.
pub const BASE_MIN_MINERAL_AMOUNT: i32 = 40;

/// Geysers below this initial amount are ignored by base placement.
pub const BASE_MIN_GEYSER_AMOUNT: i32 = 300;

/// Minerals at or below this initial amount merely block a base location
/// instead of forbidding it.
pub const BLOCKING_MINERAL_MAX_AMOUNT: i32 = 8;

/// Orthogonal and diagonal step weights of the intra-area grid Dijkstra.
/// 10000/14142 approximates 1/sqrt(2) in fixed point.
pub const DIJKSTRA_STRAIGHT_WEIGHT: i32 = 10_000;
pub const DIJKSTRA_DIAGONAL_WEIGHT: i32 = 14_142;

/// Neighbor offsets for 4-directional (cardinal) movement.
pub const NEIGHBORS_4: [(i32, i32); 4] = [(-1, 0), (0, 1), (1, 0), (0, -1)];

/// Neighbor offsets for 8-directional movement.
pub const NEIGHBORS_8: [(i32, i32); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
    (1, 0),
    (1, -1),
    (0, -1),
];
