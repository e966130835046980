//! Dense tile and minitile grids and the terrain snapshot boundary.
//!
//! The map is described at two resolutions: tiles (32 px) carry buildability
//! and ground height, minitiles (8 px) carry walkability, altitude and area
//! membership. Both grids are plain row-major arrays.

use crate::constants::*;
use crate::neutral::{NeutralIndex, NeutralUnit};
use crate::position::*;
use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// Pixel distance from the nearest sea minitile, in units of
/// [`ALTITUDE_SCALE`](crate::constants::ALTITUDE_SCALE) per minitile.
pub type Altitude = i16;

/// Area identifier. Positive ids are real areas, negative ids below -1 are
/// too-small fragments, 0 is sea/lake, [`BLOCKED_AREA_ID`] marks minitiles
/// under a blocking neutral.
pub type AreaId = i16;

/// Group identifier: areas of one group are mutually reachable.
pub type GroupId = i16;

/// Sentinel area id for walkable minitiles covered by a blocking neutral.
pub const BLOCKED_AREA_ID: AreaId = i16::MIN;

const ALTITUDE_MISSING: Altitude = -1;
const ALTITUDE_SEA_OR_LAKE: Altitude = 1;

/// An 8x8 pixel cell.
///
/// Classification is encoded in `(walkable, altitude)`: sea is unwalkable
/// with altitude 0, a lake is unwalkable with a positive altitude, terrain
/// is walkable. During analysis the transient values `altitude == 1`
/// (undecided sea-or-lake) and `altitude == -1` (not yet computed) occur;
/// neither survives initialization.
#[derive(Copy, Clone, Debug, Serialize, Deserialize)]
pub struct MiniTile {
    walkable: bool,
    altitude: Altitude,
    area_id: AreaId,
}

impl Default for MiniTile {
    fn default() -> Self {
        MiniTile {
            walkable: false,
            altitude: ALTITUDE_SEA_OR_LAKE,
            area_id: 0,
        }
    }
}

impl MiniTile {
    pub fn walkable(&self) -> bool {
        self.walkable
    }

    /// Flips walkability, resetting the derived fields to their pending
    /// state for the chosen class.
    pub(crate) fn set_walkable(&mut self, walkable: bool) {
        self.walkable = walkable;
        self.area_id = if walkable { -1 } else { 0 };
        self.altitude = if walkable {
            ALTITUDE_MISSING
        } else {
            ALTITUDE_SEA_OR_LAKE
        };
    }

    pub fn altitude(&self) -> Altitude {
        self.altitude
    }

    pub fn area_id(&self) -> AreaId {
        self.area_id
    }

    pub fn sea(&self) -> bool {
        self.altitude == 0
    }

    pub fn lake(&self) -> bool {
        !self.walkable && self.altitude != 0
    }

    pub(crate) fn sea_or_lake(&self) -> bool {
        !self.walkable && self.altitude == ALTITUDE_SEA_OR_LAKE
    }

    pub(crate) fn set_sea(&mut self) {
        debug_assert!(self.sea_or_lake());
        self.altitude = 0;
    }

    /// Re-tags a freshly flooded sea minitile as lake; the altitude pass
    /// will then assign it a positive altitude.
    pub(crate) fn set_lake(&mut self) {
        debug_assert!(!self.walkable && self.sea());
        self.altitude = ALTITUDE_MISSING;
    }

    pub(crate) fn altitude_missing(&self) -> bool {
        self.altitude == ALTITUDE_MISSING
    }

    pub(crate) fn set_altitude(&mut self, altitude: Altitude) {
        debug_assert!(self.altitude_missing() && altitude > 0);
        self.altitude = altitude;
    }

    /// True for walkable minitiles not yet assigned to any area.
    pub(crate) fn area_id_missing(&self) -> bool {
        self.area_id == -1
    }

    pub fn blocked(&self) -> bool {
        self.area_id == BLOCKED_AREA_ID
    }

    pub(crate) fn set_blocked(&mut self) {
        debug_assert!(self.area_id_missing());
        self.area_id = BLOCKED_AREA_ID;
    }

    pub(crate) fn set_area_id(&mut self, id: AreaId) {
        debug_assert!(self.area_id_missing() && id != 0);
        self.area_id = id;
    }

    pub(crate) fn replace_area_id(&mut self, id: AreaId) {
        debug_assert!(self.area_id != 0);
        self.area_id = id;
    }

    /// Clears the blocked sentinel once the covering neutral is gone.
    pub(crate) fn replace_blocked_area_id(&mut self, id: AreaId) {
        debug_assert!(self.area_id == BLOCKED_AREA_ID && id > 0);
        self.area_id = id;
    }
}

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct TileFlags: u8 {
        const BUILDABLE = 1;
        const DOODAD = 2;
    }
}

impl Serialize for TileFlags {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.bits().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for TileFlags {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        u8::deserialize(deserializer).map(TileFlags::from_bits_truncate)
    }
}

/// Ground level of a tile, from the raw client height divided by two.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GroundHeight {
    Low,
    High,
    VeryHigh,
}

impl GroundHeight {
    fn from_raw(raw: u8) -> GroundHeight {
        match raw / 2 {
            0 => GroundHeight::Low,
            1 => GroundHeight::High,
            _ => GroundHeight::VeryHigh,
        }
    }
}

/// A 32x32 pixel cell covering 4x4 minitiles.
#[derive(Copy, Clone, Debug, Serialize, Deserialize)]
pub struct Tile {
    flags: TileFlags,
    ground_height: GroundHeight,
    min_altitude: Altitude,
    area_id: AreaId,
    neutral: Option<NeutralIndex>,
    /// Scratch value used by base placement; always reset to 0 between uses.
    #[serde(skip)]
    pub(crate) internal: i32,
}

impl Default for Tile {
    fn default() -> Self {
        Tile {
            flags: TileFlags::empty(),
            ground_height: GroundHeight::Low,
            min_altitude: 0,
            area_id: 0,
            neutral: None,
            internal: 0,
        }
    }
}

impl Tile {
    pub fn buildable(&self) -> bool {
        self.flags.contains(TileFlags::BUILDABLE)
    }

    pub fn doodad(&self) -> bool {
        self.flags.contains(TileFlags::DOODAD)
    }

    pub fn ground_height(&self) -> GroundHeight {
        self.ground_height
    }

    /// Minimum altitude over the 16 covered minitiles.
    pub fn min_altitude(&self) -> Altitude {
        self.min_altitude
    }

    pub(crate) fn set_min_altitude(&mut self, altitude: Altitude) {
        self.min_altitude = altitude;
    }

    /// Aggregate area id: 0 when no minitile belongs to an area, the unique
    /// id when all assigned minitiles agree, -1 when they disagree.
    pub fn area_id(&self) -> AreaId {
        self.area_id
    }

    pub(crate) fn set_area_id(&mut self, id: AreaId) {
        self.area_id = id;
    }

    /// Bottom of the stack of neutrals covering this tile, if any.
    pub fn neutral(&self) -> Option<NeutralIndex> {
        self.neutral
    }

    pub(crate) fn set_neutral(&mut self, neutral: Option<NeutralIndex>) {
        self.neutral = neutral;
    }
}

/// A dense row-major array covering the map at one resolution.
#[derive(Clone, Serialize, Deserialize)]
pub struct GridArray<T> {
    width: i32,
    height: i32,
    data: Vec<T>,
}

impl<T: Clone + Default> GridArray<T> {
    pub fn new(width: i32, height: i32) -> Self {
        GridArray {
            width,
            height,
            data: vec![T::default(); (width * height) as usize],
        }
    }
}

impl<T> GridArray<T> {
    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn is_inside(&self, x: i32, y: i32) -> bool {
        x >= 0 && x < self.width && y >= 0 && y < self.height
    }

    #[inline]
    pub fn get(&self, x: i32, y: i32) -> &T {
        debug_assert!(self.is_inside(x, y));
        &self.data[(y * self.width + x) as usize]
    }

    #[inline]
    pub fn get_mut(&mut self, x: i32, y: i32) -> &mut T {
        debug_assert!(self.is_inside(x, y));
        &mut self.data[(y * self.width + x) as usize]
    }

    pub fn iter(&self) -> impl Iterator<Item = ((i32, i32), &T)> {
        let width = self.width;
        self.data
            .iter()
            .enumerate()
            .map(move |(i, v)| ((i as i32 % width, i as i32 / width), v))
    }
}

/// Compact serialization for `GridArray<MiniTile>`.
///
/// The dominant allocation of an analyzed map is the minitile array. The
/// derived encoding spends a full bool per walkability flag; this module
/// stores the grid column-wise with walkability packed into a bitset,
/// cutting the serialized size by roughly a fifth on large maps.
pub mod compact_mini_tile_serde {
    use super::*;
    use serde::{Deserializer, Serializer};

    #[derive(Serialize, Deserialize)]
    struct CompactGrid {
        width: i32,
        height: i32,
        walkable: Vec<u64>,
        altitude: Vec<Altitude>,
        area_id: Vec<AreaId>,
    }

    pub fn serialize<S>(grid: &GridArray<MiniTile>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let cells = (grid.width * grid.height) as usize;
        let mut compact = CompactGrid {
            width: grid.width,
            height: grid.height,
            walkable: vec![0; (cells + 63) / 64],
            altitude: Vec::with_capacity(cells),
            area_id: Vec::with_capacity(cells),
        };
        for (i, mini_tile) in grid.data.iter().enumerate() {
            if mini_tile.walkable {
                compact.walkable[i / 64] |= 1 << (i % 64);
            }
            compact.altitude.push(mini_tile.altitude);
            compact.area_id.push(mini_tile.area_id);
        }
        compact.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<GridArray<MiniTile>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let compact = CompactGrid::deserialize(deserializer)?;
        let cells = (compact.width * compact.height) as usize;
        if compact.altitude.len() != cells
            || compact.area_id.len() != cells
            || compact.walkable.len() != (cells + 63) / 64
        {
            return Err(serde::de::Error::custom("invalid compact minitile grid"));
        }
        let data = (0..cells)
            .map(|i| MiniTile {
                walkable: compact.walkable[i / 64] & (1 << (i % 64)) != 0,
                altitude: compact.altitude[i],
                area_id: compact.area_id[i],
            })
            .collect();
        Ok(GridArray {
            width: compact.width,
            height: compact.height,
            data,
        })
    }
}

/// A dense one-bit-per-cell visited mask for grid searches.
pub struct VisitedMask {
    width: i32,
    bits: Vec<u64>,
}

impl VisitedMask {
    pub fn new(width: i32, height: i32) -> Self {
        VisitedMask {
            width,
            bits: vec![0; ((width * height) as usize + 63) / 64],
        }
    }

    #[inline]
    pub fn insert(&mut self, x: i32, y: i32) -> bool {
        let index = (y * self.width + x) as usize;
        let mask = 1u64 << (index % 64);
        let seen = self.bits[index / 64] & mask != 0;
        self.bits[index / 64] |= mask;
        !seen
    }

    #[inline]
    pub fn contains(&self, x: i32, y: i32) -> bool {
        let index = (y * self.width + x) as usize;
        self.bits[index / 64] & (1 << (index % 64)) != 0
    }
}

/// The immutable snapshot of raw map data the analyzer consumes.
///
/// Implementations exist for the game-client bridge (out of tree) and for
/// synthetic grids in tests.
pub trait TerrainSource {
    /// Map size in tiles.
    fn map_size(&self) -> TilePosition;
    /// Raw walkability of one minitile.
    fn is_walkable(&self, walk: WalkPosition) -> bool;
    /// Raw buildability of one tile.
    fn is_buildable(&self, tile: TilePosition) -> bool;
    /// Raw ground height of one tile, 0..=4.
    fn ground_height(&self, tile: TilePosition) -> u8;
    /// Starting locations, in tile coordinates.
    fn start_locations(&self) -> &[TilePosition];
    /// Static neutral units present on the map.
    fn neutral_units(&self) -> &[NeutralUnit];
}

/// Loads the two grids from the snapshot and applies the walkability
/// adjustments: every 8-neighbour of an originally unwalkable minitile is
/// forced unwalkable (thin-path suppression), then every buildable tile
/// forces its 16 minitiles walkable.
pub(crate) fn load_grids(source: &dyn TerrainSource) -> (GridArray<MiniTile>, GridArray<Tile>) {
    let size = source.map_size();
    let walk_w = size.x * WALK_PER_TILE;
    let walk_h = size.y * WALK_PER_TILE;

    let mut mini_tiles: GridArray<MiniTile> = GridArray::new(walk_w, walk_h);
    let mut tiles: GridArray<Tile> = GridArray::new(size.x, size.y);

    let mut raw_unwalkable = Vec::new();
    for y in 0..walk_h {
        for x in 0..walk_w {
            let walkable = source.is_walkable(WalkPosition::new(x, y));
            mini_tiles.get_mut(x, y).set_walkable(walkable);
            if !walkable {
                raw_unwalkable.push((x, y));
            }
        }
    }

    for (x, y) in raw_unwalkable {
        for &(dx, dy) in &NEIGHBORS_8 {
            if mini_tiles.is_inside(x + dx, y + dy) {
                mini_tiles.get_mut(x + dx, y + dy).set_walkable(false);
            }
        }
    }

    for y in 0..size.y {
        for x in 0..size.x {
            let t = TilePosition::new(x, y);
            let raw_height = source.ground_height(t);
            let tile = tiles.get_mut(x, y);
            tile.ground_height = GroundHeight::from_raw(raw_height);
            if raw_height % 2 == 1 {
                tile.flags |= TileFlags::DOODAD;
            }
            if source.is_buildable(t) {
                tile.flags |= TileFlags::BUILDABLE;
                for dy in 0..WALK_PER_TILE {
                    for dx in 0..WALK_PER_TILE {
                        mini_tiles
                            .get_mut(x * WALK_PER_TILE + dx, y * WALK_PER_TILE + dy)
                            .set_walkable(true);
                    }
                }
            }
        }
    }

    (mini_tiles, tiles)
}
