//! The owning `Map` value: pipeline driver, query façade and update hooks.

use crate::area::Area;
use crate::base::Base;
use crate::chokepoint::{ChokePoint, ChokePointIndex};
use crate::constants::*;
use crate::error::MapError;
use crate::grid::{
    load_grids, Altitude, AreaId, GridArray, MiniTile, TerrainSource, Tile,
};
use crate::neutral::{NeutralIndex, Neutrals};
use crate::pipeline::altitude::{compute_altitude, decide_seas_or_lakes, set_tile_min_altitudes};
use crate::pipeline::areas::{
    aggregate_tile_area_id, compute_areas, main_area_id, set_tile_area_ids,
};
use crate::pipeline::bases::create_bases;
use crate::pipeline::blocking::process_blocking_neutrals;
use crate::pipeline::chokepoints::{blocked_area_ids, create_choke_points};
use crate::pipeline::paths::{compute_choke_point_distance_matrix, ChokePointMatrices};
use crate::position::*;
use crate::search::{bfs_tile, bfs_walk};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

/// Hard cap on snapshot dimensions, in tiles per axis.
pub const MAX_MAP_SIZE: i32 = 256;

/// The analyzed map: grids, neutrals and the area/chokepoint/base graph.
///
/// All state is owned here; there are no process-wide singletons. A `Map`
/// starts empty, `initialize` runs the whole pipeline synchronously, and
/// afterwards the only mutations are the destruction hooks.
#[derive(Serialize, Deserialize)]
pub struct Map {
    initialized: bool,
    tile_size: TilePosition,
    walk_size: WalkPosition,
    center: Position,
    max_altitude: Altitude,
    #[serde(with = "crate::grid::compact_mini_tile_serde")]
    mini_tiles: GridArray<MiniTile>,
    tiles: GridArray<Tile>,
    neutrals: Neutrals,
    start_locations: Vec<TilePosition>,
    areas: Vec<Area>,
    choke_points: Vec<ChokePoint>,
    matrices: ChokePointMatrices,
    automatic_path_update: bool,
}

impl Default for Map {
    fn default() -> Self {
        Self::new()
    }
}

impl Map {
    /// An empty, uninitialized map. Queries fail until `initialize` runs.
    pub fn new() -> Map {
        Map {
            initialized: false,
            tile_size: TilePosition::new(0, 0),
            walk_size: WalkPosition::new(0, 0),
            center: Position::new(0, 0),
            max_altitude: 0,
            mini_tiles: GridArray::new(0, 0),
            tiles: GridArray::new(0, 0),
            neutrals: Neutrals::default(),
            start_locations: Vec::new(),
            areas: Vec::new(),
            choke_points: Vec::new(),
            matrices: ChokePointMatrices::empty(),
            automatic_path_update: false,
        }
    }

    /// Runs the full analysis pipeline on one terrain snapshot.
    pub fn initialize(&mut self, source: &dyn TerrainSource) -> Result<(), MapError> {
        let size = source.map_size();
        if size.x <= 0 || size.y <= 0 || size.x > MAX_MAP_SIZE || size.y > MAX_MAP_SIZE {
            return Err(MapError::InvalidDimensions {
                width: size.x,
                height: size.y,
            });
        }
        self.tile_size = size;
        self.walk_size = WalkPosition::new(size.x * WALK_PER_TILE, size.y * WALK_PER_TILE);
        self.center = Position::new(size.x * TILE_PIXELS / 2, size.y * TILE_PIXELS / 2);
        self.start_locations = source.start_locations().to_vec();

        let (mini_tiles, mut tiles) = load_grids(source);
        self.neutrals = Neutrals::load(source.neutral_units(), &mut tiles);
        self.mini_tiles = mini_tiles;
        self.tiles = tiles;

        decide_seas_or_lakes(&mut self.mini_tiles);
        self.max_altitude = compute_altitude(&mut self.mini_tiles);
        set_tile_min_altitudes(&self.mini_tiles, &mut self.tiles);
        process_blocking_neutrals(&mut self.mini_tiles, &self.tiles, &mut self.neutrals);

        let computation = compute_areas(&mut self.mini_tiles, &self.start_locations);
        self.areas = computation.areas;
        set_tile_area_ids(&self.mini_tiles, &mut self.tiles);
        self.collect_information();

        self.choke_points = create_choke_points(
            &self.mini_tiles,
            &self.tiles,
            &self.neutrals,
            &mut self.areas,
            &computation.raw_frontier,
        );
        self.matrices = compute_choke_point_distance_matrix(
            &self.mini_tiles,
            &mut self.areas,
            &self.choke_points,
        );
        create_bases(&mut self.tiles, &mut self.areas, &self.neutrals);

        self.initialized = true;
        debug!(
            "initialized {}x{} tiles: {} areas, {} chokepoints, {} bases",
            size.x,
            size.y,
            self.areas.len(),
            self.choke_points.len(),
            self.areas.iter().map(|a| a.bases().len()).sum::<usize>()
        );
        Ok(())
    }

    /// Per-area tile statistics and resource ownership.
    fn collect_information(&mut self) {
        for ty in 0..self.tiles.height() {
            for tx in 0..self.tiles.width() {
                let tile = *self.tiles.get(tx, ty);
                let id = tile.area_id();
                if id > 0 {
                    self.areas[(id - 1) as usize].add_tile_information(
                        TilePosition::new(tx, ty),
                        tile.buildable(),
                        tile.ground_height(),
                    );
                }
            }
        }

        let mut owned: Vec<(AreaId, NeutralIndex, bool)> = Vec::new();
        for (index, neutral) in self.neutrals.iter() {
            let is_mineral = neutral.is_mineral();
            if !is_mineral && !neutral.is_geyser() {
                continue;
            }
            if let Some(id) = self.footprint_main_area(neutral.top_left(), neutral.size()) {
                owned.push((id, index, is_mineral));
            }
        }
        for (id, index, is_mineral) in owned {
            let area = &mut self.areas[(id - 1) as usize];
            if is_mineral {
                area.add_mineral(index);
            } else {
                area.add_geyser(index);
            }
        }
    }

    /// First area claimed by any tile of the footprint, in scan order.
    fn footprint_main_area(&self, top_left: TilePosition, size: TilePosition) -> Option<AreaId> {
        for dy in 0..size.y {
            for dx in 0..size.x {
                let t = top_left + (dx, dy);
                if !self.tiles.is_inside(t.x, t.y) {
                    continue;
                }
                if let Some(id) = main_area_id(&self.mini_tiles, t) {
                    return Some(id);
                }
            }
        }
        None
    }

    // ----- basic accessors ------------------------------------------------

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Map size in tiles.
    pub fn size(&self) -> TilePosition {
        self.tile_size
    }

    /// Map size in minitiles.
    pub fn walk_size(&self) -> WalkPosition {
        self.walk_size
    }

    /// Center of the map in pixels.
    pub fn center(&self) -> Position {
        self.center
    }

    pub fn max_altitude(&self) -> Altitude {
        self.max_altitude
    }

    pub fn start_locations(&self) -> &[TilePosition] {
        &self.start_locations
    }

    pub fn neutrals(&self) -> &Neutrals {
        &self.neutrals
    }

    /// The areas a blocking neutral separates.
    pub fn blocked_areas(&self, neutral: NeutralIndex) -> Vec<AreaId> {
        blocked_area_ids(&self.mini_tiles, &self.neutrals, neutral)
    }

    pub fn is_valid_tile(&self, t: TilePosition) -> bool {
        self.tiles.is_inside(t.x, t.y)
    }

    pub fn is_valid_walk(&self, w: WalkPosition) -> bool {
        self.mini_tiles.is_inside(w.x, w.y)
    }

    /// Clamps a tile position into the map.
    pub fn crop_tile(&self, t: TilePosition) -> TilePosition {
        TilePosition::new(
            t.x.clamp(0, self.tile_size.x - 1),
            t.y.clamp(0, self.tile_size.y - 1),
        )
    }

    /// Clamps a walk position into the map.
    pub fn crop_walk(&self, w: WalkPosition) -> WalkPosition {
        WalkPosition::new(
            w.x.clamp(0, self.walk_size.x - 1),
            w.y.clamp(0, self.walk_size.y - 1),
        )
    }

    pub fn tile(&self, t: TilePosition) -> &Tile {
        self.tiles.get(t.x, t.y)
    }

    /// The tile covering a walk position.
    pub fn tile_at_walk(&self, w: WalkPosition) -> &Tile {
        self.tile(w.to_tile())
    }

    pub fn mini_tile(&self, w: WalkPosition) -> &MiniTile {
        self.mini_tiles.get(w.x, w.y)
    }

    // ----- areas ----------------------------------------------------------

    pub fn areas(&self) -> &[Area] {
        &self.areas
    }

    pub fn area(&self, id: AreaId) -> Option<&Area> {
        if id >= 1 && (id as usize) <= self.areas.len() {
            Some(&self.areas[(id - 1) as usize])
        } else {
            None
        }
    }

    /// The area owning this minitile, if it belongs to one.
    pub fn area_at_walk(&self, w: WalkPosition) -> Option<&Area> {
        self.area(self.mini_tiles.get(w.x, w.y).area_id())
    }

    /// The area owning this tile, by first positive sub-minitile id.
    pub fn area_at_tile(&self, t: TilePosition) -> Option<&Area> {
        main_area_id(&self.mini_tiles, t).and_then(|id| self.area(id))
    }

    /// The nearest area to this minitile, by breadth-first search.
    pub fn nearest_area_walk(&self, w: WalkPosition) -> Option<&Area> {
        if self.areas.is_empty() {
            return None;
        }
        let w = self.crop_walk(w);
        let found = bfs_walk(&self.mini_tiles, w, |m, _| m.area_id() > 0, |_, _| true);
        self.area_at_walk(found)
    }

    /// The nearest area to this tile, by breadth-first search.
    pub fn nearest_area_tile(&self, t: TilePosition) -> Option<&Area> {
        if self.areas.is_empty() {
            return None;
        }
        let t = self.crop_tile(t);
        let found = bfs_tile(&self.tiles, t, |tile, _| tile.area_id() > 0, |_, _| true);
        self.area(self.tiles.get(found.x, found.y).area_id())
    }

    // ----- chokepoints and paths ------------------------------------------

    pub fn choke_points(&self) -> &[ChokePoint] {
        &self.choke_points
    }

    pub fn choke_point(&self, index: ChokePointIndex) -> &ChokePoint {
        &self.choke_points[index]
    }

    /// Ground distance between two chokepoints in pixels, or -1 when they
    /// are not connected.
    pub fn distance(&self, a: ChokePointIndex, b: ChokePointIndex) -> i32 {
        self.matrices.distance(a, b)
    }

    /// The chokepoint sequence realizing `distance(a, b)`.
    pub fn path(&self, a: ChokePointIndex, b: ChokePointIndex) -> &[ChokePointIndex] {
        self.matrices.path(a, b)
    }

    /// The chokepoints to traverse between two pixel positions, with the
    /// approximate ground length of that route in pixels.
    ///
    /// Positions in the same area give an empty path and the straight-line
    /// approximation; positions in mutually unreachable groups give an
    /// empty path and length -1.
    pub fn get_path(
        &self,
        a: Position,
        b: Position,
    ) -> Result<(&[ChokePointIndex], i32), MapError> {
        if !self.initialized {
            return Err(MapError::Uninitialized);
        }
        let area_a = self.nearest_area_walk(a.to_walk()).map(Area::id);
        let area_b = self.nearest_area_walk(b.to_walk()).map(Area::id);
        let (Some(area_a), Some(area_b)) = (area_a, area_b) else {
            return Ok((&[], -1));
        };
        if area_a == area_b {
            return Ok((&[], a.approx_distance(b)));
        }
        let group_a = self.areas[(area_a - 1) as usize].group_id();
        let group_b = self.areas[(area_b - 1) as usize].group_id();
        if group_a != group_b {
            return Ok((&[], -1));
        }

        let mut best: Option<(ChokePointIndex, ChokePointIndex)> = None;
        let mut best_dist = i32::MAX;
        for cp_a in self.areas[(area_a - 1) as usize].choke_points() {
            let enter = a.approx_distance(self.choke_points[cp_a].center().center());
            for cp_b in self.areas[(area_b - 1) as usize].choke_points() {
                let between = self.matrices.distance(cp_a, cp_b);
                if between < 0 {
                    continue;
                }
                let exit = b.approx_distance(self.choke_points[cp_b].center().center());
                let total = enter + between + exit;
                if total < best_dist {
                    best_dist = total;
                    best = Some((cp_a, cp_b));
                }
            }
        }
        match best {
            Some((cp_a, cp_b)) => Ok((self.matrices.path(cp_a, cp_b), best_dist)),
            None => Ok((&[], -1)),
        }
    }

    // ----- bases ----------------------------------------------------------

    /// All bases of all areas.
    pub fn bases(&self) -> impl Iterator<Item = &Base> {
        self.areas.iter().flat_map(|a| a.bases().iter())
    }

    /// Attaches each starting location to a base within queen-wise tile
    /// distance 3, promoting it to a starting base at the exact location.
    /// Returns false when at least one starting location found no base.
    pub fn find_bases_for_starting_locations(&mut self) -> Result<bool, MapError> {
        if !self.initialized {
            return Err(MapError::Uninitialized);
        }
        let mut all_found = true;
        let locations = self.start_locations.clone();
        for location in locations {
            let mut found = false;
            'areas: for area in &mut self.areas {
                for base in area.bases_mut() {
                    if base.location().queen_wise_dist(location)
                        <= MAX_TILES_BETWEEN_START_LOCATION_AND_BASE
                    {
                        base.set_starting_location(location);
                        found = true;
                        break 'areas;
                    }
                }
            }
            if !found {
                warn!("no base within reach of starting location {:?}", location);
                all_found = false;
            }
        }
        Ok(all_found)
    }

    /// Whether destroying a blocking neutral re-runs the distance and path
    /// computation. Off by default.
    pub fn automatic_path_update(&self) -> bool {
        self.automatic_path_update
    }

    pub fn set_automatic_path_update(&mut self, enabled: bool) {
        self.automatic_path_update = enabled;
    }

    // ----- destruction hooks ----------------------------------------------

    /// To call when a mineral patch disappears from the game.
    pub fn on_mineral_destroyed(&mut self, unit_id: u32) -> Result<(), MapError> {
        if !self.initialized {
            return Err(MapError::Uninitialized);
        }
        let Some(index) = self.neutrals.find_by_id(unit_id) else {
            debug_assert!(false, "unknown mineral unit {}", unit_id);
            warn!("ignoring destruction of unknown mineral unit {}", unit_id);
            return Ok(());
        };
        for area in &mut self.areas {
            area.remove_mineral(index);
        }
        self.destroy_neutral(index);
        Ok(())
    }

    /// To call when a neutral static building disappears from the game.
    pub fn on_static_building_destroyed(&mut self, unit_id: u32) -> Result<(), MapError> {
        if !self.initialized {
            return Err(MapError::Uninitialized);
        }
        let Some(index) = self.neutrals.find_by_id(unit_id) else {
            debug_assert!(false, "unknown static building unit {}", unit_id);
            warn!("ignoring destruction of unknown building unit {}", unit_id);
            return Ok(());
        };
        self.destroy_neutral(index);
        Ok(())
    }

    fn destroy_neutral(&mut self, index: NeutralIndex) {
        let blocking = self.neutrals.get(index).blocking();
        self.neutrals.remove(index, &mut self.tiles);
        if blocking {
            self.on_blocking_neutral_destroyed(index);
        }
    }

    /// Unblocking: chokepoints referencing the destroyed neutral fall back
    /// to the next element of its stack or unblock entirely; once the
    /// footprint is clear the blocked sentinel is lifted and, when enabled,
    /// the matrices are recomputed.
    fn on_blocking_neutral_destroyed(&mut self, destroyed: NeutralIndex) {
        let top_left = self.neutrals.get(destroyed).top_left();
        let remaining_bottom = self
            .tiles
            .get(top_left.x, top_left.y)
            .neutral()
            .filter(|&n| self.neutrals.get(n).blocking());
        for cp in &mut self.choke_points {
            if cp.blocking_neutral() == Some(destroyed) {
                cp.set_blocking_neutral(remaining_bottom);
            }
        }

        // Other stacked neutrals still cover the footprint: the passage
        // stays closed.
        if self.tiles.get(top_left.x, top_left.y).neutral().is_some() {
            return;
        }

        let blocked = blocked_area_ids(&self.mini_tiles, &self.neutrals, destroyed);
        debug_assert!(!blocked.is_empty());
        if let Some(&new_id) = blocked.first() {
            let walk_tl = top_left.to_walk();
            let walk_size = self.neutrals.get(destroyed).size().to_walk();
            for dy in 0..walk_size.y {
                for dx in 0..walk_size.x {
                    let w = walk_tl + (dx, dy);
                    let mini_tile = self.mini_tiles.get_mut(w.x, w.y);
                    if mini_tile.blocked() {
                        mini_tile.replace_blocked_area_id(new_id);
                    }
                }
            }
        }
        let footprint: Vec<TilePosition> = self.neutrals.get(destroyed).tiles().collect();
        for t in footprint {
            if self.tiles.is_inside(t.x, t.y) {
                let id = aggregate_tile_area_id(&self.mini_tiles, t);
                self.tiles.get_mut(t.x, t.y).set_area_id(id);
            }
        }

        if self.automatic_path_update {
            self.matrices = compute_choke_point_distance_matrix(
                &self.mini_tiles,
                &mut self.areas,
                &self.choke_points,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chokepoint::Node;
    use crate::neutral::{NeutralUnit, NeutralUnitKind};

    /// Synthetic terrain snapshot: walkable except inside the given
    /// inclusive walk-rectangles.
    struct GridSource {
        size: TilePosition,
        unwalkable: Vec<(WalkPosition, WalkPosition)>,
        buildable: bool,
        starts: Vec<TilePosition>,
        units: Vec<NeutralUnit>,
    }

    impl GridSource {
        fn plain(width: i32, height: i32) -> GridSource {
            GridSource {
                size: TilePosition::new(width, height),
                unwalkable: Vec::new(),
                buildable: false,
                starts: Vec::new(),
                units: Vec::new(),
            }
        }

        fn wall(mut self, top_left: WalkPosition, bottom_right: WalkPosition) -> GridSource {
            self.unwalkable.push((top_left, bottom_right));
            self
        }
    }

    impl TerrainSource for GridSource {
        fn map_size(&self) -> TilePosition {
            self.size
        }
        fn is_walkable(&self, walk: WalkPosition) -> bool {
            !self.unwalkable.iter().any(|&(tl, br)| {
                walk.x >= tl.x && walk.x <= br.x && walk.y >= tl.y && walk.y <= br.y
            })
        }
        fn is_buildable(&self, _tile: TilePosition) -> bool {
            self.buildable
        }
        fn ground_height(&self, _tile: TilePosition) -> u8 {
            0
        }
        fn start_locations(&self) -> &[TilePosition] {
            &self.starts
        }
        fn neutral_units(&self) -> &[NeutralUnit] {
            &self.units
        }
    }

    fn analyzed(source: &GridSource) -> Map {
        let mut map = Map::new();
        map.initialize(source).unwrap();
        map
    }

    /// Two 32x32-tile rooms joined by a 4-minitile-wide corridor through a
    /// 16-tile sea band.
    fn two_rooms() -> GridSource {
        GridSource::plain(80, 32)
            .wall(WalkPosition::new(128, 0), WalkPosition::new(191, 59))
            .wall(WalkPosition::new(128, 66), WalkPosition::new(191, 127))
    }

    /// Two rooms stacked vertically, joined by a corridor of 4 walkable
    /// minitile columns, with `stacked` minerals walling the corridor.
    fn blocked_corridor(stacked: usize) -> GridSource {
        let mut source = GridSource::plain(32, 80)
            .wall(WalkPosition::new(0, 128), WalkPosition::new(59, 191))
            .wall(WalkPosition::new(66, 128), WalkPosition::new(127, 191));
        for i in 0..stacked {
            source.units.push(NeutralUnit {
                id: (i + 1) as u32,
                kind: NeutralUnitKind::Mineral,
                top_left: TilePosition::new(15, 40),
                size: TilePosition::new(2, 1),
                resource_amount: 8,
            });
        }
        source
    }

    #[test]
    fn uninitialized_map_rejects_queries() {
        let mut map = Map::new();
        assert!(!map.is_initialized());
        assert_eq!(
            map.get_path(Position::new(0, 0), Position::new(100, 100)),
            Err(MapError::Uninitialized)
        );
        assert_eq!(
            map.find_bases_for_starting_locations(),
            Err(MapError::Uninitialized)
        );
        assert_eq!(map.on_mineral_destroyed(1), Err(MapError::Uninitialized));
    }

    #[test]
    fn invalid_dimensions_are_rejected() {
        let mut map = Map::new();
        let source = GridSource::plain(0, 64);
        assert!(matches!(
            map.initialize(&source),
            Err(MapError::InvalidDimensions { .. })
        ));
    }

    #[test]
    fn open_plain_is_one_area_without_chokepoints() {
        let map = analyzed(&GridSource::plain(64, 64));
        assert_eq!(map.areas().len(), 1);
        assert!(map.choke_points().is_empty());
        assert_eq!(map.bases().count(), 0);
        assert!(map.max_altitude() > 0);

        let id = map.areas()[0].id();
        for y in 0..map.walk_size().y {
            for x in 0..map.walk_size().x {
                let m = map.mini_tile(WalkPosition::new(x, y));
                assert!(m.walkable());
                assert_eq!(m.area_id(), id);
                assert!(m.altitude() > 0);
            }
        }
    }

    #[test]
    fn corridor_produces_one_chokepoint_between_two_areas() {
        let map = analyzed(&two_rooms());
        assert_eq!(map.areas().len(), 2);
        assert_eq!(map.choke_points().len(), 1);

        let cp = map.choke_point(0);
        assert_eq!(cp.areas(), (1, 2));
        // The corridor is 4 minitiles wide after walkability widening.
        assert_eq!(cp.geometry().len(), 4);
        assert_eq!(map.distance(0, 0), 0);
        assert_eq!(map.path(0, 0), &[0]);

        // The middle node carries the geometry's maximum altitude.
        let middle_altitude = map.mini_tile(cp.node(Node::Middle)).altitude();
        for &w in cp.geometry() {
            assert!(map.mini_tile(w).altitude() <= middle_altitude);
        }
        // Node representatives land in their own areas, off any neutral.
        for node in [Node::End1, Node::Middle, Node::End2] {
            for area_id in [1, 2] {
                let w = cp.pos_in_area(node, area_id);
                assert_eq!(map.mini_tile(w).area_id(), area_id);
            }
        }

        // Both areas see each other as accessible, in one group.
        assert_eq!(map.areas()[0].accessible_neighbours(), &[2]);
        assert_eq!(map.areas()[1].accessible_neighbours(), &[1]);
        assert_eq!(map.areas()[0].group_id(), map.areas()[1].group_id());

        // A path between the rooms crosses exactly that chokepoint.
        let a = TilePosition::new(16, 16).center();
        let b = TilePosition::new(64, 16).center();
        let (path, length) = map.get_path(a, b).unwrap();
        assert_eq!(path, &[0]);
        assert!(length > 0);
        let (reverse_path, reverse_length) = map.get_path(b, a).unwrap();
        assert_eq!(reverse_path, &[0]);
        assert_eq!(length, reverse_length);

        // Same-area queries return the straight-line approximation.
        let (empty, approx) = map
            .get_path(a, TilePosition::new(20, 20).center())
            .unwrap();
        assert!(empty.is_empty());
        assert_eq!(approx, a.approx_distance(TilePosition::new(20, 20).center()));
    }

    #[test]
    fn chained_rooms_produce_multi_hop_paths() {
        // Four 32x32-tile rooms in a row, three corridors, three
        // chokepoints.
        let mut source = GridSource::plain(176, 32);
        for band in 0..3 {
            let left = (32 + band * 48) * 4;
            let right = left + 63;
            source = source
                .wall(WalkPosition::new(left, 0), WalkPosition::new(right, 59))
                .wall(WalkPosition::new(left, 66), WalkPosition::new(right, 127));
        }
        let map = analyzed(&source);
        assert_eq!(map.areas().len(), 4);
        assert_eq!(map.choke_points().len(), 3);
        assert_eq!(map.choke_point(0).areas(), (1, 2));
        assert_eq!(map.choke_point(1).areas(), (2, 3));
        assert_eq!(map.choke_point(2).areas(), (3, 4));

        // Chained distances add up and the path lists every hop.
        assert!(map.distance(0, 1) > 0);
        assert_eq!(
            map.distance(0, 2),
            map.distance(0, 1) + map.distance(1, 2)
        );
        assert_eq!(map.path(0, 2), &[0, 1, 2]);
        assert_eq!(map.path(2, 0), &[2, 1, 0]);

        let a = TilePosition::new(16, 16).center();
        let d = TilePosition::new(160, 16).center();
        let (path, length) = map.get_path(a, d).unwrap();
        assert_eq!(path, &[0, 1, 2]);
        assert!(length >= map.distance(0, 2));
    }

    #[test]
    fn universal_invariants_hold_after_initialize() {
        let map = analyzed(&two_rooms());
        for y in 0..map.walk_size().y {
            for x in 0..map.walk_size().x {
                let m = map.mini_tile(WalkPosition::new(x, y));
                if m.walkable() {
                    assert_ne!(m.area_id(), 0);
                    assert!(m.altitude() > 0);
                }
            }
        }
        for area in map.areas() {
            let top = map.mini_tile(area.top());
            assert_eq!(top.area_id(), area.id());
            assert_eq!(top.altitude(), area.max_altitude());
        }
        let count = map.choke_points().len();
        for a in 0..count {
            for b in 0..count {
                assert_eq!(map.distance(a, b), map.distance(b, a));
                let forward = map.path(a, b).to_vec();
                let mut backward = map.path(b, a).to_vec();
                backward.reverse();
                assert_eq!(forward, backward);
            }
            assert_eq!(map.distance(a, a), 0);
        }
        for cp in map.choke_points() {
            assert!(!cp.geometry().is_empty());
            if !cp.is_pseudo() {
                let (a1, a2) = cp.areas();
                for &w in cp.geometry() {
                    let id = map.mini_tile(w).area_id();
                    assert!(id == a1 || id == a2);
                }
            }
        }
    }

    #[test]
    fn reanalysis_is_structurally_identical() {
        let source = two_rooms();
        let first = analyzed(&source);
        let second = analyzed(&source);
        assert_eq!(first.areas().len(), second.areas().len());
        for (a, b) in first.areas().iter().zip(second.areas()) {
            assert_eq!(a.id(), b.id());
            assert_eq!(a.top(), b.top());
            assert_eq!(a.max_altitude(), b.max_altitude());
            assert_eq!(a.mini_tiles(), b.mini_tiles());
        }
        assert_eq!(first.choke_points().len(), second.choke_points().len());
        for (a, b) in first.choke_points().iter().zip(second.choke_points()) {
            assert_eq!(a.areas(), b.areas());
            assert_eq!(a.geometry(), b.geometry());
        }
        for a in 0..first.choke_points().len() {
            for b in 0..first.choke_points().len() {
                assert_eq!(first.distance(a, b), second.distance(a, b));
            }
        }
    }

    #[test]
    fn blocking_mineral_wall_yields_a_blocked_pseudo_chokepoint() {
        let mut map = analyzed(&blocked_corridor(9));
        map.set_automatic_path_update(true);
        assert_eq!(map.areas().len(), 2);
        assert_eq!(map.choke_points().len(), 1);

        let cp = map.choke_point(0);
        assert!(cp.is_pseudo());
        assert!(cp.blocked());
        assert!(cp.blocking_neutral().is_some());
        // Both sides exclude each other while the wall stands.
        assert!(map.areas()[0].accessible_neighbours().is_empty());
        assert!(map.areas()[1].accessible_neighbours().is_empty());
        assert_ne!(map.areas()[0].group_id(), map.areas()[1].group_id());

        let a = TilePosition::new(16, 16).center();
        let b = TilePosition::new(16, 64).center();
        let (path, length) = map.get_path(a, b).unwrap();
        assert!(path.is_empty());
        assert_eq!(length, -1);

        // Destroying all but one mineral leaves the wall blocking.
        for id in (2..=9).rev() {
            map.on_mineral_destroyed(id).unwrap();
            assert!(map.choke_point(0).blocked());
        }
        // The last mineral opens the passage and refreshes the matrices.
        map.on_mineral_destroyed(1).unwrap();
        assert!(!map.choke_point(0).blocked());
        assert_eq!(map.areas()[0].accessible_neighbours(), &[2]);
        assert_eq!(map.areas()[0].group_id(), map.areas()[1].group_id());
        let (path, length) = map.get_path(a, b).unwrap();
        assert_eq!(path, &[0]);
        assert!(length > 0);
        // The sentinel is gone from the corridor.
        for y in 160..164 {
            for x in 61..65 {
                assert!(!map.mini_tile(WalkPosition::new(x, y)).blocked());
            }
        }
    }

    #[test]
    fn blocking_building_opens_when_destroyed() {
        let mut source = GridSource::plain(32, 80)
            .wall(WalkPosition::new(0, 128), WalkPosition::new(59, 191))
            .wall(WalkPosition::new(66, 128), WalkPosition::new(127, 191));
        source.units.push(NeutralUnit {
            id: 1,
            kind: NeutralUnitKind::StaticBuilding(crate::neutral::BuildingKind::Other),
            top_left: TilePosition::new(15, 40),
            size: TilePosition::new(2, 1),
            resource_amount: 0,
        });
        let mut map = Map::new();
        map.initialize(&source).unwrap();
        map.set_automatic_path_update(true);

        assert_eq!(map.choke_points().len(), 1);
        assert!(map.choke_point(0).blocked());
        assert_eq!(map.blocked_areas(0).len(), 2);

        map.on_static_building_destroyed(1).unwrap();
        assert!(!map.choke_point(0).blocked());
        assert_eq!(map.areas()[0].group_id(), map.areas()[1].group_id());
    }

    #[test]
    fn without_automatic_updates_the_matrices_stay_stale() {
        let mut map = analyzed(&blocked_corridor(1));
        assert!(!map.automatic_path_update());
        map.on_mineral_destroyed(1).unwrap();
        // The chokepoint itself unblocks immediately...
        assert!(!map.choke_point(0).blocked());
        // ...but accessibility and groups are not refreshed.
        assert!(map.areas()[0].accessible_neighbours().is_empty());
        assert_ne!(map.areas()[0].group_id(), map.areas()[1].group_id());
        let a = TilePosition::new(16, 16).center();
        let b = TilePosition::new(16, 64).center();
        assert_eq!(map.get_path(a, b).unwrap(), (&[][..], -1));
    }

    #[test]
    fn serialized_map_answers_the_same_queries() {
        let map = analyzed(&two_rooms());
        let bytes = bincode::serialize(&map).unwrap();
        let decoded: Map = bincode::deserialize(&bytes).unwrap();

        assert!(decoded.is_initialized());
        assert_eq!(decoded.areas().len(), map.areas().len());
        assert_eq!(decoded.choke_points().len(), map.choke_points().len());
        assert_eq!(decoded.distance(0, 0), 0);
        let w = WalkPosition::new(16, 16);
        assert_eq!(decoded.mini_tile(w).area_id(), map.mini_tile(w).area_id());
        let a = TilePosition::new(16, 16).center();
        let b = TilePosition::new(64, 16).center();
        assert_eq!(decoded.get_path(a, b).unwrap(), map.get_path(a, b).unwrap());
    }

    #[test]
    fn building_between_lakes_blocks_without_a_pseudo_chokepoint() {
        // Two enclosed lakes flanking a narrow gap, with a building walling
        // the gap. The plain wraps around both lakes, so the two doors open
        // into the same area: the neutral is blocking but there is no area
        // pair to hang a pseudo chokepoint on.
        let mut source = GridSource::plain(24, 24)
            .wall(WalkPosition::new(40, 40), WalkPosition::new(54, 54))
            .wall(WalkPosition::new(62, 40), WalkPosition::new(76, 54));
        source.units.push(NeutralUnit {
            id: 1,
            kind: NeutralUnitKind::StaticBuilding(crate::neutral::BuildingKind::Other),
            top_left: TilePosition::new(14, 12),
            size: TilePosition::new(2, 1),
            resource_amount: 0,
        });
        let map = analyzed(&source);

        // Both pockets classified as lakes, with positive altitudes.
        assert!(map.mini_tile(WalkPosition::new(48, 48)).lake());
        assert!(map.mini_tile(WalkPosition::new(48, 48)).altitude() > 0);
        assert!(map.mini_tile(WalkPosition::new(72, 48)).lake());

        assert_eq!(map.areas().len(), 1);
        assert!(map.neutrals().get(0).blocking());
        assert_eq!(map.blocked_areas(0), vec![1]);
        assert!(map.choke_points().is_empty());
    }

    #[test]
    fn four_player_map_assigns_one_starting_base_per_cluster() {
        let mut source = GridSource::plain(64, 64);
        source.buildable = true;
        source.starts = vec![
            TilePosition::new(5, 5),
            TilePosition::new(56, 5),
            TilePosition::new(5, 56),
            TilePosition::new(56, 56),
        ];
        let mut next_id = 1;
        for &start in &source.starts {
            for k in 0..6 {
                source.units.push(NeutralUnit {
                    id: next_id,
                    kind: NeutralUnitKind::Mineral,
                    top_left: TilePosition::new(start.x - 5, start.y - 2 + k),
                    size: TilePosition::new(2, 1),
                    resource_amount: 1500,
                });
                next_id += 1;
            }
            source.units.push(NeutralUnit {
                id: next_id,
                kind: NeutralUnitKind::Geyser,
                top_left: TilePosition::new(start.x - 1, start.y + 5),
                size: TilePosition::new(4, 2),
                resource_amount: 5000,
            });
            next_id += 1;
        }

        let mut map = Map::new();
        map.initialize(&source).unwrap();
        assert_eq!(map.areas().len(), 1);
        assert_eq!(map.bases().count(), 4);
        assert!(map.find_bases_for_starting_locations().unwrap());

        for &start in map.start_locations() {
            let matching: Vec<&Base> = map
                .bases()
                .filter(|b| b.starting() && b.location() == start)
                .collect();
            assert_eq!(matching.len(), 1, "one starting base at {:?}", start);
            let base = matching[0];
            assert_eq!(base.minerals().len(), 6);
            assert_eq!(base.geysers().len(), 1);
            // Resources belong to this base exclusively.
            for other in map.bases() {
                if other.location() != base.location() {
                    for m in base.minerals() {
                        assert!(!other.minerals().contains(m));
                    }
                }
            }
        }
    }

    #[test]
    fn disconnected_islands_are_separate_groups() {
        let map = analyzed(
            &GridSource::plain(40, 16).wall(WalkPosition::new(64, 0), WalkPosition::new(95, 63)),
        );
        assert_eq!(map.areas().len(), 2);
        assert!(map.choke_points().is_empty());
        assert_ne!(map.areas()[0].group_id(), map.areas()[1].group_id());

        let a = TilePosition::new(8, 8).center();
        let b = TilePosition::new(32, 8).center();
        let (path, length) = map.get_path(a, b).unwrap();
        assert!(path.is_empty());
        assert_eq!(length, -1);
    }

    #[test]
    fn mineral_ownership_follows_the_containing_area() {
        let mut source = two_rooms();
        source.units.push(NeutralUnit {
            id: 1,
            kind: NeutralUnitKind::Mineral,
            top_left: TilePosition::new(10, 10),
            size: TilePosition::new(2, 1),
            resource_amount: 1500,
        });
        let map = analyzed(&source);
        let owner = map.area_at_tile(TilePosition::new(10, 10)).unwrap();
        assert_eq!(owner.minerals(), &[0]);
        let other = map.areas().iter().find(|a| a.id() != owner.id()).unwrap();
        assert!(other.minerals().is_empty());
    }

    #[test]
    fn nearest_area_reaches_over_sea() {
        let map = analyzed(&two_rooms());
        // A walk position in the middle of the sea band still resolves.
        let area = map.nearest_area_walk(WalkPosition::new(140, 10)).unwrap();
        assert_eq!(area.id(), 1);
        let area = map.nearest_area_tile(TilePosition::new(44, 2)).unwrap();
        assert!(area.id() >= 1);
    }
}
