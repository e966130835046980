//! Areas: the regions of the map decomposition.

use crate::base::Base;
use crate::chokepoint::ChokePointIndex;
use crate::grid::{Altitude, AreaId, GroupId};
use crate::neutral::NeutralIndex;
use crate::position::*;
use fnv::FnvHashMap;
use serde::{Deserialize, Serialize};

/// A maximal set of connected minitiles grown by the watershed pass.
///
/// Areas are stored in one vector indexed by `id - 1`; all cross-references
/// (neighbours, chokepoints, resources) are indices into sibling arenas.
#[derive(Clone, Serialize, Deserialize)]
pub struct Area {
    id: AreaId,
    group_id: GroupId,
    /// Walk position of the highest-altitude minitile.
    top: WalkPosition,
    max_altitude: Altitude,
    mini_tiles: usize,
    tiles: usize,
    buildable_tiles: usize,
    high_ground_tiles: usize,
    very_high_ground_tiles: usize,
    top_left: TilePosition,
    bottom_right: TilePosition,
    choke_points_by_area: FnvHashMap<AreaId, Vec<ChokePointIndex>>,
    accessible_neighbours: Vec<AreaId>,
    minerals: Vec<NeutralIndex>,
    geysers: Vec<NeutralIndex>,
    bases: Vec<Base>,
}

impl Area {
    pub(crate) fn new(id: AreaId, top: WalkPosition, max_altitude: Altitude, mini_tiles: usize) -> Area {
        Area {
            id,
            group_id: 0,
            top,
            max_altitude,
            mini_tiles,
            tiles: 0,
            buildable_tiles: 0,
            high_ground_tiles: 0,
            very_high_ground_tiles: 0,
            top_left: TilePosition::new(i32::MAX, i32::MAX),
            bottom_right: TilePosition::new(i32::MIN, i32::MIN),
            choke_points_by_area: FnvHashMap::default(),
            accessible_neighbours: Vec::new(),
            minerals: Vec::new(),
            geysers: Vec::new(),
            bases: Vec::new(),
        }
    }

    pub fn id(&self) -> AreaId {
        self.id
    }

    /// Areas with equal group ids are mutually reachable through
    /// non-blocked chokepoints.
    pub fn group_id(&self) -> GroupId {
        self.group_id
    }

    pub(crate) fn set_group_id(&mut self, group_id: GroupId) {
        self.group_id = group_id;
    }

    pub fn top(&self) -> WalkPosition {
        self.top
    }

    pub fn max_altitude(&self) -> Altitude {
        self.max_altitude
    }

    /// Number of minitiles belonging to this area.
    pub fn mini_tiles(&self) -> usize {
        self.mini_tiles
    }

    /// Number of tiles whose aggregate area id is this area.
    pub fn tiles(&self) -> usize {
        self.tiles
    }

    pub fn buildable_tiles(&self) -> usize {
        self.buildable_tiles
    }

    pub fn high_ground_tiles(&self) -> usize {
        self.high_ground_tiles
    }

    pub fn very_high_ground_tiles(&self) -> usize {
        self.very_high_ground_tiles
    }

    /// Bounding box over the tiles counted in `tiles()`.
    pub fn bounding_box(&self) -> (TilePosition, TilePosition) {
        (self.top_left, self.bottom_right)
    }

    /// The chokepoints shared with one neighbouring area.
    pub fn choke_points_with(&self, neighbour: AreaId) -> &[ChokePointIndex] {
        self.choke_points_by_area
            .get(&neighbour)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// All neighbouring areas and the chokepoints shared with each.
    pub fn choke_points_by_area(&self) -> &FnvHashMap<AreaId, Vec<ChokePointIndex>> {
        &self.choke_points_by_area
    }

    /// Every chokepoint on this area's frontier.
    pub fn choke_points(&self) -> impl Iterator<Item = ChokePointIndex> + '_ {
        self.choke_points_by_area.values().flatten().copied()
    }

    /// Neighbours reachable through at least one non-blocked chokepoint.
    pub fn accessible_neighbours(&self) -> &[AreaId] {
        &self.accessible_neighbours
    }

    /// True when a ground path exists between the two areas.
    pub fn accessible_from(&self, other: &Area) -> bool {
        self.group_id == other.group_id
    }

    pub fn minerals(&self) -> &[NeutralIndex] {
        &self.minerals
    }

    pub fn geysers(&self) -> &[NeutralIndex] {
        &self.geysers
    }

    pub fn bases(&self) -> &[Base] {
        &self.bases
    }

    pub(crate) fn bases_mut(&mut self) -> &mut Vec<Base> {
        &mut self.bases
    }

    pub(crate) fn add_choke_point(&mut self, neighbour: AreaId, index: ChokePointIndex) {
        self.choke_points_by_area
            .entry(neighbour)
            .or_default()
            .push(index);
    }

    pub(crate) fn set_accessible_neighbours(&mut self, neighbours: Vec<AreaId>) {
        self.accessible_neighbours = neighbours;
    }

    pub(crate) fn add_mineral(&mut self, mineral: NeutralIndex) {
        self.minerals.push(mineral);
    }

    pub(crate) fn add_geyser(&mut self, geyser: NeutralIndex) {
        self.geysers.push(geyser);
    }

    pub(crate) fn remove_mineral(&mut self, mineral: NeutralIndex) {
        self.minerals.retain(|&m| m != mineral);
        for base in &mut self.bases {
            base.remove_mineral(mineral);
        }
    }

    /// Accumulates one tile worth of aggregate statistics.
    pub(crate) fn add_tile_information(&mut self, t: TilePosition, buildable: bool, height: crate::grid::GroundHeight) {
        self.tiles += 1;
        if buildable {
            self.buildable_tiles += 1;
        }
        match height {
            crate::grid::GroundHeight::High => self.high_ground_tiles += 1,
            crate::grid::GroundHeight::VeryHigh => self.very_high_ground_tiles += 1,
            crate::grid::GroundHeight::Low => {}
        }
        self.top_left.x = self.top_left.x.min(t.x);
        self.top_left.y = self.top_left.y.min(t.y);
        self.bottom_right.x = self.bottom_right.x.max(t.x);
        self.bottom_right.y = self.bottom_right.y.max(t.y);
    }
}
