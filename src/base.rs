//! Bases: suggested command center locations with assigned resources.

use crate::constants::COMMAND_CENTER_SIZE;
use crate::grid::AreaId;
use crate::neutral::NeutralIndex;
use crate::position::*;
use serde::{Deserialize, Serialize};

/// A command center location inside an area.
///
/// The assigned minerals and geysers are exclusive to this base.
#[derive(Clone, Serialize, Deserialize)]
pub struct Base {
    area: AreaId,
    location: TilePosition,
    center: Position,
    minerals: Vec<NeutralIndex>,
    geysers: Vec<NeutralIndex>,
    /// Low-amount minerals overlapping the location that must be cleared
    /// before building.
    blocking_minerals: Vec<NeutralIndex>,
    starting: bool,
}

impl Base {
    pub(crate) fn new(
        area: AreaId,
        location: TilePosition,
        blocking_minerals: Vec<NeutralIndex>,
    ) -> Base {
        Base {
            area,
            location,
            center: center_of(location),
            minerals: Vec::new(),
            geysers: Vec::new(),
            blocking_minerals,
            starting: false,
        }
    }

    pub fn area(&self) -> AreaId {
        self.area
    }

    /// Top-left tile of the command center.
    pub fn location(&self) -> TilePosition {
        self.location
    }

    /// Center of the command center in pixels.
    pub fn center(&self) -> Position {
        self.center
    }

    pub fn minerals(&self) -> &[NeutralIndex] {
        &self.minerals
    }

    pub fn geysers(&self) -> &[NeutralIndex] {
        &self.geysers
    }

    pub fn blocking_minerals(&self) -> &[NeutralIndex] {
        &self.blocking_minerals
    }

    /// True when a starting location was matched to this base.
    pub fn starting(&self) -> bool {
        self.starting
    }

    pub(crate) fn add_mineral(&mut self, mineral: NeutralIndex) {
        self.minerals.push(mineral);
    }

    pub(crate) fn add_geyser(&mut self, geyser: NeutralIndex) {
        self.geysers.push(geyser);
    }

    pub(crate) fn remove_mineral(&mut self, mineral: NeutralIndex) {
        self.minerals.retain(|&m| m != mineral);
        self.blocking_minerals.retain(|&m| m != mineral);
    }

    /// Adopts the actual starting location reported by the snapshot.
    pub(crate) fn set_starting_location(&mut self, location: TilePosition) {
        self.starting = true;
        self.location = location;
        self.center = center_of(location);
    }
}

fn center_of(location: TilePosition) -> Position {
    location.to_position()
        + Position::new(
            COMMAND_CENTER_SIZE.x * TILE_PIXELS / 2,
            COMMAND_CENTER_SIZE.y * TILE_PIXELS / 2,
        )
}
