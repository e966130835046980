//! Neutral units: mineral patches, vespene geysers and static buildings.
//!
//! Neutrals are stored in one arena and referenced by index everywhere else.
//! Neutrals sharing an identical tile footprint form a stack: the covering
//! tile points at the bottom element and `next_stacked` links upwards.

use crate::grid::{GridArray, Tile};
use crate::position::*;
use log::warn;
use serde::{Deserialize, Serialize};

/// Index of a neutral in the map's registry.
pub type NeutralIndex = usize;

/// Static building subtype relevant to ingestion.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BuildingKind {
    PitDoor,
    RightPitDoor,
    Other,
}

/// Raw neutral-unit descriptor supplied by the terrain snapshot.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NeutralUnit {
    /// Caller-chosen identifier, echoed back by the destruction hooks.
    pub id: u32,
    pub kind: NeutralUnitKind,
    pub top_left: TilePosition,
    /// Footprint in tiles.
    pub size: TilePosition,
    /// Initial resource amount; meaningful for minerals and geysers only.
    pub resource_amount: i32,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum NeutralUnitKind {
    Mineral,
    Geyser,
    StaticBuilding(BuildingKind),
    /// An egg, possibly wrapping the building it will hatch into.
    Egg(Option<BuildingKind>),
}

/// Variant payload of a registered neutral.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum NeutralKind {
    Mineral { initial_amount: i32 },
    Geyser { initial_amount: i32 },
    StaticBuilding,
}

/// A registered neutral obstacle.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Neutral {
    id: u32,
    kind: NeutralKind,
    top_left: TilePosition,
    size: TilePosition,
    next_stacked: Option<NeutralIndex>,
    blocking: bool,
    /// One walk position per side the neutral separates; resolved to areas
    /// once area ids exist.
    blocked_doors: Vec<WalkPosition>,
    destroyed: bool,
}

impl Neutral {
    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn kind(&self) -> NeutralKind {
        self.kind
    }

    pub fn is_mineral(&self) -> bool {
        matches!(self.kind, NeutralKind::Mineral { .. })
    }

    pub fn is_geyser(&self) -> bool {
        matches!(self.kind, NeutralKind::Geyser { .. })
    }

    pub fn is_static_building(&self) -> bool {
        matches!(self.kind, NeutralKind::StaticBuilding)
    }

    pub fn initial_amount(&self) -> i32 {
        match self.kind {
            NeutralKind::Mineral { initial_amount } => initial_amount,
            NeutralKind::Geyser { initial_amount } => initial_amount,
            NeutralKind::StaticBuilding => 0,
        }
    }

    pub fn top_left(&self) -> TilePosition {
        self.top_left
    }

    pub fn size(&self) -> TilePosition {
        self.size
    }

    pub fn bottom_right(&self) -> TilePosition {
        self.top_left + self.size + (-1, -1)
    }

    /// Center of the footprint in pixels.
    pub fn center(&self) -> Position {
        self.top_left.to_position() + Position::new(self.size.x * 16, self.size.y * 16)
    }

    /// The neutral stacked directly above this one, if any.
    pub fn next_stacked(&self) -> Option<NeutralIndex> {
        self.next_stacked
    }

    pub fn blocking(&self) -> bool {
        self.blocking
    }

    pub(crate) fn set_blocking(&mut self, doors: &[WalkPosition]) {
        self.blocking = true;
        self.blocked_doors = doors.to_vec();
    }

    /// Walk positions of the true doors recorded by blocking detection.
    pub(crate) fn blocked_doors(&self) -> &[WalkPosition] {
        &self.blocked_doors
    }

    pub(crate) fn destroyed(&self) -> bool {
        self.destroyed
    }

    pub fn tiles(&self) -> impl Iterator<Item = TilePosition> + '_ {
        let tl = self.top_left;
        let size = self.size;
        (0..size.y).flat_map(move |dy| (0..size.x).map(move |dx| tl + (dx, dy)))
    }
}

/// The neutral arena plus the special-case ingestion rules.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct Neutrals {
    all: Vec<Neutral>,
}

impl Neutrals {
    pub fn len(&self) -> usize {
        self.all.len()
    }

    pub fn is_empty(&self) -> bool {
        self.all.is_empty()
    }

    pub fn get(&self, index: NeutralIndex) -> &Neutral {
        &self.all[index]
    }

    pub(crate) fn get_mut(&mut self, index: NeutralIndex) -> &mut Neutral {
        &mut self.all[index]
    }

    /// Live neutrals with their indices.
    pub fn iter(&self) -> impl Iterator<Item = (NeutralIndex, &Neutral)> {
        self.all
            .iter()
            .enumerate()
            .filter(|(_, n)| !n.destroyed)
    }

    pub fn minerals(&self) -> impl Iterator<Item = (NeutralIndex, &Neutral)> {
        self.iter().filter(|(_, n)| n.is_mineral())
    }

    pub fn geysers(&self) -> impl Iterator<Item = (NeutralIndex, &Neutral)> {
        self.iter().filter(|(_, n)| n.is_geyser())
    }

    pub fn static_buildings(&self) -> impl Iterator<Item = (NeutralIndex, &Neutral)> {
        self.iter().filter(|(_, n)| n.is_static_building())
    }

    pub fn find_by_id(&self, id: u32) -> Option<NeutralIndex> {
        self.all
            .iter()
            .position(|n| n.id == id && !n.destroyed)
    }

    /// Registers all snapshot units, applying the special ingestion cases
    /// and stacking rules, and records the stack bottoms on the tiles.
    pub(crate) fn load(units: &[NeutralUnit], tiles: &mut GridArray<Tile>) -> Neutrals {
        let mut neutrals = Neutrals::default();
        for unit in units {
            let (kind, top_left) = match unit.kind {
                NeutralUnitKind::Mineral => (
                    NeutralKind::Mineral {
                        initial_amount: unit.resource_amount,
                    },
                    unit.top_left,
                ),
                NeutralUnitKind::Geyser => (
                    NeutralKind::Geyser {
                        initial_amount: unit.resource_amount,
                    },
                    unit.top_left,
                ),
                NeutralUnitKind::StaticBuilding(building) => {
                    (NeutralKind::StaticBuilding, adjusted_top_left(unit.top_left, building))
                }
                // Eggs only matter when they wrap one of the pit door
                // specials; anything else hatches and leaves the map.
                NeutralUnitKind::Egg(Some(building))
                    if matches!(building, BuildingKind::PitDoor | BuildingKind::RightPitDoor) =>
                {
                    (NeutralKind::StaticBuilding, adjusted_top_left(unit.top_left, building))
                }
                NeutralUnitKind::Egg(_) => continue,
            };
            neutrals.add(unit.id, kind, top_left, unit.size, tiles);
        }
        neutrals
    }

    fn add(
        &mut self,
        id: u32,
        kind: NeutralKind,
        top_left: TilePosition,
        size: TilePosition,
        tiles: &mut GridArray<Tile>,
    ) {
        if !tiles.is_inside(top_left.x, top_left.y) {
            debug_assert!(false, "neutral {} outside the map at {:?}", id, top_left);
            warn!("ignoring neutral {} outside the map at {:?}", id, top_left);
            return;
        }
        let index = self.all.len();
        if let Some(bottom) = tiles.get(top_left.x, top_left.y).neutral() {
            // A neutral already sits here: candidate must stack exactly.
            let top = self.top_of_stack(bottom);
            let anchor = &self.all[top];
            let compatible = anchor.top_left == top_left
                && anchor.size == size
                && std::mem::discriminant(&anchor.kind) == std::mem::discriminant(&kind)
                && !anchor.is_geyser();
            if !compatible {
                debug_assert!(false, "mismatched neutral stack at {:?}", top_left);
                warn!(
                    "ignoring neutral {} at {:?}: does not stack with the occupant",
                    id, top_left
                );
                return;
            }
            self.all[top].next_stacked = Some(index);
        } else {
            for t in (0..size.y).flat_map(|dy| (0..size.x).map(move |dx| top_left + (dx, dy))) {
                // First come keeps the tile; overlapping footprints with
                // different top-lefts are an input anomaly.
                if tiles.is_inside(t.x, t.y) && tiles.get(t.x, t.y).neutral().is_none() {
                    tiles.get_mut(t.x, t.y).set_neutral(Some(index));
                }
            }
        }
        self.all.push(Neutral {
            id,
            kind,
            top_left,
            size,
            next_stacked: None,
            blocking: false,
            blocked_doors: Vec::new(),
            destroyed: false,
        });
    }

    fn top_of_stack(&self, bottom: NeutralIndex) -> NeutralIndex {
        let mut current = bottom;
        while let Some(next) = self.all[current].next_stacked {
            current = next;
        }
        current
    }

    /// Detaches a neutral from its stack and from the covering tiles,
    /// promoting the next stacked element to stack bottom if needed.
    pub(crate) fn remove(&mut self, index: NeutralIndex, tiles: &mut GridArray<Tile>) {
        let top_left = self.all[index].top_left;
        let footprint: Vec<TilePosition> = self.all[index].tiles().collect();
        let next = self.all[index].next_stacked.take();
        self.all[index].destroyed = true;

        let bottom = tiles.get(top_left.x, top_left.y).neutral();
        if bottom == Some(index) {
            for t in footprint {
                if tiles.is_inside(t.x, t.y) && tiles.get(t.x, t.y).neutral() == Some(index) {
                    tiles.get_mut(t.x, t.y).set_neutral(next);
                }
            }
        } else if let Some(bottom) = bottom {
            // Unlink from the middle of the stack.
            let mut current = bottom;
            loop {
                match self.all[current].next_stacked {
                    Some(n) if n == index => {
                        self.all[current].next_stacked = next;
                        break;
                    }
                    Some(n) => current = n,
                    None => break,
                }
            }
        }
    }
}

fn adjusted_top_left(top_left: TilePosition, building: BuildingKind) -> TilePosition {
    match building {
        // The right pit door sprite sits one tile left of its footprint.
        BuildingKind::RightPitDoor => top_left + (1, 0),
        _ => top_left,
    }
}
