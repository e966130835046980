//! Chokepoints: the passages between neighbouring areas.

use crate::grid::AreaId;
use crate::neutral::NeutralIndex;
use crate::position::WalkPosition;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Global chokepoint index, unique across the whole map.
pub type ChokePointIndex = usize;

/// The three named nodes of a chokepoint's geometry.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Node {
    End1 = 0,
    Middle = 1,
    End2 = 2,
}

pub const NODE_COUNT: usize = 3;

/// A passage between two areas.
///
/// The geometry is the clustered frontier: walk positions ordered along the
/// frontier line, with the highest altitudes near the middle. A pseudo
/// chokepoint sits on a blocking neutral instead of a real frontier and has
/// a single-position geometry.
#[derive(Clone, Serialize, Deserialize)]
pub struct ChokePoint {
    index: ChokePointIndex,
    /// The two areas this chokepoint separates, smaller id first.
    areas: (AreaId, AreaId),
    geometry: VecDeque<WalkPosition>,
    nodes: [WalkPosition; NODE_COUNT],
    /// For each node, the nearest minitile inside each of the two areas.
    nodes_in_area: [[WalkPosition; 2]; NODE_COUNT],
    blocked: bool,
    pseudo: bool,
    blocking_neutral: Option<NeutralIndex>,
}

impl ChokePoint {
    pub(crate) fn new(
        index: ChokePointIndex,
        areas: (AreaId, AreaId),
        geometry: VecDeque<WalkPosition>,
        nodes: [WalkPosition; NODE_COUNT],
        nodes_in_area: [[WalkPosition; 2]; NODE_COUNT],
        blocking_neutral: Option<NeutralIndex>,
    ) -> ChokePoint {
        debug_assert!(!geometry.is_empty());
        debug_assert!(areas.0 < areas.1);
        ChokePoint {
            index,
            areas,
            geometry,
            nodes,
            nodes_in_area,
            blocked: blocking_neutral.is_some(),
            pseudo: blocking_neutral.is_some(),
            blocking_neutral,
        }
    }

    pub fn index(&self) -> ChokePointIndex {
        self.index
    }

    pub fn areas(&self) -> (AreaId, AreaId) {
        self.areas
    }

    /// The area of the pair that is not `id`.
    pub fn other_area(&self, id: AreaId) -> AreaId {
        if self.areas.0 == id {
            self.areas.1
        } else {
            self.areas.0
        }
    }

    pub fn geometry(&self) -> &VecDeque<WalkPosition> {
        &self.geometry
    }

    pub fn node(&self, node: Node) -> WalkPosition {
        self.nodes[node as usize]
    }

    /// Shorthand for the middle node, the natural "position" of the
    /// chokepoint.
    pub fn center(&self) -> WalkPosition {
        self.node(Node::Middle)
    }

    /// The nearest walkable minitile of `area` to the given node.
    pub fn pos_in_area(&self, node: Node, area: AreaId) -> WalkPosition {
        let side = if area == self.areas.0 { 0 } else { 1 };
        self.nodes_in_area[node as usize][side]
    }

    pub fn blocked(&self) -> bool {
        self.blocked
    }

    /// True for chokepoints synthesized on a blocking neutral.
    pub fn is_pseudo(&self) -> bool {
        self.pseudo
    }

    pub fn blocking_neutral(&self) -> Option<NeutralIndex> {
        self.blocking_neutral
    }

    pub(crate) fn set_blocking_neutral(&mut self, neutral: Option<NeutralIndex>) {
        self.blocking_neutral = neutral;
        if neutral.is_none() {
            self.blocked = false;
        }
    }
}
