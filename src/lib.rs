//! Static map analyzer for Brood War style tile maps.
//!
//! Feed [`Map::initialize`] a [`TerrainSource`] snapshot (tile/minitile
//! grids, starting locations, neutral units) and it derives the map's
//! decomposition into [`Area`]s, [`ChokePoint`]s and [`Base`]s, plus ground
//! distances and chokepoint paths between every pair of chokepoints.

pub mod area;
pub mod base;
pub mod chokepoint;
pub mod constants;
pub mod error;
pub mod grid;
pub mod map;
pub mod neutral;
pub mod pipeline;
pub mod position;
pub mod search;

pub use area::Area;
pub use base::Base;
pub use chokepoint::{ChokePoint, ChokePointIndex, Node};
pub use error::MapError;
pub use grid::{Altitude, AreaId, GroundHeight, GroupId, MiniTile, TerrainSource, Tile};
pub use map::Map;
pub use neutral::{BuildingKind, Neutral, NeutralUnit, NeutralUnitKind, Neutrals};
pub use position::{Position, TilePosition, WalkPosition};
