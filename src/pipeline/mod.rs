//! The one-shot analysis pipeline.
//!
//! `Map::initialize` drives these passes in a fixed order; each consumes the
//! grids and the results of the previous passes:
//!
//! 1. sea/lake segregation and the altitude field ([`altitude`])
//! 2. blocking-neutral door analysis ([`blocking`])
//! 3. watershed area growth ([`areas`])
//! 4. chokepoint extraction ([`chokepoints`])
//! 5. chokepoint distance and path matrices ([`paths`])
//! 6. base placement ([`bases`])

pub mod altitude;
pub mod areas;
pub mod bases;
pub mod blocking;
pub mod chokepoints;
pub mod paths;
