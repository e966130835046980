use thiserror::Error;

/// Errors surfaced by the map analyzer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MapError {
    /// The snapshot reported a non-positive or oversized map.
    #[error("invalid map dimensions {width}x{height} tiles")]
    InvalidDimensions { width: i32, height: i32 },

    /// A query was issued before `Map::initialize` completed.
    #[error("map is not initialized")]
    Uninitialized,
}
