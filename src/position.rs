//! Positions at the three map scales.
//!
//! `Position` is measured in pixels, `WalkPosition` in minitiles (8 pixels)
//! and `TilePosition` in tiles (32 pixels). Conversions between scales are
//! explicit; truncating conversions round towards negative infinity is not
//! needed because all in-map coordinates are non-negative.

use serde::{Deserialize, Serialize};

/// Pixels per minitile.
pub const WALK_PIXELS: i32 = 8;
/// Pixels per tile.
pub const TILE_PIXELS: i32 = 32;
/// Minitiles per tile, along one axis.
pub const WALK_PER_TILE: i32 = 4;

/// A position in pixels.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

/// A position in minitiles (8x8 pixels).
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default, Serialize, Deserialize)]
pub struct WalkPosition {
    pub x: i32,
    pub y: i32,
}

/// A position in tiles (32x32 pixels).
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default, Serialize, Deserialize)]
pub struct TilePosition {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub const fn new(x: i32, y: i32) -> Self {
        Position { x, y }
    }

    pub fn to_walk(self) -> WalkPosition {
        WalkPosition::new(self.x / WALK_PIXELS, self.y / WALK_PIXELS)
    }

    pub fn to_tile(self) -> TilePosition {
        TilePosition::new(self.x / TILE_PIXELS, self.y / TILE_PIXELS)
    }

    /// Integer approximation of the euclidean distance in pixels.
    ///
    /// This is the classic octile approximation used by the game client;
    /// callers that need the exact value use `dist` instead.
    pub fn approx_distance(self, other: Self) -> i32 {
        let mut min = (self.x - other.x).abs() as u32;
        let mut max = (self.y - other.y).abs() as u32;
        if max < min {
            std::mem::swap(&mut min, &mut max);
        }
        if min < (max >> 2) {
            return max as i32;
        }
        let min_calc = (3 * min) >> 3;
        ((min_calc >> 5) + min_calc + max - (max >> 4) - (max >> 6)) as i32
    }

    pub fn dist(self, other: Self) -> f64 {
        let dx = (self.x - other.x) as f64;
        let dy = (self.y - other.y) as f64;
        (dx * dx + dy * dy).sqrt()
    }
}

impl WalkPosition {
    pub const fn new(x: i32, y: i32) -> Self {
        WalkPosition { x, y }
    }

    /// Top-left pixel of this minitile.
    pub fn to_position(self) -> Position {
        Position::new(self.x * WALK_PIXELS, self.y * WALK_PIXELS)
    }

    /// Center pixel of this minitile.
    pub fn center(self) -> Position {
        Position::new(
            self.x * WALK_PIXELS + WALK_PIXELS / 2,
            self.y * WALK_PIXELS + WALK_PIXELS / 2,
        )
    }

    pub fn to_tile(self) -> TilePosition {
        TilePosition::new(self.x / WALK_PER_TILE, self.y / WALK_PER_TILE)
    }

    /// Chebyshev distance: the number of king moves between two minitiles.
    pub fn queen_wise_dist(self, other: Self) -> i32 {
        (self.x - other.x).abs().max((self.y - other.y).abs())
    }

    pub fn dist(self, other: Self) -> f64 {
        let dx = (self.x - other.x) as f64;
        let dy = (self.y - other.y) as f64;
        (dx * dx + dy * dy).sqrt()
    }
}

impl TilePosition {
    pub const fn new(x: i32, y: i32) -> Self {
        TilePosition { x, y }
    }

    /// Top-left minitile of this tile.
    pub fn to_walk(self) -> WalkPosition {
        WalkPosition::new(self.x * WALK_PER_TILE, self.y * WALK_PER_TILE)
    }

    /// Top-left pixel of this tile.
    pub fn to_position(self) -> Position {
        Position::new(self.x * TILE_PIXELS, self.y * TILE_PIXELS)
    }

    /// Center pixel of this tile.
    pub fn center(self) -> Position {
        Position::new(
            self.x * TILE_PIXELS + TILE_PIXELS / 2,
            self.y * TILE_PIXELS + TILE_PIXELS / 2,
        )
    }

    pub fn queen_wise_dist(self, other: Self) -> i32 {
        (self.x - other.x).abs().max((self.y - other.y).abs())
    }

    pub fn dist(self, other: Self) -> f64 {
        let dx = (self.x - other.x) as f64;
        let dy = (self.y - other.y) as f64;
        (dx * dx + dy * dy).sqrt()
    }

    /// Euclidean distance rounded half towards positive infinity.
    ///
    /// The asymmetric rounding matters: base spacing decisions shift by a
    /// tile if this is replaced with round-half-to-even.
    pub fn rounded_dist(self, other: Self) -> i32 {
        (0.5 + self.dist(other)) as i32
    }
}

macro_rules! impl_vector_ops {
    ($name:ident) => {
        impl std::ops::Add for $name {
            type Output = Self;
            fn add(self, other: Self) -> Self {
                $name::new(self.x + other.x, self.y + other.y)
            }
        }

        impl std::ops::Sub for $name {
            type Output = Self;
            fn sub(self, other: Self) -> Self {
                $name::new(self.x - other.x, self.y - other.y)
            }
        }

        impl std::ops::Add<(i32, i32)> for $name {
            type Output = Self;
            fn add(self, other: (i32, i32)) -> Self {
                $name::new(self.x + other.0, self.y + other.1)
            }
        }

        impl std::ops::Mul<i32> for $name {
            type Output = Self;
            fn mul(self, factor: i32) -> Self {
                $name::new(self.x * factor, self.y * factor)
            }
        }
    };
}

impl_vector_ops!(Position);
impl_vector_ops!(WalkPosition);
impl_vector_ops!(TilePosition);

/// Pixel distance from a point to an axis-aligned rectangle given by its
/// top-left tile and size in tiles. Zero when the point lies inside.
pub fn dist_to_rectangle(p: Position, top_left: TilePosition, size: TilePosition) -> i32 {
    let rect_min = top_left.to_position();
    let rect_max = Position::new(
        rect_min.x + size.x * TILE_PIXELS - 1,
        rect_min.y + size.y * TILE_PIXELS - 1,
    );
    let cx = p.x.clamp(rect_min.x, rect_max.x);
    let cy = p.y.clamp(rect_min.y, rect_max.y);
    (0.5 + p.dist(Position::new(cx, cy))) as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scale_conversions_round_trip() {
        let t = TilePosition::new(3, 7);
        assert_eq!(t.to_walk(), WalkPosition::new(12, 28));
        assert_eq!(t.to_position(), Position::new(96, 224));
        assert_eq!(t.to_walk().to_tile(), t);
        assert_eq!(Position::new(97, 250).to_tile(), TilePosition::new(3, 7));
        assert_eq!(Position::new(97, 250).to_walk(), WalkPosition::new(12, 31));
    }

    #[test]
    fn queen_wise_is_chebyshev() {
        let a = WalkPosition::new(2, 2);
        assert_eq!(a.queen_wise_dist(WalkPosition::new(5, 3)), 3);
        assert_eq!(a.queen_wise_dist(WalkPosition::new(2, 2)), 0);
        assert_eq!(a.queen_wise_dist(WalkPosition::new(0, 9)), 7);
    }

    #[test]
    fn rounded_dist_rounds_half_up() {
        // dist((0,0), (3,4)) = 5.0 exactly
        assert_eq!(TilePosition::new(0, 0).rounded_dist(TilePosition::new(3, 4)), 5);
        // dist((0,0), (1,1)) = 1.414... -> 1
        assert_eq!(TilePosition::new(0, 0).rounded_dist(TilePosition::new(1, 1)), 1);
        // dist((0,0), (2,1)) = 2.236... -> 2
        assert_eq!(TilePosition::new(0, 0).rounded_dist(TilePosition::new(2, 1)), 2);
    }

    #[test]
    fn approx_distance_is_close_to_euclidean() {
        let a = Position::new(0, 0);
        for &(x, y) in &[(100, 0), (0, 100), (100, 100), (30, 40), (7, 123)] {
            let exact = a.dist(Position::new(x, y));
            let approx = a.approx_distance(Position::new(x, y)) as f64;
            assert!((approx - exact).abs() <= exact * 0.05 + 1.0);
        }
    }

    #[test]
    fn dist_to_rectangle_inside_is_zero() {
        let tl = TilePosition::new(2, 2);
        let size = TilePosition::new(2, 1);
        assert_eq!(dist_to_rectangle(Position::new(70, 70), tl, size), 0);
        // directly left of the rectangle, 14 px gap to x = 64
        assert_eq!(dist_to_rectangle(Position::new(50, 70), tl, size), 14);
    }
}
