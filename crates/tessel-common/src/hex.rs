//! Hexagonal coordinate geometry.
//!
//! Cube/axial coordinates, neighbors and distances, pixel conversion,
//! rounding of fractional coordinates and corner geometry.
//!
//! The free functions ([`pixel_to_hex`], [`hex_to_pixel`]) use the flat-top
//! layout with the origin at `(0, 0)`. The chunk grid of the world is a
//! pointy-top offset grid; use [`HexLayout::pointy`] together with
//! [`Hex::from_offset`] / [`Hex::to_offset`] for it.

use std::f64::consts::PI;
use std::ops::{Add, Mul, Sub};

use crate::error::{CoordError, CoordResult};

/// √3, used throughout the hex formulas.
pub const SQRT_3: f64 = 1.732_050_807_568_877_2;

/// A hexagon in cube coordinates (`q + r + s == 0`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Hex {
    q: i32,
    r: i32,
    s: i32,
}

impl Hex {
    /// The six unit direction vectors, counter-clockwise starting at +q.
    pub const DIRECTIONS: [Self; 6] = [
        Self::axial(1, 0),
        Self::axial(1, -1),
        Self::axial(0, -1),
        Self::axial(-1, 0),
        Self::axial(-1, 1),
        Self::axial(0, 1),
    ];

    /// The origin hexagon.
    pub const ORIGIN: Self = Self::axial(0, 0);

    /// Creates a hexagon from cube coordinates.
    ///
    /// # Panics
    /// Panics if `q + r + s != 0`. Malformed cube coordinates are a
    /// programming error; use [`Hex::try_new`] for untrusted input.
    #[must_use]
    pub fn new(q: i32, r: i32, s: i32) -> Self {
        assert!(
            q + r + s == 0,
            "cube coordinates must sum to zero, got ({q}, {r}, {s})"
        );
        Self { q, r, s }
    }

    /// Creates a hexagon from cube coordinates, rejecting invalid triples.
    pub fn try_new(q: i32, r: i32, s: i32) -> CoordResult<Self> {
        if q + r + s == 0 {
            Ok(Self { q, r, s })
        } else {
            Err(CoordError::InvalidCube { q, r, s })
        }
    }

    /// Creates a hexagon from axial coordinates.
    #[must_use]
    pub const fn axial(q: i32, r: i32) -> Self {
        Self { q, r, s: -q - r }
    }

    /// Q component.
    #[must_use]
    pub const fn q(self) -> i32 {
        self.q
    }

    /// R component.
    #[must_use]
    pub const fn r(self) -> i32 {
        self.r
    }

    /// S component.
    #[must_use]
    pub const fn s(self) -> i32 {
        self.s
    }

    /// Drops the redundant `s` component.
    #[must_use]
    pub const fn to_axial(self) -> (i32, i32) {
        (self.q, self.r)
    }

    /// Component-wise sum.
    #[must_use]
    pub const fn translate(self, other: Self) -> Self {
        Self::axial(self.q + other.q, self.r + other.r)
    }

    /// Component-wise difference.
    #[must_use]
    pub const fn subtract(self, other: Self) -> Self {
        Self::axial(self.q - other.q, self.r - other.r)
    }

    /// Multiplies every component by `k`.
    #[must_use]
    pub const fn scale(self, k: i32) -> Self {
        Self::axial(self.q * k, self.r * k)
    }

    /// Returns the neighbor in the given direction (taken modulo 6).
    #[must_use]
    pub fn neighbor(self, direction: usize) -> Self {
        self + Self::DIRECTIONS[direction % 6]
    }

    /// Returns all six neighbors in [`Hex::DIRECTIONS`] order.
    #[must_use]
    pub fn neighbors(self) -> [Self; 6] {
        Self::DIRECTIONS.map(|dir| self + dir)
    }

    /// Number of steps from the origin.
    #[must_use]
    pub const fn length(self) -> i32 {
        (self.q.abs() + (self.q + self.r).abs() + self.r.abs()) / 2
    }

    /// Number of steps between two hexagons.
    #[must_use]
    pub fn distance(self, other: Self) -> i32 {
        (self - other).length()
    }

    /// Converts "odd-r" offset coordinates (odd rows shifted right by half a
    /// hexagon) to a hexagon.
    #[must_use]
    pub const fn from_offset(col: i32, row: i32) -> Self {
        let q = col - (row - (row & 1)) / 2;
        Self::axial(q, row)
    }

    /// Converts to "odd-r" offset coordinates `(col, row)`.
    #[must_use]
    pub const fn to_offset(self) -> (i32, i32) {
        let col = self.q + (self.r - (self.r & 1)) / 2;
        (col, self.r)
    }
}

impl Add for Hex {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        self.translate(rhs)
    }
}

impl Sub for Hex {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        self.subtract(rhs)
    }
}

impl Mul<i32> for Hex {
    type Output = Self;

    fn mul(self, k: i32) -> Self {
        self.scale(k)
    }
}

/// A fractional axial coordinate, as produced by pixel conversion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FractionalHex {
    /// Fractional q
    pub q: f64,
    /// Fractional r
    pub r: f64,
}

impl FractionalHex {
    /// Fractional s, derived from `q` and `r`.
    #[must_use]
    pub fn s(self) -> f64 {
        -self.q - self.r
    }

    /// Rounds to the nearest valid hexagon.
    #[must_use]
    pub fn round(self) -> Hex {
        hex_round(self.q, self.r)
    }
}

/// Rounds fractional axial coordinates to the nearest hexagon.
///
/// Each cube component is rounded independently, then the component with
/// the largest rounding error is recomputed from the other two so the
/// result always satisfies `q + r + s == 0`.
#[must_use]
pub fn hex_round(q: f64, r: f64) -> Hex {
    let s = -q - r;

    let mut rq = q.round();
    let mut rr = r.round();
    let rs = s.round();

    let dq = (rq - q).abs();
    let dr = (rr - r).abs();
    let ds = (rs - s).abs();

    if dq > dr && dq > ds {
        rq = -rr - rs;
    } else if dr > ds {
        rr = -rq - rs;
    }
    // Otherwise s carries the error and is dropped by the axial form.

    Hex::axial(rq as i32, rr as i32)
}

/// Converts a pixel position to fractional axial coordinates (flat-top).
#[must_use]
pub fn pixel_to_hex(x: f64, y: f64, size: f64) -> FractionalHex {
    HexLayout::flat(size).pixel_to_hex(x, y)
}

/// Converts a hexagon to the pixel position of its center (flat-top):
/// `x = size * (3/2 * q)`, `y = size * (√3/2 * q + √3 * r)`.
#[must_use]
pub fn hex_to_pixel(hex: Hex, size: f64) -> (f64, f64) {
    HexLayout::flat(size).hex_to_pixel(hex)
}

/// Returns the six corners of a hexagon at 60° steps starting at 30°.
#[must_use]
pub fn corner_points(center_x: f64, center_y: f64, size: f64) -> [(f64, f64); 6] {
    corners_from(center_x, center_y, size, 30.0)
}

fn corners_from(center_x: f64, center_y: f64, size: f64, start_deg: f64) -> [(f64, f64); 6] {
    std::array::from_fn(|i| {
        let angle = PI / 180.0 * (start_deg + 60.0 * i as f64);
        (
            center_x + size * angle.cos(),
            center_y + size * angle.sin(),
        )
    })
}

/// Hexagon orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Orientation {
    /// Flat edge on top; columns are straight.
    Flat,
    /// Corner on top; rows are straight.
    Pointy,
}

impl Orientation {
    /// Forward matrix (hex -> pixel) as `[f0, f1, f2, f3]`.
    const fn forward(self) -> [f64; 4] {
        match self {
            Self::Flat => [1.5, 0.0, SQRT_3 / 2.0, SQRT_3],
            Self::Pointy => [SQRT_3, SQRT_3 / 2.0, 0.0, 1.5],
        }
    }

    /// Inverse matrix (pixel -> hex) as `[b0, b1, b2, b3]`.
    const fn inverse(self) -> [f64; 4] {
        match self {
            Self::Flat => [2.0 / 3.0, 0.0, -1.0 / 3.0, SQRT_3 / 3.0],
            Self::Pointy => [SQRT_3 / 3.0, -1.0 / 3.0, 0.0, 2.0 / 3.0],
        }
    }

    /// Angle of the first corner in degrees.
    const fn start_angle(self) -> f64 {
        match self {
            Self::Flat => 0.0,
            Self::Pointy => 30.0,
        }
    }
}

/// Maps hexagons to pixel space for a given orientation, size and origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HexLayout {
    /// Hexagon orientation
    pub orientation: Orientation,
    /// Hexagon radius (center to corner)
    pub size: f64,
    /// Pixel position of the origin hexagon's center
    pub origin: (f64, f64),
}

impl HexLayout {
    /// Flat-top layout centered at `(0, 0)`.
    #[must_use]
    pub const fn flat(size: f64) -> Self {
        Self {
            orientation: Orientation::Flat,
            size,
            origin: (0.0, 0.0),
        }
    }

    /// Pointy-top layout centered at `(0, 0)`.
    #[must_use]
    pub const fn pointy(size: f64) -> Self {
        Self {
            orientation: Orientation::Pointy,
            size,
            origin: (0.0, 0.0),
        }
    }

    /// Moves the origin hexagon's center to `(x, y)`.
    #[must_use]
    pub const fn with_origin(mut self, x: f64, y: f64) -> Self {
        self.origin = (x, y);
        self
    }

    /// Center of `hex` in pixels.
    #[must_use]
    pub fn hex_to_pixel(&self, hex: Hex) -> (f64, f64) {
        let [f0, f1, f2, f3] = self.orientation.forward();
        let q = f64::from(hex.q);
        let r = f64::from(hex.r);
        (
            (f0 * q + f1 * r) * self.size + self.origin.0,
            (f2 * q + f3 * r) * self.size + self.origin.1,
        )
    }

    /// Fractional hexagon under a pixel position.
    #[must_use]
    pub fn pixel_to_hex(&self, x: f64, y: f64) -> FractionalHex {
        let [b0, b1, b2, b3] = self.orientation.inverse();
        let px = (x - self.origin.0) / self.size;
        let py = (y - self.origin.1) / self.size;
        FractionalHex {
            q: b0 * px + b1 * py,
            r: b2 * px + b3 * py,
        }
    }

    /// Hexagon containing a pixel position.
    #[must_use]
    pub fn hex_at(&self, x: f64, y: f64) -> Hex {
        self.pixel_to_hex(x, y).round()
    }

    /// Corners of `hex` in pixels.
    #[must_use]
    pub fn corners(&self, hex: Hex) -> [(f64, f64); 6] {
        let (cx, cy) = self.hex_to_pixel(hex);
        corners_from(cx, cy, self.size, self.orientation.start_angle())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn test_new_accepts_valid_cube() {
        let hex = Hex::new(2, -3, 1);
        assert_eq!(hex.to_axial(), (2, -3));
        assert_eq!(hex.s(), 1);
    }

    #[test]
    #[should_panic(expected = "sum to zero")]
    fn test_new_rejects_invalid_cube() {
        let _ = Hex::new(1, 1, 1);
    }

    #[test]
    fn test_try_new_reports_invalid_cube() {
        assert_eq!(
            Hex::try_new(1, 0, 0),
            Err(CoordError::InvalidCube { q: 1, r: 0, s: 0 })
        );
    }

    #[test]
    fn test_arithmetic() {
        let a = Hex::axial(1, -2);
        let b = Hex::axial(3, 4);
        assert_eq!(a + b, Hex::axial(4, 2));
        assert_eq!(b - a, Hex::axial(2, 6));
        assert_eq!(a * 3, Hex::axial(3, -6));
        assert_eq!(a.scale(-1), Hex::axial(-1, 2));
        assert_eq!(a.translate(b), a + b);
        assert_eq!(b.subtract(a), b - a);
    }

    #[test]
    fn test_neighbors_are_adjacent_and_distinct() {
        let center = Hex::axial(5, -7);
        let neighbors = center.neighbors();
        for (i, n) in neighbors.iter().enumerate() {
            assert_eq!(center.distance(*n), 1);
            assert_eq!(*n, center.neighbor(i));
            for other in &neighbors[i + 1..] {
                assert_ne!(n, other);
            }
        }
    }

    #[test]
    fn test_distance() {
        assert_eq!(Hex::ORIGIN.distance(Hex::axial(3, -3)), 3);
        assert_eq!(Hex::axial(-2, 0).distance(Hex::axial(2, 0)), 4);
        assert_eq!(Hex::axial(1, 1).distance(Hex::axial(-1, -1)), 4);
    }

    #[test]
    fn test_hex_to_pixel_formula() {
        let (x, y) = hex_to_pixel(Hex::axial(2, 1), 30.0);
        assert!((x - 90.0).abs() < EPS);
        assert!((y - 30.0 * (SQRT_3 + SQRT_3)).abs() < EPS);
    }

    #[test]
    fn test_pixel_to_hex_inverts_hex_to_pixel() {
        for q in -5..=5 {
            for r in -5..=5 {
                let hex = Hex::axial(q, r);
                let (x, y) = hex_to_pixel(hex, 30.0);
                let frac = pixel_to_hex(x, y, 30.0);
                assert!((frac.q - f64::from(q)).abs() < EPS);
                assert!((frac.r - f64::from(r)).abs() < EPS);
                assert_eq!(frac.round(), hex);
            }
        }
    }

    #[test]
    fn test_pointy_layout_round_trip_with_origin() {
        let layout = HexLayout::pointy(30.0).with_origin(25.0, -10.0);
        for q in -4..=4 {
            for r in -4..=4 {
                let hex = Hex::axial(q, r);
                let (x, y) = layout.hex_to_pixel(hex);
                assert_eq!(layout.hex_at(x + 3.0, y - 2.0), hex);
            }
        }
    }

    #[test]
    fn test_corner_points() {
        let corners = corner_points(10.0, 20.0, 30.0);
        assert!((corners[0].0 - (10.0 + 30.0 * (PI / 6.0).cos())).abs() < EPS);
        assert!((corners[0].1 - (20.0 + 15.0)).abs() < EPS);
        for (x, y) in corners {
            let d = ((x - 10.0).powi(2) + (y - 20.0).powi(2)).sqrt();
            assert!((d - 30.0).abs() < EPS);
        }
        assert_eq!(
            HexLayout::pointy(30.0).corners(Hex::ORIGIN),
            corner_points(0.0, 0.0, 30.0)
        );
    }

    #[test]
    fn test_offset_conversion() {
        assert_eq!(Hex::from_offset(0, 0), Hex::ORIGIN);
        assert_eq!(Hex::from_offset(3, 1).to_axial(), (3, 1));
        assert_eq!(Hex::from_offset(3, 2).to_axial(), (2, 2));
        assert_eq!(Hex::from_offset(0, -1).to_axial(), (1, -1));
        for col in -6..=6 {
            for row in -6..=6 {
                assert_eq!(Hex::from_offset(col, row).to_offset(), (col, row));
            }
        }
    }

    #[test]
    fn test_round_breaks_ties_toward_valid_cube() {
        let hex = hex_round(0.5, 0.5);
        assert_eq!(hex.q() + hex.r() + hex.s(), 0);
        assert!(hex.distance(Hex::axial(0, 1)) <= 1);
    }

    proptest! {
        #[test]
        fn prop_round_always_valid(q in -1.0e4f64..1.0e4, r in -1.0e4f64..1.0e4) {
            let hex = hex_round(q, r);
            prop_assert_eq!(hex.q() + hex.r() + hex.s(), 0);
            prop_assert!((f64::from(hex.q()) - q).abs() <= 1.0);
            prop_assert!((f64::from(hex.r()) - r).abs() <= 1.0);
        }

        #[test]
        fn prop_round_keeps_integral_input(q in -10_000i32..10_000, r in -10_000i32..10_000) {
            prop_assert_eq!(hex_round(f64::from(q), f64::from(r)), Hex::axial(q, r));
        }

        #[test]
        fn prop_distance_is_a_metric(
            a in (-500i32..500, -500i32..500),
            b in (-500i32..500, -500i32..500),
            c in (-500i32..500, -500i32..500),
        ) {
            let (a, b, c) = (Hex::axial(a.0, a.1), Hex::axial(b.0, b.1), Hex::axial(c.0, c.1));
            prop_assert_eq!(a.distance(b), b.distance(a));
            prop_assert_eq!(a.distance(a), 0);
            prop_assert!(a.distance(c) <= a.distance(b) + b.distance(c));
        }
    }
}
