pub mod distance_2d;
pub mod polygon_2d;
pub mod rect;

pub use rect::Rect;

/// 2D point type.
pub type Point2 = nalgebra::Point2<f64>;

/// 2D vector type.
pub type Vector2 = nalgebra::Vector2<f64>;

/// Global geometric tolerance for floating-point comparisons.
pub const TOLERANCE: f64 = 1e-10;

/// Returns `true` if both coordinates of `p` are finite.
#[must_use]
pub fn is_finite(p: &Point2) -> bool {
    p.x.is_finite() && p.y.is_finite()
}

/// Linear interpolation between `a` and `b` at parameter `t`.
#[must_use]
pub fn lerp(a: &Point2, b: &Point2, t: f64) -> Point2 {
    Point2::new(a.x + (b.x - a.x) * t, a.y + (b.y - a.y) * t)
}
