//! Pure distance and overlap math used by combat, pickup and placement.

use crate::{PLAYER_HEIGHT, PLAYER_WIDTH};

/// Euclidean distance between two points.
pub fn distance(ax: f32, ay: f32, bx: f32, by: f32) -> f32 {
    let dx = bx - ax;
    let dy = by - ay;
    (dx * dx + dy * dy).sqrt()
}

/// Range test on a relative offset, boundary inclusive.
pub fn within_range(dx: f32, dy: f32, radius: f32) -> bool {
    (dx * dx + dy * dy).sqrt() <= radius
}

/// Axis-aligned separation test between two player corners, using the fixed
/// sprite half-extents. True when the footprints (100x140 centered boxes)
/// overlap.
pub fn footprints_overlap(ax: f32, ay: f32, bx: f32, by: f32) -> bool {
    (ax - bx).abs() <= PLAYER_WIDTH && (ay - by).abs() <= PLAYER_HEIGHT
}

/// Per-axis displacement for intent-based movement. `axis` and `other` are
/// the held-key components on this axis and the perpendicular one, each in
/// {-1, 0, 1}. Scaling by `sqrt(2 - other^2) / sqrt(2)` keeps diagonal
/// movement from exceeding the single-axis speed.
pub fn diagonal_step(axis: f32, other: f32, speed: f32) -> f32 {
    speed * axis * (2.0 - other * other).sqrt() / std::f32::consts::SQRT_2
}
