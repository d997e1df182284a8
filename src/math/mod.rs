pub mod bounds;

use glam::Vec3;

/// Converts an authoring-space vector (Z up) to the consumer's convention (Y up).
pub fn z_up_to_y_up(v: Vec3) -> Vec3 {
    Vec3::new(v.x, v.z, -v.y)
}

/// Rounds each component to four decimals, folding negative zero into zero.
pub fn round4(v: Vec3) -> [f32; 3] {
    v.to_array().map(|c| {
        let rounded = (c * 10_000.0).round() / 10_000.0;
        if rounded == 0.0 {
            0.0
        } else {
            rounded
        }
    })
}
