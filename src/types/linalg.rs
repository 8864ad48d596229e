//! Linear algebra types for force platform geometry
//!
//! Fixed-size nalgebra aliases so corner sets and platform frames carry their
//! dimensions in the type.

use nalgebra::{Matrix3, Vector3};

// ===== Dimensions =====
pub const SPACE_DIM: usize = 3;
pub const CORNER_COUNT: usize = 4;

// ===== Geometry Types =====
pub type Vec3 = Vector3<f64>;
pub type Rotation3 = Matrix3<f64>;

/// Corner points of one platform in vendor winding order, global frame.
pub type Corners = [Vec3; CORNER_COUNT];

/// Plain arrays for serialization.
pub fn vec3_to_array(v: &Vec3) -> [f64; SPACE_DIM] {
    [v.x, v.y, v.z]
}

pub fn rotation_to_rows(m: &Rotation3) -> [[f64; SPACE_DIM]; SPACE_DIM] {
    let mut rows = [[0.0; SPACE_DIM]; SPACE_DIM];
    for (r, row) in rows.iter_mut().enumerate() {
        for (c, value) in row.iter_mut().enumerate() {
            *value = m[(r, c)];
        }
    }
    rows
}
