use glam::{Affine3A, Mat3, Vec3};

use crate::error::ObjectError;
use crate::model::MeshData;

/// Bakes `placement` into a copy of the mesh and moves its origin to `center`:
/// every vertex becomes `placement(v) - center`.
///
/// Normals follow the inverse-transpose of the linear part, and triangles are
/// rewound when the placement mirrors the geometry.
pub fn recenter(
    mesh: &MeshData,
    placement: Affine3A,
    center: Vec3,
) -> Result<MeshData, ObjectError> {
    mesh.validate()?;

    let linear = Mat3::from(placement.matrix3);
    let determinant = linear.determinant();
    if !determinant.is_finite() || determinant.abs() < f32::EPSILON.powi(2) {
        return Err(ObjectError::DegenerateTransform);
    }

    let normal_matrix = linear.inverse().transpose();

    let mut baked = mesh.clone();
    baked.positions = mesh
        .positions
        .iter()
        .map(|&position| placement.transform_point3(position) - center)
        .collect();
    baked.normals = mesh
        .normals
        .iter()
        .map(|&normal| (normal_matrix * normal).normalize_or_zero())
        .collect();

    if determinant < 0.0 {
        baked.flip_winding();
    }

    Ok(baked)
}
