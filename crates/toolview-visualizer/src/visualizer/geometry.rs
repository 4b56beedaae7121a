//! Segment geometry
//!
//! Each movement is drawn as an open cylinder (no caps) from its start to
//! its end point. Per face the generator emits two triangles joining the
//! start ring and the end ring, so a cylinder with `sides` faces always has
//! `sides * 6` vertices.
//!
//! Vertex normals are the outward radial unit vectors at each ring point,
//! not the flat face normals, so lighting is smooth around the cylinder.

use glam::Vec3;
use std::f32::consts::TAU;
use toolview_core::DEGENERATE_SEGMENT_EPSILON;

/// Triangle-list geometry for one cylinder.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CylinderGeometry {
    pub vertices: Vec<Vec3>,
    pub normals: Vec<Vec3>,
}

impl CylinderGeometry {
    /// True for a degenerate segment.
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }
}

/// Two unit vectors perpendicular to `direction` and to each other.
///
/// The reference axis is X unless `direction` is close to X, in which case Y
/// is used so the cross product never collapses.
pub fn perpendicular_basis(direction: Vec3) -> (Vec3, Vec3) {
    let reference = if direction.x.abs() < 0.9 {
        Vec3::X
    } else {
        Vec3::Y
    };

    let perp1 = direction.cross(reference).normalize();
    let perp2 = direction.cross(perp1).normalize();
    (perp1, perp2)
}

/// Generate the cylinder between `start` and `end`.
///
/// Returns empty geometry when the segment is shorter than
/// [`DEGENERATE_SEGMENT_EPSILON`] or `sides` is zero.
pub fn generate_cylinder(start: Vec3, end: Vec3, radius: f32, sides: u32) -> CylinderGeometry {
    let axis = end - start;
    let length = axis.length();

    if length < DEGENERATE_SEGMENT_EPSILON || sides == 0 {
        return CylinderGeometry::default();
    }

    let direction = axis / length;
    let (perp1, perp2) = perpendicular_basis(direction);

    let capacity = sides as usize * 6;
    let mut vertices = Vec::with_capacity(capacity);
    let mut normals = Vec::with_capacity(capacity);

    let ring_normal = |i: u32| {
        let angle = TAU * (i % sides) as f32 / sides as f32;
        let (sin, cos) = angle.sin_cos();
        perp1 * cos + perp2 * sin
    };

    for i in 0..sides {
        let normal1 = ring_normal(i);
        let normal2 = ring_normal(i + 1);

        let v1_start = start + normal1 * radius;
        let v2_start = start + normal2 * radius;
        let v1_end = end + normal1 * radius;
        let v2_end = end + normal2 * radius;

        vertices.extend_from_slice(&[v1_start, v2_start, v1_end]);
        normals.extend_from_slice(&[normal1, normal2, normal1]);

        vertices.extend_from_slice(&[v2_start, v2_end, v1_end]);
        normals.extend_from_slice(&[normal2, normal2, normal1]);
    }

    CylinderGeometry { vertices, normals }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOL: f32 = 1e-5;

    #[test]
    fn test_unit_cylinder_along_z() {
        let geometry = generate_cylinder(Vec3::ZERO, Vec3::Z, 1.0, 4);

        assert_eq!(geometry.len(), 24);
        assert_eq!(geometry.normals.len(), 24);

        for v in &geometry.vertices {
            let radial = (v.x * v.x + v.y * v.y).sqrt();
            assert!((radial - 1.0).abs() < TOL, "vertex {:?} off the surface", v);
            assert!(v.z.abs() < TOL || (v.z - 1.0).abs() < TOL);
        }
    }

    #[test]
    fn test_normals_are_radial_unit_vectors() {
        let start = Vec3::new(1.0, 2.0, 0.3);
        let end = Vec3::new(4.0, -1.0, 0.3);
        let geometry = generate_cylinder(start, end, 0.25, 8);
        let direction = (end - start).normalize();

        for (v, n) in geometry.vertices.iter().zip(&geometry.normals) {
            assert!((n.length() - 1.0).abs() < TOL);
            assert!(n.dot(direction).abs() < TOL);

            // vertex sits at radius along its normal from the nearest axis point
            let along = (*v - start).dot(direction);
            let axis_point = start + direction * along;
            assert!((*v - axis_point - *n * 0.25).length() < 1e-4);
        }
    }

    #[test]
    fn test_degenerate_segment_is_empty() {
        let p = Vec3::new(5.0, 5.0, 5.0);
        assert!(generate_cylinder(p, p, 0.1, 8).is_empty());
        assert!(generate_cylinder(p, p + Vec3::splat(1e-8), 0.1, 8).is_empty());
        assert!(generate_cylinder(Vec3::ZERO, Vec3::X, 0.1, 0).is_empty());
    }

    #[test]
    fn test_direction_along_x_uses_y_reference() {
        let (perp1, perp2) = perpendicular_basis(Vec3::X);
        assert!(perp1.is_finite() && perp2.is_finite());
        assert!(perp1.dot(Vec3::X).abs() < TOL);
        assert!(perp2.dot(Vec3::X).abs() < TOL);
        assert!(perp1.dot(perp2).abs() < TOL);

        let geometry = generate_cylinder(Vec3::ZERO, Vec3::new(10.0, 0.0, 0.0), 0.1, 8);
        assert_eq!(geometry.len(), 48);
        assert!(geometry.vertices.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_output_is_deterministic() {
        let a = generate_cylinder(Vec3::ZERO, Vec3::new(1.0, 1.0, 0.2), 0.1, 8);
        let b = generate_cylinder(Vec3::ZERO, Vec3::new(1.0, 1.0, 0.2), 0.1, 8);
        assert_eq!(a, b);
    }

    #[test]
    fn test_ring_wraps_to_first_face() {
        let geometry = generate_cylinder(Vec3::ZERO, Vec3::Z, 1.0, 4);
        // last face's second ring point is the first face's first ring point
        let last_face = &geometry.vertices[18..24];
        assert!((last_face[0] - geometry.vertices[0]).length() > TOL);
        assert!((geometry.vertices[19] - geometry.vertices[0]).length() < TOL);
    }
}
