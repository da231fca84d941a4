//! Look-at camera for the graph view.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec2, Vec3};

/// Camera data uploaded for sprite and line pipelines.
///
/// `right` and `up` are the camera basis in world space, used to expand
/// billboards so they always face the viewer.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct CameraUniform {
    pub view_proj: [[f32; 4]; 4],
    pub right: [f32; 4],
    pub up: [f32; 4],
}

/// Perspective camera looking from `position` at `target`.
#[derive(Debug, Clone)]
pub struct Camera {
    pub position: Vec3,
    /// Point the camera looks at.
    pub target: Vec3,
    /// Vertical field of view in radians.
    pub fov_y: f32,
    /// Width / height.
    pub aspect_ratio: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, 300.0),
            target: Vec3::ZERO,
            fov_y: 60f32.to_radians(),
            aspect_ratio: 16.0 / 9.0,
            near: 0.1,
            far: 10_000.0,
        }
    }
}

impl Camera {
    /// Unit vector from the camera towards its target. `-Z` when degenerate.
    pub fn forward(&self) -> Vec3 {
        (self.target - self.position)
            .try_normalize()
            .unwrap_or(Vec3::NEG_Z)
    }

    /// World up used for the view basis, swapped out when looking straight up or down.
    fn reference_up(&self) -> Vec3 {
        if self.forward().dot(Vec3::Y).abs() > 0.999 {
            Vec3::Z
        } else {
            Vec3::Y
        }
    }

    pub fn right(&self) -> Vec3 {
        self.forward().cross(self.reference_up()).normalize()
    }

    pub fn up(&self) -> Vec3 {
        self.right().cross(self.forward())
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_to_rh(self.position, self.forward(), self.reference_up())
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y, self.aspect_ratio, self.near, self.far)
    }

    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// Update the aspect ratio from a surface size. Zero heights are ignored.
    pub fn set_aspect_ratio(&mut self, width: f32, height: f32) {
        if height > 0.0 {
            self.aspect_ratio = width / height;
        }
    }

    /// Distance between the camera and its target.
    pub fn distance(&self) -> f32 {
        self.position.distance(self.target)
    }

    /// Project a world point into window pixels (origin top-left).
    ///
    /// Returns `None` for points behind the camera.
    pub fn project(&self, world: Vec3, viewport: Vec2) -> Option<Vec2> {
        let clip = self.view_projection_matrix() * world.extend(1.0);
        if clip.w <= self.near {
            return None;
        }
        let ndc = clip.truncate() / clip.w;
        Some(Vec2::new(
            (ndc.x + 1.0) * 0.5 * viewport.x,
            (1.0 - ndc.y) * 0.5 * viewport.y,
        ))
    }

    /// Approximate on-screen radius in pixels of a sphere at `world`.
    pub fn projected_radius(&self, world: Vec3, radius: f32, viewport_height: f32) -> f32 {
        let depth = (world - self.position).dot(self.forward());
        if depth <= 0.0 {
            return 0.0;
        }
        radius / (depth * (self.fov_y * 0.5).tan()) * viewport_height * 0.5
    }

    pub fn to_uniform(&self) -> CameraUniform {
        CameraUniform {
            view_proj: self.view_projection_matrix().to_cols_array_2d(),
            right: self.right().extend(0.0).to_array(),
            up: self.up().extend(0.0).to_array(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_camera_looks_at_origin() {
        let camera = Camera::default();
        let forward = camera.forward();
        assert!((forward - Vec3::NEG_Z).length() < 1e-6);
        assert!((camera.distance() - 300.0).abs() < 1e-4);
    }

    #[test]
    fn test_basis_is_orthonormal() {
        let camera = Camera {
            position: Vec3::new(30.0, 40.0, -20.0),
            target: Vec3::new(1.0, 2.0, 3.0),
            ..Camera::default()
        };
        let (f, r, u) = (camera.forward(), camera.right(), camera.up());
        assert!(f.dot(r).abs() < 1e-5);
        assert!(f.dot(u).abs() < 1e-5);
        assert!(r.dot(u).abs() < 1e-5);
        assert!((r.length() - 1.0).abs() < 1e-5);
        assert!((u.length() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_looking_straight_down_stays_finite() {
        let camera = Camera {
            position: Vec3::new(0.0, 100.0, 0.0),
            target: Vec3::ZERO,
            ..Camera::default()
        };
        assert!(camera.view_projection_matrix().is_finite());
        assert!(camera.right().is_finite());
    }

    #[test]
    fn test_target_projects_to_viewport_center() {
        let camera = Camera {
            position: Vec3::new(10.0, 5.0, 80.0),
            target: Vec3::new(10.0, 5.0, 0.0),
            ..Camera::default()
        };
        let viewport = Vec2::new(800.0, 600.0);
        let screen = camera.project(camera.target, viewport).unwrap();
        assert!((screen - Vec2::new(400.0, 300.0)).length() < 1e-2);
    }

    #[test]
    fn test_project_y_points_down() {
        let camera = Camera::default();
        let viewport = Vec2::new(800.0, 600.0);
        let above = camera.project(Vec3::new(0.0, 10.0, 0.0), viewport).unwrap();
        assert!(above.y < 300.0);
    }

    #[test]
    fn test_point_behind_camera_not_projected() {
        let camera = Camera::default();
        assert!(
            camera
                .project(Vec3::new(0.0, 0.0, 400.0), Vec2::new(800.0, 600.0))
                .is_none()
        );
    }

    #[test]
    fn test_projected_radius_shrinks_with_distance() {
        let camera = Camera::default();
        let near = camera.projected_radius(Vec3::new(0.0, 0.0, 200.0), 5.0, 600.0);
        let far = camera.projected_radius(Vec3::new(0.0, 0.0, -200.0), 5.0, 600.0);
        assert!(near > far);
        assert!(far > 0.0);
    }

    #[test]
    fn test_aspect_ratio_ignores_zero_height() {
        let mut camera = Camera::default();
        camera.set_aspect_ratio(1920.0, 1080.0);
        assert!((camera.aspect_ratio - 16.0 / 9.0).abs() < 1e-6);
        camera.set_aspect_ratio(100.0, 0.0);
        assert!((camera.aspect_ratio - 16.0 / 9.0).abs() < 1e-6);
    }

    #[test]
    fn test_uniform_size() {
        assert_eq!(std::mem::size_of::<CameraUniform>(), 96);
    }
}
