use glam::{Mat4, Vec3};

/// Fallback viewport height used when the container reports zero height,
/// so the projection never degenerates.
const MIN_VIEWPORT_HEIGHT: u32 = 300;

/// Perspective camera fixed on the z axis, looking at the origin.
///
/// The camera never moves; all apparent motion comes from rotating the
/// particle model. Only the aspect ratio changes over its lifetime, on
/// container resize.
#[derive(Debug, Clone, Copy)]
pub struct Camera {
    fov_y_degrees: f32,
    near: f32,
    far: f32,
    /// Distance back from the origin along +z.
    distance: f32,
    aspect: f32,
}

impl Camera {
    pub fn new(viewport_width: u32, viewport_height: u32) -> Self {
        let mut camera = Self {
            fov_y_degrees: 45.0,
            near: 0.1,
            far: 1000.0,
            distance: 80.0,
            aspect: 1.0,
        };
        camera.set_viewport(viewport_width, viewport_height);
        camera
    }

    /// Recomputes the aspect ratio for a new container size.
    pub fn set_viewport(&mut self, width: u32, height: u32) {
        let height = if height == 0 {
            MIN_VIEWPORT_HEIGHT
        } else {
            height
        };
        self.aspect = width as f32 / height as f32;
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    pub fn fov_y_radians(&self) -> f32 {
        self.fov_y_degrees.to_radians()
    }

    pub fn projection(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y_radians(), self.aspect, self.near, self.far)
    }

    /// World-to-view transform for the fixed camera position.
    pub fn view(&self) -> Mat4 {
        Mat4::from_translation(Vec3::new(0.0, 0.0, -self.distance))
    }
}

#[cfg(test)]
mod tests {
    use super::Camera;
    use glam::Vec4;

    #[test]
    fn resize_updates_the_aspect_ratio() {
        let mut camera = Camera::new(640, 480);
        assert!((camera.aspect() - 640.0 / 480.0).abs() < 1e-6);

        camera.set_viewport(1920, 1080);
        assert!((camera.aspect() - 1920.0 / 1080.0).abs() < 1e-6);
    }

    #[test]
    fn zero_height_falls_back_instead_of_degenerating() {
        let mut camera = Camera::new(640, 480);
        camera.set_viewport(600, 0);
        assert!((camera.aspect() - 2.0).abs() < 1e-6);
    }

    #[test]
    fn origin_projects_to_screen_center_at_camera_depth() {
        let camera = Camera::new(800, 600);
        let clip = camera.projection() * camera.view() * Vec4::new(0.0, 0.0, 0.0, 1.0);
        let ndc = clip / clip.w;
        assert!(ndc.x.abs() < 1e-6 && ndc.y.abs() < 1e-6);
        // The origin sits 80 units in front of the camera, well inside
        // the near/far range.
        assert!(ndc.z > 0.0 && ndc.z < 1.0);
    }
}
