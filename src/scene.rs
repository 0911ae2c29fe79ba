use glam::Vec3;

/// The single light in the backdrop scene.
///
/// The particle shader does its own lighting-like shaping; the light's
/// intensity weights the Fresnel rim term in the fragment stage rather
/// than feeding a conventional lighting model.
#[derive(Debug, Clone, Copy)]
pub struct DirectionalLight {
    pub direction: Vec3,
    pub intensity: f32,
}

impl Default for DirectionalLight {
    fn default() -> Self {
        Self {
            direction: Vec3::new(0.0, 1.0, 1.0).normalize(),
            intensity: 0.3,
        }
    }
}

/// Scene description: a transparent clear color (the backdrop composites
/// over the host page or window) and one low-intensity directional light.
#[derive(Debug, Clone, Copy)]
pub struct Scene {
    pub clear_color: wgpu::Color,
    pub light: DirectionalLight,
}

impl Default for Scene {
    fn default() -> Self {
        Self {
            clear_color: wgpu::Color::TRANSPARENT,
            light: DirectionalLight::default(),
        }
    }
}
