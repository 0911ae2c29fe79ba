//! The lifecycle controller: owns every GPU and state resource of the
//! particle backdrop and drives the per-frame update.
//!
//! Lifecycle: a constructed [`Backdrop`] is `Running` (or `Paused` when a
//! reduced-usage signal forced the degraded single-frame entry), moves
//! between `Running` and `Paused` through visibility and toggle events,
//! and ends in the terminal `Disposed` state. Disposal releases every
//! resource exactly once and is safe to repeat.

mod construction;
mod events;
mod frame;
mod teardown;

use std::time::Instant;

use thiserror::Error;

use crate::bloom::BloomStage;
use crate::camera::Camera;
use crate::controls::InteractionState;
use crate::geometry::{LayoutParams, ParticleSet};
use crate::governor::FrameGovernor;
use crate::pipeline::{ParticleUniforms, DEFAULT_POINT_SIZE};
use crate::scene::Scene;
use crate::source::PositionSource;
use crate::theme::{Theme, ThemeBridge};

/// Particles rendered per session.
pub const DEFAULT_PARTICLE_COUNT: usize = 220;

/// Auto-rotation clock increment per frame.
pub(crate) const ANIMATION_SPEED: f32 = 0.005;
/// Yaw advance per unit of the auto-rotation clock.
pub(crate) const AUTO_ROTATION_Y_SPEED: f32 = 0.6;
/// Amplitude of the slow pitch oscillation.
pub(crate) const AUTO_ROTATION_X_AMPLITUDE: f32 = 0.12;
/// Fraction of the remaining rotation distance covered per frame.
pub(crate) const ROTATION_LERP_RATE: f32 = 0.08;
/// Color intensity at the top of the page.
pub(crate) const SCROLL_INTENSITY_MIN: f32 = 0.8;
/// Additional intensity gained by the bottom of the page.
pub(crate) const SCROLL_INTENSITY_RANGE: f32 = 0.2;
/// Device pixel ratios above this are clamped to bound GPU cost on
/// high-DPI displays.
pub(crate) const MAX_PIXEL_RATIO: f64 = 2.0;

/// Errors that can occur while attaching a backdrop to a surface.
///
/// All of these are environment-capability failures; the host typically
/// logs them and runs without a backdrop.
#[derive(Debug, Error)]
pub enum BackdropError {
    #[error("surface creation failed: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),
    #[error("no suitable GPU adapter: {0}")]
    Adapter(#[from] wgpu::RequestAdapterError),
    #[error("device request failed: {0}")]
    Device(#[from] wgpu::RequestDeviceError),
}

/// Host-supplied settings, evaluated once at attach time.
#[derive(Debug, Clone, Copy)]
pub struct BackdropConfig {
    pub particle_count: usize,
    pub layout: LayoutParams,
    /// Base point diameter before per-seed variation.
    pub point_size: f32,
    /// Initial theme; later changes arrive via
    /// [`Backdrop::observe_theme`].
    pub theme: Theme,
    /// Any-true disjunction of the host's persisted preference, a
    /// save-data hint and a narrow-viewport check. Suppresses the
    /// continuous loop and pointer interaction.
    pub reduced_usage: bool,
    /// Whether to attempt the bloom stage at all.
    pub enable_bloom: bool,
}

impl Default for BackdropConfig {
    fn default() -> Self {
        Self {
            particle_count: DEFAULT_PARTICLE_COUNT,
            layout: LayoutParams::default(),
            point_size: DEFAULT_POINT_SIZE,
            theme: Theme::Light,
            reduced_usage: false,
            enable_bloom: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Phase {
    Running,
    Paused,
    Disposed,
}

/// Everything the particle draw needs; dropped as one unit at teardown.
pub(crate) struct ParticlePass {
    pub uniform_buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub pipeline: wgpu::RenderPipeline,
    pub instance_buffer: wgpu::Buffer,
    pub instance_count: u32,
    pub msaa_view: wgpu::TextureView,
    pub depth_view: wgpu::TextureView,
}

/// The animation controller and sole owner of its GPU resources.
///
/// The value itself is the control handle the host wires to whatever
/// control surface it wants: [`Backdrop::start`], [`Backdrop::stop`] and
/// [`Backdrop::dispose`] are all it takes.
pub struct Backdrop {
    pub(crate) device: wgpu::Device,
    pub(crate) queue: wgpu::Queue,
    pub(crate) surface: Option<wgpu::Surface<'static>>,
    pub(crate) surface_config: wgpu::SurfaceConfiguration,
    pub(crate) physical_size: (u32, u32),
    pub(crate) scale_factor: f64,

    pub(crate) camera: Camera,
    pub(crate) scene: Scene,
    pub(crate) uniforms: ParticleUniforms,
    pub(crate) pass: Option<ParticlePass>,
    pub(crate) bloom: Option<BloomStage>,

    pub(crate) source: Option<PositionSource>,
    pub(crate) particles: Option<ParticleSet>,

    pub(crate) interaction: InteractionState,
    pub(crate) pointer_enabled: bool,
    pub(crate) theme: ThemeBridge,
    pub(crate) governor: FrameGovernor,

    pub(crate) phase: Phase,
    pub(crate) animation_clock: f32,
    /// Current model rotation (pitch, yaw).
    pub(crate) rotation: (f32, f32),
    pub(crate) started_at: Instant,
    pub(crate) settings: BackdropConfig,
}

impl Backdrop {
    /// True while frames are being produced.
    pub fn is_running(&self) -> bool {
        self.phase == Phase::Running
    }

    /// True once the terminal state is reached.
    pub fn is_disposed(&self) -> bool {
        self.phase == Phase::Disposed
    }

    /// Whether the bloom stage is present and active.
    pub fn bloom_active(&self) -> bool {
        self.bloom.is_some()
    }

    /// The most recent frame-rate estimate.
    pub fn current_fps(&self) -> f32 {
        self.governor.current_fps()
    }

    /// The generated particle layouts, once they have arrived from the
    /// position source. Includes the resting cloud layout, which the
    /// shader does not sample but hosts may inspect.
    pub fn particles(&self) -> Option<&ParticleSet> {
        self.particles.as_ref()
    }

    /// Container size in logical (CSS-like) coordinates.
    pub(crate) fn logical_size(&self) -> (f32, f32) {
        (
            self.physical_size.0 as f32 / self.scale_factor as f32,
            self.physical_size.1 as f32 / self.scale_factor as f32,
        )
    }

    /// Draw-buffer size after the pixel-ratio clamp: rendering never
    /// exceeds [`MAX_PIXEL_RATIO`] times the logical size.
    pub(crate) fn effective_size(physical_size: (u32, u32), scale_factor: f64) -> (u32, u32) {
        let ratio = (MAX_PIXEL_RATIO / scale_factor).min(1.0);
        (
            ((physical_size.0 as f64 * ratio).round() as u32).max(1),
            ((physical_size.1 as f64 * ratio).round() as u32).max(1),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn effective_size_clamps_only_above_the_ratio_limit() {
        // At 1x and 2x the full physical size is used.
        assert_eq!(Backdrop::effective_size((640, 480), 1.0), (640, 480));
        assert_eq!(Backdrop::effective_size((1280, 960), 2.0), (1280, 960));
        // A 3x display renders at 2x: two thirds of the physical size.
        assert_eq!(Backdrop::effective_size((1920, 1440), 3.0), (1280, 960));
    }

    #[test]
    fn effective_size_never_degenerates_to_zero() {
        assert_eq!(Backdrop::effective_size((0, 0), 1.0), (1, 1));
    }

    #[test]
    fn default_config_matches_the_tuned_backdrop() {
        let config = BackdropConfig::default();
        assert_eq!(config.particle_count, 220);
        assert_eq!(config.point_size, 1.6);
        assert!(config.enable_bloom);
        assert!(!config.reduced_usage);
    }
}
