pub use wgpu;

mod backdrop;
mod bloom;
mod camera;
mod color;
mod controls;
pub mod geometry;
mod governor;
mod pipeline;
mod scene;
mod source;
mod theme;

pub use backdrop::{Backdrop, BackdropConfig, BackdropError, DEFAULT_PARTICLE_COUNT};
pub use bloom::{BloomError, BloomStage};
pub use camera::Camera;
pub use color::Color;
pub use controls::{pointer_enabled, scroll_progress, InteractionState};
pub use geometry::{LayoutParams, ParticleSet};
pub use governor::{FrameGovernor, GovernorVerdict};
pub use scene::{DirectionalLight, Scene};
pub use source::PositionSource;
pub use theme::{ColorScheme, ColorState, Theme, ThemeBridge};
