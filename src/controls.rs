//! Interaction state: pointer-driven rotation bias and frame-coalesced
//! scroll progress.
//!
//! All mutation happens through host-thread event calls; the frame step
//! is the only reader. Scroll updates are coalesced so an arbitrarily
//! chatty scroll stream applies at most once per rendered frame (a
//! leading-edge throttle keyed to the render clock, not wall-clock time).

/// Yaw contribution per unit of horizontal pointer offset.
pub const POINTER_YAW_MULTIPLIER: f32 = 0.6;
/// Pitch contribution per unit of vertical pointer offset (inverted).
pub const POINTER_PITCH_MULTIPLIER: f32 = 0.3;
/// Narrowest viewport that still gets pointer interaction.
pub const MIN_POINTER_VIEWPORT_WIDTH: u32 = 640;

/// Decided once at startup and never re-evaluated: pointer interaction is
/// wired only on wide viewports without a reduced-usage signal.
pub fn pointer_enabled(viewport_width: u32, reduced_usage: bool) -> bool {
    !reduced_usage && viewport_width >= MIN_POINTER_VIEWPORT_WIDTH
}

/// Normalized page scroll progress: 0.0 at the top, 1.0 when the viewport
/// reaches the bottom of the content.
pub fn scroll_progress(scroll_offset: f32, content_extent: f32, viewport_extent: f32) -> f32 {
    let scrollable = content_extent - viewport_extent;
    if scrollable <= 0.0 {
        return 0.0;
    }
    (scroll_offset / scrollable).clamp(0.0, 1.0)
}

/// Pointer and scroll state read by the frame step.
#[derive(Debug, Clone, Copy, Default)]
pub struct InteractionState {
    /// Pointer offset from the container center, each axis in [-0.5, 0.5].
    pub pointer_x: f32,
    pub pointer_y: f32,
    /// Rotation targets derived from the pointer offset.
    pub target_yaw: f32,
    pub target_pitch: f32,
    applied_scroll: f32,
    pending_scroll: Option<f32>,
}

impl InteractionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handles a pointer move. `x`/`y` are container-relative pixel
    /// coordinates.
    pub fn pointer_moved(&mut self, x: f32, y: f32, container_width: f32, container_height: f32) {
        if container_width <= 0.0 || container_height <= 0.0 {
            return;
        }
        self.pointer_x = x / container_width - 0.5;
        self.pointer_y = y / container_height - 0.5;
        self.target_yaw = self.pointer_x * POINTER_YAW_MULTIPLIER;
        self.target_pitch = -self.pointer_y * POINTER_PITCH_MULTIPLIER;
    }

    /// Handles the pointer leaving the container: recenters everything.
    pub fn pointer_left(&mut self) {
        self.pointer_x = 0.0;
        self.pointer_y = 0.0;
        self.target_yaw = 0.0;
        self.target_pitch = 0.0;
    }

    /// Queues a scroll-progress update. Any number of calls between two
    /// frames collapse into one application of the latest value.
    pub fn queue_scroll(&mut self, progress: f32) {
        self.pending_scroll = Some(progress.clamp(0.0, 1.0));
    }

    /// Applies a queued scroll update, if any. Called once per frame.
    pub fn apply_pending_scroll(&mut self) {
        if let Some(progress) = self.pending_scroll.take() {
            self.applied_scroll = progress;
        }
    }

    /// The scroll progress as of the last frame boundary, in [0, 1].
    pub fn scroll_progress(&self) -> f32 {
        self.applied_scroll
    }
}
