use super::{Backdrop, Phase};
use crate::pipeline::{create_depth_texture, create_msaa_color_texture, ParticleUniforms};

impl Backdrop {
    /// Resumes frame production. A no-op when already running or
    /// disposed.
    pub fn start(&mut self) {
        if self.phase == Phase::Paused {
            self.phase = Phase::Running;
        }
    }

    /// Pauses frame production. A no-op when already paused or disposed.
    pub fn stop(&mut self) {
        if self.phase == Phase::Running {
            self.phase = Phase::Paused;
        }
    }

    /// Visibility hook: the host reports whether the container is in
    /// view, and no frames are computed while it is not.
    pub fn set_visible(&mut self, visible: bool) {
        if visible {
            self.start();
        } else {
            self.stop();
        }
    }

    /// External toggle: lets unrelated host code (a settings panel, say)
    /// pause and resume the animation without owning its internals.
    pub fn set_enabled(&mut self, enabled: bool) {
        if enabled {
            self.start();
        } else {
            self.stop();
        }
    }

    /// Pointer moved over the container, in logical container-relative
    /// coordinates. Ignored when the startup policy disabled pointer
    /// interaction.
    pub fn pointer_moved(&mut self, x: f32, y: f32) {
        if !self.pointer_enabled || self.phase == Phase::Disposed {
            return;
        }
        let (width, height) = self.logical_size();
        self.interaction.pointer_moved(x, y, width, height);
    }

    /// Pointer left the container: rotation targets recenter.
    pub fn pointer_left(&mut self) {
        if !self.pointer_enabled || self.phase == Phase::Disposed {
            return;
        }
        self.interaction.pointer_left();
    }

    /// Page scroll progress in [0, 1]. May be called at any event rate;
    /// updates collapse to one per frame.
    pub fn scroll_changed(&mut self, progress: f32) {
        if self.phase == Phase::Disposed {
            return;
        }
        self.interaction.queue_scroll(progress);
    }

    /// An observed mutation of the host's theme attribute. Retargets the
    /// gradient; the transition animates over the following frames.
    pub fn observe_theme(&mut self, attribute: &str) {
        if self.phase == Phase::Disposed {
            return;
        }
        self.theme.observe(attribute);
    }

    /// Container resize. Camera aspect, surface configuration, depth
    /// buffer and bloom targets are updated together so they can never
    /// drift apart.
    pub fn resize(&mut self, physical_size: (u32, u32)) {
        if self.phase == Phase::Disposed {
            return;
        }

        self.physical_size = physical_size;
        let draw_size = Self::effective_size(physical_size, self.scale_factor);

        self.surface_config.width = draw_size.0;
        self.surface_config.height = draw_size.1;
        if let Some(surface) = &self.surface {
            surface.configure(&self.device, &self.surface_config);
        }

        self.camera.set_viewport(draw_size.0, draw_size.1);
        self.uniforms.projection = self.camera.projection().to_cols_array_2d();
        self.uniforms.point_scale =
            ParticleUniforms::point_scale(self.camera.fov_y_radians(), draw_size.1);

        if let Some(pass) = &mut self.pass {
            pass.msaa_view =
                create_msaa_color_texture(&self.device, self.surface_config.format, draw_size)
                    .create_view(&wgpu::TextureViewDescriptor::default());
            pass.depth_view = create_depth_texture(&self.device, draw_size)
                .create_view(&wgpu::TextureViewDescriptor::default());
        }

        let mut bloom_failed = false;
        if let Some(bloom) = &mut self.bloom {
            if let Err(error) = bloom.resize(&self.device, &self.queue, draw_size) {
                log::warn!("bloom resize failed, rendering without it: {error}");
                bloom_failed = true;
            }
        }
        if bloom_failed {
            self.bloom = None;
        }
    }

    /// Scale-factor change (the window moved to a display with a
    /// different pixel ratio). Re-derives the draw-buffer size with the
    /// pixel-ratio clamp applied.
    pub fn change_scale_factor(&mut self, scale_factor: f64) {
        self.scale_factor = scale_factor;
        self.resize(self.physical_size);
    }
}
