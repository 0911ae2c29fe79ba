use std::time::Instant;

use glam::Mat4;

use super::{
    Backdrop, Phase, ANIMATION_SPEED, AUTO_ROTATION_X_AMPLITUDE, AUTO_ROTATION_Y_SPEED,
    ROTATION_LERP_RATE, SCROLL_INTENSITY_MIN, SCROLL_INTENSITY_RANGE,
};
use crate::governor::GovernorVerdict;
use crate::pipeline::{encode_particle_pass, ParticleInstance};
use crate::theme::COLOR_LERP_RATE;

impl Backdrop {
    /// Produces one frame. A no-op unless the backdrop is running; the
    /// host calls this from its redraw handler.
    ///
    /// Per-frame work runs in a fixed order: advance rotation, lerp
    /// colors, write uniforms, poll the position source, sample the
    /// governor, then render through the bloom chain or the raw pipeline.
    pub fn render_frame(&mut self) -> Result<(), wgpu::SurfaceError> {
        if self.phase != Phase::Running {
            return Ok(());
        }
        self.step_and_render()
    }

    /// The ungated frame step, shared with the degraded single-frame
    /// entry path.
    pub(super) fn step_and_render(&mut self) -> Result<(), wgpu::SurfaceError> {
        let now = Instant::now();
        self.advance_animation(now);
        self.ingest_geometry();
        self.upload_uniforms();
        self.govern(now);
        self.render()
    }

    /// Advances the auto-rotation clock, blends in the pointer targets
    /// and steps the color transition.
    fn advance_animation(&mut self, now: Instant) {
        self.animation_clock += ANIMATION_SPEED;
        let auto_yaw = self.animation_clock * AUTO_ROTATION_Y_SPEED;
        let auto_pitch =
            (self.animation_clock * AUTO_ROTATION_Y_SPEED).sin() * AUTO_ROTATION_X_AMPLITUDE;

        // Coalesced scroll: at most one applied update per frame.
        self.interaction.apply_pending_scroll();

        let (pitch, yaw) = self.rotation;
        self.rotation = (
            pitch + (auto_pitch + self.interaction.target_pitch - pitch) * ROTATION_LERP_RATE,
            yaw + (auto_yaw + self.interaction.target_yaw - yaw) * ROTATION_LERP_RATE,
        );

        self.theme.colors.step(COLOR_LERP_RATE);

        let elapsed = now.duration_since(self.started_at).as_secs_f32();
        let model = Mat4::from_rotation_y(self.rotation.1) * Mat4::from_rotation_x(self.rotation.0);

        self.uniforms.model_view = (self.camera.view() * model).to_cols_array_2d();
        self.uniforms.time = elapsed;
        self.uniforms.color_a = self.theme.colors.current_a.to_array();
        self.uniforms.color_b = self.theme.colors.current_b.to_array();
        // Scroll drives both the gradient brightness and the morph.
        let scroll = self.interaction.scroll_progress();
        self.uniforms.color_intensity = SCROLL_INTENSITY_MIN + scroll * SCROLL_INTENSITY_RANGE;
        self.uniforms.morph_factor = scroll;
    }

    /// Polls the position source and uploads the batch to the instance
    /// buffer on arrival. Until then the zeroed buffer renders.
    fn ingest_geometry(&mut self) {
        let Some(source) = self.source.as_mut() else {
            return;
        };
        let Some(batch) = source.poll() else {
            return;
        };

        if let Some(pass) = &self.pass {
            let instances = ParticleInstance::pack(&batch);
            self.queue
                .write_buffer(&pass.instance_buffer, 0, bytemuck::cast_slice(&instances));
        }
        self.particles = Some(batch);
    }

    /// The single uniform write site: nothing else touches the shader's
    /// uniform buffer.
    fn upload_uniforms(&self) {
        if let Some(pass) = &self.pass {
            self.queue
                .write_buffer(&pass.uniform_buffer, 0, bytemuck::cast_slice(&[self.uniforms]));
        }
    }

    /// Samples the governor; a disable verdict permanently drops the
    /// bloom stage. There is no path back within the session.
    fn govern(&mut self, now: Instant) {
        let verdict = self.governor.record_frame(now, self.bloom.is_some());
        if verdict == GovernorVerdict::DisableBloom {
            self.bloom = None;
        }
    }

    fn render(&mut self) -> Result<(), wgpu::SurfaceError> {
        let (Some(surface), Some(pass)) = (&self.surface, &self.pass) else {
            return Ok(());
        };

        let output = surface.get_current_texture()?;
        let surface_view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("backdrop_encoder"),
            });

        match &self.bloom {
            Some(bloom) => {
                encode_particle_pass(
                    &mut encoder,
                    &pass.msaa_view,
                    bloom.scene_view(),
                    &pass.depth_view,
                    self.scene.clear_color,
                    &pass.pipeline,
                    &pass.bind_group,
                    &pass.instance_buffer,
                    pass.instance_count,
                );
                bloom.encode(&mut encoder, &surface_view);
            }
            None => {
                encode_particle_pass(
                    &mut encoder,
                    &pass.msaa_view,
                    &surface_view,
                    &pass.depth_view,
                    self.scene.clear_color,
                    &pass.pipeline,
                    &pass.bind_group,
                    &pass.instance_buffer,
                    pass.instance_count,
                );
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        Ok(())
    }
}
