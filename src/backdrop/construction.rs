use std::time::Instant;

use wgpu::util::DeviceExt;
use wgpu::{CompositeAlphaMode, InstanceDescriptor, SurfaceTarget};

use super::{Backdrop, BackdropConfig, BackdropError, ParticlePass, Phase};
use crate::bloom::BloomStage;
use crate::camera::Camera;
use crate::controls;
use crate::controls::InteractionState;
use crate::governor::FrameGovernor;
use crate::pipeline::{
    create_depth_texture, create_msaa_color_texture, create_particle_pipeline, ParticleInstance,
    ParticleUniforms,
};
use crate::scene::Scene;
use crate::source::PositionSource;
use crate::theme::ThemeBridge;

impl Backdrop {
    /// Attaches a backdrop to a surface target (a window, usually) and
    /// builds the whole render pipeline.
    ///
    /// Capability failures below the adapter/device level degrade rather
    /// than fail: a missing bloom stage or geometry thread leaves a
    /// working backdrop. When `settings.reduced_usage` is set the
    /// backdrop renders exactly one static frame and comes back paused;
    /// [`Backdrop::start`] resumes it.
    pub async fn attach(
        window: impl Into<SurfaceTarget<'static>>,
        physical_size: (u32, u32),
        scale_factor: f64,
        settings: BackdropConfig,
    ) -> Result<Self, BackdropError> {
        let instance = wgpu::Instance::new(&InstanceDescriptor::default());
        let surface = instance.create_surface(window)?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: None,
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: Default::default(),
                trace: Default::default(),
            })
            .await?;

        let swapchain_format = wgpu::TextureFormat::Bgra8UnormSrgb;

        // The backdrop composites over whatever is behind its container,
        // so prefer an alpha-capable compositing mode.
        let surface_caps = surface.get_capabilities(&adapter);
        let alpha_mode = if surface_caps
            .alpha_modes
            .contains(&CompositeAlphaMode::PreMultiplied)
        {
            CompositeAlphaMode::PreMultiplied
        } else if surface_caps
            .alpha_modes
            .contains(&CompositeAlphaMode::PostMultiplied)
        {
            CompositeAlphaMode::PostMultiplied
        } else {
            log::warn!("no alpha compositing mode available, falling back to opaque");
            CompositeAlphaMode::Opaque
        };

        let draw_size = Self::effective_size(physical_size, scale_factor);
        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: swapchain_format,
            width: draw_size.0,
            height: draw_size.1,
            present_mode: wgpu::PresentMode::AutoVsync,
            desired_maximum_frame_latency: 2,
            alpha_mode,
            view_formats: vec![],
        };
        surface.configure(&device, &surface_config);

        let camera = Camera::new(draw_size.0, draw_size.1);
        let scene = Scene::default();
        let theme = ThemeBridge::from_theme(settings.theme);

        let uniforms = ParticleUniforms {
            projection: camera.projection().to_cols_array_2d(),
            model_view: camera.view().to_cols_array_2d(),
            color_a: theme.colors.current_a.to_array(),
            time: 0.0,
            color_b: theme.colors.current_b.to_array(),
            point_size: settings.point_size,
            morph_factor: 0.0,
            color_intensity: super::SCROLL_INTENSITY_MIN,
            rim_strength: scene.light.intensity,
            point_scale: ParticleUniforms::point_scale(camera.fov_y_radians(), draw_size.1),
        };

        let (uniform_buffer, bind_group, pipeline) =
            create_particle_pipeline(&device, swapchain_format, uniforms);

        // Zeroed until the position source delivers its batch.
        let instances = ParticleInstance::zeroed(settings.particle_count);
        let instance_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("particle_instance_buffer"),
            contents: bytemuck::cast_slice(&instances),
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        });

        let msaa_view = create_msaa_color_texture(&device, swapchain_format, draw_size)
            .create_view(&wgpu::TextureViewDescriptor::default());
        let depth_view = create_depth_texture(&device, draw_size)
            .create_view(&wgpu::TextureViewDescriptor::default());

        let pass = ParticlePass {
            uniform_buffer,
            bind_group,
            pipeline,
            instance_buffer,
            instance_count: settings.particle_count as u32,
            msaa_view,
            depth_view,
        };

        let bloom = if settings.enable_bloom {
            match BloomStage::new(&device, swapchain_format, draw_size) {
                Ok(stage) => Some(stage),
                Err(error) => {
                    log::warn!("bloom initialization failed, rendering without it: {error}");
                    None
                }
            }
        } else {
            None
        };

        let source = PositionSource::spawn(settings.particle_count, settings.layout);

        let logical_width = (physical_size.0 as f64 / scale_factor) as u32;
        let pointer_enabled = controls::pointer_enabled(logical_width, settings.reduced_usage);

        let mut backdrop = Self {
            device,
            queue,
            surface: Some(surface),
            surface_config,
            physical_size,
            scale_factor,
            camera,
            scene,
            uniforms,
            pass: Some(pass),
            bloom,
            source: Some(source),
            particles: None,
            interaction: InteractionState::new(),
            pointer_enabled,
            theme,
            governor: FrameGovernor::new(Instant::now()),
            phase: Phase::Running,
            animation_clock: 0.0,
            rotation: (0.0, 0.0),
            started_at: Instant::now(),
            settings,
        };

        if settings.reduced_usage {
            // Degraded entry: one static frame, then stay paused until
            // explicitly resumed.
            backdrop.phase = Phase::Paused;
            if let Err(error) = backdrop.step_and_render() {
                log::warn!("static frame render failed: {error}");
            }
        }

        Ok(backdrop)
    }
}
