//! Bloom post-processing stage.
//!
//! Pass chain: the particle pass renders into an offscreen scene texture;
//! a bright-pass extracts fragments above a luminance threshold into a
//! half-resolution target; a separable Gaussian blur ping-pongs it; a
//! composite pass writes `scene + strength * blurred` to the surface.
//! Parameters are deliberately conservative (weak strength, small blur
//! radius, half-resolution chain) to keep the GPU overhead low.
//!
//! Construction is fallible and the caller treats any failure as "no
//! bloom": the backdrop then renders through the raw particle pass only.

use thiserror::Error;
use wgpu::util::DeviceExt;
use wgpu::{
    BindGroup, BindGroupLayout, Buffer, Device, RenderPipeline, Sampler, StoreOp, TextureView,
};

/// Weight of the blurred layer in the composite.
pub const BLOOM_STRENGTH: f32 = 0.4;
/// Gaussian blur radius in (half-resolution) pixels.
pub const BLOOM_BLUR_RADIUS: f32 = 6.0;
/// Luminance floor below which fragments contribute no glow.
pub const BLOOM_THRESHOLD: f32 = 0.8;

/// Reasons the bloom stage can fail to initialize.
#[derive(Debug, Error)]
pub enum BloomError {
    #[error("viewport {width}x{height} cannot host bloom targets (device limit {limit})")]
    UnsupportedViewport {
        width: u32,
        height: u32,
        limit: u32,
    },
}

/// Fullscreen-triangle vertex stage shared by every bloom pass: three
/// vertices cover the whole target, no vertex buffer needed.
const FULLSCREEN_VS: &str = r#"
struct QuadOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) uv: vec2<f32>,
};

@vertex
fn vs_quad(@builtin(vertex_index) vi: u32) -> QuadOutput {
    let uv = vec2<f32>(f32((vi << 1u) & 2u), f32(vi & 2u));
    var out: QuadOutput;
    out.position = vec4<f32>(uv * 2.0 - 1.0, 0.0, 1.0);
    out.uv = vec2<f32>(uv.x, 1.0 - uv.y);
    return out;
}
"#;

const SINGLE_INPUT_PREAMBLE: &str = r#"
@group(0) @binding(0) var t_input: texture_2d<f32>;
@group(0) @binding(1) var s_input: sampler;
"#;

const BRIGHT_PASS_FS: &str = r#"
const THRESHOLD: f32 = 0.8;

@fragment
fn effect_main(@location(0) uv: vec2<f32>) -> @location(0) vec4<f32> {
    let sample = textureSample(t_input, s_input, uv);
    let luminance = dot(sample.rgb, vec3<f32>(0.2126, 0.7152, 0.0722));
    let keep = smoothstep(THRESHOLD, THRESHOLD + 0.1, luminance);
    return vec4<f32>(sample.rgb * keep, sample.a * keep);
}
"#;

/// Horizontal separable Gaussian blur pass (direction = (1,0)).
const HORIZONTAL_BLUR_FS: &str = r#"
const DIRECTION: vec2<f32> = vec2<f32>(1.0, 0.0);

struct Params {
    radius: f32,
    _pad: f32,
    tex_size: vec2<f32>,
}
@group(1) @binding(0) var<uniform> params: Params;

@fragment
fn effect_main(@location(0) uv: vec2<f32>) -> @location(0) vec4<f32> {
    let pixel = DIRECTION / params.tex_size;
    let sigma = max(params.radius / 3.0, 0.001);
    var color = vec4<f32>(0.0);
    var total_weight = 0.0;
    let r = i32(ceil(params.radius));
    for (var i = -r; i <= r; i++) {
        let offset = f32(i);
        let weight = exp(-(offset * offset) / (2.0 * sigma * sigma));
        color += textureSample(t_input, s_input, uv + pixel * offset) * weight;
        total_weight += weight;
    }
    return color / total_weight;
}
"#;

/// Vertical separable Gaussian blur pass (direction = (0,1)).
const VERTICAL_BLUR_FS: &str = r#"
const DIRECTION: vec2<f32> = vec2<f32>(0.0, 1.0);

struct Params {
    radius: f32,
    _pad: f32,
    tex_size: vec2<f32>,
}
@group(1) @binding(0) var<uniform> params: Params;

@fragment
fn effect_main(@location(0) uv: vec2<f32>) -> @location(0) vec4<f32> {
    let pixel = DIRECTION / params.tex_size;
    let sigma = max(params.radius / 3.0, 0.001);
    var color = vec4<f32>(0.0);
    var total_weight = 0.0;
    let r = i32(ceil(params.radius));
    for (var i = -r; i <= r; i++) {
        let offset = f32(i);
        let weight = exp(-(offset * offset) / (2.0 * sigma * sigma));
        color += textureSample(t_input, s_input, uv + pixel * offset) * weight;
        total_weight += weight;
    }
    return color / total_weight;
}
"#;

const COMPOSITE_FS: &str = r#"
const STRENGTH: f32 = 0.4;

@group(0) @binding(0) var t_base: texture_2d<f32>;
@group(0) @binding(1) var t_bloom: texture_2d<f32>;
@group(0) @binding(2) var s_input: sampler;

@fragment
fn fs_composite(@location(0) uv: vec2<f32>) -> @location(0) vec4<f32> {
    let base = textureSample(t_base, s_input, uv);
    let glow = textureSample(t_bloom, s_input, uv);
    return base + glow * STRENGTH;
}
"#;

/// Gaussian blur pass parameters, shared by both blur directions.
#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct BlurParams {
    radius: f32,
    _pad: f32,
    tex_size: [f32; 2],
}

/// The blur chain runs at half resolution; never below one pixel.
pub(crate) fn chain_size(viewport: (u32, u32)) -> (u32, u32) {
    ((viewport.0 / 2).max(1), (viewport.1 / 2).max(1))
}

pub struct BloomStage {
    format: wgpu::TextureFormat,

    scene_view: TextureView,
    ping_view: TextureView,
    pong_view: TextureView,

    sampler: Sampler,
    input_bgl: BindGroupLayout,
    composite_bgl: BindGroupLayout,
    params_bgl: BindGroupLayout,
    blur_params_buffer: Buffer,

    bright_pipeline: RenderPipeline,
    blur_h_pipeline: RenderPipeline,
    blur_v_pipeline: RenderPipeline,
    composite_pipeline: RenderPipeline,

    bright_bg: BindGroup,
    blur_h_bg: BindGroup,
    blur_v_bg: BindGroup,
    params_bg: BindGroup,
    composite_bg: BindGroup,
}

impl BloomStage {
    /// Builds the full pass chain for the given viewport. Fails rather
    /// than panics when the viewport cannot host the render targets; the
    /// caller degrades to the raw render path.
    pub fn new(
        device: &Device,
        format: wgpu::TextureFormat,
        viewport: (u32, u32),
    ) -> Result<Self, BloomError> {
        let limit = device.limits().max_texture_dimension_2d;
        if viewport.0 == 0 || viewport.1 == 0 || viewport.0 > limit || viewport.1 > limit {
            return Err(BloomError::UnsupportedViewport {
                width: viewport.0,
                height: viewport.1,
                limit,
            });
        }

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("bloom_sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let input_bgl = create_single_input_layout(device);
        let composite_bgl = create_composite_input_layout(device);
        let params_bgl = create_params_layout(device);

        let half = chain_size(viewport);
        let blur_params_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("bloom_blur_params"),
            contents: bytemuck::cast_slice(&[BlurParams {
                radius: BLOOM_BLUR_RADIUS,
                _pad: 0.0,
                tex_size: [half.0 as f32, half.1 as f32],
            }]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let bright_pipeline = create_pass_pipeline(
            device,
            "bloom_bright",
            &format!("{FULLSCREEN_VS}\n{SINGLE_INPUT_PREAMBLE}\n{BRIGHT_PASS_FS}"),
            "effect_main",
            format,
            &[&input_bgl],
        );
        let blur_h_pipeline = create_pass_pipeline(
            device,
            "bloom_blur_h",
            &format!("{FULLSCREEN_VS}\n{SINGLE_INPUT_PREAMBLE}\n{HORIZONTAL_BLUR_FS}"),
            "effect_main",
            format,
            &[&input_bgl, &params_bgl],
        );
        let blur_v_pipeline = create_pass_pipeline(
            device,
            "bloom_blur_v",
            &format!("{FULLSCREEN_VS}\n{SINGLE_INPUT_PREAMBLE}\n{VERTICAL_BLUR_FS}"),
            "effect_main",
            format,
            &[&input_bgl, &params_bgl],
        );
        let composite_pipeline = create_pass_pipeline(
            device,
            "bloom_composite",
            &format!("{FULLSCREEN_VS}\n{COMPOSITE_FS}"),
            "fs_composite",
            format,
            &[&composite_bgl],
        );

        let scene_view = create_color_target(device, "bloom_scene", format, viewport);
        let ping_view = create_color_target(device, "bloom_ping", format, half);
        let pong_view = create_color_target(device, "bloom_pong", format, half);

        let params_bg = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("bloom_params_bg"),
            layout: &params_bgl,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: blur_params_buffer.as_entire_binding(),
            }],
        });

        let (bright_bg, blur_h_bg, blur_v_bg, composite_bg) = create_input_bind_groups(
            device,
            &input_bgl,
            &composite_bgl,
            &sampler,
            &scene_view,
            &ping_view,
            &pong_view,
        );

        Ok(Self {
            format,
            scene_view,
            ping_view,
            pong_view,
            sampler,
            input_bgl,
            composite_bgl,
            params_bgl,
            blur_params_buffer,
            bright_pipeline,
            blur_h_pipeline,
            blur_v_pipeline,
            composite_pipeline,
            bright_bg,
            blur_h_bg,
            blur_v_bg,
            params_bg,
            composite_bg,
        })
    }

    /// The offscreen color target the particle pass renders into when
    /// bloom is active.
    pub fn scene_view(&self) -> &TextureView {
        &self.scene_view
    }

    /// Recreates the render targets for a new viewport, keeping the
    /// compiled pipelines. Fails the same way construction does; on
    /// failure the stage is left unusable and should be dropped.
    pub fn resize(
        &mut self,
        device: &Device,
        queue: &wgpu::Queue,
        viewport: (u32, u32),
    ) -> Result<(), BloomError> {
        let limit = device.limits().max_texture_dimension_2d;
        if viewport.0 == 0 || viewport.1 == 0 || viewport.0 > limit || viewport.1 > limit {
            return Err(BloomError::UnsupportedViewport {
                width: viewport.0,
                height: viewport.1,
                limit,
            });
        }

        let half = chain_size(viewport);
        self.scene_view = create_color_target(device, "bloom_scene", self.format, viewport);
        self.ping_view = create_color_target(device, "bloom_ping", self.format, half);
        self.pong_view = create_color_target(device, "bloom_pong", self.format, half);

        queue.write_buffer(
            &self.blur_params_buffer,
            0,
            bytemuck::cast_slice(&[BlurParams {
                radius: BLOOM_BLUR_RADIUS,
                _pad: 0.0,
                tex_size: [half.0 as f32, half.1 as f32],
            }]),
        );

        let (bright_bg, blur_h_bg, blur_v_bg, composite_bg) = create_input_bind_groups(
            device,
            &self.input_bgl,
            &self.composite_bgl,
            &self.sampler,
            &self.scene_view,
            &self.ping_view,
            &self.pong_view,
        );
        self.bright_bg = bright_bg;
        self.blur_h_bg = blur_h_bg;
        self.blur_v_bg = blur_v_bg;
        self.composite_bg = composite_bg;

        Ok(())
    }

    /// Encodes the bright/blur/composite chain, ending on `surface_view`.
    /// The particle pass must already have rendered into
    /// [`BloomStage::scene_view`].
    pub fn encode(&self, encoder: &mut wgpu::CommandEncoder, surface_view: &TextureView) {
        encode_fullscreen_pass(
            encoder,
            "bloom_bright_pass",
            &self.bright_pipeline,
            &self.ping_view,
            &[(0, &self.bright_bg)],
        );
        encode_fullscreen_pass(
            encoder,
            "bloom_blur_h_pass",
            &self.blur_h_pipeline,
            &self.pong_view,
            &[(0, &self.blur_h_bg), (1, &self.params_bg)],
        );
        encode_fullscreen_pass(
            encoder,
            "bloom_blur_v_pass",
            &self.blur_v_pipeline,
            &self.ping_view,
            &[(0, &self.blur_v_bg), (1, &self.params_bg)],
        );
        encode_fullscreen_pass(
            encoder,
            "bloom_composite_pass",
            &self.composite_pipeline,
            surface_view,
            &[(0, &self.composite_bg)],
        );
    }
}

/// The view keeps its texture alive; only the view is retained.
fn create_color_target(
    device: &Device,
    label: &str,
    format: wgpu::TextureFormat,
    size: (u32, u32),
) -> TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width: size.0,
            height: size.1,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
        view_formats: &[],
    });
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}

fn create_single_input_layout(device: &Device) -> BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("bloom_input_bgl"),
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    multisampled: false,
                    view_dimension: wgpu::TextureViewDimension::D2,
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
        ],
    })
}

fn create_composite_input_layout(device: &Device) -> BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("bloom_composite_bgl"),
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    multisampled: false,
                    view_dimension: wgpu::TextureViewDimension::D2,
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    multisampled: false,
                    view_dimension: wgpu::TextureViewDimension::D2,
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 2,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
        ],
    })
}

fn create_params_layout(device: &Device) -> BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("bloom_params_bgl"),
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }],
    })
}

fn create_pass_pipeline(
    device: &Device,
    label: &str,
    wgsl: &str,
    fragment_entry: &str,
    format: wgpu::TextureFormat,
    bind_group_layouts: &[&BindGroupLayout],
) -> RenderPipeline {
    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Wgsl(wgsl.into()),
    });

    let layout_label = format!("{label}_layout");
    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(&layout_label),
        bind_group_layouts,
        push_constant_ranges: &[],
    });

    let pipeline_label = format!("{label}_pipeline");
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(&pipeline_label),
        layout: Some(&pipeline_layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: Some("vs_quad"),
            compilation_options: Default::default(),
            // Fullscreen triangle, no vertex buffers.
            buffers: &[],
        },
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: Some(fragment_entry),
            compilation_options: Default::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            ..Default::default()
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    })
}

#[allow(clippy::too_many_arguments)]
fn create_input_bind_groups(
    device: &Device,
    input_bgl: &BindGroupLayout,
    composite_bgl: &BindGroupLayout,
    sampler: &Sampler,
    scene_view: &TextureView,
    ping_view: &TextureView,
    pong_view: &TextureView,
) -> (BindGroup, BindGroup, BindGroup, BindGroup) {
    let sample = |label: &str, view: &TextureView| {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout: input_bgl,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
        })
    };

    let bright_bg = sample("bloom_bright_bg", scene_view);
    let blur_h_bg = sample("bloom_blur_h_bg", ping_view);
    let blur_v_bg = sample("bloom_blur_v_bg", pong_view);

    let composite_bg = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("bloom_composite_bg"),
        layout: composite_bgl,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(scene_view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::TextureView(ping_view),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
        ],
    });

    (bright_bg, blur_h_bg, blur_v_bg, composite_bg)
}

fn encode_fullscreen_pass(
    encoder: &mut wgpu::CommandEncoder,
    label: &str,
    pipeline: &RenderPipeline,
    target: &TextureView,
    bind_groups: &[(u32, &BindGroup)],
) {
    let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some(label),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view: target,
            resolve_target: None,
            ops: wgpu::Operations {
                load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                store: StoreOp::Store,
            },
        })],
        depth_stencil_attachment: None,
        timestamp_writes: None,
        occlusion_query_set: None,
    });

    pass.set_pipeline(pipeline);
    for (index, bind_group) in bind_groups {
        pass.set_bind_group(*index, *bind_group, &[]);
    }
    pass.draw(0..3, 0..1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blur_params_match_the_wgsl_uniform_layout() {
        assert_eq!(std::mem::size_of::<BlurParams>(), 16);
    }

    #[test]
    fn blur_chain_runs_at_half_resolution_with_a_floor() {
        assert_eq!(chain_size((1280, 720)), (640, 360));
        assert_eq!(chain_size((3, 3)), (1, 1));
        assert_eq!(chain_size((1, 1)), (1, 1));
    }

    #[test]
    fn shader_constants_match_the_published_tuning_values() {
        // The WGSL bakes the conservative tuning in as constants; keep
        // them in lockstep with the crate-level values.
        assert!(COMPOSITE_FS.contains(&format!("STRENGTH: f32 = {BLOOM_STRENGTH}")));
        assert!(BRIGHT_PASS_FS.contains(&format!("THRESHOLD: f32 = {BLOOM_THRESHOLD}")));
    }

    #[test]
    fn unsupported_viewport_error_names_the_dimensions() {
        let error = BloomError::UnsupportedViewport {
            width: 0,
            height: 480,
            limit: 8192,
        };
        assert!(error.to_string().contains("0x480"));
    }
}
