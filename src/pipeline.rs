//! The particle render pipeline: shader pair, uniform contract and
//! instance layout.
//!
//! Each particle is an instanced camera-facing quad (WebGPU has no
//! sizable point primitive). The vertex stage morphs between the sphere
//! and torus layouts and adds seeded flow jitter; the fragment stage
//! shapes a soft additive disc with a rim term and the two-color height
//! gradient.

use wgpu::util::DeviceExt;
use wgpu::{
    BindGroup, BindGroupLayout, Buffer, Device, RenderPipeline, StoreOp, Texture, TextureView,
};

use crate::geometry::ParticleSet;

/// Depth buffer format. The backdrop depth-tests but never writes depth,
/// so a plain depth format suffices.
pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// The particle pass renders at 4x MSAA and resolves into its target.
/// Every WebGPU adapter supports 4 samples for the formats used here.
pub const MSAA_SAMPLE_COUNT: u32 = 4;

/// Base point diameter, before the per-seed variation.
pub const DEFAULT_POINT_SIZE: f32 = 1.6;

const PARTICLE_SHADER: &str = r#"
struct Uniforms {
    projection: mat4x4<f32>,
    model_view: mat4x4<f32>,
    color_a: vec3<f32>,
    time: f32,
    color_b: vec3<f32>,
    point_size: f32,
    morph_factor: f32,
    color_intensity: f32,
    rim_strength: f32,
    point_scale: f32,
};

@group(0) @binding(0) var<uniform> u: Uniforms;

struct VertexInput {
    @builtin(vertex_index) corner_index: u32,
    @location(0) sphere_position: vec3<f32>,
    @location(1) torus_position: vec3<f32>,
    @location(2) seed: f32,
};

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) uv: vec2<f32>,
    @location(1) seed: f32,
    @location(2) height: f32,
};

fn pseudo_noise(x: f32) -> f32 {
    return sin(x) * 0.5 + 0.5;
}

// Quintic easing with flat first and second derivatives at both edges.
fn smootherstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = clamp((x - edge0) / (edge1 - edge0), 0.0, 1.0);
    return t * t * t * (t * (t * 6.0 - 15.0) + 10.0);
}

@vertex
fn vs_main(in: VertexInput) -> VertexOutput {
    // Quad corner in [-1, 1] from the vertex index (triangle strip).
    let corner = vec2<f32>(
        f32(in.corner_index & 1u) * 2.0 - 1.0,
        f32((in.corner_index >> 1u) & 1u) * 2.0 - 1.0,
    );

    // Pure sphere below 0.3, pure torus above 0.7.
    let morph_t = smootherstep(0.3, 0.7, u.morph_factor);
    let morphed = mix(in.sphere_position, in.torus_position, morph_t);

    let t = u.time * (0.3 + in.seed * 0.7);
    let phase = pseudo_noise(morphed.x * 0.02 + morphed.y * 0.03 + t * 0.8 + in.seed * 10.0);

    // Flow settles to 30% of its resting magnitude once fully morphed.
    let flow_intensity = 1.0 - morph_t * 0.7;
    let flow = normalize(vec3<f32>(
        sin(t + in.seed * 6.2831),
        cos(t * 0.7 + in.seed * 3.1415),
        sin(morphed.x * 0.01 + in.seed),
    )) * (8.0 * phase * flow_intensity);

    var view_position = u.model_view * vec4<f32>(morphed + flow, 1.0);

    // Perspective-correct sizing: the pixel formula
    // point_size * (1 + seed * 1.2) * 300 / -z, converted to view-space
    // units at depth z. The depths cancel, leaving u.point_scale.
    let diameter = u.point_size * (1.0 + in.seed * 1.2) * u.point_scale;
    view_position = vec4<f32>(view_position.xy + corner * 0.5 * diameter, view_position.zw);

    var out: VertexOutput;
    out.clip_position = u.projection * view_position;
    out.uv = corner * 0.5 + vec2<f32>(0.5, 0.5);
    out.seed = in.seed;
    out.height = morphed.y;
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let offset = in.uv - vec2<f32>(0.5, 0.5);
    let d = length(offset);

    // Soft disc with a Fresnel-like rim, weighted by the scene light.
    let alpha = 1.0 - smoothstep(0.0, 0.5, d);
    let fresnel = pow(1.0 - smoothstep(0.0, 0.5, d), 2.0);
    let final_alpha = alpha * (0.9 + fresnel * u.rim_strength);

    // Gradient by height (-40..40 world units) plus seed jitter.
    let mix_value = clamp((in.height + 40.0) / 80.0 + in.seed * 0.2, 0.0, 1.0);
    let color = mix(u.color_a, u.color_b, mix_value) * u.color_intensity;

    return vec4<f32>(color, final_alpha);
}
"#;

/// The complete per-frame uniform contract of the shader pair. Written
/// once per frame by the lifecycle controller and by nobody else.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ParticleUniforms {
    pub projection: [[f32; 4]; 4],
    pub model_view: [[f32; 4]; 4],
    pub color_a: [f32; 3],
    /// Animation clock in seconds.
    pub time: f32,
    pub color_b: [f32; 3],
    /// Base point diameter before per-seed variation.
    pub point_size: f32,
    /// Sphere-to-torus blend input in [0, 1].
    pub morph_factor: f32,
    /// Gradient brightness scale.
    pub color_intensity: f32,
    /// Weight of the fragment rim term (the scene light's intensity).
    pub rim_strength: f32,
    /// Pixels-to-view-units conversion for point sizing. Depends only on
    /// the field of view and viewport height; recomputed on resize.
    pub point_scale: f32,
}

impl ParticleUniforms {
    /// Conversion factor so a `300 / -z`-pixel point covers the same
    /// on-screen extent as it would with a sizable point primitive:
    /// `2 * tan(fov/2) * 300 / viewport_height`, with the depth cancelled
    /// out.
    pub fn point_scale(fov_y_radians: f32, viewport_height_px: u32) -> f32 {
        600.0 * (fov_y_radians / 2.0).tan() / viewport_height_px.max(1) as f32
    }
}

/// Per-particle instance data: both morph endpoints and the seed. The
/// corner of the quad comes from the vertex index, so four strip vertices
/// share one instance.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ParticleInstance {
    pub sphere_position: [f32; 3],
    pub torus_position: [f32; 3],
    pub seed: f32,
}

impl ParticleInstance {
    const ATTRIBUTES: [wgpu::VertexAttribute; 3] = wgpu::vertex_attr_array![
        0 => Float32x3,
        1 => Float32x3,
        2 => Float32,
    ];

    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<ParticleInstance>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &Self::ATTRIBUTES,
        }
    }

    /// Zeroed instances: what the backdrop renders while a background
    /// geometry batch is still in flight.
    pub fn zeroed(count: usize) -> Vec<Self> {
        vec![Self::zeroed_one(); count]
    }

    fn zeroed_one() -> Self {
        Self {
            sphere_position: [0.0; 3],
            torus_position: [0.0; 3],
            seed: 0.0,
        }
    }

    /// Interleaves a generated particle set into instance records.
    pub fn pack(set: &ParticleSet) -> Vec<Self> {
        (0..set.count)
            .map(|i| Self {
                sphere_position: [
                    set.sphere[i * 3],
                    set.sphere[i * 3 + 1],
                    set.sphere[i * 3 + 2],
                ],
                torus_position: [
                    set.torus[i * 3],
                    set.torus[i * 3 + 1],
                    set.torus[i * 3 + 2],
                ],
                seed: set.seeds[i],
            })
            .collect()
    }
}

/// Creates the uniform bind group layout shared by the pipeline and its
/// bind group.
pub fn create_uniform_bind_group_layout(device: &Device) -> BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("particle_uniform_bgl"),
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }],
    })
}

/// Builds the particle pipeline with its uniform buffer and bind group.
pub fn create_particle_pipeline(
    device: &Device,
    format: wgpu::TextureFormat,
    initial_uniforms: ParticleUniforms,
) -> (Buffer, BindGroup, RenderPipeline) {
    let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("particle_uniform_buffer"),
        contents: bytemuck::cast_slice(&[initial_uniforms]),
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
    });

    let bind_group_layout = create_uniform_bind_group_layout(device);
    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("particle_uniform_bg"),
        layout: &bind_group_layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: uniform_buffer.as_entire_binding(),
        }],
    });

    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("particle_shader"),
        source: wgpu::ShaderSource::Wgsl(PARTICLE_SHADER.into()),
    });

    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("particle_pipeline_layout"),
        bind_group_layouts: &[&bind_group_layout],
        push_constant_ranges: &[],
    });

    let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("particle_pipeline"),
        layout: Some(&pipeline_layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: Some("vs_main"),
            compilation_options: Default::default(),
            buffers: &[ParticleInstance::desc()],
        },
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: Some("fs_main"),
            compilation_options: Default::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                // Additive glow: fragments accumulate into the target.
                blend: Some(wgpu::BlendState {
                    color: wgpu::BlendComponent {
                        src_factor: wgpu::BlendFactor::SrcAlpha,
                        dst_factor: wgpu::BlendFactor::One,
                        operation: wgpu::BlendOperation::Add,
                    },
                    alpha: wgpu::BlendComponent {
                        src_factor: wgpu::BlendFactor::One,
                        dst_factor: wgpu::BlendFactor::One,
                        operation: wgpu::BlendOperation::Add,
                    },
                }),
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleStrip,
            cull_mode: None,
            ..Default::default()
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            // Depth-tested against the cleared buffer, never written:
            // additive transparency has no meaningful draw order.
            depth_write_enabled: false,
            depth_compare: wgpu::CompareFunction::Less,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState {
            count: MSAA_SAMPLE_COUNT,
            ..Default::default()
        },
        multiview: None,
        cache: None,
    });

    (uniform_buffer, bind_group, pipeline)
}

pub fn create_depth_texture(device: &Device, size: (u32, u32)) -> Texture {
    device.create_texture(&wgpu::TextureDescriptor {
        label: Some("particle_depth_texture"),
        size: wgpu::Extent3d {
            width: size.0.max(1),
            height: size.1.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: MSAA_SAMPLE_COUNT,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    })
}

/// Multisampled color target the particle pass draws into before
/// resolving to the surface or the bloom scene texture.
pub fn create_msaa_color_texture(
    device: &Device,
    format: wgpu::TextureFormat,
    size: (u32, u32),
) -> Texture {
    device.create_texture(&wgpu::TextureDescriptor {
        label: Some("particle_msaa_texture"),
        size: wgpu::Extent3d {
            width: size.0.max(1),
            height: size.1.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: MSAA_SAMPLE_COUNT,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    })
}

/// Records the particle draw into `encoder`: one instanced strip draw
/// into the multisampled attachment, resolved to `resolve_view`.
#[allow(clippy::too_many_arguments)]
pub fn encode_particle_pass(
    encoder: &mut wgpu::CommandEncoder,
    msaa_view: &TextureView,
    resolve_view: &TextureView,
    depth_view: &TextureView,
    clear_color: wgpu::Color,
    pipeline: &RenderPipeline,
    bind_group: &BindGroup,
    instance_buffer: &Buffer,
    instance_count: u32,
) {
    let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some("particle_pass"),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view: msaa_view,
            resolve_target: Some(resolve_view),
            ops: wgpu::Operations {
                load: wgpu::LoadOp::Clear(clear_color),
                store: StoreOp::Store,
            },
        })],
        depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
            view: depth_view,
            depth_ops: Some(wgpu::Operations {
                load: wgpu::LoadOp::Clear(1.0),
                store: StoreOp::Store,
            }),
            stencil_ops: None,
        }),
        timestamp_writes: None,
        occlusion_query_set: None,
    });

    pass.set_pipeline(pipeline);
    pass.set_bind_group(0, bind_group, &[]);
    pass.set_vertex_buffer(0, instance_buffer.slice(..));
    pass.draw(0..4, 0..instance_count);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{LayoutParams, ParticleSet};

    #[test]
    fn uniform_struct_has_the_wgsl_layout_size() {
        // 2 mat4x4 + 2 (vec3 + f32) + 4 scalars = 176 bytes.
        assert_eq!(std::mem::size_of::<ParticleUniforms>(), 176);
    }

    #[test]
    fn instance_stride_matches_the_vertex_layout() {
        assert_eq!(std::mem::size_of::<ParticleInstance>(), 28);
        assert_eq!(ParticleInstance::desc().array_stride, 28);
    }

    #[test]
    fn packing_keeps_layouts_index_aligned() {
        let set = ParticleSet::generate(50, &LayoutParams::default());
        let instances = ParticleInstance::pack(&set);
        assert_eq!(instances.len(), 50);

        for (i, instance) in instances.iter().enumerate() {
            assert_eq!(instance.sphere_position[0], set.sphere[i * 3]);
            assert_eq!(instance.torus_position[2], set.torus[i * 3 + 2]);
            assert_eq!(instance.seed, set.seeds[i]);
        }
    }

    #[test]
    fn zeroed_instances_render_at_the_origin() {
        let instances = ParticleInstance::zeroed(220);
        assert_eq!(instances.len(), 220);
        assert!(instances
            .iter()
            .all(|p| p.sphere_position == [0.0; 3] && p.torus_position == [0.0; 3]));
    }

    #[test]
    fn point_scale_cancels_depth_out_of_the_pixel_formula() {
        // At fov 45 and a 480px-high viewport, a particle sized
        // 300 / -z pixels subtends 300 / 480 of the viewport height at
        // any depth; the view-space diameter per unit point size is
        // 2 * tan(fov/2) * z * (300 / 480) / z.
        let scale = ParticleUniforms::point_scale(45.0_f32.to_radians(), 480);
        let expected = 2.0 * (45.0_f32.to_radians() / 2.0).tan() * 300.0 / 480.0;
        assert!((scale - expected).abs() < 1e-6);
    }
}
