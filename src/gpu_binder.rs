use crate::{
    affine::AffinePair,
    label_controls::{LABEL_COUNT, LabelControlsGpu},
    metadata::VolumeMetadata,
    transfer_function::TransferFunction,
    volume::{Volume, WGPU},
};

use thiserror::Error;
use wgpu::util::DeviceExt;

#[derive(Debug, Error)]
pub enum ResourceAllocationError {
    #[error("volume dimensions {requested:?} exceed the device 3d texture limit {limit}")]
    VolumeTextureTooLarge { requested: [u32; 3], limit: u32 },

    #[error("lookup size {requested} exceeds the device 1d texture limit {limit}")]
    LookupTextureTooLarge { requested: u32, limit: u32 },
}

/// Shader-visible scalars and matrices, uploaded once at bind time. Field
/// names are the stable interface; matrices are column-major as WGSL expects.
#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct VolumeUniforms {
    pub affine: [[f32; 4]; 4],
    pub inv_affine: [[f32; 4]; 4],
    pub dim: [f32; 4],
    pub is_label_map: u32,
    pub p1: f32,
    pub p99: f32,
    pub _padding: u32,
}

impl VolumeUniforms {
    fn new(metadata: &VolumeMetadata, affine: &AffinePair, tf: &TransferFunction) -> Self {
        let [dim_x, dim_y, dim_z] = metadata.dim;
        Self {
            affine: affine.forward.to_cols_array_2d(),
            inv_affine: affine.inverse.to_cols_array_2d(),
            dim: [dim_x as f32, dim_y as f32, dim_z as f32, 1.0],
            is_label_map: tf.is_label_map as u32,
            p1: tf.p1,
            p99: tf.p99,
            _padding: 0,
        }
    }
}

/// Owns the GPU-resident volume inputs: the 3-D intensity texture, the
/// transfer-function lookup, samplers and the uniform buffer, published as
/// one bind group for the raymarch shader.
///
/// Bindings: 0 = 3-D volume texture, 1 = linear clamp sampler, 2 = 1-D
/// transfer-function texture, 3 = 1-D label-control texture, 4 = nearest
/// sampler for the lookups, 5 = [`VolumeUniforms`].
///
/// The volume and transfer-function textures use `Rgba32Float` and are
/// sampled with linear filtering, so the device must have
/// `wgpu::Features::FLOAT32_FILTERABLE` enabled.
pub struct GpuBinder {
    volume_texture: wgpu::Texture,
    volume_view: wgpu::TextureView,
    tf_texture: wgpu::Texture,
    tf_view: wgpu::TextureView,
    volume_sampler: wgpu::Sampler,
    lookup_sampler: wgpu::Sampler,
    uniform_buffer: wgpu::Buffer,
    bind_group_layout: wgpu::BindGroupLayout,
    bind_group: wgpu::BindGroup,
}

impl GpuBinder {
    /// Upload the decoded volume and transfer function and publish the full
    /// shader input surface. The volume texture is written exactly once;
    /// the field is immutable after this call.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceAllocationError`] when a texture would exceed the
    /// device limits. Nothing is allocated in that case.
    pub fn bind(
        wgpu: &WGPU,
        volume: &Volume,
        metadata: &VolumeMetadata,
        tf: &TransferFunction,
        affine: &AffinePair,
        labels: &LabelControlsGpu,
    ) -> Result<Self, ResourceAllocationError> {
        let WGPU { device, queue } = wgpu;
        let [dim_x, dim_y, dim_z] = metadata.dim;

        check_limits(&device.limits(), metadata.dim, tf.lut.len() as u32)?;

        let texture_size = wgpu::Extent3d {
            width: dim_x,
            height: dim_y,
            depth_or_array_layers: dim_z,
        };

        let volume_texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Volume 3D Texture"),
            size: texture_size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D3,
            format: wgpu::TextureFormat::Rgba32Float,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        let samples = volume.rgba_samples();
        queue.write_texture(
            wgpu::TexelCopyTextureInfoBase {
                texture: &volume_texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            bytemuck::cast_slice(&samples),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(dim_x * size_of::<[f32; 4]>() as u32),
                rows_per_image: Some(dim_y),
            },
            texture_size,
        );

        let volume_view = volume_texture.create_view(&wgpu::TextureViewDescriptor::default());

        let tf_texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Transfer Function Texture"),
            size: wgpu::Extent3d {
                width: tf.lut.len() as u32,
                height: 1,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D1,
            format: wgpu::TextureFormat::Rgba32Float,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        queue.write_texture(
            wgpu::TexelCopyTextureInfoBase {
                texture: &tf_texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            bytemuck::cast_slice(&tf.lut),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some((tf.lut.len() * size_of::<[f32; 4]>()) as u32),
                rows_per_image: None,
            },
            wgpu::Extent3d {
                width: tf.lut.len() as u32,
                height: 1,
                depth_or_array_layers: 1,
            },
        );

        let tf_view = tf_texture.create_view(&wgpu::TextureViewDescriptor::default());

        let volume_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Volume Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        // Per-label values must never blend across entries.
        let lookup_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Lookup Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let uniforms = VolumeUniforms::new(metadata, affine, tf);
        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Volume Uniform Buffer"),
            contents: bytemuck::bytes_of(&uniforms),
            usage: wgpu::BufferUsages::UNIFORM,
        });

        let visibility = wgpu::ShaderStages::FRAGMENT | wgpu::ShaderStages::COMPUTE;
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Volume Bind Group Layout"),
            entries: &[
                // 3D intensity texture
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D3,
                        multisampled: false,
                    },
                    count: None,
                },
                // Linear sampler
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
                // Transfer-function lookup
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D1,
                        multisampled: false,
                    },
                    count: None,
                },
                // Label-control lookup
                wgpu::BindGroupLayoutEntry {
                    binding: 3,
                    visibility,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: false },
                        view_dimension: wgpu::TextureViewDimension::D1,
                        multisampled: false,
                    },
                    count: None,
                },
                // Nearest sampler for the lookups
                wgpu::BindGroupLayoutEntry {
                    binding: 4,
                    visibility,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::NonFiltering),
                    count: None,
                },
                // Uniforms
                wgpu::BindGroupLayoutEntry {
                    binding: 5,
                    visibility,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Volume Bind Group"),
            layout: &bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&volume_view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&volume_sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(&tf_view),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::TextureView(labels.view()),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: wgpu::BindingResource::Sampler(&lookup_sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 5,
                    resource: uniform_buffer.as_entire_binding(),
                },
            ],
        });

        Ok(Self {
            volume_texture,
            volume_view,
            tf_texture,
            tf_view,
            volume_sampler,
            lookup_sampler,
            uniform_buffer,
            bind_group_layout,
            bind_group,
        })
    }

    pub fn bind_group(&self) -> &wgpu::BindGroup {
        &self.bind_group
    }

    pub fn bind_group_layout(&self) -> &wgpu::BindGroupLayout {
        &self.bind_group_layout
    }
}

fn check_limits(
    limits: &wgpu::Limits,
    dim: [u32; 3],
    lut_len: u32,
) -> Result<(), ResourceAllocationError> {
    let limit_3d = limits.max_texture_dimension_3d;
    if dim.iter().any(|&d| d > limit_3d) {
        return Err(ResourceAllocationError::VolumeTextureTooLarge {
            requested: dim,
            limit: limit_3d,
        });
    }
    let limit_1d = limits.max_texture_dimension_1d;
    for requested in [lut_len, LABEL_COUNT as u32] {
        if requested > limit_1d {
            return Err(ResourceAllocationError::LookupTextureTooLarge {
                requested,
                limit: limit_1d,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transfer_function::JsonTransferFunctionProvider;
    use glam::Mat4;

    #[test]
    fn test_check_limits_rejects_oversized_volume() {
        let limits = wgpu::Limits {
            max_texture_dimension_3d: 256,
            ..Default::default()
        };
        let result = check_limits(&limits, [512, 64, 64], 256);
        assert!(matches!(
            result,
            Err(ResourceAllocationError::VolumeTextureTooLarge {
                requested: [512, 64, 64],
                limit: 256
            })
        ));
        assert!(check_limits(&limits, [256, 256, 256], 256).is_ok());
    }

    #[test]
    fn test_check_limits_rejects_oversized_lookup() {
        let limits = wgpu::Limits {
            max_texture_dimension_1d: 128,
            ..Default::default()
        };
        let result = check_limits(&limits, [64, 64, 64], 4096);
        assert!(matches!(
            result,
            Err(ResourceAllocationError::LookupTextureTooLarge { requested: 4096, .. })
        ));
    }

    #[test]
    fn test_uniforms_pack_scalars_verbatim() {
        let metadata = VolumeMetadata::parse(r#"{"dim": [4, 3, 2]}"#).unwrap();
        let affine = AffinePair {
            forward: Mat4::IDENTITY,
            inverse: Mat4::IDENTITY,
        };
        let tf = JsonTransferFunctionProvider::parse(
            r#"{"label_map": true, "p1": 0.05, "p99": 0.95, "colors": [[1.0, 1.0, 1.0, 1.0]]}"#,
        )
        .unwrap();
        let uniforms = VolumeUniforms::new(&metadata, &affine, &tf);
        assert_eq!(uniforms.dim, [4.0, 3.0, 2.0, 1.0]);
        assert_eq!(uniforms.is_label_map, 1);
        assert_eq!(uniforms.p1, 0.05);
        assert_eq!(uniforms.p99, 0.95);
        assert_eq!(uniforms.affine[0][0], 1.0);
        // Uniform block size stays 16-byte aligned.
        assert_eq!(size_of::<VolumeUniforms>() % 16, 0);
    }
}
