use ndarray::Array3;
use rayon::prelude::*;
use wgpu::Device;
use wgpu::Queue;

pub struct WGPU {
    pub device: Device,
    pub queue: Queue,
}

/// A dense scalar intensity field decoded from a raw voxel buffer.
///
/// The array is stored with shape `(dimZ, dimY, dimX)` so that x is the
/// fastest-varying axis in memory: linear index = `x + dimX*(y + dimY*z)`.
pub struct Volume {
    pub data: Array3<f32>,
    /// Largest intensity seen while decoding. Diagnostic only.
    pub max_intensity: f32,
}

impl Volume {
    pub fn new(data: Array3<f32>, max_intensity: f32) -> Self {
        Self {
            data,
            max_intensity,
        }
    }

    /// Voxel counts as `(dimX, dimY, dimZ)`, matching the metadata order.
    pub fn dim(&self) -> (u32, u32, u32) {
        let (z, y, x) = self.data.dim();
        (x as u32, y as u32, z as u32)
    }

    pub fn voxel_count(&self) -> usize {
        self.data.len()
    }

    /// Intensity at voxel index `(x, y, z)`.
    pub fn value_at(&self, x: usize, y: usize, z: usize) -> f32 {
        self.data[[z, y, x]]
    }

    /// The field in linear upload order (x fastest).
    pub fn as_slice(&self) -> &[f32] {
        self.data.as_slice().expect("volume array must be contiguous")
    }

    /// Each voxel replicated into an RGBA sample (r=g=b=a=intensity), the
    /// staging representation the 3-D texture upload consumes.
    pub fn rgba_samples(&self) -> Vec<[f32; 4]> {
        self.as_slice()
            .par_iter()
            .map(|&v| [v, v, v, v])
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn volume_2x2x2() -> Volume {
        let values: Vec<f32> = (0..8).map(|v| v as f32 * 10.0).collect();
        let data = Array3::from_shape_vec((2, 2, 2), values).unwrap();
        Volume::new(data, 70.0)
    }

    #[test]
    fn test_dim_matches_metadata_order() {
        let values = vec![0.0f32; 24];
        let data = Array3::from_shape_vec((2, 3, 4), values).unwrap();
        let volume = Volume::new(data, 0.0);
        assert_eq!(volume.dim(), (4, 3, 2));
        assert_eq!(volume.voxel_count(), 24);
    }

    #[test]
    fn test_linear_order_is_x_fastest() {
        let volume = volume_2x2x2();
        // linear index 5 = x + 2*(y + 2*z) with x=1, y=0, z=1
        assert_eq!(volume.as_slice()[5], 50.0);
        assert_eq!(volume.value_at(1, 0, 1), 50.0);
    }

    #[test]
    fn test_rgba_samples_replicate_intensity() {
        let volume = volume_2x2x2();
        let samples = volume.rgba_samples();
        assert_eq!(samples.len(), 8);
        assert_eq!(samples[5], [50.0, 50.0, 50.0, 50.0]);
    }
}
