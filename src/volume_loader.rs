use crate::{metadata::VolumeMetadata, volume::Volume};

use log::info;
use ndarray::Array3;
use rayon::prelude::*;
use std::{fs, path::Path};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DataFormatError {
    #[error("voxel buffer size mismatch: expected {expected} bytes, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub struct VolumeLoader;

impl VolumeLoader {
    /// Reinterpret a raw byte buffer as the dense little-endian f32 voxel
    /// field described by `metadata`.
    ///
    /// # Errors
    ///
    /// Returns [`DataFormatError::SizeMismatch`] unless the buffer holds
    /// exactly `dimX * dimY * dimZ` 32-bit floats.
    pub fn load_from_bytes(
        bytes: &[u8],
        metadata: &VolumeMetadata,
    ) -> Result<Volume, DataFormatError> {
        let [dim_x, dim_y, dim_z] = metadata.dim;
        let voxel_count = metadata.voxel_count();
        let expected = voxel_count * size_of::<f32>();
        if bytes.len() != expected {
            return Err(DataFormatError::SizeMismatch {
                expected,
                actual: bytes.len(),
            });
        }

        let voxels: Vec<f32> = bytes
            .par_chunks_exact(size_of::<f32>())
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect();

        let max_intensity = voxels
            .par_iter()
            .copied()
            .reduce(|| f32::MIN, f32::max);

        // Shape (z, y, x) keeps x the fastest axis in linear memory.
        let data = Array3::from_shape_vec(
            (dim_z as usize, dim_y as usize, dim_x as usize),
            voxels,
        )
        .expect("voxel count matches validated byte length");

        info!("volume loaded {dim_x}x{dim_y}x{dim_z} max_intensity={max_intensity}");

        Ok(Volume::new(data, max_intensity))
    }

    /// Load a raw voxel file from disk.
    pub fn load_from_file(
        path: impl AsRef<Path>,
        metadata: &VolumeMetadata,
    ) -> Result<Volume, DataFormatError> {
        Self::load_from_bytes(&fs::read(path)?, metadata)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta_2x2x2() -> VolumeMetadata {
        VolumeMetadata::parse(r#"{"dim": [2, 2, 2]}"#).unwrap()
    }

    fn le_bytes(values: &[f32]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    #[test]
    fn test_decode_order_is_x_fastest() {
        let values: Vec<f32> = (1..=8).map(|v| v as f32).collect();
        let volume = VolumeLoader::load_from_bytes(&le_bytes(&values), &meta_2x2x2()).unwrap();
        // The 6th value in source order lands at linear index 5.
        assert_eq!(volume.as_slice()[5], 6.0);
        assert_eq!(volume.value_at(1, 0, 1), 6.0);
    }

    #[test]
    fn test_max_intensity_diagnostic() {
        let values = [0.25, 3.5, -1.0, 0.0, 2.0, 1.0, 0.5, 0.75];
        let volume = VolumeLoader::load_from_bytes(&le_bytes(&values), &meta_2x2x2()).unwrap();
        assert_eq!(volume.max_intensity, 3.5);
    }

    #[test]
    fn test_size_mismatch_is_fatal() {
        let meta = meta_2x2x2();
        // 8 voxels declared, 7 floats provided.
        let bytes = le_bytes(&[0.0; 7]);
        let result = VolumeLoader::load_from_bytes(&bytes, &meta);
        assert!(matches!(
            result,
            Err(DataFormatError::SizeMismatch {
                expected: 32,
                actual: 28
            })
        ));

        // A length that is not a multiple of 4 fails the same way.
        let result = VolumeLoader::load_from_bytes(&[0u8; 33], &meta);
        assert!(matches!(
            result,
            Err(DataFormatError::SizeMismatch {
                expected: 32,
                actual: 33
            })
        ));
    }
}
