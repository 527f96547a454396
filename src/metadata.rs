use serde::Deserialize;
use std::{fs, path::Path};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MetadataFormatError {
    #[error("malformed volume metadata: {0}")]
    Json(#[from] serde_json::Error),

    #[error("non-positive dimension {value} on axis {axis}")]
    NonPositiveDim { axis: usize, value: i64 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Raw form of the metadata document. `dim` goes through `i64` so that a
/// negative dimension surfaces as [`MetadataFormatError::NonPositiveDim`]
/// rather than a deserialization failure. The affine stays loosely typed;
/// a malformed shape is handled later with an identity fallback, not here.
#[derive(Deserialize)]
struct RawMetadata {
    dim: [i64; 3],
    #[serde(default = "default_spacing")]
    spacing_mm: [f32; 3],
    #[serde(default)]
    dtype: String,
    #[serde(default = "default_intensity_range")]
    intensity_range: [f32; 2],
    #[serde(default)]
    affine: Option<Vec<Vec<f32>>>,
}

fn default_spacing() -> [f32; 3] {
    [1.0, 1.0, 1.0]
}

fn default_intensity_range() -> [f32; 2] {
    [0.0, 1.0]
}

/// Descriptor of a labeled volume: voxel counts, physical spacing, the
/// declared element type (informational only), the source intensity range
/// and the optional voxel-to-millimeter affine.
#[derive(Debug, Clone)]
pub struct VolumeMetadata {
    pub dim: [u32; 3],
    pub spacing_mm: [f32; 3],
    pub dtype: String,
    pub intensity_range: [f32; 2],
    pub affine: Option<Vec<Vec<f32>>>,
}

impl VolumeMetadata {
    /// Parse a metadata JSON document.
    ///
    /// # Errors
    ///
    /// Returns [`MetadataFormatError`] if the document is malformed, `dim`
    /// is missing or any dimension is not positive.
    pub fn parse(text: &str) -> Result<Self, MetadataFormatError> {
        let raw: RawMetadata = serde_json::from_str(text)?;

        let mut dim = [0u32; 3];
        for (axis, &value) in raw.dim.iter().enumerate() {
            if value <= 0 {
                return Err(MetadataFormatError::NonPositiveDim { axis, value });
            }
            dim[axis] = value as u32;
        }

        Ok(Self {
            dim,
            spacing_mm: raw.spacing_mm,
            dtype: raw.dtype,
            intensity_range: raw.intensity_range,
            affine: raw.affine,
        })
    }

    /// Read and parse a metadata document from disk.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, MetadataFormatError> {
        Self::parse(&fs::read_to_string(path)?)
    }

    pub fn voxel_count(&self) -> usize {
        self.dim.iter().map(|&d| d as usize).product()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"{
        "dim": [4, 3, 2],
        "spacing_mm": [0.5, 0.5, 1.2],
        "dtype": "float32",
        "intensity_range": [0.0, 812.0],
        "affine": [
            [0.5, 0.0, 0.0, -10.0],
            [0.0, 0.5, 0.0, -20.0],
            [0.0, 0.0, 1.2, 5.0],
            [0.0, 0.0, 0.0, 1.0]
        ]
    }"#;

    #[test]
    fn test_parse_full_document() {
        let meta = VolumeMetadata::parse(FULL).unwrap();
        assert_eq!(meta.dim, [4, 3, 2]);
        assert_eq!(meta.spacing_mm, [0.5, 0.5, 1.2]);
        assert_eq!(meta.dtype, "float32");
        assert_eq!(meta.intensity_range, [0.0, 812.0]);
        assert_eq!(meta.voxel_count(), 24);
        let affine = meta.affine.unwrap();
        assert_eq!(affine.len(), 4);
        assert_eq!(affine[2][3], 5.0);
    }

    #[test]
    fn test_optional_fields_default() {
        let meta = VolumeMetadata::parse(r#"{"dim": [2, 2, 2]}"#).unwrap();
        assert_eq!(meta.spacing_mm, [1.0, 1.0, 1.0]);
        assert_eq!(meta.dtype, "");
        assert_eq!(meta.intensity_range, [0.0, 1.0]);
        assert!(meta.affine.is_none());
    }

    #[test]
    fn test_missing_dim_is_fatal() {
        let result = VolumeMetadata::parse(r#"{"spacing_mm": [1.0, 1.0, 1.0]}"#);
        assert!(matches!(result, Err(MetadataFormatError::Json(_))));
    }

    #[test]
    fn test_non_positive_dim_is_fatal() {
        let result = VolumeMetadata::parse(r#"{"dim": [4, 0, 2]}"#);
        assert!(matches!(
            result,
            Err(MetadataFormatError::NonPositiveDim { axis: 1, value: 0 })
        ));

        let result = VolumeMetadata::parse(r#"{"dim": [4, 3, -1]}"#);
        assert!(matches!(
            result,
            Err(MetadataFormatError::NonPositiveDim { axis: 2, value: -1 })
        ));
    }

    #[test]
    fn test_malformed_affine_is_not_fatal_at_parse_time() {
        let meta = VolumeMetadata::parse(
            r#"{"dim": [2, 2, 2], "affine": [[1.0, 0.0], [0.0, 1.0]]}"#,
        )
        .unwrap();
        // Kept as-is; the identity fallback happens when the affine is built.
        assert_eq!(meta.affine.unwrap().len(), 2);
    }
}
