use crate::metadata::VolumeMetadata;

use glam::{Mat4, Quat, Vec3, Vec4};
use log::warn;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("voxel-to-physical affine is singular and cannot be inverted")]
pub struct SingularAffineError;

/// Forward maps homogeneous voxel indices `(i, j, k, 1)` to physical
/// millimeters; inverse maps millimeters back to voxel indices.
#[derive(Debug, Clone, Copy)]
pub struct AffinePair {
    pub forward: Mat4,
    pub inverse: Mat4,
}

impl AffinePair {
    /// Build the voxel-to-millimeter matrix from the descriptor and invert
    /// it. A missing or non-4x4 affine is substituted with identity after a
    /// warning; a singular matrix is fatal.
    pub fn compute(metadata: &VolumeMetadata) -> Result<Self, SingularAffineError> {
        let forward = forward_from_metadata(metadata);
        let det = forward.determinant();
        if det == 0.0 || !det.is_finite() {
            return Err(SingularAffineError);
        }
        let inverse = forward.inverse();
        if !inverse.is_finite() {
            return Err(SingularAffineError);
        }
        Ok(Self { forward, inverse })
    }
}

fn forward_from_metadata(metadata: &VolumeMetadata) -> Mat4 {
    match rows_4x4(metadata.affine.as_deref()) {
        Some(rows) => Mat4::from_cols_array_2d(&rows).transpose(),
        None => {
            warn!("volume affine is missing or not 4x4, using identity");
            Mat4::IDENTITY
        }
    }
}

fn rows_4x4(affine: Option<&[Vec<f32>]>) -> Option<[[f32; 4]; 4]> {
    let rows = affine?;
    if rows.len() != 4 {
        return None;
    }
    let mut out = [[0.0f32; 4]; 4];
    for (row, values) in out.iter_mut().zip(rows) {
        if values.len() != 4 {
            return None;
        }
        row.copy_from_slice(values);
    }
    Some(out)
}

/// Physical-space axis-aligned bounds of the voxel grid, in millimeters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_mm: Vec3,
    pub max_mm: Vec3,
}

impl BoundingBox {
    /// Transform the eight extremal-index corners `{0, dim-1}^3` through the
    /// forward affine and min/max-reduce them.
    pub fn compute(metadata: &VolumeMetadata, forward: Mat4) -> Self {
        let extent = metadata.dim.map(|d| (d - 1) as f32);

        let mut min_mm = Vec3::INFINITY;
        let mut max_mm = Vec3::NEG_INFINITY;
        for corner in 0..8u32 {
            let ijk = Vec3::new(
                if corner & 1 != 0 { extent[0] } else { 0.0 },
                if corner & 2 != 0 { extent[1] } else { 0.0 },
                if corner & 4 != 0 { extent[2] } else { 0.0 },
            );
            let mm = forward.mul_vec4(Vec4::new(ijk.x, ijk.y, ijk.z, 1.0)).truncate();
            min_mm = min_mm.min(mm);
            max_mm = max_mm.max(mm);
        }

        Self { min_mm, max_mm }
    }

    pub fn size_mm(&self) -> Vec3 {
        self.max_mm - self.min_mm
    }

    pub fn center_mm(&self) -> Vec3 {
        (self.min_mm + self.max_mm) * 0.5
    }
}

/// Rotation applied to the placed rendering geometry.
///
/// The expected source data is stacked axial slices with the patient's
/// superior axis along +Z, while the rendering frame is Y-up; -90 degrees
/// about X reconciles the two. This is an assumption about the data source,
/// not a general transform - revisit for differently-oriented sources.
pub fn source_axis_fix() -> Quat {
    Quat::from_rotation_x(-90f32.to_radians())
}

const MM_PER_METER: f32 = 1000.0;

/// World placement of the bounding geometry: center and extents in meters
/// plus the fixed orientation correction.
#[derive(Debug, Clone, Copy)]
pub struct Placement {
    pub center_m: Vec3,
    pub extents_m: Vec3,
    pub rotation: Quat,
}

impl Placement {
    pub fn compute(bounds: &BoundingBox) -> Self {
        Self {
            center_m: bounds.center_mm() / MM_PER_METER,
            extents_m: bounds.size_mm() / MM_PER_METER,
            rotation: source_axis_fix(),
        }
    }
}
