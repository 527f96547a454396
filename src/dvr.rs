use crate::{
    affine::{AffinePair, BoundingBox, Placement, SingularAffineError},
    gpu_binder::{GpuBinder, ResourceAllocationError},
    label_controls::{LabelControls, LabelControlsGpu},
    metadata::{MetadataFormatError, VolumeMetadata},
    transfer_function::{TransferFunction, TransferFunctionError, TransferFunctionProvider},
    volume::WGPU,
    volume_loader::{DataFormatError, VolumeLoader},
};

use glam::Vec3;
use log::info;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InitError {
    #[error(transparent)]
    Metadata(#[from] MetadataFormatError),

    #[error(transparent)]
    Data(#[from] DataFormatError),

    #[error(transparent)]
    TransferFunction(#[from] TransferFunctionError),

    #[error(transparent)]
    Affine(#[from] SingularAffineError),

    #[error(transparent)]
    Resource(#[from] ResourceAllocationError),
}

/// The initialized volume renderer state: GPU-resident volume inputs plus
/// the mutable label control plane.
///
/// Construction runs the whole pipeline (parse, decode, affine, bind) and
/// either fully succeeds or fails with [`InitError`]; label mutations are
/// only reachable on the initialized value, so no control write can precede
/// the shader surface it publishes into. Each mutation re-syncs the full
/// 256-entry array to the device before returning.
pub struct VolumeDvr {
    wgpu: WGPU,
    metadata: VolumeMetadata,
    affine: AffinePair,
    bounding_box: BoundingBox,
    placement: Placement,
    max_intensity: f32,
    binder: GpuBinder,
    controls: LabelControls,
    controls_gpu: LabelControlsGpu,
}

impl VolumeDvr {
    /// Initialize from in-memory inputs.
    pub fn initialize(
        wgpu: WGPU,
        metadata_text: &str,
        voxel_bytes: &[u8],
        transfer_function: TransferFunction,
    ) -> Result<Self, InitError> {
        let metadata = VolumeMetadata::parse(metadata_text)?;
        let volume = VolumeLoader::load_from_bytes(voxel_bytes, &metadata)?;
        let affine = AffinePair::compute(&metadata)?;
        let bounding_box = BoundingBox::compute(&metadata, affine.forward);
        let placement = Placement::compute(&bounding_box);

        info!("affine (voxel->mm): {}", affine.forward);
        info!("inverse affine (mm->voxel): {}", affine.inverse);
        info!(
            "bbox mm min={} max={} -> placed at {} m, extents {} m",
            bounding_box.min_mm, bounding_box.max_mm, placement.center_m, placement.extents_m
        );

        let controls = LabelControls::new();
        let mut controls_gpu = LabelControlsGpu::new(&wgpu.device);
        controls_gpu.sync_to_device(&wgpu.queue, &controls);

        let binder = GpuBinder::bind(
            &wgpu,
            &volume,
            &metadata,
            &transfer_function,
            &affine,
            &controls_gpu,
        )?;
        let max_intensity = volume.max_intensity;
        // The CPU voxel copy is dropped here; the GPU texture is authoritative.

        Ok(Self {
            wgpu,
            metadata,
            affine,
            bounding_box,
            placement,
            max_intensity,
            binder,
            controls,
            controls_gpu,
        })
    }

    /// Initialize from the three input files, using `provider` for the
    /// transfer function.
    pub fn from_files(
        wgpu: WGPU,
        metadata_path: impl AsRef<Path>,
        voxel_path: impl AsRef<Path>,
        transfer_function_path: impl AsRef<Path>,
        provider: &dyn TransferFunctionProvider,
    ) -> Result<Self, InitError> {
        let transfer_function = provider.load(transfer_function_path.as_ref())?;
        let metadata_text =
            std::fs::read_to_string(metadata_path).map_err(MetadataFormatError::from)?;
        let voxel_bytes = std::fs::read(voxel_path).map_err(DataFormatError::from)?;
        Self::initialize(wgpu, &metadata_text, &voxel_bytes, transfer_function)
    }

    pub fn set_label_visible(&mut self, label: i32, visible: bool) {
        self.controls.set_visible(label, visible);
        self.sync_labels();
    }

    pub fn set_label_opacity(&mut self, label: i32, opacity01: f32) {
        self.controls.set_opacity(label, opacity01);
        self.sync_labels();
    }

    pub fn set_label_tint(&mut self, label: i32, tint: Vec3) {
        self.controls.set_tint(label, tint);
        self.sync_labels();
    }

    pub fn solo_label(&mut self, label: i32) {
        self.controls.solo(label);
        self.sync_labels();
    }

    pub fn show_all(&mut self) {
        self.controls.show_all();
        self.sync_labels();
    }

    fn sync_labels(&mut self) {
        self.controls_gpu
            .sync_to_device(&self.wgpu.queue, &self.controls);
    }

    pub fn metadata(&self) -> &VolumeMetadata {
        &self.metadata
    }

    pub fn affine(&self) -> &AffinePair {
        &self.affine
    }

    pub fn bounding_box(&self) -> &BoundingBox {
        &self.bounding_box
    }

    pub fn placement(&self) -> &Placement {
        &self.placement
    }

    /// Largest decoded intensity. Diagnostic only.
    pub fn max_intensity(&self) -> f32 {
        self.max_intensity
    }

    pub fn label_controls(&self) -> &LabelControls {
        &self.controls
    }

    pub fn binder(&self) -> &GpuBinder {
        &self.binder
    }

    pub fn wgpu(&self) -> &WGPU {
        &self.wgpu
    }
}
