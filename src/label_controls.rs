use glam::Vec3;

/// Fixed size of the label control plane, one entry per 8-bit label id.
pub const LABEL_COUNT: usize = 256;

/// Per-label display controls: RGB carries the tint, alpha carries combined
/// visibility and opacity. Hidden and opacity-zero share the same stored
/// alpha, so `set_opacity` on a hidden label makes it visible again; this
/// conflation is part of the contract.
///
/// The array carries a version that advances on every mutation;
/// [`LabelControlsGpu::sync_to_device`] compares against it to decide when
/// the GPU mirror needs the full array re-uploaded.
pub struct LabelControls {
    entries: [[f32; 4]; LABEL_COUNT],
    version: u64,
}

impl Default for LabelControls {
    fn default() -> Self {
        Self::new()
    }
}

impl LabelControls {
    /// Every label starts fully visible and untinted.
    pub fn new() -> Self {
        Self {
            entries: [[1.0; 4]; LABEL_COUNT],
            version: 0,
        }
    }

    fn index(label: i32) -> Option<usize> {
        usize::try_from(label).ok().filter(|&i| i < LABEL_COUNT)
    }

    /// Show or hide a label. No-op for ids outside `[0, 255]`.
    pub fn set_visible(&mut self, label: i32, visible: bool) {
        let Some(i) = Self::index(label) else { return };
        self.entries[i][3] = if visible { 1.0 } else { 0.0 };
        self.version += 1;
    }

    /// Set a label's opacity, clamped to `[0, 1]`. Overwrites any hidden
    /// state. No-op for ids outside `[0, 255]`.
    pub fn set_opacity(&mut self, label: i32, opacity01: f32) {
        let Some(i) = Self::index(label) else { return };
        self.entries[i][3] = opacity01.clamp(0.0, 1.0);
        self.version += 1;
    }

    /// Overwrite a label's RGB tint, leaving alpha untouched. No-op for ids
    /// outside `[0, 255]`.
    pub fn set_tint(&mut self, label: i32, tint: Vec3) {
        let Some(i) = Self::index(label) else { return };
        self.entries[i][..3].copy_from_slice(&tint.to_array());
        self.version += 1;
    }

    /// Show exactly one label and hide all others, tints untouched. An
    /// out-of-range id matches nothing and hides every label.
    pub fn solo(&mut self, label: i32) {
        for (i, entry) in self.entries.iter_mut().enumerate() {
            entry[3] = if i as i32 == label { 1.0 } else { 0.0 };
        }
        self.version += 1;
    }

    /// Reset every label to fully visible and untinted.
    pub fn show_all(&mut self) {
        for entry in &mut self.entries {
            *entry = [1.0; 4];
        }
        self.version += 1;
    }

    pub fn entries(&self) -> &[[f32; 4]; LABEL_COUNT] {
        &self.entries
    }

    pub fn version(&self) -> u64 {
        self.version
    }
}

/// GPU mirror of [`LabelControls`]: a 256-wide 1-D RGBA float texture the
/// raymarch shader samples per voxel label.
pub struct LabelControlsGpu {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    synced_version: Option<u64>,
}

impl LabelControlsGpu {
    pub fn new(device: &wgpu::Device) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Label Control Texture"),
            size: wgpu::Extent3d {
                width: LABEL_COUNT as u32,
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
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            texture,
            view,
            synced_version: None,
        }
    }

    /// Re-upload the full 256-entry array if the CPU copy has moved on since
    /// the last sync.
    pub fn sync_to_device(&mut self, queue: &wgpu::Queue, controls: &LabelControls) {
        if self.synced_version == Some(controls.version()) {
            return;
        }
        queue.write_texture(
            wgpu::TexelCopyTextureInfoBase {
                texture: &self.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            bytemuck::cast_slice(controls.entries().as_slice()),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some((LABEL_COUNT * size_of::<[f32; 4]>()) as u32),
                rows_per_image: None,
            },
            wgpu::Extent3d {
                width: LABEL_COUNT as u32,
                height: 1,
                depth_or_array_layers: 1,
            },
        );
        self.synced_version = Some(controls.version());
    }

    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state_is_all_visible_white() {
        let controls = LabelControls::new();
        assert!(controls.entries().iter().all(|&e| e == [1.0; 4]));
        assert_eq!(controls.version(), 0);
    }

    #[test]
    fn test_set_visible_writes_alpha() {
        let mut controls = LabelControls::new();
        controls.set_visible(7, false);
        assert_eq!(controls.entries()[7][3], 0.0);
        controls.set_visible(7, true);
        assert_eq!(controls.entries()[7][3], 1.0);
    }

    #[test]
    fn test_set_opacity_clamps() {
        let mut controls = LabelControls::new();
        controls.set_opacity(3, 1.7);
        assert_eq!(controls.entries()[3][3], 1.0);
        controls.set_opacity(3, -0.5);
        assert_eq!(controls.entries()[3][3], 0.0);
        controls.set_opacity(3, 0.25);
        assert_eq!(controls.entries()[3][3], 0.25);
    }

    #[test]
    fn test_hidden_state_is_conflated_with_opacity() {
        // Hiding then setting opacity makes the label visible at that
        // opacity: alpha is the only stored channel for both, by contract.
        let mut controls = LabelControls::new();
        controls.set_visible(5, false);
        controls.set_opacity(5, 0.7);
        assert_eq!(controls.entries()[5][3], 0.7);
    }

    #[test]
    fn test_set_tint_leaves_alpha_untouched() {
        let mut controls = LabelControls::new();
        controls.set_opacity(9, 0.4);
        controls.set_tint(9, Vec3::new(0.8, 0.1, 0.2));
        assert_eq!(controls.entries()[9], [0.8, 0.1, 0.2, 0.4]);
    }

    #[test]
    fn test_solo_isolates_one_label() {
        let mut controls = LabelControls::new();
        controls.set_tint(4, Vec3::new(0.5, 0.5, 0.0));
        controls.solo(4);
        for (i, entry) in controls.entries().iter().enumerate() {
            let expected = if i == 4 { 1.0 } else { 0.0 };
            assert_eq!(entry[3], expected, "alpha mismatch at label {i}");
        }
        // RGB stays as it was for every label.
        assert_eq!(controls.entries()[4][..3], [0.5, 0.5, 0.0]);
        assert_eq!(controls.entries()[0][..3], [1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_solo_out_of_range_hides_everything() {
        let mut controls = LabelControls::new();
        controls.solo(-1);
        assert!(controls.entries().iter().all(|e| e[3] == 0.0));
    }

    #[test]
    fn test_show_all_resets_after_mixed_mutations() {
        let mut controls = LabelControls::new();
        controls.set_visible(1, false);
        controls.set_opacity(2, 0.3);
        controls.set_tint(3, Vec3::new(0.2, 0.4, 0.6));
        controls.solo(4);
        controls.show_all();
        assert!(controls.entries().iter().all(|&e| e == [1.0; 4]));
    }

    #[test]
    fn test_out_of_range_ids_are_no_ops() {
        let mut controls = LabelControls::new();
        let before = *controls.entries();
        let version = controls.version();
        controls.set_visible(-1, true);
        controls.set_visible(256, true);
        controls.set_opacity(-1, 0.5);
        controls.set_opacity(1000, 0.5);
        controls.set_tint(-7, Vec3::ZERO);
        assert_eq!(*controls.entries(), before);
        assert_eq!(controls.version(), version);
    }

    #[test]
    fn test_mutations_advance_the_version() {
        let mut controls = LabelControls::new();
        controls.set_visible(0, false);
        controls.set_opacity(0, 0.5);
        controls.set_tint(0, Vec3::ONE);
        controls.solo(0);
        controls.show_all();
        assert_eq!(controls.version(), 5);
    }
}
