//! # volume-dvr
//!
//! Data pipeline and label-control plane for GPU-raymarched labeled medical
//! volumes (segmented MRI/CT data).
//!
//! The crate covers everything between the input files and the raymarch
//! shader's bindings:
//!  - parsing the JSON volume descriptor (dimensions, spacing, intensity
//!    range, voxel-to-millimeter affine),
//!  - decoding the raw little-endian f32 voxel buffer into a dense field,
//!  - building the voxel-to-physical affine and its inverse, deriving the
//!    physical bounding box and a world placement for the bounding geometry,
//!  - uploading the field as a 3-D texture and publishing the full shader
//!    input surface as one bind group,
//!  - maintaining the 256-entry per-label control texture (visibility,
//!    opacity, tint) that drives per-label compositing, re-synced to the
//!    device in full on every mutation.
//!
//! The raymarch shader itself, the camera and the UI are deliberately out of
//! scope; the transfer function is consumed through the
//! [`TransferFunctionProvider`] contract with a JSON-backed default.
//!
//! Initialization either fully succeeds or fails with a typed error; there
//! is no partially-bound state. Label controls are only reachable on the
//! initialized [`VolumeDvr`].
//!
//! # Examples
//!
//! Load the three input files and drive the label controls:
//!
//! ```no_run
//! use volume_dvr::{JsonTransferFunctionProvider, VolumeDvr, WGPU};
//! # async fn run(device: wgpu::Device, queue: wgpu::Queue) {
//! let mut dvr = VolumeDvr::from_files(
//!     WGPU { device, queue },
//!     "assets/volume_meta.json",
//!     "assets/volume.raw",
//!     "assets/transfer_function.json",
//!     &JsonTransferFunctionProvider,
//! )
//! .expect("should have initialized the volume pipeline");
//!
//! dvr.set_label_visible(2, false);
//! dvr.set_label_opacity(3, 0.6);
//! dvr.solo_label(3);
//! dvr.show_all();
//! # }
//! ```

pub mod affine;
pub mod dvr;
pub mod gpu_binder;
pub mod label_controls;
pub mod metadata;
pub mod transfer_function;
pub mod volume;
pub mod volume_loader;

pub use affine::{AffinePair, BoundingBox, Placement};
pub use dvr::{InitError, VolumeDvr};
pub use label_controls::LabelControls;
pub use metadata::VolumeMetadata;
pub use transfer_function::{JsonTransferFunctionProvider, TransferFunction, TransferFunctionProvider};
pub use volume::{Volume, WGPU};
pub use volume_loader::VolumeLoader;
