use std::path::PathBuf;

use volume_dvr::{JsonTransferFunctionProvider, VolumeDvr, WGPU};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    env_logger::init();

    let assets = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("assets"));

    let instance = wgpu::Instance::default();
    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions::default())
        .await
        .expect("should have found a compatible adapter");
    let (device, queue) = adapter
        .request_device(&wgpu::DeviceDescriptor {
            label: Some("volume-dvr device"),
            required_features: wgpu::Features::FLOAT32_FILTERABLE,
            ..Default::default()
        })
        .await
        .expect("should have created a device with float32 filtering");

    let mut dvr = VolumeDvr::from_files(
        WGPU { device, queue },
        assets.join("volume_meta.json"),
        assets.join("volume.raw"),
        assets.join("transfer_function.json"),
        &JsonTransferFunctionProvider,
    )
    .expect("should have initialized the volume pipeline");

    let placement = dvr.placement();
    log::info!(
        "volume placed at {} m, extents {} m, max intensity {}",
        placement.center_m,
        placement.extents_m,
        dvr.max_intensity()
    );

    // Exercise the control plane the way UI glue would.
    dvr.solo_label(1);
    dvr.set_label_opacity(1, 0.8);
    dvr.show_all();
}
