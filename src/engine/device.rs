#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    #[error("No suitable graphics adapter found")]
    NoAdapter,

    #[error("Could not request device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),
}

/// Create a renderer without a window surface. Only used to upload and inspect resources.
pub fn create_headless() -> Result<renderer::Renderer, DeviceError> {
    let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
        backends: wgpu::Backends::PRIMARY,
        ..Default::default()
    });

    let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptionsBase {
        power_preference: wgpu::PowerPreference::HighPerformance,
        force_fallback_adapter: false,
        compatible_surface: None,
    }))
    .ok_or(DeviceError::NoAdapter)?;

    let info = adapter.get_info();
    tracing::info!("Using adapter: {} ({:?})", info.name, info.backend);

    let (device, queue) = pollster::block_on(adapter.request_device(
        &wgpu::DeviceDescriptor {
            label: Some("terrain_device"),
            ..Default::default()
        },
        None,
    ))?;

    Ok(renderer::Renderer::new(device, queue))
}
