use crate::error::{SculptError, SculptResult};

/// Adapter, device and queue shared by every pass.
pub struct GpuContext {
    pub instance: wgpu::Instance,
    pub adapter: wgpu::Adapter,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
}

impl GpuContext {
    /// Device for offscreen use (tests, batch export).
    pub async fn headless() -> SculptResult<Self> {
        let instance = wgpu::Instance::default();
        Self::with_instance(instance, None).await
    }

    /// Device able to present to `surface`.
    pub async fn with_instance(
        instance: wgpu::Instance,
        surface: Option<&wgpu::Surface<'_>>,
    ) -> SculptResult<Self> {
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                force_fallback_adapter: false,
                compatible_surface: surface,
            })
            .await
            .ok_or(SculptError::NoAdapter)?;
        let info = adapter.get_info();
        log::info!("Using adapter {} ({:?})", info.name, info.backend);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Sculpt Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::downlevel_defaults()
                        .using_resolution(adapter.limits()),
                    memory_hints: wgpu::MemoryHints::MemoryUsage,
                },
                None,
            )
            .await?;

        Ok(Self {
            instance,
            adapter,
            device,
            queue,
        })
    }

    /// Format the position and shadow buffers use on this adapter.
    pub fn position_format(&self) -> wgpu::TextureFormat {
        let features = self.adapter.get_texture_format_features(wgpu::TextureFormat::Rgba32Float);
        let format = position_format_for(features.allowed_usages);
        log::debug!("Position buffers use {format:?}");
        format
    }

    /// Blocking variant of [`GpuContext::headless`].
    pub fn headless_blocking() -> SculptResult<Self> {
        pollster::block_on(Self::headless())
    }
}

/// Run `create` inside a validation error scope.
///
/// Resource creation that wgpu would otherwise report to the uncaptured error
/// handler (and panic on) comes back as [`SculptError::ResourceCreation`].
pub fn validated<T>(device: &wgpu::Device, what: &str, create: impl FnOnce() -> T) -> SculptResult<T> {
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let value = create();
    match pollster::block_on(device.pop_error_scope()) {
        Some(error) => {
            log::error!("Creating {what} failed: {error}");
            Err(SculptError::ResourceCreation {
                what: what.to_string(),
                message: error.to_string(),
            })
        }
        None => Ok(value),
    }
}

/// Position and shadow buffer format for an adapter.
///
/// `allowed` is what the adapter permits for `Rgba32Float`. Downlevel backends
/// that cannot render to it get `Rgba16Float`.
pub fn position_format_for(allowed: wgpu::TextureUsages) -> wgpu::TextureFormat {
    let needed = wgpu::TextureUsages::RENDER_ATTACHMENT
        | wgpu::TextureUsages::TEXTURE_BINDING
        | wgpu::TextureUsages::COPY_SRC;
    if allowed.contains(needed) {
        wgpu::TextureFormat::Rgba32Float
    } else {
        wgpu::TextureFormat::Rgba16Float
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_precision_positions_when_renderable() {
        let all = wgpu::TextureUsages::all();
        assert_eq!(position_format_for(all), wgpu::TextureFormat::Rgba32Float);
    }

    #[test]
    fn sample_only_float32_falls_back_to_half() {
        let sample_only = wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_SRC;
        assert_eq!(position_format_for(sample_only), wgpu::TextureFormat::Rgba16Float);
        assert_eq!(
            position_format_for(wgpu::TextureUsages::empty()),
            wgpu::TextureFormat::Rgba16Float
        );
    }
}
