//! wgpu Context
//!
//! The [`WgpuContext`] holds the core GPU handles: device, queue, and the
//! adapter description. Surface management lives with the backend itself
//! because the backend also supports a headless configuration (offscreen
//! default target, no window) used by tests and pixel-parity harnesses.

use crate::errors::{HeliosError, Result};
use crate::graphics::AdapterInfo;

/// Core wgpu handles shared by every resource and pass operation.
pub struct WgpuContext {
    /// The wgpu device for GPU resource creation.
    pub device: wgpu::Device,
    /// The command submission queue.
    pub queue: wgpu::Queue,
    /// The adapter the device was created from. Kept for surface
    /// configuration and diagnostics.
    adapter: wgpu::Adapter,
    /// Adapter description captured at startup for diagnostics.
    adapter_info: wgpu::AdapterInfo,
    /// Device limits captured at startup.
    limits: wgpu::Limits,
}

impl WgpuContext {
    /// Capability probe: true if any compatible adapter exists.
    #[must_use]
    pub fn probe() -> bool {
        let instance = wgpu::Instance::default();
        pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions::default()))
            .is_ok()
    }

    /// Requests an adapter (compatible with `surface` when given) and a
    /// device from it.
    pub fn new(instance: &wgpu::Instance, surface: Option<&wgpu::Surface<'_>>) -> Result<Self> {
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: surface,
            force_fallback_adapter: false,
        }))
        .map_err(|e| HeliosError::BackendUnavailable {
            requested: "wgpu",
            detail: format!("adapter request failed: {e}"),
        })?;

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("Helios Device"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            memory_hints: wgpu::MemoryHints::Performance,
            ..Default::default()
        }))
        .map_err(|e| HeliosError::BackendUnavailable {
            requested: "wgpu",
            detail: format!("device request failed: {e}"),
        })?;

        let adapter_info = adapter.get_info();
        let limits = adapter.limits();

        log::info!(
            "wgpu adapter: {} ({:?}, {:?})",
            adapter_info.name,
            adapter_info.device_type,
            adapter_info.backend
        );

        Ok(Self { device, queue, adapter, adapter_info, limits })
    }

    /// The adapter the device was created from.
    #[must_use]
    pub fn adapter(&self) -> &wgpu::Adapter {
        &self.adapter
    }

    /// Vendor/device/driver strings for the `renderer_info()` diagnostic.
    #[must_use]
    pub fn adapter_info(&self) -> AdapterInfo {
        AdapterInfo {
            vendor: format!("{:#06x}", self.adapter_info.vendor),
            device: self.adapter_info.name.clone(),
            driver: format!(
                "{} {}",
                self.adapter_info.driver, self.adapter_info.driver_info
            ),
        }
    }

    /// Color attachments the device supports per pass.
    #[must_use]
    pub fn max_color_attachments(&self) -> u32 {
        self.limits.max_color_attachments
    }
}
