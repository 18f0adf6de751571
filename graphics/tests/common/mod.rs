//! Common utilities for surface and texture integration tests.
//!
//! Tests are parameterized over [`Backend`] with `rstest`; a backend that is
//! not compiled in or has no adapter skips the case.

#![allow(dead_code)]

use framelight_graphics::{
    BackendType, DeviceParameters, GpuTexture, SurfaceConfig, SurfaceManager, TextureFormat,
};

// ============================================================================
// Backend Enumeration
// ============================================================================

/// Backends the integration tests run against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Backend {
    /// Host-memory software backend.
    Software,
    /// wgpu on whatever adapter the host has.
    WebGpu,
}

impl Backend {
    /// Check if this backend is compiled in.
    pub fn is_available(&self) -> bool {
        match self {
            Backend::Software => true,
            Backend::WebGpu => framelight_graphics::backend::has_gpu_backend(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Backend::Software => "software",
            Backend::WebGpu => "webgpu",
        }
    }

    pub fn device_parameters(self) -> DeviceParameters {
        let backend = match self {
            Backend::Software => BackendType::Software,
            Backend::WebGpu => BackendType::Wgpu,
        };
        DeviceParameters::new()
            .with_backend(backend)
            .with_label(format!("{} test device", self.name()))
    }
}

// ============================================================================
// Test Context
// ============================================================================

/// Initialize logging for test output.
pub fn init_logging() {
    let _ = env_logger::builder()
        .filter_level(log::LevelFilter::Debug)
        .is_test(true)
        .try_init();
}

/// Create a headless surface on `backend`, or `None` when it is unavailable.
pub fn headless_surface(backend: Backend, config: SurfaceConfig) -> Option<SurfaceManager> {
    init_logging();
    if !backend.is_available() {
        eprintln!("Backend {:?} not compiled in, skipping", backend);
        return None;
    }
    match SurfaceManager::init_headless(config.with_device_parameters(backend.device_parameters()))
    {
        Ok(surface) => Some(surface),
        Err(e) => {
            eprintln!("Backend {:?} not available ({e}), skipping", backend);
            None
        }
    }
}

/// Headless surface with the default configuration.
pub fn default_surface(backend: Backend) -> Option<SurfaceManager> {
    headless_surface(backend, SurfaceConfig::new())
}

/// Read mip 0, layer 0 of a 2D texture as tightly packed rows.
pub fn read_texture(surface: &SurfaceManager, texture: &GpuTexture, format: TextureFormat) -> Vec<u8> {
    let extent = texture.descriptor().size;
    let row_len = (extent.width * format.bytes_per_pixel().expect("readable format")) as usize;
    let staging = surface
        .device()
        .create_staging_texture(format, extent)
        .expect("Failed to create staging texture");
    surface
        .context()
        .copy_subresource(&staging, texture, 0, 0)
        .expect("Failed to copy subresource");
    let mapped = surface
        .context()
        .map_read(&staging)
        .expect("Failed to map staging texture");
    (0..extent.height)
        .flat_map(|y| mapped.row(0, y, row_len).to_vec())
        .collect()
}

/// Deterministic byte pattern of `len` bytes.
pub fn generate_test_pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 7 + 3) as u8).collect()
}

/// A `width` x `height` RGBA8 image with one distinct color per pixel.
pub fn rgba_gradient(width: u32, height: u32) -> Vec<u8> {
    (0..height)
        .flat_map(|y| {
            (0..width).flat_map(move |x| [(x * 40) as u8, (y * 40) as u8, 128, 255])
        })
        .collect()
}

/// Get the RGBA pixel at (`x`, `y`) of tightly packed RGBA8 rows.
pub fn get_pixel(data: &[u8], width: u32, x: u32, y: u32) -> [u8; 4] {
    let offset = ((y * width + x) * 4) as usize;
    [
        data[offset],
        data[offset + 1],
        data[offset + 2],
        data[offset + 3],
    ]
}
