//! Graphics device.
//!
//! The [`GraphicsDevice`] is the main interface for creating GPU resources.
//! It owns the selected backend and validates every descriptor before the
//! backend sees it, so both backends reject the same inputs.

use std::sync::Arc;

use raw_window_handle::{
    DisplayHandle, HandleError, HasDisplayHandle, HasWindowHandle, WindowHandle,
};

use crate::backend::{
    self, BackendType, GpuBackend, GpuStaging, GpuSwapChain, GpuTexture, GpuView, PresentTarget,
    SwapChainDescriptor,
};
use crate::error::{GraphicsError, Result};
use crate::staging::StagingTexture;
use crate::types::{
    Extent3d, SubresourceData, SubresourceRange, TextureDescriptor, TextureDimension,
    TextureUsage, ViewDescriptor, ViewDimension, ViewKind,
};
use crate::view::{
    DepthStencilView, RenderTargetView, ShaderResourceView, TextureView, UnorderedAccessView,
};

// ============================================================================
// Parameters
// ============================================================================

/// Parameters for device creation.
///
/// # Example
///
/// ```ignore
/// let params = DeviceParameters::new()
///     .with_backend(BackendType::Software)
///     .with_label("viewer");
/// let device = GraphicsDevice::new(params)?;
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceParameters {
    /// Backend to create.
    pub backend: BackendType,
    /// Enable API validation layers where the backend has them.
    pub validation: bool,
    /// Enable debug labels and markers.
    pub debug: bool,
    /// Debug label for the device.
    pub label: String,
}

impl Default for DeviceParameters {
    fn default() -> Self {
        Self {
            backend: BackendType::Auto,
            validation: cfg!(debug_assertions),
            debug: cfg!(debug_assertions),
            label: "Framelight Device".to_string(),
        }
    }
}

impl DeviceParameters {
    /// Default parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Select the backend.
    pub fn with_backend(mut self, backend: BackendType) -> Self {
        self.backend = backend;
        self
    }

    /// Enable or disable validation layers.
    pub fn with_validation(mut self, enabled: bool) -> Self {
        self.validation = enabled;
        self
    }

    /// Enable or disable debug markers.
    pub fn with_debug(mut self, enabled: bool) -> Self {
        self.debug = enabled;
        self
    }

    /// Set the device label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }
}

/// Capabilities of a graphics device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceCapabilities {
    /// Maximum width or height of 2D and cube textures.
    pub max_texture_dimension_2d: u32,
    /// Maximum width, height or depth of volume textures.
    pub max_texture_dimension_3d: u32,
}

impl Default for DeviceCapabilities {
    fn default() -> Self {
        Self {
            max_texture_dimension_2d: 16384,
            max_texture_dimension_3d: 2048,
        }
    }
}

/// Stand-in window type for headless creation.
enum NoWindow {}

impl HasWindowHandle for NoWindow {
    fn window_handle(&self) -> std::result::Result<WindowHandle<'_>, HandleError> {
        match *self {}
    }
}

impl HasDisplayHandle for NoWindow {
    fn display_handle(&self) -> std::result::Result<DisplayHandle<'_>, HandleError> {
        match *self {}
    }
}

// ============================================================================
// Device
// ============================================================================

/// A graphics device for creating GPU resources.
///
/// # Thread Safety
///
/// `GraphicsDevice` is `Send + Sync` and can be shared across threads.
/// Command submission goes through a [`DeviceContext`](crate::DeviceContext),
/// which is single-threaded.
pub struct GraphicsDevice {
    backend: GpuBackend,
    name: String,
    capabilities: DeviceCapabilities,
}

impl GraphicsDevice {
    /// Create a device without a presentation target.
    pub fn new(params: DeviceParameters) -> Result<Arc<Self>> {
        let (device, _) = Self::create(params, None::<NoWindow>)?;
        Ok(device)
    }

    /// Create a device able to present to `window`.
    ///
    /// The returned target is handed to the swap chain. Backends that cannot
    /// present return [`PresentTarget::Headless`].
    pub fn with_window<W>(params: DeviceParameters, window: W) -> Result<(Arc<Self>, PresentTarget)>
    where
        W: HasWindowHandle + HasDisplayHandle + Send + Sync + 'static,
    {
        Self::create(params, Some(window))
    }

    fn create<W>(params: DeviceParameters, window: Option<W>) -> Result<(Arc<Self>, PresentTarget)>
    where
        W: HasWindowHandle + HasDisplayHandle + Send + Sync + 'static,
    {
        let (backend, target) = backend::create_backend(&params, window)?;
        let capabilities = match &backend {
            GpuBackend::Software(_) => DeviceCapabilities::default(),
            #[cfg(feature = "wgpu-backend")]
            GpuBackend::Wgpu(gpu) => gpu.capabilities(),
        };
        log::info!(
            "Created graphics device '{}' on {}",
            params.label,
            Self::name_of(&backend)
        );
        let device = Arc::new(Self {
            backend,
            name: params.label,
            capabilities,
        });
        Ok((device, target))
    }

    fn name_of(backend: &GpuBackend) -> &'static str {
        match backend {
            GpuBackend::Software(software) => software.name(),
            #[cfg(feature = "wgpu-backend")]
            GpuBackend::Wgpu(gpu) => gpu.name(),
        }
    }

    /// Get the device name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the backend in use.
    pub fn backend_name(&self) -> &'static str {
        Self::name_of(&self.backend)
    }

    /// The backend actually in use. Never [`BackendType::Auto`].
    pub fn backend_type(&self) -> BackendType {
        match &self.backend {
            GpuBackend::Software(_) => BackendType::Software,
            #[cfg(feature = "wgpu-backend")]
            GpuBackend::Wgpu(_) => BackendType::Wgpu,
        }
    }

    /// Get the device capabilities.
    pub fn capabilities(&self) -> &DeviceCapabilities {
        &self.capabilities
    }

    pub(crate) fn backend(&self) -> &GpuBackend {
        &self.backend
    }

    // ------------------------------------------------------------------------
    // Textures
    // ------------------------------------------------------------------------

    /// Create a texture.
    ///
    /// `initial_data` is either empty or holds one entry per subresource in
    /// [`subresource_index`](crate::types::subresource_index) order.
    ///
    /// # Errors
    ///
    /// Returns [`GraphicsError::InvalidParameter`] for zero sizes, non-square
    /// cube faces, impossible mip counts or mismatched initial data, and
    /// [`GraphicsError::UnsupportedFormat`] for formats without a pixel size.
    pub fn create_texture(
        &self,
        descriptor: &TextureDescriptor,
        initial_data: &[SubresourceData<'_>],
    ) -> Result<GpuTexture> {
        self.validate_texture(descriptor, initial_data)?;
        match &self.backend {
            GpuBackend::Software(software) => software.create_texture(descriptor, initial_data),
            #[cfg(feature = "wgpu-backend")]
            GpuBackend::Wgpu(gpu) => gpu.create_texture(descriptor, initial_data),
        }
    }

    fn validate_texture(
        &self,
        descriptor: &TextureDescriptor,
        initial_data: &[SubresourceData<'_>],
    ) -> Result<()> {
        let size = descriptor.size;
        if size.is_empty() {
            return Err(GraphicsError::InvalidParameter(format!(
                "texture {:?} has a zero dimension: {}x{}x{}",
                descriptor.label, size.width, size.height, size.depth
            )));
        }
        if !descriptor.format.is_known() || descriptor.format.bits_per_pixel() == 0 {
            return Err(GraphicsError::UnsupportedFormat(descriptor.format));
        }

        let limit = match descriptor.dimension {
            TextureDimension::D3 => self.capabilities.max_texture_dimension_3d,
            TextureDimension::D2 | TextureDimension::Cube => {
                self.capabilities.max_texture_dimension_2d
            }
        };
        let largest = match descriptor.dimension {
            TextureDimension::D3 => size.width.max(size.height).max(size.depth),
            TextureDimension::D2 | TextureDimension::Cube => size.width.max(size.height),
        };
        if largest > limit {
            return Err(GraphicsError::InvalidParameter(format!(
                "texture dimension {largest} exceeds maximum {limit}"
            )));
        }

        match descriptor.dimension {
            TextureDimension::Cube if size.width != size.height => {
                return Err(GraphicsError::InvalidParameter(format!(
                    "cube faces must be square, got {}x{}",
                    size.width, size.height
                )));
            }
            TextureDimension::Cube if size.depth != descriptor.array_layers() => {
                return Err(GraphicsError::InvalidParameter(format!(
                    "cube textures have 6 layers, got {}",
                    size.depth
                )));
            }
            TextureDimension::D2 if size.depth != 1 => {
                return Err(GraphicsError::InvalidParameter(format!(
                    "2D textures have depth 1, got {}",
                    size.depth
                )));
            }
            _ => {}
        }

        let max_mips = descriptor.max_mip_levels();
        if descriptor.mip_level_count == 0 || descriptor.mip_level_count > max_mips {
            return Err(GraphicsError::InvalidParameter(format!(
                "mip level count {} outside 1..={max_mips}",
                descriptor.mip_level_count
            )));
        }

        if descriptor.usage.contains(TextureUsage::DEPTH_STENCIL)
            && !descriptor.format.is_depth()
            && !is_typeless_depth(descriptor)
        {
            return Err(GraphicsError::InvalidParameter(format!(
                "{} cannot back a depth-stencil target",
                descriptor.format
            )));
        }

        let expected = descriptor.subresource_count() as usize;
        if !initial_data.is_empty() && initial_data.len() != expected {
            return Err(GraphicsError::InvalidParameter(format!(
                "{} initial subresources given, texture has {expected}",
                initial_data.len()
            )));
        }
        if descriptor.immutable && initial_data.is_empty() {
            return Err(GraphicsError::InvalidParameter(
                "immutable textures need initial data".into(),
            ));
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Views
    // ------------------------------------------------------------------------

    /// Create a view for sampling.
    pub fn create_shader_resource_view(
        &self,
        texture: &GpuTexture,
        descriptor: &ViewDescriptor,
    ) -> Result<ShaderResourceView> {
        self.create_view(texture, ViewKind::ShaderResource, descriptor)
            .map(ShaderResourceView::from_view)
    }

    /// Create a view for compute writes. Covers one mip level.
    pub fn create_unordered_access_view(
        &self,
        texture: &GpuTexture,
        descriptor: &ViewDescriptor,
    ) -> Result<UnorderedAccessView> {
        self.create_view(texture, ViewKind::UnorderedAccess, descriptor)
            .map(UnorderedAccessView::from_view)
    }

    /// Create a color render-target view. Covers one mip level.
    pub fn create_render_target_view(
        &self,
        texture: &GpuTexture,
        descriptor: &ViewDescriptor,
    ) -> Result<RenderTargetView> {
        self.create_view(texture, ViewKind::RenderTarget, descriptor)
            .map(RenderTargetView::from_view)
    }

    /// Create a depth-stencil view. Covers one mip level.
    pub fn create_depth_stencil_view(
        &self,
        texture: &GpuTexture,
        descriptor: &ViewDescriptor,
    ) -> Result<DepthStencilView> {
        self.create_view(texture, ViewKind::DepthStencil, descriptor)
            .map(DepthStencilView::from_view)
    }

    fn create_view(
        &self,
        texture: &GpuTexture,
        kind: ViewKind,
        descriptor: &ViewDescriptor,
    ) -> Result<TextureView> {
        let texture_desc = texture.descriptor();
        let mut descriptor = descriptor.clone();
        if kind != ViewKind::ShaderResource && descriptor.mip_level_count.is_none() {
            descriptor.mip_level_count = Some(1);
        }
        let range = SubresourceRange::resolve(&descriptor, texture_desc);
        validate_view(texture_desc, kind, &descriptor, &range)?;

        let raw = match (&self.backend, texture) {
            (GpuBackend::Software(_), GpuTexture::Software(_)) => GpuView::Software,
            #[cfg(feature = "wgpu-backend")]
            (GpuBackend::Wgpu(gpu), GpuTexture::Wgpu(inner)) => {
                gpu.create_view(inner, kind, &descriptor, &range)?
            }
            #[allow(unreachable_patterns)]
            _ => {
                return Err(GraphicsError::Internal(
                    "texture belongs to a different backend".into(),
                ));
            }
        };
        Ok(TextureView::new(texture.clone(), kind, &descriptor, range, raw))
    }

    // ------------------------------------------------------------------------
    // Staging and swap chains
    // ------------------------------------------------------------------------

    /// Create a CPU-readable staging resource sized for one subresource.
    pub fn create_staging_texture(
        &self,
        format: crate::format::TextureFormat,
        extent: Extent3d,
    ) -> Result<StagingTexture> {
        if extent.is_empty() {
            return Err(GraphicsError::InvalidParameter(
                "staging extent has a zero dimension".into(),
            ));
        }
        if format.bytes_per_pixel().is_none() {
            return Err(GraphicsError::UnsupportedFormat(format));
        }
        let raw = match &self.backend {
            GpuBackend::Software(software) => {
                GpuStaging::Software(software.create_staging(format, extent)?)
            }
            #[cfg(feature = "wgpu-backend")]
            GpuBackend::Wgpu(gpu) => GpuStaging::Wgpu(gpu.create_staging(format, extent)?),
        };
        Ok(StagingTexture::new(format, extent, raw))
    }

    pub(crate) fn create_swap_chain(
        &self,
        target: PresentTarget,
        descriptor: &SwapChainDescriptor,
    ) -> Result<GpuSwapChain> {
        self.validate_texture(&descriptor.back_buffer_descriptor(), &[])?;
        match (&self.backend, target) {
            (GpuBackend::Software(software), PresentTarget::Headless) => {
                Ok(GpuSwapChain::Software(software.create_swap_chain(descriptor)?))
            }
            #[cfg(feature = "wgpu-backend")]
            (GpuBackend::Wgpu(gpu), target) => {
                Ok(GpuSwapChain::Wgpu(gpu.create_swap_chain(target, descriptor)?))
            }
            #[allow(unreachable_patterns)]
            _ => Err(GraphicsError::InitializationFailed(
                "present target belongs to a different backend".into(),
            )),
        }
    }

    pub(crate) fn resize_swap_chain(
        &self,
        chain: &mut GpuSwapChain,
        descriptor: &SwapChainDescriptor,
    ) -> Result<()> {
        self.validate_texture(&descriptor.back_buffer_descriptor(), &[])?;
        match (&self.backend, chain) {
            (GpuBackend::Software(_), GpuSwapChain::Software(chain)) => chain.resize(descriptor),
            #[cfg(feature = "wgpu-backend")]
            (GpuBackend::Wgpu(gpu), GpuSwapChain::Wgpu(chain)) => chain.resize(gpu, descriptor),
            #[allow(unreachable_patterns)]
            _ => Err(GraphicsError::Internal(
                "swap chain belongs to a different backend".into(),
            )),
        }
    }

    pub(crate) fn present(&self, chain: &mut GpuSwapChain) -> Result<()> {
        match (&self.backend, chain) {
            (GpuBackend::Software(_), GpuSwapChain::Software(chain)) => {
                chain.present();
                Ok(())
            }
            #[cfg(feature = "wgpu-backend")]
            (GpuBackend::Wgpu(gpu), GpuSwapChain::Wgpu(chain)) => chain.present(gpu),
            #[allow(unreachable_patterns)]
            _ => Err(GraphicsError::Internal(
                "swap chain belongs to a different backend".into(),
            )),
        }
    }
}

impl std::fmt::Debug for GraphicsDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphicsDevice")
            .field("name", &self.name)
            .field("backend", &self.backend_name())
            .field("capabilities", &self.capabilities)
            .finish()
    }
}

static_assertions::assert_impl_all!(GraphicsDevice: Send, Sync);

/// Typeless formats that a depth view can reinterpret.
fn is_typeless_depth(descriptor: &TextureDescriptor) -> bool {
    use crate::format::TextureFormat;
    matches!(
        descriptor.format,
        TextureFormat::R32_TYPELESS
            | TextureFormat::R24G8_TYPELESS
            | TextureFormat::R32G8X24_TYPELESS
            | TextureFormat::R16_TYPELESS
    )
}

fn validate_view(
    texture: &TextureDescriptor,
    kind: ViewKind,
    view: &ViewDescriptor,
    range: &SubresourceRange,
) -> Result<()> {
    if !texture.usage.contains(kind.required_usage()) {
        return Err(GraphicsError::InvalidParameter(format!(
            "texture {:?} lacks {:?} usage for a {kind:?} view",
            texture.label,
            kind.required_usage()
        )));
    }
    if !view.format.is_known() || view.format.bits_per_pixel() != texture.format.bits_per_pixel()
    {
        return Err(GraphicsError::InvalidParameter(format!(
            "view format {} is not compatible with texture format {}",
            view.format, texture.format
        )));
    }
    match kind {
        ViewKind::DepthStencil if !view.format.is_depth() => {
            return Err(GraphicsError::InvalidParameter(format!(
                "{} is not a depth format",
                view.format
            )));
        }
        ViewKind::RenderTarget | ViewKind::UnorderedAccess if view.format.is_depth() => {
            return Err(GraphicsError::InvalidParameter(format!(
                "{} cannot be written as color",
                view.format
            )));
        }
        _ => {}
    }

    let dimension_ok = match view.dimension {
        ViewDimension::D2 => {
            texture.dimension != TextureDimension::D3 && range.array_layer_count == 1
        }
        ViewDimension::D2Array => texture.dimension != TextureDimension::D3,
        ViewDimension::Cube => {
            texture.dimension == TextureDimension::Cube
                && range.base_array_layer == 0
                && range.array_layer_count == 6
        }
        ViewDimension::D3 => texture.dimension == TextureDimension::D3,
    };
    if !dimension_ok {
        return Err(GraphicsError::InvalidParameter(format!(
            "{:?} view does not fit a {:?} texture with {} layer(s) selected",
            view.dimension, texture.dimension, range.array_layer_count
        )));
    }
    if !range.fits(texture) {
        return Err(GraphicsError::InvalidParameter(format!(
            "view range {range:?} exceeds texture with {} mips and {} layers",
            texture.mip_level_count,
            texture.array_layers()
        )));
    }
    if kind != ViewKind::ShaderResource && range.mip_level_count != 1 {
        return Err(GraphicsError::InvalidParameter(format!(
            "{kind:?} views cover exactly one mip level"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::TextureFormat;

    fn software_device() -> Arc<GraphicsDevice> {
        GraphicsDevice::new(DeviceParameters::new().with_backend(BackendType::Software))
            .expect("software device")
    }

    #[test]
    fn test_software_device() {
        let device = software_device();
        assert_eq!(device.backend_type(), BackendType::Software);
        assert_eq!(device.name(), "Framelight Device");
    }

    #[test]
    fn test_rejects_zero_size() {
        let device = software_device();
        let desc = TextureDescriptor::new_2d(
            0,
            4,
            TextureFormat::R8G8B8A8_UNORM,
            TextureUsage::SHADER_RESOURCE,
        );
        assert!(matches!(
            device.create_texture(&desc, &[]),
            Err(GraphicsError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_rejects_excess_mips() {
        let device = software_device();
        let desc = TextureDescriptor::new_2d(
            5,
            5,
            TextureFormat::R8G8B8A8_UNORM,
            TextureUsage::SHADER_RESOURCE,
        )
        .with_mip_levels(4);
        assert!(device.create_texture(&desc, &[]).is_err());
        assert!(device.create_texture(&desc.with_mip_levels(3), &[]).is_ok());
    }

    #[test]
    fn test_rejects_video_format() {
        let device = software_device();
        let desc =
            TextureDescriptor::new_2d(4, 4, TextureFormat::NV12, TextureUsage::SHADER_RESOURCE);
        assert_eq!(
            device.create_texture(&desc, &[]).unwrap_err(),
            GraphicsError::UnsupportedFormat(TextureFormat::NV12)
        );
    }

    #[test]
    fn test_view_requires_usage() {
        let device = software_device();
        let texture = device
            .create_texture(
                &TextureDescriptor::new_2d(
                    4,
                    4,
                    TextureFormat::R8G8B8A8_UNORM,
                    TextureUsage::SHADER_RESOURCE,
                ),
                &[],
            )
            .unwrap();
        let desc = ViewDescriptor::new(TextureFormat::R8G8B8A8_UNORM, ViewDimension::D2);
        assert!(device.create_shader_resource_view(&texture, &desc).is_ok());
        assert!(device.create_render_target_view(&texture, &desc).is_err());
    }

    #[test]
    fn test_depth_views_of_typeless_texture() {
        let device = software_device();
        let texture = device
            .create_texture(
                &TextureDescriptor::new_2d(
                    8,
                    8,
                    TextureFormat::R32_TYPELESS,
                    TextureUsage::DEPTH_STENCIL | TextureUsage::SHADER_RESOURCE,
                ),
                &[],
            )
            .unwrap();
        let dsv = device
            .create_depth_stencil_view(
                &texture,
                &ViewDescriptor::new(TextureFormat::D32_FLOAT, ViewDimension::D2),
            )
            .unwrap();
        let srv = device
            .create_shader_resource_view(
                &texture,
                &ViewDescriptor::new(TextureFormat::R32_FLOAT, ViewDimension::D2),
            )
            .unwrap();
        assert_ne!(dsv.id(), srv.id());
        assert!(
            device
                .create_depth_stencil_view(
                    &texture,
                    &ViewDescriptor::new(TextureFormat::R32_FLOAT, ViewDimension::D2),
                )
                .is_err()
        );
    }

    #[test]
    fn test_cube_view_needs_all_faces() {
        let device = software_device();
        let texture = device
            .create_texture(
                &TextureDescriptor::new_cube(
                    4,
                    TextureFormat::R8G8B8A8_UNORM,
                    TextureUsage::SHADER_RESOURCE,
                ),
                &[],
            )
            .unwrap();
        let cube = ViewDescriptor::new(TextureFormat::R8G8B8A8_UNORM, ViewDimension::Cube);
        assert!(device.create_shader_resource_view(&texture, &cube).is_ok());
        let face = ViewDescriptor::new(TextureFormat::R8G8B8A8_UNORM, ViewDimension::D2)
            .with_layers(3, 1);
        assert!(device.create_shader_resource_view(&texture, &face).is_ok());
        assert!(
            device
                .create_shader_resource_view(&texture, &cube.clone().with_layers(1, 5))
                .is_err()
        );
    }
}
