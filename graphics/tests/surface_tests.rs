//! Surface manager integration tests.
//!
//! These tests drive a headless [`SurfaceManager`] through resize, binding,
//! clearing and presentation on every available backend.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test --test surface_tests
//! cargo test --test surface_tests --features wgpu-backend
//! ```

mod common;

use rstest::rstest;

use common::{Backend, default_surface, get_pixel, headless_surface, read_texture};
use framelight_graphics::{
    Box2, GraphicsError, SurfaceConfig, SurfaceState, TextureFormat, Viewport,
};

// ============================================================================
// Resize Tests
// ============================================================================

/// After a resize, every derived view references a texture of the new size.
#[rstest]
#[case::software(Backend::Software)]
#[case::webgpu(Backend::WebGpu)]
fn test_resize_rebuilds_views_at_new_size(
    #[case] backend: Backend,
    #[values((1, 1), (64, 48), (317, 5))] size: (u32, u32),
) {
    let Some(mut surface) = default_surface(backend) else {
        return;
    };
    let (width, height) = size;

    surface.resize(width, height).unwrap();

    assert_eq!(surface.dimensions(), (width, height));
    assert_eq!(surface.state(), SurfaceState::Ready);
    for view in [surface.display_target(), surface.linear_target()] {
        let view = view.expect("render target view exists");
        assert_eq!((view.size().width, view.size().height), (width, height));
    }
    let depth = surface.depth_stencil_view().expect("depth view exists");
    assert_eq!((depth.size().width, depth.size().height), (width, height));
    let sampled = surface.depth_shader_view().expect("depth shader view exists");
    assert_eq!((sampled.size().width, sampled.size().height), (width, height));
    let back_buffer = surface.back_buffer().expect("back buffer exists");
    assert_eq!(back_buffer.descriptor().size.width, width);
    assert_eq!(back_buffer.descriptor().size.height, height);
}

/// Resizing to the current size keeps the existing views.
#[rstest]
#[case::software(Backend::Software)]
#[case::webgpu(Backend::WebGpu)]
fn test_repeated_resize_is_noop(#[case] backend: Backend) {
    let Some(mut surface) = default_surface(backend) else {
        return;
    };

    surface.resize(128, 64).unwrap();
    let display = surface.display_target().unwrap().id();
    let linear = surface.linear_target().unwrap().id();
    let depth = surface.depth_stencil_view().unwrap().id();

    surface.resize(128, 64).unwrap();
    assert_eq!(surface.display_target().unwrap().id(), display);
    assert_eq!(surface.linear_target().unwrap().id(), linear);
    assert_eq!(surface.depth_stencil_view().unwrap().id(), depth);

    surface.resize(129, 64).unwrap();
    assert_ne!(surface.display_target().unwrap().id(), display);
}

/// Binding a target keeps working across resizes.
#[rstest]
#[case::software(Backend::Software)]
#[case::webgpu(Backend::WebGpu)]
fn test_bound_target_survives_resize(#[case] backend: Backend) {
    let Some(mut surface) = default_surface(backend) else {
        return;
    };

    surface.resize(32, 32).unwrap();
    surface.bind_display_target().unwrap();
    surface.resize(16, 8).unwrap();
    assert!(surface.context().render_target().is_none());

    surface.bind_display_target().unwrap();
    let bound = surface.context().render_target().unwrap();
    assert_eq!(bound.id(), surface.display_target().unwrap().id());
    assert_eq!(surface.context().viewport(), Viewport::from_dimensions(16, 8));
}

#[rstest]
#[case::software(Backend::Software)]
#[case::webgpu(Backend::WebGpu)]
fn test_invalid_resize_keeps_surface(#[case] backend: Backend) {
    let Some(mut surface) = default_surface(backend) else {
        return;
    };
    surface.resize(40, 30).unwrap();
    let display = surface.display_target().unwrap().id();

    let limit = surface.device().capabilities().max_texture_dimension_2d;
    for (width, height) in [(0, 30), (40, 0), (limit + 1, 30)] {
        let result = surface.resize(width, height);
        assert!(matches!(result, Err(GraphicsError::InvalidParameter(_))));
    }
    assert_eq!(surface.dimensions(), (40, 30));
    assert_eq!(surface.state(), SurfaceState::Ready);
    assert_eq!(surface.display_target().unwrap().id(), display);
}

// ============================================================================
// Configuration Tests
// ============================================================================

#[rstest]
#[case::software(Backend::Software)]
#[case::webgpu(Backend::WebGpu)]
fn test_surface_without_depth(#[case] backend: Backend) {
    let config = SurfaceConfig::new().with_depth_buffer(false);
    let Some(mut surface) = headless_surface(backend, config) else {
        return;
    };

    surface.resize(20, 10).unwrap();
    assert!(!surface.has_depth_buffer());
    assert!(surface.depth_stencil_view().is_none());
    assert!(surface.depth_shader_view().is_none());
    assert!(surface.depth_texture().is_none());

    surface.bind_linear_target().unwrap();
    assert!(surface.context().depth_stencil().is_none());
}

#[rstest]
#[case::software(Backend::Software)]
#[case::webgpu(Backend::WebGpu)]
fn test_display_and_linear_formats(#[case] backend: Backend) {
    let config = SurfaceConfig::new().with_format(TextureFormat::B8G8R8A8_UNORM);
    let Some(mut surface) = headless_surface(backend, config) else {
        return;
    };
    surface.resize(8, 8).unwrap();

    assert_eq!(
        surface.display_target().unwrap().format(),
        TextureFormat::B8G8R8A8_UNORM_SRGB
    );
    assert_eq!(
        surface.linear_target().unwrap().format(),
        TextureFormat::B8G8R8A8_UNORM
    );
}

#[test]
fn test_zero_buffers_rejected() {
    let config = SurfaceConfig::new().with_buffer_count(0);
    let result = headless_surface(Backend::Software, config);
    assert!(result.is_none());
}

// ============================================================================
// Drawing Tests
// ============================================================================

/// Clear through the linear target and read the back buffer.
#[rstest]
#[case::software(Backend::Software)]
#[case::webgpu(Backend::WebGpu)]
fn test_clear_linear_target(#[case] backend: Backend) {
    let Some(mut surface) = default_surface(backend) else {
        return;
    };
    surface.resize(5, 3).unwrap();
    surface.bind_linear_target().unwrap();

    let target = surface.context().render_target().unwrap().clone();
    surface
        .context()
        .clear_render_target(&target, [0.0, 1.0, 0.0, 1.0])
        .unwrap();
    let depth = surface.depth_stencil_view().unwrap().clone();
    surface.context().clear_depth(&depth, 1.0).unwrap();
    drop(target);
    drop(depth);

    let back_buffer = surface.back_buffer().unwrap().clone();
    let pixels = read_texture(&surface, &back_buffer, TextureFormat::R8G8B8A8_UNORM);
    drop(back_buffer);
    assert_eq!(pixels.len(), 5 * 3 * 4);
    assert_eq!(get_pixel(&pixels, 5, 4, 2), [0, 255, 0, 255]);

    surface.present().unwrap();
    surface.shutdown();
}

#[rstest]
#[case::software(Backend::Software)]
#[case::webgpu(Backend::WebGpu)]
fn test_set_viewport(#[case] backend: Backend) {
    let Some(mut surface) = default_surface(backend) else {
        return;
    };
    surface.resize(100, 50).unwrap();
    surface.bind_display_target().unwrap();

    surface.set_viewport(Box2::new(10.0, 5.0, 60.0, 45.0));
    let viewport = surface.context().viewport();
    assert_eq!(viewport.x, 10.0);
    assert_eq!(viewport.y, 5.0);
    assert_eq!(viewport.width, 50.0);
    assert_eq!(viewport.height, 40.0);
}

// ============================================================================
// Failure Tests
// ============================================================================

/// A held back-buffer view makes the resize fail and loses the surface.
#[test]
fn test_resize_with_outstanding_view_loses_surface() {
    let Some(mut surface) = default_surface(Backend::Software) else {
        return;
    };
    surface.resize(16, 16).unwrap();
    let held = surface.display_target().unwrap().clone();

    let err = surface.resize(32, 32).unwrap_err();
    assert!(err.is_fatal());
    assert_eq!(surface.state(), SurfaceState::Lost);
    assert!(surface.display_target().is_none());
    assert_eq!(surface.bind_display_target(), Err(GraphicsError::DeviceLost));
    assert_eq!(surface.present(), Err(GraphicsError::DeviceLost));

    drop(held);
    surface.resize(32, 32).unwrap();
    assert_eq!(surface.state(), SurfaceState::Ready);
    assert_eq!(surface.dimensions(), (32, 32));
}
