//! Texture resource integration tests.
//!
//! Creation, readback, lifecycle and blitting of 2D, cube and volume
//! textures, parameterized over backends.

mod common;

use rstest::rstest;

use common::{Backend, default_surface, generate_test_pattern, get_pixel, read_texture, rgba_gradient};
use framelight_graphics::format::{bits_per_pixel, catalog, name_of};
use framelight_graphics::{
    BlitFilter, BlitPipeline, Box2, CubeExtent, CubeFace, Extent2d, Extent3d, GraphicsError,
    Texture2d, Texture3d, TextureCube, TextureFlags, TextureFormat,
};

// ============================================================================
// Round Trip Tests
// ============================================================================

/// Upload tightly packed rows and read them back byte for byte.
///
/// A width of 3 gives rows whose tight size differs from the padded pitch
/// of the readback resource.
#[rstest]
#[case::software(Backend::Software)]
#[case::webgpu(Backend::WebGpu)]
fn test_from_memory_readback_round_trip(
    #[case] backend: Backend,
    #[values(TextureFormat::R8_UNORM, TextureFormat::R8G8_UNORM, TextureFormat::R8G8B8A8_UNORM)]
    format: TextureFormat,
) {
    let Some(surface) = default_surface(backend) else {
        return;
    };
    let (width, height) = (3, 4);
    let bytes_per_pixel = format.bytes_per_pixel().unwrap() as usize;
    assert_eq!(format.bits_per_pixel() as usize, bytes_per_pixel * 8);
    let pixels = generate_test_pattern(width as usize * height as usize * bytes_per_pixel);

    let texture = Texture2d::from_memory(surface.device(), width, height, format, &pixels).unwrap();
    assert_eq!(texture.mip_byte_size(0).unwrap(), pixels.len());

    let mut out = vec![0u8; pixels.len()];
    texture.readback(surface.context(), 0, &mut out).unwrap();
    assert_eq!(out, pixels);
}

#[rstest]
#[case::software(Backend::Software)]
#[case::webgpu(Backend::WebGpu)]
fn test_solid_color_readback(#[case] backend: Backend) {
    let Some(surface) = default_surface(backend) else {
        return;
    };
    let red = Texture2d::from_solid_color(
        surface.device(),
        [1.0, 0.0, 0.0, 1.0],
        TextureFormat::R8G8B8A8_UNORM_SRGB,
    )
    .unwrap();
    assert_eq!((red.width(), red.height()), (1, 1));
    assert_eq!(red.mip_levels(), 1);

    let mut pixel = [0u8; 4];
    red.readback(surface.context(), 0, &mut pixel).unwrap();
    assert_eq!(pixel, [255, 0, 0, 255]);
}

#[rstest]
#[case::software(Backend::Software)]
#[case::webgpu(Backend::WebGpu)]
fn test_solid_color_bgra_order(#[case] backend: Backend) {
    let Some(surface) = default_surface(backend) else {
        return;
    };
    let texture = Texture2d::from_solid_color(
        surface.device(),
        [1.0, 0.5, 0.0, 1.0],
        TextureFormat::B8G8R8A8_UNORM,
    )
    .unwrap();

    let mut pixel = [0u8; 4];
    texture.readback(surface.context(), 0, &mut pixel).unwrap();
    assert_eq!(pixel, [0, 128, 255, 255]);
}

/// Each cube face reads back its own color.
#[rstest]
#[case::software(Backend::Software)]
#[case::webgpu(Backend::WebGpu)]
fn test_cube_faces_read_back_own_color(#[case] backend: Backend) {
    let Some(surface) = default_surface(backend) else {
        return;
    };
    let size = 2;
    let face_colors: Vec<[u8; 4]> = (0..6u8).map(|i| [i * 40, 255 - i * 40, i, 255]).collect();
    let pixels: Vec<u8> = face_colors
        .iter()
        .flat_map(|color| color.repeat((size * size) as usize))
        .collect();

    let cube =
        TextureCube::from_faces(surface.device(), size, TextureFormat::R8G8B8A8_UNORM, &pixels)
            .unwrap();
    assert_eq!(cube.size(), size);

    for face in CubeFace::ALL {
        let mut out = vec![0u8; (size * size * 4) as usize];
        cube.readback(surface.context(), face, 0, &mut out).unwrap();
        assert_eq!(
            get_pixel(&out, size, 1, 1),
            face_colors[face.index() as usize],
            "face {:?}",
            face
        );
    }
}

#[rstest]
#[case::software(Backend::Software)]
#[case::webgpu(Backend::WebGpu)]
fn test_volume_round_trip(#[case] backend: Backend) {
    let Some(surface) = default_surface(backend) else {
        return;
    };
    let extent = Extent3d::new_3d(3, 2, 4);
    let pixels = generate_test_pattern(3 * 2 * 4 * 4);

    let volume =
        Texture3d::from_memory(surface.device(), extent, TextureFormat::R8G8B8A8_UNORM, &pixels)
            .unwrap();
    assert_eq!((volume.width(), volume.height(), volume.depth()), (3, 2, 4));

    let mut out = vec![0u8; pixels.len()];
    volume.readback(surface.context(), 0, &mut out).unwrap();
    assert_eq!(out, pixels);
}

// ============================================================================
// Lifecycle Tests
// ============================================================================

/// A released and re-initialised texture behaves like a fresh one.
#[rstest]
#[case::software(Backend::Software)]
#[case::webgpu(Backend::WebGpu)]
fn test_release_then_init_matches_fresh(#[case] backend: Backend) {
    let Some(surface) = default_surface(backend) else {
        return;
    };
    let device = surface.device();
    let format = TextureFormat::R8G8B8A8_UNORM;

    let mut reused = Texture2d::from_memory(device, 2, 2, format, &rgba_gradient(2, 2)).unwrap();
    reused.release();
    assert!(!reused.is_initialized());
    reused
        .init(device, Extent2d::new(8, 4), format, TextureFlags::MIPMAPS)
        .unwrap();

    let mut fresh = Texture2d::new();
    fresh
        .init(device, Extent2d::new(8, 4), format, TextureFlags::MIPMAPS)
        .unwrap();

    assert_eq!(reused.shape(), fresh.shape());
    assert_eq!(reused.mip_levels(), fresh.mip_levels());
    assert_eq!(reused.format(), fresh.format());
    assert_eq!(reused.unordered_access_view().is_some(), fresh.unordered_access_view().is_some());
    for mip in 0..fresh.mip_levels() {
        assert_eq!(reused.mip_extent(mip), fresh.mip_extent(mip));
        let len = fresh.mip_byte_size(mip).unwrap();
        let mut a = vec![0xAAu8; len];
        let mut b = vec![0x55u8; len];
        reused.readback(surface.context(), mip, &mut a).unwrap();
        fresh.readback(surface.context(), mip, &mut b).unwrap();
        assert_eq!(a, b, "mip {mip}");
        assert!(a.iter().all(|&byte| byte == 0));
    }
}

#[rstest]
#[case::software(Backend::Software)]
#[case::webgpu(Backend::WebGpu)]
fn test_init_cube_with_mips(#[case] backend: Backend) {
    let Some(surface) = default_surface(backend) else {
        return;
    };
    let mut cube = TextureCube::new();
    cube.init(
        surface.device(),
        CubeExtent::new(16),
        TextureFormat::R8G8B8A8_UNORM,
        TextureFlags::MIPMAPS,
    )
    .unwrap();

    assert_eq!(cube.mip_levels(), 5);
    assert_eq!(cube.mip_extent(4), Some(Extent3d::new_2d(1, 1)));
    let mut out = [0u8; 4];
    cube.readback(surface.context(), CubeFace::NegativeZ, 4, &mut out)
        .unwrap();
    assert_eq!(out, [0, 0, 0, 0]);
}

#[rstest]
#[case::software(Backend::Software)]
#[case::webgpu(Backend::WebGpu)]
fn test_readback_rejects_bad_requests(#[case] backend: Backend) {
    let Some(surface) = default_surface(backend) else {
        return;
    };
    let texture = Texture2d::from_memory(
        surface.device(),
        2,
        2,
        TextureFormat::R8G8B8A8_UNORM,
        &rgba_gradient(2, 2),
    )
    .unwrap();

    let mut short = [0u8; 15];
    assert!(matches!(
        texture.readback(surface.context(), 0, &mut short),
        Err(GraphicsError::InvalidParameter(_))
    ));
    let mut out = [0u8; 16];
    assert!(matches!(
        texture.readback(surface.context(), 1, &mut out),
        Err(GraphicsError::InvalidParameter(_))
    ));

    let released = Texture2d::new();
    assert!(released.readback(surface.context(), 0, &mut out).is_err());
}

#[test]
fn test_from_memory_rejects_wrong_length() {
    let Some(surface) = default_surface(Backend::Software) else {
        return;
    };
    let result = Texture2d::from_memory(
        surface.device(),
        3,
        3,
        TextureFormat::R8G8B8A8_UNORM,
        &[0u8; 35],
    );
    assert!(matches!(result, Err(GraphicsError::InvalidParameter(_))));
}

// ============================================================================
// Format Catalog Tests
// ============================================================================

#[test]
fn test_catalog_lookups() {
    let table = catalog();
    assert_eq!(table.len(), 116);
    for (id, info) in table.iter().enumerate() {
        let format = TextureFormat::from_raw(id as u32);
        assert_eq!(info.id, id as u32);
        assert_eq!(name_of(format), info.name);
        assert_eq!(bits_per_pixel(format), info.bits_per_pixel);
    }

    assert_eq!(name_of(TextureFormat::R32G32B32A32_FLOAT), "R32G32B32A32_FLOAT");
    assert_eq!(bits_per_pixel(TextureFormat::R32G32B32A32_FLOAT), 128);
    assert_eq!(bits_per_pixel(TextureFormat::BC1_UNORM), 4);
    assert_eq!(bits_per_pixel(TextureFormat::R1_UNORM), 1);
}

#[test]
fn test_catalog_one_past_end() {
    let past_end = TextureFormat::from_raw(catalog().len() as u32);
    assert_eq!(name_of(past_end), "UNKNOWN");
    assert_eq!(bits_per_pixel(past_end), 0);
    assert!(!past_end.is_known());
}

// ============================================================================
// Blit Tests
// ============================================================================

/// Blit a solid texture over the display target of a surface.
#[rstest]
#[case::software(Backend::Software)]
#[case::webgpu(Backend::WebGpu)]
fn test_blit_into_display_target(#[case] backend: Backend) {
    let Some(mut surface) = default_surface(backend) else {
        return;
    };
    surface.resize(4, 4).unwrap();
    surface.bind_display_target().unwrap();

    let source = Texture2d::from_solid_color(
        surface.device(),
        [1.0, 0.0, 0.0, 1.0],
        TextureFormat::R8G8B8A8_UNORM_SRGB,
    )
    .unwrap();
    let blitter = BlitPipeline::new(surface.device().clone()).unwrap();
    blitter
        .blit(
            surface.context(),
            source.shader_resource_view().unwrap(),
            BlitFilter::Point,
            Box2::UNIT,
            Box2::new(0.0, 0.0, 0.5, 1.0),
        )
        .unwrap();
    surface.context().flush();

    let back_buffer = surface.back_buffer().unwrap().clone();
    let pixels = read_texture(&surface, &back_buffer, TextureFormat::R8G8B8A8_UNORM);
    for y in 0..4 {
        assert_eq!(get_pixel(&pixels, 4, 0, y), [255, 0, 0, 255]);
        assert_eq!(get_pixel(&pixels, 4, 1, y), [255, 0, 0, 255]);
        assert_eq!(get_pixel(&pixels, 4, 3, y), [0, 0, 0, 0]);
    }
}

/// Texels cross between linear and sRGB encodings when the source view and
/// the bound target disagree.
#[rstest]
#[case::software(Backend::Software)]
#[case::webgpu(Backend::WebGpu)]
fn test_blit_converts_color_space(#[case] backend: Backend) {
    let Some(mut surface) = default_surface(backend) else {
        return;
    };
    surface.resize(2, 2).unwrap();
    let blitter = BlitPipeline::new(surface.device().clone()).unwrap();
    let near = |actual: u8, expected: u8| actual.abs_diff(expected) <= 1;

    let linear = Texture2d::from_memory(
        surface.device(),
        1,
        1,
        TextureFormat::R8G8B8A8_UNORM,
        &[128, 128, 128, 255],
    )
    .unwrap();
    surface.bind_display_target().unwrap();
    blitter
        .blit_fullscreen(
            surface.context(),
            linear.shader_resource_view().unwrap(),
            BlitFilter::Point,
            Box2::UNIT,
        )
        .unwrap();
    surface.context().flush();
    let back_buffer = surface.back_buffer().unwrap().clone();
    let pixels = read_texture(&surface, &back_buffer, TextureFormat::R8G8B8A8_UNORM);
    drop(back_buffer);
    let [r, g, b, a] = get_pixel(&pixels, 2, 1, 1);
    assert!(near(r, 188) && near(g, 188) && near(b, 188), "encoded {:?}", [r, g, b]);
    assert_eq!(a, 255);

    let encoded = Texture2d::from_memory(
        surface.device(),
        1,
        1,
        TextureFormat::R8G8B8A8_UNORM_SRGB,
        &[188, 188, 188, 255],
    )
    .unwrap();
    surface.bind_linear_target().unwrap();
    blitter
        .blit_fullscreen(
            surface.context(),
            encoded.shader_resource_view().unwrap(),
            BlitFilter::Linear,
            Box2::UNIT,
        )
        .unwrap();
    surface.context().flush();
    let back_buffer = surface.back_buffer().unwrap().clone();
    let pixels = read_texture(&surface, &back_buffer, TextureFormat::R8G8B8A8_UNORM);
    drop(back_buffer);
    let [r, g, b, a] = get_pixel(&pixels, 2, 0, 0);
    assert!(near(r, 128) && near(g, 128) && near(b, 128), "decoded {:?}", [r, g, b]);
    assert_eq!(a, 255);
}

/// Storage the software backend cannot hold fails as out of memory instead
/// of aborting.
#[test]
fn test_oversized_volume_reports_out_of_memory() {
    let Some(surface) = default_surface(Backend::Software) else {
        return;
    };
    let mut volume = Texture3d::new();
    let result = volume.init(
        surface.device(),
        Extent3d::new_3d(1024, 1024, 1024),
        TextureFormat::R8G8B8A8_UNORM,
        TextureFlags::empty(),
    );
    assert_eq!(result, Err(GraphicsError::OutOfMemory));
    assert!(!volume.is_initialized());
}
