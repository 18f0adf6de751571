//! Surface viewer.
//!
//! Opens a window and draws into its surface every frame: the image given
//! with `--texture` stretched over the whole window, or a slowly cycling
//! clear color when there is none.
//!
//! ```bash
//! cargo run -p framelight-app --features wgpu-backend -- --texture sky.png
//! ```

use std::path::PathBuf;

use framelight_app::{App, AppArgs, AppContext, AppError, AppHandler, DefaultAppArgs};
use framelight_graphics::{
    BlitFilter, BlitPipeline, Box2, LoadFlags, Result, Texture2d, load_texture_2d,
};

/// Background behind the image.
const BACKGROUND: [f32; 4] = [0.08, 0.08, 0.1, 1.0];

struct SurfaceViewer {
    path: Option<PathBuf>,
    image: Option<Texture2d>,
    blitter: Option<BlitPipeline>,
}

impl SurfaceViewer {
    fn new(path: Option<PathBuf>) -> Self {
        Self {
            path,
            image: None,
            blitter: None,
        }
    }

    fn cycling_color(elapsed: f32) -> [f32; 4] {
        let phase = elapsed * 0.5;
        [
            0.5 + 0.5 * phase.sin(),
            0.5 + 0.5 * (phase + 2.094).sin(),
            0.5 + 0.5 * (phase + 4.189).sin(),
            1.0,
        ]
    }
}

impl AppHandler for SurfaceViewer {
    fn on_init(&mut self, ctx: &mut AppContext) {
        let Some(path) = &self.path else {
            return;
        };

        // Sampled as sRGB and written through the sRGB display target.
        match load_texture_2d(ctx.device(), path, LoadFlags::SRGB) {
            Ok(image) => {
                log::info!(
                    "Showing {} ({}x{}, {})",
                    path.display(),
                    image.width(),
                    image.height(),
                    image.format()
                );
                self.image = Some(image);
            }
            Err(e) => log::error!("Cannot show {}: {}", path.display(), e),
        }

        match BlitPipeline::new(ctx.device().clone()) {
            Ok(blitter) => self.blitter = Some(blitter),
            Err(e) => log::error!("Failed to create blit pipeline: {}", e),
        }
    }

    fn on_draw(&mut self, ctx: &mut AppContext) -> Result<()> {
        ctx.surface_mut().bind_display_target()?;
        let Some(target) = ctx.surface().display_target().cloned() else {
            return Ok(());
        };

        let color = if self.image.is_some() {
            BACKGROUND
        } else {
            Self::cycling_color(ctx.elapsed_time())
        };
        ctx.context().clear_render_target(&target, color)?;
        drop(target);

        let (Some(image), Some(blitter)) = (&self.image, &self.blitter) else {
            return Ok(());
        };
        let Some(source) = image.shader_resource_view() else {
            return Ok(());
        };
        if let Err(e) = blitter.blit_fullscreen(ctx.context(), source, BlitFilter::Linear, Box2::UNIT)
        {
            if e.is_fatal() {
                return Err(e);
            }
            log::warn!("Cannot blit image onto the surface, clearing only: {}", e);
            self.image = None;
        }
        Ok(())
    }

    fn on_shutdown(&mut self, _ctx: &mut AppContext) {
        self.image = None;
        self.blitter = None;
    }
}

fn main() -> std::result::Result<(), AppError> {
    let args = DefaultAppArgs::parse().with_title_str("Framelight Surface Viewer");
    let viewer = SurfaceViewer::new(args.texture().map(PathBuf::from));
    App::run(viewer, args)
}
