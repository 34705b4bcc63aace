use clap::Parser;
use std::path::{Path, PathBuf};
use voxel_sculpt::{app, GpuContext, SceneController, SculptConfig, SculptError, SculptResult, ShaderLibrary};
use winit::dpi::PhysicalSize;
use winit::event_loop::EventLoop;
use winit::window::WindowBuilder;

#[derive(Parser, Debug, Clone)]
#[command(version, about = "GPU voxel sculpting")]
struct Args {
    /// JSON config file; missing fields keep their defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// Window width in pixels
    #[arg(long, short = 'W', default_value_t = 1280)]
    width: u32,

    /// Window height in pixels
    #[arg(long, short = 'H', default_value_t = 720)]
    height: u32,

    /// Image loaded into the voxel texture at startup
    #[arg(long)]
    import: Option<PathBuf>,

    /// Write the voxel texture to this image and exit (no window)
    #[arg(long)]
    export: Option<PathBuf>,

    /// Start with shadows disabled
    #[arg(long)]
    no_shadows: bool,
}

fn load_image(path: &Path) -> SculptResult<image::RgbaImage> {
    let image = image::open(path).map_err(|source| SculptError::Image {
        path: path.display().to_string(),
        source,
    })?;
    Ok(image.into_rgba8())
}

fn export_voxels(scene: &SceneController, path: &Path) -> SculptResult<()> {
    let side = scene.grid_layout().texture_side();
    let texels = scene.vox_texture_cpu()?;
    let image = image::RgbaImage::from_raw(side, side, texels)
        .ok_or_else(|| SculptError::Readback(format!("voxel readback is not {side}x{side} RGBA")))?;
    image.save(path).map_err(|source| SculptError::Image {
        path: path.display().to_string(),
        source,
    })?;
    log::info!("Wrote voxel texture to {}", path.display());
    Ok(())
}

fn run(args: Args) -> SculptResult<()> {
    let mut config = match &args.config {
        Some(path) => SculptConfig::load(path)?,
        None => SculptConfig::default(),
    };
    if args.no_shadows {
        config.shadows_enabled = false;
    }

    let import = args.import.as_deref().map(load_image).transpose()?;
    let setup = move |scene: &mut SceneController| -> SculptResult<()> {
        if let Some(image) = &import {
            scene.import_pixels(image.width(), image.height(), 4, image.as_raw())?;
        }
        Ok(())
    };

    match &args.export {
        Some(path) => {
            let gpu = GpuContext::headless_blocking()?;
            let mut scene = SceneController::new(
                gpu,
                config,
                ShaderLibrary::builtin(),
                wgpu::TextureFormat::Rgba8Unorm,
                args.width,
                args.height,
            )?;
            setup(&mut scene)?;
            export_voxels(&scene, path)
        }
        None => {
            let event_loop = EventLoop::new()?;
            let window = WindowBuilder::new()
                .with_title("Voxel Sculpt")
                .with_inner_size(PhysicalSize::new(args.width, args.height))
                .build(&event_loop)?;
            pollster::block_on(app::run(event_loop, window, config, ShaderLibrary::builtin(), setup))
        }
    }
}

fn main() {
    env_logger::init();
    let args = Args::parse();
    if let Err(err) = run(args) {
        log::error!("{err}");
        std::process::exit(1);
    }
}
