//! GPU-resident voxel sculpting.
//!
//! The voxel grid lives in a single RGBA8 texture and is only ever modified by
//! fragment passes. Every frame the volume is rasterized into a position
//! buffer, which doubles as the picking surface for the brush, and the final
//! image is composited from it.

pub mod app;
pub mod batched_cubes;
pub mod camera;
pub mod config;
pub mod data_pass;
pub mod error;
pub mod gpu;
pub mod grid_encoding;
pub mod material;
pub mod mesh;
pub mod picking;
pub mod readback;
pub mod render_surface;
pub mod scene;
pub mod shaders;
pub mod tool;

pub use config::SculptConfig;
pub use error::{SculptError, SculptResult};
pub use gpu::GpuContext;
pub use grid_encoding::GridLayout;
pub use picking::{PickResult, SurfaceHit};
pub use scene::{CompositeParams, FrameResult, RenderMode, SceneController};
pub use shaders::ShaderLibrary;
pub use tool::{PointerInput, ToolKind};
