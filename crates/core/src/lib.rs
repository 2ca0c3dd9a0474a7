#![deny(unsafe_code)]
//! WebGL-style rendering layer over a native OpenGL (ES) window surface.
//!
//! Provides the [`RenderingContext`] facade (pixel-unpack state, upload
//! preprocessing, registry-integrated object creation), the
//! [`ObjectRegistry`] that tracks every live driver handle for
//! deterministic teardown, shader compile/link helpers, and the
//! [`surface`] module with the platform backends and [`surface::Session`]
//! lifecycle (init, present, shutdown).

pub mod context;
pub mod error;
pub mod pixel_store;
pub mod preprocess;
pub mod registry;
pub mod shader;
pub mod surface;

// Hosts drive most GL calls straight through `glow`; re-export it so they
// share our version.
pub use glow;

pub use context::RenderingContext;
pub use error::{InitError, PreprocessError};
pub use pixel_store::{PixelUnpackState, UnpackParameter};
pub use preprocess::preprocess_upload;
pub use registry::{ObjectKind, ObjectRecord, ObjectRegistry};
pub use shader::{format_shader_error, ShaderError};
pub use surface::{PumpMode, PumpStatus, Session, SurfaceConfig, SurfaceProvider};
