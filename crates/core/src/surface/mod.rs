//! Window surface providers and the session lifecycle.
//!
//! A backend opens a window, negotiates a framebuffer config, and
//! produces a current GL context; the [`Session`] ties that surface to
//! a [`RenderingContext`] and owns the teardown ordering: registered
//! objects are always released before the surface and context are
//! destroyed.
//!
//! # Module overview
//!
//! - [`pump`] -- cancellable background event pump.
//! - [`glutin`] -- windowing-toolkit backend (feature `backend-glutin`).
//! - [`x11`] -- direct Xlib + EGL backend (feature `backend-x11`).

pub mod pump;

#[cfg(feature = "backend-glutin")]
pub mod glutin;
#[cfg(feature = "backend-x11")]
pub mod x11;

use log::info;
use serde::{Deserialize, Serialize};

use crate::context::RenderingContext;
use crate::error::InitError;

pub use pump::BackgroundPump;

/// How platform events are serviced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PumpMode {
    /// `present_frame` polls pending events itself.
    #[default]
    Synchronous,
    /// A dedicated worker polls on a fixed cadence; it is stopped and
    /// joined during cleanup. Only the direct X11 backend supports
    /// this; the toolkit backend's event loop is bound to its owning
    /// thread and falls back to synchronous polling.
    Background,
}

/// Window and context parameters for [`Session`] initialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfaceConfig {
    /// Window width in pixels. Must be non-zero.
    pub width: u32,
    /// Window height in pixels. Must be non-zero.
    pub height: u32,
    /// Request a borderless fullscreen window.
    pub fullscreen: bool,
    /// Window title; may be empty.
    pub title: String,
    /// Display layer for platforms with stacked output layers.
    /// Accepted for compatibility; neither desktop backend uses it.
    pub layer: u32,
    /// Event servicing discipline.
    pub pump: PumpMode,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            fullscreen: false,
            title: String::new(),
            layer: 0,
            pump: PumpMode::Synchronous,
        }
    }
}

impl SurfaceConfig {
    /// Checks the parts common to every backend.
    ///
    /// # Errors
    ///
    /// Returns [`InitError::InvalidDimensions`] for a zero width or height.
    pub fn validate(&self) -> Result<(), InitError> {
        if self.width == 0 || self.height == 0 {
            return Err(InitError::InvalidDimensions);
        }
        Ok(())
    }
}

/// Result of servicing platform events for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpStatus {
    /// Nothing of note; keep rendering.
    Continue,
    /// The platform asked to close the window.
    CloseRequested,
}

/// One platform windowing backend.
///
/// Implementations own the display, window, surface, and context
/// handles; `cleanup` must be idempotent and must tear them down in
/// strictly reverse order of acquisition.
pub trait SurfaceProvider {
    /// Services pending platform events (or, under a background pump,
    /// checks its close flag).
    fn pump_events(&mut self) -> PumpStatus;

    /// Flips the back buffer to the screen. May block on vsync.
    fn swap_buffers(&mut self);

    /// Destroys context, surface, window, display. Idempotent.
    fn cleanup(&mut self);
}

/// A live rendering session: one window surface plus one
/// [`RenderingContext`]. Exactly what the backend's `init` returns.
///
/// Dropping a session runs [`shutdown`](Session::shutdown) as a
/// backstop, so the release-then-cleanup pair happens exactly once
/// however the program leaves its render loop.
pub struct Session<S: SurfaceProvider> {
    context: RenderingContext,
    surface: S,
    finished: bool,
}

impl<S: SurfaceProvider> Session<S> {
    /// Pairs a freshly loaded GL context with its surface.
    pub fn new(gl: glow::Context, surface: S) -> Self {
        Self {
            context: RenderingContext::new(gl),
            surface,
            finished: false,
        }
    }

    /// The rendering context facade.
    pub fn context(&self) -> &RenderingContext {
        &self.context
    }

    /// Mutable access to the rendering context facade.
    pub fn context_mut(&mut self) -> &mut RenderingContext {
        &mut self.context
    }

    /// Presents a frame: swaps the back buffer when `swap`, then
    /// services platform events. A window-close request shuts the
    /// session down and terminates the process -- the deliberate,
    /// abrupt end of the render loop, not a recoverable error.
    pub fn present_frame(&mut self, swap: bool) {
        if self.try_present_frame(swap) == PumpStatus::CloseRequested {
            info!("window close requested, shutting down");
            self.shutdown();
            std::process::exit(0);
        }
    }

    /// Like [`present_frame`](Self::present_frame) but reports a close
    /// request to the caller instead of exiting, for hosts that manage
    /// their own loop.
    pub fn try_present_frame(&mut self, swap: bool) -> PumpStatus {
        if swap {
            self.surface.swap_buffers();
        }
        self.surface.pump_events()
    }

    /// Tears the session down: releases every registered GL object,
    /// then destroys the surface and context. Objects must die while
    /// their context is still alive, so this order is load-bearing.
    /// Safe to call more than once; only the first call does work.
    pub fn shutdown(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;
        self.context.release_all();
        debug_assert!(
            self.context.registry().is_tearing_down(),
            "object release must complete before surface teardown starts"
        );
        self.surface.cleanup();
    }
}

impl<S: SurfaceProvider> Drop for Session<S> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn default_config_matches_host_wrapper_defaults() {
        let config = SurfaceConfig::default();
        assert_eq!(config.width, 1280);
        assert_eq!(config.height, 720);
        assert!(!config.fullscreen);
        assert_eq!(config.title, "");
        assert_eq!(config.layer, 0);
        assert_eq!(config.pump, PumpMode::Synchronous);
    }

    #[test]
    fn validate_rejects_zero_width() {
        let config = SurfaceConfig {
            width: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(InitError::InvalidDimensions)
        ));
    }

    #[test]
    fn validate_rejects_zero_height() {
        let config = SurfaceConfig {
            height: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(InitError::InvalidDimensions)
        ));
    }

    #[test]
    fn validate_accepts_empty_title() {
        let config = SurfaceConfig {
            title: String::new(),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_json_round_trip() {
        let config = SurfaceConfig {
            width: 640,
            height: 480,
            fullscreen: true,
            title: "demo".into(),
            layer: 2,
            pump: PumpMode::Background,
        };
        let json = serde_json::to_string(&config).unwrap();
        let parsed: SurfaceConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.width, 640);
        assert_eq!(parsed.height, 480);
        assert!(parsed.fullscreen);
        assert_eq!(parsed.title, "demo");
        assert_eq!(parsed.pump, PumpMode::Background);
    }

    #[test]
    fn config_deserializes_with_missing_fields() {
        let parsed: SurfaceConfig = serde_json::from_str(r#"{"width": 800}"#).unwrap();
        assert_eq!(parsed.width, 800);
        assert_eq!(parsed.height, 720);
    }

    // --- Session lifecycle over a mock provider ---

    struct MockSurface {
        swaps: Arc<AtomicUsize>,
        pumps: Arc<AtomicUsize>,
        cleanups: Arc<AtomicUsize>,
        close_after_pumps: Option<usize>,
    }

    impl MockSurface {
        fn new() -> (Self, Arc<AtomicUsize>, Arc<AtomicUsize>, Arc<AtomicUsize>) {
            let swaps = Arc::new(AtomicUsize::new(0));
            let pumps = Arc::new(AtomicUsize::new(0));
            let cleanups = Arc::new(AtomicUsize::new(0));
            (
                Self {
                    swaps: Arc::clone(&swaps),
                    pumps: Arc::clone(&pumps),
                    cleanups: Arc::clone(&cleanups),
                    close_after_pumps: None,
                },
                swaps,
                pumps,
                cleanups,
            )
        }
    }

    impl SurfaceProvider for MockSurface {
        fn pump_events(&mut self) -> PumpStatus {
            let n = self.pumps.fetch_add(1, Ordering::SeqCst) + 1;
            match self.close_after_pumps {
                Some(limit) if n > limit => PumpStatus::CloseRequested,
                _ => PumpStatus::Continue,
            }
        }

        fn swap_buffers(&mut self) {
            self.swaps.fetch_add(1, Ordering::SeqCst);
        }

        fn cleanup(&mut self) {
            self.cleanups.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[allow(unsafe_code)]
    fn null_gl() -> glow::Context {
        // glow probes GL_VERSION and GL_EXTENSIONS while constructing
        // the context, so the loader resolves exactly that one symbol
        // to a canned stub reporting a bare GL 2.1.
        // SAFETY: nothing else is ever called through this loader in
        // tests; unresolved functions stay as loud panicking stubs.
        unsafe extern "system" fn get_string(name: u32) -> *const u8 {
            match name {
                glow::VERSION => b"2.1\0".as_ptr(),
                _ => b"\0".as_ptr(),
            }
        }
        unsafe {
            glow::Context::from_loader_function(|name| {
                if name == "glGetString" {
                    get_string as *const std::os::raw::c_void
                } else {
                    std::ptr::null()
                }
            })
        }
    }

    #[test]
    fn present_frame_swaps_then_pumps() {
        let (mock, swaps, pumps, _) = MockSurface::new();
        let mut session = Session::new(null_gl(), mock);

        assert_eq!(session.try_present_frame(true), PumpStatus::Continue);
        assert_eq!(swaps.load(Ordering::SeqCst), 1);
        assert_eq!(pumps.load(Ordering::SeqCst), 1);

        // Events are serviced even when the frame is not swapped.
        assert_eq!(session.try_present_frame(false), PumpStatus::Continue);
        assert_eq!(swaps.load(Ordering::SeqCst), 1);
        assert_eq!(pumps.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn close_request_is_reported() {
        let (mut mock, _, _, _) = MockSurface::new();
        mock.close_after_pumps = Some(2);
        let mut session = Session::new(null_gl(), mock);

        assert_eq!(session.try_present_frame(true), PumpStatus::Continue);
        assert_eq!(session.try_present_frame(true), PumpStatus::Continue);
        assert_eq!(session.try_present_frame(true), PumpStatus::CloseRequested);
    }

    #[test]
    fn shutdown_runs_cleanup_once() {
        let (mock, _, _, cleanups) = MockSurface::new();
        let mut session = Session::new(null_gl(), mock);

        session.shutdown();
        session.shutdown();
        assert_eq!(cleanups.load(Ordering::SeqCst), 1);
        assert!(session.context().registry().is_tearing_down());
    }

    #[test]
    fn drop_is_a_shutdown_backstop() {
        let (mock, _, _, cleanups) = MockSurface::new();
        {
            let _session = Session::new(null_gl(), mock);
        }
        assert_eq!(cleanups.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn explicit_shutdown_then_drop_cleans_up_once() {
        let (mock, _, _, cleanups) = MockSurface::new();
        {
            let mut session = Session::new(null_gl(), mock);
            session.shutdown();
        }
        assert_eq!(cleanups.load(Ordering::SeqCst), 1);
    }
}
