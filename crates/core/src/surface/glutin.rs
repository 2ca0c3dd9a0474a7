//! Windowing-toolkit backend: a `glutin` windowed context.
//!
//! The toolkit owns window creation, config negotiation, and context
//! setup in one builder chain; events are polled from its event loop
//! during `present_frame`. The background pump discipline is not
//! available here -- the toolkit's event loop is bound to the thread
//! that created it -- so a background request falls back to synchronous
//! polling with a warning.

use glutin::dpi::PhysicalSize;
use glutin::event::{Event, WindowEvent};
use glutin::event_loop::{ControlFlow, EventLoop};
use glutin::platform::run_return::EventLoopExtRunReturn;
use glutin::window::{Fullscreen, WindowBuilder};
use glutin::{ContextBuilder, GlRequest, PossiblyCurrent, WindowedContext};
use log::{info, warn};

use crate::error::InitError;
use crate::surface::{PumpMode, PumpStatus, Session, SurfaceConfig, SurfaceProvider};

/// The toolkit-managed window, context, and event loop.
pub struct GlutinSurface {
    event_loop: EventLoop<()>,
    windowed: Option<WindowedContext<PossiblyCurrent>>,
}

/// Opens a window and GL context through the toolkit and returns a
/// live [`Session`].
///
/// # Errors
///
/// Returns [`InitError`] when no display server is reachable, the
/// window cannot be created, or the context cannot be made current.
/// The toolkit tears its own partial state down on failure.
#[allow(unsafe_code)]
pub fn init(config: &SurfaceConfig) -> Result<Session<GlutinSurface>, InitError> {
    config.validate()?;
    if config.pump == PumpMode::Background {
        warn!("toolkit backend cannot run a background event pump, polling synchronously");
    }

    // The toolkit aborts rather than reporting a missing display;
    // check ahead so init can fail with a descriptive error.
    if std::env::var_os("DISPLAY").is_none() && std::env::var_os("WAYLAND_DISPLAY").is_none() {
        return Err(InitError::DisplayUnavailable(
            "neither DISPLAY nor WAYLAND_DISPLAY is set".into(),
        ));
    }

    info!(
        "initializing toolkit window ({}x{}{})",
        config.width,
        config.height,
        if config.fullscreen { ", fullscreen" } else { "" }
    );

    let mut event_loop = EventLoop::new();

    let mut window = WindowBuilder::new()
        .with_title(config.title.clone())
        .with_inner_size(PhysicalSize::new(config.width, config.height));
    if config.fullscreen {
        window = window.with_fullscreen(Some(Fullscreen::Borderless(None)));
    }

    let windowed = ContextBuilder::new()
        .with_gl(GlRequest::GlThenGles {
            opengl_version: (2, 1),
            opengles_version: (2, 0),
        })
        .with_vsync(true)
        .build_windowed(window, &event_loop)
        .map_err(|e| InitError::WindowCreation(e.to_string()))?;

    // SAFETY: the context was just created on this thread and is not
    // current anywhere else.
    let windowed = unsafe { windowed.make_current() }
        .map_err(|(_, e)| InitError::ContextCreation(e.to_string()))?;

    // Drain the events generated by window creation so the first
    // present starts from a clean queue.
    event_loop.run_return(|_, _, control_flow| *control_flow = ControlFlow::Exit);

    // SAFETY: the context is current on this thread; the loader
    // resolves symbols from it.
    let gl = unsafe { glow::Context::from_loader_function(|name| windowed.get_proc_address(name)) };

    Ok(Session::new(
        gl,
        GlutinSurface {
            event_loop,
            windowed: Some(windowed),
        },
    ))
}

impl SurfaceProvider for GlutinSurface {
    fn pump_events(&mut self) -> PumpStatus {
        let mut status = PumpStatus::Continue;
        self.event_loop.run_return(|event, _, control_flow| {
            *control_flow = ControlFlow::Exit;
            if let Event::WindowEvent {
                event: WindowEvent::CloseRequested,
                ..
            } = event
            {
                status = PumpStatus::CloseRequested;
            }
        });
        status
    }

    fn swap_buffers(&mut self) {
        if let Some(windowed) = &self.windowed {
            if let Err(e) = windowed.swap_buffers() {
                warn!("swap_buffers failed: {e}");
            }
        }
    }

    fn cleanup(&mut self) {
        // Dropping the windowed context destroys context and window in
        // that order; the event loop itself dies with the surface.
        if self.windowed.take().is_some() {
            info!("toolkit window and context destroyed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // The toolkit needs a live display server; everything here is
    // exercised end to end by the demo binary instead.

    #[test]
    fn init_without_display_reports_display_unavailable() {
        if std::env::var_os("DISPLAY").is_some()
            || std::env::var_os("WAYLAND_DISPLAY").is_some()
        {
            // A real display is present; the error path cannot trigger.
            return;
        }
        let err = init(&SurfaceConfig::default()).err();
        assert!(matches!(err, Some(InitError::DisplayUnavailable(_))));
    }

    #[test]
    fn init_rejects_zero_dimensions_before_touching_the_platform() {
        let config = SurfaceConfig {
            width: 0,
            ..Default::default()
        };
        assert!(matches!(
            init(&config).err(),
            Some(InitError::InvalidDimensions)
        ));
    }

    #[test]
    #[ignore = "requires display server"]
    fn init_creates_window_and_current_context() {
        // Would test: init() succeeds, clear() + present_frame(true)
        // render without GL errors.
    }

    #[test]
    #[ignore = "requires display server"]
    fn close_request_surfaces_through_pump_events() {
        // Would test: sending a close event makes pump_events return
        // CloseRequested.
    }
}
