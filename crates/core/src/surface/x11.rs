//! Direct backend: Xlib window plus a dynamically loaded EGL context.
//!
//! Mirrors the low-level bring-up path: open the display, create and
//! map a plain window, then negotiate an EGL config and attach an
//! OpenGL ES 2.0 context to it. Both libraries are loaded at runtime
//! (`x11-dl`, `khronos-egl` dynamic), so the crate links against
//! nothing at build time.
//!
//! This backend supports both event disciplines. `XInitThreads` is
//! called before the display is opened, which makes the background
//! pump's cross-thread event polling defined behavior.

use std::ffi::CString;
use std::mem;
use std::os::raw::{c_char, c_long, c_uint, c_void};
use std::ptr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use khronos_egl as egl;
use log::{debug, info, warn};
use x11_dl::xlib;

use crate::error::InitError;
use crate::surface::pump::{BackgroundPump, POLL_INTERVAL};
use crate::surface::{PumpMode, PumpStatus, Session, SurfaceConfig, SurfaceProvider};

type EglInstance = egl::DynamicInstance<egl::EGL1_4>;

/// The loaded Xlib function table.
///
/// A table of function pointers resolved once by `dlopen`; sharing it
/// across threads is safe once `XInitThreads` has run.
struct XlibHandle(xlib::Xlib);

#[allow(unsafe_code)]
unsafe impl Send for XlibHandle {}
#[allow(unsafe_code)]
unsafe impl Sync for XlibHandle {}

/// Raw display pointer handed to the pump thread.
#[derive(Clone, Copy)]
struct RawDisplay(*mut xlib::Display);

// Xlib connections are usable from any thread after XInitThreads.
#[allow(unsafe_code)]
unsafe impl Send for RawDisplay {}

/// Display, window, and EGL handles in acquisition order.
///
/// Fields acquired later are `Option`s so a failure mid-init can drop
/// the value and have [`cleanup`](SurfaceProvider::cleanup) (via
/// `Drop`) release exactly the parts that exist, in reverse order.
pub struct X11Surface {
    xlib: Arc<XlibHandle>,
    egl: EglInstance,
    display: *mut xlib::Display,
    window: xlib::Window,
    wm_delete_window: xlib::Atom,
    egl_display: Option<egl::Display>,
    egl_surface: Option<egl::Surface>,
    egl_context: Option<egl::Context>,
    pump: Option<BackgroundPump>,
    close_requested: Arc<AtomicBool>,
    cleaned_up: bool,
}

/// Opens the X display, creates the window, and brings up an EGL
/// OpenGL ES 2.0 context on it.
///
/// # Errors
///
/// Returns [`InitError`] naming the failing stage. Resources acquired
/// before the failure are released before this returns.
#[allow(unsafe_code)]
pub fn init(config: &SurfaceConfig) -> Result<Session<X11Surface>, InitError> {
    config.validate()?;
    if config.layer != 0 {
        debug!("display layer {} ignored by the X11 backend", config.layer);
    }

    let xlib = xlib::Xlib::open()
        .map_err(|e| InitError::DisplayUnavailable(format!("cannot load Xlib: {e}")))?;
    // SAFETY: loading libEGL resolves symbols only; nothing is called yet.
    let egl_lib = unsafe { EglInstance::load_required() }
        .map_err(|e| InitError::DisplayUnavailable(format!("cannot load libEGL: {e}")))?;

    // SAFETY: first Xlib call in the process; required before the
    // background pump may touch the connection from its own thread.
    unsafe { (xlib.XInitThreads)() };

    info!("initializing X11 display and EGL context");

    // SAFETY: opens the default display; a null return means no server.
    let display = unsafe { (xlib.XOpenDisplay)(ptr::null()) };
    if display.is_null() {
        return Err(InitError::DisplayUnavailable(
            "cannot connect to X server".into(),
        ));
    }

    // From here on the surface owns everything acquired so far; early
    // returns drop it and Drop::cleanup releases the partial state.
    let mut surface = X11Surface {
        xlib: Arc::new(XlibHandle(xlib)),
        egl: egl_lib,
        display,
        window: 0,
        wm_delete_window: 0,
        egl_display: None,
        egl_surface: None,
        egl_context: None,
        pump: None,
        close_requested: Arc::new(AtomicBool::new(false)),
        cleaned_up: false,
    };

    surface.create_window(config);

    let gl = surface.create_egl_context()?;

    if config.pump == PumpMode::Background {
        let xlib = Arc::clone(&surface.xlib);
        let raw = RawDisplay(surface.display);
        let wm_delete_window = surface.wm_delete_window;
        let close = Arc::clone(&surface.close_requested);
        surface.pump = Some(BackgroundPump::spawn(POLL_INTERVAL, move || {
            if drain_events(&xlib.0, raw.0, wm_delete_window) {
                close.store(true, Ordering::Release);
            }
        }));
    }

    Ok(Session::new(gl, surface))
}

impl X11Surface {
    /// Creates, names, and maps the window; registers for the window
    /// manager's close message.
    #[allow(unsafe_code)]
    fn create_window(&mut self, config: &SurfaceConfig) {
        let xlib = &self.xlib.0;

        // SAFETY: straight-line Xlib calls against a live connection;
        // XCreateWindow with CopyFromParent depth/visual cannot return
        // an invalid id synchronously.
        unsafe {
            let root = (xlib.XDefaultRootWindow)(self.display);

            let mut attrs: xlib::XSetWindowAttributes = mem::zeroed();
            attrs.event_mask = xlib::ExposureMask
                | xlib::PointerMotionMask
                | xlib::KeyPressMask
                | xlib::StructureNotifyMask;

            self.window = (xlib.XCreateWindow)(
                self.display,
                root,
                0,
                0,
                config.width as c_uint,
                config.height as c_uint,
                0,
                xlib::CopyFromParent,
                xlib::InputOutput as c_uint,
                ptr::null_mut(),
                xlib::CWEventMask,
                &mut attrs,
            );

            let title = CString::new(config.title.as_str()).unwrap_or_default();
            (xlib.XStoreName)(self.display, self.window, title.as_ptr() as *mut c_char);

            self.wm_delete_window = (xlib.XInternAtom)(
                self.display,
                c"WM_DELETE_WINDOW".as_ptr(),
                xlib::False,
            );
            let mut protocols = [self.wm_delete_window];
            (xlib.XSetWMProtocols)(self.display, self.window, protocols.as_mut_ptr(), 1);

            (xlib.XMapWindow)(self.display, self.window);

            if config.fullscreen {
                let wm_state =
                    (xlib.XInternAtom)(self.display, c"_NET_WM_STATE".as_ptr(), xlib::False);
                let wm_fullscreen = (xlib.XInternAtom)(
                    self.display,
                    c"_NET_WM_STATE_FULLSCREEN".as_ptr(),
                    xlib::False,
                );

                let mut event: xlib::XEvent = mem::zeroed();
                event.client_message.type_ = xlib::ClientMessage;
                event.client_message.window = self.window;
                event.client_message.message_type = wm_state;
                event.client_message.format = 32;
                event.client_message.data.set_long(0, 1); // _NET_WM_STATE_ADD
                event.client_message.data.set_long(1, wm_fullscreen as c_long);
                (xlib.XSendEvent)(
                    self.display,
                    root,
                    xlib::False,
                    xlib::SubstructureNotifyMask | xlib::SubstructureRedirectMask,
                    &mut event,
                );
            }

            (xlib.XFlush)(self.display);
        }
    }

    /// Negotiates an EGL config, creates the window surface and ES 2.0
    /// context, makes them current, and loads the GL function table.
    #[allow(unsafe_code)]
    fn create_egl_context(&mut self) -> Result<glow::Context, InitError> {
        // SAFETY: the display pointer is live for the surface's lifetime.
        let egl_display = unsafe { self.egl.get_display(self.display as egl::NativeDisplayType) }
            .ok_or_else(|| InitError::DisplayUnavailable("no EGL display for X11 display".into()))?;

        let (major, minor) = self
            .egl
            .initialize(egl_display)
            .map_err(|e| InitError::DisplayUnavailable(format!("eglInitialize failed: {e}")))?;
        self.egl_display = Some(egl_display);
        debug!("EGL {major}.{minor} initialized");

        let attributes = [
            egl::BUFFER_SIZE,
            16,
            egl::RENDERABLE_TYPE,
            egl::OPENGL_ES2_BIT,
            egl::NONE,
        ];
        let egl_config = self
            .egl
            .choose_first_config(egl_display, &attributes)
            .map_err(|e| InitError::ConfigNegotiation(format!("eglChooseConfig failed: {e}")))?
            .ok_or_else(|| {
                InitError::ConfigNegotiation("no EGL framebuffer configuration matched".into())
            })?;

        // SAFETY: the window id stays valid until cleanup destroys it,
        // which happens only after the EGL surface is gone.
        let egl_surface = unsafe {
            self.egl.create_window_surface(
                egl_display,
                egl_config,
                self.window as egl::NativeWindowType,
                None,
            )
        }
        .map_err(|e| InitError::SurfaceCreation(format!("eglCreateWindowSurface failed: {e}")))?;
        self.egl_surface = Some(egl_surface);

        let context_attributes = [egl::CONTEXT_CLIENT_VERSION, 2, egl::NONE];
        let egl_context = self
            .egl
            .create_context(egl_display, egl_config, None, &context_attributes)
            .map_err(|e| InitError::ContextCreation(format!("eglCreateContext failed: {e}")))?;
        self.egl_context = Some(egl_context);

        self.egl
            .make_current(
                egl_display,
                Some(egl_surface),
                Some(egl_surface),
                Some(egl_context),
            )
            .map_err(|e| InitError::ContextCreation(format!("eglMakeCurrent failed: {e}")))?;

        let loader = &self.egl;
        // SAFETY: the context is current on this thread; symbols are
        // resolved through eglGetProcAddress.
        Ok(unsafe {
            glow::Context::from_loader_function(|name| match loader.get_proc_address(name) {
                Some(f) => f as usize as *const c_void,
                None => ptr::null(),
            })
        })
    }
}

impl SurfaceProvider for X11Surface {
    fn pump_events(&mut self) -> PumpStatus {
        if self.pump.is_some() {
            // The worker owns the event queue; only its verdict matters.
            return if self.close_requested.load(Ordering::Acquire) {
                PumpStatus::CloseRequested
            } else {
                PumpStatus::Continue
            };
        }
        if self.display.is_null() {
            return PumpStatus::Continue;
        }
        if drain_events(&self.xlib.0, self.display, self.wm_delete_window) {
            PumpStatus::CloseRequested
        } else {
            PumpStatus::Continue
        }
    }

    fn swap_buffers(&mut self) {
        if let (Some(display), Some(surface)) = (self.egl_display, self.egl_surface) {
            if let Err(e) = self.egl.swap_buffers(display, surface) {
                warn!("eglSwapBuffers failed: {e}");
            }
        }
    }

    #[allow(unsafe_code)]
    fn cleanup(&mut self) {
        if self.cleaned_up {
            return;
        }
        self.cleaned_up = true;

        // The pump must be gone before the connection it polls.
        if let Some(mut pump) = self.pump.take() {
            pump.stop();
        }

        info!("tearing down EGL context and X11 window");

        // Reverse acquisition order: context, surface, EGL display,
        // then the window and X connection. Driver objections during
        // teardown are ignored.
        if let Some(egl_display) = self.egl_display.take() {
            let _ = self.egl.make_current(egl_display, None, None, None);
            if let Some(context) = self.egl_context.take() {
                let _ = self.egl.destroy_context(egl_display, context);
            }
            if let Some(surface) = self.egl_surface.take() {
                let _ = self.egl.destroy_surface(egl_display, surface);
            }
            let _ = self.egl.terminate(egl_display);
        }

        // SAFETY: handles are destroyed exactly once, guarded above.
        unsafe {
            if self.window != 0 {
                (self.xlib.0.XDestroyWindow)(self.display, self.window);
                self.window = 0;
            }
            if !self.display.is_null() {
                (self.xlib.0.XCloseDisplay)(self.display);
                self.display = ptr::null_mut();
            }
        }
    }
}

impl Drop for X11Surface {
    fn drop(&mut self) {
        self.cleanup();
    }
}

/// Drains the pending X events, reporting whether the window manager
/// asked to close the window.
#[allow(unsafe_code)]
fn drain_events(xlib: &xlib::Xlib, display: *mut xlib::Display, wm_delete_window: xlib::Atom) -> bool {
    let mut close = false;
    // SAFETY: the display stays open while a pump can run; XPending/
    // XNextEvent only touch the event queue.
    unsafe {
        while (xlib.XPending)(display) > 0 {
            let mut event: xlib::XEvent = mem::zeroed();
            (xlib.XNextEvent)(display, &mut event);
            if event.type_ == xlib::ClientMessage
                && event.client_message.data.get_long(0) as xlib::Atom == wm_delete_window
            {
                close = true;
            }
        }
    }
    close
}

#[cfg(test)]
mod tests {
    use super::*;

    // Bring-up needs a live X server and EGL driver; the error paths
    // short of that are cheap to check headless.

    #[test]
    fn init_rejects_zero_dimensions_before_touching_the_platform() {
        let config = SurfaceConfig {
            height: 0,
            ..Default::default()
        };
        assert!(matches!(
            init(&config).err(),
            Some(InitError::InvalidDimensions)
        ));
    }

    #[test]
    #[ignore = "requires X server and EGL driver"]
    fn init_creates_window_and_current_context() {
        // Would test: init() succeeds and the first present_frame(true)
        // swaps without error.
    }

    #[test]
    #[ignore = "requires X server and EGL driver"]
    fn background_pump_is_joined_by_cleanup() {
        // Would test: init with PumpMode::Background, then shutdown();
        // the pump reports is_stopped() before the display closes.
    }

    #[test]
    #[ignore = "requires X server and EGL driver"]
    fn failed_config_negotiation_closes_the_display() {
        // Would test: an impossible attribute list yields
        // ConfigNegotiation and leaves no window behind.
    }
}
