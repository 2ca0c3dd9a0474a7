//! Error types for surface initialization and pixel preprocessing.

use thiserror::Error;

/// Errors produced while bringing up a window surface and GL context.
///
/// Every variant carries the platform's own descriptive text. When init
/// fails, any resources acquired before the failing step have already
/// been released; no partial session is reachable.
#[derive(Debug, Error)]
pub enum InitError {
    /// Width or height was zero in the surface configuration.
    #[error("invalid dimensions: width and height must be non-zero")]
    InvalidDimensions,

    /// The display server or EGL driver could not be reached.
    #[error("display unavailable: {0}")]
    DisplayUnavailable(String),

    /// The platform refused to create a window.
    #[error("window creation failed: {0}")]
    WindowCreation(String),

    /// No framebuffer configuration matched the requested attributes.
    #[error("config negotiation failed: {0}")]
    ConfigNegotiation(String),

    /// The drawable surface could not be created for the window.
    #[error("surface creation failed: {0}")]
    SurfaceCreation(String),

    /// The rendering context could not be created or made current.
    #[error("context creation failed: {0}")]
    ContextCreation(String),
}

/// Errors produced by the upload-time pixel transforms.
///
/// Surfaced synchronously by `tex_image_2d` / `tex_sub_image_2d`; a
/// failed preprocess leaves the pixel buffer unmodified and the upload
/// never reaches the driver.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PreprocessError {
    /// The requested transform only supports RGBA / UNSIGNED_BYTE data.
    #[error("{transform} is only implemented for format RGBA and type UNSIGNED_BYTE")]
    UnsupportedFormat {
        /// Name of the pixel-store flag that required the transform.
        transform: &'static str,
    },

    /// The flag is accepted and stored but the transform does not exist.
    #[error("{transform} is not implemented")]
    NotImplemented {
        /// Name of the pixel-store flag that required the transform.
        transform: &'static str,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_dimensions_displays_readable_message() {
        let err = InitError::InvalidDimensions;
        let msg = format!("{err}");
        assert!(
            msg.contains("width") && msg.contains("height"),
            "expected message mentioning width and height, got: {msg}"
        );
    }

    #[test]
    fn display_unavailable_includes_platform_text() {
        let err = InitError::DisplayUnavailable("cannot connect to X server".into());
        let msg = format!("{err}");
        assert!(
            msg.contains("cannot connect to X server"),
            "missing platform text in: {msg}"
        );
    }

    #[test]
    fn config_negotiation_includes_platform_text() {
        let err = InitError::ConfigNegotiation("no matching EGL config".into());
        let msg = format!("{err}");
        assert!(msg.contains("no matching EGL config"), "got: {msg}");
    }

    #[test]
    fn unsupported_format_names_the_transform() {
        let err = PreprocessError::UnsupportedFormat {
            transform: "UNPACK_FLIP_BLUE_RED",
        };
        let msg = format!("{err}");
        assert!(msg.contains("UNPACK_FLIP_BLUE_RED"), "got: {msg}");
        assert!(msg.contains("RGBA"), "got: {msg}");
        assert!(msg.contains("UNSIGNED_BYTE"), "got: {msg}");
    }

    #[test]
    fn not_implemented_names_the_transform() {
        let err = PreprocessError::NotImplemented {
            transform: "UNPACK_FLIP_Y_WEBGL",
        };
        let msg = format!("{err}");
        assert!(msg.contains("UNPACK_FLIP_Y_WEBGL"), "got: {msg}");
        assert!(msg.contains("not implemented"), "got: {msg}");
    }

    #[test]
    fn errors_are_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<InitError>();
        assert_send_sync::<PreprocessError>();
    }

    #[test]
    fn errors_implement_std_error() {
        fn assert_std_error<T: std::error::Error>() {}
        assert_std_error::<InitError>();
        assert_std_error::<PreprocessError>();
    }
}
