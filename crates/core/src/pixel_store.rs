//! Extended pixel-store flags layered on top of the standard GL set.
//!
//! Browser-style rendering APIs accept three upload-time transform
//! flags through `pixelStorei` that the driver knows nothing about.
//! They are intercepted here and consulted only when client pixel data
//! is uploaded; every other pname passes through to the driver.

/// pname for the vertical-flip flag (`UNPACK_FLIP_Y_WEBGL`).
pub const UNPACK_FLIP_Y_WEBGL: u32 = 0x9240;
/// pname for the premultiply flag (`UNPACK_PREMULTIPLY_ALPHA_WEBGL`).
pub const UNPACK_PREMULTIPLY_ALPHA_WEBGL: u32 = 0x9241;
/// pname for the red/blue channel swap flag (`UNPACK_FLIP_BLUE_RED`).
pub const UNPACK_FLIP_BLUE_RED: u32 = 0x9245;

/// The closed set of extended pixel-store parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnpackParameter {
    FlipY,
    PremultiplyAlpha,
    FlipBlueRed,
}

impl UnpackParameter {
    /// Resolves a pname to an extended parameter, or `None` for
    /// anything belonging to the driver.
    pub fn from_pname(pname: u32) -> Option<Self> {
        match pname {
            UNPACK_FLIP_Y_WEBGL => Some(UnpackParameter::FlipY),
            UNPACK_PREMULTIPLY_ALPHA_WEBGL => Some(UnpackParameter::PremultiplyAlpha),
            UNPACK_FLIP_BLUE_RED => Some(UnpackParameter::FlipBlueRed),
            _ => None,
        }
    }

    /// The numeric pname for this parameter.
    pub fn pname(self) -> u32 {
        match self {
            UnpackParameter::FlipY => UNPACK_FLIP_Y_WEBGL,
            UnpackParameter::PremultiplyAlpha => UNPACK_PREMULTIPLY_ALPHA_WEBGL,
            UnpackParameter::FlipBlueRed => UNPACK_FLIP_BLUE_RED,
        }
    }

    /// The flag's name as hosts know it, used in error messages.
    pub fn name(self) -> &'static str {
        match self {
            UnpackParameter::FlipY => "UNPACK_FLIP_Y_WEBGL",
            UnpackParameter::PremultiplyAlpha => "UNPACK_PREMULTIPLY_ALPHA_WEBGL",
            UnpackParameter::FlipBlueRed => "UNPACK_FLIP_BLUE_RED",
        }
    }
}

/// Per-context upload transform flags.
///
/// One instance per rendering context, mutable for its whole lifetime
/// and reset only by context destruction. The flags are independent;
/// several may be set at once.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PixelUnpackState {
    /// Flip rows vertically at upload. Accepted and stored, but the
    /// transform itself is unimplemented and uploads with it set fail.
    pub flip_y: bool,
    /// Premultiply R, G, B by alpha at upload.
    pub premultiply_alpha: bool,
    /// Swap the red and blue channels at upload.
    pub flip_blue_red: bool,
}

impl PixelUnpackState {
    /// Creates the default state with all transforms disabled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets one flag.
    pub fn set(&mut self, param: UnpackParameter, enabled: bool) {
        match param {
            UnpackParameter::FlipY => self.flip_y = enabled,
            UnpackParameter::PremultiplyAlpha => self.premultiply_alpha = enabled,
            UnpackParameter::FlipBlueRed => self.flip_blue_red = enabled,
        }
    }

    /// Reads one flag.
    pub fn get(&self, param: UnpackParameter) -> bool {
        match param {
            UnpackParameter::FlipY => self.flip_y,
            UnpackParameter::PremultiplyAlpha => self.premultiply_alpha,
            UnpackParameter::FlipBlueRed => self.flip_blue_red,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_state_has_all_flags_clear() {
        let state = PixelUnpackState::new();
        assert!(!state.flip_y);
        assert!(!state.premultiply_alpha);
        assert!(!state.flip_blue_red);
    }

    #[test]
    fn set_and_get_each_flag() {
        let mut state = PixelUnpackState::new();
        for param in [
            UnpackParameter::FlipY,
            UnpackParameter::PremultiplyAlpha,
            UnpackParameter::FlipBlueRed,
        ] {
            state.set(param, true);
            assert!(state.get(param), "{param:?} should be set");
            state.set(param, false);
            assert!(!state.get(param), "{param:?} should be clear");
        }
    }

    #[test]
    fn flags_are_independent() {
        let mut state = PixelUnpackState::new();
        state.set(UnpackParameter::PremultiplyAlpha, true);
        assert!(!state.get(UnpackParameter::FlipY));
        assert!(!state.get(UnpackParameter::FlipBlueRed));
    }

    #[test]
    fn from_pname_resolves_the_three_extended_params() {
        assert_eq!(
            UnpackParameter::from_pname(0x9240),
            Some(UnpackParameter::FlipY)
        );
        assert_eq!(
            UnpackParameter::from_pname(0x9241),
            Some(UnpackParameter::PremultiplyAlpha)
        );
        assert_eq!(
            UnpackParameter::from_pname(0x9245),
            Some(UnpackParameter::FlipBlueRed)
        );
    }

    #[test]
    fn from_pname_rejects_driver_params() {
        // Standard GL pixel-store pnames must fall through to the driver.
        assert_eq!(UnpackParameter::from_pname(glow::UNPACK_ALIGNMENT), None);
        assert_eq!(UnpackParameter::from_pname(glow::PACK_ALIGNMENT), None);
        assert_eq!(UnpackParameter::from_pname(0), None);
        assert_eq!(UnpackParameter::from_pname(0x9242), None);
    }

    #[test]
    fn pname_round_trips() {
        for param in [
            UnpackParameter::FlipY,
            UnpackParameter::PremultiplyAlpha,
            UnpackParameter::FlipBlueRed,
        ] {
            assert_eq!(UnpackParameter::from_pname(param.pname()), Some(param));
        }
    }

    #[test]
    fn names_match_host_facing_constants() {
        assert_eq!(UnpackParameter::FlipY.name(), "UNPACK_FLIP_Y_WEBGL");
        assert_eq!(
            UnpackParameter::PremultiplyAlpha.name(),
            "UNPACK_PREMULTIPLY_ALPHA_WEBGL"
        );
        assert_eq!(UnpackParameter::FlipBlueRed.name(), "UNPACK_FLIP_BLUE_RED");
    }
}
