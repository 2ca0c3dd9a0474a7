//! In-place pixel transforms applied before texture uploads.
//!
//! When any extended pixel-store flag is set, client-supplied pixel
//! data is rewritten in place before it reaches the driver. All
//! validation happens before the first byte is touched, so a rejected
//! upload leaves the caller's buffer exactly as it was.

use crate::error::PreprocessError;
use crate::pixel_store::{PixelUnpackState, UnpackParameter};

/// Applies the enabled unpack transforms to `pixels` in place.
///
/// Transforms are applied in a fixed order: red/blue swap first, then
/// alpha premultiplication. Both require `format == RGBA` and
/// `ty == UNSIGNED_BYTE`. The vertical flip flag is accepted by
/// `pixel_storei` but the transform itself does not exist; any upload
/// with it set fails regardless of format and type.
///
/// The premultiply step computes `channel = (channel * alpha) >> 8`,
/// a deliberate approximation of dividing by 255 kept for
/// compatibility with existing hosts; do not "fix" it to an exact
/// divide.
///
/// # Errors
///
/// - [`PreprocessError::NotImplemented`] when the vertical flip flag is set.
/// - [`PreprocessError::UnsupportedFormat`] when a channel transform is
///   requested for anything but RGBA / UNSIGNED_BYTE data.
pub fn preprocess_upload(
    state: &PixelUnpackState,
    pixels: &mut [u8],
    width: i32,
    height: i32,
    format: u32,
    ty: u32,
) -> Result<(), PreprocessError> {
    // Validate everything up front; mutation only starts once the whole
    // request is known to be serviceable.
    if state.flip_y {
        return Err(PreprocessError::NotImplemented {
            transform: UnpackParameter::FlipY.name(),
        });
    }

    if !state.flip_blue_red && !state.premultiply_alpha {
        return Ok(());
    }

    if format != glow::RGBA || ty != glow::UNSIGNED_BYTE {
        let transform = if state.flip_blue_red {
            UnpackParameter::FlipBlueRed
        } else {
            UnpackParameter::PremultiplyAlpha
        };
        return Err(PreprocessError::UnsupportedFormat {
            transform: transform.name(),
        });
    }

    let total = width.max(0) as usize * height.max(0) as usize * 4;
    let len = total.min(pixels.len());
    let data = &mut pixels[..len];

    if state.flip_blue_red {
        for px in data.chunks_exact_mut(4) {
            px.swap(0, 2);
        }
    }

    if state.premultiply_alpha {
        for px in data.chunks_exact_mut(4) {
            let alpha = u16::from(px[3]);
            px[0] = ((u16::from(px[0]) * alpha) >> 8) as u8;
            px[1] = ((u16::from(px[1]) * alpha) >> 8) as u8;
            px[2] = ((u16::from(px[2]) * alpha) >> 8) as u8;
        }
    }

    Ok(())
}
