//! Square crop windows from normalized face boxes.
//!
//! Annotated face boxes are tight and rarely square. Each box is
//! expanded by a small margin, squared around its center using the
//! shorter pixel side, mapped to pixels and rounded.
//!
//! Squaring happens before denormalization but is aspect-aware: the
//! half-side is measured in pixels and converted back per axis, so the
//! window stays square on non-square frames. Rounding can still leave a
//! 1px mismatch, which the final step trims off.

use multitalk_models::{CropRectangle, NormalizedBox};

use crate::error::{MediaError, MediaResult};

/// Margin added to every side of a face box (normalized units).
pub const DEFAULT_EXPAND_RATIO: f64 = 0.02;

/// Compute the pixel-space square crop for `bbox` on a frame of the given size.
///
/// # Errors
/// - `UnreadableSource` if either frame dimension is zero
/// - `DegenerateBoundingBox` if the expanded box, or the rounded square, has no area
pub fn normalize(
    bbox: &NormalizedBox,
    frame_width: u32,
    frame_height: u32,
    expand_ratio: f64,
) -> MediaResult<CropRectangle> {
    if frame_width == 0 || frame_height == 0 {
        return Err(MediaError::unreadable_source(format!(
            "frame size {}x{}",
            frame_width, frame_height
        )));
    }

    let expanded = bbox.expand(expand_ratio);
    if expanded.is_degenerate() {
        return Err(MediaError::degenerate_bbox(format!(
            "top={} bottom={} left={} right={} after expanding by {}",
            expanded.top, expanded.bottom, expanded.left, expanded.right, expand_ratio
        )));
    }

    let square = to_square(&expanded, frame_width, frame_height);
    let rect = denormalize(&square, frame_width, frame_height);
    equalize(rect)
}

/// Recenter both axes on the box center with a half-side taken from the
/// shorter pixel dimension.
fn to_square(bbox: &NormalizedBox, frame_width: u32, frame_height: u32) -> NormalizedBox {
    let fw = frame_width as f64;
    let fh = frame_height as f64;

    let side_px = (bbox.height() * fh).min(bbox.width() * fw);
    let half_h = side_px / 2.0 / fh;
    let half_w = side_px / 2.0 / fw;

    let cy = bbox.center_y();
    let cx = bbox.center_x();

    NormalizedBox::new(cy - half_h, cy + half_h, cx - half_w, cx + half_w)
}

fn denormalize(bbox: &NormalizedBox, frame_width: u32, frame_height: u32) -> CropRectangle {
    let px = |v: f64, extent: u32| (v * extent as f64).round().clamp(0.0, extent as f64) as u32;

    CropRectangle::new(
        px(bbox.top, frame_height),
        px(bbox.bottom, frame_height),
        px(bbox.left, frame_width),
        px(bbox.right, frame_width),
    )
}

/// Trim the longer side so the rectangle is exactly square.
fn equalize(rect: CropRectangle) -> MediaResult<CropRectangle> {
    let side = rect.width().min(rect.height());
    if side == 0 {
        return Err(MediaError::degenerate_bbox(format!(
            "crop rounds to zero size: {:?}",
            rect
        )));
    }

    Ok(CropRectangle::new(
        rect.top,
        rect.top + side,
        rect.left,
        rect.left + side,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_box() {
        let bbox = NormalizedBox::new(0.4, 0.6, 0.3, 0.5);
        let rect = normalize(&bbox, 1000, 800, DEFAULT_EXPAND_RATIO).unwrap();

        assert_eq!(rect, CropRectangle::new(304, 496, 304, 496));
        assert_eq!(rect.bottom - rect.top, rect.right - rect.left);
        assert!(rect.fits_within(1000, 800));
    }

    #[test]
    fn test_zero_area_box() {
        let bbox = NormalizedBox::new(0.5, 0.5, 0.5, 0.5);

        let err = normalize(&bbox, 1000, 800, 0.0).unwrap_err();
        assert!(matches!(err, MediaError::DegenerateBoundingBox(_)));

        let rect = normalize(&bbox, 1000, 800, 0.02).unwrap();
        assert!(rect.is_square());
        assert_eq!(rect.width(), 32);
        assert_eq!(rect, CropRectangle::new(384, 416, 484, 516));
    }

    #[test]
    fn test_unreadable_frame() {
        let bbox = NormalizedBox::new(0.4, 0.6, 0.3, 0.5);
        assert!(matches!(
            normalize(&bbox, 0, 720, DEFAULT_EXPAND_RATIO),
            Err(MediaError::UnreadableSource(_))
        ));
        assert!(matches!(
            normalize(&bbox, 1280, 0, DEFAULT_EXPAND_RATIO),
            Err(MediaError::UnreadableSource(_))
        ));
    }

    #[test]
    fn test_full_frame_box_on_landscape_video() {
        let bbox = NormalizedBox::new(0.0, 1.0, 0.0, 1.0);
        let rect = normalize(&bbox, 1920, 1080, DEFAULT_EXPAND_RATIO).unwrap();

        assert_eq!(rect, CropRectangle::new(0, 1080, 420, 1500));
        assert!(rect.fits_within(1920, 1080));
    }

    #[test]
    fn test_odd_sizes_stay_square_and_inside() {
        let boxes = [
            NormalizedBox::new(0.113, 0.457, 0.601, 0.913),
            NormalizedBox::new(0.0, 0.333, 0.0, 0.777),
            NormalizedBox::new(0.71, 0.99, 0.05, 0.31),
        ];
        for bbox in boxes {
            for (w, h) in [(641, 359), (1279, 719), (853, 480), (477, 1001)] {
                let rect = normalize(&bbox, w, h, DEFAULT_EXPAND_RATIO).unwrap();
                assert!(rect.is_square(), "{:?} on {}x{}", rect, w, h);
                assert!(rect.fits_within(w, h), "{:?} on {}x{}", rect, w, h);
            }
        }
    }

    #[test]
    fn test_tiny_box_rounds_to_nothing() {
        let bbox = NormalizedBox::new(0.5, 0.5001, 0.5, 0.5001);
        let err = normalize(&bbox, 100, 100, 0.0).unwrap_err();
        assert!(matches!(err, MediaError::DegenerateBoundingBox(_)));
    }
}
