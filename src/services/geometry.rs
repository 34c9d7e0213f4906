//! Click-to-image coordinate mapping for manual landmark placement.

use crate::domain::errors::ValidationError;
use crate::domain::models::NormalizedPoint;

/// Rendered bounding rectangle of an image element, in the same space as the click.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq)]
#[error("image bounding box {width}x{height} is degenerate; the image is not rendered")]
pub struct DegenerateBoxError {
    pub width: f64,
    pub height: f64,
}

/// Maps a click inside `bbox` to unit-square coordinates.
///
/// The result is not clamped: clicks outside the box produce values outside [0, 1].
#[allow(clippy::neg_cmp_op_on_partial_ord)]
pub fn normalize(
    click_x: f64,
    click_y: f64,
    bbox: &BoundingBox,
) -> Result<NormalizedPoint, DegenerateBoxError> {
    // NaN sizes must fail as well.
    if !(bbox.width > 0.0) || !(bbox.height > 0.0) {
        return Err(DegenerateBoxError {
            width: bbox.width,
            height: bbox.height,
        });
    }
    Ok(NormalizedPoint {
        x: (click_x - bbox.left) / bbox.width,
        y: (click_y - bbox.top) / bbox.height,
    })
}

pub fn ensure_within_image(point: NormalizedPoint) -> Result<NormalizedPoint, ValidationError> {
    if point.within_unit_square() {
        Ok(point)
    } else {
        Err(ValidationError::PointOutOfBounds {
            x: point.x,
            y: point.y,
        })
    }
}

/// Normalizes a click and rejects it unless it landed on the image.
pub fn override_point_from_click(
    click_x: f64,
    click_y: f64,
    bbox: &BoundingBox,
) -> Result<NormalizedPoint, ValidationError> {
    let point = normalize(click_x, click_y, bbox)?;
    ensure_within_image(point)
}
