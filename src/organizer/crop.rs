use crate::embedder::BoundingBox;

/// Pixel rectangle guaranteed to lie inside the image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Clamp a detector box to a `width` x `height` image.
///
/// Coordinates are truncated toward zero first, then limited to
/// `x1, y1 >= 0`, `x2 <= width`, `y2 <= height`. Returns `None` when nothing
/// is left.
pub fn clamp_to_image(bbox: &BoundingBox, width: u32, height: u32) -> Option<CropRect> {
    // `as` truncates toward zero and maps NaN to 0
    let x1 = (bbox.x1 as i64).max(0);
    let y1 = (bbox.y1 as i64).max(0);
    let x2 = (bbox.x2 as i64).min(i64::from(width));
    let y2 = (bbox.y2 as i64).min(i64::from(height));

    if x2 <= x1 || y2 <= y1 {
        return None;
    }

    Some(CropRect {
        x: x1 as u32,
        y: y1 as u32,
        width: (x2 - x1) as u32,
        height: (y2 - y1) as u32,
    })
}
