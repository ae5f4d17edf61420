use serde::Serialize;

use super::Point;

/// Opaque handle to a decoded sixel image. The pixel data lives with the
/// renderer; the grid only tracks where the image is anchored and reports
/// destroyed handles so the renderer can release them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ImageId(pub u64);

/// A sixel image anchored at a cell. `pos.row` is a ring index, not a
/// screen-relative row, so the anchor stays valid as the origin rotates.
#[derive(Debug, Clone)]
pub struct SixelImage {
    pub pos: Point,
    pub id: ImageId,
}
