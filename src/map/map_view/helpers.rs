use egui::Rect;

use crate::map::coordinates::{
  BoundingBox, CANVAS_SIZE, PixelCoordinate, PixelPosition, TILE_SIZE, Transform,
};

pub const MAX_ZOOM: f32 = 524_288.;
pub const MIN_ZOOM: f32 = 1.;

/// Sets a coordinate to the position in the map.
pub(crate) fn set_coordinate_to_pixel(
  coord: PixelCoordinate,
  cursor: PixelPosition,
  transform: &mut Transform,
) {
  let current_pos_in_gui = transform.apply(coord);
  transform.translate(current_pos_in_gui * (-1.) + cursor);
}

/// Converts a point, e.g. from a click, to a coordinate.
pub(crate) fn point_to_coordinate(point: PixelPosition, transform: &Transform) -> PixelCoordinate {
  transform.invert().apply(point)
}

/// The transform zoom that shows tiles of `level` at their natural size.
pub(crate) fn zoom_for_level(level: u8, rect: &Rect) -> f32 {
  let screen_size = rect.width().max(rect.height()).max(1.);
  (2f32.powi(i32::from(level) - 2) * TILE_SIZE / screen_size).clamp(MIN_ZOOM, MAX_ZOOM)
}

/// The tile zoom level matching a transform zoom. Inverse of [`zoom_for_level`].
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub(crate) fn level_for_zoom(zoom: f32, rect: &Rect) -> u8 {
  let screen_size = rect.width().max(rect.height()).max(1.);
  ((zoom * screen_size / TILE_SIZE).log2().round().max(0.) as u8).saturating_add(2)
}

/// Keeps zoom and translation inside reasonable bounds.
pub(crate) fn fit_to_screen(transform: &mut Transform, rect: &Rect) {
  transform.zoom = transform.zoom.clamp(MIN_ZOOM, MAX_ZOOM);

  let inv = transform.invert();
  let PixelCoordinate { x, y } = inv.apply(rect.min.into());
  if x < 0. || y < 0. {
    transform.translate(
      PixelPosition {
        x: x.min(0.),
        y: y.min(0.),
      } * transform.zoom,
    );
  }

  let inv = transform.invert();
  let PixelCoordinate { x, y } = inv.apply(rect.max.into());
  if x > CANVAS_SIZE || y > CANVAS_SIZE {
    transform.translate(
      PixelPosition {
        x: (x - CANVAS_SIZE).max(0.),
        y: (y - CANVAS_SIZE).max(0.),
      } * transform.zoom,
    );
  }
}

/// Centers `coord` in `rect` at the tile zoom `level`.
pub(crate) fn center_on(transform: &mut Transform, coord: PixelCoordinate, level: u8, rect: Rect) {
  transform.zoom = zoom_for_level(level, &rect);
  set_coordinate_to_pixel(coord, rect.center().into(), transform);
}

/// Shows the bounding box with `padding` pixels of space on every side.
///
/// A box without extent in one direction is fitted by the other one only.
pub(crate) fn show_box(transform: &mut Transform, bb: &BoundingBox, rect: Rect, padding: f32) {
  if !bb.is_valid() {
    return;
  }
  let inner = rect.shrink(padding);
  let inner = if inner.is_positive() { inner } else { rect };

  let width_zoom = inner.width() / bb.width();
  let height_zoom = inner.height() / bb.height();
  transform.zoom = width_zoom.min(height_zoom).clamp(MIN_ZOOM, MAX_ZOOM);
  set_coordinate_to_pixel(bb.center(), rect.center().into(), transform);
}
