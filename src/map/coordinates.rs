mod boxes;
mod coords;
mod transform;

/// Tiles and bounding boxes.
pub use boxes::*;
/// Coordinates.
pub use coords::*;
use transform::TTransform;

/// Maps canvas coordinates to pixels in the UI.
pub type Transform = TTransform<PixelCoordinate, PixelPosition>;

/// Anything that can be placed on the map.
pub trait Coordinate: Copy + Clone + std::fmt::Debug {
  fn as_wgs84(&self) -> WGS84Coordinate;
  fn as_pixel_coordinate(&self) -> PixelCoordinate;
}

impl Coordinate for WGS84Coordinate {
  fn as_wgs84(&self) -> WGS84Coordinate {
    *self
  }

  fn as_pixel_coordinate(&self) -> PixelCoordinate {
    PixelCoordinate::from(*self)
  }
}

impl Coordinate for PixelCoordinate {
  fn as_wgs84(&self) -> WGS84Coordinate {
    WGS84Coordinate::from(*self)
  }

  fn as_pixel_coordinate(&self) -> PixelCoordinate {
    *self
  }
}
