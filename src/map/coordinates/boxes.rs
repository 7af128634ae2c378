use serde::{Deserialize, Serialize};

use super::{CANVAS_SIZE, Coordinate, PixelCoordinate, TileCoordinate};

/// A slippy map tile.
#[derive(Debug, PartialEq, Copy, Clone, Hash, Eq, Serialize, Deserialize)]
pub struct Tile {
  pub x: u32,
  pub y: u32,
  pub zoom: u8,
}

impl Tile {
  #[must_use]
  pub fn exists(&self) -> bool {
    let max_tile = (1u32 << self.zoom) - 1;
    self.x <= max_tile && self.y <= max_tile
  }

  /// The tile covering this one at the next lower zoom level.
  #[must_use]
  pub fn parent(&self) -> Option<Self> {
    (self.zoom > 0).then(|| Self {
      x: self.x >> 1,
      y: self.y >> 1,
      zoom: self.zoom - 1,
    })
  }

  /// North-west and south-east corner on the canvas.
  #[must_use]
  #[allow(clippy::cast_precision_loss)]
  pub fn position(&self) -> (PixelCoordinate, PixelCoordinate) {
    (
      PixelCoordinate::from(TileCoordinate {
        x: self.x as f32,
        y: self.y as f32,
        zoom: self.zoom,
      }),
      PixelCoordinate::from(TileCoordinate {
        x: (self.x + 1) as f32,
        y: (self.y + 1) as f32,
        zoom: self.zoom,
      }),
    )
  }
}

impl From<TileCoordinate> for Tile {
  #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
  fn from(tile_coord: TileCoordinate) -> Self {
    Self {
      x: tile_coord.x.floor() as u32,
      y: tile_coord.y.floor() as u32,
      zoom: tile_coord.zoom,
    }
  }
}

/// All existing tiles between the two corners, row by row.
pub fn tiles_in_box(nw: TileCoordinate, se: TileCoordinate) -> impl Iterator<Item = Tile> {
  let nw_tile = Tile::from(nw);
  let se_tile = Tile::from(se);
  (nw_tile.y..=se_tile.y)
    .flat_map(move |y| {
      (nw_tile.x..=se_tile.x).map(move |x| Tile {
        x,
        y,
        zoom: nw_tile.zoom,
      })
    })
    .filter(Tile::exists)
}

/// An axis aligned box on the canvas. Starts out invalid and grows with every added coordinate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
  max_x: f32,
  min_x: f32,
  max_y: f32,
  min_y: f32,
}

impl Default for BoundingBox {
  fn default() -> Self {
    Self::get_invalid()
  }
}

impl BoundingBox {
  #[must_use]
  pub fn get_invalid() -> Self {
    Self {
      max_x: f32::MIN,
      min_x: f32::MAX,
      max_y: f32::MIN,
      min_y: f32::MAX,
    }
  }

  pub fn from_iterator<C: Coordinate, I: IntoIterator<Item = C>>(positions: I) -> Self {
    let mut bb = Self::get_invalid();
    for pos in positions {
      bb.add_coordinate(pos.as_pixel_coordinate());
    }
    bb
  }

  #[must_use]
  pub fn center(&self) -> PixelCoordinate {
    PixelCoordinate {
      x: f32::midpoint(self.max_x, self.min_x),
      y: f32::midpoint(self.max_y, self.min_y),
    }
  }

  /// Contains at least one coordinate inside the canvas.
  #[must_use]
  pub fn is_valid(&self) -> bool {
    self.min_y <= self.max_y
      && self.min_x <= self.max_x
      && self.min_x >= 0.
      && self.min_y >= 0.
      && self.max_x <= CANVAS_SIZE
      && self.max_y <= CANVAS_SIZE
  }

  /// Has an extent in at least one direction, so a zoom can be derived from it.
  #[must_use]
  pub fn has_extent(&self) -> bool {
    self.is_valid() && (self.width() > 0. || self.height() > 0.)
  }

  pub fn add_coordinate(&mut self, pc: PixelCoordinate) {
    self.min_y = self.min_y.min(pc.y);
    self.min_x = self.min_x.min(pc.x);
    self.max_y = self.max_y.max(pc.y);
    self.max_x = self.max_x.max(pc.x);
  }

  #[must_use]
  pub fn width(&self) -> f32 {
    self.max_x - self.min_x
  }

  #[must_use]
  pub fn height(&self) -> f32 {
    self.max_y - self.min_y
  }
}

#[cfg(test)]
mod tests {
  use crate::map::coordinates::WGS84Coordinate;

  use super::*;

  #[test]
  fn tile_of_coordinate() {
    let coord = WGS84Coordinate::new(52.521_977, 13.413_305);
    let t13: Tile = TileCoordinate::from_coordinate(coord, 13).into();
    assert_eq!(
      t13,
      Tile {
        x: 4401,
        y: 2686,
        zoom: 13
      }
    );
  }

  #[test]
  fn tiles_in_box_count() {
    let nw = TileCoordinate {
      x: 2.1,
      y: 1.1,
      zoom: 5,
    };
    let se = TileCoordinate {
      x: 11.1,
      y: 20.1,
      zoom: 5,
    };
    assert_eq!(tiles_in_box(nw, se).count(), 200);
  }

  #[test]
  fn parent_of_root_is_none() {
    assert_eq!(Tile { x: 0, y: 0, zoom: 0 }.parent(), None);
    assert_eq!(
      Tile { x: 5, y: 6, zoom: 10 }.parent(),
      Some(Tile { x: 2, y: 3, zoom: 9 })
    );
  }

  #[test]
  fn bounding_box_of_points() {
    let empty = BoundingBox::from_iterator(Vec::<WGS84Coordinate>::new());
    assert!(!empty.is_valid());

    let single = BoundingBox::from_iterator([WGS84Coordinate::new(-25.3, -57.6)]);
    assert!(single.is_valid());
    assert!(!single.has_extent());

    let two = BoundingBox::from_iterator([
      WGS84Coordinate::new(-25.3, -57.6),
      WGS84Coordinate::new(-25.2, -57.5),
    ]);
    assert!(two.has_extent());
    let center = WGS84Coordinate::from(two.center());
    assert!((center.lon - -57.55).abs() < 0.001);
  }
}
