use std::ops::{Add, AddAssign, Mul};

use serde::{Deserialize, Serialize};

/// Side length of the fixed canvas all ``PixelCoordinate``s live on.
pub const CANVAS_SIZE: f32 = 2048.;
/// Side length of one tile at the canvas zoom level.
pub const TILE_SIZE: f32 = 512.;
/// Zoom level at which the canvas is laid out.
const CANVAS_ZOOM: u8 = 2;

const PI: f32 = std::f32::consts::PI;

/// Two dimensional values that a transform can operate on.
pub trait XY:
  Default + Copy + Clone + AddAssign<Self> + Mul<f32, Output = Self> + Add<Self, Output = Self>
{
  fn x(&self) -> f32;
  fn y(&self) -> f32;
  #[must_use]
  fn with_x(self, x: f32) -> Self;
  #[must_use]
  fn with_y(self, y: f32) -> Self;
}

/// A position in degrees as found in `GeoJSON` files.
#[derive(Debug, PartialEq, Copy, Clone, Serialize, Deserialize)]
pub struct WGS84Coordinate {
  #[serde(alias = "latitude")]
  pub lat: f32,
  #[serde(alias = "longitude", alias = "lng")]
  pub lon: f32,
}

impl WGS84Coordinate {
  #[must_use]
  pub fn new(lat: f32, lon: f32) -> Self {
    Self { lat, lon }
  }

  /// Web Mercator can only show latitudes up to roughly 85 degrees, everything beyond is rejected
  /// together with longitudes outside of [-180, 180].
  #[must_use]
  pub fn is_valid(&self) -> bool {
    self.lat.is_finite()
      && self.lon.is_finite()
      && (-85.06..=85.06).contains(&self.lat)
      && (-180.0..=180.0).contains(&self.lon)
  }
}

/// A point on an imaginary canvas of ``CANVAS_SIZE``. Web Mercator at a fixed zoom level.
#[derive(Debug, Default, PartialEq, Copy, Clone, Serialize, Deserialize)]
pub struct PixelCoordinate {
  pub x: f32,
  pub y: f32,
}


/// A pixel in the UI. Handled like an ``egui::Pos2``.
#[derive(Debug, Default, PartialEq, Copy, Clone, Serialize, Deserialize)]
pub struct PixelPosition {
  pub x: f32,
  pub y: f32,
}

impl PixelPosition {
  #[must_use]
  pub fn sq_dist(&self, other: &Self) -> f32 {
    let dx = other.x - self.x;
    let dy = other.y - self.y;
    dx * dx + dy * dy
  }
}

/// Fractional tile numbers at a zoom level. Used to find the tiles that cover the screen.
#[derive(Debug, PartialEq, Copy, Clone, Serialize, Deserialize)]
pub struct TileCoordinate {
  pub x: f32,
  pub y: f32,
  pub zoom: u8,
}

impl TileCoordinate {
  #[must_use]
  pub fn from_coordinate(coord: WGS84Coordinate, zoom: u8) -> Self {
    let scale = 2f32.powi(zoom.into());
    let lat_rad = coord.lat.to_radians();
    let x = (coord.lon + 180.) / 360. * scale;
    let y = (1. - (lat_rad.tan() + 1. / lat_rad.cos()).ln() / PI) / 2. * scale;
    Self { x, y, zoom }
  }

  #[must_use]
  pub fn from_pixel_position(pixel_pos: PixelCoordinate, zoom: u8) -> Self {
    let scale = 2f32.powi(i32::from(zoom) - i32::from(CANVAS_ZOOM));
    TileCoordinate {
      x: pixel_pos.x / TILE_SIZE * scale,
      y: pixel_pos.y / TILE_SIZE * scale,
      zoom,
    }
  }
}

impl From<TileCoordinate> for PixelCoordinate {
  fn from(tile_coord: TileCoordinate) -> Self {
    let scale = 2f32.powi(i32::from(tile_coord.zoom) - i32::from(CANVAS_ZOOM));
    PixelCoordinate {
      x: tile_coord.x * TILE_SIZE / scale,
      y: tile_coord.y * TILE_SIZE / scale,
    }
  }
}

impl From<WGS84Coordinate> for PixelCoordinate {
  fn from(coord: WGS84Coordinate) -> Self {
    TileCoordinate::from_coordinate(coord, CANVAS_ZOOM).into()
  }
}

impl From<TileCoordinate> for WGS84Coordinate {
  fn from(tile_coord: TileCoordinate) -> Self {
    let scale = 2f32.powi(tile_coord.zoom.into());
    WGS84Coordinate {
      lat: (PI - tile_coord.y / scale * 2. * PI).sinh().atan().to_degrees(),
      lon: tile_coord.x / scale * 360. - 180.,
    }
  }
}

impl From<PixelCoordinate> for WGS84Coordinate {
  fn from(pc: PixelCoordinate) -> Self {
    TileCoordinate::from_pixel_position(pc, CANVAS_ZOOM).into()
  }
}

impl From<egui::Pos2> for PixelPosition {
  fn from(pos: egui::Pos2) -> Self {
    PixelPosition { x: pos.x, y: pos.y }
  }
}

impl From<PixelPosition> for egui::Pos2 {
  fn from(pp: PixelPosition) -> Self {
    egui::Pos2::new(pp.x, pp.y)
  }
}

macro_rules! impl_xy {
  ($t:ty) => {
    impl XY for $t {
      fn x(&self) -> f32 {
        self.x
      }

      fn y(&self) -> f32 {
        self.y
      }

      fn with_x(mut self, x: f32) -> Self {
        self.x = x;
        self
      }

      fn with_y(mut self, y: f32) -> Self {
        self.y = y;
        self
      }
    }

    impl Add for $t {
      type Output = Self;

      fn add(self, rhs: Self) -> Self {
        Self {
          x: self.x + rhs.x,
          y: self.y + rhs.y,
        }
      }
    }

    impl AddAssign for $t {
      fn add_assign(&mut self, other: Self) {
        self.x += other.x;
        self.y += other.y;
      }
    }

    impl Mul<f32> for $t {
      type Output = Self;

      fn mul(self, rhs: f32) -> Self {
        Self {
          x: self.x * rhs,
          y: self.y * rhs,
        }
      }
    }
  };
}

impl_xy!(PixelCoordinate);
impl_xy!(PixelPosition);
