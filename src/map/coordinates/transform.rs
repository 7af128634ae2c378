use std::marker::PhantomData;

use super::XY;

/// A zoom followed by a translation from `F` to `T`.
/// The type parameters keep canvas coordinates and screen pixels apart.
#[derive(Debug, PartialEq, Copy, Clone)]
pub struct TTransform<F: XY, T: XY> {
  pub zoom: f32,
  pub trans: T,
  phantom_data: PhantomData<F>,
}

impl<F: XY, T: XY> Default for TTransform<F, T> {
  fn default() -> Self {
    Self {
      zoom: 1.,
      trans: T::default(),
      phantom_data: PhantomData,
    }
  }
}

/// Conversion between the two coordinate spaces, only visible to the transform.
trait Reinterpret<T> {
  fn reinterpret(self) -> T;
}

impl<F: XY, T: XY> Reinterpret<T> for F {
  fn reinterpret(self) -> T {
    T::default().with_x(self.x()).with_y(self.y())
  }
}

impl<F: XY, T: XY> TTransform<F, T> {
  /// An invalid transform is replaced by the initial view on the first frame.
  #[must_use]
  pub fn invalid() -> Self {
    Self {
      zoom: 0.,
      trans: T::default(),
      phantom_data: PhantomData,
    }
  }

  #[must_use]
  pub fn is_invalid(&self) -> bool {
    self.zoom == 0. || self.zoom.is_nan() || self.trans.x().is_nan() || self.trans.y().is_nan()
  }

  #[must_use]
  pub fn zoomed(mut self, factor: f32) -> Self {
    self.zoom *= factor;
    self
  }

  pub fn zoom(&mut self, factor: f32) -> &mut Self {
    self.zoom *= factor;
    self
  }

  pub fn translate(&mut self, delta: T) -> &mut Self {
    self.trans += delta;
    self
  }

  #[must_use]
  pub fn translated(mut self, delta: T) -> Self {
    self.translate(delta);
    self
  }

  #[must_use]
  pub fn invert(self) -> TTransform<T, F> {
    TTransform {
      zoom: 1. / self.zoom,
      trans: <T as Reinterpret<F>>::reinterpret(self.trans) * (-1. / self.zoom),
      phantom_data: PhantomData,
    }
  }

  pub fn apply(&self, from: F) -> T {
    <F as Reinterpret<T>>::reinterpret(from * self.zoom) + self.trans
  }
}
