use std::collections::HashMap;

use egui::{Align2, Color32, Id, Order, Pos2, Rect, Stroke, Ui, vec2};

use crate::{
  feature::{Feature, FeatureId},
  map::coordinates::{BoundingBox, PixelCoordinate, PixelPosition, Transform},
  render::Summary,
};

use super::{Layer, LayerProperties};

const NAME: &str = "Markers";

/// Distance of the pin head above the marked position.
const PIN_HEIGHT: f32 = 24.;
const PIN_RADIUS: f32 = 9.;
/// Clicks closer than this to the pin head hit the marker.
const HIT_RADIUS: f32 = PIN_RADIUS + 3.;

const PIN_FILL: Color32 = Color32::from_rgb(41, 128, 185);
const PIN_FILL_ACTIVE: Color32 = Color32::from_rgb(231, 76, 60);

/// One pin on the map.
#[derive(Debug, Clone)]
pub struct Marker {
  pub position: PixelCoordinate,
  pub summary: Summary,
}

impl Marker {
  fn head(&self, transform: &Transform) -> Pos2 {
    let tip: Pos2 = transform.apply(self.position).into();
    tip - vec2(0., PIN_HEIGHT)
  }
}

/// Holds one marker per positioned feature, keyed by feature id, and at most one open popup.
///
/// The highlighted marker is whatever the last `replace` was told is active. A popup can only be
/// open for that marker.
pub struct MarkerLayer {
  markers: HashMap<FeatureId, Marker>,
  /// Draw order. Later markers are drawn on top and hit first.
  order: Vec<FeatureId>,
  active: Option<FeatureId>,
  open_popup: Option<FeatureId>,
  layer_properties: LayerProperties,
}

impl Default for MarkerLayer {
  fn default() -> Self {
    Self::new()
  }
}

impl MarkerLayer {
  #[must_use]
  pub fn new() -> Self {
    Self {
      markers: HashMap::new(),
      order: Vec::new(),
      active: None,
      open_popup: None,
      layer_properties: LayerProperties::default(),
    }
  }

  /// Drops all markers and creates new ones for the features with a position. The marker of
  /// `active` is highlighted.
  pub fn replace(&mut self, features: &[&Feature], active: Option<&FeatureId>) {
    self.markers.clear();
    self.order.clear();
    for feature in features {
      let Some(position) = feature.position else {
        continue;
      };
      let marker = Marker {
        position: position.into(),
        summary: Summary::from(*feature),
      };
      if self.markers.insert(feature.id.clone(), marker).is_none() {
        self.order.push(feature.id.clone());
      }
    }
    self.active = active.cloned();
    if self
      .open_popup
      .as_ref()
      .is_some_and(|id| !self.markers.contains_key(id) || self.active.as_ref() != Some(id))
    {
      self.close_popup();
    }
    log::debug!("Showing {} markers", self.markers.len());
  }

  /// Ids of all markers in draw order.
  pub fn ids(&self) -> impl Iterator<Item = &FeatureId> {
    self.order.iter()
  }

  #[must_use]
  pub fn get(&self, id: &FeatureId) -> Option<&Marker> {
    self.markers.get(id)
  }

  #[must_use]
  pub fn len(&self) -> usize {
    self.markers.len()
  }

  #[must_use]
  pub fn is_empty(&self) -> bool {
    self.markers.is_empty()
  }

  /// The highlighted marker, if it is shown.
  #[must_use]
  pub fn active(&self) -> Option<&FeatureId> {
    self
      .active
      .as_ref()
      .filter(|id| self.markers.contains_key(*id))
  }

  /// Opens the popup of the active marker. Returns `false` if `id` is not active or has no marker.
  pub fn open_popup(&mut self, id: &FeatureId) -> bool {
    if self.markers.contains_key(id) && self.active.as_ref() == Some(id) {
      self.open_popup = Some(id.clone());
      true
    } else {
      false
    }
  }

  fn close_popup(&mut self) {
    self.open_popup = None;
  }

  #[must_use]
  pub fn popup(&self) -> Option<&FeatureId> {
    self.open_popup.as_ref()
  }

  /// The topmost marker whose pin head is under `pos`.
  #[must_use]
  pub fn marker_at(&self, pos: PixelPosition, transform: &Transform) -> Option<&FeatureId> {
    let max_dist = HIT_RADIUS * HIT_RADIUS;
    self.order.iter().rev().find(|id| {
      self.markers.get(*id).is_some_and(|marker| {
        let head: PixelPosition = marker.head(transform).into();
        head.sq_dist(&pos) <= max_dist
      })
    })
  }

  fn draw_pin(&self, ui: &Ui, rect: Rect, marker: &Marker, active: bool, transform: &Transform) {
    let painter = ui.painter_at(rect);
    let tip: Pos2 = transform.apply(marker.position).into();
    let head = marker.head(transform);
    let fill = if active { PIN_FILL_ACTIVE } else { PIN_FILL };
    let stroke = Stroke::new(1.5, Color32::WHITE);

    painter.add(egui::Shape::convex_polygon(
      vec![
        head + vec2(-PIN_RADIUS * 0.8, PIN_RADIUS * 0.5),
        tip,
        head + vec2(PIN_RADIUS * 0.8, PIN_RADIUS * 0.5),
      ],
      fill,
      Stroke::NONE,
    ));
    painter.circle(head, PIN_RADIUS, fill, stroke);
    painter.circle_filled(head, PIN_RADIUS * 0.35, Color32::WHITE);
  }

  fn show_popup(&mut self, ui: &Ui, rect: Rect, transform: &Transform) {
    let Some(id) = self.open_popup.clone() else {
      return;
    };
    let Some(marker) = self.markers.get(&id) else {
      return;
    };
    let anchor = marker.head(transform) - vec2(0., PIN_RADIUS + 4.);
    if !rect.contains(anchor) {
      return;
    }

    let mut close = false;
    egui::Area::new(Id::new("marker_popup"))
      .order(Order::Foreground)
      .fixed_pos(anchor)
      .pivot(Align2::CENTER_BOTTOM)
      .show(ui.ctx(), |ui| {
        egui::Frame::popup(ui.style()).show(ui, |ui| {
          ui.set_max_width(260.);
          ui.horizontal(|ui| {
            ui.strong(&marker.summary.title);
            if ui.small_button("✖").clicked() {
              close = true;
            }
          });
          if !marker.summary.description.is_empty() {
            ui.label(&marker.summary.description);
          }
          ui.weak(&marker.summary.category);
        });
      });

    if close {
      log::debug!("Closing popup of {id}");
      self.close_popup();
    }
  }
}

impl Layer for MarkerLayer {
  fn draw(&mut self, ui: &mut Ui, transform: &Transform, rect: Rect) {
    if !self.visible() {
      return;
    }
    for id in &self.order {
      if let Some(marker) = self.markers.get(id) {
        self.draw_pin(ui, rect, marker, self.active.as_ref() == Some(id), transform);
      }
    }
    self.show_popup(ui, rect, transform);
  }

  fn name(&self) -> &str {
    NAME
  }

  fn visible(&self) -> bool {
    self.layer_properties.visible
  }

  fn visible_mut(&mut self) -> &mut bool {
    &mut self.layer_properties.visible
  }

  fn bounding_box(&self) -> Option<BoundingBox> {
    let bb = BoundingBox::from_iterator(self.markers.values().map(|m| m.position));
    bb.is_valid().then_some(bb)
  }

  fn ui_content(&mut self, ui: &mut Ui) {
    ui.label(format!("{} markers", self.markers.len()));
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::map::coordinates::WGS84Coordinate;

  fn features() -> Vec<Feature> {
    vec![
      Feature::new(0usize)
        .with_name("Plaza Central")
        .with_position(WGS84Coordinate::new(-25.30, -57.63)),
      Feature::new(1usize).with_name("Parque Norte"),
      Feature::new(2usize)
        .with_name("Plaza Sur")
        .with_position(WGS84Coordinate::new(-25.31, -57.62)),
    ]
  }

  fn layer() -> MarkerLayer {
    let features = features();
    let refs: Vec<_> = features.iter().collect();
    let mut layer = MarkerLayer::new();
    layer.replace(&refs, None);
    layer
  }

  #[test]
  fn only_positioned_features_get_markers() {
    let layer = layer();
    assert_eq!(
      layer.ids().cloned().collect::<Vec<_>>(),
      [FeatureId::from(0usize), FeatureId::from(2usize)]
    );
    assert_eq!(
      layer.get(&FeatureId::from(0usize)).map(|m| m.summary.title.as_str()),
      Some("Plaza Central")
    );
  }

  #[test]
  fn replace_drops_stale_markers_and_popup() {
    let features = features();
    let refs: Vec<_> = features.iter().collect();
    let mut layer = MarkerLayer::new();
    layer.replace(&refs, Some(&FeatureId::from(2usize)));
    assert!(layer.open_popup(&FeatureId::from(2usize)));

    layer.replace(&[&features[0]], Some(&FeatureId::from(2usize)));
    assert_eq!(layer.len(), 1);
    assert!(layer.get(&FeatureId::from(2usize)).is_none());
    assert_eq!(layer.popup(), None);
    assert_eq!(layer.active(), None);

    layer.replace(&[], None);
    assert!(layer.is_empty());
    assert!(layer.bounding_box().is_none());
  }

  #[test]
  fn popup_needs_an_active_marker() {
    let features = features();
    let refs: Vec<_> = features.iter().collect();
    let mut layer = MarkerLayer::new();

    layer.replace(&refs, Some(&FeatureId::from(1usize)));
    assert!(!layer.open_popup(&FeatureId::from(1usize)));
    assert!(!layer.open_popup(&FeatureId::from(0usize)));
    assert_eq!(layer.popup(), None);

    layer.replace(&refs, Some(&FeatureId::from(2usize)));
    assert!(layer.open_popup(&FeatureId::from(2usize)));
    assert_eq!(layer.popup(), Some(&FeatureId::from(2usize)));
    layer.close_popup();
    assert_eq!(layer.popup(), None);
    assert_eq!(layer.active(), Some(&FeatureId::from(2usize)));
  }

  #[test]
  fn new_active_feature_closes_other_popup() {
    let features = features();
    let refs: Vec<_> = features.iter().collect();
    let mut layer = MarkerLayer::new();
    layer.replace(&refs, Some(&FeatureId::from(0usize)));
    assert!(layer.open_popup(&FeatureId::from(0usize)));

    layer.replace(&refs, Some(&FeatureId::from(1usize)));
    assert_eq!(layer.popup(), None);
    assert_eq!(layer.active(), None);

    layer.replace(&refs, Some(&FeatureId::from(0usize)));
    assert_eq!(layer.active(), Some(&FeatureId::from(0usize)));
    assert_eq!(layer.popup(), None);
  }

  #[test]
  fn hit_test_finds_pin_head() {
    let layer = layer();
    let transform = Transform::default().zoomed(10_000.);
    let marker = layer.get(&FeatureId::from(0usize)).expect("marker");
    let head: PixelPosition = marker.head(&transform).into();

    assert_eq!(
      layer.marker_at(head, &transform),
      Some(&FeatureId::from(0usize))
    );
    let far = PixelPosition {
      x: head.x + 50.,
      y: head.y,
    };
    assert_eq!(layer.marker_at(far, &transform), None);
  }
}
