use std::sync::mpsc::Sender;

use egui::{InputState, PointerButton, Rect, Response, Sense, Ui, Widget};
use helpers::{
  MAX_ZOOM, MIN_ZOOM, center_on, fit_to_screen, point_to_coordinate, set_coordinate_to_pixel,
  show_box,
};
use layer::{Layer, TileLayer};
use log::{debug, info};

use crate::{
  config::Config,
  feature::{Feature, FeatureId},
  map::coordinates::{
    BoundingBox, Coordinate, PixelCoordinate, PixelPosition, Transform, WGS84Coordinate,
  },
  render::{MapRenderer, ViewEvent},
};

mod helpers;
mod layer;

pub use layer::{Marker, MarkerLayer};

/// A viewport change waiting for the next frame, when the size of the map is known.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ViewportRequest {
  /// Show the whole box, keeping the configured padding.
  Fit(BoundingBox),
  /// Center the coordinate at a tile zoom level.
  Center {
    coordinate: WGS84Coordinate,
    zoom: u8,
  },
}

/// The map widget: tiles below, feature markers on top.
pub struct MapView {
  transform: Transform,
  tile_layer: Option<TileLayer>,
  markers: MarkerLayer,
  pending_viewport: Option<ViewportRequest>,
  events: Sender<ViewEvent>,
  initial_view: ViewportRequest,
  focus_zoom: u8,
  fit_padding: f32,
}

impl MapView {
  #[must_use]
  pub fn new(ctx: egui::Context, config: &Config, events: Sender<ViewEvent>) -> Self {
    let initial_view = config.initial_view();
    Self {
      transform: Transform::invalid(),
      tile_layer: TileLayer::from_config(ctx, config),
      markers: MarkerLayer::new(),
      pending_viewport: None,
      events,
      initial_view: ViewportRequest::Center {
        coordinate: initial_view.coordinate(),
        zoom: initial_view.zoom,
      },
      focus_zoom: config.focus_zoom(),
      fit_padding: config.fit_padding(),
    }
  }

  /// The current transform. Invalid until the map was drawn once.
  #[must_use]
  pub fn transform(&self) -> &Transform {
    &self.transform
  }

  /// The viewport change that is applied on the next frame.
  #[must_use]
  pub fn pending_viewport(&self) -> Option<&ViewportRequest> {
    self.pending_viewport.as_ref()
  }

  #[must_use]
  pub fn markers(&self) -> &MarkerLayer {
    &self.markers
  }

  /// The feature whose popup is open.
  #[must_use]
  pub fn open_popup(&self) -> Option<&FeatureId> {
    self.markers.popup()
  }

  fn layers_mut(&mut self) -> impl Iterator<Item = &mut dyn Layer> {
    self
      .tile_layer
      .iter_mut()
      .map(|l| l as &mut dyn Layer)
      .chain(std::iter::once(&mut self.markers as &mut dyn Layer))
  }

  /// A visibility toggle and the settings of every layer.
  pub fn layers_ui(&mut self, ui: &mut Ui) {
    for layer in self.layers_mut() {
      layer.ui(ui);
    }
  }

  fn request_box(&mut self, bb: BoundingBox) {
    if !bb.is_valid() {
      return;
    }
    self.pending_viewport = Some(if bb.has_extent() {
      ViewportRequest::Fit(bb)
    } else {
      ViewportRequest::Center {
        coordinate: bb.center().as_wgs84(),
        zoom: self.focus_zoom,
      }
    });
  }

  fn apply_viewport(&mut self, request: ViewportRequest, rect: Rect) {
    match request {
      ViewportRequest::Fit(bb) => {
        show_box(&mut self.transform, &bb, rect, self.fit_padding);
        debug!("Fitted {bb:?} into {rect:?}, zoom {}", self.transform.zoom);
      }
      ViewportRequest::Center { coordinate, zoom } => {
        center_on(
          &mut self.transform,
          PixelCoordinate::from(coordinate),
          zoom,
          rect,
        );
        info!(
          "Focused on {:.4}, {:.4} at zoom {zoom}",
          coordinate.lat, coordinate.lon
        );
      }
    }
  }

  fn handle_keys(&mut self, events: impl Iterator<Item = egui::Event>, rect: Rect) {
    for event in events {
      if let egui::Event::Key {
        key,
        pressed: true,
        modifiers,
        ..
      } = event
      {
        match key {
          egui::Key::ArrowDown => {
            self.transform.translate(PixelPosition { x: 0., y: -10. });
          }
          egui::Key::ArrowLeft => {
            self.transform.translate(PixelPosition { x: 10., y: 0. });
          }
          egui::Key::ArrowRight => {
            self.transform.translate(PixelPosition { x: -10., y: 0. });
          }
          egui::Key::ArrowUp => {
            self.transform.translate(PixelPosition { x: 0., y: 10. });
          }
          egui::Key::Minus => {
            self.zoom_with_center(0.9, rect.center().into());
          }
          egui::Key::Plus | egui::Key::Equals => {
            self.zoom_with_center(1. / 0.9, rect.center().into());
          }
          egui::Key::F => {
            if let Some(bb) = self.markers.bounding_box() {
              self.request_box(bb);
            }
          }
          _ => {
            debug!("Unhandled key pressed: {key:?} {modifiers:?}");
          }
        }
      }
    }
  }

  fn handle_mouse_wheel(&mut self, ui: &Ui, response: &Response) {
    if response.hovered() {
      let delta = ui
        .input(|i| {
          i.events
            .iter()
            .find_map(|e| match e {
              egui::Event::MouseWheel { delta, .. } => Some(delta),
              _ => None,
            })
            .copied()
        })
        .map(|d| (d.y + 1.).clamp(0.8, 1.4).sqrt());
      if let Some(delta) = delta {
        let cursor = response.hover_pos().unwrap_or_default().into();
        self.zoom_with_center(delta, cursor);
      }
    }
  }

  fn zoom_with_center(&mut self, delta: f32, center: PixelPosition) {
    if self.transform.zoom * delta < MIN_ZOOM || self.transform.zoom * delta > MAX_ZOOM {
      return;
    }
    let hover_coord: PixelCoordinate = self.transform.invert().apply(center);
    self.transform.zoom(delta);
    set_coordinate_to_pixel(hover_coord, center, &mut self.transform);
  }

  fn handle_click(&mut self, pos: PixelPosition) {
    let Some(id) = self.markers.marker_at(pos, &self.transform).cloned() else {
      let wgs84 = point_to_coordinate(pos, &self.transform).as_wgs84();
      debug!("Click at {:.6},{:.6} hit no marker", wgs84.lat, wgs84.lon);
      return;
    };
    debug!("Marker {id} clicked");
    if let Err(e) = self.events.send(ViewEvent::Activated(id)) {
      log::error!("Failed to report marker click: {e}");
    }
  }
}

impl MapRenderer for MapView {
  fn render(&mut self, features: &[&Feature], active: Option<&FeatureId>) {
    self.markers.replace(features, active);
  }

  fn fit_to_bounds(&mut self, features: &[&Feature]) {
    let positions: Vec<_> = features.iter().filter_map(|f| f.position).collect();
    if positions.is_empty() {
      debug!("Nothing to fit, keeping the viewport");
      return;
    }
    self.request_box(BoundingBox::from_iterator(positions));
  }

  fn focus(&mut self, feature: &Feature) {
    let Some(coordinate) = feature.position else {
      return;
    };
    self.pending_viewport = Some(ViewportRequest::Center {
      coordinate,
      zoom: self.focus_zoom,
    });
    if !self.markers.open_popup(&feature.id) {
      debug!("{} has no marker, no popup opened", feature.id);
    }
  }
}

impl Widget for &mut MapView {
  fn ui(self, ui: &mut Ui) -> Response {
    let size = ui.available_size();
    let (rect, response) = ui.allocate_exact_size(size, Sense::click_and_drag());

    if self.transform.is_invalid() {
      self.transform = Transform::default();
      self.apply_viewport(self.initial_view, rect);
    }
    if let Some(request) = self.pending_viewport.take() {
      self.apply_viewport(request, rect);
    }

    self.handle_mouse_wheel(ui, &response);

    // Keys belong to the search field while it has the focus.
    if ui.ctx().memory(|mem| mem.focused().is_none()) {
      let events = ui.input(|i: &InputState| {
        i.events
          .iter()
          .filter(|e| matches!(e, egui::Event::Key { .. }))
          .cloned()
          .collect::<Vec<_>>()
      });
      self.handle_keys(events.into_iter(), rect);
    }

    if response.dragged() && response.dragged_by(PointerButton::Primary) {
      self.transform.translate(PixelPosition {
        x: response.drag_delta().x,
        y: response.drag_delta().y,
      });
    }

    if response.clicked()
      && let Some(pos) = response.interact_pointer_pos()
    {
      self.handle_click(pos.into());
    }

    fit_to_screen(&mut self.transform, &rect);

    if ui.is_rect_visible(rect) {
      let transform = self.transform;
      for layer in self.layers_mut() {
        if layer.visible() {
          layer.draw(ui, &transform, rect);
        }
      }
    }

    response
  }
}
