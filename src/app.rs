use std::sync::mpsc::{Receiver, TryRecvError, channel};

use egui::Widget as _;
use log::{error, info};

use crate::{
  config::Config,
  feature::FeatureCollection,
  list::LocationList,
  loader::{self, DataSource, LoadError},
  map::MapView,
  render::ViewEvent,
  selection::{AppState, Coordinator, LoadStatus},
};

const ALL_CATEGORIES: &str = "All categories";

type LoadResult = Result<FeatureCollection, LoadError>;

/// Holds the UI data of poimap: search controls and result list on the left, map on the right.
pub struct PoiApp {
  coordinator: Coordinator<MapView, LocationList>,
  events: Receiver<ViewEvent>,
  load: Option<Receiver<LoadResult>>,
  query: String,
  category: Option<String>,
}

impl PoiApp {
  /// Starts loading `source` in the background. Needs a running tokio runtime.
  #[must_use]
  pub fn new(ctx: &egui::Context, config: &Config, source: DataSource) -> Self {
    let mut app = Self::empty(ctx, config);
    info!("Loading location data from {source}");
    app.load = Some(loader::spawn_load(source, ctx.clone()));
    app
  }

  /// An app whose load already finished with `result`.
  #[must_use]
  pub fn with_result(ctx: &egui::Context, config: &Config, result: LoadResult) -> Self {
    let mut app = Self::empty(ctx, config);
    app.coordinator.finish_load(result);
    app
  }

  fn empty(ctx: &egui::Context, config: &Config) -> Self {
    let (send, events) = channel();
    let map = MapView::new(ctx.clone(), config, send.clone());
    let list = LocationList::new(send);
    Self {
      coordinator: Coordinator::new(map, list),
      events,
      load: None,
      query: String::new(),
      category: None,
    }
  }

  #[must_use]
  pub fn state(&self) -> &AppState {
    self.coordinator.state()
  }

  #[must_use]
  pub fn coordinator(&self) -> &Coordinator<MapView, LocationList> {
    &self.coordinator
  }

  /// Same as typing `query` into the search field.
  pub fn set_query(&mut self, query: impl Into<String>) {
    self.query = query.into();
    self
      .coordinator
      .handle(ViewEvent::QueryChanged(self.query.clone()));
  }

  fn poll_load(&mut self) {
    let Some(recv) = &self.load else {
      return;
    };
    let result = match recv.try_recv() {
      Ok(result) => result,
      Err(TryRecvError::Empty) => return,
      Err(TryRecvError::Disconnected) => {
        error!("Location loader stopped without a result");
        Err(LoadError::Format("loader stopped without a result".to_string()))
      }
    };
    self.load = None;
    self.coordinator.finish_load(result);
  }

  fn process_events(&mut self) -> bool {
    let mut handled = false;
    for event in self.events.try_iter() {
      self.coordinator.handle(event);
      handled = true;
    }
    handled
  }

  fn search_ui(&mut self, ui: &mut egui::Ui) {
    let response = ui.add(
      egui::TextEdit::singleline(&mut self.query)
        .hint_text("Search by name")
        .desired_width(f32::INFINITY),
    );
    if response.changed() {
      self
        .coordinator
        .handle(ViewEvent::QueryChanged(self.query.clone()));
    }

    let categories: Vec<String> = self
      .coordinator
      .categories()
      .into_iter()
      .map(str::to_string)
      .collect();
    let previous = self.category.clone();
    egui::ComboBox::from_label("Category")
      .selected_text(self.category.as_deref().unwrap_or(ALL_CATEGORIES))
      .show_ui(ui, |ui| {
        ui.selectable_value(&mut self.category, None, ALL_CATEGORIES);
        for category in categories {
          let label = category.clone();
          ui.selectable_value(&mut self.category, Some(category), label);
        }
      });
    if self.category != previous {
      self
        .coordinator
        .handle(ViewEvent::CategoryChanged(self.category.clone()));
    }
  }

  fn sidebar_ui(&mut self, ui: &mut egui::Ui) {
    ui.horizontal(|ui| {
      ui.heading("Places");
      ui.label(self.coordinator.list().counter());
      if self.coordinator.state().status == LoadStatus::Loading {
        ui.spinner();
      }
    });
    self.search_ui(ui);

    ui.collapsing("Map Layers", |ui| {
      self.coordinator.map_mut().layers_ui(ui);
    });
    ui.separator();

    self.coordinator.list_mut().ui(ui);
  }
}

impl eframe::App for PoiApp {
  // All rendering happens in `update`, which eframe still calls before `ui`.
  fn ui(&mut self, _ui: &mut egui::Ui, _frame: &mut eframe::Frame) {}

  fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
    self.poll_load();

    egui::SidePanel::left("places")
      .default_width(320.)
      .width_range(220.0..=600.0)
      .resizable(true)
      .show(ctx, |ui| {
        self.sidebar_ui(ui);
      });

    egui::CentralPanel::default()
      .frame(egui::Frame::NONE)
      .show(ctx, |ui| {
        self.coordinator.map_mut().ui(ui);
      });

    // Clicks of this frame are handled right away, the views show the result next frame.
    if self.process_events() {
      ctx.request_repaint();
    }
  }
}
