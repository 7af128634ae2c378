use crate::{
  feature::{FeatureCollection, FeatureId},
  filter::{self, FilterState},
  loader::LoadError,
  render::{LOAD_FAILED, ListRenderer, MapRenderer, ViewEvent},
};

/// The feature highlighted in both views. Once set, it can only be replaced, never cleared.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ActiveSelection {
  #[default]
  NoSelection,
  Selected(FeatureId),
}

impl ActiveSelection {
  #[must_use]
  pub fn id(&self) -> Option<&FeatureId> {
    match self {
      ActiveSelection::NoSelection => None,
      ActiveSelection::Selected(id) => Some(id),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LoadStatus {
  #[default]
  Loading,
  Loaded,
  Failed(String),
}

/// Everything the views are derived from.
#[derive(Debug, Default)]
pub struct AppState {
  pub collection: FeatureCollection,
  pub filter: FilterState,
  pub selection: ActiveSelection,
  pub status: LoadStatus,
}

/// Owns the application state and keeps map and list in sync with it.
pub struct Coordinator<M, L> {
  state: AppState,
  map: M,
  list: L,
}

impl<M: MapRenderer, L: ListRenderer> Coordinator<M, L> {
  pub fn new(map: M, list: L) -> Self {
    Self {
      state: AppState::default(),
      map,
      list,
    }
  }

  #[must_use]
  pub fn state(&self) -> &AppState {
    &self.state
  }

  pub fn map(&self) -> &M {
    &self.map
  }

  pub fn map_mut(&mut self) -> &mut M {
    &mut self.map
  }

  pub fn list(&self) -> &L {
    &self.list
  }

  pub fn list_mut(&mut self) -> &mut L {
    &mut self.list
  }

  /// The categories for the category selector.
  #[must_use]
  pub fn categories(&self) -> Vec<&str> {
    filter::categories(self.state.collection.features())
  }

  /// Takes the result of the initial load. Nothing is rendered before this is called.
  pub fn finish_load(&mut self, result: Result<FeatureCollection, LoadError>) {
    match result {
      Ok(collection) => {
        log::info!("Showing {} features", collection.len());
        self.state.collection = collection;
        self.state.status = LoadStatus::Loaded;
        self.refresh();
      }
      Err(e) => {
        log::error!("Failed to load location data: {e}");
        self.state.status = LoadStatus::Failed(e.to_string());
        self.list.show_message(LOAD_FAILED);
      }
    }
  }

  pub fn set_query(&mut self, query: impl Into<String>) {
    self.state.filter.query = query.into();
    self.refresh();
  }

  /// Stores the category. Filtering stays text only.
  pub fn set_category(&mut self, category: Option<String>) {
    self.state.filter.category = category;
    self.refresh();
  }

  /// Activates a feature in both views. Unknown ids are ignored and `false` is returned.
  pub fn select(&mut self, id: &FeatureId) -> bool {
    let Some(feature) = self.state.collection.get(id) else {
      log::debug!("Ignoring selection of unknown feature {id}");
      return false;
    };
    log::debug!("Selecting feature {id} ({})", feature.display_name());
    self.state.selection = ActiveSelection::Selected(id.clone());

    self.render_views();
    if let Some(feature) = self
      .state
      .collection
      .get(id)
      .filter(|f| f.position.is_some())
    {
      self.map.focus(feature);
    }
    true
  }

  pub fn handle(&mut self, event: ViewEvent) {
    if self.state.status != LoadStatus::Loaded {
      log::debug!("Ignoring {event:?} while data is not loaded");
      return;
    }
    match event {
      ViewEvent::QueryChanged(query) => self.set_query(query),
      ViewEvent::CategoryChanged(category) => self.set_category(category),
      ViewEvent::Activated(id) => {
        self.select(&id);
      }
    }
  }

  fn refresh(&mut self) {
    if self.state.status != LoadStatus::Loaded {
      return;
    }
    self.render_views();
    let filtered = filter::apply(self.state.collection.features(), &self.state.filter);
    self.map.fit_to_bounds(&filtered);
  }

  /// Both views show the filtered features with the current selection.
  fn render_views(&mut self) {
    let filtered = filter::apply(self.state.collection.features(), &self.state.filter);
    let active = self.state.selection.id();
    self.map.render(&filtered, active);
    self.list.render(&filtered, active);
  }
}
