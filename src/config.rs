use std::path::PathBuf;

use dirs::home_dir;
use log::error;

use crate::map::coordinates::WGS84Coordinate;

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq)]
pub struct TileProvider {
  pub name: String,
  pub url: String,
  #[serde(default)]
  pub max_zoom: Option<u8>,
}

impl TileProvider {
  /// The highest zoom level the provider serves, 19 if not configured.
  #[must_use]
  pub fn get_max_zoom(&self) -> u8 {
    self.max_zoom.unwrap_or(19)
  }
}

/// Where the map looks before any data is shown.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize, PartialEq)]
pub struct InitialView {
  pub lat: f32,
  pub lon: f32,
  pub zoom: u8,
}

impl InitialView {
  #[must_use]
  pub fn coordinate(&self) -> WGS84Coordinate {
    WGS84Coordinate::new(self.lat, self.lon)
  }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, Default)]
#[serde(default)]
pub struct Config {
  #[serde(skip)]
  pub config_path: Option<PathBuf>,
  pub tile_provider: Vec<TileProvider>,
  pub data_source: Option<String>,
  pub initial_view: Option<InitialView>,
  pub focus_zoom: Option<u8>,
  pub fit_padding: Option<f32>,
}

const DEFAULT_TILE_URL: &str = "https://tile.openstreetmap.org/{zoom}/{x}/{y}.png";
const DEFAULT_DATA_SOURCE: &str = "data/locations.geojson";
const DEFAULT_INITIAL_VIEW: InitialView = InitialView {
  lat: -25.3010,
  lon: -57.6300,
  zoom: 17,
};
const DEFAULT_FOCUS_ZOOM: u8 = 18;
const DEFAULT_FIT_PADDING: f32 = 20.;

impl Config {
  /// Merges environment, config file and defaults, in that order of precedence.
  #[must_use]
  pub fn new() -> Self {
    let mut merged = Self::from_env();
    if let Some(from_file) = Self::from_file() {
      merged = merged.merge(&from_file);
    }
    merged.merge(&Self::defaults())
  }

  /// A configuration without tile providers, for running without network access.
  #[must_use]
  pub fn offline() -> Self {
    Self {
      tile_provider: Vec::new(),
      ..Self::defaults()
    }
  }

  #[must_use]
  pub fn defaults() -> Self {
    Self {
      config_path: home_dir().map(|p| p.join(".config").join("poimap")),
      tile_provider: vec![TileProvider {
        name: "OpenStreetMap".to_string(),
        url: DEFAULT_TILE_URL.to_string(),
        max_zoom: Some(19),
      }],
      data_source: Some(DEFAULT_DATA_SOURCE.to_string()),
      initial_view: Some(DEFAULT_INITIAL_VIEW),
      focus_zoom: Some(DEFAULT_FOCUS_ZOOM),
      fit_padding: Some(DEFAULT_FIT_PADDING),
    }
  }

  fn from_env() -> Self {
    let config_path = std::env::var("POIMAP_CONFIG").ok().map(PathBuf::from);

    let tile_provider = std::env::var("POIMAP_TILE_URL")
      .ok()
      .map_or_else(Vec::new, |url| {
        vec![TileProvider {
          name: "ENV".to_string(),
          url,
          max_zoom: None,
        }]
      });

    Self {
      config_path,
      tile_provider,
      data_source: std::env::var("POIMAP_DATA").ok(),
      ..Self::default()
    }
  }

  fn from_file() -> Option<Self> {
    let config_path = std::env::var("POIMAP_CONFIG")
      .ok()
      .map(PathBuf::from)
      .or_else(|| home_dir().map(|p| p.join(".config").join("poimap")))?;
    Self::from_json(&std::fs::read_to_string(config_path.join("config.json")).ok()?)
  }

  fn from_json(json: &str) -> Option<Self> {
    serde_json::from_str(json)
      .inspect_err(|e| error!("Failed to read config file: {e}"))
      .ok()
  }

  /// Fills everything that is unset in `self` from `other`. Tile providers are accumulated.
  #[must_use]
  pub fn merge(mut self, other: &Self) -> Self {
    self.config_path = self.config_path.or(other.config_path.clone());
    for tile in &other.tile_provider {
      if !self.tile_provider.contains(tile) {
        self.tile_provider.push(tile.clone());
      }
    }
    self.data_source = self.data_source.or(other.data_source.clone());
    self.initial_view = self.initial_view.or(other.initial_view);
    self.focus_zoom = self.focus_zoom.or(other.focus_zoom);
    self.fit_padding = self.fit_padding.or(other.fit_padding);
    self
  }

  #[must_use]
  pub fn data_source(&self) -> &str {
    self.data_source.as_deref().unwrap_or(DEFAULT_DATA_SOURCE)
  }

  #[must_use]
  pub fn initial_view(&self) -> InitialView {
    self.initial_view.unwrap_or(DEFAULT_INITIAL_VIEW)
  }

  #[must_use]
  pub fn focus_zoom(&self) -> u8 {
    self.focus_zoom.unwrap_or(DEFAULT_FOCUS_ZOOM)
  }

  #[must_use]
  pub fn fit_padding(&self) -> f32 {
    self.fit_padding.unwrap_or(DEFAULT_FIT_PADDING)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn merge_prefers_self_and_accumulates_providers() {
    let first = Config {
      tile_provider: vec![TileProvider {
        name: "A".to_string(),
        url: "https://a/{zoom}/{x}/{y}.png".to_string(),
        max_zoom: None,
      }],
      data_source: Some("other.geojson".to_string()),
      ..Config::default()
    };
    let merged = first.merge(&Config::defaults());

    assert_eq!(merged.data_source(), "other.geojson");
    assert_eq!(merged.tile_provider.len(), 2);
    assert_eq!(merged.tile_provider[0].name, "A");
    assert_eq!(merged.focus_zoom(), 18);
    assert_eq!(merged.initial_view(), DEFAULT_INITIAL_VIEW);
  }

  #[test]
  fn partial_config_file() {
    let cfg = Config::from_json(r#"{"focus_zoom": 15, "initial_view": {"lat": 1.0, "lon": 2.0, "zoom": 5}}"#)
      .expect("valid config");
    assert_eq!(cfg.focus_zoom(), 15);
    assert_eq!(cfg.initial_view().zoom, 5);
    assert!(cfg.tile_provider.is_empty());
    assert_eq!(cfg.fit_padding(), DEFAULT_FIT_PADDING);
  }

  #[test]
  fn broken_config_file_is_ignored() {
    assert!(Config::from_json("{ not json").is_none());
  }

  #[test]
  fn offline_has_no_tiles() {
    let cfg = Config::offline();
    assert!(cfg.tile_provider.is_empty());
    assert_eq!(cfg.data_source(), DEFAULT_DATA_SOURCE);
  }
}
